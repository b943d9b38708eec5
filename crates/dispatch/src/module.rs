//! Link-time kernel module registration via `inventory`.
//!
//! Kernel providers declare an install function with [`kernel_module!`];
//! [`crate::Dispatcher::install_modules`] collects every submitted module and
//! runs it against a dispatcher. Nothing is installed implicitly, so each
//! dispatcher decides when (and whether) linked providers join it.

use crate::dispatcher::Dispatcher;
use crate::error::RegisterError;

/// Install hook for a set of kernels.
pub type InstallFn = fn(&Dispatcher) -> Result<(), RegisterError>;

/// Static kernel module entry collected via `inventory`.
pub struct KernelModule {
	/// Module name; install order and deduplication key.
	pub name: &'static str,
	/// Crate that defined this module.
	pub crate_name: &'static str,
	/// Registers the module's schemas and kernels.
	pub install: InstallFn,
}

impl std::fmt::Debug for KernelModule {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KernelModule")
			.field("name", &self.name)
			.field("crate_name", &self.crate_name)
			.finish_non_exhaustive()
	}
}

inventory::collect!(KernelModule);

/// Submits a kernel module for [`crate::Dispatcher::install_modules`].
///
/// ```ignore
/// tessera_dispatch::kernel_module!(cpu_elementwise, install);
///
/// fn install(d: &Dispatcher) -> Result<(), RegisterError> { ... }
/// ```
#[macro_export]
macro_rules! kernel_module {
	($name:ident, $install:path) => {
		$crate::inventory::submit! {
			$crate::module::KernelModule {
				name: stringify!($name),
				crate_name: env!("CARGO_PKG_NAME"),
				install: $install,
			}
		}
	};
}
