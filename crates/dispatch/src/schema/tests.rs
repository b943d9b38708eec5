use pretty_assertions::assert_eq;

use super::*;
use crate::tag::TypeTag;

#[derive(Debug)]
struct FakeTensor(TypeTag);

impl crate::DispatchTensor for FakeTensor {
	fn type_tag(&self) -> TypeTag {
		self.0
	}
}

fn add_schema() -> OperatorSchema {
	OperatorSchema::builder("add")
		.dispatch_tensor("input1")
		.dispatch_tensor("input2")
		.opaque("context")
		.returns([ArgKind::Tensor])
		.build()
		.unwrap()
}

#[test]
fn test_dispatch_positions_follow_declaration_order() {
	let schema = OperatorSchema::builder("mixed")
		.int("axis")
		.dispatch_tensor("a")
		.bool("flag")
		.dispatch_tensor("b")
		.tensor("scratch")
		.build()
		.unwrap();

	assert_eq!(schema.arity(), 5);
	assert_eq!(schema.dispatch_positions(), &[1, 3]);
	assert_eq!(schema.key_width(), 2);
}

#[test]
fn test_define_rejects_malformed_parameters() {
	let err = OperatorSchema::define("empty", vec![]).unwrap_err();
	assert!(matches!(err, SchemaError::InvalidSchema { .. }));

	let err = OperatorSchema::define(
		"dup",
		vec![Parameter::dispatch_tensor("x"), Parameter::new("x", ArgKind::Int)],
	)
	.unwrap_err();
	assert_eq!(
		err,
		SchemaError::InvalidSchema {
			operator: "dup".into(),
			reason: "duplicate parameter name 'x'".into(),
		}
	);

	let err = OperatorSchema::define(
		"bad",
		vec![Parameter {
			name: "n".into(),
			kind: ArgKind::Int,
			dispatch: true,
		}],
	)
	.unwrap_err();
	assert!(matches!(err, SchemaError::InvalidSchema { .. }));

	let err = OperatorSchema::define("", vec![Parameter::dispatch_tensor("x")]).unwrap_err();
	assert!(matches!(err, SchemaError::InvalidSchema { .. }));

	let err = OperatorSchema::define("anon", vec![Parameter::new("", ArgKind::Int)]).unwrap_err();
	assert!(matches!(err, SchemaError::InvalidSchema { .. }));
}

#[test]
fn test_derivation_must_match_parameter_shape() {
	let derivation = KeyDerivation::new([ArgKind::Str], 1, |_| Ok(Signature::new()));
	let err = OperatorSchema::builder("fill")
		.str("dtype")
		.float("value")
		.derive_key(derivation)
		.build()
		.unwrap_err();
	assert!(matches!(err, SchemaError::SchemaMismatch { .. }));

	let derivation = KeyDerivation::new([ArgKind::Str, ArgKind::Float], 1, |_| {
		Ok(Signature::from_slice(&[TypeTag::from_raw(1)]))
	});
	let schema = OperatorSchema::builder("fill")
		.str("dtype")
		.float("value")
		.derive_key(derivation)
		.build()
		.unwrap();
	assert_eq!(schema.key_width(), 1);
	assert!(schema.dispatch_positions().is_empty());
}

#[test]
fn test_check_args_reports_arity_and_kind() {
	let schema = add_schema();
	let t = Value::tensor(FakeTensor(TypeTag::from_raw(1)));

	let err = schema.check_args(&[t.clone()]).unwrap_err();
	assert!(matches!(
		err,
		CallError::ArityMismatch {
			expected: 3,
			actual: 1,
			..
		}
	));

	let err = schema
		.check_args(&[t.clone(), Value::Int(2), Value::opaque(())])
		.unwrap_err();
	match err {
		CallError::SchemaMismatch { operator, reason } => {
			assert_eq!(operator, "add");
			assert_eq!(reason, "parameter 'input2' expects tensor, got int");
		}
		other => panic!("unexpected error: {other:?}"),
	}

	schema
		.check_args(&[t.clone(), t, Value::opaque(())])
		.unwrap();
}

#[test]
fn test_default_key_uses_dispatch_positions() {
	let schema = add_schema();
	let a = TypeTag::from_raw(1);
	let b = TypeTag::from_raw(2);
	let args = [
		Value::tensor(FakeTensor(a)),
		Value::tensor(FakeTensor(b)),
		Value::opaque(()),
	];
	let key = schema.dispatch_key(OperatorId::from_raw(0), &args).unwrap();
	assert_eq!(key.tags(), &[a, b]);
}

#[test]
fn test_custom_derivation_width_is_enforced() {
	let schema = OperatorSchema::builder("fill")
		.str("dtype")
		.derive_key(KeyDerivation::new([ArgKind::Str], 1, |args| {
			match args[0].as_str() {
				Some("pair") => Ok(Signature::from_slice(&[
					TypeTag::from_raw(1),
					TypeTag::from_raw(1),
				])),
				Some(_) => Ok(Signature::from_slice(&[TypeTag::from_raw(1)])),
				None => Err("dtype must be a string".into()),
			}
		}))
		.build()
		.unwrap();

	let id = OperatorId::from_raw(3);
	let key = schema.dispatch_key(id, &[Value::from("f32")]).unwrap();
	assert_eq!(key.tags(), &[TypeTag::from_raw(1)]);

	let err = schema.dispatch_key(id, &[Value::from("pair")]).unwrap_err();
	assert!(matches!(err, CallError::SchemaMismatch { .. }));
}

#[test]
fn test_check_returns() {
	let schema = add_schema();
	let t = Value::tensor(FakeTensor(TypeTag::from_raw(1)));
	schema.check_returns(&[t]).unwrap();

	let err = schema.check_returns(&[Value::Int(1)]).unwrap_err();
	assert!(matches!(err, CallError::ReturnMismatch { .. }));

	let no_returns = OperatorSchema::builder("free").dispatch_tensor("x").build().unwrap();
	no_returns.check_returns(&[Value::Int(1), Value::Bool(true)]).unwrap();
}

#[test]
fn test_table_assigns_dense_ids_and_dedups_identical_shapes() {
	let table = SchemaTable::new();
	let add = table.define(add_schema()).unwrap();
	let relu = table
		.define(OperatorSchema::builder("relu").dispatch_tensor("x").build().unwrap())
		.unwrap();

	assert_eq!(add.id(), OperatorId::from_raw(0));
	assert_eq!(relu.id(), OperatorId::from_raw(1));

	let again = table.define(add_schema()).unwrap();
	assert_eq!(again.id(), add.id());
	assert_eq!(table.len(), 2);
	assert_eq!(table.names(), vec!["add".to_string(), "relu".to_string()]);
}

#[test]
fn test_table_rejects_conflicting_redefinition() {
	let table = SchemaTable::new();
	table.define(add_schema()).unwrap();

	let conflicting = OperatorSchema::builder("add")
		.dispatch_tensor("input1")
		.dispatch_tensor("input2")
		.build()
		.unwrap();
	let err = table.define(conflicting).unwrap_err();
	assert!(matches!(err, SchemaError::SchemaMismatch { .. }));
	assert_eq!(table.get("add").unwrap().schema().arity(), 3);
}

#[test]
fn test_suggest_close_names_only() {
	let table = SchemaTable::new();
	table.define(add_schema()).unwrap();
	table
		.define(OperatorSchema::builder("sigmoid").dispatch_tensor("x").build().unwrap())
		.unwrap();

	assert_eq!(table.suggest("sigmod").as_deref(), Some("sigmoid"));
	assert_eq!(table.suggest("matmul"), None);
}
