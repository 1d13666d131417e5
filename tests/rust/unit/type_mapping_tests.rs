//! Operand type mapping inference and conflicts, observed through translation

use exprsql::query_expr::{BinaryOp, ExprType};
use exprsql::sql_expr::{MappingOrigin, SqlExpr};
use exprsql::type_mapping::ScalarKind;
use exprsql::{QueryExpr, TranslationEnv, TranslationError, TranslatorBuilder, Value};

use crate::common::orders_model;

fn order(property: &str, ty: ExprType) -> QueryExpr {
    QueryExpr::root("Order", "o").property(property, ty)
}

#[test]
fn test_constant_adopts_column_mapping() {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let expr = QueryExpr::eq(
        order("Note", ExprType::scalar(ScalarKind::String)),
        QueryExpr::literal(Value::String("rush".to_string())),
    );

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&expr, &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "o.Note = 'rush'");

    let SqlExpr::Binary { right, .. } = &sql else {
        panic!("expected comparison, got {:?}", sql);
    };
    let SqlExpr::Constant(constant) = right.as_ref() else {
        panic!("expected constant, got {:?}", right);
    };
    assert_eq!(constant.type_mapping.store_type, "varchar(200)");
    assert_eq!(constant.origin, MappingOrigin::Explicit);
}

#[test]
fn test_parameter_adopts_column_mapping() {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let expr = QueryExpr::binary(
        BinaryOp::GreaterThan,
        order("Quantity", ExprType::scalar(ScalarKind::Int32)),
        QueryExpr::parameter("min", ExprType::scalar(ScalarKind::Int64)),
    );

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&expr, &mut env).unwrap();
    let rendered = visitor.renderer().render(&sql);
    assert_eq!(rendered.sql, "o.Quantity > @min");
    assert_eq!(rendered.parameters, vec!["min".to_string()]);

    let SqlExpr::Binary { right, .. } = &sql else {
        panic!("expected comparison, got {:?}", sql);
    };
    assert_eq!(right.type_mapping().kind, ScalarKind::Int32);
}

#[test]
fn test_incompatible_columns_are_a_fatal_conflict() {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let expr = QueryExpr::eq(
        order("Payload", ExprType::scalar(ScalarKind::Bytes)),
        order("Quantity", ExprType::scalar(ScalarKind::Int32)),
    );

    // Client evaluation is allowed, but a conflict is still an error
    let mut env = TranslationEnv::new(&model);
    let err = visitor.translate_predicate(&expr, &mut env).unwrap_err();
    assert!(err.is_fatal());
    match err {
        TranslationError::TypeMappingConflict { fragment, .. } => {
            assert_eq!(fragment, "(o.Payload == o.Quantity)");
        }
        other => panic!("expected type mapping conflict, got {:?}", other),
    }
    assert!(!env.client_eval_required());
}

#[test]
fn test_text_constant_against_number_conflicts() {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let expr = QueryExpr::eq(
        order("Quantity", ExprType::scalar(ScalarKind::Int32)),
        QueryExpr::literal(Value::String("ten".to_string())),
    );

    let mut env = TranslationEnv::new(&model);
    let err = visitor.translate_predicate(&expr, &mut env).unwrap_err();
    assert!(matches!(err, TranslationError::TypeMappingConflict { .. }));
}

#[test]
fn test_string_addition_is_concatenation() {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let expr = QueryExpr::binary(
        BinaryOp::Add,
        order("Note", ExprType::scalar(ScalarKind::String)),
        QueryExpr::literal(Value::String("!".to_string())),
    );

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate(&expr, &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "o.Note || '!'");
    assert_eq!(sql.type_mapping().store_type, "varchar(200)");
}

#[test]
fn test_coalesce_unifies_operands() {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let expr = QueryExpr::binary(
        BinaryOp::Coalesce,
        order("A", ExprType::nullable(ScalarKind::Int32)),
        QueryExpr::literal(Value::Int(0)),
    );

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate(&expr, &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "COALESCE(o.A, 0)");
    assert!(!sql.is_nullable());
}
