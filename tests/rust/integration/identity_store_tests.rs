//! Lookups an identity user store issues, translated end to end

use exprsql::query_expr::{BinaryOp, DeclaringType, ExprType, MethodSignature, ValueKind};
use exprsql::type_mapping::ScalarKind;
use exprsql::{
    QueryExpr, TranslationEnv, TranslationError, TranslatorBuilder, TranslatorConfig, Value,
};
use pretty_assertions::assert_eq;

use crate::common::{eval, identity_model, passes_filter, row};

fn user(property: &str, ty: ExprType) -> QueryExpr {
    QueryExpr::root("User", "u").property(property, ty)
}

fn text() -> ExprType {
    ExprType::scalar(ScalarKind::String)
}

#[test]
fn test_find_by_email_compensates_for_nulls() {
    let model = identity_model();
    let config = TranslatorConfig {
        qualify_columns: false,
        ..Default::default()
    };
    let visitor = TranslatorBuilder::new(config).build();

    let expr = QueryExpr::eq(user("Email", text()), QueryExpr::parameter("p", text()));
    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&expr, &mut env).unwrap();

    let rendered = visitor.renderer().render(&sql);
    assert_eq!(rendered.sql, "(email = @p OR (email IS NULL AND @p IS NULL))");
    assert_eq!(rendered.parameters, vec!["p".to_string()]);
    assert!(!env.client_eval_required());

    // NULL == NULL holds, NULL == value does not
    assert!(passes_filter(&sql, &row(&[("email", Value::Null), ("p", Value::Null)])));
    assert!(!passes_filter(
        &sql,
        &row(&[("email", Value::Null), ("p", Value::String("a@b.c".into()))])
    ));
}

#[test]
fn test_lockout_check() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();
    let lockout_end = || user("LockoutEnd", ExprType::nullable(ScalarKind::DateTimeOffset));

    let expr = QueryExpr::and(
        QueryExpr::ne(
            lockout_end(),
            QueryExpr::null(ExprType::nullable(ScalarKind::DateTimeOffset)),
        ),
        QueryExpr::binary(
            BinaryOp::GreaterThan,
            lockout_end(),
            QueryExpr::parameter("now", ExprType::scalar(ScalarKind::DateTimeOffset)),
        ),
    );
    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&expr, &mut env).unwrap();
    assert_eq!(
        visitor.renderer().render(&sql).sql,
        "(u.LockoutEnd IS NOT NULL AND u.LockoutEnd > @now)"
    );
}

#[test]
fn test_user_name_search_escapes_parameter() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let expr = QueryExpr::call(
        Some(user("UserName", text())),
        MethodSignature::instance(
            DeclaringType::Scalar(ScalarKind::String),
            "Contains",
            vec![text()],
        ),
        vec![QueryExpr::parameter("search", text())],
        ExprType::scalar(ScalarKind::Bool),
    );
    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&expr, &mut env).unwrap();

    let rendered = visitor.renderer().render(&sql);
    assert!(rendered.sql.starts_with("u.UserName LIKE "), "{}", rendered.sql);
    assert!(rendered.sql.contains("replace("), "{}", rendered.sql);
    assert!(rendered.sql.ends_with("ESCAPE '\\'"), "{}", rendered.sql);
    assert_eq!(rendered.parameters, vec!["search".to_string()]);
}

#[test]
fn test_failed_count_in_inline_list() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let counts = QueryExpr::constant(
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Null]),
        ExprType::collection(ValueKind::Scalar(ScalarKind::Int32)),
    );
    let expr = QueryExpr::call(
        None,
        MethodSignature::static_method(
            DeclaringType::Enumerable,
            "Contains",
            vec![
                ExprType::collection(ValueKind::Scalar(ScalarKind::Int32)),
                ExprType::scalar(ScalarKind::Int32),
            ],
        ),
        vec![counts, user("AccessFailedCount", ExprType::scalar(ScalarKind::Int32))],
        ExprType::scalar(ScalarKind::Bool),
    );
    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&expr, &mut env).unwrap();

    // The NULL element cannot match a non-nullable column
    assert_eq!(
        visitor.renderer().render(&sql).sql,
        "u.AccessFailedCount IN (1, 2)"
    );
}

#[test]
fn test_conditional_projection_over_optional_navigation() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let age = QueryExpr::root("User", "u")
        .property("Profile", ExprType::entity("Profile"))
        .property("Age", ExprType::nullable(ScalarKind::Int32));
    let expr = QueryExpr::conditional(
        QueryExpr::binary(
            BinaryOp::GreaterThanOrEqual,
            age,
            QueryExpr::literal(Value::Int(18)),
        ),
        QueryExpr::literal(Value::String("adult".to_string())),
        QueryExpr::literal(Value::String("minor".to_string())),
    );
    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate(&expr, &mut env).unwrap();

    assert_eq!(
        visitor.renderer().render(&sql).sql,
        "CASE WHEN (u_profile.Age >= 18 AND u_profile.Age IS NOT NULL) THEN 'adult' ELSE 'minor' END"
    );
    assert_eq!(env.joins().len(), 1);
    assert_eq!(env.joins()[0].alias, "u_profile");
    assert!(env.joins()[0].optional);

    // A missing profile takes the ELSE branch
    assert_eq!(
        eval(&sql, &row(&[("Age", Value::Null)])),
        Value::String("minor".to_string())
    );
}

#[test]
fn test_expression_from_json() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let expr = QueryExpr::eq(
        user("NormalizedEmail", text()),
        QueryExpr::parameter("normalizedEmail", text()),
    );
    let json = serde_json::to_string(&expr).unwrap();
    let parsed: QueryExpr = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, expr);

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&parsed, &mut env).unwrap();
    assert_eq!(
        visitor.renderer().render(&sql).sql,
        "(u.NormalizedEmail = @normalizedEmail OR (u.NormalizedEmail IS NULL AND @normalizedEmail IS NULL))"
    );
}

#[test]
fn test_unmapped_property_in_subquery_is_query_shape_error() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let expr = QueryExpr::eq(
        user("PasswordHint", text()),
        QueryExpr::literal(Value::String("x".to_string())),
    );

    let mut env = TranslationEnv::new(&model);
    let err = visitor.translate_predicate(&expr, &mut env).unwrap_err();
    assert!(matches!(err, TranslationError::Untranslatable { .. }));

    let mut env = TranslationEnv::for_subquery(&model);
    let err = visitor.translate_predicate(&expr, &mut env).unwrap_err();
    match err {
        TranslationError::QueryShape { fragment, reason } => {
            assert_eq!(fragment, "u.PasswordHint");
            assert!(reason.contains("PasswordHint"), "reason: {}", reason);
        }
        other => panic!("expected query shape error, got {:?}", other),
    }
}
