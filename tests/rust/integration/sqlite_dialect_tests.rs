//! SQLite registers its own translators ahead of the generic ones

use exprsql::query_expr::{DeclaringType, ExprType, MethodSignature};
use exprsql::type_mapping::{RelationalTypeMappingSource, ScalarKind};
use exprsql::{
    QueryExpr, SqlDialect, StaticModel, TranslationEnv, TranslatorBuilder, TranslatorConfig,
    Value,
};
use pretty_assertions::assert_eq;

use crate::common::IDENTITY_MODEL;

fn sqlite_config() -> TranslatorConfig {
    TranslatorConfig {
        dialect: SqlDialect::Sqlite,
        ..Default::default()
    }
}

fn sqlite_model() -> StaticModel {
    StaticModel::from_yaml_str(
        IDENTITY_MODEL,
        &RelationalTypeMappingSource::for_dialect(SqlDialect::Sqlite),
    )
    .unwrap()
}

fn user_name_starts_with(prefix: &str) -> QueryExpr {
    let text = ExprType::scalar(ScalarKind::String);
    QueryExpr::call(
        Some(QueryExpr::root("User", "u").property("UserName", text.clone())),
        MethodSignature::instance(
            DeclaringType::Scalar(ScalarKind::String),
            "StartsWith",
            vec![text],
        ),
        vec![QueryExpr::literal(Value::String(prefix.to_string()))],
        ExprType::scalar(ScalarKind::Bool),
    )
}

#[test]
fn test_starts_with_is_case_sensitive_substr() {
    let model = sqlite_model();
    let visitor = TranslatorBuilder::new(sqlite_config()).build();

    let mut env = TranslationEnv::new(&model);
    let sql = visitor
        .translate_predicate(&user_name_starts_with("ad"), &mut env)
        .unwrap();
    assert_eq!(
        visitor.renderer().render(&sql).sql,
        "substr(u.UserName, 1, length('ad')) = 'ad'"
    );
}

#[test]
fn test_projected_boolean_uses_integer_literals() {
    let model = sqlite_model();
    let visitor = TranslatorBuilder::new(sqlite_config()).build();

    let mut env = TranslationEnv::new(&model);
    let sql = visitor
        .translate(&user_name_starts_with("ad"), &mut env)
        .unwrap();
    assert_eq!(
        visitor.renderer().render(&sql).sql,
        "CASE WHEN substr(u.UserName, 1, length('ad')) = 'ad' THEN 1 ELSE 0 END"
    );
}

#[test]
fn test_year_of_lockout_end() {
    let model = sqlite_model();
    let visitor = TranslatorBuilder::new(sqlite_config()).build();

    let year = QueryExpr::root("User", "u")
        .property("LockoutEnd", ExprType::nullable(ScalarKind::DateTimeOffset))
        .property("Value", ExprType::scalar(ScalarKind::DateTimeOffset))
        .property("Year", ExprType::scalar(ScalarKind::Int32));
    let expr = QueryExpr::eq(year, QueryExpr::literal(Value::Int(2030)));

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&expr, &mut env).unwrap();
    assert_eq!(
        visitor.renderer().render(&sql).sql,
        "CAST(strftime('%Y', u.LockoutEnd) AS INTEGER) = 2030"
    );
}

#[test]
fn test_generic_dialect_keeps_like() {
    let model = sqlite_model();
    let visitor = TranslatorBuilder::default().build();

    let mut env = TranslationEnv::new(&model);
    let sql = visitor
        .translate_predicate(&user_name_starts_with("ad"), &mut env)
        .unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "u.UserName LIKE 'ad%'");
}
