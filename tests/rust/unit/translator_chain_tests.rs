//! Translator chain ordering, client-evaluation fallback and determinism

use std::sync::Arc;

use exprsql::query_expr::{DeclaringType, ExprType, MemberInfo, MethodSignature};
use exprsql::sql_factory::{NullabilityRule, SqlExpressionFactory};
use exprsql::translators::{MemberTranslator, MethodCallTranslator, TranslatorResult};
use exprsql::type_mapping::ScalarKind;
use exprsql::{QueryExpr, SqlExpr, TranslationEnv, TranslationError, TranslatorBuilder, Value};
use pretty_assertions::assert_eq;

use crate::common::identity_model;

struct CharLengthTranslator;

impl MemberTranslator for CharLengthTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        member: &MemberInfo,
        _result_type: &ExprType,
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        match (&member.declaring_type, instance, member.name.as_str()) {
            (DeclaringType::Scalar(ScalarKind::String), Some(instance), "Length") => {
                Ok(Some(factory.function(
                    "char_length",
                    vec![instance.clone()],
                    factory.mapping_for(ScalarKind::Int32),
                    NullabilityRule::AnyArgument,
                )))
            }
            _ => Ok(None),
        }
    }
}

struct SoundexTranslator;

impl MethodCallTranslator for SoundexTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodSignature,
        _args: &[SqlExpr],
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        match (instance, method.name.as_str()) {
            (Some(instance), "Soundex") => Ok(Some(factory.function(
                "soundex",
                vec![instance.clone()],
                factory.mapping_for(ScalarKind::String),
                NullabilityRule::AnyArgument,
            ))),
            _ => Ok(None),
        }
    }
}

fn email() -> QueryExpr {
    QueryExpr::root("User", "u").property("Email", ExprType::scalar(ScalarKind::String))
}

fn soundex(of: QueryExpr) -> QueryExpr {
    QueryExpr::call(
        Some(of),
        MethodSignature::instance(DeclaringType::Scalar(ScalarKind::String), "Soundex", vec![]),
        vec![],
        ExprType::scalar(ScalarKind::String),
    )
}

#[test]
fn test_prepended_translator_wins_over_builtin() {
    let model = identity_model();
    let length = email().property("Length", ExprType::scalar(ScalarKind::Int32));

    let prepended = TranslatorBuilder::default()
        .prepend_member_translator(Arc::new(CharLengthTranslator))
        .build();
    let mut env = TranslationEnv::new(&model);
    let sql = prepended.translate(&length, &mut env).unwrap();
    assert_eq!(prepended.renderer().render(&sql).sql, "char_length(u.email)");

    let appended = TranslatorBuilder::default()
        .register_member_translator(Arc::new(CharLengthTranslator))
        .build();
    let mut env = TranslationEnv::new(&model);
    let sql = appended.translate(&length, &mut env).unwrap();
    assert_eq!(appended.renderer().render(&sql).sql, "length(u.email)");
}

#[test]
fn test_custom_method_translator_is_consulted() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default()
        .register_method_call_translator(Arc::new(SoundexTranslator))
        .build();

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate(&soundex(email()), &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "soundex(u.email)");
    assert!(sql.is_nullable());
    assert!(!env.client_eval_required());
}

struct GlobStartsWithTranslator;

impl MethodCallTranslator for GlobStartsWithTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodSignature,
        args: &[SqlExpr],
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        match (instance, method.name.as_str(), args) {
            (Some(instance), "StartsWith", [prefix]) => Ok(Some(factory.function(
                "starts_with",
                vec![instance.clone(), prefix.clone()],
                factory.mapping_for(ScalarKind::Bool),
                NullabilityRule::AnyArgument,
            ))),
            _ => Ok(None),
        }
    }
}

#[test]
fn test_prepended_method_translator_wins_over_builtin() {
    let model = identity_model();
    let starts_with = QueryExpr::call(
        Some(email()),
        MethodSignature::instance(
            DeclaringType::Scalar(ScalarKind::String),
            "StartsWith",
            vec![ExprType::scalar(ScalarKind::String)],
        ),
        vec![QueryExpr::literal(Value::String("ad".into()))],
        ExprType::scalar(ScalarKind::Bool),
    );

    let visitor = TranslatorBuilder::default()
        .prepend_method_call_translator(Arc::new(GlobStartsWithTranslator))
        .build();
    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate(&starts_with, &mut env).unwrap();
    let rendered = visitor.renderer().render(&sql).sql;
    assert!(rendered.contains("starts_with(u.email, 'ad')"), "sql: {}", rendered);
}

#[test]
fn test_unclaimed_method_falls_back_to_client() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let mut env = TranslationEnv::new(&model);
    let err = visitor.translate(&soundex(email()), &mut env).unwrap_err();
    assert!(!err.is_fatal());
    match err {
        TranslationError::Untranslatable { fragment, reason } => {
            assert_eq!(fragment, "u.Email.Soundex()");
            assert!(reason.contains("Soundex"), "reason: {}", reason);
        }
        other => panic!("expected untranslatable, got {:?}", other),
    }
    assert!(env.client_eval_required());
}

#[test]
fn test_untranslatable_argument_fails_enclosing_expression() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let starts_with = QueryExpr::call(
        Some(email()),
        MethodSignature::instance(
            DeclaringType::Scalar(ScalarKind::String),
            "StartsWith",
            vec![ExprType::scalar(ScalarKind::String)],
        ),
        vec![soundex(email())],
        ExprType::scalar(ScalarKind::Bool),
    );
    let filter = QueryExpr::and(
        starts_with,
        QueryExpr::eq(
            QueryExpr::root("User", "u")
                .property("EmailConfirmed", ExprType::scalar(ScalarKind::Bool)),
            QueryExpr::literal(Value::Bool(true)),
        ),
    );

    let mut env = TranslationEnv::new(&model);
    let err = visitor.translate_predicate(&filter, &mut env).unwrap_err();
    assert_eq!(err.fragment(), "u.Email.Soundex()");
    assert_eq!(
        env.last_untranslatable().map(|f| f.fragment.as_str()),
        Some("u.Email.Soundex()")
    );
}

#[test]
fn test_subquery_untranslatable_is_query_shape_error() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let mut env = TranslationEnv::for_subquery(&model);
    let err = visitor.translate(&soundex(email()), &mut env).unwrap_err();
    assert!(matches!(err, TranslationError::QueryShape { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_nullable_has_value_through_optional_navigation() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();

    let has_age = QueryExpr::root("User", "u")
        .property("Profile", ExprType::entity("Profile"))
        .property("Age", ExprType::nullable(ScalarKind::Int32))
        .property("HasValue", ExprType::scalar(ScalarKind::Bool));

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&has_age, &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "u_profile.Age IS NOT NULL");
    assert_eq!(env.joins().len(), 1);
    assert_eq!(env.joins()[0].target_entity, "Profile");
}

#[test]
fn test_translation_is_deterministic() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();
    let expr = QueryExpr::eq(
        email(),
        QueryExpr::parameter("normalizedEmail", ExprType::scalar(ScalarKind::String)),
    );

    let mut first_env = TranslationEnv::new(&model);
    let first = visitor.translate_predicate(&expr, &mut first_env).unwrap();
    let mut second_env = TranslationEnv::new(&model);
    let second = visitor.translate_predicate(&expr, &mut second_env).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        visitor.renderer().render(&first),
        visitor.renderer().render(&second)
    );
}

#[test]
fn test_visitor_is_shared_across_threads() {
    let model = identity_model();
    let visitor = TranslatorBuilder::default().build();
    let expr = email().property("Length", ExprType::scalar(ScalarKind::Int32));

    let rendered: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let visitor = visitor.clone();
                let model = &model;
                let expr = &expr;
                scope.spawn(move || {
                    let mut env = TranslationEnv::new(model);
                    let sql = visitor.translate(expr, &mut env).unwrap();
                    visitor.renderer().render(&sql).sql
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(rendered.iter().all(|sql| sql == "length(u.email)"));
}
