//! SQLite overrides, registered ahead of the generic translators.
//!
//! SQLite has no `date_part` and its `LIKE` ignores ASCII case, so temporal
//! members go through `strftime` and string matching through `instr`/`substr`.

use super::datetime::{clock_mapping, find_date_part, temporal_declaring_kind};
use super::{MemberTranslator, MethodCallTranslator, TranslatorResult};
use crate::query_expr::{DeclaringType, ExprType, MemberInfo, MethodSignature};
use crate::sql_expr::{SqlConstant, SqlExpr};
use crate::sql_factory::{NullabilityRule, SqlExpressionFactory};
use crate::type_mapping::ScalarKind;
use crate::value::Value;
use crate::visitor::TranslationEnv;

fn text(factory: &SqlExpressionFactory, s: &str) -> SqlExpr {
    factory.constant_with_mapping(
        Value::String(s.to_string()),
        factory.mapping_for(ScalarKind::String),
    )
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDateTimeMemberTranslator;

impl MemberTranslator for SqliteDateTimeMemberTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        member: &MemberInfo,
        result_type: &ExprType,
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        let Some(declaring) = temporal_declaring_kind(member) else {
            return Ok(None);
        };

        let Some(instance) = instance else {
            let mapping = clock_mapping(declaring, result_type, factory);
            let args: Vec<SqlExpr> = match member.name.as_str() {
                "Now" => vec![text(factory, "now"), text(factory, "localtime")],
                "UtcNow" => vec![text(factory, "now")],
                "Today" => vec![
                    text(factory, "now"),
                    text(factory, "localtime"),
                    text(factory, "start of day"),
                ],
                _ => return Ok(None),
            };
            return Ok(Some(factory.function(
                "datetime",
                args,
                mapping,
                NullabilityRule::Never,
            )));
        };

        if member.name == "Date" {
            return Ok(Some(factory.function(
                "datetime",
                vec![instance.clone(), text(factory, "start of day")],
                instance.type_mapping().clone(),
                NullabilityRule::Arguments(vec![0]),
            )));
        }

        let Some((_, format)) = find_date_part(&member.name) else {
            return Ok(None);
        };
        let strftime = factory.function(
            "strftime",
            vec![text(factory, format), instance.clone()],
            factory.mapping_for(ScalarKind::String),
            NullabilityRule::Arguments(vec![1]),
        );
        Ok(Some(factory.convert(strftime, factory.mapping_for(ScalarKind::Int32))))
    }
}

/// Case-sensitive `Contains`/`StartsWith`/`EndsWith` for any argument shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteStringMethodTranslator;

impl MethodCallTranslator for SqliteStringMethodTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodSignature,
        args: &[SqlExpr],
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        if method.declaring_type != DeclaringType::Scalar(ScalarKind::String) {
            return Ok(None);
        }
        let (Some(instance), [argument]) = (instance, args) else {
            return Ok(None);
        };

        let int = factory.mapping_for(ScalarKind::Int32);
        let length = || {
            factory.function(
                "length",
                vec![argument.clone()],
                int.clone(),
                NullabilityRule::AnyArgument,
            )
        };

        let matched = match method.name.as_str() {
            "Contains" => {
                let position = factory.function(
                    "instr",
                    vec![instance.clone(), argument.clone()],
                    int.clone(),
                    NullabilityRule::AnyArgument,
                );
                return Ok(Some(factory.greater_than(
                    position,
                    factory.constant(Value::Int(0), ScalarKind::Int32),
                )?));
            }
            "StartsWith" => factory.function(
                "substr",
                vec![
                    instance.clone(),
                    factory.constant(Value::Int(1), ScalarKind::Int32),
                    length(),
                ],
                instance.type_mapping().clone(),
                NullabilityRule::AnyArgument,
            ),
            "EndsWith" => factory.function(
                "substr",
                vec![instance.clone(), factory.negate(length())],
                instance.type_mapping().clone(),
                NullabilityRule::AnyArgument,
            ),
            _ => return Ok(None),
        };

        let compared = factory.equal(matched, argument.clone())?;
        match argument {
            // A non-empty constant needs no guard for the empty-suffix case
            SqlExpr::Constant(SqlConstant {
                value: Value::String(s),
                ..
            }) if !s.is_empty() => Ok(Some(compared)),
            _ => {
                let empty = factory.constant(Value::String(String::new()), ScalarKind::String);
                let is_empty = factory.equal(argument.clone(), empty)?;
                Ok(Some(factory.or_else(is_empty, compared)))
            }
        }
    }
}
