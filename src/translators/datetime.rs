use super::{MemberTranslator, TranslatorResult};
use crate::query_expr::{DeclaringType, ExprType, MemberInfo};
use crate::sql_expr::SqlExpr;
use crate::sql_factory::{NullabilityRule, SqlExpressionFactory};
use crate::type_mapping::ScalarKind;
use crate::value::Value;
use crate::visitor::TranslationEnv;

/// Component members of temporal types: (member, `date_part` field, strftime format)
pub(crate) const DATE_PARTS: &[(&str, &str, &str)] = &[
    ("Year", "year", "%Y"),
    ("Month", "month", "%m"),
    ("Day", "day", "%d"),
    ("Hour", "hour", "%H"),
    ("Minute", "minute", "%M"),
    ("Second", "second", "%S"),
    ("DayOfYear", "doy", "%j"),
    ("DayOfWeek", "dow", "%w"),
];

pub(crate) fn find_date_part(member: &str) -> Option<(&'static str, &'static str)> {
    DATE_PARTS
        .iter()
        .find(|(name, _, _)| *name == member)
        .map(|(_, field, format)| (*field, *format))
}

/// Temporal kind declaring `member`, if any.
pub(crate) fn temporal_declaring_kind(member: &MemberInfo) -> Option<ScalarKind> {
    match member.declaring_type {
        DeclaringType::Scalar(kind) if kind.is_temporal() => Some(kind),
        _ => None,
    }
}

/// Result mapping of a static clock member such as `DateTime.Now`.
pub(crate) fn clock_mapping(
    declaring: ScalarKind,
    result_type: &ExprType,
    factory: &SqlExpressionFactory,
) -> crate::type_mapping::TypeMapping {
    factory.mapping_for(result_type.scalar_kind().unwrap_or(declaring))
}

/// Members of `DateTime`, `DateTimeOffset` and `DateOnly`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateTimeMemberTranslator;

impl MemberTranslator for DateTimeMemberTranslator {
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
            return Ok(match member.name.as_str() {
                "Now" | "UtcNow" => Some(factory.niladic_function("CURRENT_TIMESTAMP", mapping)),
                "Today" => Some(factory.niladic_function("CURRENT_DATE", mapping)),
                _ => None,
            });
        };

        if member.name == "Date" {
            return Ok(Some(
                factory.convert(instance.clone(), factory.mapping_for(ScalarKind::Date)),
            ));
        }

        let Some((field, _)) = find_date_part(&member.name) else {
            return Ok(None);
        };
        let field = factory.constant_with_mapping(
            Value::String(field.to_string()),
            factory.mapping_for(ScalarKind::String),
        );
        Ok(Some(factory.function(
            "date_part",
            vec![field, instance.clone()],
            factory.mapping_for(ScalarKind::Int32),
            NullabilityRule::Arguments(vec![1]),
        )))
    }
}
