use super::{MethodCallTranslator, TranslatorResult};
use crate::query_expr::{DeclaringType, MethodSignature};
use crate::sql_expr::{SqlConstant, SqlExpr};
use crate::sql_factory::SqlExpressionFactory;
use crate::value::Value;
use crate::visitor::TranslationEnv;

/// `list.Contains(item)` and `Enumerable.Contains(list, item)` over an inline list.
///
/// - NULL elements become `OR item IS NULL`
/// - an empty list is always false
/// - parameterized collections are left to the client
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionContainsTranslator;

impl MethodCallTranslator for CollectionContainsTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodSignature,
        args: &[SqlExpr],
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        if method.name != "Contains" {
            return Ok(None);
        }
        let (list, item) = match (&method.declaring_type, instance, args) {
            (DeclaringType::Collection, Some(list), [item]) => (list, item),
            (DeclaringType::Enumerable, None, [list, item]) => (list, item),
            _ => return Ok(None),
        };

        let SqlExpr::Constant(SqlConstant {
            value: Value::List(elements),
            type_mapping,
            ..
        }) = list
        else {
            log::debug!("Contains over a non-inline collection is evaluated on the client");
            return Ok(None);
        };

        let has_null = elements.iter().any(Value::is_null);
        let values: Vec<SqlExpr> = elements
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| factory.constant(v.clone(), type_mapping.kind))
            .collect();

        let matched = if values.is_empty() {
            factory.sentinel(false)
        } else {
            factory.in_values(item.clone(), values, false)?
        };

        Ok(Some(if has_null {
            factory.or_else(matched, factory.is_null(item.clone()))
        } else {
            matched
        }))
    }
}
