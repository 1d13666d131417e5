use super::{MemberTranslator, TranslatorResult};
use crate::query_expr::{DeclaringType, ExprType, MemberInfo};
use crate::sql_expr::SqlExpr;
use crate::sql_factory::SqlExpressionFactory;
use crate::visitor::TranslationEnv;

/// `Nullable<T>.Value` and `Nullable<T>.HasValue`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullableMemberTranslator;

impl MemberTranslator for NullableMemberTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        member: &MemberInfo,
        _result_type: &ExprType,
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        let (DeclaringType::Nullable(_), Some(instance)) = (&member.declaring_type, instance) else {
            return Ok(None);
        };

        Ok(match member.name.as_str() {
            "Value" => Some(instance.clone()),
            "HasValue" => Some(factory.is_not_null(instance.clone())),
            _ => None,
        })
    }
}
