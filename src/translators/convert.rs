use super::{MethodCallTranslator, TranslatorResult};
use crate::query_expr::{DeclaringType, MethodSignature};
use crate::sql_expr::SqlExpr;
use crate::sql_factory::SqlExpressionFactory;
use crate::type_mapping::ScalarKind;
use crate::visitor::TranslationEnv;

fn convert_target(method: &str) -> Option<ScalarKind> {
    let kind = match method {
        "ToBoolean" => ScalarKind::Bool,
        "ToInt16" => ScalarKind::Int16,
        "ToInt32" => ScalarKind::Int32,
        "ToInt64" => ScalarKind::Int64,
        "ToDouble" => ScalarKind::Double,
        "ToDecimal" => ScalarKind::Decimal,
        "ToString" => ScalarKind::String,
        _ => return None,
    };
    Some(kind)
}

/// `x.ToString()` and `Convert.ToXxx(x)` as CAST.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConvertTranslator;

impl MethodCallTranslator for ConvertTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodSignature,
        args: &[SqlExpr],
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        let (operand, target) = match (&method.declaring_type, instance, args) {
            (DeclaringType::Scalar(_), Some(instance), []) if method.name == "ToString" => {
                (instance, ScalarKind::String)
            }
            (DeclaringType::Convert, None, [operand]) => match convert_target(&method.name) {
                Some(target) => (operand, target),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };

        if operand.type_mapping().kind == target && operand.explicit_mapping().is_some() {
            return Ok(Some(operand.clone()));
        }
        Ok(Some(factory.convert(operand.clone(), factory.mapping_for(target))))
    }
}
