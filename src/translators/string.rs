//! String members and methods
//!
//! `Contains`/`StartsWith`/`EndsWith` become `LIKE` with escaped patterns:
//! - constant argument: the pattern is escaped at translation time
//! - parameter argument: the pattern is escaped in SQL with nested `replace`
//! - any other argument shape: declined
use super::{MemberTranslator, MethodCallTranslator, TranslatorResult};
use crate::query_expr::{DeclaringType, ExprType, MemberInfo, MethodSignature};
use crate::sql_expr::{SqlConstant, SqlExpr};
use crate::sql_factory::{NullabilityRule, SqlExpressionFactory};
use crate::type_mapping::{ScalarKind, TypeMappingConflict};
use crate::value::Value;
use crate::visitor::TranslationEnv;

pub const LIKE_ESCAPE_CHAR: char = '\\';

/// Escape `%`, `_` and the escape character itself for use in a LIKE pattern.
pub fn escape_like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE_CHAR {
            escaped.push(LIKE_ESCAPE_CHAR);
        }
        escaped.push(c);
    }
    escaped
}

/// `String.Length`
#[derive(Debug, Default, Clone, Copy)]
pub struct StringMemberTranslator;

impl MemberTranslator for StringMemberTranslator {
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
                    "length",
                    vec![instance.clone()],
                    factory.mapping_for(ScalarKind::Int32),
                    NullabilityRule::AnyArgument,
                )))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeKind {
    Contains,
    StartsWith,
    EndsWith,
}

impl LikeKind {
    fn wrap(self, escaped: &str) -> String {
        match self {
            LikeKind::Contains => format!("%{}%", escaped),
            LikeKind::StartsWith => format!("{}%", escaped),
            LikeKind::EndsWith => format!("%{}", escaped),
        }
    }
}

/// Instance and static methods of `String`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringMethodTranslator;

impl StringMethodTranslator {
    fn translate_like(
        &self,
        kind: LikeKind,
        instance: &SqlExpr,
        argument: &SqlExpr,
        factory: &SqlExpressionFactory,
    ) -> TranslatorResult {
        let escape = || factory.constant(Value::String(LIKE_ESCAPE_CHAR.to_string()), ScalarKind::String);

        match argument {
            SqlExpr::Constant(SqlConstant {
                value: Value::String(s),
                ..
            }) => {
                let escaped = escape_like_pattern(s);
                let needs_escape = escaped.len() != s.len();
                let pattern = factory.constant(Value::String(kind.wrap(&escaped)), ScalarKind::String);
                let like = factory.like(
                    instance.clone(),
                    pattern,
                    needs_escape.then(escape),
                )?;
                Ok(Some(like))
            }
            SqlExpr::Parameter(_) => {
                let escaped = escape_in_sql(argument.clone(), factory);
                let percent = || factory.constant(Value::String("%".to_string()), ScalarKind::String);
                let pattern = match kind {
                    LikeKind::Contains => factory.concat(factory.concat(percent(), escaped)?, percent())?,
                    LikeKind::StartsWith => factory.concat(escaped, percent())?,
                    LikeKind::EndsWith => factory.concat(percent(), escaped)?,
                };
                Ok(Some(factory.like(instance.clone(), pattern, Some(escape()))?))
            }
            _ => Ok(None),
        }
    }
}

/// `replace(replace(replace(x, '\', '\\'), '%', '\%'), '_', '\_')`
fn escape_in_sql(value: SqlExpr, factory: &SqlExpressionFactory) -> SqlExpr {
    let text = factory.mapping_for(ScalarKind::String);
    let mut escaped = value;
    for special in [LIKE_ESCAPE_CHAR, '%', '_'] {
        let from = factory.constant(Value::String(special.to_string()), ScalarKind::String);
        let to = factory.constant(
            Value::String(format!("{}{}", LIKE_ESCAPE_CHAR, special)),
            ScalarKind::String,
        );
        escaped = factory.function(
            "replace",
            vec![escaped, from, to],
            text.clone(),
            NullabilityRule::AnyArgument,
        );
    }
    escaped
}

/// `start + 1`, folded when `start` is a constant.
///
/// `None` when the constant start has no one-based position.
fn one_based(
    start: &SqlExpr,
    factory: &SqlExpressionFactory,
) -> Result<Option<SqlExpr>, TypeMappingConflict> {
    match start {
        SqlExpr::Constant(SqlConstant {
            value: Value::Int(i),
            type_mapping,
            ..
        }) => Ok(i
            .checked_add(1)
            .map(|i| factory.constant_with_mapping(Value::Int(i), type_mapping.clone()))),
        other => factory
            .add(
                other.clone(),
                factory.constant(Value::Int(1), ScalarKind::Int32),
            )
            .map(Some),
    }
}

impl MethodCallTranslator for StringMethodTranslator {
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

        let Some(instance) = instance else {
            return match (method.name.as_str(), args) {
                ("IsNullOrEmpty", [value]) => {
                    let empty = factory.constant(Value::String(String::new()), ScalarKind::String);
                    let is_empty = factory.equal(value.clone(), empty)?;
                    Ok(Some(factory.or_else(factory.is_null(value.clone()), is_empty)))
                }
                _ => Ok(None),
            };
        };

        let mapping = instance.type_mapping().clone();
        let unary = |name: &str| {
            Some(factory.function(
                name,
                vec![instance.clone()],
                mapping.clone(),
                NullabilityRule::AnyArgument,
            ))
        };

        match (method.name.as_str(), args) {
            ("Contains", [arg]) => self.translate_like(LikeKind::Contains, instance, arg, factory),
            ("StartsWith", [arg]) => {
                self.translate_like(LikeKind::StartsWith, instance, arg, factory)
            }
            ("EndsWith", [arg]) => self.translate_like(LikeKind::EndsWith, instance, arg, factory),
            ("ToUpper", []) => Ok(unary("upper")),
            ("ToLower", []) => Ok(unary("lower")),
            ("Trim", []) => Ok(unary("trim")),
            ("TrimStart", []) => Ok(unary("ltrim")),
            ("TrimEnd", []) => Ok(unary("rtrim")),
            ("Replace", [from, to]) => Ok(Some(factory.function(
                "replace",
                vec![instance.clone(), from.clone(), to.clone()],
                mapping.clone(),
                NullabilityRule::AnyArgument,
            ))),
            ("Substring", [start]) => Ok(one_based(start, factory)?.map(|start| {
                factory.function(
                    "substr",
                    vec![instance.clone(), start],
                    mapping.clone(),
                    NullabilityRule::AnyArgument,
                )
            })),
            ("Substring", [start, length]) => Ok(one_based(start, factory)?.map(|start| {
                factory.function(
                    "substr",
                    vec![instance.clone(), start, length.clone()],
                    mapping.clone(),
                    NullabilityRule::AnyArgument,
                )
            })),
            ("IndexOf", [needle]) => {
                let int = factory.mapping_for(ScalarKind::Int32);
                let position = factory.function(
                    "instr",
                    vec![instance.clone(), needle.clone()],
                    int,
                    NullabilityRule::AnyArgument,
                );
                let one = factory.constant(Value::Int(1), ScalarKind::Int32);
                Ok(Some(factory.subtract(position, one)?))
            }
            _ => Ok(None),
        }
    }
}
