//! Pluggable member and method-call translators
//!
//! A translator either claims a node by returning `Ok(Some(sql))` or declines
//! with `Ok(None)`; declining is never an error. `Err` is reserved for type
//! mapping conflicts raised by the factory, which abort the translation.
//!
//! Translators are stateless and shared across threads. Providers try them
//! in registration order and stop at the first claim.

use crate::query_expr::{ExprType, MemberInfo, MethodSignature};
use crate::sql_expr::SqlExpr;
use crate::sql_factory::SqlExpressionFactory;
use crate::type_mapping::TypeMappingConflict;
use crate::visitor::TranslationEnv;

pub mod collection;
pub mod convert;
pub mod datetime;
pub mod math;
pub mod nullable;
pub mod provider;
pub mod sqlite;
pub mod string;

pub use collection::CollectionContainsTranslator;
pub use convert::ConvertTranslator;
pub use datetime::DateTimeMemberTranslator;
pub use math::MathTranslator;
pub use nullable::NullableMemberTranslator;
pub use provider::{MemberTranslatorProvider, MethodCallTranslatorProvider};
pub use sqlite::{SqliteDateTimeMemberTranslator, SqliteStringMethodTranslator};
pub use string::{StringMemberTranslator, StringMethodTranslator};

pub type TranslatorResult = Result<Option<SqlExpr>, TypeMappingConflict>;

pub trait MemberTranslator: Send + Sync {
    /// `instance` is `None` for static members such as `DateTime.Now`.
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        member: &MemberInfo,
        result_type: &ExprType,
        factory: &SqlExpressionFactory,
        env: &TranslationEnv<'_>,
    ) -> TranslatorResult;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub trait MethodCallTranslator: Send + Sync {
    /// `args` are already translated and match the declared parameter count.
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodSignature,
        args: &[SqlExpr],
        factory: &SqlExpressionFactory,
        env: &TranslationEnv<'_>,
    ) -> TranslatorResult;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
