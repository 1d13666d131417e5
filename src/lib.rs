//! exprsql - Object-query to SQL expression translation
//!
//! This crate turns typed object-query expression trees into SQL expression
//! trees through:
//! - A type mapping registry that reconciles operand store types
//! - A SQL expression factory that builds type-checked, simplified nodes
//! - Pluggable member and method-call translators per dialect
//! - Null-semantics rewriting so SQL comparisons agree with source semantics
//! - Client-evaluation fallback for untranslatable fragments

pub mod config;
pub mod model;
pub mod query_expr;
pub mod sql_expr;
pub mod sql_factory;
pub mod translators;
pub mod type_mapping;
pub mod value;
pub mod visitor;

pub use config::{SqlDialect, TranslatorConfig};
pub use model::{ModelMetadata, StaticModel};
pub use query_expr::{BinaryOp, ExprType, QueryExpr};
pub use sql_expr::{RenderedSql, SqlExpr, SqlRenderer};
pub use sql_factory::SqlExpressionFactory;
pub use value::Value;
pub use visitor::{
    SqlContext, SqlTranslatingVisitor, TranslationEnv, TranslationError, TranslatorBuilder,
};
