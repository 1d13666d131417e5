//! SQL expression tree
//!
//! Output of translation. Every node carries the [`TypeMapping`] it was built
//! with, so the renderer can write literals and CASTs without any further
//! lookups. Nodes are constructed through
//! [`SqlExpressionFactory`](crate::sql_factory::SqlExpressionFactory), which
//! keeps operand mappings consistent.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::type_mapping::TypeMapping;
use crate::value::Value;

pub mod render;

pub use render::{RenderedSql, SqlRenderer};

/// How a constant or parameter obtained its type mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingOrigin {
    /// Set by the model or by a translator; never overridden
    Explicit,
    /// Default for the value kind; replaced by the other operand's mapping
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnExpr {
    pub name: String,
    pub table_alias: String,
    pub type_mapping: TypeMapping,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlConstant {
    pub value: Value,
    pub type_mapping: TypeMapping,
    pub origin: MappingOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    pub type_mapping: TypeMapping,
    pub origin: MappingOrigin,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlFunction {
    pub name: String,
    pub args: Vec<SqlExpr>,
    pub type_mapping: TypeMapping,
    /// Result nullability, decided when the function was built
    pub nullable: bool,
    /// Rendered without parentheses, e.g. `CURRENT_TIMESTAMP`
    pub niladic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseWhen {
    pub test: SqlExpr,
    pub result: SqlExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExpr {
    /// Simple CASE operand; `None` for searched CASE
    pub operand: Option<Box<SqlExpr>>,
    pub whens: Vec<CaseWhen>,
    pub else_result: Option<Box<SqlExpr>>,
    pub type_mapping: TypeMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InValues {
    List(Vec<SqlExpr>),
    /// Pre-rendered subquery SQL
    Subquery(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlUnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlBinaryOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

impl SqlBinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            SqlBinaryOp::Equal
                | SqlBinaryOp::NotEqual
                | SqlBinaryOp::LessThan
                | SqlBinaryOp::LessThanOrEqual
                | SqlBinaryOp::GreaterThan
                | SqlBinaryOp::GreaterThanOrEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, SqlBinaryOp::And | SqlBinaryOp::Or)
    }

    /// Comparison that holds exactly when `self` is false, for non-null operands.
    pub fn negated(self) -> Option<SqlBinaryOp> {
        match self {
            SqlBinaryOp::Equal => Some(SqlBinaryOp::NotEqual),
            SqlBinaryOp::NotEqual => Some(SqlBinaryOp::Equal),
            SqlBinaryOp::LessThan => Some(SqlBinaryOp::GreaterThanOrEqual),
            SqlBinaryOp::LessThanOrEqual => Some(SqlBinaryOp::GreaterThan),
            SqlBinaryOp::GreaterThan => Some(SqlBinaryOp::LessThanOrEqual),
            SqlBinaryOp::GreaterThanOrEqual => Some(SqlBinaryOp::LessThan),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            SqlBinaryOp::Equal => "=",
            SqlBinaryOp::NotEqual => "<>",
            SqlBinaryOp::LessThan => "<",
            SqlBinaryOp::LessThanOrEqual => "<=",
            SqlBinaryOp::GreaterThan => ">",
            SqlBinaryOp::GreaterThanOrEqual => ">=",
            SqlBinaryOp::And => "AND",
            SqlBinaryOp::Or => "OR",
            SqlBinaryOp::Add => "+",
            SqlBinaryOp::Subtract => "-",
            SqlBinaryOp::Multiply => "*",
            SqlBinaryOp::Divide => "/",
            SqlBinaryOp::Modulo => "%",
            SqlBinaryOp::Concat => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlExpr {
    Column(ColumnExpr),
    Constant(SqlConstant),
    Parameter(SqlParameter),
    Unary {
        op: SqlUnaryOp,
        operand: Box<SqlExpr>,
        type_mapping: TypeMapping,
    },
    Binary {
        op: SqlBinaryOp,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
        type_mapping: TypeMapping,
    },
    /// `CAST(operand AS store_type)`
    Convert {
        operand: Box<SqlExpr>,
        type_mapping: TypeMapping,
    },
    Function(SqlFunction),
    Case(CaseExpr),
    Like {
        match_expr: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
        escape: Option<Box<SqlExpr>>,
        type_mapping: TypeMapping,
    },
    In {
        item: Box<SqlExpr>,
        values: InValues,
        negated: bool,
        type_mapping: TypeMapping,
    },
    Exists {
        subquery: String,
        negated: bool,
        type_mapping: TypeMapping,
    },
    /// Condition already known to be always true or always false
    Sentinel {
        value: bool,
        type_mapping: TypeMapping,
    },
}

impl SqlExpr {
    pub fn type_mapping(&self) -> &TypeMapping {
        match self {
            SqlExpr::Column(c) => &c.type_mapping,
            SqlExpr::Constant(c) => &c.type_mapping,
            SqlExpr::Parameter(p) => &p.type_mapping,
            SqlExpr::Function(f) => &f.type_mapping,
            SqlExpr::Case(c) => &c.type_mapping,
            SqlExpr::Unary { type_mapping, .. }
            | SqlExpr::Binary { type_mapping, .. }
            | SqlExpr::Convert { type_mapping, .. }
            | SqlExpr::Like { type_mapping, .. }
            | SqlExpr::In { type_mapping, .. }
            | SqlExpr::Exists { type_mapping, .. }
            | SqlExpr::Sentinel { type_mapping, .. } => type_mapping,
        }
    }

    /// Mapping that must be respected by the other operand of an operator.
    ///
    /// Constants and parameters with an inferred mapping return `None`: they
    /// take whatever mapping the other side dictates.
    pub fn explicit_mapping(&self) -> Option<&TypeMapping> {
        match self {
            SqlExpr::Constant(SqlConstant {
                origin: MappingOrigin::Inferred,
                ..
            })
            | SqlExpr::Parameter(SqlParameter {
                origin: MappingOrigin::Inferred,
                ..
            }) => None,
            other => Some(other.type_mapping()),
        }
    }

    /// Whether the expression can evaluate to NULL in SQL.
    pub fn is_nullable(&self) -> bool {
        match self {
            SqlExpr::Column(c) => c.nullable,
            SqlExpr::Constant(c) => c.value.is_null(),
            SqlExpr::Parameter(p) => p.nullable,
            SqlExpr::Unary { op, operand, .. } => match op {
                SqlUnaryOp::IsNull | SqlUnaryOp::IsNotNull => false,
                SqlUnaryOp::Not | SqlUnaryOp::Negate => operand.is_nullable(),
            },
            SqlExpr::Binary {
                op, left, right, ..
            } if op.is_logical() => connective_is_nullable(*op, left, right),
            SqlExpr::Binary { left, right, .. } => left.is_nullable() || right.is_nullable(),
            SqlExpr::Convert { operand, .. } => operand.is_nullable(),
            SqlExpr::Function(f) => f.nullable,
            SqlExpr::Case(c) => {
                c.else_result.as_ref().map_or(true, |e| e.is_nullable())
                    || c.whens.iter().any(|w| w.result.is_nullable())
            }
            SqlExpr::Like {
                match_expr,
                pattern,
                escape,
                ..
            } => {
                match_expr.is_nullable()
                    || pattern.is_nullable()
                    || escape.as_ref().is_some_and(|e| e.is_nullable())
            }
            SqlExpr::In { item, values, .. } => {
                item.is_nullable()
                    || match values {
                        InValues::List(values) => values.iter().any(|v| v.is_nullable()),
                        InValues::Subquery(_) => true,
                    }
            }
            SqlExpr::Exists { .. } | SqlExpr::Sentinel { .. } => false,
        }
    }

    pub fn as_sentinel(&self) -> Option<bool> {
        match self {
            SqlExpr::Sentinel { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(self, SqlExpr::Constant(SqlConstant { value: Value::Null, .. }))
    }
}

/// Operand whose NULL-ness a connective can test for.
#[derive(Debug, PartialEq)]
enum NullSource<'a> {
    Column(&'a str, &'a str),
    Parameter(&'a str),
}

fn null_source(expr: &SqlExpr) -> Option<NullSource<'_>> {
    match expr {
        SqlExpr::Column(c) => Some(NullSource::Column(&c.table_alias, &c.name)),
        SqlExpr::Parameter(p) => Some(NullSource::Parameter(&p.name)),
        _ => None,
    }
}

/// An AND chain containing `x IS NOT NULL` is FALSE whenever `x` is NULL; an
/// OR chain containing `x IS NULL` is TRUE. The chain is nullable only if some
/// nullable term depends on an operand it does not check that way.
fn connective_is_nullable(op: SqlBinaryOp, left: &SqlExpr, right: &SqlExpr) -> bool {
    let mut terms = Vec::new();
    collect_terms(op, left, &mut terms);
    collect_terms(op, right, &mut terms);

    let guard = if op == SqlBinaryOp::And {
        SqlUnaryOp::IsNotNull
    } else {
        SqlUnaryOp::IsNull
    };
    let checked: Vec<NullSource<'_>> = terms
        .iter()
        .copied()
        .filter_map(|term| match term {
            SqlExpr::Unary {
                op, operand, ..
            } if *op == guard => null_source(operand),
            _ => None,
        })
        .collect();

    terms.iter().copied().filter(|term| term.is_nullable()).any(|term| {
        let mut sources = Vec::new();
        !collect_null_sources(term, &mut sources)
            || sources.iter().any(|source| !checked.contains(source))
    })
}

fn collect_terms<'a>(op: SqlBinaryOp, expr: &'a SqlExpr, terms: &mut Vec<&'a SqlExpr>) {
    match expr {
        SqlExpr::Binary {
            op: inner,
            left,
            right,
            ..
        } if *inner == op => {
            collect_terms(op, left, terms);
            collect_terms(op, right, terms);
        }
        other => terms.push(other),
    }
}

/// Collects the nullable columns and parameters `expr` can only be NULL through.
///
/// Returns `false` when NULL may also come from elsewhere (a NULL literal, a
/// function, a CASE branch, a subquery).
fn collect_null_sources<'a>(expr: &'a SqlExpr, sources: &mut Vec<NullSource<'a>>) -> bool {
    match expr {
        SqlExpr::Column(_) | SqlExpr::Parameter(_) => {
            if expr.is_nullable() {
                sources.extend(null_source(expr));
            }
            true
        }
        SqlExpr::Constant(c) => !c.value.is_null(),
        SqlExpr::Sentinel { .. } | SqlExpr::Exists { .. } => true,
        SqlExpr::Unary {
            op: SqlUnaryOp::IsNull | SqlUnaryOp::IsNotNull,
            ..
        } => true,
        SqlExpr::Unary { operand, .. } | SqlExpr::Convert { operand, .. } => {
            collect_null_sources(operand, sources)
        }
        SqlExpr::Binary { left, right, .. } => {
            collect_null_sources(left, sources) && collect_null_sources(right, sources)
        }
        SqlExpr::Like {
            match_expr,
            pattern,
            escape,
            ..
        } => {
            collect_null_sources(match_expr, sources)
                && collect_null_sources(pattern, sources)
                && escape
                    .as_ref()
                    .map_or(true, |e| collect_null_sources(e, sources))
        }
        SqlExpr::Function(_) | SqlExpr::Case(_) | SqlExpr::In { .. } => !expr.is_nullable(),
    }
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&SqlRenderer::default().render(self).sql)
    }
}
