//! SQL text generation for [`SqlExpr`] trees
//!
//! Parenthesization rules:
//! - AND/OR are always wrapped: `(a AND b)`
//! - comparisons and arithmetic render bare; operands that are themselves
//!   operators get wrapped
//! - sentinels render as `1 = 1` / `1 = 0`

use regex::Regex;
use std::sync::LazyLock;

use super::{CaseExpr, InValues, SqlExpr, SqlFunction, SqlUnaryOp};
use crate::config::TranslatorConfig;

/// Identifiers matching this pattern are written without quotes.
static PLAIN_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Rendered SQL fragment with the parameters it references, in order of first use.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RenderedSql {
    pub sql: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SqlRenderer {
    parameter_prefix: String,
    qualify_columns: bool,
}

impl Default for SqlRenderer {
    fn default() -> Self {
        SqlRenderer {
            parameter_prefix: "@".to_string(),
            qualify_columns: true,
        }
    }
}

impl SqlRenderer {
    pub fn new(parameter_prefix: impl Into<String>, qualify_columns: bool) -> Self {
        SqlRenderer {
            parameter_prefix: parameter_prefix.into(),
            qualify_columns,
        }
    }

    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self::new(config.parameter_prefix.clone(), config.qualify_columns)
    }

    pub fn render(&self, expr: &SqlExpr) -> RenderedSql {
        let mut parameters = Vec::new();
        let sql = self.render_expr(expr, &mut parameters);
        RenderedSql { sql, parameters }
    }

    fn render_expr(&self, expr: &SqlExpr, params: &mut Vec<String>) -> String {
        match expr {
            SqlExpr::Column(column) => {
                if self.qualify_columns && !column.table_alias.is_empty() {
                    format!(
                        "{}.{}",
                        quote_identifier(&column.table_alias),
                        quote_identifier(&column.name)
                    )
                } else {
                    quote_identifier(&column.name)
                }
            }
            SqlExpr::Constant(constant) => {
                constant.type_mapping.generate_sql_literal(&constant.value)
            }
            SqlExpr::Parameter(parameter) => {
                if !params.contains(&parameter.name) {
                    params.push(parameter.name.clone());
                }
                format!("{}{}", self.parameter_prefix, parameter.name)
            }
            SqlExpr::Unary { op, operand, .. } => {
                let inner = self.render_operand(operand, params);
                match op {
                    SqlUnaryOp::Not if matches!(**operand, SqlExpr::Case(_)) => {
                        format!("NOT ({})", inner)
                    }
                    SqlUnaryOp::Not => format!("NOT {}", inner),
                    // `--` would start a line comment
                    SqlUnaryOp::Negate if inner.starts_with('-') => format!("-({})", inner),
                    SqlUnaryOp::Negate => format!("-{}", inner),
                    SqlUnaryOp::IsNull => format!("{} IS NULL", inner),
                    SqlUnaryOp::IsNotNull => format!("{} IS NOT NULL", inner),
                }
            }
            SqlExpr::Binary {
                op, left, right, ..
            } => {
                if op.is_logical() {
                    // AND/OR operands bind tighter than the connective itself
                    let l = self.render_expr(left, params);
                    let r = self.render_expr(right, params);
                    format!("({} {} {})", l, op.symbol(), r)
                } else {
                    let l = self.render_operand(left, params);
                    let r = self.render_operand(right, params);
                    format!("{} {} {}", l, op.symbol(), r)
                }
            }
            SqlExpr::Convert {
                operand,
                type_mapping,
            } => {
                let inner = self.render_expr(operand, params);
                format!("CAST({} AS {})", inner, type_mapping.store_type)
            }
            SqlExpr::Function(function) => self.render_function(function, params),
            SqlExpr::Case(case) => self.render_case(case, params),
            SqlExpr::Like {
                match_expr,
                pattern,
                escape,
                ..
            } => {
                let mut sql = format!(
                    "{} LIKE {}",
                    self.render_operand(match_expr, params),
                    self.render_operand(pattern, params)
                );
                if let Some(escape) = escape {
                    sql.push_str(" ESCAPE ");
                    sql.push_str(&self.render_operand(escape, params));
                }
                sql
            }
            SqlExpr::In {
                item,
                values,
                negated,
                ..
            } => {
                let item = self.render_operand(item, params);
                let list = match values {
                    InValues::List(values) => values
                        .iter()
                        .map(|v| self.render_expr(v, params))
                        .collect::<Vec<_>>()
                        .join(", "),
                    InValues::Subquery(sql) => sql.clone(),
                };
                let keyword = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", item, keyword, list)
            }
            SqlExpr::Exists {
                subquery, negated, ..
            } => {
                let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
                format!("{} ({})", keyword, subquery)
            }
            SqlExpr::Sentinel { value, .. } => {
                if *value {
                    "1 = 1".to_string()
                } else {
                    "1 = 0".to_string()
                }
            }
        }
    }

    /// Render an operator operand, wrapping it when it is itself an operator.
    fn render_operand(&self, expr: &SqlExpr, params: &mut Vec<String>) -> String {
        let sql = self.render_expr(expr, params);
        if needs_parentheses(expr) {
            format!("({})", sql)
        } else {
            sql
        }
    }

    fn render_function(&self, function: &SqlFunction, params: &mut Vec<String>) -> String {
        if function.niladic {
            return function.name.clone();
        }
        let args: Vec<String> = function
            .args
            .iter()
            .map(|a| self.render_expr(a, params))
            .collect();
        format!("{}({})", function.name, args.join(", "))
    }

    fn render_case(&self, case: &CaseExpr, params: &mut Vec<String>) -> String {
        let mut sql = String::from("CASE");
        if let Some(operand) = &case.operand {
            sql.push(' ');
            sql.push_str(&self.render_expr(operand, params));
        }
        for when in &case.whens {
            sql.push_str(" WHEN ");
            sql.push_str(&self.render_expr(&when.test, params));
            sql.push_str(" THEN ");
            sql.push_str(&self.render_expr(&when.result, params));
        }
        if let Some(else_result) = &case.else_result {
            sql.push_str(" ELSE ");
            sql.push_str(&self.render_expr(else_result, params));
        }
        sql.push_str(" END");
        sql
    }
}

fn needs_parentheses(expr: &SqlExpr) -> bool {
    match expr {
        // AND/OR already carry their own parentheses
        SqlExpr::Binary { op, .. } => !op.is_logical(),
        SqlExpr::Unary { op, .. } => !matches!(op, SqlUnaryOp::Negate),
        SqlExpr::Like { .. } | SqlExpr::In { .. } | SqlExpr::Sentinel { .. } => true,
        SqlExpr::Exists { negated, .. } => *negated,
        _ => false,
    }
}

/// Quote an identifier unless it is a plain word.
pub fn quote_identifier(name: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}
