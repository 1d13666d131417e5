//! Table-driven translation of `Math.*` static methods
//!
//! Each entry names the SQL function, the accepted arities and how the result
//! mapping is derived. Dialects with different spellings carry an override.

use std::collections::HashMap;

use super::{MethodCallTranslator, TranslatorResult};
use crate::config::SqlDialect;
use crate::query_expr::{DeclaringType, MethodSignature};
use crate::sql_expr::SqlExpr;
use crate::sql_factory::{NullabilityRule, SqlExpressionFactory};
use crate::type_mapping::ScalarKind;
use crate::visitor::TranslationEnv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathResult {
    /// Common mapping of the arguments (`Abs`, `Max`, ...)
    SameAsArguments,
    /// Registry mapping of a fixed kind (`Sqrt` is always double)
    Fixed(ScalarKind),
}

/// Math function mapping entry
#[derive(Debug, Clone)]
pub struct MathFunction {
    pub sql_name: &'static str,
    pub sqlite_name: Option<&'static str>,
    pub arities: &'static [usize],
    pub result: MathResult,
}

impl MathFunction {
    fn name_for(&self, dialect: SqlDialect) -> &'static str {
        match dialect {
            SqlDialect::Sqlite => self.sqlite_name.unwrap_or(self.sql_name),
            SqlDialect::Generic => self.sql_name,
        }
    }
}

/// Look up the mapping for a `Math` method name.
pub fn get_math_function(name: &str) -> Option<&'static MathFunction> {
    MATH_FUNCTIONS.get(name)
}

lazy_static::lazy_static! {
    static ref MATH_FUNCTIONS: HashMap<&'static str, MathFunction> = {
        use MathResult::*;
        let mut m = HashMap::new();

        // ===== SAME TYPE AS INPUT =====
        m.insert("Abs", MathFunction { sql_name: "abs", sqlite_name: None, arities: &[1], result: SameAsArguments });
        m.insert("Ceiling", MathFunction { sql_name: "ceiling", sqlite_name: Some("ceil"), arities: &[1], result: SameAsArguments });
        m.insert("Floor", MathFunction { sql_name: "floor", sqlite_name: None, arities: &[1], result: SameAsArguments });
        m.insert("Round", MathFunction { sql_name: "round", sqlite_name: None, arities: &[1, 2], result: SameAsArguments });
        m.insert("Max", MathFunction { sql_name: "greatest", sqlite_name: Some("max"), arities: &[2], result: SameAsArguments });
        m.insert("Min", MathFunction { sql_name: "least", sqlite_name: Some("min"), arities: &[2], result: SameAsArguments });

        // ===== ALWAYS DOUBLE =====
        m.insert("Sqrt", MathFunction { sql_name: "sqrt", sqlite_name: None, arities: &[1], result: Fixed(ScalarKind::Double) });
        m.insert("Pow", MathFunction { sql_name: "power", sqlite_name: Some("pow"), arities: &[2], result: Fixed(ScalarKind::Double) });
        m.insert("Exp", MathFunction { sql_name: "exp", sqlite_name: None, arities: &[1], result: Fixed(ScalarKind::Double) });
        m.insert("Log", MathFunction { sql_name: "ln", sqlite_name: None, arities: &[1], result: Fixed(ScalarKind::Double) });
        m.insert("Log10", MathFunction { sql_name: "log10", sqlite_name: None, arities: &[1], result: Fixed(ScalarKind::Double) });
        m.insert("Sin", MathFunction { sql_name: "sin", sqlite_name: None, arities: &[1], result: Fixed(ScalarKind::Double) });
        m.insert("Cos", MathFunction { sql_name: "cos", sqlite_name: None, arities: &[1], result: Fixed(ScalarKind::Double) });
        m.insert("Tan", MathFunction { sql_name: "tan", sqlite_name: None, arities: &[1], result: Fixed(ScalarKind::Double) });

        // ===== INTEGER =====
        m.insert("Sign", MathFunction { sql_name: "sign", sqlite_name: None, arities: &[1], result: Fixed(ScalarKind::Int32) });

        m
    };
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MathTranslator {
    dialect: SqlDialect,
}

impl MathTranslator {
    pub fn new(dialect: SqlDialect) -> Self {
        MathTranslator { dialect }
    }
}

impl MethodCallTranslator for MathTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodSignature,
        args: &[SqlExpr],
        factory: &SqlExpressionFactory,
        _env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        if method.declaring_type != DeclaringType::Math || instance.is_some() {
            return Ok(None);
        }
        let Some(function) = get_math_function(&method.name) else {
            return Ok(None);
        };
        if !function.arities.contains(&args.len()) {
            return Ok(None);
        }

        let (args, return_mapping) = match function.result {
            MathResult::Fixed(kind) => (args.to_vec(), factory.mapping_for(kind)),
            MathResult::SameAsArguments if method.name == "Round" => {
                // Digits argument does not take part in the result type
                let mapping = args[0].type_mapping().clone();
                (args.to_vec(), mapping)
            }
            MathResult::SameAsArguments => {
                let (args, mapping) = factory.infer_common_mapping(args.to_vec())?;
                let mapping = mapping.unwrap_or_else(|| factory.mapping_for(ScalarKind::Double));
                (args, mapping)
            }
        };

        Ok(Some(factory.function(
            function.name_for(self.dialect),
            args,
            return_mapping,
            NullabilityRule::AnyArgument,
        )))
    }
}
