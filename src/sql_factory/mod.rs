//! Construction of well-typed SQL expression nodes
//!
//! [`SqlExpressionFactory`] is the only place that builds operator nodes. It
//! resolves operand type mappings, re-types inferred constants and parameters
//! to match the other operand, computes result nullability and applies the
//! simplifications that are safe under three-valued logic.

use std::sync::Arc;

use crate::sql_expr::{
    CaseExpr, CaseWhen, ColumnExpr, InValues, MappingOrigin, SqlBinaryOp, SqlConstant, SqlExpr,
    SqlFunction, SqlParameter, SqlUnaryOp,
};
use crate::type_mapping::{ScalarKind, TypeMapping, TypeMappingConflict, TypeMappingSource};
use crate::value::Value;

/// How a function result's nullability follows from its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NullabilityRule {
    /// Never NULL (e.g. `CURRENT_TIMESTAMP`)
    Never,
    /// NULL when any argument is NULL
    AnyArgument,
    /// NULL when any of the listed arguments is NULL
    Arguments(Vec<usize>),
    /// May be NULL regardless of its arguments
    Always,
}

impl NullabilityRule {
    fn evaluate(&self, args: &[SqlExpr]) -> bool {
        match self {
            NullabilityRule::Never => false,
            NullabilityRule::Always => true,
            NullabilityRule::AnyArgument => args.iter().any(SqlExpr::is_nullable),
            NullabilityRule::Arguments(indices) => indices
                .iter()
                .filter_map(|i| args.get(*i))
                .any(SqlExpr::is_nullable),
        }
    }
}

pub struct SqlExpressionFactory {
    type_mappings: Arc<dyn TypeMappingSource>,
    bool_mapping: TypeMapping,
}

impl std::fmt::Debug for SqlExpressionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlExpressionFactory")
            .field("bool_mapping", &self.bool_mapping)
            .finish_non_exhaustive()
    }
}

impl SqlExpressionFactory {
    pub fn new(type_mappings: Arc<dyn TypeMappingSource>) -> Self {
        let bool_mapping = type_mappings.mapping_for(ScalarKind::Bool);
        SqlExpressionFactory {
            type_mappings,
            bool_mapping,
        }
    }

    pub fn type_mappings(&self) -> &dyn TypeMappingSource {
        self.type_mappings.as_ref()
    }

    pub fn bool_mapping(&self) -> &TypeMapping {
        &self.bool_mapping
    }

    pub fn mapping_for(&self, kind: ScalarKind) -> TypeMapping {
        self.type_mappings.mapping_for(kind)
    }

    // ------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------

    /// Literal with the registry's default mapping for `kind`, open to re-typing.
    pub fn constant(&self, value: Value, kind: ScalarKind) -> SqlExpr {
        SqlExpr::Constant(SqlConstant {
            value,
            type_mapping: self.mapping_for(kind),
            origin: MappingOrigin::Inferred,
        })
    }

    pub fn constant_with_mapping(&self, value: Value, type_mapping: TypeMapping) -> SqlExpr {
        SqlExpr::Constant(SqlConstant {
            value,
            type_mapping,
            origin: MappingOrigin::Explicit,
        })
    }

    pub fn parameter(&self, name: impl Into<String>, kind: ScalarKind, nullable: bool) -> SqlExpr {
        SqlExpr::Parameter(SqlParameter {
            name: name.into(),
            type_mapping: self.mapping_for(kind),
            origin: MappingOrigin::Inferred,
            nullable,
        })
    }

    pub fn column(
        &self,
        name: impl Into<String>,
        table_alias: impl Into<String>,
        type_mapping: TypeMapping,
        nullable: bool,
    ) -> SqlExpr {
        SqlExpr::Column(ColumnExpr {
            name: name.into(),
            table_alias: table_alias.into(),
            type_mapping,
            nullable,
        })
    }

    pub fn sentinel(&self, value: bool) -> SqlExpr {
        SqlExpr::Sentinel {
            value,
            type_mapping: self.bool_mapping.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Type mapping resolution
    // ------------------------------------------------------------------

    /// Give an inferred constant or parameter the supplied mapping.
    ///
    /// Nodes with an explicit mapping are returned unchanged.
    pub fn apply_type_mapping(&self, expr: SqlExpr, type_mapping: &TypeMapping) -> SqlExpr {
        match expr {
            SqlExpr::Constant(mut constant) if constant.origin == MappingOrigin::Inferred => {
                constant.type_mapping = type_mapping.clone();
                constant.origin = MappingOrigin::Explicit;
                SqlExpr::Constant(constant)
            }
            SqlExpr::Parameter(mut parameter) if parameter.origin == MappingOrigin::Inferred => {
                parameter.type_mapping = type_mapping.clone();
                parameter.origin = MappingOrigin::Explicit;
                SqlExpr::Parameter(parameter)
            }
            SqlExpr::Unary {
                op: SqlUnaryOp::Negate,
                operand,
                ..
            } => {
                let operand = self.apply_type_mapping(*operand, type_mapping);
                SqlExpr::Unary {
                    op: SqlUnaryOp::Negate,
                    operand: Box::new(operand),
                    type_mapping: type_mapping.clone(),
                }
            }
            other => other,
        }
    }

    /// Freeze an inferred mapping as-is, e.g. for a bare projected parameter.
    pub fn apply_default_type_mapping(&self, expr: SqlExpr) -> SqlExpr {
        match expr.explicit_mapping() {
            Some(_) => expr,
            None => {
                let mapping = expr.type_mapping().clone();
                self.apply_type_mapping(expr, &mapping)
            }
        }
    }

    /// Resolve the shared mapping of two operands, re-typing inferred sides.
    fn infer_operands(
        &self,
        left: SqlExpr,
        right: SqlExpr,
    ) -> Result<(SqlExpr, SqlExpr, TypeMapping), TypeMappingConflict> {
        let mapping = match (left.explicit_mapping(), right.explicit_mapping()) {
            (Some(l), Some(r)) => self.type_mappings.unify(l, r)?,
            (Some(l), None) => {
                self.check_compatible(l, &right)?;
                l.clone()
            }
            (None, Some(r)) => {
                self.check_compatible(r, &left)?;
                r.clone()
            }
            (None, None) => {
                if left.is_null_constant() {
                    right.type_mapping().clone()
                } else if right.is_null_constant() {
                    left.type_mapping().clone()
                } else {
                    self.type_mappings
                        .unify(left.type_mapping(), right.type_mapping())?
                }
            }
        };

        let left = self.apply_type_mapping(left, &mapping);
        let right = self.apply_type_mapping(right, &mapping);
        Ok((left, right, mapping))
    }

    /// An inferred operand can take `target` only if its own kind unifies with it.
    fn check_compatible(
        &self,
        target: &TypeMapping,
        inferred: &SqlExpr,
    ) -> Result<(), TypeMappingConflict> {
        if inferred.is_null_constant() {
            return Ok(());
        }
        self.type_mappings
            .unify(target, inferred.type_mapping())
            .map(|_| ())
            .map_err(|conflict| {
                log::debug!("Operand mapping conflict: {}", conflict);
                conflict
            })
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    fn comparison(
        &self,
        op: SqlBinaryOp,
        left: SqlExpr,
        right: SqlExpr,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        let (left, right, _) = self.infer_operands(left, right)?;
        Ok(SqlExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            type_mapping: self.bool_mapping.clone(),
        })
    }

    pub fn equal(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.comparison(SqlBinaryOp::Equal, left, right)
    }

    pub fn not_equal(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.comparison(SqlBinaryOp::NotEqual, left, right)
    }

    pub fn less_than(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.comparison(SqlBinaryOp::LessThan, left, right)
    }

    pub fn less_than_or_equal(
        &self,
        left: SqlExpr,
        right: SqlExpr,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        self.comparison(SqlBinaryOp::LessThanOrEqual, left, right)
    }

    pub fn greater_than(
        &self,
        left: SqlExpr,
        right: SqlExpr,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        self.comparison(SqlBinaryOp::GreaterThan, left, right)
    }

    pub fn greater_than_or_equal(
        &self,
        left: SqlExpr,
        right: SqlExpr,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        self.comparison(SqlBinaryOp::GreaterThanOrEqual, left, right)
    }

    /// Build any comparison operator by identity.
    pub fn compare(
        &self,
        op: SqlBinaryOp,
        left: SqlExpr,
        right: SqlExpr,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        debug_assert!(op.is_comparison());
        self.comparison(op, left, right)
    }

    // ------------------------------------------------------------------
    // Logical connectives
    // ------------------------------------------------------------------

    pub fn and_also(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        match (left.as_sentinel(), right.as_sentinel()) {
            (Some(false), _) | (_, Some(false)) => self.sentinel(false),
            (Some(true), _) => right,
            (_, Some(true)) => left,
            _ => SqlExpr::Binary {
                op: SqlBinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
                type_mapping: self.bool_mapping.clone(),
            },
        }
    }

    pub fn or_else(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        match (left.as_sentinel(), right.as_sentinel()) {
            (Some(true), _) | (_, Some(true)) => self.sentinel(true),
            (Some(false), _) => right,
            (_, Some(false)) => left,
            _ => SqlExpr::Binary {
                op: SqlBinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                type_mapping: self.bool_mapping.clone(),
            },
        }
    }

    /// Logical NOT with three-valued-safe simplifications only.
    pub fn not(&self, operand: SqlExpr) -> SqlExpr {
        match operand {
            SqlExpr::Sentinel { value, .. } => self.sentinel(!value),
            SqlExpr::Unary {
                op: SqlUnaryOp::Not,
                operand,
                ..
            } => *operand,
            SqlExpr::Unary {
                op: SqlUnaryOp::IsNull,
                operand,
                type_mapping,
            } => SqlExpr::Unary {
                op: SqlUnaryOp::IsNotNull,
                operand,
                type_mapping,
            },
            SqlExpr::Unary {
                op: SqlUnaryOp::IsNotNull,
                operand,
                type_mapping,
            } => SqlExpr::Unary {
                op: SqlUnaryOp::IsNull,
                operand,
                type_mapping,
            },
            SqlExpr::Binary {
                op: SqlBinaryOp::And,
                left,
                right,
                ..
            } => {
                let left = self.not(*left);
                let right = self.not(*right);
                self.or_else(left, right)
            }
            SqlExpr::Binary {
                op: SqlBinaryOp::Or,
                left,
                right,
                ..
            } => {
                let left = self.not(*left);
                let right = self.not(*right);
                self.and_also(left, right)
            }
            SqlExpr::Binary {
                op,
                left,
                right,
                type_mapping,
            } if op.negated().is_some() => SqlExpr::Binary {
                op: op.negated().unwrap_or(op),
                left,
                right,
                type_mapping,
            },
            SqlExpr::In {
                item,
                values,
                negated,
                type_mapping,
            } => SqlExpr::In {
                item,
                values,
                negated: !negated,
                type_mapping,
            },
            SqlExpr::Exists {
                subquery,
                negated,
                type_mapping,
            } => SqlExpr::Exists {
                subquery,
                negated: !negated,
                type_mapping,
            },
            other => SqlExpr::Unary {
                op: SqlUnaryOp::Not,
                operand: Box::new(other),
                type_mapping: self.bool_mapping.clone(),
            },
        }
    }

    /// `operand IS NULL`, folded to a sentinel when the answer is known.
    pub fn is_null(&self, operand: SqlExpr) -> SqlExpr {
        if operand.is_null_constant() {
            return self.sentinel(true);
        }
        if !operand.is_nullable() {
            return self.sentinel(false);
        }
        SqlExpr::Unary {
            op: SqlUnaryOp::IsNull,
            operand: Box::new(operand),
            type_mapping: self.bool_mapping.clone(),
        }
    }

    /// `operand IS NOT NULL`, folded to a sentinel when the answer is known.
    pub fn is_not_null(&self, operand: SqlExpr) -> SqlExpr {
        if operand.is_null_constant() {
            return self.sentinel(false);
        }
        if !operand.is_nullable() {
            return self.sentinel(true);
        }
        SqlExpr::Unary {
            op: SqlUnaryOp::IsNotNull,
            operand: Box::new(operand),
            type_mapping: self.bool_mapping.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Arithmetic
    // ------------------------------------------------------------------

    fn arithmetic(
        &self,
        op: SqlBinaryOp,
        left: SqlExpr,
        right: SqlExpr,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        let (left, right, type_mapping) = self.infer_operands(left, right)?;
        Ok(SqlExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            type_mapping,
        })
    }

    pub fn add(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.arithmetic(SqlBinaryOp::Add, left, right)
    }

    pub fn subtract(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.arithmetic(SqlBinaryOp::Subtract, left, right)
    }

    pub fn multiply(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.arithmetic(SqlBinaryOp::Multiply, left, right)
    }

    pub fn divide(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.arithmetic(SqlBinaryOp::Divide, left, right)
    }

    pub fn modulo(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.arithmetic(SqlBinaryOp::Modulo, left, right)
    }

    /// String concatenation (`||`).
    pub fn concat(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr, TypeMappingConflict> {
        self.arithmetic(SqlBinaryOp::Concat, left, right)
    }

    pub fn negate(&self, operand: SqlExpr) -> SqlExpr {
        let type_mapping = operand.type_mapping().clone();
        SqlExpr::Unary {
            op: SqlUnaryOp::Negate,
            operand: Box::new(operand),
            type_mapping,
        }
    }

    /// `CAST(operand AS <store type>)`
    pub fn convert(&self, operand: SqlExpr, type_mapping: TypeMapping) -> SqlExpr {
        SqlExpr::Convert {
            operand: Box::new(operand),
            type_mapping,
        }
    }

    // ------------------------------------------------------------------
    // Functions and conditionals
    // ------------------------------------------------------------------

    /// Function call with a fixed return mapping.
    pub fn function(
        &self,
        name: impl Into<String>,
        args: Vec<SqlExpr>,
        return_mapping: TypeMapping,
        nullability: NullabilityRule,
    ) -> SqlExpr {
        let nullable = nullability.evaluate(&args);
        SqlExpr::Function(SqlFunction {
            name: name.into(),
            args,
            type_mapping: return_mapping,
            nullable,
            niladic: false,
        })
    }

    /// Function rendered without an argument list, e.g. `CURRENT_DATE`.
    pub fn niladic_function(&self, name: impl Into<String>, return_mapping: TypeMapping) -> SqlExpr {
        SqlExpr::Function(SqlFunction {
            name: name.into(),
            args: Vec::new(),
            type_mapping: return_mapping,
            nullable: false,
            niladic: true,
        })
    }

    /// Unify the mappings of several arguments, re-typing inferred ones.
    ///
    /// Returns `None` for the mapping when every item is a NULL literal.
    pub fn infer_common_mapping(
        &self,
        items: Vec<SqlExpr>,
    ) -> Result<(Vec<SqlExpr>, Option<TypeMapping>), TypeMappingConflict> {
        let mut mapping: Option<TypeMapping> = None;
        for item in &items {
            if let Some(explicit) = item.explicit_mapping() {
                mapping = Some(match mapping {
                    Some(current) => self.type_mappings.unify(&current, explicit)?,
                    None => explicit.clone(),
                });
            }
        }

        let mapping = match mapping {
            Some(mapping) => {
                for item in items.iter().filter(|i| i.explicit_mapping().is_none()) {
                    self.check_compatible(&mapping, item)?;
                }
                Some(mapping)
            }
            None => items
                .iter()
                .find(|i| !i.is_null_constant())
                .map(|i| i.type_mapping().clone()),
        };

        let items = match &mapping {
            Some(mapping) => items
                .into_iter()
                .map(|i| self.apply_type_mapping(i, mapping))
                .collect(),
            None => items,
        };
        Ok((items, mapping))
    }

    /// `COALESCE(args...)`; non-nullable as soon as one argument is.
    pub fn coalesce(&self, args: Vec<SqlExpr>) -> Result<SqlExpr, TypeMappingConflict> {
        let (args, mapping) = self.infer_common_mapping(args)?;
        let type_mapping = match mapping {
            Some(mapping) => mapping,
            None => args
                .first()
                .map(|a| a.type_mapping().clone())
                .unwrap_or_else(|| self.mapping_for(ScalarKind::String)),
        };
        let nullable = args.iter().all(SqlExpr::is_nullable);
        Ok(SqlExpr::Function(SqlFunction {
            name: "COALESCE".to_string(),
            args,
            type_mapping,
            nullable,
            niladic: false,
        }))
    }

    /// Searched CASE (`operand` = `None`) or simple CASE.
    pub fn case(
        &self,
        operand: Option<SqlExpr>,
        whens: Vec<(SqlExpr, SqlExpr)>,
        else_result: Option<SqlExpr>,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        let (tests, results): (Vec<SqlExpr>, Vec<SqlExpr>) = whens.into_iter().unzip();

        let (operand, tests) = match operand {
            Some(operand) => {
                let mut all = vec![operand];
                all.extend(tests);
                let (mut all, _) = self.infer_common_mapping(all)?;
                let operand = all.remove(0);
                (Some(Box::new(operand)), all)
            }
            None => (None, tests),
        };

        let has_else = else_result.is_some();
        let mut all_results = results;
        all_results.extend(else_result);
        let (mut all_results, mapping) = self.infer_common_mapping(all_results)?;
        let else_result = if has_else { all_results.pop() } else { None };

        let type_mapping = mapping.unwrap_or_else(|| self.mapping_for(ScalarKind::String));
        let whens = tests
            .into_iter()
            .zip(all_results)
            .map(|(test, result)| CaseWhen { test, result })
            .collect();

        Ok(SqlExpr::Case(CaseExpr {
            operand,
            whens,
            else_result: else_result.map(Box::new),
            type_mapping,
        }))
    }

    /// `match_expr LIKE pattern [ESCAPE escape]`
    pub fn like(
        &self,
        match_expr: SqlExpr,
        pattern: SqlExpr,
        escape: Option<SqlExpr>,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        let (match_expr, pattern, mapping) = self.infer_operands(match_expr, pattern)?;
        let escape = escape.map(|e| Box::new(self.apply_type_mapping(e, &mapping)));
        Ok(SqlExpr::Like {
            match_expr: Box::new(match_expr),
            pattern: Box::new(pattern),
            escape,
            type_mapping: self.bool_mapping.clone(),
        })
    }

    /// `item [NOT] IN (values...)`, each value re-typed to the item's mapping.
    pub fn in_values(
        &self,
        item: SqlExpr,
        values: Vec<SqlExpr>,
        negated: bool,
    ) -> Result<SqlExpr, TypeMappingConflict> {
        let mut all = vec![item];
        all.extend(values);
        let (mut all, _) = self.infer_common_mapping(all)?;
        let item = all.remove(0);
        Ok(SqlExpr::In {
            item: Box::new(item),
            values: InValues::List(all),
            negated,
            type_mapping: self.bool_mapping.clone(),
        })
    }

    pub fn in_subquery(&self, item: SqlExpr, subquery: impl Into<String>, negated: bool) -> SqlExpr {
        SqlExpr::In {
            item: Box::new(item),
            values: InValues::Subquery(subquery.into()),
            negated,
            type_mapping: self.bool_mapping.clone(),
        }
    }

    pub fn exists(&self, subquery: impl Into<String>, negated: bool) -> SqlExpr {
        SqlExpr::Exists {
            subquery: subquery.into(),
            negated,
            type_mapping: self.bool_mapping.clone(),
        }
    }
}
