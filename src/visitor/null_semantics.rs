//! Null-semantics rewriting for comparisons
//!
//! Source-language equality treats two nulls as equal and never yields
//! "unknown"; SQL `=` yields NULL as soon as one side is NULL. The rewrite
//! depends only on the operator, operand nullability, the equality kind and
//! the context the comparison appears in:
//!
//! | L? | R? | value context                                           | predicate context                   |
//! |----|----|---------------------------------------------------------|-------------------------------------|
//! | no | no | `a = b`                                                 | `a = b`                             |
//! | yes| no | `a = b AND a IS NOT NULL`                               | `a = b`                             |
//! | no | yes| `a = b AND b IS NOT NULL`                               | `a = b`                             |
//! | yes| yes| `(a = b AND a IS NOT NULL AND b IS NOT NULL) OR (a IS NULL AND b IS NULL)` | `a = b OR (a IS NULL AND b IS NULL)` |
//!
//! `!=` is the negation of the value-context equality, simplified by the
//! factory's three-valued-safe rules.

use crate::query_expr::ExprType;
use crate::sql_expr::{SqlBinaryOp, SqlExpr};
use crate::sql_factory::SqlExpressionFactory;
use crate::type_mapping::TypeMappingConflict;

/// Where a boolean expression is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlContext {
    /// Result is observed as a value (projection, operand, CASE); must be TRUE or FALSE
    Value,
    /// Search condition (WHERE/JOIN ON); unknown and false are indistinguishable
    Predicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityKind {
    /// Two nulls compare equal, null never equals a value
    NullsEqual,
    /// SQL semantics: any null operand makes the comparison unknown
    ThreeValued,
}

/// Equality kind for a comparison between operands of the given source types.
///
/// Every type category (non-nullable values, nullable values, strings and
/// byte arrays, entity keys) compares with `NullsEqual`; non-nullable operands
/// simply need no compensation. Relational nulls switch everything to
/// `ThreeValued`.
pub fn equality_kind(_left: &ExprType, _right: &ExprType, use_relational_nulls: bool) -> EqualityKind {
    if use_relational_nulls {
        EqualityKind::ThreeValued
    } else {
        EqualityKind::NullsEqual
    }
}

/// Rewrite `left == right` (or `!=` when `negated`) with null compensation.
pub fn rewrite_equality(
    factory: &SqlExpressionFactory,
    left: SqlExpr,
    right: SqlExpr,
    negated: bool,
    kind: EqualityKind,
    context: SqlContext,
) -> Result<SqlExpr, TypeMappingConflict> {
    // Comparison with a NULL literal is a null check under every kind
    match (left.is_null_constant(), right.is_null_constant()) {
        (true, true) => return Ok(factory.sentinel(!negated)),
        (true, false) => return Ok(null_check(factory, right, negated)),
        (false, true) => return Ok(null_check(factory, left, negated)),
        (false, false) => {}
    }

    let left_nullable = left.is_nullable();
    let right_nullable = right.is_nullable();

    if kind == EqualityKind::ThreeValued || (!left_nullable && !right_nullable) {
        return if negated {
            factory.not_equal(left, right)
        } else {
            factory.equal(left, right)
        };
    }

    if !negated && context == SqlContext::Predicate {
        let equal = factory.equal(left.clone(), right.clone())?;
        return Ok(if left_nullable && right_nullable {
            let both_null = factory.and_also(factory.is_null(left), factory.is_null(right));
            factory.or_else(equal, both_null)
        } else {
            equal
        });
    }

    let equal = value_equality(factory, left, right, left_nullable, right_nullable)?;
    Ok(if negated { factory.not(equal) } else { equal })
}

fn null_check(factory: &SqlExpressionFactory, operand: SqlExpr, negated: bool) -> SqlExpr {
    if negated {
        factory.is_not_null(operand)
    } else {
        factory.is_null(operand)
    }
}

/// Value-context equality: always TRUE or FALSE.
fn value_equality(
    factory: &SqlExpressionFactory,
    left: SqlExpr,
    right: SqlExpr,
    left_nullable: bool,
    right_nullable: bool,
) -> Result<SqlExpr, TypeMappingConflict> {
    let equal = factory.equal(left.clone(), right.clone())?;
    Ok(match (left_nullable, right_nullable) {
        (true, false) => factory.and_also(equal, factory.is_not_null(left)),
        (false, true) => factory.and_also(equal, factory.is_not_null(right)),
        (true, true) => {
            let both_present = factory.and_also(
                factory.and_also(equal, factory.is_not_null(left.clone())),
                factory.is_not_null(right.clone()),
            );
            let both_null = factory.and_also(factory.is_null(left), factory.is_null(right));
            factory.or_else(both_present, both_null)
        }
        (false, false) => equal,
    })
}

/// Relational comparison (`<`, `<=`, `>`, `>=`).
///
/// In value context nullable operands get `IS NOT NULL` guards so the result
/// is FALSE, not unknown, when either side is NULL.
pub fn rewrite_relational(
    factory: &SqlExpressionFactory,
    op: SqlBinaryOp,
    left: SqlExpr,
    right: SqlExpr,
    kind: EqualityKind,
    context: SqlContext,
) -> Result<SqlExpr, TypeMappingConflict> {
    let left_nullable = left.is_nullable();
    let right_nullable = right.is_nullable();
    let compared = factory.compare(op, left.clone(), right.clone())?;

    if kind == EqualityKind::ThreeValued || context == SqlContext::Predicate {
        return Ok(compared);
    }

    let mut guarded = compared;
    if left_nullable {
        guarded = factory.and_also(guarded, factory.is_not_null(left));
    }
    if right_nullable {
        guarded = factory.and_also(guarded, factory.is_not_null(right));
    }
    Ok(guarded)
}
