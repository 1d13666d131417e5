//! Translated comparisons must agree with source-language semantics on every
//! combination of NULL and non-NULL operands.
//!
//! Value context: the SQL result is exactly the source result (never NULL).
//! Predicate context: a row passes the filter exactly when the source is true.

use exprsql::query_expr::{BinaryOp, ExprType};
use exprsql::type_mapping::ScalarKind;
use exprsql::{QueryExpr, TranslationEnv, TranslatorBuilder, TranslatorConfig, Value};
use test_case::test_case;

use crate::common::{eval, orders_model, passes_filter, row};

type Source = fn(Option<i64>, Option<i64>) -> bool;

fn is_nullable_column(name: &str) -> bool {
    matches!(name, "A" | "B")
}

fn column(name: &str) -> QueryExpr {
    let ty = if is_nullable_column(name) {
        ExprType::nullable(ScalarKind::Int32)
    } else {
        ExprType::scalar(ScalarKind::Int32)
    };
    QueryExpr::root("Order", "o").property(name, ty)
}

fn samples(name: &str) -> &'static [Option<i64>] {
    if is_nullable_column(name) {
        &SAMPLES
    } else {
        &PRESENT
    }
}

fn equal(a: Option<i64>, b: Option<i64>) -> bool {
    a == b
}

fn not_equal(a: Option<i64>, b: Option<i64>) -> bool {
    a != b
}

fn less_than(a: Option<i64>, b: Option<i64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

fn greater_or_equal(a: Option<i64>, b: Option<i64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a >= b)
}

fn not_equal_via_not(a: Option<i64>, b: Option<i64>) -> bool {
    !equal(a, b)
}

fn not_less_than(a: Option<i64>, b: Option<i64>) -> bool {
    !less_than(a, b)
}

fn build(kind: &str, left: QueryExpr, right: QueryExpr) -> QueryExpr {
    match kind {
        "==" => QueryExpr::eq(left, right),
        "!=" => QueryExpr::ne(left, right),
        "<" => QueryExpr::binary(BinaryOp::LessThan, left, right),
        ">=" => QueryExpr::binary(BinaryOp::GreaterThanOrEqual, left, right),
        "!(==)" => QueryExpr::not(QueryExpr::eq(left, right)),
        "!(<)" => QueryExpr::not(QueryExpr::binary(BinaryOp::LessThan, left, right)),
        other => panic!("unknown operator {}", other),
    }
}

fn value_of(v: Option<i64>) -> Value {
    v.map_or(Value::Null, Value::Int)
}

const SAMPLES: [Option<i64>; 3] = [None, Some(1), Some(2)];
const PRESENT: [Option<i64>; 2] = [Some(1), Some(2)];

/// Nullable/nullable, nullable/non-nullable (both ways) and non-nullable/non-nullable.
const COLUMN_PAIRS: [(&str, &str); 4] = [
    ("A", "B"),
    ("A", "Quantity"),
    ("Quantity", "A"),
    ("Id", "Quantity"),
];

#[test_case("==", equal ; "equal")]
#[test_case("!=", not_equal ; "not equal")]
#[test_case("<", less_than ; "less than")]
#[test_case(">=", greater_or_equal ; "greater or equal")]
#[test_case("!(==)", not_equal_via_not ; "negated equal")]
#[test_case("!(<)", not_less_than ; "negated less than")]
fn test_column_comparison_matches_source(op: &str, source: Source) {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();

    for (left, right) in COLUMN_PAIRS {
        let expr = build(op, column(left), column(right));

        let mut env = TranslationEnv::new(&model);
        let as_value = visitor.translate(&expr, &mut env).unwrap();
        let as_predicate = visitor.translate_predicate(&expr, &mut env).unwrap();

        for &a in samples(left) {
            for &b in samples(right) {
                let r = row(&[(left, value_of(a)), (right, value_of(b))]);
                let expected = source(a, b);
                assert_eq!(
                    eval(&as_value, &r),
                    Value::Bool(expected),
                    "value context, {}={:?} {}={:?}: {}",
                    left,
                    a,
                    right,
                    b,
                    visitor.renderer().render(&as_value).sql
                );
                assert_eq!(
                    passes_filter(&as_predicate, &r),
                    expected,
                    "predicate context, {}={:?} {}={:?}: {}",
                    left,
                    a,
                    right,
                    b,
                    visitor.renderer().render(&as_predicate).sql
                );
            }
        }
    }
}

#[test_case("==", equal ; "equal")]
#[test_case("!=", not_equal ; "not equal")]
fn test_parameter_comparison_matches_source(op: &str, source: Source) {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let parameter = QueryExpr::parameter("p", ExprType::nullable(ScalarKind::Int32));
    let expr = build(op, column("A"), parameter);

    let mut env = TranslationEnv::new(&model);
    let as_value = visitor.translate(&expr, &mut env).unwrap();

    for a in SAMPLES {
        for p in SAMPLES {
            let r = row(&[("A", value_of(a)), ("p", value_of(p))]);
            assert_eq!(eval(&as_value, &r), Value::Bool(source(a, p)));
        }
    }
}

#[test]
fn test_non_nullable_side_needs_no_compensation() {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let quantity =
        QueryExpr::root("Order", "o").property("Quantity", ExprType::scalar(ScalarKind::Int32));
    let expr = QueryExpr::eq(quantity, column("A"));

    let mut env = TranslationEnv::new(&model);
    let sql = visitor.translate_predicate(&expr, &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "o.Quantity = o.A");
}

#[test]
fn test_null_literal_comparisons_become_null_checks() {
    let model = orders_model();
    let visitor = TranslatorBuilder::default().build();
    let mut env = TranslationEnv::new(&model);

    let is_null = QueryExpr::eq(column("A"), QueryExpr::null(ExprType::nullable(ScalarKind::Int32)));
    let sql = visitor.translate_predicate(&is_null, &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "o.A IS NULL");

    let quantity =
        QueryExpr::root("Order", "o").property("Quantity", ExprType::scalar(ScalarKind::Int32));
    let never_null = QueryExpr::ne(quantity, QueryExpr::null(ExprType::nullable(ScalarKind::Int32)));
    let sql = visitor.translate_predicate(&never_null, &mut env).unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "1 = 1");
}

#[test]
fn test_relational_nulls_emit_naive_comparisons() {
    let model = orders_model();
    let config = TranslatorConfig {
        use_relational_nulls: true,
        ..Default::default()
    };
    let visitor = TranslatorBuilder::new(config).build();
    let mut env = TranslationEnv::new(&model);

    let sql = visitor
        .translate(&QueryExpr::ne(column("A"), column("B")), &mut env)
        .unwrap();
    assert_eq!(visitor.renderer().render(&sql).sql, "o.A <> o.B");

    // A NULL operand makes the comparison unknown, as in plain SQL
    let r = row(&[("A", Value::Null), ("B", Value::Int(1))]);
    assert_eq!(eval(&sql, &r), Value::Null);
}
