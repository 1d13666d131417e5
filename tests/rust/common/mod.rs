//! Shared fixtures: entity models and a three-valued SQL evaluator
//!
//! The evaluator covers the node shapes the null-semantics rewrite produces,
//! which is enough to check translated comparisons against source semantics.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;

use exprsql::sql_expr::{InValues, SqlBinaryOp, SqlUnaryOp};
use exprsql::type_mapping::RelationalTypeMappingSource;
use exprsql::{SqlExpr, StaticModel, Value};

pub const IDENTITY_MODEL: &str = r#"
entities:
  - name: User
    table: AspNetUsers
    primary_key: Id
    properties:
      Id: { store_type: "nvarchar(450)" }
      Email: { column: email, store_type: "nvarchar(256)", nullable: true }
      NormalizedEmail: { store_type: "nvarchar(256)", nullable: true }
      UserName: { store_type: "nvarchar(256)", nullable: true }
      EmailConfirmed: { store_type: "bit" }
      AccessFailedCount: { store_type: int }
      LockoutEnd: { store_type: "datetimeoffset", nullable: true }
    navigations:
      Profile: { target: Profile, optional: true }
  - name: Profile
    table: Profiles
    primary_key: UserId
    properties:
      UserId: { store_type: "nvarchar(450)" }
      DisplayName: { store_type: "nvarchar(100)", nullable: true }
      Age: { store_type: int, nullable: true }
"#;

pub const ORDERS_MODEL: &str = r#"
entities:
  - name: Order
    table: Orders
    primary_key: Id
    properties:
      Id: { store_type: int }
      A: { store_type: int, nullable: true }
      B: { store_type: int, nullable: true }
      Quantity: { store_type: int }
      Note: { store_type: "varchar(200)", nullable: true }
      Payload: { store_type: blob, nullable: true }
"#;

pub fn identity_model() -> StaticModel {
    StaticModel::from_yaml_str(IDENTITY_MODEL, &RelationalTypeMappingSource::new())
        .expect("identity model should load")
}

pub fn orders_model() -> StaticModel {
    StaticModel::from_yaml_str(ORDERS_MODEL, &RelationalTypeMappingSource::new())
        .expect("orders model should load")
}

/// Column and parameter values, keyed by unqualified name.
pub type Row = HashMap<String, Value>;

pub fn row(values: &[(&str, Value)]) -> Row {
    values
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Evaluate with SQL three-valued logic; unknown is `Value::Null`.
pub fn eval(expr: &SqlExpr, row: &Row) -> Value {
    match expr {
        SqlExpr::Column(c) => row.get(&c.name).cloned().unwrap_or(Value::Null),
        SqlExpr::Parameter(p) => row.get(&p.name).cloned().unwrap_or(Value::Null),
        SqlExpr::Constant(c) => c.value.clone(),
        SqlExpr::Sentinel { value, .. } => Value::Bool(*value),
        SqlExpr::Unary { op, operand, .. } => {
            let value = eval(operand, row);
            match op {
                SqlUnaryOp::IsNull => Value::Bool(value.is_null()),
                SqlUnaryOp::IsNotNull => Value::Bool(!value.is_null()),
                SqlUnaryOp::Not => match value {
                    Value::Bool(b) => Value::Bool(!b),
                    _ => Value::Null,
                },
                SqlUnaryOp::Negate => match value {
                    Value::Int(i) => Value::Int(-i),
                    Value::Double(d) => Value::Double(-d),
                    _ => Value::Null,
                },
            }
        }
        SqlExpr::Binary {
            op, left, right, ..
        } => binary(*op, eval(left, row), eval(right, row)),
        SqlExpr::Case(case) => {
            assert!(case.operand.is_none(), "only searched CASE is supported");
            for when in &case.whens {
                if eval(&when.test, row) == Value::Bool(true) {
                    return eval(&when.result, row);
                }
            }
            case.else_result
                .as_ref()
                .map_or(Value::Null, |e| eval(e, row))
        }
        SqlExpr::In {
            item,
            values: InValues::List(values),
            negated,
            ..
        } => {
            let item = eval(item, row);
            if item.is_null() {
                return Value::Null;
            }
            let mut saw_null = false;
            for value in values {
                let value = eval(value, row);
                if value.is_null() {
                    saw_null = true;
                } else if compare(&item, &value) == Some(Ordering::Equal) {
                    return Value::Bool(!negated);
                }
            }
            if saw_null {
                Value::Null
            } else {
                Value::Bool(*negated)
            }
        }
        other => panic!("evaluator does not support {:?}", other),
    }
}

fn binary(op: SqlBinaryOp, left: Value, right: Value) -> Value {
    match op {
        SqlBinaryOp::And => match (&left, &right) {
            (Value::Bool(false), _) | (_, Value::Bool(false)) => Value::Bool(false),
            (Value::Bool(true), Value::Bool(true)) => Value::Bool(true),
            _ => Value::Null,
        },
        SqlBinaryOp::Or => match (&left, &right) {
            (Value::Bool(true), _) | (_, Value::Bool(true)) => Value::Bool(true),
            (Value::Bool(false), Value::Bool(false)) => Value::Bool(false),
            _ => Value::Null,
        },
        op if op.is_comparison() => {
            let Some(ordering) = compare(&left, &right) else {
                return Value::Null;
            };
            Value::Bool(match op {
                SqlBinaryOp::Equal => ordering == Ordering::Equal,
                SqlBinaryOp::NotEqual => ordering != Ordering::Equal,
                SqlBinaryOp::LessThan => ordering == Ordering::Less,
                SqlBinaryOp::LessThanOrEqual => ordering != Ordering::Greater,
                SqlBinaryOp::GreaterThan => ordering == Ordering::Greater,
                SqlBinaryOp::GreaterThanOrEqual => ordering != Ordering::Less,
                _ => unreachable!(),
            })
        }
        SqlBinaryOp::Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
            _ => Value::Null,
        },
        other => panic!("evaluator does not support {:?}", other),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// `WHERE` keeps a row only when the condition is TRUE.
pub fn passes_filter(expr: &SqlExpr, row: &Row) -> bool {
    eval(expr, row) == Value::Bool(true)
}
