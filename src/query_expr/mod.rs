//! Object-query expression tree
//!
//! The high-level, type-checked representation of a predicate or projection
//! fragment before SQL translation. Nodes are immutable inputs: the translator
//! only reads them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::type_mapping::ScalarKind;
use crate::value::Value;

mod types;

pub use types::{DeclaringType, ExprType, ValueKind};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum QueryExpr {
    /// A constant, scalar or inline collection.
    Constant { value: Value, ty: ExprType },

    /// A runtime parameter captured by the query, e.g. a local variable.
    Parameter { name: String, ty: ExprType },

    /// Query source bound to a table alias (e.g. `u` in `users.Where(u => ...)`).
    EntityRoot { entity_type: String, alias: String },

    /// Property/member access. `owner` is `None` for static members.
    Member {
        owner: Option<Box<QueryExpr>>,
        member: MemberInfo,
        ty: ExprType,
    },

    /// Instance or static method call.
    MethodCall {
        instance: Option<Box<QueryExpr>>,
        method: MethodSignature,
        args: Vec<QueryExpr>,
        ty: ExprType,
    },

    Binary {
        op: BinaryOp,
        left: Box<QueryExpr>,
        right: Box<QueryExpr>,
    },

    Unary { op: UnaryOp, operand: Box<QueryExpr> },

    /// Ternary `test ? if_true : if_false`
    Conditional {
        test: Box<QueryExpr>,
        if_true: Box<QueryExpr>,
        if_false: Box<QueryExpr>,
    },

    /// EXISTS over a subquery owned by the query pipeline
    Exists { subquery: SubqueryRef },

    /// `item IN (subquery)`
    InSubquery {
        item: Box<QueryExpr>,
        subquery: SubqueryRef,
    },
}

/// Subquery produced by the surrounding pipeline, carried as pre-rendered SQL.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct SubqueryRef {
    pub sql: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct MemberInfo {
    pub declaring_type: DeclaringType,
    pub name: String,
}

impl MemberInfo {
    pub fn new(declaring_type: DeclaringType, name: impl Into<String>) -> Self {
        MemberInfo {
            declaring_type,
            name: name.into(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub declaring_type: DeclaringType,
    pub name: String,
    /// Declared parameter types; `args` must match in count.
    pub parameters: Vec<ExprType>,
    #[serde(default)]
    pub is_static: bool,
}

impl MethodSignature {
    pub fn instance(
        declaring_type: DeclaringType,
        name: impl Into<String>,
        parameters: Vec<ExprType>,
    ) -> Self {
        MethodSignature {
            declaring_type,
            name: name.into(),
            parameters,
            is_static: false,
        }
    }

    pub fn static_method(
        declaring_type: DeclaringType,
        name: impl Into<String>,
        parameters: Vec<ExprType>,
    ) -> Self {
        MethodSignature {
            declaring_type,
            name: name.into(),
            parameters,
            is_static: true,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    /// `a ?? b`
    Coalesce,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Coalesce => "??",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    /// Explicit conversion to the given type
    Convert(ExprType),
}

impl QueryExpr {
    pub fn constant(value: Value, ty: ExprType) -> Self {
        QueryExpr::Constant { value, ty }
    }

    /// Constant whose type is implied by the value; `Null` needs [`QueryExpr::null`].
    pub fn literal(value: Value) -> Self {
        let ty = match value.scalar_kind() {
            Some(kind) => ExprType::scalar(kind),
            None => ExprType::nullable(ScalarKind::String),
        };
        QueryExpr::Constant { value, ty }
    }

    pub fn null(ty: ExprType) -> Self {
        QueryExpr::Constant {
            value: Value::Null,
            ty: ty.into_nullable(),
        }
    }

    pub fn parameter(name: impl Into<String>, ty: ExprType) -> Self {
        QueryExpr::Parameter {
            name: name.into(),
            ty,
        }
    }

    pub fn root(entity_type: impl Into<String>, alias: impl Into<String>) -> Self {
        QueryExpr::EntityRoot {
            entity_type: entity_type.into(),
            alias: alias.into(),
        }
    }

    /// Member access whose declaring type follows the owner's type; members of
    /// a nullable value type are declared on `Nullable<T>`.
    pub fn property(self, name: impl Into<String>, ty: ExprType) -> Self {
        let owner_type = self.expr_type();
        let declaring_type = match owner_type.kind {
            ValueKind::Entity(entity) => DeclaringType::Entity(entity),
            ValueKind::Scalar(kind) if owner_type.nullable && !kind.is_reference() => {
                DeclaringType::Nullable(kind)
            }
            ValueKind::Scalar(kind) => DeclaringType::Scalar(kind),
            ValueKind::Collection(_) => DeclaringType::Collection,
        };
        QueryExpr::Member {
            owner: Some(Box::new(self)),
            member: MemberInfo::new(declaring_type, name),
            ty,
        }
    }

    pub fn member(owner: Option<QueryExpr>, member: MemberInfo, ty: ExprType) -> Self {
        QueryExpr::Member {
            owner: owner.map(Box::new),
            member,
            ty,
        }
    }

    pub fn call(
        instance: Option<QueryExpr>,
        method: MethodSignature,
        args: Vec<QueryExpr>,
        ty: ExprType,
    ) -> Self {
        QueryExpr::MethodCall {
            instance: instance.map(Box::new),
            method,
            args,
            ty,
        }
    }

    pub fn binary(op: BinaryOp, left: QueryExpr, right: QueryExpr) -> Self {
        QueryExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOp::Equal, left, right)
    }

    pub fn ne(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOp::NotEqual, left, right)
    }

    pub fn and(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOp::AndAlso, left, right)
    }

    pub fn or(left: QueryExpr, right: QueryExpr) -> Self {
        Self::binary(BinaryOp::OrElse, left, right)
    }

    pub fn not(operand: QueryExpr) -> Self {
        QueryExpr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    pub fn conditional(test: QueryExpr, if_true: QueryExpr, if_false: QueryExpr) -> Self {
        QueryExpr::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    /// Source-language type of this node.
    pub fn expr_type(&self) -> ExprType {
        match self {
            QueryExpr::Constant { ty, .. }
            | QueryExpr::Parameter { ty, .. }
            | QueryExpr::Member { ty, .. }
            | QueryExpr::MethodCall { ty, .. } => ty.clone(),
            QueryExpr::EntityRoot { entity_type, .. } => ExprType::entity(entity_type.clone()),
            QueryExpr::Binary { op, left, right } => {
                if op.is_comparison() || op.is_logical() {
                    let lifted = !op.is_comparison()
                        && (left.expr_type().nullable || right.expr_type().nullable);
                    ExprType {
                        kind: ValueKind::Scalar(ScalarKind::Bool),
                        nullable: lifted,
                    }
                } else if *op == BinaryOp::Coalesce {
                    right.expr_type()
                } else {
                    let l = left.expr_type();
                    let r = right.expr_type();
                    let nullable = l.nullable || r.nullable;
                    ExprType {
                        kind: l.kind,
                        nullable,
                    }
                }
            }
            QueryExpr::Unary { op, operand } => match op {
                UnaryOp::Convert(ty) => ty.clone(),
                UnaryOp::Not | UnaryOp::Negate => operand.expr_type(),
            },
            QueryExpr::Conditional { if_true, if_false, .. } => {
                let t = if_true.expr_type();
                let nullable = t.nullable || if_false.expr_type().nullable;
                ExprType {
                    kind: t.kind,
                    nullable,
                }
            }
            QueryExpr::Exists { .. } | QueryExpr::InSubquery { .. } => {
                ExprType::scalar(ScalarKind::Bool)
            }
        }
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(self, QueryExpr::Constant { value: Value::Null, .. })
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpr::Constant { value, .. } => write!(f, "{}", value),
            QueryExpr::Parameter { name, .. } => f.write_str(name),
            QueryExpr::EntityRoot { alias, .. } => f.write_str(alias),
            QueryExpr::Member { owner, member, .. } => match owner {
                Some(owner) => write!(f, "{}.{}", owner, member.name),
                None => write!(f, "{}.{}", member.declaring_type, member.name),
            },
            QueryExpr::MethodCall {
                instance,
                method,
                args,
                ..
            } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                match instance {
                    Some(instance) => write!(f, "{}.{}({})", instance, method.name, args.join(", ")),
                    None => write!(
                        f,
                        "{}.{}({})",
                        method.declaring_type,
                        method.name,
                        args.join(", ")
                    ),
                }
            }
            QueryExpr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            QueryExpr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "!{}", operand),
                UnaryOp::Negate => write!(f, "-{}", operand),
                UnaryOp::Convert(ty) => write!(f, "({}){}", ty, operand),
            },
            QueryExpr::Conditional {
                test,
                if_true,
                if_false,
            } => write!(f, "({} ? {} : {})", test, if_true, if_false),
            QueryExpr::Exists { .. } => f.write_str("Any(<subquery>)"),
            QueryExpr::InSubquery { item, .. } => write!(f, "<subquery>.Contains({})", item),
        }
    }
}
