//! Object-query to SQL translation
//!
//! [`SqlTranslatingVisitor`] walks a [`QueryExpr`] bottom-up and produces a
//! [`SqlExpr`]:
//!
//! 1. Constants and parameters become literals and placeholders with an
//!    inferred mapping.
//! 2. Member access on an entity resolves against the model (column or
//!    navigation) before any member translator is consulted.
//! 3. Member access on a scalar and method calls go through the translator
//!    chains once the instance and every argument translated.
//! 4. Comparisons are rewritten for null semantics; see [`null_semantics`].
//!
//! A sub-expression with no translation makes its whole enclosing expression
//! untranslatable. The environment records the fragment and reason, and the
//! caller falls back to client evaluation (or fails with a query-shape error
//! where that is impossible).

use std::sync::Arc;

use crate::config::TranslatorConfig;
use crate::model::{navigation_alias, JoinRequest};
use crate::query_expr::{BinaryOp, ExprType, MemberInfo, QueryExpr, UnaryOp, ValueKind};
use crate::sql_expr::{SqlBinaryOp, SqlExpr, SqlRenderer};
use crate::sql_factory::SqlExpressionFactory;
use crate::translators::{MemberTranslatorProvider, MethodCallTranslatorProvider};
use crate::type_mapping::{ScalarKind, TypeMappingConflict};
use crate::value::Value;

pub mod builder;
pub mod env;
pub mod errors;
pub mod null_semantics;

pub use builder::TranslatorBuilder;
pub use env::{TranslationEnv, UntranslatableFragment};
pub use errors::TranslationError;
pub use null_semantics::{EqualityKind, SqlContext};

use null_semantics::{equality_kind, rewrite_equality, rewrite_relational};

/// Composition-time state shared by every translation.
#[derive(Debug)]
pub struct TranslatorDependencies {
    pub factory: SqlExpressionFactory,
    pub member_translators: MemberTranslatorProvider,
    pub method_translators: MethodCallTranslatorProvider,
    pub config: TranslatorConfig,
}

/// Entity instance reached through a query root or a navigation.
#[derive(Debug, Clone, PartialEq)]
struct EntityReference {
    entity_type: String,
    table_alias: String,
    /// Reached through an optional navigation: every column may be NULL
    optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Translated {
    Sql(SqlExpr),
    Entity(EntityReference),
}

/// `None` means the node has no translation; the reason is recorded in the env.
type Visit = Result<Option<Translated>, TranslationError>;

#[derive(Debug, Clone)]
pub struct SqlTranslatingVisitor {
    deps: Arc<TranslatorDependencies>,
}

impl SqlTranslatingVisitor {
    pub fn new(deps: Arc<TranslatorDependencies>) -> Self {
        SqlTranslatingVisitor { deps }
    }

    pub fn dependencies(&self) -> &TranslatorDependencies {
        &self.deps
    }

    pub fn factory(&self) -> &SqlExpressionFactory {
        &self.deps.factory
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.deps.config
    }

    /// Renderer configured with this translator's parameter prefix and qualification.
    pub fn renderer(&self) -> SqlRenderer {
        SqlRenderer::from_config(&self.deps.config)
    }

    /// Translate an expression observed as a value (projection, ordering key, ...).
    pub fn translate(
        &self,
        expr: &QueryExpr,
        env: &mut TranslationEnv<'_>,
    ) -> Result<SqlExpr, TranslationError> {
        self.translate_root(expr, SqlContext::Value, env)
    }

    /// Translate a search condition (WHERE, JOIN ON).
    pub fn translate_predicate(
        &self,
        expr: &QueryExpr,
        env: &mut TranslationEnv<'_>,
    ) -> Result<SqlExpr, TranslationError> {
        self.translate_root(expr, SqlContext::Predicate, env)
    }

    fn translate_root(
        &self,
        expr: &QueryExpr,
        context: SqlContext,
        env: &mut TranslationEnv<'_>,
    ) -> Result<SqlExpr, TranslationError> {
        log::trace!("Translating {} in {:?} context", expr, context);

        match self.visit(expr, context, 0, env)? {
            Some(Translated::Sql(sql)) => Ok(self.factory().apply_default_type_mapping(sql)),
            Some(Translated::Entity(entity)) => {
                env.record_untranslatable(
                    expr.to_string(),
                    format!(
                        "entity `{}` cannot be used as a scalar value",
                        entity.entity_type
                    ),
                );
                Err(self.fallback_error(expr, env))
            }
            None => Err(self.fallback_error(expr, env)),
        }
    }

    /// Error surfaced for an untranslatable expression, depending on whether
    /// client evaluation is possible.
    fn fallback_error(&self, expr: &QueryExpr, env: &TranslationEnv<'_>) -> TranslationError {
        let (fragment, reason) = match env.last_untranslatable() {
            Some(last) => (last.fragment.clone(), last.reason.clone()),
            None => (expr.to_string(), "no translation".to_string()),
        };
        if env.client_eval_allowed() {
            TranslationError::Untranslatable { fragment, reason }
        } else {
            TranslationError::QueryShape { fragment, reason }
        }
    }

    fn untranslatable(
        &self,
        expr: &QueryExpr,
        reason: impl Into<String>,
        env: &mut TranslationEnv<'_>,
    ) -> Visit {
        env.record_untranslatable(expr.to_string(), reason.into());
        Ok(None)
    }

    fn conflict(expr: &QueryExpr) -> impl FnOnce(TypeMappingConflict) -> TranslationError + '_ {
        move |conflict| {
            log::debug!("Type mapping conflict in {}: {}", expr, conflict);
            TranslationError::conflict(expr, conflict)
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn visit(
        &self,
        expr: &QueryExpr,
        context: SqlContext,
        depth: usize,
        env: &mut TranslationEnv<'_>,
    ) -> Visit {
        let max_depth = self.deps.config.max_expression_depth as usize;
        if depth >= max_depth {
            log::warn!("Expression exceeds maximum depth of {}", max_depth);
            return self.untranslatable(
                expr,
                format!("expression exceeds maximum depth of {}", max_depth),
                env,
            );
        }

        match expr {
            QueryExpr::Constant { value, ty } => Ok(self.visit_constant(value, ty)),
            QueryExpr::Parameter { name, ty } => self.visit_parameter(expr, name, ty, env),
            QueryExpr::EntityRoot { entity_type, alias } => {
                Ok(Some(Translated::Entity(EntityReference {
                    entity_type: entity_type.clone(),
                    table_alias: alias.clone(),
                    optional: false,
                })))
            }
            QueryExpr::Member { owner, member, ty } => {
                self.visit_member(expr, owner.as_deref(), member, ty, context, depth, env)
            }
            QueryExpr::MethodCall {
                instance,
                method,
                args,
                ty,
            } => {
                let instance = match instance {
                    Some(instance) => match self.visit_scalar(instance, depth, env)? {
                        Some(sql) => Some(sql),
                        None => return Ok(None),
                    },
                    None => None,
                };
                let mut translated_args = Vec::with_capacity(args.len());
                for arg in args {
                    match self.visit_scalar(arg, depth, env)? {
                        Some(sql) => translated_args.push(sql),
                        None => return Ok(None),
                    }
                }

                let deps = &self.deps;
                let result = deps
                    .method_translators
                    .translate(
                        instance.as_ref(),
                        method,
                        &translated_args,
                        &deps.factory,
                        env,
                    )
                    .map_err(Self::conflict(expr))?;
                match result {
                    Some(sql) => Ok(Some(Translated::Sql(self.definite_bool(sql, ty, context)))),
                    None => self.untranslatable(
                        expr,
                        format!(
                            "no translation for method {}.{}",
                            method.declaring_type, method.name
                        ),
                        env,
                    ),
                }
            }
            QueryExpr::Binary { op, left, right } => {
                self.visit_binary(expr, *op, left, right, context, depth, env)
            }
            QueryExpr::Unary { op, operand } => self.visit_unary(expr, op, operand, depth, env),
            QueryExpr::Conditional {
                test,
                if_true,
                if_false,
            } => {
                let Some(test) = self.visit_scalar(test, depth, env)? else {
                    return Ok(None);
                };
                let Some(if_true) = self.visit_scalar(if_true, depth, env)? else {
                    return Ok(None);
                };
                let Some(if_false) = self.visit_scalar(if_false, depth, env)? else {
                    return Ok(None);
                };
                let case = self
                    .factory()
                    .case(None, vec![(test, if_true)], Some(if_false))
                    .map_err(Self::conflict(expr))?;
                Ok(Some(Translated::Sql(case)))
            }
            QueryExpr::Exists { subquery } => Ok(Some(Translated::Sql(
                self.factory().exists(subquery.sql.clone(), false),
            ))),
            QueryExpr::InSubquery { item, subquery } => {
                let Some(item) = self.visit_scalar(item, depth, env)? else {
                    return Ok(None);
                };
                // A NULL row in the subquery turns a miss into unknown
                let membership = self.factory().in_subquery(item, subquery.sql.clone(), false);
                Ok(Some(Translated::Sql(self.definite_bool(
                    membership,
                    &expr.expr_type(),
                    context,
                ))))
            }
        }
    }

    /// Visit a child in value context, requiring a scalar result.
    fn visit_scalar(
        &self,
        expr: &QueryExpr,
        depth: usize,
        env: &mut TranslationEnv<'_>,
    ) -> Result<Option<SqlExpr>, TranslationError> {
        self.visit_scalar_in(expr, SqlContext::Value, depth, env)
    }

    fn visit_scalar_in(
        &self,
        expr: &QueryExpr,
        context: SqlContext,
        depth: usize,
        env: &mut TranslationEnv<'_>,
    ) -> Result<Option<SqlExpr>, TranslationError> {
        match self.visit(expr, context, depth + 1, env)? {
            Some(Translated::Sql(sql)) => Ok(Some(sql)),
            Some(Translated::Entity(entity)) => {
                env.record_untranslatable(
                    expr.to_string(),
                    format!(
                        "entity `{}` cannot be used as a scalar value",
                        entity.entity_type
                    ),
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------

    fn visit_constant(&self, value: &Value, ty: &ExprType) -> Option<Translated> {
        let kind = value_kind_scalar(&ty.kind)
            .or_else(|| value.scalar_kind())
            .unwrap_or(ScalarKind::String);
        Some(Translated::Sql(self.factory().constant(value.clone(), kind)))
    }

    fn visit_parameter(
        &self,
        expr: &QueryExpr,
        name: &str,
        ty: &ExprType,
        env: &mut TranslationEnv<'_>,
    ) -> Visit {
        match value_kind_scalar(&ty.kind) {
            Some(kind) => Ok(Some(Translated::Sql(self.factory().parameter(
                name,
                kind,
                ty.nullable,
            )))),
            None => self.untranslatable(
                expr,
                format!("parameter `{}` of type {} has no store mapping", name, ty),
                env,
            ),
        }
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn visit_member(
        &self,
        expr: &QueryExpr,
        owner: Option<&QueryExpr>,
        member: &MemberInfo,
        ty: &ExprType,
        context: SqlContext,
        depth: usize,
        env: &mut TranslationEnv<'_>,
    ) -> Visit {
        let instance = match owner {
            Some(owner) => match self.visit(owner, SqlContext::Value, depth + 1, env)? {
                Some(Translated::Entity(entity)) => {
                    return self.visit_entity_member(expr, &entity, &member.name, env);
                }
                Some(Translated::Sql(sql)) => Some(sql),
                None => return Ok(None),
            },
            None => None,
        };

        let deps = &self.deps;
        let result = deps
            .member_translators
            .translate(instance.as_ref(), member, ty, &deps.factory, env)
            .map_err(Self::conflict(expr))?;
        match result {
            Some(sql) => Ok(Some(Translated::Sql(self.definite_bool(sql, ty, context)))),
            None => self.untranslatable(
                expr,
                format!(
                    "no translation for member {}.{}",
                    member.declaring_type, member.name
                ),
                env,
            ),
        }
    }

    /// Column-projection fast path: property or navigation of an entity.
    fn visit_entity_member(
        &self,
        expr: &QueryExpr,
        entity: &EntityReference,
        name: &str,
        env: &mut TranslationEnv<'_>,
    ) -> Visit {
        if let Some(column) = env.model().resolve_column(&entity.entity_type, name) {
            return Ok(Some(Translated::Sql(self.factory().column(
                column.column,
                entity.table_alias.clone(),
                column.type_mapping,
                column.nullable || entity.optional,
            ))));
        }

        if let Some(navigation) = env.model().resolve_navigation(&entity.entity_type, name) {
            let alias = navigation_alias(&entity.table_alias, name);
            env.request_join(JoinRequest {
                source_alias: entity.table_alias.clone(),
                navigation: name.to_string(),
                target_entity: navigation.target_entity.clone(),
                alias: alias.clone(),
                optional: navigation.optional || entity.optional,
            });
            return Ok(Some(Translated::Entity(EntityReference {
                entity_type: navigation.target_entity,
                table_alias: alias,
                optional: navigation.optional || entity.optional,
            })));
        }

        self.untranslatable(
            expr,
            format!(
                "`{}` is not a mapped property or navigation of `{}`",
                name, entity.entity_type
            ),
            env,
        )
    }

    /// Source-typed non-nullable booleans must read as TRUE/FALSE in value context.
    fn definite_bool(&self, sql: SqlExpr, ty: &ExprType, context: SqlContext) -> SqlExpr {
        let needs_definite = context == SqlContext::Value
            && ty.is_bool()
            && !ty.nullable
            && sql.is_nullable()
            && !self.deps.config.use_relational_nulls;
        if !needs_definite {
            return sql;
        }

        let factory = self.factory();
        let bool_mapping = factory.bool_mapping().clone();
        let when_true = factory.constant_with_mapping(Value::Bool(true), bool_mapping.clone());
        let when_false = factory.constant_with_mapping(Value::Bool(false), bool_mapping);
        match factory.case(None, vec![(sql.clone(), when_true)], Some(when_false)) {
            Ok(case) => case,
            // Both results share the bool mapping, so this cannot conflict
            Err(_) => sql,
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn visit_binary(
        &self,
        expr: &QueryExpr,
        op: BinaryOp,
        left: &QueryExpr,
        right: &QueryExpr,
        context: SqlContext,
        depth: usize,
        env: &mut TranslationEnv<'_>,
    ) -> Visit {
        let factory = self.factory();

        // Only AND/OR pass a search condition on to their operands
        let operand_context = if op.is_logical() {
            context
        } else {
            SqlContext::Value
        };
        let Some(l) = self.visit(left, operand_context, depth + 1, env)? else {
            return Ok(None);
        };
        let Some(r) = self.visit(right, operand_context, depth + 1, env)? else {
            return Ok(None);
        };

        let (l, r) = match (l, r) {
            (Translated::Sql(l), Translated::Sql(r)) => (l, r),
            (l, r) if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) => {
                return self.visit_entity_equality(expr, l, r, op == BinaryOp::NotEqual, context, env);
            }
            _ => {
                return self.untranslatable(expr, "entities only support == and != comparisons", env)
            }
        };

        let kind = equality_kind(
            &left.expr_type(),
            &right.expr_type(),
            self.deps.config.use_relational_nulls,
        );
        let conflict = Self::conflict(expr);

        let sql = match op {
            BinaryOp::AndAlso => Ok(factory.and_also(l, r)),
            BinaryOp::OrElse => Ok(factory.or_else(l, r)),
            BinaryOp::Equal => rewrite_equality(factory, l, r, false, kind, context),
            BinaryOp::NotEqual => rewrite_equality(factory, l, r, true, kind, context),
            BinaryOp::LessThan => {
                rewrite_relational(factory, SqlBinaryOp::LessThan, l, r, kind, context)
            }
            BinaryOp::LessThanOrEqual => {
                rewrite_relational(factory, SqlBinaryOp::LessThanOrEqual, l, r, kind, context)
            }
            BinaryOp::GreaterThan => {
                rewrite_relational(factory, SqlBinaryOp::GreaterThan, l, r, kind, context)
            }
            BinaryOp::GreaterThanOrEqual => {
                rewrite_relational(factory, SqlBinaryOp::GreaterThanOrEqual, l, r, kind, context)
            }
            BinaryOp::Add if is_text(&left.expr_type()) || is_text(&right.expr_type()) => {
                factory.concat(l, r)
            }
            BinaryOp::Add => factory.add(l, r),
            BinaryOp::Subtract => factory.subtract(l, r),
            BinaryOp::Multiply => factory.multiply(l, r),
            BinaryOp::Divide => factory.divide(l, r),
            BinaryOp::Modulo => factory.modulo(l, r),
            BinaryOp::Coalesce => factory.coalesce(vec![l, r]),
        }
        .map_err(conflict)?;

        Ok(Some(Translated::Sql(sql)))
    }

    /// Entity comparison by primary key.
    fn visit_entity_equality(
        &self,
        expr: &QueryExpr,
        left: Translated,
        right: Translated,
        negated: bool,
        context: SqlContext,
        env: &mut TranslationEnv<'_>,
    ) -> Visit {
        let factory = self.factory();
        let kind = if self.deps.config.use_relational_nulls {
            EqualityKind::ThreeValued
        } else {
            EqualityKind::NullsEqual
        };

        match (left, right) {
            (Translated::Entity(entity), Translated::Sql(other))
            | (Translated::Sql(other), Translated::Entity(entity))
                if other.is_null_constant() =>
            {
                let Some(first_key) = self.key_columns(&entity, env).into_iter().next() else {
                    return self.untranslatable(
                        expr,
                        format!("entity `{}` has no primary key", entity.entity_type),
                        env,
                    );
                };
                let check = if negated {
                    factory.is_not_null(first_key)
                } else {
                    factory.is_null(first_key)
                };
                Ok(Some(Translated::Sql(check)))
            }
            (Translated::Entity(l), Translated::Entity(r)) => {
                if l.entity_type != r.entity_type {
                    return self.untranslatable(
                        expr,
                        format!(
                            "cannot compare `{}` with `{}`",
                            l.entity_type, r.entity_type
                        ),
                        env,
                    );
                }
                let left_keys = self.key_columns(&l, env);
                let right_keys = self.key_columns(&r, env);
                if left_keys.is_empty() || left_keys.len() != right_keys.len() {
                    return self.untranslatable(
                        expr,
                        format!("entity `{}` has no usable primary key", l.entity_type),
                        env,
                    );
                }

                // Negation is applied to the whole key conjunction, so each
                // pair is built in value context
                let pair_context = if negated { SqlContext::Value } else { context };
                let mut matched: Option<SqlExpr> = None;
                for (a, b) in left_keys.into_iter().zip(right_keys) {
                    let pair = rewrite_equality(factory, a, b, false, kind, pair_context)
                        .map_err(Self::conflict(expr))?;
                    matched = Some(match matched {
                        Some(acc) => factory.and_also(acc, pair),
                        None => pair,
                    });
                }
                let matched = matched.unwrap_or_else(|| factory.sentinel(true));
                Ok(Some(Translated::Sql(if negated {
                    factory.not(matched)
                } else {
                    matched
                })))
            }
            _ => self.untranslatable(
                expr,
                "entities can only be compared with entities of the same type or null",
                env,
            ),
        }
    }

    fn key_columns(&self, entity: &EntityReference, env: &TranslationEnv<'_>) -> Vec<SqlExpr> {
        let model = env.model();
        model
            .primary_key(&entity.entity_type)
            .iter()
            .filter_map(|property| model.resolve_column(&entity.entity_type, property))
            .map(|column| {
                self.factory().column(
                    column.column,
                    entity.table_alias.clone(),
                    column.type_mapping,
                    column.nullable || entity.optional,
                )
            })
            .collect()
    }

    fn visit_unary(
        &self,
        expr: &QueryExpr,
        op: &UnaryOp,
        operand: &QueryExpr,
        depth: usize,
        env: &mut TranslationEnv<'_>,
    ) -> Visit {
        let Some(sql) = self.visit_scalar(operand, depth, env)? else {
            return Ok(None);
        };
        let factory = self.factory();

        let translated = match op {
            UnaryOp::Not => factory.not(sql),
            UnaryOp::Negate => factory.negate(sql),
            UnaryOp::Convert(target) => {
                let Some(kind) = value_kind_scalar(&target.kind) else {
                    return self.untranslatable(
                        expr,
                        format!("conversion to {} has no store mapping", target),
                        env,
                    );
                };
                // Lifting to the nullable form of the same kind is not a conversion
                if sql.type_mapping().kind == kind {
                    sql
                } else {
                    factory.convert(sql, factory.mapping_for(kind))
                }
            }
        };
        Ok(Some(Translated::Sql(translated)))
    }
}

/// Scalar kind carried by a value kind; collections map to their element kind.
fn value_kind_scalar(kind: &ValueKind) -> Option<ScalarKind> {
    match kind {
        ValueKind::Scalar(kind) => Some(*kind),
        ValueKind::Collection(element) => value_kind_scalar(element),
        ValueKind::Entity(_) => None,
    }
}

fn is_text(ty: &ExprType) -> bool {
    ty.scalar_kind() == Some(ScalarKind::String)
}
