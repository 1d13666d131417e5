use std::sync::Arc;

use super::{MemberTranslator, MethodCallTranslator, TranslatorResult};
use crate::query_expr::{ExprType, MemberInfo, MethodSignature};
use crate::sql_expr::SqlExpr;
use crate::sql_factory::SqlExpressionFactory;
use crate::visitor::TranslationEnv;

/// Ordered chain of member translators; first claim wins.
#[derive(Clone, Default)]
pub struct MemberTranslatorProvider {
    translators: Vec<Arc<dyn MemberTranslator>>,
}

impl MemberTranslatorProvider {
    pub fn new(translators: Vec<Arc<dyn MemberTranslator>>) -> Self {
        MemberTranslatorProvider { translators }
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    pub fn translate(
        &self,
        instance: Option<&SqlExpr>,
        member: &MemberInfo,
        result_type: &ExprType,
        factory: &SqlExpressionFactory,
        env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        for translator in &self.translators {
            if let Some(sql) = translator.translate(instance, member, result_type, factory, env)? {
                log::debug!(
                    "{} claimed member {}.{}",
                    translator.name(),
                    member.declaring_type,
                    member.name
                );
                return Ok(Some(sql));
            }
        }
        log::debug!(
            "No member translator for {}.{}",
            member.declaring_type,
            member.name
        );
        Ok(None)
    }
}

impl std::fmt::Debug for MemberTranslatorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.translators.iter().map(|t| t.name()).collect();
        f.debug_struct("MemberTranslatorProvider")
            .field("translators", &names)
            .finish()
    }
}

/// Ordered chain of method-call translators; first claim wins.
#[derive(Clone, Default)]
pub struct MethodCallTranslatorProvider {
    translators: Vec<Arc<dyn MethodCallTranslator>>,
}

impl MethodCallTranslatorProvider {
    pub fn new(translators: Vec<Arc<dyn MethodCallTranslator>>) -> Self {
        MethodCallTranslatorProvider { translators }
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    pub fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodSignature,
        args: &[SqlExpr],
        factory: &SqlExpressionFactory,
        env: &TranslationEnv<'_>,
    ) -> TranslatorResult {
        if args.len() != method.arity() {
            log::warn!(
                "{}.{} called with {} arguments, declared {}",
                method.declaring_type,
                method.name,
                args.len(),
                method.arity()
            );
            return Ok(None);
        }
        if method.is_static == instance.is_some() {
            log::debug!(
                "{}.{}: instance does not match static flag",
                method.declaring_type,
                method.name
            );
            return Ok(None);
        }

        for translator in &self.translators {
            if let Some(sql) = translator.translate(instance, method, args, factory, env)? {
                log::debug!(
                    "{} claimed method {}.{}",
                    translator.name(),
                    method.declaring_type,
                    method.name
                );
                return Ok(Some(sql));
            }
        }
        log::debug!(
            "No method translator for {}.{}/{}",
            method.declaring_type,
            method.name,
            method.arity()
        );
        Ok(None)
    }
}

impl std::fmt::Debug for MethodCallTranslatorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.translators.iter().map(|t| t.name()).collect();
        f.debug_struct("MethodCallTranslatorProvider")
            .field("translators", &names)
            .finish()
    }
}
