use std::sync::Arc;

use super::{SqlTranslatingVisitor, TranslatorDependencies};
use crate::config::{SqlDialect, TranslatorConfig};
use crate::sql_factory::SqlExpressionFactory;
use crate::translators::{
    CollectionContainsTranslator, ConvertTranslator, DateTimeMemberTranslator, MathTranslator,
    MemberTranslator, MemberTranslatorProvider, MethodCallTranslator,
    MethodCallTranslatorProvider, NullableMemberTranslator, SqliteDateTimeMemberTranslator,
    SqliteStringMethodTranslator, StringMemberTranslator, StringMethodTranslator,
};
use crate::type_mapping::{RelationalTypeMappingSource, TypeMappingSource};

/// Composes a [`SqlTranslatingVisitor`] from a configuration.
///
/// The built-in translators for the configured dialect are registered up
/// front; dialect-specific ones come before the generic ones so they win.
/// Custom translators are appended (tried after the built-ins) or prepended
/// (tried first).
pub struct TranslatorBuilder {
    config: TranslatorConfig,
    type_mappings: Arc<dyn TypeMappingSource>,
    member_translators: Vec<Arc<dyn MemberTranslator>>,
    method_translators: Vec<Arc<dyn MethodCallTranslator>>,
}

impl TranslatorBuilder {
    pub fn new(config: TranslatorConfig) -> Self {
        let dialect = config.dialect;

        let mut member_translators: Vec<Arc<dyn MemberTranslator>> = vec![
            Arc::new(NullableMemberTranslator),
            Arc::new(StringMemberTranslator),
        ];
        if dialect == SqlDialect::Sqlite {
            member_translators.push(Arc::new(SqliteDateTimeMemberTranslator));
        }
        member_translators.push(Arc::new(DateTimeMemberTranslator));

        let mut method_translators: Vec<Arc<dyn MethodCallTranslator>> = Vec::new();
        if dialect == SqlDialect::Sqlite {
            method_translators.push(Arc::new(SqliteStringMethodTranslator));
        }
        method_translators.push(Arc::new(StringMethodTranslator));
        method_translators.push(Arc::new(MathTranslator::new(dialect)));
        method_translators.push(Arc::new(CollectionContainsTranslator));
        method_translators.push(Arc::new(ConvertTranslator));

        TranslatorBuilder {
            config,
            type_mappings: Arc::new(RelationalTypeMappingSource::for_dialect(dialect)),
            member_translators,
            method_translators,
        }
    }

    /// Replace the dialect's default type mapping registry.
    pub fn with_type_mappings(mut self, type_mappings: Arc<dyn TypeMappingSource>) -> Self {
        self.type_mappings = type_mappings;
        self
    }

    pub fn register_member_translator(mut self, translator: Arc<dyn MemberTranslator>) -> Self {
        self.member_translators.push(translator);
        self
    }

    pub fn register_method_call_translator(
        mut self,
        translator: Arc<dyn MethodCallTranslator>,
    ) -> Self {
        self.method_translators.push(translator);
        self
    }

    /// Register a member translator ahead of every built-in one.
    pub fn prepend_member_translator(mut self, translator: Arc<dyn MemberTranslator>) -> Self {
        self.member_translators.insert(0, translator);
        self
    }

    /// Register a method-call translator ahead of every built-in one.
    pub fn prepend_method_call_translator(
        mut self,
        translator: Arc<dyn MethodCallTranslator>,
    ) -> Self {
        self.method_translators.insert(0, translator);
        self
    }

    pub fn build(self) -> SqlTranslatingVisitor {
        let member_translators = MemberTranslatorProvider::new(self.member_translators);
        let method_translators = MethodCallTranslatorProvider::new(self.method_translators);

        log::debug!(
            "Built {} translator: {:?}, {:?}",
            self.config.dialect,
            member_translators,
            method_translators
        );

        SqlTranslatingVisitor::new(Arc::new(TranslatorDependencies {
            factory: SqlExpressionFactory::new(self.type_mappings),
            member_translators,
            method_translators,
            config: self.config,
        }))
    }
}

impl Default for TranslatorBuilder {
    fn default() -> Self {
        Self::new(TranslatorConfig::default())
    }
}
