use crate::model::{JoinRequest, ModelMetadata};

/// Fragment the translator gave up on, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntranslatableFragment {
    pub fragment: String,
    pub reason: String,
}

/// Per-call translation state.
///
/// Owned by exactly one translation; the visitor threads it through the whole
/// walk and translators get read-only access.
pub struct TranslationEnv<'a> {
    model: &'a dyn ModelMetadata,
    client_eval_allowed: bool,
    client_eval_required: bool,
    last_untranslatable: Option<UntranslatableFragment>,
    joins: Vec<JoinRequest>,
}

impl<'a> TranslationEnv<'a> {
    /// Top-level environment: untranslatable fragments fall back to the client.
    pub fn new(model: &'a dyn ModelMetadata) -> Self {
        TranslationEnv {
            model,
            client_eval_allowed: true,
            client_eval_required: false,
            last_untranslatable: None,
            joins: Vec::new(),
        }
    }

    /// Environment for a subquery, where client evaluation is impossible.
    pub fn for_subquery(model: &'a dyn ModelMetadata) -> Self {
        Self::new(model).with_client_eval(false)
    }

    pub fn with_client_eval(mut self, allowed: bool) -> Self {
        self.client_eval_allowed = allowed;
        self
    }

    pub fn model(&self) -> &dyn ModelMetadata {
        self.model
    }

    pub fn client_eval_allowed(&self) -> bool {
        self.client_eval_allowed
    }

    /// Set once any fragment of this translation could not be translated.
    pub fn client_eval_required(&self) -> bool {
        self.client_eval_required
    }

    pub fn last_untranslatable(&self) -> Option<&UntranslatableFragment> {
        self.last_untranslatable.as_ref()
    }

    /// Joins requested by navigations, in the order they were first walked.
    pub fn joins(&self) -> &[JoinRequest] {
        &self.joins
    }

    pub(crate) fn record_untranslatable(&mut self, fragment: String, reason: String) {
        log::debug!("Cannot translate `{}`: {}", fragment, reason);
        self.client_eval_required = true;
        self.last_untranslatable = Some(UntranslatableFragment { fragment, reason });
    }

    pub(crate) fn request_join(&mut self, join: JoinRequest) {
        if !self.joins.contains(&join) {
            log::trace!("Join {} -> {} as {}", join.source_alias, join.target_entity, join.alias);
            self.joins.push(join);
        }
    }
}

impl std::fmt::Debug for TranslationEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationEnv")
            .field("client_eval_allowed", &self.client_eval_allowed)
            .field("client_eval_required", &self.client_eval_required)
            .field("last_untranslatable", &self.last_untranslatable)
            .field("joins", &self.joins)
            .finish_non_exhaustive()
    }
}
