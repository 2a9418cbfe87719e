/**
 * One method per editing intent.
 *
 * Every method follows the same shape: a fresh request set for the current
 * identity (scoped to the model when one is named), the operation(s) for the
 * intent, and `request_with`. Each doc comment states the intention sent and
 * the signal the server is expected to answer with; the manager does not
 * check that expectation.
 */
use minerva_core::protocol::constants::{ENABLED_BY, OCCURS_IN};
use minerva_core::{ClassExpression, Entity, EvidenceTarget, Fact, Operation, Request};

use crate::error::ManagerError;
use crate::manager::Manager;

/// Output format for `export_model`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Minerva's native export.
    #[default]
    Default,
    Gaf,
    Gpad,
}

impl ExportFormat {
    fn legacy_name(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Gaf => Some("gaf"),
            Self::Gpad => Some("gpad"),
        }
    }
}

impl Manager {
    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /**
     * Fetches a whole model.
     *
     * Intent: "query". Expect: "success" and "rebuild".
     */
    pub fn get_model(&self, model_id: &str) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.get_model();
        self.request_with(&reqs)
    }

    /**
     * Fetches meta-information about all models.
     *
     * Intent: "query". Expect: "success" and "meta".
     */
    pub fn get_meta(&self) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(None);
        reqs.get_meta();
        self.request_with(&reqs)
    }

    /**
     * Fetches the undo/redo state of a model. Sent whether or not a token
     * is set.
     *
     * Intent: "query". Expect: "success" and "meta".
     */
    pub fn get_model_undo_redo(&self, model_id: &str) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.get_undo_redo();
        self.request_with(&reqs)
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Rolls the model back one batch. Expect: "rebuild".
    pub fn perform_undo(&self, model_id: &str) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.undo_last_model_batch();
        self.request_with(&reqs)
    }

    /// Rolls the model forward one batch. Expect: "rebuild".
    pub fn perform_redo(&self, model_id: &str) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.redo_last_model_batch();
        self.request_with(&reqs)
    }

    // -----------------------------------------------------------------------
    // Facts
    // -----------------------------------------------------------------------

    /**
     * Adds a single fact.
     *
     * Intent: "action". Expect: "success" and "merge" (possibly "rebuild").
     */
    pub fn add_fact(&self, model_id: &str, fact: &Fact) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.add_fact(fact);
        self.request_with(&reqs)
    }

    /// Expect: "merge" (possibly "rebuild").
    pub fn remove_fact(&self, model_id: &str, fact: &Fact) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.remove_fact(fact);
        self.request_with(&reqs)
    }

    // -----------------------------------------------------------------------
    // Individuals
    // -----------------------------------------------------------------------

    /**
     * Adds a simple composite unit: an individual of `cls_expr`, optionally
     * `enabled_by` some expression and `occurs_in` some expression.
     *
     * Absent or blank optional expressions are left out of the batch
     * entirely, so the minimal call sends a single request.
     *
     * Intent: "action". Expect: "success" and "merge".
     */
    pub fn add_simple_composite(
        &self,
        model_id: &str,
        cls_expr: &ClassExpression,
        enabled_by_expr: Option<&ClassExpression>,
        occurs_in_expr: Option<&ClassExpression>,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        let individual = reqs.add_individual(cls_expr);

        if let Some(expr) = enabled_by_expr.filter(|e| !e.is_blank()) {
            reqs.add_type_to_individual(&ClassExpression::svf(expr, ENABLED_BY), &individual);
        }
        if let Some(expr) = occurs_in_expr.filter(|e| !e.is_blank()) {
            reqs.add_type_to_individual(&ClassExpression::svf(expr, OCCURS_IN), &individual);
        }

        self.request_with(&reqs)
    }

    /// Adds a class expression to an individual. Expect: "merge".
    pub fn add_class_expression(
        &self,
        model_id: &str,
        individual_id: &str,
        cls_expr: &ClassExpression,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.add_type_to_individual(cls_expr, individual_id);
        self.request_with(&reqs)
    }

    /// Removes a class expression from an individual. Expect: "merge".
    pub fn remove_class_expression(
        &self,
        model_id: &str,
        individual_id: &str,
        cls_expr: &ClassExpression,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.remove_type_from_individual(cls_expr, individual_id);
        self.request_with(&reqs)
    }

    /// Expect: "rebuild".
    pub fn remove_individual(
        &self,
        model_id: &str,
        individual_id: &str,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.remove_individual(individual_id);
        self.request_with(&reqs)
    }

    // -----------------------------------------------------------------------
    // Whole models
    // -----------------------------------------------------------------------

    /**
     * Creates a new, empty model. The taxon and class seeds are legacy and
     * only sent when given.
     *
     * Intent: "action". Expect: "success" and "rebuild".
     */
    pub fn add_model(
        &self,
        taxon_id: Option<&str>,
        class_id: Option<&str>,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(None);
        reqs.add_model(taxon_id, class_id);
        self.request_with(&reqs)
    }

    /**
     * Requests an export of the model text. `Gaf` and `Gpad` go through the
     * legacy exporter.
     *
     * Intent: "query". Expect: "success" and "meta".
     */
    pub fn export_model(&self, model_id: &str, format: ExportFormat) -> Result<(), ManagerError> {
        let mut request = match format.legacy_name() {
            Some(name) => {
                let mut request = Request::new(Entity::Model, Operation::ExportLegacy);
                request.special("format", name);
                request
            }
            None => Request::new(Entity::Model, Operation::Export),
        };
        request.model(model_id);

        let mut reqs = self.request_set(None);
        reqs.add(request);
        self.request_with(&reqs)
    }

    /**
     * Seeds a new model from its serialized form.
     *
     * Intent: "action". Expect: "success" and "rebuild".
     */
    pub fn import_model(&self, model_string: &str) -> Result<(), ManagerError> {
        let mut request = Request::new(Entity::Model, Operation::Import);
        request.special("importModel", model_string);

        let mut reqs = self.request_set(None);
        reqs.add(request);
        self.request_with(&reqs)
    }

    /**
     * Persists the model server-side.
     *
     * Answers with "rebuild" rather than "meta" so that create, edit and
     * store can run in one pass.
     */
    pub fn store_model(&self, model_id: &str) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.store_model();
        self.request_with(&reqs)
    }

    // -----------------------------------------------------------------------
    // Evidence
    // -----------------------------------------------------------------------

    /// Attaches evidence to an individual. Expect: "rebuild".
    pub fn add_individual_evidence(
        &self,
        model_id: &str,
        individual_id: &str,
        evidence_id: &str,
        source_ids: &[&str],
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.add_evidence(
            evidence_id,
            source_ids,
            &EvidenceTarget::Individual(individual_id.to_string()),
        );
        self.request_with(&reqs)
    }

    /// Attaches evidence to a fact. Expect: "rebuild".
    pub fn add_fact_evidence(
        &self,
        model_id: &str,
        fact: &Fact,
        evidence_id: &str,
        source_ids: &[&str],
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.add_evidence(evidence_id, source_ids, &EvidenceTarget::Fact(fact.clone()));
        self.request_with(&reqs)
    }

    pub fn remove_evidence(
        &self,
        model_id: &str,
        evidence_individual_id: &str,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.remove_evidence(evidence_individual_id);
        self.request_with(&reqs)
    }

    // -----------------------------------------------------------------------
    // Annotations (all expect "rebuild")
    // -----------------------------------------------------------------------

    pub fn add_individual_annotation(
        &self,
        model_id: &str,
        individual_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.add_annotation_to_individual(key, value, individual_id);
        self.request_with(&reqs)
    }

    pub fn add_fact_annotation(
        &self,
        model_id: &str,
        fact: &Fact,
        key: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.add_annotation_to_fact(key, value, fact);
        self.request_with(&reqs)
    }

    pub fn add_model_annotation(
        &self,
        model_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.add_annotation_to_model(key, value);
        self.request_with(&reqs)
    }

    pub fn remove_individual_annotation(
        &self,
        model_id: &str,
        individual_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.remove_annotation_from_individual(key, value, individual_id);
        self.request_with(&reqs)
    }

    pub fn remove_fact_annotation(
        &self,
        model_id: &str,
        fact: &Fact,
        key: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.remove_annotation_from_fact(key, value, fact);
        self.request_with(&reqs)
    }

    pub fn remove_model_annotation(
        &self,
        model_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        let mut reqs = self.request_set(Some(model_id));
        reqs.remove_annotation_from_model(key, value);
        self.request_with(&reqs)
    }
}
