/**
 * Request batches — what the manager sends to Barista.
 *
 * A `RequestSet` is an ordered list of `Request`s submitted together in a
 * single call. Each request names an entity, an operation on it, and a free
 * JSON object of arguments:
 *
 * ```json
 * { "entity": "edge", "operation": "add",
 *   "arguments": { "subject": "a", "object": "b",
 *                  "predicate": "RO:0002333", "model-id": "gomodel:1" } }
 * ```
 *
 * The set is flattened into wire arguments by `callable()`:
 * `intention`, `requests` (the JSON array above, as a string) and, when the
 * user is identified, `token`.
 */
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::expression::ClassExpression;

// ---------------------------------------------------------------------------
// Entity / Operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Model,
    Individual,
    Edge,
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Get,
    Add,
    Remove,
    AddType,
    RemoveType,
    AddAnnotation,
    RemoveAnnotation,
    GetUndoRedo,
    Undo,
    Redo,
    Store,
    Export,
    ExportLegacy,
    Import,
}

impl Operation {
    /// Operations that leave the model untouched.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::Get | Self::GetUndoRedo | Self::Export | Self::ExportLegacy
        )
    }
}

// ---------------------------------------------------------------------------
// Fact / EvidenceTarget
// ---------------------------------------------------------------------------

/// An edge in a model: `subject --predicate--> object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub subject: String,
    pub object: String,
    pub predicate: String,
}

impl Fact {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            predicate: predicate.into(),
        }
    }
}

/// What an evidence individual is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceTarget {
    Individual(String),
    Fact(Fact),
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/**
 * A single operation inside a batch.
 *
 * Builder methods fill in the `arguments` object; `expressions` and `values`
 * are arrays that grow with every call.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    entity: Entity,
    operation: Operation,
    arguments: Map<String, Value>,
}

impl Request {
    pub fn new(entity: Entity, operation: Operation) -> Self {
        Self {
            entity,
            operation,
            arguments: Map::new(),
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Scopes the request to a model.
    pub fn model(&mut self, model_id: impl Into<String>) -> &mut Self {
        self.special("model-id", model_id.into())
    }

    /// Sets an arbitrary argument, replacing any previous value.
    pub fn special(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.arguments.insert(key.to_string(), value.into());
        self
    }

    pub fn individual(&mut self, individual_id: impl Into<String>) -> &mut Self {
        self.special("individual", individual_id.into())
    }

    pub fn fact(&mut self, fact: &Fact) -> &mut Self {
        self.special("subject", fact.subject.as_str());
        self.special("object", fact.object.as_str());
        self.special("predicate", fact.predicate.as_str())
    }

    pub fn assign_to_variable(&mut self, variable: impl Into<String>) -> &mut Self {
        self.special("assign-to-variable", variable.into())
    }

    pub fn add_class_expression(&mut self, expr: &ClassExpression) -> &mut Self {
        self.push_argument("expressions", expr.structure())
    }

    pub fn add_annotation(&mut self, key: &str, value: &str) -> &mut Self {
        self.push_argument("values", json!({ "key": key, "value": value }))
    }

    fn push_argument(&mut self, key: &str, item: Value) -> &mut Self {
        let slot = self
            .arguments
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        match slot {
            Value::Array(items) => items.push(item),
            other => *other = Value::Array(vec![item]),
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RequestSet
// ---------------------------------------------------------------------------

/**
 * An ordered batch of requests scoped to one identity and, optionally, one
 * model.
 *
 * Empty tokens and model ids are treated as absent.
 */
#[derive(Debug, Clone, Default)]
pub struct RequestSet {
    token: Option<String>,
    model_id: Option<String>,
    requests: Vec<Request>,
    variables: usize,
}

impl RequestSet {
    pub fn new(token: Option<&str>, model_id: Option<&str>) -> Self {
        Self {
            token: non_empty(token),
            model_id: non_empty(model_id),
            requests: Vec::new(),
            variables: 0,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /**
     * `"query"` when every request is read-only, `"action"` otherwise.
     * An empty set is a query.
     */
    pub fn intention(&self) -> &'static str {
        if self.requests.iter().all(|r| r.operation.is_read_only()) {
            "query"
        } else {
            "action"
        }
    }

    /**
     * Appends a request. If the set is scoped to a model and the request
     * does not name one yet, the set's model is filled in.
     */
    pub fn add(&mut self, mut request: Request) -> &mut Self {
        if let Some(model_id) = &self.model_id {
            if request.argument("model-id").is_none() {
                request.model(model_id.as_str());
            }
        }
        self.requests.push(request);
        self
    }

    /**
     * Flattens the set into the argument pairs sent to Barista.
     *
     * Fails only if a request cannot be serialized to JSON.
     */
    pub fn callable(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let mut args = vec![
            ("intention".to_string(), self.intention().to_string()),
            ("requests".to_string(), serde_json::to_string(&self.requests)?),
        ];
        if let Some(token) = &self.token {
            args.push(("token".to_string(), token.clone()));
        }
        Ok(args)
    }

    fn next_variable(&mut self) -> String {
        self.variables += 1;
        format!("var{}", self.variables)
    }

    fn simple(&mut self, entity: Entity, operation: Operation) -> &mut Self {
        self.add(Request::new(entity, operation))
    }

    // -----------------------------------------------------------------------
    // Model-level operations
    // -----------------------------------------------------------------------

    pub fn get_model(&mut self) -> &mut Self {
        self.simple(Entity::Model, Operation::Get)
    }

    pub fn get_meta(&mut self) -> &mut Self {
        self.simple(Entity::Meta, Operation::Get)
    }

    pub fn get_undo_redo(&mut self) -> &mut Self {
        self.simple(Entity::Model, Operation::GetUndoRedo)
    }

    pub fn undo_last_model_batch(&mut self) -> &mut Self {
        self.simple(Entity::Model, Operation::Undo)
    }

    pub fn redo_last_model_batch(&mut self) -> &mut Self {
        self.simple(Entity::Model, Operation::Redo)
    }

    pub fn store_model(&mut self) -> &mut Self {
        self.simple(Entity::Model, Operation::Store)
    }

    /// Creates a new model. Both seeds are optional and omitted when absent.
    pub fn add_model(&mut self, taxon_id: Option<&str>, class_id: Option<&str>) -> &mut Self {
        let mut request = Request::new(Entity::Model, Operation::Add);
        if let Some(taxon_id) = non_empty(taxon_id) {
            request.special("taxon-id", taxon_id);
        }
        if let Some(class_id) = non_empty(class_id) {
            request.special("class-id", class_id);
        }
        self.add(request)
    }

    // -----------------------------------------------------------------------
    // Individuals
    // -----------------------------------------------------------------------

    /**
     * Creates an individual typed by `expr` and returns the batch variable
     * it is bound to. Later requests in the same set can use the variable
     * wherever an individual id is expected.
     */
    pub fn add_individual(&mut self, expr: &ClassExpression) -> String {
        let variable = self.next_variable();
        let mut request = Request::new(Entity::Individual, Operation::Add);
        request
            .add_class_expression(expr)
            .assign_to_variable(variable.as_str());
        self.add(request);
        variable
    }

    pub fn remove_individual(&mut self, individual_id: &str) -> &mut Self {
        let mut request = Request::new(Entity::Individual, Operation::Remove);
        request.individual(individual_id);
        self.add(request)
    }

    pub fn add_type_to_individual(
        &mut self,
        expr: &ClassExpression,
        individual_id: &str,
    ) -> &mut Self {
        let mut request = Request::new(Entity::Individual, Operation::AddType);
        request.individual(individual_id).add_class_expression(expr);
        self.add(request)
    }

    pub fn remove_type_from_individual(
        &mut self,
        expr: &ClassExpression,
        individual_id: &str,
    ) -> &mut Self {
        let mut request = Request::new(Entity::Individual, Operation::RemoveType);
        request.individual(individual_id).add_class_expression(expr);
        self.add(request)
    }

    // -----------------------------------------------------------------------
    // Facts
    // -----------------------------------------------------------------------

    pub fn add_fact(&mut self, fact: &Fact) -> &mut Self {
        let mut request = Request::new(Entity::Edge, Operation::Add);
        request.fact(fact);
        self.add(request)
    }

    pub fn remove_fact(&mut self, fact: &Fact) -> &mut Self {
        let mut request = Request::new(Entity::Edge, Operation::Remove);
        request.fact(fact);
        self.add(request)
    }

    // -----------------------------------------------------------------------
    // Annotations
    // -----------------------------------------------------------------------

    pub fn add_annotation_to_individual(
        &mut self,
        key: &str,
        value: &str,
        individual_id: &str,
    ) -> &mut Self {
        self.annotate_individual(Operation::AddAnnotation, key, value, individual_id)
    }

    pub fn remove_annotation_from_individual(
        &mut self,
        key: &str,
        value: &str,
        individual_id: &str,
    ) -> &mut Self {
        self.annotate_individual(Operation::RemoveAnnotation, key, value, individual_id)
    }

    pub fn add_annotation_to_fact(&mut self, key: &str, value: &str, fact: &Fact) -> &mut Self {
        self.annotate_fact(Operation::AddAnnotation, key, value, fact)
    }

    pub fn remove_annotation_from_fact(
        &mut self,
        key: &str,
        value: &str,
        fact: &Fact,
    ) -> &mut Self {
        self.annotate_fact(Operation::RemoveAnnotation, key, value, fact)
    }

    pub fn add_annotation_to_model(&mut self, key: &str, value: &str) -> &mut Self {
        let mut request = Request::new(Entity::Model, Operation::AddAnnotation);
        request.add_annotation(key, value);
        self.add(request)
    }

    pub fn remove_annotation_from_model(&mut self, key: &str, value: &str) -> &mut Self {
        let mut request = Request::new(Entity::Model, Operation::RemoveAnnotation);
        request.add_annotation(key, value);
        self.add(request)
    }

    fn annotate_individual(
        &mut self,
        operation: Operation,
        key: &str,
        value: &str,
        individual_id: &str,
    ) -> &mut Self {
        let mut request = Request::new(Entity::Individual, operation);
        request.individual(individual_id).add_annotation(key, value);
        self.add(request)
    }

    fn annotate_fact(
        &mut self,
        operation: Operation,
        key: &str,
        value: &str,
        fact: &Fact,
    ) -> &mut Self {
        let mut request = Request::new(Entity::Edge, operation);
        request.fact(fact).add_annotation(key, value);
        self.add(request)
    }

    // -----------------------------------------------------------------------
    // Evidence
    // -----------------------------------------------------------------------

    /**
     * Attaches evidence to an individual or a fact.
     *
     * Two requests are added:
     * 1. an individual typed by `evidence_id`, annotated with one `source`
     *    value per entry of `source_ids`, bound to a fresh variable;
     * 2. an `evidence` annotation on the target pointing at that variable.
     *
     * Returns the variable of the evidence individual.
     */
    pub fn add_evidence(
        &mut self,
        evidence_id: &str,
        source_ids: &[&str],
        target: &EvidenceTarget,
    ) -> String {
        let variable = self.next_variable();

        let mut evidence = Request::new(Entity::Individual, Operation::Add);
        evidence
            .add_class_expression(&ClassExpression::class(evidence_id))
            .assign_to_variable(variable.as_str());
        for source in source_ids {
            evidence.add_annotation("source", source);
        }
        self.add(evidence);

        match target {
            EvidenceTarget::Individual(individual_id) => {
                self.add_annotation_to_individual("evidence", &variable, individual_id);
            }
            EvidenceTarget::Fact(fact) => {
                self.add_annotation_to_fact("evidence", &variable, fact);
            }
        }

        variable
    }

    /// Evidence lives in its own individual; removing it removes that.
    pub fn remove_evidence(&mut self, evidence_individual_id: &str) -> &mut Self {
        self.remove_individual(evidence_individual_id)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requests_json(set: &RequestSet) -> Value {
        let args = set.callable().expect("set should serialize");
        let (_, raw) = args
            .iter()
            .find(|(k, _)| k == "requests")
            .expect("requests argument present");
        serde_json::from_str(raw).expect("requests argument is JSON")
    }

    #[test]
    fn test_anonymous_callable_has_no_token() {
        let mut set = RequestSet::new(None, Some("gomodel:1"));
        set.get_model();

        let args = set.callable().unwrap();
        assert!(args.iter().all(|(k, _)| k != "token"));
        assert!(args.contains(&("intention".to_string(), "query".to_string())));
    }

    #[test]
    fn test_empty_token_is_anonymous() {
        let set = RequestSet::new(Some(""), None);
        assert_eq!(set.token(), None);
    }

    #[test]
    fn test_identified_callable_carries_token() {
        let mut set = RequestSet::new(Some("abc"), Some("gomodel:1"));
        set.store_model();

        let args = set.callable().unwrap();
        assert!(args.contains(&("token".to_string(), "abc".to_string())));
        assert!(args.contains(&("intention".to_string(), "action".to_string())));
    }

    #[test]
    fn test_model_id_is_propagated() {
        let mut set = RequestSet::new(None, Some("gomodel:1"));
        set.add_fact(&Fact::new("a", "b", "RO:0002333"));

        let value = requests_json(&set);
        assert_eq!(
            value,
            json!([{
                "entity": "edge",
                "operation": "add",
                "arguments": {
                    "subject": "a",
                    "object": "b",
                    "predicate": "RO:0002333",
                    "model-id": "gomodel:1",
                },
            }])
        );
    }

    /**
     * An explicit model id on a request wins over the set's model.
     */
    #[test]
    fn test_explicit_model_is_kept() {
        let mut set = RequestSet::new(None, Some("gomodel:1"));
        let mut request = Request::new(Entity::Model, Operation::Export);
        request.model("gomodel:2");
        set.add(request);

        assert_eq!(
            set.requests()[0].argument("model-id"),
            Some(&json!("gomodel:2"))
        );
    }

    #[test]
    fn test_meta_request_has_empty_arguments() {
        let mut set = RequestSet::new(None, None);
        set.get_meta();

        let value = requests_json(&set);
        assert_eq!(value, json!([{ "entity": "meta", "operation": "get", "arguments": {} }]));
    }

    #[test]
    fn test_add_individual_binds_variables_in_order() {
        let mut set = RequestSet::new(None, Some("m"));
        let first = set.add_individual(&ClassExpression::class("GO:1"));
        let second = set.add_individual(&ClassExpression::class("GO:2"));

        assert_ne!(first, second);
        assert_eq!(
            set.requests()[1].argument("assign-to-variable"),
            Some(&json!(second))
        );
        assert_eq!(set.requests()[0].argument("expressions").unwrap()[0]["id"], "GO:1");
    }

    #[test]
    fn test_individual_evidence() {
        let mut set = RequestSet::new(Some("t"), Some("m"));
        let variable = set.add_evidence(
            "ECO:0000314",
            &["PMID:1", "PMID:2"],
            &EvidenceTarget::Individual("ind1".into()),
        );

        assert_eq!(set.len(), 2);

        let evidence = &set.requests()[0];
        assert_eq!(evidence.entity(), Entity::Individual);
        assert_eq!(evidence.operation(), Operation::Add);
        assert_eq!(evidence.argument("values").unwrap().as_array().unwrap().len(), 2);
        assert_eq!(evidence.argument("values").unwrap()[1]["value"], "PMID:2");

        let link = &set.requests()[1];
        assert_eq!(link.operation(), Operation::AddAnnotation);
        assert_eq!(link.argument("individual"), Some(&json!("ind1")));
        assert_eq!(
            link.argument("values"),
            Some(&json!([{ "key": "evidence", "value": variable }]))
        );
    }

    #[test]
    fn test_fact_evidence_targets_edge() {
        let mut set = RequestSet::new(None, Some("m"));
        set.add_evidence(
            "ECO:0000314",
            &[],
            &EvidenceTarget::Fact(Fact::new("a", "b", "BFO:0000050")),
        );

        let link = &set.requests()[1];
        assert_eq!(link.entity(), Entity::Edge);
        assert_eq!(link.argument("predicate"), Some(&json!("BFO:0000050")));
        assert!(set.requests()[0].argument("values").is_none());
    }

    #[test]
    fn test_add_model_omits_absent_seeds() {
        let mut set = RequestSet::new(None, None);
        set.add_model(Some("NCBITaxon:9606"), None);

        let request = &set.requests()[0];
        assert_eq!(request.argument("taxon-id"), Some(&json!("NCBITaxon:9606")));
        assert!(request.argument("class-id").is_none());
        assert!(request.argument("model-id").is_none());
    }

    #[test]
    fn test_mixed_set_is_an_action() {
        let mut set = RequestSet::new(None, Some("m"));
        set.get_model().store_model();
        assert_eq!(set.intention(), "action");
    }
}
