/**
 * Class expressions as Minerva understands them.
 *
 * Only the shapes the manager produces are modelled: a named class, an
 * existential restriction ("some values from", `svf`), and the two set
 * operators. The JSON form matches what Minerva reads out of the
 * `expressions` argument of individual requests:
 *
 * ```json
 * { "type": "svf",
 *   "property": { "type": "property", "id": "RO:0002333" },
 *   "filler": { "type": "class", "id": "UniProtKB:P12345" } }
 * ```
 */
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// ClassExpression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassExpression {
    /// A named class such as `GO:0003674`.
    Class(String),

    /// `property some filler`.
    Svf {
        property: String,
        filler: Box<ClassExpression>,
    },

    Intersection(Vec<ClassExpression>),
    Union(Vec<ClassExpression>),
}

impl ClassExpression {
    pub fn class(id: impl Into<String>) -> Self {
        Self::Class(id.into())
    }

    /**
     * Builds `property some filler`.
     *
     * Anything convertible into a `ClassExpression` is accepted as the
     * filler, so plain class identifiers work directly:
     *
     * ```ignore
     * let enabled_by = ClassExpression::svf("UniProtKB:P12345", ENABLED_BY);
     * ```
     */
    pub fn svf(filler: impl Into<ClassExpression>, property: impl Into<String>) -> Self {
        Self::Svf {
            property: property.into(),
            filler: Box::new(filler.into()),
        }
    }

    /**
     * A named class with an empty id, or a set operator with no members.
     * Callers treat these like an absent expression.
     */
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Class(id) => id.is_empty(),
            Self::Svf { .. } => false,
            Self::Intersection(members) | Self::Union(members) => members.is_empty(),
        }
    }

    /// Serializes into the JSON structure Minerva expects.
    pub fn structure(&self) -> Value {
        match self {
            Self::Class(id) => json!({ "type": "class", "id": id }),
            Self::Svf { property, filler } => json!({
                "type": "svf",
                "property": { "type": "property", "id": property },
                "filler": filler.structure(),
            }),
            Self::Intersection(members) => json!({
                "type": "intersection",
                "expressions": members.iter().map(Self::structure).collect::<Vec<_>>(),
            }),
            Self::Union(members) => json!({
                "type": "union",
                "expressions": members.iter().map(Self::structure).collect::<Vec<_>>(),
            }),
        }
    }
}

impl From<&str> for ClassExpression {
    fn from(id: &str) -> Self {
        Self::Class(id.to_string())
    }
}

impl From<String> for ClassExpression {
    fn from(id: String) -> Self {
        Self::Class(id)
    }
}

impl From<&ClassExpression> for ClassExpression {
    fn from(expr: &ClassExpression) -> Self {
        expr.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_structure() {
        let expr = ClassExpression::from("GO:0003674");
        assert_eq!(expr.structure(), json!({ "type": "class", "id": "GO:0003674" }));
    }

    #[test]
    fn test_svf_structure() {
        let expr = ClassExpression::svf("GO:0005634", "occurs_in");
        assert_eq!(
            expr.structure(),
            json!({
                "type": "svf",
                "property": { "type": "property", "id": "occurs_in" },
                "filler": { "type": "class", "id": "GO:0005634" },
            })
        );
    }

    #[test]
    fn test_blank_expressions() {
        assert!(ClassExpression::from("").is_blank());
        assert!(ClassExpression::Union(vec![]).is_blank());
        assert!(!ClassExpression::svf("", "occurs_in").is_blank());
    }

    /**
     * Nested set operators keep member order.
     */
    #[test]
    fn test_intersection_of_svf() {
        let expr = ClassExpression::Intersection(vec![
            ClassExpression::class("GO:0003674"),
            ClassExpression::svf("UniProtKB:P1", "RO:0002333"),
        ]);
        let value = expr.structure();
        assert_eq!(value["type"], "intersection");
        assert_eq!(value["expressions"][0]["id"], "GO:0003674");
        assert_eq!(value["expressions"][1]["type"], "svf");
    }
}
