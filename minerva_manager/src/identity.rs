/**
 * Who the manager speaks as, and therefore where it sends batches.
 *
 * Barista exposes two batch endpoints per namespace: `m3Batch` for
 * anonymous use and `m3BatchPrivileged` for identified users. The active
 * one follows the token; it is recomputed on every token change so it can
 * never disagree with the token.
 */
use minerva_core::protocol::constants::{ANONYMOUS_BATCH, API_SEGMENT, PRIVILEGED_BATCH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    base: String,
    namespace: String,
    token: Option<String>,
    url: String,
}

impl Identity {
    pub fn new(base: impl Into<String>, namespace: impl Into<String>, token: Option<&str>) -> Self {
        let mut identity = Self {
            base: base.into(),
            namespace: namespace.into(),
            token: None,
            url: String::new(),
        };
        identity.set_token(token);
        identity
    }

    /**
     * Replaces the token (an empty string counts as none) and returns the
     * endpoint now in use.
     */
    pub fn set_token(&mut self, token: Option<&str>) -> &str {
        self.token = token.filter(|t| !t.is_empty()).map(str::to_string);
        self.url = endpoint(&self.base, &self.namespace, self.token.as_deref());
        &self.url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_privileged(&self) -> bool {
        self.token.is_some()
    }
}

/// `<base>/api/<namespace>/m3Batch[Privileged]`
pub fn endpoint(base: &str, namespace: &str, token: Option<&str>) -> String {
    let batch = match token {
        Some(t) if !t.is_empty() => PRIVILEGED_BATCH,
        _ => ANONYMOUS_BATCH,
    };
    format!("{base}/{API_SEGMENT}/{namespace}/{batch}")
}
