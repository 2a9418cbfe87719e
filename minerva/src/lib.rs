/*!
 * Minerva — a client for the Minerva/Barista model editing API.
 *
 * This is the crate applications should depend on. It re-exports the
 * request-building types from `minerva_core` and the callback-dispatching
 * `Manager` from `minerva_manager`.
 *
 * # Quick start
 *
 * ```ignore
 * use std::time::Duration;
 *
 * let manager = minerva::connect("http://localhost:3400", "minerva_local", None)?;
 *
 * manager.register(minerva::EventKind::Meta, |_, envelope| {
 *     println!("meta: {:?}", envelope.and_then(|e| e.data()));
 * });
 * manager.get_meta()?;
 *
 * // Calls complete on a background thread; wait for them before exiting.
 * manager.flush(Duration::from_secs(30));
 * ```
 *
 * # With options
 *
 * ```ignore
 * let manager = minerva::Manager::new(minerva::Options {
 *     token: Some("BARISTA_TOKEN".into()),
 *     engine: minerva::Engine::Threaded,
 *     method: minerva::Method::Post,
 *     ..minerva::Options::new("http://barista.example.org", "minerva_public")
 * })?;
 * ```
 */

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use minerva_core::{
    ClassExpression, Engine, Entity, Envelope, EvidenceTarget, Fact, MessageType, Method,
    Operation, Request, RequestSet, Signal, Transport, TransportError, CLIENT_VERSION,
};
pub use minerva_manager::{
    EventKind, ExportFormat, ListenerId, Manager, ManagerError, Options, ProtocolViolation,
    ViolationHook, DEFAULT_BASE_URL, DEFAULT_NAMESPACE,
};

/**
 * Creates a manager on the default engine (queued, JSONP, GET).
 *
 * An empty `token` is treated like `None`: the manager starts anonymous.
 */
pub fn connect(
    base_url: &str,
    namespace: &str,
    token: Option<&str>,
) -> Result<Manager, ManagerError> {
    let manager = Manager::new(Options {
        token: token.filter(|t| !t.is_empty()).map(str::to_string),
        ..Options::new(base_url, namespace)
    })?;

    tracing::info!(
        url = %manager.get_url(),
        version = CLIENT_VERSION,
        "minerva manager ready"
    );

    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_anonymous() {
        let manager = connect("http://localhost:3400", "minerva_local", Some("")).unwrap();
        assert_eq!(manager.get_token(), None);
        assert_eq!(
            manager.get_url(),
            "http://localhost:3400/api/minerva_local/m3Batch"
        );
    }

    #[test]
    fn test_connect_with_token() {
        let manager = connect("http://localhost:3400", "minerva_local", Some("abc")).unwrap();
        assert_eq!(manager.get_token().as_deref(), Some("abc"));
        assert!(manager.get_url().ends_with("/m3BatchPrivileged"));
    }
}
