/**
 * The Minerva manager. Owns the identity, the event bus and the transport,
 * and turns every completed call into events.
 *
 * Lifecycle of one batch:
 * 1. An intent method (or the caller) builds a `RequestSet`.
 * 2. `request_with` encodes it, fires `prerun`, and hands the call to the
 *    transport. It returns at once.
 * 3. The transport completes the call on its own thread; the manager then
 *    fires exactly one outcome event followed by `postrun`.
 *
 * `Manager` is a cheap handle: clones share the same state. Listeners get a
 * `&Manager` and may use it to issue further requests.
 */
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use minerva_core::transport::{self, Call, Engine, Method, Reply, Transport};
use minerva_core::{Envelope, RequestSet, TransportError};

use crate::dispatch::{self, ProtocolViolation};
use crate::error::ManagerError;
use crate::identity::Identity;
use crate::registry::{EventBus, EventKind, ListenerId};

/// Barista's default local address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3400";

pub const DEFAULT_NAMESPACE: &str = "minerva_local";

/// Called when the server answers outside the known message types/signals.
pub type ViolationHook = Arc<dyn Fn(&ProtocolViolation, &Envelope) + Send + Sync>;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/**
 * Construction parameters for a `Manager`.
 *
 * # Example
 * ```ignore
 * let manager = Manager::new(Options {
 *     token: Some("my-barista-token".into()),
 *     engine: Engine::Threaded,
 *     ..Options::new("http://barista.example.org", "minerva_public")
 * })?;
 * ```
 */
#[derive(Clone)]
pub struct Options {
    /// Invariant part of the API location, without trailing slash.
    pub base_url: String,

    pub namespace: String,

    /// Barista user token. `None` or empty means anonymous.
    pub token: Option<String>,

    pub engine: Engine,

    /// Wrap calls in JSONP. Only honoured by `Engine::Queued`.
    pub use_jsonp: bool,

    pub method: Method,

    /**
     * What to do on a protocol violation, after `postrun` has fired.
     *
     * If not set, the manager panics with the violation message.
     */
    pub on_violation: Option<ViolationHook>,
}

impl Options {
    pub fn new(base_url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            token: None,
            engine: Engine::default(),
            use_jsonp: true,
            method: Method::default(),
            on_violation: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Manager {
    shared: Arc<Shared>,
}

struct Shared {
    identity: RwLock<Identity>,
    bus: EventBus<Manager>,
    transport: Arc<dyn Transport>,
    method: Method,
    on_violation: Option<ViolationHook>,
}

impl Manager {
    /**
     * Creates a manager running on the engine named in `options`.
     *
     * Fails only if the engine cannot be started (e.g. the worker thread
     * cannot be spawned).
     */
    pub fn new(options: Options) -> Result<Self, ManagerError> {
        let transport = transport::build(options.engine, options.use_jsonp)?;
        Ok(Self::with_transport(options, transport))
    }

    /// Creates a manager on a caller-supplied transport; `engine` and
    /// `use_jsonp` are ignored.
    pub fn with_transport(options: Options, transport: Arc<dyn Transport>) -> Self {
        let identity = Identity::new(
            options.base_url,
            options.namespace,
            options.token.as_deref(),
        );

        tracing::debug!(url = identity.url(), "manager created");

        Self {
            shared: Arc::new(Shared {
                identity: RwLock::new(identity),
                bus: EventBus::new(),
                transport,
                method: options.method,
                on_violation: options.on_violation,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------------

    /**
     * Registers a listener for `kind`.
     *
     * Listeners run on the thread that completes the call. For the
     * built-in engines, a transport thread, never the caller's. `prerun`
     * listeners run on the submitting thread and receive no envelope.
     */
    pub fn register<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Manager, Option<&Envelope>) + Send + Sync + 'static,
    {
        self.shared.bus.register(kind, listener)
    }

    pub fn unregister(&self, kind: EventKind, id: ListenerId) -> bool {
        self.shared.bus.unregister(kind, id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.shared.bus.listener_count(kind)
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    pub fn get_token(&self) -> Option<String> {
        self.identity().token().map(str::to_string)
    }

    /**
     * Replaces the user token (`None` or empty for anonymous) and switches
     * to the matching endpoint. Meant to be called between requests.
     */
    pub fn set_token(&self, token: Option<&str>) {
        let mut identity = self
            .shared
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let url = identity.set_token(token);
        tracing::debug!(url, "user token changed");
    }

    /// The endpoint every request currently goes to.
    pub fn get_url(&self) -> String {
        self.identity().url().to_string()
    }

    fn identity(&self) -> std::sync::RwLockReadGuard<'_, Identity> {
        self.shared
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /**
     * A fresh request set carrying the current token and, if given, scoped
     * to `model_id`. Pair with `request_with` for custom batches.
     */
    pub fn request_set(&self, model_id: Option<&str>) -> RequestSet {
        RequestSet::new(self.identity().token(), model_id)
    }

    /**
     * Submits a batch.
     *
     * Fires `prerun`, then hands the call to the transport and returns.
     * The outcome arrives later as events. The only error is a batch that
     * cannot be encoded, in which case nothing is sent and nothing fires.
     */
    pub fn request_with(&self, request_set: &RequestSet) -> Result<(), ManagerError> {
        let args = request_set.callable()?;

        self.shared.bus.apply(EventKind::PreRun, self, None);

        let call = Call {
            url: self.get_url(),
            args,
            method: self.shared.method,
        };

        tracing::debug!(
            url = %call.url,
            intention = request_set.intention(),
            requests = request_set.len(),
            "submitting batch"
        );

        let manager = self.clone();
        self.shared
            .transport
            .action(call, Box::new(move |reply| manager.complete(reply)));

        Ok(())
    }

    /**
     * Blocks until every call submitted so far has completed and its events
     * have fired, or `timeout` elapses. Returns `true` if drained in time.
     */
    pub fn flush(&self, timeout: Duration) -> bool {
        self.shared.transport.flush(timeout)
    }

    // -----------------------------------------------------------------------
    // Outcome dispatch
    // -----------------------------------------------------------------------

    fn complete(&self, reply: Reply) {
        match reply {
            Reply::Success(envelope) => self.on_nominal_success(&envelope),
            Reply::Failure { error, envelope } => self.on_fail(&error, envelope),
        }
    }

    /**
     * Transport-level failure. The server's envelope is passed on when it
     * is usable; otherwise a synthesized error envelope stands in.
     */
    fn on_fail(&self, error: &TransportError, envelope: Option<Envelope>) {
        tracing::warn!(%error, "batch failed before reaching a usable response");

        let envelope = match envelope {
            Some(envelope) if envelope.is_usable() => envelope,
            _ => Envelope::synthesized_error(Some(error.to_string())),
        };

        let bus = &self.shared.bus;
        bus.apply(EventKind::ManagerError, self, Some(&envelope));
        bus.apply(EventKind::PostRun, self, Some(&envelope));
    }

    fn on_nominal_success(&self, envelope: &Envelope) {
        let bus = &self.shared.bus;
        let routed = dispatch::route(envelope);

        match &routed {
            Ok(kind) => {
                bus.apply(*kind, self, Some(envelope));
            }
            Err(violation) => {
                tracing::error!(%violation, "response outside the batch protocol");
            }
        }

        bus.apply(EventKind::PostRun, self, Some(envelope));

        if let Err(violation) = routed {
            match &self.shared.on_violation {
                Some(hook) => hook(&violation, envelope),
                None => panic!("{violation}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Completes every call inline with a canned reply.
    struct Canned(Mutex<Vec<Reply>>);

    impl Transport for Canned {
        fn action(&self, _call: Call, done: minerva_core::Completion) {
            let reply = self.0.lock().unwrap().remove(0);
            done(reply);
        }

        fn flush(&self, _timeout: Duration) -> bool {
            true
        }
    }

    fn manager_with(replies: Vec<Reply>, options: Options) -> (Manager, Arc<Mutex<Vec<String>>>) {
        let manager = Manager::with_transport(options, Arc::new(Canned(Mutex::new(replies))));
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in EventKind::ALL {
            let log = log.clone();
            manager.register(kind, move |_, _| log.lock().unwrap().push(kind.to_string()));
        }
        (manager, log)
    }

    fn success(signal: &str) -> Reply {
        Reply::Success(Envelope {
            message_type: Some("success".into()),
            message: Some("ok".into()),
            signal: Some(signal.into()),
            ..Default::default()
        })
    }

    #[test]
    fn test_default_options() {
        let options = Options::default();
        assert_eq!(options.base_url, DEFAULT_BASE_URL);
        assert_eq!(options.engine, Engine::Queued);
        assert!(options.use_jsonp);
        assert_eq!(options.method, Method::Get);
    }

    #[test]
    fn test_token_switches_url() {
        let (manager, _) = manager_with(Vec::new(), Options::new("http://b", "ns"));
        assert_eq!(manager.get_url(), "http://b/api/ns/m3Batch");

        manager.set_token(Some("tok"));
        assert_eq!(manager.get_token().as_deref(), Some("tok"));
        assert_eq!(manager.get_url(), "http://b/api/ns/m3BatchPrivileged");
        assert_eq!(manager.request_set(None).token(), Some("tok"));

        manager.set_token(None);
        assert_eq!(manager.get_url(), "http://b/api/ns/m3Batch");
    }

    #[test]
    fn test_merge_sequence() {
        let (manager, log) = manager_with(vec![success("merge")], Options::default());
        manager.request_with(&manager.request_set(Some("m"))).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["prerun", "merge", "postrun"]);
    }

    #[test]
    fn test_network_failure_synthesizes_envelope() {
        let (manager, _) = manager_with(
            vec![Reply::failure(TransportError::Network("refused".into()))],
            Options::default(),
        );
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        manager.register(EventKind::ManagerError, move |_, envelope| {
            *sink.lock().unwrap() = envelope.cloned();
        });

        manager.request_with(&manager.request_set(None)).unwrap();

        let envelope = seen.lock().unwrap().clone().expect("manager_error fired");
        assert_eq!(envelope.message_type(), Some("error"));
        assert_eq!(envelope.message(), Some(minerva_core::DEEP_MANAGER_ERROR));
    }

    /**
     * The violation hook runs after postrun, and nothing else fires.
     */
    #[test]
    fn test_violation_hook() {
        let hooked = Arc::new(Mutex::new(Vec::new()));
        let sink = hooked.clone();
        let options = Options {
            on_violation: Some(Arc::new(move |violation: &ProtocolViolation, _: &Envelope| {
                sink.lock().unwrap().push(violation.clone());
            })),
            ..Options::default()
        };
        let (manager, log) = manager_with(vec![success("teleport")], options);

        manager.request_with(&manager.request_set(None)).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["prerun", "postrun"]);
        assert_eq!(
            *hooked.lock().unwrap(),
            vec![ProtocolViolation::UnknownSignal("teleport".into())]
        );
    }

    #[test]
    #[should_panic(expected = "unimplemented message type")]
    fn test_violation_panics_without_hook() {
        let reply = Reply::Success(Envelope {
            message_type: Some("shrug".into()),
            message: Some("?".into()),
            ..Default::default()
        });
        let (manager, _) = manager_with(vec![reply], Options::default());
        let _ = manager.request_with(&manager.request_set(None));
    }
}
