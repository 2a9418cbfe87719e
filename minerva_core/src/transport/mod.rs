/*!
 * Transport layer — how a batch reaches Barista and how the reply comes
 * back.
 *
 * A transport takes a `Call` (URL, argument pairs, method) and a one-shot
 * completion. It must return without waiting for the network; the
 * completion is invoked later, on whatever thread finished the call, with
 * a `Reply`.
 *
 * - `http` — ureq-based client shared by both engines
 * - `worker` — `Engine::Queued`: one background thread, bounded queue
 * - `threaded` — `Engine::Threaded`: one thread per call
 */

pub mod http;
pub mod threaded;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use crate::protocol::envelope::Envelope;

pub use http::HttpClient;
pub use threaded::ThreadedTransport;
pub use worker::{FlushSignal, QueuedTransport, Worker, WorkerMsg};

// ---------------------------------------------------------------------------
// Call / Reply
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// One outgoing batch, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub url: String,
    pub args: Vec<(String, String)>,
    pub method: Method,
}

/**
 * The outcome of a call as seen by the transport.
 *
 * `Success` is only produced for a 2xx reply whose body parsed into a
 * usable envelope. Everything else is a `Failure`, carrying whatever
 * envelope could still be recovered from the body.
 */
#[derive(Debug)]
pub enum Reply {
    Success(Envelope),
    Failure {
        error: TransportError,
        envelope: Option<Envelope>,
    },
}

impl Reply {
    pub fn failure(error: TransportError) -> Self {
        Self::Failure {
            error,
            envelope: None,
        }
    }
}

/// Invoked exactly once per call.
pub type Completion = Box<dyn FnOnce(Reply) + Send + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("request queue is full")]
    QueueFull,

    #[error("transport worker has shut down")]
    Disconnected,

    #[error("failed to spawn transport thread: {0}")]
    Spawn(String),
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub trait Transport: Send + Sync {
    /// Hands the call off and returns immediately.
    fn action(&self, call: Call, done: Completion);

    /**
     * Blocks until every call handed off so far has completed, or until
     * `timeout` elapses. Returns `true` if everything drained in time.
     */
    fn flush(&self, timeout: Duration) -> bool;
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Which built-in transport a manager runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Engine {
    /// Single background worker, calls executed in submission order.
    /// The only engine that can wrap calls in JSONP.
    #[default]
    Queued,

    /// A fresh thread per call; calls run in parallel.
    Threaded,
}

/**
 * Builds the transport for `engine`.
 *
 * JSONP is honoured only by `Engine::Queued`; asking for it on another
 * engine logs a warning and falls back to plain JSON.
 */
pub fn build(engine: Engine, use_jsonp: bool) -> Result<Arc<dyn Transport>, TransportError> {
    match engine {
        Engine::Queued => {
            let client = HttpClient::new(use_jsonp);
            Ok(Arc::new(QueuedTransport::spawn(client)?))
        }
        Engine::Threaded => {
            if use_jsonp {
                tracing::warn!("JSONP is only available with the queued engine; sending plain requests");
            }
            Ok(Arc::new(ThreadedTransport::new(HttpClient::new(false))))
        }
    }
}
