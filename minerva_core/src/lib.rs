/*!
 * Minerva Core — request batches, response envelopes and transports.
 *
 * This crate knows how to build what Barista expects and how to carry it
 * there. It has no notion of callbacks or identity; that lives in
 * `minerva_manager`. End users should depend on the `minerva` facade.
 *
 * # Module structure
 *
 * - `protocol/` — what we send and receive: requests, class expressions,
 *   the response envelope, constants
 * - `transport/` — how we deliver: HTTP client, queued and threaded engines
 */

pub mod protocol;
pub mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use protocol::constants::{
    ANONYMOUS_BATCH, CLIENT_VERSION, DEEP_MANAGER_ERROR, ENABLED_BY, OCCURS_IN, PRIVILEGED_BATCH,
};
pub use protocol::envelope::{Envelope, MessageType, Signal};
pub use protocol::expression::ClassExpression;
pub use protocol::request::{Entity, EvidenceTarget, Fact, Operation, Request, RequestSet};
pub use transport::{
    Call, Completion, Engine, HttpClient, Method, Reply, Transport, TransportError,
};
