/*!
 * Minerva Manager — the callback-dispatching front of the client.
 *
 * Owns who the client is (token and endpoint), a registry of listeners for
 * a fixed set of events, and one method per editing intent. Every submitted
 * batch produces the event sequence
 *
 * ```text
 * prerun → (manager_error | error | warning | merge | rebuild | meta) → postrun
 * ```
 *
 * # Module structure
 *
 * - `registry` — event kinds and the listener bus
 * - `identity` — token and endpoint selection
 * - `dispatch` — envelope → outcome event
 * - `manager` — options, submission, outcome handling
 * - `intents` — the per-intent methods
 */

mod dispatch;
mod error;
mod identity;
mod intents;
mod manager;
mod registry;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use dispatch::{route, ProtocolViolation};
pub use error::ManagerError;
pub use identity::{endpoint, Identity};
pub use intents::ExportFormat;
pub use manager::{Manager, Options, ViolationHook, DEFAULT_BASE_URL, DEFAULT_NAMESPACE};
pub use registry::{EventBus, EventKind, Listener, ListenerId, UnknownEvent};
