//! Errors surfaced directly to callers of the manager.
//!
//! Outcomes of submitted batches never show up here; those are delivered
//! as events.

use minerva_core::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The batch could not be serialized; nothing was sent and no event fired.
    #[error("could not encode request batch: {0}")]
    Encode(#[from] serde_json::Error),

    /// The transport engine could not be started.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
