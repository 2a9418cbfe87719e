/**
 * Maps a usable envelope onto the single outcome event it should fire.
 *
 * `error` and `warning` are decided by the message type alone; a success
 * is further split by its signal. Anything outside that table is a
 * `ProtocolViolation`: the server answered in a way this client was never
 * written for.
 */
use minerva_core::{Envelope, MessageType, Signal};

use crate::registry::EventKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("unimplemented message type: {0:?}")]
    UnknownMessageType(String),

    #[error("unknown signal on success: {0:?}")]
    UnknownSignal(String),
}

pub fn route(envelope: &Envelope) -> Result<EventKind, ProtocolViolation> {
    let message_type = envelope.message_type().unwrap_or_default();

    match MessageType::parse(message_type) {
        Some(MessageType::Error) => Ok(EventKind::Error),
        Some(MessageType::Warning) => Ok(EventKind::Warning),
        Some(MessageType::Success) => {
            let signal = envelope.signal().unwrap_or_default();
            match Signal::parse(signal) {
                Some(Signal::Merge) => Ok(EventKind::Merge),
                Some(Signal::Rebuild) => Ok(EventKind::Rebuild),
                Some(Signal::Meta) => Ok(EventKind::Meta),
                None => Err(ProtocolViolation::UnknownSignal(signal.to_string())),
            }
        }
        None => Err(ProtocolViolation::UnknownMessageType(message_type.to_string())),
    }
}
