/*!
 * Protocol layer — what goes over the wire.
 *
 * - `constants` — endpoint segments, relation ids, client version
 * - `expression` — class expressions
 * - `request` — requests and request sets (the outgoing batch)
 * - `envelope` — the Barista response envelope
 */

pub mod constants;
pub mod envelope;
pub mod expression;
pub mod request;
