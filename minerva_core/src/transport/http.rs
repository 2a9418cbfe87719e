/*!
 * HTTP client for the Barista batch endpoints.
 *
 * Uses `ureq`, a blocking client with no async runtime. Both engines call
 * it from their own threads, so blocking here never reaches the caller of
 * the manager.
 *
 * - **Single attempt** — no retries; a failed call becomes a `Failure`
 *   reply and the manager reports it through `manager_error`.
 * - **Status codes are data** — non-2xx replies are read like any other,
 *   so an error envelope in the body is still recovered.
 */

use std::time::Duration;

use ureq::Agent;

use super::{Call, Method, Reply, TransportError};
use crate::protocol::constants::{JSONP_CALLBACK, JSONP_PARAM};
use crate::protocol::envelope::Envelope;

/// Longest body excerpt kept in a `TransportError::Status`.
const BODY_EXCERPT: usize = 512;

pub struct HttpClient {
    agent: Agent,
    jsonp: bool,
}

impl HttpClient {
    /**
     * Creates a client with a configured `ureq::Agent`.
     *
     * Timeouts:
     * - 10 s connect
     * - 30 s total per request
     */
    pub fn new(jsonp: bool) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_connect(Some(Duration::from_secs(10)))
            .timeout_global(Some(Duration::from_secs(30)))
            .http_status_as_error(false)
            .build()
            .into();

        Self { agent, jsonp }
    }

    /**
     * Performs the call and classifies the outcome.
     *
     * GET sends the arguments as query parameters, POST as a form body.
     * With JSONP enabled a `callback` parameter is added and the reply is
     * unwrapped before parsing.
     */
    pub fn execute(&self, call: &Call) -> Reply {
        let mut args: Vec<(&str, &str)> = call
            .args
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if self.jsonp {
            args.push((JSONP_PARAM, JSONP_CALLBACK));
        }

        tracing::debug!(url = %call.url, method = ?call.method, "sending batch");

        let result = match call.method {
            Method::Get => self
                .agent
                .get(call.url.as_str())
                .query_pairs(args)
                .call(),
            Method::Post => self.agent.post(call.url.as_str()).send_form(args),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => return Reply::failure(TransportError::Network(err.to_string())),
        };

        let status = response.status().as_u16();
        let body = match response.into_body().read_to_string() {
            Ok(body) => body,
            Err(err) => return Reply::failure(TransportError::Decode(err.to_string())),
        };

        classify(status, &body, self.jsonp)
    }
}

/**
 * Turns a status and raw body into a `Reply`.
 */
fn classify(status: u16, body: &str, jsonp: bool) -> Reply {
    let text = if jsonp { unwrap_jsonp(body) } else { body.trim() };
    let parsed = Envelope::from_json(text);

    if !(200..300).contains(&status) {
        return Reply::Failure {
            error: TransportError::Status {
                status,
                body: excerpt(body),
            },
            envelope: parsed.ok(),
        };
    }

    match parsed {
        Ok(envelope) if envelope.is_usable() => Reply::Success(envelope),
        Ok(envelope) => Reply::Failure {
            error: TransportError::Decode("envelope lacks message-type or message".into()),
            envelope: Some(envelope),
        },
        Err(err) => Reply::failure(TransportError::Decode(err.to_string())),
    }
}

/**
 * Strips `minerva_jsonp( ... )` (optionally followed by `;`) from a body.
 * Bodies that are not wrapped are returned trimmed but otherwise as-is.
 */
pub fn unwrap_jsonp(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix(JSONP_CALLBACK) else {
        return trimmed;
    };

    let rest = rest.trim_start();
    let rest = rest.strip_suffix(';').unwrap_or(rest).trim_end();

    match rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}
