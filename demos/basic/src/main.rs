/**
 * Minimal demo for the Minerva client.
 *
 * Talks to a running Barista (defaults to a local one), then:
 * - fetches meta-information about all models,
 * - creates a new model,
 * - with `--store`, stores the new model as soon as it is created.
 *
 *   MINERVA_TOKEN=... cargo run -p minerva_demo
 *   cargo run -p minerva_demo -- --threaded     # one thread per call, POST
 *   cargo run -p minerva_demo -- --no-jsonp     # plain JSON on the queue
 *   RUST_LOG=debug cargo run -p minerva_demo -- --store
 */
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use minerva::{
    Engine, Envelope, EventKind, Manager, Method, Options, ProtocolViolation, DEFAULT_BASE_URL,
    DEFAULT_NAMESPACE,
};
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let threaded = args.iter().any(|a| a == "--threaded");
    let no_jsonp = args.iter().any(|a| a == "--no-jsonp");
    let store = args.iter().any(|a| a == "--store");

    let options = Options {
        token: std::env::var("MINERVA_TOKEN").ok().filter(|t| !t.is_empty()),
        engine: if threaded { Engine::Threaded } else { Engine::Queued },
        method: if threaded { Method::Post } else { Method::Get },
        use_jsonp: !threaded && !no_jsonp,
        on_violation: Some(Arc::new(|violation: &ProtocolViolation, envelope: &Envelope| {
            tracing::error!(%violation, ?envelope, "server spoke outside the protocol");
        })),
        ..Options::new(
            env_or("MINERVA_BASE", DEFAULT_BASE_URL),
            env_or("MINERVA_NAMESPACE", DEFAULT_NAMESPACE),
        )
    };

    let manager = match Manager::new(options) {
        Ok(manager) => manager,
        Err(err) => {
            tracing::error!(%err, "could not start the manager");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(url = %manager.get_url(), "talking to barista");

    /*
     * Listeners. Every outcome is logged; a rebuild after add_model may
     * trigger a store when --store was given.
     */
    manager.register(EventKind::PreRun, |_, _| tracing::debug!("batch submitted"));
    manager.register(EventKind::PostRun, |_, _| tracing::debug!("batch finished"));
    manager.register(EventKind::Meta, |_, envelope| {
        let models = envelope
            .and_then(|e| e.data())
            .and_then(|d| d.get("models-meta"))
            .and_then(|m| m.as_object())
            .map_or(0, |m| m.len());
        tracing::info!(models, "meta received");
    });
    manager.register(EventKind::Merge, |_, _| tracing::info!("merge received"));
    manager.register(EventKind::Warning, |_, envelope| {
        tracing::warn!(reason = ?envelope.and_then(|e| e.message()), "server warning");
    });
    manager.register(EventKind::Error, |_, envelope| {
        tracing::error!(reason = ?envelope.and_then(|e| e.message()), "server error");
    });
    manager.register(EventKind::ManagerError, |_, envelope| {
        tracing::error!(
            commentary = ?envelope.and_then(|e| e.commentary()),
            "request never got a usable answer"
        );
    });
    let stored = AtomicBool::new(false);
    manager.register(EventKind::Rebuild, move |manager, envelope| {
        let model_id = envelope
            .and_then(|e| e.data())
            .and_then(|d| d.get("id"))
            .and_then(|id| id.as_str());
        tracing::info!(?model_id, "rebuild received");

        if let (true, Some(model_id)) = (store, model_id) {
            // The store itself answers with a rebuild; only store once.
            if manager.get_token().is_some() && !stored.swap(true, Ordering::SeqCst) {
                if let Err(err) = manager.store_model(model_id) {
                    tracing::error!(%err, "could not submit store");
                }
            }
        }
    });

    /*
     * Fire the batches. Both return at once; the events arrive from the
     * transport's threads.
     */
    if let Err(err) = manager.get_meta() {
        tracing::error!(%err, "get_meta");
    }
    if manager.get_token().is_some() {
        if let Err(err) = manager.add_model(None, None) {
            tracing::error!(%err, "add_model");
        }
    } else {
        tracing::info!("no MINERVA_TOKEN set; skipping model creation");
    }

    /*
     * A store queued from inside a listener is submitted while this flush
     * waits, so flush twice to cover it.
     */
    let drained = manager.flush(Duration::from_secs(60)) && manager.flush(Duration::from_secs(60));
    if !drained {
        tracing::warn!("timed out waiting for barista");
        return ExitCode::FAILURE;
    }

    tracing::info!("done");
    ExitCode::SUCCESS
}

