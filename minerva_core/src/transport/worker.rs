/**
 * Queued engine (the default).
 *
 * All calls go through one bounded queue drained by a single
 * "minerva-worker" thread, so they reach Barista and complete in
 * submission order. Listeners therefore run on that thread too.
 *
 * A `Flush` message rides the same queue as the calls; the worker raises
 * its marker only after every call enqueued ahead of it has completed.
 * The thread ends once every `QueuedTransport` holding the sender is gone.
 */
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::http::HttpClient;
use super::{Call, Completion, Reply, Transport, TransportError};

/// Bounded channel capacity. When full, new calls fail immediately.
const QUEUE_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// WorkerMsg
// ---------------------------------------------------------------------------

pub struct Job {
    pub call: Call,
    pub done: Completion,
}

pub enum WorkerMsg {
    Job(Job),

    /**
     * The worker signals `FlushSignal` once all messages that were in the
     * channel *before* this one have been processed.
     */
    Flush(Arc<FlushSignal>),
}

// ---------------------------------------------------------------------------
// Flush marker
// ---------------------------------------------------------------------------

/**
 * Raised by the worker when it dequeues the matching `Flush` message; the
 * thread calling `flush()` parks on it until then.
 */
#[derive(Default)]
pub struct FlushSignal {
    reached: Mutex<bool>,
    wakeup: Condvar,
}

impl FlushSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        *self.reached.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wakeup.notify_all();
    }

    /// `true` if notified before `timeout` elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let reached = self.reached.lock().unwrap_or_else(PoisonError::into_inner);
        let (_reached, wait) = self
            .wakeup
            .wait_timeout_while(reached, timeout, |reached| !*reached)
            .unwrap_or_else(PoisonError::into_inner);
        !wait.timed_out()
    }
}

// ---------------------------------------------------------------------------
// Worker thread
// ---------------------------------------------------------------------------

pub struct Worker;

impl Worker {
    /**
     * Spawns the background worker thread.
     *
     * Fire-and-forget: no join handle is kept. The thread exits when the
     * channel disconnects. A completion that panics is logged and the loop
     * moves on to the next message, so every queued call still completes.
     */
    pub fn spawn(receiver: Receiver<WorkerMsg>, client: HttpClient) -> Result<(), TransportError> {
        thread::Builder::new()
            .name("minerva-worker".into())
            .spawn(move || {
                let drained = panic::catch_unwind(AssertUnwindSafe(|| {
                    Self::run_loop(&receiver, &client);
                }));
                if drained.is_err() {
                    tracing::error!("transport worker panicked; failing queued calls");
                    Self::abandon(&receiver);
                }
            })
            .map(drop)
            .map_err(|err| TransportError::Spawn(err.to_string()))
    }

    fn run_loop(receiver: &Receiver<WorkerMsg>, client: &HttpClient) {
        for msg in receiver.iter() {
            match msg {
                WorkerMsg::Job(Job { call, done }) => {
                    let reply = client.execute(&call);
                    let completed = panic::catch_unwind(AssertUnwindSafe(move || done(reply)));
                    if completed.is_err() {
                        tracing::error!(
                            url = %call.url,
                            "completion panicked; continuing with the queue"
                        );
                    }
                }
                WorkerMsg::Flush(marker) => marker.notify(),
            }
        }
    }

    /// Completes whatever is still queued once the loop cannot go on.
    fn abandon(receiver: &Receiver<WorkerMsg>) {
        for msg in receiver.try_iter() {
            match msg {
                WorkerMsg::Flush(marker) => marker.notify(),
                job => reject(job, TransportError::Disconnected),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// QueuedTransport
// ---------------------------------------------------------------------------

/// `Transport` front for the worker: enqueue and return.
pub struct QueuedTransport {
    sender: Sender<WorkerMsg>,
}

impl QueuedTransport {
    pub fn spawn(client: HttpClient) -> Result<Self, TransportError> {
        let (sender, receiver) = crossbeam_channel::bounded(QUEUE_CAPACITY);
        Worker::spawn(receiver, client)?;
        Ok(Self { sender })
    }

    /// Wraps an existing channel; the caller owns the receiving side.
    pub fn from_sender(sender: Sender<WorkerMsg>) -> Self {
        Self { sender }
    }
}

impl Transport for QueuedTransport {
    /**
     * Non-blocking enqueue. A full or disconnected queue completes the
     * call right away with the matching `TransportError`.
     */
    fn action(&self, call: Call, done: Completion) {
        match self.sender.try_send(WorkerMsg::Job(Job { call, done })) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => reject(msg, TransportError::QueueFull),
            Err(TrySendError::Disconnected(msg)) => reject(msg, TransportError::Disconnected),
        }
    }

    fn flush(&self, timeout: Duration) -> bool {
        let marker = Arc::new(FlushSignal::new());
        self.sender
            .send_timeout(WorkerMsg::Flush(marker.clone()), timeout)
            .is_ok_and(|()| marker.wait_timeout(timeout))
    }
}

fn reject(msg: WorkerMsg, error: TransportError) {
    if let WorkerMsg::Job(job) = msg {
        tracing::warn!(url = %job.call.url, %error, "dropping call");
        (job.done)(Reply::failure(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;

    fn call() -> Call {
        Call {
            url: "http://127.0.0.1:1/api/ns/m3Batch".into(),
            args: Vec::new(),
            method: Method::Get,
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Completion) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let done: Completion = Box::new(move |reply| {
            let label = match reply {
                Reply::Success(_) => "success".to_string(),
                Reply::Failure { error, .. } => error.to_string(),
            };
            sink.lock().unwrap().push(label);
        });
        (seen, done)
    }

    /**
     * With nobody draining the channel, the call past capacity is rejected
     * synchronously.
     */
    #[test]
    fn test_full_queue_rejects_immediately() {
        let (sender, _receiver) = crossbeam_channel::bounded(1);
        let transport = QueuedTransport::from_sender(sender);

        let (first, done) = recorder();
        transport.action(call(), done);
        assert!(first.lock().unwrap().is_empty());

        let (second, done) = recorder();
        transport.action(call(), done);
        assert_eq!(*second.lock().unwrap(), vec!["request queue is full".to_string()]);
    }

    #[test]
    fn test_disconnected_queue_rejects_immediately() {
        let (sender, receiver) = crossbeam_channel::bounded(4);
        drop(receiver);
        let transport = QueuedTransport::from_sender(sender);

        let (seen, done) = recorder();
        transport.action(call(), done);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["transport worker has shut down".to_string()]
        );
    }

    #[test]
    fn test_flush_marker_times_out_until_raised() {
        let marker = FlushSignal::new();
        assert!(!marker.wait_timeout(Duration::from_millis(10)));
        marker.notify();
        assert!(marker.wait_timeout(Duration::from_millis(10)));
    }

    /**
     * A flush with nobody draining the queue gives up instead of hanging.
     */
    #[test]
    fn test_flush_without_worker_times_out() {
        let (sender, _receiver) = crossbeam_channel::bounded(4);
        let transport = QueuedTransport::from_sender(sender);
        assert!(!transport.flush(Duration::from_millis(20)));
    }

    /**
     * A completion that panics does not take the queue down with it: the
     * call behind it still completes and flush still drains.
     */
    #[test]
    fn test_panicking_completion_keeps_worker_alive() {
        let transport = QueuedTransport::spawn(HttpClient::new(false)).unwrap();

        transport.action(call(), Box::new(|_: Reply| panic!("listener blew up")));
        let (seen, done) = recorder();
        transport.action(call(), done);

        assert!(transport.flush(Duration::from_secs(20)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    /**
     * Against a closed port the worker completes the job with a network
     * failure, and a subsequent flush returns once that has happened.
     */
    #[test]
    fn test_worker_completes_failed_call() {
        let transport = QueuedTransport::spawn(HttpClient::new(false)).unwrap();

        let (seen, done) = recorder();
        transport.action(call(), done);
        assert!(transport.flush(Duration::from_secs(20)));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("network error"));
    }
}
