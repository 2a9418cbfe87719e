/**
 * Threaded engine: every call runs on its own short-lived thread.
 *
 * Calls proceed in parallel and complete in whatever order the network
 * allows. An in-flight counter backs `flush()`.
 */
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use super::http::HttpClient;
use super::{Call, Completion, Reply, Transport, TransportError};

pub struct ThreadedTransport {
    client: Arc<HttpClient>,
    in_flight: Arc<InFlight>,
}

impl ThreadedTransport {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client: Arc::new(client),
            in_flight: Arc::new(InFlight::default()),
        }
    }
}

impl Transport for ThreadedTransport {
    fn action(&self, call: Call, done: Completion) {
        let slot = Arc::new(Mutex::new(Some(done)));
        let client = self.client.clone();
        let ticket = Ticket::issue(self.in_flight.clone());
        let thread_slot = slot.clone();

        let spawned = thread::Builder::new()
            .name("minerva-call".into())
            .spawn(move || {
                let _ticket = ticket;
                let reply = client.execute(&call);
                if let Some(done) = take(&thread_slot) {
                    done(reply);
                }
            });

        if let Err(err) = spawned {
            if let Some(done) = take(&slot) {
                tracing::warn!(%err, "could not spawn call thread");
                done(Reply::failure(TransportError::Spawn(err.to_string())));
            }
        }
    }

    fn flush(&self, timeout: Duration) -> bool {
        self.in_flight.wait_idle(timeout)
    }
}

fn take(slot: &Mutex<Option<Completion>>) -> Option<Completion> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

// ---------------------------------------------------------------------------
// In-flight accounting
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    condvar: Condvar,
}

impl InFlight {
    fn wait_idle(&self, timeout: Duration) -> bool {
        let guard = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        match self.condvar.wait_timeout_while(guard, timeout, |count| *count > 0) {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => false,
        }
    }
}

/**
 * Counts one call as in flight for as long as it lives. Dropped when the
 * call thread finishes, panicking or not, or when the spawn fails and the
 * closure holding it is discarded.
 */
struct Ticket(Arc<InFlight>);

impl Ticket {
    fn issue(in_flight: Arc<InFlight>) -> Self {
        *in_flight.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Self(in_flight)
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut count = self.0.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        self.0.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;

    #[test]
    fn test_flush_with_nothing_in_flight() {
        let transport = ThreadedTransport::new(HttpClient::new(false));
        assert!(transport.flush(Duration::from_millis(10)));
    }

    #[test]
    fn test_calls_complete_in_parallel() {
        let transport = ThreadedTransport::new(HttpClient::new(false));
        let completed = Arc::new(Mutex::new(0usize));

        for _ in 0..3 {
            let completed = completed.clone();
            transport.action(
                Call {
                    url: "http://127.0.0.1:1/api/ns/m3Batch".into(),
                    args: vec![("intention".into(), "query".into())],
                    method: Method::Post,
                },
                Box::new(move |reply| {
                    assert!(matches!(reply, Reply::Failure { .. }));
                    *completed.lock().unwrap() += 1;
                }),
            );
        }

        assert!(transport.flush(Duration::from_secs(20)));
        assert_eq!(*completed.lock().unwrap(), 3);
    }
}
