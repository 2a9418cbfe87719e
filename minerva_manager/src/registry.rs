/**
 * Callback registry — a closed set of named events, each with an ordered
 * list of listeners.
 *
 * Listeners are invoked synchronously, in registration order, on the
 * thread that fires the event. The listener list is snapshotted before
 * invocation and no lock is held while listeners run, so a listener may
 * register or unregister listeners (changes apply from the next firing).
 */
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use minerva_core::Envelope;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Fired right before a call is handed to the transport. No envelope.
    PreRun,
    /// Fired after every completed call, whatever the outcome.
    PostRun,
    /// The transport failed or the reply was unusable.
    ManagerError,
    Merge,
    Rebuild,
    Meta,
    Warning,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        Self::PreRun,
        Self::PostRun,
        Self::ManagerError,
        Self::Merge,
        Self::Rebuild,
        Self::Meta,
        Self::Warning,
        Self::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreRun => "prerun",
            Self::PostRun => "postrun",
            Self::ManagerError => "manager_error",
            Self::Merge => "merge",
            Self::Rebuild => "rebuild",
            Self::Meta => "meta",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event name: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| UnknownEvent(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Handle returned by `register`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/**
 * A listener receives the firing context (the manager, in practice) and
 * the envelope of the call, if one exists yet.
 */
pub type Listener<C> = Arc<dyn Fn(&C, Option<&Envelope>) + Send + Sync>;

pub struct EventBus<C> {
    inner: RwLock<Inner<C>>,
}

struct Inner<C> {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(ListenerId, Listener<C>)>>,
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EventBus<C> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 0,
                listeners: HashMap::new(),
            }),
        }
    }

    /// Appends `listener` to the list for `kind`.
    pub fn register<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&C, Option<&Envelope>) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = ListenerId(inner.next_id);
        inner
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered for `kind`.
    pub fn unregister(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = inner.listeners.get_mut(&kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        list.len() != before
    }

    pub fn is_registered(&self, kind: EventKind, id: ListenerId) -> bool {
        self.snapshot_ids(kind).contains(&id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.snapshot_ids(kind).len()
    }

    /**
     * Fires `kind`: runs every listener registered for it, in order.
     * Returns how many listeners ran.
     */
    pub fn apply(&self, kind: EventKind, context: &C, envelope: Option<&Envelope>) -> usize {
        let listeners: Vec<Listener<C>> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .get(&kind)
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in &listeners {
            listener(context, envelope);
        }
        listeners.len()
    }

    fn snapshot_ids(&self, kind: EventKind) -> Vec<ListenerId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .get(&kind)
            .map(|list| list.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Mutex;

    #[rstest]
    #[case("prerun", EventKind::PreRun)]
    #[case("postrun", EventKind::PostRun)]
    #[case("manager_error", EventKind::ManagerError)]
    #[case("merge", EventKind::Merge)]
    #[case("rebuild", EventKind::Rebuild)]
    #[case("meta", EventKind::Meta)]
    #[case("warning", EventKind::Warning)]
    #[case("error", EventKind::Error)]
    fn test_event_names_round_trip(#[case] name: &str, #[case] kind: EventKind) {
        assert_eq!(name.parse::<EventKind>(), Ok(kind));
        assert_eq!(kind.to_string(), name);
    }

    #[test]
    fn test_unknown_event_name() {
        assert_eq!(
            "success".parse::<EventKind>(),
            Err(UnknownEvent("success".into()))
        );
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus: EventBus<Mutex<Vec<&'static str>>> = EventBus::new();
        bus.register(EventKind::Merge, |log, _| log.lock().unwrap().push("first"));
        bus.register(EventKind::Merge, |log, _| log.lock().unwrap().push("second"));
        bus.register(EventKind::Rebuild, |log, _| log.lock().unwrap().push("other"));

        let log = Mutex::new(Vec::new());
        assert_eq!(bus.apply(EventKind::Merge, &log, None), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_unregister() {
        let bus: EventBus<()> = EventBus::new();
        let id = bus.register(EventKind::Error, |_, _| {});

        assert!(bus.is_registered(EventKind::Error, id));
        assert!(!bus.unregister(EventKind::Warning, id));
        assert!(bus.unregister(EventKind::Error, id));
        assert!(!bus.unregister(EventKind::Error, id));
        assert_eq!(bus.apply(EventKind::Error, &(), None), 0);
    }

    #[test]
    fn test_listener_sees_envelope() {
        let bus: EventBus<Mutex<Option<String>>> = EventBus::new();
        bus.register(EventKind::Warning, |seen, envelope| {
            *seen.lock().unwrap() = envelope.and_then(|e| e.message()).map(str::to_string);
        });

        let envelope = Envelope {
            message_type: Some("warning".into()),
            message: Some("careful".into()),
            ..Default::default()
        };
        let seen = Mutex::new(None);
        bus.apply(EventKind::Warning, &seen, Some(&envelope));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("careful"));
    }

    /**
     * Registering from inside a listener must not deadlock; the new
     * listener joins from the next firing on.
     */
    #[test]
    fn test_register_from_listener() {
        let bus: Arc<EventBus<()>> = Arc::new(EventBus::new());
        let hits = Arc::new(Mutex::new(0));

        let inner_bus = bus.clone();
        let inner_hits = hits.clone();
        bus.register(EventKind::Meta, move |_, _| {
            let hits = inner_hits.clone();
            inner_bus.register(EventKind::Meta, move |_, _| *hits.lock().unwrap() += 1);
        });

        assert_eq!(bus.apply(EventKind::Meta, &(), None), 1);
        assert_eq!(*hits.lock().unwrap(), 0);
        assert_eq!(bus.apply(EventKind::Meta, &(), None), 2);
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
