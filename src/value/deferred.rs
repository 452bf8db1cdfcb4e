//! Deferred values
//!
//! A settle-once cell standing in for a pending asynchronous result. Reactions
//! registered with [`Deferred::on_settle`] run exactly once, synchronously with
//! the settling call (or immediately when registered on an already settled
//! cell). `async` callers wait with [`Deferred::settled`].

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::Value;

/// Fulfilment value or rejection reason.
pub type Outcome = std::result::Result<Value, Value>;

type Reaction = Box<dyn FnOnce(&Outcome) + Send>;

enum State {
    Pending(Vec<Reaction>),
    Settled(Outcome),
}

struct Inner {
    state: Mutex<State>,
    notify: Notify,
}

/// Shared handle to a deferred value.
#[derive(Clone)]
pub struct Deferred {
    inner: Arc<Inner>,
}

impl Deferred {
    /// Creates a pending deferred.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending(Vec::new())),
                notify: Notify::new(),
            }),
        }
    }

    /// Creates an already fulfilled deferred.
    pub fn resolved(value: impl Into<Value>) -> Self {
        let deferred = Self::new();
        deferred.resolve(value.into());
        deferred
    }

    /// Creates an already rejected deferred.
    pub fn rejected(reason: impl Into<Value>) -> Self {
        let deferred = Self::new();
        deferred.reject(reason.into());
        deferred
    }

    /// Fulfils the deferred. Returns `false` if it was already settled.
    pub fn resolve(&self, value: Value) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects the deferred. Returns `false` if it was already settled.
    pub fn reject(&self, reason: Value) -> bool {
        self.settle(Err(reason))
    }

    fn settle(&self, outcome: Outcome) -> bool {
        let reactions = {
            let mut state = self.inner.state.lock();
            if matches!(*state, State::Settled(_)) {
                return false;
            }
            match std::mem::replace(&mut *state, State::Settled(outcome.clone())) {
                State::Pending(reactions) => reactions,
                State::Settled(_) => Vec::new(),
            }
        };

        self.inner.notify.notify_waiters();
        for reaction in reactions {
            reaction(&outcome);
        }
        true
    }

    /// Returns the outcome once settled.
    pub fn outcome(&self) -> Option<Outcome> {
        match &*self.inner.state.lock() {
            State::Pending(_) => None,
            State::Settled(outcome) => Some(outcome.clone()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.inner.state.lock(), State::Pending(_))
    }

    /// Registers a reaction to run once the deferred settles.
    pub fn on_settle<F>(&self, reaction: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let outcome = {
            let mut state = self.inner.state.lock();
            match &mut *state {
                State::Pending(reactions) => {
                    reactions.push(Box::new(reaction));
                    return;
                }
                State::Settled(outcome) => outcome.clone(),
            }
        };
        reaction(&outcome);
    }

    /// Waits until the deferred settles.
    pub async fn settled(&self) -> Outcome {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Reference identity.
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state.lock() {
            State::Pending(_) => "pending",
            State::Settled(Ok(_)) => "fulfilled",
            State::Settled(Err(_)) => "rejected",
        };
        write!(f, "Deferred {{ <{}> }}", state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_settles_once() {
        let deferred = Deferred::new();
        assert!(deferred.is_pending());
        assert!(deferred.resolve(Value::from(1)));
        assert!(!deferred.reject(Value::from("late")));
        assert_eq!(deferred.outcome(), Some(Ok(Value::from(1))));
    }

    #[test]
    fn test_reactions_run_on_settle_and_when_late() {
        let calls = Arc::new(AtomicUsize::new(0));
        let deferred = Deferred::new();

        let counter = calls.clone();
        deferred.on_settle(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        deferred.reject(Value::from("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = calls.clone();
        deferred.on_settle(move |outcome| {
            assert!(outcome.is_err());
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_settled_waits_for_resolution() {
        let deferred = Deferred::new();
        let producer = deferred.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.resolve(Value::from("done"));
        });

        assert_eq!(deferred.settled().await, Ok(Value::from("done")));
    }
}
