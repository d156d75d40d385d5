//! Request bookkeeping for views.
//!
//! [`InFlight`] keeps one outstanding request per action key, so a double click
//! does not send the same mutation twice. [`ViewLifetime`] cancels the requests of
//! a view once the view is dismissed.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::error::ClientError;

/// Set of actions currently awaiting a response.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as in flight. Returns `None` if it already is.
    pub fn try_begin(&self, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !keys.insert(key.clone()) {
            debug!(action = %key, "Action already in flight");
            return None;
        }
        Some(InFlightGuard {
            keys: self.keys.clone(),
            key,
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).contains(key)
    }
}

/// Releases its action key when dropped.
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).remove(&self.key);
    }
}

/// Lifetime of a mounted view. Dropping or closing it cancels every request
/// started through one of its [`LifetimeToken`]s.
pub struct ViewLifetime {
    closed: watch::Sender<bool>,
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewLifetime {
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self { closed }
    }

    pub fn token(&self) -> LifetimeToken {
        LifetimeToken {
            closed: self.closed.subscribe(),
        }
    }

    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Drop for ViewLifetime {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Clone)]
pub struct LifetimeToken {
    closed: watch::Receiver<bool>,
}

impl LifetimeToken {
    pub fn is_cancelled(&self) -> bool {
        *self.closed.borrow()
    }

    /// Wait until the owning view is closed.
    pub async fn cancelled(&self) {
        let mut closed = self.closed.clone();
        // Err means the lifetime was dropped, which also ends the view.
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Run `fut` unless the view closes first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        if self.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        tokio::select! {
            result = fut => result,
            _ = self.cancelled() => Err(ClientError::Cancelled),
        }
    }
}
