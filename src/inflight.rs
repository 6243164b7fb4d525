use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of item keys with a request in flight.
///
/// Cloning shares the set, so a view and a repository can watch the same keys.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `key`; `None` if a request for it is already running.
    /// The key is released when the returned ticket drops.
    pub fn try_acquire(&self, key: impl Into<String>) -> Option<Ticket> {
        let key = key.into();
        if self.lock().insert(key.clone()) {
            Some(Ticket { keys: Arc::clone(&self.keys), key })
        } else {
            None
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[derive(Debug)]
pub struct Ticket {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Ticket {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.remove(&self.key);
    }
}
