use std::thread::{self, ThreadId};
use std::sync::Mutex;

use crate::sync::lock;

/// Tracks which thread, if any, has a context current.
#[derive(Debug, Default)]
pub struct Currency {
    owner: Mutex<Option<ThreadId>>,
}

impl Currency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the context for the calling thread.
    ///
    /// Re-acquiring from the owning thread succeeds; if another thread owns it,
    /// that thread's id is returned.
    pub fn acquire(&self) -> Result<(), ThreadId> {
        let me = thread::current().id();
        let mut owner = lock(&self.owner);
        match *owner {
            Some(other) if other != me => Err(other),
            _ => {
                *owner = Some(me);
                Ok(())
            }
        }
    }

    /// Releases the context if the calling thread owns it.
    pub fn release(&self) -> bool {
        let me = thread::current().id();
        let mut owner = lock(&self.owner);
        if *owner == Some(me) {
            *owner = None;
            true
        } else {
            false
        }
    }

    pub fn is_current(&self) -> bool {
        *lock(&self.owner) == Some(thread::current().id())
    }

    pub fn owner(&self) -> Option<ThreadId> {
        *lock(&self.owner)
    }

    /// Drops ownership regardless of the owner, returning who held it.
    pub fn force_release(&self) -> Option<ThreadId> {
        lock(&self.owner).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_thread_at_a_time() {
        let currency = std::sync::Arc::new(Currency::new());
        assert!(currency.acquire().is_ok());
        assert!(currency.acquire().is_ok());
        assert!(currency.is_current());

        let other = std::sync::Arc::clone(&currency);
        let blocked = thread::spawn(move || (other.acquire().is_err(), other.release()))
            .join()
            .unwrap();
        assert_eq!(blocked, (true, false));

        assert!(currency.release());
        assert!(!currency.is_current());
        assert_eq!(currency.owner(), None);
    }

    #[test]
    fn force_release_reports_the_previous_owner() {
        let currency = Currency::new();
        currency.acquire().unwrap();
        assert_eq!(currency.force_release(), Some(thread::current().id()));
        assert_eq!(currency.force_release(), None);
    }
}
