//! Lazily resolved entity fields.
//!
//! A [`Deferred`] starts out either with a value or with a thunk. The first read runs the thunk
//! and keeps its result; a write replaces whatever is there and drops the thunk unrun. A thunk
//! that fails is kept, so the next read tries again.

use std::{fmt, sync::RwLock};

use crate::Result;

type Thunk<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

enum DeferredState<T> {
    Unevaluated(Thunk<T>),
    Evaluated(T),
}

impl<T> DeferredState<T> {
    fn force(&mut self) -> Result<&mut T> {
        if let DeferredState::Unevaluated(thunk) = &*self {
            let value = thunk()?;
            *self = DeferredState::Evaluated(value);
        }

        match self {
            DeferredState::Evaluated(value) => Ok(value),
            DeferredState::Unevaluated(_) => Err(invariant_error!("Deferred value left unevaluated")),
        }
    }
}

/// A field that is materialized at most once and can be overridden at any time.
pub struct Deferred<T> {
    state: RwLock<DeferredState<T>>,
}

impl<T: Clone> Deferred<T> {
    /// A field that already holds `value`
    pub fn new(value: T) -> Self {
        Deferred {
            state: RwLock::new(DeferredState::Evaluated(value)),
        }
    }

    /// A field resolved by `thunk` on first access
    pub fn lazy<F>(thunk: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Deferred {
            state: RwLock::new(DeferredState::Unevaluated(Box::new(thunk))),
        }
    }

    /// Returns the value, running the thunk if this is the first access.
    ///
    /// # Errors
    /// Returns the error of the thunk. The thunk stays in place and runs again on the next call.
    pub fn get(&self) -> Result<T> {
        {
            let state = read_lock!(self.state);
            if let DeferredState::Evaluated(value) = &*state {
                return Ok(value.clone());
            }
        }

        let mut state = write_lock!(self.state);
        state.force().map(|value| value.clone())
    }

    /// Replaces the value. A pending thunk is dropped without being run.
    pub fn set(&self, value: T) {
        *write_lock!(self.state) = DeferredState::Evaluated(value);
    }

    /// Modifies the value in place, materializing it first if needed.
    ///
    /// # Errors
    /// Returns the error of the thunk if the value had to be materialized and that failed.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut state = write_lock!(self.state);
        state.force().map(f)
    }

    /// The value if it is materialized, without running the thunk
    pub fn peek(&self) -> Option<T> {
        match &*read_lock!(self.state) {
            DeferredState::Evaluated(value) => Some(value.clone()),
            DeferredState::Unevaluated(_) => None,
        }
    }

    /// True once the value was read or written
    pub fn is_evaluated(&self) -> bool {
        matches!(&*read_lock!(self.state), DeferredState::Evaluated(_))
    }
}

impl<T: Clone + Default> Default for Deferred<T> {
    fn default() -> Self {
        Deferred::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*read_lock!(self.state) {
            DeferredState::Evaluated(value) => f.debug_tuple("Deferred").field(value).finish(),
            DeferredState::Unevaluated(_) => f.write_str("Deferred(<unevaluated>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::Error;

    fn counted(counter: &Arc<AtomicUsize>) -> Deferred<u32> {
        let counter = counter.clone();
        Deferred::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
    }

    #[test]
    fn thunk_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let value = counted(&counter);

        assert!(!value.is_evaluated());
        assert_eq!(value.peek(), None);
        for _ in 0..5 {
            assert_eq!(value.get().unwrap(), 42);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(value.peek(), Some(42));
    }

    #[test]
    fn write_before_read_skips_thunk() {
        let counter = Arc::new(AtomicUsize::new(0));
        let value = counted(&counter);

        value.set(7);
        assert_eq!(value.get().unwrap(), 7);
        assert_eq!(value.get().unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn write_after_read_overrides() {
        let counter = Arc::new(AtomicUsize::new(0));
        let value = counted(&counter);

        assert_eq!(value.get().unwrap(), 42);
        value.set(1);
        assert_eq!(value.get().unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let value: Deferred<u32> = Deferred::lazy(move || {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::OutOfBounds)
            } else {
                Ok(3)
            }
        });

        assert!(matches!(value.get(), Err(Error::OutOfBounds)));
        assert!(!value.is_evaluated());
        assert_eq!(value.get().unwrap(), 3);
        assert_eq!(value.get().unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn update_materializes_first() {
        let value: Deferred<Vec<u32>> = Deferred::lazy(|| Ok(vec![1, 2]));
        let len = value
            .update(|items| {
                items.push(3);
                items.len()
            })
            .unwrap();

        assert_eq!(len, 3);
        assert_eq!(value.get().unwrap(), vec![1, 2, 3]);
    }
}
