//! Lazy sequences.
//!
//! # Design Decisions
//! - Elements are produced only as the caller consumes them
//! - No buffering: a mapped sequence pulls straight from its source
//! - Restartability is a property of the source and is preserved by `map`

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::schema::{ConfigError, Result};

/// Boxed iterator handed out by a [`LazySeq`].
pub type SeqIter<T> = Box<dyn Iterator<Item = T> + Send>;

type Factory<T> = Arc<dyn Fn() -> SeqIter<T> + Send + Sync>;

enum Source<T> {
    /// Opens a fresh iterator on every call.
    Restartable(Factory<T>),
    /// Single iterator, taken by the first consumer.
    Once(Arc<Mutex<Option<SeqIter<T>>>>),
}

/// A lazy, possibly restartable sequence of `T`.
///
/// Clones share the same source: cloning a one-shot sequence does not make
/// it iterable twice.
pub struct LazySeq<T> {
    source: Source<T>,
}

impl<T: 'static> LazySeq<T> {
    /// Wrap an iterator that can be consumed exactly once.
    pub fn once<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let iter: SeqIter<T> = Box::new(items.into_iter());
        Self {
            source: Source::Once(Arc::new(Mutex::new(Some(iter)))),
        }
    }

    /// Wrap a factory that reopens the underlying source on each iteration.
    pub fn restartable<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            source: Source::Restartable(Arc::new(move || {
                Box::new(factory().into_iter()) as SeqIter<T>
            })),
        }
    }

    /// Whether [`iter`](Self::iter) may be called more than once.
    pub fn is_restartable(&self) -> bool {
        matches!(self.source, Source::Restartable(_))
    }

    /// Start consuming the sequence.
    ///
    /// Fails with [`ConfigError::SequenceConsumed`] when a one-shot sequence
    /// has already been taken.
    pub fn iter(&self) -> Result<SeqIter<T>> {
        match &self.source {
            Source::Restartable(factory) => Ok(factory()),
            Source::Once(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or(ConfigError::SequenceConsumed),
        }
    }

    /// Lazily apply `f` to every element.
    pub fn map<U, F>(self, f: F) -> LazySeq<U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.filter_map(move |item| Some(f(item)))
    }

    /// Lazily apply `f`, skipping elements for which it returns `None`.
    pub fn filter_map<U, F>(self, f: F) -> LazySeq<U>
    where
        U: 'static,
        F: Fn(T) -> Option<U> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        match self.source {
            Source::Restartable(factory) => LazySeq {
                source: Source::Restartable(Arc::new(move || {
                    let f = Arc::clone(&f);
                    Box::new(factory().filter_map(move |item| f(item))) as SeqIter<U>
                })),
            },
            Source::Once(slot) => {
                let inner = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                let mapped = inner.map(|iter| {
                    Box::new(iter.filter_map(move |item| f(item))) as SeqIter<U>
                });
                LazySeq {
                    source: Source::Once(Arc::new(Mutex::new(mapped))),
                }
            }
        }
    }

    /// True when both handles share the same source.
    pub fn same_source(&self, other: &Self) -> bool {
        match (&self.source, &other.source) {
            (Source::Restartable(a), Source::Restartable(b)) => Arc::ptr_eq(a, b),
            (Source::Once(a), Source::Once(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T> Clone for LazySeq<T> {
    fn clone(&self) -> Self {
        let source = match &self.source {
            Source::Restartable(factory) => Source::Restartable(Arc::clone(factory)),
            Source::Once(slot) => Source::Once(Arc::clone(slot)),
        };
        Self { source }
    }
}

impl<T> fmt::Debug for LazySeq<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let restartable = matches!(self.source, Source::Restartable(_));
        f.debug_struct("LazySeq")
            .field("restartable", &restartable)
            .finish_non_exhaustive()
    }
}
