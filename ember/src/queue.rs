//! Non-blocking task queues feeding a single event-loop consumer.
//!
//! Three disciplines are available:
//!
//! | Module | Capacity | Producers | Storage |
//! |--------|----------|-----------|---------|
//! | [`bounded`] | fixed | many | slot ring with sequence numbers |
//! | [`unbounded`] | none | many | lock-free segment list |
//! | [`spsc`] | none | one | singly linked list |
//!
//! Call sites that only know their own needs go through [`channel`] (or
//! [`Builder`]), which picks the discipline:
//!
//! ```text
//! Capacity::Bounded(n) + Producers::Multiple -> BoundedMpsc(n)
//! Capacity::Bounded(n) + Producers::Single   -> BoundedMpsc(n)   (superset of SPSC)
//! Capacity::Unbounded  + Producers::Multiple -> UnboundedMpsc
//! Capacity::Unbounded  + Producers::Single   -> UnboundedSpsc
//! ```
//!
//! No operation here blocks. `try_push` reports a full bounded queue with
//! [`TryPushError::Full`] and `try_pop` reports an empty queue with `None`;
//! whether to spin, yield or park is the caller's decision.
//!
//! # Ordering
//!
//! Elements from one producer arrive in the order they were pushed. Across
//! producers, the order is whatever the queue's atomic claim (or the segment
//! list's linearization) decided, not wall-clock submission time.
//!
//! # Example
//!
//! ```
//! use ember::queue::{self, Capacity, Discipline, Producers, TryPushError};
//!
//! let (tx, rx) = queue::channel::<&str>(Capacity::Bounded(2), Producers::Multiple)?;
//! assert_eq!(tx.discipline(), Discipline::BoundedMpsc);
//!
//! tx.try_push("a")?;
//! tx.try_push("b")?;
//! assert_eq!(tx.try_push("c"), Err(TryPushError::Full("c")));
//! assert_eq!(rx.try_pop(), Some("a"));
//! tx.try_push("c")?;
//! assert_eq!(rx.drain().collect::<Vec<_>>(), vec!["b", "c"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bounded;
pub mod spsc;
pub mod unbounded;

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use crate::trace::{debug, trace};

/// Marker that keeps a handle `Send` while opting it out of `Sync`.
pub(crate) type PhantomUnsync = PhantomData<Cell<&'static ()>>;

/// Error creating a queue or a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// A bounded queue was requested with capacity 0.
    #[error("queue capacity must be greater than 0")]
    ZeroCapacity,
    /// The requested capacity cannot be rounded up to a power of two.
    #[error("queue capacity {requested} is too large")]
    CapacityOverflow { requested: usize },
    /// Attempted to add a producer to a single-producer queue.
    #[error("single-producer queue cannot have another producer")]
    SingleProducer,
}

/// A bounded queue was full. Carries the rejected element back.
#[derive(Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryPushError<T> {
    #[error("queue full")]
    Full(T),
}

impl<T> TryPushError<T> {
    /// Recovers the element that could not be queued.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) => item,
        }
    }
}

impl<T> fmt::Debug for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
        }
    }
}

/// Requested capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// At most this many queued elements.
    Bounded(usize),
    Unbounded,
}

/// How many threads will push into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producers {
    Single,
    Multiple,
}

/// The queue implementation behind a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    BoundedMpsc,
    UnboundedMpsc,
    UnboundedSpsc,
}

impl Discipline {
    /// Picks the discipline for a capacity and producer cardinality.
    ///
    /// A bounded single-producer request gets the bounded MPSC queue, which
    /// is correct for one producer as well.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ZeroCapacity`] for `Capacity::Bounded(0)`.
    pub fn select(capacity: Capacity, producers: Producers) -> Result<Self, QueueError> {
        match (capacity, producers) {
            (Capacity::Bounded(0), _) => Err(QueueError::ZeroCapacity),
            (Capacity::Bounded(_), Producers::Multiple) => Ok(Self::BoundedMpsc),
            (Capacity::Bounded(_), Producers::Single) => {
                debug!("no bounded SPSC queue; using bounded MPSC");
                Ok(Self::BoundedMpsc)
            }
            (Capacity::Unbounded, Producers::Multiple) => Ok(Self::UnboundedMpsc),
            (Capacity::Unbounded, Producers::Single) => Ok(Self::UnboundedSpsc),
        }
    }

    /// Whether more than one producer may push concurrently.
    #[must_use]
    pub const fn multi_producer(self) -> bool {
        !matches!(self, Self::UnboundedSpsc)
    }
}

/// Creates a queue suited to `capacity` and `producers`.
///
/// # Errors
///
/// Returns [`QueueError::ZeroCapacity`] or [`QueueError::CapacityOverflow`]
/// for an unusable bounded capacity.
pub fn channel<T: Send>(
    capacity: Capacity,
    producers: Producers,
) -> Result<(Producer<T>, Consumer<T>), QueueError> {
    let discipline = Discipline::select(capacity, producers)?;
    let (producer, consumer) = match (capacity, discipline) {
        (Capacity::Bounded(n), _) => {
            let (tx, rx) = bounded::channel(n)?;
            (ProducerInner::Bounded(tx), ConsumerInner::Bounded(rx))
        }
        (Capacity::Unbounded, Discipline::UnboundedSpsc) => {
            let (tx, rx) = spsc::channel();
            (ProducerInner::Spsc(tx), ConsumerInner::Spsc(rx))
        }
        (Capacity::Unbounded, _) => {
            let (tx, rx) = unbounded::channel();
            (ProducerInner::Unbounded(tx), ConsumerInner::Unbounded(rx))
        }
    };
    trace!(?discipline, ?capacity, ?producers, "queue created");
    Ok((Producer { inner: producer }, Consumer { inner: consumer }))
}

/// Builder front end for [`channel`].
///
/// Defaults to an unbounded multi-producer queue.
///
/// ```
/// use ember::queue::{Builder, Discipline, Producers};
///
/// let (tx, rx) = Builder::new().producers(Producers::Single).build::<u32>()?;
/// assert_eq!(tx.discipline(), Discipline::UnboundedSpsc);
/// tx.try_push(7)?;
/// assert_eq!(rx.try_pop(), Some(7));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Builder {
    capacity: Capacity,
    producers: Producers,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            capacity: Capacity::Unbounded,
            producers: Producers::Multiple,
        }
    }
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the queue to `capacity` elements.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Capacity::Bounded(capacity);
        self
    }

    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.capacity = Capacity::Unbounded;
        self
    }

    #[must_use]
    pub fn producers(mut self, producers: Producers) -> Self {
        self.producers = producers;
        self
    }

    /// Creates the queue.
    ///
    /// # Errors
    ///
    /// See [`channel`].
    pub fn build<T: Send>(self) -> Result<(Producer<T>, Consumer<T>), QueueError> {
        channel(self.capacity, self.producers)
    }
}

enum ProducerInner<T> {
    Bounded(bounded::Producer<T>),
    Unbounded(unbounded::Producer<T>),
    Spsc(spsc::Producer<T>),
}

enum ConsumerInner<T> {
    Bounded(bounded::Consumer<T>),
    Unbounded(unbounded::Consumer<T>),
    Spsc(spsc::Consumer<T>),
}

/// Write end of a queue created by [`channel`].
///
/// `Send` but not `Sync`. For multi-producer disciplines, give each thread
/// its own handle with [`Producer::try_clone`].
pub struct Producer<T> {
    inner: ProducerInner<T>,
}

/// Read end of a queue created by [`channel`]. `Send` but not `Sync`.
///
/// ```compile_fail
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<ember::queue::Consumer<u64>>();
/// ```
pub struct Consumer<T> {
    inner: ConsumerInner<T>,
}

impl<T: Send> Producer<T> {
    /// Attempts to enqueue without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`TryPushError::Full`] with the item if a bounded queue is at
    /// capacity. Unbounded disciplines always accept.
    #[inline]
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        match &self.inner {
            ProducerInner::Bounded(tx) => tx.try_push(item),
            ProducerInner::Unbounded(tx) => {
                tx.push(item);
                Ok(())
            }
            ProducerInner::Spsc(tx) => {
                tx.push(item);
                Ok(())
            }
        }
    }

    /// Returns another producer for the same queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::SingleProducer`] for the SPSC discipline.
    pub fn try_clone(&self) -> Result<Self, QueueError> {
        let inner = match &self.inner {
            ProducerInner::Bounded(tx) => ProducerInner::Bounded(tx.clone()),
            ProducerInner::Unbounded(tx) => ProducerInner::Unbounded(tx.clone()),
            ProducerInner::Spsc(_) => return Err(QueueError::SingleProducer),
        };
        Ok(Self { inner })
    }

    #[must_use]
    pub fn discipline(&self) -> Discipline {
        match self.inner {
            ProducerInner::Bounded(_) => Discipline::BoundedMpsc,
            ProducerInner::Unbounded(_) => Discipline::UnboundedMpsc,
            ProducerInner::Spsc(_) => Discipline::UnboundedSpsc,
        }
    }

    /// `Some(n)` for a bounded queue, `None` otherwise.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        match &self.inner {
            ProducerInner::Bounded(tx) => Some(tx.capacity()),
            _ => None,
        }
    }
}

impl<T: Send> Consumer<T> {
    /// Dequeues the next element, or `None` if nothing is available.
    #[inline]
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        match &self.inner {
            ConsumerInner::Bounded(rx) => rx.try_pop(),
            ConsumerInner::Unbounded(rx) => rx.try_pop(),
            ConsumerInner::Spsc(rx) => rx.try_pop(),
        }
    }

    /// Pops until the queue reports empty.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(|| self.try_pop())
    }

    /// Approximate number of queued elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.inner {
            ConsumerInner::Bounded(rx) => rx.len(),
            ConsumerInner::Unbounded(rx) => rx.len(),
            ConsumerInner::Spsc(rx) => rx.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn discipline(&self) -> Discipline {
        match self.inner {
            ConsumerInner::Bounded(_) => Discipline::BoundedMpsc,
            ConsumerInner::Unbounded(_) => Discipline::UnboundedMpsc,
            ConsumerInner::Spsc(_) => Discipline::UnboundedSpsc,
        }
    }

    /// `Some(n)` for a bounded queue, `None` otherwise.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        match &self.inner {
            ConsumerInner::Bounded(rx) => Some(rx.capacity()),
            _ => None,
        }
    }
}
