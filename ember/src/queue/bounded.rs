//! Fixed-capacity lock-free MPSC queue.
//!
//! A bounded ring of slots, each carrying an atomic sequence number, after
//! Dmitry Vyukov's bounded queue specialised for one consumer.
//!
//! # Slot states
//!
//! For the position `pos` that maps to a slot (`pos & mask`):
//!
//! ```text
//! seq == pos            Empty    a producer may claim `pos`
//! claimed, seq == pos   Writing  the winning producer is storing its value
//! seq == pos + 1        Full     published, visible to the consumer
//! read, seq == pos + 1  Reading  the consumer is moving the value out
//! seq == pos + slots    Empty    released for the next lap
//! ```
//!
//! Producers claim positions by compare-and-swap on `head`, so exactly one
//! producer wins each position and the consumer sees values in claim order.
//! A claim is only attempted while `head - tail < capacity`, which makes the
//! requested capacity exact even though the slot count is rounded up to a
//! power of two for mask arithmetic. A full queue is reported, never waited
//! out.

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use super::{PhantomUnsync, QueueError, TryPushError};

struct Slot<T> {
    /// Sequence number, see the module docs for the encoding.
    seq: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

pub(crate) struct Ring<T> {
    /// Next position to claim. Shared by all producers.
    head: CachePadded<AtomicUsize>,
    /// Last `tail` a producer observed; refreshed only when the gate trips.
    cached_tail: CachePadded<AtomicUsize>,
    /// Next position to read. Written only by the consumer.
    tail: CachePadded<AtomicUsize>,
    capacity: usize,
    mask: usize,
    buffer: Box<[Slot<T>]>,
}

// SAFETY: values move between threads through the slot protocol; the
// sequence numbers give each slot exactly one accessor at a time.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    pub(crate) fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        let slots = capacity
            .checked_next_power_of_two()
            .filter(|&n| n <= isize::MAX as usize / 2)
            .ok_or(QueueError::CapacityOverflow {
                requested: capacity,
            })?;

        let buffer = (0..slots)
            .map(|i| Slot {
                seq: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Ok(Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            cached_tail: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            capacity,
            mask: slots - 1,
            buffer,
        })
    }

    #[inline]
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attempts to claim a position and publish `item` into it.
    ///
    /// Safe for any number of concurrent producers.
    pub(crate) fn push(&self, item: T) -> Result<(), T> {
        let capacity = self.capacity as isize;
        let mut pos = self.head.load(Ordering::Relaxed);
        loop {
            if outstanding(pos, self.cached_tail.load(Ordering::Acquire)) >= capacity {
                let tail = self.tail.load(Ordering::Acquire);
                if outstanding(pos, tail) >= capacity {
                    return Err(item);
                }
                self.cached_tail.store(tail, Ordering::Release);
            }

            let slot = &self.buffer[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos) as isize;

            if diff == 0 {
                match self.head.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS made this producer the only writer
                        // of `pos`, and seq == pos means the consumer is done
                        // with the slot's previous lap.
                        unsafe { (*slot.value.get()).write(item) };
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // The slot still holds the previous lap. Full unless the
                // consumer has moved on and we just saw a stale sequence.
                let tail = self.tail.load(Ordering::Acquire);
                if outstanding(pos, tail) >= capacity {
                    return Err(item);
                }
                pos = self.head.load(Ordering::Relaxed);
            } else {
                // Another producer claimed `pos` first.
                pos = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Moves the next published value out, or returns `None` if the next
    /// position is not Full yet.
    ///
    /// # Safety
    ///
    /// Only one thread may call this at a time.
    pub(crate) unsafe fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let slot = &self.buffer[tail & self.mask];

        if slot.seq.load(Ordering::Acquire) != tail.wrapping_add(1) {
            return None;
        }

        // SAFETY: seq == tail + 1 proves the producer finished writing, and
        // the caller guarantees no other consumer reads this slot.
        let item = unsafe { (*slot.value.get()).assume_init_read() };

        slot.seq
            .store(tail.wrapping_add(self.buffer.len()), Ordering::Release);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);

        Some(item)
    }

    /// Claimed-but-unread positions, clamped to `[0, capacity]`.
    pub(crate) fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        outstanding(head, tail).clamp(0, self.capacity as isize) as usize
    }
}

/// Positions claimed past `tail`. Negative when `pos` is a stale read.
#[inline]
fn outstanding(pos: usize, tail: usize) -> isize {
    pos.wrapping_sub(tail) as isize
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out any concurrent consumer.
        while unsafe { self.pop() }.is_some() {}
    }
}

/// Write end of a bounded MPSC queue. Clone it to add producers.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            ring: Arc::clone(&self.ring),
        }
    }
}

/// Read end of a bounded MPSC queue.
///
/// `Send` but not `Sync`, so exactly one thread drains the queue at a time:
///
/// ```compile_fail
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<ember::queue::bounded::Consumer<u64>>();
/// ```
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
    _unsync: PhantomUnsync,
}

/// Creates a bounded MPSC queue holding at most `capacity` elements.
///
/// # Errors
///
/// Returns [`QueueError::ZeroCapacity`] for a zero capacity and
/// [`QueueError::CapacityOverflow`] if the slot count cannot be represented.
///
/// # Example
///
/// ```
/// use ember::queue::bounded;
///
/// let (tx, rx) = bounded::channel::<&str>(2).unwrap();
/// tx.try_push("a").unwrap();
/// tx.try_push("b").unwrap();
/// assert_eq!(tx.try_push("c").unwrap_err().into_inner(), "c");
/// assert_eq!(rx.try_pop(), Some("a"));
/// ```
pub fn channel<T: Send>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), QueueError> {
    let ring = Arc::new(Ring::new(capacity)?);
    let producer = Producer {
        ring: Arc::clone(&ring),
    };
    let consumer = Consumer {
        ring,
        _unsync: PhantomData,
    };
    Ok((producer, consumer))
}

impl<T: Send> Producer<T> {
    /// Attempts to enqueue without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`TryPushError::Full`] with the item when `capacity` elements
    /// are already queued.
    #[inline]
    pub fn try_push(&self, item: T) -> Result<(), TryPushError<T>> {
        self.ring.push(item).map_err(TryPushError::Full)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T: Send> Consumer<T> {
    /// Dequeues the next element, or `None` if nothing is published yet.
    #[inline]
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        // SAFETY: Consumer is neither Clone nor Sync, so this is the only
        // thread popping.
        unsafe { self.ring.pop() }
    }

    /// Pops until the queue reports empty.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(|| self.try_pop())
    }

    /// Approximate number of queued elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_single_producer_single_consumer() {
        let (tx, rx) = channel::<u64>(8).unwrap();

        tx.try_push(1).unwrap();
        tx.try_push(2).unwrap();
        tx.try_push(3).unwrap();

        assert_eq!(rx.try_pop(), Some(1));
        assert_eq!(rx.try_pop(), Some(2));
        assert_eq!(rx.try_pop(), Some(3));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(channel::<u8>(0).err(), Some(QueueError::ZeroCapacity));
        assert!(matches!(
            channel::<u8>(usize::MAX).err(),
            Some(QueueError::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn test_exact_capacity_when_not_power_of_two() {
        let (tx, rx) = channel::<u32>(3).unwrap();
        assert_eq!(tx.capacity(), 3);

        for i in 0..3 {
            tx.try_push(i).unwrap();
        }
        assert_eq!(tx.try_push(99), Err(TryPushError::Full(99)));
        assert_eq!(rx.len(), 3);

        assert_eq!(rx.try_pop(), Some(0));
        tx.try_push(3).unwrap();
        assert!(tx.try_push(100).is_err());
    }

    #[test]
    fn test_wrapping_behavior() {
        let (tx, rx) = channel::<u64>(4).unwrap();

        for round in 0..10 {
            for i in 0..4 {
                tx.try_push(round * 10 + i).unwrap();
            }
            assert!(tx.try_push(0).is_err());
            for i in 0..4 {
                assert_eq!(rx.try_pop(), Some(round * 10 + i));
            }
            assert!(rx.is_empty());
        }
    }

    #[test]
    fn test_drain() {
        let (tx, rx) = channel::<u8>(5).unwrap();
        for i in 0..5 {
            tx.try_push(i).unwrap();
        }
        assert_eq!(rx.drain().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_drop_releases_queued_values() {
        let marker = Arc::new(());
        let (tx, rx) = channel::<Arc<()>>(4).unwrap();
        tx.try_push(Arc::clone(&marker)).unwrap();
        tx.try_push(Arc::clone(&marker)).unwrap();
        drop(rx.try_pop());
        assert_eq!(Arc::strong_count(&marker), 2);

        drop(tx);
        drop(rx);
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_multiple_producers() {
        let (tx, rx) = channel::<u64>(64).unwrap();
        let num_producers = 4;
        let items_per_producer = 10;

        let handles: Vec<_> = (0..num_producers)
            .map(|p| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..items_per_producer {
                        let value = (p * 100 + i) as u64;
                        while tx.try_push(value).is_err() {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let items: Vec<u64> = rx.drain().collect();
        assert_eq!(items.len(), num_producers * items_per_producer);
        for p in 0..num_producers {
            // Per-producer order survives interleaving.
            let mine: Vec<u64> = items
                .iter()
                .copied()
                .filter(|v| *v / 100 == p as u64)
                .collect();
            let expected: Vec<u64> = (0..items_per_producer)
                .map(|i| (p * 100 + i) as u64)
                .collect();
            assert_eq!(mine, expected);
        }
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let (tx, rx) = channel::<u64>(32).unwrap();
        let num_items = 10_000u64;

        let producer = thread::spawn(move || {
            for i in 0..num_items {
                while tx.try_push(i).is_err() {
                    thread::yield_now();
                }
            }
        });

        let consumer = thread::spawn(move || {
            let mut expected = 0u64;
            while expected < num_items {
                match rx.try_pop() {
                    Some(item) => {
                        assert_eq!(item, expected);
                        expected += 1;
                    }
                    None => thread::yield_now(),
                }
            }
        });

        producer.join().unwrap();
        consumer.join().unwrap();
    }
}
