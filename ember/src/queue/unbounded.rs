//! Unbounded MPSC queue.
//!
//! Backed by `crossbeam_queue::SegQueue`, a lock-free linked list of
//! fixed-size segments. Producers never see a capacity failure; running out
//! of memory while allocating a segment aborts the process like any other
//! allocation failure. The handles narrow the structure to one consumer.

use std::marker::PhantomData;
use std::sync::Arc;

use crossbeam_queue::SegQueue;

use super::PhantomUnsync;

/// Write end of an unbounded MPSC queue. Clone it to add producers.
pub struct Producer<T> {
    queue: Arc<SegQueue<T>>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

/// Read end of an unbounded MPSC queue. `Send` but not `Sync`.
///
/// ```compile_fail
/// fn assert_sync<T: Sync>() {}
/// assert_sync::<ember::queue::unbounded::Consumer<u64>>();
/// ```
pub struct Consumer<T> {
    queue: Arc<SegQueue<T>>,
    _unsync: PhantomUnsync,
}

/// Creates an unbounded MPSC queue.
///
/// ```
/// use ember::queue::unbounded;
///
/// let (tx, rx) = unbounded::channel();
/// let tx2 = tx.clone();
/// tx.push(1);
/// tx2.push(2);
/// assert_eq!(rx.drain().collect::<Vec<_>>(), vec![1, 2]);
/// ```
#[must_use]
pub fn channel<T: Send>() -> (Producer<T>, Consumer<T>) {
    let queue = Arc::new(SegQueue::new());
    let producer = Producer {
        queue: Arc::clone(&queue),
    };
    let consumer = Consumer {
        queue,
        _unsync: PhantomData,
    };
    (producer, consumer)
}

impl<T: Send> Producer<T> {
    /// Enqueues `item`. Never fails for lack of capacity.
    #[inline]
    pub fn push(&self, item: T) {
        self.queue.push(item);
    }
}

impl<T: Send> Consumer<T> {
    /// Dequeues the next element, or `None` if the queue is empty.
    #[inline]
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Pops until the queue reports empty.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(|| self.try_pop())
    }

    /// Approximate number of queued elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_fifo_single_producer() {
        let (tx, rx) = channel::<u32>();
        for i in 0..1000 {
            tx.push(i);
        }
        assert_eq!(rx.len(), 1000);
        for i in 0..1000 {
            assert_eq!(rx.try_pop(), Some(i));
        }
        assert_eq!(rx.try_pop(), None);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_concurrent_producers_deliver_everything_once() {
        let (tx, rx) = channel::<u64>();
        let producers = 8u64;
        let per_producer = 5_000u64;

        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..per_producer {
                        tx.push(p * per_producer + i);
                    }
                })
            })
            .collect();
        drop(tx);

        let mut seen = HashSet::new();
        let mut last = vec![None::<u64>; producers as usize];
        let total = (producers * per_producer) as usize;
        while seen.len() < total {
            match rx.try_pop() {
                Some(v) => {
                    let p = (v / per_producer) as usize;
                    assert!(last[p].is_none_or(|prev| prev < v), "producer order broken");
                    last[p] = Some(v);
                    assert!(seen.insert(v), "duplicate {v}");
                }
                None => thread::yield_now(),
            }
        }

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_drop_releases_queued_values() {
        let marker = Arc::new(());
        let (tx, rx) = channel::<Arc<()>>();
        for _ in 0..100 {
            tx.push(Arc::clone(&marker));
        }
        drop(rx);
        assert_eq!(Arc::strong_count(&marker), 101);
        drop(tx);
        assert_eq!(Arc::strong_count(&marker), 1);
    }
}
