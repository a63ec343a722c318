//! Unbounded SPSC linked queue.
//!
//! A singly linked list with a stub node. The producer owns the tail pointer,
//! the consumer owns the head pointer, and the only field both sides touch is
//! each node's `next` link, published with release/acquire ordering.
//!
//! ```text
//! head (consumer)                         tail (producer)
//!   │                                        │
//!   ▼                                        ▼
//! [stub] ──next──> [v1] ──next──> [v2] ──> [v3] ──next──> null
//! ```
//!
//! Popping moves `v1` out and makes its node the new stub. The handles are
//! `Send` but neither `Sync` nor `Clone`, so the one-producer, one-consumer
//! contract holds by construction.

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use super::PhantomUnsync;

/// Role marker: owned exclusively by the producer.
enum ProducerRole {}

/// Role marker: owned exclusively by the consumer.
enum ConsumerRole {}

/// Interior-mutable cell tagged with the side that owns it.
///
/// The role does nothing at runtime; it keeps producer-side and
/// consumer-side state from being mixed up at compile time.
#[repr(transparent)]
struct RoleCell<T, Role>(UnsafeCell<T>, PhantomData<Role>);

impl<T, Role> RoleCell<T, Role> {
    const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value), PhantomData)
    }

    const fn get(&self) -> *mut T {
        self.0.get()
    }
}

struct Node<T> {
    next: AtomicPtr<Node<T>>,
    /// Initialized for every node except the current stub.
    value: MaybeUninit<T>,
}

impl<T> Node<T> {
    fn alloc(value: MaybeUninit<T>) -> *mut Self {
        Box::into_raw(Box::new(Self {
            next: AtomicPtr::new(ptr::null_mut()),
            value,
        }))
    }
}

struct Linked<T> {
    /// Last node. Producer-owned.
    tail: CachePadded<RoleCell<*mut Node<T>, ProducerRole>>,
    /// Elements pushed so far. Written only by the producer.
    pushed: CachePadded<AtomicUsize>,
    /// Current stub. Consumer-owned.
    head: CachePadded<RoleCell<*mut Node<T>, ConsumerRole>>,
    /// Elements popped so far. Written only by the consumer.
    popped: CachePadded<AtomicUsize>,
}

// SAFETY: nodes are handed from producer to consumer through the `next`
// links; raw pointers are never shared beyond the two roles.
unsafe impl<T: Send> Send for Linked<T> {}
unsafe impl<T: Send> Sync for Linked<T> {}

impl<T> Linked<T> {
    fn new() -> Self {
        let stub = Node::alloc(MaybeUninit::uninit());
        Self {
            tail: CachePadded::new(RoleCell::new(stub)),
            pushed: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(RoleCell::new(stub)),
            popped: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// # Safety
    ///
    /// Only the single producer may call this.
    unsafe fn push(&self, item: T) {
        let node = Node::alloc(MaybeUninit::new(item));
        // SAFETY: the producer owns `tail`; the tail node stays alive until
        // the consumer has moved past it, which needs this link first.
        unsafe {
            let tail = self.tail.get();
            (**tail).next.store(node, Ordering::Release);
            *tail = node;
        }
        let pushed = self.pushed.load(Ordering::Relaxed);
        self.pushed.store(pushed.wrapping_add(1), Ordering::Release);
    }

    /// # Safety
    ///
    /// Only the single consumer may call this.
    unsafe fn pop(&self) -> Option<T> {
        // SAFETY: the consumer owns `head`, and `next` was fully initialized
        // before the producer's release store made it visible.
        unsafe {
            let head = self.head.get();
            let stub = *head;
            let next = (*stub).next.load(Ordering::Acquire);
            if next.is_null() {
                return None;
            }
            let item = ptr::read((*next).value.as_ptr());
            *head = next;
            drop(Box::from_raw(stub));

            let popped = self.popped.load(Ordering::Relaxed);
            self.popped.store(popped.wrapping_add(1), Ordering::Release);
            Some(item)
        }
    }

    fn len(&self) -> usize {
        let popped = self.popped.load(Ordering::Acquire);
        let pushed = self.pushed.load(Ordering::Acquire);
        // The consumer can pop a node before the producer bumps `pushed`.
        pushed.saturating_sub(popped)
    }
}

impl<T> Drop for Linked<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means both handles are gone. The stub's value
        // was already moved out; every later node still owns its value.
        unsafe {
            let stub = *self.head.get();
            let mut next = (*stub).next.load(Ordering::Relaxed);
            drop(Box::from_raw(stub));
            while !next.is_null() {
                let mut node = Box::from_raw(next);
                next = node.next.load(Ordering::Relaxed);
                node.value.assume_init_drop();
            }
        }
    }
}

/// Write end of an unbounded SPSC queue. Not `Clone`:
///
/// ```compile_fail
/// let (tx, _rx) = ember::queue::spsc::channel::<u64>();
/// let _second = tx.clone();
/// ```
pub struct Producer<T> {
    queue: Arc<Linked<T>>,
    _unsync: PhantomUnsync,
}

/// Read end of an unbounded SPSC queue.
pub struct Consumer<T> {
    queue: Arc<Linked<T>>,
    _unsync: PhantomUnsync,
}

/// Creates an unbounded SPSC queue.
///
/// ```
/// use ember::queue::spsc;
///
/// let (tx, rx) = spsc::channel();
/// std::thread::spawn(move || {
///     for i in 0..3 {
///         tx.push(i);
///     }
/// })
/// .join()
/// .unwrap();
/// assert_eq!(rx.drain().collect::<Vec<_>>(), vec![0, 1, 2]);
/// ```
#[must_use]
pub fn channel<T: Send>() -> (Producer<T>, Consumer<T>) {
    let queue = Arc::new(Linked::new());
    let producer = Producer {
        queue: Arc::clone(&queue),
        _unsync: PhantomData,
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
        // SAFETY: Producer is neither Clone nor Sync, so this is the only
        // thread pushing.
        unsafe { self.queue.push(item) }
    }
}

impl<T: Send> Consumer<T> {
    /// Dequeues the next element, or `None` if the queue is empty.
    #[inline]
    #[must_use]
    pub fn try_pop(&self) -> Option<T> {
        // SAFETY: Consumer is neither Clone nor Sync, so this is the only
        // thread popping.
        unsafe { self.queue.pop() }
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
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_push_pop() {
        let (tx, rx) = channel::<u64>();

        tx.push(42);
        assert_eq!(rx.len(), 1);
        assert_eq!(rx.try_pop(), Some(42));
        assert_eq!(rx.try_pop(), None);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_interleaved_operations() {
        let (tx, rx) = channel::<u64>();

        tx.push(1);
        tx.push(2);
        assert_eq!(rx.try_pop(), Some(1));
        tx.push(3);
        assert_eq!(rx.try_pop(), Some(2));
        assert_eq!(rx.try_pop(), Some(3));
        tx.push(4);
        tx.push(5);
        assert_eq!(rx.try_pop(), Some(4));
        assert_eq!(rx.try_pop(), Some(5));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_non_copy_type() {
        let (tx, rx) = channel::<String>();

        tx.push("hello".to_string());
        tx.push("world".to_string());

        assert_eq!(rx.try_pop(), Some("hello".to_string()));
        assert_eq!(rx.try_pop(), Some("world".to_string()));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_concurrent_push_pop() {
        let (tx, rx) = channel::<u64>();
        let count = 100_000u64;

        let producer = std::thread::spawn(move || {
            for i in 0..count {
                tx.push(i);
            }
        });

        let consumer = std::thread::spawn(move || {
            let mut received = Vec::with_capacity(count as usize);
            while received.len() < count as usize {
                if let Some(item) = rx.try_pop() {
                    received.push(item);
                } else {
                    std::hint::spin_loop();
                }
            }
            received
        });

        producer.join().unwrap();
        let received = consumer.join().unwrap();

        for (i, &val) in received.iter().enumerate() {
            assert_eq!(val, i as u64);
        }
    }

    #[test]
    fn test_drop_releases_queued_values() {
        let marker = Arc::new(());
        let (tx, rx) = channel::<Arc<()>>();
        for _ in 0..10 {
            tx.push(Arc::clone(&marker));
        }
        drop(rx.try_pop());
        assert_eq!(Arc::strong_count(&marker), 10);
        drop(tx);
        drop(rx);
        assert_eq!(Arc::strong_count(&marker), 1);
    }
}
