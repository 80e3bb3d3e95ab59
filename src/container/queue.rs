use parking_lot::{Condvar, Mutex};
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A thread-safe FIFO queue with separate head and tail locks.
///
/// This is the classic two-lock queue: the chain always ends in a value-less
/// dummy node, pushes write into the current dummy and append a fresh one
/// under the tail lock, and pops unlink the head node under the head lock.
/// With two or more values queued, one producer and one consumer proceed in
/// parallel. The thread pool uses this as its global injector queue, giving
/// rough FIFO fairness to tasks submitted from non-worker threads.
///
/// Invariants:
/// - The tail node holds no value and has no successor.
/// - `head == tail` means the queue is empty.
/// - Every non-tail node holds a value and has a successor.
///
/// ```
/// use filch::ConcurrentQueue;
///
/// let queue = ConcurrentQueue::new();
/// queue.push(1);
/// queue.push(2);
///
/// assert_eq!(queue.try_pop(), Some(1)); // first in, first out
/// assert_eq!(queue.try_pop(), Some(2));
/// assert_eq!(queue.try_pop(), None);
/// ```
pub struct ConcurrentQueue<T> {
    /// Owns the whole chain, dummy tail included.
    head: Mutex<Box<Node<T>>>,
    /// Points at the dummy tail node inside the chain above.
    tail: Mutex<*mut Node<T>>,
    pushed: Condvar,
    len: AtomicUsize,
}

// Safety: the raw tail pointer always targets the last node of the chain
// owned by `head`, and is only dereferenced while holding the tail mutex, so
// sharing the queue is no different from sharing the Box-owned chain itself.
unsafe impl<T: Send> Send for ConcurrentQueue<T> {}
unsafe impl<T: Send> Sync for ConcurrentQueue<T> {}

struct Node<T> {
    value: Option<T>,
    next: Option<Box<Node<T>>>,
}

impl<T> ConcurrentQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> ConcurrentQueue<T> {
        let mut dummy = Box::new(Node {
            value: None,
            next: None,
        });
        let tail: *mut Node<T> = &mut *dummy;

        ConcurrentQueue {
            head: Mutex::new(dummy),
            tail: Mutex::new(tail),
            pushed: Condvar::new(),
            len: AtomicUsize::new(0),
        }
    }

    /// Pushes a value onto the back of the queue.
    ///
    /// Only the tail lock is taken.
    pub fn push(&self, value: T) {
        // Allocate the next dummy outside the critical section. Its heap
        // address is stable across the move into the chain.
        let mut new_tail = Box::new(Node {
            value: None,
            next: None,
        });
        let new_tail_ptr: *mut Node<T> = &mut *new_tail;

        {
            let mut tail = self.tail.lock();
            // Safety: `*tail` is the dummy tail node, owned by the chain and
            // only touched under this lock.
            let tail_node = unsafe { &mut **tail };
            tail_node.value = Some(value);
            tail_node.next = Some(new_tail);
            *tail = new_tail_ptr;
            self.len.fetch_add(1, Ordering::Relaxed);
        }

        // Notify after unlocking so the woken thread can pop immediately.
        self.pushed.notify_one();
    }

    /// Pops the front value, or returns `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut head = self.head.lock();
        if ptr::eq(&**head, self.tail_snapshot()) {
            return None;
        }
        Some(self.pop_locked(&mut head))
    }

    /// Pops the front value, blocking until one is available.
    pub fn wait_and_pop(&self) -> T {
        let mut head = self.head.lock();
        while ptr::eq(&**head, self.tail_snapshot()) {
            self.pushed.wait(&mut head);
        }
        self.pop_locked(&mut head)
    }

    /// Removes every value from the queue.
    pub fn clear(&self) {
        // Both locks held: nothing can push or pop mid-clear.
        let mut head = self.head.lock();
        let tail = self.tail.lock();

        // One node is unlinked and dropped per iteration, so clearing a long
        // chain cannot recurse, and the dummy tail's address never moves.
        while !ptr::eq(&**head, *tail as *const Node<T>) {
            let _ = self.pop_locked(&mut head);
        }
    }

    /// Returns the number of values in the queue.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Returns true if the queue holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the tail pointer under its own lock. The snapshot can only go
    /// stale in the direction of more nodes, so a `head == tail` comparison
    /// that observes "non-empty" stays correct while the head lock is held.
    fn tail_snapshot(&self) -> *const Node<T> {
        *self.tail.lock() as *const Node<T>
    }

    /// Unlinks and returns the head value. Caller must hold the head lock
    /// and have established `head != tail`.
    fn pop_locked(&self, head: &mut Box<Node<T>>) -> T {
        let next = head
            .next
            .take()
            .expect("non-tail node must have a successor");
        let mut old_head = mem::replace(head, next);
        self.len.fetch_sub(1, Ordering::Relaxed);
        old_head
            .value
            .take()
            .expect("non-tail node must hold a value")
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ConcurrentQueue<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
