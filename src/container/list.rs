use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A thread-safe singly linked list with hand-over-hand locking.
///
/// Every node carries its own reader/writer lock, and a persistent dummy
/// head (the list-level lock around the first link) lets traversals and
/// `push_front` follow one discipline: to look at or change a node's link or
/// value, hold that node's lock, and acquire the successor's lock *before*
/// releasing it. At most two locks are held at once, always in traversal
/// order, so scans can run concurrently without deadlocking each other while
/// readers overlap freely.
///
/// Invariants:
/// - Following `next` from the head terminates.
/// - `head == None` means the list is empty.
///
/// Predicates, suppliers, and consumers run while node locks are held.
/// Calling back into the *same* list from inside one of them deadlocks and
/// must not be done.
///
/// ```
/// use filch::ConcurrentList;
///
/// let list = ConcurrentList::new();
/// for i in 0..10 {
///     list.push_front(i);
/// }
///
/// assert_eq!(list.remove_if(|v| v % 2 == 0, usize::MAX), 5);
/// assert_eq!(list.len(), 5);
/// assert!(list.match_none(|v| v % 2 == 0));
/// ```
pub struct ConcurrentList<T> {
    /// The dummy head's link field: no value, just the pointer to the first
    /// real node, guarded by its own reader/writer lock.
    head: RwLock<Link<T>>,
    len: AtomicUsize,
}

type NodeRef<T> = Arc<RwLock<Node<T>>>;
type Link<T> = Option<NodeRef<T>>;

// Owned guards keep the node alive along with its lock, which is what makes
// advancing the cursor expressible: the previous guard is released only when
// the cursor is overwritten, strictly after the successor's lock is taken.
// It also means a node can never be freed while any guard on it exists.
type NodeReadGuard<T> = ArcRwLockReadGuard<RawRwLock, Node<T>>;
type NodeWriteGuard<T> = ArcRwLockWriteGuard<RawRwLock, Node<T>>;

struct Node<T> {
    value: T,
    next: Link<T>,
}

/// Read-mode traversal position: either the dummy head's lock or a node's.
enum ReadCursor<'a, T> {
    Head(RwLockReadGuard<'a, Link<T>>),
    Node(NodeReadGuard<T>),
}

impl<T> ReadCursor<'_, T> {
    fn next(&self) -> &Link<T> {
        match self {
            ReadCursor::Head(guard) => guard,
            ReadCursor::Node(guard) => &guard.next,
        }
    }
}

/// Write-mode traversal position.
enum WriteCursor<'a, T> {
    Head(RwLockWriteGuard<'a, Link<T>>),
    Node(NodeWriteGuard<T>),
}

impl<T> WriteCursor<'_, T> {
    fn next(&self) -> &Link<T> {
        match self {
            WriteCursor::Head(guard) => guard,
            WriteCursor::Node(guard) => &guard.next,
        }
    }

    fn next_mut(&mut self) -> &mut Link<T> {
        match self {
            WriteCursor::Head(guard) => guard,
            WriteCursor::Node(guard) => &mut guard.next,
        }
    }
}

impl<T> ConcurrentList<T> {
    /// Creates an empty list.
    pub fn new() -> ConcurrentList<T> {
        ConcurrentList {
            head: RwLock::new(None),
            len: AtomicUsize::new(0),
        }
    }

    /// Adds a value to the front of the list.
    ///
    /// Under concurrent `push_front` calls the value is inserted but may not
    /// end up at the front.
    pub fn push_front(&self, value: T) {
        // Allocate outside the critical section.
        let node = Arc::new(RwLock::new(Node { value, next: None }));

        let mut head = self.head.write();
        // The node is not published yet, so its lock is uncontended.
        node.write().next = head.take();
        *head = Some(node);
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns true if any value passes the predicate.
    pub fn match_any(&self, mut predicate: impl FnMut(&T) -> bool) -> bool {
        let mut cursor = ReadCursor::Head(self.head.read());
        while let Some(node) = cursor.next().clone() {
            // Lock the successor before the cursor releases the current lock.
            let guard = node.read_arc();
            if predicate(&guard.value) {
                return true;
            }
            cursor = ReadCursor::Node(guard);
        }
        false
    }

    /// Returns true if no value passes the predicate.
    pub fn match_none(&self, predicate: impl FnMut(&T) -> bool) -> bool {
        !self.match_any(predicate)
    }

    /// Unlinks values passing the predicate, stopping after `limit`
    /// removals. Returns the number removed.
    pub fn remove_if(&self, mut predicate: impl FnMut(&T) -> bool, limit: usize) -> usize {
        if limit == 0 {
            return 0;
        }

        let mut removed = 0;
        let mut cursor = WriteCursor::Head(self.head.write());
        while let Some(node) = cursor.next().clone() {
            let mut guard = node.write_arc();
            if predicate(&guard.value) {
                *cursor.next_mut() = guard.next.take();
                self.len.fetch_sub(1, Ordering::Relaxed);
                removed += 1;
                // Release the node's lock before the last reference to the
                // node can go away; the cursor stays put to examine the new
                // successor.
                drop(guard);
                drop(node);
                if removed == limit {
                    break;
                }
            } else {
                cursor = WriteCursor::Node(guard);
            }
        }
        removed
    }

    /// Replaces values passing the predicate with freshly supplied ones,
    /// stopping after `limit` replacements. Returns the number replaced.
    pub fn replace_if(
        &self,
        mut predicate: impl FnMut(&T) -> bool,
        mut supplier: impl FnMut() -> T,
        limit: usize,
    ) -> usize {
        if limit == 0 {
            return 0;
        }

        let mut replaced = 0;
        let mut cursor = WriteCursor::Head(self.head.write());
        while let Some(node) = cursor.next().clone() {
            let mut guard = node.write_arc();
            if predicate(&guard.value) {
                guard.value = supplier();
                replaced += 1;
                if replaced == limit {
                    break;
                }
            }
            cursor = WriteCursor::Node(guard);
        }
        replaced
    }

    /// Runs the consumer on every value, front to back, under reader locks.
    pub fn for_each(&self, mut consumer: impl FnMut(&T)) {
        let mut cursor = ReadCursor::Head(self.head.read());
        while let Some(node) = cursor.next().clone() {
            let guard = node.read_arc();
            consumer(&guard.value);
            cursor = ReadCursor::Node(guard);
        }
    }

    /// Runs the consumer on every value, front to back, under writer locks.
    pub fn for_each_mut(&self, mut consumer: impl FnMut(&mut T)) {
        let mut cursor = WriteCursor::Head(self.head.write());
        while let Some(node) = cursor.next().clone() {
            let mut guard = node.write_arc();
            consumer(&mut guard.value);
            cursor = WriteCursor::Node(guard);
        }
    }

    /// Maps the first value passing the predicate, under reader locks.
    /// Returns `None` if nothing passes.
    pub fn find_map<R>(
        &self,
        mut predicate: impl FnMut(&T) -> bool,
        mapper: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        let mut cursor = ReadCursor::Head(self.head.read());
        while let Some(node) = cursor.next().clone() {
            let guard = node.read_arc();
            if predicate(&guard.value) {
                return Some(mapper(&guard.value));
            }
            cursor = ReadCursor::Node(guard);
        }
        None
    }

    /// Maps the first value passing the predicate, under writer locks so the
    /// mapper may mutate it. Returns `None` if nothing passes.
    pub fn find_map_mut<R>(
        &self,
        mut predicate: impl FnMut(&T) -> bool,
        mapper: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut cursor = WriteCursor::Head(self.head.write());
        while let Some(node) = cursor.next().clone() {
            let mut guard = node.write_arc();
            if predicate(&guard.value) {
                return Some(mapper(&mut guard.value));
            }
            cursor = WriteCursor::Node(guard);
        }
        None
    }

    /// Removes every value from the list.
    pub fn clear(&self) {
        // The head lock is held throughout, so nothing can splice new nodes
        // in front while the chain is being torn down.
        let mut head = self.head.write();
        let mut link = head.take();
        while let Some(node) = link {
            let mut guard = node.write_arc();
            link = guard.next.take();
            self.len.fetch_sub(1, Ordering::Relaxed);
            // Unlock before the node can be freed.
            drop(guard);
            drop(node);
        }
    }

    /// Returns the number of values in the list.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Returns true if the list holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ConcurrentList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ConcurrentList<T> {
    fn drop(&mut self) {
        // Tear the chain down iteratively; letting the `Arc` chain drop on
        // its own recurses once per node.
        self.clear();
    }
}
