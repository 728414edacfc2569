//! List: arena-backed doubly-linked sequence closed into a ring.
//!
//! Nodes live in a generational `SlotMap`, so a `Position` is a plain key
//! that stays valid until its node is erased. The sentinel is not stored
//! in the arena: it is the `Position::Sentinel` discriminant, and its two
//! links are the list's own `head`/`tail` fields. An empty list is the
//! degenerate ring where both point back at the sentinel.
//!
//! Besides ordinary sequence operations the list offers a crate-private
//! splice capability (`extract`, `create_detached`, `splice_before`,
//! `detach_all`) that moves nodes between positions, or between an old
//! and a new ring over the same arena, without touching their payloads.

use core::fmt;
use core::iter::FusedIterator;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

new_key_type! {
    /// Generational key of a node inside one list's arena.
    pub struct NodeKey;
}

/// A position in a `List`: either a live node or the end-of-sequence
/// sentinel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Position {
    Sentinel,
    Node(NodeKey),
}

impl Position {
    #[inline]
    pub fn is_sentinel(self) -> bool {
        matches!(self, Position::Sentinel)
    }

    #[inline]
    pub fn node(self) -> Option<NodeKey> {
        match self {
            Position::Sentinel => None,
            Position::Node(k) => Some(k),
        }
    }
}

#[derive(Clone, Debug)]
struct Node<T> {
    prev: Position,
    next: Position,
    value: T,
}

/// A node that is allocated in a list's arena but not linked into its ring.
///
/// Linear: the only ways to dispose of it are `List::splice_before` and
/// `List::release`. Dropping it leaves the node allocated until the list
/// is cleared or dropped.
#[must_use = "a detached node stays allocated until it is spliced or released"]
#[derive(Debug)]
pub(crate) struct Detached {
    key: NodeKey,
}

impl Detached {
    #[inline]
    pub(crate) fn key(&self) -> NodeKey {
        self.key
    }
}

/// A former sequence, unlinked in one step by `List::detach_all`.
///
/// The run still threads through the nodes' stale links; `pop_front` reads
/// the next link before handing the node out, so splicing a popped node
/// elsewhere does not disturb the rest of the run.
#[must_use = "nodes left in the run stay allocated but unreachable"]
#[derive(Debug)]
pub(crate) struct DetachedRun {
    next: Position,
    remaining: usize,
}

impl DetachedRun {
    pub(crate) fn pop_front<T>(&mut self, list: &List<T>) -> Option<Detached> {
        if self.remaining == 0 {
            return None;
        }
        let key = match self.next {
            Position::Node(k) => k,
            Position::Sentinel => panic!("detached run ended before its recorded length"),
        };
        self.next = list.node(key).next;
        self.remaining -= 1;
        Some(Detached { key })
    }

    pub(crate) fn len(&self) -> usize {
        self.remaining
    }
}

/// Doubly-linked sequence owning every node's payload.
#[derive(Clone)]
pub struct List<T> {
    nodes: SlotMap<NodeKey, Node<T>>,
    head: Position,
    tail: Position,
    len: usize,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            head: Position::Sentinel,
            tail: Position::Sentinel,
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(capacity),
            head: Position::Sentinel,
            tail: Position::Sentinel,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the first element, or the sentinel when empty.
    pub fn front(&self) -> Position {
        self.head
    }

    /// Position of the last element, or the sentinel when empty.
    pub fn back(&self) -> Position {
        self.tail
    }

    /// The end-of-sequence position.
    pub fn end(&self) -> Position {
        Position::Sentinel
    }

    /// Successor of `pos`; the successor of the sentinel is the front.
    ///
    /// Panics if `pos` names a node that is no longer in the list.
    pub fn next(&self, pos: Position) -> Position {
        match pos {
            Position::Sentinel => self.head,
            Position::Node(k) => self.node(k).next,
        }
    }

    /// Predecessor of `pos`; the predecessor of the sentinel is the back.
    pub fn prev(&self, pos: Position) -> Position {
        match pos {
            Position::Sentinel => self.tail,
            Position::Node(k) => self.node(k).prev,
        }
    }

    pub fn get(&self, pos: Position) -> Option<&T> {
        let k = pos.node()?;
        self.nodes.get(k).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        let k = pos.node()?;
        self.nodes.get_mut(k).map(|n| &mut n.value)
    }

    /// Insert `value` immediately before `pos` (at the tail when `pos` is
    /// the sentinel). Never invalidates other positions.
    pub fn insert_before(&mut self, pos: Position, value: T) -> Position {
        let node = self.create_detached(value);
        self.splice_before(pos, node)
    }

    /// Drop the element at `pos` and return the position that followed it.
    ///
    /// Panics on the sentinel or a position whose node was already erased.
    pub fn erase(&mut self, pos: Position) -> Position {
        let next = match pos {
            Position::Node(k) => self.node(k).next,
            Position::Sentinel => panic!("cannot erase the sentinel position"),
        };
        let node = self.extract(pos);
        drop(self.release(node));
        next
    }

    /// Remove the element at `pos` and hand its payload back.
    ///
    /// Same preconditions as `erase`.
    pub fn remove(&mut self, pos: Position) -> T {
        let node = self.extract(pos);
        self.release(node)
    }

    pub fn push_back(&mut self, value: T) -> Position {
        self.insert_before(Position::Sentinel, value)
    }

    pub fn push_front(&mut self, value: T) -> Position {
        let front = self.head;
        self.insert_before(front, value)
    }

    pub fn pop_back(&mut self) -> Option<T> {
        match self.tail {
            Position::Sentinel => None,
            pos => Some(self.remove(pos)),
        }
    }

    pub fn pop_front(&mut self) -> Option<T> {
        match self.head {
            Position::Sentinel => None,
            pos => Some(self.remove(pos)),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = Position::Sentinel;
        self.tail = Position::Sentinel;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    /// Mutable iteration in sequence order.
    ///
    /// Arena order differs from sequence order, so this collects the
    /// payload references up front: O(n) time and allocation per call,
    /// unlike `iter`.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let order: Vec<NodeKey> = self.positions().filter_map(Position::node).collect();
        let mut by_key: SecondaryMap<NodeKey, &mut T> = self
            .nodes
            .iter_mut()
            .map(|(k, n)| (k, &mut n.value))
            .collect();
        let items: Vec<&mut T> = order.into_iter().filter_map(|k| by_key.remove(k)).collect();
        IterMut {
            it: items.into_iter(),
        }
    }

    /// Positions of every element in sequence order.
    pub fn positions(&self) -> Positions<'_, T> {
        Positions {
            list: self,
            next: self.head,
            remaining: self.len,
        }
    }

    // ---- splice capability, used by the hash map only ----

    /// Allocate a node holding `value` without linking it anywhere.
    pub(crate) fn create_detached(&mut self, value: T) -> Detached {
        let key = self.nodes.insert(Node {
            prev: Position::Sentinel,
            next: Position::Sentinel,
            value,
        });
        Detached { key }
    }

    /// Unlink the node at `pos` from the ring, keeping its payload alive.
    pub(crate) fn extract(&mut self, pos: Position) -> Detached {
        let key = match pos {
            Position::Node(k) => k,
            Position::Sentinel => panic!("cannot extract the sentinel position"),
        };
        let (prev, next) = {
            let n = self.node(key);
            (n.prev, n.next)
        };
        self.set_next(prev, next);
        self.set_prev(next, prev);
        self.len -= 1;
        Detached { key }
    }

    /// Link a detached node immediately before `pos`. The payload is not
    /// touched.
    pub(crate) fn splice_before(&mut self, pos: Position, node: Detached) -> Position {
        let key = node.key;
        let prev = self.prev(pos);
        {
            let n = self.node_mut(key);
            n.prev = prev;
            n.next = pos;
        }
        self.set_next(prev, Position::Node(key));
        self.set_prev(pos, Position::Node(key));
        self.len += 1;
        Position::Node(key)
    }

    /// Unlink the whole sequence in O(1). The ring becomes empty; the old
    /// nodes are handed out front to back by the returned run.
    pub(crate) fn detach_all(&mut self) -> DetachedRun {
        let run = DetachedRun {
            next: self.head,
            remaining: self.len,
        };
        self.head = Position::Sentinel;
        self.tail = Position::Sentinel;
        self.len = 0;
        run
    }

    pub(crate) fn detached(&self, node: &Detached) -> &T {
        &self.node(node.key).value
    }

    pub(crate) fn detached_mut(&mut self, node: &Detached) -> &mut T {
        &mut self.node_mut(node.key).value
    }

    /// Free a detached node and return its payload.
    pub(crate) fn release(&mut self, node: Detached) -> T {
        match self.nodes.remove(node.key) {
            Some(n) => n.value,
            None => panic!("detached node does not belong to this list"),
        }
    }

    // ---- link plumbing ----

    fn node(&self, k: NodeKey) -> &Node<T> {
        match self.nodes.get(k) {
            Some(n) => n,
            None => panic!("position does not refer to a live node"),
        }
    }

    fn node_mut(&mut self, k: NodeKey) -> &mut Node<T> {
        match self.nodes.get_mut(k) {
            Some(n) => n,
            None => panic!("position does not refer to a live node"),
        }
    }

    fn set_next(&mut self, at: Position, to: Position) {
        match at {
            Position::Sentinel => self.head = to,
            Position::Node(k) => self.node_mut(k).next = to,
        }
    }

    fn set_prev(&mut self, at: Position, to: Position) {
        match at {
            Position::Sentinel => self.tail = to,
            Position::Node(k) => self.node_mut(k).prev = to,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for List<T> {}

impl<T> Extend<T> for List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.push_back(v);
        }
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = List::new();
        list.extend(iter);
        list
    }
}

/// Iterator over shared references in sequence order.
pub struct Iter<'a, T> {
    list: &'a List<T>,
    front: Position,
    back: Position,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.node(self.front.node()?);
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.node(self.back.node()?);
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}

/// Iterator over mutable references in sequence order.
pub struct IterMut<'a, T> {
    it: std::vec::IntoIter<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.it.next_back()
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}

/// Iterator over element positions in sequence order.
pub struct Positions<'a, T> {
    list: &'a List<T>,
    next: Position,
    remaining: usize,
}

impl<'a, T> Iterator for Positions<'a, T> {
    type Item = Position;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let pos = self.next;
        self.next = self.list.next(pos);
        self.remaining -= 1;
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Owning iterator; pops from the front.
pub struct IntoIter<T> {
    list: List<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;
    #[inline]
    fn next(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len, Some(self.list.len))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.list.pop_back()
    }
}

impl<T> IntoIterator for List<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;
    fn into_iter(self) -> IntoIter<T> {
        IntoIter { list: self }
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut List<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;
    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}
