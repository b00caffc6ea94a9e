use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::SlotMap;

use super::{check_lock, Value, VarLock};
use crate::error::Result;

slotmap::new_key_type! {
    /// Handle of one item of a [`List`]. Stays valid until that item is removed.
    pub struct ItemKey;
    /// Handle of a cursor registered with [`List::watch`].
    pub struct WatcherKey;
}

struct Node {
    value: Value,
    lock: VarLock,
    prev: Option<ItemKey>,
    next: Option<ItemKey>,
}

#[derive(Default)]
struct Items {
    nodes: SlotMap<ItemKey, Node>,
    first: Option<ItemKey>,
    last: Option<ItemKey>,
    /// Last index looked up and its item.
    idx_cache: Cell<Option<(usize, ItemKey)>>,
}

impl Items {
    fn next(&self, key: ItemKey) -> Option<ItemKey> {
        self.nodes.get(key).and_then(|n| n.next)
    }

    fn prev(&self, key: ItemKey) -> Option<ItemKey> {
        self.nodes.get(key).and_then(|n| n.prev)
    }

    /// Unlink `key`, returning its node.
    fn unlink(&mut self, key: ItemKey) -> Option<Node> {
        let node = self.nodes.remove(key)?;
        match node.prev {
            Some(p) => self.nodes[p].next = node.next,
            None => self.first = node.next,
        }
        match node.next {
            Some(n) => self.nodes[n].prev = node.prev,
            None => self.last = node.prev,
        }
        Some(node)
    }
}

pub struct ListInner {
    items: RefCell<Items>,
    /// Cursors of running iterations. `None` means the iteration is at the end.
    watchers: RefCell<SlotMap<WatcherKey, Option<ItemKey>>>,
    lock: Cell<VarLock>,
    copy_id: Cell<u32>,
    /// The copy made by the deep copy that set `copy_id`.
    copy: RefCell<Weak<ListInner>>,
}

/// A shared, mutable, doubly linked list of values.
///
/// Cloning a `List` clones the handle, not the items.
#[derive(Clone)]
pub struct List(pub(crate) Rc<ListInner>);

impl List {
    /// Create a list not known to any heap. Use [`Heap::new_list`] instead so
    /// the garbage collector can find it.
    ///
    /// [`Heap::new_list`]: crate::gc::Heap::new_list
    pub(crate) fn alloc() -> List {
        List(Rc::new(ListInner {
            items: RefCell::new(Items::default()),
            watchers: RefCell::new(SlotMap::with_key()),
            lock: Cell::new(VarLock::Unlocked),
            copy_id: Cell::new(0),
            copy: RefCell::new(Weak::new()),
        }))
    }

    pub(crate) fn downgrade(&self) -> Weak<ListInner> {
        Rc::downgrade(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lock(&self) -> VarLock {
        self.0.lock.get()
    }

    pub fn set_lock(&self, lock: VarLock) {
        self.0.lock.set(lock)
    }

    /// Fails if the list itself is locked or fixed.
    pub fn check_lock(&self, name: &str) -> Result<()> {
        check_lock(self.lock(), name)
    }

    /// Returns `true` if both handles point to the same list.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    /// Number of handles to this list.
    pub(crate) fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub(crate) fn copy_id(&self) -> u32 {
        self.0.copy_id.get()
    }

    pub(crate) fn set_copy_id(&self, id: u32) {
        self.0.copy_id.set(id)
    }

    pub(crate) fn latest_copy(&self) -> Option<List> {
        self.0.copy.borrow().upgrade().map(List)
    }

    pub(crate) fn set_latest_copy(&self, copy: &List) {
        *self.0.copy.borrow_mut() = copy.downgrade();
    }

    pub fn first(&self) -> Option<ItemKey> {
        self.0.items.borrow().first
    }

    pub fn last(&self) -> Option<ItemKey> {
        self.0.items.borrow().last
    }

    pub fn next(&self, key: ItemKey) -> Option<ItemKey> {
        self.0.items.borrow().next(key)
    }

    pub fn prev(&self, key: ItemKey) -> Option<ItemKey> {
        self.0.items.borrow().prev(key)
    }

    /// Find the item at index `n`, counting from the end when negative.
    ///
    /// The last lookup is cached, and the walk starts from whichever of the
    /// first item, the last item and the cached one is nearest.
    pub fn find(&self, n: i64) -> Option<ItemKey> {
        let items = self.0.items.borrow();
        let len = items.nodes.len() as i64;
        let n = if n < 0 { n + len } else { n };
        if n < 0 || n >= len {
            return None;
        }
        let n = n as usize;
        let len = len as usize;

        let (mut idx, mut key) = match items.idx_cache.get() {
            Some((idx, _)) if n < idx / 2 => (0, items.first?),
            Some((idx, _)) if n > (idx + len) / 2 => (len - 1, items.last?),
            Some(cached) => cached,
            None if n < len / 2 => (0, items.first?),
            None => (len - 1, items.last?),
        };
        while idx < n {
            key = items.next(key)?;
            idx += 1;
        }
        while idx > n {
            key = items.prev(key)?;
            idx -= 1;
        }
        items.idx_cache.set(Some((n, key)));
        Some(key)
    }

    /// Value at index `n`, counting from the end when negative.
    pub fn get(&self, n: i64) -> Option<Value> {
        self.find(n).and_then(|key| self.item(key))
    }

    /// Position of `key` in the list.
    pub fn index_of(&self, key: ItemKey) -> Option<usize> {
        let items = self.0.items.borrow();
        let mut cur = items.first;
        let mut idx = 0;
        while let Some(k) = cur {
            if k == key {
                return Some(idx);
            }
            cur = items.next(k);
            idx += 1;
        }
        None
    }

    pub fn item(&self, key: ItemKey) -> Option<Value> {
        self.0.items.borrow().nodes.get(key).map(|n| n.value.clone())
    }

    pub fn item_lock(&self, key: ItemKey) -> VarLock {
        self.0
            .items
            .borrow()
            .nodes
            .get(key)
            .map_or(VarLock::Unlocked, |n| n.lock)
    }

    pub fn set_item_lock(&self, key: ItemKey, lock: VarLock) {
        if let Some(node) = self.0.items.borrow_mut().nodes.get_mut(key) {
            node.lock = lock;
        }
    }

    /// Replace the value of an item, returning the old one.
    pub fn set_item(&self, key: ItemKey, value: Value) -> Option<Value> {
        let mut items = self.0.items.borrow_mut();
        let node = items.nodes.get_mut(key)?;
        Some(std::mem::replace(&mut node.value, value))
    }

    /// Handles of all items, in order.
    pub fn item_keys(&self) -> Vec<ItemKey> {
        let items = self.0.items.borrow();
        let mut keys = Vec::with_capacity(items.nodes.len());
        let mut cur = items.first;
        while let Some(k) = cur {
            keys.push(k);
            cur = items.next(k);
        }
        keys
    }

    /// A snapshot of all values, in order.
    pub fn values(&self) -> Vec<Value> {
        let items = self.0.items.borrow();
        let mut values = Vec::with_capacity(items.nodes.len());
        let mut cur = items.first;
        while let Some(k) = cur {
            values.push(items.nodes[k].value.clone());
            cur = items.next(k);
        }
        values
    }

    pub fn push(&self, value: Value) -> ItemKey {
        self.insert_before(value, None)
    }

    /// Insert `value` before the item `before`, or at the end when `None`.
    pub fn insert_before(&self, value: Value, before: Option<ItemKey>) -> ItemKey {
        let mut items = self.0.items.borrow_mut();
        let before = before.filter(|k| items.nodes.contains_key(*k));
        let prev = match before {
            Some(b) => items.nodes[b].prev,
            None => items.last,
        };
        let key = items.nodes.insert(Node {
            value,
            lock: VarLock::Unlocked,
            prev,
            next: before,
        });
        match prev {
            Some(p) => items.nodes[p].next = Some(key),
            None => items.first = Some(key),
        }
        match before {
            Some(b) => {
                items.nodes[b].prev = Some(key);
                items.idx_cache.set(None);
            }
            None => items.last = Some(key),
        }
        key
    }

    /// Append every item of `other`. Only the items present when the call
    /// starts are added, so extending a list with itself terminates.
    pub fn extend(&self, other: &List, before: Option<ItemKey>) {
        for value in other.values() {
            self.insert_before(value, before);
        }
    }

    /// Remove the items from `first` to `last` inclusive, returning their
    /// values. Every watcher pointing into the range is moved to the item
    /// after it.
    pub fn remove_range(&self, first: ItemKey, last: ItemKey) -> Vec<Value> {
        let mut items = self.0.items.borrow_mut();
        items.idx_cache.set(None);
        let after = items.next(last);

        let mut doomed = Vec::new();
        let mut cur = Some(first);
        while let Some(k) = cur {
            doomed.push(k);
            if k == last {
                break;
            }
            cur = items.next(k);
        }
        let removed = doomed
            .iter()
            .filter_map(|k| items.unlink(*k))
            .map(|node| node.value)
            .collect();

        for (_, cursor) in self.0.watchers.borrow_mut().iter_mut() {
            if cursor.map_or(false, |c| doomed.contains(&c)) {
                *cursor = after;
            }
        }
        removed
    }

    /// Remove one item, returning its value.
    pub fn remove(&self, key: ItemKey) -> Option<Value> {
        self.remove_range(key, key).pop()
    }

    /// Take all items out of the list. Used by the collector to break cycles.
    pub(crate) fn take_all(&self) -> Vec<Value> {
        let mut old = std::mem::take(&mut *self.0.items.borrow_mut());
        let mut values = Vec::with_capacity(old.nodes.len());
        let mut cur = old.first;
        while let Some(node) = cur.and_then(|k| old.nodes.remove(k)) {
            cur = node.next;
            values.push(node.value);
        }
        values
    }

    /// Register an iteration cursor pointing at `cursor`.
    pub fn watch(&self, cursor: Option<ItemKey>) -> WatcherKey {
        self.0.watchers.borrow_mut().insert(cursor)
    }

    pub fn watcher_cursor(&self, watcher: WatcherKey) -> Option<ItemKey> {
        self.0.watchers.borrow().get(watcher).copied().flatten()
    }

    pub fn set_watcher_cursor(&self, watcher: WatcherKey, cursor: Option<ItemKey>) {
        if let Some(c) = self.0.watchers.borrow_mut().get_mut(watcher) {
            *c = cursor;
        }
    }

    pub fn unwatch(&self, watcher: WatcherKey) {
        self.0.watchers.borrow_mut().remove(watcher);
    }

    pub fn has_watchers(&self) -> bool {
        !self.0.watchers.borrow().is_empty()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Value::List(self.clone()).to_repr())
    }
}
