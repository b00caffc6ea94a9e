use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use smol_str::SmolStr;

use super::{check_lock, Value, VarLock};
use crate::error::{dict_error, Result};
use crate::hashtab::HashTab;

bitflags! {
    /// Flags of a dictionary entry.
    #[derive(Default)]
    pub struct ItemFlags: u8 {
        /// Value can't be changed.
        const RO = 0b0001;
        /// Entry can't be deleted.
        const FIX = 0b0010;
        /// Locked with `:lockvar`.
        const LOCK = 0b0100;
    }
}

/// One entry of a [`Dict`].
#[derive(Clone, Debug)]
pub struct DictItem {
    pub value: Value,
    /// Lock of the value stored in this entry.
    pub lock: VarLock,
    pub flags: ItemFlags,
}

impl DictItem {
    pub fn new(value: Value) -> Self {
        DictItem {
            value,
            lock: VarLock::Unlocked,
            flags: ItemFlags::empty(),
        }
    }

    pub fn with_flags(value: Value, flags: ItemFlags) -> Self {
        DictItem {
            value,
            lock: VarLock::Unlocked,
            flags,
        }
    }
}

/// Marks a dictionary that backs a variable scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictScope {
    /// An ordinary dictionary.
    None,
    /// A scope that can't get new entries (`a:`, `v:`).
    Fixed,
    /// A scope where new variables can be defined (`g:`, `l:`, `s:`...).
    Def,
}

pub struct DictInner {
    table: RefCell<HashTab<DictItem>>,
    lock: Cell<VarLock>,
    scope: Cell<DictScope>,
    copy_id: Cell<u32>,
    /// The copy made by the deep copy that set `copy_id`.
    copy: RefCell<Weak<DictInner>>,
}

/// A shared, mutable map from strings to values.
///
/// Cloning a `Dict` clones the handle, not the entries.
#[derive(Clone)]
pub struct Dict(pub(crate) Rc<DictInner>);

impl Dict {
    /// Create a dictionary not known to any heap. Use [`Heap::new_dict`]
    /// instead so the garbage collector can find it.
    ///
    /// [`Heap::new_dict`]: crate::gc::Heap::new_dict
    pub(crate) fn alloc(scope: DictScope) -> Dict {
        Dict(Rc::new(DictInner {
            table: RefCell::new(HashTab::new()),
            lock: Cell::new(VarLock::Unlocked),
            scope: Cell::new(scope),
            copy_id: Cell::new(0),
            copy: RefCell::new(Weak::new()),
        }))
    }

    pub(crate) fn downgrade(&self) -> Weak<DictInner> {
        Rc::downgrade(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.table.borrow().len()
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

    /// Fails if the dictionary itself is locked or fixed.
    pub fn check_lock(&self, name: &str) -> Result<()> {
        check_lock(self.lock(), name)
    }

    pub fn scope(&self) -> DictScope {
        self.0.scope.get()
    }

    /// Returns `true` if both handles point to the same dictionary.
    pub fn ptr_eq(&self, other: &Dict) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    /// Number of handles to this dictionary.
    pub(crate) fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub(crate) fn copy_id(&self) -> u32 {
        self.0.copy_id.get()
    }

    pub(crate) fn set_copy_id(&self, id: u32) {
        self.0.copy_id.set(id)
    }

    pub(crate) fn latest_copy(&self) -> Option<Dict> {
        self.0.copy.borrow().upgrade().map(Dict)
    }

    pub(crate) fn set_latest_copy(&self, copy: &Dict) {
        *self.0.copy.borrow_mut() = copy.downgrade();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.table.borrow().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.table.borrow().get(key).map(|item| item.value.clone())
    }

    pub fn item(&self, key: &str) -> Option<DictItem> {
        self.0.table.borrow().get(key).cloned()
    }

    /// Add a new entry. Fails on duplicate or empty keys.
    pub fn add(&self, key: &str, value: Value) -> Result<()> {
        self.add_item(key, DictItem::new(value))
    }

    pub fn add_item(&self, key: &str, item: DictItem) -> Result<()> {
        self.0
            .table
            .borrow_mut()
            .add(key, item)
            .map_err(|e| dict_error(e, key))
    }

    /// Set the value of `key`, keeping the flags of an existing entry.
    /// Returns the old value.
    pub fn set(&self, key: &str, value: Value) -> Result<Option<Value>> {
        let mut table = self.0.table.borrow_mut();
        if let Some(item) = table.get_mut(key) {
            return Ok(Some(std::mem::replace(&mut item.value, value)));
        }
        table
            .add(key, DictItem::new(value))
            .map(|_| None)
            .map_err(|e| dict_error(e, key))
    }

    /// Run `f` on the entry of `key`. `f` must not access this dictionary.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut DictItem) -> R) -> Option<R> {
        self.0.table.borrow_mut().get_mut(key).map(f)
    }

    pub fn remove(&self, key: &str) -> Option<DictItem> {
        self.0.table.borrow_mut().remove(key)
    }

    /// Snapshot of the keys, in table order.
    pub fn keys(&self) -> Vec<SmolStr> {
        self.0.table.borrow().keys().cloned().collect()
    }

    /// Snapshot of the entries, in table order.
    pub fn entries(&self) -> Vec<(SmolStr, Value)> {
        self.0
            .table
            .borrow()
            .iter()
            .map(|(k, item)| (k.clone(), item.value.clone()))
            .collect()
    }

    /// Call `f` on every entry while the table is locked against resizing.
    /// `f` may modify this dictionary: entries added during the walk may or
    /// may not be visited, removed ones are skipped.
    pub fn walk<E>(
        &self,
        mut f: impl FnMut(&SmolStr, &Value) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        self.0.table.borrow_mut().lock();
        let _guard = scopeguard::guard((), |_| self.0.table.borrow_mut().unlock());

        let size = self.0.table.borrow().capacity();
        for idx in 0..size {
            let entry = self
                .0
                .table
                .borrow()
                .entry_at(idx)
                .map(|(k, item)| (k.clone(), item.value.clone()));
            if let Some((key, value)) = entry {
                f(&key, &value)?;
            }
        }
        Ok(())
    }

    /// Take all entries out of the dictionary. Used by the collector and to
    /// clear scopes.
    pub(crate) fn take_all(&self) -> Vec<DictItem> {
        self.0
            .table
            .borrow_mut()
            .drain()
            .into_iter()
            .map(|(_, item)| item)
            .collect()
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Value::Dict(self.clone()).to_repr())
    }
}
