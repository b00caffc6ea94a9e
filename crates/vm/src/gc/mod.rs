//! Cycle collection on top of reference counting.
//!
//! Lists and dictionaries are reference counted, which frees everything
//! except cycles. Every container is also registered in the [`Heap`], so a
//! mark-and-sweep pass can find the ones no root reaches and empty them,
//! breaking the cycles they are part of.
//!
//! The mark of a container is its copy id. A collection takes a fresh even
//! id, marks retired call frames with `id + 1` and everything reachable from
//! the roots with `id`. The sweep spares both marks, but only frames whose
//! scopes carry exactly `id` are still needed; the others are released and
//! the whole pass repeats until no frame is freed.

#[cfg(test)]
mod test;

use std::rc::Weak;

use slotmap::{HopSlotMap, SlotMap};
use tracing::{debug, trace};

use crate::value::{Dict, DictScope, List, Value};
use crate::value::{DictInner, ListInner};

slotmap::new_key_type! {
    /// A value kept alive across collections, see [`Heap::root`].
    pub struct RootHandle;
    struct ContainerKey;
}

/// Registries smaller than this are not pruned.
const INIT_PRUNE_AT: usize = 64;

/// Everything a collection needs besides the heap: the root set and the
/// retired call frames.
pub trait Roots {
    /// Mark every scope and every value held by the running program.
    fn trace_roots(&self, marker: &mut Marker);

    /// Mark the scopes of frames that returned while something still
    /// referenced them.
    fn trace_pending(&self, marker: &mut Marker);

    /// Release retired frames whose scopes are not marked with `copy_id`.
    /// Returns the number of frames released.
    fn free_pending(&mut self, copy_id: u32) -> usize;
}

/// Marks containers with a copy id, iteratively.
pub struct Marker {
    copy_id: u32,
    stack: Vec<Value>,
}

impl Marker {
    pub fn new(copy_id: u32) -> Self {
        Marker {
            copy_id,
            stack: Vec::new(),
        }
    }

    pub fn mark_value(&mut self, v: &Value) {
        match v {
            Value::List(l) => self.mark_list(l),
            Value::Dict(d) => self.mark_dict(d),
            _ => {}
        }
        self.drain();
    }

    pub fn mark_list(&mut self, l: &List) {
        if l.copy_id() != self.copy_id {
            l.set_copy_id(self.copy_id);
            self.stack.extend(l.values().into_iter().filter(is_container));
        }
        self.drain();
    }

    pub fn mark_dict(&mut self, d: &Dict) {
        if d.copy_id() != self.copy_id {
            d.set_copy_id(self.copy_id);
            self.stack.extend(
                d.entries()
                    .into_iter()
                    .map(|(_, v)| v)
                    .filter(is_container),
            );
        }
        self.drain();
    }

    fn drain(&mut self) {
        while let Some(v) = self.stack.pop() {
            match &v {
                Value::List(l) if l.copy_id() != self.copy_id => {
                    l.set_copy_id(self.copy_id);
                    self.stack.extend(l.values().into_iter().filter(is_container));
                }
                Value::Dict(d) if d.copy_id() != self.copy_id => {
                    d.set_copy_id(self.copy_id);
                    self.stack.extend(
                        d.entries()
                            .into_iter()
                            .map(|(_, v)| v)
                            .filter(is_container),
                    );
                }
                _ => {}
            }
        }
    }
}

fn is_container(v: &Value) -> bool {
    matches!(v, Value::List(_) | Value::Dict(_))
}

/// Result of one [`Heap::collect`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub lists: usize,
    pub dicts: usize,
    pub frames: usize,
}

/// Registry of every list and dictionary, plus the explicit roots.
pub struct Heap {
    lists: SlotMap<ContainerKey, Weak<ListInner>>,
    dicts: SlotMap<ContainerKey, Weak<DictInner>>,
    roots: HopSlotMap<RootHandle, Value>,
    copy_id: u32,
    prune_at: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Heap {
        Heap {
            lists: SlotMap::with_key(),
            dicts: SlotMap::with_key(),
            roots: HopSlotMap::with_key(),
            copy_id: 0,
            prune_at: INIT_PRUNE_AT,
        }
    }

    pub fn new_list(&mut self) -> List {
        let list = List::alloc();
        self.lists.insert(list.downgrade());
        self.maybe_prune();
        list
    }

    /// Create a list holding `values`.
    pub fn list_from(&mut self, values: impl IntoIterator<Item = Value>) -> List {
        let list = self.new_list();
        for v in values {
            list.push(v);
        }
        list
    }

    pub fn new_dict(&mut self) -> Dict {
        self.new_scope_dict(DictScope::None)
    }

    /// Create a dictionary backing a variable scope.
    pub fn new_scope_dict(&mut self, scope: DictScope) -> Dict {
        let dict = Dict::alloc(scope);
        self.dicts.insert(dict.downgrade());
        self.maybe_prune();
        dict
    }

    /// Keep `v` and everything it references alive until
    /// [`unroot`](Heap::unroot) is called. Values held outside the
    /// interpreter across a collection must be rooted.
    pub fn root(&mut self, v: Value) -> RootHandle {
        self.roots.insert(v)
    }

    pub fn unroot(&mut self, handle: RootHandle) -> Option<Value> {
        self.roots.remove(handle)
    }

    pub fn rooted(&self, handle: RootHandle) -> Option<&Value> {
        self.roots.get(handle)
    }

    /// A fresh copy id for a deep copy or a collection. Never zero, always
    /// even.
    pub fn next_copy_id(&mut self) -> u32 {
        self.copy_id = self.copy_id.wrapping_add(2);
        if self.copy_id == 0 {
            self.copy_id = 2;
        }
        self.copy_id
    }

    /// Number of lists still alive.
    pub fn live_lists(&self) -> usize {
        self.lists.values().filter(|w| w.strong_count() > 0).count()
    }

    /// Number of dictionaries still alive.
    pub fn live_dicts(&self) -> usize {
        self.dicts.values().filter(|w| w.strong_count() > 0).count()
    }

    fn maybe_prune(&mut self) {
        if self.lists.len() + self.dicts.len() < self.prune_at {
            return;
        }
        self.prune();
        self.prune_at = ((self.lists.len() + self.dicts.len()) * 2).max(INIT_PRUNE_AT);
    }

    fn prune(&mut self) {
        self.lists.retain(|_, w| w.strong_count() > 0);
        self.dicts.retain(|_, w| w.strong_count() > 0);
    }

    /// Free every container that no root reaches, repeating while retired
    /// frames get released.
    pub fn collect(&mut self, roots: &mut dyn Roots) -> GcStats {
        let mut stats = GcStats::default();
        loop {
            let id = self.next_copy_id();
            trace!(copy_id = id, "gc: mark");

            let mut pending = Marker::new(id + 1);
            roots.trace_pending(&mut pending);

            let mut marker = Marker::new(id);
            for v in self.roots.values() {
                marker.mark_value(v);
            }
            // A list being iterated over belongs to a live loop even when
            // nothing else points at it.
            for l in self.lists.values().filter_map(Weak::upgrade).map(List) {
                if l.has_watchers() {
                    marker.mark_list(&l);
                }
            }
            roots.trace_roots(&mut marker);

            let (lists, dicts) = self.sweep(id);
            let frames = roots.free_pending(id);
            debug!(copy_id = id, lists, dicts, frames, "gc: sweep");

            stats.lists += lists;
            stats.dicts += dicts;
            stats.frames += frames;
            if frames == 0 {
                break;
            }
        }
        self.prune();
        stats
    }

    fn sweep(&mut self, id: u32) -> (usize, usize) {
        let unmarked = |copy_id: u32| (copy_id & !1) != (id & !1);

        let lists = self
            .lists
            .values()
            .filter_map(Weak::upgrade)
            .map(List)
            .filter(|l| unmarked(l.copy_id()) && !l.has_watchers())
            .collect::<Vec<_>>();
        let dicts = self
            .dicts
            .values()
            .filter_map(Weak::upgrade)
            .map(Dict)
            .filter(|d| unmarked(d.copy_id()))
            .collect::<Vec<_>>();

        // Emptying the containers drops the references that kept the cycles
        // alive; the values themselves go away at the end of this function.
        let mut garbage = Vec::new();
        for l in &lists {
            garbage.extend(l.take_all());
        }
        for d in &dicts {
            garbage.extend(d.take_all().into_iter().map(|item| item.value));
        }
        drop(garbage);
        (lists.len(), dicts.len())
    }
}
