use pretty_assertions::assert_eq;
use test_env_log::test;

use super::*;
use crate::value::{DictScope, Value};

/// Root set of a test: some values, and retired frames made of a locals and
/// an arguments dictionary.
#[derive(Default)]
struct TestRoots {
    values: Vec<Value>,
    pending: Vec<(Dict, Dict)>,
}

impl Roots for TestRoots {
    fn trace_roots(&self, marker: &mut Marker) {
        for v in &self.values {
            marker.mark_value(v);
        }
    }

    fn trace_pending(&self, marker: &mut Marker) {
        for (locals, args) in &self.pending {
            marker.mark_dict(locals);
            marker.mark_dict(args);
        }
    }

    fn free_pending(&mut self, copy_id: u32) -> usize {
        let before = self.pending.len();
        self.pending.retain(|(locals, args)| {
            let keep = locals.copy_id() == copy_id || args.copy_id() == copy_id;
            if !keep {
                locals.take_all();
                args.take_all();
            }
            keep
        });
        before - self.pending.len()
    }
}

#[test]
fn test_acyclic_freed_by_refcount() {
    let mut heap = Heap::new();
    let l = heap.new_list();
    l.push(Value::Dict(heap.new_dict()));
    assert_eq!((heap.live_lists(), heap.live_dicts()), (1, 1));
    drop(l);
    assert_eq!((heap.live_lists(), heap.live_dicts()), (0, 0));
}

#[test]
fn test_cycle_collected() {
    let mut heap = Heap::new();
    let l = heap.new_list();
    let d = heap.new_dict();
    l.push(Value::Dict(d.clone()));
    d.add("back", Value::List(l.clone())).expect("add");
    drop((l, d));
    assert_eq!((heap.live_lists(), heap.live_dicts()), (1, 1), "a cycle survives refcounting");

    let stats = heap.collect(&mut TestRoots::default());
    assert_eq!(stats.lists, 1);
    assert_eq!(stats.dicts, 1);
    assert_eq!((heap.live_lists(), heap.live_dicts()), (0, 0));
}

#[test]
fn test_reachable_cycle_kept() {
    let mut heap = Heap::new();
    let l = heap.new_list();
    l.push(Value::List(l.clone()));
    l.push(Value::from(1));
    let mut roots = TestRoots {
        values: vec![Value::List(l.clone())],
        ..Default::default()
    };
    drop(l);

    let stats = heap.collect(&mut roots);
    assert_eq!(stats, GcStats::default());
    let l = roots.values[0].as_list().expect("list");
    assert_eq!(l.len(), 2);
    assert_eq!(heap.live_lists(), 1);
}

#[test]
fn test_rooted_value_kept() {
    let mut heap = Heap::new();
    let d = heap.new_dict();
    d.add("self", Value::Dict(d.clone())).expect("add");
    let handle = heap.root(Value::Dict(d.clone()));
    drop(d);

    heap.collect(&mut TestRoots::default());
    assert_eq!(heap.live_dicts(), 1);
    let d = heap.rooted(handle).and_then(Value::as_dict).expect("rooted dict");
    assert!(d.contains_key("self"));

    heap.unroot(handle);
    heap.collect(&mut TestRoots::default());
    assert_eq!(heap.live_dicts(), 0);
}

#[test]
fn test_watched_list_kept() {
    let mut heap = Heap::new();
    let l = heap.new_list();
    let inner = heap.new_dict();
    l.push(Value::Dict(inner.clone()));
    l.push(Value::List(l.clone()));
    let watcher = l.watch(l.first());
    drop(inner);

    heap.collect(&mut TestRoots::default());
    assert_eq!(l.len(), 2);
    assert_eq!(heap.live_dicts(), 1, "items of a watched list are reachable");

    l.unwatch(watcher);
    let weak = l.downgrade();
    drop(l);
    heap.collect(&mut TestRoots::default());
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_pending_frame_released() {
    let mut heap = Heap::new();
    let locals = heap.new_scope_dict(DictScope::Def);
    let args = heap.new_scope_dict(DictScope::Fixed);
    // The locals reference themselves, so the frame outlived its call.
    locals
        .add("me", Value::Dict(locals.clone()))
        .expect("add");
    let mut roots = TestRoots {
        pending: vec![(locals.clone(), args.clone())],
        ..Default::default()
    };
    drop((locals, args));

    let stats = heap.collect(&mut roots);
    assert_eq!(stats.frames, 1);
    assert!(roots.pending.is_empty());
    assert_eq!(heap.live_dicts(), 0);
}

#[test]
fn test_pending_frame_kept_while_referenced() {
    let mut heap = Heap::new();
    let locals = heap.new_scope_dict(DictScope::Def);
    let args = heap.new_scope_dict(DictScope::Fixed);
    let mut roots = TestRoots {
        values: vec![Value::Dict(locals.clone())],
        pending: vec![(locals.clone(), args.clone())],
    };
    drop((locals, args));

    let stats = heap.collect(&mut roots);
    assert_eq!(stats.frames, 0);
    assert_eq!(roots.pending.len(), 1);

    roots.values.clear();
    let stats = heap.collect(&mut roots);
    assert_eq!(stats.frames, 1);
}

#[test]
fn test_copy_ids_even_and_nonzero() {
    let mut heap = Heap::new();
    let a = heap.next_copy_id();
    let b = heap.next_copy_id();
    assert_eq!(a % 2, 0);
    assert_eq!(b, a + 2);
    heap.copy_id = u32::MAX - 1;
    assert_eq!(heap.next_copy_id(), 2);
}
