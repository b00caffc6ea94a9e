use super::{DictItem, Value, VarLock};
use crate::error::{EvalError, Result};
use crate::gc::Heap;

/// Nesting limit for deep copies and (un)locking.
pub const MAX_NEST: usize = 100;

/// Initial recursion budget of [`Equality`].
const EQUAL_RECURSE_LIMIT: usize = 1000;

/// The lock `cur` gets after `:lockvar` (`lock == true`) or `:unlockvar`.
/// A fixed lock never changes.
pub fn change_lock(lock: bool, cur: VarLock) -> VarLock {
    match cur {
        VarLock::Fixed => VarLock::Fixed,
        _ if lock => VarLock::Locked,
        _ => VarLock::Unlocked,
    }
}

/// Fails with `E741` for a locked and `E742` for a fixed value.
pub fn check_lock(lock: VarLock, name: &str) -> Result<()> {
    let name = if name.is_empty() { "Unknown" } else { name };
    match lock {
        VarLock::Unlocked => Ok(()),
        VarLock::Locked => Err(EvalError::locked("E741", format!("Value is locked: {}", name))),
        VarLock::Fixed => Err(EvalError::locked(
            "E742",
            format!("Cannot change value of {}", name),
        )),
    }
}

/// Structural comparison of values.
///
/// Nested containers are compared with a recursion budget. When the nesting
/// exceeds the budget the containers are considered equal and the budget
/// shrinks, so comparing long chains of distinct but equal structures stays
/// bounded.
#[derive(Debug)]
pub struct Equality {
    limit: usize,
    depth: usize,
}

impl Default for Equality {
    fn default() -> Self {
        Self::new()
    }
}

impl Equality {
    pub fn new() -> Self {
        Equality {
            limit: EQUAL_RECURSE_LIMIT,
            depth: 0,
        }
    }

    /// Compare `a` and `b`. Values of different types are never equal.
    pub fn equal(&mut self, a: &Value, b: &Value, ic: bool) -> bool {
        if self.depth >= self.limit {
            self.limit = self.limit.saturating_sub(1);
            return true;
        }
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::String(x), Value::String(y)) => {
                if ic {
                    x.to_lowercase() == y.to_lowercase()
                } else {
                    x == y
                }
            }
            (Value::Func(x), Value::Func(y)) => x == y,
            (Value::List(x), Value::List(y)) => {
                if x.ptr_eq(y) {
                    return true;
                }
                if x.len() != y.len() {
                    return false;
                }
                self.depth += 1;
                let eq = x
                    .values()
                    .iter()
                    .zip(y.values().iter())
                    .all(|(p, q)| self.equal(p, q, ic));
                self.depth -= 1;
                eq
            }
            (Value::Dict(x), Value::Dict(y)) => {
                if x.ptr_eq(y) {
                    return true;
                }
                if x.len() != y.len() {
                    return false;
                }
                self.depth += 1;
                let eq = x.entries().iter().all(|(key, p)| match y.get(key) {
                    Some(q) => self.equal(p, &q, ic),
                    None => false,
                });
                self.depth -= 1;
                eq
            }
            (Value::Unknown, Value::Unknown) => true,
            _ => false,
        }
    }
}

/// Copy a value. Scalars are copied, containers are duplicated one level
/// (`deep == false`) or recursively.
///
/// With a non-zero `copy_id` every container is stamped with that id and
/// remembers its copy, so a container reached twice during the same deep
/// copy is copied once and cycles are reproduced. With `copy_id == 0` a
/// cycle runs into the nesting limit.
pub(crate) fn copy_value(
    heap: &mut Heap,
    v: &Value,
    deep: bool,
    copy_id: u32,
    depth: usize,
) -> Result<Value> {
    if depth >= MAX_NEST {
        return Err(EvalError::recursion(
            "E698",
            "variable nested too deep for making a copy",
        ));
    }
    match v {
        Value::List(from) => {
            if copy_id != 0 && from.copy_id() == copy_id {
                if let Some(copy) = from.latest_copy() {
                    return Ok(Value::List(copy));
                }
            }
            let to = heap.new_list();
            if copy_id != 0 {
                from.set_copy_id(copy_id);
                from.set_latest_copy(&to);
            }
            for item in from.values() {
                let item = if deep {
                    copy_value(heap, &item, deep, copy_id, depth + 1)?
                } else {
                    item
                };
                to.push(item);
            }
            Ok(Value::List(to))
        }
        Value::Dict(from) => {
            if copy_id != 0 && from.copy_id() == copy_id {
                if let Some(copy) = from.latest_copy() {
                    return Ok(Value::Dict(copy));
                }
            }
            let to = heap.new_dict();
            if copy_id != 0 {
                from.set_copy_id(copy_id);
                from.set_latest_copy(&to);
            }
            for (key, item) in from.entries() {
                let item = if deep {
                    copy_value(heap, &item, deep, copy_id, depth + 1)?
                } else {
                    item
                };
                to.add_item(&key, DictItem::new(item))?;
            }
            Ok(Value::Dict(to))
        }
        other => Ok(other.clone()),
    }
}

/// Lock or unlock the contents of `v`: the container itself and, for
/// `deep > 1` or `deep < 0`, every item recursively down to `deep` levels.
/// The slot holding `v` is changed by the caller.
pub(crate) fn lock_contents(v: &Value, deep: i64, lock: bool, depth: usize) -> Result<()> {
    if depth >= MAX_NEST {
        return Err(EvalError::recursion(
            "E743",
            "variable nested too deep for (un)lock",
        ));
    }
    if deep == 0 {
        return Ok(());
    }
    let recurse = deep < 0 || deep > 1;
    match v {
        Value::List(l) => {
            l.set_lock(change_lock(lock, l.lock()));
            if recurse {
                for key in l.item_keys() {
                    l.set_item_lock(key, change_lock(lock, l.item_lock(key)));
                    if let Some(item) = l.item(key) {
                        lock_contents(&item, deep - 1, lock, depth + 1)?;
                    }
                }
            }
        }
        Value::Dict(d) => {
            d.set_lock(change_lock(lock, d.lock()));
            if recurse {
                for key in d.keys() {
                    let item = d.update(&key, |item| {
                        item.lock = change_lock(lock, item.lock);
                        item.value.clone()
                    });
                    if let Some(item) = item {
                        lock_contents(&item, deep - 1, lock, depth + 1)?;
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Whether `v`, held in a slot with lock `lock`, is locked by `:lockvar`.
/// Fixed values don't count.
pub fn is_locked(lock: VarLock, v: &Value) -> bool {
    lock == VarLock::Locked
        || match v {
            Value::List(l) => l.lock() == VarLock::Locked,
            Value::Dict(d) => d.lock() == VarLock::Locked,
            _ => false,
        }
}
