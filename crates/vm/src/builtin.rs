//! Built-in functions.
//!
//! Only the functions that work on the core value types are here; a host
//! adds its own through user functions or by evaluating on its side.

#[cfg(test)]
mod test;

use std::cmp::Ordering;

use itertools::Itertools;
use smol_str::SmolStr;

use crate::error::{EvalError, Result};
use crate::eval::{key_not_present, list_index_error, Eval, Target};
use crate::interp::Interp;
use crate::scope::{check_fixed, check_ro};
use crate::value::{
    check_lock, copy_value, is_locked, Dict, Equality, FuncRef, ItemFlags, List, Value,
};

pub(crate) type BuiltinFn = fn(&mut Interp, Vec<Value>) -> Result<Value>;

pub(crate) struct Builtin {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub func: BuiltinFn,
}

macro_rules! builtins {
    ($($name:literal => $func:ident($min:expr, $max:expr)),* $(,)?) => {
        /// Sorted by name.
        static BUILTINS: &[Builtin] = &[
            $(Builtin {
                name: $name,
                min_args: $min,
                max_args: $max,
                func: $func,
            }),*
        ];
    };
}

builtins! {
    "add" => add(2, 2),
    "call" => call(2, 3),
    "copy" => copy(1, 1),
    "deepcopy" => deepcopy(1, 2),
    "empty" => empty(1, 1),
    "exists" => exists(1, 1),
    "extend" => extend(2, 3),
    "function" => function(1, 1),
    "garbagecollect" => garbagecollect(0, 1),
    "get" => get(2, 3),
    "has_key" => has_key(2, 2),
    "index" => index(2, 4),
    "insert" => insert(2, 3),
    "islocked" => islocked(1, 1),
    "items" => items(1, 1),
    "join" => join(1, 2),
    "keys" => keys(1, 1),
    "len" => len(1, 1),
    "range" => range(1, 3),
    "remove" => remove(2, 3),
    "string" => string(1, 1),
    "type" => r#type(1, 1),
    "values" => values(1, 1),
}

/// Look up a built-in function.
pub(crate) fn find(name: &str) -> Option<&'static Builtin> {
    BUILTINS
        .binary_search_by(|b| b.name.cmp(name))
        .ok()
        .map(|i| &BUILTINS[i])
}

fn list_required() -> EvalError {
    EvalError::type_error("E714", "List required")
}

fn dict_required() -> EvalError {
    EvalError::type_error("E715", "Dictionary required")
}

fn arg_list(v: &Value) -> Result<&List> {
    v.as_list().ok_or_else(list_required)
}

fn arg_dict(v: &Value) -> Result<&Dict> {
    v.as_dict().ok_or_else(dict_required)
}

fn arg_number(args: &[Value], i: usize, default: i64) -> Result<i64> {
    args.get(i).map_or(Ok(default), Value::get_number)
}

fn add(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let l = arg_list(&args[0])?;
    l.check_lock("add() argument")?;
    l.push(args[1].clone());
    Ok(args[0].clone())
}

fn call(interp: &mut Interp, mut args: Vec<Value>) -> Result<Value> {
    let selfdict = match args.get(2) {
        Some(v) => Some(arg_dict(v)?.clone()),
        None => None,
    };
    let fargs = arg_list(&args[1])?.values();
    match args.swap_remove(0) {
        Value::Func(f) => interp.call_funcref(&f, fargs, selfdict),
        Value::String(name) => interp.call_func(&name, fargs, selfdict, None),
        _ => Err(EvalError::type_error("E475", "Invalid argument: call()")),
    }
}

fn copy(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    copy_value(&mut interp.heap, &args[0], false, 0, 0)
}

fn deepcopy(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let copy_id = match arg_number(&args, 1, 0)? {
        0 => interp.heap.next_copy_id(),
        1 => 0,
        n => {
            return Err(EvalError::type_error(
                "E474",
                format!("Invalid argument: {}", n),
            ))
        }
    };
    copy_value(&mut interp.heap, &args[0], true, copy_id, 0)
}

fn empty(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    Ok(Value::from(args[0].is_empty_value()))
}

/// `exists("&opt")`, `exists("$ENV")`, `exists("*func")` or
/// `exists("var")`, where `var` may carry subscripts.
fn exists(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let text = args[0].get_string()?;
    let found = if let Some(opt) = text.strip_prefix('&') {
        interp.get_option(opt).is_ok()
    } else if let Some(env) = text.strip_prefix('$') {
        interp.host().get_env(env).is_some()
    } else if let Some(func) = text.strip_prefix('*') {
        interp.function_exists(func)
    } else {
        let mut eval = Eval::new(interp, &text);
        let lv = eval.get_lval().and_then(|lv| eval.expect_end().map(|()| lv));
        match lv {
            Ok(lv) => lv.exists(interp),
            Err(_) => false,
        }
    };
    Ok(Value::from(found))
}

fn extend(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::List(l1), Value::List(l2)) => {
            l1.check_lock("extend() argument")?;
            let before = match args.get(2) {
                None => None,
                Some(n) => {
                    let n = n.get_number()?;
                    if n == l1.len() as i64 {
                        None
                    } else {
                        Some(l1.find(n).ok_or_else(|| list_index_error(n))?)
                    }
                }
            };
            l1.extend(l2, before);
        }
        (Value::Dict(d1), Value::Dict(d2)) => {
            let action = match args.get(2) {
                Some(v) => v.get_string()?.into_owned(),
                None => "force".to_owned(),
            };
            if !matches!(action.as_str(), "keep" | "force" | "error") {
                return Err(EvalError::type_error(
                    "E475",
                    format!("Invalid argument: {}", action),
                ));
            }
            d1.check_lock("extend() argument")?;
            for (key, value) in d2.entries() {
                match d1.item(&key) {
                    None => d1.add(&key, value)?,
                    Some(_) if action == "keep" => {}
                    Some(_) if action == "error" => {
                        return Err(EvalError::type_error(
                            "E737",
                            format!("Key already exists: {}", key),
                        ))
                    }
                    Some(item) => {
                        check_ro(item.flags, &key)?;
                        check_lock(item.lock, &key)?;
                        d1.update(&key, |item| item.value = value);
                    }
                }
            }
        }
        _ => {
            return Err(EvalError::type_error(
                "E712",
                "Argument of extend() must be a List or Dictionary",
            ))
        }
    }
    Ok(args[0].clone())
}

fn function(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let name = args[0].get_string()?;
    if name.bytes().all(|c| c.is_ascii_digit()) && !name.is_empty() {
        if let Some(fp) = interp.find_user_func(&name) {
            return Ok(Value::Func(FuncRef::Numbered(fp)));
        }
    }
    let fname = interp.trans_func_name(&name)?;
    if !interp.function_exists(&fname) {
        return Err(EvalError::undefined(
            "E700",
            format!("Unknown function: {}", name),
        ));
    }
    Ok(Value::Func(FuncRef::Named(fname)))
}

fn garbagecollect(interp: &mut Interp, _: Vec<Value>) -> Result<Value> {
    interp.request_gc();
    Ok(Value::Number(0))
}

fn get(_: &mut Interp, mut args: Vec<Value>) -> Result<Value> {
    let default = if args.len() > 2 {
        args.swap_remove(2)
    } else {
        Value::Number(0)
    };
    let found = match &args[0] {
        Value::List(l) => l.get(args[1].get_number()?),
        Value::Dict(d) => d.get(&args[1].get_string()?),
        _ => {
            return Err(EvalError::type_error(
                "E896",
                "Argument of get() must be a List or Dictionary",
            ))
        }
    };
    Ok(found.unwrap_or(default))
}

fn has_key(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let d = arg_dict(&args[0])?;
    Ok(Value::from(d.contains_key(&args[1].get_string()?)))
}

/// `index(list, expr [, start [, ic]])`: index of the first item equal to
/// `expr`, `-1` if there is none.
fn index(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let l = arg_list(&args[0])?;
    let mut start = arg_number(&args, 2, 0)?;
    if start < 0 {
        start = (start + l.len() as i64).max(0);
    }
    let ic = args.get(3).map_or(Ok(false), Value::to_bool)?;
    let mut eq = Equality::new();
    let found = l
        .values()
        .iter()
        .enumerate()
        .skip(start as usize)
        .find(|(_, v)| eq.equal(v, &args[1], ic))
        .map_or(-1, |(i, _)| i as i64);
    Ok(Value::Number(found))
}

fn insert(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let l = arg_list(&args[0])?;
    l.check_lock("insert() argument")?;
    let n = arg_number(&args, 2, 0)?;
    let len = l.len() as i64;
    let before = if n == len {
        None
    } else {
        Some(l.find(n).ok_or_else(|| list_index_error(n))?)
    };
    l.insert_before(args[1].clone(), before);
    Ok(args[0].clone())
}

fn islocked(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let text = args[0].get_string()?;
    let lv = {
        let mut eval = Eval::new(interp, &text);
        let lv = eval.get_lval()?;
        eval.expect_end()?;
        lv
    };
    let locked = match &lv.target {
        Target::Var => interp.var_locked(&lv.name).ok_or_else(|| {
            EvalError::undefined("E121", format!("Undefined variable: {}", lv.name))
        })?,
        Target::ListItem { list, key } => {
            is_locked(list.item_lock(*key), &list.item(*key).unwrap_or_default())
        }
        Target::ListRange { .. } => {
            return Err(EvalError::type_error("E786", "Range not allowed"))
        }
        Target::DictKey { dict, key } => {
            let item = dict.item(key).ok_or_else(|| key_not_present(key))?;
            item.flags.contains(ItemFlags::LOCK) || is_locked(item.lock, &item.value)
        }
    };
    Ok(Value::from(locked))
}

fn items(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let d = arg_dict(&args[0])?;
    let pairs = d
        .entries()
        .into_iter()
        .map(|(k, v)| Value::List(interp.heap.list_from([Value::from(k), v])))
        .collect::<Vec<_>>();
    Ok(Value::List(interp.heap.list_from(pairs)))
}

fn join(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let l = arg_list(&args[0])?;
    let sep = match args.get(1) {
        Some(v) => v.get_string()?.into_owned(),
        None => " ".to_owned(),
    };
    let joined = l
        .values()
        .iter()
        .map(|v| match v {
            Value::String(s) => s.to_string(),
            Value::Number(n) => n.to_string(),
            v => v.to_repr(),
        })
        .join(&sep);
    Ok(Value::from(joined))
}

fn keys(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let d = arg_dict(&args[0])?;
    let keys = d.keys().into_iter().map(Value::from);
    Ok(Value::List(interp.heap.list_from(keys)))
}

fn values(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let d = arg_dict(&args[0])?;
    let values = d.entries().into_iter().map(|(_, v)| v);
    Ok(Value::List(interp.heap.list_from(values)))
}

fn len(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let n = match &args[0] {
        Value::String(s) => s.len(),
        Value::Number(n) => n.to_string().len(),
        Value::List(l) => l.len(),
        Value::Dict(d) => d.len(),
        _ => return Err(EvalError::type_error("E701", "Invalid type for len()")),
    };
    Ok(Value::Number(n as i64))
}

/// `range(n)`, `range(start, end)` or `range(start, end, stride)`; `end`
/// is inclusive.
fn range(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    let first = args[0].get_number()?;
    let (start, end) = match args.get(1) {
        Some(end) => (first, end.get_number()?),
        None => (0, first.saturating_sub(1)),
    };
    let stride = arg_number(&args, 2, 1)?;
    match stride.cmp(&0) {
        Ordering::Equal => return Err(EvalError::type_error("E726", "Stride is zero")),
        Ordering::Greater if start > end.saturating_add(1) => {
            return Err(EvalError::type_error("E727", "Start past end"))
        }
        Ordering::Less if start < end.saturating_sub(1) => {
            return Err(EvalError::type_error("E727", "Start past end"))
        }
        _ => {}
    }
    let mut items = Vec::new();
    let mut i = start;
    while (stride > 0 && i <= end) || (stride < 0 && i >= end) {
        items.push(Value::Number(i));
        i = match i.checked_add(stride) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::List(interp.heap.list_from(items)))
}

fn remove(interp: &mut Interp, args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::List(l) => {
            l.check_lock("remove() argument")?;
            let n1 = args[1].get_number()?;
            let first = l.find(n1).ok_or_else(|| list_index_error(n1))?;
            let end = match args.get(2) {
                None => return Ok(l.remove(first).unwrap_or_default()),
                Some(v) => v.get_number()?,
            };
            let last = l.find(end).ok_or_else(|| list_index_error(end))?;
            let (i1, i2) = (l.index_of(first), l.index_of(last));
            if i2 < i1 {
                return Err(EvalError::index("E16", "Invalid range"));
            }
            let removed = l.remove_range(first, last);
            Ok(Value::List(interp.heap.list_from(removed)))
        }
        Value::Dict(d) => {
            if args.len() > 2 {
                return Err(EvalError::type_error(
                    "E118",
                    "Too many arguments for function: remove",
                ));
            }
            d.check_lock("remove() argument")?;
            let key = SmolStr::new(args[1].get_string()?);
            let item = d.item(&key).ok_or_else(|| key_not_present(&key))?;
            check_fixed(item.flags, &key)?;
            check_ro(item.flags, &key)?;
            d.remove(&key);
            Ok(item.value)
        }
        _ => Err(EvalError::type_error(
            "E896",
            "Argument of remove() must be a List or Dictionary",
        )),
    }
}

fn string(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    Ok(Value::from(args[0].to_repr()))
}

fn r#type(_: &mut Interp, args: Vec<Value>) -> Result<Value> {
    Ok(Value::Number(args[0].type_id()))
}
