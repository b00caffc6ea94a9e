use expect_test::expect;
use pretty_assertions::assert_eq;

use super::*;
use crate::error::ErrorKind;
use crate::gc::Heap;

fn list(heap: &mut Heap, values: &[Value]) -> List {
    heap.list_from(values.iter().cloned())
}

#[test]
fn test_format_float() {
    let cases = [
        (1.0, "1.0"),
        (0.5, "0.5"),
        (1.0 / 3.0, "0.333333"),
        (-2.25, "-2.25"),
        (0.0, "0.0"),
        (1234567.0, "1234567.0"),
        (1.5e20, "1.5e20"),
        (1e-4, "1.0e-4"),
        (f64::INFINITY, "inf"),
        (f64::NEG_INFINITY, "-inf"),
        (f64::NAN, "nan"),
    ];
    for (f, s) in cases {
        assert_eq!(format_float(f), s, "formatting {}", f);
    }
}

#[test]
fn test_conversions() {
    assert_eq!(Value::str("0x1F").get_number(), Ok(31));
    assert_eq!(Value::str("-12abc").get_number(), Ok(-12));
    assert_eq!(Value::str("abc").get_number(), Ok(0));
    assert_eq!(Value::Float(1.5).get_string().map(|s| s.into_owned()), Ok("1.5".into()));
    assert_eq!(Value::Number(-3).get_float(), Ok(-3.0));

    let err = Value::Float(1.0).get_number().unwrap_err();
    assert_eq!(err.id(), "E805");
    let err = Value::str("1.0").get_float().unwrap_err();
    assert_eq!(err.id(), "E892");

    let mut heap = Heap::new();
    let l = Value::List(heap.new_list());
    assert_eq!(l.get_string().unwrap_err().id(), "E730");
    assert_eq!(l.get_number().unwrap_err().id(), "E745");
    assert_eq!(l.to_bool().unwrap_err().kind(), ErrorKind::Type);
}

#[test]
fn test_repr() {
    let mut heap = Heap::new();
    let d = heap.new_dict();
    d.add("k", Value::str("it's")).expect("add");
    let l = list(
        &mut heap,
        &[
            Value::from(1),
            Value::from(2.5),
            Value::Dict(d),
            Value::Func(FuncRef::Named("Foo".into())),
        ],
    );
    expect![[r#"[1, 2.5, {'k': 'it''s'}, function('Foo')]"#]]
        .assert_eq(&Value::List(l.clone()).to_repr());

    assert_eq!(Value::str("raw").to_echo(), "raw");
    assert_eq!(Value::str("raw").to_repr(), "'raw'");
    assert_eq!(Value::Func(FuncRef::Named("Foo".into())).to_echo(), "Foo");
}

#[test]
fn test_repr_of_cycle() {
    let mut heap = Heap::new();
    let l = list(&mut heap, &[Value::from(1)]);
    l.push(Value::List(l.clone()));
    let d = heap.new_dict();
    d.add("l", Value::List(l.clone())).expect("add");
    l.push(Value::Dict(d.clone()));

    expect![[r#"[1, [...], {'l': [...]}]"#]].assert_eq(&Value::List(l.clone()).to_repr());
    expect![[r#"{'l': [1, [...], {...}]}"#]].assert_eq(&Value::Dict(d).to_repr());
    l.take_all();
}

#[test]
fn test_equality() {
    let mut heap = Heap::new();
    let a = list(&mut heap, &[Value::from(1), Value::str("X")]);
    let b = list(&mut heap, &[Value::from(1), Value::str("x")]);
    let mut eq = Equality::new();
    assert!(!eq.equal(&Value::List(a.clone()), &Value::List(b.clone()), false));
    assert!(eq.equal(&Value::List(a.clone()), &Value::List(b.clone()), true));
    assert!(!eq.equal(&Value::from(1), &Value::from(1.0), false));
    assert!(!eq.equal(&Value::from(1), &Value::str("1"), false));

    b.push(Value::from(3));
    assert!(!eq.equal(&Value::List(a), &Value::List(b), true));
}

#[test]
fn test_equality_of_cycles_terminates() {
    let mut heap = Heap::new();
    let a = heap.new_list();
    a.push(Value::List(a.clone()));
    let b = heap.new_list();
    b.push(Value::List(b.clone()));
    assert_eq!(Value::List(a.clone()), Value::List(b.clone()));
    a.take_all();
    b.take_all();
}

#[test]
fn test_shallow_copy() {
    let mut heap = Heap::new();
    let inner = list(&mut heap, &[Value::from(1)]);
    let outer = list(&mut heap, &[Value::List(inner.clone())]);

    let copy = copy_value(&mut heap, &Value::List(outer.clone()), false, 0, 0).expect("copy");
    let copy = copy.as_list().expect("list");
    assert!(!copy.ptr_eq(&outer));
    let item = copy.get(0).expect("item");
    assert!(item.as_list().expect("inner").ptr_eq(&inner), "items are shared");
}

#[test]
fn test_deep_copy_acyclic() {
    let mut heap = Heap::new();
    let d = heap.new_dict();
    d.add("n", Value::from(1)).expect("add");
    let orig = Value::List(list(&mut heap, &[Value::Dict(d.clone()), Value::str("s")]));

    let shallow = copy_value(&mut heap, &orig, false, 0, 0).expect("copy");
    let id = heap.next_copy_id();
    let deep = copy_value(&mut heap, &shallow, true, id, 0).expect("deep copy");
    assert_eq!(deep, orig);

    let copied = deep.as_list().and_then(|l| l.get(0)).expect("item");
    assert!(!copied.as_dict().expect("dict").ptr_eq(&d));
}

#[test]
fn test_deep_copy_keeps_cycles_and_sharing() {
    let mut heap = Heap::new();
    let shared = heap.new_dict();
    let l = list(&mut heap, &[Value::Dict(shared.clone()), Value::Dict(shared.clone())]);
    l.push(Value::List(l.clone()));

    let id = heap.next_copy_id();
    let copy = copy_value(&mut heap, &Value::List(l.clone()), true, id, 0).expect("deep copy");
    let copy = copy.as_list().expect("list").clone();
    assert!(!copy.ptr_eq(&l));

    let first = copy.get(0).expect("first");
    let second = copy.get(1).expect("second");
    let first = first.as_dict().expect("dict");
    assert!(first.ptr_eq(second.as_dict().expect("dict")));
    assert!(!first.ptr_eq(&shared));
    let back = copy.get(2).expect("back reference");
    assert!(back.as_list().expect("list").ptr_eq(&copy), "the cycle is reproduced");

    l.take_all();
    copy.take_all();
}

#[test]
fn test_deep_copy_nesting_limit() {
    let mut heap = Heap::new();
    let l = heap.new_list();
    l.push(Value::List(l.clone()));
    let err = copy_value(&mut heap, &Value::List(l.clone()), true, 0, 0).unwrap_err();
    assert_eq!(err.id(), "E698");
    assert_eq!(err.kind(), ErrorKind::RecursionLimit);
    l.take_all();
}

#[test]
fn test_lock() {
    assert_eq!(change_lock(true, VarLock::Unlocked), VarLock::Locked);
    assert_eq!(change_lock(false, VarLock::Locked), VarLock::Unlocked);
    assert_eq!(change_lock(false, VarLock::Fixed), VarLock::Fixed);
    assert_eq!(check_lock(VarLock::Locked, "x").unwrap_err().id(), "E741");
    assert_eq!(check_lock(VarLock::Fixed, "x").unwrap_err().id(), "E742");

    let mut heap = Heap::new();
    let inner = list(&mut heap, &[Value::from(1)]);
    let outer = list(&mut heap, &[Value::List(inner.clone())]);
    let v = Value::List(outer.clone());

    lock_contents(&v, 1, true, 0).expect("lock");
    assert_eq!(outer.lock(), VarLock::Locked);
    assert_eq!(inner.lock(), VarLock::Unlocked);

    lock_contents(&v, -1, true, 0).expect("lock");
    assert_eq!(inner.lock(), VarLock::Locked);
    let key = outer.first().expect("item");
    assert_eq!(outer.item_lock(key), VarLock::Locked);

    lock_contents(&v, 2, false, 0).expect("unlock");
    assert_eq!(outer.lock(), VarLock::Unlocked);
    assert_eq!(inner.lock(), VarLock::Unlocked);
}

#[test]
fn test_list_watchers() {
    let mut heap = Heap::new();
    let l = list(&mut heap, &[Value::from(1), Value::from(2), Value::from(3)]);
    let second = l.find(1).expect("second");
    let w = l.watch(Some(second));

    l.remove(second);
    assert_eq!(l.item(l.watcher_cursor(w).expect("cursor")), Some(Value::from(3)));

    let third = l.find(1).expect("third");
    l.remove(third);
    assert_eq!(l.watcher_cursor(w), None, "moved past the end");
    l.unwatch(w);
    assert!(!l.has_watchers());
}

#[test]
fn test_list_find() {
    let mut heap = Heap::new();
    let l = heap.list_from((0..10).map(Value::from));
    assert_eq!(l.get(3), Some(Value::from(3)));
    assert_eq!(l.get(4), Some(Value::from(4)));
    assert_eq!(l.get(-1), Some(Value::from(9)));
    assert_eq!(l.get(10), None);
    assert_eq!(l.get(-11), None);

    let before = l.find(4);
    l.insert_before(Value::from(-1), before);
    assert_eq!(l.get(4), Some(Value::from(-1)));
    assert_eq!(l.get(5), Some(Value::from(4)));
    assert_eq!(l.len(), 11);

    let removed = l.remove_range(l.find(0).expect("first"), l.find(4).expect("fifth"));
    assert_eq!(removed.len(), 5);
    assert_eq!(l.get(0), Some(Value::from(4)));
}

#[test]
fn test_extend_with_itself() {
    let mut heap = Heap::new();
    let l = list(&mut heap, &[Value::from(1), Value::from(2)]);
    l.extend(&l.clone(), None);
    expect![["[1, 2, 1, 2]"]].assert_eq(&Value::List(l).to_repr());
}

#[test]
fn test_dict_flags_and_walk() {
    let mut heap = Heap::new();
    let d = heap.new_dict();
    d.add_item("ro", DictItem::with_flags(Value::from(1), ItemFlags::RO | ItemFlags::FIX))
        .expect("add");
    d.add("a", Value::from(2)).expect("add");
    assert_eq!(d.add("a", Value::from(3)).unwrap_err().id(), "E721");
    assert_eq!(d.add("", Value::from(3)).unwrap_err().id(), "E713");

    d.set("ro", Value::from(5)).expect("set");
    let item = d.item("ro").expect("item");
    assert_eq!(item.value, Value::from(5));
    assert!(item.flags.contains(ItemFlags::RO));

    let mut seen = Vec::new();
    d.walk::<()>(|k, _| {
        seen.push(k.to_string());
        d.remove(k);
        Ok(())
    })
    .expect("walk");
    seen.sort();
    assert_eq!(seen, vec!["a", "ro"]);
    assert!(d.is_empty());
}
