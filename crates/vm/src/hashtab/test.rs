use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_hash_str() {
    assert_eq!(hash_str(""), 0);
    assert_eq!(hash_str("a"), 97);
    assert_eq!(hash_str("ab"), 97 * 101 + 98);
}

#[test]
fn test_add_find_remove() {
    let mut ht = HashTab::new();
    ht.add("foo", 1).expect("add foo");
    ht.add("bar", 2).expect("add bar");
    assert_eq!(ht.add("foo", 3), Err(HashError::Duplicate));
    assert_eq!(ht.add("", 3), Err(HashError::EmptyKey));
    assert_eq!(ht.len(), 2);

    let slot = ht.find("foo");
    assert!(slot.is_occupied());
    assert_eq!(ht.get_at(slot), Some(&1));
    assert!(!ht.find("baz").is_occupied());

    assert_eq!(ht.remove("foo"), Some(1));
    assert_eq!(ht.remove("foo"), None);
    assert_eq!(ht.len(), 1);
    assert_eq!(ht.filled(), 2, "the tombstone still counts as filled");
    assert_eq!(ht.get("bar"), Some(&2));
}

#[test]
fn test_tombstone_reused() {
    let mut ht = HashTab::new();
    ht.add("key", 1).expect("add");
    let first = ht.find("key").index();
    ht.remove("key");

    let slot = ht.find("key");
    assert!(!slot.is_occupied());
    assert_eq!(slot.index(), first, "a miss resolves to the first tombstone");
    ht.add_at(slot, "key", 2).expect("add again");
    assert_eq!(ht.filled(), 1);
}

#[test]
fn test_insert_remove_sequence() {
    let mut ht = HashTab::new();
    let n = 500;
    for i in 0..n {
        ht.add(&format!("k{}", i), i).expect("add");
    }
    let m = 320;
    for i in 0..m {
        assert_eq!(ht.remove(&format!("k{}", i)), Some(i));
    }
    assert_eq!(ht.len(), n - m);
    for i in m..n {
        assert_eq!(ht.get(&format!("k{}", i)), Some(&i), "k{} is findable", i);
    }
    for i in 0..m {
        assert!(!ht.contains_key(&format!("k{}", i)));
    }
    assert!(ht.filled() * 3 < ht.capacity() * 2, "at least a third is empty");
    assert!(ht.capacity().is_power_of_two());
}

#[test]
fn test_grows_and_shrinks() {
    let mut ht = HashTab::new();
    assert_eq!(ht.capacity(), HT_INIT_SIZE);
    for i in 0..100 {
        ht.add(&i.to_string(), ()).expect("add");
    }
    let big = ht.capacity();
    assert!(big >= 128);

    for i in 0..98 {
        ht.remove(&i.to_string());
    }
    // Removing never resizes, the next insertion does.
    assert_eq!(ht.capacity(), big);
    ht.add("x", ()).expect("add");
    assert_eq!(ht.capacity(), HT_INIT_SIZE);
    assert_eq!(ht.filled(), 3, "tombstones are dropped by a rehash");
    assert!(ht.contains_key("98") && ht.contains_key("99") && ht.contains_key("x"));
}

#[test]
fn test_no_resize_while_locked() {
    let mut ht = HashTab::new();
    ht.lock();
    for i in 0..14 {
        ht.add(&i.to_string(), i).expect("add");
    }
    assert_eq!(ht.capacity(), HT_INIT_SIZE);
    ht.add("14", 14).expect("add");
    assert_eq!(ht.add("15", 15), Err(HashError::Full), "one empty slot is kept");

    ht.unlock();
    assert!(!ht.is_locked());
    assert!(ht.capacity() > HT_INIT_SIZE, "deferred resize happens on unlock");
    ht.add("15", 15).expect("add after unlock");
    assert_eq!(ht.len(), 16);
}

#[test]
fn test_walk_by_index() {
    let mut ht = HashTab::new();
    for k in ["a", "b", "c"] {
        ht.add(k, k.len()).expect("add");
    }
    let mut keys = (0..ht.capacity())
        .filter_map(|i| ht.entry_at(i).map(|(k, _)| k.to_string()))
        .collect::<Vec<_>>();
    keys.sort();
    assert_eq!(keys, vec!["a", "b", "c"]);

    let drained = ht.drain();
    assert_eq!(drained.len(), 3);
    assert!(ht.is_empty());
}
