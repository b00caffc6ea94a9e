//! Open-addressing hash table with string keys.
//!
//! Every dictionary and every variable scope is stored in one of these. The
//! probe sequence is `idx = 5 * idx + perturb + 1` with `perturb` starting at
//! the hash and shifted right by [`PERTURB_SHIFT`] every step, which visits
//! every slot of a power-of-two table. Removed entries leave a tombstone so
//! probe chains stay intact.

use smol_str::SmolStr;
use thiserror::Error;

/// Initial number of slots. Always a power of two.
pub const HT_INIT_SIZE: usize = 16;
const PERTURB_SHIFT: u32 = 5;

/// Left-to-right rolling hash seeded with the first byte. The empty string
/// hashes to `0`.
pub fn hash_str(key: &str) -> u64 {
    let mut bytes = key.bytes();
    let first = match bytes.next() {
        Some(b) => b as u64,
        None => return 0,
    };
    bytes.fold(first, |h, b| h.wrapping_mul(101).wrapping_add(b as u64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("key already present")]
    Duplicate,
    #[error("empty key")]
    EmptyKey,
    #[error("table is locked and full")]
    Full,
    #[error("out of memory")]
    OutOfMemory,
}

#[derive(Debug, Clone)]
enum Bucket<V> {
    Empty,
    Removed,
    Full { hash: u64, key: SmolStr, value: V },
}

/// Result of a [`HashTab::find`]: the slot holding the key, or the slot the
/// key would be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    index: usize,
    hash: u64,
    occupied: bool,
}

impl Slot {
    /// Returns `true` if the key was found.
    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct HashTab<V> {
    buckets: Vec<Bucket<V>>,
    /// Number of live entries.
    used: usize,
    /// Number of live entries plus tombstones.
    filled: usize,
    /// Resizing is deferred while non-zero.
    locked: u32,
    /// Set when growing the table failed.
    error: bool,
}

impl<V> Default for HashTab<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTab<V> {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(HT_INIT_SIZE);
        buckets.resize_with(HT_INIT_SIZE, || Bucket::Empty);
        HashTab {
            buckets,
            used: 0,
            filled: 0,
            locked: 0,
            error: false,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Number of live entries plus tombstones.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_locked(&self) -> bool {
        self.locked > 0
    }

    /// Returns `true` if the last attempt to grow the table failed.
    pub fn has_error(&self) -> bool {
        self.error
    }

    fn mask(&self) -> u64 {
        self.buckets.len() as u64 - 1
    }

    /// Find the slot of `key`. When the key is absent the returned slot is the
    /// first tombstone on its probe chain, or the empty slot ending the chain.
    pub fn find(&self, key: &str) -> Slot {
        self.lookup(key, hash_str(key))
    }

    fn lookup(&self, key: &str, hash: u64) -> Slot {
        let mask = self.mask();
        let mut idx = hash & mask;
        let mut freeitem = None;

        match &self.buckets[idx as usize] {
            Bucket::Empty => return Slot { index: idx as usize, hash, occupied: false },
            Bucket::Removed => freeitem = Some(idx as usize),
            Bucket::Full { hash: h, key: k, .. } if *h == hash && k == key => {
                return Slot { index: idx as usize, hash, occupied: true };
            }
            Bucket::Full { .. } => {}
        }

        let mut perturb = hash;
        loop {
            idx = (idx << 2).wrapping_add(idx).wrapping_add(perturb).wrapping_add(1);
            let index = (idx & mask) as usize;
            match &self.buckets[index] {
                Bucket::Empty => {
                    return Slot {
                        index: freeitem.unwrap_or(index),
                        hash,
                        occupied: false,
                    }
                }
                Bucket::Full { hash: h, key: k, .. } if *h == hash && k == key => {
                    return Slot { index, hash, occupied: true };
                }
                Bucket::Removed => {
                    freeitem.get_or_insert(index);
                }
                Bucket::Full { .. } => {}
            }
            perturb >>= PERTURB_SHIFT;
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let slot = self.find(key);
        self.get_at(slot)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let slot = self.find(key);
        self.get_at_mut(slot)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).occupied
    }

    pub fn get_at(&self, slot: Slot) -> Option<&V> {
        match self.buckets.get(slot.index) {
            Some(Bucket::Full { value, .. }) if slot.occupied => Some(value),
            _ => None,
        }
    }

    pub fn get_at_mut(&mut self, slot: Slot) -> Option<&mut V> {
        match self.buckets.get_mut(slot.index) {
            Some(Bucket::Full { value, .. }) if slot.occupied => Some(value),
            _ => None,
        }
    }

    /// Key and value stored in slot number `index`, if it is occupied. Used to
    /// walk the table while it is locked.
    pub fn entry_at(&self, index: usize) -> Option<(&SmolStr, &V)> {
        match self.buckets.get(index) {
            Some(Bucket::Full { key, value, .. }) => Some((key, value)),
            _ => None,
        }
    }

    /// Add a new entry. Fails if the key is already present.
    pub fn add(&mut self, key: &str, value: V) -> Result<(), HashError> {
        let slot = self.find(key);
        if slot.occupied {
            return Err(HashError::Duplicate);
        }
        self.add_at(slot, key, value)
    }

    /// Store a new entry in the slot returned by [`find`](HashTab::find).
    pub fn add_at(&mut self, slot: Slot, key: &str, value: V) -> Result<(), HashError> {
        if key.is_empty() {
            return Err(HashError::EmptyKey);
        }
        if slot.occupied {
            return Err(HashError::Duplicate);
        }
        if self.error && self.may_resize(0).is_err() {
            return Err(HashError::OutOfMemory);
        }
        let was_empty = matches!(self.buckets[slot.index], Bucket::Empty);
        if was_empty && self.filled + 1 >= self.buckets.len() {
            // Only possible while locked: a probe chain needs an empty slot
            // to end on.
            return Err(HashError::Full);
        }

        self.used += 1;
        if was_empty {
            self.filled += 1;
        }
        self.buckets[slot.index] = Bucket::Full {
            hash: slot.hash,
            key: SmolStr::new(key),
            value,
        };
        // The entry is stored either way; a failed resize is remembered and
        // retried by the next insertion.
        let _ = self.may_resize(0);
        Ok(())
    }

    /// Insert or replace, returning the old value.
    pub fn insert(&mut self, key: &str, value: V) -> Result<Option<V>, HashError> {
        let slot = self.find(key);
        if let Some(old) = self.get_at_mut(slot) {
            return Ok(Some(std::mem::replace(old, value)));
        }
        self.add_at(slot, key, value).map(|_| None)
    }

    /// Remove the entry in `slot`, leaving a tombstone.
    pub fn remove_at(&mut self, slot: Slot) -> Option<V> {
        if !slot.occupied {
            return None;
        }
        match std::mem::replace(&mut self.buckets[slot.index], Bucket::Removed) {
            Bucket::Full { value, .. } => {
                self.used -= 1;
                Some(value)
            }
            other => {
                self.buckets[slot.index] = other;
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let slot = self.find(key);
        self.remove_at(slot)
    }

    /// Defer resizing. Calls nest.
    pub fn lock(&mut self) {
        self.locked += 1;
    }

    /// Undo one [`lock`](HashTab::lock), resizing if that was deferred.
    pub fn unlock(&mut self) {
        self.locked = self.locked.saturating_sub(1);
        let _ = self.may_resize(0);
    }

    /// Make room for at least `minitems` entries.
    pub fn reserve(&mut self, minitems: usize) -> Result<(), HashError> {
        self.may_resize(minitems)
    }

    /// Grow or shrink the table. With `minitems == 0` the size follows the
    /// number of entries.
    fn may_resize(&mut self, minitems: usize) -> Result<(), HashError> {
        if self.locked > 0 {
            return Ok(());
        }
        let oldsize = self.buckets.len();

        let minsize = if minitems == 0 {
            // Room for inserting below the load limit.
            if self.filled < HT_INIT_SIZE - 1 && oldsize == HT_INIT_SIZE {
                return Ok(());
            }
            // Not too full and not mostly empty either.
            if self.filled * 3 < oldsize * 2 && self.used > oldsize / 5 {
                return Ok(());
            }
            // Grow a small table by 4, a big one by 2.
            if self.used > 1000 {
                self.used * 2
            } else {
                self.used * 4
            }
        } else {
            let minitems = minitems.max(self.used);
            minitems * 3 / 2 + 1
        };

        let mut newsize = HT_INIT_SIZE;
        while newsize < minsize {
            newsize = match newsize.checked_mul(2) {
                Some(n) => n,
                None => {
                    self.error = true;
                    return Err(HashError::OutOfMemory);
                }
            };
        }

        let mut buckets = Vec::new();
        if buckets.try_reserve_exact(newsize).is_err() {
            self.error = true;
            return Err(HashError::OutOfMemory);
        }
        buckets.resize_with(newsize, || Bucket::Empty);

        let old = std::mem::replace(&mut self.buckets, buckets);
        let mask = newsize as u64 - 1;
        for bucket in old {
            if let Bucket::Full { hash, key, value } = bucket {
                let mut idx = hash & mask;
                let mut perturb = hash;
                while !matches!(self.buckets[idx as usize], Bucket::Empty) {
                    idx = (idx << 2).wrapping_add(idx).wrapping_add(perturb).wrapping_add(1) & mask;
                    perturb >>= PERTURB_SHIFT;
                }
                self.buckets[idx as usize] = Bucket::Full { hash, key, value };
            }
        }
        self.filled = self.used;
        self.error = false;
        Ok(())
    }

    /// Iterate over all entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &V)> {
        self.buckets.iter().filter_map(|b| match b {
            Bucket::Full { key, value, .. } => Some((key, value)),
            _ => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&SmolStr, &mut V)> {
        self.buckets.iter_mut().filter_map(|b| match b {
            Bucket::Full { key, value, .. } => Some((&*key, value)),
            _ => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.iter().map(|(k, _)| k)
    }

    /// Remove every entry, returning them. The table goes back to its
    /// initial size unless it is locked.
    pub fn drain(&mut self) -> Vec<(SmolStr, V)> {
        let size = if self.locked > 0 {
            self.buckets.len()
        } else {
            HT_INIT_SIZE
        };
        let mut fresh = Vec::with_capacity(size);
        fresh.resize_with(size, || Bucket::Empty);
        let old = std::mem::replace(&mut self.buckets, fresh);
        self.used = 0;
        self.filled = 0;
        old.into_iter()
            .filter_map(|b| match b {
                Bucket::Full { key, value, .. } => Some((key, value)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod test;
