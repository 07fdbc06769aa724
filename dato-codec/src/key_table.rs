//! Key dedup table
//!
//! Open addressing with linear probing. Keys are hashed with FNV-1a over at
//! most [`HASH_SAMPLES`] bytes; a hit is only reported after a full byte
//! comparison against the encoder buffer, so sampling can cost a dedup but
//! never merge two different keys.

use crate::handle::KeyRef;
use tracing::trace;

/// Maximum number of key bytes fed to the hash
pub const HASH_SAMPLES: usize = 32;

const INITIAL_SLOTS: usize = 16;
const EMPTY: u32 = u32::MAX;
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a over every byte of short keys, or over bytes taken at a stride of
/// `len / 32` for longer ones.
pub fn sampled_hash(bytes: &[u8]) -> u32 {
    let stride = (bytes.len() / HASH_SAMPLES).max(1);
    bytes
        .iter()
        .step_by(stride)
        .take(HASH_SAMPLES)
        .fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ *byte as u32).wrapping_mul(FNV_PRIME)
        })
}

#[derive(Debug, Clone, Copy)]
struct KeyEntry {
    key: KeyRef,
    hash: u32,
}

/// Set of keys already written to the encoder buffer
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    entries: Vec<KeyEntry>,
    slots: Vec<u32>,
}

impl KeyTable {
    /// Create an empty table; slots are allocated on first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key was registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of hash slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Find a previously inserted key equal to `key`. `data` is the buffer
    /// the inserted keys point into.
    pub fn find(&self, data: &[u8], key: &[u8]) -> Option<KeyRef> {
        if self.entries.is_empty() {
            return None;
        }
        let hash = sampled_hash(key);
        let slot_count = self.slots.len();
        let start = hash as usize % slot_count;
        let mut pos = start;
        loop {
            let index = self.slots[pos];
            if index == EMPTY {
                return None;
            }
            let entry = &self.entries[index as usize];
            if entry.hash == hash
                && entry.key.len as usize == key.len()
                && data.get(entry.key.data_range()) == Some(key)
            {
                return Some(entry.key);
            }
            pos = (pos + 1) % slot_count;
            if pos == start {
                return None;
            }
        }
    }

    /// Register a key that is not in the table yet.
    pub fn insert(&mut self, data: &[u8], key: KeyRef) {
        // Keep at least 20% of the slots free.
        if self.entries.len() * 5 >= self.slots.len() * 4 {
            let new_slots = if self.slots.is_empty() {
                INITIAL_SLOTS
            } else {
                self.slots.len() * 2
            };
            self.rehash(new_slots);
        }

        let hash = sampled_hash(data.get(key.data_range()).unwrap_or_default());
        let index = self.entries.len() as u32;
        self.entries.push(KeyEntry { key, hash });
        self.place(hash, index);
    }

    fn rehash(&mut self, slot_count: usize) {
        trace!(
            slots = slot_count,
            entries = self.entries.len(),
            "rehashing key table"
        );
        self.slots.clear();
        self.slots.resize(slot_count, EMPTY);
        for i in 0..self.entries.len() {
            let hash = self.entries[i].hash;
            self.place(hash, i as u32);
        }
    }

    fn place(&mut self, hash: u32, index: u32) {
        let slot_count = self.slots.len();
        let mut pos = hash as usize % slot_count;
        // The load factor guarantees an empty slot.
        while self.slots[pos] != EMPTY {
            pos = (pos + 1) % slot_count;
        }
        self.slots[pos] = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Append `key` to `data` the way the encoder lays keys out (4-byte
    /// length, bytes, terminator) and return its handle.
    fn push_key(data: &mut Vec<u8>, key: &[u8]) -> KeyRef {
        let pos = data.len() as u32;
        data.extend_from_slice(&(key.len() as u32).to_le_bytes());
        let data_pos = data.len() as u32;
        data.extend_from_slice(key);
        data.push(0);
        KeyRef {
            pos,
            data_pos,
            len: key.len() as u32,
        }
    }

    #[test]
    fn test_find_after_insert() {
        let mut data = Vec::new();
        let mut table = KeyTable::new();
        let alpha = push_key(&mut data, b"alpha");
        table.insert(&data, alpha);

        assert_eq!(table.find(&data, b"alpha"), Some(alpha));
        assert_eq!(table.find(&data, b"alph"), None);
        assert_eq!(table.find(&data, b"alphaa"), None);
    }

    #[test]
    fn test_empty_table_finds_nothing() {
        let table = KeyTable::new();
        assert!(table.is_empty());
        assert_eq!(table.find(&[], b""), None);
    }

    #[test]
    fn test_empty_key() {
        let mut data = Vec::new();
        let mut table = KeyTable::new();
        let empty = push_key(&mut data, b"");
        table.insert(&data, empty);
        assert_eq!(table.find(&data, b""), Some(empty));
        assert_eq!(sampled_hash(b""), FNV_OFFSET_BASIS);
    }

    #[test]
    fn test_growth_keeps_every_key() {
        let mut data = Vec::new();
        let mut table = KeyTable::new();
        let mut keys = Vec::new();
        for i in 0..1_000 {
            let name = format!("key-{i}");
            let key = push_key(&mut data, name.as_bytes());
            table.insert(&data, key);
            keys.push((name, key));
        }

        assert_eq!(table.len(), 1_000);
        assert!(table.len() * 5 < table.slot_count() * 4 + 5);
        assert!(table.slot_count().is_power_of_two());
        for (name, key) in &keys {
            assert_eq!(table.find(&data, name.as_bytes()), Some(*key));
        }
    }

    #[test]
    fn test_first_rehash_allocates_sixteen_slots() {
        let mut data = Vec::new();
        let mut table = KeyTable::new();
        let key = push_key(&mut data, b"x");
        table.insert(&data, key);
        assert_eq!(table.slot_count(), 16);
    }

    #[test]
    fn test_sampled_collision_is_not_merged() {
        // 64-byte keys are sampled at every other byte, so keys that differ
        // only at odd positions hash identically.
        let a = vec![b'a'; 64];
        let mut b = a.clone();
        b[1] = b'z';
        assert_eq!(sampled_hash(&a), sampled_hash(&b));

        let mut data = Vec::new();
        let mut table = KeyTable::new();
        let key_a = push_key(&mut data, &a);
        table.insert(&data, key_a);

        assert_eq!(table.find(&data, &a), Some(key_a));
        assert_eq!(table.find(&data, &b), None);

        let key_b = push_key(&mut data, &b);
        table.insert(&data, key_b);
        assert_eq!(table.find(&data, &b), Some(key_b));
        assert_eq!(table.find(&data, &a), Some(key_a));
    }

    #[test]
    fn test_short_keys_hash_every_byte() {
        assert_ne!(sampled_hash(b"ab"), sampled_hash(b"ba"));
        let mut long = vec![0u8; 32];
        let base = sampled_hash(&long);
        long[31] = 1;
        assert_ne!(sampled_hash(&long), base);
    }
}
