//! Map entry sort kernels
//!
//! Int keys: insertion sort for small maps, LSB radix sort otherwise.
//! String keys: three-way radix quicksort on key bytes, finishing small
//! partitions with insertion sort. Key bytes are read from the encoder
//! buffer through each entry's [`KeyRef`].

use crate::handle::{IntMapEntry, KeyRef, StringMapEntry};
use tracing::trace;

/// Largest int map sorted with insertion sort
pub const INT_INSERTION_LIMIT: usize = 58;

/// Partitions spanning fewer entries than this use insertion sort
pub const STRING_INSERTION_SPAN: usize = 64;

/// Sort int map entries by ascending key.
///
/// `scratch` is reused between calls to avoid reallocating the radix buffer.
pub fn sort_int_entries(entries: &mut [IntMapEntry], scratch: &mut Vec<IntMapEntry>) {
    if entries.len() <= INT_INSERTION_LIMIT {
        insertion_sort_int(entries);
    } else {
        trace!(entries = entries.len(), "radix sorting int map");
        radix_sort_int(entries, scratch);
    }
}

fn insertion_sort_int(entries: &mut [IntMapEntry]) {
    for i in 1..entries.len() {
        let current = entries[i];
        let mut j = i;
        while j > 0 && current.key < entries[j - 1].key {
            entries[j] = entries[j - 1];
            j -= 1;
        }
        entries[j] = current;
    }
}

fn radix_sort_int(entries: &mut [IntMapEntry], scratch: &mut Vec<IntMapEntry>) {
    scratch.clear();
    scratch.extend_from_slice(entries);

    let mut from: &mut [IntMapEntry] = entries;
    let mut to: &mut [IntMapEntry] = scratch.as_mut_slice();
    // Four passes, so the result ends up back in `entries`.
    for pass in 0..4 {
        let shift = pass * 8;
        let bucket = |entry: &IntMapEntry| ((entry.key >> shift) & 0xFF) as usize;

        let mut offsets = [0usize; 256];
        for entry in from.iter() {
            offsets[bucket(entry)] += 1;
        }
        let mut total = 0;
        for offset in offsets.iter_mut() {
            let count = *offset;
            *offset = total;
            total += count;
        }
        for entry in from.iter() {
            let b = bucket(entry);
            to[offsets[b]] = *entry;
            offsets[b] += 1;
        }
        std::mem::swap(&mut from, &mut to);
    }
}

/// Key bytes of `key`, terminator excluded
#[inline]
pub(crate) fn key_bytes<'d>(data: &'d [u8], key: &KeyRef) -> &'d [u8] {
    data.get(key.data_range()).unwrap_or_default()
}

/// Byte `at` of the key, or -1 past its end
#[inline]
fn char_at(data: &[u8], key: &KeyRef, at: usize) -> i32 {
    match key_bytes(data, key).get(at) {
        Some(byte) => *byte as i32,
        None => -1,
    }
}

/// Sort string map entries by key bytes, shorter keys first on a shared prefix.
pub fn sort_string_entries(data: &[u8], entries: &mut [StringMapEntry]) {
    quick3_sort(data, entries, 0);
}

fn quick3_sort(data: &[u8], entries: &mut [StringMapEntry], which: usize) {
    if entries.len() < 2 {
        return;
    }
    if entries.len() - 1 < STRING_INSERTION_SPAN {
        insertion_sort_string(data, entries, which);
        return;
    }

    let pivot = char_at(data, &entries[0].key, which);
    let mut lt = 0;
    let mut gt = entries.len() - 1;
    let mut i = 1;
    while i <= gt {
        let c = char_at(data, &entries[i].key, which);
        if c < pivot {
            entries.swap(lt, i);
            lt += 1;
            i += 1;
        } else if c > pivot {
            entries.swap(i, gt);
            gt -= 1;
        } else {
            i += 1;
        }
    }

    let (less, rest) = entries.split_at_mut(lt);
    let (equal, greater) = rest.split_at_mut(gt + 1 - lt);
    quick3_sort(data, less, which);
    // Keys that ended at `which` are all equal; nothing left to compare.
    if pivot >= 0 {
        quick3_sort(data, equal, which + 1);
    }
    quick3_sort(data, greater, which);
}

#[inline]
fn key_tail<'d>(data: &'d [u8], entry: &StringMapEntry, which: usize) -> &'d [u8] {
    key_bytes(data, &entry.key).get(which..).unwrap_or_default()
}

/// Insertion sort comparing keys from byte `which` onward; every key in the
/// partition shares the first `which` bytes.
fn insertion_sort_string(data: &[u8], entries: &mut [StringMapEntry], which: usize) {
    for i in 1..entries.len() {
        let current = entries[i];
        let mut j = i;
        while j > 0 && key_tail(data, &current, which) < key_tail(data, &entries[j - 1], which) {
            entries[j] = entries[j - 1];
            j -= 1;
        }
        entries[j] = current;
    }
}
