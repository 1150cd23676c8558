//! The product enumerator: an N-digit odometer over the part alphabets, with
//! incremental Adler-32 hashing so a shared prefix is hashed exactly once no
//! matter how many suffixes are swept past it.

use crate::adler32::Adler32;
use crate::parts::Part;

/// One emitted candidate: its concatenated bytes and the Adler-32 of the
/// whole string (computed incrementally, never re-hashed from scratch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub bytes: Vec<u8>,
    pub adler: u32,
}

/// Read-only view over the part alphabets, used to hand out per-worker
/// partitions of the outermost digit's range.
pub struct ProductEnumerator<'p> {
    parts: &'p [Part],
}

impl<'p> ProductEnumerator<'p> {
    /// Parts are assumed non-empty and individually non-empty; callers (the
    /// driver) handle the empty-product case before constructing this.
    pub fn new(parts: &'p [Part]) -> Self {
        debug_assert!(!parts.is_empty());
        debug_assert!(parts.iter().all(|p| !p.is_empty()));
        ProductEnumerator { parts }
    }

    pub fn cardinality(&self) -> u64 {
        crate::parts::cardinality(self.parts)
    }

    /// Slice the outermost digit's range into `num_workers` contiguous,
    /// roughly equal blocks and return an iterator over worker `worker_idx`'s
    /// share of the product. Every candidate in the full product is produced
    /// by exactly one worker across `0..num_workers`.
    pub fn partition(&self, worker_idx: usize, num_workers: usize) -> PartitionIter<'p> {
        let outer_len = self.parts[0].len();
        let (start, end) = partition_range(outer_len, worker_idx, num_workers);
        PartitionIter::new(self.parts, start, end)
    }
}

/// Split `total` items into `num_workers` contiguous blocks, the first
/// `total % num_workers` of which get one extra item.
fn partition_range(total: usize, worker_idx: usize, num_workers: usize) -> (usize, usize) {
    if num_workers == 0 {
        return (0, total);
    }
    let base = total / num_workers;
    let rem = total % num_workers;
    let start = worker_idx * base + worker_idx.min(rem);
    let size = base + if worker_idx < rem { 1 } else { 0 };
    (start, start + size)
}

/// Lazy iterator over one worker's slice of the product. Produces candidates
/// in odometer order; callers must not rely on that order.
pub struct PartitionIter<'p> {
    parts: &'p [Part],
    index: Vec<usize>,
    states: Vec<Adler32>,
    buffer: Vec<u8>,
    offsets: Vec<usize>,
    outer_end: usize,
    started: bool,
    finished: bool,
}

impl<'p> PartitionIter<'p> {
    fn new(parts: &'p [Part], start: usize, end: usize) -> Self {
        let n = parts.len();
        let finished = start >= end;
        let mut index = vec![0usize; n];
        if n > 0 {
            index[0] = start;
        }
        let mut iter = PartitionIter {
            parts,
            index,
            states: vec![Adler32::new(); n + 1],
            buffer: Vec::new(),
            offsets: vec![0usize; n + 1],
            outer_end: end,
            started: false,
            finished,
        };
        if !finished {
            iter.rebuild_from(0);
        }
        iter
    }

    /// Recompute states and the candidate buffer for positions `k..N` from
    /// the current `index`, reusing `states[k]`/`buffer[..offsets[k]]` (the
    /// part of the candidate that did not change).
    fn rebuild_from(&mut self, k: usize) {
        self.buffer.truncate(self.offsets[k]);
        for i in k..self.parts.len() {
            let chosen = &self.parts[i][self.index[i]];
            self.states[i + 1] = self.states[i].extended(chosen);
            self.buffer.extend_from_slice(chosen);
            self.offsets[i + 1] = self.buffer.len();
        }
    }

    /// Advance the odometer by one. Returns `false` once the partition is
    /// exhausted (the outermost digit has walked past `outer_end`).
    fn advance(&mut self) -> bool {
        let n = self.parts.len();
        let mut i = n - 1;
        loop {
            self.index[i] += 1;
            if self.index[i] < self.parts[i].len() {
                break;
            }
            self.index[i] = 0;
            if i == 0 {
                return false;
            }
            i -= 1;
        }
        if i == 0 && self.index[0] >= self.outer_end {
            return false;
        }
        self.rebuild_from(i);
        true
    }
}

impl<'p> Iterator for PartitionIter<'p> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        if self.finished {
            return None;
        }
        if self.started {
            if !self.advance() {
                self.finished = true;
                return None;
            }
        } else {
            self.started = true;
        }
        let n = self.parts.len();
        Some(Candidate {
            bytes: self.buffer[..self.offsets[n]].to_vec(),
            adler: self.states[n].checksum(),
        })
    }
}
