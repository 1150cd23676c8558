//! The campaign: the (targets, parts, batch_size, lookup_size, num_threads)
//! tuple from spec §3, plus a streaming builder mirroring the source's
//! `Collider_Create` / `Collider_AddHash` / `Collider_NextPart` /
//! `Collider_AddString` / `Collider_Run` sequence (`hash2077.py::collide`).

use std::collections::HashSet;

use crate::error::EngineError;
use crate::parts::{normalize_all, Part};
use crate::target::Target;

const MAX_BOUND: u64 = 1u64 << 32;

/// One invocation of the collision engine over one (targets, parts) pair.
/// Immutable once built; there is no mid-run mutation or resumption.
#[derive(Debug, Clone)]
pub struct Campaign {
    targets: Vec<Target>,
    parts: Vec<Part>,
    batch_size: u64,
    lookup_size: u64,
    num_threads: usize,
}

impl Campaign {
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn lookup_size(&self) -> u64 {
        self.lookup_size
    }

    /// Requested thread count; `0` means "auto-select to hardware
    /// parallelism", resolved by the driver's plan phase, not here.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// True when any part (or the part list itself) is empty: the product is
    /// empty and a run must return immediately with no results and no
    /// workers started (spec §4.4 failure semantics, Property 7).
    pub fn is_empty_product(&self) -> bool {
        self.parts.is_empty() || self.parts.iter().any(|p| p.is_empty())
    }
}

/// Builds a [`Campaign`] by accumulating hashes then parts in order, the
/// direct analog of the source's C-ABI call sequence.
pub struct CampaignBuilder {
    targets: HashSet<(u32, [u8; 32])>,
    parts: Vec<Part>,
    current_part: Part,
    batch_size: u64,
    lookup_size: u64,
    num_threads: usize,
}

impl CampaignBuilder {
    /// `batch_size`/`lookup_size` default to `2^26`/`2^30` — the more
    /// conservative of the two pairs observed in the original call sites.
    pub fn new() -> Self {
        CampaignBuilder {
            targets: HashSet::new(),
            parts: Vec::new(),
            current_part: Vec::new(),
            batch_size: 1 << 26,
            lookup_size: 1 << 30,
            num_threads: 0,
        }
    }

    pub fn add_hash(&mut self, adler: u32, sha: [u8; 32]) -> &mut Self {
        self.targets.insert((adler, sha));
        self
    }

    /// Close the current part (if anything was added to it since the last
    /// call, or since construction) and open a fresh one. Call once before
    /// the first [`Self::add_string`] of each position.
    pub fn next_part(&mut self) -> &mut Self {
        self.parts.push(std::mem::take(&mut self.current_part));
        self
    }

    pub fn add_string(&mut self, value: impl Into<Vec<u8>>) -> &mut Self {
        self.current_part.push(value.into());
        self
    }

    pub fn num_threads(&mut self, n: usize) -> &mut Self {
        self.num_threads = n;
        self
    }

    pub fn batch_size(&mut self, n: u64) -> &mut Self {
        self.batch_size = n;
        self
    }

    pub fn lookup_size(&mut self, n: u64) -> &mut Self {
        self.lookup_size = n;
        self
    }

    pub fn build(mut self) -> Result<Campaign, EngineError> {
        if !self.current_part.is_empty() || self.parts.is_empty() {
            self.parts.push(std::mem::take(&mut self.current_part));
        }
        Campaign::new(
            self.targets.into_iter().map(|(a, s)| Target::new(a, s)).collect(),
            self.parts,
            self.num_threads,
            self.batch_size,
            self.lookup_size,
        )
    }
}

impl Default for CampaignBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Campaign {
    /// One-shot constructor equivalent to the builder, for callers that
    /// already have the full tuple in hand (e.g. the CLI's ad-hoc-parts
    /// subcommand, or a recipe that built a plain `Vec<Part>`).
    pub fn new(
        targets: Vec<Target>,
        mut parts: Vec<Part>,
        num_threads: usize,
        batch_size: u64,
        lookup_size: u64,
    ) -> Result<Self, EngineError> {
        if batch_size > MAX_BOUND {
            return Err(EngineError::InvalidConfiguration {
                reason: format!("batch_size {batch_size} exceeds 2^32"),
            });
        }
        if lookup_size > MAX_BOUND {
            return Err(EngineError::InvalidConfiguration {
                reason: format!("lookup_size {lookup_size} exceeds 2^32"),
            });
        }

        let mut deduped = HashSet::with_capacity(targets.len());
        let targets: Vec<Target> = targets
            .into_iter()
            .filter(|t| deduped.insert((t.adler, t.sha)))
            .collect();

        if targets.len() as u64 > lookup_size {
            return Err(EngineError::LookupCapacityExceeded {
                targets: targets.len() as u64,
                lookup_size,
            });
        }

        normalize_all(&mut parts);

        Ok(Campaign {
            targets,
            parts,
            batch_size,
            lookup_size,
            num_threads,
        })
    }
}
