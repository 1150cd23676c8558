//! Part alphabets: one ordered list of byte strings per position of the
//! concatenation.
//!
//! Callers are expected to pre-sort and deduplicate (per spec §3); we
//! re-verify defensively since the cost is linear in a part's size and the
//! consequence of trusting a stale precondition is a silently-duplicated
//! search.

/// One alphabet: the candidate byte strings available at a single position.
pub type Part = Vec<Vec<u8>>;

/// Deduplicate and sort a part in place. Order within a part has no observed
/// effect on the result set (campaigns re-normalize regardless of what the
/// caller already did), so plain byte-lexicographic order is used.
pub fn normalize(part: &mut Part) {
    part.sort_unstable();
    part.dedup();
}

/// Normalize a whole part list.
pub fn normalize_all(parts: &mut [Part]) {
    for part in parts.iter_mut() {
        normalize(part);
    }
}

/// Normalize a bare string into a singleton alphabet, mirroring the source's
/// variadic-argument handling (a single string at a position is shorthand for
/// "exactly this one value here").
pub fn singleton(value: impl Into<Vec<u8>>) -> Part {
    vec![value.into()]
}

/// Product cardinality `Π|Pᵢ|`. Zero if any part is empty.
pub fn cardinality(parts: &[Part]) -> u64 {
    parts.iter().fold(1u64, |acc, part| acc.saturating_mul(part.len() as u64))
}
