//! Address-dump ingestion: parses the JSON dump of binary addresses (spec
//! §6) into address records, and provides the `segs`/`adlers` filters the
//! source's `collide.py` used to slice records by segment or checksum before
//! building a campaign.

use serde::Deserialize;
use thiserror::Error;

use crate::target::Target;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed offset {0:?}: expected \"<4-digit seg>:<hex offset>\"")]
    MalformedOffset(String),
    #[error("unknown segment tag {0:?}")]
    UnknownSegment(String),
    #[error("malformed secondary hash {0:?}: expected 64 lowercase hex characters")]
    MalformedSha(String),
}

/// The three segment tags carried through from the binary's section layout.
/// Carried for collaborator filtering only (spec GLOSSARY); the engine
/// itself never inspects this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    Code,
    ReadOnlyData,
    ReadWriteData,
}

impl Segment {
    fn from_tag(tag: &str) -> Result<Self, CollaboratorError> {
        match tag {
            "0001" => Ok(Segment::Code),
            "0002" => Ok(Segment::ReadOnlyData),
            "0003" => Ok(Segment::ReadWriteData),
            other => Err(CollaboratorError::UnknownSegment(other.to_string())),
        }
    }
}

/// One parsed entry from the address dump: which segment and offset it came
/// from, and the (adler, sha) pair observed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRecord {
    pub segment: Segment,
    pub offset: u64,
    pub target: Target,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(rename = "Addresses")]
    addresses: Vec<RawAddress>,
}

#[derive(Deserialize)]
struct RawAddress {
    offset: String,
    hash: String,
    #[serde(rename = "secondary hash")]
    secondary_hash: String,
}

/// Parse a whole address-dump document.
pub fn parse(json: &str) -> Result<Vec<AddressRecord>, CollaboratorError> {
    let doc: RawDocument = serde_json::from_str(json)?;
    doc.addresses.into_iter().map(parse_one).collect()
}

fn parse_one(raw: RawAddress) -> Result<AddressRecord, CollaboratorError> {
    let (seg_tag, hex_offset) = raw
        .offset
        .split_once(':')
        .ok_or_else(|| CollaboratorError::MalformedOffset(raw.offset.clone()))?;
    let segment = Segment::from_tag(seg_tag)?;
    let offset = u64::from_str_radix(hex_offset, 16)
        .map_err(|_| CollaboratorError::MalformedOffset(raw.offset.clone()))?;

    let adler: u32 = raw
        .hash
        .parse()
        .map_err(|_| CollaboratorError::MalformedOffset(raw.hash.clone()))?;

    let sha = parse_sha_hex(&raw.secondary_hash)?;

    Ok(AddressRecord { segment, offset, target: Target::new(adler, sha) })
}

fn parse_sha_hex(s: &str) -> Result<[u8; 32], CollaboratorError> {
    if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CollaboratorError::MalformedSha(s.to_string()));
    }
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
            .map_err(|_| CollaboratorError::MalformedSha(s.to_string()))?;
    }
    Ok(out)
}

/// The source's `segs(*seg_ids)`: records whose segment is one of `segments`.
pub fn segs(records: &[AddressRecord], segments: &[Segment]) -> Vec<Target> {
    records
        .iter()
        .filter(|r| segments.contains(&r.segment))
        .map(|r| r.target)
        .collect()
}

/// The source's `adlers(*adler_ids)`: records whose adler is one of `adlers`.
pub fn adlers(records: &[AddressRecord], adlers: &[u32]) -> Vec<Target> {
    records
        .iter()
        .filter(|r| adlers.contains(&r.target.adler))
        .map(|r| r.target)
        .collect()
}
