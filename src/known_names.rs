//! Known-names persistence: the collaborator that remembers, across many
//! campaigns in one reversing session, which SHA-256 digests have already
//! been resolved to a human name (spec §4.5, §6).
//!
//! The engine itself never touches this file; it is stateless. This module
//! is the explicit owned object that used to be process-wide mutable state
//! in the source (spec §9, "Global mutable known-name map").

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use thiserror::Error;

use crate::target::Target;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed known-names line {line_no}: {line:?}")]
    MalformedLine { line_no: usize, line: String },
    #[error("sha {0} is not 64 hex characters")]
    BadShaHex(String),
}

/// SHA-256 -> recovered name. Keyed by the raw 32 bytes, not the hex text, so
/// lookups from a [`Target`] need no re-encoding.
#[derive(Debug, Clone, Default)]
pub struct KnownNames {
    names: BTreeMap<[u8; 32], String>,
}

impl KnownNames {
    pub fn new() -> Self {
        KnownNames { names: BTreeMap::new() }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CollaboratorError> {
        let path = path.as_ref();
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = BTreeMap::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let (sha_hex, name) = line.split_once(' ').ok_or_else(|| CollaboratorError::MalformedLine {
                line_no,
                line: line.clone(),
            })?;
            let sha = parse_sha_hex(sha_hex)?;
            names.insert(sha, name.to_string());
        }
        Ok(KnownNames { names })
    }

    /// Write the file sorted by name, per the format contract (spec §6).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CollaboratorError> {
        let mut entries: Vec<(&[u8; 32], &String)> = self.names.iter().collect();
        entries.sort_by(|a, b| a.1.cmp(b.1));

        let mut out = std::fs::File::create(path)?;
        for (sha, name) in entries {
            writeln!(out, "{} {}", hex_upper(sha), name)?;
        }
        Ok(())
    }

    pub fn get(&self, sha: &[u8; 32]) -> Option<&str> {
        self.names.get(sha).map(String::as_str)
    }

    /// Iterate over recovered names (not the shas), e.g. for recipes that
    /// scan for a naming pattern like `??_7<Class>@@6B@`.
    pub fn iter_names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    pub fn contains(&self, sha: &[u8; 32]) -> bool {
        self.names.contains_key(sha)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Drop any target whose sha is already known, per spec §4.5: "Before
    /// constructing the target index, callers remove any (adler, sha) whose
    /// sha is already known."
    pub fn filter_unknown(&self, targets: &[Target]) -> Vec<Target> {
        targets.iter().filter(|t| !self.contains(&t.sha)).copied().collect()
    }

    /// Fold a campaign's confirmed strings back in, computing each one's sha
    /// since a confirmed string *is* the recovered name.
    pub fn merge_confirmed(&mut self, confirmed: &[Vec<u8>]) {
        for bytes in confirmed {
            let sha = crate::sha256::sha256(bytes);
            let name = String::from_utf8_lossy(bytes).into_owned();
            self.names.insert(sha, name);
        }
    }
}

fn hex_upper(bytes: &[u8; 32]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn parse_sha_hex(s: &str) -> Result<[u8; 32], CollaboratorError> {
    if s.len() != 64 {
        return Err(CollaboratorError::BadShaHex(s.to_string()));
    }
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
            .map_err(|_| CollaboratorError::BadShaHex(s.to_string()))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.txt");

        let mut known = KnownNames::new();
        known.merge_confirmed(&[b"zebra".to_vec(), b"alpha".to_vec()]);
        known.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("alpha"));
        assert!(lines[1].ends_with("zebra"));

        let reloaded = KnownNames::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(&crate::sha256::sha256(b"alpha")), Some("alpha"));
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let loaded = KnownNames::load("/nonexistent/path/known.txt").unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn filter_unknown_drops_resolved_targets() {
        let mut known = KnownNames::new();
        known.merge_confirmed(&[b"bar".to_vec()]);

        let targets = vec![
            Target::new(crate::adler32::adler32(b"bar"), crate::sha256::sha256(b"bar")),
            Target::new(crate::adler32::adler32(b"baz"), crate::sha256::sha256(b"baz")),
        ];
        let filtered = known.filter_unknown(&targets);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].sha, crate::sha256::sha256(b"baz"));
    }
}
