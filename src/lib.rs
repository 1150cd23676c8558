//! Brute-force hash-collision recovery for stripped binary symbol names.
//!
//! Given a set of observed (Adler-32, SHA-256) hash pairs and an ordered
//! list of "part" alphabets, [`engine::run`] enumerates the Cartesian
//! product of the alphabets and reports every concatenation whose Adler-32
//! is in the target set *and* whose SHA-256 also matches. See `SPEC_FULL.md`
//! for the full design.
//!
//! The core (this module tree minus [`known_names`], [`address_dump`],
//! [`recipe`], [`config`]) is stateless and has no I/O: it is given targets
//! and parts in memory and returns confirmed strings in memory. The
//! collaborator modules fold in the surrounding orchestration — reading the
//! address dump, persisting known names across campaigns, and chaining
//! campaigns into recipes — that the original system left as external
//! scripts.

pub mod adler32;
pub mod campaign;
pub mod cancel;
pub mod enumerator;
pub mod error;
pub mod parts;
pub mod sha256;
pub mod target;

mod engine;

pub mod address_dump;
pub mod known_names;
pub mod recipe;

#[cfg(feature = "cli")]
pub mod config;

pub use campaign::{Campaign, CampaignBuilder};
pub use cancel::CancellationToken;
pub use engine::{run, RunOutcome};
pub use error::EngineError;
pub use target::Target;
