//! # dynamic-snapshot-engine
//!
//! Snapshot testing for output that contains values which change from run to
//! run: timestamps, generated ids, whitespace that depends on layout.
//!
//! ## Lifecycle
//!
//! ```text
//! capture:  fetched data → normalize → values → [placeholders] → store
//! verify:   store → [placeholders] → values = expected
//!           fetched data → normalize              = actual
//!           expected == actual, byte for byte
//! ```
//!
//! - [`normalize`]: removes ignored lines and canonicalizes whitespace
//! - [`substitution`]: plain and strict (word boundary) substitutions between
//!   literal values and wrapped placeholder tokens
//! - [`engine`]: [`DynamicSnapshot`], which runs one capture-or-verify cycle
//!   over a [`SnapshotStore`] and a [`Fetcher`]
//! - [`report`]: mismatch report with a line diff and the active substitutions
//! - [`store`]: the store trait plus in-memory and file-backed stores
//!
//! ## Example
//!
//! ```rust
//! use dynamic_snapshot_engine::{DynamicSnapshot, MemoryStore, Outcome, SnapshotId};
//!
//! let id = SnapshotId::new("UserSession").unwrap();
//! let mut store = MemoryStore::new();
//!
//! let mut snapshot = DynamicSnapshot::new(id.clone(), &mut store, || {
//!     Ok::<_, anyhow::Error>("user=42 session active".to_string())
//! });
//! snapshot.set_substitutions([("user", 42)]).unwrap();
//! assert_eq!(snapshot.assert_snapshot().unwrap(), Outcome::Captured);
//!
//! assert_eq!(store.get(&id), Some("user=[user] session active"));
//! ```

pub mod engine;
pub mod error;
pub mod normalize;
pub mod report;
pub mod store;
pub mod substitution;

pub use engine::{DynamicSnapshot, Fetcher, Mode, Outcome};
pub use error::{ConfigurationError, SnapshotError};
pub use normalize::{
    IgnoredLines, NormalizationConfig, clean_content, normalize, remove_ignored_lines,
};
pub use report::SnapshotMismatch;
pub use store::{FileStore, MemoryStore, SnapshotId, SnapshotStore, StoreError};
pub use substitution::{
    SubstitutionEntry, SubstitutionKind, SubstitutionTable, SubstitutionValue, Wrappers,
};
