use crate::error::SnapshotError;
use crate::normalize::{IgnoredLines, NormalizationConfig, normalize, remove_ignored_lines};
use crate::report::SnapshotMismatch;
use crate::store::{SnapshotId, SnapshotStore};
use crate::substitution::{SubstitutionTable, SubstitutionValue, Wrappers};

/// Produces the dynamic data of the current test run.
pub trait Fetcher {
    fn fetch_dynamic_data(&mut self) -> anyhow::Result<String>;
}

impl<F> Fetcher for F
where
    F: FnMut() -> anyhow::Result<String>,
{
    fn fetch_dynamic_data(&mut self) -> anyhow::Result<String> {
        self()
    }
}

/// When [`DynamicSnapshot::assert_snapshot`] records instead of verifying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Record when nothing is stored yet, verify otherwise.
    #[default]
    Auto,
    /// Re-record whenever the stored snapshot is missing or out of date.
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The fetched data was recorded as the new snapshot.
    Captured,
    /// The fetched data matched the stored snapshot.
    Matched,
}

/// A snapshot whose content changes between runs.
///
/// Owns the substitution table and normalization settings of one test and
/// drives its store and fetcher through one capture-or-verify cycle.
pub struct DynamicSnapshot<S, F> {
    id: SnapshotId,
    store: S,
    fetcher: F,
    substitutions: SubstitutionTable,
    ignored_lines: IgnoredLines,
    normalization: NormalizationConfig,
    mode: Mode,
    show_diff: bool,
}

impl<S, F> DynamicSnapshot<S, F>
where
    S: SnapshotStore,
    F: Fetcher,
{
    pub fn new(id: SnapshotId, store: S, fetcher: F) -> Self {
        Self {
            id,
            store,
            fetcher,
            substitutions: SubstitutionTable::default(),
            ignored_lines: IgnoredLines::default(),
            normalization: NormalizationConfig::default(),
            mode: Mode::default(),
            show_diff: true,
        }
    }

    pub fn id(&self) -> &SnapshotId {
        &self.id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Set the strings that wrap substitution keys. Default is `[` and `]`.
    pub fn set_wrappers(&mut self, left: &str, right: &str) -> Result<(), SnapshotError> {
        self.substitutions.set_wrappers(Wrappers::new(left, right)?);
        Ok(())
    }

    pub fn wrappers(&self) -> &Wrappers {
        self.substitutions.wrappers()
    }

    /// Register substitutions, e.g. `[("user_id", "99"), ("path", "/foo/123/")]`.
    pub fn set_substitutions<I, K, V>(&mut self, substitutions: I) -> Result<(), SnapshotError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SubstitutionValue>,
    {
        Ok(self.substitutions.set_substitutions(substitutions)?)
    }

    /// Register substitutions that only match on word boundaries.
    pub fn set_strict_substitutions<I, K, V>(&mut self, substitutions: I) -> Result<(), SnapshotError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SubstitutionValue>,
    {
        Ok(self.substitutions.set_strict_substitutions(substitutions)?)
    }

    pub fn substitutions(&self) -> &SubstitutionTable {
        &self.substitutions
    }

    /// Patterns removed from both the stored snapshot and the fetched data.
    pub fn set_ignored_lines_patterns<I, P>(&mut self, patterns: I) -> Result<(), SnapshotError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        self.ignored_lines = IgnoredLines::new(patterns)?;
        Ok(())
    }

    pub fn ignored_lines(&self) -> &IgnoredLines {
        &self.ignored_lines
    }

    pub fn should_allow_trailing_spaces(&mut self, allow: bool) {
        self.normalization.allow_trailing_spaces = allow;
    }

    pub fn should_allow_space_sequences(&mut self, allow: bool) {
        self.normalization.allow_space_sequences = allow;
    }

    pub fn normalization(&self) -> NormalizationConfig {
        self.normalization
    }

    pub fn should_refresh_snapshot(&mut self, refresh: bool) {
        self.mode = if refresh { Mode::Refresh } else { Mode::Auto };
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Include a diff and the substitution tables in mismatch reports.
    pub fn should_show_diff(&mut self, show: bool) {
        self.show_diff = show;
    }

    pub fn shows_diff(&self) -> bool {
        self.show_diff
    }

    /// Normalize `raw`, swap dynamic values for placeholders and store it.
    ///
    /// Returns the stored text.
    pub fn capture(&mut self, raw: &str) -> Result<String, SnapshotError> {
        log::debug!("Capturing snapshot {}", self.id);
        let data = normalize(raw, &self.ignored_lines, self.normalization);
        let data = self.substitutions.values_to_placeholders(&data)?;
        self.store.save(&self.id, &data)?;
        log::info!("Snapshot {} recorded", self.id);
        Ok(data)
    }

    /// Load the stored snapshot with placeholders replaced by current values.
    ///
    /// `None` when nothing has been recorded yet.
    pub fn load(&self) -> Result<Option<String>, SnapshotError> {
        if !self.store.exists(&self.id)? {
            log::debug!("No stored snapshot for {}", self.id);
            return Ok(None);
        }
        let stored = self.store.load(&self.id)?;
        let stored = remove_ignored_lines(&stored, &self.ignored_lines);
        Ok(Some(self.substitutions.placeholders_to_values(&stored)?))
    }

    fn fetch_raw(&mut self) -> Result<String, SnapshotError> {
        let data = self
            .fetcher
            .fetch_dynamic_data()
            .map_err(|source| SnapshotError::Fetch {
                id: self.id.clone(),
                source,
            })?;
        if data.is_empty() {
            return Err(SnapshotError::ContentNotFound {
                id: self.id.clone(),
            });
        }
        Ok(data)
    }

    /// Fetch the dynamic data of this run, normalized for comparison.
    pub fn fetch_data(&mut self) -> Result<String, SnapshotError> {
        let raw = self.fetch_raw()?;
        Ok(normalize(&raw, &self.ignored_lines, self.normalization))
    }

    /// Compare freshly fetched data against `expected`.
    pub fn verify(&mut self, expected: &str) -> Result<(), SnapshotError> {
        let actual = self.fetch_data()?;
        self.compare(expected, actual)
    }

    fn compare(&self, expected: &str, actual: String) -> Result<(), SnapshotError> {
        if expected == actual {
            log::debug!("Snapshot {} matches", self.id);
            return Ok(());
        }
        Err(SnapshotError::Mismatch(Box::new(SnapshotMismatch::new(
            self.id.clone(),
            expected.to_string(),
            actual,
            &self.substitutions,
            self.show_diff,
        ))))
    }

    /// Run one cycle: record if needed, verify otherwise.
    pub fn assert_snapshot(&mut self) -> Result<Outcome, SnapshotError> {
        let expected = self.load()?;
        match (expected, self.mode) {
            (None, _) => {
                let raw = self.fetch_raw()?;
                self.capture(&raw)?;
                Ok(Outcome::Captured)
            }
            (Some(expected), Mode::Auto) => {
                self.verify(&expected)?;
                Ok(Outcome::Matched)
            }
            (Some(expected), Mode::Refresh) => {
                let raw = self.fetch_raw()?;
                let actual = normalize(&raw, &self.ignored_lines, self.normalization);
                if expected == actual {
                    return Ok(Outcome::Matched);
                }
                log::info!("Snapshot {} changed, refreshing", self.id);
                self.capture(&raw)?;
                Ok(Outcome::Captured)
            }
        }
    }
}

impl<S, F> std::fmt::Debug for DynamicSnapshot<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicSnapshot")
            .field("id", &self.id)
            .field("substitutions", &self.substitutions)
            .field("ignored_lines", &self.ignored_lines)
            .field("normalization", &self.normalization)
            .field("mode", &self.mode)
            .field("show_diff", &self.show_diff)
            .finish_non_exhaustive()
    }
}
