//! Bidirectional mapping between dynamic literal values and placeholder
//! tokens.
//!
//! A placeholder is the substitution key wrapped in the configured
//! [`Wrappers`], `[user]` by default. Plain substitutions replace every
//! occurrence of their value, including occurrences inside longer words.
//! Strict substitutions only replace occurrences on word boundaries, so a
//! strict value `2` leaves `12` alone.

use regex::{NoExpand, Regex};
use std::fmt;

use crate::error::ConfigurationError;

/// Internal namespace of plain substitution keys.
pub const SUBSTITUTION_PREFIX: &str = "snapshot_";
/// Internal namespace of strict substitution keys.
pub const STRICT_SUBSTITUTION_PREFIX: &str = "snapshot_strict_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstitutionKind {
    Plain,
    Strict,
}

impl SubstitutionKind {
    pub fn prefix(self) -> &'static str {
        match self {
            SubstitutionKind::Plain => SUBSTITUTION_PREFIX,
            SubstitutionKind::Strict => STRICT_SUBSTITUTION_PREFIX,
        }
    }

    pub fn is_strict(self) -> bool {
        matches!(self, SubstitutionKind::Strict)
    }
}

impl fmt::Display for SubstitutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstitutionKind::Plain => f.write_str("Plain"),
            SubstitutionKind::Strict => f.write_str("Strict"),
        }
    }
}

/// Left and right delimiters of placeholder tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrappers {
    left: String,
    right: String,
}

impl Wrappers {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Result<Self, ConfigurationError> {
        let (left, right) = (left.into(), right.into());
        if left.is_empty() || right.is_empty() {
            return Err(ConfigurationError::EmptyWrapper);
        }
        Ok(Self { left, right })
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &str {
        &self.right
    }

    pub fn wrap(&self, key: &str) -> String {
        format!("{}{key}{}", self.left, self.right)
    }
}

impl Default for Wrappers {
    fn default() -> Self {
        Self {
            left: "[".to_string(),
            right: "]".to_string(),
        }
    }
}

/// A value offered for substitution.
///
/// Scalars convert to their string form. Structured values (lists, maps)
/// have none and are rejected when registered.
#[derive(Debug, Clone, PartialEq)]
pub enum SubstitutionValue {
    Text(String),
    Structured { kind: &'static str },
}

impl SubstitutionValue {
    pub fn structured(kind: &'static str) -> Self {
        SubstitutionValue::Structured { kind }
    }
}

impl From<String> for SubstitutionValue {
    fn from(value: String) -> Self {
        SubstitutionValue::Text(value)
    }
}

impl From<&str> for SubstitutionValue {
    fn from(value: &str) -> Self {
        SubstitutionValue::Text(value.to_string())
    }
}

impl From<&String> for SubstitutionValue {
    fn from(value: &String) -> Self {
        SubstitutionValue::Text(value.clone())
    }
}

macro_rules! scalar_substitution_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for SubstitutionValue {
                fn from(value: $ty) -> Self {
                    SubstitutionValue::Text(value.to_string())
                }
            }
        )*
    };
}

scalar_substitution_values!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionEntry {
    pub key: String,
    pub value: String,
    pub strict: bool,
}

impl SubstitutionEntry {
    pub fn kind(&self) -> SubstitutionKind {
        if self.strict {
            SubstitutionKind::Strict
        } else {
            SubstitutionKind::Plain
        }
    }

    /// Key including the internal namespace, e.g. `snapshot_strict_day`.
    pub fn qualified_key(&self) -> String {
        format!("{}{}", self.kind().prefix(), self.key)
    }

    pub fn placeholder(&self, wrappers: &Wrappers) -> String {
        wrappers.wrap(&self.key)
    }
}

/// Substitutions of one snapshot test, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionTable {
    wrappers: Wrappers,
    entries: Vec<SubstitutionEntry>,
}

impl SubstitutionTable {
    pub fn new(wrappers: Wrappers) -> Self {
        Self {
            wrappers,
            entries: Vec::new(),
        }
    }

    pub fn wrappers(&self) -> &Wrappers {
        &self.wrappers
    }

    pub fn set_wrappers(&mut self, wrappers: Wrappers) {
        self.wrappers = wrappers;
    }

    pub fn register(
        &mut self,
        key: impl Into<String>,
        value: impl Into<SubstitutionValue>,
    ) -> Result<(), ConfigurationError> {
        self.insert(SubstitutionKind::Plain, key.into(), value.into())
    }

    pub fn register_strict(
        &mut self,
        key: impl Into<String>,
        value: impl Into<SubstitutionValue>,
    ) -> Result<(), ConfigurationError> {
        self.insert(SubstitutionKind::Strict, key.into(), value.into())
    }

    pub fn set_substitutions<I, K, V>(&mut self, substitutions: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SubstitutionValue>,
    {
        for (key, value) in substitutions {
            self.register(key, value)?;
        }
        Ok(())
    }

    pub fn set_strict_substitutions<I, K, V>(
        &mut self,
        substitutions: I,
    ) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SubstitutionValue>,
    {
        for (key, value) in substitutions {
            self.register_strict(key, value)?;
        }
        Ok(())
    }

    fn insert(
        &mut self,
        kind: SubstitutionKind,
        key: String,
        value: SubstitutionValue,
    ) -> Result<(), ConfigurationError> {
        if key.is_empty() {
            return Err(ConfigurationError::EmptyKey { kind });
        }
        let value = match value {
            SubstitutionValue::Text(value) => value,
            SubstitutionValue::Structured { kind: value_kind } => {
                return Err(ConfigurationError::InvalidValue {
                    kind,
                    key,
                    value_kind,
                });
            }
        };

        let strict = kind.is_strict();
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.strict == strict && entry.key == key)
        {
            Some(entry) => entry.value = value,
            None => self.entries.push(SubstitutionEntry { key, value, strict }),
        }
        Ok(())
    }

    pub fn get(&self, kind: SubstitutionKind, key: &str) -> Option<&str> {
        self.of_kind(kind)
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    pub fn entries(&self) -> &[SubstitutionEntry] {
        &self.entries
    }

    pub fn of_kind(&self, kind: SubstitutionKind) -> impl Iterator<Item = &SubstitutionEntry> {
        self.entries.iter().filter(move |entry| entry.kind() == kind)
    }

    pub fn plain(&self) -> impl Iterator<Item = &SubstitutionEntry> {
        self.of_kind(SubstitutionKind::Plain)
    }

    pub fn strict(&self) -> impl Iterator<Item = &SubstitutionEntry> {
        self.of_kind(SubstitutionKind::Strict)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Strict entries first, then plain, each in registration order.
    fn in_application_order(&self) -> impl Iterator<Item = &SubstitutionEntry> {
        self.strict().chain(self.plain())
    }

    /// Fail on the first entry without a value, strict entries first.
    pub fn ensure_values_present(&self) -> Result<(), ConfigurationError> {
        match self.in_application_order().find(|entry| entry.value.is_empty()) {
            Some(entry) => Err(ConfigurationError::EmptySubstitution {
                kind: entry.kind(),
                key: entry.key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Fail when a key registered in both kinds holds two different values.
    ///
    /// Both entries share one placeholder token, which could only be restored
    /// to one of the values.
    pub fn ensure_placeholders_unambiguous(&self) -> Result<(), ConfigurationError> {
        for strict in self.strict() {
            let conflicting = self
                .plain()
                .any(|plain| plain.key == strict.key && plain.value != strict.value);
            if conflicting {
                return Err(ConfigurationError::AmbiguousPlaceholder {
                    key: strict.key.clone(),
                    placeholder: strict.placeholder(&self.wrappers),
                });
            }
        }
        Ok(())
    }

    /// Replace literal values with their placeholders.
    ///
    /// Strict entries match on word boundaries only; plain entries match
    /// anywhere, including inside longer words.
    pub fn values_to_placeholders(&self, data: &str) -> Result<String, ConfigurationError> {
        self.ensure_values_present()?;
        self.ensure_placeholders_unambiguous()?;

        let mut data = data.to_string();
        for entry in self.in_application_order() {
            let value = regex::escape(&entry.value);
            let pattern = if entry.strict {
                format!(r"\b{value}\b")
            } else {
                value
            };
            let placeholder = entry.placeholder(&self.wrappers);
            data = compile(&pattern)?
                .replace_all(&data, NoExpand(&placeholder))
                .into_owned();
        }
        Ok(data)
    }

    /// Replace placeholders with the current literal values.
    pub fn placeholders_to_values(&self, data: &str) -> Result<String, ConfigurationError> {
        self.ensure_placeholders_unambiguous()?;

        let mut data = data.to_string();
        for entry in self.in_application_order() {
            let pattern = regex::escape(&entry.placeholder(&self.wrappers));
            data = compile(&pattern)?
                .replace_all(&data, NoExpand(&entry.value))
                .into_owned();
        }
        Ok(data)
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigurationError> {
    Regex::new(pattern).map_err(|source| ConfigurationError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}
