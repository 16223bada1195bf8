//! Scaffolding for new dynamic snapshot tests.
//!
//! `generate UserEmails` writes `<support>/Snapshot/user_emails.rs`;
//! `generate acceptance UserEmails` nests it as
//! `<support>/Snapshot/Acceptance/user_emails.rs` with the snapshot id
//! `Acceptance/UserEmails`. Suite scaffolds also wire the suite's tester
//! fixture (`AcceptanceTester`) into the fetcher.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

pub const SNAPSHOT_DIR: &str = "Snapshot";

const TEMPLATE: &str = r#"use dynamic_snapshot_config::SnapshotConfig;
use dynamic_snapshot_engine::{DynamicSnapshot, Fetcher, SnapshotId};

pub struct {{name}};

impl Fetcher for {{name}} {
    fn fetch_dynamic_data(&mut self) -> anyhow::Result<String> {
        // Return the data this snapshot should match.
        todo!()
    }
}

#[test]
fn {{test_name}}() -> anyhow::Result<()> {
    let config = SnapshotConfig::load()?;
    let id = SnapshotId::new("{{id}}")?;
    let mut snapshot = DynamicSnapshot::new(id, config.open_store()?, {{name}});
    config.apply(&mut snapshot)?;

    // Optionally replace values that change between runs.
    snapshot.set_substitutions([("key", "value")])?;

    snapshot.assert_snapshot()?;
    Ok(())
}
"#;

const SUITE_TEMPLATE: &str = r#"use dynamic_snapshot_config::SnapshotConfig;
use dynamic_snapshot_engine::{DynamicSnapshot, Fetcher, SnapshotId};

use super::{{actor}};

pub struct {{name}}<'a> {
    tester: &'a mut {{actor}},
}

impl<'a> {{name}}<'a> {
    pub fn new(tester: &'a mut {{actor}}) -> Self {
        Self { tester }
    }
}

impl Fetcher for {{name}}<'_> {
    fn fetch_dynamic_data(&mut self) -> anyhow::Result<String> {
        // Return the data this snapshot should match, fetched through `self.tester`.
        todo!()
    }
}

#[test]
fn {{test_name}}() -> anyhow::Result<()> {
    let config = SnapshotConfig::load()?;
    let id = SnapshotId::new("{{id}}")?;
    let mut tester = {{actor}}::default();
    let mut snapshot = DynamicSnapshot::new(id, config.open_store()?, {{name}}::new(&mut tester));
    config.apply(&mut snapshot)?;

    // Optionally replace values that change between runs.
    snapshot.set_substitutions([("key", "value")])?;

    snapshot.assert_snapshot()?;
    Ok(())
}
"#;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("`{0}` is not a valid snapshot or suite name")]
    InvalidName(String),

    #[error("DynamicSnapshot {} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSnapshot {
    pub path: PathBuf,
    pub id: String,
    pub body: String,
}

impl GeneratedSnapshot {
    /// Write the scaffold, never replacing an existing file.
    pub fn create_file(&self) -> Result<(), GenerateError> {
        let write_error = |source| GenerateError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(GenerateError::AlreadyExists(self.path.clone()));
            }
            Err(e) => return Err(write_error(e)),
        };
        file.write_all(self.body.as_bytes()).map_err(write_error)?;
        log::debug!("Generated snapshot scaffold {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Generator {
    support_dir: PathBuf,
}

impl Generator {
    pub fn new(support_dir: impl Into<PathBuf>) -> Self {
        Self {
            support_dir: support_dir.into(),
        }
    }

    pub fn produce(
        &self,
        suite: Option<&str>,
        name: &str,
    ) -> Result<GeneratedSnapshot, GenerateError> {
        validate_name(name)?;
        let type_name = pascal_case(name);
        let file_stem = snake_case(name);

        let mut dir = self.support_dir.join(SNAPSHOT_DIR);
        let (id, template, actor) = match suite {
            Some(suite) => {
                validate_name(suite)?;
                let actor = format!("{}Tester", pascal_case(suite));
                let suite = capitalize(suite);
                dir.push(&suite);
                (format!("{suite}/{type_name}"), SUITE_TEMPLATE, actor)
            }
            None => (type_name.clone(), TEMPLATE, String::new()),
        };

        let body = template
            .replace("{{actor}}", &actor)
            .replace("{{name}}", &type_name)
            .replace("{{test_name}}", &format!("{file_stem}_matches_snapshot"))
            .replace("{{id}}", &id);

        Ok(GeneratedSnapshot {
            path: dir.join(format!("{file_stem}.rs")),
            id,
            body,
        })
    }
}

fn validate_name(name: &str) -> Result<(), GenerateError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && name.chars().any(char::is_alphanumeric);
    if valid {
        Ok(())
    } else {
        Err(GenerateError::InvalidName(name.to_string()))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_').map(capitalize).collect()
}

fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_uppercase() {
            out.push(c);
            continue;
        }
        let boundary = match i.checked_sub(1).map(|p| chars[p]) {
            Some(prev) if prev.is_lowercase() || prev.is_numeric() => true,
            // last capital of an acronym, as in HTTPResponse
            Some(prev) if prev.is_uppercase() => {
                chars.get(i + 1).is_some_and(|next| next.is_lowercase())
            }
            _ => false,
        };
        if boundary && !out.ends_with('_') {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("UserEmails"), "user_emails");
        assert_eq!(snake_case("Products"), "products");
        assert_eq!(snake_case("HTTPResponse"), "http_response");
        assert_eq!(snake_case("Report2Day"), "report2_day");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("UserEmails"), "UserEmails");
        assert_eq!(pascal_case("user_emails"), "UserEmails");
        assert_eq!(pascal_case("products"), "Products");
    }

    #[test]
    fn test_produce_without_suite() {
        let generator = Generator::new("tests/support");
        let generated = generator.produce(None, "UserEmails").unwrap();

        assert_eq!(
            generated.path,
            PathBuf::from("tests/support/Snapshot/user_emails.rs")
        );
        assert_eq!(generated.id, "UserEmails");
    }

    #[test]
    fn test_produce_with_suite_capitalizes_directory() {
        let generator = Generator::new("tests/support");
        let generated = generator.produce(Some("acceptance"), "UserEmails").unwrap();

        assert_eq!(
            generated.path,
            PathBuf::from("tests/support/Snapshot/Acceptance/user_emails.rs")
        );
        assert_eq!(generated.id, "Acceptance/UserEmails");
        assert!(generated.body.contains("tester: &'a mut AcceptanceTester,"));
    }

    #[test]
    fn test_suite_template_wires_tester() {
        let generated = Generator::new("support")
            .produce(Some("api"), "Products")
            .unwrap();

        insta::assert_snapshot!(generated.body.trim(), @r#"
        use dynamic_snapshot_config::SnapshotConfig;
        use dynamic_snapshot_engine::{DynamicSnapshot, Fetcher, SnapshotId};

        use super::ApiTester;

        pub struct Products<'a> {
            tester: &'a mut ApiTester,
        }

        impl<'a> Products<'a> {
            pub fn new(tester: &'a mut ApiTester) -> Self {
                Self { tester }
            }
        }

        impl Fetcher for Products<'_> {
            fn fetch_dynamic_data(&mut self) -> anyhow::Result<String> {
                // Return the data this snapshot should match, fetched through `self.tester`.
                todo!()
            }
        }

        #[test]
        fn products_matches_snapshot() -> anyhow::Result<()> {
            let config = SnapshotConfig::load()?;
            let id = SnapshotId::new("Api/Products")?;
            let mut tester = ApiTester::default();
            let mut snapshot = DynamicSnapshot::new(id, config.open_store()?, Products::new(&mut tester));
            config.apply(&mut snapshot)?;

            // Optionally replace values that change between runs.
            snapshot.set_substitutions([("key", "value")])?;

            snapshot.assert_snapshot()?;
            Ok(())
        }
        "#);
    }

    #[test]
    fn test_template_body_without_suite() {
        let generated = Generator::new("support").produce(None, "Products").unwrap();

        assert!(!generated.body.contains("Tester"));
        insta::assert_snapshot!(generated.body.trim(), @r#"
        use dynamic_snapshot_config::SnapshotConfig;
        use dynamic_snapshot_engine::{DynamicSnapshot, Fetcher, SnapshotId};

        pub struct Products;

        impl Fetcher for Products {
            fn fetch_dynamic_data(&mut self) -> anyhow::Result<String> {
                // Return the data this snapshot should match.
                todo!()
            }
        }

        #[test]
        fn products_matches_snapshot() -> anyhow::Result<()> {
            let config = SnapshotConfig::load()?;
            let id = SnapshotId::new("Products")?;
            let mut snapshot = DynamicSnapshot::new(id, config.open_store()?, Products);
            config.apply(&mut snapshot)?;

            // Optionally replace values that change between runs.
            snapshot.set_substitutions([("key", "value")])?;

            snapshot.assert_snapshot()?;
            Ok(())
        }
        "#);
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let generator = Generator::new("support");

        for name in ["", "../Escape", "2Fast", "with space", "_"] {
            assert!(
                matches!(
                    generator.produce(None, name),
                    Err(GenerateError::InvalidName(_))
                ),
                "expected {name:?} to be rejected"
            );
        }
        assert!(matches!(
            generator.produce(Some("bad/suite"), "Products"),
            Err(GenerateError::InvalidName(_))
        ));
    }

    #[test]
    fn test_create_file_writes_body() {
        let temp_dir = TempDir::new().unwrap();
        let generated = Generator::new(temp_dir.path())
            .produce(Some("acceptance"), "UserEmails")
            .unwrap();

        generated.create_file().unwrap();

        let written = std::fs::read_to_string(&generated.path).unwrap();
        assert_eq!(written, generated.body);
        assert!(
            temp_dir
                .path()
                .join("Snapshot/Acceptance/user_emails.rs")
                .is_file()
        );
    }

    #[test]
    fn test_create_file_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let generated = Generator::new(temp_dir.path())
            .produce(None, "UserEmails")
            .unwrap();
        std::fs::create_dir_all(generated.path.parent().unwrap()).unwrap();
        std::fs::write(&generated.path, "hand written").unwrap();

        let error = generated.create_file().unwrap_err();

        assert!(matches!(error, GenerateError::AlreadyExists(_)));
        assert!(error.to_string().ends_with("already exists"));
        assert_eq!(
            std::fs::read_to_string(&generated.path).unwrap(),
            "hand written"
        );
    }
}
