//! Profile manifest fixtures for tests.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Builder for profile manifest markdown files.
///
/// ```rust,no_run
/// use amplifier_profiles::test_utils::ManifestFixture;
///
/// let content = ManifestFixture::new("dev")
///     .extends("base")
///     .section("tools:\n  - module: tool-bash")
///     .body("You are a developer assistant.")
///     .render();
/// assert!(content.contains("extends: base"));
/// ```
#[derive(Debug, Clone)]
pub struct ManifestFixture {
    name: String,
    schema_version: Option<String>,
    version: String,
    description: String,
    extends: Option<String>,
    sections: Vec<String>,
    body: String,
}

impl ManifestFixture {
    /// A schema version 2 manifest named `name` with no modules.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema_version: Some("2".to_string()),
            version: "1.0.0".to_string(),
            description: format!("{name} profile"),
            extends: None,
            sections: Vec::new(),
            body: String::new(),
        }
    }

    /// Overrides the raw YAML value of `schema-version`; `None` omits the key.
    pub fn schema_version(mut self, raw: Option<&str>) -> Self {
        self.schema_version = raw.map(str::to_string);
        self
    }

    /// Sets the `version` field.
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Sets `profile.extends`.
    pub fn extends(mut self, parent: &str) -> Self {
        self.extends = Some(parent.to_string());
        self
    }

    /// Appends a raw top-level YAML block such as `tools:\n  - module: a`.
    pub fn section(mut self, yaml: &str) -> Self {
        self.sections.push(yaml.trim_end().to_string());
        self
    }

    /// Sets the instruction body after the front-matter.
    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Renders the manifest file content.
    pub fn render(&self) -> String {
        let mut out = String::from("---\nprofile:\n");
        out.push_str(&format!("  name: {}\n", self.name));
        if let Some(ref schema) = self.schema_version {
            out.push_str(&format!("  schema-version: {schema}\n"));
        }
        out.push_str(&format!("  version: {}\n", self.version));
        out.push_str(&format!("  description: {}\n", self.description));
        if let Some(ref parent) = self.extends {
            out.push_str(&format!("  extends: {parent}\n"));
        }
        for section in &self.sections {
            out.push_str(section);
            out.push('\n');
        }
        out.push_str("---\n");
        out.push_str(&self.body);
        out
    }

    /// Writes the manifest to `<root>/profiles/<name>.md` and returns the path.
    pub fn write_to(&self, collection_root: &Path) -> Result<PathBuf> {
        let path = collection_root.join("profiles").join(format!("{}.md", self.name));
        write_file(&path, &self.render())?;
        Ok(path)
    }
}

/// Writes `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
