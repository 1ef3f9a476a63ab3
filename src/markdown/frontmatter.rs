//! Front-matter extraction on top of `gray_matter`.
//!
//! The front-matter block is extracted as raw text and handed to `serde_yaml`
//! directly, so integer/string distinctions in the YAML survive exactly as
//! written (the schema gate depends on `2` and `"2"` being different values).

use anyhow::{Context, Result};
use gray_matter::{
    Matter, Pod,
    engine::Engine,
};
use std::fmt::Debug;

/// `gray_matter` engine that returns the front-matter text without parsing it.
struct RawFrontmatter;

impl Engine for RawFrontmatter {
    fn parse(content: &str) -> Result<Pod, gray_matter::Error> {
        Ok(Pod::String(content.to_string()))
    }
}

/// A document split into front-matter text and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDocument {
    /// The YAML between the `---` delimiters, if present
    pub frontmatter: Option<String>,
    /// Everything after the closing delimiter
    pub body: String,
}

/// Splits `---` delimited front-matter from markdown content.
pub struct FrontmatterParser {
    raw_matter: Matter<RawFrontmatter>,
}

impl Debug for FrontmatterParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontmatterParser").finish()
    }
}

impl Default for FrontmatterParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontmatterParser {
    /// Create a new front-matter parser.
    pub fn new() -> Self {
        Self {
            raw_matter: Matter::new(),
        }
    }

    /// Splits `content` into front-matter text and body.
    pub fn split(&self, content: &str) -> Result<SplitDocument> {
        let result = self.raw_matter.parse::<String>(content).context("Failed to extract front-matter")?;
        Ok(SplitDocument {
            frontmatter: result.data.filter(|raw| !raw.trim().is_empty()),
            body: result.content,
        })
    }

    /// Parses the front-matter of `content` as a YAML value.
    ///
    /// Returns `Ok(None)` when the document has no front-matter block.
    pub fn parse_yaml(&self, content: &str) -> Result<(Option<serde_yaml::Value>, String)> {
        let split = self.split(content)?;
        let value = match split.frontmatter {
            Some(ref raw) => Some(serde_yaml::from_str(raw).context("Invalid YAML front-matter")?),
            None => None,
        };
        Ok((value, split.body))
    }
}
