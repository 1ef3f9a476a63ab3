//! Markdown documents with YAML front-matter.
//!
//! Profile manifests are markdown files: a `---` delimited YAML block followed by
//! the free-text instruction body.
//!
//! ```text
//! ---
//! profile:
//!   name: dev
//!   schema-version: 2
//! ---
//! You are a careful engineering assistant.
//! ```

pub mod frontmatter;

pub use frontmatter::{FrontmatterParser, SplitDocument};
