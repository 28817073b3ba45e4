//! typed bundle documents
//!
//! A [Bundle] is the decoded, read-only input to the translation pipeline.
//! Services and machines are kept in document order - the emitted record
//! numbering follows it, so reordering the document reorders (and renumbers)
//! the changeset.
//!
//! The decode step doubles as the coarse structural check: a document without
//! a `services` mapping or a service without a `charm` is rejected here, never
//! by the translation core. Unknown document keys (`relations`, `series`, ...)
//! are ignored.
use crate::value::Value;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Bundle {
    pub services: IndexMap<String, Service>,

    /// `None` when the document has no `machines` key at all.
    ///
    /// Presence of the key - even with an empty mapping - is what switches a
    /// document to the v4 placement dialect, so absent and empty must stay
    /// distinguishable.
    pub machines: Option<IndexMap<String, Machine>>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
    pub charm: String,

    #[serde(default)]
    pub num_units: u32,

    #[serde(default)]
    pub options: IndexMap<String, Value>,

    pub to: Option<PlacementDirectives>,
}

impl Service {
    /// The service's placement directives as a list.
    ///
    /// Absent `to` is an empty list, a bare string a singleton.
    pub fn placement_directives(&self) -> Vec<String> {
        match &self.to {
            None => vec![],
            Some(PlacementDirectives::One(directive)) => vec![directive.clone()],
            Some(PlacementDirectives::Many(directives)) => directives.clone(),
        }
    }
}

/// The `to` field accepts a single token or a list of tokens.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PlacementDirectives {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
pub struct Machine {
    #[serde(default)]
    pub series: String,

    #[serde(default)]
    pub constraints: IndexMap<String, Value>,
}

impl Bundle {
    /// Decode a bundle from its YAML source.
    pub fn from_yaml(contents: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load_file(file_path: &Path) -> Result<Self, LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading bundle");

        let file_contents = std::fs::read_to_string(&file_path)?;
        Self::from_yaml(&file_contents)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to decode bundle document")]
    DecodeFailed(#[from] serde_yaml::Error),
}

/// Utility macro to create a [Bundle] from inline YAML
///
/// ```
/// # use bundleplan::bundle;
/// bundle!("services: {}");
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use bundleplan::bundle;
/// bundle!("services: [not, a, mapping]");
/// ```
#[macro_export]
macro_rules! bundle {
    { $expr:expr } => {
        $crate::bundle::Bundle::from_yaml($expr).expect("bundle must decode")
    };
}
