//! Error to suggestion mappings
//!
//! Mappings are read once from a file shaped like
//!
//! ```json
//! {
//!   "mappings": [
//!     {
//!       "error": "Program is not assigned to this Organisation Unit: {organisation_unit_id}",
//!       "suggestion": "Assign {organisation_unit_name} in the Maintenance App"
//!     }
//!   ]
//! }
//! ```
//!
//! and compiled into matchers. Order matters: every matching mapping yields a
//! suggestion, in file order.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SuggestError};
use crate::template::Template;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMapping {
    pub error: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default)]
    pub mappings: Vec<ErrorMapping>,
}

impl MappingFile {
    /// Reads a JSON mappings file, or YAML for `.yml`/`.yaml` files.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| SuggestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));

        if is_yaml {
            serde_yaml::from_str(&contents).map_err(|source| SuggestError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_json::from_str(&contents).map_err(|source| SuggestError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// A mapping with both templates parsed and the error matcher built.
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    pub error: Template,
    pub suggestion: Template,
    matcher: Regex,
}

impl CompiledMapping {
    pub fn new(mapping: &ErrorMapping) -> Result<Self> {
        let error = Template::parse(&mapping.error)?;
        let suggestion = Template::parse(&mapping.suggestion)?;
        let matcher = error.matcher()?;

        Ok(Self {
            error,
            suggestion,
            matcher,
        })
    }

    /// Variables captured from `error`, or `None` if the mapping does not apply.
    pub fn captures(&self, error: &str) -> Option<BTreeMap<String, String>> {
        let captures = self.matcher.captures(error)?;

        let variables = self
            .matcher
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();

        Some(variables)
    }
}

/// Ordered set of compiled mappings.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    mappings: Vec<CompiledMapping>,
}

impl MappingSet {
    pub fn new(mappings: &[ErrorMapping]) -> Result<Self> {
        let mappings = mappings
            .iter()
            .enumerate()
            .map(|(index, mapping)| {
                CompiledMapping::new(mapping).map_err(|e| match e {
                    SuggestError::Template(source) => SuggestError::Mapping { index, source },
                    e => e,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { mappings })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = MappingFile::from_file(path)?;
        let set = Self::new(&file.mappings)?;
        info!(path = %path.display(), mappings = set.len(), "Loaded error mappings");
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledMapping> {
        self.mappings.iter()
    }

    /// Mappings that apply to `error`, in order, with their captures.
    pub fn matching<'a>(
        &'a self,
        error: &'a str,
    ) -> impl Iterator<Item = (&'a CompiledMapping, BTreeMap<String, String>)> + 'a {
        self.mappings
            .iter()
            .filter_map(move |mapping| mapping.captures(error).map(|vars| (mapping, vars)))
    }
}
