//! Suggestions for DHIS2 sync-job errors
//!
//! Raw sync errors are matched against a list of error templates; every match
//! produces a human readable suggestion, with the DHIS2 identifiers found in
//! the error resolved to names and links through the Web API.
//!
//! ## Key Components
//!
//! - **Template**: `{name}` placeholder templates, compiled into matchers or interpolated
//! - **Mapping**: the error/suggestion template pairs loaded from a JSON or YAML file
//! - **Metadata**: the [`MetadataLookup`] contract and the responses it returns
//! - **Client**: [`D2Api`], the reqwest implementation of [`MetadataLookup`]
//! - **Engine**: [`SuggestionEngine`], which attaches suggestions to completed jobs
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use d2_sync_suggest::{Auth, D2Api, MappingSet, RunConstants, SuggestionEngine};
//!
//! # async fn run(jobs: Vec<d2_sync_log::CompletedJob>) -> Result<(), Box<dyn std::error::Error>> {
//! let api = D2Api::new("https://dhis2.example.org", Auth::Token("d2pat_...".into()))?;
//! let mappings = MappingSet::from_file(Path::new("suggestions.json"))?;
//! let engine = SuggestionEngine::new(api, mappings, RunConstants::new("https://dhis2.example.org"));
//!
//! for job in engine.attach(jobs).await {
//!     println!("{}: {:?}", job.kind, job.suggestions);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod metadata;
pub mod naming;
pub mod template;

pub use client::{Auth, D2Api};
pub use engine::{RunConstants, SuggestionEngine};
pub use error::{Result, SuggestError, TemplateError};
pub use mapping::{CompiledMapping, ErrorMapping, MappingFile, MappingSet};
pub use metadata::{Entity, Enrollment, EventRef, MetadataLookup, TrackedEntityRef};
pub use template::{Segment, Template};
