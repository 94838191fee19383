//! Suggestion engine
//!
//! For every error of a job, each mapping whose error template matches
//! contributes one suggestion. Captured `<base>_id` variables are resolved
//! against the DHIS2 API before the suggestion template is filled in:
//!
//! - `event_id` expands into `event_enrollment`, `event_orgUnit`,
//!   `event_program` and `event_trackedEntity`
//! - `tracked_entity_id` expands into `tracked_entity_orgUnit`,
//!   `tracked_entity_enrollment`, `tracked_entity_program` and
//!   `tracked_entity_type`
//! - any other `<base>_id` gets a `<base>_name` from the matching metadata
//!   collection, falling back to the id itself

use std::collections::BTreeMap;

use d2_sync_log::CompletedJob;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::mapping::MappingSet;
use crate::metadata::MetadataLookup;
use crate::naming::{collection_name, id_base, name_variable};

const EVENT: &str = "event";
const TRACKED_ENTITY: &str = "tracked_entity";

/// Values available to every suggestion template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConstants {
    pub base_url: String,
    pub docker_container: Option<String>,
    pub resources_folder: Option<String>,
}

impl RunConstants {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    fn variables(&self) -> BTreeMap<String, String> {
        let mut variables = BTreeMap::new();
        variables.insert(
            String::from("base_url"),
            self.base_url.trim_end_matches('/').to_string(),
        );
        if let Some(container) = &self.docker_container {
            variables.insert(String::from("docker_container"), container.clone());
        }
        if let Some(folder) = &self.resources_folder {
            variables.insert(String::from("resources_folder"), folder.clone());
        }
        variables
    }
}

pub struct SuggestionEngine<L> {
    lookup: L,
    mappings: MappingSet,
    constants: BTreeMap<String, String>,
}

impl<L: MetadataLookup> SuggestionEngine<L> {
    pub fn new(lookup: L, mappings: MappingSet, constants: RunConstants) -> Self {
        Self {
            lookup,
            mappings,
            constants: constants.variables(),
        }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Suggestions for one error string, in mapping order.
    pub async fn suggestions_for_error(&self, error: &str) -> Vec<String> {
        let mut suggestions = Vec::new();

        for (mapping, captured) in self.mappings.matching(error) {
            let mut variables = self.resolve(captured).await;
            variables.extend(self.constants.clone());

            match mapping.suggestion.interpolate(&variables) {
                Ok(suggestion) => suggestions.push(suggestion),
                Err(e) => {
                    warn!(
                        mapping = %mapping.error,
                        error = %e,
                        "Cannot build suggestion, skipping mapping"
                    );
                }
            }
        }

        suggestions
    }

    /// Suggestions for every error of a job; errors are processed
    /// concurrently and the result keeps error order.
    pub async fn suggestions_for_job(&self, job: &CompletedJob) -> Vec<String> {
        let per_error = join_all(job.errors.iter().map(|error| self.suggestions_for_error(error))).await;
        per_error.into_iter().flatten().collect()
    }

    /// Returns the jobs with their suggestions attached.
    pub async fn attach(&self, jobs: Vec<CompletedJob>) -> Vec<CompletedJob> {
        let mut enriched = Vec::with_capacity(jobs.len());

        for job in jobs {
            let suggestions = self.suggestions_for_job(&job).await;
            if !suggestions.is_empty() {
                info!(kind = %job.kind, suggestions = suggestions.len(), "Suggestions found");
            }
            enriched.push(job.with_suggestions(suggestions));
        }

        enriched
    }

    /// Adds the variables derived from every captured identifier.
    async fn resolve(&self, captured: BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut variables = captured.clone();

        for (variable, id) in &captured {
            let Some(base) = id_base(variable) else {
                continue;
            };

            let name_key = name_variable(base);
            if variables.contains_key(&name_key) {
                continue;
            }

            match base {
                EVENT => match self.lookup.event(id).await {
                    Ok(event) => merge_missing(&mut variables, event.variables()),
                    Err(e) => warn!(event = %id, error = %e, "Failed to fetch event"),
                },
                TRACKED_ENTITY => match self.lookup.tracked_entity(id).await {
                    Ok(tracked_entity) => merge_missing(&mut variables, tracked_entity.variables()),
                    Err(e) => warn!(tracked_entity = %id, error = %e, "Failed to fetch tracked entity"),
                },
                _ => {
                    let name = self.entity_name(base, id).await;
                    variables.insert(name_key, name);
                }
            }
        }

        variables
    }

    /// Display name of `id` in the collection of `base`, or the id itself.
    async fn entity_name(&self, base: &str, id: &str) -> String {
        let collection = collection_name(base);

        match self.lookup.entities(&collection, id).await {
            Ok(entities) => {
                debug!(%collection, %id, count = entities.len(), "Retrieved entities");
                entities
                    .into_iter()
                    .next()
                    .and_then(|entity| entity.name)
                    .unwrap_or_else(|| id.to_string())
            }
            Err(e) => {
                warn!(%collection, %id, error = %e, "Failed to fetch metadata name");
                id.to_string()
            }
        }
    }
}

fn merge_missing(variables: &mut BTreeMap<String, String>, derived: BTreeMap<String, String>) {
    for (name, value) in derived {
        variables.entry(name).or_insert(value);
    }
}
