//! DHIS2 metadata lookups used to resolve identifiers found in errors

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// One element of a metadata collection response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// References of a single tracker event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRef {
    pub event: Option<String>,
    pub enrollment: Option<String>,
    pub org_unit: Option<String>,
    pub program: Option<String>,
    #[serde(alias = "trackedEntityInstance")]
    pub tracked_entity: Option<String>,
}

impl EventRef {
    /// Template variables derived from the event, only the known ones.
    pub fn variables(&self) -> BTreeMap<String, String> {
        let fields = [
            ("event_enrollment", &self.enrollment),
            ("event_orgUnit", &self.org_unit),
            ("event_program", &self.program),
            ("event_trackedEntity", &self.tracked_entity),
        ];

        known(fields)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub enrollment: Option<String>,
    pub org_unit: Option<String>,
    pub program: Option<String>,
}

/// A tracked entity with its enrollments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEntityRef {
    #[serde(alias = "trackedEntityInstance")]
    pub tracked_entity: Option<String>,
    pub tracked_entity_type: Option<String>,
    pub org_unit: Option<String>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

impl TrackedEntityRef {
    /// Template variables derived from the tracked entity and its first
    /// enrollment.
    pub fn variables(&self) -> BTreeMap<String, String> {
        let enrollment = self.enrollments.first().cloned().unwrap_or_default();
        let org_unit = self.org_unit.clone().or(enrollment.org_unit);

        let fields = [
            ("tracked_entity_orgUnit", &org_unit),
            ("tracked_entity_enrollment", &enrollment.enrollment),
            ("tracked_entity_program", &enrollment.program),
            ("tracked_entity_type", &self.tracked_entity_type),
        ];

        known(fields)
    }
}

fn known<const N: usize>(fields: [(&str, &Option<String>); N]) -> BTreeMap<String, String> {
    fields
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.clone())))
        .collect()
}

/// Read access to the DHIS2 metadata and tracker APIs.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Elements of `collection` (e.g. `organisationUnits`) with the given id.
    async fn entities(&self, collection: &str, id: &str) -> Result<Vec<Entity>>;

    async fn event(&self, id: &str) -> Result<EventRef>;

    async fn tracked_entity(&self, id: &str) -> Result<TrackedEntityRef>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_from_api_response() {
        let event: EventRef = serde_json::from_str(
            r#"{"event": "Bzyve9gtbyw", "enrollment": "pfDcyZw9bs1", "orgUnit": "RFe6Bei9Yek",
                "program": "jPRLZ8MJ86L", "trackedEntityInstance": "uyRjwOSJa5k", "status": "ACTIVE"}"#,
        )
        .unwrap();

        let variables = event.variables();
        assert_eq!(variables["event_enrollment"], "pfDcyZw9bs1");
        assert_eq!(variables["event_orgUnit"], "RFe6Bei9Yek");
        assert_eq!(variables["event_program"], "jPRLZ8MJ86L");
        assert_eq!(variables["event_trackedEntity"], "uyRjwOSJa5k");
    }

    #[test]
    fn partial_event_only_sets_known_variables() {
        let event: EventRef = serde_json::from_str(r#"{"event": "x", "orgUnit": "ou"}"#).unwrap();
        let variables = event.variables();
        assert_eq!(variables.len(), 1);
        assert_eq!(variables["event_orgUnit"], "ou");
    }

    #[test]
    fn tracked_entity_uses_first_enrollment() {
        let tracked_entity: TrackedEntityRef = serde_json::from_str(
            r#"{"trackedEntity": "uyRjwOSJa5k", "trackedEntityType": "nEenWmSyUEp",
                "enrollments": [
                    {"enrollment": "pfDcyZw9bs1", "orgUnit": "RFe6Bei9Yek", "program": "jPRLZ8MJ86L"},
                    {"enrollment": "other", "orgUnit": "other", "program": "other"}
                ]}"#,
        )
        .unwrap();

        let variables = tracked_entity.variables();
        assert_eq!(variables["tracked_entity_orgUnit"], "RFe6Bei9Yek");
        assert_eq!(variables["tracked_entity_enrollment"], "pfDcyZw9bs1");
        assert_eq!(variables["tracked_entity_program"], "jPRLZ8MJ86L");
        assert_eq!(variables["tracked_entity_type"], "nEenWmSyUEp");
    }
}
