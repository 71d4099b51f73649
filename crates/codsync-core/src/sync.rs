//! Reconciliation of discovered service resources against a portal dataset.
//!
//! Pure logic on in-memory datasets: deciding which existing resources came
//! from the upstream service, removing them, and applying the freshly
//! discovered set. Persistence is left to the portal client.

use crate::models::{Dataset, Resource};
use crate::report::ErrorLog;

/// Domain of the third-party service publishing the geoservice and
/// population endpoints. Resources whose URL points here are ours to manage.
pub const UPSTREAM_HOST: &str = "itos.uga.edu";

/// File types the sync publishes; anything else on a dataset is left alone.
const SERVICE_FILE_TYPES: [&str; 2] = ["geoservice", "json"];

/// Outcome of probing one administrative level of the population API.
///
/// The two negative cases must stay distinct: a missing year skips a single
/// level, while a transport failure ends the whole sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelOutcome {
    /// The level exists and reports a reference year.
    Found(Resource),
    /// The level responded without a usable `Year`; skip it, keep probing.
    SkippedNoYear,
    /// Transport failure. Levels are published contiguously from zero, so
    /// the sequence ends here; not recorded as an error.
    EndOfLevels,
}

/// Returns true if `resource` was published by a previous run of this sync:
/// a geoservice/json resource pointing at the upstream host.
pub fn is_upstream_service(resource: &Resource) -> bool {
    SERVICE_FILE_TYPES.contains(&resource.file_type().as_str())
        && resource.url.contains(UPSTREAM_HOST)
}

/// Strips every upstream service resource from the dataset, metadata-only.
///
/// Iterates in reverse index order so removal does not shift the indices
/// still to visit. A per-resource delete failure is recorded and skipped.
/// Returns whether at least one resource was removed; calling this twice in
/// a row always returns false the second time.
pub fn remove_upstream_resources(dataset: &mut Dataset, errors: &ErrorLog) -> bool {
    let mut updated = false;

    for index in (0..dataset.resources.len()).rev() {
        if !is_upstream_service(&dataset.resources[index]) {
            continue;
        }

        match dataset.delete_resource(index, false) {
            Ok(_) => updated = true,
            Err(e) => {
                tracing::debug!("delete_resource failed: {e}");
                errors.add(format!(
                    "{}: could not delete service resource",
                    dataset.name
                ));
            }
        }
    }

    updated
}

/// Applies the discovered resources to the dataset in one bulk operation.
///
/// On failure the error is recorded and false is returned; the caller must
/// not push the dataset to the portal in that case.
pub fn add_service_resources(
    dataset: &mut Dataset,
    resources: Vec<Resource>,
    errors: &ErrorLog,
) -> bool {
    if let Err(e) = dataset.add_update_resources(resources) {
        tracing::debug!("add_update_resources failed: {e}");
        errors.add(format!("{}: could not add service resources", dataset.name));
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream_geoservice() -> Resource {
        let mut resource = Resource::new(
            "https://gistmaps.itos.uga.edu/arcgis/rest/services/COD_External/POL_pcode/MapServer",
            "COD_External/POL_pcode (MapServer)",
            "Geoservice",
        );
        resource.id = Some("r-geo".to_string());
        resource
    }

    fn upstream_population() -> Resource {
        let mut resource = Resource::new(
            "https://apps.itos.uga.edu/CODV2API/api/v1/themes/cod-ps/lookup/Get/0/do/POL",
            "POL admin 0 population",
            "JSON",
        );
        resource.id = Some("r-ps".to_string());
        resource
    }

    fn unrelated_csv() -> Resource {
        let mut resource = Resource::new(
            "https://data.example.org/download/pol_adminboundaries.csv",
            "pol_adminboundaries.csv",
            "CSV",
        );
        resource.id = Some("r-csv".to_string());
        resource
    }

    fn dataset_with(resources: Vec<Resource>) -> Dataset {
        Dataset {
            id: Some("abc-123".to_string()),
            name: "cod-ab-pol".to_string(),
            title: None,
            resources,
            extras: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_is_upstream_service() {
        assert!(is_upstream_service(&upstream_geoservice()));
        assert!(is_upstream_service(&upstream_population()));
        assert!(!is_upstream_service(&unrelated_csv()));

        // Right host, wrong file type.
        let mut kml = upstream_geoservice();
        kml.format = "KML".to_string();
        assert!(!is_upstream_service(&kml));

        // Right file type, wrong host.
        let mut elsewhere = upstream_population();
        elsewhere.url = "https://data.example.org/api/pop.json".to_string();
        assert!(!is_upstream_service(&elsewhere));
    }

    #[test]
    fn test_upstream_match_is_case_insensitive_on_format() {
        let mut resource = upstream_geoservice();
        resource.format = "GeoService".to_string();
        assert!(is_upstream_service(&resource));
    }

    #[test]
    fn test_remove_upstream_resources() {
        let errors = ErrorLog::new();
        let mut dataset = dataset_with(vec![
            upstream_geoservice(),
            unrelated_csv(),
            upstream_population(),
        ]);

        let updated = remove_upstream_resources(&mut dataset, &errors);

        assert!(updated);
        assert_eq!(dataset.resources.len(), 1);
        assert_eq!(dataset.resources[0].name, "pol_adminboundaries.csv");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_remove_upstream_resources_is_idempotent() {
        let errors = ErrorLog::new();
        let mut dataset = dataset_with(vec![upstream_geoservice(), unrelated_csv()]);

        assert!(remove_upstream_resources(&mut dataset, &errors));
        let after_first = dataset.resources.clone();

        assert!(!remove_upstream_resources(&mut dataset, &errors));
        assert_eq!(dataset.resources, after_first);
    }

    #[test]
    fn test_remove_upstream_resources_noop_without_upstream() {
        let errors = ErrorLog::new();
        let mut dataset = dataset_with(vec![unrelated_csv()]);
        let before = dataset.resources.clone();

        let updated = remove_upstream_resources(&mut dataset, &errors);

        assert!(!updated);
        assert_eq!(dataset.resources, before);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_remove_then_add_round_trip() {
        let errors = ErrorLog::new();
        let mut dataset = dataset_with(vec![upstream_geoservice(), unrelated_csv()]);

        let updated = remove_upstream_resources(&mut dataset, &errors);
        assert!(updated);
        assert_eq!(dataset.resources.len(), 1);

        let mut fresh = Resource::new(
            "https://gistmaps.itos.uga.edu/arcgis/rest/services/COD_External/POL_pcode/FeatureServer",
            "COD_External/POL_pcode (FeatureServer)",
            "Geoservice",
        );
        fresh.description = Some("Feature service for Poland".to_string());

        assert!(add_service_resources(&mut dataset, vec![fresh], &errors));

        assert_eq!(dataset.resources.len(), 2);
        assert_eq!(dataset.resources[0].name, "pol_adminboundaries.csv");
        assert_eq!(
            dataset.resources[1].name,
            "COD_External/POL_pcode (FeatureServer)"
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_add_service_resources_records_failure() {
        let errors = ErrorLog::new();
        let mut dataset = dataset_with(vec![]);

        let invalid = Resource::new("", "", "");
        let ok = add_service_resources(&mut dataset, vec![invalid], &errors);

        assert!(!ok);
        assert_eq!(errors.len(), 1);
        assert!(errors.messages()[0].starts_with("cod-ab-pol:"));
    }
}
