//! Boundary catalog fetching and per-country resource discovery.
//!
//! The upstream service publishes two ArcGIS REST folders (administrative
//! boundaries and edge-matched boundaries) listing the geoservices of every
//! country together, plus a population lookup API parametrized by country
//! and administrative level. Discovery turns those listings into portal
//! resource descriptors for one (country, category) pair at a time.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use codsync_core::config::ServiceUrls;
use codsync_core::error::AppError;
use codsync_core::models::{CodType, Country, Resource};
use codsync_core::report::ErrorLog;
use codsync_core::sync::LevelOutcome;

use crate::fetch::JsonFetch;

/// Query string selecting JSON output from the ArcGIS REST API.
const PJSON_QUERY: &str = "?f=pjson";

/// Declared portal format for geoservice endpoints.
const GEOSERVICE_FORMAT: &str = "Geoservice";

/// Declared portal format for population lookup endpoints.
const JSON_FORMAT: &str = "JSON";

/// Deepest administrative level the population API publishes.
const MAX_ADMIN_LEVEL: u8 = 4;

/// One entry of an ArcGIS service folder listing. The composite name is
/// `"<group>/<code>"`, where the code's first three characters are the ISO
/// code of the country the service belongs to.
#[derive(Deserialize, Debug, Clone)]
struct ServiceEntry {
    name: String,
    #[serde(rename = "type")]
    service_type: String,
}

/// Parsed service folder listing for one boundary category.
#[derive(Deserialize, Debug, Clone, Default)]
struct ServiceListing {
    #[serde(default)]
    services: Vec<ServiceEntry>,
}

/// Service description document behind a single service endpoint.
#[derive(Deserialize, Debug, Default)]
struct ServiceDescription {
    #[serde(rename = "serviceDescription")]
    service_description: Option<String>,
}

/// Shared service catalogs for the two boundary categories.
///
/// Fetched once per run and read for every country; never mutated after the
/// fetch.
#[derive(Debug, Default)]
pub struct ServiceCatalogs {
    listings: HashMap<CodType, ServiceListing>,
}

impl ServiceCatalogs {
    /// Number of catalogs that were fetched successfully.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// True when both boundary catalogs are present. The run must not start
    /// per-country work on a partial fetch.
    pub fn is_complete(&self) -> bool {
        self.listings.len() == 2
    }
}

/// Fetches the service catalogs for both boundary categories.
///
/// A transport failure for one category is recorded and that category is
/// omitted; the other is still fetched. Callers check completeness with
/// [`ServiceCatalogs::is_complete`].
pub async fn fetch_boundary_catalogs(
    fetch: &dyn JsonFetch,
    urls: &ServiceUrls,
    errors: &ErrorLog,
) -> ServiceCatalogs {
    let mut catalogs = ServiceCatalogs::default();

    for cod_type in [CodType::Boundaries, CodType::EdgeMatch] {
        let url = urls.for_type(cod_type);
        let document = match fetch.fetch_json(&format!("{url}{PJSON_QUERY}")).await {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!("catalog fetch failed: {e}");
                errors.add(format!(
                    "Could not get {} data from {}",
                    cod_type.label(),
                    url
                ));
                continue;
            }
        };

        let listing: ServiceListing = serde_json::from_value(document).unwrap_or_default();
        catalogs.listings.insert(cod_type, listing);
    }

    catalogs
}

/// Discovers the portal resources for one (country, category) pair.
///
/// Boundary categories read the shared catalogs; the population category
/// probes the lookup API level by level. Catalog order is preserved; nothing
/// is sorted. Failures are recorded in `errors` and never abort discovery
/// for the remaining candidates.
pub async fn discover_resources(
    fetch: &dyn JsonFetch,
    catalogs: &ServiceCatalogs,
    urls: &ServiceUrls,
    country: &Country,
    cod_type: CodType,
    errors: &ErrorLog,
) -> Vec<Resource> {
    if cod_type.is_boundary() {
        discover_boundary_services(fetch, catalogs, urls.for_type(cod_type), country, cod_type, errors)
            .await
    } else {
        discover_population_levels(fetch, urls.for_type(CodType::Population), country, errors).await
    }
}

/// Second `/`-delimited segment of a composite service name, or None for
/// names without one (those entries are skipped).
fn service_code_segment(name: &str) -> Option<&str> {
    name.split('/').nth(1)
}

/// ISO code carried by a code segment: its first three characters, uppercased.
fn segment_iso3(segment: &str) -> String {
    segment.chars().take(3).collect::<String>().to_uppercase()
}

async fn discover_boundary_services(
    fetch: &dyn JsonFetch,
    catalogs: &ServiceCatalogs,
    base_url: &str,
    country: &Country,
    cod_type: CodType,
    errors: &ErrorLog,
) -> Vec<Resource> {
    let mut resources = Vec::new();
    let iso3 = country.iso3.to_uppercase();

    let services = catalogs
        .listings
        .get(&cod_type)
        .map(|listing| listing.services.as_slice())
        .unwrap_or_default();

    if services.is_empty() {
        errors.add(format!("{iso3}: could not find service list"));
        return resources;
    }

    for service in services {
        // The catalog lists every country's services together; scope by the
        // ISO code embedded in the composite name.
        let Some(segment) = service_code_segment(&service.name) else {
            continue;
        };
        if segment_iso3(segment) != iso3 {
            continue;
        }

        let mut resource = Resource::new(
            format!("{base_url}/{segment}/{}", service.service_type),
            format!("{} ({})", service.name, service.service_type),
            GEOSERVICE_FORMAT,
        );

        let document = match fetch
            .fetch_json(&format!("{}{PJSON_QUERY}", resource.url))
            .await
        {
            Ok(document) => document,
            Err(e) => {
                // No partial descriptors: a service we cannot describe is
                // dropped for this run.
                tracing::debug!("service description fetch failed: {e}");
                errors.add(format!(
                    "{iso3}: could not get data from {}",
                    resource.url
                ));
                continue;
            }
        };

        let description: ServiceDescription = serde_json::from_value(document).unwrap_or_default();
        resource.description = description.service_description;
        resources.push(resource);
    }

    resources
}

async fn discover_population_levels(
    fetch: &dyn JsonFetch,
    template: &str,
    country: &Country,
    errors: &ErrorLog,
) -> Vec<Resource> {
    let mut resources = Vec::new();

    for level in 0..=MAX_ADMIN_LEVEL {
        match probe_population_level(fetch, template, country, level).await {
            Ok(LevelOutcome::Found(resource)) => resources.push(resource),
            Ok(LevelOutcome::SkippedNoYear) => continue,
            Ok(LevelOutcome::EndOfLevels) => break,
            Err(e) => {
                errors.add(format!(
                    "{}: could not get population data for level {level}: {e}",
                    country.iso3.to_uppercase()
                ));
                break;
            }
        }
    }

    resources
}

/// Probes one administrative level of the population lookup API.
///
/// A transport failure maps to [`LevelOutcome::EndOfLevels`]: levels are
/// published contiguously from zero, so an unreachable level means the
/// sequence has ended, not that something went wrong. Any other error kind
/// is returned to the caller instead of being folded into the stop
/// condition.
async fn probe_population_level(
    fetch: &dyn JsonFetch,
    template: &str,
    country: &Country,
    level: u8,
) -> Result<LevelOutcome, AppError> {
    let iso3 = country.iso3.to_uppercase();
    let url = template
        .replace("/iso", &format!("/{iso3}"))
        .replace("/adm/", &format!("/{level}/"));

    let document = match fetch.fetch_json(&url).await {
        Ok(document) => document,
        Err(e) if e.is_transport() => return Ok(LevelOutcome::EndOfLevels),
        Err(e) => return Err(e),
    };

    let Some(year) = document.get("Year").and_then(usable_year) else {
        return Ok(LevelOutcome::SkippedNoYear);
    };

    let mut resource = Resource::new(
        url,
        format!("{iso3} admin {level} population"),
        JSON_FORMAT,
    );
    resource.description = Some(format!(
        "{} administrative level {level} {year} population statistics",
        country.name
    ));

    Ok(LevelOutcome::Found(resource))
}

/// A reference year usable in a resource description: a non-zero number or a
/// non-empty, non-"0" string. Anything else counts as absent.
fn usable_year(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) if n.as_f64().is_some_and(|v| v != 0.0) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() && s != "0" => Some(s.clone()),
        _ => None,
    }
}
