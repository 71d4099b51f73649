//! Country reference data.
//!
//! The sync works from an externally published, HXL-tagged country export:
//! a JSON document whose `countries` object maps ISO-3 keys to tagged
//! records. Only the ISO code and the preferred name are read.

use serde::Deserialize;
use serde_json::Value;

use codsync_core::error::AppError;
use codsync_core::models::Country;

use crate::fetch::JsonFetch;

#[derive(Deserialize, Debug, Default)]
struct CountryExport {
    #[serde(default)]
    countries: serde_json::Map<String, Value>,
}

/// Fetches the country reference list from `url`.
///
/// Entries missing either HXL tag are skipped with a warning; an export
/// yielding no usable countries at all is an error, since the run would
/// silently do nothing.
pub async fn fetch_countries(fetch: &dyn JsonFetch, url: &str) -> Result<Vec<Country>, AppError> {
    let document = fetch.fetch_json(url).await?;
    let export: CountryExport = serde_json::from_value(document)?;

    let mut countries = Vec::new();
    for (key, entry) in export.countries {
        match serde_json::from_value::<Country>(entry) {
            Ok(country) => countries.push(country),
            Err(e) => tracing::warn!("skipping malformed country entry {key}: {e}"),
        }
    }

    if countries.is_empty() {
        return Err(AppError::Generic(format!("no countries found at {url}")));
    }

    Ok(countries)
}
