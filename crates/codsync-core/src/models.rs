use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Reference entry for a country, as published in the HXL-tagged country
/// export. Read-only: the sync never writes country data.
///
/// # Examples
///
/// ```
/// use codsync_core::models::Country;
///
/// let json = r##"{
///     "#country+code+v_iso3": "POL",
///     "#country+name+preferred": "Poland"
/// }"##;
///
/// let country: Country = serde_json::from_str(json).unwrap();
/// assert_eq!(country.iso3, "POL");
/// assert_eq!(country.name, "Poland");
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct Country {
    /// Three-letter ISO 3166-1 code
    #[serde(rename = "#country+code+v_iso3")]
    pub iso3: String,
    /// Preferred display name
    #[serde(rename = "#country+name+preferred")]
    pub name: String,
}

/// The three COD dataset categories handled by the sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodType {
    /// Administrative boundary geoservices
    Boundaries,
    /// Edge-matched boundary geoservices
    EdgeMatch,
    /// Population statistics API
    Population,
}

impl CodType {
    /// All categories, in processing order.
    pub const ALL: [CodType; 3] = [CodType::Boundaries, CodType::EdgeMatch, CodType::Population];

    /// Short slug used in portal dataset keys.
    pub fn slug(&self) -> &'static str {
        match self {
            CodType::Boundaries => "ab",
            CodType::EdgeMatch => "em",
            CodType::Population => "ps",
        }
    }

    /// Human-readable category label.
    pub fn label(&self) -> &'static str {
        match self {
            CodType::Boundaries => "administrative boundaries",
            CodType::EdgeMatch => "edge-matched boundaries",
            CodType::Population => "population statistics",
        }
    }

    /// Returns true for the two categories discovered from the shared
    /// geoservice catalogs rather than the parametrized population API.
    pub fn is_boundary(&self) -> bool {
        matches!(self, CodType::Boundaries | CodType::EdgeMatch)
    }

    /// Portal dataset key for this category and country,
    /// e.g. `cod-ab-pol` for Poland's administrative boundaries.
    pub fn dataset_key(&self, iso3: &str) -> String {
        format!("cod-{}-{}", self.slug(), iso3.to_lowercase())
    }
}

impl fmt::Display for CodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A dataset resource as held by the portal.
///
/// Discovery builds resources with only `url`, `name`, `format`, and
/// `description` set; resources read back from the portal additionally carry
/// an `id` and whatever extra fields the portal attaches (kept in `extras`
/// so updates round-trip them untouched).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Resource {
    /// Portal identifier; absent until the resource has been persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Fully qualified endpoint URL
    pub url: String,
    /// Human-readable label
    pub name: String,
    /// Declared format, e.g. "Geoservice" or "JSON"
    pub format: String,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Portal fields not modeled here, timestamps included; they ride along
    /// untouched so updates round-trip them
    #[serde(flatten)]
    pub extras: serde_json::Map<String, Value>,
}

impl Resource {
    /// Creates a resource with the given endpoint, label, and format.
    pub fn new(url: impl Into<String>, name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            name: name.into(),
            format: format.into(),
            description: None,
            extras: serde_json::Map::new(),
        }
    }

    /// Normalized file type, as the portal compares formats case-insensitively.
    pub fn file_type(&self) -> String {
        self.format.to_lowercase()
    }
}

/// A portal dataset and its ordered resource list.
///
/// Mutation here is in-memory only; pushing the result back to the portal is
/// the client's job. This mirrors the portal SDK's split between local
/// edits and an explicit update call.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Dataset {
    /// Portal identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// URL-friendly dataset key, e.g. `cod-ab-pol`
    pub name: String,
    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ordered resource list
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Portal fields not modeled here
    #[serde(flatten)]
    pub extras: serde_json::Map<String, Value>,
}

impl Dataset {
    /// Removes the resource at `index` from the dataset's resource list and
    /// returns it.
    ///
    /// With `physical_delete` the portal would also drop the backing file;
    /// that requires the resource to have been persisted, so it is rejected
    /// for resources without a portal id. The sync only ever performs
    /// metadata-only removal (`physical_delete = false`).
    ///
    /// # Errors
    ///
    /// Returns `AppError::ResourceNotFound` if `index` is out of bounds.
    /// Returns `AppError::PortalError` if a physical delete is requested for
    /// an unpersisted resource.
    pub fn delete_resource(
        &mut self,
        index: usize,
        physical_delete: bool,
    ) -> Result<Resource, AppError> {
        if index >= self.resources.len() {
            return Err(AppError::ResourceNotFound(format!(
                "{}: no resource at index {}",
                self.name, index
            )));
        }

        if physical_delete && self.resources[index].id.is_none() {
            return Err(AppError::PortalError(format!(
                "{}: resource '{}' has no portal id, cannot delete its file",
                self.name, self.resources[index].name
            )));
        }

        Ok(self.resources.remove(index))
    }

    /// Adds or updates resources in bulk, matching existing entries by name.
    ///
    /// A matching entry keeps its portal id and has url, format, and
    /// description overwritten; everything else is appended in order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::PortalError` if any incoming resource is missing a
    /// url, name, or format. Nothing is applied in that case.
    pub fn add_update_resources(&mut self, incoming: Vec<Resource>) -> Result<(), AppError> {
        for resource in &incoming {
            if resource.url.is_empty() || resource.name.is_empty() || resource.format.is_empty() {
                return Err(AppError::PortalError(format!(
                    "{}: resource is missing a url, name, or format",
                    self.name
                )));
            }
        }

        for resource in incoming {
            match self.resources.iter_mut().find(|r| r.name == resource.name) {
                Some(existing) => {
                    existing.url = resource.url;
                    existing.format = resource.format;
                    existing.description = resource.description;
                }
                None => self.resources.push(resource),
            }
        }

        Ok(())
    }
}
