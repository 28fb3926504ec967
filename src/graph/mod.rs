//! Graph Model
//!
//! Arena-style storage of a resolved threat model: entities live in flat
//! ID-keyed tables, relationships are ID references, and the reverse indices
//! rules rely on (incoming links, direct trust boundary, boundary parent) are
//! built once during construction. The model is read-only afterwards.
//!
//! Split into submodules:
//! - `propagation`: highest-rating roll-ups
//! - `boundaries`: trust-boundary ancestry and co-location checks
//! - `tags`: tag matching on entities and model-wide lookups

mod boundaries;
mod propagation;
mod tags;

#[cfg(test)]
pub(crate) mod fixtures;

pub use propagation::HighestRatings;
pub use tags::Tagged;

use crate::errors::{ThreatGraphError, ThreatGraphResult};
use crate::identity::make_id;
use crate::models::{
    CommunicationLink, DataAsset, ModelInput, SharedRuntime, TechnicalAsset, TechnologyCatalog,
    TrustBoundary,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Resolved, validated and indexed threat model
#[derive(Debug, Clone, Default)]
pub struct ParsedModel {
    pub title: String,
    pub description: String,
    pub tags_available: Vec<String>,
    pub technical_assets: BTreeMap<String, TechnicalAsset>,
    pub data_assets: BTreeMap<String, DataAsset>,
    pub trust_boundaries: BTreeMap<String, TrustBoundary>,
    pub shared_runtimes: BTreeMap<String, SharedRuntime>,
    /// Every link of every asset, keyed by link ID
    pub communication_links: BTreeMap<String, CommunicationLink>,
    /// Target asset ID to incoming link IDs, sorted by link ID
    incoming_links: HashMap<String, Vec<String>>,
    /// Asset ID to the boundary that lists it directly
    direct_trust_boundary: HashMap<String, String>,
    /// Boundary ID to the boundary that nests it
    parent_trust_boundary: HashMap<String, String>,
}

impl ParsedModel {
    /// Resolve technologies, validate every reference and build the indices
    pub fn new(input: ModelInput, catalog: &TechnologyCatalog) -> ThreatGraphResult<Self> {
        let mut model = ParsedModel {
            title: input.title,
            description: input.description,
            tags_available: input.tags_available,
            ..Default::default()
        };

        for data_asset in input.data_assets {
            require_id("data asset", &data_asset.id, &data_asset.title)?;
            if model.data_assets.contains_key(&data_asset.id) {
                return Err(duplicate("data asset", &data_asset.id));
            }
            model.data_assets.insert(data_asset.id.clone(), data_asset);
        }

        for mut asset in input.technical_assets {
            require_id("technical asset", &asset.id, &asset.title)?;
            if model.technical_assets.contains_key(&asset.id) {
                return Err(duplicate("technical asset", &asset.id));
            }
            asset.technologies = catalog.resolve(&asset.technologies).map_err(|e| {
                ThreatGraphError::model(format!("technical asset '{}'", asset.id), e.to_string())
            })?;
            for link in &mut asset.communication_links {
                link.source_id = asset.id.clone();
                if link.id.is_empty() {
                    link.id = format!("{}>{}", asset.id, make_id(&link.title));
                }
                if model.communication_links.contains_key(&link.id) {
                    return Err(duplicate("communication link", &link.id));
                }
                model.communication_links.insert(link.id.clone(), link.clone());
            }
            model.technical_assets.insert(asset.id.clone(), asset);
        }

        for boundary in input.trust_boundaries {
            require_id("trust boundary", &boundary.id, &boundary.title)?;
            if model.trust_boundaries.contains_key(&boundary.id) {
                return Err(duplicate("trust boundary", &boundary.id));
            }
            model.trust_boundaries.insert(boundary.id.clone(), boundary);
        }

        for runtime in input.shared_runtimes {
            require_id("shared runtime", &runtime.id, &runtime.title)?;
            if model.shared_runtimes.contains_key(&runtime.id) {
                return Err(duplicate("shared runtime", &runtime.id));
            }
            model.shared_runtimes.insert(runtime.id.clone(), runtime);
        }

        model.validate_references()?;
        model.build_indices()?;
        log::debug!(
            "Parsed model '{}': {} technical assets, {} data assets, {} links, {} trust boundaries, {} shared runtimes",
            model.title,
            model.technical_assets.len(),
            model.data_assets.len(),
            model.communication_links.len(),
            model.trust_boundaries.len(),
            model.shared_runtimes.len()
        );
        Ok(model)
    }

    fn validate_references(&self) -> ThreatGraphResult<()> {
        for asset in self.technical_assets.values() {
            let context = format!("technical asset '{}'", asset.id);
            for id in asset.data_assets_processed.iter().chain(&asset.data_assets_stored) {
                if !self.data_assets.contains_key(id) {
                    return Err(ThreatGraphError::model(
                        context,
                        format!("referenced data asset '{}' does not exist", id),
                    ));
                }
            }
        }
        for link in self.communication_links.values() {
            let context = format!("communication link '{}'", link.id);
            if !self.technical_assets.contains_key(&link.target_id) {
                return Err(ThreatGraphError::model(
                    context,
                    format!("target technical asset '{}' does not exist", link.target_id),
                ));
            }
            for id in link.data_assets_sent.iter().chain(&link.data_assets_received) {
                if !self.data_assets.contains_key(id) {
                    return Err(ThreatGraphError::model(
                        context,
                        format!("referenced data asset '{}' does not exist", id),
                    ));
                }
            }
        }
        for boundary in self.trust_boundaries.values() {
            let context = format!("trust boundary '{}'", boundary.id);
            for id in &boundary.technical_assets_inside {
                if !self.technical_assets.contains_key(id) {
                    return Err(ThreatGraphError::model(
                        context,
                        format!("contained technical asset '{}' does not exist", id),
                    ));
                }
            }
            for id in &boundary.trust_boundaries_nested {
                if !self.trust_boundaries.contains_key(id) {
                    return Err(ThreatGraphError::model(
                        context,
                        format!("nested trust boundary '{}' does not exist", id),
                    ));
                }
            }
        }
        for runtime in self.shared_runtimes.values() {
            for id in &runtime.technical_assets_running {
                if !self.technical_assets.contains_key(id) {
                    return Err(ThreatGraphError::model(
                        format!("shared runtime '{}'", runtime.id),
                        format!("running technical asset '{}' does not exist", id),
                    ));
                }
            }
        }
        Ok(())
    }

    fn build_indices(&mut self) -> ThreatGraphResult<()> {
        for link in self.communication_links.values() {
            self.incoming_links
                .entry(link.target_id.clone())
                .or_default()
                .push(link.id.clone());
        }

        for boundary in self.trust_boundaries.values() {
            for asset_id in &boundary.technical_assets_inside {
                if let Some(previous) = self
                    .direct_trust_boundary
                    .insert(asset_id.clone(), boundary.id.clone())
                {
                    return Err(ThreatGraphError::model(
                        format!("technical asset '{}'", asset_id),
                        format!(
                            "directly contained in more than one trust boundary ('{}' and '{}')",
                            previous, boundary.id
                        ),
                    ));
                }
            }
            for nested_id in &boundary.trust_boundaries_nested {
                if nested_id == &boundary.id {
                    return Err(ThreatGraphError::model(
                        format!("trust boundary '{}'", boundary.id),
                        "nests itself",
                    ));
                }
                if let Some(previous) = self
                    .parent_trust_boundary
                    .insert(nested_id.clone(), boundary.id.clone())
                {
                    return Err(ThreatGraphError::model(
                        format!("trust boundary '{}'", nested_id),
                        format!(
                            "nested in more than one trust boundary ('{}' and '{}')",
                            previous, boundary.id
                        ),
                    ));
                }
            }
        }

        // With at most one parent per boundary, a cycle shows up as a walk
        // that revisits a boundary.
        for start in self.trust_boundaries.keys() {
            let mut visited = HashSet::new();
            let mut current = start.as_str();
            while let Some(parent) = self.parent_trust_boundary.get(current) {
                if !visited.insert(parent.as_str()) {
                    return Err(ThreatGraphError::model(
                        format!("trust boundary '{}'", start),
                        "nested trust boundaries form a cycle",
                    ));
                }
                current = parent;
            }
        }
        Ok(())
    }

    /// In-scope technical assets sorted by ID
    pub fn technical_assets_in_scope(&self) -> impl Iterator<Item = &TechnicalAsset> {
        self.technical_assets.values().filter(|asset| !asset.out_of_scope)
    }

    pub fn technical_asset(&self, id: &str) -> Option<&TechnicalAsset> {
        self.technical_assets.get(id)
    }

    /// Lookup that turns a dangling reference into a structural error
    pub fn require_technical_asset(&self, id: &str) -> ThreatGraphResult<&TechnicalAsset> {
        self.technical_assets.get(id).ok_or_else(|| {
            ThreatGraphError::model("technical asset lookup", format!("'{}' does not exist", id))
        })
    }

    pub fn data_asset(&self, id: &str) -> Option<&DataAsset> {
        self.data_assets.get(id)
    }

    pub fn communication_link(&self, id: &str) -> Option<&CommunicationLink> {
        self.communication_links.get(id)
    }

    /// Links whose target is the asset, sorted by link ID
    pub fn incoming_links(&self, asset_id: &str) -> Vec<&CommunicationLink> {
        self.incoming_links
            .get(asset_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.communication_links.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Outgoing links of the asset, sorted by link ID
    pub fn outgoing_links(&self, asset_id: &str) -> Vec<&CommunicationLink> {
        let mut links: Vec<&CommunicationLink> = self
            .technical_assets
            .get(asset_id)
            .map(|asset| asset.communication_links.iter().collect())
            .unwrap_or_default();
        links.sort_by(|a, b| a.id.cmp(&b.id));
        links
    }

    /// Source asset of a link
    pub fn link_source(&self, link: &CommunicationLink) -> ThreatGraphResult<&TechnicalAsset> {
        self.require_technical_asset(&link.source_id)
    }

    /// Target asset of a link
    pub fn link_target(&self, link: &CommunicationLink) -> ThreatGraphResult<&TechnicalAsset> {
        self.require_technical_asset(&link.target_id)
    }

    /// True when a link runs between the two assets in either direction
    pub fn has_direct_connection(&self, asset_id: &str, other_id: &str) -> bool {
        self.communication_links.values().any(|link| {
            (link.source_id == asset_id && link.target_id == other_id)
                || (link.source_id == other_id && link.target_id == asset_id)
        })
    }

    /// True when any asset or link mentions the data asset
    pub fn is_data_asset_referenced(&self, data_asset_id: &str) -> bool {
        self.technical_assets
            .values()
            .any(|asset| asset.processes_or_stores_data_asset(data_asset_id))
            || self.communication_links.values().any(|link| {
                link.data_assets_sent.iter().any(|id| id == data_asset_id)
                    || link.data_assets_received.iter().any(|id| id == data_asset_id)
            })
    }

    /// Shared runtimes running the asset, sorted by runtime ID
    pub fn shared_runtimes_running(&self, asset_id: &str) -> Vec<&SharedRuntime> {
        self.shared_runtimes
            .values()
            .filter(|runtime| runtime.technical_assets_running.iter().any(|id| id == asset_id))
            .collect()
    }

    /// Overwrite RAA values in place
    pub(crate) fn set_raa(&mut self, values: &BTreeMap<String, f64>) {
        for (id, value) in values {
            if let Some(asset) = self.technical_assets.get_mut(id) {
                asset.raa = *value;
            }
        }
    }
}

fn require_id(kind: &str, id: &str, title: &str) -> ThreatGraphResult<()> {
    if id.trim().is_empty() {
        return Err(ThreatGraphError::model(
            format!("{} '{}'", kind, title),
            "missing ID",
        ));
    }
    Ok(())
}

fn duplicate(kind: &str, id: &str) -> ThreatGraphError {
    ThreatGraphError::model(format!("{} '{}'", kind, id), "duplicate ID")
}
