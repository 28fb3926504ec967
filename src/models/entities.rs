//! Entities of a threat model as delivered by ingestion.
//!
//! All cross references are plain string IDs; `graph::ParsedModel` resolves
//! and validates them.

use super::technology::TechnologyList;
use super::types::*;
use serde::{Deserialize, Serialize};

/// A system component: service, datastore, client, pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalAsset {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub asset_type: TechnicalAssetType,
    pub usage: Usage,
    pub used_as_client_by_human: bool,
    pub out_of_scope: bool,
    pub justification_out_of_scope: String,
    pub size: TechnicalAssetSize,
    pub technologies: TechnologyList,
    pub machine: Machine,
    /// Directly reachable from the internet
    pub internet: bool,
    pub multi_tenant: bool,
    pub redundant: bool,
    pub custom_developed_parts: bool,
    pub encryption: EncryptionStyle,
    pub owner: String,
    pub confidentiality: Confidentiality,
    pub integrity: Criticality,
    pub availability: Criticality,
    pub justification_cia_rating: String,
    pub tags: Vec<String>,
    pub data_assets_processed: Vec<String>,
    pub data_assets_stored: Vec<String>,
    pub data_formats_accepted: Vec<DataFormat>,
    /// Outgoing links, owned by this asset
    pub communication_links: Vec<CommunicationLink>,
    /// Relative attacker attractiveness, 0 to 100
    pub raa: f64,
}

impl TechnicalAsset {
    /// Sum of the attacker attractiveness of the asset's own ratings
    pub fn highest_sensitivity_score(&self) -> f64 {
        self.confidentiality.attacker_attractiveness_for_asset()
            + self.integrity.attacker_attractiveness_for_asset()
            + self.availability.attacker_attractiveness_for_asset()
    }

    pub fn processes_or_stores_data_asset(&self, data_asset_id: &str) -> bool {
        self.data_assets_processed.iter().any(|id| id == data_asset_id)
            || self.data_assets_stored.iter().any(|id| id == data_asset_id)
    }

    pub fn accepts_data_format(&self, format: DataFormat) -> bool {
        self.data_formats_accepted.contains(&format)
    }

    pub fn is_datastore(&self) -> bool {
        self.asset_type == TechnicalAssetType::Datastore
    }
}

/// A piece of information that flows through or rests in the system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataAsset {
    pub id: String,
    pub title: String,
    pub description: String,
    pub usage: Usage,
    pub tags: Vec<String>,
    pub origin: String,
    pub owner: String,
    pub quantity: Quantity,
    pub confidentiality: Confidentiality,
    pub integrity: Criticality,
    pub availability: Criticality,
    pub justification_cia_rating: String,
}

/// Directed data flow from `source_id` to `target_id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationLink {
    /// Derived from the source asset and title when left empty
    pub id: String,
    /// Filled in from the owning asset
    pub source_id: String,
    pub target_id: String,
    pub title: String,
    pub description: String,
    pub protocol: Protocol,
    pub tags: Vec<String>,
    pub vpn: bool,
    pub ip_filtered: bool,
    pub readonly: bool,
    pub authentication: Authentication,
    pub authorization: Authorization,
    pub usage: Usage,
    pub data_assets_sent: Vec<String>,
    pub data_assets_received: Vec<String>,
}

impl CommunicationLink {
    pub fn is_devops(&self) -> bool {
        self.usage == Usage::DevOps
    }

    pub fn transfers_data(&self) -> bool {
        !self.data_assets_sent.is_empty() || !self.data_assets_received.is_empty()
    }
}

/// Security perimeter grouping assets and nested boundaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustBoundary {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub boundary_type: TrustBoundaryType,
    pub tags: Vec<String>,
    pub technical_assets_inside: Vec<String>,
    pub trust_boundaries_nested: Vec<String>,
}

/// Co-location of assets on one runtime, independent of trust boundaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedRuntime {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub technical_assets_running: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_deserializes_with_defaults() {
        let asset: TechnicalAsset = serde_json::from_str(
            r#"{"id": "web", "title": "Web Shop", "type": "process", "technologies": ["web-server"],
                "confidentiality": "confidential", "data_formats_accepted": ["xml"]}"#,
        )
        .unwrap();
        assert_eq!(asset.asset_type, TechnicalAssetType::Process);
        assert_eq!(asset.integrity, Criticality::Archive);
        assert_eq!(asset.technologies.names(), vec!["web-server"]);
        assert!(asset.accepts_data_format(DataFormat::Xml));
        assert!(asset.communication_links.is_empty());
    }

    #[test]
    fn test_sensitivity_score_sums_own_ratings() {
        let asset = TechnicalAsset {
            confidentiality: Confidentiality::StrictlyConfidential,
            integrity: Criticality::Archive,
            availability: Criticality::MissionCritical,
            ..Default::default()
        };
        assert_eq!(asset.highest_sensitivity_score(), 55.0 + 5.0 + 34.0);
    }

    #[test]
    fn test_link_flags() {
        let link = CommunicationLink {
            usage: Usage::DevOps,
            data_assets_received: vec!["logs".into()],
            ..Default::default()
        };
        assert!(link.is_devops());
        assert!(link.transfers_data());
        assert!(!CommunicationLink::default().transfers_data());
    }
}
