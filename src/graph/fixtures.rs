//! Builders for small test models

use super::ParsedModel;
use crate::models::*;

pub fn asset(id: &str, technologies: &[&str]) -> TechnicalAsset {
    TechnicalAsset {
        id: id.to_string(),
        title: id.to_string(),
        asset_type: TechnicalAssetType::Process,
        technologies: TechnologyList::from(
            technologies.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
        ),
        ..Default::default()
    }
}

pub fn datastore(id: &str, technologies: &[&str]) -> TechnicalAsset {
    TechnicalAsset {
        asset_type: TechnicalAssetType::Datastore,
        ..asset(id, technologies)
    }
}

pub fn link(id: &str, target: &str, protocol: Protocol) -> CommunicationLink {
    link_titled(id, target, id, protocol)
}

pub fn link_titled(id: &str, target: &str, title: &str, protocol: Protocol) -> CommunicationLink {
    CommunicationLink {
        id: id.to_string(),
        target_id: target.to_string(),
        title: title.to_string(),
        protocol,
        ..Default::default()
    }
}

pub fn data(id: &str, confidentiality: Confidentiality, integrity: Criticality) -> DataAsset {
    DataAsset {
        id: id.to_string(),
        title: id.to_string(),
        confidentiality,
        integrity,
        ..Default::default()
    }
}

pub fn boundary(
    id: &str,
    boundary_type: TrustBoundaryType,
    assets: &[&str],
    nested: &[&str],
) -> TrustBoundary {
    TrustBoundary {
        id: id.to_string(),
        title: id.to_string(),
        boundary_type,
        technical_assets_inside: assets.iter().map(|a| a.to_string()).collect(),
        trust_boundaries_nested: nested.iter().map(|b| b.to_string()).collect(),
        ..Default::default()
    }
}

pub fn runtime(id: &str, assets: &[&str]) -> SharedRuntime {
    SharedRuntime {
        id: id.to_string(),
        title: id.to_string(),
        technical_assets_running: assets.iter().map(|a| a.to_string()).collect(),
        ..Default::default()
    }
}

pub fn build(input: ModelInput) -> ParsedModel {
    ParsedModel::new(input, &TechnologyCatalog::builtin()).expect("fixture model should be valid")
}
