//! Highest-rating roll-ups
//!
//! Every query is a true maximum over the entity's own rating (where it has
//! one) and the ratings of all data assets it touches. The fold stops early
//! once the top tier is reached.

use super::ParsedModel;
use crate::models::{
    CommunicationLink, Confidentiality, Criticality, DataAsset, SharedRuntime, TechnicalAsset,
    TrustBoundary,
};

/// Highest confidentiality, integrity and availability reachable from an entity
pub trait HighestRatings {
    fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality;
    fn highest_integrity(&self, model: &ParsedModel) -> Criticality;
    fn highest_availability(&self, model: &ParsedModel) -> Criticality;
}

fn max_confidentiality<'a>(
    start: Confidentiality,
    data: impl Iterator<Item = &'a DataAsset>,
) -> Confidentiality {
    let mut highest = start;
    for data_asset in data {
        if highest == Confidentiality::StrictlyConfidential {
            break;
        }
        highest = highest.max(data_asset.confidentiality);
    }
    highest
}

fn max_criticality<'a>(
    start: Criticality,
    data: impl Iterator<Item = &'a DataAsset>,
    rating: impl Fn(&DataAsset) -> Criticality,
) -> Criticality {
    let mut highest = start;
    for data_asset in data {
        if highest == Criticality::MissionCritical {
            break;
        }
        highest = highest.max(rating(data_asset));
    }
    highest
}

impl ParsedModel {
    fn data_for<'a>(&'a self, ids: impl Iterator<Item = &'a String>) -> impl Iterator<Item = &'a DataAsset> {
        ids.filter_map(move |id| self.data_assets.get(id))
    }

    fn processed_and_stored<'a>(&'a self, asset: &'a TechnicalAsset) -> impl Iterator<Item = &'a DataAsset> {
        self.data_for(asset.data_assets_processed.iter().chain(&asset.data_assets_stored))
    }

    fn transferred<'a>(&'a self, link: &'a CommunicationLink) -> impl Iterator<Item = &'a DataAsset> {
        self.data_for(link.data_assets_sent.iter().chain(&link.data_assets_received))
    }

    /// Highest confidentiality over the asset and the data it stores
    pub fn highest_stored_confidentiality(&self, asset: &TechnicalAsset) -> Confidentiality {
        max_confidentiality(asset.confidentiality, self.data_for(asset.data_assets_stored.iter()))
    }

    pub fn highest_stored_integrity(&self, asset: &TechnicalAsset) -> Criticality {
        max_criticality(asset.integrity, self.data_for(asset.data_assets_stored.iter()), |d| {
            d.integrity
        })
    }

    pub fn highest_stored_availability(&self, asset: &TechnicalAsset) -> Criticality {
        max_criticality(asset.availability, self.data_for(asset.data_assets_stored.iter()), |d| {
            d.availability
        })
    }

    /// Data assets sent over a link, in reference order
    pub fn data_assets_sent<'a>(&'a self, link: &'a CommunicationLink) -> Vec<&'a DataAsset> {
        self.data_for(link.data_assets_sent.iter()).collect()
    }

    pub fn data_assets_received<'a>(&'a self, link: &'a CommunicationLink) -> Vec<&'a DataAsset> {
        self.data_for(link.data_assets_received.iter()).collect()
    }

    fn assets_of<'a>(&'a self, ids: Vec<String>) -> Vec<&'a TechnicalAsset> {
        ids.iter().filter_map(|id| self.technical_assets.get(id)).collect()
    }
}

impl HighestRatings for TechnicalAsset {
    fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality {
        max_confidentiality(self.confidentiality, model.processed_and_stored(self))
    }

    fn highest_integrity(&self, model: &ParsedModel) -> Criticality {
        max_criticality(self.integrity, model.processed_and_stored(self), |d| d.integrity)
    }

    fn highest_availability(&self, model: &ParsedModel) -> Criticality {
        max_criticality(self.availability, model.processed_and_stored(self), |d| d.availability)
    }
}

/// Links carry no rating of their own; an empty link rates at the lowest tier
impl HighestRatings for CommunicationLink {
    fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality {
        max_confidentiality(Confidentiality::Public, model.transferred(self))
    }

    fn highest_integrity(&self, model: &ParsedModel) -> Criticality {
        max_criticality(Criticality::Archive, model.transferred(self), |d| d.integrity)
    }

    fn highest_availability(&self, model: &ParsedModel) -> Criticality {
        max_criticality(Criticality::Archive, model.transferred(self), |d| d.availability)
    }
}

impl HighestRatings for TrustBoundary {
    fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality {
        model
            .assets_of(model.recursively_contained_assets(&self.id))
            .iter()
            .map(|asset| asset.highest_confidentiality(model))
            .max()
            .unwrap_or(Confidentiality::Public)
    }

    fn highest_integrity(&self, model: &ParsedModel) -> Criticality {
        model
            .assets_of(model.recursively_contained_assets(&self.id))
            .iter()
            .map(|asset| asset.highest_integrity(model))
            .max()
            .unwrap_or(Criticality::Archive)
    }

    fn highest_availability(&self, model: &ParsedModel) -> Criticality {
        model
            .assets_of(model.recursively_contained_assets(&self.id))
            .iter()
            .map(|asset| asset.highest_availability(model))
            .max()
            .unwrap_or(Criticality::Archive)
    }
}

impl HighestRatings for SharedRuntime {
    fn highest_confidentiality(&self, model: &ParsedModel) -> Confidentiality {
        model
            .assets_of(self.technical_assets_running.clone())
            .iter()
            .map(|asset| asset.highest_confidentiality(model))
            .max()
            .unwrap_or(Confidentiality::Public)
    }

    fn highest_integrity(&self, model: &ParsedModel) -> Criticality {
        model
            .assets_of(self.technical_assets_running.clone())
            .iter()
            .map(|asset| asset.highest_integrity(model))
            .max()
            .unwrap_or(Criticality::Archive)
    }

    fn highest_availability(&self, model: &ParsedModel) -> Criticality {
        model
            .assets_of(self.technical_assets_running.clone())
            .iter()
            .map(|asset| asset.highest_availability(model))
            .max()
            .unwrap_or(Criticality::Archive)
    }
}
