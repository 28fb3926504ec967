//! Relative Attacker Attractiveness (RAA)
//!
//! Scores every technical asset by the sensitivity and quantity of data it
//! holds or moves, scales the score by technology, normalises it against the
//! whole model to 1..=100 and finally lets assets inherit part of the
//! attractiveness of more valuable neighbours they can pivot to.

use crate::graph::ParsedModel;
use crate::models::technology::*;
use crate::models::{DataAsset, TechnicalAsset};
use std::collections::BTreeMap;

/// Compute RAA values for every asset, keyed by asset ID
pub fn calculate(model: &ParsedModel) -> BTreeMap<String, f64> {
    let absolute: BTreeMap<&str, f64> = model
        .technical_assets
        .values()
        .map(|asset| (asset.id.as_str(), attacker_attractiveness(model, asset)))
        .collect();
    let scale = RelativeScale::from_values(absolute.values().copied());

    model
        .technical_assets
        .values()
        .map(|asset| {
            let own = absolute.get(asset.id.as_str()).copied().unwrap_or(0.0);
            let adjusted = own + pivoting_adjustment(model, asset, &absolute, &scale);
            (asset.id.clone(), scale.relative(adjusted).min(100.0))
        })
        .collect()
}

/// Overwrite the RAA of every asset in the model
pub fn apply(model: &mut ParsedModel) {
    let values = calculate(model);
    log::debug!("Calculated RAA for {} technical assets", values.len());
    model.set_raa(&values);
}

struct RelativeScale {
    minimum: f64,
    spread: f64,
}

impl RelativeScale {
    fn from_values(values: impl Iterator<Item = f64>) -> Self {
        let (mut minimum, mut maximum) = (f64::MAX, f64::MIN);
        for value in values {
            minimum = minimum.min(value);
            maximum = maximum.max(value);
        }
        if minimum > maximum {
            minimum = 0.0;
            maximum = 0.0;
        }
        if !(minimum < maximum) {
            maximum = minimum + 1.0;
        }
        Self {
            minimum,
            spread: maximum - minimum,
        }
    }

    /// Percent of the model-wide spread; never below 1 since 0 would read as
    /// "no attacker interest at all"
    fn relative(&self, value: f64) -> f64 {
        let percent = (value - self.minimum) / self.spread * 100.0;
        if percent <= 0.0 {
            1.0
        } else {
            percent
        }
    }
}

fn data_score(data_asset: &DataAsset, transferred: bool) -> f64 {
    let quantity = data_asset.quantity.quantity_factor();
    if transferred {
        data_asset.confidentiality.attacker_attractiveness_for_in_transfered_data() * quantity
            + data_asset.integrity.attacker_attractiveness_for_in_transfered_data() * quantity
            + data_asset.availability.attacker_attractiveness_for_in_transfered_data()
    } else {
        data_asset.confidentiality.attacker_attractiveness_for_processed_or_stored_data() * quantity
            + data_asset.integrity.attacker_attractiveness_for_processed_or_stored_data() * quantity
            + data_asset.availability.attacker_attractiveness_for_processed_or_stored_data()
    }
}

/// Absolute attractiveness before normalisation; zero when out of scope
pub fn attacker_attractiveness(model: &ParsedModel, asset: &TechnicalAsset) -> f64 {
    if asset.out_of_scope {
        return 0.0;
    }
    let mut score = asset.highest_sensitivity_score();
    for id in asset.data_assets_processed.iter().chain(&asset.data_assets_stored) {
        if let Some(data_asset) = model.data_asset(id) {
            score += data_score(data_asset, false);
        }
    }
    for link in &asset.communication_links {
        for id in link.data_assets_sent.iter().chain(&link.data_assets_received) {
            if let Some(data_asset) = model.data_asset(id) {
                score += data_score(data_asset, true);
            }
        }
    }

    let technologies = &asset.technologies;
    if technologies.has_any_type(&[LOAD_BALANCER, REVERSE_PROXY]) {
        score /= 5.5;
    }
    if technologies.has_any_type(&[MONITORING]) {
        score /= 5.0;
    }
    if technologies.has_any_type(&[CONTAINER_PLATFORM]) {
        score *= 5.0;
    }
    if technologies.has_any_type(&[VAULT]) {
        score *= 2.0;
    }
    if technologies.has_any_type(&[BUILD_PIPELINE, SOURCECODE_REPOSITORY, ARTIFACT_REGISTRY]) {
        score *= 2.0;
    }
    if technologies.has_any_type(&[IDENTITY_PROVIDER]) || technologies.get_attribute(IDENTITY_STORE) {
        score *= 2.5;
    } else if asset.is_datastore() {
        score *= 2.0;
    }
    if asset.multi_tenant {
        score *= 1.5;
    }
    score
}

fn pivoting_adjustment(
    model: &ParsedModel,
    asset: &TechnicalAsset,
    absolute: &BTreeMap<&str, f64>,
    scale: &RelativeScale,
) -> f64 {
    if asset.out_of_scope {
        return 0.0;
    }
    let own = scale.relative(absolute.get(asset.id.as_str()).copied().unwrap_or(0.0));
    let mut adjustment: f64 = 0.0;
    for link in &asset.communication_links {
        let Some(neighbour) = model.technical_asset(&link.target_id) else {
            continue;
        };
        let theirs = scale.relative(absolute.get(neighbour.id.as_str()).copied().unwrap_or(0.0));
        let delta = theirs - own;
        if delta > 0.0 {
            adjustment = adjustment.max(delta / 3.0);
        }
    }
    adjustment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::models::{Confidentiality, Criticality, ModelInput, Protocol, Quantity};

    fn sample() -> ParsedModel {
        let mut input = ModelInput::default();
        let mut customers = data("customers", Confidentiality::StrictlyConfidential, Criticality::Critical);
        customers.quantity = Quantity::VeryMany;
        input.data_assets.push(customers);

        let mut db = datastore("db", &["database"]);
        db.confidentiality = Confidentiality::StrictlyConfidential;
        db.data_assets_stored.push("customers".into());
        input.technical_assets.push(db);

        let mut app = asset("app", &["web-server"]);
        app.communication_links.push(link("app>db", "db", Protocol::Jdbc));
        input.technical_assets.push(app);

        input.technical_assets.push(asset("idle", &["tool"]));
        let mut gone = asset("gone", &["tool"]);
        gone.out_of_scope = true;
        input.technical_assets.push(gone);
        build(input)
    }

    #[test]
    fn test_values_stay_within_range() {
        let model = sample();
        let values = calculate(&model);
        assert_eq!(values.len(), 4);
        for (id, value) in &values {
            assert!(*value >= 1.0 && *value <= 100.0, "{} out of range: {}", id, value);
        }
        assert_eq!(values["db"], 100.0, "most attractive asset should top the scale");
    }

    #[test]
    fn test_pivoting_raises_neighbours() {
        let model = sample();
        let values = calculate(&model);
        assert!(
            values["app"] > values["idle"],
            "app links to the database and should inherit attractiveness"
        );
    }

    #[test]
    fn test_out_of_scope_scores_zero() {
        let model = sample();
        assert_eq!(attacker_attractiveness(&model, &model.technical_assets["gone"]), 0.0);
    }

    #[test]
    fn test_apply_overwrites_model() {
        let mut model = sample();
        apply(&mut model);
        assert_eq!(model.technical_assets["db"].raa, 100.0);
        assert!(model.technical_assets["gone"].raa >= 1.0);
    }

    #[test]
    fn test_single_asset_scale() {
        let scale = RelativeScale::from_values([42.0].into_iter());
        assert_eq!(scale.relative(42.0), 1.0);
        assert_eq!(scale.relative(43.0), 100.0);
    }
}
