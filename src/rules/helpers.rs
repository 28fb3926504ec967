//! Rating ladders and category construction shared by the rule catalog

use crate::graph::{HighestRatings, ParsedModel};
use crate::models::{
    CommunicationLink, Confidentiality, Criticality, Impact, RiskCategory, RiskFunction, Stride,
    TechnicalAsset,
};

/// A confidentiality/integrity/availability triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratings {
    pub confidentiality: Confidentiality,
    pub integrity: Criticality,
    pub availability: Criticality,
}

impl Ratings {
    /// The asset's own ratings, ignoring its data
    pub fn own(asset: &TechnicalAsset) -> Self {
        Self {
            confidentiality: asset.confidentiality,
            integrity: asset.integrity,
            availability: asset.availability,
        }
    }

    /// Highest ratings over the asset and everything it processes or stores
    pub fn processed(model: &ParsedModel, asset: &TechnicalAsset) -> Self {
        Self {
            confidentiality: asset.highest_confidentiality(model),
            integrity: asset.highest_integrity(model),
            availability: asset.highest_availability(model),
        }
    }

    /// Highest ratings over the asset and the data it stores
    pub fn stored(model: &ParsedModel, asset: &TechnicalAsset) -> Self {
        Self {
            confidentiality: model.highest_stored_confidentiality(asset),
            integrity: model.highest_stored_integrity(asset),
            availability: model.highest_stored_availability(asset),
        }
    }

    /// Highest ratings over data sent and received on the link
    pub fn of_link(model: &ParsedModel, link: &CommunicationLink) -> Self {
        Self::of(model, link)
    }

    /// Roll-up of any rated entity, such as a trust boundary or shared runtime
    pub fn of<T: HighestRatings>(model: &ParsedModel, entity: &T) -> Self {
        Self {
            confidentiality: entity.highest_confidentiality(model),
            integrity: entity.highest_integrity(model),
            availability: entity.highest_availability(model),
        }
    }

    /// Confidential or better, or critical integrity/availability
    pub fn is_elevated(&self) -> bool {
        self.confidentiality >= Confidentiality::Confidential
            || self.integrity >= Criticality::Critical
            || self.availability >= Criticality::Critical
    }

    /// Any rating at the topmost tier
    pub fn is_top_tier(&self) -> bool {
        self.confidentiality == Confidentiality::StrictlyConfidential
            || self.integrity == Criticality::MissionCritical
            || self.availability == Criticality::MissionCritical
    }

    /// Top-tier confidentiality or integrity; availability does not count
    pub fn is_top_confidentiality_or_integrity(&self) -> bool {
        self.confidentiality == Confidentiality::StrictlyConfidential
            || self.integrity == Criticality::MissionCritical
    }

    /// Pick the impact tier: `top` beats `elevated` beats `base`
    pub fn ladder(&self, base: Impact, elevated: Impact, top: Impact) -> Impact {
        if self.is_top_tier() {
            top
        } else if self.is_elevated() {
            elevated
        } else {
            base
        }
    }

    /// Human-readable summary used in explanations
    pub fn describe(&self) -> String {
        format!(
            "confidentiality {}, integrity {}, availability {}",
            self.confidentiality, self.integrity, self.availability
        )
    }
}

/// One explanation step per rung of the impact ladder that applied
pub fn explain_ladder(subject: &str, ratings: &Ratings, impact: Impact) -> Vec<String> {
    let mut steps = vec![format!("{} is rated with {}", subject, ratings.describe())];
    if ratings.is_top_tier() {
        steps.push("at least one rating is at the topmost tier".to_string());
    } else if ratings.is_elevated() {
        steps.push(
            "confidentiality is at least confidential or integrity/availability at least critical"
                .to_string(),
        );
    } else {
        steps.push("no rating reaches the elevated tier".to_string());
    }
    steps.push(format!("resulting exploitation impact is {}", impact));
    steps
}

/// Static narrative of a built-in category
pub struct CategoryText {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub impact: &'static str,
    pub asvs: &'static str,
    pub cheat_sheet: &'static str,
    pub action: &'static str,
    pub mitigation: &'static str,
    pub check: &'static str,
    pub function: RiskFunction,
    pub stride: Stride,
    pub detection_logic: &'static str,
    pub risk_assessment: &'static str,
    pub false_positives: &'static str,
    pub model_failure_possible_reason: bool,
    pub cwe: u32,
}

impl From<CategoryText> for RiskCategory {
    fn from(text: CategoryText) -> Self {
        RiskCategory {
            id: text.id.to_string(),
            title: text.title.to_string(),
            description: text.description.to_string(),
            impact: text.impact.to_string(),
            asvs: text.asvs.to_string(),
            cheat_sheet: text.cheat_sheet.to_string(),
            action: text.action.to_string(),
            mitigation: text.mitigation.to_string(),
            check: text.check.to_string(),
            function: text.function,
            stride: text.stride,
            detection_logic: text.detection_logic.to_string(),
            risk_assessment: text.risk_assessment.to_string(),
            false_positives: text.false_positives.to_string(),
            model_failure_possible_reason: text.model_failure_possible_reason,
            cwe: text.cwe,
        }
    }
}

/// Declares a built-in rule struct holding its category, with `new()` and
/// `Default`
macro_rules! builtin_rule {
    ($(#[$meta:meta])* $name:ident, $text:expr) => {
        $(#[$meta])*
        pub struct $name {
            category: $crate::models::RiskCategory,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    category: $text.into(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

pub(crate) use builtin_rule;

/// Asset with the highest sensitivity score; the first in ID order wins ties
pub fn most_sensitive<'a>(assets: impl Iterator<Item = &'a TechnicalAsset>) -> Option<&'a TechnicalAsset> {
    let mut best: Option<&TechnicalAsset> = None;
    for asset in assets {
        match best {
            Some(current) if asset.highest_sensitivity_score() <= current.highest_sensitivity_score() => {}
            _ => best = Some(asset),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::models::ModelInput;

    fn ratings(c: Confidentiality, i: Criticality, a: Criticality) -> Ratings {
        Ratings {
            confidentiality: c,
            integrity: i,
            availability: a,
        }
    }

    #[test]
    fn test_ladder_tiers() {
        let low = ratings(Confidentiality::Internal, Criticality::Operational, Criticality::Operational);
        let elevated = ratings(Confidentiality::Internal, Criticality::Operational, Criticality::Critical);
        let top = ratings(Confidentiality::StrictlyConfidential, Criticality::Archive, Criticality::Archive);
        assert_eq!(low.ladder(Impact::Low, Impact::Medium, Impact::High), Impact::Low);
        assert_eq!(elevated.ladder(Impact::Low, Impact::Medium, Impact::High), Impact::Medium);
        assert_eq!(top.ladder(Impact::Low, Impact::Medium, Impact::High), Impact::High);
        assert!(!elevated.is_top_confidentiality_or_integrity());
    }

    #[test]
    fn test_processed_includes_data() {
        let mut input = ModelInput::default();
        input.data_assets.push(data("pii", Confidentiality::StrictlyConfidential, Criticality::Important));
        let mut a = asset("a", &["tool"]);
        a.data_assets_processed.push("pii".into());
        input.technical_assets.push(a);
        let model = build(input);
        let a = &model.technical_assets["a"];
        assert!(Ratings::processed(&model, a).is_top_tier());
        assert!(!Ratings::own(a).is_elevated());
        assert!(!Ratings::stored(&model, a).is_elevated(), "processed data is not stored data");
    }

    #[test]
    fn test_most_sensitive_keeps_first_on_tie() {
        let first = asset("a", &["tool"]);
        let second = asset("b", &["tool"]);
        let picked = most_sensitive([&first, &second].into_iter()).unwrap();
        assert_eq!(picked.id, "a");
    }

    #[test]
    fn test_explain_ladder_mentions_impact() {
        let top = ratings(Confidentiality::StrictlyConfidential, Criticality::Archive, Criticality::Archive);
        let steps = explain_ladder("asset X", &top, Impact::High);
        assert_eq!(steps.len(), 3);
        assert!(steps[2].contains("high"));
    }
}
