//! Tag matching
//!
//! Tags compare case-insensitively after trimming. A base tag such as `aws`
//! also matches its sub-tags (`aws:ec2`).

use super::ParsedModel;
use crate::models::{CommunicationLink, DataAsset, SharedRuntime, TechnicalAsset, TrustBoundary};

fn normalize(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Entities that carry free-form tags
pub trait Tagged {
    fn tags(&self) -> &[String];

    fn is_tagged_with_any(&self, wanted: &[&str]) -> bool {
        self.tags()
            .iter()
            .any(|tag| wanted.iter().any(|w| normalize(tag) == normalize(w)))
    }

    fn is_tagged_with_base_tag(&self, base_tag: &str) -> bool {
        let base = normalize(base_tag);
        let prefix = format!("{}:", base);
        self.tags().iter().any(|tag| {
            let tag = normalize(tag);
            tag == base || tag.starts_with(&prefix)
        })
    }
}

macro_rules! impl_tagged {
    ($($entity:ty),+) => {
        $(impl Tagged for $entity {
            fn tags(&self) -> &[String] {
                &self.tags
            }
        })+
    };
}

impl_tagged!(TechnicalAsset, DataAsset, CommunicationLink, TrustBoundary, SharedRuntime);

/// A bare tag list, for rules that test an asset against a boundary's tags
impl Tagged for [String] {
    fn tags(&self) -> &[String] {
        self
    }
}

impl ParsedModel {
    /// Tagged on the asset itself, on any enclosing boundary, or on a shared
    /// runtime running it
    pub fn is_tagged_with_any_traversing_up(&self, asset: &TechnicalAsset, wanted: &[&str]) -> bool {
        if asset.is_tagged_with_any(wanted) {
            return true;
        }
        if let Some(direct) = self.direct_trust_boundary(&asset.id) {
            let tagged_boundary = self
                .all_parent_trust_boundary_ids(&direct.id)
                .iter()
                .filter_map(|id| self.trust_boundaries.get(id))
                .any(|boundary| boundary.is_tagged_with_any(wanted));
            if tagged_boundary {
                return true;
            }
        }
        self.shared_runtimes_running(&asset.id)
            .iter()
            .any(|runtime| runtime.is_tagged_with_any(wanted))
    }

    pub fn technical_assets_tagged_with_any(&self, wanted: &[&str]) -> Vec<&TechnicalAsset> {
        self.technical_assets
            .values()
            .filter(|asset| asset.is_tagged_with_any(wanted))
            .collect()
    }

    pub fn trust_boundaries_tagged_with_any(&self, wanted: &[&str]) -> Vec<&TrustBoundary> {
        self.trust_boundaries
            .values()
            .filter(|boundary| boundary.is_tagged_with_any(wanted))
            .collect()
    }

    pub fn shared_runtimes_tagged_with_any(&self, wanted: &[&str]) -> Vec<&SharedRuntime> {
        self.shared_runtimes
            .values()
            .filter(|runtime| runtime.is_tagged_with_any(wanted))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::models::{ModelInput, TrustBoundaryType};

    #[test]
    fn test_case_insensitive_and_base_tags() {
        let mut a = asset("a", &["tool"]);
        a.tags = vec![" AWS:EC2 ".into(), "Git".into()];
        assert!(a.is_tagged_with_any(&["git"]));
        assert!(!a.is_tagged_with_any(&["aws"]));
        assert!(a.is_tagged_with_base_tag("aws"));
        assert!(!a.is_tagged_with_base_tag("aw"));
    }

    #[test]
    fn test_traversing_up() {
        let mut input = ModelInput::default();
        input.technical_assets.push(asset("inner", &["tool"]));
        input.technical_assets.push(asset("shared", &["tool"]));
        input.technical_assets.push(asset("plain", &["tool"]));
        let mut outer = boundary("outer", TrustBoundaryType::NetworkCloudProvider, &[], &["vlan"]);
        outer.tags = vec!["azure".into()];
        input.trust_boundaries.push(outer);
        input.trust_boundaries.push(boundary("vlan", TrustBoundaryType::NetworkVirtualLan, &["inner"], &[]));
        let mut rt = runtime("k8s", &["shared"]);
        rt.tags = vec!["gcp".into()];
        input.shared_runtimes.push(rt);
        let model = build(input);

        let inner = &model.technical_assets["inner"];
        assert!(model.is_tagged_with_any_traversing_up(inner, &["azure"]));
        let shared = &model.technical_assets["shared"];
        assert!(model.is_tagged_with_any_traversing_up(shared, &["gcp"]));
        let plain = &model.technical_assets["plain"];
        assert!(!model.is_tagged_with_any_traversing_up(plain, &["azure", "gcp"]));
        assert_eq!(model.trust_boundaries_tagged_with_any(&["AZURE"]).len(), 1);
        assert_eq!(model.shared_runtimes_tagged_with_any(&["gcp"]).len(), 1);
    }
}
