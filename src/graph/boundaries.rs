//! Trust-boundary ancestry and co-location checks

use super::ParsedModel;
use crate::models::{CommunicationLink, TrustBoundary, TrustBoundaryType};
use std::collections::HashSet;

impl ParsedModel {
    /// Boundary that lists the asset directly
    pub fn direct_trust_boundary(&self, asset_id: &str) -> Option<&TrustBoundary> {
        self.direct_trust_boundary
            .get(asset_id)
            .and_then(|id| self.trust_boundaries.get(id))
    }

    /// Boundary that nests the given boundary
    pub fn parent_trust_boundary(&self, boundary_id: &str) -> Option<&TrustBoundary> {
        self.parent_trust_boundary
            .get(boundary_id)
            .and_then(|id| self.trust_boundaries.get(id))
    }

    /// The boundary itself followed by all of its ancestors, innermost first
    pub fn all_parent_trust_boundary_ids(&self, boundary_id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut current = self.trust_boundaries.get(boundary_id);
        while let Some(boundary) = current {
            if result.contains(&boundary.id) {
                break;
            }
            result.push(boundary.id.clone());
            current = self.parent_trust_boundary(&boundary.id);
        }
        result
    }

    /// Assets inside a boundary and, depth-first, inside its nested boundaries
    pub fn recursively_contained_assets(&self, boundary_id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        self.collect_contained_assets(boundary_id, &mut result, &mut visited);
        result
    }

    fn collect_contained_assets<'a>(
        &'a self,
        boundary_id: &'a str,
        result: &mut Vec<String>,
        visited: &mut HashSet<&'a str>,
    ) {
        if !visited.insert(boundary_id) {
            return;
        }
        let Some(boundary) = self.trust_boundaries.get(boundary_id) else {
            return;
        };
        result.extend(boundary.technical_assets_inside.iter().cloned());
        for nested in &boundary.trust_boundaries_nested {
            self.collect_contained_assets(nested, result, visited);
        }
    }

    /// Nearest network-type boundary around the asset, walking up through
    /// execution environments
    pub fn network_trust_boundary(&self, asset_id: &str) -> Option<&TrustBoundary> {
        let mut current = self.direct_trust_boundary(asset_id);
        let mut hops = 0;
        while let Some(boundary) = current {
            if boundary.boundary_type.is_network_boundary() {
                return Some(boundary);
            }
            hops += 1;
            if hops > self.trust_boundaries.len() {
                return None;
            }
            current = self.parent_trust_boundary(&boundary.id);
        }
        None
    }

    /// True only when both ends sit in network boundaries and those differ.
    /// Missing boundary information never counts as isolation.
    pub fn is_across_trust_boundary_network_only(&self, link: &CommunicationLink) -> bool {
        match (
            self.network_trust_boundary(&link.source_id),
            self.network_trust_boundary(&link.target_id),
        ) {
            (Some(source), Some(target)) => source.id != target.id,
            _ => false,
        }
    }

    /// Both assets directly inside the same execution-environment boundary
    pub fn is_same_execution_environment(&self, asset_id: &str, other_id: &str) -> bool {
        match (
            self.direct_trust_boundary(asset_id),
            self.direct_trust_boundary(other_id),
        ) {
            (Some(left), Some(right)) => {
                left.boundary_type == TrustBoundaryType::ExecutionEnvironment
                    && right.boundary_type == TrustBoundaryType::ExecutionEnvironment
                    && left.id == right.id
            }
            _ => false,
        }
    }

    /// Both assets resolve to the same network boundary. Two assets outside
    /// every boundary share the flat network.
    pub fn is_same_trust_boundary_network_only(&self, asset_id: &str, other_id: &str) -> bool {
        match (
            self.network_trust_boundary(asset_id),
            self.network_trust_boundary(other_id),
        ) {
            (None, None) => true,
            (Some(left), Some(right)) => left.id == right.id,
            _ => false,
        }
    }

    /// Both assets share their direct boundary or any ancestor of it
    pub fn is_sharing_same_parent_trust_boundary(&self, asset_id: &str, other_id: &str) -> bool {
        match (
            self.direct_trust_boundary(asset_id),
            self.direct_trust_boundary(other_id),
        ) {
            (None, None) => true,
            (Some(left), Some(right)) => {
                if left.id == right.id {
                    return true;
                }
                let right_ids = self.all_parent_trust_boundary_ids(&right.id);
                self.all_parent_trust_boundary_ids(&left.id)
                    .iter()
                    .any(|id| right_ids.contains(id))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::models::{ModelInput, Protocol};

    // cloud > (vpc-a > exec-a), vpc-b ; lonely outside everything
    fn forest() -> ParsedModel {
        let mut input = ModelInput::default();
        for id in ["a1", "a2", "b1", "c1", "lonely", "other"] {
            input.technical_assets.push(asset(id, &["tool"]));
        }
        if let Some(a1) = input.technical_assets.iter_mut().find(|a| a.id == "a1") {
            a1.communication_links.push(link("a1>b1", "b1", Protocol::Https));
            a1.communication_links.push(link("a1>a2", "a2", Protocol::Https));
            a1.communication_links.push(link("a1>lonely", "lonely", Protocol::Https));
        }
        input.trust_boundaries.push(boundary("cloud", TrustBoundaryType::NetworkCloudProvider, &["c1"], &["vpc-a", "vpc-b"]));
        input.trust_boundaries.push(boundary("vpc-a", TrustBoundaryType::NetworkVirtualLan, &[], &["exec-a"]));
        input.trust_boundaries.push(boundary("exec-a", TrustBoundaryType::ExecutionEnvironment, &["a1", "a2"], &[]));
        input.trust_boundaries.push(boundary("vpc-b", TrustBoundaryType::NetworkVirtualLan, &["b1"], &[]));
        build(input)
    }

    #[test]
    fn test_recursive_containment_is_superset_of_direct() {
        let model = forest();
        let all = model.recursively_contained_assets("cloud");
        assert_eq!(all, vec!["c1", "a1", "a2", "b1"]);
        for boundary in model.trust_boundaries.values() {
            let contained = model.recursively_contained_assets(&boundary.id);
            for id in &boundary.technical_assets_inside {
                assert!(contained.contains(id));
                assert_eq!(model.direct_trust_boundary(id).map(|b| b.id.as_str()), Some(boundary.id.as_str()));
            }
        }
    }

    #[test]
    fn test_parent_chain() {
        let model = forest();
        assert_eq!(model.all_parent_trust_boundary_ids("exec-a"), vec!["exec-a", "vpc-a", "cloud"]);
        assert!(model.parent_trust_boundary("cloud").is_none());
        assert_eq!(model.network_trust_boundary("a1").map(|b| b.id.as_str()), Some("vpc-a"));
    }

    #[test]
    fn test_across_network_boundary() {
        let model = forest();
        assert!(model.is_across_trust_boundary_network_only(&model.communication_links["a1>b1"]));
        assert!(!model.is_across_trust_boundary_network_only(&model.communication_links["a1>a2"]));
        assert!(
            !model.is_across_trust_boundary_network_only(&model.communication_links["a1>lonely"]),
            "missing boundary must not count as isolation"
        );
    }

    #[test]
    fn test_co_location_checks() {
        let model = forest();
        assert!(model.is_same_execution_environment("a1", "a2"));
        assert!(!model.is_same_execution_environment("a1", "b1"));
        assert!(model.is_same_trust_boundary_network_only("a1", "a2"));
        assert!(!model.is_same_trust_boundary_network_only("a1", "b1"));
        assert!(model.is_same_trust_boundary_network_only("lonely", "other"));
        assert!(!model.is_same_trust_boundary_network_only("lonely", "a1"));
    }

    #[test]
    fn test_sharing_parent_boundary() {
        let model = forest();
        assert!(model.is_sharing_same_parent_trust_boundary("a1", "b1"), "cloud is a common ancestor");
        assert!(model.is_sharing_same_parent_trust_boundary("lonely", "other"));
        assert!(!model.is_sharing_same_parent_trust_boundary("lonely", "a1"));
    }
}
