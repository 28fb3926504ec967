//! Rules about high-value assets sharing a network or runtime with weaker ones

use crate::errors::ThreatGraphResult;
use crate::graph::ParsedModel;
use crate::models::technology::*;
use crate::models::*;
use crate::rules::helpers::{builtin_rule, CategoryText, Ratings};
use crate::rules::RiskRule;

/// How close the nearest unrelated neighbour sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Proximity {
    SameNetwork,
    SameExecutionEnvironment,
}

impl Proximity {
    fn likelihood(self) -> Likelihood {
        match self {
            Proximity::SameNetwork => Likelihood::Unlikely,
            Proximity::SameExecutionEnvironment => Likelihood::Likely,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Proximity::SameNetwork => "<b>in the same network segment</b>",
            Proximity::SameExecutionEnvironment => "<b>in the same execution environment</b>",
        }
    }
}

/// Closest neighbour accepted by `unrelated`; an execution environment beats
/// a shared network
fn closest_unrelated<F>(model: &ParsedModel, asset: &TechnicalAsset, unrelated: F) -> Option<Proximity>
where
    F: Fn(&TechnicalAsset) -> bool,
{
    let mut closest = None;
    for other in model.technical_assets.values() {
        if other.id == asset.id || !unrelated(other) {
            continue;
        }
        if model.is_same_execution_environment(&asset.id, &other.id) {
            return Some(Proximity::SameExecutionEnvironment);
        }
        if model.is_same_trust_boundary_network_only(&asset.id, &other.id) {
            closest = Some(Proximity::SameNetwork);
        }
    }
    closest
}

builtin_rule!(
    MissingIdentityProviderIsolation,
    CategoryText {
        id: "missing-identity-provider-isolation",
        title: "Missing Identity Provider Isolation",
        description: "Highly sensitive identity provider assets and their identity datastores should be isolated from other assets \
            by their own network segmentation trust-boundary (execution-environment boundaries do not count as network isolation).",
        impact: "If this risk is unmitigated, attackers successfully attacking other components of the system might have an easy path towards \
            highly sensitive identity provider assets and their identity datastores, as they are not separated by network segmentation.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Network Segmentation",
        mitigation: "Apply a network segmentation trust-boundary around the highly sensitive identity provider assets and their identity datastores.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope identity provider assets and their identity datastores \
            when surrounded by other (not identity-related) assets (without a network trust-boundary in-between). \
            This risk is especially prevalent when other non-identity related assets are within the same execution environment (i.e. same database or same application server).",
        risk_assessment: "Default is high impact. The impact is increased to very-high when the asset missing the \
            trust-boundary protection is rated as strictly-confidential or mission-critical.",
        false_positives: "When all assets within the network segmentation trust-boundary are hardened and protected to the same extend as if all were \
            identity providers with data of highest sensitivity.",
        model_failure_possible_reason: false,
        cwe: 1008,
    }
);

impl RiskRule for MissingIdentityProviderIsolation {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if !asset.technologies.get_attribute(IDENTITY_RELATED) {
                continue;
            }
            let proximity = closest_unrelated(model, asset, |other| {
                !other
                    .technologies
                    .get_any_attribute(&[IDENTITY_RELATED, CLOSE_TO_HIGH_VALUE_TARGETS_TOLERATED])
            });
            let Some(proximity) = proximity else {
                continue;
            };
            let impact = if Ratings::own(asset).is_top_tier() { Impact::VeryHigh } else { Impact::High };
            let title = format!(
                "<b>Missing Identity Provider Isolation</b> to further encapsulate and protect identity-related asset <b>{}</b> \
                 against unrelated lower protected assets {}, which might be easier to compromise by attackers",
                asset.title,
                proximity.describe()
            );
            risks.push(
                Risk::new(&self.category, proximity.likelihood(), impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id]),
            );
        }
        Ok(risks)
    }
}

/// RAA from which a sensitive asset deserves its own segment
const SEGMENTATION_RAA_LIMIT: f64 = 50.0;

builtin_rule!(
    MissingNetworkSegmentation,
    CategoryText {
        id: "missing-network-segmentation",
        title: "Missing Network Segmentation",
        description: "Highly sensitive assets and/or datastores residing in the same network segment than other \
            lower sensitive assets (like webservers or content management systems etc.) should be better protected \
            by a network segmentation trust-boundary.",
        impact: "If this risk is unmitigated, attackers successfully attacking other components of the system might have an easy path towards \
            more valuable targets, as they are not separated by network segmentation.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Network Segmentation",
        mitigation: "Apply a network segmentation trust-boundary around the highly sensitive assets and/or datastores.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope technical assets with high sensitivity and RAA values as well as datastores \
            when surrounded by assets (without a network trust-boundary in-between) which are of type client-system, \
            web-server, web-application, cms, web-service-rest, web-service-soap, build-pipeline, sourcecode-repository, monitoring, \
            or similar and there is no direct connection between these (hence no requirement to be so close to each other).",
        risk_assessment: "Default is low risk. The risk is increased to medium when the asset missing the \
            trust-boundary protection is rated as strictly-confidential or mission-critical.",
        false_positives: "When all assets within the network segmentation trust-boundary are hardened and protected to the same extend as if all were \
            containing/processing highly sensitive data.",
        model_failure_possible_reason: false,
        cwe: 1008,
    }
);

impl MissingNetworkSegmentation {
    fn is_candidate(asset: &TechnicalAsset) -> bool {
        !asset.technologies.get_attribute(NO_NETWORK_SEGMENTATION_REQUIRED)
            && asset.raa >= SEGMENTATION_RAA_LIMIT
            && (asset.is_datastore() || Ratings::own(asset).is_elevated())
    }

    fn has_weaker_neighbour(model: &ParsedModel, asset: &TechnicalAsset) -> bool {
        model.technical_assets.values().any(|other| {
            other.id != asset.id
                && other.technologies.get_attribute(LESS_PROTECTED_TYPE)
                && !other.technologies.get_attribute(CLOSE_TO_HIGH_VALUE_TARGETS_TOLERATED)
                && model.is_same_trust_boundary_network_only(&asset.id, &other.id)
                && !model.has_direct_connection(&asset.id, &other.id)
        })
    }
}

impl RiskRule for MissingNetworkSegmentation {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        Ok(model
            .technical_assets_in_scope()
            .filter(|asset| Self::is_candidate(asset) && Self::has_weaker_neighbour(model, asset))
            .map(|asset| {
                let impact = if Ratings::own(asset).is_top_tier() { Impact::Medium } else { Impact::Low };
                let title = format!(
                    "<b>Missing Network Segmentation</b> to further encapsulate and protect <b>{}</b> against unrelated \
                     lower protected assets in the same network segment, which might be easier to compromise by attackers",
                    asset.title
                );
                Risk::new(&self.category, Likelihood::Unlikely, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id])
            })
            .collect())
    }
}

builtin_rule!(
    MissingVaultIsolation,
    CategoryText {
        id: "missing-vault-isolation",
        title: "Missing Vault Isolation",
        description: "Highly sensitive vault assets and their datastores should be isolated from other assets \
            by their own network segmentation trust-boundary (execution-environment boundaries do not count as network isolation).",
        impact: "If this risk is unmitigated, attackers successfully attacking other components of the system might have an easy path towards \
            highly sensitive vault assets and their datastores, as they are not separated by network segmentation.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Network Segmentation",
        mitigation: "Apply a network segmentation trust-boundary around the highly sensitive vault assets and their datastores.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope vault assets \
            when surrounded by other (not vault-related) assets (without a network trust-boundary in-between). \
            This risk is especially prevalent when other non-vault related assets are within the same execution environment (i.e. same database or same application server).",
        risk_assessment: "Default is medium impact. The impact is increased to high when the asset missing the \
            trust-boundary protection is rated as strictly-confidential or mission-critical.",
        false_positives: "When all assets within the network segmentation trust-boundary are hardened and protected to the same extend as if all were \
            vaults with data of highest sensitivity.",
        model_failure_possible_reason: false,
        cwe: 1008,
    }
);

impl RiskRule for MissingVaultIsolation {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for vault in model.technical_assets_in_scope() {
            if !vault.technologies.has_any_type(&[VAULT]) {
                continue;
            }
            let proximity = closest_unrelated(model, vault, |other| {
                // the vault's own storage backend is expected next to it
                let vault_storage = other.is_datastore() && model.has_direct_connection(&vault.id, &other.id);
                !other.technologies.has_any_type(&[VAULT]) && !vault_storage
            });
            let Some(proximity) = proximity else {
                continue;
            };
            let impact = if Ratings::own(vault).is_top_tier() { Impact::High } else { Impact::Medium };
            let title = format!(
                "<b>Missing Vault Isolation</b> to further encapsulate and protect vault-related asset <b>{}</b> \
                 against unrelated lower protected assets {}, which might be easier to compromise by attackers",
                vault.title,
                proximity.describe()
            );
            risks.push(
                Risk::new(&self.category, proximity.likelihood(), impact, title)
                    .with_technical_asset(&vault.id)
                    .with_data_breach(DataBreachProbability::Improbable, [vault.id.as_str()])
                    .with_synthetic_id(&[&vault.id]),
            );
        }
        Ok(risks)
    }
}

builtin_rule!(
    MixedTargetsOnSharedRuntime,
    CategoryText {
        id: "mixed-targets-on-shared-runtime",
        title: "Mixed Targets on Shared Runtime",
        description: "Different attacker targets (like frontend and backend/datastore components) should not be running on the same \
            shared (underlying) runtime.",
        impact: "If this risk is unmitigated, attackers successfully attacking other components of the system might have an easy path towards \
            more valuable targets, as they are running on the same shared runtime.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Runtime Separation",
        mitigation: "Use separate runtime environments for running different target components or apply similar separation styles to \
            prevent load- or breach-related problems originating from one more attacker-facing asset impacts also the \
            other more critical rated backend/datastore assets.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "Shared runtime running technical assets of different trust-boundaries is at risk. \
            Also mixing backend/datastore with frontend components on the same shared runtime is considered a risk.",
        risk_assessment: "The risk rating (low or medium) depends on the confidentiality, integrity, and availability rating of \
            the technical asset running on the shared runtime.",
        false_positives: "When all assets running on the shared runtime are hardened and protected to the same extend as if all were \
            containing/processing highly sensitive data.",
        model_failure_possible_reason: false,
        cwe: 1008,
    }
);

impl MixedTargetsOnSharedRuntime {
    /// Every technology carries `wanted` and none carries `other`
    fn exclusively(asset: &TechnicalAsset, wanted: &str, other: &str) -> bool {
        let technologies = &asset.technologies.0;
        !technologies.is_empty()
            && technologies
                .iter()
                .all(|technology| technology.get_attribute(wanted) && !technology.get_attribute(other))
    }

    fn is_mixed(model: &ParsedModel, runtime: &SharedRuntime) -> ThreatGraphResult<bool> {
        let mut boundary: Option<Option<&str>> = None;
        let (mut frontend, mut backend) = (false, false);
        for id in &runtime.technical_assets_running {
            let asset = model.require_technical_asset(id)?;
            let current = model.direct_trust_boundary(id).map(|b| b.id.as_str());
            match boundary {
                Some(previous) if previous != current => return Ok(true),
                _ => boundary = Some(current),
            }
            frontend |= Self::exclusively(asset, FRONTEND_RELATED, BACKEND_RELATED);
            backend |= Self::exclusively(asset, BACKEND_RELATED, FRONTEND_RELATED);
        }
        Ok(frontend && backend)
    }
}

impl RiskRule for MixedTargetsOnSharedRuntime {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for runtime in model.shared_runtimes.values() {
            if !Self::is_mixed(model, runtime)? {
                continue;
            }
            let mut impact = Impact::Low;
            for id in &runtime.technical_assets_running {
                if Ratings::own(model.require_technical_asset(id)?).is_top_tier() {
                    impact = Impact::Medium;
                }
            }
            let title = format!(
                "<b>Mixed Targets on Shared Runtime</b> named <b>{}</b> might enable attackers moving from one less \
                 valuable target to a more valuable one",
                runtime.title
            );
            risks.push(
                Risk::new(&self.category, Likelihood::Unlikely, impact, title)
                    .with_shared_runtime(&runtime.id)
                    .with_data_breach(DataBreachProbability::Improbable, runtime.technical_assets_running.iter().cloned())
                    .with_synthetic_id(&[&runtime.id]),
            );
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;

    #[test]
    fn test_identity_provider_proximity() {
        let mut input = ModelInput::default();
        input.technical_assets.push(asset("idp", &["identity-provider"]));
        input.technical_assets.push(asset("web", &["web-server"]));
        input.technical_assets.push(asset("lb", &["load-balancer"]));
        input.trust_boundaries.push(boundary("lan", TrustBoundaryType::NetworkOnPrem, &["idp", "web", "lb"], &[]));
        let model = build(input);
        let risks = MissingIdentityProviderIsolation::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].exploitation_likelihood, Likelihood::Unlikely);
        assert_eq!(risks[0].exploitation_impact, Impact::High);
        assert!(risks[0].title.contains("same network segment"));

        let mut input = ModelInput::default();
        input.technical_assets.push(asset("idp", &["identity-provider"]));
        input.technical_assets.push(asset("web", &["web-server"]));
        input.trust_boundaries.push(boundary("lan", TrustBoundaryType::NetworkOnPrem, &[], &["server"]));
        input.trust_boundaries.push(boundary("server", TrustBoundaryType::ExecutionEnvironment, &["idp", "web"], &[]));
        let model = build(input);
        let risks = MissingIdentityProviderIsolation::new().generate_risks(&model).unwrap();
        assert_eq!(risks[0].exploitation_likelihood, Likelihood::Likely);
    }

    #[test]
    fn test_identity_provider_alone_is_fine() {
        let mut input = ModelInput::default();
        input.technical_assets.push(asset("idp", &["identity-provider"]));
        input.technical_assets.push(datastore("ldap", &["identity-store-ldap"]));
        input.technical_assets.push(asset("web", &["web-server"]));
        input.trust_boundaries.push(boundary("identity", TrustBoundaryType::NetworkOnPrem, &["idp", "ldap"], &[]));
        input.trust_boundaries.push(boundary("dmz", TrustBoundaryType::NetworkOnPrem, &["web"], &[]));
        let model = build(input);
        assert!(MissingIdentityProviderIsolation::new().generate_risks(&model).unwrap().is_empty());
    }

    #[test]
    fn test_network_segmentation_needs_unconnected_weak_neighbour() {
        let mut input = ModelInput::default();
        let mut db = datastore("db", &["database"]);
        db.confidentiality = Confidentiality::StrictlyConfidential;
        input.technical_assets.push(db);
        input.technical_assets.push(asset("cms", &["cms"]));
        let mut app = asset("app", &["web-server"]);
        app.communication_links.push(link("app>db", "db", Protocol::Jdbc));
        input.technical_assets.push(app);
        input.trust_boundaries.push(boundary("lan", TrustBoundaryType::NetworkOnPrem, &["db", "cms", "app"], &[]));
        let mut model = build(input);
        let mut values = std::collections::BTreeMap::new();
        values.insert("db".to_string(), 80.0);
        model.set_raa(&values);

        let risks = MissingNetworkSegmentation::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1, "the unconnected cms is the weak neighbour");
        assert_eq!(risks[0].synthetic_id, "missing-network-segmentation@db");
        assert_eq!(risks[0].exploitation_impact, Impact::Medium);
    }

    #[test]
    fn test_vault_storage_is_not_a_neighbour() {
        let mut input = ModelInput::default();
        let mut vault = asset("vault", &["vault"]);
        vault.communication_links.push(link("vault>store", "store", Protocol::Jdbc));
        input.technical_assets.push(vault);
        input.technical_assets.push(datastore("store", &["database"]));
        input.trust_boundaries.push(boundary("secrets", TrustBoundaryType::NetworkOnPrem, &["vault", "store"], &[]));
        input.technical_assets.push(asset("web", &["web-server"]));
        input.trust_boundaries.push(boundary("dmz", TrustBoundaryType::NetworkOnPrem, &["web"], &[]));
        let model = build(input);
        assert!(MissingVaultIsolation::new().generate_risks(&model).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_targets_on_shared_runtime() {
        let mut input = ModelInput::default();
        input.technical_assets.push(asset("browser", &["browser"]));
        input.technical_assets.push(datastore("db", &["database"]));
        input.technical_assets.push(asset("tool", &["tool"]));
        input.shared_runtimes.push(runtime("mixed", &["browser", "db"]));
        input.shared_runtimes.push(runtime("uniform", &["tool", "browser"]));
        let model = build(input);
        let risks = MixedTargetsOnSharedRuntime::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].synthetic_id, "mixed-targets-on-shared-runtime@mixed");
        assert_eq!(risks[0].most_relevant_shared_runtime_id, "mixed");
        assert_eq!(risks[0].data_breach_technical_asset_ids, vec!["browser", "db"]);
    }
}
