//! Model consistency rules
//!
//! These never describe an attack. They point at places where the model is
//! probably wrong or unfinished, always at low severity and always flagged as
//! a possible model failure so reports can separate them from real findings.

use std::collections::BTreeSet;

use crate::errors::ThreatGraphResult;
use crate::graph::ParsedModel;
use crate::models::technology::*;
use crate::models::*;
use crate::rules::helpers::{builtin_rule, CategoryText};
use crate::rules::RiskRule;

/// Every hygiene finding shares the same rating
fn hygiene_risk(category: &RiskCategory, title: String) -> Risk {
    Risk::new(category, Likelihood::Unlikely, Impact::Low, title)
}

builtin_rule!(
    IncompleteModel,
    CategoryText {
        id: "incomplete-model",
        title: "Incomplete Model",
        description: "When the threat model contains unknown technologies or transfers data over unknown protocols, this is \
            an indicator for an incomplete model.",
        impact: "If this risk is unmitigated, other risks might not be noticed as the model is incomplete.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Threat_Modeling_Cheat_Sheet.html",
        action: "Threat Modeling Completeness",
        mitigation: "Try to find out what technology or protocol is used instead of specifying that it is unknown.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::InformationDisclosure,
        detection_logic: "All technical assets and communication links with technology type or protocol type specified as unknown.",
        risk_assessment: "low",
        false_positives: "Usually no false positives as this looks like an incomplete model.",
        model_failure_possible_reason: true,
        cwe: 1008,
    }
);

impl RiskRule for IncompleteModel {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if asset.technologies.is_unknown() {
                let title = format!("<b>Unknown Technology</b> specified at technical asset <b>{}</b>", asset.title);
                risks.push(
                    hygiene_risk(&self.category, title)
                        .with_technical_asset(&asset.id)
                        .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                        .with_synthetic_id(&[&asset.id]),
                );
            }
            for link in model.outgoing_links(&asset.id) {
                if link.protocol != Protocol::UnknownProtocol {
                    continue;
                }
                let title = format!(
                    "<b>Unknown Protocol</b> specified for communication link <b>{}</b> at technical asset <b>{}</b>",
                    link.title, asset.title
                );
                risks.push(
                    hygiene_risk(&self.category, title)
                        .with_technical_asset(&asset.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                        .with_synthetic_id(&[&link.id, &asset.id]),
                );
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    UnnecessaryCommunicationLink,
    CategoryText {
        id: "unnecessary-communication-link",
        title: "Unnecessary Communication Link",
        description: "When a technical communication link does not send or receive any data assets, this is \
            an indicator for an unnecessary communication link (or for an incomplete model).",
        impact: "If this risk is unmitigated, attackers might be able to target unnecessary communication links.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Attack Surface Reduction",
        mitigation: "Try to avoid using technical communication links that do not send or receive anything.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope technical assets' technical communication links not sending or receiving any data assets.",
        risk_assessment: "low",
        false_positives: "Usually no false positives as this looks like an incomplete model.",
        model_failure_possible_reason: true,
        cwe: 1008,
    }
);

impl RiskRule for UnnecessaryCommunicationLink {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets.values() {
            for link in model.outgoing_links(&asset.id) {
                if link.transfers_data() {
                    continue;
                }
                let target = model.link_target(link)?;
                if asset.out_of_scope && target.out_of_scope {
                    continue;
                }
                let title = format!(
                    "<b>Unnecessary Communication Link</b> titled <b>{}</b> at technical asset <b>{}</b>",
                    link.title, asset.title
                );
                risks.push(
                    hygiene_risk(&self.category, title)
                        .with_technical_asset(&asset.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                        .with_synthetic_id(&[&link.id, &asset.id]),
                );
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    UnnecessaryDataAsset,
    CategoryText {
        id: "unnecessary-data-asset",
        title: "Unnecessary Data Asset",
        description: "When a data asset is not processed or stored by any data assets and also not transferred by any \
            communication links, this is an indicator for an unnecessary data asset (or for an incomplete model).",
        impact: "If this risk is unmitigated, attackers might be able to access unnecessary data assets using \
            other vulnerabilities.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Attack Surface Reduction",
        mitigation: "Try to avoid having data assets that are not required/used.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "Modelled data assets not processed or stored by any data assets and also not transferred by any \
            communication links.",
        risk_assessment: "low",
        false_positives: "Usually no false positives as this looks like an incomplete model.",
        model_failure_possible_reason: true,
        cwe: 1008,
    }
);

impl RiskRule for UnnecessaryDataAsset {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        Ok(model
            .data_assets
            .values()
            .filter(|data| !model.is_data_asset_referenced(&data.id))
            .map(|data| {
                // no technical asset holds it, so the breach list stays empty
                hygiene_risk(&self.category, format!("<b>Unnecessary Data Asset</b> named <b>{}</b>", data.title))
                    .with_data_asset(&data.id)
                    .with_data_breach(DataBreachProbability::Improbable, Vec::<String>::new())
                    .with_synthetic_id(&[&data.id])
            })
            .collect())
    }
}

builtin_rule!(
    UnnecessaryDataTransfer,
    CategoryText {
        id: "unnecessary-data-transfer",
        title: "Unnecessary Data Transfer",
        description: "When a technical asset sends or receives data assets, which it neither processes or stores this is \
            an indicator for unnecessarily transferred data (or for an incomplete model). When the unnecessarily \
            transferred data assets are sensitive, this poses an unnecessary risk of an increased attack surface.",
        impact: "If this risk is unmitigated, attackers might be able to target unnecessarily transferred data.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Attack Surface Reduction",
        mitigation: "Try to avoid sending or receiving sensitive data assets which are not required (i.e. neither \
            processed or stored) by the involved technical asset.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope technical assets sending or receiving sensitive data assets which are neither processed nor \
            stored by the technical asset are flagged with this risk. The risk rating (low or medium) depends on the \
            confidentiality, integrity, and availability rating of the technical asset. Monitoring data is exempted from this risk.",
        risk_assessment: "The risk assessment is depending on the confidentiality and integrity rating of the transferred data asset \
            either low or medium.",
        false_positives: "Technical assets missing the model entries of either processing or storing the mentioned data assets \
            can be considered as false positives (incomplete models) after individual review. These should then be addressed by \
            completing the model so that all necessary data assets are processed and/or stored by the technical asset involved.",
        model_failure_possible_reason: true,
        cwe: 1008,
    }
);

impl UnnecessaryDataTransfer {
    fn check_flow(
        &self,
        model: &ParsedModel,
        asset: &TechnicalAsset,
        link: &CommunicationLink,
        partner: &TechnicalAsset,
        seen: &mut BTreeSet<String>,
        risks: &mut Vec<Risk>,
    ) {
        let transferred = model
            .data_assets_sent(link)
            .into_iter()
            .chain(model.data_assets_received(link));
        for data in transferred {
            if asset.processes_or_stores_data_asset(&data.id) {
                continue;
            }
            if data.confidentiality < Confidentiality::Confidential && data.integrity < Criticality::Critical {
                continue;
            }
            let risk = self.transfer_risk(asset, data, partner);
            if seen.insert(risk.synthetic_id.clone()) {
                risks.push(risk);
            }
        }
    }

    fn transfer_risk(&self, asset: &TechnicalAsset, data: &DataAsset, partner: &TechnicalAsset) -> Risk {
        let more_risky = data.confidentiality == Confidentiality::StrictlyConfidential
            || data.integrity == Criticality::MissionCritical;
        let impact = if more_risky { Impact::Medium } else { Impact::Low };
        let title = format!(
            "<b>Unnecessary Data Transfer</b> of <b>{}</b> data at <b>{}</b> from/to <b>{}</b>",
            data.title, asset.title, partner.title
        );
        Risk::new(&self.category, Likelihood::Unlikely, impact, title)
            .with_technical_asset(&asset.id)
            .with_data_asset(&data.id)
            .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
            .with_synthetic_id(&[&data.id, &asset.id, &partner.id])
    }
}

impl RiskRule for UnnecessaryDataTransfer {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        let mut seen = BTreeSet::new();
        for asset in model.technical_assets_in_scope() {
            for link in model.outgoing_links(&asset.id) {
                let target = model.link_target(link)?;
                if !target.technologies.get_attribute(UNNECESSARY_DATA_TOLERATED) {
                    self.check_flow(model, asset, link, target, &mut seen, &mut risks);
                }
            }
            for link in model.incoming_links(&asset.id) {
                let source = model.link_source(link)?;
                if !source.technologies.get_attribute(UNNECESSARY_DATA_TOLERATED) {
                    self.check_flow(model, asset, link, source, &mut seen, &mut risks);
                }
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    UnnecessaryTechnicalAsset,
    CategoryText {
        id: "unnecessary-technical-asset",
        title: "Unnecessary Technical Asset",
        description: "When a technical asset does not process or store any data assets, this is \
            an indicator for an unnecessary technical asset (or for an incomplete model). \
            This is also the case if the asset has no communication links (either outgoing or incoming).",
        impact: "If this risk is unmitigated, attackers might be able to target unnecessary technical assets.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Attack Surface Reduction",
        mitigation: "Try to avoid using technical assets that do not process or store anything.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "Technical assets not processing or storing any data assets.",
        risk_assessment: "low",
        false_positives: "Usually no false positives as this looks like an incomplete model.",
        model_failure_possible_reason: true,
        cwe: 1008,
    }
);

impl RiskRule for UnnecessaryTechnicalAsset {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        Ok(model
            .technical_assets
            .values()
            .filter(|asset| {
                let holds_nothing = asset.data_assets_processed.is_empty() && asset.data_assets_stored.is_empty();
                let unconnected =
                    model.outgoing_links(&asset.id).is_empty() && model.incoming_links(&asset.id).is_empty();
                holds_nothing || unconnected
            })
            .map(|asset| {
                hygiene_risk(&self.category, format!("<b>Unnecessary Technical Asset</b> named <b>{}</b>", asset.title))
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id])
            })
            .collect())
    }
}

builtin_rule!(
    WrongCommunicationLinkContent,
    CategoryText {
        id: "wrong-communication-link-content",
        title: "Wrong Communication Link Content",
        description: "When a communication link is defined as readonly, but does not receive any data asset, \
            or when it is defined as not readonly, but does not send any data asset, it is likely to be a model failure.",
        impact: "If this potential model error is not fixed, some risks might not be visible.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Threat_Modeling_Cheat_Sheet.html",
        action: "Model Consistency",
        mitigation: "Try to model the correct readonly flag and/or data sent/received of communication links. \
            Also try to use communication link types matching the target technology/machine types.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::InformationDisclosure,
        detection_logic: "Communication links with inconsistent data assets being sent/received not matching their readonly flag \
            or otherwise inconsistent protocols not matching the target technology type.",
        risk_assessment: "low",
        false_positives: "Usually no false positives as this looks like an incomplete model.",
        model_failure_possible_reason: true,
        cwe: 1008,
    }
);

impl WrongCommunicationLinkContent {
    /// Reasons the link contradicts its own flags or its target
    fn inconsistencies(link: &CommunicationLink, target: &TechnicalAsset) -> Vec<String> {
        let mut reasons = Vec::new();
        let flag_mismatch = if link.readonly {
            link.data_assets_received.is_empty()
        } else {
            link.data_assets_sent.is_empty()
        };
        if flag_mismatch {
            reasons.push("(data assets sent/received not matching the communication link's readonly flag)".to_string());
        }

        let technology = target.technologies.names().join(", ");
        let expected_technology = match link.protocol {
            Protocol::InProcessLibraryCall => Some(LIBRARY),
            Protocol::LocalFileAccess => Some(LOCAL_FILE_SYSTEM),
            _ => None,
        };
        if let Some(expected) = expected_technology {
            if !target.technologies.has_any_type(&[expected]) {
                reasons.push(format!(
                    "(protocol type \"{}\" does not match target technology type \"{}\": expected \"{}\")",
                    link.protocol, technology, expected
                ));
            }
        }
        if link.protocol == Protocol::ContainerSpawning && target.machine != Machine::Container {
            reasons.push(format!(
                "(protocol type \"{}\" does not match target machine type \"{}\": expected \"{}\")",
                link.protocol,
                target.machine,
                Machine::Container
            ));
        }
        reasons
    }
}

impl RiskRule for WrongCommunicationLinkContent {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets.values() {
            for link in model.outgoing_links(&asset.id) {
                let target = model.link_target(link)?;
                for (index, reason) in Self::inconsistencies(link, target).into_iter().enumerate() {
                    let title = format!(
                        "<b>Wrong Communication Link Content</b> {} at <b>{}</b> regarding communication link <b>{}</b>",
                        reason, asset.title, link.title
                    );
                    // a link can be wrong in several ways at once
                    let ordinal = if index == 0 { String::new() } else { index.to_string() };
                    risks.push(
                        hygiene_risk(&self.category, title)
                            .with_technical_asset(&asset.id)
                            .with_communication_link(&link.id)
                            .with_data_breach(DataBreachProbability::Improbable, Vec::<String>::new())
                            .with_synthetic_id(&[&asset.id, &link.id, &ordinal]),
                    );
                }
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    WrongTrustBoundaryContent,
    CategoryText {
        id: "wrong-trust-boundary-content",
        title: "Wrong Trust Boundary Content",
        description: "When a trust boundary of type network-policy-namespace-isolation contains \
            non-container assets it is likely to be a model failure.",
        impact: "If this potential model error is not fixed, some risks might not be visible.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Threat_Modeling_Cheat_Sheet.html",
        action: "Model Consistency",
        mitigation: "Try to model the correct types of trust boundaries and data assets.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "Trust boundaries which should only contain containers, but have different assets inside.",
        risk_assessment: "low",
        false_positives: "Usually no false positives as this looks like an incomplete model.",
        model_failure_possible_reason: true,
        cwe: 1008,
    }
);

impl RiskRule for WrongTrustBoundaryContent {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for boundary in model.trust_boundaries.values() {
            if boundary.boundary_type != TrustBoundaryType::NetworkPolicyNamespaceIsolation {
                continue;
            }
            for id in &boundary.technical_assets_inside {
                let asset = model.require_technical_asset(id)?;
                if matches!(asset.machine, Machine::Container | Machine::Serverless) {
                    continue;
                }
                let title = format!(
                    "<b>Wrong Trust Boundary Content</b> (non-container asset inside container trust boundary) at <b>{}</b>",
                    asset.title
                );
                risks.push(
                    hygiene_risk(&self.category, title)
                        .with_technical_asset(&asset.id)
                        .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                        .with_synthetic_id(&[&asset.id]),
                );
            }
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;

    fn connected_pair() -> ModelInput {
        let mut input = ModelInput::default();
        input.data_assets.push(data("orders", Confidentiality::Confidential, Criticality::Important));
        input.data_assets.push(data("secrets", Confidentiality::StrictlyConfidential, Criticality::Important));
        input.data_assets.push(data("orphan", Confidentiality::Public, Criticality::Archive));
        let mut app = asset("app", &["web-server"]);
        app.data_assets_processed = vec!["orders".into()];
        let mut to_db = link("app>db", "db", Protocol::Jdbc);
        to_db.data_assets_sent = vec!["orders".into(), "secrets".into()];
        app.communication_links.push(to_db);
        input.technical_assets.push(app);
        let mut db = datastore("db", &["database"]);
        db.data_assets_stored = vec!["orders".into()];
        input.technical_assets.push(db);
        input
    }

    #[test]
    fn test_hygiene_rules_are_low_and_flag_model_failure() {
        for rule in [
            Box::new(IncompleteModel::new()) as Box<dyn RiskRule>,
            Box::new(UnnecessaryCommunicationLink::new()),
            Box::new(UnnecessaryDataAsset::new()),
            Box::new(UnnecessaryTechnicalAsset::new()),
            Box::new(WrongCommunicationLinkContent::new()),
            Box::new(WrongTrustBoundaryContent::new()),
        ] {
            assert!(rule.category().model_failure_possible_reason, "{}", rule.category().id);
        }
        let mut input = connected_pair();
        input.technical_assets.push(asset("mystery", &[]));
        let model = build(input);
        let risks = IncompleteModel::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].synthetic_id, "incomplete-model@mystery");
        assert_eq!(risks[0].severity, Severity::Low);
    }

    #[test]
    fn test_unknown_protocol() {
        let mut input = connected_pair();
        input.technical_assets[0]
            .communication_links
            .push(link("app>db2", "db", Protocol::UnknownProtocol));
        let model = build(input);
        let risks = IncompleteModel::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].synthetic_id, "incomplete-model@app>db2@app");
        assert_eq!(risks[0].most_relevant_communication_link_id, "app>db2");
    }

    #[test]
    fn test_unused_data_asset() {
        let model = build(connected_pair());
        let risks = UnnecessaryDataAsset::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].synthetic_id, "unnecessary-data-asset@orphan");
        assert!(risks[0].data_breach_technical_asset_ids.is_empty());
    }

    #[test]
    fn test_unnecessary_data_transfer() {
        let model = build(connected_pair());
        let risks = UnnecessaryDataTransfer::new().generate_risks(&model).unwrap();
        let ids: Vec<_> = risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "unnecessary-data-transfer@secrets@app@db",
                "unnecessary-data-transfer@secrets@db@app",
            ]
        );
        assert!(risks.iter().all(|r| r.exploitation_impact == Impact::Medium));
    }

    #[test]
    fn test_unnecessary_link_and_asset() {
        let mut input = connected_pair();
        let mut idle = asset("idle", &["tool"]);
        idle.data_assets_processed = vec!["orders".into()];
        input.technical_assets.push(idle);
        input.technical_assets[0]
            .communication_links
            .push(link("app>idle", "idle", Protocol::Https));
        let model = build(input);

        let links = UnnecessaryCommunicationLink::new().generate_risks(&model).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].synthetic_id, "unnecessary-communication-link@app>idle@app");

        let assets = UnnecessaryTechnicalAsset::new().generate_risks(&model).unwrap();
        assert!(assets.is_empty(), "every asset holds data and has a link");
    }

    #[test]
    fn test_wrong_link_content() {
        let mut input = connected_pair();
        input.technical_assets.push(asset("lib", &["library"]));
        let mut call = link("app>lib", "lib", Protocol::InProcessLibraryCall);
        call.data_assets_sent = vec!["orders".into()];
        input.technical_assets[0].communication_links.push(call);
        let mut spawn = link("app>db-spawn", "db", Protocol::ContainerSpawning);
        spawn.readonly = true;
        input.technical_assets[0].communication_links.push(spawn);
        let model = build(input);

        let risks = WrongCommunicationLinkContent::new().generate_risks(&model).unwrap();
        let ids: Vec<_> = risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "wrong-communication-link-content@app@app>db-spawn",
                "wrong-communication-link-content@app@app>db-spawn@1",
            ]
        );
        assert!(risks[1].title.contains("expected \"container\""));
    }

    #[test]
    fn test_wrong_trust_boundary_content() {
        let mut input = ModelInput::default();
        let mut pod = asset("pod", &["tool"]);
        pod.machine = Machine::Container;
        input.technical_assets.push(pod);
        input.technical_assets.push(asset("vm", &["tool"]));
        input
            .trust_boundaries
            .push(boundary("ns", TrustBoundaryType::NetworkPolicyNamespaceIsolation, &["pod", "vm"], &[]));
        let model = build(input);
        let risks = WrongTrustBoundaryContent::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].synthetic_id, "wrong-trust-boundary-content@vm");
    }
}
