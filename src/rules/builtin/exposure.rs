//! Exposure rules: plaintext data, unguarded entry points and cross-boundary
//! reachability

use super::id_parts;
use crate::errors::ThreatGraphResult;
use crate::graph::ParsedModel;
use crate::models::technology::*;
use crate::models::*;
use crate::rules::helpers::{builtin_rule, CategoryText, Ratings};
use crate::rules::RiskRule;

/// Impact of an exposed asset: its own rating tier, or an RAA above 40
fn exposure_impact(asset: &TechnicalAsset) -> Impact {
    let own = Ratings::own(asset);
    if own.is_top_confidentiality_or_integrity() || asset.raa > 40.0 {
        Impact::Medium
    } else {
        Impact::Low
    }
}

fn owns_sensitive_rating(asset: &TechnicalAsset) -> bool {
    asset.confidentiality >= Confidentiality::Confidential || asset.integrity >= Criticality::Critical
}

builtin_rule!(
    /// Plaintext links carrying sensitive data or credentials
    UnencryptedCommunication,
    CategoryText {
        id: "unencrypted-communication",
        title: "Unencrypted Communication",
        description: "Due to the confidentiality and/or integrity rating of the data assets transferred over the \
            communication link this connection must be encrypted.",
        impact: "If this risk is unmitigated, network attackers might be able to to eavesdrop on unencrypted sensitive data sent between components.",
        asvs: "V9 - Communication Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Transport_Layer_Protection_Cheat_Sheet.html",
        action: "Encryption of Communication Links",
        mitigation: "Apply transport layer encryption to the communication link.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::InformationDisclosure,
        detection_logic: "Unencrypted technical communication links of in-scope technical assets (excluding monitoring traffic as well as local-file-access and in-process-library-call) \
            transferring sensitive data.",
        risk_assessment: "Depending on the confidentiality rating of the transferred data-assets either medium or high risk.",
        false_positives: "When all sensitive data sent over the communication link is already fully encrypted on document or data level. \
            Also intra-container/pod communication can be considered false positive when container orchestration platform handles encryption.",
        model_failure_possible_reason: false,
        cwe: 319,
    }
);

/// How sensitive the data on a plaintext link is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exposure {
    High,
    Medium,
}

impl UnencryptedCommunication {
    fn exposure(model: &ParsedModel, link: &CommunicationLink) -> Option<Exposure> {
        let transferring_auth_data = link.authentication != Authentication::None;
        // sent data is inspected before received data, first hit wins
        let data = model
            .data_assets_sent(link)
            .into_iter()
            .chain(model.data_assets_received(link));
        for data_asset in data {
            let high = data_asset.confidentiality == Confidentiality::StrictlyConfidential
                || data_asset.integrity == Criticality::MissionCritical;
            let medium = data_asset.confidentiality == Confidentiality::Confidential
                || data_asset.integrity == Criticality::Critical;
            if high || transferring_auth_data {
                return Some(Exposure::High);
            }
            if !link.vpn && medium {
                return Some(Exposure::Medium);
            }
        }
        None
    }

    fn likelihood(model: &ParsedModel, link: &CommunicationLink) -> Likelihood {
        if model.is_across_trust_boundary_network_only(link) {
            Likelihood::Likely
        } else {
            Likelihood::Unlikely
        }
    }
}

impl RiskRule for UnencryptedCommunication {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for source in model.technical_assets_in_scope() {
            for link in model.outgoing_links(&source.id) {
                let target = model.link_target(link)?;
                if link.protocol.is_encrypted()
                    || link.protocol.is_process_local()
                    || source.technologies.get_attribute(UNPROTECTED_COMMUNICATIONS_TOLERATED)
                    || target.technologies.get_attribute(UNPROTECTED_COMMUNICATIONS_TOLERATED)
                {
                    continue;
                }
                let Some(exposure) = Self::exposure(model, link) else {
                    continue;
                };
                let impact = match exposure {
                    Exposure::High => Impact::High,
                    Exposure::Medium => Impact::Medium,
                };
                let mut title = format!(
                    "<b>Unencrypted Communication</b> named <b>{}</b> between <b>{}</b> and <b>{}</b>",
                    link.title, source.title, target.title
                );
                if link.authentication != Authentication::None {
                    title.push_str(" transferring authentication data (like credentials, token, session-id, etc.)");
                }
                if link.vpn {
                    title.push_str(&format!(
                        " (even VPN-protected connections need to encrypt their data in-transit when confidentiality is rated {} or integrity is rated {})",
                        Confidentiality::StrictlyConfidential,
                        Criticality::MissionCritical
                    ));
                }
                risks.push(
                    Risk::new(&self.category, Self::likelihood(model, link), impact, title)
                        .with_technical_asset(&source.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Possible, [target.id.as_str()])
                        .with_synthetic_id(&[&link.id, &source.id, &target.id]),
                );
            }
        }
        Ok(risks)
    }

    fn explain_risk(&self, model: &ParsedModel, synthetic_id: &str) -> Option<Vec<String>> {
        let link = model.communication_link(id_parts(synthetic_id).first()?)?;
        let exposure = Self::exposure(model, link)?;
        let mut steps = vec![format!(
            "communication link '{}' from '{}' to '{}' uses unencrypted protocol {}",
            link.id, link.source_id, link.target_id, link.protocol
        )];
        steps.push(match exposure {
            Exposure::High if link.authentication != Authentication::None => {
                "the link transfers authentication data, so impact is high".to_string()
            }
            Exposure::High => "transferred data is strictly confidential or mission critical, so impact is high".to_string(),
            Exposure::Medium => "transferred data is confidential or critical, so impact is medium".to_string(),
        });
        if model.is_across_trust_boundary_network_only(link) {
            steps.push("the link crosses a network trust boundary, so likelihood is likely".to_string());
        } else {
            steps.push("the link stays inside one network trust boundary, so likelihood is unlikely".to_string());
        }
        Some(steps)
    }
}

builtin_rule!(
    UnencryptedAsset,
    CategoryText {
        id: "unencrypted-asset",
        title: "Unencrypted Technical Assets",
        description: "Due to the confidentiality rating of the technical asset itself and/or the processed data assets \
            this technical asset must be encrypted. The risk rating depends on the sensitivity technical asset itself and of the data assets stored.",
        impact: "If this risk is unmitigated, attackers might be able to access unencrypted data when successfully compromising sensitive components.",
        asvs: "V6 - Stored Cryptography Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Cryptographic_Storage_Cheat_Sheet.html",
        action: "Encryption of Technical Asset",
        mitigation: "Apply encryption to the technical asset.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::InformationDisclosure,
        detection_logic: "In-scope unencrypted technical assets (excluding reverse-proxy, load-balancer, waf, ids, ips and embedded components like library) \
            storing data assets rated at least as confidential or critical. \
            For technical assets storing data assets rated as strictly-confidential or mission-critical the \
            encryption must be of type data-with-enduser-individual-key.",
        risk_assessment: "Depending on the confidentiality rating of the stored data-assets either medium or high risk.",
        false_positives: "When all sensitive data stored within the asset is already fully encrypted on document or data level.",
        model_failure_possible_reason: false,
        cwe: 311,
    }
);

impl UnencryptedAsset {
    /// Pure forwarders hold nothing at rest worth encrypting
    fn is_waived(asset: &TechnicalAsset) -> bool {
        asset.technologies.has_any_type(&[REVERSE_PROXY, LOAD_BALANCER, WAF, IDS, IPS])
            || asset.technologies.get_attribute(EMBEDDED_COMPONENT)
            || asset.technologies.get_attribute(NO_STORAGE_AT_REST)
    }
}

impl RiskRule for UnencryptedAsset {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if Self::is_waived(asset) || asset.data_assets_stored.is_empty() {
                continue;
            }
            let ratings = Ratings::stored(model, asset);
            if ratings.confidentiality < Confidentiality::Confidential && ratings.integrity < Criticality::Critical {
                continue;
            }
            let very_sensitive = ratings.is_top_confidentiality_or_integrity();
            let requires_enduser_key =
                very_sensitive && asset.technologies.get_attribute(STORING_END_USER_DATA);
            let impact = match asset.encryption {
                EncryptionStyle::None if very_sensitive => Impact::High,
                EncryptionStyle::None => Impact::Medium,
                EncryptionStyle::Transparent
                | EncryptionStyle::DataWithSymmetricSharedKey
                | EncryptionStyle::DataWithAsymmetricSharedKey
                    if requires_enduser_key =>
                {
                    Impact::Medium
                }
                _ => continue,
            };
            let mut title = format!("<b>Unencrypted Technical Asset</b> named <b>{}</b>", asset.title);
            if requires_enduser_key {
                title.push_str(&format!(
                    " missing enduser-individual encryption with {}",
                    EncryptionStyle::DataWithEnduserIndividualKey
                ));
            }
            risks.push(
                Risk::new(&self.category, Likelihood::Unlikely, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id]),
            );
        }
        Ok(risks)
    }
}

builtin_rule!(
    UnguardedAccessFromInternet,
    CategoryText {
        id: "unguarded-access-from-internet",
        title: "Unguarded Access From Internet",
        description: "Internet-exposed assets must be guarded by a protecting service, application, \
            or reverse-proxy.",
        impact: "If this risk is unmitigated, attackers might be able to directly attack sensitive systems without any hardening components in-between \
            due to them being directly exposed on the internet.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Encapsulation of Technical Asset",
        mitigation: "Encapsulate the asset behind a guarding service, application, or reverse-proxy. \
            For admin maintenance a bastion-host should be used as a jump-server. \
            For file transfer a store-and-forward-host should be used as an indirect file exchange platform.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope technical assets (excluding load-balancer) with confidentiality rating \
            of confidential (or higher) or with integrity rating of critical (or higher) when \
            accessed directly from the internet. All \
            web-server, web-application, reverse-proxy, waf, and gateway assets are exempted from this risk when \
            they do not consist of custom developed code and \
            the data-flow only consists of HTTP or FTP protocols. Access from monitoring systems \
            as well as VPN-protected connections are exempted.",
        risk_assessment: "The matching technical assets are at low risk. When either the \
            confidentiality rating is strictly-confidential or the integrity rating \
            is mission-critical, the risk-rating is considered medium. \
            For assets with RAA values higher than 40 % the risk-rating increases.",
        false_positives: "When other means of filtering client requests are applied equivalent of reverse-proxy, waf, or gateway components.",
        model_failure_possible_reason: false,
        cwe: 501,
    }
);

impl UnguardedAccessFromInternet {
    /// Off-the-shelf edge components legitimately serve these protocols
    fn is_exempt_edge(asset: &TechnicalAsset, link: &CommunicationLink) -> bool {
        if asset.custom_developed_parts {
            return false;
        }
        let web = matches!(link.protocol, Protocol::Http | Protocol::Https);
        let ftp = matches!(link.protocol, Protocol::Ftp | Protocol::Ftps | Protocol::Sftp);
        (web && asset.technologies.has_any_type(&["web-server", WEB_APPLICATION, REVERSE_PROXY, WAF, "gateway"]))
            || (ftp && asset.technologies.has_any_type(&["gateway"]))
    }
}

impl RiskRule for UnguardedAccessFromInternet {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if asset.technologies.has_any_type(&[LOAD_BALANCER]) || !owns_sensitive_rating(asset) {
                continue;
            }
            for link in model.incoming_links(&asset.id) {
                if Self::is_exempt_edge(asset, link) || link.vpn {
                    continue;
                }
                let client = model.link_source(link)?;
                if client.technologies.has_any_type(&[MONITORING]) || !client.internet {
                    continue;
                }
                let title = format!(
                    "<b>Unguarded Access from Internet</b> of <b>{}</b> by <b>{}</b> via <b>{}</b>",
                    asset.title, client.title, link.title
                );
                risks.push(
                    Risk::new(&self.category, Likelihood::VeryLikely, exposure_impact(asset), title)
                        .with_technical_asset(&asset.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Possible, [asset.id.as_str()])
                        .with_synthetic_id(&[&asset.id, &client.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    UnguardedDirectDatastoreAccess,
    CategoryText {
        id: "unguarded-direct-datastore-access",
        title: "Unguarded Direct Datastore Access",
        description: "Datastores accessed across trust boundaries must be guarded by some protecting service or application.",
        impact: "If this risk is unmitigated, attackers might be able to directly attack sensitive datastores without any protecting components in-between.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Encapsulation of Datastore",
        mitigation: "Encapsulate the datastore access behind a guarding service or application.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope technical assets of type datastore (except identity-store-ldap when accessed from identity-provider and file-server when accessed via file transfer protocols) with confidentiality rating \
            of confidential (or higher) or with integrity rating of critical (or higher) \
            which have incoming data-flows from assets outside across a network trust-boundary. DevOps config and deployment access is excluded from this risk.",
        risk_assessment: "The matching technical assets are at low risk. When either the \
            confidentiality rating is strictly-confidential or the integrity rating \
            is mission-critical, the risk-rating is considered medium. \
            For assets with RAA values higher than 40 % the risk-rating increases.",
        false_positives: "When the caller is considered fully trusted as if it was part of the datastore itself.",
        model_failure_possible_reason: false,
        cwe: 501,
    }
);

impl UnguardedDirectDatastoreAccess {
    fn is_expected_access(model: &ParsedModel, datastore: &TechnicalAsset, link: &CommunicationLink) -> ThreatGraphResult<bool> {
        let caller = model.link_source(link)?;
        let identity_lookup = datastore.technologies.has_any_type(&[IDENTITY_STORE_LDAP, IDENTITY_STORE_DATABASE])
            && caller.technologies.has_any_type(&[IDENTITY_PROVIDER]);
        let file_transfer = datastore.technologies.has_any_type(&[FILE_SERVER])
            && matches!(link.protocol, Protocol::Ftp | Protocol::Ftps | Protocol::Sftp);
        Ok(identity_lookup || file_transfer || link.is_devops())
    }
}

impl RiskRule for UnguardedDirectDatastoreAccess {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for datastore in model.technical_assets_in_scope().filter(|asset| asset.is_datastore()) {
            if !owns_sensitive_rating(datastore) {
                continue;
            }
            for link in model.incoming_links(&datastore.id) {
                if Self::is_expected_access(model, datastore, link)?
                    || !model.is_across_trust_boundary_network_only(link)
                    || model.is_sharing_same_parent_trust_boundary(&datastore.id, &link.source_id)
                {
                    continue;
                }
                let client = model.link_source(link)?;
                let title = format!(
                    "<b>Unguarded Direct Datastore Access</b> of <b>{}</b> by <b>{}</b> via <b>{}</b>",
                    datastore.title, client.title, link.title
                );
                risks.push(
                    Risk::new(&self.category, Likelihood::Likely, exposure_impact(datastore), title)
                        .with_technical_asset(&datastore.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Improbable, [datastore.id.as_str()])
                        .with_synthetic_id(&[&link.id, &client.id, &datastore.id]),
                );
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    DosRiskyAccessAcrossTrustBoundary,
    CategoryText {
        id: "dos-risky-access-across-trust-boundary",
        title: "DoS-risky Access Across Trust-Boundary",
        description: "Assets accessed across trust boundaries with critical or mission-critical availability rating \
            are more prone to Denial-of-Service (DoS) risks.",
        impact: "If this risk remains unmitigated, attackers might be able to disturb the availability of important parts of the system.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Denial_of_Service_Cheat_Sheet.html",
        action: "Anti-DoS Measures",
        mitigation: "Apply anti-DoS techniques like throttling and/or per-client load blocking with quotas. \
            Also for maintenance access routes consider applying a VPN instead of public reachable interfaces. \
            Generally applying redundancy on the targeted technical asset reduces the risk of DoS.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::DenialOfService,
        detection_logic: "In-scope technical assets (excluding load-balancer) with availability rating of critical or higher which have incoming data-flows across a \
            network trust-boundary (excluding devops usage).",
        risk_assessment: "Matching technical assets with availability rating \
            of critical or higher are at low risk. When the availability rating is \
            mission-critical and neither a VPN nor IP filter for the incoming data-flow nor redundancy \
            for the asset is applied, the risk-rating is considered medium.",
        false_positives: "When the accessed target operations are not time- or resource-consuming.",
        model_failure_possible_reason: false,
        cwe: 400,
    }
);

impl DosRiskyAccessAcrossTrustBoundary {
    fn check(
        &self,
        model: &ParsedModel,
        asset: &TechnicalAsset,
        link: &CommunicationLink,
        hop: Option<(&TechnicalAsset, &CommunicationLink)>,
        risks: &mut Vec<Risk>,
    ) -> ThreatGraphResult<()> {
        if !model.is_across_trust_boundary_network_only(link)
            || link.protocol.is_process_local()
            || link.is_devops()
        {
            return Ok(());
        }
        let client = model.link_source(link)?;
        let unshielded = asset.availability == Criticality::MissionCritical
            && !link.vpn
            && !link.ip_filtered
            && !asset.redundant;
        let impact = if unshielded { Impact::Medium } else { Impact::Low };
        // a forwarder may reach the same target over several links
        let (via, link_part) = match hop {
            Some((forwarder, forwarded)) => (
                format!(" forwarded via <b>{}</b>", forwarder.title),
                format!("{}->{}", link.id, forwarded.id),
            ),
            None => (String::new(), link.id.clone()),
        };
        let title = format!(
            "<b>Denial-of-Service</b> risky access of <b>{}</b> by <b>{}</b> via <b>{}</b>{}",
            asset.title, client.title, link.title, via
        );
        risks.push(
            Risk::new(&self.category, Likelihood::Unlikely, impact, title)
                .with_technical_asset(&asset.id)
                .with_communication_link(&link.id)
                .with_data_breach(DataBreachProbability::Improbable, Vec::<String>::new())
                .with_synthetic_id(&[&asset.id, &client.id, &link_part]),
        );
        Ok(())
    }
}

impl RiskRule for DosRiskyAccessAcrossTrustBoundary {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if asset.technologies.has_any_type(&[LOAD_BALANCER]) || asset.availability < Criticality::Critical {
                continue;
            }
            for link in model.incoming_links(&asset.id) {
                let caller = model.link_source(link)?;
                if caller.technologies.get_attribute(TRAFFIC_FORWARDING) {
                    // judge the traffic entering the forwarder instead
                    for upstream in model.incoming_links(&caller.id) {
                        self.check(model, asset, upstream, Some((caller, link)), &mut risks)?;
                    }
                } else {
                    self.check(model, asset, link, None, &mut risks)?;
                }
            }
        }
        Ok(risks)
    }
}
