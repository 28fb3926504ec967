//! Rules firing on sensitive assets that lack a required control

use super::id_parts;
use crate::errors::ThreatGraphResult;
use crate::graph::ParsedModel;
use crate::models::technology::*;
use crate::models::*;
use crate::rules::helpers::{builtin_rule, explain_ladder, most_sensitive, CategoryText, Ratings};
use crate::rules::RiskRule;

/// Sensitive enough to require authentication on every inbound link
fn requires_authentication(model: &ParsedModel, asset: &TechnicalAsset) -> bool {
    Ratings::processed(model, asset).is_elevated() || asset.multi_tenant
}

/// Callers that never authenticate by nature
fn is_exempt_caller(caller: &TechnicalAsset) -> bool {
    caller.technologies.get_attribute(UNPROTECTED_COMMUNICATIONS_TOLERATED) || caller.is_datastore()
}

#[allow(clippy::too_many_arguments)]
fn authentication_risk(
    category: &RiskCategory,
    target: &TechnicalAsset,
    link: &CommunicationLink,
    origin: &TechnicalAsset,
    caller: &TechnicalAsset,
    hop: Option<&str>,
    impact: Impact,
    likelihood: Likelihood,
    two_factor: bool,
) -> Risk {
    let factor = if two_factor { "Two-Factor " } else { "" };
    let hop = hop
        .map(|title| format!("forwarded via <b>{}</b> ", title))
        .unwrap_or_default();
    let title = format!(
        "<b>Missing {}Authentication</b> covering communication link <b>{}</b> from <b>{}</b> {}to <b>{}</b>",
        factor, link.title, origin.title, hop, target.title
    );
    Risk::new(category, likelihood, impact, title)
        .with_technical_asset(&target.id)
        .with_communication_link(&link.id)
        .with_data_breach(DataBreachProbability::Possible, [target.id.as_str()])
        .with_synthetic_id(&[&link.id, &caller.id, &target.id])
}

builtin_rule!(
    /// Inbound links to sensitive assets without any authentication
    MissingAuthentication,
    CategoryText {
        id: "missing-authentication",
        title: "Missing Authentication",
        description: "Technical assets (especially multi-tenant systems) should authenticate incoming requests when the asset processes or stores sensitive data.",
        impact: "If this risk is unmitigated, attackers might be able to access or modify sensitive data in an unauthenticated way.",
        asvs: "V2 - Authentication Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Authentication_Cheat_Sheet.html",
        action: "Authentication of Incoming Requests",
        mitigation: "Apply an authentication method to the technical asset. To protect highly sensitive data consider \
            the use of two-factor authentication for human users.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope technical assets (except load-balancer, reverse-proxy, service-registry, waf, ids, and ips and in-process calls) should authenticate incoming requests when the asset processes or stores \
            sensitive data. This is especially the case for all multi-tenant assets (there even non-sensitive ones).",
        risk_assessment: "The risk rating (medium or high) depends on the sensitivity of the data sent across the communication link. Monitoring callers are exempted from this risk.",
        false_positives: "Technical assets which do not process requests regarding functionality or data linked to end-users (customers) \
            can be considered as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 306,
    }
);

impl MissingAuthentication {
    fn impact(model: &ParsedModel, link: &CommunicationLink) -> Impact {
        let ratings = Ratings::of_link(model, link);
        if ratings.is_top_confidentiality_or_integrity() {
            Impact::High
        } else if ratings.confidentiality <= Confidentiality::Internal
            && ratings.integrity == Criticality::Operational
        {
            Impact::Low
        } else {
            Impact::Medium
        }
    }
}

impl RiskRule for MissingAuthentication {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if asset.technologies.get_attribute(NO_AUTHENTICATION_REQUIRED)
                || !requires_authentication(model, asset)
            {
                continue;
            }
            for link in model.incoming_links(&asset.id) {
                let caller = model.link_source(link)?;
                if is_exempt_caller(caller) {
                    continue;
                }
                if link.authentication == Authentication::None && !link.protocol.is_process_local() {
                    risks.push(authentication_risk(
                        &self.category,
                        asset,
                        link,
                        caller,
                        caller,
                        None,
                        Self::impact(model, link),
                        Likelihood::Likely,
                        false,
                    ));
                }
            }
        }
        Ok(risks)
    }

    fn explain_risk(&self, model: &ParsedModel, synthetic_id: &str) -> Option<Vec<String>> {
        let parts = id_parts(synthetic_id);
        let link = model.communication_link(parts.first()?)?;
        let target = model.technical_asset(parts.get(2)?)?;
        let mut steps = vec![
            format!(
                "technical asset '{}' processes sensitive data or is multi-tenant",
                target.id
            ),
            format!(
                "incoming communication link '{}' from '{}' uses protocol {} without authentication",
                link.id, link.source_id, link.protocol
            ),
        ];
        steps.extend(explain_ladder(
            &format!("data transferred over '{}'", link.id),
            &Ratings::of_link(model, link),
            Self::impact(model, link),
        ));
        Some(steps)
    }
}

builtin_rule!(
    MissingAuthenticationSecondFactor,
    CategoryText {
        id: "missing-authentication-second-factor",
        title: "Missing Two-Factor Authentication (2FA)",
        description: "Technical assets (especially multi-tenant systems) should authenticate incoming requests with \
            two-factor (2FA) authentication when the asset processes or stores highly sensitive data (in terms of confidentiality, integrity, and availability) and is accessed by humans.",
        impact: "If this risk is unmitigated, attackers might be able to access or modify highly sensitive data without strong authentication.",
        asvs: "V2 - Authentication Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Multifactor_Authentication_Cheat_Sheet.html",
        action: "Authentication with Second Factor (2FA)",
        mitigation: "Apply an authentication method to the technical asset protecting highly sensitive data via \
            two-factor authentication for human users.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::BusinessSide,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope technical assets (except load-balancer, reverse-proxy, waf, ids, and ips) should authenticate incoming requests via two-factor authentication (2FA) \
            when the asset processes or stores highly sensitive data (in terms of confidentiality, integrity, and availability) and is accessed by a client used by a human user.",
        risk_assessment: "Medium.",
        false_positives: "Technical assets which do not process requests regarding functionality or data linked to end-users (customers) \
            can be considered as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 308,
    }
);

impl MissingAuthenticationSecondFactor {
    fn lacks_second_factor(model: &ParsedModel, link: &CommunicationLink) -> bool {
        let ratings = Ratings::of_link(model, link);
        let sensitive = ratings.confidentiality >= Confidentiality::Confidential
            || ratings.integrity >= Criticality::Critical;
        sensitive && link.authentication != Authentication::TwoFactor
    }
}

impl RiskRule for MissingAuthenticationSecondFactor {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if asset.technologies.get_any_attribute(&[TRAFFIC_FORWARDING, UNPROTECTED_COMMUNICATIONS_TOLERATED])
                || !requires_authentication(model, asset)
            {
                continue;
            }
            for link in model.incoming_links(&asset.id) {
                let caller = model.link_source(link)?;
                if is_exempt_caller(caller) {
                    continue;
                }
                if caller.used_as_client_by_human {
                    if Self::lacks_second_factor(model, link) {
                        risks.push(authentication_risk(
                            &self.category,
                            asset,
                            link,
                            caller,
                            caller,
                            None,
                            Impact::Medium,
                            Likelihood::Unlikely,
                            true,
                        ));
                    }
                } else if caller.technologies.get_attribute(TRAFFIC_FORWARDING) {
                    // one hop up the chain to find the human behind the proxy
                    for upstream in model.incoming_links(&caller.id) {
                        let origin = model.link_source(upstream)?;
                        if is_exempt_caller(origin) || !origin.used_as_client_by_human {
                            continue;
                        }
                        if Self::lacks_second_factor(model, upstream) {
                            risks.push(authentication_risk(
                                &self.category,
                                asset,
                                link,
                                origin,
                                caller,
                                Some(&caller.title),
                                Impact::Medium,
                                Likelihood::Unlikely,
                                true,
                            ));
                        }
                    }
                }
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    MissingIdentityPropagation,
    CategoryText {
        id: "missing-identity-propagation",
        title: "Missing Identity Propagation",
        description: "Technical assets (especially multi-tenant systems), which usually process data for end users should \
            authorize every request based on the identity of the end user when the data flow is authenticated (i.e. non-public). \
            For DevOps usages at least a technical-user authorization is required.",
        impact: "If this risk is unmitigated, attackers might be able to access or modify foreign data after a successful compromise of a component within \
            the system due to missing resource-based authorization checks.",
        asvs: "V4 - Access Control Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Access_Control_Cheat_Sheet.html",
        action: "Identity Propagation and Resource-based Authorization",
        mitigation: "When processing requests for end users if possible authorize in the backend against the propagated \
            identity of the end user. This can be achieved in passing JWTs or similar tokens and checking them in the backend services. \
            For DevOps usages apply at least a technical-user authorization.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope service-like technical assets which usually process data based on end user requests, if authenticated \
            (i.e. non-public), should authorize incoming requests based on the propagated end user identity when their rating is sensitive. \
            This is especially the case for all multi-tenant assets (there even less-sensitive rated ones). \
            DevOps usages are exempted from this risk.",
        risk_assessment: "The risk rating (medium or high) depends on the confidentiality, integrity, and availability rating of the technical asset.",
        false_positives: "Technical assets which do not process requests regarding functionality or data linked to end-users (customers) \
            can be considered as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 284,
    }
);

impl MissingIdentityPropagation {
    fn applies_to(asset: &TechnicalAsset) -> bool {
        if !asset.technologies.get_attribute(PROCESSING_END_USER_REQUESTS) {
            return false;
        }
        let own = Ratings::own(asset);
        own.is_elevated()
            || (asset.multi_tenant
                && (own.confidentiality >= Confidentiality::Restricted
                    || own.integrity >= Criticality::Important
                    || own.availability >= Criticality::Important))
    }
}

impl RiskRule for MissingIdentityPropagation {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope().filter(|asset| Self::applies_to(asset)) {
            for link in model.incoming_links(&asset.id) {
                let caller = model.link_source(link)?;
                if !caller.technologies.get_attribute(PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS)
                    || caller.is_datastore()
                {
                    continue;
                }
                if link.authentication == Authentication::None
                    || link.authorization == Authorization::EnduserIdentityPropagation
                {
                    continue;
                }
                if link.is_devops() && link.authorization != Authorization::None {
                    continue;
                }
                let impact = if Ratings::own(asset).is_top_tier() {
                    Impact::Medium
                } else {
                    Impact::Low
                };
                let title = format!(
                    "<b>Missing End User Identity Propagation</b> over communication link <b>{}</b> from <b>{}</b> to <b>{}</b>",
                    link.title, caller.title, asset.title
                );
                risks.push(
                    Risk::new(&self.category, Likelihood::Unlikely, impact, title)
                        .with_technical_asset(&asset.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                        .with_synthetic_id(&[&link.id, &caller.id, &asset.id]),
                );
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    MissingIdentityStore,
    CategoryText {
        id: "missing-identity-store",
        title: "Missing Identity Store",
        description: "The modeled architecture does not contain an identity store, which might be the risk of a model missing \
            critical assets (and thus not seeing their risks).",
        impact: "If this risk is unmitigated, attackers might be able to exploit risks unseen in this threat model in the identity provider/store \
            that is currently missing in the model.",
        asvs: "V2 - Authentication Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Authentication_Cheat_Sheet.html",
        action: "Identity Store",
        mitigation: "Include an identity store in the model if the application has a login.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::Spoofing,
        detection_logic: "Models with authenticated data-flows authorized via end user identity missing an in-scope identity store.",
        risk_assessment: "The risk rating depends on the sensitivity of the end user-identity authorized technical assets and \
            their data assets processed and stored.",
        false_positives: "Models only offering data/services without any real authentication need \
            can be considered as false positives after individual review.",
        model_failure_possible_reason: true,
        cwe: 287,
    }
);

impl RiskRule for MissingIdentityStore {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        if model
            .technical_assets_in_scope()
            .any(|asset| asset.technologies.has_any_type(&[IDENTITY_STORE_LDAP, IDENTITY_STORE_DATABASE]))
        {
            return Ok(Vec::new());
        }
        let mut candidates = Vec::new();
        let mut impact = Impact::Low;
        for link in model.communication_links.values() {
            if link.authorization != Authorization::EnduserIdentityPropagation {
                continue;
            }
            let target = model.link_target(link)?;
            if Ratings::processed(model, target).is_elevated() {
                impact = Impact::Medium;
            }
            candidates.push(target);
            candidates.push(model.link_source(link)?);
        }
        let Some(example) = most_sensitive(candidates.into_iter()) else {
            return Ok(Vec::new());
        };
        let title = format!(
            "<b>Missing Identity Store</b> in the threat model (referencing asset <b>{}</b> as an example)",
            example.title
        );
        Ok(vec![Risk::new(&self.category, Likelihood::Unlikely, impact, title)
            .with_technical_asset(&example.id)
            .with_data_breach(DataBreachProbability::Improbable, Vec::<String>::new())
            .with_synthetic_id(&[&example.id])])
    }
}

builtin_rule!(
    /// No secret storage anywhere in the model
    MissingVault,
    CategoryText {
        id: "missing-vault",
        title: "Missing Vault (Secret Storage)",
        description: "In order to avoid the risk of secret leakage via config files (when attacked through vulnerabilities being able to \
            read files like Path-Traversal and others), it is best practice to use a separate hardened process with proper authentication, \
            authorization, and audit logging to access config secrets (like credentials, private keys, client certificates, etc.). \
            This component is usually some kind of Vault.",
        impact: "If this risk is unmitigated, attackers might be able to easier steal config secrets (like credentials, private keys, client certificates, etc.) once \
            a vulnerability to access files is present and exploited.",
        asvs: "V6 - Stored Cryptography Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Cryptographic_Storage_Cheat_Sheet.html",
        action: "Vault (Secret Storage)",
        mitigation: "Consider using a Vault (Secret Storage) to securely store and access config secrets (like credentials, private keys, client certificates, etc.).",
        check: "Is a Vault (Secret Storage) in place?",
        function: RiskFunction::Architecture,
        stride: Stride::InformationDisclosure,
        detection_logic: "Models without a Vault (Secret Storage).",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
        false_positives: "Models where no technical assets have any kind of sensitive config data to protect \
            can be considered as false positives after individual review.",
        model_failure_possible_reason: true,
        cwe: 522,
    }
);

impl MissingVault {
    fn impact(model: &ParsedModel) -> Impact {
        let elevated = model
            .technical_assets
            .values()
            .any(|asset| Ratings::processed(model, asset).is_elevated());
        if elevated {
            Impact::Medium
        } else {
            Impact::Low
        }
    }

    fn has_vault(model: &ParsedModel) -> bool {
        model
            .technical_assets
            .values()
            .any(|asset| asset.technologies.has_any_type(&[VAULT]))
    }
}

impl RiskRule for MissingVault {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        if Self::has_vault(model) {
            return Ok(Vec::new());
        }
        let Some(example) = most_sensitive(model.technical_assets.values()) else {
            return Ok(Vec::new());
        };
        let title = format!(
            "<b>Missing Vault (Secret Storage)</b> in the threat model (referencing asset <b>{}</b> as an example)",
            example.title
        );
        Ok(vec![Risk::new(&self.category, Likelihood::Unlikely, Self::impact(model), title)
            .with_technical_asset(&example.id)
            .with_data_breach(DataBreachProbability::Improbable, Vec::<String>::new())
            .with_synthetic_id(&[&example.id])])
    }

    fn explain_risk(&self, model: &ParsedModel, synthetic_id: &str) -> Option<Vec<String>> {
        let example = model.technical_asset(id_parts(synthetic_id).first()?)?;
        let impact = Self::impact(model);
        let mut steps = vec![
            "no technical asset in the model uses the vault technology".to_string(),
            format!(
                "'{}' has the highest sensitivity score and serves as the example asset",
                example.id
            ),
        ];
        if impact == Impact::Medium {
            steps.push("at least one asset processes or stores data rated confidential/critical or higher".to_string());
        } else {
            steps.push("no asset processes or stores data rated confidential/critical or higher".to_string());
        }
        steps.push(format!("resulting exploitation impact is {}", impact));
        Some(steps)
    }
}

builtin_rule!(
    MissingWaf,
    CategoryText {
        id: "missing-waf",
        title: "Missing Web Application Firewall (WAF)",
        description: "To have a first line of filtering defense, security architectures with web-services or web-applications should include a WAF in front of them. \
            Even though a WAF is not a replacement for security (all components must be secure even without a WAF) it adds another layer of defense to the overall \
            system by delaying some attacks and having easier attack alerting through it.",
        impact: "If this risk is unmitigated, attackers might be able to apply standard attack pattern tests at great speed without any filtering.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Virtual_Patching_Cheat_Sheet.html",
        action: "Web Application Firewall (WAF)",
        mitigation: "Consider placing a Web Application Firewall (WAF) in front of the web-services and/or web-applications. For cloud environments many cloud providers offer \
            pre-configured WAFs. Even reverse proxies can be enhanced by a WAF component via ModSecurity plugins.",
        check: "Is a Web Application Firewall (WAF) in place?",
        function: RiskFunction::Operations,
        stride: Stride::Tampering,
        detection_logic: "In-scope web-services and/or web-applications accessed across a network trust boundary not having a Web Application Firewall (WAF) in front of them.",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
        false_positives: "Targets only accessible via WAFs or reverse proxies containing a WAF component (like ModSecurity) can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 1008,
    }
);

impl RiskRule for MissingWaf {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if !asset.technologies.get_any_attribute(&[WEB_APPLICATION, WEB_SERVICE]) {
                continue;
            }
            let mut unfiltered = false;
            for link in model.incoming_links(&asset.id) {
                if model.is_across_trust_boundary_network_only(link)
                    && link.protocol.is_potential_web_access_protocol()
                    && !model.link_source(link)?.technologies.has_any_type(&[WAF])
                {
                    unfiltered = true;
                    break;
                }
            }
            if !unfiltered {
                continue;
            }
            let impact = Ratings::processed(model, asset).ladder(Impact::Low, Impact::Low, Impact::Medium);
            let title = format!("<b>Missing Web Application Firewall (WAF)</b> risk at <b>{}</b>", asset.title);
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

/// RAA from which every asset should be hardened
const RAA_LIMIT: f64 = 55.0;
/// Lower RAA limit for datastores and high-value targets
const RAA_LIMIT_REDUCED: f64 = 40.0;

builtin_rule!(
    MissingHardening,
    CategoryText {
        id: "missing-hardening",
        title: "Missing Hardening",
        description: "Technical assets with a Relative Attacker Attractiveness (RAA) value of 55 % or higher should be \
            explicitly hardened taking best practices and vendor hardening guides into account.",
        impact: "If this risk remains unmitigated, attackers might be able to easier attack high-value targets.",
        asvs: "V14 - Configuration Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "System Hardening",
        mitigation: "Try to apply all hardening best practices (like CIS benchmarks, OWASP recommendations, vendor \
            recommendations, DevSec Hardening Framework, DBSAT for Oracle databases, and others).",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::Tampering,
        detection_logic: "In-scope technical assets with RAA values of 55 % or higher. \
            Generally for high-value targets like datastores, application servers, identity providers and ERP systems this limit is reduced to 40 %.",
        risk_assessment: "The risk rating depends on the sensitivity of the data processed or stored in the technical asset.",
        false_positives: "Usually no false positives.",
        model_failure_possible_reason: false,
        cwe: 16,
    }
);

impl MissingHardening {
    fn needs_hardening(asset: &TechnicalAsset) -> bool {
        asset.raa >= RAA_LIMIT
            || (asset.raa >= RAA_LIMIT_REDUCED
                && (asset.is_datastore() || asset.technologies.get_attribute(HIGH_VALUE_TARGET)))
    }
}

impl RiskRule for MissingHardening {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn supported_tags(&self) -> Vec<String> {
        vec!["tomcat".to_string()]
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        Ok(model
            .technical_assets_in_scope()
            .filter(|asset| Self::needs_hardening(asset))
            .map(|asset| {
                let impact = if Ratings::processed(model, asset).is_top_confidentiality_or_integrity() {
                    Impact::Medium
                } else {
                    Impact::Low
                };
                let title = format!("<b>Missing Hardening</b> risk at <b>{}</b>", asset.title);
                Risk::new(&self.category, Likelihood::Likely, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id])
            })
            .collect())
    }
}

builtin_rule!(
    MissingFileValidation,
    CategoryText {
        id: "missing-file-validation",
        title: "Missing File Validation",
        description: "When a technical asset accepts files, these input files should be strictly validated about filename and type.",
        impact: "If this risk is unmitigated, attackers might be able to provide malicious files to the application.",
        asvs: "V12 - File and Resources Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/File_Upload_Cheat_Sheet.html",
        action: "File Validation",
        mitigation: "Filter by file extension and discard (if feasible) the name provided. Whitelist the accepted file types \
            and determine the mime-type on the server-side (for example via \"Apache Tika\" or similar checks). If the file is retrievable by \
            end users and/or backoffice employees, consider performing scans for popular malware (if the files can be retrieved much later than they \
            were uploaded, also apply a fresh malware scan during retrieval to scan with newer signatures of popular malware). Also enforce \
            limits on maximum file size to avoid denial-of-service like scenarios.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::Spoofing,
        detection_logic: "In-scope technical assets with custom-developed code accepting file data formats.",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
        false_positives: "Fully trusted (i.e. cryptographically signed or similar) files can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 434,
    }
);

impl RiskRule for MissingFileValidation {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        Ok(model
            .technical_assets_in_scope()
            .filter(|asset| asset.custom_developed_parts && asset.accepts_data_format(DataFormat::File))
            .map(|asset| {
                let impact = Ratings::processed(model, asset).ladder(Impact::Low, Impact::Low, Impact::Medium);
                let title = format!("<b>Missing File Validation</b> risk at <b>{}</b>", asset.title);
                Risk::new(&self.category, Likelihood::VeryLikely, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Probable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id])
            })
            .collect())
    }
}

builtin_rule!(
    ServiceRegistryPoisoning,
    CategoryText {
        id: "service-registry-poisoning",
        title: "Service Registry Poisoning",
        description: "When a service registry used for discovery of trusted service endpoints Service Registry Poisoning risks might arise.",
        impact: "If this risk remains unmitigated, attackers might be able to poison the service registry with malicious service endpoints or \
            malicious lookup and config data leading to breach of sensitive data.",
        asvs: "V10 - Malicious Code Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Access_Control_Cheat_Sheet.html",
        action: "Service Registry Integrity Check",
        mitigation: "Try to strengthen the access control of the service registry and apply cross-checks to detect maliciously poisoned lookup data.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::Spoofing,
        detection_logic: "In-scope service registries.",
        risk_assessment: "The risk rating depends on the sensitivity of the technical assets accessing the service registry \
            as well as the data assets processed or stored.",
        false_positives: "Service registries not used for service discovery \
            can be considered as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 693,
    }
);

impl ServiceRegistryPoisoning {
    fn impact(model: &ParsedModel, registry: &TechnicalAsset) -> ThreatGraphResult<Impact> {
        if Ratings::processed(model, registry).is_top_tier() {
            return Ok(Impact::Medium);
        }
        for link in model.incoming_links(&registry.id) {
            let caller = model.link_source(link)?;
            if Ratings::processed(model, caller).is_top_tier() || Ratings::of_link(model, link).is_top_tier() {
                return Ok(Impact::Medium);
            }
        }
        Ok(Impact::Low)
    }
}

impl RiskRule for ServiceRegistryPoisoning {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if !asset.technologies.has_any_type(&[SERVICE_REGISTRY]) {
                continue;
            }
            let title = format!("<b>Service Registry Poisoning</b> risk at <b>{}</b>", asset.title);
            risks.push(
                Risk::new(&self.category, Likelihood::Unlikely, Self::impact(model, asset)?, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id]),
            );
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;

    fn authentication_model(sent: Option<Confidentiality>) -> ParsedModel {
        let mut input = ModelInput::default();
        input.data_assets.push(data("orders", Confidentiality::Confidential, Criticality::Important));
        input.data_assets.push(data("secrets", Confidentiality::StrictlyConfidential, Criticality::Important));
        let mut client = asset("client", &["browser"]);
        let mut call = link("client>web", "web", Protocol::Https);
        match sent {
            Some(Confidentiality::StrictlyConfidential) => call.data_assets_sent.push("secrets".into()),
            Some(_) => call.data_assets_sent.push("orders".into()),
            None => {}
        }
        client.communication_links.push(call);
        input.technical_assets.push(client);
        let mut web = asset("web", &["web-application"]);
        web.data_assets_processed.push("orders".into());
        input.technical_assets.push(web);
        build(input)
    }

    #[test]
    fn test_missing_authentication_medium() {
        let model = authentication_model(Some(Confidentiality::Confidential));
        let rule = MissingAuthentication::new();
        let risks = rule.generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1, "exactly one unauthenticated link");
        let risk = &risks[0];
        assert_eq!(risk.exploitation_impact, Impact::Medium);
        assert_eq!(risk.exploitation_likelihood, Likelihood::Likely);
        assert_eq!(risk.synthetic_id, "missing-authentication@client>web@client@web");
        assert_eq!(
            risk.title,
            "<b>Missing Authentication</b> covering communication link <b>client>web</b> from <b>client</b> to <b>web</b>"
        );
        let steps = rule.explain_risk(&model, &risk.synthetic_id).unwrap();
        assert!(steps.last().unwrap().contains("medium"));
    }

    #[test]
    fn test_missing_authentication_high_for_strictly_confidential() {
        let model = authentication_model(Some(Confidentiality::StrictlyConfidential));
        let risks = MissingAuthentication::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].exploitation_impact, Impact::High);
    }

    #[test]
    fn test_authenticated_link_is_fine() {
        let mut input = ModelInput::default();
        input.data_assets.push(data("orders", Confidentiality::Confidential, Criticality::Important));
        let mut client = asset("client", &["browser"]);
        let mut call = link("client>web", "web", Protocol::Https);
        call.authentication = Authentication::Token;
        client.communication_links.push(call);
        input.technical_assets.push(client);
        let mut web = asset("web", &["web-application"]);
        web.data_assets_processed.push("orders".into());
        input.technical_assets.push(web);
        let model = build(input);
        assert!(MissingAuthentication::new().generate_risks(&model).unwrap().is_empty());
    }

    #[test]
    fn test_second_factor_through_proxy() {
        let mut input = ModelInput::default();
        input.data_assets.push(data("orders", Confidentiality::Confidential, Criticality::Important));
        let mut human = asset("human", &["browser"]);
        human.used_as_client_by_human = true;
        let mut to_proxy = link("human>proxy", "proxy", Protocol::Https);
        to_proxy.authentication = Authentication::Credentials;
        to_proxy.data_assets_sent.push("orders".into());
        human.communication_links.push(to_proxy);
        input.technical_assets.push(human);
        let mut proxy = asset("proxy", &["reverse-proxy"]);
        let mut to_app = link("proxy>app", "app", Protocol::Https);
        to_app.authentication = Authentication::Credentials;
        proxy.communication_links.push(to_app);
        input.technical_assets.push(proxy);
        let mut app = asset("app", &["web-server"]);
        app.data_assets_processed.push("orders".into());
        input.technical_assets.push(app);
        let model = build(input);

        let risks = MissingAuthenticationSecondFactor::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(
            risks[0].synthetic_id,
            "missing-authentication-second-factor@proxy>app@proxy@app",
            "second-factor risks use their own category"
        );
        assert!(risks[0].title.contains("forwarded via <b>proxy</b>"));
        assert!(risks[0].title.contains("Two-Factor"));
    }

    #[test]
    fn test_missing_identity_propagation() {
        let mut input = ModelInput::default();
        let mut gateway = asset("gateway", &["gateway"]);
        let mut call = link("gateway>api", "api", Protocol::Https);
        call.authentication = Authentication::Token;
        call.authorization = Authorization::TechnicalUser;
        gateway.communication_links.push(call);
        input.technical_assets.push(gateway);
        let mut api = asset("api", &["web-service-rest"]);
        api.confidentiality = Confidentiality::StrictlyConfidential;
        input.technical_assets.push(api);
        let model = build(input);
        let risks = MissingIdentityPropagation::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].exploitation_impact, Impact::Medium);
        assert_eq!(risks[0].synthetic_id, "missing-identity-propagation@gateway>api@gateway@api");
    }

    #[test]
    fn test_missing_identity_store() {
        let mut input = ModelInput::default();
        let mut web = asset("web", &["web-server"]);
        let mut call = link("web>api", "api", Protocol::Https);
        call.authorization = Authorization::EnduserIdentityPropagation;
        web.communication_links.push(call);
        input.technical_assets.push(web);
        let mut api = asset("api", &["web-service-rest"]);
        api.integrity = Criticality::Critical;
        input.technical_assets.push(api);
        let model = build(input);
        let risks = MissingIdentityStore::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].most_relevant_technical_asset_id, "api");
        assert_eq!(risks[0].exploitation_impact, Impact::Medium);

        let mut input = ModelInput::default();
        input.technical_assets.push(datastore("ldap", &["identity-store-ldap"]));
        let model = build(input);
        assert!(MissingIdentityStore::new().generate_risks(&model).unwrap().is_empty());
    }

    #[test]
    fn test_missing_vault_references_most_sensitive_asset() {
        let mut input = ModelInput::default();
        input.data_assets.push(data("orders", Confidentiality::Confidential, Criticality::Operational));
        let mut app = asset("app", &["web-server"]);
        app.data_assets_processed.push("orders".into());
        input.technical_assets.push(app);
        let mut db = datastore("db", &["database"]);
        db.confidentiality = Confidentiality::Confidential;
        db.integrity = Criticality::Critical;
        input.technical_assets.push(db);
        input.technical_assets.push(asset("tool", &["tool"]));
        let model = build(input);

        let rule = MissingVault::new();
        let risks = rule.generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1, "exactly one missing vault risk");
        assert_eq!(risks[0].most_relevant_technical_asset_id, "db");
        assert_eq!(risks[0].exploitation_impact, Impact::Medium);
        assert_eq!(risks[0].synthetic_id, "missing-vault@db");
        assert!(rule.explain_risk(&model, "missing-vault@db").is_some());
    }

    #[test]
    fn test_vault_present_suppresses_risk() {
        let mut input = ModelInput::default();
        input.technical_assets.push(asset("vault", &["vault"]));
        let model = build(input);
        assert!(MissingVault::new().generate_risks(&model).unwrap().is_empty());
    }

    #[test]
    fn test_missing_waf_across_network() {
        let mut input = ModelInput::default();
        let mut client = asset("client", &["browser"]);
        client.communication_links.push(link("client>web", "web", Protocol::Https));
        input.technical_assets.push(client);
        let mut waf = asset("waf", &["waf"]);
        waf.communication_links.push(link("waf>shop", "shop", Protocol::Https));
        input.technical_assets.push(waf);
        input.technical_assets.push(asset("web", &["web-server"]));
        input.technical_assets.push(asset("shop", &["web-server"]));
        input.trust_boundaries.push(boundary("internet", TrustBoundaryType::NetworkOnPrem, &["client", "waf"], &[]));
        input.trust_boundaries.push(boundary("dmz", TrustBoundaryType::NetworkOnPrem, &["web", "shop"], &[]));
        let model = build(input);
        let risks = MissingWaf::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1, "the WAF-protected shop should not fire");
        assert_eq!(risks[0].synthetic_id, "missing-waf@web");
    }

    #[test]
    fn test_missing_hardening_thresholds() {
        let mut input = ModelInput::default();
        input.technical_assets.push(datastore("db", &["database"]));
        input.technical_assets.push(asset("app", &["tool"]));
        let mut model = build(input);
        let mut values = std::collections::BTreeMap::new();
        values.insert("db".to_string(), 45.0);
        values.insert("app".to_string(), 45.0);
        model.set_raa(&values);
        let risks = MissingHardening::new().generate_risks(&model).unwrap();
        let ids: Vec<&str> = risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(ids, vec!["missing-hardening@db"], "reduced limit only for datastores and high-value targets");
    }

    #[test]
    fn test_file_validation_and_service_registry() {
        let mut input = ModelInput::default();
        let mut upload = asset("upload", &["web-server"]);
        upload.custom_developed_parts = true;
        upload.data_formats_accepted = vec![DataFormat::File];
        upload.communication_links.push(link("upload>registry", "registry", Protocol::Https));
        input.technical_assets.push(upload);
        input.technical_assets.push(asset("registry", &["service-registry"]));
        let model = build(input);

        let files = MissingFileValidation::new().generate_risks(&model).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].exploitation_likelihood, Likelihood::VeryLikely);

        let poisoning = ServiceRegistryPoisoning::new().generate_risks(&model).unwrap();
        assert_eq!(poisoning.len(), 1);
        assert_eq!(poisoning[0].exploitation_impact, Impact::Low);
    }
}
