//! Injection and request-forgery rules
//!
//! Most of these fire per inbound link from an in-scope caller and put the
//! caller first in the synthetic ID, since the injection originates there.

use super::id_parts;
use crate::errors::ThreatGraphResult;
use crate::graph::ParsedModel;
use crate::models::technology::*;
use crate::models::*;
use crate::rules::helpers::{builtin_rule, explain_ladder, CategoryText, Ratings};
use crate::rules::RiskRule;

/// Medium, or high when the target holds top-tier confidentiality or integrity
fn injection_impact(model: &ParsedModel, target: &TechnicalAsset) -> Impact {
    if Ratings::processed(model, target).is_top_confidentiality_or_integrity() {
        Impact::High
    } else {
        Impact::Medium
    }
}

/// Likelihood lowered one notch for devops traffic
fn notch_down_for_devops(link: &CommunicationLink, likelihood: Likelihood) -> Likelihood {
    if !link.is_devops() {
        return likelihood;
    }
    match likelihood {
        Likelihood::Frequent => Likelihood::VeryLikely,
        Likelihood::VeryLikely => Likelihood::Likely,
        _ => Likelihood::Unlikely,
    }
}

/// Risk raised at the caller of an injectable target, keyed caller@target@link
#[allow(clippy::too_many_arguments)]
fn caller_side_risk(
    category: &RiskCategory,
    caller: &TechnicalAsset,
    target: &TechnicalAsset,
    link: &CommunicationLink,
    likelihood: Likelihood,
    impact: Impact,
    title: String,
) -> Risk {
    Risk::new(category, likelihood, impact, title)
        .with_technical_asset(&caller.id)
        .with_communication_link(&link.id)
        .with_data_breach(DataBreachProbability::Probable, [target.id.as_str()])
        .with_synthetic_id(&[&caller.id, &target.id, &link.id])
}

builtin_rule!(
    /// Database-protocol links into query-injectable stores
    SqlNosqlInjection,
    CategoryText {
        id: "sql-nosql-injection",
        title: "SQL/NoSQL-Injection",
        description: "When a database is accessed via database access protocols SQL/NoSQL-Injection risks might arise. \
            The risk rating depends on the sensitivity technical asset itself and of the data assets processed or stored.",
        impact: "If this risk is unmitigated, attackers might be able to modify SQL/NoSQL queries to steal and modify data and eventually further escalate towards a deeper system penetration via code executions.",
        asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/SQL_Injection_Prevention_Cheat_Sheet.html",
        action: "SQL/NoSQL-Injection Prevention",
        mitigation: "Try to use parameter binding to be safe from injection vulnerabilities. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::Tampering,
        detection_logic: "Database accessed via typical database access protocols by in-scope clients.",
        risk_assessment: "The risk rating depends on the sensitivity of the data stored inside the database.",
        false_positives: "Database accesses by queries not consisting of parts controllable by the caller can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 89,
    }
);

impl SqlNosqlInjection {
    fn is_injectable(target: &TechnicalAsset, link: &CommunicationLink) -> bool {
        let database = target.technologies.has_any_type(&["database", IDENTITY_STORE_DATABASE]);
        (database && link.protocol.is_potential_database_access_protocol(true))
            || link.protocol.is_potential_database_access_protocol(false)
    }
}

impl RiskRule for SqlNosqlInjection {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for target in model.technical_assets.values() {
            for link in model.incoming_links(&target.id) {
                let caller = model.link_source(link)?;
                if caller.out_of_scope || !Self::is_injectable(target, link) {
                    continue;
                }
                let title = format!(
                    "<b>SQL/NoSQL-Injection</b> risk at <b>{}</b> against database <b>{}</b> via <b>{}</b>",
                    caller.title, target.title, link.title
                );
                risks.push(caller_side_risk(
                    &self.category,
                    caller,
                    target,
                    link,
                    notch_down_for_devops(link, Likelihood::VeryLikely),
                    injection_impact(model, target),
                    title,
                ));
            }
        }
        Ok(risks)
    }

    fn explain_risk(&self, model: &ParsedModel, synthetic_id: &str) -> Option<Vec<String>> {
        let parts = id_parts(synthetic_id);
        let target = model.technical_asset(parts.get(1)?)?;
        let link = model.communication_link(parts.get(2)?)?;
        let mut steps = vec![format!(
            "in-scope caller '{}' reaches '{}' over '{}' using database access protocol {}",
            link.source_id, target.id, link.id, link.protocol
        )];
        if link.is_devops() {
            steps.push("the link is devops traffic, so likelihood drops to likely".to_string());
        }
        steps.extend(explain_ladder(
            &format!("database '{}'", target.id),
            &Ratings::processed(model, target),
            injection_impact(model, target),
        ));
        Some(steps)
    }
}

builtin_rule!(
    LdapInjection,
    CategoryText {
        id: "ldap-injection",
        title: "LDAP-Injection",
        description: "When an LDAP server is accessed LDAP-Injection risks might arise. \
            The risk rating depends on the sensitivity of the LDAP server itself and of the data assets processed or stored.",
        impact: "If this risk remains unmitigated, attackers might be able to modify LDAP queries and access more data from the LDAP server than allowed.",
        asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/LDAP_Injection_Prevention_Cheat_Sheet.html",
        action: "LDAP-Injection Prevention",
        mitigation: "Try to use libraries that properly encode LDAP meta characters in searches and queries to access \
            the LDAP sever in order to stay safe from LDAP-Injection vulnerabilities. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::Tampering,
        detection_logic: "In-scope clients accessing LDAP servers via typical LDAP access protocols.",
        risk_assessment: "The risk rating depends on the sensitivity of the LDAP server itself and of the data assets processed or stored.",
        false_positives: "LDAP server queries by search values not consisting of parts controllable by the caller can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 90,
    }
);

impl RiskRule for LdapInjection {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for target in model.technical_assets.values() {
            for link in model.incoming_links(&target.id) {
                let caller = model.link_source(link)?;
                if caller.out_of_scope || !matches!(link.protocol, Protocol::Ldap | Protocol::Ldaps) {
                    continue;
                }
                let title = format!(
                    "<b>LDAP-Injection</b> risk at <b>{}</b> against LDAP server <b>{}</b> via <b>{}</b>",
                    caller.title, target.title, link.title
                );
                risks.push(caller_side_risk(
                    &self.category,
                    caller,
                    target,
                    link,
                    notch_down_for_devops(link, Likelihood::Likely),
                    injection_impact(model, target),
                    title,
                ));
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    PathTraversal,
    CategoryText {
        id: "path-traversal",
        title: "Path-Traversal",
        description: "When a filesystem is accessed Path-Traversal or Local-File-Inclusion (LFI) risks might arise. \
            The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed or stored.",
        impact: "If this risk is unmitigated, attackers might be able to read sensitive files (configuration data, key/credential files, deployment files, \
            business data files, etc.) from the filesystem of affected components.",
        asvs: "V12 - File and Resources Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Input_Validation_Cheat_Sheet.html",
        action: "Path-Traversal Prevention",
        mitigation: "Before accessing the file cross-check that it resides in the expected folder and is of the expected \
            type and filename/suffix. Try to use a mapping if possible instead of directly accessing by a filename which is \
            (partly or fully) provided by the caller. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::InformationDisclosure,
        detection_logic: "Filesystems accessed by in-scope callers.",
        risk_assessment: "The risk rating depends on the sensitivity of the data stored inside the technical asset.",
        false_positives: "File accesses by filenames not consisting of parts controllable by the caller can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 22,
    }
);

impl RiskRule for PathTraversal {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for target in model.technical_assets.values() {
            if !target.technologies.has_any_type(&[FILE_SERVER, LOCAL_FILE_SYSTEM]) {
                continue;
            }
            for link in model.incoming_links(&target.id) {
                let caller = model.link_source(link)?;
                if caller.out_of_scope {
                    continue;
                }
                let title = format!(
                    "<b>Path-Traversal</b> risk at <b>{}</b> against filesystem <b>{}</b> via <b>{}</b>",
                    caller.title, target.title, link.title
                );
                risks.push(caller_side_risk(
                    &self.category,
                    caller,
                    target,
                    link,
                    notch_down_for_devops(link, Likelihood::VeryLikely),
                    injection_impact(model, target),
                    title,
                ));
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    SearchQueryInjection,
    CategoryText {
        id: "search-query-injection",
        title: "Search-Query Injection",
        description: "When a search engine server is accessed Search-Query Injection risks might arise.",
        impact: "If this risk remains unmitigated, attackers might be able to read more data from the search index and \
            eventually further escalate towards a deeper system penetration via code executions.",
        asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Injection_Prevention_Cheat_Sheet.html",
        action: "Search-Query Injection Prevention",
        mitigation: "Try to use libraries that properly encode search query meta characters in searches and don't expose the \
            query unfiltered to the caller. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::Tampering,
        detection_logic: "In-scope clients accessing search engine servers via typical search access protocols.",
        risk_assessment: "The risk rating depends on the sensitivity of the search engine server itself and of the data assets processed or stored.",
        false_positives: "Server engine queries by search values not consisting of parts controllable by the caller can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 74,
    }
);

impl SearchQueryInjection {
    fn impact(model: &ParsedModel, target: &TechnicalAsset) -> Impact {
        let ratings = Ratings::processed(model, target);
        if ratings.is_top_confidentiality_or_integrity() {
            Impact::High
        } else if ratings.confidentiality <= Confidentiality::Internal && ratings.integrity == Criticality::Operational {
            Impact::Low
        } else {
            Impact::Medium
        }
    }
}

impl RiskRule for SearchQueryInjection {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for target in model.technical_assets.values() {
            if !target.technologies.has_any_type(&["search-engine", "search-index"]) {
                continue;
            }
            for link in model.incoming_links(&target.id) {
                let caller = model.link_source(link)?;
                let searchable = matches!(
                    link.protocol,
                    Protocol::Http | Protocol::Https | Protocol::Binary | Protocol::BinaryEncrypted
                );
                if caller.out_of_scope || !searchable {
                    continue;
                }
                let title = format!(
                    "<b>Search Query Injection</b> risk at <b>{}</b> against search engine server <b>{}</b> via <b>{}</b>",
                    caller.title, target.title, link.title
                );
                risks.push(caller_side_risk(
                    &self.category,
                    caller,
                    target,
                    link,
                    notch_down_for_devops(link, Likelihood::VeryLikely),
                    Self::impact(model, target),
                    title,
                ));
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    CrossSiteScripting,
    CategoryText {
        id: "cross-site-scripting",
        title: "Cross-Site Scripting (XSS)",
        description: "For each web application Cross-Site Scripting (XSS) risks might arise. In terms \
            of the overall risk level take other applications running on the same domain into account as well.",
        impact: "If this risk remains unmitigated, attackers might be able to access individual victim sessions and steal or modify user data.",
        asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Cross_Site_Scripting_Prevention_Cheat_Sheet.html",
        action: "XSS Prevention",
        mitigation: "Try to encode all values sent back to the browser and also handle DOM-manipulations in a safe way \
            to avoid DOM-based XSS. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::Tampering,
        detection_logic: "In-scope web applications.",
        risk_assessment: "The risk rating depends on the sensitivity of the data processed or stored in the web application.",
        false_positives: "When the technical asset is not accessed via a browser-like component (i.e not by a human user initiating the request that \
            gets passed through all components until it reaches the web application) this can be considered a false positive.",
        model_failure_possible_reason: false,
        cwe: 79,
    }
);

impl RiskRule for CrossSiteScripting {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        Ok(model
            .technical_assets_in_scope()
            .filter(|asset| asset.technologies.get_attribute(WEB_APPLICATION))
            .map(|asset| {
                let title = format!("<b>Cross-Site Scripting (XSS)</b> risk at <b>{}</b>", asset.title);
                Risk::new(&self.category, Likelihood::Likely, injection_impact(model, asset), title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Possible, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id])
            })
            .collect())
    }
}

builtin_rule!(
    CrossSiteRequestForgery,
    CategoryText {
        id: "cross-site-request-forgery",
        title: "Cross-Site Request Forgery (CSRF)",
        description: "When a web application is accessed via web protocols Cross-Site Request Forgery (CSRF) risks might arise.",
        impact: "If this risk remains unmitigated, attackers might be able to trick logged-in victim users into unwanted actions within the web application \
            by visiting an attacker controlled web site.",
        asvs: "V4 - Access Control Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Cross-Site_Request_Forgery_Prevention_Cheat_Sheet.html",
        action: "CSRF Prevention",
        mitigation: "Try to use anti-CSRF tokens ot the double-submit patterns (at least for logged-in requests). \
            When your authentication scheme depends on cookies (like session or token cookies), consider marking them with \
            the same-site flag. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::Spoofing,
        detection_logic: "In-scope web applications accessed via typical web access protocols.",
        risk_assessment: "The risk rating depends on the integrity rating of the data sent across the communication link.",
        false_positives: "Web applications passing the authentication sate via custom headers instead of cookies can \
            eventually be false positives. Also when the web application \
            is not accessed via a browser-like component (i.e not by a human user initiating the request that \
            gets passed through all components until it reaches the web application) this can be considered a false positive.",
        model_failure_possible_reason: false,
        cwe: 352,
    }
);

impl RiskRule for CrossSiteRequestForgery {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if !asset.technologies.get_attribute(WEB_APPLICATION) {
                continue;
            }
            for link in model.incoming_links(&asset.id) {
                if !link.protocol.is_potential_web_access_protocol() {
                    continue;
                }
                let caller = model.link_source(link)?;
                let impact = if Ratings::of_link(model, link).integrity == Criticality::MissionCritical {
                    Impact::Medium
                } else {
                    Impact::Low
                };
                let title = format!(
                    "<b>Cross-Site Request Forgery (CSRF)</b> risk at <b>{}</b> via <b>{}</b> from <b>{}</b>",
                    asset.title, link.title, caller.title
                );
                risks.push(
                    Risk::new(&self.category, notch_down_for_devops(link, Likelihood::VeryLikely), impact, title)
                        .with_technical_asset(&asset.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Improbable, [asset.id.as_str()])
                        .with_synthetic_id(&[&asset.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    ServerSideRequestForgery,
    CategoryText {
        id: "server-side-request-forgery",
        title: "Server-Side Request Forgery (SSRF)",
        description: "When a server system (i.e. not a client) is accessing other server systems via typical web protocols \
            Server-Side Request Forgery (SSRF) or Local-File-Inclusion (LFI) or Remote-File-Inclusion (RFI) risks might arise. ",
        impact: "If this risk is unmitigated, attackers might be able to access sensitive services or files of network-reachable components by modifying outgoing calls of affected components.",
        asvs: "V12 - File and Resources Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Server_Side_Request_Forgery_Prevention_Cheat_Sheet.html",
        action: "SSRF Prevention",
        mitigation: "Try to avoid constructing the outgoing target URL with caller controllable values. Alternatively use a mapping (whitelist) when accessing outgoing URLs instead of creating them including caller \
            controllable values. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::InformationDisclosure,
        detection_logic: "In-scope non-client systems accessing (using outgoing communication links) targets with either HTTP or HTTPS protocol.",
        risk_assessment: "The risk rating (low or medium) depends on the sensitivity of the data assets receivable via web protocols from \
            targets within the same network trust-boundary as well on the sensitivity of the data assets receivable via web protocols from the target asset itself. \
            Also for cloud-based environments the exploitation impact is at least medium, as cloud backend services can be \
            attacked via SSRF.",
        false_positives: "Servers not sending outgoing web requests can be considered \
            as false positives after review.",
        model_failure_possible_reason: false,
        cwe: 918,
    }
);

impl ServerSideRequestForgery {
    /// Breach candidates and impact: the target plus every web-reachable asset
    /// sharing the caller's network
    fn reach(model: &ParsedModel, caller: &TechnicalAsset, target: &TechnicalAsset) -> (Vec<String>, Impact) {
        let strictly = |asset: &TechnicalAsset| {
            Ratings::processed(model, asset).confidentiality == Confidentiality::StrictlyConfidential
        };
        let mut impact = if strictly(target) { Impact::Medium } else { Impact::Low };
        let mut breached = vec![caller.id.clone()];
        for candidate in model.technical_assets.values() {
            if !model.is_same_trust_boundary_network_only(&caller.id, &candidate.id) {
                continue;
            }
            let web_reachable = model
                .incoming_links(&candidate.id)
                .iter()
                .any(|link| link.protocol.is_potential_web_access_protocol());
            if web_reachable {
                breached.push(candidate.id.clone());
                if strictly(candidate) {
                    impact = Impact::Medium;
                }
            }
        }
        let in_cloud = model
            .direct_trust_boundary(&caller.id)
            .is_some_and(|boundary| boundary.boundary_type.is_within_cloud());
        if impact == Impact::Low && in_cloud {
            impact = Impact::Medium;
        }
        (breached, impact)
    }
}

impl RiskRule for ServerSideRequestForgery {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for caller in model.technical_assets_in_scope() {
            if caller.technologies.get_attribute(CLIENT) || caller.technologies.has_any_type(&[LOAD_BALANCER]) {
                continue;
            }
            for link in model.outgoing_links(&caller.id) {
                if !link.protocol.is_potential_web_access_protocol() {
                    continue;
                }
                let target = model.link_target(link)?;
                let (breached, impact) = Self::reach(model, caller, target);
                let title = format!(
                    "<b>Server-Side Request Forgery (SSRF)</b> risk at <b>{}</b> server-side web-requesting the target <b>{}</b> via <b>{}</b>",
                    caller.title, target.title, link.title
                );
                let likelihood = if link.is_devops() { Likelihood::Unlikely } else { Likelihood::Likely };
                risks.push(
                    Risk::new(&self.category, likelihood, impact, title)
                        .with_technical_asset(&caller.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Possible, breached)
                        .with_synthetic_id(&[&caller.id, &target.id, &link.id]),
                );
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    UntrustedDeserialization,
    CategoryText {
        id: "untrusted-deserialization",
        title: "Untrusted Deserialization",
        description: "When a technical asset accepts data in a specific serialized form (like Java or .NET serialization), \
            Untrusted Deserialization risks might arise.",
        impact: "If this risk is unmitigated, attackers might be able to execute code on target systems by exploiting untrusted deserialization endpoints.",
        asvs: "V5 - Validation, Sanitization and Encoding Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Deserialization_Cheat_Sheet.html",
        action: "Prevention of Deserialization of Untrusted Data",
        mitigation: "Try to avoid the deserialization of untrusted data (even of data within the same trust-boundary as long as \
            it is sent across a remote connection) in order to stay safe from Untrusted Deserialization vulnerabilities. \
            Alternatively a strict whitelisting approach of the classes/types/values to deserialize might help as well. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::Tampering,
        detection_logic: "In-scope technical assets accepting serialization data formats (including EJB and RMI protocols).",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed or stored.",
        false_positives: "Fully trusted (i.e. cryptographically signed or similar) data deserialized can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 502,
    }
);

impl RiskRule for UntrustedDeserialization {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            let mut deserializes = asset.accepts_data_format(DataFormat::Serialization)
                || asset.technologies.has_any_type(&[EJB]);
            let mut crossing_link = None;
            for link in model.incoming_links(&asset.id) {
                let remote_objects = matches!(
                    link.protocol,
                    Protocol::Iiop | Protocol::IiopEncrypted | Protocol::Jrmp | Protocol::JrmpEncrypted
                );
                if remote_objects {
                    deserializes = true;
                    if model.is_across_trust_boundary_network_only(link) {
                        crossing_link = Some(link);
                    }
                }
            }
            if !deserializes {
                continue;
            }
            let mut title = format!("<b>Untrusted Deserialization</b> risk at <b>{}</b>", asset.title);
            let likelihood = match crossing_link {
                Some(link) => {
                    title.push_str(&format!(
                        " across a trust boundary (at least via communication link <b>{}</b>)",
                        link.title
                    ));
                    Likelihood::VeryLikely
                }
                None => Likelihood::Likely,
            };
            let impact = Ratings::processed(model, asset).ladder(Impact::High, Impact::High, Impact::VeryHigh);
            risks.push(
                Risk::new(&self.category, likelihood, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Probable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id]),
            );
        }
        Ok(risks)
    }
}

builtin_rule!(
    XmlExternalEntity,
    CategoryText {
        id: "xml-external-entity",
        title: "XML External Entity (XXE)",
        description: "When a technical asset accepts data in XML format, XML External Entity (XXE) risks might arise.",
        impact: "If this risk is unmitigated, attackers might be able to read sensitive files (configuration data, key/credential files, deployment files, \
            business data files, etc.) form the filesystem of affected components and/or access sensitive services or files \
            of other components.",
        asvs: "V14 - Configuration Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/XML_External_Entity_Prevention_Cheat_Sheet.html",
        action: "XML Parser Hardening",
        mitigation: "Apply hardening of all XML parser instances in order to stay safe from XML External Entity (XXE) vulnerabilities. \
            When a third-party product is used instead of custom developed software, check if the product applies the proper mitigation and ensure a reasonable patch-level.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Development,
        stride: Stride::InformationDisclosure,
        detection_logic: "In-scope technical assets accepting XML data formats.",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored. \
            Also for cloud-based environments the exploitation impact is at least medium, as cloud backend services can be \
            attacked via SSRF (and XXE vulnerabilities are often also SSRF vulnerabilities).",
        false_positives: "Fully trusted (i.e. cryptographically signed or similar) XML data can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 611,
    }
);

impl RiskRule for XmlExternalEntity {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        Ok(model
            .technical_assets_in_scope()
            .filter(|asset| asset.accepts_data_format(DataFormat::Xml))
            .map(|asset| {
                let impact = Ratings::processed(model, asset).ladder(Impact::Medium, Impact::Medium, Impact::High);
                let title = format!("<b>XML External Entity (XXE)</b> risk at <b>{}</b>", asset.title);
                Risk::new(&self.category, Likelihood::VeryLikely, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Probable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;

    fn web_and_db() -> ParsedModel {
        let mut input = ModelInput::default();
        input.data_assets.push(data("customers", Confidentiality::StrictlyConfidential, Criticality::Important));
        let mut browser = asset("browser", &["browser"]);
        browser.communication_links.push(link("browser>web", "web", Protocol::Https));
        input.technical_assets.push(browser);
        let mut web = asset("web", &["web-server"]);
        web.data_formats_accepted = vec![DataFormat::Xml, DataFormat::Serialization];
        web.communication_links.push(link("web>db", "db", Protocol::Jdbc));
        let mut admin = link("web>db admin", "db", Protocol::SqlAccessProtocol);
        admin.usage = Usage::DevOps;
        web.communication_links.push(admin);
        web.communication_links.push(link("web>search", "search", Protocol::Https));
        input.technical_assets.push(web);
        let mut db = datastore("db", &["database"]);
        db.data_assets_stored.push("customers".into());
        input.technical_assets.push(db);
        let mut search = asset("search", &["search-engine"]);
        search.integrity = Criticality::Operational;
        input.technical_assets.push(search);
        build(input)
    }

    #[test]
    fn test_sql_injection_per_link() {
        let model = web_and_db();
        let rule = SqlNosqlInjection::new();
        let risks = rule.generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 2);
        let ids: Vec<&str> = risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["sql-nosql-injection@web@db@web>db", "sql-nosql-injection@web@db@web>db admin"]
        );
        assert_eq!(risks[0].exploitation_likelihood, Likelihood::VeryLikely);
        assert_eq!(risks[1].exploitation_likelihood, Likelihood::Likely, "devops lowers likelihood");
        assert!(risks.iter().all(|r| r.exploitation_impact == Impact::High));
        assert_eq!(risks[0].most_relevant_technical_asset_id, "web");

        let steps = rule.explain_risk(&model, ids[0]).unwrap();
        assert!(steps[0].contains("database access protocol"));
        assert!(steps.last().unwrap().contains("high"));
    }

    #[test]
    fn test_web_application_rules() {
        let model = web_and_db();
        let xss = CrossSiteScripting::new().generate_risks(&model).unwrap();
        assert_eq!(xss.len(), 1);
        assert_eq!(xss[0].synthetic_id, "cross-site-scripting@web");
        assert_eq!(xss[0].exploitation_impact, Impact::Medium);

        let csrf = CrossSiteRequestForgery::new().generate_risks(&model).unwrap();
        assert_eq!(csrf.len(), 1);
        assert_eq!(csrf[0].synthetic_id, "cross-site-request-forgery@web@browser>web");
        assert_eq!(csrf[0].exploitation_impact, Impact::Low);
    }

    #[test]
    fn test_search_query_injection_low_for_operational_index() {
        let model = web_and_db();
        let risks = SearchQueryInjection::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].exploitation_impact, Impact::Low);
    }

    #[test]
    fn test_ssrf_breach_covers_same_network() {
        let model = web_and_db();
        let risks = ServerSideRequestForgery::new().generate_risks(&model).unwrap();
        let ids: Vec<&str> = risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(ids, vec!["server-side-request-forgery@web@search@web>search"], "browser is a client");
        assert_eq!(risks[0].data_breach_technical_asset_ids, vec!["search", "web"]);
        assert_eq!(risks[0].exploitation_impact, Impact::Low);
    }

    #[test]
    fn test_deserialization_and_xxe() {
        let model = web_and_db();
        let deserialization = UntrustedDeserialization::new().generate_risks(&model).unwrap();
        assert_eq!(deserialization.len(), 1);
        assert_eq!(deserialization[0].exploitation_impact, Impact::High);
        assert_eq!(deserialization[0].exploitation_likelihood, Likelihood::Likely);

        let xxe = XmlExternalEntity::new().generate_risks(&model).unwrap();
        assert_eq!(xxe.len(), 1);
        assert_eq!(xxe[0].exploitation_likelihood, Likelihood::VeryLikely);
    }

    #[test]
    fn test_ldap_and_path_traversal() {
        let mut input = ModelInput::default();
        let mut app = asset("app", &["tool"]);
        app.communication_links.push(link("app>ldap", "ldap", Protocol::Ldaps));
        app.communication_links.push(link("app>files", "files", Protocol::Sftp));
        input.technical_assets.push(app);
        input.technical_assets.push(datastore("ldap", &["identity-store-ldap"]));
        input.technical_assets.push(datastore("files", &["file-server"]));
        let mut outsider = asset("outsider", &["tool"]);
        outsider.out_of_scope = true;
        outsider.communication_links.push(link("outsider>files", "files", Protocol::Sftp));
        input.technical_assets.push(outsider);
        let model = build(input);

        let ldap = LdapInjection::new().generate_risks(&model).unwrap();
        assert_eq!(ldap.len(), 1);
        assert_eq!(ldap[0].synthetic_id, "ldap-injection@app@ldap@app>ldap");

        let traversal = PathTraversal::new().generate_risks(&model).unwrap();
        assert_eq!(traversal.len(), 1, "out-of-scope callers are ignored");
        assert_eq!(traversal[0].data_breach_technical_asset_ids, vec!["files"]);
    }
}
