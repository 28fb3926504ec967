//! Build pipeline and supply-chain rules

use super::id_parts;
use crate::errors::ThreatGraphResult;
use crate::graph::{ParsedModel, Tagged};
use crate::models::technology::*;
use crate::models::*;
use crate::rules::helpers::{builtin_rule, explain_ladder, most_sensitive, CategoryText, Ratings};
use crate::rules::RiskRule;

builtin_rule!(
    /// Repositories and registries that may leak committed secrets
    AccidentalSecretLeak,
    CategoryText {
        id: "accidental-secret-leak",
        title: "Accidental Secret Leak",
        description: "Sourcecode repositories (including their histories) as well as artifact registries can accidentally contain secrets like \
            checked-in or packaged-in passwords, API tokens, certificates, crypto keys, etc.",
        impact: "If this risk is unmitigated, attackers which have access to affected sourcecode repositories or artifact registries might \
            find secrets accidentally checked-in.",
        asvs: "V14 - Configuration Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Build Pipeline Hardening",
        mitigation: "Establish measures preventing accidental check-in or package-in of secrets into sourcecode repositories and artifact registries. \
            Use pre-commit scanners and remove secrets from the history once found.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::InformationDisclosure,
        detection_logic: "In-scope sourcecode repositories and artifact registries.",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
        false_positives: "Usually no false positives.",
        model_failure_possible_reason: false,
        cwe: 200,
    }
);

impl AccidentalSecretLeak {
    fn impact(model: &ParsedModel, asset: &TechnicalAsset) -> Impact {
        Ratings::processed(model, asset).ladder(Impact::Low, Impact::Medium, Impact::High)
    }
}

impl RiskRule for AccidentalSecretLeak {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn supported_tags(&self) -> Vec<String> {
        vec!["git".to_string(), "nexus".to_string()]
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if !asset.technologies.get_attribute(MAY_CONTAIN_SECRETS) {
                continue;
            }
            let title = if asset.is_tagged_with_any(&["git"]) {
                format!(
                    "<b>Accidental Secret Leak (Git)</b> risk at <b>{}</b>: <u>Git Leak Prevention</u>",
                    asset.title
                )
            } else {
                format!("<b>Accidental Secret Leak</b> risk at <b>{}</b>", asset.title)
            };
            risks.push(
                Risk::new(&self.category, Likelihood::Unlikely, Self::impact(model, asset), title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Probable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id]),
            );
        }
        Ok(risks)
    }

    fn explain_risk(&self, model: &ParsedModel, synthetic_id: &str) -> Option<Vec<String>> {
        let asset = model.technical_asset(id_parts(synthetic_id).first()?)?;
        let mut steps = vec![format!(
            "technical asset '{}' uses {} which may contain secrets",
            asset.id, asset.technologies
        )];
        if asset.is_tagged_with_any(&["git"]) {
            steps.push("asset is tagged 'git', Git leak prevention applies".to_string());
        }
        let ratings = Ratings::processed(model, asset);
        steps.extend(explain_ladder(
            &format!("data processed or stored by '{}'", asset.id),
            &ratings,
            Self::impact(model, asset),
        ));
        Some(steps)
    }
}

builtin_rule!(
    /// Development tooling reachable from the internet or unmanaged clients
    CodeBackdooring,
    CategoryText {
        id: "code-backdooring",
        title: "Code Backdooring",
        description: "For each build-pipeline component Code Backdooring risks might arise where attackers compromise the build-pipeline \
            in order to let backdoored artifacts be shipped into production.",
        impact: "If this risk remains unmitigated, attackers might be able to execute code on and completely takeover \
            production environments.",
        asvs: "V10 - Malicious Code Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Vulnerable_Dependency_Management_Cheat_Sheet.html",
        action: "Build Pipeline Hardening",
        mitigation: "Reduce the attack surface of backdooring the build pipeline by not directly exposing the build pipeline \
            components on the public internet and also not exposing it in front of unmanaged (out-of-scope) developer clients. \
            Also consider the use of code signing to prevent code modifications.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::Tampering,
        detection_logic: "In-scope development relevant technical assets which are either accessed by out-of-scope unmanaged \
            developer clients and/or are directly accessed by any kind of internet-located (non-VPN) component or are themselves directly located \
            on the internet.",
        risk_assessment: "The risk rating depends on the confidentiality and integrity rating of the code being handled and deployed \
            as well as the placement/calling of this technical asset on/from the internet.",
        false_positives: "When the build-pipeline and sourcecode-repo is not exposed to the internet and considered fully \
            trusted (which implies that all accessing clients are also considered fully trusted in terms of their patch management \
            and applied hardening, which must be equivalent to a managed developer client environment) this can be considered a false positive \
            after individual review.",
        model_failure_possible_reason: false,
        cwe: 912,
    }
);

impl CodeBackdooring {
    fn is_exposed(model: &ParsedModel, asset: &TechnicalAsset) -> ThreatGraphResult<bool> {
        if asset.internet {
            return Ok(true);
        }
        for link in model.incoming_links(&asset.id) {
            let caller = model.link_source(link)?;
            if (!link.vpn && caller.internet) || caller.out_of_scope {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn create_risk(&self, model: &ParsedModel, asset: &TechnicalAsset) -> ThreatGraphResult<Risk> {
        let mut impact = Impact::Low;
        if !asset.technologies.has_any_type(&[CODE_INSPECTION_PLATFORM]) {
            let ratings = Ratings::processed(model, asset);
            impact = if ratings.confidentiality >= Confidentiality::Confidential
                || ratings.integrity >= Criticality::Critical
            {
                Impact::High
            } else {
                Impact::Medium
            };
        }
        let mut breached = vec![asset.id.clone()];
        breached.extend(deployment_targets(model, asset));
        let title = format!("<b>Code Backdooring</b> risk at <b>{}</b>", asset.title);
        Ok(Risk::new(&self.category, Likelihood::Unlikely, impact, title)
            .with_technical_asset(&asset.id)
            .with_data_breach(DataBreachProbability::Probable, breached)
            .with_synthetic_id(&[&asset.id]))
    }
}

/// Targets of devops links that carry code-like data (integrity important
/// or higher)
fn deployment_targets(model: &ParsedModel, asset: &TechnicalAsset) -> Vec<String> {
    model
        .outgoing_links(&asset.id)
        .into_iter()
        .filter(|link| link.is_devops())
        .filter(|link| {
            model
                .data_assets_sent(link)
                .iter()
                .any(|data| data.integrity >= Criticality::Important)
        })
        .map(|link| link.target_id.clone())
        .collect()
}

impl RiskRule for CodeBackdooring {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets_in_scope() {
            if asset.technologies.get_attribute(DEVELOPMENT_RELEVANT) && Self::is_exposed(model, asset)? {
                risks.push(self.create_risk(model, asset)?);
            }
        }
        Ok(risks)
    }
}

builtin_rule!(
    ContainerBaseImageBackdooring,
    CategoryText {
        id: "container-baseimage-backdooring",
        title: "Container Base Image Backdooring",
        description: "When a technical asset is built using container technologies, Base Image Backdooring risks might arise where \
            base images and other layers used contain vulnerable components or backdoors.",
        impact: "If this risk is unmitigated, attackers might be able to deeply persist in the target system by executing code in deployed containers.",
        asvs: "V10 - Malicious Code Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Docker_Security_Cheat_Sheet.html",
        action: "Container Infrastructure Hardening",
        mitigation: "Apply hardening of all container infrastructures. Use only trusted base images of the originating vendors, \
            verify digital signatures and regularly rebuild images to pick up patched layers.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::Tampering,
        detection_logic: "In-scope technical assets running as containers.",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets.",
        false_positives: "Fully trusted (i.e. reviewed and cryptographically signed or similar) base images of containers can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 912,
    }
);

impl RiskRule for ContainerBaseImageBackdooring {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        Ok(model
            .technical_assets_in_scope()
            .filter(|asset| asset.machine == Machine::Container)
            .map(|asset| {
                let impact =
                    Ratings::processed(model, asset).ladder(Impact::Medium, Impact::Medium, Impact::High);
                let title = format!("<b>Container Base Image Backdooring</b> risk at <b>{}</b>", asset.title);
                Risk::new(&self.category, Likelihood::Unlikely, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Probable, [asset.id.as_str()])
                    .with_synthetic_id(&[&asset.id])
            })
            .collect())
    }
}

builtin_rule!(
    ContainerPlatformEscape,
    CategoryText {
        id: "container-platform-escape",
        title: "Container Platform Escape",
        description: "Container platforms are especially interesting targets for attackers as they host big parts of a containerized runtime infrastructure. \
            When not configured and operated with security best practices in mind, attackers might exploit a vulnerability inside a container and escape \
            towards the platform as highly privileged users.",
        impact: "If this risk is unmitigated, attackers which have successfully compromised a container might be able to escape \
            towards the platform and then access every container hosted on it.",
        asvs: "V14 - Configuration Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Docker_Security_Cheat_Sheet.html",
        action: "Container Infrastructure Hardening",
        mitigation: "Apply hardening of all container infrastructures. Run containers unprivileged, drop capabilities, \
            use read-only filesystems and apply namespace isolation.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::ElevationOfPrivilege,
        detection_logic: "In-scope container platforms.",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
        false_positives: "Container platforms not running parts of the target architecture can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 1008,
    }
);

impl RiskRule for ContainerPlatformEscape {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn supported_tags(&self) -> Vec<String> {
        vec!["docker".to_string(), "kubernetes".to_string(), "openshift".to_string()]
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let containers: Vec<&str> = model
            .technical_assets
            .values()
            .filter(|asset| asset.machine == Machine::Container)
            .map(|asset| asset.id.as_str())
            .collect();
        Ok(model
            .technical_assets_in_scope()
            .filter(|asset| asset.technologies.get_attribute(CONTAINER_PLATFORM))
            .map(|asset| {
                let impact =
                    Ratings::processed(model, asset).ladder(Impact::Medium, Impact::Medium, Impact::High);
                let title = format!("<b>Container Platform Escape</b> risk at <b>{}</b>", asset.title);
                Risk::new(&self.category, Likelihood::Unlikely, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Probable, containers.iter().copied())
                    .with_synthetic_id(&[&asset.id])
            })
            .collect())
    }
}

builtin_rule!(
    /// Build pipelines writing into production instead of production pulling
    PushInsteadOfPullDeployment,
    CategoryText {
        id: "push-instead-of-pull-deployment",
        title: "Push instead of Pull Deployment",
        description: "When comparing push-based vs. pull-based deployments from a security perspective, pull-based \
            deployments improve the overall security of the deployment targets. Every exposed interface of a production system to accept a deployment \
            increases the attack surface of the production system, thus a pull-based approach exposes less attack surface relevant \
            interfaces.",
        impact: "If this risk is unmitigated, attackers might have more potential target vectors for attacks, as the overall attack surface is \
            unnecessarily increased.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Build Pipeline Hardening",
        mitigation: "Try to prefer pull-based deployments (like GitOps scenarios offer) over push-based deployments to reduce the attack surface of the production system.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::Tampering,
        detection_logic: "Models with build pipeline components accessing in-scope targets of deployment (in a non-readonly way) which \
            are not build-related components themselves.",
        risk_assessment: "The risk rating depends on the highest sensitivity of the deployment targets running custom-developed parts.",
        false_positives: "Communication links that are not deployment paths \
            can be considered as false positives after individual review.",
        model_failure_possible_reason: true,
        cwe: 1127,
    }
);

impl PushInsteadOfPullDeployment {
    fn impact(model: &ParsedModel, target: &TechnicalAsset) -> Impact {
        if Ratings::processed(model, target).is_elevated() {
            Impact::Medium
        } else {
            Impact::Low
        }
    }

    fn is_push_deployment(link: &CommunicationLink, target: &TechnicalAsset) -> bool {
        !link.readonly
            && link.is_devops()
            && !target.out_of_scope
            && !target.technologies.get_attribute(DEVELOPMENT_RELEVANT)
            && target.usage == Usage::Business
    }
}

impl RiskRule for PushInsteadOfPullDeployment {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        let pipelines = model
            .technical_assets
            .values()
            .filter(|asset| asset.technologies.has_any_type(&[BUILD_PIPELINE]));
        for pipeline in pipelines {
            for link in model.outgoing_links(&pipeline.id) {
                let target = model.link_target(link)?;
                if !Self::is_push_deployment(link, target) {
                    continue;
                }
                let title = format!(
                    "<b>Push instead of Pull Deployment</b> at <b>{}</b> via build pipeline asset <b>{}</b>",
                    target.title, pipeline.title
                );
                risks.push(
                    Risk::new(&self.category, Likelihood::Unlikely, Self::impact(model, target), title)
                        .with_technical_asset(&target.id)
                        .with_communication_link(&link.id)
                        .with_data_breach(DataBreachProbability::Improbable, [target.id.as_str()])
                        .with_synthetic_id(&[&pipeline.id, &target.id]),
                );
            }
        }
        Ok(risks)
    }

    fn explain_risk(&self, model: &ParsedModel, synthetic_id: &str) -> Option<Vec<String>> {
        let parts = id_parts(synthetic_id);
        let pipeline = model.technical_asset(parts.first()?)?;
        let target = model.technical_asset(parts.get(1)?)?;
        let link = model
            .outgoing_links(&pipeline.id)
            .into_iter()
            .find(|link| link.target_id == target.id)?;
        let mut steps = vec![
            format!("'{}' is a build pipeline", pipeline.id),
            format!(
                "communication link '{}' is a non-readonly devops link to '{}'",
                link.id, target.id
            ),
            format!(
                "'{}' is in scope, not development relevant and used for business",
                target.id
            ),
        ];
        steps.extend(explain_ladder(
            &format!("deployment target '{}'", target.id),
            &Ratings::processed(model, target),
            Self::impact(model, target),
        ));
        Some(steps)
    }
}

builtin_rule!(
    UncheckedDeployment,
    CategoryText {
        id: "unchecked-deployment",
        title: "Unchecked Deployment",
        description: "For each build-pipeline component Unchecked Deployment risks might arise when the build-pipeline \
            does not include established DevSecOps best-practices. DevSecOps best-practices scan as part of CI/CD pipelines for \
            vulnerabilities in source- or byte-code, dependencies, container layers, and dynamically against running test systems.",
        impact: "If this risk remains unmitigated, vulnerabilities in custom-developed software or their dependencies \
            might not be identified during continuous deployment cycles.",
        asvs: "V14 - Configuration Verification Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Vulnerable_Dependency_Management_Cheat_Sheet.html",
        action: "Build Pipeline Hardening",
        mitigation: "Apply DevSecOps best-practices and use scanning tools to identify vulnerabilities in source- or byte-code, \
            dependencies, container layers, and optionally also via dynamic scans against running test systems.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::Tampering,
        detection_logic: "All development-relevant technical assets.",
        risk_assessment: "The risk rating depends on the highest rating of the technical assets and data assets processed by deployment-receiving targets.",
        false_positives: "When the build-pipeline does not build any software components it can be considered a false positive \
            after individual review.",
        model_failure_possible_reason: false,
        cwe: 1127,
    }
);

impl RiskRule for UncheckedDeployment {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let mut risks = Vec::new();
        for asset in model.technical_assets.values() {
            if !asset.technologies.get_attribute(DEVELOPMENT_RELEVANT) {
                continue;
            }
            let targets = deployment_targets(model, asset);
            let mut impact = Impact::Low;
            for target_id in &targets {
                let target = model.require_technical_asset(target_id)?;
                if Ratings::processed(model, target).is_elevated() {
                    impact = Impact::Medium;
                }
            }
            let mut breached = vec![asset.id.clone()];
            breached.extend(targets);
            let title = format!("<b>Unchecked Deployment</b> risk at <b>{}</b>", asset.title);
            risks.push(
                Risk::new(&self.category, Likelihood::Unlikely, impact, title)
                    .with_technical_asset(&asset.id)
                    .with_data_breach(DataBreachProbability::Possible, breached)
                    .with_synthetic_id(&[&asset.id]),
            );
        }
        Ok(risks)
    }
}

builtin_rule!(
    MissingBuildInfrastructure,
    CategoryText {
        id: "missing-build-infrastructure",
        title: "Missing Build Infrastructure",
        description: "The modeled architecture does not contain a build infrastructure (devops-client, sourcecode-repo, build-pipeline, etc.), \
            which might be the risk of a model missing critical assets (and thus not seeing their risks). \
            If the architecture contains custom-developed parts, the pipeline where code gets developed \
            and built needs to be part of the model.",
        impact: "If this risk is unmitigated, attackers might be able to exploit risks unseen in this threat model due to \
            critical build infrastructure components missing in the model.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Build Pipeline Hardening",
        mitigation: "Include the build infrastructure in the model.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Architecture,
        stride: Stride::Tampering,
        detection_logic: "Models with in-scope custom-developed parts missing in-scope development (code creation) and build infrastructure \
            components (devops-client, sourcecode-repo, build-pipeline, etc.).",
        risk_assessment: "The risk rating depends on the highest sensitivity of the in-scope assets running custom-developed parts.",
        false_positives: "Models not having any custom-developed parts \
            can be considered as false positives after individual review.",
        model_failure_possible_reason: true,
        cwe: 1127,
    }
);

impl RiskRule for MissingBuildInfrastructure {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let has = |name: &str| {
            model
                .technical_assets
                .values()
                .any(|asset| asset.technologies.has_any_type(&[name]))
        };
        if has(BUILD_PIPELINE) && has(SOURCECODE_REPOSITORY) && has(DEVOPS_CLIENT) {
            return Ok(Vec::new());
        }
        let custom: Vec<&TechnicalAsset> = model
            .technical_assets_in_scope()
            .filter(|asset| asset.custom_developed_parts)
            .collect();
        let Some(example) = most_sensitive(custom.iter().copied()) else {
            return Ok(Vec::new());
        };
        let elevated = custom
            .iter()
            .any(|asset| Ratings::processed(model, asset).is_elevated());
        let impact = if elevated { Impact::Medium } else { Impact::Low };
        let title = format!(
            "<b>Missing Build Infrastructure</b> in the threat model (referencing asset <b>{}</b> as an example)",
            example.title
        );
        Ok(vec![Risk::new(&self.category, Likelihood::Unlikely, impact, title)
            .with_technical_asset(&example.id)
            .with_data_breach(DataBreachProbability::Improbable, Vec::<String>::new())
            .with_synthetic_id(&[&example.id])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;

    #[test]
    fn test_out_of_scope_git_repository_has_no_leak() {
        let mut input = ModelInput::default();
        let mut repo = datastore("repo", &["sourcecode-repository"]);
        repo.out_of_scope = true;
        repo.tags = vec!["git".into()];
        input.technical_assets.push(repo);
        let model = build(input);
        let risks = AccidentalSecretLeak::new().generate_risks(&model).unwrap();
        assert!(risks.is_empty(), "out-of-scope repository must not produce risks");
    }

    #[test]
    fn test_git_tag_changes_title() {
        let mut input = ModelInput::default();
        let mut repo = datastore("repo", &["sourcecode-repository"]);
        repo.tags = vec!["git".into()];
        input.technical_assets.push(repo);
        input.technical_assets.push(datastore("nexus", &["artifact-registry"]));
        let model = build(input);
        let rule = AccidentalSecretLeak::new();
        let risks = rule.generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 2);
        assert_eq!(risks[0].synthetic_id, "accidental-secret-leak@nexus");
        assert!(!risks[0].title.contains("Git"));
        assert!(risks[1].title.contains("Git Leak Prevention"));
        assert_eq!(risks[1].exploitation_impact, Impact::Low);
        let steps = rule.explain_risk(&model, &risks[1].synthetic_id).unwrap();
        assert!(steps.iter().any(|s| s.contains("tagged 'git'")));
    }

    #[test]
    fn test_code_backdooring_when_called_from_internet() {
        let mut input = ModelInput::default();
        input.data_assets.push(data("code", Confidentiality::Confidential, Criticality::Important));
        let mut dev = asset("laptop", &["devops-client"]);
        dev.internet = true;
        dev.out_of_scope = true;
        dev.communication_links.push(link("laptop>ci", "ci", Protocol::Https));
        input.technical_assets.push(dev);
        let mut ci = asset("ci", &["build-pipeline"]);
        ci.data_assets_processed.push("code".into());
        let mut deploy = link("ci>app", "app", Protocol::Ssh);
        deploy.usage = Usage::DevOps;
        deploy.data_assets_sent.push("code".into());
        ci.communication_links.push(deploy);
        input.technical_assets.push(ci);
        input.technical_assets.push(asset("app", &["web-server"]));
        input.technical_assets.push(asset("scanner", &["code-inspection-platform"]));
        let model = build(input);

        let risks = CodeBackdooring::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1, "only the exposed pipeline should fire");
        assert_eq!(risks[0].synthetic_id, "code-backdooring@ci");
        assert_eq!(risks[0].exploitation_impact, Impact::High);
        assert_eq!(risks[0].data_breach_technical_asset_ids, vec!["app", "ci"]);
    }

    #[test]
    fn test_container_rules() {
        let mut input = ModelInput::default();
        let mut k8s = asset("k8s", &["container-platform"]);
        k8s.availability = Criticality::MissionCritical;
        input.technical_assets.push(k8s);
        let mut pod = asset("pod", &["web-server"]);
        pod.machine = Machine::Container;
        input.technical_assets.push(pod);
        let model = build(input);

        let escape = ContainerPlatformEscape::new().generate_risks(&model).unwrap();
        assert_eq!(escape.len(), 1);
        assert_eq!(escape[0].exploitation_impact, Impact::High);
        assert_eq!(escape[0].data_breach_technical_asset_ids, vec!["pod"]);

        let backdoor = ContainerBaseImageBackdooring::new().generate_risks(&model).unwrap();
        assert_eq!(backdoor.len(), 1);
        assert_eq!(backdoor[0].synthetic_id, "container-baseimage-backdooring@pod");
        assert_eq!(backdoor[0].exploitation_impact, Impact::Medium);
    }

    fn pipeline_model(readonly: bool) -> ParsedModel {
        let mut input = ModelInput::default();
        input.data_assets.push(data("artifact", Confidentiality::Internal, Criticality::Important));
        let mut ci = asset("ci", &["build-pipeline"]);
        let mut deploy = link("ci>app", "app", Protocol::Ssh);
        deploy.usage = Usage::DevOps;
        deploy.readonly = readonly;
        deploy.data_assets_sent.push("artifact".into());
        ci.communication_links.push(deploy);
        input.technical_assets.push(ci);
        input.technical_assets.push(asset("app", &["web-server"]));
        build(input)
    }

    #[test]
    fn test_push_deployment_fires_once() {
        let model = pipeline_model(false);
        let rule = PushInsteadOfPullDeployment::new();
        let risks = rule.generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        let risk = &risks[0];
        assert_eq!(risk.synthetic_id, "push-instead-of-pull-deployment@ci@app");
        assert_eq!(risk.most_relevant_technical_asset_id, "app");
        assert_eq!(risk.most_relevant_communication_link_id, "ci>app");
        assert_eq!(risk.exploitation_impact, Impact::Low);
        assert!(rule.explain_risk(&model, &risk.synthetic_id).is_some());
    }

    #[test]
    fn test_readonly_deployment_is_pull() {
        let model = pipeline_model(true);
        assert!(PushInsteadOfPullDeployment::new().generate_risks(&model).unwrap().is_empty());
    }

    #[test]
    fn test_unchecked_deployment_breach_targets() {
        let model = pipeline_model(false);
        let risks = UncheckedDeployment::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].data_breach_technical_asset_ids, vec!["app", "ci"]);
        assert_eq!(risks[0].exploitation_impact, Impact::Low);
    }

    #[test]
    fn test_missing_build_infrastructure() {
        let mut input = ModelInput::default();
        let mut app = asset("app", &["web-server"]);
        app.custom_developed_parts = true;
        app.confidentiality = Confidentiality::Confidential;
        input.technical_assets.push(app);
        let mut api = asset("api", &["web-service-rest"]);
        api.custom_developed_parts = true;
        input.technical_assets.push(api);
        let model = build(input);
        let risks = MissingBuildInfrastructure::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].most_relevant_technical_asset_id, "app");
        assert_eq!(risks[0].exploitation_impact, Impact::Medium);
        assert!(risks[0].data_breach_technical_asset_ids.is_empty());
    }
}
