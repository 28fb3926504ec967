//! Cloud provider hardening

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::ThreatGraphResult;
use crate::graph::{ParsedModel, Tagged};
use crate::models::*;
use crate::rules::helpers::{builtin_rule, most_sensitive, CategoryText, Ratings};
use crate::rules::RiskRule;

const PROVIDER_TAGS: [&str; 4] = ["aws", "azure", "gcp", "ocp"];

const AWS_SUBTAGS: [&str; 10] = [
    "aws:vpc",
    "aws:ec2",
    "aws:s3",
    "aws:ebs",
    "aws:apigateway",
    "aws:lambda",
    "aws:dynamodb",
    "aws:rds",
    "aws:sqs",
    "aws:iam",
];

fn cloud_tags() -> Vec<&'static str> {
    PROVIDER_TAGS.iter().chain(AWS_SUBTAGS.iter()).copied().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Provider {
    Aws,
    Azure,
    Gcp,
    Ocp,
}

impl Provider {
    const ALL: [Provider; 4] = [Provider::Aws, Provider::Azure, Provider::Gcp, Provider::Ocp];

    fn base_tag(self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
            Provider::Ocp => "ocp",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Azure => "Azure",
            Provider::Gcp => "GCP",
            Provider::Ocp => "OCP",
        }
    }

    fn benchmark(self) -> &'static str {
        match self {
            Provider::Aws => "CIS Benchmark for AWS",
            Provider::Azure => "CIS Benchmark for Microsoft Azure",
            Provider::Gcp => "CIS Benchmark for Google Cloud Computing Platform",
            Provider::Ocp => "Vendor Best Practices for Oracle Cloud Platform",
        }
    }

    fn tagged_in<T: Tagged + ?Sized>(tagged: &T) -> Vec<Provider> {
        Self::ALL
            .into_iter()
            .filter(|provider| tagged.is_tagged_with_base_tag(provider.base_tag()))
            .collect()
    }
}

/// Sub-tag risks reported on top of the provider-wide ones
const SUBTAG_BENCHMARKS: [(&str, &str, &str); 2] = [
    ("aws:ec2", "EC2", "CIS Benchmark for Amazon Linux"),
    ("aws:s3", "S3", "Security Best Practices for AWS S3"),
];

/// Which model elements live in which cloud
#[derive(Debug, Default)]
struct CloudFootprint {
    runtimes: BTreeMap<Provider, BTreeSet<String>>,
    boundaries: BTreeMap<Provider, BTreeSet<String>>,
    assets: BTreeMap<Provider, BTreeSet<String>>,
    unspecific_runtimes: BTreeSet<String>,
    unspecific_boundaries: BTreeSet<String>,
    subtagged_assets: BTreeSet<String>,
}

impl CloudFootprint {
    fn scan(model: &ParsedModel) -> ThreatGraphResult<Self> {
        let tags = cloud_tags();
        let mut footprint = Self::default();

        for boundary in model.trust_boundaries.values() {
            let tagged = boundary.is_tagged_with_any(&tags);
            if !tagged && !boundary.boundary_type.is_within_cloud() {
                continue;
            }
            footprint.add_boundary(boundary, &tags);
            for id in model.recursively_contained_assets(&boundary.id) {
                let asset = model.require_technical_asset(&id)?;
                if asset.is_tagged_with_any(&tags) {
                    footprint.add_asset(asset, &asset.tags);
                } else if tagged {
                    footprint.add_asset(asset, &boundary.tags);
                }
            }
        }

        for asset in model.technical_assets_tagged_with_any(&tags) {
            footprint.add_asset(asset, &asset.tags);
        }

        for runtime in model.shared_runtimes_tagged_with_any(&tags) {
            footprint.add_runtime(runtime, &tags);
            for id in &runtime.technical_assets_running {
                let asset = model.require_technical_asset(id)?;
                footprint.add_asset(asset, &runtime.tags);
            }
        }
        Ok(footprint)
    }

    fn add_boundary(&mut self, boundary: &TrustBoundary, tags: &[&str]) {
        if !boundary.is_tagged_with_any(tags) {
            self.unspecific_boundaries.insert(boundary.id.clone());
            return;
        }
        for provider in Provider::tagged_in(boundary) {
            self.boundaries.entry(provider).or_default().insert(boundary.id.clone());
        }
    }

    fn add_runtime(&mut self, runtime: &SharedRuntime, tags: &[&str]) {
        if !runtime.is_tagged_with_any(tags) {
            self.unspecific_runtimes.insert(runtime.id.clone());
            return;
        }
        for provider in Provider::tagged_in(runtime) {
            self.runtimes.entry(provider).or_default().insert(runtime.id.clone());
        }
    }

    /// Files the asset under the providers named by `tags`, which may be its
    /// own tags or those of whatever contains it
    fn add_asset(&mut self, asset: &TechnicalAsset, tags: &[String]) {
        if asset.is_tagged_with_any(&AWS_SUBTAGS) {
            self.subtagged_assets.insert(asset.id.clone());
        }
        for provider in Provider::tagged_in(tags) {
            self.assets.entry(provider).or_default().insert(asset.id.clone());
        }
    }
}

builtin_rule!(
    /// Cloud-hosted components checked against their vendor's hardening guides
    MissingCloudHardening,
    CategoryText {
        id: "missing-cloud-hardening",
        title: "Missing Cloud Hardening",
        description: "Cloud components should be hardened according to the cloud vendor best practices. This affects their \
            configuration, auditing, and further areas.",
        impact: "If this risk is unmitigated, attackers might access cloud components in an unintended way.",
        asvs: "V1 - Architecture, Design and Threat Modeling Requirements",
        cheat_sheet: "https://cheatsheetseries.owasp.org/cheatsheets/Attack_Surface_Analysis_Cheat_Sheet.html",
        action: "Cloud Hardening",
        mitigation: "Apply hardening of all cloud components and services, taking special care to follow the individual risk descriptions (which \
            depend on the cloud provider tags in the model). \
            <br><br>For <b>Amazon Web Services (AWS)</b>: Follow the <i>CIS Benchmark for Amazon Web Services</i>. \
            <br>For EC2 and other servers running Amazon Linux, follow the <i>CIS Benchmark for Amazon Linux</i> and switch to IMDSv2. \
            <br>For S3 buckets follow the <i>Security Best Practices for Amazon S3</i> to avoid accidental leakage. \
            <br><br>For <b>Microsoft Azure</b>: Follow the <i>CIS Benchmark for Microsoft Azure</i>. \
            <br><br>For <b>Google Cloud Platform</b>: Follow the <i>CIS Benchmark for Google Cloud Computing Platform</i>. \
            <br><br>For <b>Oracle Cloud Platform</b>: Follow the hardening best practices.",
        check: "Are recommendations from the linked cheat sheet and referenced ASVS chapter applied?",
        function: RiskFunction::Operations,
        stride: Stride::Tampering,
        detection_logic: "In-scope cloud components (either residing in cloud trust boundaries or more specifically tagged with cloud provider types).",
        risk_assessment: "The risk rating depends on the sensitivity of the technical asset itself and of the data assets processed and stored.",
        false_positives: "Cloud components not running parts of the target architecture can be considered \
            as false positives after individual review.",
        model_failure_possible_reason: false,
        cwe: 1008,
    }
);

fn hardening_title(subject: &str, label: Option<&str>, details: Option<&str>) -> String {
    let mut title = String::from("<b>Missing Cloud Hardening");
    if let Some(label) = label {
        title.push_str(&format!(" ({})", label));
    }
    title.push_str(&format!("</b> risk at <b>{}</b>", subject));
    if let Some(details) = details {
        title.push_str(&format!(": <u>{}</u>", details));
    }
    title
}

fn hardening_impact(ratings: Ratings) -> Impact {
    ratings.ladder(Impact::Medium, Impact::High, Impact::VeryHigh)
}

impl MissingCloudHardening {
    fn runtime_risk(&self, model: &ParsedModel, runtime: &SharedRuntime, provider: Option<Provider>) -> Risk {
        let title = hardening_title(
            &runtime.title,
            provider.map(Provider::label),
            provider.map(Provider::benchmark),
        );
        Risk::new(&self.category, Likelihood::Unlikely, hardening_impact(Ratings::of(model, runtime)), title)
            .with_shared_runtime(&runtime.id)
            .with_data_breach(DataBreachProbability::Probable, runtime.technical_assets_running.iter().cloned())
            .with_synthetic_id(&[&runtime.id])
    }

    fn boundary_risk(&self, model: &ParsedModel, boundary: &TrustBoundary, provider: Option<Provider>) -> Risk {
        let title = hardening_title(
            &boundary.title,
            provider.map(Provider::label),
            provider.map(Provider::benchmark),
        );
        Risk::new(&self.category, Likelihood::Unlikely, hardening_impact(Ratings::of(model, boundary)), title)
            .with_trust_boundary(&boundary.id)
            .with_data_breach(DataBreachProbability::Probable, model.recursively_contained_assets(&boundary.id))
            .with_synthetic_id(&[&boundary.id])
    }

    fn asset_risk(
        &self,
        model: &ParsedModel,
        asset: &TechnicalAsset,
        label: &str,
        details: &str,
        discriminator: Option<&str>,
    ) -> Risk {
        let title = hardening_title(&asset.title, Some(label), Some(details));
        let mut parts = vec![asset.id.as_str()];
        parts.extend(discriminator);
        Risk::new(&self.category, Likelihood::Unlikely, hardening_impact(Ratings::of(model, asset)), title)
            .with_technical_asset(&asset.id)
            .with_data_breach(DataBreachProbability::Probable, [asset.id.as_str()])
            .with_synthetic_id(&parts)
    }
}

impl RiskRule for MissingCloudHardening {
    fn category(&self) -> &RiskCategory {
        &self.category
    }

    fn supported_tags(&self) -> Vec<String> {
        cloud_tags().into_iter().map(str::to_string).collect()
    }

    fn generate_risks(&self, model: &ParsedModel) -> ThreatGraphResult<Vec<Risk>> {
        let footprint = CloudFootprint::scan(model)?;
        let mut risks = Vec::new();
        let mut covered = BTreeSet::new();

        for (provider, ids) in &footprint.runtimes {
            for runtime in ids.iter().filter_map(|id| model.shared_runtimes.get(id)) {
                risks.push(self.runtime_risk(model, runtime, Some(*provider)));
                covered.insert(*provider);
            }
        }
        for runtime in footprint.unspecific_runtimes.iter().filter_map(|id| model.shared_runtimes.get(id)) {
            risks.push(self.runtime_risk(model, runtime, None));
        }

        for (provider, ids) in &footprint.boundaries {
            for boundary in ids.iter().filter_map(|id| model.trust_boundaries.get(id)) {
                risks.push(self.boundary_risk(model, boundary, Some(*provider)));
                covered.insert(*provider);
            }
        }
        for boundary in footprint.unspecific_boundaries.iter().filter_map(|id| model.trust_boundaries.get(id)) {
            risks.push(self.boundary_risk(model, boundary, None));
        }

        // one example asset per provider that had no runtime or boundary risk
        for provider in Provider::ALL {
            if covered.contains(&provider) {
                continue;
            }
            let Some(ids) = footprint.assets.get(&provider) else {
                continue;
            };
            if let Some(asset) = most_sensitive(ids.iter().filter_map(|id| model.technical_asset(id))) {
                risks.push(self.asset_risk(model, asset, provider.label(), provider.benchmark(), None));
            }
        }

        for asset in footprint.subtagged_assets.iter().filter_map(|id| model.technical_asset(id)) {
            for (subtag, label, details) in SUBTAG_BENCHMARKS {
                if model.is_tagged_with_any_traversing_up(asset, &[subtag]) {
                    let discriminator = label.to_lowercase();
                    risks.push(self.asset_risk(model, asset, label, details, Some(discriminator.as_str())));
                }
            }
        }
        Ok(risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;

    #[test]
    fn test_untagged_cloud_boundary_is_generic() {
        let mut input = ModelInput::default();
        input.technical_assets.push(asset("app", &["web-server"]));
        input.trust_boundaries.push(boundary("vpc", TrustBoundaryType::NetworkCloudProvider, &["app"], &[]));
        let model = build(input);
        let risks = MissingCloudHardening::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].synthetic_id, "missing-cloud-hardening@vpc");
        assert_eq!(risks[0].title, "<b>Missing Cloud Hardening</b> risk at <b>vpc</b>");
        assert_eq!(risks[0].data_breach_technical_asset_ids, vec!["app"]);
        assert_eq!(risks[0].exploitation_impact, Impact::Medium);
    }

    #[test]
    fn test_tagged_boundary_names_provider() {
        let mut input = ModelInput::default();
        let mut app = asset("app", &["web-server"]);
        app.confidentiality = Confidentiality::StrictlyConfidential;
        input.technical_assets.push(app);
        let mut vpc = boundary("vpc", TrustBoundaryType::NetworkCloudProvider, &["app"], &[]);
        vpc.tags = vec!["azure".into()];
        input.trust_boundaries.push(vpc);
        let model = build(input);
        let risks = MissingCloudHardening::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1, "the boundary risk covers azure, no asset example needed");
        assert!(risks[0].title.contains("(Azure)"));
        assert!(risks[0].title.ends_with("<u>CIS Benchmark for Microsoft Azure</u>"));
        assert_eq!(risks[0].exploitation_impact, Impact::VeryHigh);
    }

    #[test]
    fn test_tagged_assets_without_boundary_use_example() {
        let mut input = ModelInput::default();
        let mut plain = asset("plain", &["tool"]);
        plain.tags = vec!["gcp".into()];
        let mut sensitive = asset("sensitive", &["tool"]);
        sensitive.tags = vec!["gcp".into()];
        sensitive.integrity = Criticality::Critical;
        input.technical_assets.push(plain);
        input.technical_assets.push(sensitive);
        let model = build(input);
        let risks = MissingCloudHardening::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].synthetic_id, "missing-cloud-hardening@sensitive");
        assert_eq!(risks[0].exploitation_impact, Impact::High);
    }

    #[test]
    fn test_ec2_subtag_adds_specific_risk() {
        let mut input = ModelInput::default();
        let mut server = asset("server", &["application-server"]);
        server.tags = vec!["aws:ec2".into()];
        input.technical_assets.push(server);
        let model = build(input);
        let risks = MissingCloudHardening::new().generate_risks(&model).unwrap();
        let ids: Vec<_> = risks.iter().map(|r| r.synthetic_id.as_str()).collect();
        assert_eq!(ids, vec!["missing-cloud-hardening@server", "missing-cloud-hardening@server@ec2"]);
        assert!(risks[1].title.contains("(EC2)"));
    }

    #[test]
    fn test_tagged_runtime() {
        let mut input = ModelInput::default();
        input.technical_assets.push(asset("fn", &["tool"]));
        let mut rt = runtime("lambda", &["fn"]);
        rt.tags = vec!["aws".into()];
        input.shared_runtimes.push(rt);
        let model = build(input);
        let risks = MissingCloudHardening::new().generate_risks(&model).unwrap();
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].most_relevant_shared_runtime_id, "lambda");
    }

    #[test]
    fn test_no_cloud_no_risk() {
        let mut input = ModelInput::default();
        input.technical_assets.push(asset("app", &["web-server"]));
        input.trust_boundaries.push(boundary("lan", TrustBoundaryType::NetworkOnPrem, &["app"], &[]));
        let model = build(input);
        assert!(MissingCloudHardening::new().generate_risks(&model).unwrap().is_empty());
    }
}
