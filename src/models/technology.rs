//! Technology catalog
//!
//! Technologies are open sets of boolean capability attributes rather than a
//! closed enumeration. A technology inherits the attributes of its parent and
//! always carries an attribute named after itself, so rules can ask either
//! "is this a vault" or "does this tolerate unprotected communications" with
//! the same lookup.

use crate::errors::{ThreatGraphError, ThreatGraphResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const MAY_CONTAIN_SECRETS: &str = "may_contain_secrets";
pub const NO_AUTHENTICATION_REQUIRED: &str = "no_authentication_required";
pub const HIGH_VALUE_TARGET: &str = "high_value_target";
pub const WEB_SERVICE: &str = "web_service";
pub const IDENTITY_STORE: &str = "identity_store";
pub const NO_NETWORK_SEGMENTATION_REQUIRED: &str = "no_network_segmentation_required";
pub const IDENTITY_RELATED: &str = "identity_related";
pub const FILE_STORAGE: &str = "file_storage";
pub const SEARCH_RELATED: &str = "search_related";
pub const VULNERABLE_TO_QUERY_INJECTION: &str = "vulnerable_to_query_injection";
pub const NO_STORAGE_AT_REST: &str = "no_storage_at_rest";
pub const HTTP_INTERNET_ACCESS_OK: &str = "http_internet_access_ok";
pub const FTP_INTERNET_ACCESS_OK: &str = "ftp_internet_access_ok";
pub const SECURITY_CONTROL_RELATED: &str = "security_control_related";
pub const UNPROTECTED_COMMUNICATIONS_TOLERATED: &str = "unprotected_communications_tolerated";
pub const UNNECESSARY_DATA_TOLERATED: &str = "unnecessary_data_tolerated";
pub const CLOSE_TO_HIGH_VALUE_TARGETS_TOLERATED: &str = "close_to_high_value_targets_tolerated";
pub const CLIENT: &str = "client";
pub const PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS: &str = "propagate_identity_to_outgoing_targets";
pub const LESS_PROTECTED_TYPE: &str = "less_protected_type";
pub const PROCESSING_END_USER_REQUESTS: &str = "processing_end_user_requests";
pub const STORING_END_USER_DATA: &str = "storing_end_user_data";
pub const FRONTEND_RELATED: &str = "frontend_related";
pub const BACKEND_RELATED: &str = "backend_related";
pub const DEVELOPMENT_RELEVANT: &str = "development_relevant";
pub const TRAFFIC_FORWARDING: &str = "traffic_forwarding";
pub const EMBEDDED_COMPONENT: &str = "embedded_component";

// Technology names that rules look up directly
pub const UNKNOWN_TECHNOLOGY: &str = "unknown-technology";
pub const APPLICATION_SERVER: &str = "application-server";
pub const ARTIFACT_REGISTRY: &str = "artifact-registry";
pub const BUILD_PIPELINE: &str = "build-pipeline";
pub const CODE_INSPECTION_PLATFORM: &str = "code-inspection-platform";
pub const CONTAINER_PLATFORM: &str = "container-platform";
pub const DEVOPS_CLIENT: &str = "devops-client";
pub const EJB: &str = "ejb";
pub const ERP: &str = "erp";
pub const FILE_SERVER: &str = "file-server";
pub const IDENTITY_PROVIDER: &str = "identity-provider";
pub const IDENTITY_STORE_DATABASE: &str = "identity-store-database";
pub const IDENTITY_STORE_LDAP: &str = "identity-store-ldap";
pub const IDS: &str = "ids";
pub const IPS: &str = "ips";
pub const LIBRARY: &str = "library";
pub const LOAD_BALANCER: &str = "load-balancer";
pub const LOCAL_FILE_SYSTEM: &str = "local-file-system";
pub const MONITORING: &str = "monitoring";
pub const REVERSE_PROXY: &str = "reverse-proxy";
pub const SERVICE_REGISTRY: &str = "service-registry";
pub const SOURCECODE_REPOSITORY: &str = "sourcecode-repository";
pub const VAULT: &str = "vault";
pub const WAF: &str = "waf";
pub const WEB_APPLICATION: &str = "web-application";

/// A named technology and its capability attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    #[serde(default)]
    pub name: String,
    /// Technology whose attributes this one inherits
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, bool>,
}

impl Technology {
    /// Reference by name only; attributes are filled in when resolved
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn get_attribute(&self, attribute: &str) -> bool {
        self.attributes.get(attribute).copied().unwrap_or(false)
    }
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Technologies of a single technical asset
///
/// Serialized as a plain list of names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TechnologyList(pub Vec<Technology>);

impl From<Vec<String>> for TechnologyList {
    fn from(names: Vec<String>) -> Self {
        Self(names.into_iter().map(Technology::named).collect())
    }
}

impl From<TechnologyList> for Vec<String> {
    fn from(list: TechnologyList) -> Self {
        list.0.into_iter().map(|technology| technology.name).collect()
    }
}

impl TechnologyList {
    /// True if any technology carries the attribute
    pub fn get_attribute(&self, attribute: &str) -> bool {
        self.0.iter().any(|technology| technology.get_attribute(attribute))
    }

    /// True if any technology carries any of the attributes
    pub fn get_any_attribute(&self, attributes: &[&str]) -> bool {
        attributes.iter().any(|attribute| self.get_attribute(attribute))
    }

    /// True if any technology is one of the named types
    pub fn has_any_type(&self, names: &[&str]) -> bool {
        self.0
            .iter()
            .any(|technology| names.iter().any(|name| technology.name == *name))
    }

    /// A list is unknown when it names `unknown-technology` or nothing in it
    /// carries a single attribute
    pub fn is_unknown(&self) -> bool {
        if self.get_attribute(UNKNOWN_TECHNOLOGY) {
            return true;
        }
        self.0.iter().all(|technology| technology.attributes.is_empty())
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|technology| technology.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TechnologyList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.names().join("/"))
    }
}

/// Catalog of known technologies, keyed by name
#[derive(Debug, Clone, Default)]
pub struct TechnologyCatalog {
    technologies: BTreeMap<String, Technology>,
}

impl TechnologyCatalog {
    /// Catalog of the built-in technologies with inherited attributes applied
    pub fn builtin() -> Self {
        let mut technologies = BTreeMap::new();
        for (name, description, attributes) in BUILTIN_TECHNOLOGIES {
            let technology = Technology {
                name: name.to_string(),
                description: description.to_string(),
                attributes: attributes
                    .iter()
                    .map(|attribute| (attribute.to_string(), true))
                    .collect(),
                ..Default::default()
            };
            technologies.insert(name.to_string(), technology);
        }
        let mut catalog = Self { technologies };
        catalog.propagate_attributes();
        catalog
    }

    /// Merge technology definitions from a JSON or YAML file mapping names to
    /// definitions. Definitions replace built-in entries of the same name.
    pub fn load_from_file(&mut self, path: &Path) -> ThreatGraphResult<usize> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ThreatGraphError::io(e, Some(path.to_path_buf())))?;
        let definitions: BTreeMap<String, Technology> = if crate::config::is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        let count = definitions.len();
        for (name, mut technology) in definitions {
            technology.name = name.clone();
            log::debug!("Loaded technology '{}' from {:?}", name, path);
            self.technologies.insert(name, technology);
        }
        self.propagate_attributes();
        Ok(count)
    }

    /// Recompute every entry's attributes as the union of its ancestors',
    /// its own, and its name
    pub fn propagate_attributes(&mut self) {
        let mut resolved = BTreeMap::new();
        for (name, technology) in &self.technologies {
            let mut attributes = BTreeMap::new();
            let mut visited = BTreeSet::new();
            self.collect_attributes(name, &mut attributes, &mut visited);
            attributes.insert(name.clone(), true);
            let mut technology = technology.clone();
            technology.attributes = attributes;
            resolved.insert(name.clone(), technology);
        }
        self.technologies = resolved;
    }

    fn collect_attributes(
        &self,
        name: &str,
        attributes: &mut BTreeMap<String, bool>,
        visited: &mut BTreeSet<String>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(technology) = self.technologies.get(name) else {
            return;
        };
        if !technology.parent.is_empty() {
            self.collect_attributes(&technology.parent, attributes, visited);
        }
        for (key, value) in &technology.attributes {
            attributes.insert(key.clone(), *value);
        }
    }

    /// Look up by name or alias
    pub fn get(&self, name: &str) -> Option<&Technology> {
        let name = name.trim();
        self.technologies.get(name).or_else(|| {
            self.technologies
                .values()
                .find(|technology| technology.aliases.iter().any(|alias| alias == name))
        })
    }

    /// Replace name-only references with full catalog entries
    pub fn resolve(&self, list: &TechnologyList) -> ThreatGraphResult<TechnologyList> {
        let mut resolved = Vec::with_capacity(list.0.len());
        for technology in &list.0 {
            let found = self.get(&technology.name).ok_or_else(|| ThreatGraphError::UnknownValue {
                kind: "technology",
                value: technology.name.clone(),
            })?;
            resolved.push(found.clone());
        }
        Ok(TechnologyList(resolved))
    }

    pub fn len(&self) -> usize {
        self.technologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Technology> {
        self.technologies.values()
    }
}

const BUILTIN_TECHNOLOGIES: &[(&str, &str, &[&str])] = &[
    ("ai", "Artificial intelligence model or service", &[LESS_PROTECTED_TYPE]),
    (
        "application-server",
        "Application server hosting business logic",
        &[WEB_APPLICATION, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, PROCESSING_END_USER_REQUESTS, HIGH_VALUE_TARGET],
    ),
    (
        "artifact-registry",
        "Registry for build artifacts and images",
        &[DEVELOPMENT_RELEVANT, LESS_PROTECTED_TYPE, MAY_CONTAIN_SECRETS],
    ),
    ("batch-processing", "Batch job processing", &[BACKEND_RELATED]),
    (
        "big-data-platform",
        "Big data platform",
        &[BACKEND_RELATED, VULNERABLE_TO_QUERY_INJECTION],
    ),
    (
        "block-storage",
        "Block storage volumes",
        &[STORING_END_USER_DATA, BACKEND_RELATED, FILE_STORAGE],
    ),
    (
        "browser",
        "Web browser",
        &[CLIENT, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, FRONTEND_RELATED],
    ),
    (
        "build-pipeline",
        "Continuous integration and delivery pipeline",
        &[DEVELOPMENT_RELEVANT, LESS_PROTECTED_TYPE],
    ),
    (
        "client-system",
        "Generic client system",
        &[CLIENT, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, FRONTEND_RELATED],
    ),
    ("cli", "Command line tool", &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS]),
    (
        "cms",
        "Content management system",
        &[WEB_APPLICATION, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, FRONTEND_RELATED, HTTP_INTERNET_ACCESS_OK],
    ),
    (
        "code-inspection-platform",
        "Static code analysis platform",
        &[DEVELOPMENT_RELEVANT, LESS_PROTECTED_TYPE],
    ),
    ("container-platform", "Container orchestration platform", &[BACKEND_RELATED]),
    (
        "data-lake",
        "Data lake",
        &[BACKEND_RELATED, VULNERABLE_TO_QUERY_INJECTION],
    ),
    (
        "database",
        "Relational or NoSQL database",
        &[STORING_END_USER_DATA, BACKEND_RELATED, VULNERABLE_TO_QUERY_INJECTION],
    ),
    (
        "desktop",
        "Desktop application",
        &[CLIENT, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, FRONTEND_RELATED],
    ),
    (
        "devops-client",
        "Developer or operator workstation",
        &[CLIENT, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, FRONTEND_RELATED, DEVELOPMENT_RELEVANT],
    ),
    (
        "ejb",
        "Enterprise Java bean",
        &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, PROCESSING_END_USER_REQUESTS, BACKEND_RELATED],
    ),
    (
        "erp",
        "Enterprise resource planning system",
        &[WEB_APPLICATION, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, PROCESSING_END_USER_REQUESTS, STORING_END_USER_DATA, BACKEND_RELATED, HIGH_VALUE_TARGET],
    ),
    ("event-listener", "Event listener", &[BACKEND_RELATED]),
    (
        "file-server",
        "File server",
        &[STORING_END_USER_DATA, BACKEND_RELATED, FILE_STORAGE, FTP_INTERNET_ACCESS_OK],
    ),
    ("function", "Serverless function", &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS]),
    (
        "gateway",
        "API gateway",
        &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, FRONTEND_RELATED, HTTP_INTERNET_ACCESS_OK],
    ),
    ("hsm", "Hardware security module", &[SECURITY_CONTROL_RELATED, BACKEND_RELATED]),
    (
        "identity-provider",
        "Identity provider",
        &[WEB_APPLICATION, IDENTITY_RELATED, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, BACKEND_RELATED, HIGH_VALUE_TARGET],
    ),
    (
        "identity-store-database",
        "Identity store backed by a database",
        &[IDENTITY_RELATED, IDENTITY_STORE, BACKEND_RELATED, VULNERABLE_TO_QUERY_INJECTION],
    ),
    (
        "identity-store-ldap",
        "Identity store backed by LDAP",
        &[IDENTITY_RELATED, IDENTITY_STORE, BACKEND_RELATED],
    ),
    (
        "ids",
        "Intrusion detection system",
        &[SECURITY_CONTROL_RELATED, UNPROTECTED_COMMUNICATIONS_TOLERATED, UNNECESSARY_DATA_TOLERATED, CLOSE_TO_HIGH_VALUE_TARGETS_TOLERATED, NO_AUTHENTICATION_REQUIRED, NO_NETWORK_SEGMENTATION_REQUIRED, NO_STORAGE_AT_REST],
    ),
    (
        "iot-device",
        "Internet of things device",
        &[CLIENT, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, FRONTEND_RELATED],
    ),
    (
        "ips",
        "Intrusion prevention system",
        &[SECURITY_CONTROL_RELATED, UNPROTECTED_COMMUNICATIONS_TOLERATED, UNNECESSARY_DATA_TOLERATED, CLOSE_TO_HIGH_VALUE_TARGETS_TOLERATED, NO_AUTHENTICATION_REQUIRED, NO_NETWORK_SEGMENTATION_REQUIRED, NO_STORAGE_AT_REST],
    ),
    ("ldap-server", "LDAP directory server", &[BACKEND_RELATED]),
    (
        "library",
        "Library embedded into its caller",
        &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, EMBEDDED_COMPONENT],
    ),
    (
        "load-balancer",
        "Load balancer",
        &[TRAFFIC_FORWARDING, CLOSE_TO_HIGH_VALUE_TARGETS_TOLERATED, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, FRONTEND_RELATED, NO_AUTHENTICATION_REQUIRED, NO_STORAGE_AT_REST, HTTP_INTERNET_ACCESS_OK],
    ),
    (
        "local-file-system",
        "Local file system",
        &[STORING_END_USER_DATA, FILE_STORAGE],
    ),
    (
        "mail-server",
        "Mail server",
        &[STORING_END_USER_DATA, LESS_PROTECTED_TYPE],
    ),
    ("mainframe", "Mainframe", &[LESS_PROTECTED_TYPE, BACKEND_RELATED]),
    (
        "message-queue",
        "Message queue or broker",
        &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, STORING_END_USER_DATA, BACKEND_RELATED],
    ),
    (
        "mobile-app",
        "Mobile application",
        &[CLIENT, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, FRONTEND_RELATED],
    ),
    (
        "monitoring",
        "Monitoring system",
        &[UNPROTECTED_COMMUNICATIONS_TOLERATED, UNNECESSARY_DATA_TOLERATED, CLOSE_TO_HIGH_VALUE_TARGETS_TOLERATED, LESS_PROTECTED_TYPE],
    ),
    (
        "report-engine",
        "Report engine",
        &[WEB_APPLICATION, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, PROCESSING_END_USER_REQUESTS],
    ),
    (
        "reverse-proxy",
        "Reverse proxy",
        &[TRAFFIC_FORWARDING, CLOSE_TO_HIGH_VALUE_TARGETS_TOLERATED, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, FRONTEND_RELATED, NO_AUTHENTICATION_REQUIRED, NO_NETWORK_SEGMENTATION_REQUIRED, NO_STORAGE_AT_REST, HTTP_INTERNET_ACCESS_OK],
    ),
    ("scheduler", "Job scheduler", &[LESS_PROTECTED_TYPE, BACKEND_RELATED]),
    (
        "search-engine",
        "Search engine",
        &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, BACKEND_RELATED, SEARCH_RELATED],
    ),
    ("search-index", "Search index", &[BACKEND_RELATED, SEARCH_RELATED]),
    (
        "service-mesh",
        "Service mesh",
        &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, BACKEND_RELATED],
    ),
    (
        "service-registry",
        "Service registry",
        &[NO_AUTHENTICATION_REQUIRED, NO_NETWORK_SEGMENTATION_REQUIRED],
    ),
    (
        "sourcecode-repository",
        "Source code repository",
        &[DEVELOPMENT_RELEVANT, LESS_PROTECTED_TYPE, MAY_CONTAIN_SECRETS],
    ),
    (
        "stream-processing",
        "Stream processing",
        &[STORING_END_USER_DATA, BACKEND_RELATED],
    ),
    ("task", "Scheduled or one-off task", &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS]),
    ("tool", "Generic tool", &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS]),
    ("unknown-technology", "Technology not yet specified", &[]),
    ("vault", "Secret storage", &[SECURITY_CONTROL_RELATED, BACKEND_RELATED]),
    (
        "waf",
        "Web application firewall",
        &[SECURITY_CONTROL_RELATED, TRAFFIC_FORWARDING, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, FRONTEND_RELATED, NO_AUTHENTICATION_REQUIRED, NO_NETWORK_SEGMENTATION_REQUIRED, NO_STORAGE_AT_REST, HTTP_INTERNET_ACCESS_OK],
    ),
    (
        "web-application",
        "Web application",
        &[PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, PROCESSING_END_USER_REQUESTS, HTTP_INTERNET_ACCESS_OK],
    ),
    (
        "web-server",
        "Web server",
        &[WEB_APPLICATION, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, PROCESSING_END_USER_REQUESTS, HTTP_INTERNET_ACCESS_OK],
    ),
    (
        "web-service-rest",
        "REST web service",
        &[WEB_SERVICE, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, PROCESSING_END_USER_REQUESTS, BACKEND_RELATED],
    ),
    (
        "web-service-soap",
        "SOAP web service",
        &[WEB_SERVICE, PROPAGATE_IDENTITY_TO_OUTGOING_TARGETS, LESS_PROTECTED_TYPE, PROCESSING_END_USER_REQUESTS, BACKEND_RELATED],
    ),
];
