//! Ordered rating tiers and closed vocabularies of the threat model.
//!
//! Every enumeration serializes to its kebab-case name and orders its
//! variants from the weakest to the strongest tier, so `>=` comparisons read
//! the same way the ratings are written in a model file.

use crate::errors::ThreatGraphError;
use serde::{Deserialize, Serialize};

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) default $default:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Every variant in ascending order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ThreatGraphError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let wanted = value.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == wanted)
                    .ok_or_else(|| ThreatGraphError::UnknownValue {
                        kind: $kind,
                        value: value.to_string(),
                    })
            }
        }
    };
}

string_enum! {
    /// Confidentiality rating of an asset or data asset
    pub enum Confidentiality ("confidentiality") default Public {
        Public => "public",
        Internal => "internal",
        Restricted => "restricted",
        Confidential => "confidential",
        StrictlyConfidential => "strictly-confidential",
    }
}

impl Confidentiality {
    /// Attacker attractiveness of a technical asset carrying this rating
    pub fn attacker_attractiveness_for_asset(&self) -> f64 {
        [8.0, 13.0, 21.0, 34.0, 55.0][*self as usize]
    }

    /// Attacker attractiveness of data processed or stored at an asset
    pub fn attacker_attractiveness_for_processed_or_stored_data(&self) -> f64 {
        [5.0, 8.0, 13.0, 21.0, 34.0][*self as usize]
    }

    /// Attacker attractiveness of data merely passing an asset
    pub fn attacker_attractiveness_for_in_transfered_data(&self) -> f64 {
        [2.0, 3.0, 5.0, 8.0, 13.0][*self as usize]
    }
}

string_enum! {
    /// Integrity or availability rating
    pub enum Criticality ("criticality") default Archive {
        Archive => "archive",
        Operational => "operational",
        Important => "important",
        Critical => "critical",
        MissionCritical => "mission-critical",
    }
}

impl Criticality {
    pub fn attacker_attractiveness_for_asset(&self) -> f64 {
        [5.0, 8.0, 13.0, 21.0, 34.0][*self as usize]
    }

    pub fn attacker_attractiveness_for_processed_or_stored_data(&self) -> f64 {
        [3.0, 5.0, 8.0, 13.0, 21.0][*self as usize]
    }

    pub fn attacker_attractiveness_for_in_transfered_data(&self) -> f64 {
        [2.0, 3.0, 5.0, 8.0, 13.0][*self as usize]
    }
}

string_enum! {
    /// How likely an attacker is to exploit a risk
    pub enum Likelihood ("exploitation likelihood") default Likely {
        Unlikely => "unlikely",
        Likely => "likely",
        VeryLikely => "very-likely",
        Frequent => "frequent",
    }
}

impl Likelihood {
    pub fn weight(&self) -> u32 {
        *self as u32 + 1
    }
}

string_enum! {
    /// Damage done when a risk is exploited
    pub enum Impact ("exploitation impact") default Medium {
        Low => "low",
        Medium => "medium",
        High => "high",
        VeryHigh => "very-high",
    }
}

impl Impact {
    pub fn weight(&self) -> u32 {
        *self as u32 + 1
    }
}

string_enum! {
    /// Combined rating of likelihood and impact
    pub enum Severity ("risk severity") default Medium {
        Low => "low",
        Medium => "medium",
        Elevated => "elevated",
        High => "high",
        Critical => "critical",
    }
}

impl Severity {
    pub fn title(&self) -> &'static str {
        ["Low", "Medium", "Elevated", "High", "Critical"][*self as usize]
    }
}

string_enum! {
    pub enum DataBreachProbability ("data breach probability") default Possible {
        Improbable => "improbable",
        Possible => "possible",
        Probable => "probable",
    }
}

string_enum! {
    /// Human disposition recorded for a risk
    pub enum RiskStatus ("risk status") default Unchecked {
        Unchecked => "unchecked",
        InDiscussion => "in-discussion",
        Accepted => "accepted",
        InProgress => "in-progress",
        Mitigated => "mitigated",
        FalsePositive => "false-positive",
    }
}

impl RiskStatus {
    /// Everything short of mitigated or false-positive keeps a risk open
    pub fn is_still_at_risk(&self) -> bool {
        matches!(
            self,
            RiskStatus::Unchecked
                | RiskStatus::InDiscussion
                | RiskStatus::Accepted
                | RiskStatus::InProgress
        )
    }
}

string_enum! {
    /// Team function that owns the mitigation of a risk category
    pub enum RiskFunction ("risk function") default BusinessSide {
        BusinessSide => "business-side",
        Architecture => "architecture",
        Development => "development",
        Operations => "operations",
    }
}

string_enum! {
    pub enum Stride ("STRIDE category") default Spoofing {
        Spoofing => "spoofing",
        Tampering => "tampering",
        Repudiation => "repudiation",
        InformationDisclosure => "information-disclosure",
        DenialOfService => "denial-of-service",
        ElevationOfPrivilege => "elevation-of-privilege",
    }
}

string_enum! {
    pub enum TrustBoundaryType ("trust boundary type") default NetworkOnPrem {
        NetworkOnPrem => "network-on-prem",
        NetworkDedicatedHoster => "network-dedicated-hoster",
        NetworkVirtualLan => "network-virtual-lan",
        NetworkCloudProvider => "network-cloud-provider",
        NetworkCloudSecurityGroup => "network-cloud-security-group",
        NetworkPolicyNamespaceIsolation => "network-policy-namespace-isolation",
        ExecutionEnvironment => "execution-environment",
    }
}

impl TrustBoundaryType {
    /// Execution environments group co-located processes without isolating them
    pub fn is_network_boundary(&self) -> bool {
        !matches!(self, TrustBoundaryType::ExecutionEnvironment)
    }

    pub fn is_within_cloud(&self) -> bool {
        matches!(
            self,
            TrustBoundaryType::NetworkCloudProvider | TrustBoundaryType::NetworkCloudSecurityGroup
        )
    }
}

string_enum! {
    pub enum Protocol ("protocol") default UnknownProtocol {
        UnknownProtocol => "unknown-protocol",
        Http => "http",
        Https => "https",
        Ws => "ws",
        Wss => "wss",
        ReverseProxyWebProtocol => "reverse-proxy-web-protocol",
        ReverseProxyWebProtocolEncrypted => "reverse-proxy-web-protocol-encrypted",
        Mqtt => "mqtt",
        Jdbc => "jdbc",
        JdbcEncrypted => "jdbc-encrypted",
        Odbc => "odbc",
        OdbcEncrypted => "odbc-encrypted",
        SqlAccessProtocol => "sql-access-protocol",
        SqlAccessProtocolEncrypted => "sql-access-protocol-encrypted",
        NosqlAccessProtocol => "nosql-access-protocol",
        NosqlAccessProtocolEncrypted => "nosql-access-protocol-encrypted",
        Binary => "binary",
        BinaryEncrypted => "binary-encrypted",
        Text => "text",
        TextEncrypted => "text-encrypted",
        Ssh => "ssh",
        SshTunnel => "ssh-tunnel",
        Smtp => "smtp",
        SmtpEncrypted => "smtp-encrypted",
        Pop3 => "pop3",
        Pop3Encrypted => "pop3-encrypted",
        Imap => "imap",
        ImapEncrypted => "imap-encrypted",
        Ftp => "ftp",
        Ftps => "ftps",
        Sftp => "sftp",
        Scp => "scp",
        Ldap => "ldap",
        Ldaps => "ldaps",
        Jms => "jms",
        Nfs => "nfs",
        Smb => "smb",
        SmbEncrypted => "smb-encrypted",
        LocalFileAccess => "local-file-access",
        Nrpe => "nrpe",
        Xmpp => "xmpp",
        Iiop => "iiop",
        IiopEncrypted => "iiop-encrypted",
        Jrmp => "jrmp",
        JrmpEncrypted => "jrmp-encrypted",
        InProcessLibraryCall => "in-process-library-call",
        ContainerSpawning => "container-spawning",
    }
}

impl Protocol {
    /// Calls that never leave the calling process or host
    pub fn is_process_local(&self) -> bool {
        matches!(
            self,
            Protocol::InProcessLibraryCall | Protocol::LocalFileAccess | Protocol::ContainerSpawning
        )
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(
            self,
            Protocol::Https
                | Protocol::Wss
                | Protocol::JdbcEncrypted
                | Protocol::OdbcEncrypted
                | Protocol::NosqlAccessProtocolEncrypted
                | Protocol::SqlAccessProtocolEncrypted
                | Protocol::BinaryEncrypted
                | Protocol::TextEncrypted
                | Protocol::Ssh
                | Protocol::SshTunnel
                | Protocol::Ftps
                | Protocol::Sftp
                | Protocol::Scp
                | Protocol::Ldaps
                | Protocol::ReverseProxyWebProtocolEncrypted
                | Protocol::IiopEncrypted
                | Protocol::JrmpEncrypted
                | Protocol::SmbEncrypted
                | Protocol::SmtpEncrypted
                | Protocol::Pop3Encrypted
                | Protocol::ImapEncrypted
        )
    }

    /// Database access protocols; `lax` adds HTTP and raw binary, which some
    /// NoSQL stores speak
    pub fn is_potential_database_access_protocol(&self, lax: bool) -> bool {
        let strict = matches!(
            self,
            Protocol::Jdbc
                | Protocol::JdbcEncrypted
                | Protocol::Odbc
                | Protocol::OdbcEncrypted
                | Protocol::SqlAccessProtocol
                | Protocol::SqlAccessProtocolEncrypted
                | Protocol::NosqlAccessProtocol
                | Protocol::NosqlAccessProtocolEncrypted
        );
        if lax {
            return strict
                || matches!(
                    self,
                    Protocol::Http | Protocol::Https | Protocol::Binary | Protocol::BinaryEncrypted
                );
        }
        strict
    }

    pub fn is_potential_web_access_protocol(&self) -> bool {
        matches!(
            self,
            Protocol::Http
                | Protocol::Https
                | Protocol::Ws
                | Protocol::Wss
                | Protocol::ReverseProxyWebProtocol
                | Protocol::ReverseProxyWebProtocolEncrypted
        )
    }
}

string_enum! {
    pub enum Authentication ("authentication") default None {
        None => "none",
        Credentials => "credentials",
        SessionId => "session-id",
        Token => "token",
        ClientCertificate => "client-certificate",
        TwoFactor => "two-factor",
        Externalized => "externalized",
    }
}

string_enum! {
    pub enum Authorization ("authorization") default None {
        None => "none",
        TechnicalUser => "technical-user",
        EnduserIdentityPropagation => "enduser-identity-propagation",
    }
}

string_enum! {
    pub enum EncryptionStyle ("encryption style") default None {
        None => "none",
        Transparent => "transparent",
        DataWithSymmetricSharedKey => "data-with-symmetric-shared-key",
        DataWithAsymmetricSharedKey => "data-with-asymmetric-shared-key",
        DataWithEnduserIndividualKey => "data-with-enduser-individual-key",
    }
}

string_enum! {
    pub enum Usage ("usage") default Business {
        Business => "business",
        DevOps => "devops",
    }
}

string_enum! {
    pub enum DataFormat ("data format") default Json {
        Json => "json",
        Xml => "xml",
        Serialization => "serialization",
        File => "file",
        Csv => "csv",
    }
}

string_enum! {
    pub enum Quantity ("quantity") default VeryFew {
        VeryFew => "very-few",
        Few => "few",
        Many => "many",
        VeryMany => "very-many",
    }
}

impl Quantity {
    /// Multiplier applied to data-asset attractiveness
    pub fn quantity_factor(&self) -> f64 {
        [1.0, 2.0, 3.0, 5.0][*self as usize]
    }
}

string_enum! {
    pub enum Machine ("machine") default Physical {
        Physical => "physical",
        Virtual => "virtual",
        Container => "container",
        Serverless => "serverless",
    }
}

string_enum! {
    pub enum TechnicalAssetType ("technical asset type") default ExternalEntity {
        ExternalEntity => "external-entity",
        Process => "process",
        Datastore => "datastore",
    }
}

string_enum! {
    pub enum TechnicalAssetSize ("technical asset size") default System {
        System => "system",
        Service => "service",
        Application => "application",
        Component => "component",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_ordered() {
        assert!(Confidentiality::StrictlyConfidential > Confidentiality::Confidential);
        assert!(Criticality::MissionCritical > Criticality::Critical);
        assert!(Criticality::Operational > Criticality::Archive);
        assert!(Impact::VeryHigh > Impact::High);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let parsed: Protocol = "HTTPS".parse().expect("protocol should parse");
        assert_eq!(parsed, Protocol::Https);
        let status: RiskStatus = " in-progress ".parse().expect("status should parse");
        assert_eq!(status, RiskStatus::InProgress);
    }

    #[test]
    fn test_parse_unknown_value() {
        let err = "sometimes".parse::<Likelihood>().unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn test_serde_uses_kebab_names() {
        let json = serde_json::to_string(&Confidentiality::StrictlyConfidential).unwrap();
        assert_eq!(json, "\"strictly-confidential\"");
        let back: TrustBoundaryType = serde_json::from_str("\"execution-environment\"").unwrap();
        assert!(!back.is_network_boundary());
    }

    #[test]
    fn test_protocol_classification() {
        assert!(Protocol::Ldaps.is_encrypted());
        assert!(!Protocol::Http.is_encrypted());
        assert!(Protocol::LocalFileAccess.is_process_local());
        assert!(!Protocol::Http.is_potential_database_access_protocol(false));
        assert!(Protocol::Http.is_potential_database_access_protocol(true));
        assert!(Protocol::Wss.is_potential_web_access_protocol());
    }

    #[test]
    fn test_still_at_risk() {
        assert!(RiskStatus::Accepted.is_still_at_risk());
        assert!(!RiskStatus::Mitigated.is_still_at_risk());
        assert!(!RiskStatus::FalsePositive.is_still_at_risk());
    }

    #[test]
    fn test_attractiveness_tables() {
        assert_eq!(Confidentiality::StrictlyConfidential.attacker_attractiveness_for_asset(), 55.0);
        assert_eq!(Criticality::Archive.attacker_attractiveness_for_in_transfered_data(), 2.0);
        assert_eq!(Quantity::VeryMany.quantity_factor(), 5.0);
        assert_eq!(Likelihood::Frequent.weight(), 4);
    }
}
