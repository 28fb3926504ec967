//! Built-in rule catalog
//!
//! Rules are grouped by family; `all_rules` lists them in category-ID order,
//! which is also the order their risks appear in the output.

mod cloud;
mod exposure;
mod hygiene;
mod injection;
mod isolation;
mod missing_controls;
mod pipeline;

pub use cloud::MissingCloudHardening;
pub use exposure::{
    DosRiskyAccessAcrossTrustBoundary, UnencryptedAsset, UnencryptedCommunication,
    UnguardedAccessFromInternet, UnguardedDirectDatastoreAccess,
};
pub use hygiene::{
    IncompleteModel, UnnecessaryCommunicationLink, UnnecessaryDataAsset, UnnecessaryDataTransfer,
    UnnecessaryTechnicalAsset, WrongCommunicationLinkContent, WrongTrustBoundaryContent,
};
pub use injection::{
    CrossSiteRequestForgery, CrossSiteScripting, LdapInjection, PathTraversal,
    SearchQueryInjection, ServerSideRequestForgery, SqlNosqlInjection, UntrustedDeserialization,
    XmlExternalEntity,
};
pub use isolation::{
    MissingIdentityProviderIsolation, MissingNetworkSegmentation, MissingVaultIsolation,
    MixedTargetsOnSharedRuntime,
};
pub use missing_controls::{
    MissingAuthentication, MissingAuthenticationSecondFactor, MissingFileValidation,
    MissingHardening, MissingIdentityPropagation, MissingIdentityStore, MissingVault, MissingWaf,
    ServiceRegistryPoisoning,
};
pub use pipeline::{
    AccidentalSecretLeak, CodeBackdooring, ContainerBaseImageBackdooring,
    ContainerPlatformEscape, MissingBuildInfrastructure, PushInsteadOfPullDeployment,
    UncheckedDeployment,
};

use super::RiskRule;

/// Every built-in rule, sorted by category ID
pub fn all_rules() -> Vec<Box<dyn RiskRule>> {
    vec![
        Box::new(AccidentalSecretLeak::new()),
        Box::new(CodeBackdooring::new()),
        Box::new(ContainerBaseImageBackdooring::new()),
        Box::new(ContainerPlatformEscape::new()),
        Box::new(CrossSiteRequestForgery::new()),
        Box::new(CrossSiteScripting::new()),
        Box::new(DosRiskyAccessAcrossTrustBoundary::new()),
        Box::new(IncompleteModel::new()),
        Box::new(LdapInjection::new()),
        Box::new(MissingAuthentication::new()),
        Box::new(MissingAuthenticationSecondFactor::new()),
        Box::new(MissingBuildInfrastructure::new()),
        Box::new(MissingCloudHardening::new()),
        Box::new(MissingFileValidation::new()),
        Box::new(MissingHardening::new()),
        Box::new(MissingIdentityPropagation::new()),
        Box::new(MissingIdentityProviderIsolation::new()),
        Box::new(MissingIdentityStore::new()),
        Box::new(MissingNetworkSegmentation::new()),
        Box::new(MissingVault::new()),
        Box::new(MissingVaultIsolation::new()),
        Box::new(MissingWaf::new()),
        Box::new(MixedTargetsOnSharedRuntime::new()),
        Box::new(PathTraversal::new()),
        Box::new(PushInsteadOfPullDeployment::new()),
        Box::new(SearchQueryInjection::new()),
        Box::new(ServerSideRequestForgery::new()),
        Box::new(ServiceRegistryPoisoning::new()),
        Box::new(SqlNosqlInjection::new()),
        Box::new(UncheckedDeployment::new()),
        Box::new(UnencryptedAsset::new()),
        Box::new(UnencryptedCommunication::new()),
        Box::new(UnguardedAccessFromInternet::new()),
        Box::new(UnguardedDirectDatastoreAccess::new()),
        Box::new(UnnecessaryCommunicationLink::new()),
        Box::new(UnnecessaryDataAsset::new()),
        Box::new(UnnecessaryDataTransfer::new()),
        Box::new(UnnecessaryTechnicalAsset::new()),
        Box::new(UntrustedDeserialization::new()),
        Box::new(WrongCommunicationLinkContent::new()),
        Box::new(WrongTrustBoundaryContent::new()),
        Box::new(XmlExternalEntity::new()),
    ]
}

/// Entity IDs encoded in a synthetic ID, without the category part
pub(crate) fn id_parts(synthetic_id: &str) -> Vec<&str> {
    synthetic_id.split(crate::identity::ID_SEPARATOR).skip(1).collect()
}
