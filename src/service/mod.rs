//! Business logic layer

pub mod approval;
pub mod authorization_code;
pub mod domain;
pub mod reaper;
pub mod resource;
pub mod token_store;

pub use approval::ApprovalService;
pub use authorization_code::AuthorizationCodeService;
pub use domain::{DomainDependencies, DomainService};
pub use reaper::{GrantReaper, PurgeStats};
pub use resource::{
    CertificateService, ClientService, DomainResourceService, IdentityProviderService,
    RoleService, UserService,
};
pub use token_store::TokenStore;
