//! Services for the resources a domain owns

use crate::domain::{
    Certificate, Client, DomainResource, IdentityProvider, ResourceKind, Role, User,
};
use crate::error::Result;
use crate::repository::{
    CertificateRepository, ClientRepository, IdentityProviderRepository, RoleRepository,
    UserRepository,
};
use async_trait::async_trait;
use std::sync::Arc;

/// What domain deletion needs from every dependent resource family.
#[async_trait]
pub trait DomainResourceService: Send + Sync {
    type Resource: DomainResource;

    fn kind(&self) -> ResourceKind;

    /// Every resource of the family owned by `domain`. Order is not significant.
    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Self::Resource>>;

    /// Remove one resource. Removing an absent resource succeeds.
    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct ClientService<R: ClientRepository> {
    repo: Arc<R>,
}

impl<R: ClientRepository> ClientService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Client>> {
        self.repo.find_by_id(id).await
    }

    pub async fn create(&self, client: Client) -> Result<Client> {
        self.repo.create(&client).await
    }
}

#[async_trait]
impl<R: ClientRepository> DomainResourceService for ClientService<R> {
    type Resource = Client;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Client
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Client>> {
        self.repo.find_by_domain(domain).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await
    }
}

pub struct CertificateService<R: CertificateRepository> {
    repo: Arc<R>,
}

impl<R: CertificateRepository> CertificateService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Certificate>> {
        self.repo.find_by_id(id).await
    }

    pub async fn create(&self, certificate: Certificate) -> Result<Certificate> {
        self.repo.create(&certificate).await
    }
}

#[async_trait]
impl<R: CertificateRepository> DomainResourceService for CertificateService<R> {
    type Resource = Certificate;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Certificate
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Certificate>> {
        self.repo.find_by_domain(domain).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await
    }
}

pub struct IdentityProviderService<R: IdentityProviderRepository> {
    repo: Arc<R>,
}

impl<R: IdentityProviderRepository> IdentityProviderService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<IdentityProvider>> {
        self.repo.find_by_id(id).await
    }

    pub async fn create(&self, provider: IdentityProvider) -> Result<IdentityProvider> {
        self.repo.create(&provider).await
    }
}

#[async_trait]
impl<R: IdentityProviderRepository> DomainResourceService for IdentityProviderService<R> {
    type Resource = IdentityProvider;

    fn kind(&self) -> ResourceKind {
        ResourceKind::IdentityProvider
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<IdentityProvider>> {
        self.repo.find_by_domain(domain).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await
    }
}

pub struct RoleService<R: RoleRepository> {
    repo: Arc<R>,
}

impl<R: RoleRepository> RoleService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        self.repo.find_by_id(id).await
    }

    pub async fn create(&self, role: Role) -> Result<Role> {
        self.repo.create(&role).await
    }
}

#[async_trait]
impl<R: RoleRepository> DomainResourceService for RoleService<R> {
    type Resource = Role;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Role
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Role>> {
        self.repo.find_by_domain(domain).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await
    }
}

pub struct UserService<R: UserRepository> {
    repo: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.repo.find_by_id(id).await
    }

    pub async fn create(&self, user: User) -> Result<User> {
        self.repo.create(&user).await
    }
}

#[async_trait]
impl<R: UserRepository> DomainResourceService for UserService<R> {
    type Resource = User;

    fn kind(&self) -> ResourceKind {
        ResourceKind::User
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<User>> {
        self.repo.find_by_domain(domain).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete(id).await
    }
}
