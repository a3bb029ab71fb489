//! In-memory repositories and service builders for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use warden_core::cache::NoOpCacheManager;
use warden_core::config::ReissuePolicy;
use warden_core::domain::{
    AccessToken, AuthorizationCode, Certificate, Client, Domain, DomainResource,
    IdentityProvider, RefreshToken, Role, User,
};
use warden_core::error::{AppError, Result};
use warden_core::repository::{
    AccessTokenRepository, AuthorizationCodeRepository, CertificateRepository, ClientRepository,
    DomainRepository, IdentityProviderRepository, RefreshTokenRepository, RoleRepository,
    UserRepository,
};
use warden_core::service::{
    AuthorizationCodeService, CertificateService, ClientService, DomainDependencies,
    DomainService, IdentityProviderService, RoleService, TokenStore, UserService,
};

// ==================== Domains ====================

pub struct TestDomainRepository {
    domains: RwLock<Vec<Domain>>,
}

impl TestDomainRepository {
    pub fn new() -> Self {
        Self {
            domains: RwLock::new(vec![]),
        }
    }

    pub async fn add_domain(&self, domain: Domain) {
        self.domains.write().await.push(domain);
    }

    pub async fn count(&self) -> usize {
        self.domains.read().await.len()
    }
}

impl Default for TestDomainRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainRepository for TestDomainRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Domain>> {
        let domains = self.domains.read().await;
        Ok(domains.iter().find(|d| d.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Domain>> {
        Ok(self.domains.read().await.clone())
    }

    async fn find_by_id_in(&self, ids: &[String]) -> Result<Vec<Domain>> {
        let domains = self.domains.read().await;
        Ok(domains
            .iter()
            .filter(|d| ids.contains(&d.id))
            .cloned()
            .collect())
    }

    async fn find_master(&self) -> Result<Option<Domain>> {
        let domains = self.domains.read().await;
        Ok(domains.iter().find(|d| d.master).cloned())
    }

    async fn create(&self, domain: &Domain) -> Result<Domain> {
        let mut domains = self.domains.write().await;
        if domains.iter().any(|d| d.id == domain.id) {
            return Err(AppError::AlreadyExists(format!(
                "Domain {} already exists",
                domain.id
            )));
        }
        domains.push(domain.clone());
        Ok(domain.clone())
    }

    async fn update(&self, domain: &Domain) -> Result<Domain> {
        let mut domains = self.domains.write().await;
        let stored = domains
            .iter_mut()
            .find(|d| d.id == domain.id)
            .ok_or_else(|| AppError::NotFound(format!("Domain {} not found", domain.id)))?;
        *stored = domain.clone();
        Ok(domain.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut domains = self.domains.write().await;
        let before = domains.len();
        domains.retain(|d| d.id != id);
        if domains.len() == before {
            return Err(AppError::NotFound(format!("Domain {} not found", id)));
        }
        Ok(())
    }
}

// ==================== Domain resources ====================

/// Store shared by the five resource families.
///
/// `fail_deletes` makes the next N deletes fail with a database error, to
/// exercise interrupted cascades.
pub struct TestResourceRepository<T> {
    items: RwLock<Vec<T>>,
    deletes: AtomicUsize,
    fail_deletes: AtomicUsize,
}

impl<T: DomainResource + Clone> TestResourceRepository<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(vec![]),
            deletes: AtomicUsize::new(0),
            fail_deletes: AtomicUsize::new(0),
        }
    }

    pub async fn add(&self, item: T) {
        self.items.write().await.push(item);
    }

    pub async fn count_in(&self, domain: &str) -> usize {
        let items = self.items.read().await;
        items.iter().filter(|i| i.domain() == domain).count()
    }

    /// Delete calls received, failed ones included
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn fail_next_deletes(&self, n: usize) {
        self.fail_deletes.store(n, Ordering::SeqCst);
    }

    async fn get(&self, id: &str) -> Option<T> {
        let items = self.items.read().await;
        items.iter().find(|i| i.id() == id).cloned()
    }

    async fn by_domain(&self, domain: &str) -> Vec<T> {
        let items = self.items.read().await;
        items
            .iter()
            .filter(|i| i.domain() == domain)
            .cloned()
            .collect()
    }

    async fn insert(&self, item: &T) -> T {
        self.items.write().await.push(item.clone());
        item.clone()
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .fail_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        self.items.write().await.retain(|i| i.id() != id);
        Ok(())
    }
}

impl<T: DomainResource + Clone> Default for TestResourceRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_test_resource_repository {
    ($($trait_:ident => $ty:ty),+ $(,)?) => {
        $(
            #[async_trait]
            impl $trait_ for TestResourceRepository<$ty> {
                async fn find_by_id(&self, id: &str) -> Result<Option<$ty>> {
                    Ok(self.get(id).await)
                }

                async fn find_by_domain(&self, domain: &str) -> Result<Vec<$ty>> {
                    Ok(self.by_domain(domain).await)
                }

                async fn create(&self, item: &$ty) -> Result<$ty> {
                    Ok(self.insert(item).await)
                }

                async fn delete(&self, id: &str) -> Result<()> {
                    self.remove(id).await
                }
            }
        )+
    };
}

impl_test_resource_repository!(
    ClientRepository => Client,
    CertificateRepository => Certificate,
    IdentityProviderRepository => IdentityProvider,
    RoleRepository => Role,
    UserRepository => User,
);

// ==================== Grants ====================

pub struct TestAccessTokenRepository {
    tokens: RwLock<Vec<AccessToken>>,
}

impl TestAccessTokenRepository {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(vec![]),
        }
    }

    pub async fn count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

impl Default for TestAccessTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessTokenRepository for TestAccessTokenRepository {
    async fn create(&self, token: &AccessToken) -> Result<()> {
        self.tokens.write().await.push(token.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn find_by_authentication_key(&self, key: &str) -> Result<Option<AccessToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .iter()
            .filter(|t| t.authentication_key == key)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn find_all_by_authentication_key(&self, key: &str) -> Result<Vec<AccessToken>> {
        let tokens = self.tokens.read().await;
        let mut found: Vec<AccessToken> = tokens
            .iter()
            .filter(|t| t.authentication_key == key)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_by_client_id(&self, client_id: &str) -> Result<Vec<AccessToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .iter()
            .filter(|t| t.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Vec<AccessToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .iter()
            .filter(|t| t.subject.as_deref() == Some(subject))
            .cloned()
            .collect())
    }

    async fn find_by_client_id_and_subject(
        &self,
        client_id: &str,
        subject: &str,
    ) -> Result<Vec<AccessToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .iter()
            .filter(|t| t.client_id == client_id && t.subject.as_deref() == Some(subject))
            .cloned()
            .collect())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.tokens.write().await.retain(|t| t.token != token);
        Ok(())
    }

    async fn delete_by_refresh_token(&self, refresh_token: &str) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| t.refresh_token.as_deref() != Some(refresh_token));
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_by_authentication_key(&self, key: &str) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| t.authentication_key != key);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_by_subject(&self, subject: &str) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| t.subject.as_deref() != Some(subject));
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| !t.is_expired_at(now));
        Ok((before - tokens.len()) as u64)
    }
}

pub struct TestRefreshTokenRepository {
    tokens: RwLock<Vec<RefreshToken>>,
}

impl TestRefreshTokenRepository {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(vec![]),
        }
    }

    pub async fn count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

impl Default for TestRefreshTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenRepository for TestRefreshTokenRepository {
    async fn create(&self, token: &RefreshToken) -> Result<()> {
        self.tokens.write().await.push(token.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.tokens.write().await.retain(|t| t.token != token);
        Ok(())
    }

    async fn delete_by_subject(&self, subject: &str) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| t.subject.as_deref() != Some(subject));
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| !t.is_expired_at(now));
        Ok((before - tokens.len()) as u64)
    }
}

/// Codes behind one mutex so that check-and-mark is a single step
pub struct TestAuthorizationCodeRepository {
    codes: Mutex<Vec<AuthorizationCode>>,
}

impl TestAuthorizationCodeRepository {
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(vec![]),
        }
    }

    pub async fn add_code(&self, code: AuthorizationCode) {
        self.codes.lock().await.push(code);
    }

    pub async fn get(&self, code: &str) -> Option<AuthorizationCode> {
        let codes = self.codes.lock().await;
        codes.iter().find(|c| c.code == code).cloned()
    }

    pub async fn count(&self) -> usize {
        self.codes.lock().await.len()
    }
}

impl Default for TestAuthorizationCodeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthorizationCodeRepository for TestAuthorizationCodeRepository {
    async fn create(&self, code: &AuthorizationCode) -> Result<()> {
        let mut codes = self.codes.lock().await;
        if codes.iter().any(|c| c.code == code.code) {
            return Err(AppError::AlreadyExists(format!(
                "Authorization code {} already exists",
                code.code
            )));
        }
        codes.push(code.clone());
        Ok(())
    }

    async fn consume(&self, code: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>> {
        let mut codes = self.codes.lock().await;
        match codes
            .iter_mut()
            .find(|c| c.code == code && c.is_redeemable_at(now))
        {
            Some(stored) => {
                stored.consumed_at = Some(now);
                Ok(Some(stored.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut codes = self.codes.lock().await;
        let before = codes.len();
        codes.retain(|c| c.expires_at > now);
        Ok((before - codes.len()) as u64)
    }
}

// ==================== Service builders ====================

pub type TestDomainService = DomainService<
    TestDomainRepository,
    ClientService<TestResourceRepository<Client>>,
    CertificateService<TestResourceRepository<Certificate>>,
    IdentityProviderService<TestResourceRepository<IdentityProvider>>,
    RoleService<TestResourceRepository<Role>>,
    UserService<TestResourceRepository<User>>,
    NoOpCacheManager,
>;

/// Repositories behind a [`TestDomainService`], kept for seeding and assertions
#[derive(Default)]
pub struct DomainFixture {
    pub domains: Arc<TestDomainRepository>,
    pub clients: Arc<TestResourceRepository<Client>>,
    pub certificates: Arc<TestResourceRepository<Certificate>>,
    pub identity_providers: Arc<TestResourceRepository<IdentityProvider>>,
    pub roles: Arc<TestResourceRepository<Role>>,
    pub users: Arc<TestResourceRepository<User>>,
}

impl DomainFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(&self) -> TestDomainService {
        let dependencies = DomainDependencies {
            clients: Arc::new(ClientService::new(self.clients.clone())),
            certificates: Arc::new(CertificateService::new(self.certificates.clone())),
            identity_providers: Arc::new(IdentityProviderService::new(
                self.identity_providers.clone(),
            )),
            roles: Arc::new(RoleService::new(self.roles.clone())),
            users: Arc::new(UserService::new(self.users.clone())),
        };

        DomainService::new(
            self.domains.clone(),
            dependencies,
            Arc::new(NoOpCacheManager::new()),
        )
    }

    /// Resources left in `domain` across all five families
    pub async fn resources_in(&self, domain: &str) -> usize {
        self.clients.count_in(domain).await
            + self.certificates.count_in(domain).await
            + self.identity_providers.count_in(domain).await
            + self.roles.count_in(domain).await
            + self.users.count_in(domain).await
    }
}

pub type TestTokenStore = TokenStore<TestAccessTokenRepository, TestRefreshTokenRepository>;

pub fn token_store(
    policy: ReissuePolicy,
) -> (
    TestTokenStore,
    Arc<TestAccessTokenRepository>,
    Arc<TestRefreshTokenRepository>,
) {
    let access = Arc::new(TestAccessTokenRepository::new());
    let refresh = Arc::new(TestRefreshTokenRepository::new());
    let store = TokenStore::new(access.clone(), refresh.clone(), policy);
    (store, access, refresh)
}

pub fn authorization_code_service(
    ttl_secs: i64,
) -> (
    AuthorizationCodeService<TestAuthorizationCodeRepository>,
    Arc<TestAuthorizationCodeRepository>,
) {
    let repo = Arc::new(TestAuthorizationCodeRepository::new());
    let service = AuthorizationCodeService::new(repo.clone(), ttl_secs);
    (service, repo)
}
