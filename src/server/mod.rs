//! Service wiring and process lifecycle

use crate::cache::Notifier;
use crate::config::Config;
use crate::repository::{
    AccessTokenRepositoryImpl, AuthorizationCodeRepositoryImpl, CertificateRepositoryImpl,
    ClientRepositoryImpl, DomainRepositoryImpl, IdentityProviderRepositoryImpl,
    RefreshTokenRepositoryImpl, RoleRepositoryImpl, UserRepositoryImpl,
};
use crate::service::{
    ApprovalService, AuthorizationCodeService, CertificateService, ClientService,
    DomainDependencies, DomainService, GrantReaper, IdentityProviderService, PurgeStats,
    RoleService, TokenStore, UserService,
};
use anyhow::{Context, Result};
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

pub type AppDomainService = DomainService<
    DomainRepositoryImpl,
    ClientService<ClientRepositoryImpl>,
    CertificateService<CertificateRepositoryImpl>,
    IdentityProviderService<IdentityProviderRepositoryImpl>,
    RoleService<RoleRepositoryImpl>,
    UserService<UserRepositoryImpl>,
    Notifier,
>;
pub type AppTokenStore = TokenStore<AccessTokenRepositoryImpl, RefreshTokenRepositoryImpl>;
pub type AppAuthorizationCodeService = AuthorizationCodeService<AuthorizationCodeRepositoryImpl>;
pub type AppApprovalService = ApprovalService<AccessTokenRepositoryImpl, RefreshTokenRepositoryImpl>;
pub type AppGrantReaper = GrantReaper<
    AccessTokenRepositoryImpl,
    RefreshTokenRepositoryImpl,
    AuthorizationCodeRepositoryImpl,
>;

/// Services exposed to the management console and protocol handlers
#[derive(Clone)]
pub struct AppServices {
    pub domains: Arc<AppDomainService>,
    pub tokens: Arc<AppTokenStore>,
    pub authorization_codes: Arc<AppAuthorizationCodeService>,
    pub approvals: Arc<AppApprovalService>,
}

impl AppServices {
    pub fn new(config: &Config, pool: MySqlPool, notifier: Notifier) -> Self {
        let dependencies = DomainDependencies {
            clients: Arc::new(ClientService::new(Arc::new(ClientRepositoryImpl::new(
                pool.clone(),
            )))),
            certificates: Arc::new(CertificateService::new(Arc::new(
                CertificateRepositoryImpl::new(pool.clone()),
            ))),
            identity_providers: Arc::new(IdentityProviderService::new(Arc::new(
                IdentityProviderRepositoryImpl::new(pool.clone()),
            ))),
            roles: Arc::new(RoleService::new(Arc::new(RoleRepositoryImpl::new(
                pool.clone(),
            )))),
            users: Arc::new(UserService::new(Arc::new(UserRepositoryImpl::new(
                pool.clone(),
            )))),
        };

        let domains = Arc::new(DomainService::new(
            Arc::new(DomainRepositoryImpl::new(pool.clone())),
            dependencies,
            Arc::new(notifier),
        ));

        let tokens = Arc::new(TokenStore::new(
            Arc::new(AccessTokenRepositoryImpl::new(pool.clone())),
            Arc::new(RefreshTokenRepositoryImpl::new(pool.clone())),
            config.grants.reissue_policy.clone(),
        ));

        let authorization_codes = Arc::new(AuthorizationCodeService::new(
            Arc::new(AuthorizationCodeRepositoryImpl::new(pool)),
            config.grants.authorization_code_ttl_secs,
        ));

        let approvals = Arc::new(ApprovalService::new(tokens.clone()));

        Self {
            domains,
            tokens,
            authorization_codes,
            approvals,
        }
    }

    pub fn reaper(&self, config: &Config) -> AppGrantReaper {
        GrantReaper::new(
            self.tokens.clone(),
            self.authorization_codes.clone(),
            Duration::from_secs(config.grants.purge_interval_secs),
        )
    }
}

pub async fn connect(config: &Config) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    info!("Connected to database");
    Ok(pool)
}

/// Migrate, bootstrap the master domain and purge expired grants until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    crate::migration::run_migrations(&config).await?;

    let pool = connect(&config).await?;
    let notifier = Notifier::from_config(config.redis.as_ref()).await?;
    let services = AppServices::new(&config, pool.clone(), notifier);

    let master = services
        .domains
        .bootstrap_master(&config.master_domain_name)
        .await?;
    info!(domain_id = %master.id, "Master domain ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = tokio::spawn(services.reaper(&config).run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    reaper.await.context("Grant reaper task failed")?;
    pool.close().await;

    Ok(())
}

/// Run a single purge cycle
pub async fn purge(config: Config) -> Result<PurgeStats> {
    let pool = connect(&config).await?;
    let services = AppServices::new(&config, pool.clone(), Notifier::Disabled(Default::default()));

    let stats = services.reaper(&config).run_once().await?;
    pool.close().await;
    Ok(stats)
}
