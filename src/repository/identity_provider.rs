//! Identity provider repository

use crate::domain::IdentityProvider;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProviderRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<IdentityProvider>>;
    async fn find_by_domain(&self, domain: &str) -> Result<Vec<IdentityProvider>>;
    async fn create(&self, provider: &IdentityProvider) -> Result<IdentityProvider>;
    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct IdentityProviderRepositoryImpl {
    pool: MySqlPool,
}

impl IdentityProviderRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProviderRepository for IdentityProviderRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<IdentityProvider>> {
        let provider = sqlx::query_as::<_, IdentityProvider>(
            r#"
            SELECT id, domain, name, `type`, configuration, external, created_at, updated_at
            FROM identity_providers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(provider)
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<IdentityProvider>> {
        let providers = sqlx::query_as::<_, IdentityProvider>(
            r#"
            SELECT id, domain, name, `type`, configuration, external, created_at, updated_at
            FROM identity_providers
            WHERE domain = ?
            "#,
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;

        Ok(providers)
    }

    async fn create(&self, provider: &IdentityProvider) -> Result<IdentityProvider> {
        sqlx::query(
            r#"
            INSERT INTO identity_providers (id, domain, name, `type`, configuration, external,
                                            created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&provider.id)
        .bind(&provider.domain)
        .bind(&provider.name)
        .bind(&provider.kind)
        .bind(&provider.configuration)
        .bind(provider.external)
        .bind(provider.created_at)
        .bind(provider.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_by_id(&provider.id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Failed to create identity provider"))
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM identity_providers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
