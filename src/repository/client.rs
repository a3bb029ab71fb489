//! Client repository

use super::to_json;
use crate::domain::Client;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Client>>;
    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Client>>;
    async fn create(&self, client: &Client) -> Result<Client>;
    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct ClientRepositoryImpl {
    pool: MySqlPool,
}

impl ClientRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for ClientRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, domain, client_id, client_secret, redirect_uris,
                   authorized_grant_types, scopes, enabled, created_at, updated_at
            FROM clients
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, domain, client_id, client_secret, redirect_uris,
                   authorized_grant_types, scopes, enabled, created_at, updated_at
            FROM clients
            WHERE domain = ?
            "#,
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    async fn create(&self, client: &Client) -> Result<Client> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, domain, client_id, client_secret, redirect_uris,
                                 authorized_grant_types, scopes, enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&client.id)
        .bind(&client.domain)
        .bind(&client.client_id)
        .bind(&client.client_secret)
        .bind(to_json(&client.redirect_uris)?)
        .bind(to_json(&client.authorized_grant_types)?)
        .bind(to_json(&client.scopes)?)
        .bind(client.enabled)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_by_id(&client.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create client")))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
