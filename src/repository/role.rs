//! Role repository

use super::to_json;
use crate::domain::Role;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>>;
    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Role>>;
    async fn create(&self, role: &Role) -> Result<Role>;
    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct RoleRepositoryImpl {
    pool: MySqlPool,
}

impl RoleRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for RoleRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, domain, name, description, permissions, created_at, updated_at
            FROM roles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, domain, name, description, permissions, created_at, updated_at
            FROM roles
            WHERE domain = ?
            ORDER BY name
            "#,
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn create(&self, role: &Role) -> Result<Role> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, domain, name, description, permissions, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&role.id)
        .bind(&role.domain)
        .bind(&role.name)
        .bind(&role.description)
        .bind(to_json(&role.permissions)?)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_by_id(&role.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create role")))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
