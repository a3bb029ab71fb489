//! Domain repository

use super::is_duplicate_key;
use crate::domain::Domain;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Domain>>;
    async fn find_all(&self) -> Result<Vec<Domain>>;
    async fn find_by_id_in(&self, ids: &[String]) -> Result<Vec<Domain>>;
    async fn find_master(&self) -> Result<Option<Domain>>;
    async fn create(&self, domain: &Domain) -> Result<Domain>;
    async fn update(&self, domain: &Domain) -> Result<Domain>;
    async fn delete(&self, id: &str) -> Result<()>;
}

const SELECT_DOMAIN: &str = r#"
    SELECT id, name, description, enabled, master,
           login_form_enabled, login_form_content, login_form_assets,
           created_at, updated_at
    FROM domains
"#;

pub struct DomainRepositoryImpl {
    pool: MySqlPool,
}

impl DomainRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainRepository for DomainRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<Domain>> {
        let domain = sqlx::query_as::<_, Domain>(&format!("{SELECT_DOMAIN} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(domain)
    }

    async fn find_all(&self) -> Result<Vec<Domain>> {
        let domains = sqlx::query_as::<_, Domain>(&format!("{SELECT_DOMAIN} ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await?;

        Ok(domains)
    }

    async fn find_by_id_in(&self, ids: &[String]) -> Result<Vec<Domain>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<MySql> = QueryBuilder::new(SELECT_DOMAIN);
        query.push(" WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let domains = query
            .build_query_as::<Domain>()
            .fetch_all(&self.pool)
            .await?;

        Ok(domains)
    }

    async fn find_master(&self) -> Result<Option<Domain>> {
        let domain =
            sqlx::query_as::<_, Domain>(&format!("{SELECT_DOMAIN} WHERE master = TRUE LIMIT 1"))
                .fetch_optional(&self.pool)
                .await?;

        Ok(domain)
    }

    async fn create(&self, domain: &Domain) -> Result<Domain> {
        let form = domain.login_form.as_ref();
        sqlx::query(
            r#"
            INSERT INTO domains (id, name, description, enabled, master,
                                 login_form_enabled, login_form_content, login_form_assets,
                                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&domain.id)
        .bind(&domain.name)
        .bind(&domain.description)
        .bind(domain.enabled)
        .bind(domain.master)
        .bind(form.map(|f| f.enabled))
        .bind(form.and_then(|f| f.content.as_deref()))
        .bind(form.and_then(|f| f.assets.as_deref()))
        .bind(domain.created_at)
        .bind(domain.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::AlreadyExists(format!("Domain {} already exists", domain.id))
            } else {
                AppError::Database(e)
            }
        })?;

        self.find_by_id(&domain.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create domain")))
    }

    async fn update(&self, domain: &Domain) -> Result<Domain> {
        let form = domain.login_form.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE domains
            SET name = ?, description = ?, enabled = ?, master = ?,
                login_form_enabled = ?, login_form_content = ?, login_form_assets = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&domain.name)
        .bind(&domain.description)
        .bind(domain.enabled)
        .bind(domain.master)
        .bind(form.map(|f| f.enabled))
        .bind(form.and_then(|f| f.content.as_deref()))
        .bind(form.and_then(|f| f.assets.as_deref()))
        .bind(domain.updated_at)
        .bind(&domain.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // MySQL reports zero rows when nothing changed, so check existence
            return self
                .find_by_id(&domain.id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Domain {} not found", domain.id)));
        }

        self.find_by_id(&domain.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update domain")))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Domain {} not found", id)));
        }

        Ok(())
    }
}
