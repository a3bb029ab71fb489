//! Certificate repository

use crate::domain::Certificate;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Certificate>>;
    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Certificate>>;
    async fn create(&self, certificate: &Certificate) -> Result<Certificate>;
    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct CertificateRepositoryImpl {
    pool: MySqlPool,
}

impl CertificateRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CertificateRepository for CertificateRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<Certificate>> {
        let certificate = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT id, domain, name, `type`, configuration, created_at, updated_at
            FROM certificates
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Vec<Certificate>> {
        let certificates = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT id, domain, name, `type`, configuration, created_at, updated_at
            FROM certificates
            WHERE domain = ?
            "#,
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }

    async fn create(&self, certificate: &Certificate) -> Result<Certificate> {
        sqlx::query(
            r#"
            INSERT INTO certificates (id, domain, name, `type`, configuration, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&certificate.id)
        .bind(&certificate.domain)
        .bind(&certificate.name)
        .bind(&certificate.kind)
        .bind(&certificate.configuration)
        .bind(certificate.created_at)
        .bind(certificate.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_by_id(&certificate.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create certificate")))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM certificates WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_mock_certificate_repository() {
        let mut mock = MockCertificateRepository::new();

        mock.expect_delete().with(eq("cert-1")).times(1).returning(|_| Ok(()));

        mock.delete("cert-1").await.unwrap();
    }
}
