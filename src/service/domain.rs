//! Domain lifecycle: tenant CRUD and cascading deletion

use super::resource::DomainResourceService;
use crate::cache::DomainNotifier;
use crate::domain::{
    slugify, Domain, DomainResource, NewDomain, ResourceKind, UpdateDomain, UpdateLoginForm,
};
use crate::error::{AppError, Result};
use crate::repository::DomainRepository;
use crate::telemetry::metrics::{record_domain_operation, DOMAIN_CASCADE_DELETED};
use chrono::Utc;
use futures::future::try_join_all;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

/// Services of the resource families a domain owns
pub struct DomainDependencies<C, CE, IP, RO, U> {
    pub clients: Arc<C>,
    pub certificates: Arc<CE>,
    pub identity_providers: Arc<IP>,
    pub roles: Arc<RO>,
    pub users: Arc<U>,
}

impl<C, CE, IP, RO, U> Clone for DomainDependencies<C, CE, IP, RO, U> {
    fn clone(&self) -> Self {
        Self {
            clients: self.clients.clone(),
            certificates: self.certificates.clone(),
            identity_providers: self.identity_providers.clone(),
            roles: self.roles.clone(),
            users: self.users.clone(),
        }
    }
}

pub struct DomainService<R, C, CE, IP, RO, U, N>
where
    R: DomainRepository,
    C: DomainResourceService,
    CE: DomainResourceService,
    IP: DomainResourceService,
    RO: DomainResourceService,
    U: DomainResourceService,
    N: DomainNotifier,
{
    repo: Arc<R>,
    dependencies: DomainDependencies<C, CE, IP, RO, U>,
    notifier: Arc<N>,
}

impl<R, C, CE, IP, RO, U, N> DomainService<R, C, CE, IP, RO, U, N>
where
    R: DomainRepository,
    C: DomainResourceService,
    CE: DomainResourceService,
    IP: DomainResourceService,
    RO: DomainResourceService,
    U: DomainResourceService,
    N: DomainNotifier,
{
    pub fn new(
        repo: Arc<R>,
        dependencies: DomainDependencies<C, CE, IP, RO, U>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            repo,
            dependencies,
            notifier,
        }
    }

    /// Cached configuration first; a cache miss or failure falls back to the repository.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Domain>> {
        let result = self.find_domain(id).await;
        observe("find_by_id", result)
    }

    async fn find_domain(&self, id: &str) -> Result<Option<Domain>> {
        match self.notifier.cached_domain(id).await {
            Ok(Some(domain)) => return Ok(Some(domain)),
            Ok(None) => {}
            Err(e) => debug!(domain_id = %id, error = %e, "Domain cache read failed"),
        }

        let domain = self
            .repo
            .find_by_id(id)
            .await
            .map_err(AppError::management(format!("find a domain using its ID: {}", id)))?;

        if let Some(domain) = &domain {
            if let Err(e) = self.notifier.cache_domain(domain).await {
                warn!(domain_id = %id, error = %e, "Failed to cache domain");
            }
        }
        Ok(domain)
    }

    pub async fn find_all(&self) -> Result<Vec<Domain>> {
        let result = self
            .repo
            .find_all()
            .await
            .map_err(AppError::management("find all domains"));
        observe("find_all", result)
    }

    pub async fn find_by_id_in(&self, ids: &[String]) -> Result<Vec<Domain>> {
        let result = self
            .repo
            .find_by_id_in(ids)
            .await
            .map_err(AppError::management("find domains by their IDs"));
        observe("find_by_id_in", result)
    }

    /// Create a domain whose identifier is the slug of its name.
    pub async fn create(&self, input: NewDomain) -> Result<Domain> {
        let result = self.create_domain(input).await;
        observe("create", result)
    }

    async fn create_domain(&self, input: NewDomain) -> Result<Domain> {
        input.validate()?;

        let id = slugify(&input.name);
        if id.is_empty() {
            return Err(AppError::Validation(format!(
                "Domain name '{}' does not yield a valid identifier",
                input.name
            )));
        }

        if self
            .repo
            .find_by_id(&id)
            .await
            .map_err(AppError::management("create a domain"))?
            .is_some()
        {
            return Err(AppError::AlreadyExists(format!(
                "Domain {} already exists",
                id
            )));
        }

        let now = Utc::now();
        let domain = Domain {
            id,
            name: input.name,
            description: input.description,
            enabled: true,
            master: false,
            login_form: None,
            created_at: now,
            updated_at: now,
        };

        let domain = self
            .repo
            .create(&domain)
            .await
            .map_err(AppError::management("create a domain"))?;
        info!(domain_id = %domain.id, "Domain created");
        Ok(domain)
    }

    pub async fn update(&self, id: &str, input: UpdateDomain) -> Result<Domain> {
        let result = async {
            input.validate()?;
            self.modify(id, "update a domain", |domain| input.apply(domain))
                .await
        }
        .await;
        observe("update", result)
    }

    /// Replace the login form of a domain, leaving every other field as is.
    pub async fn update_login_form(&self, id: &str, input: UpdateLoginForm) -> Result<Domain> {
        let result = async {
            input.validate()?;
            self.modify(id, "update login form", move |domain| {
                domain.login_form = Some(input.into())
            })
            .await
        }
        .await;
        observe("update_login_form", result)
    }

    pub async fn delete_login_form(&self, id: &str) -> Result<Domain> {
        let result = self
            .modify(id, "delete login form", |domain| domain.login_form = None)
            .await;
        observe("delete_login_form", result)
    }

    /// Flag or unflag `id` as the master domain. At most one domain is master,
    /// so promoting a domain while another one is master is rejected.
    pub async fn set_master_domain(&self, id: &str, master: bool) -> Result<Domain> {
        let result = async {
            if master {
                let current = self
                    .repo
                    .find_master()
                    .await
                    .map_err(AppError::management("set master flag"))?;
                if let Some(current) = current.filter(|d| d.id != id) {
                    return Err(AppError::AlreadyExists(format!(
                        "Domain {} is already the master domain",
                        current.id
                    )));
                }
            }
            self.modify(id, "set master flag", |domain| domain.master = master)
                .await
        }
        .await;
        observe("set_master_domain", result)
    }

    /// Touch the domain and ask running gateways to reload its configuration.
    pub async fn reload(&self, id: &str) -> Result<Domain> {
        let result = self.reload_domain(id).await;
        observe("reload", result)
    }

    async fn reload_domain(&self, id: &str) -> Result<Domain> {
        let mut domain = self.require(id, "reload a domain").await?;
        domain.updated_at = Utc::now();

        let domain = self
            .repo
            .update(&domain)
            .await
            .map_err(AppError::management("reload a domain"))?;

        self.notifier
            .domain_reloaded(&domain)
            .await
            .map_err(AppError::management("reload a domain"))?;

        info!(domain_id = %domain.id, "Domain reload requested");
        Ok(domain)
    }

    /// Delete a domain and every resource it owns.
    ///
    /// The master domain is never deleted. Dependent resources are fetched and
    /// removed concurrently; the domain record itself goes last, so a failed
    /// cascade leaves the domain in place and the call can be retried.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = self.delete_domain(id).await;
        observe("delete", result)
    }

    async fn delete_domain(&self, id: &str) -> Result<()> {
        let operation = format!("delete domain: {}", id);

        let domain = self.require(id, &operation).await?;
        if domain.master {
            return Err(AppError::DeleteMasterForbidden(format!(
                "Master domain {} can not be deleted",
                id
            )));
        }

        self.delete_dependents(id)
            .await
            .map_err(AppError::management(operation.as_str()))?;

        self.repo
            .delete(id)
            .await
            .map_err(AppError::management(operation.as_str()))?;

        if let Err(e) = self.notifier.domain_deleted(id).await {
            warn!(domain_id = %id, error = %e, "Failed to invalidate domain cache");
        }

        info!(domain_id = %id, "Domain deleted");
        Ok(())
    }

    async fn delete_dependents(&self, id: &str) -> Result<()> {
        let deps = &self.dependencies;

        let (clients, certificates, identity_providers, roles, users) = tokio::try_join!(
            deps.clients.find_by_domain(id),
            deps.certificates.find_by_domain(id),
            deps.identity_providers.find_by_domain(id),
            deps.roles.find_by_domain(id),
            deps.users.find_by_domain(id)
        )?;

        tokio::try_join!(
            delete_all(deps.clients.as_ref(), &clients, id),
            delete_all(deps.certificates.as_ref(), &certificates, id),
            delete_all(deps.identity_providers.as_ref(), &identity_providers, id),
            delete_all(deps.roles.as_ref(), &roles, id),
            delete_all(deps.users.as_ref(), &users, id)
        )?;

        Ok(())
    }

    /// Ensure a master domain exists, creating `name` as master when none does.
    pub async fn bootstrap_master(&self, name: &str) -> Result<Domain> {
        let result = self.bootstrap(name).await;
        observe("bootstrap_master", result)
    }

    async fn bootstrap(&self, name: &str) -> Result<Domain> {
        let operation = "bootstrap the master domain";

        if let Some(master) = self
            .repo
            .find_master()
            .await
            .map_err(AppError::management(operation))?
        {
            debug!(domain_id = %master.id, "Master domain present");
            return Ok(master);
        }

        let id = slugify(name);
        if id.is_empty() {
            return Err(AppError::Validation(format!(
                "Master domain name '{}' does not yield a valid identifier",
                name
            )));
        }

        let existing = self
            .repo
            .find_by_id(&id)
            .await
            .map_err(AppError::management(operation))?;

        let domain = match existing {
            Some(mut domain) => {
                domain.master = true;
                domain.updated_at = Utc::now();
                self.repo.update(&domain).await
            }
            None => {
                let now = Utc::now();
                let domain = Domain {
                    id,
                    name: name.to_string(),
                    description: Some("Master domain".to_string()),
                    enabled: true,
                    master: true,
                    login_form: None,
                    created_at: now,
                    updated_at: now,
                };
                self.repo.create(&domain).await
            }
        }
        .map_err(AppError::management(operation))?;

        info!(domain_id = %domain.id, "Master domain bootstrapped");
        Ok(domain)
    }

    async fn require(&self, id: &str, operation: &str) -> Result<Domain> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(AppError::management(operation))?
            .ok_or_else(|| AppError::NotFound(format!("Domain {} not found", id)))
    }

    /// Load, mutate, persist, then refresh the cache best-effort.
    async fn modify<F>(&self, id: &str, operation: &str, mutate: F) -> Result<Domain>
    where
        F: FnOnce(&mut Domain) + Send,
    {
        let mut domain = self.require(id, operation).await?;
        mutate(&mut domain);
        domain.updated_at = Utc::now();

        let domain = self
            .repo
            .update(&domain)
            .await
            .map_err(AppError::management(operation))?;

        if let Err(e) = self.notifier.domain_updated(&domain).await {
            warn!(domain_id = %domain.id, error = %e, "Failed to refresh domain cache");
        }

        Ok(domain)
    }
}

/// Delete every item of one family; an empty family issues no call.
async fn delete_all<S>(service: &S, items: &[S::Resource], domain_id: &str) -> Result<usize>
where
    S: DomainResourceService + ?Sized,
{
    if items.is_empty() {
        return Ok(0);
    }

    try_join_all(items.iter().map(|item| service.delete(item.id()))).await?;

    let kind: ResourceKind = service.kind();
    counter!(DOMAIN_CASCADE_DELETED, "resource" => kind.as_str()).increment(items.len() as u64);
    info!(domain_id = %domain_id, resource = %kind, count = items.len(), "Deleted domain resources");
    Ok(items.len())
}

fn observe<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    record_domain_operation(operation, result.is_ok());
    result
}
