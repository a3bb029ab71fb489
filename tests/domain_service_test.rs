//! Domain lifecycle against in-memory repositories

mod support;

use pretty_assertions::assert_eq;
use support::DomainFixture;
use warden_core::domain::{
    Certificate, Client, Domain, IdentityProvider, NewDomain, Role, UpdateDomain,
    UpdateLoginForm, User,
};
use warden_core::error::AppError;

fn new_domain(name: &str) -> NewDomain {
    NewDomain {
        name: name.to_string(),
        description: Some("Test domain".to_string()),
    }
}

async fn seed_resources(fixture: &DomainFixture, domain: &str) {
    fixture.clients.add(Client::new(domain, "web-app")).await;
    fixture.clients.add(Client::new(domain, "mobile-app")).await;
    fixture
        .certificates
        .add(Certificate::new(domain, "default", "pkcs12"))
        .await;
    fixture
        .identity_providers
        .add(IdentityProvider::new(domain, "corporate", "ldap-am-idp"))
        .await;
    fixture.roles.add(Role::new(domain, "admin")).await;
    fixture.users.add(User::new(domain, "jdoe")).await;
}

#[tokio::test]
async fn test_create_then_find() {
    let fixture = DomainFixture::new();
    let service = fixture.service();

    let created = service.create(new_domain("Acme Corp")).await.unwrap();
    assert_eq!(created.id, "acme-corp");
    assert_eq!(created.name, "Acme Corp");
    assert!(created.enabled);
    assert!(!created.master);

    let found = service.find_by_id("acme-corp").await.unwrap();
    assert_eq!(found, Some(created));
}

#[tokio::test]
async fn test_create_colliding_name() {
    let fixture = DomainFixture::new();
    let service = fixture.service();

    service.create(new_domain("Acme Corp")).await.unwrap();
    let result = service.create(new_domain("acme   corp")).await;

    assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    assert_eq!(fixture.domains.count().await, 1);
}

#[tokio::test]
async fn test_find_all_and_by_ids() {
    let fixture = DomainFixture::new();
    let service = fixture.service();

    assert!(service.find_all().await.unwrap().is_empty());

    service.create(new_domain("alpha")).await.unwrap();
    service.create(new_domain("beta")).await.unwrap();
    service.create(new_domain("gamma")).await.unwrap();

    assert_eq!(service.find_all().await.unwrap().len(), 3);

    let ids = vec!["alpha".to_string(), "gamma".to_string(), "missing".to_string()];
    let mut found: Vec<String> = service
        .find_by_id_in(&ids)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    found.sort();
    assert_eq!(found, vec!["alpha".to_string(), "gamma".to_string()]);
}

#[tokio::test]
async fn test_update_then_find() {
    let fixture = DomainFixture::new();
    let service = fixture.service();
    service.create(new_domain("acme")).await.unwrap();

    let input = UpdateDomain {
        description: Some("Updated".to_string()),
        enabled: Some(false),
        ..Default::default()
    };
    let updated = service.update("acme", input).await.unwrap();

    let found = service.find_by_id("acme").await.unwrap().unwrap();
    assert_eq!(found, updated);
    assert_eq!(found.name, "acme");
    assert_eq!(found.description.as_deref(), Some("Updated"));
    assert!(!found.enabled);
}

#[tokio::test]
async fn test_update_missing_domain() {
    let fixture = DomainFixture::new();
    let service = fixture.service();

    let result = service.update("missing", UpdateDomain::default()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_login_form_lifecycle() {
    let fixture = DomainFixture::new();
    let service = fixture.service();
    service.create(new_domain("acme")).await.unwrap();

    let form = UpdateLoginForm {
        enabled: true,
        content: Some("<html>login</html>".to_string()),
        assets: None,
    };
    let updated = service.update_login_form("acme", form).await.unwrap();
    let login_form = updated.login_form.unwrap();
    assert!(login_form.enabled);
    assert_eq!(login_form.content.as_deref(), Some("<html>login</html>"));

    let cleared = service.delete_login_form("acme").await.unwrap();
    assert!(cleared.login_form.is_none());
    assert_eq!(cleared.description.as_deref(), Some("Test domain"));
}

#[tokio::test]
async fn test_delete_cascades_to_every_resource() {
    let fixture = DomainFixture::new();
    let service = fixture.service();
    service.create(new_domain("doomed")).await.unwrap();
    service.create(new_domain("survivor")).await.unwrap();
    seed_resources(&fixture, "doomed").await;
    seed_resources(&fixture, "survivor").await;

    service.delete("doomed").await.unwrap();

    assert!(service.find_by_id("doomed").await.unwrap().is_none());
    assert_eq!(fixture.resources_in("doomed").await, 0);
    assert_eq!(fixture.clients.delete_calls(), 2);
    assert_eq!(fixture.certificates.delete_calls(), 1);
    assert_eq!(fixture.identity_providers.delete_calls(), 1);
    assert_eq!(fixture.roles.delete_calls(), 1);
    assert_eq!(fixture.users.delete_calls(), 1);

    // Resources of other domains are untouched
    assert_eq!(fixture.resources_in("survivor").await, 6);
    assert!(service.find_by_id("survivor").await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_domain_without_resources() {
    let fixture = DomainFixture::new();
    let service = fixture.service();
    service.create(new_domain("empty")).await.unwrap();

    service.delete("empty").await.unwrap();

    assert!(service.find_by_id("empty").await.unwrap().is_none());
    assert_eq!(fixture.clients.delete_calls(), 0);
    assert_eq!(fixture.users.delete_calls(), 0);
}

#[tokio::test]
async fn test_delete_missing_domain() {
    let fixture = DomainFixture::new();
    let service = fixture.service();

    let result = service.delete("missing").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_master_domain_is_protected() {
    let fixture = DomainFixture::new();
    let service = fixture.service();

    let master = service.bootstrap_master("Admin").await.unwrap();
    assert!(master.master);
    seed_resources(&fixture, &master.id).await;

    let result = service.delete(&master.id).await;

    assert!(matches!(result, Err(AppError::DeleteMasterForbidden(_))));
    assert!(service.find_by_id(&master.id).await.unwrap().is_some());
    assert_eq!(fixture.resources_in(&master.id).await, 6);
}

#[tokio::test]
async fn test_bootstrap_master_is_idempotent() {
    let fixture = DomainFixture::new();
    let service = fixture.service();

    let first = service.bootstrap_master("Admin").await.unwrap();
    let second = service.bootstrap_master("Other").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(fixture.domains.count().await, 1);
}

#[tokio::test]
async fn test_single_master_domain() {
    let fixture = DomainFixture::new();
    let service = fixture.service();

    let master = service.bootstrap_master("Admin").await.unwrap();
    let other = service.create(new_domain("Other")).await.unwrap();

    let result = service.set_master_domain(&other.id, true).await;
    assert!(matches!(result, Err(AppError::AlreadyExists(_))));

    let masters: Vec<String> = service
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|d| d.master)
        .map(|d| d.id)
        .collect();
    assert_eq!(masters, vec![master.id.clone()]);

    // Once demoted, another domain may take over
    service.set_master_domain(&master.id, false).await.unwrap();
    assert!(service.set_master_domain(&other.id, true).await.unwrap().master);
    let masters: Vec<String> = service
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|d| d.master)
        .map(|d| d.id)
        .collect();
    assert_eq!(masters, vec![other.id]);
}

#[tokio::test]
async fn test_interrupted_cascade_can_be_retried() {
    let fixture = DomainFixture::new();
    let service = fixture.service();
    service.create(new_domain("flaky")).await.unwrap();
    seed_resources(&fixture, "flaky").await;

    fixture.roles.fail_next_deletes(1);
    let result = service.delete("flaky").await;

    match result {
        Err(err @ AppError::TechnicalManagement { .. }) => assert!(err.is_technical()),
        other => panic!("expected a technical management error, got {:?}", other),
    }
    let remaining: Option<Domain> = service.find_by_id("flaky").await.unwrap();
    assert!(remaining.is_some());
    assert_eq!(fixture.roles.count_in("flaky").await, 1);

    service.delete("flaky").await.unwrap();

    assert!(service.find_by_id("flaky").await.unwrap().is_none());
    assert_eq!(fixture.resources_in("flaky").await, 0);
}
