//! Git dependencies cloned from local `file://` repositories.

use std::sync::Arc;

use podforge::config::{DependencyConfig, SourceConfig};
use podforge::dependency::identity::path_identity;
use podforge::dependency::{Dependency, DependencyDownloader, Resolver, normalize_git_url};
use podforge::generated::GeneratedConfig;
use podforge::test_utils::RecordingClientFactory;

use crate::common::TestProject;

const DB_CONFIG: &str = "deployments:\n  - name: db-v1\n";

fn git_dependency(url: &str, configure: impl FnOnce(&mut SourceConfig)) -> DependencyConfig {
    let mut source = SourceConfig {
        git: Some(url.to_string()),
        ..Default::default()
    };
    configure(&mut source);
    DependencyConfig {
        source,
        ..Default::default()
    }
}

async fn resolve(env: &TestProject, update: bool) -> Vec<Dependency> {
    let tree = env.tree();
    let mut resolver = Resolver::builder(tree.load_config("app"), GeneratedConfig::default())
        .base_path(tree.path("app"))
        .fetcher(Arc::new(DependencyDownloader::with_dependencies_dir(env.deps_path())))
        .client_factory(Arc::new(RecordingClientFactory::default()))
        .build()
        .await
        .unwrap();
    resolver.resolve(update).await.unwrap()
}

#[tokio::test]
async fn test_git_dependency_is_cloned_into_dependencies_dir() {
    let env = TestProject::new().unwrap();
    let repo = env.create_source_repo("db", DB_CONFIG).unwrap();
    let url = repo.file_url();
    env.tree().project_with("app", vec![git_dependency(&url, |s| s.branch = Some("main".into()))]);

    let resolved = resolve(&env, false).await;
    assert_eq!(resolved.len(), 1);

    let db = &resolved[0];
    assert_eq!(db.id(), format!("{}@main", normalize_git_url(&url)));
    assert!(db.local_path().starts_with(env.deps_path()));
    assert!(db.local_path().join(".git").exists());
    assert_eq!(db.deploy_controller().deployments(), vec!["db-v1".to_string()]);
}

#[tokio::test]
async fn test_checkout_is_reused_until_update() {
    let env = TestProject::new().unwrap();
    let repo = env.create_source_repo("db", DB_CONFIG).unwrap();
    env.tree()
        .project_with("app", vec![git_dependency(&repo.file_url(), |s| s.branch = Some("main".into()))]);

    let first = resolve(&env, false).await;
    assert_eq!(first[0].deploy_controller().deployments(), vec!["db-v1".to_string()]);

    repo.write("podforge.yaml", "deployments:\n  - name: db-v2\n").unwrap();
    repo.git.commit_all("Rename deployment").unwrap();

    let reused = resolve(&env, false).await;
    assert_eq!(reused[0].local_path(), first[0].local_path());
    assert_eq!(reused[0].deploy_controller().deployments(), vec!["db-v1".to_string()]);

    let updated = resolve(&env, true).await;
    assert_eq!(updated[0].local_path(), first[0].local_path());
    assert_eq!(updated[0].deploy_controller().deployments(), vec!["db-v2".to_string()]);
}

#[tokio::test]
async fn test_update_without_ref_follows_default_branch() {
    let env = TestProject::new().unwrap();
    let repo = env.create_source_repo("db", DB_CONFIG).unwrap();
    env.tree().project_with("app", vec![git_dependency(&repo.file_url(), |_| {})]);

    resolve(&env, false).await;
    repo.write("podforge.yaml", "deployments:\n  - name: db-v2\n").unwrap();
    repo.git.commit_all("Rename deployment").unwrap();

    let updated = resolve(&env, true).await;
    assert_eq!(updated[0].deploy_controller().deployments(), vec!["db-v2".to_string()]);
}

#[tokio::test]
async fn test_tag_pins_the_checkout() {
    let env = TestProject::new().unwrap();
    let repo = env.create_source_repo("db", DB_CONFIG).unwrap();
    repo.git.tag("v1.0.0").unwrap();
    repo.write("podforge.yaml", "deployments:\n  - name: db-v2\n").unwrap();
    repo.git.commit_all("Rename deployment").unwrap();

    let url = repo.file_url();
    env.tree().project_with("app", vec![git_dependency(&url, |s| s.tag = Some("v1.0.0".into()))]);

    let resolved = resolve(&env, true).await;
    assert_eq!(resolved[0].id(), format!("{}@tag:v1.0.0", normalize_git_url(&url)));
    assert_eq!(resolved[0].deploy_controller().deployments(), vec!["db-v1".to_string()]);
}

#[tokio::test]
async fn test_branch_checkout() {
    let env = TestProject::new().unwrap();
    let repo = env.create_source_repo("db", DB_CONFIG).unwrap();
    repo.git.create_branch("release").unwrap();
    repo.write("podforge.yaml", "deployments:\n  - name: db-release\n").unwrap();
    repo.git.commit_all("Release deployment").unwrap();
    repo.git.checkout("main").unwrap();

    let url = repo.file_url();
    env.tree().project_with(
        "app",
        vec![
            git_dependency(&url, |s| s.branch = Some("release".into())),
            git_dependency(&url, |s| s.branch = Some("main".into())),
        ],
    );

    let resolved = resolve(&env, false).await;
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].id(), format!("{}@release", normalize_git_url(&url)));
    assert_eq!(resolved[0].deploy_controller().deployments(), vec!["db-release".to_string()]);
    assert_eq!(resolved[1].deploy_controller().deployments(), vec!["db-v1".to_string()]);
    assert_ne!(resolved[0].local_path(), resolved[1].local_path());
}

#[tokio::test]
async fn test_revision_checkout() {
    let env = TestProject::new().unwrap();
    let repo = env.create_source_repo("db", DB_CONFIG).unwrap();
    let first_commit = repo.git.rev_parse_head().unwrap();
    repo.write("podforge.yaml", "deployments:\n  - name: db-v2\n").unwrap();
    repo.git.commit_all("Rename deployment").unwrap();

    env.tree().project_with(
        "app",
        vec![git_dependency(&repo.file_url(), |s| s.revision = Some(first_commit.clone()))],
    );

    let resolved = resolve(&env, false).await;
    assert_eq!(resolved[0].deploy_controller().deployments(), vec!["db-v1".to_string()]);
}

#[tokio::test]
async fn test_sub_paths_share_one_checkout() {
    let env = TestProject::new().unwrap();
    let repo = env.create_source_repo("mono", "deployments: []\n").unwrap();
    repo.write("services/api/podforge.yaml", "deployments:\n  - name: api\n").unwrap();
    repo.write(
        "services/worker/podforge.yaml",
        "deployments:\n  - name: worker\ndependencies:\n  - source:\n      path: ../api\n",
    )
    .unwrap();
    repo.git.commit_all("Add services").unwrap();

    let url = repo.file_url();
    env.tree().project_with(
        "app",
        vec![
            git_dependency(&url, |s| s.sub_path = Some("services/worker".into())),
            git_dependency(&url, |s| s.sub_path = Some("/services/api/".into())),
        ],
    );

    let resolved = resolve(&env, false).await;
    let ids: Vec<&str> = resolved.iter().map(Dependency::id).collect();
    let normalized = normalize_git_url(&url);

    // worker's relative path dependency points into the checkout, so api is
    // known under two identities: its directory and its git subPath
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], path_identity(resolved[0].local_path()));
    assert_eq!(ids[1], format!("{normalized}:services/worker"));
    assert_eq!(ids[2], format!("{normalized}:services/api"));

    let checkout = resolved[1].local_path().parent().and_then(|p| p.parent()).unwrap();
    assert!(checkout.starts_with(env.deps_path()));
    assert!(resolved[0].local_path().starts_with(checkout));
    assert!(resolved[2].local_path().starts_with(checkout));
    assert!(resolved[2].local_path().ends_with("services/api"));
}

#[tokio::test]
async fn test_missing_sub_path_fails() {
    let env = TestProject::new().unwrap();
    let repo = env.create_source_repo("db", DB_CONFIG).unwrap();
    env.tree()
        .project_with("app", vec![git_dependency(&repo.file_url(), |s| s.sub_path = Some("nope".into()))]);

    let tree = env.tree();
    let mut resolver = Resolver::builder(tree.load_config("app"), GeneratedConfig::default())
        .base_path(tree.path("app"))
        .fetcher(Arc::new(DependencyDownloader::with_dependencies_dir(env.deps_path())))
        .client_factory(Arc::new(RecordingClientFactory::default()))
        .build()
        .await
        .unwrap();
    let err = resolver.resolve(false).await.unwrap_err();
    assert!(format!("{err:#}").contains("nope"), "{err:#}");
}
