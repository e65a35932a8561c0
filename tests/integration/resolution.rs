//! Resolution order, deduplication and declaration options.

use std::sync::Arc;

use podforge::config::{DependencyConfig, SourceConfig};
use podforge::dependency::{CyclicDependencyError, Dependency, DependencyDownloader, Resolver};
use podforge::generated::GeneratedConfig;
use podforge::kube::{KubeClient, KubeConfigClient};
use podforge::test_utils::{
    ProjectTree, RecordingClientFactory, TEST_CONTEXT, TestGit, init_test_logging,
};

use crate::common::TestProject;

struct Harness {
    resolver: Resolver,
    factory: Arc<RecordingClientFactory>,
}

async fn harness(
    env: &TestProject,
    project: &str,
    cache: GeneratedConfig,
    kube_client: Option<Arc<dyn KubeClient>>,
    allow_cyclic: bool,
) -> Harness {
    init_test_logging(None);
    let factory = Arc::new(RecordingClientFactory::default());
    let resolver = Resolver::builder(env.tree().load_config(project), cache)
        .base_path(env.tree().path(project))
        .kube_client(kube_client)
        .allow_cyclic(allow_cyclic)
        .fetcher(Arc::new(DependencyDownloader::with_dependencies_dir(env.deps_path())))
        .client_factory(factory.clone())
        .build()
        .await
        .unwrap();
    Harness {
        resolver,
        factory,
    }
}

async fn resolve(env: &TestProject, project: &str) -> Vec<Dependency> {
    let mut h = harness(env, project, GeneratedConfig::default(), None, false).await;
    h.resolver.resolve(false).await.unwrap()
}

fn ids(resolved: &[Dependency]) -> Vec<&str> {
    resolved.iter().map(Dependency::id).collect()
}

#[tokio::test]
async fn test_dependencies_follow_their_own_dependencies() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["frontend", "backend"]);
    tree.project("frontend", &["backend", "cdn"]);
    tree.project("backend", &["db", "cache"]);
    tree.project("db", &[]);
    tree.project("cache", &[]);
    tree.project("cdn", &[]);

    let resolved = resolve(&env, "app").await;
    let order = ids(&resolved);
    assert_eq!(order.len(), 5);

    let pos = |name: &str| order.iter().position(|id| *id == tree.id(name)).unwrap();
    assert!(pos("db") < pos("backend"));
    assert!(pos("cache") < pos("backend"));
    assert!(pos("backend") < pos("frontend"));
    assert!(pos("cdn") < pos("frontend"));

    // leaves are drained in declaration order
    assert_eq!(
        order,
        vec![tree.id("db"), tree.id("cache"), tree.id("backend"), tree.id("cdn"), tree.id("frontend")]
    );
}

#[tokio::test]
async fn test_shared_dependency_is_materialized_once() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["a", "b", "c"]);
    tree.project("a", &["shared"]);
    tree.project("b", &["shared"]);
    tree.project("c", &["shared", "a"]);
    tree.project("shared", &[]);

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    let resolved = h.resolver.resolve(false).await.unwrap();

    assert_eq!(ids(&resolved), vec![tree.id("shared"), tree.id("a"), tree.id("b"), tree.id("c")]);
    assert_eq!(h.factory.docker_clients(), 4);
}

#[tokio::test]
async fn test_spellings_of_the_same_path_converge() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    let spelled = |path: &str| DependencyConfig {
        source: SourceConfig {
            path: Some(path.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    tree.project_with("app", vec![spelled("../db"), spelled("../app/../db/"), spelled("./../db")]);
    tree.project("db", &[]);

    let resolved = resolve(&env, "app").await;
    assert_eq!(ids(&resolved), vec![tree.id("db")]);
}

#[tokio::test]
async fn test_spellings_of_the_default_config_file_converge() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    let named = |config_name: &str| DependencyConfig {
        source: SourceConfig {
            path: Some("../db".to_string()),
            config_name: Some(config_name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    tree.project_with(
        "app",
        vec![
            ProjectTree::path_dependency("db"),
            named("./podforge.yaml"),
            named("deploy/../podforge.yaml"),
        ],
    );
    tree.project("db", &[]);

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    let resolved = h.resolver.resolve(false).await.unwrap();
    assert_eq!(ids(&resolved), vec![tree.id("db")]);
    assert_eq!(h.factory.docker_clients(), 1);
}

#[tokio::test]
async fn test_project_without_dependencies() {
    let env = TestProject::new().unwrap();
    env.tree().project("app", &[]);

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    assert!(h.resolver.resolve(false).await.unwrap().is_empty());
    assert_eq!(h.factory.docker_clients(), 0);
}

#[tokio::test]
async fn test_ignore_dependencies_skips_descent() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project_with(
        "app",
        vec![DependencyConfig {
            ignore_dependencies: true,
            ..ProjectTree::path_dependency("api")
        }],
    );
    tree.project("api", &["db"]);
    // never read: db has no podforge.yaml at all

    let resolved = resolve(&env, "app").await;
    assert_eq!(ids(&resolved), vec![tree.id("api")]);
    // the declarations are still reported
    assert_eq!(resolved[0].declared_dependencies().len(), 1);
}

#[tokio::test]
async fn test_skip_build_clears_images_and_dev_is_always_cleared() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project_with(
        "app",
        vec![
            DependencyConfig {
                skip_build: true,
                ..ProjectTree::path_dependency("prebuilt")
            },
            ProjectTree::path_dependency("built"),
        ],
    );
    tree.project("prebuilt", &[]);
    tree.project("built", &[]);

    let resolved = resolve(&env, "app").await;
    let prebuilt = &resolved[0];
    let built = &resolved[1];

    assert!(prebuilt.config().images.is_empty());
    assert!(prebuilt.build_controller().images().is_empty());
    assert_eq!(built.build_controller().images(), vec!["built".to_string()]);

    assert!(prebuilt.config().dev.is_empty());
    assert!(built.config().dev.is_empty());

    // deployments and commands survive both
    assert_eq!(prebuilt.deploy_controller().deployments(), vec!["prebuilt".to_string()]);
    assert_eq!(built.commands()[0].name, "built-test");
}

#[tokio::test]
async fn test_missing_config_names_the_dependency() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["ghost"]);
    std::fs::create_dir_all(tree.path("ghost")).unwrap();

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    let err = h.resolver.resolve(false).await.unwrap_err();
    let message = format!("{err:#}");

    assert!(message.contains("Failed to resolve dependencies"), "{message}");
    assert!(message.contains(&tree.id("ghost")), "{message}");
    assert!(err.downcast_ref::<CyclicDependencyError>().is_none());
}

#[tokio::test]
async fn test_missing_directory_fails() {
    let env = TestProject::new().unwrap();
    env.tree().project("app", &["nowhere"]);

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    let err = h.resolver.resolve(false).await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to download dependency"));
}

#[tokio::test]
async fn test_download_error_names_the_declared_source() {
    let env = TestProject::new().unwrap();
    env.tree().project_with(
        "app",
        vec![DependencyConfig {
            name: Some("database".to_string()),
            ..ProjectTree::path_dependency("nowhere")
        }],
    );

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    let message = format!("{:#}", h.resolver.resolve(false).await.unwrap_err());
    assert!(message.contains("Failed to download dependency database (path ../nowhere)"), "{message}");
}

#[tokio::test]
async fn test_cycle_through_the_graph_is_reported_with_its_path() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["a"]);
    tree.project("a", &["b"]);
    tree.project("b", &["c"]);
    tree.project("c", &["a"]);

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    let err = h.resolver.resolve(false).await.unwrap_err();
    let cycle = err.downcast_ref::<CyclicDependencyError>().expect("cycle error");

    assert_eq!(cycle.path, vec![tree.id("c"), tree.id("a"), tree.id("b"), tree.id("c")]);
    assert!(err.to_string().starts_with("Circular dependency detected"));
}

#[tokio::test]
async fn test_allowed_cycles_are_dropped() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["a"]);
    tree.project("a", &["b", "a"]);
    tree.project("b", &["a"]);

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, true).await;
    let resolved = h.resolver.resolve(false).await.unwrap();

    assert_eq!(ids(&resolved), vec![tree.id("b"), tree.id("a")]);
    assert_eq!(h.factory.docker_clients(), 2);
}

#[tokio::test]
async fn test_dependency_back_to_the_invoking_project_is_a_cycle() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["lib"]);
    tree.project("lib", &["app"]);

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    assert_eq!(h.resolver.root_id(), tree.id("app"));

    let err = h.resolver.resolve(false).await.unwrap_err();
    let cycle = err.downcast_ref::<CyclicDependencyError>().expect("cycle error");
    assert_eq!(cycle.path, vec![tree.id("lib"), tree.id("app"), tree.id("lib")]);
}

#[tokio::test]
async fn test_profile_makes_a_distinct_dependency() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project_with(
        "app",
        vec![
            ProjectTree::path_dependency("db"),
            DependencyConfig {
                profile: Some("replica".to_string()),
                ..ProjectTree::path_dependency("db")
            },
        ],
    );
    tree.write_config(
        "db",
        r"
images:
  db:
    image: registry.acme.io/db
deployments:
  - name: db
profiles:
  - name: replica
    replace:
      deployments:
        - name: db-replica
",
    );

    let resolved = resolve(&env, "app").await;
    assert_eq!(ids(&resolved), vec![tree.id("db"), format!("{} - profile replica", tree.id("db"))]);

    assert_eq!(resolved[0].profile(), None);
    assert_eq!(resolved[0].deploy_controller().deployments(), vec!["db".to_string()]);
    assert_eq!(resolved[1].profile(), Some("replica"));
    assert_eq!(resolved[1].deploy_controller().deployments(), vec!["db-replica".to_string()]);
    assert_eq!(resolved[1].generated().active_profile, "replica");
}

#[tokio::test]
async fn test_config_name_selects_another_file() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project_with(
        "app",
        vec![DependencyConfig {
            source: SourceConfig {
                path: Some("../monorepo".to_string()),
                config_name: Some("worker.yaml".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }],
    );
    tree.write_config("monorepo", "deployments:\n  - name: web\n");
    tree.write_file("monorepo", "worker.yaml", "deployments:\n  - name: worker\n");

    let resolved = resolve(&env, "app").await;
    assert_eq!(ids(&resolved), vec![format!("{}#worker.yaml", tree.id("monorepo"))]);
    assert_eq!(resolved[0].deploy_controller().deployments(), vec!["worker".to_string()]);
}

#[tokio::test]
async fn test_namespace_override_keeps_context() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project_with(
        "app",
        vec![
            DependencyConfig {
                namespace: Some("data".to_string()),
                ..ProjectTree::path_dependency("db")
            },
            DependencyConfig {
                namespace: Some("team-a".to_string()),
                ..ProjectTree::path_dependency("api")
            },
            ProjectTree::path_dependency("web"),
        ],
    );
    tree.project("db", &[]);
    tree.project("api", &[]);
    tree.project("web", &[]);

    let client: Arc<dyn KubeClient> = Arc::new(KubeConfigClient::from_parts("staging", "team-a"));
    let mut h = harness(&env, "app", GeneratedConfig::default(), Some(client.clone()), false).await;
    let resolved = h.resolver.resolve(false).await.unwrap();

    assert_eq!(h.factory.kube_requests(), vec![(Some("staging".to_string()), "data".to_string())]);

    let db = resolved[0].kube_client().unwrap();
    assert_eq!(db.current_context(), "staging");
    assert_eq!(db.namespace(), "data");
    assert_eq!(resolved[0].registry_client().namespace(), Some("data"));

    // same namespace and no namespace both reuse the invoking project's client
    assert!(Arc::ptr_eq(resolved[1].kube_client().unwrap(), &client));
    assert!(Arc::ptr_eq(resolved[2].kube_client().unwrap(), &client));
}

#[tokio::test]
async fn test_namespace_without_invoking_client() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project_with(
        "app",
        vec![
            DependencyConfig {
                namespace: Some("data".to_string()),
                ..ProjectTree::path_dependency("db")
            },
            ProjectTree::path_dependency("web"),
        ],
    );
    tree.project("db", &[]);
    tree.project("web", &[]);

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    let resolved = h.resolver.resolve(false).await.unwrap();

    assert_eq!(h.factory.kube_requests(), vec![(None, "data".to_string())]);
    assert_eq!(resolved[0].kube_client().unwrap().current_context(), TEST_CONTEXT);
    assert!(resolved[1].kube_client().is_none());
}

#[tokio::test]
async fn test_base_cache_vars_reach_dependency_configs() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["svc"]);
    tree.write_config("svc", "images:\n  svc:\n    image: ${REGISTRY}/svc\n");

    let mut cache = GeneratedConfig::default();
    cache.get_active().vars.insert("REGISTRY".to_string(), "registry.acme.io".to_string());

    let mut h = harness(&env, "app", cache, None, false).await;
    let resolved = h.resolver.resolve(false).await.unwrap();

    assert_eq!(resolved[0].config().images["svc"].image, "registry.acme.io/svc");
    assert_eq!(resolved[0].registry_client().registries(), vec!["registry.acme.io".to_string()]);
    assert_eq!(
        resolved[0].generated().active().unwrap().vars.get("REGISTRY").map(String::as_str),
        Some("registry.acme.io")
    );
}

#[tokio::test]
async fn test_repeated_resolution_is_deterministic() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["z", "m", "a"]);
    tree.project("z", &["a"]);
    tree.project("m", &["z"]);
    tree.project("a", &[]);

    let first: Vec<String> = resolve(&env, "app").await.iter().map(|d| d.id().to_string()).collect();
    for _ in 0..3 {
        let again: Vec<String> =
            resolve(&env, "app").await.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(again, first);
    }
    assert_eq!(first, vec![tree.id("a"), tree.id("z"), tree.id("m")]);
}

#[tokio::test]
async fn test_root_identity_from_origin_remote() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["db"]);
    tree.project("db", &[]);

    let git = TestGit::new(tree.path("app"));
    git.init().unwrap();
    git.remote_add("origin", "git@GitHub.com:acme/app.git").unwrap();

    let mut h = harness(&env, "app", GeneratedConfig::default(), None, false).await;
    assert_eq!(h.resolver.root_id(), "github.com/acme/app");
    assert_eq!(ids(&h.resolver.resolve(false).await.unwrap()), vec![tree.id("db")]);
}
