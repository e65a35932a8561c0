//! The invoking project's generated cache across resolutions.

use std::sync::Arc;

use podforge::dependency::{DependencyDownloader, Resolver};
use podforge::generated::{DEFAULT_PROFILE, GeneratedConfig, GeneratedLoader};
use podforge::test_utils::RecordingClientFactory;
use podforge::utils::config_hash;

use crate::common::TestProject;

async fn resolver(env: &TestProject, project: &str, cache: GeneratedConfig) -> Resolver {
    Resolver::builder(env.tree().load_config(project), cache)
        .base_path(env.tree().path(project))
        .fetcher(Arc::new(DependencyDownloader::with_dependencies_dir(env.deps_path())))
        .client_factory(Arc::new(RecordingClientFactory::default()))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_successful_resolution_records_dependency_hashes() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["api"]);
    tree.project("api", &["db"]);
    tree.project("db", &[]);

    let mut resolver = resolver(&env, "app", GeneratedConfig::default()).await;
    let resolved = resolver.resolve(false).await.unwrap();

    let saved = GeneratedLoader::new(&tree.path("app"), "").load().unwrap();
    let scope = &saved.profiles[DEFAULT_PROFILE];
    assert_eq!(scope.dependencies.len(), 2);
    for dependency in &resolved {
        assert_eq!(scope.dependencies[dependency.id()], config_hash(dependency.config()).unwrap());
    }
    assert_eq!(&saved, resolver.base_cache());
}

#[tokio::test]
async fn test_failed_resolution_leaves_cache_untouched() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["api", "broken"]);
    tree.project("api", &[]);
    tree.write_config("broken", "images: [not, a, map]\n");

    let generated = tree.path("app").join(".podforge/generated.yaml");
    let mut resolver = resolver(&env, "app", GeneratedConfig::default()).await;
    let err = resolver.resolve(false).await.unwrap_err();

    assert!(format!("{err:#}").contains("broken"), "{err:#}");
    assert!(!generated.exists());
}

#[tokio::test]
async fn test_cache_is_written_without_dependencies() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &[]);

    let mut cache = GeneratedConfig::default();
    cache.get_active().vars.insert("REGISTRY".to_string(), "registry.acme.io".to_string());

    let mut resolver = resolver(&env, "app", cache.clone()).await;
    resolver.resolve(false).await.unwrap();

    let saved = GeneratedLoader::new(&tree.path("app"), "").load_from_path(
        &tree.path("app").join(".podforge/generated.yaml"),
    );
    assert_eq!(saved.unwrap(), cache);
}

#[tokio::test]
async fn test_custom_saver_and_profile_scope() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["db"]);
    tree.project("db", &[]);

    let saver = GeneratedLoader::new(&tree.path("app"), "staging");
    let base_cache = saver.load().unwrap();
    let mut resolver = Resolver::builder(tree.load_config("app"), base_cache)
        .base_path(tree.path("app"))
        .generated_saver(saver.clone())
        .fetcher(Arc::new(DependencyDownloader::with_dependencies_dir(env.deps_path())))
        .client_factory(Arc::new(RecordingClientFactory::default()))
        .build()
        .await
        .unwrap();
    resolver.resolve(false).await.unwrap();

    let saved = saver.load().unwrap();
    assert_eq!(saved.active_profile, "staging");
    assert!(saved.profiles["staging"].dependencies.contains_key(&tree.id("db")));
    assert!(!saved.profiles.contains_key(DEFAULT_PROFILE));
}

#[tokio::test]
async fn test_dependency_cache_is_saved_on_request() {
    let env = TestProject::new().unwrap();
    let tree = env.tree();
    tree.project("app", &["db"]);
    tree.project("db", &[]);

    let mut resolver = resolver(&env, "app", GeneratedConfig::default()).await;
    let mut resolved = resolver.resolve(false).await.unwrap();
    let db_cache = tree.path("db").join(".podforge/generated.yaml");
    assert!(!db_cache.exists());

    let db = &mut resolved[0];
    db.generated_mut().get_active().vars.insert("SEEN".to_string(), "yes".to_string());
    db.save_generated().unwrap();

    let reloaded = GeneratedLoader::new(&tree.path("db"), "").load().unwrap();
    assert_eq!(reloaded.active().unwrap().vars["SEEN"], "yes");
}
