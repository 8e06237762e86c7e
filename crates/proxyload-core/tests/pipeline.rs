//! Integration tests for the build pipeline: discovery, compilation,
//! release assembly and promotion.

mod common;

use std::collections::BTreeMap;
use std::fs;

use chrono::{TimeZone, Utc};
use proxyload_core::promote::{CurrentDocument, HISTORY_LIMIT, HistoryDocument};
use proxyload_core::store::load_or_default;
use proxyload_core::{ContentHash, Error, LogicalPath, PromotionStore, ReleaseMeta};

use common::Project;

fn path(s: &str) -> LogicalPath {
    s.parse().expect("valid logical path")
}

fn manifest(project: &Project, id: &str) -> BTreeMap<String, String> {
    let text = fs::read_to_string(project.release_file(id, "manifest.json"))
        .expect("Failed to read manifest");
    serde_json::from_str(&text).expect("Failed to parse manifest")
}

// =============================================================================
// Build
// =============================================================================

#[test]
fn test_manifest_has_one_entry_per_leaf() {
    let project = Project::new();
    let built = project.builder().build("v1").expect("Build failed");

    let manifest = manifest(&project, "v1");
    assert_eq!(
        manifest.keys().map(String::as_str).collect::<Vec<_>>(),
        [
            "Component/Button/default",
            "Component/Button/secondary",
            "Component/EmailForm/default",
            "Loader/Component/default",
        ]
    );
    assert_ne!(
        manifest["Component/Button/default"],
        manifest["Component/Button/secondary"]
    );
    assert_eq!(built.release.hashes.len(), 4);
    assert_eq!(built.written_artifacts, 4);

    for (logical, hash) in &manifest {
        let file = project
            .dist_dir
            .join("items")
            .join(logical)
            .join(format!("{hash}.js"));
        assert!(file.is_file(), "missing artifact {}", file.display());
    }
}

#[test]
fn test_artifact_is_self_registering() {
    let project = Project::new();
    let built = project.builder().build("v1").expect("Build failed");

    let hash = built
        .release
        .hash(&path("Component/Button/default"))
        .expect("Button is in the release");
    let code = fs::read_to_string(
        project
            .dist_dir
            .join(format!("items/Component/Button/default/{hash}.js")),
    )
    .unwrap();

    assert!(code.contains(&format!(
        "registry.items[\"Component/Button/default/{hash}\"] = function (__pl_deps) {{"
    )));
    assert!(code.contains("const React = __pl_default(__pl_deps[\"react\"]);"));
    assert!(code.contains("return Button;"));
    assert!(!code.contains("import React"));
    assert!(!code.contains("export default"));
}

#[test]
fn test_hash_is_deterministic_and_local_to_a_variant() {
    let project = Project::new();
    let first = project.builder().build("v1").expect("Build failed");
    let again = project.builder().build("v2").expect("Build failed");
    assert_eq!(first.release.hashes, again.release.hashes);

    project.write(
        "Component/Button/secondary/index.tsx",
        &common::BUTTON_SECONDARY.replace("h2", "h3"),
    );
    let changed = project.builder().build("v3").expect("Build failed");

    for (logical, hash) in &first.release.hashes {
        let after = &changed.release.hashes[logical];
        if logical.to_string() == "Component/Button/secondary" {
            assert_ne!(hash, after);
        } else {
            assert_eq!(hash, after, "{logical} should not change");
        }
    }
    assert_eq!(changed.written_artifacts, 1);
}

#[test]
fn test_rebuild_is_reproducible() {
    let project = Project::new();
    let builder = project.builder();
    builder
        .build_at("v1", Utc.timestamp_opt(1_000, 0).unwrap())
        .expect("Build failed");
    let read = |file: &str| fs::read(project.release_file("v1", file)).unwrap();
    let before: Vec<_> = ["manifest.json", "server.js", "client.js"]
        .iter()
        .map(|file| read(file))
        .collect();

    builder
        .build_at("v1", Utc.timestamp_opt(2_000, 0).unwrap())
        .expect("Build failed");
    let after: Vec<_> = ["manifest.json", "server.js", "client.js"]
        .iter()
        .map(|file| read(file))
        .collect();
    assert_eq!(before, after);

    let meta: ReleaseMeta =
        serde_json::from_slice(&read("meta.json")).expect("Failed to parse meta.json");
    assert_eq!(meta.created_at, Utc.timestamp_opt(1_000, 0).unwrap());
    assert_eq!(meta.updated_at, Utc.timestamp_opt(2_000, 0).unwrap());
}

#[test]
fn test_bootstraps_register_release() {
    let project = Project::new();
    let built = project.builder().build("v1").expect("Build failed");
    let server = fs::read_to_string(project.release_file("v1", "server.js")).unwrap();
    let client = fs::read_to_string(project.release_file("v1", "client.js")).unwrap();

    assert!(server.contains("registry.releases[\"v1\"] = {"));
    assert!(server.contains("registry.current = \"v1\";"));
    assert!(server.contains("globalThis[\"_PL_\"]"));
    assert!(client.starts_with(&server));

    let loader = built.release.loader("Component").expect("Component loader");
    assert!(client.contains(&format!("registry.items[\"{loader}\"]")));
    assert!(!server.contains(&format!("registry.items[\"{loader}\"]")));
}

#[test]
fn test_failed_leaf_publishes_nothing() {
    let project = Project::new();
    project.write(
        "Component/Broken/default/index.ts",
        "export const value = 1;\n",
    );

    let err = project.builder().build("v1").unwrap_err();
    assert!(matches!(err, Error::Build { .. }), "unexpected error: {err}");
    assert!(!project.dist_dir.join("releases.json").exists());
    assert!(!project.release_file("v1", "manifest.json").exists());
    assert!(!project.dist_dir.join("items").exists());
}

#[test]
fn test_missing_entry_module_fails_build() {
    let project = Project::new();
    fs::create_dir_all(project.source_dir.join("Component/Empty/default")).unwrap();

    let err = project.builder().build("v1").unwrap_err();
    assert!(err.to_string().contains("no entry module"));
    assert!(err.to_string().contains("Empty"));
}

#[test]
fn test_release_index_records_builds() {
    let project = Project::new();
    let builder = project.builder();
    builder
        .build_at("v1", Utc.timestamp_opt(10, 0).unwrap())
        .unwrap();
    builder
        .build_at("v2", Utc.timestamp_opt(20, 0).unwrap())
        .unwrap();

    let store = PromotionStore::new(&project.source_dir, &project.dist_dir);
    let index = store.releases().unwrap();
    let ids: Vec<_> = index.newest_first().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, ["v2", "v1"]);
}

// =============================================================================
// Promotion
// =============================================================================

fn built_project(releases: usize) -> Project {
    let project = Project::new();
    let builder = project.builder();
    for i in 0..releases {
        builder
            .build_at(&format!("v{i}"), Utc.timestamp_opt(i as i64, 0).unwrap())
            .expect("Build failed");
    }
    project
}

#[test]
fn test_history_keeps_newest_thirty() {
    let project = built_project(35);
    let store = PromotionStore::new(&project.source_dir, &project.dist_dir);

    for i in 0..35 {
        store
            .promote_at(
                "web",
                "production",
                &format!("v{i}"),
                Utc.timestamp_opt(100 + i, 0).unwrap(),
            )
            .expect("Promotion failed");
    }

    let history = store.history("web").unwrap();
    let log = &history["production"].history;
    assert_eq!(log.len(), HISTORY_LIMIT);
    assert_eq!(log[0].name, "v34");
    assert_eq!(log[29].name, "v5");
    assert!(log.windows(2).all(|w| w[0].updated_at > w[1].updated_at));

    let current = store.current("web").unwrap();
    assert_eq!(current["production"].current, "v34");
    assert!(!current.contains_key("staging"));
}

#[test]
fn test_promotion_rejects_unknown_names() {
    let project = built_project(1);
    let store = PromotionStore::new(&project.source_dir, &project.dist_dir);

    for (target, environment, release) in [
        ("mobile", "production", "v0"),
        ("web", "dev", "v0"),
        ("web", "production", "v9"),
    ] {
        let err = store.promote(target, environment, release).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "unexpected error: {err}");
    }
    assert!(!project.dist_dir.join("manifests/web").exists());
}

#[test]
fn test_interrupted_promotion_is_replayed() {
    let project = built_project(2);
    let store = PromotionStore::new(&project.source_dir, &project.dist_dir);
    store
        .promote_at("web", "staging", "v0", Utc.timestamp_opt(100, 0).unwrap())
        .unwrap();

    // Journal written, documents not yet replaced.
    let dir = project.dist_dir.join("manifests/web");
    let current = fs::read_to_string(dir.join("current.json"))
        .unwrap()
        .replace("\"v0\"", "\"v1\"");
    fs::write(
        dir.join("pending.json"),
        format!(
            "{{ \"current\": {current}, \"history\": {} }}",
            fs::read_to_string(dir.join("history.json")).unwrap()
        ),
    )
    .unwrap();

    let current = store.current("web").unwrap();
    assert_eq!(current["staging"].current, "v1");
    assert!(!dir.join("pending.json").exists());

    let on_disk: CurrentDocument =
        load_or_default(dir.join("current.json"), CurrentDocument::new()).unwrap();
    assert_eq!(on_disk["staging"].current, "v1");
}

// =============================================================================
// Documents
// =============================================================================

#[test]
fn test_load_or_default_absent_versus_corrupt() {
    let project = Project::new();
    let path = project.dist_dir.join("manifests/web/history.json");

    let absent: HistoryDocument = load_or_default(&path, HistoryDocument::new()).unwrap();
    assert!(absent.is_empty());

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ \"production\": ").unwrap();
    let err = load_or_default(&path, HistoryDocument::new()).unwrap_err();
    assert!(matches!(err, Error::CorruptDocument { .. }));
}

#[test]
fn test_content_hash_of_artifact_body() {
    let a = ContentHash::of("return Button;");
    assert_eq!(a, ContentHash::of("return Button;"));
    assert_ne!(a, ContentHash::of("return Button ;"));
}
