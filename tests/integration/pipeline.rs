use crate::common::{CountingGit, TestHome, profile_error};
use amplifier_profiles::core::ProfileError;
use amplifier_profiles::discovery::Namespace;
use amplifier_profiles::profile::{ModuleRef, ResolvedProfile};
use amplifier_profiles::test_utils::{ManifestFixture, init_test_logging, write_file};
use serde_json::json;

fn foundation(home: &TestHome) -> std::path::PathBuf {
    let root = home.collection_root("foundation");
    ManifestFixture::new("base")
        .section("tools:\n  - module: tool-web\n    source: git+https://example.com/tool-web@main")
        .body("Base instructions.")
        .write_to(&root)
        .unwrap();
    ManifestFixture::new("dev")
        .extends("base")
        .section("tools:\n  - module: tool-web\n    config:\n      timeout: 30\n  - module: tool-bash")
        .write_to(&root)
        .unwrap();
    root
}

#[tokio::test]
async fn test_foundation_scenario_end_to_end() {
    init_test_logging(None);
    let home = TestHome::new();
    let git = CountingGit::with_files(&[("__init__.py", "def mount(): pass\n")]);
    let service = home.service(git.clone());

    let root = foundation(&home);
    service.add_source("foundation", &root.display().to_string()).unwrap();
    service.discover_collection("foundation").await.unwrap();

    let resolved = service.load("foundation", "dev").await.unwrap();
    assert_eq!(
        resolved.tools,
        vec![
            ModuleRef::new("tool-web")
                .with_source("git+https://example.com/tool-web@main")
                .with_config(json!({"timeout": 30}).as_object().cloned().unwrap()),
            ModuleRef::new("tool-bash"),
        ]
    );
    assert_eq!(resolved.inheritance_chain, vec!["base".to_string(), "dev".to_string()]);
    assert_eq!(resolved.instruction, "Base instructions.");

    let compiled = service.compile("foundation", "dev").await.unwrap();
    assert_eq!(compiled, home.home().join("compiled/foundation/dev"));
    assert!(compiled.join("__init__.py").is_file());
    assert!(compiled.join("tools/__init__.py").is_file());
    assert!(compiled.join("tools/tool-web/__init__.py").is_file());
    assert!(!compiled.join("tools/tool-bash").exists());

    let written: ResolvedProfile =
        serde_json::from_slice(&std::fs::read(compiled.join("profile.json")).unwrap()).unwrap();
    assert_eq!(written, resolved);

    // Recompiling re-resolves the ref but reuses the cached clone
    service.compile("foundation", "dev").await.unwrap();
    assert_eq!(git.clone_count(), 1);
    assert_eq!(git.resolve_count(), 2);
}

#[tokio::test]
async fn test_schema_gate_and_byte_exact_cache() {
    let home = TestHome::new();
    let service = home.service(CountingGit::default());
    let root = home.collection_root("gate");

    ManifestFixture::new("v1").schema_version(Some("1")).write_to(&root).unwrap();
    ManifestFixture::new("v3").schema_version(Some("3")).write_to(&root).unwrap();
    ManifestFixture::new("quoted").schema_version(Some("\"2\"")).write_to(&root).unwrap();
    ManifestFixture::new("float").schema_version(Some("2.0")).write_to(&root).unwrap();
    ManifestFixture::new("absent").schema_version(None).write_to(&root).unwrap();
    ManifestFixture::new("badver").version("not-semver").write_to(&root).unwrap();
    write_file(&root.join("profiles/nofront.md"), "# Just markdown\n").unwrap();

    let accepted = ManifestFixture::new("nested").body("Keep   this\n\nexactly.\n");
    let nested_path = root.join("profiles/team/nested.md");
    write_file(&nested_path, &accepted.render()).unwrap();

    service.add_source("gate", &root.display().to_string()).unwrap();
    let discovered = service.discover_collection("gate").await.unwrap();
    let names: Vec<_> = discovered.iter().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["nested".to_string()]);

    let cached = home.home().join("cache/profiles/gate/nested.md");
    assert_eq!(std::fs::read(&cached).unwrap(), std::fs::read(&nested_path).unwrap());
    assert_eq!(service.list_cached(&Namespace::Collection("gate".to_string())).unwrap().len(), 1);

    let err = service.load("gate", "v1").await.unwrap_err();
    assert!(matches!(profile_error(&err), ProfileError::ProfileNotFound { .. }));
}

#[tokio::test]
async fn test_rediscovery_replaces_cached_copy() {
    let home = TestHome::new();
    let service = home.service(CountingGit::default());
    let root = home.collection_root("c");

    ManifestFixture::new("p").body("first").write_to(&root).unwrap();
    service.add_source("c", &root.display().to_string()).unwrap();
    service.discover_collection("c").await.unwrap();
    assert_eq!(service.load("c", "p").await.unwrap().instruction, "first");

    ManifestFixture::new("p").body("second").write_to(&root).unwrap();
    service.discover_collection("c").await.unwrap();
    assert_eq!(service.load("c", "p").await.unwrap().instruction, "second");
}

#[tokio::test]
async fn test_rediscovery_forgets_profiles_failing_the_gate() {
    let home = TestHome::new();
    let service = home.service(CountingGit::default());
    let root = home.collection_root("c");

    ManifestFixture::new("p").write_to(&root).unwrap();
    service.add_source("c", &root.display().to_string()).unwrap();
    service.discover_collection("c").await.unwrap();
    assert!(service.load("c", "p").await.is_ok());

    ManifestFixture::new("p").schema_version(Some("1")).write_to(&root).unwrap();
    assert!(service.discover_collection("c").await.unwrap().is_empty());

    let err = service.load("c", "p").await.unwrap_err();
    assert!(matches!(profile_error(&err), ProfileError::ProfileNotFound { .. }));
    assert!(service.compile("c", "p").await.is_err());
}

#[tokio::test]
async fn test_context_and_agents_shallow_override() {
    let home = TestHome::new();
    let service = home.service(CountingGit::default());
    let root = home.collection_root("c");

    ManifestFixture::new("base")
        .section("context:\n  k: git+https://example.com/a@main\n  keep: ctx/keep\nagents:\n  planner: agents/planner.md")
        .write_to(&root)
        .unwrap();
    ManifestFixture::new("child")
        .extends("base")
        .section("context:\n  k: git+https://example.com/b@main")
        .write_to(&root)
        .unwrap();

    service.add_source("c", &root.display().to_string()).unwrap();
    service.discover_collection("c").await.unwrap();

    let resolved = service.load("c", "child").await.unwrap();
    assert_eq!(resolved.context["k"], "git+https://example.com/b@main");
    assert_eq!(resolved.context["keep"], "ctx/keep");
    assert_eq!(resolved.agents["planner"], "agents/planner.md");
}

#[tokio::test]
async fn test_extends_reaches_standalone_and_global() {
    let home = TestHome::new();
    let bundled = home.temp.path().join("bundled");
    let config = amplifier_profiles::config::GlobalConfig {
        bundled_dir: Some(bundled.clone()),
        ..home.config()
    };
    let service =
        amplifier_profiles::service::ProfileService::with_backend(config, CountingGit::default()).unwrap();

    ManifestFixture::new("mine").body("standalone parent").write_to(&home.home()).unwrap();
    ManifestFixture::new("shipped").body("global parent").write_to(&bundled).unwrap();

    let root = home.collection_root("team");
    ManifestFixture::new("a").extends("mine").write_to(&root).unwrap();
    ManifestFixture::new("b").extends("shipped").write_to(&root).unwrap();
    ManifestFixture::new("c").extends("elsewhere").write_to(&root).unwrap();
    service.add_source("team", &root.display().to_string()).unwrap();

    let all = service.discover_all().await.unwrap();
    assert_eq!(all["team"].len(), 3);

    assert_eq!(service.load("team", "a").await.unwrap().instruction, "standalone parent");
    assert_eq!(service.load("team", "b").await.unwrap().instruction, "global parent");

    let err = service.load("team", "c").await.unwrap_err();
    match profile_error(&err) {
        ProfileError::Inheritance {
            searched,
            ..
        } => assert_eq!(searched, "collection 'team', standalone, global"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_bundled_collection_source() {
    let home = TestHome::new();
    let bundled = home.temp.path().join("bundled");
    let config = amplifier_profiles::config::GlobalConfig {
        bundled_dir: Some(bundled.clone()),
        ..home.config()
    };
    let service =
        amplifier_profiles::service::ProfileService::with_backend(config, CountingGit::default()).unwrap();

    ManifestFixture::new("builtin").write_to(&bundled.join("collections/core")).unwrap();
    service.add_source("core", "bundled:collections.core").unwrap();

    let found = service.discover_collection("core").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "builtin");
}
