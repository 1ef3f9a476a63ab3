use crate::common::{CountingGit, TestHome, profile_error};
use amplifier_profiles::config::GlobalConfig;
use amplifier_profiles::core::ProfileError;
use amplifier_profiles::git::GitBackend;
use amplifier_profiles::service::ProfileService;
use amplifier_profiles::test_utils::{ManifestFixture, write_file};
use std::path::Path;
use std::time::Duration;

/// Backend that stalls either while resolving a ref or half-way through a clone.
#[derive(Clone, Copy)]
enum Stall {
    Resolve,
    Clone,
}

impl GitBackend for Stall {
    async fn resolve_commit(&self, _url: &str, _reference: &str) -> anyhow::Result<String> {
        if let Self::Resolve = self {
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        Ok("ab".repeat(20))
    }

    async fn clone_at_commit(&self, _url: &str, _commit: &str, target: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(target)?;
        std::fs::write(target.join("partial.py"), "half")?;
        tokio::time::sleep(Duration::from_secs(3)).await;
        Ok(())
    }
}

fn leftovers(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with('.'))
        .collect()
}

#[tokio::test]
async fn test_failure_on_third_of_five_references() {
    let home = TestHome::new();
    let git = CountingGit::with_files(&[("mod.py", "x = 1\n")]);
    let service = home.service(git.clone());
    let root = home.collection_root("c");

    write_file(&root.join("agents/a.md"), "a").unwrap();
    write_file(&root.join("agents/b.md"), "b").unwrap();
    ManifestFixture::new("broken")
        .section(
            "tools:\n\
             \x20 - module: t1\n    source: git+https://example.com/t1@main\n\
             \x20 - module: t2\n    source: git+https://example.com/t2@main\n\
             \x20 - module: t3\n    source: git+https://example.com/t3@missing\n\
             \x20 - module: t4\n    source: git+https://example.com/t4@main\n\
             \x20 - module: t5\n    source: git+https://example.com/t5@main",
        )
        .write_to(&root)
        .unwrap();

    service.add_source("c", &root.display().to_string()).unwrap();
    service.discover_collection("c").await.unwrap();

    let err = service.compile("c", "broken").await.unwrap_err();
    match profile_error(&err) {
        ProfileError::ProfileCompilation {
            profile,
            asset,
            source,
        } => {
            assert_eq!(profile, "broken");
            assert_eq!(asset, "tool 't3'");
            assert!(matches!(
                source.as_ref(),
                ProfileError::RefResolution { reference, .. } if reference == "git+https://example.com/t3@missing"
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Fail fast: t4 and t5 were never fetched
    assert_eq!(git.clone_count(), 2);

    let collection_dir = home.home().join("compiled/c");
    assert!(!collection_dir.join("broken").exists());
    assert!(leftovers(&collection_dir).is_empty());
}

#[tokio::test]
async fn test_failed_recompile_preserves_previous_compilation() {
    let home = TestHome::new();
    let service = home.service(CountingGit::default());
    let root = home.collection_root("c");

    write_file(&root.join("agents/helper.md"), "v1 helper").unwrap();
    ManifestFixture::new("p").section("agents:\n  helper: agents/helper.md").write_to(&root).unwrap();
    service.add_source("c", &root.display().to_string()).unwrap();
    service.discover_collection("c").await.unwrap();

    let compiled = service.compile("c", "p").await.unwrap();
    let before = std::fs::read(compiled.join("profile.json")).unwrap();

    ManifestFixture::new("p")
        .section("agents:\n  helper: agents/helper.md\n  ghost: agents/ghost.md")
        .write_to(&root)
        .unwrap();
    service.discover_collection("c").await.unwrap();

    let err = service.compile("c", "p").await.unwrap_err();
    assert!(matches!(
        profile_error(&err),
        ProfileError::ProfileCompilation { asset, .. } if asset == "agent 'ghost'"
    ));

    assert_eq!(std::fs::read(compiled.join("profile.json")).unwrap(), before);
    assert_eq!(std::fs::read_to_string(compiled.join("agents/helper.md")).unwrap(), "v1 helper");
    assert!(leftovers(&home.home().join("compiled/c")).is_empty());
}

#[tokio::test]
async fn test_concurrent_compiles_leave_one_complete_tree() {
    let home = TestHome::new();
    let service = home.service(CountingGit::default());
    let root = home.collection_root("c");

    write_file(&root.join("ctx/notes.md"), "notes").unwrap();
    ManifestFixture::new("p").section("context:\n  notes: ctx").write_to(&root).unwrap();
    service.add_source("c", &root.display().to_string()).unwrap();
    service.discover_collection("c").await.unwrap();

    let (a, b) = tokio::join!(service.compile("c", "p"), service.compile("c", "p"));
    // Last writer wins; at least one swap succeeds and the result is complete
    let compiled = a.or(b).unwrap();
    assert!(compiled.join("contexts/notes/notes.md").is_file());
    assert!(compiled.join("profile.json").is_file());
}

#[tokio::test]
async fn test_operation_timeout_removes_partial_work() {
    for stall in [Stall::Resolve, Stall::Clone] {
        let home = TestHome::new();
        let config = GlobalConfig {
            operation_timeout_secs: Some(1),
            ..home.config()
        };
        let service = ProfileService::with_backend(config, stall).unwrap();
        let root = home.collection_root("c");

        write_file(&root.join("agents/local.md"), "local").unwrap();
        ManifestFixture::new("p")
            .section("agents:\n  local: agents/local.md\n  remote: git+https://example.com/r@main/agent.md")
            .write_to(&root)
            .unwrap();
        service.add_source("c", &root.display().to_string()).unwrap();
        service.discover_collection("c").await.unwrap();

        let err = service.compile("c", "p").await.unwrap_err();
        assert!(matches!(profile_error(&err), ProfileError::OperationTimeout { .. }));

        let compiled = home.home().join("compiled/c");
        assert!(!compiled.join("p").exists());
        assert!(leftovers(&compiled).is_empty(), "staging left behind: {:?}", leftovers(&compiled));

        let git_cache = home.home().join("cache/git");
        if git_cache.is_dir() {
            for repo in std::fs::read_dir(&git_cache).unwrap() {
                assert!(leftovers(&repo.unwrap().path()).is_empty(), "temporary clone left behind");
            }
        }
    }
}
