use crate::common::{TestHome, profile_error};
use amplifier_profiles::cache::GitCache;
use amplifier_profiles::core::ProfileError;
use amplifier_profiles::git::{SystemGit, is_git_installed};
use amplifier_profiles::resolver::RefResolver;
use amplifier_profiles::test_utils::{ManifestFixture, TestGit, write_file};
use std::path::Path;

/// A repository with `tools/tool_echo/` on `main`, tagged `v1.0.0`, plus a later
/// commit that is also on `feature/stable`.
fn upstream(path: &Path) -> (TestGit, String, String) {
    let repo = TestGit::new(path);
    repo.init().unwrap();
    repo.config_user().unwrap();
    write_file(&path.join("tools/tool_echo/__init__.py"), "VERSION = 1\n").unwrap();
    write_file(&path.join("agents/helper.md"), "helper v1").unwrap();
    repo.add_all().unwrap();
    repo.commit("v1").unwrap();
    repo.ensure_branch("main").unwrap();
    repo.tag("v1.0.0").unwrap();
    let first = repo.rev_parse_head().unwrap();

    write_file(&path.join("tools/tool_echo/__init__.py"), "VERSION = 2\n").unwrap();
    repo.add_all().unwrap();
    repo.commit("v2").unwrap();
    let second = repo.rev_parse_head().unwrap();
    repo.create_branch("feature/stable").unwrap();
    repo.checkout("main").unwrap();
    (repo, first, second)
}

#[tokio::test]
async fn test_git_refs_resolve_to_commit_keyed_checkouts() {
    if !is_git_installed() {
        return;
    }
    let home = TestHome::new();
    let repo_path = home.temp.path().join("upstream");
    let (_repo, first, second) = upstream(&repo_path);
    let url = repo_path.display().to_string();

    let resolver = RefResolver::new(GitCache::new(home.home().join("cache/git"), SystemGit::default()), None);

    let at_tag = resolver.resolve(&format!("git+{url}@v1.0.0/tools/tool_echo")).await.unwrap();
    assert_eq!(std::fs::read_to_string(at_tag.join("__init__.py")).unwrap(), "VERSION = 1\n");
    assert!(at_tag.parent().unwrap().parent().unwrap().ends_with(&first));

    let at_branch = resolver.resolve(&format!("git+{url}@main")).await.unwrap();
    assert!(at_branch.ends_with(&second));
    assert_eq!(std::fs::read_to_string(at_branch.join("tools/tool_echo/__init__.py")).unwrap(), "VERSION = 2\n");

    let pinned = resolver.resolve(&format!("git+{url}@{first}#subdirectory=agents")).await.unwrap();
    assert_eq!(std::fs::read_to_string(pinned.join("helper.md")).unwrap(), "helper v1");

    let err = resolver.resolve(&format!("git+{url}@no-such-branch")).await.unwrap_err();
    assert!(matches!(profile_error(&err), ProfileError::RefResolution { .. }));

    // Only `feature/stable` exists; a suffix match must not satisfy `@stable`
    let err = resolver.resolve(&format!("git+{url}@stable")).await.unwrap_err();
    assert!(matches!(profile_error(&err), ProfileError::RefResolution { .. }));

    let err = resolver.resolve(&format!("git+{url}@main/does/not/exist")).await.unwrap_err();
    match profile_error(&err) {
        ProfileError::RefResolution {
            reference,
            ..
        } => assert_eq!(reference, &format!("git+{url}@main/does/not/exist")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_compile_from_git_collection() {
    if !is_git_installed() {
        return;
    }
    let home = TestHome::new();
    let repo_path = home.temp.path().join("profiles-repo");
    let repo = TestGit::new(&repo_path);
    repo.init().unwrap();
    repo.config_user().unwrap();

    let collection = repo_path.join("foundation");
    write_file(&collection.join("agents/reviewer.md"), "Review carefully.").unwrap();
    ManifestFixture::new("base").section("agents:\n  reviewer: agents/reviewer.md").write_to(&collection).unwrap();
    ManifestFixture::new("dev").extends("base").body("Dev mode.").write_to(&collection).unwrap();
    repo.add_all().unwrap();
    repo.commit("profiles").unwrap();
    repo.ensure_branch("main").unwrap();

    let service = home.service(SystemGit::default());
    service.add_source("foundation", &format!("git+{}@main/foundation", repo_path.display())).unwrap();

    let found = service.discover_collection("foundation").await.unwrap();
    assert_eq!(found.len(), 2);

    let compiled = service.activate("foundation/dev", true).await.unwrap().unwrap();
    assert_eq!(std::fs::read_to_string(compiled.join("agents/reviewer.md")).unwrap(), "Review carefully.");
    assert_eq!(service.active().unwrap().as_deref(), Some("foundation/dev"));
}
