use crate::common::TestHome;
use amplifier_profiles::config::{GlobalConfig, HOME_ENV};
use amplifier_profiles::test_utils::{ManifestFixture, write_file};
use predicates::prelude::*;
use serial_test::serial;

fn seeded(home: &TestHome) -> String {
    let root = home.collection_root("foundation");
    write_file(&root.join("agents/reviewer.md"), "Review.").unwrap();
    ManifestFixture::new("base").section("agents:\n  reviewer: agents/reviewer.md").write_to(&root).unwrap();
    ManifestFixture::new("dev")
        .extends("base")
        .section("tools:\n  - module: tool-bash\n    config:\n      shell: zsh")
        .write_to(&root)
        .unwrap();
    root.display().to_string()
}

#[test]
fn test_source_add_and_list() {
    let home = TestHome::new();
    let root = seeded(&home);

    home.cmd().args(["source", "list"]).assert().success().stdout(predicate::str::contains("No collections"));

    home.cmd()
        .args(["source", "add", "foundation", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered foundation"));

    home.cmd().args(["source", "list"]).assert().success().stdout(predicate::str::contains(root.as_str()));

    home.cmd()
        .args(["source", "add", "foundation", &root])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already registered"));

    home.cmd().args(["source", "add", "bad id", &root]).assert().failure();
}

#[test]
fn test_discover_list_show_compile_activate() {
    let home = TestHome::new();
    let root = seeded(&home);
    home.cmd().args(["source", "add", "foundation", &root]).assert().success();

    home.cmd()
        .args(["discover", "foundation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("foundation (2 profile(s))"));

    home.cmd()
        .args(["list", "foundation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dev").and(predicate::str::contains("extends base")));

    let output = home.cmd().args(["show", "foundation", "dev", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["inheritance_chain"], serde_json::json!(["base", "dev"]));
    assert_eq!(shown["tools"][0]["config"]["shell"], "zsh");
    assert_eq!(shown["agents"]["reviewer"], "agents/reviewer.md");

    home.cmd()
        .args(["show", "foundation", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: dev"));

    home.cmd().args(["compile", "foundation", "dev"]).assert().success();
    assert!(home.home().join("compiled/foundation/dev/agents/reviewer.md").is_file());

    home.cmd().arg("active").assert().success().stdout(predicate::str::contains("No active profile"));
    home.cmd().args(["activate", "foundation/dev"]).assert().success();
    home.cmd().arg("active").assert().success().stdout(predicate::str::diff("foundation/dev\n"));
    home.cmd().args(["active", "--clear"]).assert().success();
    home.cmd().arg("active").assert().success().stdout(predicate::str::contains("No active profile"));
}

#[test]
fn test_errors_are_reported_on_stderr() {
    let home = TestHome::new();
    home.cmd()
        .args(["discover", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not registered"));

    home.cmd().args(["activate", "no-slash"]).assert().failure();
}

#[tokio::test]
#[serial]
async fn test_home_env_override() {
    let temp = tempfile::TempDir::new().unwrap();
    let previous = std::env::var_os(HOME_ENV);

    // SAFETY: serialized with other env-mutating tests
    unsafe { std::env::set_var(HOME_ENV, temp.path()) };
    let config = GlobalConfig::load(Some(temp.path().join("absent.toml"))).await;
    match previous {
        Some(value) => unsafe { std::env::set_var(HOME_ENV, value) },
        None => unsafe { std::env::remove_var(HOME_ENV) },
    }

    assert_eq!(config.unwrap().home_dir().unwrap(), temp.path());
}
