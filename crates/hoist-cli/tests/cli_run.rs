use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn hoist_cmd() -> Command {
    Command::cargo_bin("hoist").unwrap()
}

/// Seed a directory-repository module at `repo/<group>/<name>/<version>/`.
fn seed_module(
    repo: &Path,
    group: &str,
    name: &str,
    version: &str,
    manifest: Option<&str>,
    files: &[(&str, &str)],
) {
    let dir = repo.join(group).join(name).join(version);
    fs::create_dir_all(&dir).unwrap();
    if let Some(manifest) = manifest {
        fs::write(dir.join("module.toml"), manifest).unwrap();
    }
    for (file, content) in files {
        fs::write(dir.join(file), content).unwrap();
    }
}

fn write_config(dir: &Path, extra: &str) {
    // Top-level keys in `extra` must precede the table blocks.
    let config = format!(
        r#"root = "install"

{extra}
[[repository]]
type = "directory"
id = "local"
path = "repo"
"#
    );
    fs::write(dir.join("hoist.toml"), config).unwrap();
}

#[test]
fn test_run_installs_chain() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    seed_module(
        &repo,
        "org.example",
        "app",
        "1.0",
        Some("dependencies = [\"org.example:util:1.0\"]\n"),
        &[("app-1.0.jar", "app bytes")],
    );
    seed_module(&repo, "org.example", "util", "1.0", None, &[("util-1.0.jar", "util bytes")]);
    write_config(tmp.path(), "[[module]]\nspec = \"org.example:app\"\n");

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("hoist.toml")
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));

    let install = tmp.path().join("install");
    assert!(install.join("org.example/app/1.0/app-1.0.jar").is_file());
    assert!(install.join("org.example/util/1.0/util-1.0.jar").is_file());
    assert!(install.join(".hoist-state").is_file());
}

#[test]
fn test_second_run_is_up_to_date() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    seed_module(&repo, "org.example", "lib", "1.0", None, &[("lib-1.0.jar", "bytes")]);
    write_config(tmp.path(), "[[module]]\nspec = \"org.example:lib\"\n");

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("hoist.toml")
        .assert()
        .success();

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("hoist.toml")
        .assert()
        .success()
        .stderr(predicate::str::contains("1 up-to-date"));
}

#[test]
fn test_unresolved_module_exits_2() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("repo")).unwrap();
    write_config(tmp.path(), "[[module]]\nspec = \"org.example:missing\"\n");

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("hoist.toml")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unresolved"));
}

#[test]
fn test_unknown_repository_type_exits_4() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("hoist.toml"),
        r#"[[repository]]
type = "ivy"
id = "legacy"
"#,
    )
    .unwrap();

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("hoist.toml")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Unknown repository type"));
}

#[test]
fn test_missing_config_exits_4() {
    let tmp = TempDir::new().unwrap();

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("absent.toml")
        .assert()
        .code(4);
}

#[test]
fn test_policy_flag_overrides_config() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    seed_module(&repo, "org.example", "lib", "1.0", None, &[("lib-1.0.jar", "v1")]);
    seed_module(&repo, "org.example", "lib", "2.0", None, &[("lib-2.0.jar", "v2")]);
    write_config(tmp.path(), "[[module]]\nspec = \"org.example:lib\"\n");

    // Wildcard spec picks best available; with one repo no conflict arises,
    // but the policy flag must still parse.
    hoist_cmd()
        .current_dir(tmp.path())
        .args(["hoist.toml", "--policy", "oldest"])
        .assert()
        .success();

    hoist_cmd()
        .current_dir(tmp.path())
        .args(["hoist.toml", "--policy", "nearest"])
        .assert()
        .code(4);
}

#[test]
fn test_excluded_dependency_not_installed() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    seed_module(
        &repo,
        "org.example",
        "app",
        "1.0",
        Some("dependencies = [\"org.example:util:1.0\"]\n"),
        &[("app-1.0.jar", "app")],
    );
    seed_module(&repo, "org.example", "util", "1.0", None, &[("util-1.0.jar", "util")]);
    write_config(
        tmp.path(),
        "exclude = [\"org.example:util:1.0\"]\n\n[[module]]\nspec = \"org.example:app\"\n",
    );

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("hoist.toml")
        .assert()
        .success();

    let install = tmp.path().join("install");
    assert!(install.join("org.example/app/1.0/app-1.0.jar").is_file());
    assert!(!install.join("org.example/util/1.0/util-1.0.jar").exists());
}

#[test]
fn test_volatile_artifact_survives_rerun() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    seed_module(
        &repo,
        "org.example",
        "app",
        "1.0",
        Some(concat!(
            "[[artifact]]\n",
            "file = \"app.jar\"\n",
            "\n",
            "[[artifact]]\n",
            "file = \"config.xml\"\n",
            "install = \"conf/config.xml\"\n",
            "volatile = true\n",
        )),
        &[("app.jar", "jar"), ("config.xml", "<default/>")],
    );
    write_config(tmp.path(), "[[module]]\nspec = \"org.example:app\"\n");

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("hoist.toml")
        .assert()
        .success();

    let config = tmp.path().join("install/conf/config.xml");
    fs::write(&config, "<edited/>").unwrap();

    hoist_cmd()
        .current_dir(tmp.path())
        .arg("hoist.toml")
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&config).unwrap(), "<edited/>");
}
