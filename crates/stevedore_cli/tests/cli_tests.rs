//! End-to-end tests for the `stevedore` binary.
//!
//! Secrets come from a `--secrets-file`, so no Vault server is needed.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

const REGISTRY: &str = r#"
clusters:
  minikube:
    name: minikube
    api: https://192.168.99.100:8443
    regions: [minikube]
regions:
- name: minikube
  environment: dev
  cluster: minikube
  namespace: apps
  vault:
    url: http://localhost:8200
    folder: minikube
github:
  organisation: babylonhealth
teams:
- name: devops
  githubAdmins: devops-admins
  owners:
  - name: clux
    github: clux
- name: data
  owners: []
"#;

const MANIFEST: &str = r#"
name: webapp
image: clux/webapp-rs
version: 0.2.0
metadata:
  team: devops
resources:
  requests: { cpu: 200m, memory: 300Mi }
  limits: { cpu: 500m, memory: 500Mi }
health:
  uri: /health
  wait: 5
httpPort: 8000
configs:
  mount: /config/
  files:
  - name: webapp.conf.j2
    dest: webapp.conf
regions: [minikube]
env:
  DATABASE_URL: IN_VAULT
  LOG_LEVEL: info
"#;

/// Lay out a registry, one service and a secrets file.
fn workspace(regions: &str) -> TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let service = root.join("services").join("webapp");
    fs::create_dir_all(&service).unwrap();
    fs::write(root.join("shipcat.conf"), REGISTRY).unwrap();
    fs::write(
        service.join("manifest.yml"),
        MANIFEST.replace("regions: [minikube]", &format!("regions: {}", regions)),
    )
    .unwrap();
    fs::write(service.join("webapp.conf.j2"), "db={{ env.DATABASE_URL }}\n").unwrap();
    fs::write(
        root.join("secrets.yml"),
        "minikube/webapp/DATABASE_URL: postgres://minikube\n",
    )
    .unwrap();
    temp
}

fn stevedore(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stevedore"))
        .current_dir(root)
        .env_remove("VAULT_TOKEN")
        .env_remove("STEVEDORE_REGISTRY")
        .env_remove("STEVEDORE_CONFIG")
        .args(args)
        .output()
        .unwrap()
}

const INPUTS: [&str; 4] = ["-m", "services/webapp/manifest.yml", "-r", "shipcat.conf"];

#[test]
fn test_resolve_yaml() {
    let temp = workspace("[minikube]");
    let mut args = vec!["resolve"];
    args.extend(INPUTS);
    args.extend(["--secrets-file", "secrets.yml"]);

    let output = stevedore(temp.path(), &args);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("---\n"));
    assert!(stdout.contains("namespace: apps"));
    assert!(stdout.contains("db=postgres://minikube"));
}

#[test]
fn test_resolve_kube_json_redacted() {
    let temp = workspace("[minikube]");
    let mut args = vec!["resolve"];
    args.extend(INPUTS);
    args.extend(["--secrets-file", "secrets.yml", "--kube", "--format", "json", "--redact"]);

    let output = stevedore(temp.path(), &args);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let objects: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let kinds: Vec<_> = objects.iter().map(|o| o["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["ConfigMap", "Secret", "Deployment"]);
    assert_eq!(objects[1]["stringData"]["DATABASE_URL"], "<redacted>");
    assert_eq!(objects[0]["data"]["webapp.conf"], "db=<redacted>\n");

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("postgres://minikube"));
}

#[test]
fn test_resolve_yaml_redacts_rendered_files() {
    let temp = workspace("[minikube]");
    let mut args = vec!["resolve"];
    args.extend(INPUTS);
    args.extend(["--secrets-file", "secrets.yml", "--redact"]);

    let output = stevedore(temp.path(), &args);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("db=<redacted>"));
    assert!(!stdout.contains("postgres://minikube"));
}

#[test]
fn test_unknown_region_exit_code() {
    let temp = workspace("[minikube, staging]");
    let mut args = vec!["resolve"];
    args.extend(INPUTS);
    args.extend(["--secrets-file", "secrets.yml"]);

    let output = stevedore(temp.path(), &args);
    assert_eq!(output.status.code(), Some(6));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("staging"));
}

#[test]
fn test_missing_token_exit_code() {
    let temp = workspace("[minikube]");
    let mut args = vec!["resolve"];
    args.extend(INPUTS);

    let output = stevedore(temp.path(), &args);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_validate() {
    let temp = workspace("[minikube]");
    let mut args = vec!["validate"];
    args.extend(INPUTS);
    let output = stevedore(temp.path(), &args);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));

    fs::remove_file(temp.path().join("services/webapp/webapp.conf.j2")).unwrap();
    let output = stevedore(temp.path(), &args);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_template_command() {
    let temp = workspace("[minikube]");
    let mut args = vec!["template"];
    args.extend(INPUTS);
    args.extend(["--region", "minikube", "--secrets-file", "secrets.yml", "--file", "webapp.conf"]);

    let output = stevedore(temp.path(), &args);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "db=postgres://minikube\n");
}

#[test]
fn test_get_views() {
    let temp = workspace("[minikube]");

    let output = stevedore(
        temp.path(),
        &["get", "clusterinfo", "-r", "shipcat.conf", "--region", "minikube", "--format", "json"],
    );
    assert!(output.status.success());
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["apiserver"], "https://192.168.99.100:8443");

    let output = stevedore(
        temp.path(),
        &["get", "versions", "-r", "shipcat.conf", "--region", "minikube", "--format", "json"],
    );
    let versions: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(versions["webapp"], "0.2.0");

    let output = stevedore(temp.path(), &["get", "images", "-r", "shipcat.conf", "--format", "json"]);
    let images: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(images["webapp"], "clux/webapp-rs");
}

#[test]
fn test_get_team_views() {
    let temp = workspace("[minikube]");

    let output = stevedore(
        temp.path(),
        &["get", "breakdown", "-r", "shipcat.conf", "--region", "minikube", "--format", "json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let breakdown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // 500m x 1 replica rounds up, 500Mi rounds down
    assert_eq!(breakdown["teams"]["devops"]["limits"]["cores"], 1.0);
    assert_eq!(breakdown["teams"]["devops"]["limits"]["memory_gib"], 0.0);
    assert_eq!(breakdown["teams"]["data"]["requests"]["cores"], 0.0);

    let output = stevedore(temp.path(), &["get", "codeowners", "-r", "shipcat.conf"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "services/webapp/* @babylonhealth/devops-admins @clux\n"
    );

    let output = stevedore(
        temp.path(),
        &["get", "vaultpolicy", "-r", "shipcat.conf", "--region", "minikube", "--team", "devops"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let policy = String::from_utf8(output.stdout).unwrap();
    assert!(policy.contains("path \"secret/minikube/webapp/*\""));
    assert!(policy.contains("\"read\""));

    let output = stevedore(
        temp.path(),
        &["get", "vaultpolicy", "-r", "shipcat.conf", "--region", "minikube", "--team", "payments"],
    );
    assert_eq!(output.status.code(), Some(6));
}
