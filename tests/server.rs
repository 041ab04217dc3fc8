//! End-to-end tests of the HTTP trigger: each test spawns `reseed serve`
//! against its own temp workspace and port and drives it with a blocking
//! HTTP client.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;

fn reseed_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("reseed");
    path
}

/// Kills the spawned server even when an assertion panics.
struct ServerGuard(Child);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Writes a workspace with small media and chapter snapshots plus a config
/// bound to `bind`. `extra_server_lines` lands inside `[server]`.
fn setup_workspace(bind: &str, extra_server_lines: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let snapshots = root.join("snapshots");
    fs::create_dir_all(snapshots.join("images")).unwrap();
    fs::write(
        snapshots.join("media.json"),
        r#"[ { "id": 42, "filename": "logo.png" } ]"#,
    )
    .unwrap();
    fs::write(snapshots.join("images").join("logo.png"), b"png").unwrap();
    fs::write(
        snapshots.join("chapters.json"),
        r#"[ { "id": 5, "name": "OUSL", "logoDark": 42 } ]"#,
    )
    .unwrap();

    let config_path = root.join("reseed.toml");
    fs::write(
        &config_path,
        format!(
            r#"[store]
path = "{root}/data/store.sqlite"
media_dir = "{root}/data/store-media"

[snapshots]
data_dir = "{root}/snapshots"

[server]
bind = "{bind}"
token = "secret"
{extra}
"#,
            root = root.display(),
            bind = bind,
            extra = extra_server_lines,
        ),
    )
    .unwrap();

    let init = Command::new(reseed_binary())
        .args(["--config", config_path.to_str().unwrap(), "init"])
        .output()
        .unwrap();
    assert!(init.status.success());

    (tmp, config_path)
}

fn spawn_server(config_path: &Path, bind: &str) -> ServerGuard {
    let child = Command::new(reseed_binary())
        .args(["--config", config_path.to_str().unwrap(), "serve"])
        .spawn()
        .unwrap();
    let guard = ServerGuard(child);

    let client = reqwest::blocking::Client::new();
    let mut ready = false;
    for _ in 0..50 {
        if client
            .get(format!("http://{}/health", bind))
            .send()
            .is_ok()
        {
            ready = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    assert!(ready, "server did not start listening on {}", bind);

    guard
}

#[test]
fn test_seed_endpoint() {
    let bind = "127.0.0.1:17411";
    let (tmp, config_path) = setup_workspace(bind, "");
    let _server = spawn_server(&config_path, bind);
    let client = reqwest::blocking::Client::new();
    let seed_url = format!("http://{}/seed?collection=media", bind);

    // Health check needs no auth.
    let health: serde_json::Value = client
        .get(format!("http://{}/health", bind))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(health["status"], "ok");

    // No token: 403, and nothing was seeded.
    let resp = client.post(&seed_url).json(&serde_json::json!({})).send().unwrap();
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "forbidden");
    assert!(
        !tmp.path().join("snapshots").join("id-map.json").exists(),
        "rejected request must not mutate anything"
    );

    // Wrong token: also 403.
    let resp = client
        .post(&seed_url)
        .bearer_auth("wrong")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Unknown collection: 400.
    let resp = client
        .post(format!("http://{}/seed?collection=users", bind))
        .bearer_auth("secret")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    // Valid token: the pass runs and reports what it covered.
    let resp = client.post(&seed_url).bearer_auth("secret").send().unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["seeded"], serde_json::json!(["media"]));
    assert!(tmp.path().join("snapshots").join("id-map.json").exists());

    // Full reseed covers every collection in dependency order.
    let resp = client
        .post(format!("http://{}/seed", bind))
        .bearer_auth("secret")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(
        body["seeded"],
        serde_json::json!(["media", "forms", "pages", "divisions", "chapters", "projects"])
    );
}

#[test]
fn test_seed_timeout_budget() {
    let bind = "127.0.0.1:17412";
    let (tmp, config_path) = setup_workspace(bind, "seed_timeout_secs = 1");
    let _server = spawn_server(&config_path, bind);
    let client = reqwest::blocking::Client::new();
    let snapshots = tmp.path().join("snapshots");

    // A small pass fits the budget and flushes a chapters mapping.
    let resp = client
        .post(format!("http://{}/seed?collection=chapters", bind))
        .bearer_auth("secret")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(snapshots.join("id-map.json")).unwrap()).unwrap();
    let chapter_id = map["chapters"]["5"].as_i64().expect("chapter 5 mapped");

    // A media snapshot far too large to create within one second.
    let mut giant = String::from("[");
    for i in 0..200_000 {
        if i > 0 {
            giant.push(',');
        }
        giant.push_str(&format!(r#"{{"id":{},"alt":"doc {}"}}"#, i + 1, i + 1));
    }
    giant.push(']');
    fs::write(snapshots.join("media.json"), giant).unwrap();

    let resp = client
        .post(format!("http://{}/seed?collection=media", bind))
        .bearer_auth("secret")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 408);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "timeout");

    // The aborted pass released its lock and never flushed the reset map:
    // the previously persisted chapters mapping survives.
    assert!(
        !snapshots.join(".seed.lock").exists(),
        "aborted pass must release the lock file"
    );
    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(snapshots.join("id-map.json")).unwrap()).unwrap();
    assert_eq!(map["chapters"]["5"].as_i64(), Some(chapter_id));

    // Re-running with a snapshot that fits recovers.
    fs::write(
        snapshots.join("media.json"),
        r#"[ { "id": 42, "filename": "logo.png" } ]"#,
    )
    .unwrap();
    let resp = client
        .post(format!("http://{}/seed?collection=media", bind))
        .bearer_auth("secret")
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["seeded"], serde_json::json!(["media"]));
}

#[test]
fn test_concurrent_seed_requests_queue() {
    let bind = "127.0.0.1:17413";
    let (_tmp, config_path) = setup_workspace(bind, "");
    let _server = spawn_server(&config_path, bind);

    // Overlapping authorized passes queue behind the in-process gate
    // instead of tripping over the cross-process lock file: both succeed.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let url = format!("http://{}/seed", bind);
        handles.push(std::thread::spawn(move || {
            let client = reqwest::blocking::Client::new();
            let resp = client.post(&url).bearer_auth("secret").send().unwrap();
            let status = resp.status();
            let body: serde_json::Value = resp.json().unwrap();
            (status, body)
        }));
    }

    for handle in handles {
        let (status, body) = handle.join().unwrap();
        assert_eq!(status, 200, "concurrent seed request failed: {}", body);
        assert_eq!(
            body["seeded"],
            serde_json::json!(["media", "forms", "pages", "divisions", "chapters", "projects"])
        );
    }
}
