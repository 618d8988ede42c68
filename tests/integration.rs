use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn admitd_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("admitd");
    path
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn setup_test_env() -> (TempDir, PathBuf, u16) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let port = free_port();
    let config_content = format!(
        r#"[db]
path = "{root}/data/admit.sqlite"

[server]
bind = "127.0.0.1:{port}"
"#,
        root = root.display(),
        port = port
    );

    let config_path = config_dir.join("admitd.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path, port)
}

fn run_admitd(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = admitd_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OPENAI_API_KEY")
        .env_remove("TWILIO_ACCOUNT_SID")
        .env_remove("SENDGRID_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run admitd binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path, _) = setup_test_env();

    let (stdout, stderr, success) = run_admitd(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path, _) = setup_test_env();

    let (_, _, success1) = run_admitd(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_admitd(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_seed_idempotent() {
    let (_tmp, config_path, _) = setup_test_env();
    run_admitd(&config_path, &["init"]);

    let (stdout1, _, success1) = run_admitd(&config_path, &["seed"]);
    assert!(success1, "seed failed: {}", stdout1);
    assert!(stdout1.contains("seeded:"));

    let (stdout2, _, success2) = run_admitd(&config_path, &["seed"]);
    assert!(success2);
    assert!(stdout2.contains("nothing to do"));
}

#[test]
fn test_kb_add_and_list() {
    let (_tmp, config_path, _) = setup_test_env();
    run_admitd(&config_path, &["init"]);

    let (stdout, stderr, success) = run_admitd(
        &config_path,
        &[
            "kb",
            "add",
            "--title",
            "Hostel Rules",
            "--content",
            "Hostel gates close at 10pm. Guests must register at the warden's office.",
        ],
    );
    assert!(success, "kb add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Hostel Rules"));

    let (stdout, _, success) = run_admitd(&config_path, &["kb", "list"]);
    assert!(success);
    assert!(stdout.contains("Hostel Rules"));
    assert!(stdout.contains("0 chunks"));
}

#[test]
fn test_index_rejects_short_content() {
    let (_tmp, config_path, _) = setup_test_env();
    run_admitd(&config_path, &["init"]);
    run_admitd(
        &config_path,
        &["kb", "add", "--title", "Tiny", "--content", "hi"],
    );

    let (stdout, _, success) = run_admitd(&config_path, &["index", "all"]);
    assert!(success);
    assert!(
        stdout.contains("short"),
        "expected a 'too short' message, got: {}",
        stdout
    );
}

#[test]
fn test_index_without_embedding_provider_reports_credentials() {
    let (_tmp, config_path, _) = setup_test_env();
    run_admitd(&config_path, &["init"]);
    run_admitd(
        &config_path,
        &[
            "kb",
            "add",
            "--title",
            "Fees",
            "--content",
            "The fee structure for B.Tech programs is published every academic year on the website.",
        ],
    );

    let (stdout, _, success) = run_admitd(&config_path, &["index", "all"]);
    assert!(success);
    assert!(
        stdout.contains("OPENAI_API_KEY"),
        "expected an embedding credential message, got: {}",
        stdout
    );
}

#[test]
fn test_retrieve_with_empty_store() {
    let (_tmp, config_path, _) = setup_test_env();
    run_admitd(&config_path, &["init"]);

    let (stdout, _, success) = run_admitd(&config_path, &["retrieve"]);
    assert!(success);
    assert!(stdout.contains("No chunks retrieved"));
}

struct ServerGuard(Child);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn start_server(config_path: &Path, port: u16) -> ServerGuard {
    let child = Command::new(admitd_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("serve")
        .env_remove("OPENAI_API_KEY")
        .env_remove("TWILIO_ACCOUNT_SID")
        .env_remove("SENDGRID_API_KEY")
        .spawn()
        .expect("failed to spawn admitd serve");
    let guard = ServerGuard(child);

    // Wait for the server to come up
    let client = reqwest::blocking::Client::new();
    let health_url = format!("http://127.0.0.1:{}/health", port);
    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        if let Ok(resp) = client.get(&health_url).send() {
            if resp.status().is_success() {
                break;
            }
        }
        assert!(Instant::now() < deadline, "server did not start in time");
        std::thread::sleep(Duration::from_millis(100));
    }

    guard
}

#[test]
fn test_webhook_unknown_event_and_end_of_call() {
    let (tmp, config_path, port) = setup_test_env();
    run_admitd(&config_path, &["init"]);
    run_admitd(&config_path, &["seed"]);

    let _server = start_server(&config_path, port);
    let client = reqwest::blocking::Client::new();
    let webhook_url = format!("http://127.0.0.1:{}/webhook/vapi", port);

    // Unknown event type is acknowledged, not rejected
    let resp = client
        .post(&webhook_url)
        .json(&serde_json::json!({"message": {"type": "something-else"}}))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["status"], "ignored");

    // Payload without a message type is the one hard rejection
    let resp = client
        .post(&webhook_url)
        .json(&serde_json::json!({}))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // Assistant request returns the assembled assistant config
    let resp = client
        .post(&webhook_url)
        .json(&serde_json::json!({"message": {"type": "assistant-request"}}))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    let prompt = body["assistant"]["model"]["messages"][0]["content"]
        .as_str()
        .unwrap();
    assert!(prompt.contains("Balasore College"));

    // End-of-call report logs the call and extracts a fallback lead
    let resp = client
        .post(&webhook_url)
        .json(&serde_json::json!({
            "message": {
                "type": "end-of-call-report",
                "call": {
                    "id": "it-call-1",
                    "startedAt": "2026-08-01T10:00:00Z",
                    "endedAt": "2026-08-01T10:01:00Z",
                    "customer": {"number": "+919812345678"}
                },
                "artifact": {
                    "transcript": [
                        {"role": "user", "message": "I want admission"},
                        {"role": "user", "message": "Riya Sen"},
                        {"role": "user", "message": "19"},
                        {"role": "user", "message": "78%"},
                        {"role": "user", "message": "B.Tech CSE"},
                        {"role": "user", "message": "Cuttack"}
                    ]
                },
                "analysis": {"summary": "Admission enquiry."}
            }
        }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().unwrap();
    assert_eq!(body["status"], "logged");

    // Verify persisted rows through the database file
    let db_path = tmp.path().join("data/admit.sqlite");
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite:{}", db_path.display()))
            .await
            .unwrap();

        let logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM call_logs WHERE call_id = 'it-call-1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(logs, 1);

        let (name, source): (String, String) = sqlx::query_as(
            "SELECT full_name, source FROM admission_leads WHERE call_id = 'it-call-1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(name, "Riya Sen");
        assert_eq!(source, "voice_fallback");

        pool.close().await;
    });
}
