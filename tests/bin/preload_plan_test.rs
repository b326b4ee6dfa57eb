use std::fs;
use std::process::Command;

const PAGE: &str = r#"<!doctype html>
<html><head>
  <meta name="predictive-preload-enabled" content="true">
  <meta name="predictive-preload-delay" content="120">
</head><body>
  <a href="/docs" data-preload>Docs</a>
  <a href="/blog" data-predictive-preload-cache-time="500">Blog</a>
  <a href="https://elsewhere.example/">Away</a>
  <a href="/logout" data-method="delete">Log out</a>
</body></html>"#;

fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
  let dir = tempfile::TempDir::new().expect("temp dir");
  let path = dir.path().join("page.html");
  fs::write(&path, PAGE).expect("write fixture");
  (dir, path)
}

#[test]
fn preload_plan_help_lists_flags() {
  let output = Command::new(env!("CARGO_BIN_EXE_preload_plan"))
    .arg("--help")
    .output()
    .expect("run preload_plan --help");
  assert!(output.status.success());
  let help = String::from_utf8_lossy(&output.stdout);
  for needle in ["--url", "--json", "--eligible-only"] {
    assert!(help.contains(needle), "help missing {needle}; got:\n{help}");
  }
}

#[test]
fn preload_plan_prints_table() {
  let (_dir, path) = fixture();
  let output = Command::new(env!("CARGO_BIN_EXE_preload_plan"))
    .arg(&path)
    .args(["--url", "https://example.com/"])
    .output()
    .expect("run preload_plan");
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("location: https://example.com/"));
  assert!(stdout.contains("predictive: enabled (trigger mouseover, delay 120ms, cache 10000ms)"));
  assert!(stdout.contains("https://example.com/docs"));
  assert!(stdout.contains("[target is on another origin]"));
  assert!(stdout.contains("[link navigates with a non-GET method]"));
  assert!(stdout.contains("2 of 4 links eligible"));
}

#[test]
fn preload_plan_emits_json() {
  let (_dir, path) = fixture();
  let output = Command::new(env!("CARGO_BIN_EXE_preload_plan"))
    .arg(&path)
    .args(["--url", "https://example.com/", "--json"])
    .output()
    .expect("run preload_plan --json");
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
  assert_eq!(plan["settings"]["predictive_enabled"], true);
  assert_eq!(plan["settings"]["delay_ms"], 120);
  let links = plan["links"].as_array().expect("links array");
  assert_eq!(links.len(), 4);
  assert_eq!(links[0]["eager"], true);
  assert_eq!(links[1]["cache_ttl_ms"], 500);
  assert_eq!(links[2]["rejection"], "cross-origin");
  assert_eq!(links[3]["rejection"], "non-get-method");
}

#[test]
fn preload_plan_eligible_only_filters_json() {
  let (_dir, path) = fixture();
  let output = Command::new(env!("CARGO_BIN_EXE_preload_plan"))
    .arg(&path)
    .args(["--url", "https://example.com/", "--json", "--eligible-only"])
    .output()
    .expect("run preload_plan --json --eligible-only");
  assert!(output.status.success());
  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
  let urls: Vec<&str> = plan["links"]
    .as_array()
    .expect("links array")
    .iter()
    .filter_map(|link| link["url"].as_str())
    .collect();
  assert_eq!(urls, ["https://example.com/docs", "https://example.com/blog"]);
}

#[test]
fn preload_plan_fails_on_missing_file() {
  let output = Command::new(env!("CARGO_BIN_EXE_preload_plan"))
    .arg("does/not/exist.html")
    .output()
    .expect("run preload_plan");
  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}

#[test]
fn preload_plan_rejects_relative_url() {
  let (_dir, path) = fixture();
  let output = Command::new(env!("CARGO_BIN_EXE_preload_plan"))
    .arg(&path)
    .args(["--url", "not a url"])
    .output()
    .expect("run preload_plan");
  assert!(!output.status.success());
}
