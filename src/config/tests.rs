// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::env;
use std::io::Write;

use tempfile::NamedTempFile;

use super::*;

fn write_config(extension: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()
        .expect("failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("failed to write temp file");
    file
}

#[test]
fn file_provider_reads_json() {
    let file = write_config(
        "json",
        r#"{ "chains": [ { "id": "app", "priority": 5 } ] }"#,
    );
    let provider = FileConfigProvider::new(&file.path().to_string_lossy()).unwrap();

    assert!(provider.has("chains"));
    assert_eq!(provider.provider_name(), "file");

    let priority: i32 = provider
        .get_raw("chains")
        .unwrap()
        .and_then(|v| v.get(0).and_then(|c| c.get("priority")).cloned())
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap();
    assert_eq!(priority, 5);
}

#[test]
fn file_provider_reads_toml() {
    let file = write_config(
        "toml",
        r#"
[[chains]]
id = "app"
priority = 1
"#,
    );
    let provider = FileConfigProvider::new(&file.path().to_string_lossy()).unwrap();
    assert!(provider.has("chains"));
}

#[test]
fn file_provider_reads_yaml() {
    let file = write_config(
        "yaml",
        r#"
chains:
  - id: app
    priority: 2
"#,
    );
    let provider = FileConfigProvider::new(&file.path().to_string_lossy()).unwrap();
    assert!(provider.has("chains"));
}

#[test]
fn file_provider_rejects_unknown_extensions() {
    let file = write_config("ini", "chains = nope");
    let result = FileConfigProvider::new(&file.path().to_string_lossy());
    assert!(matches!(result, Err(ConfigError::ProviderError { .. })));
}

#[test]
fn file_provider_rejects_non_object_roots() {
    let file = write_config("json", "[1, 2, 3]");
    let result = FileConfigProvider::new(&file.path().to_string_lossy());
    assert!(result.is_err());
}

#[test]
fn nested_keys_use_dot_paths() {
    let file = write_config(
        "json",
        r#"{ "defaults": { "deny": { "status": 403 } } }"#,
    );
    let provider = FileConfigProvider::new(&file.path().to_string_lossy()).unwrap();

    let status: u16 = provider.get("defaults.deny.status").unwrap().unwrap();
    assert_eq!(status, 403);
    assert!(!provider.has("defaults.deny.realm"));
}

#[test]
fn env_provider_parses_scalars() {
    unsafe {
        env::set_var("WARDEN_TEST_FLAG", "true");
        env::set_var("WARDEN_TEST_COUNT", "42");
    }

    let provider = EnvConfigProvider::default();

    let flag: bool = provider.get("test.flag").unwrap().unwrap();
    assert!(flag);
    let count: i64 = provider.get("test.count").unwrap().unwrap();
    assert_eq!(count, 42);

    unsafe {
        env::remove_var("WARDEN_TEST_FLAG");
        env::remove_var("WARDEN_TEST_COUNT");
    }
}

#[test]
fn env_provider_parses_json_values() {
    unsafe {
        env::set_var("WARDEN_TEST_LIST", "[1, 2, 3]");
    }

    let provider = EnvConfigProvider::default();
    let list: Vec<i32> = provider.get("test.list").unwrap().unwrap();
    assert_eq!(list, vec![1, 2, 3]);

    unsafe {
        env::remove_var("WARDEN_TEST_LIST");
    }
}

#[test]
fn later_providers_take_precedence() {
    let low = write_config("json", r#"{ "realm": "low", "only_low": 1 }"#);
    let high = write_config("json", r#"{ "realm": "high" }"#);

    let config = Config::builder()
        .with_provider(FileConfigProvider::new(&low.path().to_string_lossy()).unwrap())
        .with_provider(FileConfigProvider::new(&high.path().to_string_lossy()).unwrap())
        .build();

    let realm: String = config.get("realm").unwrap().unwrap();
    assert_eq!(realm, "high");

    // Keys absent from the later provider fall through to the earlier one.
    let only_low: i32 = config.get("only_low").unwrap().unwrap();
    assert_eq!(only_low, 1);
}

#[test]
fn get_or_default_falls_back() {
    let config = Config::builder().build();
    let value: String = config.get_or_default("missing", "fallback".to_string()).unwrap();
    assert_eq!(value, "fallback");
}
