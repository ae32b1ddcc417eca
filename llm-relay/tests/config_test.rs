//! Configuration loading from a TOML file.

use std::io::Write;

use llm_relay::{Config, LoadFailurePolicy};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
[engine]
base_url = "http://gpu-box:11434/"
keep_alive = "-1"
pull_missing = false
request_timeout_secs = 30

[session]
load_failure = "replace_on_construct"

[defaults]
model = "qwen2.5:1.5b"
temperature = 0.2
top_p = 0.5
"#,
    );

    let config = Config::load_from(file.path()).unwrap();
    assert_eq!(config.engine.base_url, "http://gpu-box:11434/");
    assert_eq!(config.engine.keep_alive, "-1");
    assert!(!config.engine.pull_missing);
    assert_eq!(config.engine.request_timeout_secs, Some(30));
    assert_eq!(config.session.load_failure, LoadFailurePolicy::ReplaceOnConstruct);
    assert_eq!(config.defaults.model, "qwen2.5:1.5b");
    assert_eq!(config.defaults.temperature, 0.2);
    assert_eq!(config.defaults.top_p, 0.5);
}

#[test]
fn test_partial_file_uses_defaults() {
    let file = write_config(
        r#"
[defaults]
model = "gemma2:2b"
"#,
    );

    let config = Config::load_from(file.path()).unwrap();
    assert_eq!(config.engine.base_url, "http://localhost:11434");
    assert_eq!(config.engine.keep_alive, "10m");
    assert!(config.engine.pull_missing);
    assert_eq!(config.session.load_failure, LoadFailurePolicy::KeepPrevious);
    assert_eq!(config.defaults.model, "gemma2:2b");
    assert_eq!(config.defaults.temperature, 0.7);
}

#[test]
fn test_invalid_policy_is_rejected() {
    let file = write_config(
        r#"
[session]
load_failure = "sometimes"
"#,
    );

    assert!(Config::load_from(file.path()).is_err());
}
