// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn missing_config_file_means_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::at(dir.path()).unwrap();

    assert_eq!(config.settings, Settings::default());
    assert_eq!(config.heal_dir, dir.path().join("heal"));
    assert_eq!(config.contacts_path, dir.path().join("contacts.jsonl"));
    assert_eq!(config.settings.orchestrator(), OrchestratorConfig::default());
    assert_eq!(config.settings.gate(), GateConfig::default());
    assert_eq!(config.settings.worker.max_handoffs, 10);
    assert_eq!(config.settings.queue.concurrency, 1);
}

#[test]
fn partial_sections_override_only_given_keys() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        r#"
[scoring]
history_to_check = 10

[scoring.weights]
hours = 7

[retry]
cooldown_secs = 30

[enumeration]
page_end = 20

[heal]
max_wait_secs = 600
retention_secs = 86400
"#,
    )
    .unwrap();

    let settings = Config::at(dir.path()).unwrap().settings;
    let orchestrator = settings.orchestrator();

    assert_eq!(orchestrator.scorer.history_to_check, 10);
    assert_eq!(orchestrator.scorer.weights.hours, 7);
    assert_eq!(orchestrator.scorer.weights.days, 5);
    assert_eq!(orchestrator.scorer.threshold, 8);
    assert_eq!(orchestrator.retry.cooldown, Duration::from_secs(30));
    assert_eq!(orchestrator.retry.max_consecutive, 3);
    assert_eq!((orchestrator.page_start, orchestrator.page_end), (1, 20));
    assert_eq!(settings.gate().max_wait, Duration::from_secs(600));
    assert_eq!(settings.gate().poll_interval, Duration::from_secs(5));
    assert_eq!(settings.gate().retention, Duration::from_secs(86_400));
}

#[yare::parameterized(
    unknown_section = { "[bogus]\nkey = 1\n" },
    unknown_key = { "[retry]\ncooldown = 5\n" },
    wrong_type = { "[queue]\nconcurrency = \"two\"\n" },
)]
fn invalid_config_is_rejected(text: &str) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), text).unwrap();

    assert!(matches!(Config::at(dir.path()), Err(ConfigError::Parse { .. })));
}
