// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear() {
    for var in ["HV_STATE_DIR", "XDG_STATE_HOME", "HV_LISTEN_ADDR", "HV_SIDECAR_URL", "HV_SIDECAR_TOKEN"] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    clear();
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");
    std::env::set_var("HV_STATE_DIR", "/tmp/hv");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/hv"));

    std::env::remove_var("HV_STATE_DIR");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg/harvest"));
    clear();
}

#[test]
#[serial]
fn listen_addr_defaults_and_validates() {
    clear();
    assert_eq!(listen_addr().unwrap().to_string(), DEFAULT_LISTEN_ADDR);

    std::env::set_var("HV_LISTEN_ADDR", "not an address");
    assert!(matches!(listen_addr(), Err(ConfigError::InvalidEnv { var: "HV_LISTEN_ADDR", .. })));
    clear();
}

#[test]
#[serial]
fn empty_sidecar_settings_fall_back() {
    clear();
    std::env::set_var("HV_SIDECAR_URL", "");
    std::env::set_var("HV_SIDECAR_TOKEN", "");
    assert_eq!(sidecar_url(), DEFAULT_SIDECAR_URL);
    assert_eq!(sidecar_token(), None);
    clear();
}
