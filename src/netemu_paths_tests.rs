//! Tests for netemu_paths module.

use super::*;
use serial_test::serial;
use std::env;
use tempfile::tempdir;

#[test]
#[serial]
fn test_home_override_is_created() {
    let dir = tempdir().unwrap();
    let home = dir.path().join("custom-home");
    env::set_var(NETEMU_HOME_ENV, &home);

    let resolved = netemu_home_dir().unwrap();

    env::remove_var(NETEMU_HOME_ENV);
    assert_eq!(resolved, home);
    assert!(home.is_dir());
}

#[test]
#[serial]
fn test_paths_live_under_home() {
    let dir = tempdir().unwrap();
    env::set_var(NETEMU_HOME_ENV, dir.path());

    let config = daemon_config_path().unwrap();
    let log = daemon_log_path().unwrap();

    env::remove_var(NETEMU_HOME_ENV);
    assert_eq!(config, dir.path().join("daemon.yaml"));
    assert_eq!(log, dir.path().join("logs").join("netemud.log"));
    assert!(dir.path().join("logs").is_dir());
}
