use usesgraph::config::*;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = UsesGraphConfig::default();
    assert_eq!(config.workflows_dir, ".github/workflows");
    assert!(config.workflow_extensions.iter().any(|e| e == "yml"));
    assert!(config.workflow_extensions.iter().any(|e| e == "yaml"));
    assert!(config.persist_visited);
}

#[test]
fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let config = UsesGraphConfig {
        timeout_secs: 5,
        ..UsesGraphConfig::default()
    };
    save_config(dir.path(), &config).unwrap();
    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(config, loaded);
    assert!(!get_config_path(dir.path()).with_extension("tmp").exists());
}

#[test]
fn test_load_missing_config_returns_default() {
    let dir = TempDir::new().unwrap();
    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded, UsesGraphConfig::default());
}

#[test]
fn test_load_malformed_config_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(get_config_path(dir.path()), "{ not json").unwrap();
    assert!(load_config(dir.path()).is_err());
}

#[test]
fn test_should_scan_workflow() {
    assert!(should_scan_workflow("ci.yml", &[]));

    let only = vec!["CI.yml".to_string(), "release-*".to_string()];
    assert!(should_scan_workflow("ci.yml", &only));
    assert!(should_scan_workflow("Release-Nightly.yaml", &only));
    assert!(!should_scan_workflow("lint.yml", &only));
}

#[test]
fn test_store_path_inside_home() {
    let dir = TempDir::new().unwrap();
    assert!(get_store_path(dir.path()).ends_with(STORE_FILENAME));
    assert!(default_home().ends_with(USESGRAPH_DIR));
}
