use backoffice_config::{Config, ConfigError, ConfigManager, HierarchyStrategy};
use std::fs;
use tempfile::tempdir;

#[test]
fn default_config_is_valid() {
    let cfg = Config::default();

    assert_eq!(cfg.daily_book_prefix, "AS");
    assert_eq!(cfg.provider_prefix, "PRV");
    assert_eq!(cfg.allocator.max_retries, 5);
    assert_eq!(cfg.hierarchy.strategy, HierarchyStrategy::Atomic);
    cfg.validate().expect("defaults validate");
}

#[test]
fn config_manager_persists_and_loads_config() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().join("home")).expect("manager");

    let mut cfg = Config::default();
    cfg.hierarchy.strategy = HierarchyStrategy::ReadMax;
    cfg.pagination.default_limit = 25;

    manager.save(&cfg).expect("save config");
    let loaded = manager.load().expect("load config");

    assert_eq!(loaded, cfg);
    assert!(!manager.config_path().with_extension("json.tmp").exists());
    assert_eq!(manager.data_dir(&loaded), dir.path().join("home").join("data"));
}

#[test]
fn partial_files_fill_in_defaults() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    fs::write(
        manager.config_path(),
        r#"{"hierarchy": {"strategy": "READ_MAX"}, "allocator": {"max_retries": 2}}"#,
    )
    .expect("write config");

    let loaded = manager.load().expect("load config");
    assert_eq!(loaded.hierarchy.strategy, HierarchyStrategy::ReadMax);
    assert_eq!(loaded.allocator.max_retries, 2);
    assert_eq!(loaded.allocator.backoff_ms, 100);
    assert_eq!(loaded.log_filter, "backoffice=info");
}

#[test]
fn invalid_settings_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let mut cfg = Config::default();
    cfg.pagination.default_limit = 500;
    assert!(matches!(manager.save(&cfg), Err(ConfigError::Invalid(_))));

    fs::write(manager.config_path(), "not json").expect("write config");
    assert!(matches!(manager.load(), Err(ConfigError::Serde(_))));
}
