use super::*;
use crate::error::LauncherError;
use crate::scripts::ScriptEntry;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "print('hi')\n").unwrap();
    path
}

#[test]
fn test_load_missing_file_uses_default_interpreter() {
    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path().join("missing.json"));

    let config = store.load("/opt/python/bin/python3").unwrap();
    assert_eq!(config.interpreter_path, "/opt/python/bin/python3");
    assert!(config.scripts.is_empty());
}

#[test]
fn test_missing_fields_default_to_empty() {
    let persisted: PersistedConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(persisted.python_path, "");
    assert!(persisted.scripts.is_empty());

    let persisted: PersistedConfig =
        serde_json::from_str(r#"{"scripts": [{"path": "/x.py"}], "extra": 1}"#).unwrap();
    assert_eq!(persisted.scripts[0].name, "");
    assert_eq!(persisted.scripts[0].path, "/x.py");
}

#[test]
fn test_mistyped_fields_are_ignored() {
    let persisted: PersistedConfig =
        serde_json::from_str(r#"{"python_path": 42, "scripts": "nope"}"#).unwrap();
    assert_eq!(persisted, PersistedConfig::default());
}

#[test]
fn test_load_drops_entries_whose_path_does_not_exist() {
    let dir = tempdir().unwrap();
    let kept = touch(dir.path(), "kept.py");
    let gone = dir.path().join("gone.py");
    let config_path = dir.path().join("config.json");
    let json = serde_json::json!({
        "python_path": "/usr/bin/python3",
        "scripts": [
            {"name": "Kept", "path": kept.to_string_lossy()},
            {"name": "Gone", "path": gone.to_string_lossy()},
        ]
    });
    fs::write(&config_path, json.to_string()).unwrap();

    let config = ConfigStore::new(&config_path).load("").unwrap();
    assert_eq!(config.scripts, vec![ScriptEntry::new("Kept", kept)]);
    assert_eq!(config.interpreter_path, "/usr/bin/python3");
}

#[test]
fn test_load_empty_python_path_resolves_to_default() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{"python_path": "", "scripts": []}"#).unwrap();

    let config = ConfigStore::new(&config_path).load("/embedded/python3").unwrap();
    assert_eq!(config.interpreter_path, "/embedded/python3");
}

#[test]
fn test_load_fills_empty_name_and_skips_duplicates() {
    let dir = tempdir().unwrap();
    let script = touch(dir.path(), "tool.py");
    let persisted = PersistedConfig {
        python_path: "/usr/bin/python3".to_string(),
        scripts: vec![
            PersistedScript {
                name: String::new(),
                path: script.to_string_lossy().into_owned(),
            },
            PersistedScript {
                name: "Second copy".to_string(),
                path: script.to_string_lossy().into_owned(),
            },
        ],
    };

    let config = Configuration::from_persisted(persisted, "");
    assert_eq!(config.scripts.len(), 1);
    assert_eq!(config.scripts[0].name, "tool.py");
}

#[test]
fn test_load_malformed_json_is_read_error() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, "{ not json").unwrap();

    let err = ConfigStore::new(&config_path).load("").unwrap_err();
    assert!(matches!(err, LauncherError::ConfigRead { .. }));
}

#[test]
fn test_load_or_default_reports_error_and_falls_back() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, "[1, 2").unwrap();

    let (config, err) = ConfigStore::new(&config_path).load_or_default("/py");
    assert_eq!(config.interpreter_path, "/py");
    assert!(config.scripts.is_empty());
    assert!(matches!(err, Some(LauncherError::ConfigRead { .. })));
}

#[test]
fn test_save_load_save_roundtrip() {
    let dir = tempdir().unwrap();
    let a = touch(dir.path(), "a.py");
    let b = touch(dir.path(), "b.py");
    let config = Configuration {
        interpreter_path: "/usr/local/bin/python3".to_string(),
        scripts: vec![ScriptEntry::new("Beta", b), ScriptEntry::new("Alpha", a)],
    };
    let store = ConfigStore::new(dir.path().join("nested").join("config.json"));

    store.save(&config).unwrap();
    let loaded = store.load("").unwrap();
    store.save(&loaded).unwrap();
    let reloaded = store.load("").unwrap();

    assert_eq!(loaded, config);
    assert_eq!(reloaded, config);
}

#[test]
fn test_roundtrip_with_no_scripts() {
    let dir = tempdir().unwrap();
    let config = Configuration {
        interpreter_path: "/usr/bin/python3".to_string(),
        scripts: Vec::new(),
    };
    let store = ConfigStore::new(dir.path().join("config.json"));

    store.save(&config).unwrap();
    assert_eq!(store.load("/other").unwrap(), config);
}

#[test]
fn test_save_writes_expected_json_shape() {
    let dir = tempdir().unwrap();
    let script = touch(dir.path(), "s.py");
    let store = ConfigStore::new(dir.path().join("config.json"));
    let config = Configuration {
        interpreter_path: "/py".to_string(),
        scripts: vec![ScriptEntry::new("S", script.clone())],
    };

    store.save(&config).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(value["python_path"], "/py");
    assert_eq!(value["scripts"][0]["name"], "S");
    assert_eq!(
        value["scripts"][0]["path"].as_str(),
        Some(&*script.to_string_lossy())
    );
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn test_save_to_directory_path_is_write_error() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("config.json");
    fs::create_dir(&target).unwrap();
    let store = ConfigStore::new(&target);

    let err = store.save(&Configuration::default()).unwrap_err();
    assert!(matches!(err, LauncherError::ConfigWrite { .. }));
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn test_app_paths_layout() {
    let paths = AppPaths::from_dirs(Path::new("/app/bin"), Path::new("/data/script-deck"));
    assert_eq!(
        paths.config_file,
        PathBuf::from("/data/script-deck/python_runner_config.json")
    );
    assert!(paths.scripts_dir.ends_with("scripts"));
    #[cfg(target_os = "macos")]
    assert!(paths.embedded_interpreter.ends_with("Resources/python/bin/python3"));
    #[cfg(all(unix, not(target_os = "macos")))]
    assert_eq!(
        paths.embedded_interpreter,
        PathBuf::from("/app/bin/python/bin/python3")
    );
}

#[test]
fn test_default_interpreter_prefers_embedded() {
    let dir = tempdir().unwrap();
    let paths = AppPaths::from_dirs(&dir.path().join("bin"), dir.path());
    fs::create_dir_all(paths.embedded_interpreter.parent().unwrap()).unwrap();
    fs::write(&paths.embedded_interpreter, "").unwrap();

    assert_eq!(
        paths.default_interpreter(),
        paths.embedded_interpreter.to_string_lossy()
    );
}

#[test]
fn test_path_overrides() {
    let paths = AppPaths::from_dirs(Path::new("/a"), Path::new("/b"))
        .with_config_file("/c/config.json")
        .with_scripts_dir("/d");
    assert_eq!(paths.config_file, PathBuf::from("/c/config.json"));
    assert_eq!(paths.scripts_dir, PathBuf::from("/d"));
}
