use std::path::PathBuf;
use std::sync::Once;

static CREATE_DIR_WARNED: Once = Once::new();

/// Resolve Accord home directory.
///
/// Priority:
/// 1) ACCORD_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.accord
pub fn accord_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("ACCORD_HOME") {
        return PathBuf::from(override_path);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".accord");
    }
    PathBuf::from(".").join(".accord")
}

fn ensure_home_dir(home: &PathBuf) {
    if let Err(err) = std::fs::create_dir_all(home) {
        CREATE_DIR_WARNED.call_once(|| {
            eprintln!(
                "Warning: failed to create Accord home directory {}: {}. Set ACCORD_HOME or pass --config.",
                home.display(),
                err
            );
        });
    }
}

/// Default config path: ~/.accord/config.toml
pub fn default_config_path() -> PathBuf {
    let home = accord_home();
    ensure_home_dir(&home);
    home.join(crate::defaults::DEFAULT_CONFIG_FILE)
}

/// Default logs directory: ~/.accord/logs
pub fn default_logs_dir() -> PathBuf {
    let home = accord_home();
    ensure_home_dir(&home);
    home.join("logs")
}

/// Default records directory: ~/.accord/records
pub fn default_records_dir() -> PathBuf {
    let home = accord_home();
    ensure_home_dir(&home);
    home.join("records")
}
