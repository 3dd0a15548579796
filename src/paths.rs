//! Where `playbook.json` is looked up.
//!
//! Priority:
//! 1. `--config FILE` on the command line
//! 2. `PLAYBOOK_CONFIG` environment variable (a file path)
//! 3. `./playbook.json` if it exists
//! 4. Platform config directory from dirs-next: `<config_dir>/playbook/playbook.json`

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "playbook.json";
pub const CONFIG_ENV_VAR: &str = "PLAYBOOK_CONFIG";

/// Resolve the config file path. The result may not exist.
pub fn config_file(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    if let Ok(current_dir) = std::env::current_dir() {
        let local = current_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }
    }
    config_dir().join(CONFIG_FILE_NAME)
}

/// Platform config directory for playbook, `.` if unknown
pub fn config_dir() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("playbook"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_path_wins() {
        let path = config_file(Some(Path::new("/custom/lib.json")));
        assert_eq!(path, PathBuf::from("/custom/lib.json"));
    }

    #[test]
    fn test_default_name() {
        assert!(config_dir().join(CONFIG_FILE_NAME).ends_with("playbook.json"));
    }
}
