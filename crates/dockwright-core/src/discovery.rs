//! 設定ファイルの発見

use crate::error::{ComposeError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_ENV: &str = "DOCKWRIGHT_CONFIG";

/// カレントディレクトリで探す設定ファイル（優先順）
pub const CONFIG_CANDIDATES: [&str; 2] = ["dockwright.local.kdl", "dockwright.kdl"];

/// 設定ファイルを検出
///
/// 以下の優先順位で検索:
/// 1. 環境変数 DOCKWRIGHT_CONFIG
/// 2. カレントディレクトリ: dockwright.local.kdl, dockwright.kdl
#[tracing::instrument]
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(&config_path);
        debug!(env_path = %config_path, "Checking DOCKWRIGHT_CONFIG");
        if path.is_file() {
            info!(config = %path.display(), "Found config from environment variable");
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    find_config_file_in(&current_dir)
}

/// 指定ディレクトリから設定ファイルを検出
pub fn find_config_file_in(dir: &Path) -> Result<PathBuf> {
    for filename in CONFIG_CANDIDATES {
        let path = dir.join(filename);
        debug!(checking = %path.display(), "Looking for config file");
        if path.is_file() {
            info!(config = %path.display(), "Found config file");
            return Ok(path);
        }
    }

    Err(ComposeError::ConfigNotFound(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_find_config_file_in_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("dockwright.kdl"), "// test").unwrap();

        let path = find_config_file_in(temp_dir.path()).unwrap();
        assert!(path.ends_with("dockwright.kdl"));
    }

    #[test]
    fn test_local_file_has_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("dockwright.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("dockwright.local.kdl"), "// local").unwrap();

        let path = find_config_file_in(temp_dir.path()).unwrap();
        assert!(path.ends_with("dockwright.local.kdl"));
    }

    #[test]
    fn test_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = find_config_file_in(temp_dir.path());
        assert!(matches!(result, Err(ComposeError::ConfigNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_env_var_has_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let custom = temp_dir.path().join("custom.kdl");
        fs::write(&custom, "// custom").unwrap();

        temp_env::with_var(CONFIG_ENV, Some(custom.as_os_str()), || {
            assert_eq!(find_config_file().unwrap(), custom);
        });
    }

    #[test]
    #[serial]
    fn test_env_var_pointing_to_missing_file_falls_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        fs::write(temp_dir.path().join("dockwright.kdl"), "// cwd").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var(CONFIG_ENV, Some("/nonexistent/dockwright.kdl"), || {
            find_config_file()
        });

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with("dockwright.kdl"));
    }
}
