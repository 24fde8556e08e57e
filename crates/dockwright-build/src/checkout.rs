//! ソースコードの取得
//!
//! ビルド前に単一ブランチを shallow clone します。

use crate::error::{BuildError, BuildResult};
use std::path::Path;
use tokio::process::Command;

/// `git clone --depth=1 --branch <branch> <url> <target_dir>` を実行
///
/// 既存の target_dir は削除してから clone する
pub async fn shallow_clone(url: &str, branch: &str, target_dir: &Path) -> BuildResult<()> {
    if target_dir.exists() {
        tracing::debug!("Removing existing checkout: {}", target_dir.display());
        tokio::fs::remove_dir_all(target_dir).await?;
    }
    if let Some(parent) = target_dir.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!(url = %url, branch = %branch, "Cloning source");

    let output = Command::new("git")
        .args(["clone", "--depth=1", "--single-branch", "--branch", branch, url])
        .arg(target_dir)
        .output()
        .await
        .map_err(|e| BuildError::Checkout(format!("git を実行できません: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();

        let message = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            format!(
                "{} ({}) の取得に失敗しました。リポジトリへのアクセス権を確認してください\n{}",
                url, branch, stderr
            )
        } else {
            format!("{} ({}): {}", url, branch, stderr)
        };

        return Err(BuildError::Checkout(message));
    }

    tracing::info!("Checked out {} into {}", branch, target_dir.display());
    Ok(())
}
