use dockwright_core::ComposeError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Descriptor not found: {0}")]
    DescriptorNotFound(PathBuf),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Build failed: {message}")]
    BuildFailed {
        message: String,
        /// ビルドストリームの全出力
        log: Vec<String>,
    },

    #[error("Build timed out after {}s", .limit.as_secs())]
    Timeout {
        limit: Duration,
        /// 打ち切りまでに受け取った出力
        log: Vec<String>,
    },

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Authentication failed for {registry}: {message}")]
    AuthFailed { registry: String, message: String },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Checkout failed: {0}")]
    Checkout(String),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DescriptorNotFound(path) => {
                format!(
                    "Dockerfileが見つかりません: {}\n\
                     \n\
                     先に `dockwright compose` を実行してください。",
                    path.display()
                )
            }
            BuildError::BuildFailed { message, .. } => {
                format!(
                    "ビルドに失敗しました: {}\n\
                     \n\
                     フラグメントの Dockerfile を確認してください。",
                    message
                )
            }
            BuildError::Timeout { limit, .. } => {
                format!(
                    "ビルドが {} 秒以内に完了しませんでした\n\
                     \n\
                     dockwright.kdl の docker {{ timeout ... }} を見直してください。",
                    limit.as_secs()
                )
            }
            BuildError::AuthFailed { registry, .. } => {
                format!(
                    "{} への認証に失敗しました\n\
                     \n\
                     解決方法:\n\
                     1. AWS プロファイルの認証情報を確認してください\n\
                     2. dockwright.kdl の repository {{ profile ... }} を確認してください",
                    registry
                )
            }
            BuildError::DockerConnection(_) => {
                "Docker に接続できません\n\
                 \n\
                 Docker デーモンが起動しているか確認してください。"
                    .to_string()
            }
            BuildError::Compose(e) => e.to_string(),
            _ => format!("{}", self),
        }
    }

    /// ビルド失敗・タイムアウト時のログ
    pub fn build_log(&self) -> Option<&[String]> {
        match self {
            BuildError::BuildFailed { log, .. } | BuildError::Timeout { log, .. } => Some(log),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
pub type BuildResult<T> = Result<T>;
