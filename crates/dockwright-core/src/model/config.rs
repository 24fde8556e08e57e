//! ビルド設定

use super::image::ImageSpec;
use super::tag::TagVersion;
use crate::error::{ComposeError, Result};
use crate::token::{Bindings, DEFAULT_BUILD_ROOT, DEFAULT_LAUNCHER};
use crate::version::VersionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 1回の実行で使う設定一式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// アプリケーションステージ
    pub image: ImageSpec,
    /// ビルドステージ（指定時はマルチステージ）
    #[serde(default)]
    pub build_image: Option<ImageSpec>,
    #[serde(default)]
    pub repository: Option<RepositoryConfig>,
    #[serde(default)]
    pub source: Option<SourceConfig>,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub docker: DockerConfig,
}

impl BuildConfig {
    pub fn is_multi_stage(&self) -> bool {
        self.build_image.is_some()
    }

    pub fn repository(&self) -> Result<&RepositoryConfig> {
        self.repository
            .as_ref()
            .ok_or_else(|| ComposeError::ConfigMissing("repository".to_string()))
    }

    pub fn source(&self) -> Result<&SourceConfig> {
        self.source
            .as_ref()
            .ok_or_else(|| ComposeError::ConfigMissing("source".to_string()))
    }

    /// トークン置換に使う値
    pub fn bindings(&self) -> Bindings {
        let source = self.source.as_ref();
        Bindings {
            url: source.map(|s| s.url.clone()),
            branch: source.map(|s| s.branch.clone()),
            folder: source.and_then(|s| s.folder.clone()),
            timezone: self.tokens.timezone.clone(),
            exec: self.tokens.exec.clone(),
            opts: self.tokens.opts.clone(),
            build_root: self.tokens.build_root.clone(),
            launcher: self.tokens.launcher.clone(),
        }
    }
}

/// レジストリ設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// AWS プロファイル名
    #[serde(default)]
    pub profile: Option<String>,
    /// リポジトリ名
    pub name: String,
    /// アプリケーション名（タグのプレフィックス）
    pub application: String,
    /// 基準バージョン
    pub base_version: TagVersion,
    #[serde(default)]
    pub policy: VersionPolicy,
}

/// ソース取得設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub branch: String,
    /// チェックアウト先のフォルダ
    #[serde(default)]
    pub folder: Option<String>,
}

/// トークン値
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub exec: Option<String>,
    #[serde(default)]
    pub opts: Option<String>,
    pub build_root: String,
    pub launcher: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            timezone: None,
            exec: None,
            opts: None,
            build_root: DEFAULT_BUILD_ROOT.to_string(),
            launcher: DEFAULT_LAUNCHER.to_string(),
        }
    }
}

/// イメージビルド時の Docker 設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerConfig {
    /// ビルド時のネットワークモード
    #[serde(default)]
    pub network: Option<String>,
    /// ビルドのタイムアウト（秒）
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// 追加ラベル
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl DockerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
