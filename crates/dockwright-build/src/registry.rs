//! コンテナレジストリの抽象化
//!
//! リポジトリの作成・タグ一覧・認証をトレイトとして定義し、
//! 既存タグから次のリリースタグを決定します。

use crate::error::Result;
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use dockwright_core::{RepositoryConfig, VersionResolution, VersionResolver};

/// レジストリ上のリポジトリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    /// `<registry>/<name>` 形式の URI
    pub uri: String,
    pub registry_id: String,
    /// この実行で新規作成されたか
    pub created: bool,
}

impl Repository {
    /// `<uri>:<tag>` 形式のイメージ参照
    pub fn image_reference(&self, tag: &str) -> String {
        format!("{}:{}", self.uri, tag)
    }
}

/// レジストリクライアント
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// プロバイダー名
    fn name(&self) -> &str;

    /// リポジトリを取得し、存在しなければ作成
    async fn ensure_repository(&self, name: &str) -> Result<Repository>;

    /// リポジトリの全タグを取得（タグ無しイメージは含まない）
    async fn list_repository_tags(&self, name: &str) -> Result<Vec<String>>;

    /// プッシュ用の認証情報を取得
    async fn credentials(&self, repository: &Repository) -> Result<DockerCredentials>;
}

/// 次にビルドするリリース
#[derive(Debug, Clone)]
pub struct Release {
    pub repository: Repository,
    pub resolution: VersionResolution,
    /// `<application>-<version>`
    pub tag: String,
}

impl Release {
    pub fn image_reference(&self) -> String {
        self.repository.image_reference(&self.tag)
    }
}

/// リポジトリを用意し、既存タグから次のリリースを決定
pub async fn plan_release(
    client: &dyn RegistryClient,
    config: &RepositoryConfig,
) -> Result<Release> {
    let repository = client.ensure_repository(&config.name).await?;
    if repository.created {
        tracing::info!(repository = %config.name, provider = client.name(), "Repository created");
    } else {
        tracing::info!(repository = %config.name, provider = client.name(), "Repository existed");
    }

    tracing::info!(repository = %config.name, "Fetching image tags");
    let tags = client.list_repository_tags(&config.name).await?;

    let resolver = VersionResolver::new(&config.application, config.policy);
    let resolution = resolver.resolve_next(config.base_version, &tags)?;
    let tag = resolver.tag_for(resolution.next);

    Ok(Release {
        repository,
        resolution,
        tag,
    })
}
