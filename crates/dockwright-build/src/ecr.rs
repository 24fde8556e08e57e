//! AWS ECR レジストリ
//!
//! aws-sdk-ecr を使って RegistryClient を実装します。

use crate::auth::{decode_authorization, extract_registry};
use crate::error::{BuildError, Result};
use crate::registry::{RegistryClient, Repository};
use async_trait::async_trait;
use aws_sdk_ecr::Client;
use aws_sdk_ecr::error::DisplayErrorContext;
use aws_sdk_ecr::types::{
    EncryptionConfiguration, EncryptionType, ImageScanningConfiguration, ImageTagMutability,
};
use bollard::auth::DockerCredentials;
use std::future::Future;

/// ECR クライアント
pub struct EcrRegistry {
    client: Client,
}

impl EcrRegistry {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// AWS プロファイルから作成
    ///
    /// プロファイル未指定時は標準の認証情報チェーンを使用
    pub async fn from_profile(profile: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(profile) = profile {
            tracing::debug!(profile = %profile, "Using AWS profile");
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        Self::new(Client::new(&config))
    }

    async fn find_repository(&self, name: &str) -> Result<Option<Repository>> {
        let output = match self
            .client
            .describe_repositories()
            .repository_names(name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_repository_not_found_exception()) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(registry_error("DescribeRepositories", e)),
        };

        match output.repositories() {
            [] => Ok(None),
            [found] => Ok(Some(to_repository(name, found, false)?)),
            many => Err(BuildError::Registry(format!(
                "Found {} repositories named {}",
                many.len(),
                name
            ))),
        }
    }

    async fn create_repository(&self, name: &str) -> Result<Repository> {
        let encryption = EncryptionConfiguration::builder()
            .encryption_type(EncryptionType::Aes256)
            .build()
            .map_err(|e| BuildError::Registry(e.to_string()))?;

        let output = self
            .client
            .create_repository()
            .repository_name(name)
            .image_tag_mutability(ImageTagMutability::Immutable)
            .image_scanning_configuration(
                ImageScanningConfiguration::builder()
                    .scan_on_push(true)
                    .build(),
            )
            .encryption_configuration(encryption)
            .send()
            .await
            .map_err(|e| registry_error("CreateRepository", e))?;

        let created = output.repository().ok_or_else(|| {
            BuildError::Registry(format!("CreateRepository returned no repository for {}", name))
        })?;
        to_repository(name, created, true)
    }
}

#[async_trait]
impl RegistryClient for EcrRegistry {
    fn name(&self) -> &str {
        "ecr"
    }

    async fn ensure_repository(&self, name: &str) -> Result<Repository> {
        match self.find_repository(name).await? {
            Some(repository) => Ok(repository),
            None => self.create_repository(name).await,
        }
    }

    async fn list_repository_tags(&self, name: &str) -> Result<Vec<String>> {
        let tags = collect_tag_pages(|next_token| async move {
            let output = self
                .client
                .list_images()
                .repository_name(name)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| registry_error("ListImages", e))?;

            Ok::<_, BuildError>(TagPage {
                tags: output
                    .image_ids()
                    .iter()
                    .map(|id| id.image_tag().map(str::to_string))
                    .collect(),
                next_token: output.next_token().map(str::to_string),
            })
        })
        .await?;

        tracing::debug!(repository = %name, count = tags.len(), "Listed image tags");
        Ok(tags)
    }

    async fn credentials(&self, repository: &Repository) -> Result<DockerCredentials> {
        tracing::info!(registry = %repository.uri, "Logging into registry");
        let auth_failed = |message: String| BuildError::AuthFailed {
            registry: repository.uri.clone(),
            message,
        };

        #[allow(deprecated)]
        let output = self
            .client
            .get_authorization_token()
            .registry_ids(&repository.registry_id)
            .send()
            .await
            .map_err(|e| auth_failed(DisplayErrorContext(&e).to_string()))?;

        let data = output
            .authorization_data()
            .iter()
            .find(|data| data.authorization_token().is_some())
            .ok_or_else(|| auth_failed("No authorization data returned".to_string()))?;

        let server = data
            .proxy_endpoint()
            .map(str::to_string)
            .unwrap_or_else(|| extract_registry(&repository.uri));
        let token = data.authorization_token().unwrap_or_default();

        decode_authorization(token, &server)
    }
}

/// ListImages の1ページ分
///
/// タグなし（digest のみ）のイメージは None
struct TagPage {
    tags: Vec<Option<String>>,
    next_token: Option<String>,
}

/// nextToken がなくなるまでページを取得し、タグを順に集める
async fn collect_tag_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<String>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<TagPage>>,
{
    let mut tags = Vec::new();
    let mut next_token = None;

    loop {
        let page = fetch_page(next_token.take()).await?;
        tags.extend(page.tags.into_iter().flatten());

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(tags)
}

fn to_repository(
    name: &str,
    repository: &aws_sdk_ecr::types::Repository,
    created: bool,
) -> Result<Repository> {
    let missing = |field: &str| {
        BuildError::Registry(format!("Repository {} has no {}", name, field))
    };

    Ok(Repository {
        name: name.to_string(),
        uri: repository
            .repository_uri()
            .ok_or_else(|| missing("repositoryUri"))?
            .to_string(),
        registry_id: repository
            .registry_id()
            .ok_or_else(|| missing("registryId"))?
            .to_string(),
        created,
    })
}

fn registry_error<E>(operation: &str, error: E) -> BuildError
where
    E: std::error::Error,
{
    BuildError::Registry(format!("{} failed: {}", operation, DisplayErrorContext(&error)))
}
