//! イメージプッシュ処理
//!
//! ビルドしたイメージをコンテナレジストリにプッシュします。

use crate::error::{BuildError, BuildResult};
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::models::PushImageInfo;
use futures_util::StreamExt;

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    docker: Docker,
}

impl ImagePusher {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをレジストリにプッシュ
    ///
    /// # Arguments
    /// * `reference` - `<repository>:<tag>` 形式のイメージ参照
    /// * `credentials` - レジストリの認証情報
    ///
    /// # Returns
    /// プッシュストリームの最後のステータス行
    pub async fn push(
        &self,
        reference: &str,
        credentials: DockerCredentials,
    ) -> BuildResult<String> {
        let (image, tag) = split_image_tag(reference);
        validate_tag(&tag)?;

        tracing::info!("Pushing {}", reference);

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> { tag: tag.clone() };

        #[allow(deprecated)]
        let mut stream = self
            .docker
            .push_image(&image, Some(options), Some(credentials));

        let mut last_status = String::new();
        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else {
                        record_progress(&info, &mut last_status);
                    }
                }
                Err(e) => {
                    return Err(BuildError::PushFailed {
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(err) = error_message {
            return Err(BuildError::PushFailed { message: err });
        }

        tracing::info!("Pushing results: {}", last_status);
        Ok(last_status)
    }
}

/// 空でないステータス行を最後のものとして記録
fn record_progress(info: &PushImageInfo, last_status: &mut String) {
    let Some(status) = info.status.as_deref().map(str::trim) else {
        return;
    };
    if status.is_empty() {
        return;
    }

    match status {
        // 準備中は表示をスキップ（ノイズ軽減）
        "Preparing" | "Waiting" => {}
        "Pushing" => {
            tracing::trace!(progress = info.progress.as_deref().unwrap_or(""), "Pushing");
        }
        _ => tracing::debug!("{}", status),
    }

    *last_status = status.to_string();
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> BuildResult<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_'))
    {
        return Err(BuildError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

/// イメージ名とタグを分離
///
/// # Examples
/// - `123.dkr.ecr.region.amazonaws.com/app:app-1.2` -> `("123.dkr.ecr.region.amazonaws.com/app", "app-1.2")`
/// - `registry/app` -> `("registry/app", "latest")`
/// - `localhost:5000/app:dev` -> `("localhost:5000/app", "dev")`
pub fn split_image_tag(image: &str) -> (String, String) {
    if let Some((potential_image, potential_tag)) = image.rsplit_once(':') {
        // ポート番号は / を含まない純粋な数字
        if !potential_tag.contains('/') && !potential_tag.chars().all(|c| c.is_ascii_digit()) {
            return (potential_image.to_string(), potential_tag.to_string());
        }
    }

    (image.to_string(), "latest".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(text: &str) -> PushImageInfo {
        PushImageInfo {
            status: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_split_image_tag_with_release_tag() {
        let (image, tag) =
            split_image_tag("123456789.dkr.ecr.us-east-1.amazonaws.com/team/app:app-1.2");
        assert_eq!(image, "123456789.dkr.ecr.us-east-1.amazonaws.com/team/app");
        assert_eq!(tag, "app-1.2");
    }

    #[test]
    fn test_split_image_tag_without_tag() {
        let (image, tag) = split_image_tag("registry.local/app");
        assert_eq!(image, "registry.local/app");
        assert_eq!(tag, "latest");
    }

    #[test]
    fn test_split_image_tag_with_port() {
        let (image, tag) = split_image_tag("localhost:5000/app");
        assert_eq!(image, "localhost:5000/app");
        assert_eq!(tag, "latest");

        let (image, tag) = split_image_tag("localhost:5000/app:dev");
        assert_eq!(image, "localhost:5000/app");
        assert_eq!(tag, "dev");
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("app-1.2").is_ok());
        assert!(validate_tag("app_10.0001").is_ok());
        assert!(validate_tag("").is_err());
        assert!(validate_tag("-app").is_err());
        assert!(validate_tag("app 1.0").is_err());
        assert!(validate_tag(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_last_non_empty_status_wins() {
        let mut last = String::new();
        record_progress(&status("Preparing"), &mut last);
        record_progress(&status("Pushed"), &mut last);
        record_progress(&status("app-1.2: digest: sha256:abc size: 1234"), &mut last);
        record_progress(&status("  "), &mut last);
        record_progress(&PushImageInfo::default(), &mut last);

        assert_eq!(last, "app-1.2: digest: sha256:abc size: 1234");
    }
}
