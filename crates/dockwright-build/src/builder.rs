use crate::error::{BuildError, Result};
use bollard::Docker;
use bollard::image::BuildImageOptions;
use bollard::models::BuildInfo;
use bollard::query_parameters::{PruneContainersOptions, PruneImagesOptions};
use dockwright_core::composer::DESCRIPTOR_FILE_NAME;
use futures_util::stream::{Stream, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// ビルド結果
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub image_id: Option<String>,
    /// ビルドストリームの出力（行単位）
    pub log: Vec<String>,
}

/// ビルドストリームの集計
#[derive(Debug, Default)]
struct BuildLog {
    output: BuildOutput,
    failure: Option<String>,
}

impl BuildLog {
    fn push_text(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                tracing::debug!(target: "dockwright::build", "{}", line);
                self.output.log.push(line.to_string());
            }
        }
    }

    fn record_failure(&mut self, message: String) {
        self.push_text(&message);
        // 最初のエラーを保持
        if self.failure.is_none() {
            self.failure = Some(message);
        }
    }

    /// ビルド出力の処理
    fn handle(&mut self, info: BuildInfo) {
        if let Some(stream) = info.stream {
            self.push_text(&stream);
        }

        if let Some(status) = info.status {
            self.push_text(&status);
        }

        if let Some(error) = info.error {
            self.record_failure(error);
        } else if let Some(message) = info.error_detail.and_then(|detail| detail.message) {
            self.record_failure(message);
        }

        if let Some(id) = info.aux.and_then(|aux| aux.id) {
            self.output.image_id = Some(id);
        }
    }

    /// ストリームを最後まで読む
    ///
    /// Docker からのエラー通知は記録して読み続ける
    async fn drain<S>(&mut self, stream: S) -> Result<()>
    where
        S: Stream<Item = std::result::Result<BuildInfo, bollard::errors::Error>>,
    {
        let mut stream = std::pin::pin!(stream);

        while let Some(msg) = stream.next().await {
            match msg {
                Ok(info) => self.handle(info),
                Err(bollard::errors::Error::DockerStreamError { error }) => {
                    self.record_failure(error);
                }
                Err(e) => return Err(BuildError::DockerConnection(e)),
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<BuildOutput> {
        match self.failure {
            Some(message) => Err(BuildError::BuildFailed {
                message,
                log: self.output.log,
            }),
            None => Ok(self.output),
        }
    }
}

/// ビルドストリームを集計する
///
/// 制限時間を超えた場合もそれまでのログを Timeout に載せて返す
async fn collect_build_stream<S>(stream: S, timeout: Option<Duration>) -> Result<BuildOutput>
where
    S: Stream<Item = std::result::Result<BuildInfo, bollard::errors::Error>>,
{
    let mut log = BuildLog::default();

    match timeout {
        Some(limit) => {
            let drained = tokio::time::timeout(limit, log.drain(stream)).await;
            match drained {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        lines = log.output.log.len(),
                        "Build timed out after {}s",
                        limit.as_secs()
                    );
                    return Err(BuildError::Timeout {
                        limit,
                        log: log.output.log,
                    });
                }
            }
        }
        None => log.drain(stream).await?,
    }

    log.finish()
}

pub struct ImageBuilder {
    docker: Docker,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをビルド
    ///
    /// エラーがあってもストリームは最後まで読み切り、ログごと返す
    pub async fn build_image(
        &self,
        context_data: Vec<u8>,
        tag: &str,
        labels: &BTreeMap<String, String>,
        network: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<BuildOutput> {
        tracing::info!("Building image: {}", tag);

        let labels: HashMap<String, String> = labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let options = BuildImageOptions {
            dockerfile: DESCRIPTOR_FILE_NAME.to_string(),
            t: tag.to_string(),
            labels,
            networkmode: network.unwrap_or_default().to_string(),
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            pull: true,    // ベースイメージを常にpull
            ..Default::default()
        };

        tracing::debug!("Build options: {:?}", options);

        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context_data));

        let stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));
        let output = collect_build_stream(stream, timeout).await?;

        tracing::info!(
            image_id = output.image_id.as_deref().unwrap_or("-"),
            lines = output.log.len(),
            "Successfully built: {}",
            tag
        );
        Ok(output)
    }

    /// 停止済みコンテナと未使用イメージを削除
    pub async fn prune_local(&self) -> Result<()> {
        tracing::info!("Cleaning up local repository");

        let containers = self
            .docker
            .prune_containers(None::<PruneContainersOptions>)
            .await?;
        let images = self
            .docker
            .prune_images(None::<PruneImagesOptions>)
            .await?;

        tracing::debug!(
            containers = containers.containers_deleted.map(|v| v.len()).unwrap_or(0),
            images = images.images_deleted.map(|v| v.len()).unwrap_or(0),
            reclaimed = containers.space_reclaimed.unwrap_or(0) + images.space_reclaimed.unwrap_or(0),
            "Pruned local resources"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ErrorDetail, ImageId};
    use futures_util::stream;

    fn text(text: &str) -> BuildInfo {
        BuildInfo {
            stream: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_log_collects_lines() {
        let mut log = BuildLog::default();
        log.handle(text("Step 1/2 : FROM alpine\n"));
        log.handle(text(" ---> a1b2c3\n\n"));
        log.handle(BuildInfo {
            aux: Some(ImageId {
                id: Some("sha256:abc".to_string()),
            }),
            ..Default::default()
        });

        let output = log.finish().unwrap();
        assert_eq!(output.log, vec!["Step 1/2 : FROM alpine", " ---> a1b2c3"]);
        assert_eq!(output.image_id.as_deref(), Some("sha256:abc"));
    }

    #[test]
    fn test_build_log_keeps_draining_after_error() {
        let mut log = BuildLog::default();
        log.handle(text("Step 1/2 : RUN false\n"));
        log.handle(BuildInfo {
            error_detail: Some(ErrorDetail {
                code: Some(1),
                message: Some("returned a non-zero code: 1".to_string()),
            }),
            ..Default::default()
        });
        log.handle(text("Removing intermediate container\n"));

        match log.finish() {
            Err(BuildError::BuildFailed { message, log }) => {
                assert_eq!(message, "returned a non-zero code: 1");
                assert_eq!(log.len(), 3);
                assert_eq!(log[2], "Removing intermediate container");
            }
            other => panic!("expected BuildFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_build_log_first_error_wins() {
        let mut log = BuildLog::default();
        log.record_failure("first".to_string());
        log.record_failure("second".to_string());

        let err = log.finish().unwrap_err();
        assert!(matches!(err, BuildError::BuildFailed { ref message, .. } if message == "first"));
    }

    #[tokio::test]
    async fn test_collect_build_stream_completes() {
        let messages = stream::iter(vec![
            Ok(text("Step 1/1 : FROM alpine\n")),
            Ok(BuildInfo {
                aux: Some(ImageId {
                    id: Some("sha256:def".to_string()),
                }),
                ..Default::default()
            }),
        ]);

        let output = collect_build_stream(messages, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(output.log, vec!["Step 1/1 : FROM alpine"]);
        assert_eq!(output.image_id.as_deref(), Some("sha256:def"));
    }

    #[tokio::test]
    async fn test_collect_build_stream_records_stream_error() {
        let messages = stream::iter(vec![
            Ok(text("Step 1/2 : RUN false\n")),
            Err(bollard::errors::Error::DockerStreamError {
                error: "returned a non-zero code: 1".to_string(),
            }),
            Ok(text("Removing intermediate container\n")),
        ]);

        match collect_build_stream(messages, None).await {
            Err(BuildError::BuildFailed { message, log }) => {
                assert_eq!(message, "returned a non-zero code: 1");
                assert_eq!(log.len(), 3);
            }
            other => panic!("expected BuildFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_log() {
        let messages = stream::iter(vec![
            Ok(text("Step 1/3 : FROM alpine\n")),
            Ok(text("Step 2/3 : RUN sleep 600\n")),
        ])
        .chain(stream::pending());

        let err = collect_build_stream(messages, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert_eq!(
            err.build_log().unwrap(),
            ["Step 1/3 : FROM alpine", "Step 2/3 : RUN sleep 600"]
        );
        match err {
            BuildError::Timeout { limit, .. } => assert_eq!(limit, Duration::from_millis(50)),
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_build_simple_image() {
        use crate::context::ContextBuilder;
        use std::fs;
        use tempfile::tempdir;

        let docker = Docker::connect_with_local_defaults().unwrap();
        let builder = ImageBuilder::new(docker.clone());

        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join("Dockerfile"),
            "FROM alpine:latest\nCMD echo 'test'\n",
        )
        .unwrap();

        let context_data = ContextBuilder::create_context(temp_dir.path()).unwrap();
        let labels = BTreeMap::from([("Application".to_string(), "test".to_string())]);

        let result = builder
            .build_image(
                context_data,
                "dockwright-test:latest",
                &labels,
                None,
                Some(Duration::from_secs(300)),
            )
            .await;

        assert!(result.is_ok());

        docker
            .remove_image(
                "dockwright-test:latest",
                None::<bollard::query_parameters::RemoveImageOptions>,
                None,
            )
            .await
            .ok();
    }
}
