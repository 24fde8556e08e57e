use crate::error::{BuildError, BuildResult};
use dockwright_core::composer::DESCRIPTOR_FILE_NAME;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::Path;
use tar::Builder;

pub struct ContextBuilder;

impl ContextBuilder {
    /// 合成済みディレクトリをtar.gzアーカイブとしてビルドコンテキストにする
    ///
    /// ディレクトリ直下に Dockerfile が必要
    pub fn create_context(context_path: &Path) -> BuildResult<Vec<u8>> {
        let descriptor = context_path.join(DESCRIPTOR_FILE_NAME);
        if !descriptor.is_file() {
            return Err(BuildError::DescriptorNotFound(descriptor));
        }

        tracing::debug!("Creating build context from: {}", context_path.display());

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);

            tar.append_dir_all(".", context_path)
                .map_err(BuildError::Io)?;

            tar.into_inner()
                .and_then(|encoder| encoder.finish())
                .map_err(BuildError::Io)?;
        }

        tracing::debug!("Build context created: {} bytes", archive_data.len());

        Self::check_context_size(archive_data.len());

        Ok(archive_data)
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "警告: ビルドコンテキストが大きすぎます（{}MB）\n\
                 フラグメントの成果物を見直すことを推奨します。",
                size / 1024 / 1024
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn unpack(archive: Vec<u8>) -> tempfile::TempDir {
        let extract_dir = tempdir().unwrap();
        let decoder = flate2::read::GzDecoder::new(std::io::Cursor::new(archive));
        tar::Archive::new(decoder).unpack(extract_dir.path()).unwrap();
        extract_dir
    }

    #[test]
    fn test_create_context() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("Dockerfile"), "FROM alpine\nRUN echo test\n").unwrap();
        fs::write(temp_dir.path().join("entrypoint.sh"), "#!/bin/sh\n").unwrap();
        fs::write(temp_dir.path().join("settings.xml"), "<settings/>").unwrap();

        let archive = ContextBuilder::create_context(temp_dir.path()).unwrap();
        assert!(!archive.is_empty());

        let extracted = unpack(archive);
        assert!(extracted.path().join("Dockerfile").exists());
        assert!(extracted.path().join("entrypoint.sh").exists());
        assert_eq!(
            fs::read_to_string(extracted.path().join("settings.xml")).unwrap(),
            "<settings/>"
        );
    }

    #[test]
    fn test_create_context_without_descriptor() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("entrypoint.sh"), "#!/bin/sh\n").unwrap();

        let result = ContextBuilder::create_context(temp_dir.path());
        assert!(matches!(result, Err(BuildError::DescriptorNotFound(_))));
    }
}
