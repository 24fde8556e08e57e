//! Dockerfile 合成
//!
//! 選択されたフラグメントを順番通りに連結し、シングルステージまたは
//! マルチステージの Dockerfile を出力ディレクトリに書き出します。

use crate::error::{ComposeError, Result};
use crate::fragment::{Fragment, FragmentResolver};
use crate::model::{BuildConfig, ImageSpec};
use crate::token::{self, Bindings};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 出力する Dockerfile のファイル名
pub const DESCRIPTOR_FILE_NAME: &str = "Dockerfile";

/// ビルドステージのエイリアス
pub const BUILD_STAGE_ALIAS: &str = "B";

/// アプリケーションステージのエイリアス
pub const APP_STAGE_ALIAS: &str = "A";

/// ビルド成果物のコピー先
pub const APPLICATION_PATH: &str = "/opt/code/";

/// 合成された Dockerfile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    lines: Vec<String>,
    fragment_lines: usize,
}

impl Descriptor {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// フラグメント由来の行が1行でもあるか
    pub fn has_fragment_lines(&self) -> bool {
        self.fragment_lines > 0
    }

    /// ファイル内容（1行1命令、末尾改行あり）
    pub fn render(&self) -> String {
        let mut content = self.lines.join("\n");
        content.push('\n');
        content
    }

    fn push_stage(&mut self, header: String, fragments: &[Fragment], bindings: &Bindings) {
        self.lines.push(header);
        for fragment in fragments {
            let substituted = token::substitute(&fragment.lines, bindings);
            self.fragment_lines += substituted.len();
            self.lines.extend(substituted);
        }
    }

    fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// 合成結果
#[derive(Debug, Clone)]
pub struct Composition {
    pub descriptor: Descriptor,
    /// 解決されたフラグメント（ビルドステージ→アプリケーションステージの順）
    pub fragments: Vec<Fragment>,
    /// 書き出した Dockerfile のパス（フラグメントが空の場合は `None`）
    pub path: Option<PathBuf>,
    /// ビルドコンテキストとなる出力ディレクトリ
    pub output_directory: PathBuf,
}

/// Dockerfile コンポーザー
#[derive(Debug, Clone)]
pub struct DescriptorComposer {
    resolver: FragmentResolver,
    bindings: Bindings,
}

impl DescriptorComposer {
    pub fn new(resolver: FragmentResolver, bindings: Bindings) -> Self {
        Self { resolver, bindings }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// シングルステージの Dockerfile を合成
    #[tracing::instrument(skip(self, spec), fields(parent = %spec.parent))]
    pub fn compose_single(&self, spec: &ImageSpec) -> Result<Composition> {
        let output_dir = spec.output_directory();
        reset_directory(output_dir)?;

        let fragments = self
            .resolver
            .resolve(&spec.selection, spec.base_name(), output_dir)?;

        let mut descriptor = Descriptor::default();
        descriptor.push_stage(stage_header(&spec.parent, None), &fragments, &self.bindings);

        let path = write_descriptor(&descriptor, output_dir)?;
        Ok(Composition {
            descriptor,
            fragments,
            path,
            output_directory: output_dir.to_path_buf(),
        })
    }

    /// マルチステージの Dockerfile を合成
    ///
    /// 両ステージのアーティファクトはアプリケーションステージの出力ディレクトリに集約される。
    #[tracing::instrument(skip(self, build, app), fields(parent = %app.parent))]
    pub fn compose_multi(&self, build: &ImageSpec, app: &ImageSpec) -> Result<Composition> {
        if build.parent != app.parent {
            return Err(ComposeError::ParentMismatch {
                build: build.parent.clone(),
                app: app.parent.clone(),
            });
        }

        let output_dir = app.output_directory();
        reset_directory(output_dir)?;

        let build_fragments =
            self.resolver
                .resolve(&build.selection, build.base_name(), output_dir)?;
        let app_fragments = self
            .resolver
            .resolve(&app.selection, app.base_name(), output_dir)?;

        let mut descriptor = Descriptor::default();
        descriptor.push_stage(
            stage_header(&build.parent, Some(BUILD_STAGE_ALIAS)),
            &build_fragments,
            &self.bindings,
        );
        descriptor.push_line("");
        descriptor.push_stage(
            stage_header(&app.parent, Some(APP_STAGE_ALIAS)),
            &app_fragments,
            &self.bindings,
        );
        descriptor.push_line(copy_from_build_stage(self.bindings.build_root()));

        let path = write_descriptor(&descriptor, output_dir)?;

        let mut fragments = build_fragments;
        fragments.extend(app_fragments);
        Ok(Composition {
            descriptor,
            fragments,
            path,
            output_directory: output_dir.to_path_buf(),
        })
    }

    /// 設定に build-image があればマルチステージ、なければシングルステージで合成
    pub fn compose(&self, config: &BuildConfig) -> Result<Composition> {
        match &config.build_image {
            Some(build) => self.compose_multi(build, &config.image),
            None => self.compose_single(&config.image),
        }
    }
}

/// ステージヘッダ（`FROM <parent>[ as <alias>]`）
pub fn stage_header(parent: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("FROM {} as {}", parent, alias),
        None => format!("FROM {}", parent),
    }
}

/// ビルドステージの成果物をアプリケーションパスへコピーする命令
pub fn copy_from_build_stage(build_root: &str) -> String {
    format!(
        "COPY --from={} {} {}",
        BUILD_STAGE_ALIAS, build_root, APPLICATION_PATH
    )
}

/// ディレクトリを削除して作り直す
///
/// 存在しない場合も成功し、終了後は必ず空のディレクトリが存在する。
pub fn reset_directory(path: &Path) -> Result<()> {
    if path.exists() {
        debug!(dir = %path.display(), "Removing previous output");
        fs::remove_dir_all(path).map_err(|e| ComposeError::file_io(path, e))?;
    }
    fs::create_dir_all(path).map_err(|e| ComposeError::file_io(path, e))?;
    Ok(())
}

fn write_descriptor(descriptor: &Descriptor, output_dir: &Path) -> Result<Option<PathBuf>> {
    if !descriptor.has_fragment_lines() {
        info!(dir = %output_dir.display(), "No fragment lines selected, skipping Dockerfile");
        return Ok(None);
    }

    let path = output_dir.join(DESCRIPTOR_FILE_NAME);
    fs::write(&path, descriptor.render()).map_err(|e| ComposeError::file_io(&path, e))?;
    info!(
        file = %path.display(),
        lines = descriptor.lines().len(),
        "Wrote Dockerfile"
    );
    Ok(Some(path))
}
