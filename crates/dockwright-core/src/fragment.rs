//! フラグメント解決
//!
//! `<root>/<selection>/<base-name>/` 形式のディレクトリから Dockerfile 断片を読み込み、
//! それ以外のファイル（アーティファクト）を出力ディレクトリへ配置します。

use crate::error::{ComposeError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// ファイル名にこの文字列を含むものが Dockerfile 断片
pub const INSTRUCTION_MARKER: &str = "Dockerfile";

/// 読み込まれたフラグメント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 選択名
    pub selection: String,
    /// フラグメントのディレクトリ
    pub directory: PathBuf,
    /// Dockerfile 断片
    pub instruction_file: PathBuf,
    /// 出力ディレクトリへコピーしたアーティファクト（コピー先）
    pub artifacts: Vec<PathBuf>,
    /// Dockerfile 断片の内容
    pub lines: Vec<String>,
}

/// フラグメントリゾルバ
#[derive(Debug, Clone)]
pub struct FragmentResolver {
    fragment_root: PathBuf,
}

impl FragmentResolver {
    pub fn new(fragment_root: impl Into<PathBuf>) -> Self {
        Self {
            fragment_root: fragment_root.into(),
        }
    }

    /// カレントディレクトリをルートとして作成
    pub fn from_current_dir() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn fragment_root(&self) -> &Path {
        &self.fragment_root
    }

    /// フラグメントのディレクトリ
    pub fn fragment_dir(&self, selection: &str, base_name: &str) -> PathBuf {
        self.fragment_root.join(selection).join(base_name)
    }

    /// 選択順にフラグメントを解決
    ///
    /// アーティファクトは解決しながら `output_dir` にコピーされる。
    /// 途中で失敗した場合はそこで打ち切る。
    pub fn resolve(
        &self,
        selection: &[String],
        base_name: &str,
        output_dir: &Path,
    ) -> Result<Vec<Fragment>> {
        selection
            .iter()
            .map(|item| self.resolve_one(item, base_name, output_dir))
            .collect()
    }

    /// 1つのフラグメントを解決
    #[tracing::instrument(skip(self, output_dir))]
    pub fn resolve_one(
        &self,
        selection: &str,
        base_name: &str,
        output_dir: &Path,
    ) -> Result<Fragment> {
        let directory = self.fragment_dir(selection, base_name);
        if !directory.is_dir() {
            return Err(ComposeError::PathNotFound(directory));
        }

        let files = collect_files(&directory)?;
        if files.is_empty() {
            return Err(ComposeError::EmptyFragment(directory));
        }

        let (mut instructions, artifacts): (Vec<PathBuf>, Vec<PathBuf>) =
            files.into_iter().partition(|path| is_instruction_file(path));

        let instruction_file = match instructions.len() {
            0 => return Err(ComposeError::MissingInstructionFile(directory)),
            1 => instructions.remove(0),
            _ => {
                return Err(ComposeError::AmbiguousInstructionFile {
                    dir: directory,
                    candidates: instructions,
                });
            }
        };

        let staged = artifacts
            .iter()
            .map(|artifact| stage_artifact(artifact, output_dir))
            .collect::<Result<Vec<_>>>()?;

        let lines = read_instruction_lines(&instruction_file)?;

        info!(
            fragment = %directory.display(),
            lines = lines.len(),
            artifacts = staged.len(),
            "Adding fragment"
        );

        Ok(Fragment {
            selection: selection.to_string(),
            directory,
            instruction_file,
            artifacts: staged,
            lines,
        })
    }
}

/// ファイル名に `Dockerfile` を含むか
pub fn is_instruction_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(INSTRUCTION_MARKER))
}

/// ディレクトリ以下のファイルを再帰的に収集（パス順）
fn collect_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| directory.to_path_buf());
            ComposeError::file_io(path, e.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// アーティファクトを出力ディレクトリ直下にコピー
fn stage_artifact(artifact: &Path, output_dir: &Path) -> Result<PathBuf> {
    let file_name = artifact.file_name().ok_or_else(|| {
        ComposeError::InvalidConfig(format!("不正なファイル名: {}", artifact.display()))
    })?;
    let destination = output_dir.join(file_name);

    if destination.exists() {
        debug!(file = %destination.display(), "Overwriting artifact staged by an earlier fragment");
    }
    fs::copy(artifact, &destination).map_err(|e| ComposeError::file_io(artifact, e))?;
    debug!(from = %artifact.display(), to = %destination.display(), "Staged artifact");

    Ok(destination)
}

fn read_instruction_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| ComposeError::file_io(path, e))?;
    if content.trim().is_empty() {
        return Err(ComposeError::EmptyInstructionFile(path.to_path_buf()));
    }
    Ok(content.lines().map(str::to_string).collect())
}
