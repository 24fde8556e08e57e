//! イメージ定義

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 1ステージ分のイメージ定義
///
/// KDL形式：
/// ```kdl
/// image {
///     parent "python:3.11-slim"
///     selected "base, timezone, app"
///     directory "docker"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// 親イメージ（`name:tag` 形式も可）
    pub parent: String,
    /// 選択されたフラグメント名（順序に意味がある）
    #[serde(default)]
    pub selection: Vec<String>,
    /// Dockerfile とアーティファクトの出力先
    pub output_directory: PathBuf,
}

impl ImageSpec {
    pub fn new(
        parent: impl Into<String>,
        selection: Vec<String>,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            parent: parent.into(),
            selection,
            output_directory: output_directory.into(),
        }
    }

    /// カンマ区切りの選択文字列から作成
    pub fn from_selected(
        parent: impl Into<String>,
        selected: &str,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self::new(parent, parse_selection(selected), output_directory)
    }

    /// タグを除いた親イメージ名
    pub fn base_name(&self) -> &str {
        base_name(&self.parent)
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

/// 親イメージからベース名を取り出す
///
/// - `python:3.11` -> `python`
/// - `alpine` -> `alpine`
pub fn base_name(parent: &str) -> &str {
    parent.split(':').next().unwrap_or(parent).trim()
}

/// カンマ区切りの選択リストをパース
///
/// 各要素は前後の空白を除去し、空要素は捨てる。
pub fn parse_selection(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
