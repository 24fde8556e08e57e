//! バージョン解決
//!
//! レジストリに既に存在するタグを走査し、次に割り当てるアプリケーションバージョンを決定します。

use crate::error::{ComposeError, Result};
use crate::model::TagVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// 既存タグとの比較ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionPolicy {
    /// 既存タグが current より大きい場合のみ更新
    StrictGreater,
    /// 既存タグが current 以上なら更新し、一致したタグがあれば必ずインクリメント
    #[default]
    GreaterOrEqual,
}

impl VersionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionPolicy::StrictGreater => "strict-greater",
            VersionPolicy::GreaterOrEqual => "greater-or-equal",
        }
    }

    fn accepts(&self, candidate: TagVersion, current: TagVersion) -> bool {
        match self {
            VersionPolicy::StrictGreater => candidate > current,
            VersionPolicy::GreaterOrEqual => candidate >= current,
        }
    }
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionPolicy {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "strict-greater" => Ok(VersionPolicy::StrictGreater),
            "greater-or-equal" => Ok(VersionPolicy::GreaterOrEqual),
            other => Err(ComposeError::InvalidConfig(format!(
                "未知のバージョンポリシー: {} (strict-greater | greater-or-equal)",
                other
            ))),
        }
    }
}

/// バージョン解決の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionResolution {
    pub base: TagVersion,
    pub current: TagVersion,
    pub next: TagVersion,
    /// 既存タグによって current が更新されたか
    pub used_existing: bool,
}

/// 次のバージョンを計算するリゾルバ
#[derive(Debug, Clone)]
pub struct VersionResolver {
    application: String,
    policy: VersionPolicy,
}

impl VersionResolver {
    pub fn new(application: impl Into<String>, policy: VersionPolicy) -> Self {
        Self {
            application: application.into(),
            policy,
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn policy(&self) -> VersionPolicy {
        self.policy
    }

    /// レジストリタグからバージョンを取り出す
    ///
    /// - `app-1.2` -> `1.2`（`<application>-` プレフィックスを除去）
    /// - `build-app-1.3` -> `1.3`（最後の `-` 以降）
    pub fn decode_tag(&self, tag: &str) -> Result<TagVersion> {
        let prefix = format!("{}-", self.application);
        let suffix = match tag.strip_prefix(&prefix) {
            Some(rest) => rest,
            None => tag.rsplit_once('-').map(|(_, v)| v).unwrap_or(tag),
        };

        suffix.parse().map_err(|_| ComposeError::VersionDecode {
            tag: tag.to_string(),
        })
    }

    /// 既存タグから次のバージョンを解決
    #[tracing::instrument(skip(self, existing_tags), fields(application = %self.application, policy = %self.policy))]
    pub fn resolve_next<S: AsRef<str>>(
        &self,
        base: TagVersion,
        existing_tags: &[S],
    ) -> Result<VersionResolution> {
        let mut current = base;
        let mut used_existing = false;

        for tag in existing_tags {
            let tag = tag.as_ref();
            let version = self.decode_tag(tag)?;
            if self.policy.accepts(version, current) {
                debug!(tag = %tag, version = %version, "Existing tag raises current version");
                current = version;
                used_existing = true;
            }
        }

        let next = if current == base && !used_existing {
            current
        } else {
            current
                .increment()
                .ok_or_else(|| ComposeError::VersionOverflow {
                    version: current.to_string(),
                })?
        };

        info!(
            base = %base,
            current = %current,
            next = %next,
            tags = existing_tags.len(),
            "Resolved next version"
        );

        Ok(VersionResolution {
            base,
            current,
            next,
            used_existing,
        })
    }

    /// バージョンからレジストリタグを生成（`<application>-<version>`）
    pub fn tag_for(&self, version: TagVersion) -> String {
        format!("{}-{}", self.application, version)
    }
}
