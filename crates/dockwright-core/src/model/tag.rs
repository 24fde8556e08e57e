//! タグバージョン

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 小数点以下4桁の固定小数
const SCALE: i64 = 10_000;

/// インクリメント幅（0.1）
const STEP: i64 = 1_000;

/// 小数点以下4桁に丸めたアプリケーションバージョン
///
/// 内部では 1/10000 単位の整数で保持するため、丸めと `+0.1` は誤差なしで計算される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagVersion(i64);

impl TagVersion {
    /// 1/10000 単位の値から作成
    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// 浮動小数から小数点以下4桁に丸めて作成
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * SCALE as f64).round();
        // i64::MAX as f64 は 2^63 に丸められるため上端は含めない
        if scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    pub fn units(self) -> i64 {
        self.0
    }

    /// 次のバージョン（+0.1）。表現できない場合は None
    pub fn increment(self) -> Option<Self> {
        self.0.checked_add(STEP).map(Self)
    }
}

/// バージョン文字列のパースエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTagVersionError(String);

impl fmt::Display for ParseTagVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version: {}", self.0)
    }
}

impl std::error::Error for ParseTagVersionError {}

impl FromStr for TagVersion {
    type Err = ParseTagVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Self::from_f64)
            .ok_or_else(|| ParseTagVersionError(trimmed.to_string()))
    }
}

impl fmt::Display for TagVersion {
    /// 小数部は最低1桁、最大4桁（末尾の0は省略）
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / SCALE as u64;
        let fraction = format!("{:04}", abs % SCALE as u64);
        let fraction = fraction.trim_end_matches('0');
        let fraction = if fraction.is_empty() { "0" } else { fraction };
        write!(f, "{}{}.{}", sign, whole, fraction)
    }
}
