//! トークン置換
//!
//! フラグメントの Dockerfile に埋め込まれた `@NAME@` 形式のプレースホルダを
//! 設定値で置き換えます。

use serde::{Deserialize, Serialize};
use tracing::warn;

/// プレースホルダの区切り文字
const DELIMITER: char = '@';

/// EXEC がビルドツールのラッパースクリプトを指すと判定する既定の文字列
pub const DEFAULT_LAUNCHER: &str = "mvnw";

/// ビルドステージの作業ルート
pub const DEFAULT_BUILD_ROOT: &str = "/opt/code";

/// 認識されるトークン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Url,
    Branch,
    Folder,
    Timezone,
    Exec,
    Opts,
}

impl Token {
    pub const ALL: [Token; 6] = [
        Token::Url,
        Token::Branch,
        Token::Folder,
        Token::Timezone,
        Token::Exec,
        Token::Opts,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Token::Url => "URL",
            Token::Branch => "BRANCH",
            Token::Folder => "FOLDER",
            Token::Timezone => "TIMEZONE",
            Token::Exec => "EXEC",
            Token::Opts => "OPTS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|token| token.name() == name)
    }

    /// `@NAME@` 形式
    pub fn placeholder(&self) -> String {
        format!("{0}{1}{0}", DELIMITER, self.name())
    }
}

/// トークンに束縛する値
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    pub url: Option<String>,
    pub branch: Option<String>,
    pub folder: Option<String>,
    pub timezone: Option<String>,
    pub exec: Option<String>,
    pub opts: Option<String>,
    /// EXEC がランチャーの場合に前置するパス
    pub build_root: String,
    /// ランチャー判定に使う部分文字列
    pub launcher: String,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            url: None,
            branch: None,
            folder: None,
            timezone: None,
            exec: None,
            opts: None,
            build_root: DEFAULT_BUILD_ROOT.to_string(),
            launcher: DEFAULT_LAUNCHER.to_string(),
        }
    }
}

impl Bindings {
    pub fn build_root(&self) -> &str {
        &self.build_root
    }

    /// トークンの置換値
    ///
    /// 値が設定されていないトークンは `None`（置換しない）。
    pub fn value(&self, token: Token) -> Option<String> {
        match token {
            Token::Url => self.url.clone(),
            Token::Branch => self.branch.clone(),
            Token::Folder => self.folder.clone(),
            Token::Timezone => self.timezone.clone(),
            Token::Opts => self.opts.clone(),
            Token::Exec => self.exec.as_deref().map(|exec| self.exec_value(exec)),
        }
    }

    fn exec_value(&self, exec: &str) -> String {
        if !self.launcher.is_empty() && exec.contains(&self.launcher) {
            format!("{}/{}", self.build_root.trim_end_matches('/'), exec)
        } else {
            exec.to_string()
        }
    }
}

/// 1行分のトークンを置換
///
/// 左から1回だけ走査するため、置換後の文字列が再度走査されることはない。
/// 未知の `@...@` はそのまま残す。
pub fn substitute_line(line: &str, bindings: &Bindings) -> String {
    if !line.contains(DELIMITER) {
        return line.to_string();
    }

    let mut output = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find(DELIMITER) {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find(DELIMITER) else {
            output.push(DELIMITER);
            rest = after;
            break;
        };

        let name = &after[..end];
        match Token::from_name(name) {
            Some(token) => match bindings.value(token) {
                Some(value) => {
                    output.push_str(&value);
                    rest = &after[end + 1..];
                }
                None => {
                    warn!(token = %token.placeholder(), "Token has no configured value, leaving as is");
                    output.push(DELIMITER);
                    rest = after;
                }
            },
            None => {
                output.push(DELIMITER);
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}

/// 複数行のトークンを置換
pub fn substitute(lines: &[String], bindings: &Bindings) -> Vec<String> {
    lines
        .iter()
        .map(|line| substitute_line(line, bindings))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> Bindings {
        Bindings {
            url: Some("https://git.example.com/app.git".to_string()),
            branch: Some("main".to_string()),
            folder: Some("app".to_string()),
            timezone: Some("Asia/Tokyo".to_string()),
            exec: Some("java -jar app.jar".to_string()),
            opts: Some("-Xmx512m".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_substitute_all_tokens() {
        let b = bindings();
        assert_eq!(
            substitute_line("RUN git clone -b @BRANCH@ @URL@ @FOLDER@", &b),
            "RUN git clone -b main https://git.example.com/app.git app"
        );
        assert_eq!(
            substitute_line("ENV TZ=@TIMEZONE@ JAVA_OPTS=@OPTS@", &b),
            "ENV TZ=Asia/Tokyo JAVA_OPTS=-Xmx512m"
        );
    }

    #[test]
    fn test_line_without_delimiter_is_unchanged() {
        let b = bindings();
        assert_eq!(substitute_line("WORKDIR /opt/code", &b), "WORKDIR /opt/code");
    }

    #[test]
    fn test_unknown_token_is_kept() {
        let b = bindings();
        assert_eq!(
            substitute_line("LABEL maintainer=ops@example.com @UNKNOWN@", &b),
            "LABEL maintainer=ops@example.com @UNKNOWN@"
        );
        assert_eq!(
            substitute_line("RUN echo a@b@BRANCH@", &b),
            "RUN echo a@bmain"
        );
    }

    #[test]
    fn test_unbound_token_is_kept() {
        let b = Bindings::default();
        assert_eq!(substitute_line("ENV TZ=@TIMEZONE@", &b), "ENV TZ=@TIMEZONE@");
    }

    #[test]
    fn test_exec_plain_command_is_text() {
        let b = bindings();
        let line = substitute_line("CMD @EXEC@", &b);
        assert_eq!(line, "CMD java -jar app.jar");
        assert!(!line.contains('['));
        assert!(!line.contains('\''));
    }

    #[test]
    fn test_exec_launcher_is_prefixed_with_build_root() {
        let b = Bindings {
            exec: Some("mvnw package".to_string()),
            ..Default::default()
        };
        assert_eq!(
            substitute_line("RUN @EXEC@", &b),
            "RUN /opt/code/mvnw package"
        );
    }

    #[test]
    fn test_exec_custom_launcher() {
        let b = Bindings {
            exec: Some("gradlew build".to_string()),
            build_root: "/work/".to_string(),
            launcher: "gradlew".to_string(),
            ..Default::default()
        };
        assert_eq!(substitute_line("RUN @EXEC@", &b), "RUN /work/gradlew build");
    }

    #[test]
    fn test_substitution_is_idempotent() {
        let b = bindings();
        let lines = vec![
            "FROM python:3.11".to_string(),
            "RUN git clone @URL@".to_string(),
            "CMD @EXEC@".to_string(),
        ];
        let once = substitute(&lines, &b);
        let twice = substitute(&once, &b);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_token_names_round_trip() {
        for token in Token::ALL {
            assert_eq!(Token::from_name(token.name()), Some(token));
        }
        assert_eq!(Token::Exec.placeholder(), "@EXEC@");
    }
}
