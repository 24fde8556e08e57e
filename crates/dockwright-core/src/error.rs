use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("必須設定がありません: {0}")]
    ConfigMissing(String),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error(
        "設定ファイルが見つかりません\n探索開始位置: {0}\nヒント: dockwright.kdl を置くか DOCKWRIGHT_CONFIG で指定してください"
    )]
    ConfigNotFound(PathBuf),

    #[error("フラグメントが存在しません: {0}")]
    PathNotFound(PathBuf),

    #[error("フラグメントが空です: {0}")]
    EmptyFragment(PathBuf),

    #[error("Dockerfile がありません: {0}")]
    MissingInstructionFile(PathBuf),

    #[error("Dockerfile が複数あります: {dir}\n候補: {candidates:?}")]
    AmbiguousInstructionFile {
        dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    #[error("Dockerfile の内容が空です: {0}")]
    EmptyInstructionFile(PathBuf),

    #[error("ビルドステージとアプリケーションステージの親イメージが異なります: {build} != {app}")]
    ParentMismatch { build: String, app: String },

    #[error("タグのバージョンを解釈できません: {tag}")]
    VersionDecode { tag: String },

    #[error("次のバージョンを表現できません: {version}")]
    VersionOverflow { version: String },

    #[error("IO エラー: {path}\n理由: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl ComposeError {
    pub(crate) fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ComposeError::FileIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ComposeError>;
