//! Dockwright Image Build functionality
//!
//! 合成済みの Dockerfile をビルドし、コンテナレジストリへプッシュします。
//! レジストリ（ECR）のリポジトリ管理とタグ一覧、認証、ソースの取得も扱います。

pub mod auth;
pub mod builder;
pub mod checkout;
pub mod context;
pub mod ecr;
pub mod error;
pub mod pusher;
pub mod registry;

pub use auth::{decode_authorization, extract_registry};
pub use builder::{BuildOutput, ImageBuilder};
pub use checkout::shallow_clone;
pub use context::ContextBuilder;
pub use ecr::EcrRegistry;
pub use error::{BuildError, BuildResult};
pub use pusher::{ImagePusher, split_image_tag, validate_tag};
pub use registry::{RegistryClient, Release, Repository, plan_release};
