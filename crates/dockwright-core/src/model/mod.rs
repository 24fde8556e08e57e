//! モデル定義
//!
//! Dockwrightで使用されるデータモデルを定義します。

mod config;
mod image;
mod tag;

// Re-exports
pub use config::*;
pub use image::*;
pub use tag::*;
