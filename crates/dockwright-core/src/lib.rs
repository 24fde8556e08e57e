//! Dockwright Core
//!
//! フラグメントからの Dockerfile 合成と、レジストリタグからのバージョン解決を提供します。
//!
//! ```text
//! dockwright.kdl ─▶ BuildConfig
//!                     │
//!                     ├─▶ DescriptorComposer ─▶ FragmentResolver ─▶ <out>/artifacts
//!                     │        │                                   <out>/Dockerfile
//!                     │        └─▶ token::substitute
//!                     │
//!                     └─▶ VersionResolver ◀─ registry tags
//! ```

pub mod composer;
pub mod discovery;
pub mod error;
pub mod fragment;
pub mod model;
pub mod parser;
pub mod token;
pub mod version;

pub use composer::{Composition, Descriptor, DescriptorComposer, reset_directory};
pub use discovery::{find_config_file, find_config_file_in};
pub use error::{ComposeError, Result};
pub use fragment::{Fragment, FragmentResolver};
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use token::{Bindings, Token};
pub use version::{VersionPolicy, VersionResolution, VersionResolver};
