pub mod build;
pub mod compose;
pub mod next_version;
