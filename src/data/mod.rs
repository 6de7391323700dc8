//! Everything written to or read from disk.

pub mod cache;
pub mod json;
pub mod mapping;
pub mod sink;
pub mod sql;

pub use cache::PageCache;
pub use mapping::CourseMapping;
pub use sink::{Block, SqlWriter, WriteStats};
