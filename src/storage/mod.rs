//! 持久化层
//!
//! - `store` - 存储后端（文件系统 / 内存）
//! - `writer` - 以内容比较为前提的输出写入

pub mod store;
pub mod writer;

pub use store::{AssetStore, FsStore, MemoryStore};
pub use writer::{
    backup_path, CssMerge, CssMergeOutcome, OutputWriter, WriteOptions, WriteStats, CSS_PREAMBLE,
};
