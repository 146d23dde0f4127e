//! # 工具模块
//!
//! - `naming` - 基础名称推导、清理、截断与内容哈希
//! - `paths` - 词法路径规范化与相对路径计算

pub mod naming;
pub mod paths;

// Re-export commonly used items for convenience
pub use naming::{derive_base_name, hex_digest, sanitize, short_hash, NamingPolicy};
pub use paths::{lexical_normalize, normalize_separators, path_to_slash, rebase, relative_path};
