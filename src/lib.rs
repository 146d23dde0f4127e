//! # detangle
//!
//! 把静态 HTML 中的内联样式和内联脚本拆分为独立文件的工具库。
//!
//! ## 模块组织
//!
//! - `core` - 单文档重构编排
//! - `parsers` - HTML 解析、样式提取、脚本提取、样式表链接注入
//! - `storage` - 以内容比较为前提的持久化层
//! - `batch` - 文档发现与批处理
//! - `pipeline` - 下游 CSS 编译、JS 压缩、图片优化
//! - `config` - 配置加载与验证
//! - `env` - 类型安全的环境变量
//! - `utils` - 文件名生成与路径工具

pub mod batch;
pub mod config;
pub mod core;
pub mod env;
pub mod error;
pub mod parsers;
pub mod pipeline;
pub mod storage;
pub mod utils;

// Re-export commonly used items for convenience
pub use batch::{discover_documents, resolve_single, BatchReport, BatchRunner, Discovery};
pub use config::{ConfigManager, Layout, OutputStrategy, RefactorConfig};
pub use self::core::{DocumentRefactor, RefactorResult};
pub use error::{DetangleError, DetangleResult};
pub use pipeline::{Pipeline, PipelineReport};
pub use storage::{AssetStore, FsStore, MemoryStore, OutputWriter, WriteOptions, WriteStats};
pub use utils::naming::{derive_base_name, NamingPolicy};
