//! 统一错误处理
//!
//! 提供结构化错误类型。文档级错误（读取失败、无法解析的标记、路径越界）
//! 会中止整个批次；写入冲突通过重命名解决，不会以错误形式出现。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::env::EnvError;

/// detangle 错误类型
#[derive(Error, Debug)]
pub enum DetangleError {
    /// 文件读写错误
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 源文档不存在
    #[error("source document not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// HTML 解析错误
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// HTML 序列化错误
    #[error("failed to serialize {}: {message}", path.display())]
    Serialize { path: PathBuf, message: String },

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),

    /// glob 模式错误
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// 单文件模式下目标不在扫描根目录内
    #[error("{} is outside of the scan root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// 外部工具执行失败
    #[error("{tool} failed on {}: {message}", input.display())]
    Tool {
        tool: String,
        input: PathBuf,
        message: String,
    },

    /// 环境变量错误
    #[error(transparent)]
    Env(#[from] EnvError),
}

/// 结果类型别名
pub type DetangleResult<T> = Result<T, DetangleError>;

impl DetangleError {
    /// 以路径为上下文包装 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DetangleError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_includes_path() {
        let error = DetangleError::io(
            "/site/index.html",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = error.to_string();
        assert!(message.contains("/site/index.html"));
        assert!(message.contains("denied"));
    }
}
