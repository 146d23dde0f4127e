//! 外部工具调用

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::ToolCommand;
use crate::error::{DetangleError, DetangleResult};

/// stderr 在错误信息中保留的最大字符数
const MAX_STDERR_CHARS: usize = 2000;

/// 运行外部工具，把 `input` 处理为 `output`
pub async fn run_tool(name: &str, tool: &ToolCommand, input: &Path, output: &Path) -> DetangleResult<()> {
    ensure_parent(output).await?;

    let args = tool.render_args(input, output);
    tracing::debug!("运行 {}: {} {}", name, tool.program, args.join(" "));

    let result = Command::new(&tool.program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| DetangleError::Tool {
            tool: name.to_string(),
            input: input.to_path_buf(),
            message: format!("无法启动 {}: {}", tool.program, e),
        })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        let stderr: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
        return Err(DetangleError::Tool {
            tool: name.to_string(),
            input: input.to_path_buf(),
            message: format!("{} ({})", stderr, result.status),
        });
    }

    Ok(())
}

/// 未配置工具时直接复制
pub async fn copy_through(input: &Path, output: &Path) -> DetangleResult<()> {
    ensure_parent(output).await?;
    tokio::fs::copy(input, output)
        .await
        .map_err(|source| DetangleError::io(input, source))?;
    Ok(())
}

async fn ensure_parent(path: &Path) -> DetangleResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| DetangleError::io(parent, source))?;
    }
    Ok(())
}
