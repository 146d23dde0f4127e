//! 输出写入器
//!
//! 所有写入都以内容比较为前提：目标已有相同内容时不写。
//! 这保证了重复运行时不会产生任何写入。
//!
//! - **CSS 合并**：同一目标的合并通过按路径划分的异步锁串行化
//! - **脚本路径**：已存在且内容不同的目标会被换成带时间戳的新名称
//! - **HTML 回写**：可选先备份为 `<文件>.bak`
//! - **镜像**：位于根目录下的 CSS/JS 同时写入镜像目录的相同位置；
//!   HTML 只写入镜像，源文档保持不变
//! - **预演**（dry-run）：所有判断照常执行并记录日志，只是不真正写入；
//!   预演中“写入”的内容保存在暂存区，后续判断会看到它们

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;

use super::store::AssetStore;
use crate::core::RefactorResult;
use crate::error::{DetangleError, DetangleResult};
use crate::parsers::css::comment_text;
use crate::parsers::js::ExtractedScriptFile;
use crate::utils::naming::hex_digest;
use crate::utils::paths::rebase;

/// 新建 CSS 文件时写在开头的说明
pub const CSS_PREAMBLE: &str =
    "/* Styles extracted from inline markup by detangle. Edits are kept on re-runs. */";

/// 备份文件后缀
pub const BACKUP_SUFFIX: &str = ".bak";

// ============================================================================
// 核心类型
// ============================================================================

/// 写入选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub dry_run: bool,
    pub create_backups: bool,
    /// 扫描根目录，镜像按它计算相对位置
    pub root: PathBuf,
    pub mirror_root: Option<PathBuf>,
}

/// 写入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub html_written: usize,
    pub css_written: usize,
    pub js_written: usize,
    pub mirrored: usize,
    pub backups: usize,
    /// 因内容相同而跳过的写入
    pub unchanged: usize,
    /// 脚本文件名冲突后改名的次数
    pub collisions: usize,
}

impl WriteStats {
    /// 实际（或预演中将要）发生的写入总数
    pub fn total_writes(&self) -> usize {
        self.html_written + self.css_written + self.js_written + self.mirrored + self.backups
    }
}

/// CSS 合并的结果类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssMergeOutcome {
    /// 新建文件
    Created,
    /// 追加到已有文件
    Appended,
    /// 已包含相同内容，未写入
    Unchanged,
}

/// 一次 CSS 合并
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssMerge {
    pub path: PathBuf,
    pub outcome: CssMergeOutcome,
}

#[derive(Debug, Clone, Copy)]
enum OutputKind {
    Html,
    Css,
    Js,
}

/// 输出写入器
pub struct OutputWriter<S> {
    store: S,
    options: WriteOptions,
    css_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    script_claims: Mutex<HashMap<PathBuf, String>>,
    staged: Mutex<HashMap<PathBuf, Vec<u8>>>,
    stats: Mutex<WriteStats>,
}

// ============================================================================
// 实现
// ============================================================================

impl<S: AssetStore> OutputWriter<S> {
    pub fn new(store: S, options: WriteOptions) -> Self {
        Self {
            store,
            options,
            css_locks: Mutex::new(HashMap::new()),
            script_claims: Mutex::new(HashMap::new()),
            staged: Mutex::new(HashMap::new()),
            stats: Mutex::new(WriteStats::default()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// 统计快照
    pub fn stats(&self) -> WriteStats {
        *lock(&self.stats)
    }

    /// 镜像目录中对应的路径
    pub fn mirror_path(&self, path: &Path) -> Option<PathBuf> {
        let mirror_root = self.options.mirror_root.as_deref()?;
        rebase(path, &self.options.root, mirror_root)
    }

    /// 读取源文档
    pub async fn read_document(&self, path: &Path) -> DetangleResult<Vec<u8>> {
        self.read(path)
            .await?
            .ok_or_else(|| DetangleError::SourceMissing(path.to_path_buf()))
    }

    /// 将新提取的 CSS 合并进目标文件
    ///
    /// 目标已包含这段 CSS 时不写入；否则在分隔注释后追加，缺少说明头时补上。
    pub async fn merge_css(&self, target: &Path, css: &str, label: &str) -> DetangleResult<CssMerge> {
        let target_lock = self.css_lock(target);
        let _guard = target_lock.lock().await;

        let addition = css.trim();
        let label = comment_text(label);
        let existing = self
            .read(target)
            .await?
            .map(|contents| String::from_utf8_lossy(&contents).into_owned());

        let (merged, outcome) = match existing {
            Some(existing) if existing.contains(addition) => {
                tracing::debug!("{} 已包含来自 {} 的样式，跳过", target.display(), label);
                lock(&self.stats).unchanged += 1;
                return Ok(CssMerge {
                    path: target.to_path_buf(),
                    outcome: CssMergeOutcome::Unchanged,
                });
            }
            Some(existing) => {
                let mut merged = if existing.contains(CSS_PREAMBLE) {
                    existing
                } else {
                    format!("{}\n\n{}", CSS_PREAMBLE, existing)
                };
                merged.truncate(merged.trim_end().len());
                merged.push_str(&format!("\n\n/* --- {} --- */\n{}\n", label, addition));
                (merged, CssMergeOutcome::Appended)
            }
            None => (
                format!("{}\n\n/* --- {} --- */\n{}\n", CSS_PREAMBLE, label, addition),
                CssMergeOutcome::Created,
            ),
        };

        self.write_output(target, merged.as_bytes(), OutputKind::Css)
            .await?;
        Ok(CssMerge {
            path: target.to_path_buf(),
            outcome,
        })
    }

    /// 为脚本确定最终输出路径
    ///
    /// 期望路径不存在，或已有完全相同的内容时，直接使用期望路径；
    /// 已有不同内容（包括本次运行中被其他文档占用）时换成带时间戳的新名称。
    pub async fn resolve_script_path(&self, desired: &Path, content: &str) -> DetangleResult<PathBuf> {
        let digest = hex_digest(content, 64);
        let mut candidate = desired.to_path_buf();
        let mut attempt = 0usize;

        loop {
            let claimed = lock(&self.script_claims).get(&candidate).cloned();
            let available = match claimed {
                Some(owner) => owner == digest,
                None => match self.read(&candidate).await? {
                    Some(existing) => existing == content.as_bytes(),
                    None => true,
                },
            };

            if available {
                let mut claims = lock(&self.script_claims);
                match claims.get(&candidate) {
                    Some(owner) if *owner != digest => {}
                    _ => {
                        claims.insert(candidate.clone(), digest);
                        return Ok(candidate);
                    }
                }
            }

            attempt += 1;
            let uniquified = uniquify(desired, attempt);
            tracing::warn!(
                "{} 已存在不同内容，改用 {}",
                candidate.display(),
                uniquified.display()
            );
            lock(&self.stats).collisions += 1;
            candidate = uniquified;
        }
    }

    /// 写入一个提取出的脚本
    pub async fn write_script(&self, file: &ExtractedScriptFile) -> DetangleResult<bool> {
        self.write_output(&file.output_path, file.content.as_bytes(), OutputKind::Js)
            .await
    }

    /// 写回 HTML；内容与磁盘一致时不写
    pub async fn write_html(&self, path: &Path, contents: &[u8]) -> DetangleResult<bool> {
        if self.options.create_backups {
            if let Some(existing) = self.read(path).await? {
                if existing != contents {
                    self.backup(path, &existing).await?;
                }
            }
        }

        self.write_output(path, contents, OutputKind::Html).await
    }

    /// 持久化一个文档的处理结果（CSS 已在处理过程中合并）
    pub async fn persist(&self, result: &RefactorResult) -> DetangleResult<()> {
        for script in &result.scripts {
            self.write_script(script).await?;
        }

        // 配置了镜像目录时源文档保持不变，HTML 只写到镜像中；
        // 样式表链接是按镜像位置计算的
        if let Some(mirror) = self.mirror_path(&result.source_path) {
            self.write_gated(&mirror, &result.html, OutputKind::Html, true)
                .await?;
        } else if result.changed {
            self.write_html(&result.source_path, &result.html).await?;
        }

        Ok(())
    }

    // ------------------------------------------------------------------------
    // 内部
    // ------------------------------------------------------------------------

    async fn write_output(&self, path: &Path, contents: &[u8], kind: OutputKind) -> DetangleResult<bool> {
        let written = self.write_gated(path, contents, kind, false).await?;
        if let Some(mirror) = self.mirror_path(path) {
            self.write_gated(&mirror, contents, kind, true).await?;
        }
        Ok(written)
    }

    async fn write_gated(
        &self,
        path: &Path,
        contents: &[u8],
        kind: OutputKind,
        mirror: bool,
    ) -> DetangleResult<bool> {
        if self.read(path).await?.as_deref() == Some(contents) {
            tracing::debug!("{} 内容未变化，跳过写入", path.display());
            lock(&self.stats).unchanged += 1;
            return Ok(false);
        }

        if self.options.dry_run {
            tracing::info!("[dry-run] 将写入 {:?} {}", kind, path.display());
            lock(&self.staged).insert(path.to_path_buf(), contents.to_vec());
        } else {
            self.store
                .write(path, contents)
                .await
                .map_err(|source| DetangleError::io(path, source))?;
            tracing::info!("写入 {:?} {}", kind, path.display());
        }

        let mut stats = lock(&self.stats);
        if mirror {
            stats.mirrored += 1;
        } else {
            match kind {
                OutputKind::Html => stats.html_written += 1,
                OutputKind::Css => stats.css_written += 1,
                OutputKind::Js => stats.js_written += 1,
            }
        }
        Ok(true)
    }

    async fn backup(&self, path: &Path, existing: &[u8]) -> DetangleResult<()> {
        let backup_path = backup_path(path);
        if self.options.dry_run {
            tracing::info!("[dry-run] 将备份 {} -> {}", path.display(), backup_path.display());
            lock(&self.staged).insert(backup_path, existing.to_vec());
        } else {
            self.store
                .copy(path, &backup_path)
                .await
                .map_err(|source| DetangleError::io(&backup_path, source))?;
            tracing::info!("备份 {} -> {}", path.display(), backup_path.display());
        }
        lock(&self.stats).backups += 1;
        Ok(())
    }

    async fn read(&self, path: &Path) -> DetangleResult<Option<Vec<u8>>> {
        if let Some(staged) = lock(&self.staged).get(path) {
            return Ok(Some(staged.clone()));
        }
        self.store
            .read(path)
            .await
            .map_err(|source| DetangleError::io(path, source))
    }

    fn css_lock(&self, target: &Path) -> Arc<tokio::sync::Mutex<()>> {
        lock(&self.css_locks)
            .entry(target.to_path_buf())
            .or_default()
            .clone()
    }
}

/// `<文件>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn uniquify(desired: &Path, attempt: usize) -> PathBuf {
    let stem = desired
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = desired
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy()))
        .unwrap_or_default();
    let timestamp = Local::now().format("%Y%m%d%H%M%S%3f");

    let file_name = if attempt <= 1 {
        format!("{}_{}{}", stem, timestamp, extension)
    } else {
        format!("{}_{}_{}{}", stem, timestamp, attempt, extension)
    };
    desired.with_file_name(file_name)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
