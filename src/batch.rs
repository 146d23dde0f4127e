//! 批处理驱动
//!
//! 按 glob 规则发现 HTML 文档，并发地对每个文档执行重构与持久化。
//!
//! 所有文档在同一个任务中以 `try_join_all` 并发推进，由信号量限制同时处理的数量；
//! 任一文档失败即中止整个批次。

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use crate::config::Layout;
use crate::core::{DocumentRefactor, RefactorResult};
use crate::error::{DetangleError, DetangleResult};
use crate::storage::{AssetStore, CssMergeOutcome, OutputWriter, WriteStats};
use crate::utils::paths::path_to_slash;

// ============================================================================
// 文档发现
// ============================================================================

/// 编译 glob 模式集合；`*` 不跨越目录分隔符
pub fn build_globset(patterns: &[String]) -> DetangleResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| DetangleError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| DetangleError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// 文件发现规则
#[derive(Debug, Clone)]
pub struct Discovery {
    include: GlobSet,
    ignore: GlobSet,
    /// 不进入的目录（输出目录等）
    excluded_dirs: Vec<PathBuf>,
}

impl Discovery {
    pub fn new(include: &[String], ignore: &[String]) -> DetangleResult<Self> {
        Ok(Self {
            include: build_globset(include)?,
            ignore: build_globset(ignore)?,
            excluded_dirs: Vec::new(),
        })
    }

    /// 跳过某个目录及其全部内容
    pub fn exclude_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded_dirs.push(dir.into());
        self
    }

    /// 相对路径是否被选中
    pub fn matches(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.ignore.is_match(relative)
    }

    /// 在 `root` 下按文件名顺序查找匹配的文件
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && self
                        .excluded_dirs
                        .iter()
                        .any(|excluded| entry.path() == excluded))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("遍历目录时出错: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if self.matches(&path_to_slash(relative)) {
                found.push(entry.into_path());
            }
        }

        found
    }
}

/// 按配置发现 HTML 文档；镜像目录和 `dist` 目录不参与扫描
pub fn discover_documents(
    layout: &Layout,
    html_patterns: &[String],
    ignore_patterns: &[String],
) -> DetangleResult<Vec<PathBuf>> {
    let mut discovery = Discovery::new(html_patterns, ignore_patterns)?
        .exclude_dir(&layout.compiled_css_dir)
        .exclude_dir(&layout.js_dist_dir)
        .exclude_dir(&layout.image_dist_dir);
    if let Some(mirror) = &layout.mirror_root {
        discovery = discovery.exclude_dir(mirror);
    }

    let documents = discovery.discover(&layout.root);
    tracing::info!("在 {} 下发现 {} 个 HTML 文档", layout.root.display(), documents.len());
    Ok(documents)
}

/// 单文件模式：解析路径并确认它位于扫描根目录下
pub fn resolve_single(path: &Path, root: &Path) -> DetangleResult<PathBuf> {
    let canonical = std::fs::canonicalize(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DetangleError::SourceMissing(path.to_path_buf())
        } else {
            DetangleError::io(path, source)
        }
    })?;

    if !canonical.starts_with(root) {
        return Err(DetangleError::OutsideRoot {
            path: canonical,
            root: root.to_path_buf(),
        });
    }

    Ok(canonical)
}

// ============================================================================
// 执行
// ============================================================================

/// 批次汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub documents: usize,
    pub changed: usize,
    pub css_created: usize,
    pub css_appended: usize,
    pub scripts_extracted: usize,
    pub links_added: usize,
    /// 所有文档的 CSS 源文件（路径 → 基础名称），供下游编译
    pub css_sources: BTreeMap<PathBuf, String>,
    /// 文档引用的本地脚本，供下游压缩
    pub script_sources: BTreeSet<PathBuf>,
    pub stats: WriteStats,
    pub dry_run: bool,
}

impl BatchReport {
    fn record(&mut self, result: &RefactorResult, css_source: PathBuf) {
        self.documents += 1;
        if result.changed {
            self.changed += 1;
        }
        match result.css.as_ref().map(|merge| merge.outcome) {
            Some(CssMergeOutcome::Created) => self.css_created += 1,
            Some(CssMergeOutcome::Appended) => self.css_appended += 1,
            _ => {}
        }
        if result.link_added {
            self.links_added += 1;
        }
        self.scripts_extracted += result.scripts.len();
        self.css_sources.insert(css_source, result.base_name.clone());
        self.script_sources
            .extend(result.local_scripts.iter().cloned());
    }
}

/// 批处理执行器
pub struct BatchRunner<S> {
    refactor: DocumentRefactor,
    writer: OutputWriter<S>,
    max_concurrent: usize,
}

impl<S: AssetStore> BatchRunner<S> {
    pub fn new(layout: Layout, writer: OutputWriter<S>, max_concurrent: usize) -> Self {
        Self {
            refactor: DocumentRefactor::new(layout),
            writer,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn writer(&self) -> &OutputWriter<S> {
        &self.writer
    }

    pub fn layout(&self) -> &Layout {
        self.refactor.layout()
    }

    /// 处理全部文档；任一文档失败时返回该错误
    pub async fn run(&self, documents: &[PathBuf]) -> DetangleResult<BatchReport> {
        let semaphore = Semaphore::new(self.max_concurrent);

        let results = try_join_all(
            documents
                .iter()
                .map(|path| self.process_document(path, &semaphore)),
        )
        .await?;

        let layout = self.refactor.layout();
        let mut report = BatchReport {
            dry_run: self.writer.is_dry_run(),
            ..BatchReport::default()
        };
        for result in &results {
            let css_source = layout.css_target(&result.source_path, &result.base_name);
            report.record(result, css_source);
        }
        report.stats = self.writer.stats();

        tracing::info!(
            "处理完成: {} 个文档, {} 个已修改, {} 个脚本, {} 次写入{}",
            report.documents,
            report.changed,
            report.scripts_extracted,
            report.stats.total_writes(),
            if report.dry_run { " (dry-run)" } else { "" }
        );
        Ok(report)
    }

    async fn process_document(
        &self,
        path: &Path,
        semaphore: &Semaphore,
    ) -> DetangleResult<RefactorResult> {
        // 信号量只在本函数内使用，不会被关闭
        let _permit = semaphore.acquire().await.ok();

        let result = self.refactor.refactor(path, &self.writer).await?;
        self.writer.persist(&result).await?;
        Ok(result)
    }
}
