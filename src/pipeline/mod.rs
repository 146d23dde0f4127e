//! 下游构建流程
//!
//! 在重构完成后驱动外部工具：
//!
//! - **CSS**：编译到 `compiledCssLinkDir/<基础名称><compiledCssSuffix>`，失败即中止
//! - **JS**：压缩到 `jsDistDir` 下的相同相对位置，失败即中止
//! - **图片**：优化到 `imageDistDir`，单个失败时退回直接复制
//!
//! 未配置工具时，CSS 与 JS 直接复制，保证样式表链接总能指向存在的文件。

pub mod tools;

use std::path::{Path, PathBuf};

use futures::future::{join_all, try_join_all};
use tokio::sync::Semaphore;

use crate::batch::{BatchReport, Discovery};
use crate::config::{Layout, RefactorConfig, ToolCommand, ToolsConfig};
use crate::error::DetangleResult;

pub use tools::{copy_through, run_tool};

/// 构建汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub css_compiled: usize,
    pub css_copied: usize,
    pub js_minified: usize,
    pub js_copied: usize,
    pub images_optimized: usize,
    pub images_copied: usize,
    pub images_failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Produced {
    Tool,
    Copy,
    Failed,
}

/// 下游构建
pub struct Pipeline {
    layout: Layout,
    tools: ToolsConfig,
    image_patterns: Vec<String>,
    ignore_patterns: Vec<String>,
    max_concurrent: usize,
}

impl Pipeline {
    pub fn new(layout: Layout, config: &RefactorConfig) -> Self {
        Self {
            layout,
            tools: config.tools.clone(),
            image_patterns: config.image_source_patterns.clone(),
            ignore_patterns: config.ignore_patterns.clone(),
            max_concurrent: config.max_concurrent_documents.max(1),
        }
    }

    /// 依次执行 CSS、JS、图片三个阶段
    pub async fn run(&self, report: &BatchReport) -> DetangleResult<PipelineReport> {
        let mut summary = PipelineReport::default();

        self.build_css(report, &mut summary).await?;
        self.build_js(report, &mut summary).await?;
        self.build_images(&mut summary).await?;

        tracing::info!(
            "构建完成: CSS {} 编译 / {} 复制, JS {} 压缩 / {} 复制, 图片 {} 优化 / {} 复制 / {} 失败",
            summary.css_compiled,
            summary.css_copied,
            summary.js_minified,
            summary.js_copied,
            summary.images_optimized,
            summary.images_copied,
            summary.images_failed
        );
        Ok(summary)
    }

    async fn build_css(&self, report: &BatchReport, summary: &mut PipelineReport) -> DetangleResult<()> {
        let mut jobs = Vec::new();
        for (source, base_name) in &report.css_sources {
            if exists(source).await {
                jobs.push((source.clone(), self.layout.compiled_css_path(base_name)));
            }
        }

        let semaphore = Semaphore::new(self.max_concurrent);
        let outcomes = try_join_all(jobs.iter().map(|(input, output)| {
            self.produce_strict("cssCompiler", self.tools.css_compiler.as_ref(), input, output, &semaphore)
        }))
        .await?;

        for produced in outcomes {
            match produced {
                Produced::Tool => summary.css_compiled += 1,
                _ => summary.css_copied += 1,
            }
        }
        Ok(())
    }

    async fn build_js(&self, report: &BatchReport, summary: &mut PipelineReport) -> DetangleResult<()> {
        let mut jobs = Vec::new();
        for source in &report.script_sources {
            let Ok(relative) = source.strip_prefix(&self.layout.root) else {
                tracing::debug!("{} 不在根目录下，跳过压缩", source.display());
                continue;
            };
            if source.starts_with(&self.layout.js_dist_dir) || !exists(source).await {
                continue;
            }
            jobs.push((source.clone(), self.layout.js_dist_dir.join(relative)));
        }

        let semaphore = Semaphore::new(self.max_concurrent);
        let outcomes = try_join_all(jobs.iter().map(|(input, output)| {
            self.produce_strict("jsMinifier", self.tools.js_minifier.as_ref(), input, output, &semaphore)
        }))
        .await?;

        for produced in outcomes {
            match produced {
                Produced::Tool => summary.js_minified += 1,
                _ => summary.js_copied += 1,
            }
        }
        Ok(())
    }

    async fn build_images(&self, summary: &mut PipelineReport) -> DetangleResult<()> {
        let mut discovery = Discovery::new(&self.image_patterns, &self.ignore_patterns)?
            .exclude_dir(&self.layout.image_dist_dir)
            .exclude_dir(&self.layout.compiled_css_dir)
            .exclude_dir(&self.layout.js_dist_dir);
        if let Some(mirror) = &self.layout.mirror_root {
            discovery = discovery.exclude_dir(mirror);
        }

        let jobs: Vec<(PathBuf, PathBuf)> = discovery
            .discover(&self.layout.root)
            .into_iter()
            .filter_map(|source| {
                let output = self
                    .layout
                    .image_dist_dir
                    .join(source.strip_prefix(&self.layout.root).ok()?);
                Some((source, output))
            })
            .collect();

        let semaphore = Semaphore::new(self.max_concurrent);
        let outcomes = join_all(
            jobs.iter()
                .map(|(input, output)| self.produce_lenient(input, output, &semaphore)),
        )
        .await;

        for produced in outcomes {
            match produced {
                Produced::Tool => summary.images_optimized += 1,
                Produced::Copy => summary.images_copied += 1,
                Produced::Failed => summary.images_failed += 1,
            }
        }
        Ok(())
    }

    /// CSS/JS：工具失败即返回错误
    async fn produce_strict(
        &self,
        name: &str,
        tool: Option<&ToolCommand>,
        input: &Path,
        output: &Path,
        semaphore: &Semaphore,
    ) -> DetangleResult<Produced> {
        let _permit = semaphore.acquire().await.ok();
        match tool {
            Some(tool) => {
                run_tool(name, tool, input, output).await?;
                tracing::info!("{}: {} -> {}", name, input.display(), output.display());
                Ok(Produced::Tool)
            }
            None => {
                copy_through(input, output).await?;
                tracing::debug!("复制 {} -> {}", input.display(), output.display());
                Ok(Produced::Copy)
            }
        }
    }

    /// 图片：优化失败时退回复制，复制也失败时只记录
    async fn produce_lenient(&self, input: &Path, output: &Path, semaphore: &Semaphore) -> Produced {
        let _permit = semaphore.acquire().await.ok();

        if let Some(tool) = &self.tools.image_optimizer {
            match run_tool("imageOptimizer", tool, input, output).await {
                Ok(()) => return Produced::Tool,
                Err(e) => tracing::warn!("图片优化失败，改为直接复制: {}", e),
            }
        }

        match copy_through(input, output).await {
            Ok(()) => Produced::Copy,
            Err(e) => {
                tracing::warn!("复制图片失败: {}", e);
                Produced::Failed
            }
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
