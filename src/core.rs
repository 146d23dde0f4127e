//! 文档重构编排
//!
//! [`DocumentRefactor`] 对单个 HTML 文档依次执行：
//! 读取 → 解析 → 样式提取 → CSS 合并与样式表链接 → 脚本提取 → 序列化。
//!
//! 编排器本身不直接写文件，所有读写都通过 [`OutputWriter`] 完成，
//! 因此可以用内存存储在没有 I/O 的情况下测试。

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;

use crate::config::Layout;
use crate::error::{DetangleError, DetangleResult};
use crate::parsers::css::{extract_styles, StyleRegistry};
use crate::parsers::html::{get_charset, html_to_dom, serialize_document};
use crate::parsers::js::{apply_scripts, local_script_paths, plan_scripts, ExtractedScriptFile};
use crate::parsers::link_injector::ensure_stylesheet_link;
use crate::storage::{AssetStore, CssMerge, OutputWriter};
use crate::utils::naming::derive_base_name;
use crate::utils::paths::path_to_slash;

/// 默认文档编码
pub const DEFAULT_ENCODING: &str = "utf-8";

/// 单个文档的重构结果
///
/// 由调用方持有；脚本与 HTML 由 [`OutputWriter::persist`] 写出。
#[derive(Debug, Clone)]
pub struct RefactorResult {
    pub source_path: PathBuf,
    /// HTML 最终写入的位置（配置了镜像目录时为镜像中的路径）
    pub html_output_path: PathBuf,
    pub base_name: String,
    /// 写回 HTML 时使用的编码
    pub encoding: String,
    pub original: Vec<u8>,
    /// 最终 HTML；未修改时与 `original` 相同
    pub html: Vec<u8>,
    pub css: Option<CssMerge>,
    pub scripts: Vec<ExtractedScriptFile>,
    /// 最终 HTML 引用的本地脚本（新提取的和原有的）
    pub local_scripts: Vec<PathBuf>,
    pub style_blocks: usize,
    pub style_attributes: usize,
    pub link_added: bool,
    pub changed: bool,
}

/// 单文档重构器，不在调用之间保存任何状态
#[derive(Debug, Clone)]
pub struct DocumentRefactor {
    layout: Layout,
}

impl DocumentRefactor {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// 重构一个文档
    ///
    /// 读取失败对该文档是致命的；CSS 合并和脚本路径的冲突处理委托给 `writer`。
    pub async fn refactor<S: AssetStore>(
        &self,
        path: &Path,
        writer: &OutputWriter<S>,
    ) -> DetangleResult<RefactorResult> {
        let original = writer.read_document(path).await?;
        let (dom, encoding) = parse_document(path, &original)?;

        let label = source_label(path, &self.layout.root);
        let base_name = derive_base_name(path, &self.layout.naming);
        let html_output_path = self.layout.html_output_path(path);

        // 1. 样式
        let mut registry = StyleRegistry::new();
        let styles = extract_styles(&dom, &mut registry, &label);

        // 2. CSS 合并与样式表链接
        let mut css = None;
        let mut link_added = false;
        if !styles.css.is_empty() {
            let target = self.layout.css_target(path, &base_name);
            css = Some(writer.merge_css(&target, &styles.css, &label).await?);
            link_added = ensure_stylesheet_link(
                &dom,
                &html_output_path,
                &base_name,
                &self.layout.compiled_css_dir,
                &self.layout.compiled_css_suffix,
            );
        }

        // 3. 脚本
        let placement = self.layout.script_placement(path);
        let mut scripts = Vec::new();
        for planned in plan_scripts(&dom, &base_name) {
            let desired = placement.output_path(&planned.file_name);
            let resolved = writer
                .resolve_script_path(&desired, &planned.content)
                .await?;
            scripts.push(ExtractedScriptFile::resolve(planned, resolved, &placement));
        }
        let scripts_changed = apply_scripts(&dom, &scripts);
        let local_scripts = local_script_paths(&dom, path);

        // 4. 序列化
        let changed = styles.changed || link_added || scripts_changed;
        let html = if changed {
            serialize_document(&dom, &encoding).map_err(|e| DetangleError::Serialize {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            original.clone()
        };

        if changed {
            tracing::info!(
                "{}: {} 个样式块, {} 个样式属性 ({} 条规则), {} 个脚本",
                label,
                styles.blocks,
                styles.attributes,
                registry.len(),
                scripts.len()
            );
        } else {
            tracing::debug!("{}: 无内联样式或脚本", label);
        }

        Ok(RefactorResult {
            source_path: path.to_path_buf(),
            html_output_path,
            base_name,
            encoding,
            original,
            html,
            css,
            scripts,
            local_scripts,
            style_blocks: styles.blocks,
            style_attributes: styles.attributes,
            link_added,
            changed,
        })
    }
}

/// 解析文档；声明了非 UTF-8 编码时按该编码重新解析
fn parse_document(path: &Path, data: &[u8]) -> DetangleResult<(RcDom, String)> {
    let parse_error = |e: std::io::Error| DetangleError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let dom = html_to_dom(data, DEFAULT_ENCODING).map_err(parse_error)?;

    let declared = get_charset(&dom.document)
        .and_then(|charset| Encoding::for_label_no_replacement(charset.trim().as_bytes()));
    match declared {
        Some(encoding) if encoding != encoding_rs::UTF_8 => {
            let name = encoding.name().to_ascii_lowercase();
            let dom = html_to_dom(data, &name).map_err(parse_error)?;
            Ok((dom, name))
        }
        _ => Ok((dom, DEFAULT_ENCODING.to_string())),
    }
}

/// 日志和注释中使用的文档名称：相对根目录的路径
pub fn source_label(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let label = path_to_slash(relative);
    if label.is_empty() {
        path.display().to_string()
    } else {
        label
    }
}
