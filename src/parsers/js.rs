//! 脚本提取器
//!
//! 把没有 `src` 的内联 `<script>` 移出为独立的 `.js` 文件，并把元素改写为
//! 引用该文件。每段脚本单独成文件，不做去重：脚本的副作用与其在文档中的位置相关。
//!
//! 处理分两步：
//! - [`plan_scripts`]：只读扫描，确定要提取的脚本及其期望文件名
//! - [`apply_scripts`]：按（可能已因冲突而改名的）最终路径改写 DOM
//!
//! 两步之间由调用方决定最终输出路径（见 `storage::OutputWriter::resolve_script_path`）。

use std::path::{Path, PathBuf};

use markup5ever_rcdom::RcDom;
use percent_encoding::percent_decode_str;

use crate::parsers::html::{
    clear_children, find_elements_by_name, get_node_attr, get_text_content, is_blank,
    is_html_element, set_node_attr, WHITESPACES,
};
use crate::parsers::link_injector::encode_href;
use crate::utils::paths::{lexical_normalize, relative_path};

/// 视为可执行 JavaScript 的 MIME 类型
const JS_MIME_TYPES: &[&str] = &[
    "application/ecmascript",
    "application/javascript",
    "application/x-ecmascript",
    "application/x-javascript",
    "text/ecmascript",
    "text/javascript",
    "text/javascript1.0",
    "text/javascript1.1",
    "text/javascript1.2",
    "text/javascript1.3",
    "text/javascript1.4",
    "text/javascript1.5",
    "text/jscript",
    "text/livescript",
    "text/x-ecmascript",
    "text/x-javascript",
];

/// 只对带 `src` 的经典脚本生效的属性
const DEFERRING_ATTRS: &[&str] = &["async", "defer"];

/// 提取出的脚本文件扩展名
pub const SCRIPT_EXTENSION: &str = "js";

/// 脚本文件的落盘位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPlacement {
    /// HTML 文档所在目录，`src` 相对于它计算
    pub html_dir: PathBuf,
    /// 脚本输出目录
    pub output_dir: PathBuf,
}

impl ScriptPlacement {
    /// 与 HTML 同目录
    pub fn co_located(html_path: &Path) -> Self {
        let html_dir = parent_dir(html_path);
        Self {
            output_dir: html_dir.clone(),
            html_dir,
        }
    }

    /// 集中到指定目录
    pub fn centralized(html_path: &Path, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            html_dir: parent_dir(html_path),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// 从 HTML 所在目录到脚本文件的相对引用
    pub fn src_for(&self, output_path: &Path) -> String {
        encode_href(&relative_path(&self.html_dir, output_path))
    }
}

/// 待提取的脚本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedScript {
    /// 元素在全部 `<script>` 中的原始位置（从 0 开始）
    pub tag_index: usize,
    /// 期望的文件名
    pub file_name: String,
    pub content: String,
}

/// 一段提取出的脚本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedScriptFile {
    pub tag_index: usize,
    /// 最终文件名（冲突时可能与期望文件名不同）
    pub file_name: String,
    pub content: String,
    /// 输出文件的绝对路径
    pub output_path: PathBuf,
    /// 写入元素的 `src`
    pub src: String,
}

impl ExtractedScriptFile {
    /// 以最终输出路径完成一段计划中的脚本
    pub fn resolve(planned: PlannedScript, output_path: PathBuf, placement: &ScriptPlacement) -> Self {
        let file_name = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(planned.file_name);
        let src = placement.src_for(&output_path);
        Self {
            tag_index: planned.tag_index,
            file_name,
            content: planned.content,
            output_path,
            src,
        }
    }
}

/// 脚本提取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptExtraction {
    pub files: Vec<ExtractedScriptFile>,
    pub changed: bool,
}

/// 扫描文档，列出需要提取的内联脚本
///
/// 只有一段脚本时文件名为 `<base>.js`；多段时为 `<base>_s<index>.js`，
/// 其中 `index` 是该元素在文档全部 `<script>` 中的位置，与外部脚本是否穿插无关。
/// SVG 中的 `<script>` 不认 `src`，保留在原处，但仍参与编号。
pub fn plan_scripts(dom: &RcDom, base_name: &str) -> Vec<PlannedScript> {
    let matches: Vec<(usize, String)> = find_elements_by_name(&dom.document, "script")
        .iter()
        .enumerate()
        .filter(|(_, script)| is_html_element(script))
        .filter(|(_, script)| get_node_attr(script, "src").is_none())
        .filter(|(_, script)| is_executable_type(get_node_attr(script, "type").as_deref()))
        .map(|(index, script)| (index, get_text_content(script)))
        .filter(|(_, content)| !is_blank(content))
        .collect();

    let with_suffix = matches.len() >= 2;
    matches
        .into_iter()
        .map(|(tag_index, content)| {
            let file_name = if with_suffix {
                format!("{}_s{}.{}", base_name, tag_index, SCRIPT_EXTENSION)
            } else {
                format!("{}.{}", base_name, SCRIPT_EXTENSION)
            };
            PlannedScript {
                tag_index,
                file_name,
                content,
            }
        })
        .collect()
}

/// 按最终结果改写文档：清空脚本内容并设置 `src`
///
/// 内联经典脚本上的 `async`/`defer` 原本不起作用，一旦有了 `src` 就会改变执行顺序，
/// 因此一并移除。
pub fn apply_scripts(dom: &RcDom, files: &[ExtractedScriptFile]) -> bool {
    let scripts = find_elements_by_name(&dom.document, "script");
    let mut changed = false;

    for file in files {
        let Some(script) = scripts.get(file.tag_index) else {
            tracing::warn!("第 {} 个 <script> 已不存在，跳过 {}", file.tag_index, file.file_name);
            continue;
        };
        clear_children(script);
        set_node_attr(script, "src", Some(file.src.clone()));
        if type_essence(get_node_attr(script, "type").as_deref()) != "module" {
            for attr in DEFERRING_ATTRS {
                if get_node_attr(script, attr).is_some() {
                    tracing::warn!("{} 原为内联脚本，移除无效的 {} 属性", file.file_name, attr);
                    set_node_attr(script, attr, None);
                }
            }
        }
        changed = true;
    }

    changed
}

/// 一步完成提取，不处理文件名冲突
pub fn extract_scripts(dom: &RcDom, base_name: &str, placement: &ScriptPlacement) -> ScriptExtraction {
    let files: Vec<ExtractedScriptFile> = plan_scripts(dom, base_name)
        .into_iter()
        .map(|planned| {
            let output_path = placement.output_path(&planned.file_name);
            ExtractedScriptFile::resolve(planned, output_path, placement)
        })
        .collect();
    let changed = apply_scripts(dom, &files);

    ScriptExtraction { files, changed }
}

/// 文档通过相对 `src` 引用的本地脚本文件
///
/// 绝对 URL、协议相对 URL、根路径和 `data:` 引用都会被忽略。
pub fn local_script_paths(dom: &RcDom, html_path: &Path) -> Vec<PathBuf> {
    let html_dir = parent_dir(html_path);

    find_elements_by_name(&dom.document, "script")
        .iter()
        .filter_map(|script| get_node_attr(script, "src"))
        .filter_map(|src| {
            let src = src.trim_matches(WHITESPACES);
            let path_part = src.split(['?', '#']).next().unwrap_or_default();
            if path_part.is_empty()
                || path_part.starts_with('/')
                || path_part.contains(':')
            {
                return None;
            }
            let decoded = percent_decode_str(path_part).decode_utf8_lossy();
            Some(lexical_normalize(&html_dir.join(decoded.as_ref())))
        })
        .collect()
}

/// `type` 属性是否表示可执行脚本
pub fn is_executable_type(type_attr: Option<&str>) -> bool {
    if type_attr.is_none() {
        return true;
    }
    let essence = type_essence(type_attr);

    essence.is_empty() || essence == "module" || JS_MIME_TYPES.contains(&essence.as_str())
}

/// 去掉参数并转为小写的 `type` 值；缺省为空串
fn type_essence(type_attr: Option<&str>) -> String {
    type_attr
        .unwrap_or_default()
        .split(';')
        .next()
        .unwrap_or_default()
        .trim_matches(WHITESPACES)
        .to_ascii_lowercase()
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
