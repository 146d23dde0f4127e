//! # 解析器模块
//!
//! 对已解析的 HTML 文档进行提取与改写：
//!
//! - `html` - HTML文档解析、DOM操作、元数据处理、序列化
//! - `css` - 内联样式提取与去重
//! - `js` - 内联脚本提取
//! - `link_injector` - 编译后样式表链接注入

pub mod css;
pub mod html;
pub mod js;
pub mod link_injector;

// Re-export commonly used items for convenience
pub use css::{extract_styles, normalize_declarations, StyleExtraction, StyleRegistry};
pub use html::{get_charset, html_to_dom, serialize_document};
pub use js::{
    apply_scripts, extract_scripts, local_script_paths, plan_scripts, ExtractedScriptFile, PlannedScript,
    ScriptExtraction, ScriptPlacement,
};
pub use link_injector::{encode_href, ensure_stylesheet_link, stylesheet_href};
