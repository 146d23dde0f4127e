//! 样式提取器
//!
//! 把文档中的 `<style>` 元素和 `style=""` 属性移出到独立的 CSS 文本中：
//!
//! - **样式块**：按原样、按顺序输出，每块前加一行来源注释，不做去重
//! - **样式属性**：声明规范化（排序、去空白）后按内容哈希生成类名，
//!   同一次运行中等价的内联样式只产生一条规则并共享同一个类名
//!
//! 去重表 [`StyleRegistry`] 由调用方为每个文档单独创建，提取器本身不持有任何状态。
//!
//! ```rust
//! use detangle::parsers::css::{extract_styles, StyleRegistry};
//! use detangle::parsers::html::html_to_dom;
//!
//! let dom = html_to_dom(br#"<p style="color:red">a</p>"#, "utf-8").unwrap();
//! let mut registry = StyleRegistry::new();
//! let extraction = extract_styles(&dom, &mut registry, "index.html");
//!
//! assert!(extraction.changed);
//! assert_eq!(registry.len(), 1);
//! ```

use std::collections::HashMap;

use markup5ever_rcdom::{Handle, RcDom};

use crate::parsers::html::{
    add_class, detach_node, find_elements_by_name, get_node_attr, get_node_name,
    get_text_content, is_blank, set_node_attr, walk_elements, WHITESPACES,
};
use crate::utils::naming::hex_digest;

/// 生成类名的前缀
pub const CLASS_PREFIX: &str = "st-";

/// 类名中哈希部分的长度
pub const CLASS_HASH_LEN: usize = 10;

/// 一条去重后的样式规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedStyleRule {
    /// 规范化后的声明文本
    pub declarations: String,
    /// 生成的类名
    pub class_name: String,
    /// 使用该规则的元素描述（如 `div#hero`）
    pub origins: Vec<String>,
}

/// 单次文档处理内的样式去重表
#[derive(Debug, Default)]
pub struct StyleRegistry {
    by_declarations: HashMap<String, usize>,
    rules: Vec<ExtractedStyleRule>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一组规范化声明，返回类名以及是否为新规则
    pub fn register(&mut self, declarations: &str, origin: String) -> (String, bool) {
        if let Some(&index) = self.by_declarations.get(declarations) {
            let rule = &mut self.rules[index];
            rule.origins.push(origin);
            return (rule.class_name.clone(), false);
        }

        let class_name = class_name_for(declarations);
        self.by_declarations
            .insert(declarations.to_string(), self.rules.len());
        self.rules.push(ExtractedStyleRule {
            declarations: declarations.to_string(),
            class_name: class_name.clone(),
            origins: vec![origin],
        });
        (class_name, true)
    }

    pub fn rules(&self) -> &[ExtractedStyleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// 样式提取结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleExtraction {
    /// 提取出的 CSS 文本（已去除首尾空白）
    pub css: String,
    /// 文档是否被修改
    pub changed: bool,
    /// 移除的 `<style>` 元素数量
    pub blocks: usize,
    /// 移除的 `style` 属性数量
    pub attributes: usize,
}

/// 可以安全放进 `/* ... */` 注释的文本：`*/` 改写为 `*\/`
pub fn comment_text(text: &str) -> String {
    text.replace("*/", "*\\/")
}

/// 从文档中提取样式
///
/// 先处理 `<style>` 元素，再处理 `style` 属性；两者都会修改传入的 DOM。
pub fn extract_styles(
    dom: &RcDom,
    registry: &mut StyleRegistry,
    source_label: &str,
) -> StyleExtraction {
    let mut extraction = StyleExtraction::default();
    let mut output = String::new();
    let source_label = comment_text(source_label);

    // 1. <style> 元素，原样搬运
    for style_node in find_elements_by_name(&dom.document, "style") {
        if !is_css_type(get_node_attr(&style_node, "type").as_deref()) {
            continue;
        }

        let content = get_text_content(&style_node);
        if is_blank(&content) {
            continue;
        }

        output.push_str(&format!("/* <style> from {} */\n", source_label));
        let body = content.trim_matches(WHITESPACES);
        match get_node_attr(&style_node, "media")
            .map(|media| media.trim().to_string())
            .filter(|media| !media.is_empty() && !media.eq_ignore_ascii_case("all"))
        {
            Some(media) => output.push_str(&format!("@media {} {{\n{}\n}}\n\n", media, body)),
            None => output.push_str(&format!("{}\n\n", body)),
        }

        detach_node(&style_node);
        extraction.blocks += 1;
        extraction.changed = true;
    }

    // 2. style 属性，去重后生成类
    let mut styled_elements: Vec<Handle> = Vec::new();
    walk_elements(&dom.document, &mut |element| {
        if get_node_attr(element, "style").is_some_and(|value| !is_blank(&value)) {
            styled_elements.push(element.clone());
        }
    });

    let mut header_written = false;
    for element in styled_elements {
        let raw = get_node_attr(&element, "style").unwrap_or_default();
        let declarations = normalize_declarations(&raw);
        let (class_name, is_new) = registry.register(&declarations, describe_element(&element));

        if is_new {
            if !header_written {
                output.push_str(&format!(
                    "/* inline style attributes from {} */\n",
                    source_label
                ));
                header_written = true;
            }
            output.push_str(&format_rule(&class_name, &declarations));
            output.push('\n');
        }

        add_class(&element, &class_name);
        set_node_attr(&element, "style", None);
        extraction.attributes += 1;
        extraction.changed = true;
    }

    extraction.css = output.trim().to_string();
    extraction
}

/// 规范化声明列表
///
/// 按 `;` 拆分（忽略括号与引号内的分号），逐条去除空白、丢弃空项、排序后以 `;` 连接。
/// 无法识别的片段原样保留。
///
/// ```rust
/// use detangle::parsers::css::normalize_declarations;
///
/// assert_eq!(
///     normalize_declarations("font-weight: bold;  COLOR:red;"),
///     normalize_declarations("color:red;font-weight:bold"),
/// );
/// ```
pub fn normalize_declarations(style: &str) -> String {
    let mut declarations: Vec<String> = split_declarations(style)
        .into_iter()
        .map(normalize_declaration)
        .filter(|declaration| !declaration.is_empty())
        .collect();
    declarations.sort();
    declarations.join(";")
}

/// 由规范化声明计算类名
pub fn class_name_for(declarations: &str) -> String {
    format!("{}{}", CLASS_PREFIX, hex_digest(declarations, CLASS_HASH_LEN))
}

fn format_rule(class_name: &str, declarations: &str) -> String {
    if declarations.is_empty() {
        format!(".{} {{}}", class_name)
    } else {
        format!(".{} {{ {}; }}", class_name, declarations)
    }
}

fn is_css_type(type_attr: Option<&str>) -> bool {
    match type_attr.map(|value| value.trim_matches(WHITESPACES)) {
        None | Some("") => true,
        Some(value) => value.eq_ignore_ascii_case("text/css"),
    }
}

fn describe_element(element: &Handle) -> String {
    let name = get_node_name(element).unwrap_or("?");
    match get_node_attr(element, "id").filter(|id| !is_blank(id)) {
        Some(id) => format!("{}#{}", name, id.trim_matches(WHITESPACES)),
        None => name.to_string(),
    }
}

fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, c) in style.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ';' if depth == 0 => {
                    parts.push(&style[start..index]);
                    start = index + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&style[start..]);
    parts
}

fn normalize_declaration(declaration: &str) -> String {
    let declaration = declaration.trim_matches(WHITESPACES);
    match declaration.split_once(':') {
        Some((property, value)) => {
            let property = property.trim_matches(WHITESPACES);
            // 自定义属性区分大小写
            let property = if property.starts_with("--") {
                property.to_string()
            } else {
                property.to_ascii_lowercase()
            };
            format!("{}:{}", property, collapse_whitespace(value.trim_matches(WHITESPACES)))
        }
        None => declaration.to_string(),
    }
}

fn collapse_whitespace(value: &str) -> String {
    let mut collapsed = String::with_capacity(value.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for c in value.chars() {
        if quote.is_none() && WHITESPACES.contains(&c) {
            pending_space = true;
            continue;
        }
        if pending_space {
            collapsed.push(' ');
            pending_space = false;
        }
        match quote {
            Some(q) if c == q => quote = None,
            None if c == '"' || c == '\'' => quote = Some(c),
            _ => {}
        }
        collapsed.push(c);
    }

    collapsed
}
