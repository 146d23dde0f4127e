//! 样式表链接注入
//!
//! 根据 HTML 的最终输出位置与编译后 CSS 的位置计算相对 href，
//! 并保证文档中只存在一个指向该 href 的 `<link rel="stylesheet">`。

use std::path::Path;

use markup5ever_rcdom::RcDom;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::parsers::html::{
    append_child, create_html_element, ensure_head, find_elements_by_name, get_node_attr,
    is_stylesheet_rel, WHITESPACES,
};
use crate::utils::paths::relative_path;

/// 路径段中需要编码的字符
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 对以 `/` 分隔的相对路径逐段进行百分号编码
///
/// ```rust
/// use detangle::parsers::link_injector::encode_href;
///
/// assert_eq!(encode_href("../my css/a#1.css"), "../my%20css/a%231.css");
/// ```
pub fn encode_href(relative: &str) -> String {
    relative
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT_ENCODE_SET).to_string())
        .collect::<Vec<String>>()
        .join("/")
}

/// 计算从 HTML 输出位置到编译后 CSS 的 href
pub fn stylesheet_href(
    html_output_path: &Path,
    css_base_name: &str,
    compiled_css_dir: &Path,
    compiled_suffix: &str,
) -> String {
    let target = compiled_css_dir.join(format!("{}{}", css_base_name, compiled_suffix));
    let from_dir = html_output_path.parent().unwrap_or_else(|| Path::new(""));
    encode_href(&relative_path(from_dir, &target))
}

/// 确保文档引用了编译后的样式表；新增链接时返回 `true`
pub fn ensure_stylesheet_link(
    dom: &RcDom,
    html_output_path: &Path,
    css_base_name: &str,
    compiled_css_dir: &Path,
    compiled_suffix: &str,
) -> bool {
    let href = stylesheet_href(html_output_path, css_base_name, compiled_css_dir, compiled_suffix);

    for link in find_elements_by_name(&dom.document, "link") {
        let rel = get_node_attr(&link, "rel").unwrap_or_default();
        let existing = get_node_attr(&link, "href").unwrap_or_default();
        if is_stylesheet_rel(&rel) && existing.trim_matches(WHITESPACES) == href {
            tracing::debug!("已存在样式表链接 {}，跳过", href);
            return false;
        }
    }

    let Some(head) = ensure_head(dom) else {
        tracing::warn!("文档缺少 <html> 元素，无法插入样式表链接 {}", href);
        return false;
    };

    let link = create_html_element(dom, "link", &[("rel", "stylesheet"), ("href", &href)]);
    append_child(&head, link);
    tracing::info!("插入样式表链接 {}", href);
    true
}
