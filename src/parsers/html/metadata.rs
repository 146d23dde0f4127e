//! HTML 文档元数据处理模块
//!
//! 目前只负责读取文档声明的字符编码，保证重写后的文档以原编码写回。

use markup5ever_rcdom::Handle;

use super::dom::{find_nodes, get_node_attr};

/// 获取文档字符编码
///
/// 支持两种格式：
/// 1. HTML5 格式：`<meta charset="utf-8">`
/// 2. HTML4 格式：`<meta http-equiv="content-type" content="text/html; charset=utf-8">`
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, &["html", "head", "meta"]).iter() {
        if let Some(meta_charset_node_attr_value) = get_node_attr(meta_node, "charset") {
            // 处理 <meta charset="..." /> 格式
            return Some(meta_charset_node_attr_value);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(meta_content_type_node_attr_value) = get_node_attr(meta_node, "content") {
                // 处理 <meta http-equiv="content-type" content="text/html; charset=..." /> 格式
                let (_media_type, charset) = parse_content_type(&meta_content_type_node_attr_value);
                return Some(charset);
            }
        }
    }

    None
}

/// 解析 Content-Type 值，返回 (媒体类型, 字符集)
pub fn parse_content_type(content_type: &str) -> (String, String) {
    let mut media_type = String::new();
    let mut charset = String::new();

    let parts: Vec<&str> = content_type.split(';').collect();

    if !parts.is_empty() {
        media_type = parts[0].trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("charset=") {
            charset = value.trim().trim_matches('"').to_string();
        }
    }

    (media_type, charset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn test_get_charset_html5() {
        let dom = html_to_dom(b"<html><head><meta charset=\"iso-8859-1\"></head></html>", "utf-8")
            .unwrap();
        assert_eq!(get_charset(&dom.document), Some("iso-8859-1".to_string()));
    }

    #[test]
    fn test_get_charset_http_equiv() {
        let dom = html_to_dom(
            b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=shift_jis\"></head></html>",
            "utf-8",
        )
        .unwrap();
        assert_eq!(get_charset(&dom.document), Some("shift_jis".to_string()));
    }

    #[test]
    fn test_get_charset_absent() {
        let dom = html_to_dom(b"<p>x</p>", "utf-8").unwrap();
        assert_eq!(get_charset(&dom.document), None);
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            parse_content_type("text/html; charset=\"utf-8\"; boundary=x"),
            ("text/html".to_string(), "utf-8".to_string())
        );
        assert_eq!(parse_content_type(""), (String::new(), String::new()));
    }
}
