//! HTML `<link>` 关系解析
//!
//! 解析 `rel` 属性中以空白分隔的链接类型，用于判断文档中已经存在的样式表链接。

/// HTML链接类型枚举
#[derive(Debug, PartialEq, Eq)]
pub enum LinkType {
    /// 备用版本链接，与 `stylesheet` 组合时表示备用样式表
    Alternate,
    /// 预加载资源
    Preload,
    /// CSS样式表
    Stylesheet,
}

/// 解析HTML链接的rel属性值
///
/// 不区分大小写，不支持的rel值被忽略。
///
/// ```rust
/// # use detangle::parsers::html::parser::{parse_link_type, LinkType};
/// let types = parse_link_type("Alternate STYLESHEET");
/// assert_eq!(types, vec![LinkType::Alternate, LinkType::Stylesheet]);
/// ```
pub fn parse_link_type(link_attr_rel_value: &str) -> Vec<LinkType> {
    let mut types: Vec<LinkType> = vec![];

    for link_attr_rel_type in link_attr_rel_value.split_whitespace() {
        if link_attr_rel_type.eq_ignore_ascii_case("alternate") {
            types.push(LinkType::Alternate);
        } else if link_attr_rel_type.eq_ignore_ascii_case("preload") {
            types.push(LinkType::Preload);
        } else if link_attr_rel_type.eq_ignore_ascii_case("stylesheet") {
            types.push(LinkType::Stylesheet);
        }
    }

    types
}

/// rel 属性是否声明了样式表
pub fn is_stylesheet_rel(link_attr_rel_value: &str) -> bool {
    parse_link_type(link_attr_rel_value).contains(&LinkType::Stylesheet)
}
