//! HTML解析和处理模块
//!
//! - `utils`: 基础工具函数和常量
//! - `parser`: `<link>` 关系解析
//! - `dom`: 基础DOM操作
//! - `metadata`: 文档元数据处理
//! - `serializer`: 序列化功能

pub mod dom;
pub mod metadata;
pub mod parser;
pub mod serializer;
pub mod utils;

pub use dom::{
    add_class, append_child, clear_children, create_html_element, detach_node, ensure_head,
    find_elements_by_name, find_nodes, get_child_node_by_name, get_node_attr, get_node_name,
    get_parent_node, get_text_content, html_to_dom, is_html_element, set_node_attr, walk_elements,
};
pub use metadata::{get_charset, parse_content_type};
pub use parser::{is_stylesheet_rel, parse_link_type, LinkType};
pub use serializer::serialize_document;
pub use utils::{is_blank, WHITESPACES};
