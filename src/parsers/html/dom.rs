use std::io;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, TendrilSink};
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::utils::WHITESPACES;

/// 将 HTML 字节按给定编码解码后转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> io::Result<RcDom> {
    let s: String = if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        string.to_string()
    } else {
        String::from_utf8_lossy(data).to_string()
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some((node_name, rest)) = node_names.split_first() else {
        return found_nodes;
    };

    if let NodeData::Element { ref name, .. } = node.data {
        if &*name.local == *node_name {
            if rest.is_empty() {
                found_nodes.push(node.clone());
            } else {
                for child_node in node.children.borrow().iter() {
                    found_nodes.append(&mut find_nodes(child_node, rest));
                }
            }
            return found_nodes;
        }
    }

    for child_node in node.children.borrow().iter() {
        found_nodes.append(&mut find_nodes(child_node, node_names));
    }

    found_nodes
}

/// 按文档顺序收集所有指定名称的元素
pub fn find_elements_by_name(node: &Handle, node_name: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    walk_elements(node, &mut |element| {
        if get_node_name(element) == Some(node_name) {
            found.push(element.clone());
        }
    });
    found
}

/// 以文档顺序（先序）访问所有元素节点
///
/// `<template>` 的内容位于独立片段中，不会被访问。
pub fn walk_elements(node: &Handle, visit: &mut dyn FnMut(&Handle)) {
    if let NodeData::Element { .. } = node.data {
        visit(node);
    }

    // 先复制子节点列表，允许回调修改属性
    let children: Vec<Handle> = node.children.borrow().iter().cloned().collect();
    for child_node in children.iter() {
        walk_elements(child_node, visit);
    }
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 是否为 HTML 命名空间中的元素（排除 SVG、MathML 内的同名元素）
pub fn is_html_element(node: &Handle) -> bool {
    match &node.data {
        NodeData::Element { name, .. } => name.ns == ns!(html),
        _ => false,
    }
}

/// 获取父节点
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 设置节点属性；`attr_value` 为 `None` 时移除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.as_deref() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value);
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            // Add new attribute (since originally the target node didn't have it)
            if let Some(attr_value) = attr_value {
                let name = LocalName::from(attr_name);

                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), name),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 向元素的 class 列表追加类名；已存在时返回 `false`
pub fn add_class(node: &Handle, class_name: &str) -> bool {
    let existing = get_node_attr(node, "class").unwrap_or_default();
    if existing.split(WHITESPACES).any(|class| class == class_name) {
        return false;
    }

    let trimmed = existing.trim_matches(WHITESPACES);
    let value = if trimmed.is_empty() {
        class_name.to_string()
    } else {
        format!("{} {}", trimmed, class_name)
    };
    set_node_attr(node, "class", Some(value));
    true
}

/// 拼接节点的直接文本子节点
pub fn get_text_content(node: &Handle) -> String {
    let mut text = String::new();
    for child_node in node.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child_node.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}

/// 移除节点的全部子节点
pub fn clear_children(node: &Handle) {
    for child_node in node.children.borrow_mut().drain(..) {
        child_node.parent.set(None);
    }
}

/// 将节点从其父节点中摘除
pub fn detach_node(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 追加子节点并维护父指针
pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// 在最前面插入子节点并维护父指针
pub fn prepend_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, child);
}

/// 创建 HTML 命名空间下的元素
pub fn create_html_element(dom: &RcDom, element_name: &str, attrs: &[(&str, &str)]) -> Handle {
    create_element(
        dom,
        QualName::new(None, ns!(html), LocalName::from(element_name)),
        attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*name)),
                value: format_tendril!("{}", value),
            })
            .collect(),
    )
}

/// 获取 `<head>`，不存在时在 `<html>` 开头创建一个
pub fn ensure_head(dom: &RcDom) -> Option<Handle> {
    let html = get_child_node_by_name(&dom.document, "html")?;
    if let Some(head) = get_child_node_by_name(&html, "head") {
        return Some(head);
    }

    let head = create_html_element(dom, "head", &[]);
    prepend_child(&html, head.clone());
    Some(head)
}
