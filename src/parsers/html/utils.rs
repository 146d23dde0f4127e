/// ASCII 空白字符
pub const WHITESPACES: &[char] = &[' ', '\t', '\n', '\x0c', '\r'];

/// 检查文本是否只包含 HTML 空白
pub fn is_blank(text: &str) -> bool {
    text.trim_matches(WHITESPACES).is_empty()
}
