//! 文件名生成器
//!
//! 把 HTML 文档路径转换为经过清理、长度受限、可区分的基础名称。
//! 基础名称同时决定提取出的 CSS/JS 文件名和编译后 CSS 的文件名，
//! 因此同一路径与同一策略必须始终得到同一名称，重复运行才能收敛。

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use super::paths::normalize_separators;

/// 截断后附加的哈希长度（十六进制字符数）
pub const HASH_SUFFIX_LEN: usize = 8;

/// 允许配置的最小长度，保证截断后仍能容纳 `x_` 加哈希
pub const MIN_FILENAME_LENGTH: usize = 16;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").expect("valid regex"));
static REPEATED_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("valid regex"));

/// 命名策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    /// 计算相对路径所用的根目录
    pub root: PathBuf,
    /// 按顺序尝试剥离的路径前缀，第一个匹配者生效
    pub strip_prefixes: Vec<String>,
    /// 基础名称的最大长度
    pub max_len: usize,
}

impl NamingPolicy {
    pub fn new(root: impl Into<PathBuf>, strip_prefixes: Vec<String>, max_len: usize) -> Self {
        Self {
            root: root.into(),
            strip_prefixes,
            max_len: max_len.max(MIN_FILENAME_LENGTH),
        }
    }
}

/// 由文档路径推导基础名称
///
/// ```
/// use detangle::utils::naming::{derive_base_name, NamingPolicy};
/// use std::path::Path;
///
/// let policy = NamingPolicy::new("/site", vec![], 64);
/// assert_eq!(derive_base_name(Path::new("/site/pages/about.html"), &policy), "pages_about");
/// ```
pub fn derive_base_name(path: &Path, policy: &NamingPolicy) -> String {
    let relative = match path.strip_prefix(&policy.root) {
        Ok(relative) => relative,
        Err(_) => {
            tracing::debug!(
                "{} 不在根目录 {} 下，按原路径命名",
                path.display(),
                policy.root.display()
            );
            path
        }
    };

    let normalized = normalize_separators(&relative.to_string_lossy());
    let stripped = strip_first_prefix(&normalized, &policy.strip_prefixes);
    let (dir, stem) = split_dir_and_stem(stripped);

    let candidate = if dir.is_empty() {
        stem.to_string()
    } else {
        format!("{}_{}", dir.replace('/', "_"), stem)
    };

    let sanitized = sanitize(&candidate);
    if sanitized.is_empty() {
        let fallback = format!("page_{}", short_hash(&normalized));
        tracing::debug!("{} 无法生成有效名称，使用 {}", normalized, fallback);
        return fallback;
    }

    bound_length(sanitized, &candidate, policy.max_len)
}

/// 清理名称：非法字符替换为 `_`，合并连续的 `_`，去掉首尾的 `_` 与 `.`
pub fn sanitize(candidate: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(candidate, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&replaced, "_");
    collapsed
        .trim_matches(|c| c == '_' || c == '.')
        .to_string()
}

/// SHA-256 十六进制摘要的前 `HASH_SUFFIX_LEN` 个字符
pub fn short_hash(text: &str) -> String {
    hex_digest(text, HASH_SUFFIX_LEN)
}

/// SHA-256 十六进制摘要的前 `len` 个字符（最多 64 个）
pub fn hex_digest(text: &str, len: usize) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest.iter() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex.truncate(len);
    hex
}

fn strip_first_prefix<'a>(relative: &'a str, prefixes: &[String]) -> &'a str {
    let mut matching = prefixes.iter().filter_map(|prefix| {
        let prefix = normalize_separators(prefix);
        if prefix.is_empty() {
            return None;
        }
        relative
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .map(|rest| (prefix, rest))
    });

    match matching.next() {
        Some((prefix, rest)) => {
            if let Some((other, _)) = matching.next() {
                tracing::debug!(
                    "{} 同时匹配前缀 {:?} 与 {:?}，使用第一个",
                    relative,
                    prefix,
                    other
                );
            }
            rest
        }
        None => relative,
    }
}

fn split_dir_and_stem(relative: &str) -> (&str, &str) {
    let (dir, file) = match relative.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", relative),
    };
    let stem = match file.rsplit_once('.') {
        Some((stem, _extension)) => stem,
        None => file,
    };
    (dir, stem)
}

fn bound_length(name: String, original: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name;
    }

    // 清理后的名称只含 ASCII，按字节截断安全
    let keep = max_len - 1 - HASH_SUFFIX_LEN;
    let head = name[..keep].trim_end_matches(|c| c == '_' || c == '.');
    let bounded = format!("{}_{}", head, short_hash(original));

    tracing::info!(
        "名称过长（{} > {}），截断为 {}",
        name.len(),
        max_len,
        bounded
    );
    bounded
}
