//! 路径工具
//!
//! 所有函数都是纯词法操作，不访问文件系统，因此可用于尚未创建的输出目录。

use std::path::{Component, Path, PathBuf};

/// 将分隔符规范化为 `/`
///
/// 反斜杠转换为正斜杠，合并重复的分隔符，去掉 `./` 段以及开头的 `/`。
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<&str>>()
        .join("/")
}

/// 词法规范化：消除 `.` 与 `..`，不解析符号链接
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // 根目录之上没有父目录
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}

/// 以 `/` 连接路径的各个普通段
pub fn path_to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<String>>()
        .join("/")
}

/// 计算从目录 `from_dir` 到 `to` 的相对路径，始终使用 `/` 分隔
///
/// ```
/// use std::path::Path;
/// use detangle::utils::paths::relative_path;
///
/// let href = relative_path(Path::new("/site/pages"), Path::new("/site/dist/css/a.css"));
/// assert_eq!(href, "../dist/css/a.css");
/// ```
pub fn relative_path(from_dir: &Path, to: &Path) -> String {
    let from = lexical_normalize(from_dir);
    let to = lexical_normalize(to);

    let from_parts: Vec<Component> = from.components().collect();
    let to_parts: Vec<Component> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for part in &from_parts[common..] {
        if matches!(part, Component::Normal(_) | Component::ParentDir) {
            segments.push("..".to_string());
        }
    }
    for part in &to_parts[common..] {
        if let Component::Normal(segment) = part {
            segments.push(segment.to_string_lossy().into_owned());
        }
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// 将 `path` 从 `root` 映射到 `mirror_root` 下的相同相对位置
///
/// 不在 `root` 之下的路径返回 `None`。
pub fn rebase(path: &Path, root: &Path, mirror_root: &Path) -> Option<PathBuf> {
    path.strip_prefix(root)
        .ok()
        .map(|relative| mirror_root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators("pages\\blog\\a.html"), "pages/blog/a.html");
        assert_eq!(normalize_separators("./pages//a.html"), "pages/a.html");
        assert_eq!(normalize_separators("/abs/a.html"), "abs/a.html");
        assert_eq!(normalize_separators(""), "");
    }

    #[test]
    fn test_lexical_normalize() {
        assert_eq!(
            lexical_normalize(Path::new("/site/./pages/../dist/css")),
            PathBuf::from("/site/dist/css")
        );
        assert_eq!(lexical_normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(lexical_normalize(Path::new("../a")), PathBuf::from("../a"));
    }

    #[test]
    fn test_relative_path_same_dir() {
        assert_eq!(
            relative_path(Path::new("/site/pages"), Path::new("/site/pages/a.js")),
            "a.js"
        );
    }

    #[test]
    fn test_relative_path_sibling_tree() {
        assert_eq!(
            relative_path(
                Path::new("/site/pages/blog"),
                Path::new("/site/dist/css/pages_blog_a.min.css")
            ),
            "../../dist/css/pages_blog_a.min.css"
        );
    }

    #[test]
    fn test_relative_path_descendant() {
        assert_eq!(
            relative_path(Path::new("/site"), Path::new("/site/js/index.js")),
            "js/index.js"
        );
    }

    #[test]
    fn test_relative_path_unnormalized_inputs() {
        assert_eq!(
            relative_path(Path::new("/site/pages/../pages"), Path::new("/site/./js/a.js")),
            "../js/a.js"
        );
    }

    #[test]
    fn test_path_to_slash() {
        assert_eq!(path_to_slash(Path::new("pages/blog/a.html")), "pages/blog/a.html");
    }

    #[test]
    fn test_rebase() {
        assert_eq!(
            rebase(
                Path::new("/site/pages/a.html"),
                Path::new("/site"),
                Path::new("/out")
            ),
            Some(PathBuf::from("/out/pages/a.html"))
        );
        assert_eq!(
            rebase(Path::new("/other/a.html"), Path::new("/site"), Path::new("/out")),
            None
        );
    }
}
