//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，用于覆盖配置文件中的设置

use std::env;
use std::fmt;
use std::path::PathBuf;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    /// 读取并解析变量；未设置时返回 `Ok(None)`
    fn get() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志过滤指令，语法与 `tracing_subscriber::EnvFilter` 相同
    pub struct LogFilter;
    impl EnvVar<String> for LogFilter {
        const NAME: &'static str = "DETANGLE_LOG";
        const DESCRIPTION: &'static str = "Log filter directives, e.g. `info` or `detangle=debug`";

        fn parse(value: &str) -> EnvResult<String> {
            let value = value.trim();
            if value.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Log filter must not be empty".to_string(),
                });
            }
            Ok(value.to_string())
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 重构流程相关环境变量
pub mod refactor {
    use super::*;

    /// 扫描根目录
    pub struct Root;
    impl EnvVar<PathBuf> for Root {
        const NAME: &'static str = "DETANGLE_ROOT";
        const DESCRIPTION: &'static str = "Directory scanned for HTML documents";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            let value = value.trim();
            if value.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Root directory must not be empty".to_string(),
                });
            }
            Ok(PathBuf::from(shellexpand::tilde(value).as_ref()))
        }
    }

    /// 配置文件路径
    pub struct ConfigPath;
    impl EnvVar<PathBuf> for ConfigPath {
        const NAME: &'static str = "DETANGLE_CONFIG";
        const DESCRIPTION: &'static str = "Explicit configuration file (TOML or JSON)";

        fn parse(value: &str) -> EnvResult<PathBuf> {
            Ok(PathBuf::from(shellexpand::tilde(value.trim()).as_ref()))
        }
    }

    /// 演练模式
    pub struct DryRun;
    impl EnvVar<bool> for DryRun {
        const NAME: &'static str = "DETANGLE_DRY_RUN";
        const DESCRIPTION: &'static str = "Log every decision but write nothing";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 覆盖 HTML 前先备份
    pub struct CreateBackups;
    impl EnvVar<bool> for CreateBackups {
        const NAME: &'static str = "DETANGLE_CREATE_BACKUPS";
        const DESCRIPTION: &'static str = "Copy HTML documents to <name>.bak before rewriting them";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 生成文件名的最大长度
    pub struct MaxFilenameLength;
    impl EnvVar<usize> for MaxFilenameLength {
        const NAME: &'static str = "DETANGLE_MAX_FILENAME_LENGTH";
        const DESCRIPTION: &'static str = "Upper bound for generated base names";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 16, 255)
        }
    }
}

/// 列出所有已知变量及其说明
pub fn describe_all() -> Vec<(&'static str, &'static str)> {
    vec![
        (core::LogFilter::NAME, core::LogFilter::DESCRIPTION),
        (core::NoColor::NAME, core::NoColor::DESCRIPTION),
        (refactor::Root::NAME, refactor::Root::DESCRIPTION),
        (refactor::ConfigPath::NAME, refactor::ConfigPath::DESCRIPTION),
        (refactor::DryRun::NAME, refactor::DryRun::DESCRIPTION),
        (
            refactor::CreateBackups::NAME,
            refactor::CreateBackups::DESCRIPTION,
        ),
        (
            refactor::MaxFilenameLength::NAME,
            refactor::MaxFilenameLength::DESCRIPTION,
        ),
    ]
}

fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is above maximum {}", num, max),
        });
    }

    Ok(num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_parsing() {
        // 测试各种布尔值格式
        assert!(refactor::DryRun::parse("true").unwrap());
        assert!(refactor::DryRun::parse("1").unwrap());
        assert!(refactor::DryRun::parse("YES").unwrap());
        assert!(refactor::DryRun::parse(" on ").unwrap());

        assert!(!refactor::CreateBackups::parse("false").unwrap());
        assert!(!refactor::CreateBackups::parse("0").unwrap());
        assert!(!refactor::CreateBackups::parse("NO").unwrap());

        // 测试无效值
        assert!(refactor::DryRun::parse("maybe").is_err());
    }

    #[test]
    fn test_numeric_validation() {
        assert_eq!(refactor::MaxFilenameLength::parse("64").unwrap(), 64);
        assert!(refactor::MaxFilenameLength::parse("8").is_err());
        assert!(refactor::MaxFilenameLength::parse("1000").is_err());
        assert!(refactor::MaxFilenameLength::parse("long").is_err());
    }

    #[test]
    fn test_log_filter_rejects_blank() {
        assert!(super::core::LogFilter::parse("  ").is_err());
        assert_eq!(super::core::LogFilter::parse("debug").unwrap(), "debug");
    }

    #[test]
    fn test_no_color_any_value() {
        assert!(super::core::NoColor::parse("1").unwrap());
        assert!(!super::core::NoColor::parse("").unwrap());
    }

    #[test]
    fn test_describe_all_lists_unique_names() {
        let names: Vec<&str> = describe_all().iter().map(|(name, _)| *name).collect();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }
}
