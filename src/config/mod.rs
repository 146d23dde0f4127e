//! 配置模块
//!
//! 配置来源按优先级从低到高：默认值、配置文件（TOML 或 JSON）、`.env`、环境变量、命令行。

pub mod manager;

pub use manager::{ConfigManager, Layout, OutputStrategy, RefactorConfig, ToolCommand, ToolsConfig};

/// 配置常量
pub mod constants {
    /// 默认 HTML 匹配模式
    pub const DEFAULT_HTML_PATTERN: &str = "**/*.html";
    /// 默认忽略模式
    pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["**/node_modules/**", "**/.git/**"];
    /// 默认图片匹配模式
    pub const DEFAULT_IMAGE_PATTERNS: &[&str] = &["**/*.{png,jpg,jpeg,gif,svg,webp,avif}"];

    pub const DEFAULT_STYLES_OUTPUT_DIR: &str = "styles";
    pub const DEFAULT_JS_CENTRAL_OUTPUT_DIR: &str = "js";
    pub const DEFAULT_COMPILED_CSS_LINK_DIR: &str = "dist/css";
    pub const DEFAULT_COMPILED_CSS_SUFFIX: &str = ".min.css";
    pub const DEFAULT_JS_DIST_DIR: &str = "dist/js";
    pub const DEFAULT_IMAGE_DIST_DIR: &str = "dist/images";

    pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 100;
    /// 文件系统通常允许的最大文件名长度
    pub const MAX_FILENAME_LENGTH_LIMIT: usize = 255;
    pub const DEFAULT_MAX_CONCURRENT_DOCUMENTS: usize = 8;

    /// 外部工具参数中的占位符
    pub const INPUT_PLACEHOLDER: &str = "{input}";
    pub const OUTPUT_PLACEHOLDER: &str = "{output}";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "detangle.toml",
        ".detangle.toml",
        "detangle.json",
        "~/.config/detangle/config.toml",
    ];

    // .env 文件搜索顺序，第一个存在的生效
    pub const DOTENV_FILES: &[&str] = &[".env.local", ".env"];
}
