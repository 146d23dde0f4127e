//! 配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::constants;
use crate::error::{DetangleError, DetangleResult};
use crate::parsers::js::ScriptPlacement;
use crate::storage::WriteOptions;
use crate::utils::naming::{NamingPolicy, MIN_FILENAME_LENGTH};
use crate::utils::paths::{lexical_normalize, rebase};

/// 输出目录策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputStrategy {
    /// 统一放到一个目录
    Centralized,
    /// 与 HTML 文档放在同一目录
    RelativeToHtml,
}

/// 外部工具命令
///
/// `args` 中的 `{input}` 与 `{output}` 会被替换为实际路径。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// 替换占位符后的参数列表
    pub fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(constants::INPUT_PLACEHOLDER, &input)
                    .replace(constants::OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

/// 下游工具配置；未配置的工具以直接复制代替
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_compiler: Option<ToolCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub js_minifier: Option<ToolCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_optimizer: Option<ToolCommand>,
}

/// 重构配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefactorConfig {
    // 扫描
    pub root_dir: PathBuf,
    pub html_source_patterns: Vec<String>,
    pub ignore_patterns: Vec<String>,

    // 输出位置
    pub css_output_dir_strategy: OutputStrategy,
    pub styles_output_dir: PathBuf,
    pub js_output_dir_strategy: OutputStrategy,
    pub js_central_output_dir: PathBuf,
    pub compiled_css_link_dir: PathBuf,
    pub compiled_css_suffix: String,

    // 命名
    pub html_prefixes_to_omit_from_css_name: Vec<String>,
    pub max_filename_length: usize,

    // 写入行为
    pub create_backups: bool,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_output_dir: Option<PathBuf>,
    pub max_concurrent_documents: usize,

    // 下游
    pub js_dist_dir: PathBuf,
    pub image_source_patterns: Vec<String>,
    pub image_dist_dir: PathBuf,
    pub tools: ToolsConfig,
}

impl Default for RefactorConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            html_source_patterns: vec![constants::DEFAULT_HTML_PATTERN.to_string()],
            ignore_patterns: to_strings(constants::DEFAULT_IGNORE_PATTERNS),
            css_output_dir_strategy: OutputStrategy::Centralized,
            styles_output_dir: PathBuf::from(constants::DEFAULT_STYLES_OUTPUT_DIR),
            js_output_dir_strategy: OutputStrategy::RelativeToHtml,
            js_central_output_dir: PathBuf::from(constants::DEFAULT_JS_CENTRAL_OUTPUT_DIR),
            compiled_css_link_dir: PathBuf::from(constants::DEFAULT_COMPILED_CSS_LINK_DIR),
            compiled_css_suffix: constants::DEFAULT_COMPILED_CSS_SUFFIX.to_string(),
            html_prefixes_to_omit_from_css_name: Vec::new(),
            max_filename_length: constants::DEFAULT_MAX_FILENAME_LENGTH,
            create_backups: false,
            dry_run: false,
            mirror_output_dir: None,
            max_concurrent_documents: constants::DEFAULT_MAX_CONCURRENT_DOCUMENTS,
            js_dist_dir: PathBuf::from(constants::DEFAULT_JS_DIST_DIR),
            image_source_patterns: to_strings(constants::DEFAULT_IMAGE_PATTERNS),
            image_dist_dir: PathBuf::from(constants::DEFAULT_IMAGE_DIST_DIR),
            tools: ToolsConfig::default(),
        }
    }
}

impl RefactorConfig {
    /// 验证配置
    pub fn validate(&self) -> DetangleResult<()> {
        if self.html_source_patterns.is_empty() {
            return Err(DetangleError::Config(
                "htmlSourcePatterns must contain at least one pattern".to_string(),
            ));
        }

        if self.max_filename_length < MIN_FILENAME_LENGTH
            || self.max_filename_length > constants::MAX_FILENAME_LENGTH_LIMIT
        {
            return Err(DetangleError::Config(format!(
                "maxFilenameLength must be between {} and {}, got {}",
                MIN_FILENAME_LENGTH,
                constants::MAX_FILENAME_LENGTH_LIMIT,
                self.max_filename_length
            )));
        }

        if self.max_concurrent_documents == 0 {
            return Err(DetangleError::Config(
                "maxConcurrentDocuments must be greater than 0".to_string(),
            ));
        }

        if self.compiled_css_suffix.trim().is_empty() {
            return Err(DetangleError::Config(
                "compiledCssSuffix must not be empty".to_string(),
            ));
        }

        if self.css_output_dir_strategy == OutputStrategy::Centralized
            && self.styles_output_dir.as_os_str().is_empty()
        {
            return Err(DetangleError::Config(
                "stylesOutputDir is required by the centralized CSS strategy".to_string(),
            ));
        }

        if self.js_output_dir_strategy == OutputStrategy::Centralized
            && self.js_central_output_dir.as_os_str().is_empty()
        {
            return Err(DetangleError::Config(
                "jsCentralOutputDir is required by the centralized JS strategy".to_string(),
            ));
        }

        if let Some(mirror) = &self.mirror_output_dir {
            if lexical_normalize(&self.root_dir.join(mirror)) == lexical_normalize(&self.root_dir) {
                return Err(DetangleError::Config(
                    "mirrorOutputDir must differ from rootDir".to_string(),
                ));
            }
        }

        for (name, tool) in [
            ("cssCompiler", &self.tools.css_compiler),
            ("jsMinifier", &self.tools.js_minifier),
            ("imageOptimizer", &self.tools.image_optimizer),
        ] {
            if tool.as_ref().is_some_and(|tool| tool.program.trim().is_empty()) {
                return Err(DetangleError::Config(format!(
                    "tools.{}.program must not be empty",
                    name
                )));
            }
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) -> DetangleResult<()> {
        use crate::env::{refactor, EnvVar};

        if let Some(root) = refactor::Root::get()? {
            tracing::info!("环境变量覆盖根目录: {}", root.display());
            self.root_dir = root;
        }

        if let Some(dry_run) = refactor::DryRun::get()? {
            self.dry_run = dry_run;
        }

        if let Some(create_backups) = refactor::CreateBackups::get()? {
            self.create_backups = create_backups;
        }

        if let Some(max_len) = refactor::MaxFilenameLength::get()? {
            self.max_filename_length = max_len;
        }

        Ok(())
    }

    /// 规范化根目录后生成布局
    pub fn resolve(&self) -> DetangleResult<Layout> {
        let root = std::fs::canonicalize(&self.root_dir)
            .map_err(|source| DetangleError::io(&self.root_dir, source))?;
        Ok(self.resolve_against(&root))
    }

    /// 以给定的绝对根目录生成布局
    pub fn resolve_against(&self, root: &Path) -> Layout {
        let root = lexical_normalize(root);
        let under_root = |path: &Path| lexical_normalize(&root.join(path));

        Layout {
            css_strategy: self.css_output_dir_strategy,
            styles_dir: under_root(&self.styles_output_dir),
            js_strategy: self.js_output_dir_strategy,
            js_dir: under_root(&self.js_central_output_dir),
            compiled_css_dir: under_root(&self.compiled_css_link_dir),
            compiled_css_suffix: self.compiled_css_suffix.clone(),
            js_dist_dir: under_root(&self.js_dist_dir),
            image_dist_dir: under_root(&self.image_dist_dir),
            mirror_root: self.mirror_output_dir.as_deref().map(under_root),
            naming: NamingPolicy::new(
                root.clone(),
                self.html_prefixes_to_omit_from_css_name.clone(),
                self.max_filename_length,
            ),
            root,
        }
    }
}

/// 解析为绝对路径后的输出布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub css_strategy: OutputStrategy,
    pub styles_dir: PathBuf,
    pub js_strategy: OutputStrategy,
    pub js_dir: PathBuf,
    pub compiled_css_dir: PathBuf,
    pub compiled_css_suffix: String,
    pub js_dist_dir: PathBuf,
    pub image_dist_dir: PathBuf,
    pub mirror_root: Option<PathBuf>,
    pub naming: NamingPolicy,
}

impl Layout {
    /// 提取出的 CSS 源文件路径
    pub fn css_target(&self, html_path: &Path, base_name: &str) -> PathBuf {
        let file_name = format!("{}.css", base_name);
        match self.css_strategy {
            OutputStrategy::Centralized => self.styles_dir.join(file_name),
            OutputStrategy::RelativeToHtml => sibling(html_path, &file_name),
        }
    }

    /// 编译后的 CSS 路径
    pub fn compiled_css_path(&self, base_name: &str) -> PathBuf {
        self.compiled_css_dir
            .join(format!("{}{}", base_name, self.compiled_css_suffix))
    }

    pub fn script_placement(&self, html_path: &Path) -> ScriptPlacement {
        match self.js_strategy {
            OutputStrategy::Centralized => ScriptPlacement::centralized(html_path, &self.js_dir),
            OutputStrategy::RelativeToHtml => ScriptPlacement::co_located(html_path),
        }
    }

    /// HTML 最终所在位置：配置了镜像目录时为镜像中的路径
    pub fn html_output_path(&self, html_path: &Path) -> PathBuf {
        self.mirror_root
            .as_deref()
            .and_then(|mirror| rebase(html_path, &self.root, mirror))
            .unwrap_or_else(|| html_path.to_path_buf())
    }

    pub fn write_options(&self, config: &RefactorConfig) -> WriteOptions {
        WriteOptions {
            dry_run: config.dry_run,
            create_backups: config.create_backups,
            root: self.root.clone(),
            mirror_root: self.mirror_root.clone(),
        }
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: RefactorConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 在默认位置查找配置文件并应用环境变量
    pub fn new() -> DetangleResult<Self> {
        Self::load(None)
    }

    /// 加载配置
    ///
    /// 显式路径优先，其次是 `DETANGLE_CONFIG`，最后按 `CONFIG_PATHS` 查找。
    pub fn load(explicit: Option<&Path>) -> DetangleResult<Self> {
        use crate::env::{refactor, EnvVar};

        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        let explicit = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => refactor::ConfigPath::get()?,
        };

        let (mut config, source) = match explicit {
            Some(path) => {
                let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
                if !expanded.exists() {
                    return Err(DetangleError::Config(format!(
                        "config file {} does not exist",
                        expanded.display()
                    )));
                }
                (Self::load_from_file(&expanded)?, Some(expanded))
            }
            None => Self::search_config()?,
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(Self { config, source })
    }

    /// 直接使用给定配置
    pub fn from_config(config: RefactorConfig) -> DetangleResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source: None,
        })
    }

    pub fn config(&self) -> &RefactorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RefactorConfig {
        &mut self.config
    }

    pub fn into_config(self) -> RefactorConfig {
        self.config
    }

    /// 实际加载的配置文件
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn search_config() -> DetangleResult<(RefactorConfig, Option<PathBuf>)> {
        for path in constants::CONFIG_PATHS {
            let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());
            if expanded.exists() {
                tracing::info!("加载配置文件: {}", expanded.display());
                return Ok((Self::load_from_file(&expanded)?, Some(expanded)));
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok((RefactorConfig::default(), None))
    }

    /// 从指定文件加载配置；相对的 `rootDir` 以配置文件所在目录为基准
    pub fn load_from_file(path: &Path) -> DetangleResult<RefactorConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DetangleError::Config(format!("读取配置文件失败 {}: {}", path.display(), e)))?;

        let mut config: RefactorConfig =
            if path.extension().is_some_and(|extension| extension == "json") {
                serde_json::from_str(&content)
                    .map_err(|e| DetangleError::Config(format!("解析JSON配置失败: {}", e)))?
            } else {
                toml::from_str(&content)
                    .map_err(|e| DetangleError::Config(format!("解析TOML配置失败: {}", e)))?
            };

        if config.root_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.root_dir = parent.join(&config.root_dir);
            }
        }

        Ok(config)
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::DOTENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 示例配置（TOML）
    pub fn example_config() -> DetangleResult<String> {
        let config = RefactorConfig {
            tools: ToolsConfig {
                css_compiler: Some(ToolCommand::new(
                    "npx",
                    &["sass", "--style=compressed", "--no-source-map", "{input}", "{output}"],
                )),
                js_minifier: Some(ToolCommand::new(
                    "npx",
                    &["terser", "{input}", "--compress", "--mangle", "--output", "{output}"],
                )),
                image_optimizer: None,
            },
            ..RefactorConfig::default()
        };

        toml::to_string_pretty(&config)
            .map_err(|e| DetangleError::Config(format!("序列化配置失败: {}", e)))
    }
}

fn sibling(path: &Path, file_name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
