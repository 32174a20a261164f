use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "DXFSVG_CONFIG";

/// 工作目录下的默认配置文件。
pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

/// 配置文件路径的来处，错误信息与日志据此指明是哪一项设置给出了路径。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    CommandLine,
    Environment,
    WorkingDir,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::CommandLine => f.write_str("--config 参数"),
            ConfigOrigin::Environment => write!(f, "环境变量 {CONFIG_ENV}"),
            ConfigOrigin::WorkingDir => write!(f, "工作目录下的 {DEFAULT_CONFIG_FILE}"),
        }
    }
}

/// 本次运行实际采用的配置来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File { origin: ConfigOrigin, path: PathBuf },
    Builtin,
}

impl ConfigSource {
    /// 优先级：`--config` > `DXFSVG_CONFIG` > `./config/default.toml` > 内建默认值。
    pub fn resolve(override_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = override_path {
            return Ok(ConfigSource::File {
                origin: ConfigOrigin::CommandLine,
                path,
            });
        }
        let working_dir = env::current_dir().map_err(|source| ConfigError::WorkingDir { source })?;
        Ok(Self::discover_in(env::var_os(CONFIG_ENV), &working_dir))
    }

    /// 环境变量值为空时视为未设置；默认文件不存在时回退到内建默认值。
    pub fn discover_in(env_value: Option<OsString>, working_dir: &Path) -> Self {
        if let Some(path) = env_value.filter(|value| !value.is_empty()) {
            return ConfigSource::File {
                origin: ConfigOrigin::Environment,
                path: PathBuf::from(path),
            };
        }
        let default_path = working_dir.join(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            ConfigSource::File {
                origin: ConfigOrigin::WorkingDir,
                path: default_path,
            }
        } else {
            ConfigSource::Builtin
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File { path, .. } => Some(path),
            ConfigSource::Builtin => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File { origin, path } => write!(f, "{} ({})", path.display(), origin),
            ConfigSource::Builtin => f.write_str("内建默认值"),
        }
    }
}

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

impl AppConfig {
    /// 按来源加载；`Builtin` 直接返回默认配置。
    pub fn load(source: &ConfigSource) -> Result<Self, ConfigError> {
        match source {
            ConfigSource::File { origin, path } => Self::read(*origin, path),
            ConfigSource::Builtin => Ok(Self::default()),
        }
    }

    /// 从显式路径加载配置，等同于 `--config PATH`。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::read(ConfigOrigin::CommandLine, path.as_ref())
    }

    fn read(origin: ConfigOrigin, path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            origin,
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            origin,
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 输出视口与嵌入设置。
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_width")]
    pub viewport_width: f64,
    #[serde(default = "OutputConfig::default_height")]
    pub viewport_height: f64,
    /// 设置后输出交给嵌入模板包装。
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub center_drawing: bool,
}

impl OutputConfig {
    fn default_width() -> f64 {
        800.0
    }

    fn default_height() -> f64 {
        600.0
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            viewport_width: Self::default_width(),
            viewport_height: Self::default_height(),
            identifier: None,
            center_drawing: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub image_roots: Vec<PathBuf>,
    /// 为 `true` 时把图像读入并以 data URI 内嵌，否则原样引用路径。
    #[serde(default = "ResourceConfig::default_embed_images")]
    pub embed_images: bool,
}

impl ResourceConfig {
    fn default_embed_images() -> bool {
        true
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            image_roots: Vec::new(),
            embed_images: Self::default_embed_images(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败（路径来自{origin}）: {source}")]
    Io {
        origin: ConfigOrigin,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败（路径来自{origin}）: {source}")]
    Parse {
        origin: ConfigOrigin,
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("获取当前工作目录失败，无法查找 config/default.toml: {source}")]
    WorkingDir {
        #[source]
        source: std::io::Error,
    },
}
