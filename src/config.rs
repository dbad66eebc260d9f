//! Runtime configuration.
//!
//! Every field has a default, so a missing or partial `config.json` is fine. The file is looked up
//! at `$HELLO_TRIANGLE_CONFIG` first, then in the user's config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::abs::{ShaderError, ShaderSource, ShaderStage};

pub const CONFIG_ENV_VAR: &str = "HELLO_TRIANGLE_CONFIG";

pub const INLINE_VERTEX_SHADER: &str = r#"#version 330 core
layout (location = 0) in vec3 aPos;

void main() {
    gl_Position = vec4(aPos, 1.0);
}
"#;

pub const INLINE_FRAGMENT_SHADER: &str = r#"#version 330 core
out vec4 FragColor;

void main() {
    FragColor = vec4(1.0, 0.5, 0.2, 1.0);
}
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Creates the window without showing it.
    pub hidden: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "OpenGL".to_owned(),
            hidden: false,
        }
    }
}

/// Where the triangle's shaders come from.
///
/// A missing `mode` means `files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase", from = "RawShaderConfig")]
pub enum ShaderConfig {
    /// No shaders; every frame is only cleared.
    None,
    /// The sources compiled into the binary.
    Inline,
    /// Sources read from disk at startup.
    Files { vertex: PathBuf, fragment: PathBuf },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ShaderMode {
    None,
    Inline,
    #[default]
    Files,
}

/// The on-disk shape of [`ShaderConfig`], with every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawShaderConfig {
    mode: ShaderMode,
    vertex: Option<PathBuf>,
    fragment: Option<PathBuf>,
}

impl From<RawShaderConfig> for ShaderConfig {
    fn from(raw: RawShaderConfig) -> Self {
        match raw.mode {
            ShaderMode::None => ShaderConfig::None,
            ShaderMode::Inline => ShaderConfig::Inline,
            ShaderMode::Files => ShaderConfig::Files {
                vertex: raw.vertex.unwrap_or_else(default_vertex_path),
                fragment: raw.fragment.unwrap_or_else(default_fragment_path),
            },
        }
    }
}

fn default_vertex_path() -> PathBuf {
    PathBuf::from("vertex.glsl")
}

fn default_fragment_path() -> PathBuf {
    PathBuf::from("fragment.glsl")
}

impl Default for ShaderConfig {
    fn default() -> Self {
        ShaderConfig::Files {
            vertex: default_vertex_path(),
            fragment: default_fragment_path(),
        }
    }
}

impl ShaderConfig {
    /// Loads the vertex and fragment sources, or `None` if no shaders are configured.
    pub fn sources(&self) -> Result<Option<(ShaderSource, ShaderSource)>, ShaderError> {
        match self {
            ShaderConfig::None => Ok(None),
            ShaderConfig::Inline => Ok(Some((
                ShaderSource::inline(ShaderStage::Vertex, INLINE_VERTEX_SHADER),
                ShaderSource::inline(ShaderStage::Fragment, INLINE_FRAGMENT_SHADER),
            ))),
            ShaderConfig::Files { vertex, fragment } => Ok(Some((
                ShaderSource::from_file(ShaderStage::Vertex, vertex)?,
                ShaderSource::from_file(ShaderStage::Fragment, fragment)?,
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub clear_color: [f32; 4],
    pub shaders: ShaderConfig,
    pub log_level: log::LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            clear_color: [0.2, 0.2, 0.2, 1.0],
            shaders: ShaderConfig::default(),
            log_level: log::LevelFilter::Info,
        }
    }
}

impl Config {
    pub fn from_json(path: &Path, json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the config at `path`. A missing file yields `Ok(None)`.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(path, &json).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// The path the config is loaded from.
    pub fn path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|dir| dir.join("hello-triangle").join("config.json")))
    }

    /// Loads the config, falling back to the defaults.
    ///
    /// Runs before logging is set up, so a broken config is returned alongside the defaults for
    /// the caller to report.
    pub fn load() -> (Self, Option<ConfigError>) {
        let Some(path) = Self::path() else {
            return (Self::default(), None);
        };
        match Self::read(&path) {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(e) => (Self::default(), Some(e)),
        }
    }
}
