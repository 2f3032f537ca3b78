use serde::{Deserialize, Serialize};

/// Top-level contents of `sanitizer-reports.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub frames: FrameConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Lines kept per block; further lines still drive the state machine.
    #[serde(default = "default_max_block_lines")]
    pub max_block_lines: usize,
    /// Treat text before a start marker as a log prefix shared by the block.
    #[serde(default = "default_true")]
    pub strip_prefixes: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            max_block_lines: default_max_block_lines(),
            strip_prefixes: true,
        }
    }
}

#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintConfig {
    #[serde(default = "default_true")]
    pub strip_addresses: bool,
    #[serde(default = "default_true")]
    pub strip_ids: bool,
    #[serde(default = "default_true")]
    pub strip_line_numbers: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            strip_addresses: true,
            strip_ids: true,
            strip_line_numbers: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Path fragments identifying project code in stack frames.
    #[serde(default)]
    pub project_markers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Console,
    Csv,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub path: Option<String>,
}

const fn default_true() -> bool { true }
const fn default_max_block_lines() -> usize { 4096 }
