use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::audio::spectrum::FrameParams;
use crate::cli::Cli;
use crate::error::ConfigError;

const CONFIG_FILE: &str = "songstats.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default = "default_true")]
    pub sort: bool,
    #[serde(default)]
    pub fail_on_empty: bool,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            extensions: default_extensions(),
            case_sensitive: true,
            sort: true,
            fail_on_empty: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_size: default_frame_size(),
            hop_size: default_hop_size(),
            jobs: default_jobs(),
        }
    }
}

fn default_extensions() -> Vec<String> { vec!["mp3".into(), "wav".into()] }
fn default_true() -> bool { true }
fn default_output_path() -> PathBuf { PathBuf::from("song_analysis_results.csv") }
fn default_sample_rate() -> u32 { 22050 }
fn default_frame_size() -> usize { 2048 }
fn default_hop_size() -> usize { 512 }
fn default_jobs() -> usize { 1 }

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Explicit path, else ./songstats.toml, else the per-user config file.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("songstats").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("songstats").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// Everything one batch run needs, after CLI and config file are merged.
#[derive(Clone, Debug)]
pub struct Settings {
    pub input_directory: PathBuf,
    pub output_path: PathBuf,
    /// Lower-cased when matching is case-insensitive; never carry a leading dot
    pub extensions: Vec<String>,
    pub case_sensitive: bool,
    pub sort: bool,
    pub fail_on_empty: bool,
    pub sample_rate: u32,
    pub frames: FrameParams,
    pub jobs: usize,
    pub show_progress: bool,
}

impl Settings {
    /// CLI flags win over the config file, which wins over built-in defaults.
    pub fn resolve(cli: &Cli, config: Config) -> Result<Self, ConfigError> {
        let input_directory = cli
            .input
            .clone()
            .or(config.input.directory)
            .ok_or(ConfigError::MissingInput)?;

        let case_sensitive = config.input.case_sensitive && !cli.case_insensitive;
        let raw_extensions = if cli.extensions.is_empty() {
            config.input.extensions
        } else {
            cli.extensions.clone()
        };
        let extensions = normalize_extensions(raw_extensions, case_sensitive);
        if extensions.is_empty() {
            return Err(ConfigError::Invalid("no file extensions to match".into()));
        }

        let settings = Self {
            input_directory,
            output_path: cli.output.clone().unwrap_or(config.output.path),
            extensions,
            case_sensitive,
            sort: config.input.sort && !cli.no_sort,
            fail_on_empty: config.input.fail_on_empty || cli.fail_on_empty,
            sample_rate: cli.sample_rate.unwrap_or(config.analysis.sample_rate),
            frames: FrameParams {
                frame_size: config.analysis.frame_size,
                hop_size: config.analysis.hop_size,
            },
            jobs: cli.jobs.unwrap_or(config.analysis.jobs),
            show_progress: !cli.no_progress,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if self.frames.frame_size == 0 || self.frames.hop_size == 0 {
            return Err(ConfigError::Invalid("frame_size and hop_size must be positive".into()));
        }
        if self.frames.hop_size > self.frames.frame_size {
            return Err(ConfigError::Invalid(format!(
                "hop_size {} exceeds frame_size {}",
                self.frames.hop_size, self.frames.frame_size
            )));
        }
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("jobs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Strip dots and blanks, fold case if asked, drop repeats keeping first order.
fn normalize_extensions(raw: Vec<String>, case_sensitive: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out: Vec<String> = raw
        .into_iter()
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .map(|e| if case_sensitive { e } else { e.to_lowercase() })
        .collect();
    out.retain(|e| seen.insert(e.clone()));
    out
}
