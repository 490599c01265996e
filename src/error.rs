use std::path::PathBuf;

use thiserror::Error;

/// Why a single audio file could not be turned into a sample buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported or corrupt audio in {}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: symphonia::core::errors::Error,
    },
    #[error("no audio track in {}", path.display())]
    NoTrack { path: PathBuf },
    #[error("unknown sample rate in {}", path.display())]
    UnknownSampleRate { path: PathBuf },
    #[error("decoding {} failed", path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: symphonia::core::errors::Error,
    },
    #[error("resampling {} from {from} Hz to {to} Hz failed", path.display())]
    Resample {
        path: PathBuf,
        from: u32,
        to: u32,
        #[source]
        source: ResampleError,
    },
    #[error("{} contains no samples", path.display())]
    Empty { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("invalid sample rates {from} Hz -> {to} Hz")]
    InvalidRate { from: u32, to: u32 },
    #[error("failed to create resampler")]
    Construction(#[from] rubato::ResamplerConstructionError),
    #[error("resampler rejected a chunk")]
    Process(#[from] rubato::ResampleError),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot read input directory {}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no files with extensions [{}] in {}", extensions.join(", "), path.display())]
    EmptyInput {
        path: PathBuf,
        extensions: Vec<String>,
    },
    #[error("failed to start worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[cfg(test)]
    #[error("failed to read report from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no input directory given on the command line or in the config file")]
    MissingInput,
    #[error("invalid analysis settings: {0}")]
    Invalid(String),
}
