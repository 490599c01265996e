use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "songstats", about = "Extract key, loudness, spectral and tempo features from a folder of songs into CSV")]
pub struct Cli {
    /// Directory holding the audio files (not searched recursively)
    pub input: Option<PathBuf>,

    /// Output CSV file [default: song_analysis_results.csv]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Recognised file extensions, without the dot [default: mp3,wav]
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Match extensions regardless of case (MP3 as well as mp3)
    #[arg(long)]
    pub case_insensitive: bool,

    /// Keep directory listing order instead of sorting by file name
    #[arg(long)]
    pub no_sort: bool,

    /// Analysis sample rate in Hz [default: 22050]
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Files analysed in parallel [default: 1]
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Exit with an error when no audio files match
    #[arg(long)]
    pub fail_on_empty: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Config file (TOML). Defaults to ./songstats.toml or the user config dir.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
