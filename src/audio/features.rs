use std::fmt;

use serde::{Deserialize, Serialize};

/// Mono samples at the batch-wide analysis rate
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// One of the twelve equal-tempered pitch classes.
///
/// Key detection reports only the dominant pitch class; there is no
/// major/minor distinction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Wraps any index onto the chromatic circle (0 = C).
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    pub fn label(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One report row per processed file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "Song")]
    pub song: String,
    #[serde(rename = "Key")]
    pub key: PitchClass,
    /// Mean frame RMS (linear amplitude)
    #[serde(rename = "RMSE")]
    pub rmse: f32,
    /// p90 - p10 of frame RMS in dB
    #[serde(rename = "Dynamic Range")]
    pub dynamic_range: f32,
    /// Hz
    #[serde(rename = "Spectral Centroid")]
    pub spectral_centroid: f32,
    /// Hz
    #[serde(rename = "Spectral Bandwidth")]
    pub spectral_bandwidth: f32,
    /// BPM
    #[serde(rename = "Tempo")]
    pub tempo: f32,
}
