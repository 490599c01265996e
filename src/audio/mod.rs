pub mod analysis;
pub mod chroma;
pub mod decode;
pub mod features;
pub mod resample;
pub mod spectrum;
pub mod tempo;
