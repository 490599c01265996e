use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::audio::analysis::analyze;
use crate::audio::decode::decode_audio;
use crate::audio::features::FeatureRecord;
use crate::config::Settings;
use crate::error::{BatchError, DecodeError};
use crate::report::ReportTable;

/// A file that matched but could not be analysed.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub table: ReportTable,
    pub skipped: Vec<SkippedFile>,
}

pub struct BatchDriver {
    settings: Settings,
}

impl BatchDriver {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Matching regular files directly inside the input directory.
    pub fn discover(&self) -> Result<Vec<PathBuf>, BatchError> {
        let dir = &self.settings.input_directory;
        let read_err = |source: std::io::Error| BatchError::ReadDir {
            path: dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if matches_extension(&name, &self.settings.extensions, self.settings.case_sensitive) {
                files.push(path);
            }
        }

        if self.settings.sort {
            files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        }
        Ok(files)
    }

    /// Analyse every matching file; per-file failures are collected, not fatal.
    pub fn run(&self) -> Result<BatchOutcome, BatchError> {
        let files = self.discover()?;

        if files.is_empty() {
            if self.settings.fail_on_empty {
                return Err(BatchError::EmptyInput {
                    path: self.settings.input_directory.clone(),
                    extensions: self.settings.extensions.clone(),
                });
            }
            log::warn!(
                "No files with extensions [{}] in {}",
                self.settings.extensions.join(", "),
                self.settings.input_directory.display()
            );
            return Ok(BatchOutcome::default());
        }

        log::info!(
            "Found {} audio files in {} (jobs={})",
            files.len(),
            self.settings.input_directory.display(),
            self.settings.jobs
        );

        let pb = self.progress_bar(files.len());
        let process = |path: &PathBuf| {
            let result = self.process_file(path);
            pb.inc(1);
            result
        };

        let results: Vec<Result<FeatureRecord, DecodeError>> = if self.settings.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.settings.jobs)
                .build()?;
            pool.install(|| files.par_iter().map(process).collect())
        } else {
            files.iter().map(process).collect()
        };
        pb.finish_and_clear();

        let mut outcome = BatchOutcome::default();
        for (path, result) in files.into_iter().zip(results) {
            match result {
                Ok(record) => outcome.table.push(record),
                Err(e) => {
                    log::debug!("Skipping {}: {:?}", path.display(), e);
                    outcome.skipped.push(SkippedFile {
                        path,
                        reason: error_chain(&e),
                    });
                }
            }
        }

        log::info!(
            "Analysed {} files, skipped {}",
            outcome.table.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    fn process_file(&self, path: &Path) -> Result<FeatureRecord, DecodeError> {
        let song = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        log::info!("Processing {}...", song);

        let buffer = decode_audio(path, self.settings.sample_rate)?;
        Ok(analyze(song, &buffer, self.settings.frames))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb
    }
}

/// `name` ends in `.ext` for one of `extensions`. With `case_sensitive`
/// off, `extensions` must already be lower-case.
pub fn matches_extension(name: &str, extensions: &[String], case_sensitive: bool) -> bool {
    let name = if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    };
    extensions.iter().any(|ext| {
        name.strip_suffix(ext.as_str())
            .is_some_and(|stem| stem.ends_with('.'))
    })
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::PitchClass;
    use crate::audio::spectrum::FrameParams;

    const SR: u32 = 22050;

    fn settings(dir: &Path) -> Settings {
        Settings {
            input_directory: dir.to_path_buf(),
            output_path: dir.join("out.csv"),
            extensions: vec!["mp3".into(), "wav".into()],
            case_sensitive: true,
            sort: true,
            fail_on_empty: false,
            sample_rate: SR,
            frames: FrameParams::default(),
            jobs: 1,
            show_progress: false,
        }
    }

    fn write_sine(path: &Path, freq: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..SR as usize {
            let s = 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin();
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn extension_matching_policies() {
        let exts = vec!["mp3".to_string(), "wav".to_string()];
        assert!(matches_extension("song.mp3", &exts, true));
        assert!(matches_extension("a.b.wav", &exts, true));
        assert!(!matches_extension("SONG.MP3", &exts, true));
        assert!(matches_extension("SONG.MP3", &exts, false));
        assert!(!matches_extension("mp3", &exts, true));
        assert!(!matches_extension("notes.txt", &exts, false));
        assert!(!matches_extension("song.xmp3", &exts, true));
    }

    #[test]
    fn corrupt_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_sine(&dir.path().join("good.wav"), 440.0);
        std::fs::write(dir.path().join("bad.mp3"), b"\x00\x01garbage that is not audio").unwrap();

        let outcome = BatchDriver::new(settings(dir.path())).run().unwrap();
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.table.records()[0].song, "good.wav");
        assert_eq!(outcome.table.records()[0].key, PitchClass::A);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(outcome.skipped[0].path.ends_with("bad.mp3"));
        assert!(!outcome.skipped[0].reason.is_empty());
    }

    #[test]
    fn empty_directory_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), "not audio").unwrap();

        let outcome = BatchDriver::new(settings(dir.path())).run().unwrap();
        assert!(outcome.table.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn empty_directory_can_be_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.fail_on_empty = true;
        let err = BatchDriver::new(s).run().unwrap_err();
        assert!(matches!(err, BatchError::EmptyInput { .. }));
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = BatchDriver::new(settings(&dir.path().join("gone")))
            .run()
            .unwrap_err();
        assert!(matches!(err, BatchError::ReadDir { .. }));
    }

    #[test]
    fn discovery_is_sorted_and_non_recursive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.wav", "a.mp3", "b.wav", "B.WAV", "skip.ogg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.wav")).unwrap();
        std::fs::write(dir.path().join("nested.wav").join("inner.wav"), b"x").unwrap();

        let names = |files: Vec<PathBuf>| -> Vec<String> {
            files
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        };

        let driver = BatchDriver::new(settings(dir.path()));
        assert_eq!(names(driver.discover().unwrap()), vec!["a.mp3", "b.wav", "c.wav"]);

        let mut s = settings(dir.path());
        s.case_sensitive = false;
        let found = names(BatchDriver::new(s).discover().unwrap());
        assert_eq!(found, vec!["B.WAV", "a.mp3", "b.wav", "c.wav"]);
    }

    #[test]
    fn parallel_run_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let tones = [("1.wav", 261.63), ("2.wav", 440.0), ("3.wav", 329.63), ("4.wav", 392.0)];
        for (name, freq) in tones {
            write_sine(&dir.path().join(name), freq);
        }

        let mut s = settings(dir.path());
        s.jobs = 3;
        let outcome = BatchDriver::new(s).run().unwrap();

        let rows: Vec<(&str, PitchClass)> = outcome
            .table
            .records()
            .iter()
            .map(|r| (r.song.as_str(), r.key))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("1.wav", PitchClass::C),
                ("2.wav", PitchClass::A),
                ("3.wav", PitchClass::E),
                ("4.wav", PitchClass::G),
            ]
        );
    }
}
