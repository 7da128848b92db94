use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use spinwheel_core::RuntimeWarning;
use tracing::debug;

/// Sound played whenever the pointer crosses into another sector.
pub(crate) const CLICK_SOUND: &str = "click.wav";
/// Sound played on every heartbeat pulse.
pub(crate) const HEARTBEAT_SOUND: &str = "Heartbeat.wav";

/// Destination for resolved sound files.
pub(crate) trait AudioSink {
    /// Plays the file at `path`, fire-and-forget.
    fn play(&mut self, path: &Path);
}

/// Sink that records playback in the log instead of producing audio.
#[derive(Debug, Default)]
pub(crate) struct LogSink;

impl AudioSink for LogSink {
    fn play(&mut self, path: &Path) {
        debug!(path = %path.display(), "sound");
    }
}

/// Resolves sound files relative to the item source and caches lookups.
#[derive(Debug)]
pub(crate) struct SoundBank<S> {
    base_dir: PathBuf,
    resolved: HashMap<String, Option<PathBuf>>,
    sink: S,
}

impl<S: AudioSink> SoundBank<S> {
    pub(crate) fn new(base_dir: impl Into<PathBuf>, sink: S) -> Self {
        Self {
            base_dir: base_dir.into(),
            resolved: HashMap::new(),
            sink,
        }
    }

    /// Plays `file`, reporting a warning when it cannot be found.
    pub(crate) fn play(&mut self, file: &str) -> Option<RuntimeWarning> {
        let base_dir = &self.base_dir;
        let path = self
            .resolved
            .entry(file.to_owned())
            .or_insert_with(|| {
                let candidate = base_dir.join(file);
                candidate.is_file().then_some(candidate)
            })
            .clone();

        match path {
            Some(path) => {
                self.sink.play(&path);
                None
            }
            None => {
                debug!(file, "sound file unavailable");
                Some(RuntimeWarning::SoundUnavailable {
                    file: file.to_owned(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Default)]
    struct RecordingSink {
        played: Vec<PathBuf>,
    }

    impl AudioSink for RecordingSink {
        fn play(&mut self, path: &Path) {
            self.played.push(path.to_path_buf());
        }
    }

    #[test]
    fn missing_files_raise_a_warning() {
        let mut bank = SoundBank::new("/definitely/not/here", RecordingSink::default());
        assert_eq!(
            bank.play("Boom.wav"),
            Some(RuntimeWarning::SoundUnavailable {
                file: "Boom.wav".to_owned(),
            })
        );
        assert!(bank.sink.played.is_empty());
    }

    #[test]
    fn files_next_to_the_source_are_played() {
        let dir = std::env::temp_dir().join(format!("spinwheel-sound-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        fs::write(dir.join("Ding.wav"), b"RIFF").expect("write sound");

        let mut bank = SoundBank::new(&dir, RecordingSink::default());
        assert_eq!(bank.play("Ding.wav"), None);
        assert_eq!(bank.play("Ding.wav"), None);
        assert_eq!(bank.sink.played, vec![dir.join("Ding.wav"), dir.join("Ding.wav")]);

        fs::remove_dir_all(&dir).expect("remove temp dir");
    }
}
