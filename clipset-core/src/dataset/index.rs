//! Recursive `.wav` discovery and stable position → path resolution.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{
    audio::{is_wav_path, probe_sample_rate},
    error::{ClipsetError, Result},
};

/// Ordered, immutable collection of the dataset's audio files.
///
/// Paths are sorted after discovery so the same directory tree always yields
/// the same position → file mapping. Read-only after construction and safe to
/// share between threads without synchronisation.
#[derive(Debug, Clone)]
pub struct FileIndex {
    root: PathBuf,
    paths: Vec<PathBuf>,
    /// Sample rate of the first file, probed once at construction.
    ///
    /// Extraction always targets `TargetSpec::target_rate`; this value is
    /// reported but never used to parameterise resampling.
    native_sample_rate: u32,
}

impl FileIndex {
    /// Walk `root` recursively and index every `.wav` file found.
    ///
    /// Hidden entries (names starting with `.`) are skipped, files and
    /// directories alike, so AppleDouble `._clip.wav` sidecars never reach the index.
    ///
    /// # Errors
    /// - `ClipsetError::EmptyDataset` if `root` is empty, missing, not a
    ///   directory, or contains no `.wav` files.
    /// - `ClipsetError::Io` if a directory inside `root` cannot be listed.
    /// - `ClipsetError::Decode` if the first file's header cannot be probed.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut paths = Vec::new();
        if root.as_os_str().is_empty() || !root.is_dir() {
            warn!(root = %root.display(), "dataset root is not a directory");
        } else {
            collect_wavs(root, &mut paths)?;
        }
        paths.sort();
        Self::from_paths(root, paths)
    }

    /// Build an index over an explicit list of files, kept in the given order.
    ///
    /// # Errors
    /// `ClipsetError::EmptyDataset` if `paths` is empty; `ClipsetError::Decode`
    /// if the first file cannot be probed.
    pub fn from_paths(root: impl Into<PathBuf>, paths: Vec<PathBuf>) -> Result<Self> {
        let root = root.into();
        let Some(first) = paths.first() else {
            return Err(ClipsetError::EmptyDataset { root });
        };
        let native_sample_rate = probe_sample_rate(first)?;

        info!(
            root = %root.display(),
            files = paths.len(),
            native_sample_rate,
            "dataset indexed"
        );

        Ok(Self {
            root,
            paths,
            native_sample_rate,
        })
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always `false` for a constructed index.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Path at `position`.
    ///
    /// # Errors
    /// `ClipsetError::IndexOutOfRange` unless `0 <= position < len()`.
    pub fn resolve(&self, position: i64) -> Result<&Path> {
        usize::try_from(position)
            .ok()
            .and_then(|p| self.paths.get(p))
            .map(PathBuf::as_path)
            .ok_or(ClipsetError::IndexOutOfRange {
                position,
                len: self.paths.len(),
            })
    }

    pub fn native_sample_rate(&self) -> u32 {
        self.native_sample_rate
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn collect_wavs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_dir() {
            collect_wavs(&path, out)?;
        } else if is_wav_path(&path) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_silence(path: &Path, sample_rate: u32, len: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..len {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn empty_root_path_is_empty_dataset() {
        let err = FileIndex::discover("").unwrap_err();
        assert!(matches!(err, ClipsetError::EmptyDataset { .. }), "{err}");
    }

    #[test]
    fn missing_root_is_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileIndex::discover(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ClipsetError::EmptyDataset { .. }), "{err}");
    }

    #[test]
    fn directory_without_wavs_is_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("clip.flac"), "x").unwrap();
        let err = FileIndex::discover(dir.path()).unwrap_err();
        assert!(matches!(err, ClipsetError::EmptyDataset { .. }), "{err}");
    }

    #[test]
    fn discovers_recursively_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("speaker_b").join("session1");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(dir.path().join("speaker_a")).unwrap();
        write_silence(&dir.path().join("speaker_a").join("z.wav"), 16_000, 10);
        write_silence(&nested.join("a.wav"), 44_100, 10);
        write_silence(&nested.join("b.WAV"), 44_100, 10);
        write_silence(&dir.path().join("root.wav"), 22_050, 10);
        std::fs::write(dir.path().join("readme.md"), "ignored").unwrap();

        let index = FileIndex::discover(dir.path()).unwrap();
        assert_eq!(index.len(), 3);
        assert!(!index.is_empty());
        let mut expected = vec![
            dir.path().join("root.wav"),
            dir.path().join("speaker_a").join("z.wav"),
            nested.join("a.wav"),
        ];
        expected.sort();
        assert_eq!(index.paths(), expected.as_slice());
        assert_eq!(index.native_sample_rate(), probe_sample_rate(&expected[0]).unwrap());
    }

    #[test]
    fn hidden_files_and_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_silence(&dir.path().join("clip.wav"), 16_000, 10);
        // AppleDouble sidecar: sorts first and is not a RIFF file.
        std::fs::write(dir.path().join("._clip.wav"), b"\x00\x05\x16\x07\x00\x02\x00\x00Mac OS X").unwrap();
        let hidden_dir = dir.path().join(".cache");
        std::fs::create_dir(&hidden_dir).unwrap();
        write_silence(&hidden_dir.join("stale.wav"), 8_000, 10);

        let index = FileIndex::discover(dir.path()).unwrap();
        assert_eq!(index.paths(), &[dir.path().join("clip.wav")]);
        assert_eq!(index.native_sample_rate(), 16_000);
    }

    #[test]
    fn resolve_bounds() {
        let dir = tempfile::tempdir().unwrap();
        write_silence(&dir.path().join("a.wav"), 8_000, 4);
        write_silence(&dir.path().join("b.wav"), 8_000, 4);
        let index = FileIndex::discover(dir.path()).unwrap();

        assert_eq!(index.resolve(0).unwrap(), dir.path().join("a.wav"));
        assert_eq!(index.resolve(1).unwrap(), dir.path().join("b.wav"));
        for bad in [-1, index.len() as i64, i64::MAX, i64::MIN] {
            match index.resolve(bad) {
                Err(ClipsetError::IndexOutOfRange { position, len }) => {
                    assert_eq!(position, bad);
                    assert_eq!(len, 2);
                }
                other => panic!("expected IndexOutOfRange for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn unreadable_first_file_fails_probe() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"garbage").unwrap();
        let err = FileIndex::discover(dir.path()).unwrap_err();
        assert!(matches!(err, ClipsetError::Decode { .. }), "{err}");
    }

    #[test]
    fn from_paths_keeps_given_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_silence(&a, 16_000, 4);
        write_silence(&b, 8_000, 4);
        let index = FileIndex::from_paths(dir.path(), vec![b.clone(), a.clone()]).unwrap();
        assert_eq!(index.resolve(0).unwrap(), b);
        assert_eq!(index.native_sample_rate(), 8_000);
        assert_eq!(index.root(), dir.path());

        assert!(matches!(
            FileIndex::from_paths(dir.path(), Vec::new()),
            Err(ClipsetError::EmptyDataset { .. })
        ));
    }
}
