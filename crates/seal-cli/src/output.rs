//! Directory-backed result sink.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use seal_crypto::SealSink;
use tempfile::NamedTempFile;

/// Writes each accepted result into one directory via temp file + rename.
#[derive(Debug)]
pub struct DirSink {
    dir: PathBuf,
    overwrite: bool,
    written: Vec<(PathBuf, u64)>,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            dir: dir.into(),
            overwrite,
            written: Vec::new(),
        }
    }

    /// Paths written so far, with their sizes.
    pub fn written(&self) -> &[(PathBuf, u64)] {
        &self.written
    }
}

impl SealSink for DirSink {
    fn accept(&mut self, bytes: &[u8], suggested_name: &str) -> Result<()> {
        let name = safe_file_name(suggested_name)?;
        let dest = self.dir.join(name);

        if !self.overwrite && dest.exists() {
            bail!(
                "{} already exists (set output.overwrite = true to replace it)",
                dest.display()
            );
        }

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        tmp.write_all(bytes).context("writing temp file")?;
        tmp.as_file().sync_all().context("syncing temp file")?;

        let persisted = if self.overwrite {
            tmp.persist(&dest)
        } else {
            tmp.persist_noclobber(&dest)
        };
        persisted
            .map_err(|e| e.error)
            .with_context(|| format!("writing {}", dest.display()))?;

        self.written.push((dest, bytes.len() as u64));
        Ok(())
    }
}

/// Reduce a recorded filename to its final component.
///
/// Container headers are attacker-controlled; `../../.bashrc` becomes `.bashrc`.
fn safe_file_name(name: &str) -> Result<&str> {
    match Path::new(name).file_name().and_then(|n| n.to_str()) {
        Some(base) if !base.is_empty() => Ok(base),
        _ => bail!("refusing to write unsafe file name {name:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("note.txt").unwrap(), "note.txt");
        assert_eq!(safe_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(safe_file_name("/abs/path/x.bin").unwrap(), "x.bin");
        assert!(safe_file_name("..").is_err());
        assert!(safe_file_name("/").is_err());
        assert!(safe_file_name("").is_err());
    }

    #[test]
    fn test_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirSink::new(dir.path(), false);

        sink.accept(b"payload", "../escape.txt").unwrap();

        let expected = dir.path().join("escape.txt");
        assert_eq!(std::fs::read(&expected).unwrap(), b"payload");
        assert_eq!(sink.written(), &[(expected, 7)]);
    }

    #[test]
    fn test_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.txt"), b"original").unwrap();

        let mut sink = DirSink::new(dir.path(), false);
        assert!(sink.accept(b"new", "x.txt").is_err());
        assert_eq!(std::fs::read(dir.path().join("x.txt")).unwrap(), b"original");

        let mut sink = DirSink::new(dir.path(), true);
        sink.accept(b"new", "x.txt").unwrap();
        assert_eq!(std::fs::read(dir.path().join("x.txt")).unwrap(), b"new");
    }
}
