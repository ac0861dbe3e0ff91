//! Collaborator seams for input files and output destinations.
//!
//! The pipeline never touches the filesystem; callers hand it a
//! [`SealSource`] and optionally a [`SealSink`].

/// A selected file: a name and its full contents.
pub trait SealSource {
    fn name(&self) -> &str;
    fn bytes(&self) -> &[u8];
}

/// Destination for a finished result.
pub trait SealSink {
    fn accept(&mut self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<()>;
}

/// An in-memory file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl SealSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Collects every accepted result in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub files: Vec<MemoryFile>,
}

impl SealSink for MemorySink {
    fn accept(&mut self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<()> {
        self.files.push(MemoryFile::new(suggested_name, bytes));
        Ok(())
    }
}
