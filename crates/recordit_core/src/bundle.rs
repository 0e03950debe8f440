//! In-memory zip bundles for downloads.

use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{RecordError, Result};

const PLACEHOLDER: &str = ".gitkeep";

pub struct Bundle {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Bundle {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: 0,
        }
    }

    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.writer.start_file(name, self.options)?;
        self.writer.write_all(bytes)?;
        self.entries += 1;
        Ok(())
    }

    /// Add a file from disk under `name`.
    pub async fn add_file(&mut self, path: &Path, name: &str) -> Result<()> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                RecordError::NotFound(format!("file {}", path.display()))
            }
            _ => e.into(),
        })?;
        self.add_bytes(name, &bytes)
    }

    /// Add every regular file directly inside `dir` as `<dir name>/<file>`.
    pub async fn add_dir(&mut self, dir: &Path) -> Result<()> {
        if !tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(RecordError::NotFound(format!("directory {}", dir.display())));
        }
        let parent = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut names = Vec::new();
        let mut read = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = read.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == PLACEHOLDER {
                continue;
            }
            names.push(name);
        }
        names.sort();

        for name in names {
            self.add_file(&dir.join(&name), &format!("{parent}/{name}"))
                .await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.writer.finish()?.into_inner())
    }
}
