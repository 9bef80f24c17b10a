use std::fs;
use std::path::{Path, PathBuf};

use crate::prelude::*;

use onenote_md_core::convert::{ConvertedDocument, Resource};

/// Writes converted pages below the output directory
#[derive(Debug, Clone)]
pub struct MarkdownWriter {
    root: PathBuf,
}

impl MarkdownWriter {
    /// Create the output directory if needed. Fails when it cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the Markdown of `document`, returning the absolute path written
    pub fn write(&self, document: &ConvertedDocument) -> Result<PathBuf, Error> {
        let path = self.root.join(&document.relative_path);
        write_file(&path, document.markdown.as_bytes())?;
        log::debug!("Wrote {} bytes to {}", document.markdown.len(), path.display());
        Ok(path)
    }

    /// Store a downloaded resource next to the document that references it
    pub fn write_resource(
        &self,
        document: &ConvertedDocument,
        resource: &Resource,
        bytes: &[u8],
    ) -> Result<PathBuf, Error> {
        let path = self.root.join(document.resource_path(resource));
        write_file(&path, bytes)?;
        Ok(path)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}
