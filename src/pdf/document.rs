use anyhow::{Context, Result};
use lopdf::Document;
use std::path::{Path, PathBuf};

/// A parsed PDF, opened up front to validate the file and count its pages
/// before any rendering work is scheduled.
pub struct PdfDocument {
    pub doc: Document,
    pub path: PathBuf,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path)
            .with_context(|| format!("Failed to open PDF: {}", path.display()))?;
        Ok(PdfDocument {
            doc,
            path: path.to_path_buf(),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    pub fn version(&self) -> &str {
        &self.doc.version
    }
}
