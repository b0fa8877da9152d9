use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let doc = PdfDocument::open(&path)?;

    println!("File: {}", doc.path.display());
    println!("Pages: {}", doc.page_count());
    println!("PDF version: {}", doc.version());

    Ok(())
}
