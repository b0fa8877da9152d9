use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::Path;

use crate::config::{JobParams, OutputFormat};
use crate::pdf::PageRenderer;
use crate::raster;

/// Turns one page number into image files on disk: render, resize, encode,
/// write, then the same for the thumbnail if enabled.
pub struct PageExtractor<R> {
    renderer: R,
    params: JobParams,
}

impl<R: PageRenderer> PageExtractor<R> {
    pub fn new(renderer: R, params: JobParams) -> Self {
        PageExtractor { renderer, params }
    }

    pub fn extract(&self, page: u32) -> Result<()> {
        let source = self.renderer.render(page)?;

        let image = raster::apply_sizing(&source, self.params.sizing)
            .with_context(|| format!("Failed to resize page {}", page))?;
        write_image(&image, self.params.format, &self.params.page_path(page))?;

        if let (Some(thumb), Some(path)) =
            (&self.params.thumbnail, self.params.thumbnail_path(page))
        {
            // Thumbnails come from the rendered page, not the resized image
            let thumbnail = raster::apply_sizing(&source, thumb.sizing)
                .with_context(|| format!("Failed to resize thumbnail of page {}", page))?;
            write_image(&thumbnail, self.params.format, &path)?;
        }

        Ok(())
    }
}

fn write_image(image: &RgbaImage, format: OutputFormat, path: &Path) -> Result<()> {
    let bytes = raster::encode(image, format)
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
