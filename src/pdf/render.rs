use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizes document pages. Shared by every extraction worker, so
/// implementations must be callable from several threads at once.
pub trait PageRenderer: Send + Sync {
    /// Render a 1-based page number into an RGBA pixel buffer
    fn render(&self, page: u32) -> Result<RgbaImage>;
}

struct RenderRequest {
    index: PdfPageIndex,
    page: u32,
    scale: f32,
    reply: mpsc::SyncSender<Result<RgbaImage>>,
}

/// Renders pages with PDFium.
///
/// PDFium's global library state and its document handles must not be used
/// from more than one thread at a time, so a single render thread owns the
/// library binding and the parsed document for the renderer's whole life.
/// Workers queue requests to it; only rasterization is serialized, while
/// resizing, encoding and writing still run in parallel.
pub struct PdfiumRenderer {
    scale: f32,
    requests: mpsc::Sender<RenderRequest>,
}

impl PdfiumRenderer {
    pub fn open<P: AsRef<Path>>(path: P, dpi: f32) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read PDF: {}", path.display()))?;
        let (requests, queue) = mpsc::channel();
        thread::Builder::new()
            .name("pdfium".to_string())
            .spawn(move || serve(bytes, queue))
            .context("Failed to start the render thread")?;

        Ok(PdfiumRenderer {
            scale: dpi / POINTS_PER_INCH,
            requests,
        })
    }
}

fn bind_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .context("Failed to load the PDFium library")?;
    Ok(Pdfium::new(bindings))
}

/// Render thread body: bind once, parse once, then answer requests until
/// every sender is gone.
fn serve(bytes: Vec<u8>, queue: mpsc::Receiver<RenderRequest>) {
    let pdfium = match bind_pdfium() {
        Ok(pdfium) => pdfium,
        Err(err) => return refuse(queue, err),
    };
    let document = match pdfium
        .load_pdf_from_byte_slice(&bytes, None)
        .context("Failed to load PDF into PDFium")
    {
        Ok(document) => document,
        Err(err) => return refuse(queue, err),
    };
    tracing::debug!(pages = document.pages().len(), "Render thread ready");

    for request in queue {
        let result = panic::catch_unwind(AssertUnwindSafe(|| render_page(&document, &request)))
            .unwrap_or_else(|_| Err(anyhow!("PDFium panicked on page {}", request.page)));
        // The requester may have given up; nothing to do then
        let _ = request.reply.send(result);
    }
}

/// Fail every request with the error that stopped the render thread from
/// starting.
fn refuse(queue: mpsc::Receiver<RenderRequest>, err: anyhow::Error) {
    let message = format!("{err:#}");
    tracing::error!(error = %message, "Render thread unavailable");
    for request in queue {
        let _ = request.reply.send(Err(anyhow!("{}", message)));
    }
}

fn render_page(document: &PdfDocument<'_>, request: &RenderRequest) -> Result<RgbaImage> {
    let page = request.page;
    let pdf_page = document
        .pages()
        .get(request.index)
        .with_context(|| format!("Failed to load page {}", page))?;

    let config = PdfRenderConfig::new().scale_page_by_factor(request.scale);
    let bitmap = pdf_page
        .render_with_config(&config)
        .with_context(|| format!("Failed to render page {}", page))?;

    let width = u32::try_from(bitmap.width())?;
    let height = u32::try_from(bitmap.height())?;
    RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
        .ok_or_else(|| anyhow!("Page {} rendered to a truncated bitmap", page))
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, page: u32) -> Result<RgbaImage> {
        let index = page
            .checked_sub(1)
            .and_then(|i| PdfPageIndex::try_from(i).ok())
            .ok_or_else(|| anyhow!("Page {} cannot be rendered", page))?;

        let (reply, response) = mpsc::sync_channel(1);
        self.requests
            .send(RenderRequest {
                index,
                page,
                scale: self.scale,
                reply,
            })
            .map_err(|_| anyhow!("Render thread stopped before page {}", page))?;
        response
            .recv()
            .map_err(|_| anyhow!("Render thread stopped while rendering page {}", page))?
    }
}
