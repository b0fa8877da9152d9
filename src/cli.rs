use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    default_workers, OutputFormat, DEFAULT_DPI, DEFAULT_PREFIX, IMAGE_SCALE_DEFAULT,
    THUMB_SCALE_DEFAULT,
};

#[derive(Parser)]
#[command(name = "pdfjuicer")]
#[command(about = "Extract pages from a PDF file as images")]
#[command(
    long_about = "Extract pages from a PDF file as images.\n\nPages are rendered concurrently by a pool of workers and can optionally be resized and accompanied by thumbnails."
)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract pages as images
    Extract(ExtractArgs),

    /// Show page count and PDF version
    Info {
        /// PDF file to inspect
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// PDF file to extract from
    pub source: PathBuf,

    /// Output directory, created if missing
    #[arg(short, long)]
    pub output: PathBuf,

    /// Prefix for a filename
    #[arg(short, long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Postfix for a filename
    #[arg(short = 'x', long, default_value = "")]
    pub postfix: String,

    /// Exact image size, e.g. 640x480 (default: size rendered from the document)
    #[arg(short = 'S', long)]
    pub size: Option<String>,

    /// Scale-down factor, e.g. 5 makes images five times smaller
    #[arg(short = 'C', long, default_value_t = IMAGE_SCALE_DEFAULT)]
    pub scale: f32,

    /// Output image format
    #[arg(short = 'F', long, value_enum, ignore_case = true, default_value_t = OutputFormat::Png)]
    pub format: OutputFormat,

    /// Pages to extract, e.g. "2,3,6-8,10" (default: all pages)
    #[arg(short = 'P', long, default_value = "")]
    pub pages: String,

    /// Also generate thumbnails
    #[arg(short, long)]
    pub thumb: bool,

    /// Thumbnail scale-down factor
    #[arg(short = 'c', long, default_value_t = THUMB_SCALE_DEFAULT)]
    pub tscale: f32,

    /// Exact thumbnail size, e.g. 64x64
    #[arg(short = 'z', long)]
    pub tsize: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = default_workers())]
    pub workers: usize,

    /// Render resolution in dots per inch
    #[arg(short, long, default_value_t = DEFAULT_DPI)]
    pub dpi: f32,

    /// No progress bar and no colored output
    #[arg(short, long)]
    pub quiet: bool,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}
