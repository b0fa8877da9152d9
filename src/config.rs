//! Validated settings for an extraction run.
//!
//! The command line hands over raw strings and numbers; everything the
//! pipeline and the per-page extractor need is resolved here once, so the
//! workers only ever see typed, immutable parameters.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use thiserror::Error;

use crate::cli::ExtractArgs;
use crate::input::{validate_affix, AffixError, Size, SizeError};
use crate::raster::{TooLarge, MAX_DIMENSION};

pub const DEFAULT_PREFIX: &str = "page";
pub const IMAGE_SCALE_DEFAULT: f32 = 1.0;
pub const THUMB_SCALE_DEFAULT: f32 = 10.0;
pub const THUMBNAILS_DIR: &str = "thumbnails";
pub const DEFAULT_DPI: f32 = 300.0;

/// Number of workers when none is given: one per available core
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Png,
    Jpg,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How a rendered page is resized before encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    Original,
    Exact(Size),
    /// Divide both dimensions by this factor
    ScaleDown(f32),
}

impl Sizing {
    /// An exact size wins over a scale factor; a factor equal to the
    /// default means no scaling was asked for.
    pub fn resolve(size: Option<Size>, scale: f32, default_scale: f32) -> Self {
        match size {
            Some(size) => Sizing::Exact(size),
            None if scale != default_scale => Sizing::ScaleDown(scale),
            None => Sizing::Original,
        }
    }
}

impl fmt::Display for Sizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sizing::Original => f.write_str("original size"),
            Sizing::Exact(size) => write!(f, "{size}"),
            Sizing::ScaleDown(factor) => write!(f, "scaled down by {factor}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub sizing: Sizing,
    /// Subdirectory of the save directory that receives thumbnails
    pub dir_name: String,
}

/// Read-only parameters shared by every extraction job
#[derive(Debug, Clone, PartialEq)]
pub struct JobParams {
    pub save_dir: PathBuf,
    pub prefix: String,
    pub postfix: String,
    pub format: OutputFormat,
    pub sizing: Sizing,
    pub thumbnail: Option<ThumbnailParams>,
}

impl JobParams {
    /// `{save_dir}/{prefix}{page:03}{postfix}.{ext}`
    pub fn page_path(&self, page: u32) -> PathBuf {
        self.save_dir.join(format!(
            "{}{:03}{}.{}",
            self.prefix,
            page,
            self.postfix,
            self.format.extension()
        ))
    }

    pub fn thumbnail_dir(&self) -> Option<PathBuf> {
        self.thumbnail
            .as_ref()
            .map(|thumb| self.save_dir.join(&thumb.dir_name))
    }

    /// `{save_dir}/{thumbnail dir}/thumbnail_{page:03}.{ext}`
    pub fn thumbnail_path(&self, page: u32) -> Option<PathBuf> {
        self.thumbnail_dir().map(|dir| {
            dir.join(format!(
                "thumbnail_{:03}.{}",
                page,
                self.format.extension()
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("choose either scaling factor (--{scale_flag}) or exact image size (--{size_flag})")]
    SizeAndScale {
        size_flag: &'static str,
        scale_flag: &'static str,
    },
    #[error("invalid {flag} value {value}: must be a positive number")]
    InvalidFactor { flag: &'static str, value: f32 },
    #[error("invalid {flag} (example: 120x256): {source}")]
    InvalidSize {
        flag: &'static str,
        #[source]
        source: SizeError,
    },
    #[error("invalid {flag}: {source}")]
    SizeTooLarge {
        flag: &'static str,
        #[source]
        source: TooLarge,
    },
    #[error("invalid {flag}: {value}: {source}")]
    InvalidAffix {
        flag: &'static str,
        value: String,
        #[source]
        source: AffixError,
    },
    #[error("number of workers must be at least 1")]
    NoWorkers,
}

/// Every problem found in one set of arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl std::error::Error for ConfigErrors {}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    pub source: PathBuf,
    /// Page specification; empty selects every page
    pub pages: String,
    pub workers: usize,
    pub dpi: f32,
    pub quiet: bool,
    pub report: Option<PathBuf>,
    pub job: JobParams,
}

impl ExtractConfig {
    /// Validate command line arguments, collecting every problem rather than
    /// stopping at the first.
    pub fn from_args(args: &ExtractArgs) -> Result<Self, ConfigErrors> {
        let mut errors = Vec::new();

        let size = parse_size_arg(args.size.as_deref(), "size", &mut errors);
        let thumb_size = parse_size_arg(args.tsize.as_deref(), "tsize", &mut errors);

        check_factor(args.scale, "scale", &mut errors);
        check_factor(args.tscale, "tscale", &mut errors);
        check_factor(args.dpi, "dpi", &mut errors);

        if args.size.is_some() && args.scale != IMAGE_SCALE_DEFAULT {
            errors.push(ConfigError::SizeAndScale {
                size_flag: "size",
                scale_flag: "scale",
            });
        }
        if args.tsize.is_some() && args.tscale != THUMB_SCALE_DEFAULT {
            errors.push(ConfigError::SizeAndScale {
                size_flag: "tsize",
                scale_flag: "tscale",
            });
        }

        for (flag, value) in [("prefix", &args.prefix), ("postfix", &args.postfix)] {
            if let Err(source) = validate_affix(value) {
                errors.push(ConfigError::InvalidAffix {
                    flag,
                    value: value.clone(),
                    source,
                });
            }
        }

        if args.workers == 0 {
            errors.push(ConfigError::NoWorkers);
        }

        if !errors.is_empty() {
            return Err(ConfigErrors(errors));
        }

        // Thumbnails are always scaled; their default factor is not "no resize"
        let thumbnail = args.thumb.then(|| ThumbnailParams {
            sizing: match thumb_size {
                Some(size) => Sizing::Exact(size),
                None => Sizing::ScaleDown(args.tscale),
            },
            dir_name: THUMBNAILS_DIR.to_string(),
        });

        Ok(ExtractConfig {
            source: args.source.clone(),
            pages: args.pages.trim().to_string(),
            workers: args.workers,
            dpi: args.dpi,
            quiet: args.quiet,
            report: args.report.clone(),
            job: JobParams {
                save_dir: args.output.clone(),
                prefix: args.prefix.clone(),
                postfix: args.postfix.clone(),
                format: args.format,
                sizing: Sizing::resolve(size, args.scale, IMAGE_SCALE_DEFAULT),
                thumbnail,
            },
        })
    }
}

fn parse_size_arg(
    value: Option<&str>,
    flag: &'static str,
    errors: &mut Vec<ConfigError>,
) -> Option<Size> {
    match value?.parse::<Size>() {
        Ok(size) if size.width > MAX_DIMENSION || size.height > MAX_DIMENSION => {
            errors.push(ConfigError::SizeTooLarge {
                flag,
                source: TooLarge {
                    width: size.width.into(),
                    height: size.height.into(),
                },
            });
            None
        }
        Ok(size) => Some(size),
        Err(source) => {
            errors.push(ConfigError::InvalidSize { flag, source });
            None
        }
    }
}

fn check_factor(value: f32, flag: &'static str, errors: &mut Vec<ConfigError>) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigError::InvalidFactor { flag, value });
    }
}
