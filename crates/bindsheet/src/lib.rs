#![forbid(unsafe_code)]

//! `bindsheet` renders Joystick Gremlin profiles into labeled controller diagrams.
//!
//! # Features
//!
//! - `raster`: enable PDF output via pure-Rust SVG conversion (`bindsheet::raster`)

pub use bindsheet_core::*;

pub mod output;
#[cfg(feature = "raster")]
pub mod raster;

use output::{OutputFormat, Rasterizer};
use std::path::{Path, PathBuf};

/// A filled-in template, ready to be written.
#[derive(Debug, Clone)]
pub struct RenderedDiagram {
    pub svg: String,
    pub report: RenderReport,
}

/// Extracts the profile's mappings and renders them into the template.
///
/// The profile is read before the template, so a broken profile is reported even when the
/// template is missing too.
pub fn render_files(
    profile: &Path,
    template: &Path,
    options: &RenderOptions,
) -> Result<RenderedDiagram> {
    let mappings = extract_file(profile)?;
    let mut template = SvgTemplate::from_file(template)?;
    let report = template.replace_fields(&mappings, profile, options);
    Ok(RenderedDiagram {
        svg: template.into_text(),
        report,
    })
}

/// One profile → diagram conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub profile: PathBuf,
    pub template: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub format: OutputFormat,
    pub options: RenderOptions,
}

impl Conversion {
    pub fn new(profile: impl Into<PathBuf>, template: impl Into<PathBuf>) -> Self {
        Self {
            profile: profile.into(),
            template: template.into(),
            output_dir: None,
            format: OutputFormat::Svg,
            options: RenderOptions::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn output_path(&self) -> PathBuf {
        output::output_path(&self.profile, self.output_dir.as_deref(), self.format)
    }

    /// Renders and writes the diagram, returning the path written.
    ///
    /// `rasterizer` is only used for [`OutputFormat::Pdf`].
    pub fn run<R: Rasterizer>(&self, rasterizer: &mut R) -> output::Result<PathBuf> {
        let rendered = render_files(&self.profile, &self.template, &self.options)?;
        let out = self.output_path();
        match self.format {
            OutputFormat::Svg => output::write_svg(&rendered.svg, &out)?,
            OutputFormat::Pdf => output::write_pdf(&rendered.svg, &out, rasterizer)?,
        }
        Ok(out)
    }
}
