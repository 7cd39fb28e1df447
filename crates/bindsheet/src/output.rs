//! Output stage: SVG emission and PDF emission through a [`Rasterizer`].
//!
//! PDF output goes through a print-capable collaborator (a headless browser, or the in-process
//! [`crate::raster::VectorRasterizer`] when the `raster` feature is enabled). The collaborator
//! only sees a file on disk, so the substitution engine never depends on it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error(transparent)]
    Core(#[from] bindsheet_core::Error),
    #[error("Rendering failed: {message}")]
    Render { message: String },
    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, OutputError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Svg,
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            _ => Err(()),
        }
    }
}

/// `<dir>/<source stem>.<ext>`, where `<dir>` defaults to the source document's directory.
pub fn output_path(
    source_document: &Path,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> PathBuf {
    let file_name = Path::new(source_document.file_name().unwrap_or_default())
        .with_extension(format.extension());
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => source_document.with_extension(format.extension()),
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn ensure_parent_dir(path: &Path) -> Result<&Path> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir).map_err(|e| OutputError::io(dir, e))?;
    Ok(dir)
}

pub fn write_svg(text: &str, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, text).map_err(|e| OutputError::io(path, e))?;
    tracing::info!("Saved SVG to {}", path.display());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Page setup handed to [`RasterSession::print_to_pdf`]. Units are CSS pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub landscape: bool,
    pub print_background: bool,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub page_ranges: String,
    pub paper_size: PageSize,
}

impl PrintOptions {
    /// Landscape, backgrounds on, no margins, first page only.
    pub fn single_page(paper_size: PageSize) -> Self {
        Self {
            landscape: true,
            print_background: true,
            margin_top: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            margin_right: 0.0,
            page_ranges: "1".to_string(),
            paper_size,
        }
    }
}

/// A print-capable collaborator that can load an SVG file and print it to PDF.
pub trait Rasterizer {
    type Session: RasterSession;

    /// Starts a session with `svg_path` loaded as the current page.
    fn open(&mut self, svg_path: &Path) -> Result<Self::Session>;
}

pub trait RasterSession {
    /// Intrinsic pixel size of the root `<svg>` element of the loaded page.
    fn root_size(&mut self) -> Result<PageSize>;

    /// Prints the loaded page and returns the PDF bytes, base64 encoded.
    fn print_to_pdf(&mut self, options: &PrintOptions) -> Result<String>;

    /// Tears the session down. Called exactly once, on every exit path.
    fn close(&mut self);
}

/// Placeholder for callers that only ever emit SVG. Opening a session always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRasterizer;

pub enum NoSession {}

impl Rasterizer for NoRasterizer {
    type Session = NoSession;

    fn open(&mut self, _svg_path: &Path) -> Result<NoSession> {
        Err(OutputError::render("no rasterizer available for PDF output"))
    }
}

impl RasterSession for NoSession {
    fn root_size(&mut self) -> Result<PageSize> {
        match *self {}
    }

    fn print_to_pdf(&mut self, _options: &PrintOptions) -> Result<String> {
        match *self {}
    }

    fn close(&mut self) {
        match *self {}
    }
}

struct SessionGuard<S: RasterSession>(S);

impl<S: RasterSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S: RasterSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.0
    }
}

impl<S: RasterSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Prints `text` to a single-page PDF at `path`.
///
/// The SVG is staged as a temporary file next to `path` so relative resource references resolve
/// against the output directory. The temporary file is removed and the session closed whether
/// printing succeeds or not.
pub fn write_pdf<R: Rasterizer>(text: &str, path: &Path, rasterizer: &mut R) -> Result<()> {
    let dir = ensure_parent_dir(path)?;
    let mut staged = tempfile::Builder::new()
        .prefix(".bindsheet-")
        .suffix(".svg")
        .tempfile_in(dir)
        .map_err(|e| OutputError::io(dir, e))?;
    staged
        .write_all(text.as_bytes())
        .and_then(|()| staged.flush())
        .map_err(|e| OutputError::io(staged.path(), e))?;
    tracing::debug!("staged SVG at {}", staged.path().display());

    let pdf = {
        let mut session = SessionGuard(rasterizer.open(staged.path())?);
        let size = session.root_size()?;
        tracing::debug!(width = size.width, height = size.height, "root element size");
        let encoded = session.print_to_pdf(&PrintOptions::single_page(size))?;
        BASE64
            .decode(encoded.trim())
            .map_err(|e| OutputError::render(format!("invalid page data: {e}")))?
    };

    std::fs::write(path, pdf).map_err(|e| OutputError::io(path, e))?;
    tracing::info!("Saved PDF to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_defaults_next_to_the_source() {
        let p = output_path(Path::new("profiles/warthog.xml"), None, OutputFormat::Svg);
        assert_eq!(p, PathBuf::from("profiles/warthog.svg"));
    }

    #[test]
    fn output_path_uses_the_output_dir() {
        let p = output_path(
            Path::new("profiles/warthog.xml"),
            Some(Path::new("out")),
            OutputFormat::Pdf,
        );
        assert_eq!(p, PathBuf::from("out/warthog.pdf"));
    }

    #[test]
    fn output_path_keeps_inner_dots() {
        let p = output_path(Path::new("f-16.v2.xml"), Some(Path::new("out")), OutputFormat::Svg);
        assert_eq!(p, PathBuf::from("out/f-16.v2.svg"));
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("PDF".parse::<OutputFormat>(), Ok(OutputFormat::Pdf));
        assert_eq!(" svg ".parse::<OutputFormat>(), Ok(OutputFormat::Svg));
        assert!("png".parse::<OutputFormat>().is_err());
    }
}
