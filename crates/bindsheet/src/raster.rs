#![forbid(unsafe_code)]

use crate::output::{OutputError, PageSize, PrintOptions, RasterSession, Rasterizer, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::Path;

/// In-process print backend: `usvg` loads the page and `svg2pdf` prints it.
///
/// The PDF page always takes the size of the root element, so margins are zero and the
/// orientation follows the drawing. `landscape`, `page_ranges` and `paper_size` of
/// [`PrintOptions`] are not applied: a portrait template prints as a portrait page.
#[derive(Debug, Clone)]
pub struct VectorRasterizer {
    pub font_family: String,
    pub load_system_fonts: bool,
}

impl Default for VectorRasterizer {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            load_system_fonts: true,
        }
    }
}

pub struct VectorSession {
    svg: String,
    tree: Option<svg2pdf::usvg::Tree>,
}

impl Rasterizer for VectorRasterizer {
    type Session = VectorSession;

    fn open(&mut self, svg_path: &Path) -> Result<VectorSession> {
        let svg = std::fs::read_to_string(svg_path).map_err(|e| OutputError::Io {
            path: svg_path.to_path_buf(),
            source: e,
        })?;

        let mut opt = svg2pdf::usvg::Options {
            resources_dir: svg_path.parent().map(Path::to_path_buf),
            ..Default::default()
        };
        if self.load_system_fonts {
            opt.fontdb_mut().load_system_fonts();
        }
        opt.font_family = self.font_family.clone();

        let tree = svg2pdf::usvg::Tree::from_str(&svg, &opt)
            .map_err(|e| OutputError::render(format!("failed to parse SVG: {e}")))?;
        Ok(VectorSession {
            svg,
            tree: Some(tree),
        })
    }
}

impl RasterSession for VectorSession {
    fn root_size(&mut self) -> Result<PageSize> {
        root_svg_size(&self.svg)
    }

    fn print_to_pdf(&mut self, options: &PrintOptions) -> Result<String> {
        let Some(tree) = self.tree.as_ref() else {
            return Err(OutputError::render("session is closed"));
        };
        tracing::debug!(
            page_ranges = %options.page_ranges,
            width = options.paper_size.width,
            height = options.paper_size.height,
            "printing SVG to PDF"
        );
        let pdf = svg2pdf::to_pdf(
            tree,
            svg2pdf::ConversionOptions::default(),
            svg2pdf::PageOptions::default(),
        )
        .map_err(|_| OutputError::render("failed to convert SVG to PDF"))?;
        Ok(BASE64.encode(pdf))
    }

    fn close(&mut self) {
        self.tree = None;
    }
}

/// Reads the root `<svg>` element's `width`/`height`, falling back to its `viewBox` size when
/// either is missing or relative.
pub fn root_svg_size(svg: &str) -> Result<PageSize> {
    let opt = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(svg, opt)
        .map_err(|e| OutputError::render(format!("failed to parse SVG: {e}")))?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(OutputError::render(format!(
            "root element is <{}>, expected <svg>",
            root.tag_name().name()
        )));
    }

    let width = root.attribute("width").and_then(parse_length_px);
    let height = root.attribute("height").and_then(parse_length_px);
    if let (Some(width), Some(height)) = (width, height) {
        return Ok(PageSize { width, height });
    }

    let view_box = root.attribute("viewBox").and_then(parse_view_box_size);
    match (width, height, view_box) {
        (w, h, Some((vw, vh))) => Ok(PageSize {
            width: w.unwrap_or(vw),
            height: h.unwrap_or(vh),
        }),
        _ => Err(OutputError::render(
            "could not determine the width/height of the root <svg> element",
        )),
    }
}

fn parse_length_px(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| c.is_ascii_alphabetic() || c == '%')
        .unwrap_or(raw.len());
    let (num, unit) = raw.split_at(split);
    let n = num.trim().parse::<f64>().ok()?;
    let px = match unit {
        "" | "px" => n,
        "pt" => n * 96.0 / 72.0,
        "pc" => n * 16.0,
        "in" => n * 96.0,
        "cm" => n * 96.0 / 2.54,
        "mm" => n * 96.0 / 25.4,
        _ => return None,
    };
    (px.is_finite() && px > 0.0).then_some(px)
}

fn parse_view_box_size(raw: &str) -> Option<(f64, f64)> {
    let mut it = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty());
    let _min_x = it.next()?.parse::<f64>().ok()?;
    let _min_y = it.next()?.parse::<f64>().ok()?;
    let width = it.next()?.parse::<f64>().ok()?;
    let height = it.next()?.parse::<f64>().ok()?;
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Some((width, height))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_size_reads_width_and_height() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="1200" height="800px"/>"#;
        assert_eq!(
            root_svg_size(svg).unwrap(),
            PageSize {
                width: 1200.0,
                height: 800.0
            }
        );
    }

    #[test]
    fn root_size_converts_absolute_units() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="1in" height="72pt"/>"#;
        let size = root_svg_size(svg).unwrap();
        assert_eq!(size.width, 96.0);
        assert_eq!(size.height, 96.0);
    }

    #[test]
    fn root_size_falls_back_to_view_box() {
        let svg =
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" viewBox="0 0 297 210"/>"#;
        assert_eq!(
            root_svg_size(svg).unwrap(),
            PageSize {
                width: 297.0,
                height: 210.0
            }
        );
    }

    #[test]
    fn root_size_without_dimensions_is_a_render_failure() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#;
        assert!(matches!(root_svg_size(svg), Err(OutputError::Render { .. })));
    }

    #[test]
    fn vector_rasterizer_prints_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.svg");
        std::fs::write(
            &path,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="black"/></svg>"#,
        )
        .unwrap();

        let mut rasterizer = VectorRasterizer {
            load_system_fonts: false,
            ..Default::default()
        };
        let mut session = rasterizer.open(&path).unwrap();
        let size = session.root_size().unwrap();
        let encoded = session.print_to_pdf(&PrintOptions::single_page(size)).unwrap();
        session.close();

        let bytes = BASE64.decode(encoded).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(session.print_to_pdf(&PrintOptions::single_page(size)).is_err());
    }
}
