#![forbid(unsafe_code)]

//! Joystick Gremlin mapping extraction + SVG template substitution (headless).
//!
//! Pipeline:
//! - [`mapping::extract_file`] reads a profile and collects `KEY|VALUE` pairs from every
//!   `description` attribute into a [`MappingTable`]
//! - [`template::render`] fills the fixed tokens and every keyed placeholder of an SVG template
//!
//! Nothing here rasterizes or writes output; see the `bindsheet` crate for that.

pub mod error;
pub mod mapping;
pub mod sanitize;
pub mod template;

pub use error::{Error, Result};
pub use mapping::{MappingTable, extract, extract_file, extract_str};
pub use template::{RenderOptions, RenderReport, SvgTemplate, render};
