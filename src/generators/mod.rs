//! Output generators - each turns an attack graph into a rendered document.

pub mod html;

use crate::error::Result;
use crate::graph::AttackGraph;
use std::path::{Path, PathBuf};

pub use html::HtmlGenerator;

/// Trait for all graph renderers.
pub trait Generator {
    /// Name of this output format.
    fn name(&self) -> &'static str;

    /// Render the graph. Returns the complete document as a string.
    fn generate(&self, graph: &AttackGraph) -> Result<String>;

    /// File extension for this generator's output.
    fn extension(&self) -> &'static str;
}

/// Default output file for `generator`: `base` with the generator's extension.
pub fn output_path<G: Generator + ?Sized>(generator: &G, base: impl AsRef<Path>) -> PathBuf {
    base.as_ref().with_extension(generator.extension())
}
