//! Manifest loading, wire schemas and normalization.
//!
//! A manifest is written upstream by the content stage and is read-only here:
//! one hero request plus zero or more section requests, each in either the
//! simple or the enhanced wire schema.

mod normalize;
mod schema;
mod validate;

pub use normalize::{
    alt_from_filename, extract_alt_text, extract_dimensions, extract_filename, extract_placement,
    extract_prompt, normalize, normalize_entry, parse_dimensions, synthesize_prompt, Normalized,
    NormalizeWarning, RejectedEntry, Role,
};
pub use schema::{
    AccessibilitySpec, EnhancedImageSpec, ImageSpec, PlacementSpec, PromptSpec, SeoSpec,
    SimpleImageSpec, StructuredPlacement, StructuredPrompt, TechnicalSpec,
};
pub use validate::{validate_manifest, ValidationReport};

use serde::Deserialize;
use std::path::Path;

use crate::error::PipelineError;

/// Declarative, slug-scoped description of the images to generate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    pub slug: String,
    /// Optional at parse time so validation can report a missing hero.
    #[serde(default)]
    pub hero: Option<ImageSpec>,
    #[serde(default, alias = "sectionImages", alias = "section_images")]
    pub sections: Vec<ImageSpec>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::Manifest {
                    path: path.to_path_buf(),
                    message: "file not found".to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::Manifest {
            path: path.to_path_buf(),
            message: format!("invalid manifest JSON: {}", e),
        })
    }

    /// Entries in admission order: hero (index 0) then sections (index 1..).
    pub fn entries(&self) -> impl Iterator<Item = (usize, Role, &ImageSpec)> {
        self.hero
            .iter()
            .map(|h| (0, Role::Hero, h))
            .chain(
                self.sections
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (i + 1, Role::Section, s)),
            )
    }

    /// Number of image requests in the manifest.
    pub fn total(&self) -> usize {
        usize::from(self.hero.is_some()) + self.sections.len()
    }
}
