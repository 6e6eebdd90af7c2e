//! Manifest entry -> `CanonicalImageJob`.
//!
//! One extraction function per field, each walking its own fallback chain.
//! Pure: the same manifest always yields the same jobs, warnings and rejections.

use crate::error::PipelineError;
use crate::job::{CanonicalImageJob, HERO_DIMENSIONS, SECTION_DIMENSIONS};

use super::schema::{EnhancedImageSpec, ImageSpec, PlacementSpec, PromptSpec, StructuredPrompt};
use super::Manifest;

/// Whether an entry is the hero or a section image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Hero,
    Section,
}

impl Role {
    pub fn default_dimensions(self) -> (u32, u32) {
        match self {
            Role::Hero => HERO_DIMENSIONS,
            Role::Section => SECTION_DIMENSIONS,
        }
    }
}

/// Non-fatal normalization finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeWarning {
    /// No alt text field was present; it was derived from the filename.
    AltTextDerived { filename: String },
}

impl std::fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeWarning::AltTextDerived { filename } => {
                write!(f, "{}: no alt text, derived from filename", filename)
            }
        }
    }
}

/// An entry that could not become a job (no derivable prompt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub index: usize,
    pub filename: String,
    pub reason: String,
}

/// Output of normalizing a whole manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Hero first, then sections in array order.
    pub jobs: Vec<CanonicalImageJob>,
    pub rejected: Vec<RejectedEntry>,
    pub warnings: Vec<NormalizeWarning>,
}

/// Normalize every entry of `manifest`. A rejected entry never affects its siblings.
pub fn normalize(manifest: &Manifest) -> Normalized {
    let mut out = Normalized::default();
    for (index, role, spec) in manifest.entries() {
        match normalize_entry(&manifest.slug, index, role, spec) {
            Ok((job, warning)) => {
                out.jobs.push(job);
                out.warnings.extend(warning);
            }
            Err(e) => out.rejected.push(RejectedEntry {
                index,
                filename: extract_filename(spec, &manifest.slug, index),
                reason: e.to_string(),
            }),
        }
    }
    out
}

/// Normalize a single entry.
pub fn normalize_entry(
    slug: &str,
    index: usize,
    role: Role,
    spec: &ImageSpec,
) -> Result<(CanonicalImageJob, Option<NormalizeWarning>), PipelineError> {
    let filename = extract_filename(spec, slug, index);
    let prompt = extract_prompt(spec).ok_or_else(|| {
        PipelineError::Input(format!("{}: no prompt or structured prompt fields", filename))
    })?;

    let (alt_text, warning) = match extract_alt_text(spec) {
        Some(alt) => (alt, None),
        None => (
            alt_from_filename(&filename),
            Some(NormalizeWarning::AltTextDerived {
                filename: filename.clone(),
            }),
        ),
    };

    let (width, height) = extract_dimensions(spec).unwrap_or_else(|| role.default_dimensions());

    let job = CanonicalImageJob {
        index,
        filename,
        prompt,
        alt_text,
        width,
        height,
        caption: extract_caption(spec),
        placement: extract_placement(spec),
        negative_prompt: extract_negative_prompt(spec),
        is_hero: role == Role::Hero,
    };
    Ok((job, warning))
}

/// Trimmed, non-empty copy of an optional string.
fn non_empty(s: Option<&String>) -> Option<String> {
    s.map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a String>>) -> Option<String> {
    candidates.into_iter().find_map(non_empty)
}

/// Ready-made prompt first, else synthesized from structured fields.
pub fn extract_prompt(spec: &ImageSpec) -> Option<String> {
    match spec {
        ImageSpec::Simple(s) => non_empty(s.prompt.as_ref()),
        ImageSpec::Enhanced(e) => match e.prompt.as_ref()? {
            PromptSpec::Text(text) => non_empty(Some(text)),
            PromptSpec::Structured(p) => {
                non_empty(p.full.as_ref()).or_else(|| synthesize_prompt(p))
            }
        },
    }
}

/// Concatenate structured fields in fixed order, skipping empty ones.
pub fn synthesize_prompt(p: &StructuredPrompt) -> Option<String> {
    let ordered = [
        &p.style,
        &p.subject,
        &p.foreground,
        &p.midground,
        &p.background,
        &p.lighting,
        &p.camera,
        &p.mood,
        &p.detail,
    ];
    let mut parts: Vec<String> = ordered
        .iter()
        .filter_map(|f| non_empty(f.as_ref()))
        .map(|s| s.trim_end_matches('.').to_string())
        .collect();
    if let Some(neg) = non_empty(p.negative_prompt.as_ref()) {
        parts.push(format!("Avoid: {}", neg.trim_end_matches('.')));
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!("{}.", parts.join(". ")))
}

/// Accessibility alt, then SEO alt, then the legacy flat field.
pub fn extract_alt_text(spec: &ImageSpec) -> Option<String> {
    match spec {
        ImageSpec::Simple(s) => first_non_empty([s.alt.as_ref(), s.alt_text.as_ref()]),
        ImageSpec::Enhanced(e) => first_non_empty([
            e.accessibility.as_ref().and_then(|a| a.alt_text.as_ref()),
            e.seo.as_ref().and_then(|s| s.alt_text.as_ref()),
            e.alt.as_ref(),
            e.alt_text.as_ref(),
        ]),
    }
}

/// `hero-image_v2.png` -> `hero image v2`
pub fn alt_from_filename(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    stem.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Explicit numeric width/height, then a `"WxH"` string. `None` means use the role default.
pub fn extract_dimensions(spec: &ImageSpec) -> Option<(u32, u32)> {
    match spec {
        ImageSpec::Simple(s) => {
            numeric_pair(s.width, s.height).or_else(|| s.dimensions.as_deref().and_then(parse_dimensions))
        }
        ImageSpec::Enhanced(e) => enhanced_dimensions(e),
    }
}

fn enhanced_dimensions(e: &EnhancedImageSpec) -> Option<(u32, u32)> {
    let tech = e.technical.as_ref()?;
    numeric_pair(tech.width, tech.height)
        .or_else(|| tech.dimensions.as_deref().and_then(parse_dimensions))
}

fn numeric_pair(width: Option<u32>, height: Option<u32>) -> Option<(u32, u32)> {
    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    }
}

/// Parse `"1200x675"` (also `X` or `×`). Zero sizes are rejected.
pub fn parse_dimensions(s: &str) -> Option<(u32, u32)> {
    let s = s.trim();
    let (w, h) = s
        .split_once(|c: char| c == 'x' || c == 'X' || c == '×')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    numeric_pair(Some(w), Some(h))
}

/// Explicit filename, else `{slug}-{id|name}.png`, else `{slug}-image-{index}.png`.
pub fn extract_filename(spec: &ImageSpec, slug: &str, index: usize) -> String {
    let (filename, id, name) = match spec {
        ImageSpec::Simple(s) => (&s.filename, &s.id, &s.name),
        ImageSpec::Enhanced(e) => (&e.filename, &e.id, &e.name),
    };
    if let Some(f) = non_empty(filename.as_ref()) {
        return f;
    }
    let stem = [id, name]
        .into_iter()
        .filter_map(|v| non_empty(v.as_ref()))
        .map(|v| slugify(&v))
        .find(|v| !v.is_empty());
    match stem {
        Some(stem) => format!("{}-{}.png", slug, stem),
        None => format!("{}-image-{}.png", slug, index),
    }
}

/// Lowercase, keep ASCII alphanumerics, collapse everything else to single dashes.
fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

pub fn extract_caption(spec: &ImageSpec) -> Option<String> {
    match spec {
        ImageSpec::Simple(s) => non_empty(s.caption.as_ref()),
        ImageSpec::Enhanced(e) => first_non_empty([
            e.caption.as_ref(),
            e.seo.as_ref().and_then(|s| s.caption.as_ref()),
        ]),
    }
}

pub fn extract_negative_prompt(spec: &ImageSpec) -> Option<String> {
    match spec {
        ImageSpec::Simple(s) => non_empty(s.negative_prompt.as_ref()),
        ImageSpec::Enhanced(e) => first_non_empty([
            e.technical.as_ref().and_then(|t| t.negative_prompt.as_ref()),
            e.negative_prompt.as_ref(),
        ]),
    }
}

/// Reduce either placement form to one descriptive string.
pub fn extract_placement(spec: &ImageSpec) -> Option<String> {
    let placement = match spec {
        ImageSpec::Simple(s) => s.placement.as_ref(),
        ImageSpec::Enhanced(e) => e.placement.as_ref(),
    }?;
    match placement {
        PlacementSpec::Text(text) => non_empty(Some(text)),
        PlacementSpec::Structured(p) => {
            if let Some(desc) = non_empty(p.description.as_ref()) {
                return Some(desc);
            }
            let mut parts = Vec::new();
            if let Some(position) = non_empty(p.position.as_ref()) {
                parts.push(position);
            }
            if let Some(section) = non_empty(p.section.as_ref()) {
                parts.push(format!("section \"{}\"", section));
            }
            if let Some(after) = non_empty(p.after_heading.as_ref()) {
                parts.push(format!("after heading \"{}\"", after));
            }
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
    }
}
