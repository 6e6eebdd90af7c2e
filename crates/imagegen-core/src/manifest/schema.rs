//! Wire schemas for manifest image entries.
//!
//! Two shapes reach us from the writing stage: the simple schema with flat
//! fields, and the enhanced schema with nested `technical`, `seo` and
//! `accessibility` objects. Which one an entry uses is decided exactly once,
//! in `ImageSpec`'s `Deserialize` impl.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One manifest image entry in either wire schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSpec {
    Simple(SimpleImageSpec),
    Enhanced(EnhancedImageSpec),
}

/// Keys whose presence marks an entry as enhanced.
const ENHANCED_KEYS: [&str; 3] = ["technical", "seo", "accessibility"];

impl ImageSpec {
    fn is_enhanced(value: &Value) -> bool {
        ENHANCED_KEYS.iter().any(|k| value.get(k).is_some())
            || value.get("prompt").map_or(false, Value::is_object)
    }
}

impl<'de> Deserialize<'de> for ImageSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(D::Error::custom("image entry must be an object"));
        }
        if ImageSpec::is_enhanced(&value) {
            serde_json::from_value(value)
                .map(ImageSpec::Enhanced)
                .map_err(D::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(ImageSpec::Simple)
                .map_err(D::Error::custom)
        }
    }
}

/// Simple schema: flat string fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimpleImageSpec {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "negativePrompt")]
    pub negative_prompt: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub alt: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "altText")]
    pub alt_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub placement: Option<PlacementSpec>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub height: Option<u32>,
    /// `"WxH"` string, e.g. `"1200x675"`.
    #[serde(default, deserialize_with = "lenient", alias = "size")]
    pub dimensions: Option<String>,
}

/// Enhanced schema: nested technical / SEO / accessibility objects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EnhancedImageSpec {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub prompt: Option<PromptSpec>,
    #[serde(default, deserialize_with = "lenient")]
    pub technical: Option<TechnicalSpec>,
    #[serde(default, deserialize_with = "lenient")]
    pub seo: Option<SeoSpec>,
    #[serde(default, deserialize_with = "lenient")]
    pub accessibility: Option<AccessibilitySpec>,
    #[serde(default, deserialize_with = "lenient")]
    pub placement: Option<PlacementSpec>,
    #[serde(default, deserialize_with = "lenient")]
    pub caption: Option<String>,
    /// Legacy flat alt text kept by some writers next to the nested objects.
    #[serde(default, deserialize_with = "lenient")]
    pub alt: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "altText")]
    pub alt_text: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "negativePrompt")]
    pub negative_prompt: Option<String>,
}

/// Either a ready-made prompt string or structured prompt fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PromptSpec {
    Text(String),
    Structured(StructuredPrompt),
}

/// Structured prompt. `full`, when present, is a ready-made prompt and wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StructuredPrompt {
    #[serde(default, deserialize_with = "lenient", alias = "fullPrompt", alias = "full_prompt")]
    pub full: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub style: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub foreground: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub midground: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub background: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub lighting: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub camera: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mood: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "details")]
    pub detail: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "negativePrompt", alias = "negative")]
    pub negative_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TechnicalSpec {
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_dimension")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient", alias = "size")]
    pub dimensions: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "aspectRatio")]
    pub aspect_ratio: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "negativePrompt")]
    pub negative_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeoSpec {
    #[serde(default, deserialize_with = "lenient", alias = "altText")]
    pub alt_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccessibilitySpec {
    #[serde(default, deserialize_with = "lenient", alias = "altText")]
    pub alt_text: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "longDescription")]
    pub long_description: Option<String>,
}

/// Placement hint: free text or a structured location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PlacementSpec {
    Text(String),
    Structured(StructuredPlacement),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StructuredPlacement {
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "lenient", alias = "afterHeading", alias = "after")]
    pub after_heading: Option<String>,
}

/// Optional leaf that reads as absent when it has the wrong JSON type, so a
/// single malformed field affects its own entry instead of the whole manifest.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match T::deserialize(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed manifest field");
            Ok(None)
        }
    }
}

/// Pixel dimension: an unsigned integer or a numeric string such as `"1200"`.
fn lenient_dimension<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!(%value, "ignoring malformed manifest dimension");
    }
    Ok(parsed)
}

/// String list that keeps only its string elements.
fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
