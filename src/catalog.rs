//! Category to model mapping.
//!
//! The catalog is built once at startup from configuration and shared
//! read-only between the gateway and the handlers.

use crate::config::ModelOverrides;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of content a request carries. Selects the endpoint, the model,
/// and the payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Text,
    Image,
    Audio,
    Document,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Text,
        Category::Image,
        Category::Audio,
        Category::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Image => "image",
            Category::Audio => "audio",
            Category::Document => "document",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Category::Text => "/generate-text",
            Category::Image => "/generate-from-image",
            Category::Audio => "/generate-from-audio",
            Category::Document => "/generate-from-document",
        }
    }

    /// Name of the multipart field holding the upload.
    pub fn field_name(&self) -> &'static str {
        self.as_str()
    }

    /// Prompt used when a file arrives without one.
    pub fn default_prompt(&self) -> Option<&'static str> {
        match self {
            Category::Text => None,
            Category::Image => Some("Describe this image"),
            Category::Audio => Some("Describe this audio"),
            Category::Document => Some("Describe this document"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_AUDIO_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_DOCUMENT_MODEL: &str = "gemini-2.5-flash-lite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    text: String,
    image: String,
    audio: String,
    document: String,
}

impl ModelCatalog {
    pub fn from_overrides(overrides: &ModelOverrides) -> Self {
        let pick = |value: &Option<String>, fallback: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        Self {
            text: pick(&overrides.text, DEFAULT_TEXT_MODEL),
            image: pick(&overrides.image, DEFAULT_IMAGE_MODEL),
            audio: pick(&overrides.audio, DEFAULT_AUDIO_MODEL),
            document: pick(&overrides.document, DEFAULT_DOCUMENT_MODEL),
        }
    }

    pub fn model_for(&self, category: Category) -> &str {
        match category {
            Category::Text => &self.text,
            Category::Image => &self.image,
            Category::Audio => &self.audio,
            Category::Document => &self.document,
        }
    }

    /// Distinct model identifiers, in category order.
    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let model = self.model_for(category);
            if !models.contains(&model) {
                models.push(model);
            }
        }
        models
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::from_overrides(&ModelOverrides::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_catalog() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.model_for(Category::Text), "gemini-2.5-flash-lite");
        assert_eq!(catalog.model_for(Category::Image), "gemini-2.5-flash");
        assert_eq!(catalog.model_for(Category::Audio), "gemini-2.5-flash");
        assert_eq!(catalog.model_for(Category::Document), "gemini-2.5-flash-lite");
    }

    #[test]
    fn test_models_are_deduplicated() {
        let catalog = ModelCatalog::default();
        assert_eq!(
            catalog.models(),
            vec!["gemini-2.5-flash-lite", "gemini-2.5-flash"]
        );
    }

    #[test]
    fn test_overrides_replace_only_named_entries() {
        let overrides = ModelOverrides {
            audio: Some("gemini-2.5-pro".to_string()),
            document: Some("   ".to_string()),
            ..Default::default()
        };
        let catalog = ModelCatalog::from_overrides(&overrides);

        assert_eq!(catalog.model_for(Category::Audio), "gemini-2.5-pro");
        assert_eq!(catalog.model_for(Category::Document), DEFAULT_DOCUMENT_MODEL);
        assert_eq!(catalog.model_for(Category::Text), DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn test_default_prompts() {
        assert_eq!(Category::Text.default_prompt(), None);
        assert_eq!(Category::Image.default_prompt(), Some("Describe this image"));
        assert_eq!(Category::Audio.default_prompt(), Some("Describe this audio"));
        assert_eq!(
            Category::Document.default_prompt(),
            Some("Describe this document")
        );
    }

    #[test]
    fn test_field_names_and_endpoints() {
        for category in [Category::Image, Category::Audio, Category::Document] {
            assert_eq!(category.field_name(), category.as_str());
            assert!(category.endpoint().ends_with(category.as_str()));
        }
        assert_eq!(Category::Text.endpoint(), "/generate-text");
    }
}
