//! Known model lists and model classification.

use crate::Persona;
use serde::{Deserialize, Serialize};

/// Popular uncensored models suggested to users who have none installed.
const RECOMMENDED_UNCENSORED: &[&str] = &[
    "llama2-uncensored",
    "mistral-uncensored",
    "codellama-uncensored",
    "dolphin-phi",
    "wizard-vicuna-uncensored",
    "airoboros",
    "nous-hermes",
    "openhermes",
    "dolphin-llama2",
    "dolphin-mistral",
];

/// Name fragments that mark a model as uncensored.
const UNCENSORED_KEYWORDS: &[&str] = &[
    "uncensored",
    "dolphin",
    "airoboros",
    "openhermes",
    "wizard-vicuna",
    "nous-hermes",
];

/// Startup-loaded model classification data.
///
/// The catalog is immutable once built; share it behind an `Arc` or clone it.
///
/// # Examples
///
/// ```
/// use taleweaver_core::{ModelCatalog, Persona};
///
/// let catalog = ModelCatalog::default();
/// assert!(catalog.is_uncensored("dolphin-mistral:latest"));
/// assert_eq!(catalog.persona("llama2"), Persona::Storyteller);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    recommended_uncensored: Vec<String>,
    uncensored_keywords: Vec<String>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(
            RECOMMENDED_UNCENSORED.iter().map(|s| s.to_string()).collect(),
            UNCENSORED_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl ModelCatalog {
    /// Build a catalog; keywords are matched case-insensitively.
    pub fn new(recommended_uncensored: Vec<String>, uncensored_keywords: Vec<String>) -> Self {
        Self {
            recommended_uncensored,
            uncensored_keywords: uncensored_keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Models suggested for unrestricted storytelling.
    pub fn recommended_uncensored(&self) -> &[String] {
        &self.recommended_uncensored
    }

    /// Lowercased keywords that mark a model as uncensored.
    pub fn uncensored_keywords(&self) -> &[String] {
        &self.uncensored_keywords
    }

    /// Whether a model name matches an uncensored keyword.
    pub fn is_uncensored(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        self.uncensored_keywords
            .iter()
            .any(|keyword| model.contains(keyword.as_str()))
    }

    /// The storyteller persona to use with a model.
    pub fn persona(&self, model: &str) -> Persona {
        if self.is_uncensored(model) {
            Persona::Unrestricted
        } else {
            Persona::Storyteller
        }
    }

    /// Split available model names into standard and uncensored groups.
    pub fn categorize(&self, models: &[String]) -> ModelCategories {
        let (uncensored, standard) = models
            .iter()
            .cloned()
            .partition(|model| self.is_uncensored(model));
        ModelCategories {
            standard,
            uncensored,
        }
    }
}

/// Available models grouped by classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCategories {
    /// Models without an uncensored marker
    pub standard: Vec<String>,
    /// Models matching an uncensored keyword
    pub uncensored: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        let catalog = ModelCatalog::new(vec![], vec!["Dolphin".to_string()]);
        assert!(catalog.is_uncensored("DOLPHIN-phi"));
        assert!(!catalog.is_uncensored("mistral"));
    }

    #[test]
    fn test_categorize_preserves_order() {
        let catalog = ModelCatalog::default();
        let models = vec![
            "llama2:latest".to_string(),
            "llama2-uncensored:7b".to_string(),
            "mistral:latest".to_string(),
            "nous-hermes:13b".to_string(),
        ];
        let categories = catalog.categorize(&models);
        assert_eq!(categories.standard, vec!["llama2:latest", "mistral:latest"]);
        assert_eq!(
            categories.uncensored,
            vec!["llama2-uncensored:7b", "nous-hermes:13b"]
        );
    }

    #[test]
    fn test_default_recommendations() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.recommended_uncensored().len(), 10);
        assert!(
            catalog
                .recommended_uncensored()
                .iter()
                .all(|model| catalog.is_uncensored(model))
        );
    }
}
