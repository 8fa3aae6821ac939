//! Loaders for the categories file and the prompt template.

use crate::domain::model::{Category, CategoryMap, PromptTemplate, VALUE_PLACEHOLDER};
use crate::utils::error::{ProbeError, Result};
use crate::utils::validation::validate_path_component;
use std::path::Path;

impl CategoryMap {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| ProbeError::ConfigError {
            message: format!("cannot read categories file '{}': {}", path.as_ref().display(), e),
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(content).map_err(|e| ProbeError::ConfigValidationError {
                field: "categories".to_string(),
                message: format!("expected a JSON object of string arrays: {}", e),
            })?;

        let mut categories = Vec::with_capacity(raw.len());
        for (name, values) in raw {
            validate_path_component("categories", &name)?;

            let values: Vec<String> =
                serde_json::from_value(values).map_err(|e| ProbeError::ConfigValidationError {
                    field: format!("categories.{}", name),
                    message: format!("expected an array of strings: {}", e),
                })?;

            for value in &values {
                validate_path_component(&format!("categories.{}", name), value)?;
            }

            if values.is_empty() {
                tracing::warn!("⚠️ Category '{}' has no values", name);
            }

            categories.push(Category { name, values });
        }

        if categories.is_empty() {
            return Err(ProbeError::ConfigValidationError {
                field: "categories".to_string(),
                message: "category list is empty".to_string(),
            });
        }

        Ok(Self { categories })
    }
}

impl PromptTemplate {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| ProbeError::ConfigError {
            message: format!("cannot read prompt template '{}': {}", path.as_ref().display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let template: PromptTemplate = serde_yaml::from_str(content)?;

        if template.value_slots()? == 0 {
            return Err(ProbeError::ConfigValidationError {
                field: "user.content".to_string(),
                message: format!("template must contain the {} placeholder", VALUE_PLACEHOLDER),
            });
        }

        Ok(template)
    }
}
