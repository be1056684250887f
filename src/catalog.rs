// src/catalog.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Exam parameters for one module's summative test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamConfig {
    /// How many questions are drawn from the module's pool per test.
    pub sample_size: usize,
    /// Fixed point value of every question.
    pub points_per_question: i32,
    /// Minimum total score percentage that counts as a pass.
    pub pass_percent: f64,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            points_per_question: 10,
            pass_percent: 70.0,
        }
    }
}

/// Per-module configuration. Replaces the per-page literals ("4 sections",
/// "70%") that would otherwise be scattered across call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub module_id: String,
    pub title: String,
    /// Course-identifying pattern the content gate matches (case-insensitive
    /// substring) against an enrollment's course title / program name.
    pub course_pattern: String,
    /// Fixed number of sections in this module. The overall percentage is
    /// always computed against this constant, never against row contents.
    pub section_count: u32,
    /// Minimum overall progress required to sit the module test.
    pub required_progress_percent: f64,
    #[serde(default)]
    pub exam: ExamConfig,
}

impl ModuleConfig {
    /// True when `section` names one of this module's sections (1-based).
    pub fn has_section(&self, section: u32) -> bool {
        section >= 1 && section <= self.section_count
    }
}

/// The set of modules this deployment serves, keyed by module id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCatalog {
    modules: HashMap<String, ModuleConfig>,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<ModuleConfig>) -> Self {
        Self {
            modules: modules
                .into_iter()
                .map(|m| (m.module_id.clone(), m))
                .collect(),
        }
    }

    /// Loads a catalog from a JSON file (an array of `ModuleConfig`).
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::InternalServerError(format!("read catalog {}: {}", path, e)))?;
        let modules: Vec<ModuleConfig> = serde_json::from_str(&contents)
            .map_err(|e| AppError::InternalServerError(format!("parse catalog {}: {}", path, e)))?;
        Ok(Self::new(modules))
    }

    pub fn get(&self, module_id: &str) -> Option<&ModuleConfig> {
        self.modules.get(module_id)
    }

    /// Looks up a module or reports 404 for ids the catalog does not know.
    pub fn require(&self, module_id: &str) -> Result<&ModuleConfig, AppError> {
        self.get(module_id)
            .ok_or_else(|| AppError::NotFound(format!("Unknown module '{}'", module_id)))
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::new(vec![
            ModuleConfig {
                module_id: "web-foundations".to_string(),
                title: "Web Foundations".to_string(),
                course_pattern: "web development".to_string(),
                section_count: 4,
                required_progress_percent: 70.0,
                exam: ExamConfig::default(),
            },
            ModuleConfig {
                module_id: "db-essentials".to_string(),
                title: "Database Essentials".to_string(),
                course_pattern: "database".to_string(),
                section_count: 4,
                required_progress_percent: 70.0,
                exam: ExamConfig::default(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_resolves_known_module() {
        let catalog = ModuleCatalog::default();
        let module = catalog.require("web-foundations").unwrap();
        assert_eq!(module.section_count, 4);
        assert_eq!(module.exam.sample_size, 10);
    }

    #[test]
    fn unknown_module_is_not_found() {
        let catalog = ModuleCatalog::default();
        assert!(matches!(
            catalog.require("nope"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn section_bounds() {
        let catalog = ModuleCatalog::default();
        let module = catalog.get("db-essentials").unwrap();
        assert!(module.has_section(1));
        assert!(module.has_section(4));
        assert!(!module.has_section(0));
        assert!(!module.has_section(5));
    }
}
