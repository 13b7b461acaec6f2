//! Data-directory configuration: categories, initial specializations and
//! load-simulation parameters.
//!
//! Layout:
//!   {data_dir}/categories.json        { "categories": [...] }
//!   {data_dir}/specializations.json   { "specializations": [...] }
//!   {data_dir}/simulation.json        optional, SimulationConfig

use crate::{
    error::{DeskError, DeskResult, FieldError},
    ledger::WorkloadLedger,
    specialization::{Category, SpecializationKey},
    validation::SpecializationDraft,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    pub ticks: u64,
    /// New tickets created per tick, spread uniformly over categories.
    pub arrivals_per_tick: u32,
    /// Chance that an assigned ticket is resolved on a given tick.
    pub resolve_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 30,
            arrivals_per_tick: 4,
            resolve_probability: 0.25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CategoriesFile {
    categories: Vec<Category>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpecializationsFile {
    specializations: Vec<SpecializationDraft>,
}

#[derive(Debug, Clone)]
pub struct DeskConfig {
    pub categories: Vec<Category>,
    pub specializations: Vec<SpecializationDraft>,
    pub simulation: SimulationConfig,
}

impl DeskConfig {
    /// Load from a data directory.
    /// In tests, use DeskConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let cat_path = format!("{data_dir}/categories.json");
        let cat_content = std::fs::read_to_string(&cat_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {cat_path}: {e}"))?;
        let cat_file: CategoriesFile = serde_json::from_str(&cat_content)?;

        let spec_path = format!("{data_dir}/specializations.json");
        let spec_content = std::fs::read_to_string(&spec_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {spec_path}: {e}"))?;
        let spec_file: SpecializationsFile = serde_json::from_str(&spec_content)?;

        let sim_path = format!("{data_dir}/simulation.json");
        let simulation = if Path::new(&sim_path).exists() {
            let sim_content = std::fs::read_to_string(&sim_path)
                .map_err(|e| anyhow::anyhow!("Cannot read {sim_path}: {e}"))?;
            serde_json::from_str(&sim_content)?
        } else {
            SimulationConfig::default()
        };

        Ok(Self {
            categories: cat_file.categories,
            specializations: spec_file.specializations,
            simulation,
        })
    }

    /// Small fixed desk used across the test suite.
    ///
    ///   housing:   ana (primary, 10, rating 5), ben (secondary, 10), cy (backup, 5)
    ///   financial: ana (secondary, 5, rating 4), dee (primary, 3, unavailable)
    pub fn default_test() -> Self {
        let categories = vec![
            Category::new("housing", "Housing & Residence"),
            Category::new("financial", "Financial Aid"),
            Category {
                auto_assign: false,
                crisis_detection_enabled: true,
                ..Category::new("wellbeing", "Wellbeing")
            },
        ];
        let specializations = vec![
            SpecializationDraft::new("ana", "housing").priority("primary").capacity(10).rating(5),
            SpecializationDraft::new("ben", "housing").priority("secondary").capacity(10).rating(5),
            SpecializationDraft::new("cy", "housing").priority("backup").capacity(5),
            SpecializationDraft::new("ana", "financial").priority("secondary").capacity(5).rating(4),
            SpecializationDraft::new("dee", "financial").priority("primary").capacity(3).available(false),
        ];
        Self {
            categories,
            specializations,
            simulation: SimulationConfig::default(),
        }
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.category_id == category_id)
    }

    /// Validate every draft, then add them all. Nothing is written unless
    /// the whole file is clean.
    pub fn seed_ledger(&self, ledger: &WorkloadLedger) -> DeskResult<usize> {
        let mut errors = Vec::new();
        let mut seen = BTreeSet::new();
        for (i, draft) in self.specializations.iter().enumerate() {
            match draft.validate() {
                Ok(spec) => {
                    if !seen.insert(SpecializationKey::new(&spec.counselor_id, &spec.category_id)) {
                        errors.push(FieldError::new(
                            &format!("specializations[{i}]"),
                            format!("duplicate of {}/{}", spec.counselor_id, spec.category_id),
                        ));
                    }
                }
                Err(field_errors) => errors.extend(field_errors.into_iter().map(|e| {
                    FieldError::new(&format!("specializations[{i}].{}", e.field), e.message)
                })),
            }
        }
        if !errors.is_empty() {
            return Err(DeskError::Validation(errors));
        }

        for draft in &self.specializations {
            ledger.add_specialization(draft)?;
        }
        log::info!("seeded {} specializations", self.specializations.len());
        Ok(self.specializations.len())
    }
}
