//! Lookup table loading.
//!
//! Three sheets drive the engine:
//!
//! - the master waste list (per drug/dose/form/method, quantity of each
//!   waste item per dose),
//! - the item weights sheet (grams per unit of each waste item),
//! - the impact sheet (three tiers of CO2e/weight figures side by side,
//!   plus distance comparison bands).
//!
//! Each sheet is parsed once into named records. Resolvers work on those
//! records only.

mod grid;
mod impact;
mod schema;
mod waste;

pub use grid::*;
pub use impact::*;
pub use schema::*;
pub use waste::*;

use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{DuplicatePolicy, EngineConfig};

/// File name of the master waste list inside a data directory.
pub const WASTE_LIST_FILE: &str = "abx-waste-master-list.csv";

/// File name of the item weights sheet inside a data directory.
pub const WEIGHTS_FILE: &str = "weights-and-notes.csv";

/// File name of the impact sheet inside a data directory.
pub const IMPACT_FILE: &str = "env_impact_lookup_tables.csv";

/// Table loading errors.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to read table source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse table source: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table source is empty: {0}")]
    Empty(String),

    #[error("Duplicate lookup key: {0}")]
    DuplicateKey(String),
}

pub type TableResult<T> = Result<T, TableError>;

/// Read and parse one table source from disk.
pub fn read_grid<P: AsRef<Path>>(path: P) -> TableResult<Grid> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    parse_grid(&text, &path.display().to_string())
}

/// Parse one table source, rejecting sources with no content.
pub fn parse_grid(text: &str, source: &str) -> TableResult<Grid> {
    let grid = Grid::parse(text)?;
    if grid.is_empty() {
        return Err(TableError::Empty(source.to_string()));
    }
    Ok(grid)
}

/// All lookup tables for a session.
#[derive(Debug, Clone)]
pub struct LookupTables {
    pub waste: WasteTable,
    pub weights: WeightTable,
    pub impact: ImpactTables,
}

impl LookupTables {
    /// Build tables from CSV text.
    pub fn from_csv(
        waste_csv: &str,
        weights_csv: &str,
        impact_csv: &str,
        config: &EngineConfig,
    ) -> TableResult<Self> {
        let waste = parse_grid(waste_csv, WASTE_LIST_FILE)?;
        let weights = parse_grid(weights_csv, WEIGHTS_FILE)?;
        let impact = parse_grid(impact_csv, IMPACT_FILE)?;
        Self::from_grids(&waste, &weights, &impact, config)
    }

    /// Load the three standard files from a data directory.
    pub fn load_dir<P: AsRef<Path>>(dir: P, config: &EngineConfig) -> TableResult<Self> {
        let dir = dir.as_ref();
        let waste = read_grid(dir.join(WASTE_LIST_FILE))?;
        let weights = read_grid(dir.join(WEIGHTS_FILE))?;
        let impact = read_grid(dir.join(IMPACT_FILE))?;
        Self::from_grids(&waste, &weights, &impact, config)
    }

    /// Build tables from parsed grids and apply the duplicate-key policy.
    pub fn from_grids(
        waste: &Grid,
        weights: &Grid,
        impact: &Grid,
        config: &EngineConfig,
    ) -> TableResult<Self> {
        let tables = Self {
            waste: WasteTable::from_grid(waste, &config.waste_layout),
            weights: WeightTable::from_grid(weights, &config.weight_layout),
            impact: ImpactTables::from_grid(impact, &config.impact_layout),
        };

        debug!(
            waste_rows = tables.waste.rows().len(),
            waste_items = tables.waste.item_names().len(),
            weights = tables.weights.len(),
            tier1 = tables.impact.tier_rows(crate::models::ImpactTier::DrugMethod).len(),
            tier2 = tables.impact.tier_rows(crate::models::ImpactTier::Dose).len(),
            tier3 = tables.impact.tier_rows(crate::models::ImpactTier::DoseForm).len(),
            "Loaded lookup tables"
        );

        tables.check_duplicates(config.duplicate_policy)?;
        Ok(tables)
    }

    /// Every lookup key that appears more than once, across all tables.
    pub fn duplicate_keys(&self) -> Vec<String> {
        let mut keys = self.waste.duplicate_keys();
        keys.extend(self.impact.duplicate_keys());
        keys
    }

    fn check_duplicates(&self, policy: DuplicatePolicy) -> TableResult<()> {
        let duplicates = self.duplicate_keys();
        if duplicates.is_empty() {
            return Ok(());
        }

        match policy {
            DuplicatePolicy::FirstMatch => {
                for key in &duplicates {
                    warn!(key = %key, "Duplicate lookup key, first row wins");
                }
                Ok(())
            }
            DuplicatePolicy::Reject => Err(TableError::DuplicateKey(duplicates.join("; "))),
        }
    }
}
