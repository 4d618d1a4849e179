//! Regimen resolution.
//!
//! Pipeline: Lookup Tables → Catalog → (user selection) → Waste / Impact

mod catalog;
mod impact;
mod search;
mod selection;
mod waste;

pub use catalog::*;
pub use impact::*;
pub use search::*;
pub use selection::*;
pub use waste::*;

use thiserror::Error;

use crate::models::{EnvironmentalImpact, WasteItem};
use crate::tables::LookupTables;

/// Resolver errors.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Data not found for {drug} {dose}mg with method: {method}")]
    NotFound {
        drug: String,
        dose: String,
        method: String,
    },

    #[error("Invalid selection: {0}")]
    Validation(#[from] ValidationError),
}

pub type ResolverResult<T> = Result<T, ResolverError>;

/// Coordinates waste and impact resolution over one set of tables.
pub struct Resolver<'a> {
    tables: &'a LookupTables,
    waste: WasteResolver<'a>,
    impact: ImpactResolver<'a>,
}

impl<'a> Resolver<'a> {
    /// Create a new resolver.
    pub fn new(tables: &'a LookupTables) -> Self {
        Self {
            tables,
            waste: WasteResolver::new(&tables.waste, &tables.weights),
            impact: ImpactResolver::new(&tables.impact),
        }
    }

    /// Validate a waste selection and resolve its per-dose waste items.
    pub fn resolve_waste(
        &self,
        selection: &WasteSelection,
        catalog: &Catalog,
    ) -> ResolverResult<(ValidatedWasteSelection, Vec<WasteItem>)> {
        let validated = selection.validate(catalog)?;
        let items = self.waste.resolve_selection(&validated)?;
        Ok((validated, items))
    }

    /// Resolve the impact of an impact-calculator selection.
    pub fn resolve_impact(&self, selection: &ImpactSelection) -> Option<EnvironmentalImpact> {
        self.impact.resolve(&selection.query()?)
    }

    /// Build the drug catalog for these tables.
    pub fn catalog(&self) -> Catalog {
        Catalog::build(&self.tables.waste)
    }

    /// Get the waste resolver for direct access.
    pub fn waste(&self) -> &WasteResolver<'a> {
        &self.waste
    }

    /// Get the impact resolver for direct access.
    pub fn impact(&self) -> &ImpactResolver<'a> {
        &self.impact
    }
}
