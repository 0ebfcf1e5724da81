//! Unit resolution for imported rows
//!
//! Best effort: a branch name that matches no active unit, or a lookup that
//! fails, leaves the record without a unit.

use std::sync::Arc;

use crate::store::RfmtStore;

/// Attaches units to records by branch-name containment
#[derive(Clone)]
pub struct UnitResolver {
    store: Arc<dyn RfmtStore>,
}

impl UnitResolver {
    pub fn new(store: Arc<dyn RfmtStore>) -> Self {
        Self { store }
    }

    /// Id of the first active unit whose name contains `branch_name`
    pub async fn resolve(&self, branch_name: &str) -> Option<i64> {
        // An empty fragment is contained in every name
        if branch_name.is_empty() {
            return None;
        }

        match self.store.find_active_unit_by_name_contains(branch_name).await {
            Ok(unit) => unit.map(|u| u.id),
            Err(e) => {
                tracing::warn!(branch = %branch_name, error = %e, "Unit lookup failed, continuing without unit");
                None
            }
        }
    }
}
