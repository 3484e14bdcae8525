/*!
 * # CPSC (Contract/Plan/State/County) Enrollment Data Library
 *
 * A Rust library for working with CMS Medicare Advantage monthly enrollment
 * data at the contract/plan/state/county level.
 *
 * ## Features
 *
 * - 🔧 **Schema Tolerant**: maps the column name variants CMS has shipped
 *   across releases onto one canonical set
 * - 📊 **Classification**: derives plan type (HMO/PPO/DSNP) and parent
 *   organization per record, with a contract-info override chain
 * - 🗺️ **Multi-Dimensional Rollups**: enrollment by county, organization,
 *   plan type, state, and contract in one snapshot
 * - 📉 **Baseline Tracking**: month-over-month deltas against a frozen
 *   baseline snapshot
 * - 💾 **JSON Artifacts**: pretty-printed, dashboard-ready output files
 * - ⬇️ **Optional Download**: fetch the monthly ZIP straight from CMS
 *   (`download` feature)
 *
 * ## Quick Start
 *
 * ```no_run
 * use cpsc::prelude::*;
 *
 * # fn main() -> Result<()> {
 * // Load the most recent monthly CSV from a data directory
 * let dataset = EnrollmentDataset::load_latest("./data/raw")?;
 * let snapshot = dataset.snapshot();
 *
 * println!(
 *     "{} records, {} enrolled",
 *     snapshot.metadata.record_count, snapshot.metadata.total_enrollment
 * );
 *
 * // Persist the artifacts and compare against the frozen baseline
 * let store = SnapshotStore::new("./data/processed");
 * store.save_current(&snapshot)?;
 * if let Some(baseline) = store.load_baseline()? {
 *     let changes = cpsc::delta::diff(&snapshot, &baseline);
 *     store.save_changes(&changes)?;
 * }
 * store.save_contracts(&snapshot)?;
 * # Ok(())
 * # }
 * ```
 *
 * ## Loading Data
 *
 * ```no_run
 * # use cpsc::prelude::*;
 * # fn main() -> Result<()> {
 * let dataset = EnrollmentDatasetBuilder::new()
 *     .enrollment_data("data/raw/cpsc_enrollment_2025_06.csv")
 *     .contract_info("data/raw/cpsc_contract_info_2025_06.csv")
 *     .skip_invalid_records(true)
 *     .build()?;
 * # Ok(())
 * # }
 * ```
 *
 * ## CPSC Data Files
 *
 * CMS publishes the data as a monthly ZIP holding two CSVs:
 *
 * - **Enrollment**: one row per contract/plan/state/county with the
 *   enrollment count (counts below 11 are masked with `*`)
 * - **Contract Info**: contract number to organization metadata
 *
 * Column names vary between releases; see [`schema`] for the synonym table.
 */

// Re-export error types from root
pub use error::{CpscError, ErrorContext, Result};

// Public modules
pub mod aggregate;
pub mod classify;
pub mod config;
pub mod data_types;
pub mod dataset;
pub mod delta;
pub mod download;
pub mod error;
pub mod reader;
pub mod schema;
pub mod store;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```
/// use cpsc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aggregate::EnrollmentAggregator;
    pub use crate::classify::{classify_plan_type, classify_records, resolve_parent_org};
    pub use crate::config::CpscConfig;
    pub use crate::data_types::*;
    pub use crate::dataset::{EnrollmentDataset, EnrollmentDatasetBuilder};
    pub use crate::delta::diff;
    pub use crate::error::{CpscError, Result};
    pub use crate::reader::EnrollmentReader;
    pub use crate::schema::ColumnMap;
    pub use crate::store::SnapshotStore;
}

/// Common recipes and utility functions
pub mod cookbook {
    use crate::data_types::{ChangeSet, EnrollmentSnapshot};

    /// Counties ranked by total enrollment, largest first
    pub fn top_counties_by_enrollment(
        snapshot: &EnrollmentSnapshot,
        n: usize,
    ) -> Vec<(String, u64)> {
        let mut counties: Vec<_> = snapshot
            .counties
            .iter()
            .map(|(key, county)| (key.clone(), county.total))
            .collect();
        counties.sort_by(|a, b| b.1.cmp(&a.1));
        counties.truncate(n);
        counties
    }

    /// Organization market share as a fraction of total enrollment
    ///
    /// Returns an empty list for an empty snapshot.
    pub fn org_market_share(snapshot: &EnrollmentSnapshot) -> Vec<(String, f64)> {
        let total = snapshot.metadata.total_enrollment;
        if total == 0 {
            return Vec::new();
        }
        let mut shares: Vec<_> = snapshot
            .by_org
            .iter()
            .map(|(org, &count)| (org.clone(), count as f64 / total as f64))
            .collect();
        shares.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        shares
    }

    /// States ranked by absolute enrollment change, biggest movers first
    pub fn states_by_change(changes: &ChangeSet) -> Vec<(String, i64)> {
        let mut states: Vec<_> = changes
            .by_state
            .iter()
            .map(|(state, change)| (state.clone(), change.change))
            .collect();
        states.sort_by(|a, b| b.1.abs().cmp(&a.1.abs()));
        states
    }
}

#[cfg(test)]
mod tests {
    use crate::classify::classify_plan_type;
    use crate::data_types::{ContractNumber, PlanType};

    #[test]
    fn test_plan_type_classification() {
        let classify = |c: &str, plan: &str, org: &str| {
            classify_plan_type(&ContractNumber::new(c), plan, org)
        };
        assert_eq!(classify("H1234", "Sample PPO Plan", ""), PlanType::Ppo);
        assert_eq!(classify("H1234", "Sample Plan", ""), PlanType::Hmo);
        assert_eq!(classify("R5826", "", ""), PlanType::Ppo);
        assert_eq!(classify("S1234", "", ""), PlanType::Other);
        assert_eq!(classify("H1234", "", "Dual Eligible SNP"), PlanType::Dsnp);
        assert_eq!(classify("", "anything", ""), PlanType::Other);
    }
}
