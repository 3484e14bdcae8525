/*!
 * Data type definitions for CPSC enrollment records
 *
 * This module contains type-safe representations of the normalized enrollment
 * data, the classification outputs, and the aggregate snapshot/changeset
 * structures persisted as JSON artifacts.
 */

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// CMS contract identifier (e.g. H0028, R5826, S1234)
///
/// The first letter encodes the contract class (H = local MA, R = regional
/// PPO, S = stand-alone PDP, E = employer group). Contract numbers are kept
/// as-is; malformed or empty values classify as `Other` rather than erroring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractNumber(pub String);

impl ContractNumber {
    pub fn new<S: Into<String>>(contract: S) -> Self {
        ContractNumber(contract.into())
    }

    /// Get the contract number as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First character, upper-cased, which encodes the contract class
    pub fn prefix(&self) -> Option<char> {
        self.0.chars().next().map(|c| c.to_ascii_uppercase())
    }

    /// First five characters, the granularity of the parent organization map
    pub fn base(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(5)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for ContractNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Medicare Advantage plan type derived from contract ID and plan name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanType {
    #[serde(rename = "HMO")]
    Hmo,
    #[serde(rename = "PPO")]
    Ppo,
    #[serde(rename = "DSNP")]
    Dsnp,
    Other,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Hmo => "HMO",
            PlanType::Ppo => "PPO",
            PlanType::Dsnp => "DSNP",
            PlanType::Other => "Other",
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One normalized row of the CPSC enrollment table
///
/// Produced by the schema normalizer; all downstream components operate on
/// this fixed shape regardless of which column variants the release used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub contract_number: ContractNumber,
    pub plan_id: Option<String>,
    pub state: String,
    pub county: Option<String>,
    pub fips: Option<String>,
    /// Enrollment count after coercion; CMS masks counts below 11 with '*',
    /// which (like any other non-numeric value) coerces to 0.
    pub enrollment: u64,
    pub organization: Option<String>,
    pub plan_name: Option<String>,
    pub org_type: Option<String>,
}

/// An enrollment record with the two derived classification fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub record: EnrollmentRecord,
    pub plan_type: PlanType,
    pub parent_org: String,
}

/// Mapping from full contract number to a known parent organization name
///
/// Built from the per-release contract info table when present; empty
/// otherwise. An exact match here overrides the static prefix mapping.
#[derive(Debug, Default, Clone)]
pub struct OrgLookup {
    map: HashMap<String, String>,
}

impl OrgLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<C: Into<String>, O: Into<String>>(&mut self, contract: C, org: O) {
        self.map.insert(contract.into(), org.into());
    }

    pub fn get(&self, contract: &str) -> Option<&str> {
        self.map.get(contract).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(String, String)> for OrgLookup {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Snapshot metadata block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// RFC 3339 timestamp of the processing run
    pub processed_date: String,
    pub record_count: usize,
    pub total_enrollment: u64,
}

/// Per-county aggregate within a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyRollup {
    pub state: String,
    pub county: String,
    /// FIPS code when the source supplied one, else the synthesized key
    pub fips: String,
    pub total: u64,
    pub by_org: BTreeMap<String, u64>,
    pub by_plan_type: BTreeMap<String, u64>,
    pub contracts: BTreeMap<String, u64>,
}

/// Per-contract summary within a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub enrollment: u64,
    pub parent_org: String,
    pub organization: String,
    pub plan_type: PlanType,
}

/// Aggregate result of one processing run
///
/// Maps are `BTreeMap` so the JSON artifacts serialize with stable key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentSnapshot {
    pub metadata: SnapshotMetadata,
    /// Keyed by FIPS code, or a synthesized `state_county` slug when the
    /// source had no usable FIPS value for the group
    pub counties: BTreeMap<String, CountyRollup>,
    pub by_org: BTreeMap<String, u64>,
    pub by_plan_type: BTreeMap<String, u64>,
    pub by_state: BTreeMap<String, u64>,
    pub contracts: BTreeMap<String, ContractSummary>,
}

/// Change for a single key in one diff dimension
///
/// `change_pct` is 0.0 when the baseline value is 0; not a true percentage in
/// that case, but it keeps the output finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionChange {
    pub current: u64,
    pub baseline: u64,
    pub change: i64,
    pub change_pct: f64,
}

/// Grand totals block of a changeset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub total_current: u64,
    pub total_baseline: u64,
    pub total_change: i64,
    pub total_change_pct: f64,
}

/// Per-dimension enrollment changes between a current and a baseline snapshot
///
/// Recomputed every run, never fed back into another computation. Only keys
/// present in the current snapshot are reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub counties: BTreeMap<String, DimensionChange>,
    pub by_org: BTreeMap<String, DimensionChange>,
    pub by_state: BTreeMap<String, DimensionChange>,
    pub summary: ChangeSummary,
}
