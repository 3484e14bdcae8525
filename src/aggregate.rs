/*!
 * Multi-dimensional enrollment aggregation
 *
 * Rolls the classified record stream up into an [`EnrollmentSnapshot`]:
 * per-county breakdowns keyed by FIPS (or a synthesized slug), global totals
 * by organization, plan type and state, and a per-contract summary.
 */

use std::collections::BTreeMap;

use crate::data_types::{
    ClassifiedRecord, ContractSummary, CountyRollup, EnrollmentSnapshot, PlanType,
    SnapshotMetadata,
};

/// County label used when the source table has no county value for a record
pub const UNKNOWN_COUNTY: &str = "Unknown";

/// Synthesized county key: lower-cased `state_county` with spaces collapsed
/// to underscores. Used when no FIPS value exists within the group.
pub fn county_key_slug(state: &str, county: &str) -> String {
    format!("{}_{}", state, county).to_lowercase().replace(' ', "_")
}

/// Aggregation engine over a classified record set
pub struct EnrollmentAggregator<'a> {
    records: &'a [ClassifiedRecord],
}

struct ContractAccum {
    enrollment: u64,
    parent_org: String,
    organization: Option<String>,
    /// Plan type counts in first-encounter order; the mode tie-break picks
    /// the earliest entry
    plan_counts: Vec<(PlanType, u64)>,
}

impl<'a> EnrollmentAggregator<'a> {
    pub fn new(records: &'a [ClassifiedRecord]) -> Self {
        Self { records }
    }

    /// Build the full snapshot for this record set
    pub fn snapshot(&self) -> EnrollmentSnapshot {
        let total_enrollment: u64 = self.records.iter().map(|r| r.record.enrollment).sum();

        EnrollmentSnapshot {
            metadata: SnapshotMetadata {
                processed_date: chrono::Utc::now().to_rfc3339(),
                record_count: self.records.len(),
                total_enrollment,
            },
            counties: self.county_rollups(),
            by_org: self.totals_by(|r| r.parent_org.clone()),
            by_plan_type: self.totals_by(|r| r.plan_type.as_str().to_string()),
            by_state: self.totals_by(|r| r.record.state.clone()),
            contracts: self.contract_summaries(),
        }
    }

    fn totals_by<F>(&self, key: F) -> BTreeMap<String, u64>
    where
        F: Fn(&ClassifiedRecord) -> String,
    {
        let mut totals = BTreeMap::new();
        for record in self.records {
            *totals.entry(key(record)).or_insert(0) += record.record.enrollment;
        }
        totals
    }

    fn county_rollups(&self) -> BTreeMap<String, CountyRollup> {
        // Group by (state, county label), keeping input order within each
        // group so the FIPS pick stays deterministic
        let mut groups: BTreeMap<(String, String), Vec<&ClassifiedRecord>> = BTreeMap::new();
        for record in self.records {
            let county = record
                .record
                .county
                .clone()
                .unwrap_or_else(|| UNKNOWN_COUNTY.to_string());
            groups
                .entry((record.record.state.clone(), county))
                .or_default()
                .push(record);
        }

        let mut counties = BTreeMap::new();
        for ((state, county), members) in groups {
            let fips = members
                .iter()
                .find_map(|r| r.record.fips.clone())
                .unwrap_or_else(|| county_key_slug(&state, &county));

            let mut total = 0;
            let mut by_org = BTreeMap::new();
            let mut by_plan_type = BTreeMap::new();
            let mut contracts = BTreeMap::new();
            for record in &members {
                let count = record.record.enrollment;
                total += count;
                *by_org.entry(record.parent_org.clone()).or_insert(0) += count;
                *by_plan_type
                    .entry(record.plan_type.as_str().to_string())
                    .or_insert(0) += count;
                *contracts
                    .entry(record.record.contract_number.as_str().to_string())
                    .or_insert(0) += count;
            }

            counties.insert(
                fips.clone(),
                CountyRollup {
                    state,
                    county,
                    fips,
                    total,
                    by_org,
                    by_plan_type,
                    contracts,
                },
            );
        }

        counties
    }

    fn contract_summaries(&self) -> BTreeMap<String, ContractSummary> {
        let mut accums: BTreeMap<String, ContractAccum> = BTreeMap::new();

        for record in self.records {
            let accum = accums
                .entry(record.record.contract_number.as_str().to_string())
                .or_insert_with(|| ContractAccum {
                    enrollment: 0,
                    parent_org: record.parent_org.clone(),
                    organization: None,
                    plan_counts: Vec::new(),
                });
            accum.enrollment += record.record.enrollment;
            if accum.organization.is_none() {
                accum.organization = record.record.organization.clone();
            }
            match accum
                .plan_counts
                .iter_mut()
                .find(|(pt, _)| *pt == record.plan_type)
            {
                Some((_, n)) => *n += 1,
                None => accum.plan_counts.push((record.plan_type, 1)),
            }
        }

        accums
            .into_iter()
            .map(|(contract, accum)| {
                // Mode of the per-record plan types; strict > keeps the
                // first-encountered entry on ties
                let mut plan_type = PlanType::Other;
                let mut best = 0;
                for &(pt, n) in &accum.plan_counts {
                    if n > best {
                        best = n;
                        plan_type = pt;
                    }
                }
                let organization = accum
                    .organization
                    .unwrap_or_else(|| accum.parent_org.clone());
                (
                    contract,
                    ContractSummary {
                        enrollment: accum.enrollment,
                        parent_org: accum.parent_org,
                        organization,
                        plan_type,
                    },
                )
            })
            .collect()
    }
}
