/*!
 * Snapshot diffing against a frozen baseline
 *
 * Compares the current snapshot to a baseline per dimension (counties,
 * organizations, states) and reports absolute and percentage changes.
 * Keys absent from the baseline count as 0; keys that exist only in the
 * baseline are not reported — the iteration runs over the current snapshot.
 */

use std::collections::BTreeMap;

use crate::data_types::{ChangeSet, ChangeSummary, DimensionChange, EnrollmentSnapshot};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage change, guarded: 0.0 when the baseline is 0 so the output
/// stays finite (documented, not a true percentage in that case)
fn change_pct(change: i64, baseline: u64) -> f64 {
    if baseline > 0 {
        round2(change as f64 / baseline as f64 * 100.0)
    } else {
        0.0
    }
}

fn change_entry(current: u64, baseline: u64) -> DimensionChange {
    let change = current as i64 - baseline as i64;
    DimensionChange {
        current,
        baseline,
        change,
        change_pct: change_pct(change, baseline),
    }
}

fn dimension_diff(
    current: &BTreeMap<String, u64>,
    baseline: &BTreeMap<String, u64>,
) -> BTreeMap<String, DimensionChange> {
    current
        .iter()
        .map(|(key, &value)| {
            let base = baseline.get(key).copied().unwrap_or(0);
            (key.clone(), change_entry(value, base))
        })
        .collect()
}

/// Compute the changeset between a current snapshot and a baseline
pub fn diff(current: &EnrollmentSnapshot, baseline: &EnrollmentSnapshot) -> ChangeSet {
    let counties = current
        .counties
        .iter()
        .map(|(key, county)| {
            let base = baseline
                .counties
                .get(key)
                .map(|c| c.total)
                .unwrap_or(0);
            (key.clone(), change_entry(county.total, base))
        })
        .collect();

    let total_current = current.metadata.total_enrollment;
    let total_baseline = baseline.metadata.total_enrollment;
    let total_change = total_current as i64 - total_baseline as i64;

    ChangeSet {
        counties,
        by_org: dimension_diff(&current.by_org, &baseline.by_org),
        by_state: dimension_diff(&current.by_state, &baseline.by_state),
        summary: ChangeSummary {
            total_current,
            total_baseline,
            total_change,
            total_change_pct: change_pct(total_change, total_baseline),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::EnrollmentAggregator;
    use crate::data_types::{ClassifiedRecord, ContractNumber, EnrollmentRecord, PlanType};

    fn snapshot(entries: &[(&str, &str, u64)]) -> EnrollmentSnapshot {
        let records: Vec<ClassifiedRecord> = entries
            .iter()
            .map(|(contract, state, enrollment)| ClassifiedRecord {
                record: EnrollmentRecord {
                    contract_number: ContractNumber::new(*contract),
                    plan_id: None,
                    state: state.to_string(),
                    county: Some("Sample".to_string()),
                    fips: None,
                    enrollment: *enrollment,
                    organization: None,
                    plan_name: None,
                    org_type: None,
                },
                plan_type: PlanType::Hmo,
                parent_org: "Org A".to_string(),
            })
            .collect();
        EnrollmentAggregator::new(&records).snapshot()
    }

    #[test]
    fn diff_against_self_is_all_zero() {
        let s = snapshot(&[("H0001", "CA", 100), ("H0002", "NY", 50)]);
        let changes = diff(&s, &s);

        assert_eq!(changes.summary.total_change, 0);
        assert_eq!(changes.summary.total_change_pct, 0.0);
        for entry in changes
            .counties
            .values()
            .chain(changes.by_org.values())
            .chain(changes.by_state.values())
        {
            assert_eq!(entry.change, 0);
            assert_eq!(entry.change_pct, 0.0);
        }
    }

    #[test]
    fn zero_baseline_yields_zero_pct() {
        let current = snapshot(&[("H0001", "CA", 100)]);
        let baseline = snapshot(&[("H0001", "CA", 0)]);
        let changes = diff(&current, &baseline);

        let state = &changes.by_state["CA"];
        assert_eq!(state.change, 100);
        assert_eq!(state.change_pct, 0.0);
        assert_eq!(changes.summary.total_change, 100);
        assert_eq!(changes.summary.total_change_pct, 0.0);
    }

    #[test]
    fn pct_rounds_to_two_decimals() {
        let current = snapshot(&[("H0001", "CA", 4)]);
        let baseline = snapshot(&[("H0001", "CA", 3)]);
        let changes = diff(&current, &baseline);
        assert_eq!(changes.by_state["CA"].change_pct, 33.33);

        let shrink = diff(&baseline, &current);
        assert_eq!(shrink.by_state["CA"].change_pct, -25.0);
    }

    #[test]
    fn keys_absent_from_baseline_count_from_zero() {
        let current = snapshot(&[("H0001", "CA", 100), ("H0002", "NY", 50)]);
        let baseline = snapshot(&[("H0001", "CA", 80)]);
        let changes = diff(&current, &baseline);

        let ny = &changes.by_state["NY"];
        assert_eq!(ny.baseline, 0);
        assert_eq!(ny.change, 50);
        assert_eq!(ny.change_pct, 0.0);
    }

    #[test]
    fn keys_only_in_baseline_are_omitted() {
        let current = snapshot(&[("H0001", "CA", 100)]);
        let baseline = snapshot(&[("H0001", "CA", 80), ("H0002", "NY", 50)]);
        let changes = diff(&current, &baseline);

        assert!(changes.by_state.contains_key("CA"));
        assert!(!changes.by_state.contains_key("NY"));
    }
}
