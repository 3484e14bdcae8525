/*!
 * Schema definitions for CPSC enrollment files
 *
 * CMS has renamed columns across monthly releases, so rather than pinning an
 * exact header layout this module maps whatever the release shipped onto a
 * canonical column set. Downstream components only ever see canonical names.
 */

use csv::StringRecord;

use crate::data_types::{ContractNumber, EnrollmentRecord};
use crate::error::{CpscError, Result};

/// Canonical column names and the header variants observed across releases,
/// in priority order: for each canonical field the first variant found wins.
pub const COLUMN_SYNONYMS: &[(&str, &[&str])] = &[
    ("contract_number", &["contract_number", "contractid", "contract_id", "h_number"]),
    ("plan_id", &["plan_id", "planid", "plan_number"]),
    ("state", &["state", "state_code", "bene_state"]),
    ("county", &["county", "county_name", "bene_county"]),
    ("fips", &["fips", "fips_code", "county_fips", "ssa_code", "fips_state_county_code"]),
    ("enrollment", &["enrollment", "total_enrollment", "enrolled", "member_count", "enrollees"]),
    ("organization", &["organization_name", "org_name", "organization", "plan_org_name", "parent_organization"]),
    ("plan_name", &["plan_name", "plan_benefit_package_name", "pbp_name"]),
    ("org_type", &["organization_type", "org_type", "special_needs_plan_type"]),
];

/// Canonical fields that must resolve for processing to proceed
pub const REQUIRED_FIELDS: &[&str] = &["contract_number", "state", "enrollment"];

/// Parent organization column variants in the contract info table
pub const CONTRACT_INFO_ORG_COLUMNS: &[&str] = &[
    "parent_organization",
    "parent_org",
    "organization",
    "organization_name",
];

/// Contract number column variants in the contract info table
pub const CONTRACT_INFO_CONTRACT_COLUMNS: &[&str] =
    &["contract_number", "contract_id", "contractid"];

/// Normalize a raw header: trim, lowercase, spaces to underscores
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Resolved mapping from canonical fields to column positions in one table
///
/// Columns that match no canonical field are passed through untouched; they
/// are recorded for diagnostics but never consulted again.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub contract_number: usize,
    pub state: usize,
    pub enrollment: usize,
    pub plan_id: Option<usize>,
    pub county: Option<usize>,
    pub fips: Option<usize>,
    pub organization: Option<usize>,
    pub plan_name: Option<usize>,
    pub org_type: Option<usize>,
    /// Normalized names of columns with no canonical mapping
    pub passthrough: Vec<String>,
}

impl ColumnMap {
    /// Resolve a header row against the synonym table
    ///
    /// Fails with `CpscError::Schema` listing the missing required fields and
    /// the columns that were available, so drift in a new release is
    /// diagnosable from the error alone.
    pub fn from_headers(headers: &[String]) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let mut resolved: Vec<Option<usize>> = Vec::with_capacity(COLUMN_SYNONYMS.len());
        let mut matched = vec![false; normalized.len()];

        for (_, variants) in COLUMN_SYNONYMS {
            let position = variants
                .iter()
                .find_map(|v| normalized.iter().position(|h| h == v));
            if let Some(idx) = position {
                matched[idx] = true;
            }
            resolved.push(position);
        }

        let missing: Vec<String> = COLUMN_SYNONYMS
            .iter()
            .zip(resolved.iter())
            .filter(|((canonical, _), pos)| {
                pos.is_none() && REQUIRED_FIELDS.contains(canonical)
            })
            .map(|((canonical, _), _)| canonical.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(CpscError::missing_required_columns(missing, normalized));
        }

        let field = |name: &str| -> Option<usize> {
            COLUMN_SYNONYMS
                .iter()
                .position(|(canonical, _)| *canonical == name)
                .and_then(|i| resolved[i])
        };

        let passthrough = normalized
            .iter()
            .zip(matched.iter())
            .filter(|(_, m)| !**m)
            .map(|(h, _)| h.clone())
            .collect();

        Ok(ColumnMap {
            // Required fields are present; checked above
            contract_number: field("contract_number").unwrap(),
            state: field("state").unwrap(),
            enrollment: field("enrollment").unwrap(),
            plan_id: field("plan_id"),
            county: field("county"),
            fips: field("fips"),
            organization: field("organization"),
            plan_name: field("plan_name"),
            org_type: field("org_type"),
            passthrough,
        })
    }

    /// Build a normalized record from one CSV row
    pub fn record_from_row(&self, row: &StringRecord) -> EnrollmentRecord {
        let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");
        let optional = |idx: Option<usize>| -> Option<String> {
            idx.map(cell)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        EnrollmentRecord {
            contract_number: ContractNumber::new(cell(self.contract_number)),
            plan_id: optional(self.plan_id),
            state: cell(self.state).to_string(),
            county: optional(self.county),
            fips: optional(self.fips),
            enrollment: parse_enrollment_count(cell(self.enrollment)),
            organization: optional(self.organization),
            plan_name: optional(self.plan_name),
            org_type: optional(self.org_type),
        }
    }
}

/// Coerce a raw enrollment cell to a non-negative count
///
/// Thousands separators are stripped; CMS masks counts below 11 with '*', and
/// masked, missing, or otherwise non-numeric values all coerce to 0.
pub fn parse_enrollment_count(raw: &str) -> u64 {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return 0;
    }
    if let Ok(n) = cleaned.parse::<u64>() {
        return n;
    }
    // Some releases carry float-formatted counts ("150.0")
    match cleaned.parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => f.trunc() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header(" Contract Number "), "contract_number");
        assert_eq!(normalize_header("FIPS State County Code"), "fips_state_county_code");
    }

    #[test]
    fn maps_variant_headers_to_canonical_fields() {
        let map = ColumnMap::from_headers(&headers(&[
            "Contract ID",
            "State Code",
            "County Name",
            "Enrolled",
        ]))
        .unwrap();
        assert_eq!(map.contract_number, 0);
        assert_eq!(map.state, 1);
        assert_eq!(map.county, Some(2));
        assert_eq!(map.enrollment, 3);
        assert_eq!(map.fips, None);
    }

    #[test]
    fn first_synonym_in_priority_order_wins() {
        // Both "enrollment" and "total_enrollment" present; the earlier
        // variant in the synonym list takes priority.
        let map = ColumnMap::from_headers(&headers(&[
            "contract_number",
            "state",
            "total_enrollment",
            "enrollment",
        ]))
        .unwrap();
        assert_eq!(map.enrollment, 3);
    }

    #[test]
    fn unmatched_columns_pass_through() {
        let map = ColumnMap::from_headers(&headers(&[
            "contract_number",
            "state",
            "enrollment",
            "Mystery Column",
        ]))
        .unwrap();
        assert_eq!(map.passthrough, vec!["mystery_column".to_string()]);
    }

    #[test]
    fn missing_required_columns_error_names_them() {
        let err = ColumnMap::from_headers(&headers(&["contract_number", "county"])).unwrap_err();
        match err {
            CpscError::Schema {
                missing_fields,
                available_columns,
            } => {
                assert_eq!(missing_fields, vec!["state", "enrollment"]);
                assert_eq!(available_columns, vec!["contract_number", "county"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn enrollment_coercion() {
        assert_eq!(parse_enrollment_count("1,234"), 1234);
        assert_eq!(parse_enrollment_count("*"), 0);
        assert_eq!(parse_enrollment_count(""), 0);
        assert_eq!(parse_enrollment_count("  150 "), 150);
        assert_eq!(parse_enrollment_count("150.0"), 150);
        assert_eq!(parse_enrollment_count("-5"), 0);
        assert_eq!(parse_enrollment_count("n/a"), 0);
    }

    #[test]
    fn rows_map_to_records() {
        let map = ColumnMap::from_headers(&headers(&[
            "Contract Number",
            "Plan ID",
            "State",
            "County",
            "Enrollment",
        ]))
        .unwrap();
        let row = StringRecord::from(vec!["H0028", "001", "CA", "Los Angeles", "1,500"]);
        let record = map.record_from_row(&row);
        assert_eq!(record.contract_number.as_str(), "H0028");
        assert_eq!(record.plan_id.as_deref(), Some("001"));
        assert_eq!(record.state, "CA");
        assert_eq!(record.county.as_deref(), Some("Los Angeles"));
        assert_eq!(record.enrollment, 1500);
        assert_eq!(record.fips, None);
    }
}
