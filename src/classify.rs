/*!
 * Plan type and parent organization classification
 *
 * Derives the two classification fields for every enrollment record:
 *
 * - plan type, from the contract prefix and DSNP keyword hints;
 * - parent organization, via an override chain: per-release contract info
 *   lookup > static prefix mapping > organization name keywords > "Other".
 */

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::data_types::{ClassifiedRecord, ContractNumber, EnrollmentRecord, OrgLookup, PlanType};

/// Fallback label for anything the heuristics cannot place
pub const OTHER_ORG: &str = "Other";

/// Keywords marking dual-eligible special needs plans, matched
/// case-insensitively against plan name and organization type
const DSNP_KEYWORDS: &[&str] = &["dsnp", "dual", "d-snp", "dual eligible", "dual-eligible"];

/// Contract prefix (first 5 characters) to parent organization, covering the
/// major MAOs controlling roughly 70% of the market.
///
/// Ordered table, materialized into a map in declaration order: a prefix
/// listed under more than one organization resolves to the last entry.
const PARENT_ORG_TABLE: &[(&str, &str)] = &[
    // UnitedHealth Group
    ("H0028", "UnitedHealth Group"),
    ("H0543", "UnitedHealth Group"),
    ("H0754", "UnitedHealth Group"),
    ("H1045", "UnitedHealth Group"),
    ("H1685", "UnitedHealth Group"),
    ("H2001", "UnitedHealth Group"),
    ("H2168", "UnitedHealth Group"),
    ("H2406", "UnitedHealth Group"),
    ("H3749", "UnitedHealth Group"),
    ("H4091", "UnitedHealth Group"),
    ("H5253", "UnitedHealth Group"),
    ("H5521", "UnitedHealth Group"),
    ("H6501", "UnitedHealth Group"),
    ("H7657", "UnitedHealth Group"),
    ("R5826", "UnitedHealth Group"),
    // CVS Health (Aetna)
    ("H0112", "CVS Health (Aetna)"),
    ("H0318", "CVS Health (Aetna)"),
    ("H0485", "CVS Health (Aetna)"),
    ("H0533", "CVS Health (Aetna)"),
    ("H1609", "CVS Health (Aetna)"),
    ("H2478", "CVS Health (Aetna)"),
    ("H3152", "CVS Health (Aetna)"),
    ("H3312", "CVS Health (Aetna)"),
    ("H3597", "CVS Health (Aetna)"),
    ("H4002", "CVS Health (Aetna)"),
    ("H4448", "CVS Health (Aetna)"),
    ("H5521", "CVS Health (Aetna)"),
    ("H9851", "CVS Health (Aetna)"),
    // Humana
    ("H0028", "Humana"),
    ("H1036", "Humana"),
    ("H1406", "Humana"),
    ("H1951", "Humana"),
    ("H2649", "Humana"),
    ("H4141", "Humana"),
    ("H4461", "Humana"),
    ("H5216", "Humana"),
    ("H5619", "Humana"),
    ("H6622", "Humana"),
    ("H7495", "Humana"),
    ("H8145", "Humana"),
    ("R5826", "Humana"),
    // Elevance Health (Anthem)
    ("H0146", "Elevance Health (Anthem)"),
    ("H0354", "Elevance Health (Anthem)"),
    ("H0540", "Elevance Health (Anthem)"),
    ("H2006", "Elevance Health (Anthem)"),
    ("H3655", "Elevance Health (Anthem)"),
    ("H3905", "Elevance Health (Anthem)"),
    ("H4624", "Elevance Health (Anthem)"),
    ("H5853", "Elevance Health (Anthem)"),
    ("H9019", "Elevance Health (Anthem)"),
    // Centene
    ("H0169", "Centene"),
    ("H1485", "Centene"),
    ("H2712", "Centene"),
    ("H3447", "Centene"),
    ("H4007", "Centene"),
    ("H5427", "Centene"),
    ("H6832", "Centene"),
    // Kaiser Permanente
    ("H0524", "Kaiser Permanente"),
    ("H0630", "Kaiser Permanente"),
    ("H2172", "Kaiser Permanente"),
    ("H9003", "Kaiser Permanente"),
    // Cigna
    ("H0107", "Cigna"),
    ("H0354", "Cigna"),
    ("H4513", "Cigna"),
    ("H5410", "Cigna"),
    ("H6373", "Cigna"),
    // Molina Healthcare
    ("H0169", "Molina Healthcare"),
    ("H0420", "Molina Healthcare"),
    ("H5823", "Molina Healthcare"),
    ("H9498", "Molina Healthcare"),
    // Blue Cross Blue Shield (various)
    ("H0404", "BCBS"),
    ("H0520", "BCBS"),
    ("H1350", "BCBS"),
    ("H2819", "BCBS"),
    ("H3949", "BCBS"),
    ("H5008", "BCBS"),
    ("H6502", "BCBS"),
];

/// Organization name keywords per parent org, checked in this order; the
/// first org with a matching keyword wins
const ORG_KEYWORDS: &[(&str, &[&str])] = &[
    ("UnitedHealth Group", &["united", "uhc", "optum", "pacificare"]),
    ("CVS Health (Aetna)", &["aetna", "cvs"]),
    ("Humana", &["humana"]),
    ("Elevance Health (Anthem)", &["anthem", "wellpoint", "elevance"]),
    ("Centene", &["centene", "wellcare", "health net"]),
    ("Kaiser Permanente", &["kaiser"]),
    ("Cigna", &["cigna"]),
    ("Molina Healthcare", &["molina"]),
    ("BCBS", &["blue cross", "blue shield", "bcbs", "anthem"]),
];

lazy_static! {
    static ref STATIC_ORG_MAP: HashMap<&'static str, &'static str> =
        PARENT_ORG_TABLE.iter().copied().collect();
}

/// Identify the plan type from contract ID, plan name, and organization type.
///
/// Contract prefixes: H = HMO/local MA (PPO when the plan name says so),
/// R = regional PPO, S = stand-alone PDP and E = employer group land in
/// `Other` along with PFFS and the minor types. DSNP is recognized first via
/// keywords in the plan name or organization type.
pub fn classify_plan_type(
    contract_number: &ContractNumber,
    plan_name: &str,
    org_type: &str,
) -> PlanType {
    if contract_number.is_empty() {
        return PlanType::Other;
    }

    let plan_name = plan_name.to_lowercase();
    let org_type = org_type.to_lowercase();

    if DSNP_KEYWORDS
        .iter()
        .any(|kw| plan_name.contains(kw) || org_type.contains(kw))
    {
        return PlanType::Dsnp;
    }

    match contract_number.prefix() {
        Some('H') => {
            if plan_name.contains("ppo") {
                PlanType::Ppo
            } else {
                PlanType::Hmo
            }
        }
        Some('R') => PlanType::Ppo,
        _ => PlanType::Other,
    }
}

/// Resolve the parent organization for a contract.
///
/// Override order: exact contract match in the per-release lookup, then the
/// static prefix mapping, then organization-name keywords, then [`OTHER_ORG`].
pub fn resolve_parent_org(
    contract_number: &ContractNumber,
    org_name: &str,
    lookup: &OrgLookup,
) -> String {
    if contract_number.is_empty() {
        return OTHER_ORG.to_string();
    }

    if let Some(org) = lookup.get(contract_number.as_str()) {
        return org.to_string();
    }

    if let Some(org) = STATIC_ORG_MAP.get(contract_number.base()) {
        return org.to_string();
    }

    let org_name = org_name.to_lowercase();
    if !org_name.is_empty() {
        for (parent, keywords) in ORG_KEYWORDS {
            if keywords.iter().any(|kw| org_name.contains(kw)) {
                return parent.to_string();
            }
        }
    }

    OTHER_ORG.to_string()
}

/// Attach the derived classification fields to every record.
///
/// A record that already carries an organization value uses it verbatim as
/// the parent org; the lookup chain only engages for sources without one.
pub fn classify_records(records: Vec<EnrollmentRecord>, lookup: &OrgLookup) -> Vec<ClassifiedRecord> {
    records
        .into_iter()
        .map(|record| {
            let plan_type = classify_plan_type(
                &record.contract_number,
                record.plan_name.as_deref().unwrap_or(""),
                record.org_type.as_deref().unwrap_or(""),
            );
            let parent_org = match &record.organization {
                Some(org) => org.clone(),
                None => resolve_parent_org(&record.contract_number, "", lookup),
            };
            ClassifiedRecord {
                record,
                plan_type,
                parent_org,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(id: &str) -> ContractNumber {
        ContractNumber::new(id)
    }

    #[test]
    fn plan_type_from_contract_prefix() {
        assert_eq!(classify_plan_type(&contract("H1234"), "Sample Plan", ""), PlanType::Hmo);
        assert_eq!(classify_plan_type(&contract("H1234"), "Sample PPO Plan", ""), PlanType::Ppo);
        assert_eq!(classify_plan_type(&contract("R5826"), "", ""), PlanType::Ppo);
        assert_eq!(classify_plan_type(&contract("S1234"), "", ""), PlanType::Other);
        assert_eq!(classify_plan_type(&contract("E4567"), "", ""), PlanType::Other);
    }

    #[test]
    fn dsnp_keywords_win_over_prefix() {
        assert_eq!(
            classify_plan_type(&contract("H1234"), "", "Dual Eligible SNP"),
            PlanType::Dsnp
        );
        assert_eq!(
            classify_plan_type(&contract("R5826"), "Acme D-SNP Choice", ""),
            PlanType::Dsnp
        );
    }

    #[test]
    fn empty_contract_short_circuits_to_other() {
        assert_eq!(classify_plan_type(&contract(""), "anything", ""), PlanType::Other);
        // Keyword checks are skipped entirely for empty contracts
        assert_eq!(
            classify_plan_type(&contract(""), "Dual Eligible", ""),
            PlanType::Other
        );
        assert_eq!(
            resolve_parent_org(&contract(""), "Humana of Ohio", &OrgLookup::new()),
            OTHER_ORG
        );
    }

    #[test]
    fn lookup_overrides_static_prefix_map() {
        let mut lookup = OrgLookup::new();
        lookup.insert("H0028", "Acquired Health LLC");
        assert_eq!(
            resolve_parent_org(&contract("H0028"), "", &lookup),
            "Acquired Health LLC"
        );
        // Without the lookup entry the static map answers
        assert_eq!(resolve_parent_org(&contract("H0028"), "", &OrgLookup::new()), "Humana");
    }

    #[test]
    fn duplicate_prefixes_resolve_last_write_wins() {
        let lookup = OrgLookup::new();
        // Listed under both UnitedHealth Group and Humana; Humana is later
        assert_eq!(resolve_parent_org(&contract("R5826"), "", &lookup), "Humana");
        // UnitedHealth Group then CVS Health (Aetna)
        assert_eq!(
            resolve_parent_org(&contract("H5521"), "", &lookup),
            "CVS Health (Aetna)"
        );
        // Centene then Molina Healthcare
        assert_eq!(
            resolve_parent_org(&contract("H0169"), "", &lookup),
            "Molina Healthcare"
        );
        // Elevance then Cigna
        assert_eq!(resolve_parent_org(&contract("H0354"), "", &lookup), "Cigna");
    }

    #[test]
    fn keyword_fallback_checks_orgs_in_order() {
        let lookup = OrgLookup::new();
        assert_eq!(
            resolve_parent_org(&contract("H9999"), "Blue Cross of Nowhere", &lookup),
            "BCBS"
        );
        // "anthem" appears under both Elevance and BCBS; Elevance is earlier
        assert_eq!(
            resolve_parent_org(&contract("H9999"), "Anthem Partners", &lookup),
            "Elevance Health (Anthem)"
        );
        assert_eq!(
            resolve_parent_org(&contract("H9999"), "Totally Unknown Health", &lookup),
            OTHER_ORG
        );
    }

    #[test]
    fn supplied_organization_is_used_verbatim() {
        let records = vec![EnrollmentRecord {
            contract_number: contract("H0028"),
            plan_id: None,
            state: "CA".to_string(),
            county: None,
            fips: None,
            enrollment: 10,
            organization: Some("Contract Info Org".to_string()),
            plan_name: None,
            org_type: None,
        }];
        let classified = classify_records(records, &OrgLookup::new());
        assert_eq!(classified[0].parent_org, "Contract Info Org");
    }

    #[test]
    fn records_without_organization_use_the_chain() {
        let mut lookup = OrgLookup::new();
        lookup.insert("H7777", "Lookup Org");
        let records = vec![
            EnrollmentRecord {
                contract_number: contract("H7777"),
                plan_id: None,
                state: "TX".to_string(),
                county: None,
                fips: None,
                enrollment: 5,
                organization: None,
                plan_name: Some("Sample PPO Plan".to_string()),
                org_type: None,
            },
            EnrollmentRecord {
                contract_number: contract("H1036"),
                plan_id: None,
                state: "TX".to_string(),
                county: None,
                fips: None,
                enrollment: 7,
                organization: None,
                plan_name: None,
                org_type: None,
            },
        ];
        let classified = classify_records(records, &lookup);
        assert_eq!(classified[0].parent_org, "Lookup Org");
        assert_eq!(classified[0].plan_type, PlanType::Ppo);
        assert_eq!(classified[1].parent_org, "Humana");
        assert_eq!(classified[1].plan_type, PlanType::Hmo);
    }
}
