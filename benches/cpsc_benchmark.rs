use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cpsc::prelude::*;

const STATES: &[&str] = &["CA", "TX", "FL", "NY", "PA", "OH", "IL", "GA", "NC", "MI"];
const CONTRACTS: &[&str] = &["H0028", "H0112", "H1036", "R5826", "H9999", "S1234", "H0524"];

// Synthetic CPSC-shaped table; sized like a monthly release slice
fn synthetic_records(n: usize) -> Vec<ClassifiedRecord> {
    let records: Vec<EnrollmentRecord> = (0..n)
        .map(|i| EnrollmentRecord {
            contract_number: ContractNumber::new(CONTRACTS[i % CONTRACTS.len()]),
            plan_id: Some(format!("{:03}", i % 30)),
            state: STATES[i % STATES.len()].to_string(),
            county: Some(format!("County {}", i % 250)),
            fips: Some(format!("{:05}", i % 3000)),
            enrollment: (i % 5000) as u64,
            organization: None,
            plan_name: if i % 7 == 0 {
                Some("Sample PPO Plan".to_string())
            } else {
                Some("Sample Plan".to_string())
            },
            org_type: if i % 13 == 0 {
                Some("Dual Eligible SNP".to_string())
            } else {
                None
            },
        })
        .collect();
    classify_records(records, &OrgLookup::new())
}

fn benchmark_classification(c: &mut Criterion) {
    let contract = ContractNumber::new("H0028");
    let lookup = OrgLookup::new();

    c.bench_function("classify_plan_type", |b| {
        b.iter(|| {
            classify_plan_type(
                black_box(&contract),
                black_box("Gold Plus PPO"),
                black_box("Local CCP"),
            )
        })
    });

    c.bench_function("resolve_parent_org_static", |b| {
        b.iter(|| resolve_parent_org(black_box(&contract), black_box(""), &lookup))
    });

    c.bench_function("resolve_parent_org_keyword", |b| {
        let unknown = ContractNumber::new("H8888");
        b.iter(|| {
            resolve_parent_org(
                black_box(&unknown),
                black_box("Blue Cross of Somewhere"),
                &lookup,
            )
        })
    });
}

fn benchmark_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    group.sample_size(20);

    for &size in &[10_000usize, 100_000] {
        let records = synthetic_records(size);
        group.bench_function(format!("snapshot_{}_records", size), |b| {
            b.iter(|| EnrollmentAggregator::new(black_box(&records)).snapshot())
        });
    }

    group.finish();
}

fn benchmark_diff(c: &mut Criterion) {
    let current = EnrollmentAggregator::new(&synthetic_records(100_000)).snapshot();
    let baseline = EnrollmentAggregator::new(&synthetic_records(90_000)).snapshot();

    c.bench_function("diff_100k_record_snapshots", |b| {
        b.iter(|| diff(black_box(&current), black_box(&baseline)))
    });
}

criterion_group!(
    benches,
    benchmark_classification,
    benchmark_aggregation,
    benchmark_diff
);
criterion_main!(benches);
