//! This bench populates a usage report from a chain of target definitions,
//! each declaring a few root units with deep requirement chains.

#![allow(missing_docs)]

use criterion::{Criterion, criterion_group, criterion_main};
use usage_report::{
    LayoutRegistry, Snapshot, Unit,
    domain::{
        Location, ReferenceLocation, Repository, Requirement, UnitLocation, UnitReference,
        VersionRange,
    },
    storage::TargetSnapshot,
};

const TARGETS: usize = 20;
const ROOTS_PER_TARGET: usize = 10;
const CHAIN_LENGTH: usize = 25;

fn unit(id: &str) -> Unit {
    Unit::new(id, "1.0.0".parse().unwrap())
}

/// Target `n` references target `n + 1`. Every root starts a requirement chain
/// that ends in a unit shared by all targets.
fn snapshot() -> Snapshot {
    let shared = unit("shared.leaf");
    let mut snapshot = Snapshot::new().with_root("target-0.target");

    for t in 0..TARGETS {
        let mut units = vec![shared.clone()];
        let mut declared = Vec::new();
        for r in 0..ROOTS_PER_TARGET {
            for depth in 0..CHAIN_LENGTH {
                let id = format!("t{t}.r{r}.d{depth}");
                let next = if depth + 1 == CHAIN_LENGTH {
                    shared.id().to_string()
                } else {
                    format!("t{t}.r{r}.d{}", depth + 1)
                };
                units.push(unit(&id).with_requirement(Requirement::unit(next, VersionRange::ANY)));
            }
            declared.push(UnitReference::new(format!("t{t}.r{r}.d0"), None));
        }

        let mut locations = vec![Location::Units(UnitLocation::new(
            declared,
            vec![Repository::new(format!("https://repo.example/{t}"))],
        ))];
        if t + 1 < TARGETS {
            locations.push(Location::Reference(ReferenceLocation::new(format!(
                "target-{}.target",
                t + 1
            ))));
        }

        snapshot = snapshot.with_target(TargetSnapshot::new(
            format!("target-{t}.target"),
            locations,
            units,
        ));
    }

    snapshot.with_project("app", vec![shared])
}

fn analyze_targets(c: &mut Criterion) {
    let snapshot = snapshot();
    c.bench_function("analyze targets", |b| {
        b.iter(|| snapshot.analyze(&mut |_, _| {}).unwrap());
    });

    let report = snapshot.analyze(&mut |_, _| {}).unwrap();
    let registry = LayoutRegistry::default();
    let tree = registry.get("tree").unwrap();
    c.bench_function("render tree layout", |b| {
        b.iter(|| {
            let mut lines = 0;
            tree.generate_report(&report, false, &mut |_| lines += 1);
            lines
        });
    });
}

criterion_group!(benches, analyze_targets);
criterion_main!(benches);
