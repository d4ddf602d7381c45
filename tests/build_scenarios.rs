//! End-to-end build/run scenarios spanning the whole pipeline: parsing,
//! sorting, constant collection, derivative synthesis, and fixed-step
//! simulation.

use acsl_kernel::{build, BuildError, BuildInputs, SectionKind, SectionSpec};
use std::collections::{BTreeMap, BTreeSet};

fn section(kind: SectionKind, source: &str) -> SectionSpec {
    SectionSpec {
        kind,
        source: source.to_string(),
    }
}

/// Scenario A: linear decay, one state variable.
#[test]
fn linear_decay_matches_analytic_solution_near_zero() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Initial, "constant(k, 0.42)\nconstant(vol, 1.0)\nend()\n"),
            section(
                SectionKind::Dynamic,
                "IALG = 5\nNSTP = 10000\nMAXT = 1\nCINT = 10\nend()\n",
            ),
            section(
                SectionKind::Derivative,
                "dAdt = -k * A / vol\nA = integ(dAdt, 3.811004739069482)\nend()\n",
            ),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };

    let model = build(inputs).expect("model should build");
    let table = model.run(120.0, &BTreeSet::new()).expect("simulation should run");
    assert_eq!(table.len(), 13);

    let a = table.column("A").unwrap();
    let analytic = 3.811004739069482 * (-0.42f64 * 120.0).exp();
    assert!((a[12] - analytic).abs() < 1e-6);
}

/// Scenario B: coupled precursor/product state variables, authored with a
/// deliberately scrambled statement order.
#[test]
fn coupled_two_state_decay_preserves_dependency_order_and_signs() {
    let inputs = BuildInputs {
        sections: vec![
            section(
                SectionKind::Initial,
                "constant(kAB, 0.42)\nconstant(kBO, 0.03)\nconstant(YBAB, 1.0)\nconstant(vol, 1.0)\nend()\n",
            ),
            section(
                SectionKind::Dynamic,
                "IALG = 5\nNSTP = 10000\nMAXT = 1\nCINT = 10\nend()\n",
            ),
            section(
                SectionKind::Derivative,
                "PBAB = UAAB * YBAB\n\
                 dAdt = -UAAB\n\
                 UAAB = kAB * A / vol\n\
                 UBBO = kBO * B / vol\n\
                 dBdt = PBAB - UBBO\n\
                 A = integ(dAdt, 3.811004739069482)\n\
                 B = integ(dBdt, 4.473)\n\
                 end()\n",
            ),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };

    let model = build(inputs).expect("model should build");
    let table = model.run(120.0, &BTreeSet::new()).expect("simulation should run");
    assert_eq!(table.len(), 13);

    let a = table.column("A").unwrap();
    let b = table.column("B").unwrap();
    for window in a.windows(2) {
        assert!(window[1] < window[0], "A must strictly decrease");
    }
    assert!(b[1] > b[0], "B must initially increase");
    assert!(a.iter().all(|v| *v > 0.0));
    assert!(b.iter().all(|v| *v > 0.0));
}

/// Scenario C: a procedural block is lifted above the section and replaced
/// by a synthesized call site at the point of use.
#[test]
fn procedural_block_participates_in_a_full_build() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Dynamic, "IALG = 5\nNSTP = 1\nMAXT = 1\nCINT = 1\nend()\n"),
            section(
                SectionKind::Derivative,
                "@procedural\n\
                 def combine(a, b):\n    \
                     c = a + b\n    \
                     return c\n\
                 y = integ(dydt, 1.0)\n\
                 dydt = -combine(y, 0.0)\n\
                 end()\n",
            ),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };

    let model = build(inputs).expect("model with a procedural helper should build");
    let table = model.run(2.0, &BTreeSet::new()).unwrap();
    let y = table.column("y").unwrap();
    assert!(y[1] < y[0]);
}

/// Scenario D: a cyclic dependency fails the whole build.
#[test]
fn cyclic_derivative_dependency_fails_the_build() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Dynamic, "IALG = 5\nNSTP = 1\nMAXT = 1\nend()\n"),
            section(SectionKind::Derivative, "x = y + 1\ny = x + 1\nend()\n"),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };
    let err = build(inputs).unwrap_err();
    assert!(matches!(err, BuildError::Sort(_)));
}

/// A malformed statement among otherwise-valid ones must fail the whole
/// build, not silently drop the bad statement and proceed.
#[test]
fn malformed_statement_among_valid_ones_fails_the_build() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Dynamic, "IALG = 5\nNSTP = 1\nMAXT = 1\nend()\n"),
            section(
                SectionKind::Derivative,
                "x = 1\ny = &\nA = integ(dAdt, 1.0)\ndAdt = -A\nend()\n",
            ),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };
    assert!(build(inputs).is_err());
}

/// Scenario E: section validation invariants.
#[test]
fn derivative_and_initial_without_dynamic_fails_construction() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Initial, "end()\n"),
            section(SectionKind::Derivative, "A = integ(dAdt, 1.0)\ndAdt = -A\nend()\n"),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };
    let err = build(inputs).unwrap_err();
    assert!(matches!(err, BuildError::MissingDynamic(_)));
}

#[test]
fn duplicate_initial_sections_fails_construction() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Initial, "end()\n"),
            section(SectionKind::Initial, "constant(k, 1.0)\nend()\n"),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };
    let err = build(inputs).unwrap_err();
    assert!(matches!(err, BuildError::DuplicateSection(_)));
}

/// Scenario F: integration-settings resolution order.
#[test]
fn dynamic_cint_is_used_when_caller_supplies_none() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Dynamic, "IALG = 5\nNSTP = 1\nMAXT = 1\nCINT = 5\nend()\n"),
            section(SectionKind::Derivative, "A = integ(dAdt, 1.0)\ndAdt = -A\nend()\n"),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };
    let model = build(inputs).unwrap();
    // stop_time=10, CINT=5 -> grid points at 0, 5, 10.
    let table = model.run(10.0, &BTreeSet::new()).unwrap();
    assert_eq!(table.len(), 3);
}

#[test]
fn caller_cint_overrides_dynamic_cint() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Dynamic, "IALG = 5\nNSTP = 1\nMAXT = 1\nCINT = 5\nend()\n"),
            section(SectionKind::Derivative, "A = integ(dAdt, 1.0)\ndAdt = -A\nend()\n"),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: Some(2),
    };
    let model = build(inputs).unwrap();
    let table = model.run(4.0, &BTreeSet::new()).unwrap();
    assert_eq!(table.len(), 3);
}

#[test]
fn default_cint_is_one_when_unset_everywhere() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Dynamic, "IALG = 5\nNSTP = 1\nMAXT = 1\nend()\n"),
            section(SectionKind::Derivative, "A = integ(dAdt, 1.0)\ndAdt = -A\nend()\n"),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };
    let model = build(inputs).unwrap();
    let table = model.run(3.0, &BTreeSet::new()).unwrap();
    assert_eq!(table.len(), 4);
}

/// Universal property 6: the result grid's time column is strictly
/// monotonically increasing and has exactly floor(stop_time/CINT)+1 rows.
#[test]
fn result_grid_time_column_is_strictly_increasing() {
    let inputs = BuildInputs {
        sections: vec![
            section(SectionKind::Dynamic, "IALG = 5\nNSTP = 100\nMAXT = 1\nCINT = 2\nend()\n"),
            section(SectionKind::Derivative, "A = integ(dAdt, 1.0)\ndAdt = -0.1 * A\nend()\n"),
        ],
        explicit_constants: BTreeMap::new(),
        comm_interval: None,
    };
    let model = build(inputs).unwrap();
    let table = model.run(10.0, &BTreeSet::new()).unwrap();
    assert_eq!(table.len(), 6);
    let t = table.column("t").unwrap();
    for window in t.windows(2) {
        assert!(window[1] > window[0]);
    }
}
