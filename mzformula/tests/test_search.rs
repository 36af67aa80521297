use mzformula::prelude::*;
use mzformula::plausibility::is_plausible;

/// Walk the full Cartesian product of `table` in search order, outermost species
/// slowest, without any pruning.
fn brute_force(table: &ElementTable) -> Vec<Composition> {
    fn descend(
        table: &ElementTable,
        depth: usize,
        current: &mut Composition,
        acc: &mut Vec<Composition>,
    ) {
        if depth == ElementKind::SEARCH_ORDER.len() {
            acc.push(*current);
            return;
        }
        let element = ElementKind::SEARCH_ORDER[depth];
        for count in table.bounds(element).iter() {
            current.set(element, count);
            descend(table, depth + 1, current, acc);
        }
    }
    let mut acc = Vec::new();
    descend(table, 0, &mut Composition::new(), &mut acc);
    acc
}

fn literal_mass(composition: &Composition, ion_mode: IonMode) -> f64 {
    let mut mass = 0.0;
    for element in ElementKind::ALL {
        mass += element.exact_mass() * composition[element] as f64;
    }
    let sign = match ion_mode {
        IonMode::Negative => -1.0,
        IonMode::Neutral => 0.0,
        IonMode::Positive => 1.0,
    };
    mass - sign * 0.000549
}

fn literal_rdb(composition: &Composition) -> f64 {
    let mut total = 2.0;
    for element in ElementKind::ALL {
        total += element.unsaturation() * composition[element] as f64;
    }
    total / 2.0
}

fn literal_filter(
    table: &ElementTable,
    window: &MassWindow,
    params: SearchParameters,
) -> Vec<Composition> {
    brute_force(table)
        .into_iter()
        .filter(|c| {
            let mass = literal_mass(c, params.ion_mode);
            if mass < window.lower || mass > window.upper {
                return false;
            }
            let passes_ratios = match params.plausibility {
                PlausibilityMode::Disabled => true,
                PlausibilityMode::Strict => is_plausible(c, false),
                PlausibilityMode::Probabilistic => is_plausible(c, true),
            };
            if !passes_ratios {
                return false;
            }
            let rdb = literal_rdb(c);
            let lewis = rdb % 1.0;
            rdb >= 0.0 && lewis != 0.5 && lewis != -0.5
        })
        .collect()
}

fn small_table() -> ElementTable {
    ElementTable::new()
        .with_bounds(ElementKind::C, 0, 8)
        .with_bounds(ElementKind::C13, 0, 1)
        .with_bounds(ElementKind::H, 0, 14)
        .with_bounds(ElementKind::H2, 0, 1)
        .with_bounds(ElementKind::N, 0, 3)
        .with_bounds(ElementKind::O, 0, 4)
        .with_bounds(ElementKind::S, 0, 1)
        .with_bounds(ElementKind::Cl, 0, 1)
}

const TARGETS: [f64; 5] = [60.0211, 94.0419, 123.0320, 141.0191, 156.0114];

const MODES: [PlausibilityMode; 3] = [
    PlausibilityMode::Disabled,
    PlausibilityMode::Strict,
    PlausibilityMode::Probabilistic,
];

#[test_log::test]
fn test_exhaustive_against_cartesian_product() {
    let table = small_table();
    for target in TARGETS {
        for plausibility in MODES {
            for ion_mode in [IonMode::Neutral, IonMode::Positive, IonMode::Negative] {
                let params = SearchParameters::new(ion_mode, plausibility);
                let window = MassWindow::from_milli(target, 20.0);
                let expected = literal_filter(&table, &window, params);
                let search = FormulaSearch::new(&table, window, params);
                let observed: Vec<Composition> =
                    search.iter().map(|f| f.composition).collect();
                assert_eq!(
                    expected, observed,
                    "Mismatch for {target} {plausibility} {ion_mode}"
                );
            }
        }
    }
}

#[test]
fn test_exhaustive_with_lower_bounds() {
    let table = small_table()
        .with_bounds(ElementKind::C, 2, 8)
        .with_bounds(ElementKind::O, 1, 4)
        .with_bounds(ElementKind::H, 3, 14);
    for target in TARGETS {
        let params = SearchParameters::default().with_plausibility(PlausibilityMode::Disabled);
        let window = MassWindow::from_milli(target, 50.0);
        let expected = literal_filter(&table, &window, params);
        let observed: Vec<Composition> = FormulaSearch::new(&table, window, params)
            .iter()
            .map(|f| f.composition)
            .collect();
        assert_eq!(expected, observed, "Mismatch for {target}");
        for c in observed.iter() {
            assert!(c[ElementKind::C] >= 2);
            assert!(c[ElementKind::O] >= 1);
            assert!(c[ElementKind::H] >= 3);
        }
    }
}

#[test]
fn test_emitted_formulas_satisfy_filters() {
    let table = ElementTable::default()
        .with_bounds(ElementKind::S, 0, 2)
        .with_bounds(ElementKind::P, 0, 2);
    let window = MassWindow::from_milli(301.1314, 5.0);
    let params = SearchParameters::default();
    let result = FormulaSearch::new(&table, window, params).run().unwrap();
    assert!(!result.is_empty());
    assert_eq!(result.accepted_count(), result.len() as u64);
    for formula in result.iter() {
        let mass = literal_mass(&formula.composition, params.ion_mode);
        assert!((mass - formula.mass).abs() < 1e-9);
        assert!(window.lower <= formula.mass && formula.mass <= window.upper);
        assert!(formula.rdb >= 0.0);
        assert!(formula.lewis != 0.5 && formula.lewis != -0.5);
        assert!((formula.rdb - literal_rdb(&formula.composition)).abs() < 1e-12);
        assert!(is_plausible(&formula.composition, true));
        assert!((formula.mass_error_milli - 1000.0 * (window.target - formula.mass)).abs() < 1e-9);
        for (element, count) in formula.elements() {
            assert!(count > 0);
            assert!(table.bounds(element).contains(count));
        }
    }
}

#[test]
fn test_methane_scenario() {
    let table = ElementTable::new()
        .with_bounds(ElementKind::C, 0, 2)
        .with_bounds(ElementKind::H, 0, 4);

    let strict = SearchParameters::default().with_plausibility(PlausibilityMode::Strict);
    let result = search_formulas(&table, 16.0313, 5.0, strict).unwrap();
    assert_eq!(result.accepted_count(), 1);
    let methane = &result.formulas[0];
    assert_eq!(methane.formula(), "C1H4");
    assert!((methane.mass - 16.0313).abs() < 1e-3);
    assert_eq!(methane.rdb, 0.0);

    // H/C = 4 is outside the common range
    let result = search_formulas(&table, 16.0313, 5.0, SearchParameters::default()).unwrap();
    assert_eq!(result.accepted_count(), 0);
}

#[test]
fn test_water_scenario() {
    let table = ElementTable::new()
        .with_bounds(ElementKind::C, 0, 1)
        .with_bounds(ElementKind::H, 0, 2)
        .with_bounds(ElementKind::O, 0, 1);

    let disabled = SearchParameters::default().with_plausibility(PlausibilityMode::Disabled);
    let result = search_formulas(&table, 18.0106, 50.0, disabled).unwrap();
    assert_eq!(result.accepted_count(), 1);
    assert_eq!(result.formulas[0].formula(), "H2O1");

    // oxygen without carbon never passes the ratio screen
    for mode in [PlausibilityMode::Strict, PlausibilityMode::Probabilistic] {
        let params = SearchParameters::default().with_plausibility(mode);
        let result = search_formulas(&table, 18.0106, 50.0, params).unwrap();
        assert_eq!(result.accepted_count(), 0);
    }
}

#[test]
fn test_zero_width_window_is_inclusive() {
    let table = ElementTable::default();
    let benzene: Composition = "C6H6".parse().unwrap();
    let target = mzformula::mass::ion_mass(&benzene, IonMode::Neutral);
    let result = search_formulas(&table, target, 0.0, SearchParameters::default()).unwrap();
    assert!(result.iter().any(|f| f.composition == benzene));
}

#[test]
fn test_empty_window_below_minimum() {
    let table = ElementTable::default().with_bounds(ElementKind::C, 10, 41);
    let result = search_formulas(&table, 60.0211, 5.0, SearchParameters::default()).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.statistics.evaluated, 0);
}

#[test]
fn test_repeatable() {
    let table = ElementTable::default();
    let params = SearchParameters::default();
    let first = search_formulas(&table, 180.0634, 5.0, params).unwrap();
    let second = search_formulas(&table, 180.0634, 5.0, params).unwrap();
    assert_eq!(first, second);

    let search = FormulaSearch::new(&table, MassWindow::from_milli(180.0634, 5.0), params);
    let mut sink = Vec::new();
    let statistics = search.run_with(|f| sink.push(f)).unwrap();
    assert_eq!(sink, first.formulas);
    assert_eq!(statistics, first.statistics);

    let mut iter = search.iter();
    let lazily: Vec<_> = iter.by_ref().collect();
    assert_eq!(lazily, first.formulas);
    assert_eq!(iter.statistics(), first.statistics);
    assert_eq!(iter.next(), None);
}

#[cfg(feature = "parallel")]
#[test_log::test]
fn test_parallel_matches_sequential() {
    let table = small_table().with_bounds(ElementKind::Br, 0, 1);
    for target in TARGETS {
        let params = SearchParameters::default().with_plausibility(PlausibilityMode::Strict);
        let sequential = search_formulas(&table, target, 20.0, params).unwrap();
        let parallel = search_formulas_parallel(&table, target, 20.0, params).unwrap();
        assert_eq!(sequential.formulas, parallel.formulas);
        assert_eq!(sequential.accepted_count(), parallel.accepted_count());
    }
}
