mod common;

use bom_reconcile::{
    Cell, CompareOptions, ExcludeKind, Mapping, ReconcileError, Status, TransformationRule,
    apply_rules, compare,
    mapping::{Role, Side},
    reconcile::{ComparisonResult, Quantity},
};

use common::{full_mapping, same_mappings, table};

const HEADERS: &[&str] = &["code", "qty", "desc", "rev", "cat"];

fn statuses(results: &[ComparisonResult]) -> Vec<Status> {
    results.iter().map(|r| r.status).collect()
}

fn original_qty(result: &ComparisonResult) -> Option<f64> {
    result.original.as_ref().and_then(|f| f.quantity.as_number())
}

fn partial_qty(result: &ComparisonResult) -> Option<f64> {
    result.partial.as_ref().and_then(|f| f.quantity.as_number())
}

fn honour_revision() -> CompareOptions {
    CompareOptions::default()
}

fn ignore_revision() -> CompareOptions {
    CompareOptions {
        ignore_revision: true,
        ..CompareOptions::default()
    }
}

#[test]
fn merge_sums_italian_formatted_quantities() {
    let input = table(
        &["code", "qty", "desc"],
        &[&["A", "1.000,5", ""], &["B", "2,25", ""], &["D", "5", ""]],
    );
    let mapping = Mapping::new("code", "qty").with_description("desc");
    let columns = mapping.resolve(Side::Original, &input).expect("resolve");
    let rules = vec![TransformationRule::merge(["A", "B"], "C", "Merged")];

    let output = apply_rules(&input, &rules, &columns);

    assert_eq!(output.headers, input.headers);
    assert_eq!(output.rows.len(), 2);
    assert_eq!(output.rows[0].text("code").as_deref(), Some("D"));
    assert_eq!(output.rows[0].text("qty").as_deref(), Some("5"));
    assert_eq!(output.rows[1].text("code").as_deref(), Some("C"));
    assert_eq!(output.rows[1].get("qty"), Some(&Cell::Number(1002.75)));
    assert_eq!(output.rows[1].text("desc").as_deref(), Some("Merged"));
}

#[test]
fn merge_without_matching_rows_is_a_no_op() {
    let input = table(&["code", "qty"], &[&["D", "5"]]);
    let mapping = Mapping::new("code", "qty");
    let columns = mapping.resolve(Side::Original, &input).expect("resolve");
    let rules = vec![TransformationRule::merge(["A", "B"], "C", "")];
    assert_eq!(apply_rules(&input, &rules, &columns), input);
}

#[test]
fn merged_rows_compare_by_their_synthesized_quantity() {
    let original = table(&["code", "qty"], &[&["A", "1.000,5"], &["B", "2,25"]]);
    let partial = table(&["code", "qty"], &[&["C", "1002,75"]]);
    let mapping = Mapping::new("code", "qty");
    let rules = vec![TransformationRule::merge(["A", "B"], "C", "")];
    let cleaned = apply_rules(
        &original,
        &rules,
        &mapping.resolve(Side::Original, &original).expect("resolve"),
    );
    let results = compare(
        &cleaned,
        &partial,
        &same_mappings(mapping),
        false,
        &ignore_revision(),
    )
    .expect("compare");
    assert_eq!(statuses(&results), vec![Status::QuantityEqual]);
}

#[test]
fn code_prefix_exclusion_drops_matching_rows() {
    let input = table(&["code", "qty"], &[&["9901", "1"], &["1234", "1"]]);
    let mapping = Mapping::new("code", "qty");
    let columns = mapping.resolve(Side::Original, &input).expect("resolve");
    let rules = vec![TransformationRule::exclude(ExcludeKind::CodePrefix, "99")];
    let output = apply_rules(&input, &rules, &columns);
    assert_eq!(output.records(), vec![vec!["1234", "1"]]);
}

#[test]
fn exclusions_are_independent_of_each_other() {
    let input = table(
        HEADERS,
        &[
            &["A1", "1", "Vite M6", "", "VITERIA"],
            &["B2", "1", "Dado", "", "IMBALLO"],
            &["C3", "1", "Rondella", "", " IMBALLO "],
            &["D4", "1", "Staffa", "", "CARPENTERIA"],
            &["E5", "1", "Staffa vite", "", ""],
        ],
    );
    let mapping = full_mapping();
    let columns = mapping.resolve(Side::Original, &input).expect("resolve");
    let rules = vec![
        TransformationRule::exclude(ExcludeKind::CodeExact, "A1 + Z9"),
        TransformationRule::exclude(ExcludeKind::CategoryExact, "IMBALLO"),
        TransformationRule::exclude(ExcludeKind::DescriptionPrefix, "staffa v"),
    ];
    let output = apply_rules(&input, &rules, &columns);
    let codes = output
        .rows
        .iter()
        .map(|row| row.code("code"))
        .collect::<Vec<_>>();
    assert_eq!(codes, vec!["D4"]);
}

#[test]
fn revision_fallback_pairs_with_other_revision() {
    let original = table(HEADERS, &[&["X", "10", "", "A", ""]]);
    let partial = table(HEADERS, &[&["X", "10", "", "B", ""]]);
    let results = compare(
        &original,
        &partial,
        &same_mappings(full_mapping()),
        false,
        &honour_revision(),
    )
    .expect("compare");

    assert_eq!(statuses(&results), vec![Status::RevisionDifferent]);
    let target = results[0].partial.as_ref().expect("target fields");
    assert_eq!(target.code, "X");
    assert_eq!(target.revision.as_deref(), Some("B"));
    assert_eq!(target.quantity, Quantity::Number(10.0));
}

#[test]
fn revision_fallback_uses_first_revision_and_claims_all_variants() {
    let original = table(HEADERS, &[&["X", "10", "", "A", ""]]);
    let partial = table(
        HEADERS,
        &[
            &["X", "3", "", "B", ""],
            &["X", "4", "", "C", ""],
            &["X", "2", "", "B", ""],
        ],
    );
    for aggregate in [false, true] {
        let results = compare(
            &original,
            &partial,
            &same_mappings(full_mapping()),
            aggregate,
            &honour_revision(),
        )
        .expect("compare");
        assert_eq!(statuses(&results), vec![Status::RevisionDifferent]);
        assert_eq!(partial_qty(&results[0]), Some(5.0));
    }
}

#[test]
fn absent_on_each_side() {
    let original = table(&["code", "qty"], &[&["Y", "5"]]);
    let partial = table(&["code", "qty"], &[&["Z", "3"]]);
    let results = compare(
        &original,
        &partial,
        &same_mappings(Mapping::new("code", "qty")),
        false,
        &ignore_revision(),
    )
    .expect("compare");

    assert_eq!(
        statuses(&results),
        vec![Status::Absent, Status::AbsentInOriginal]
    );
    assert_eq!(results[0].original.as_ref().map(|f| f.code.as_str()), Some("Y"));
    assert!(results[0].partial.is_none());
    assert!(results[1].original.is_none());
    assert_eq!(results[1].partial.as_ref().map(|f| f.code.as_str()), Some("Z"));
    assert_eq!(partial_qty(&results[1]), Some(3.0));
}

#[test]
fn aggregate_mismatch_explodes_into_rows() {
    let original = table(&["code", "qty"], &[&["A", "3"], &["A", "4"]]);
    let partial = table(&["code", "qty"], &[&["A", "10"]]);
    let results = compare(
        &original,
        &partial,
        &same_mappings(Mapping::new("code", "qty")),
        true,
        &ignore_revision(),
    )
    .expect("compare");

    assert_eq!(
        statuses(&results),
        vec![Status::QuantityDifferent, Status::QuantityDifferent]
    );
    assert_eq!(original_qty(&results[0]), Some(3.0));
    assert_eq!(original_qty(&results[1]), Some(4.0));
    assert!(results.iter().all(|r| partial_qty(r) == Some(10.0)));
}

#[test]
fn aggregate_match_collapses_rows() {
    let original = table(&["code", "qty"], &[&["A", "3"], &["A", "7"]]);
    let partial = table(&["code", "qty"], &[&["A", "6"], &["A", "4"]]);
    let mappings = same_mappings(Mapping::new("code", "qty"));

    let grouped = compare(&original, &partial, &mappings, true, &ignore_revision()).expect("compare");
    assert_eq!(statuses(&grouped), vec![Status::QuantityEqual]);
    assert_eq!(original_qty(&grouped[0]), Some(10.0));

    let flat = compare(&original, &partial, &mappings, false, &ignore_revision()).expect("compare");
    assert_eq!(
        statuses(&flat),
        vec![Status::QuantityDifferent, Status::QuantityDifferent]
    );
}

#[test]
fn exploded_rows_keep_invalid_quantities_in_place() {
    let original = table(&["code", "qty"], &[&["A", "3"], &["A", "n.d."], &["A", "4"]]);
    let partial = table(&["code", "qty"], &[&["A", "10"]]);
    let results = compare(
        &original,
        &partial,
        &same_mappings(Mapping::new("code", "qty")),
        true,
        &ignore_revision(),
    )
    .expect("compare");
    assert_eq!(
        statuses(&results),
        vec![
            Status::QuantityDifferent,
            Status::InvalidQuantity,
            Status::QuantityDifferent
        ]
    );
    assert_eq!(
        results[1].original.as_ref().map(|f| f.quantity.clone()),
        Some(Quantity::Raw("n.d.".into()))
    );
}

#[test]
fn tolerance_boundary() {
    let mappings = same_mappings(Mapping::new("code", "qty"));
    let partial = table(&["code", "qty"], &[&["A", "100"]]);

    let close = table(&["code", "qty"], &[&["A", "100,0000005"]]);
    let results = compare(&close, &partial, &mappings, false, &ignore_revision()).expect("compare");
    assert_eq!(statuses(&results), vec![Status::QuantityEqual]);

    let far = table(&["code", "qty"], &[&["A", "100,00001"]]);
    let results = compare(&far, &partial, &mappings, false, &ignore_revision()).expect("compare");
    assert_eq!(statuses(&results), vec![Status::QuantityDifferent]);
}

#[test]
fn unusable_target_rows_never_appear() {
    let original = table(&["code", "qty"], &[]);
    let partial = table(&["code", "qty"], &[&["", "4"], &["B", "abc"], &["C", "1"]]);
    let results = compare(
        &original,
        &partial,
        &same_mappings(Mapping::new("code", "qty")),
        false,
        &ignore_revision(),
    )
    .expect("compare");
    assert_eq!(statuses(&results), vec![Status::AbsentInOriginal]);
    assert_eq!(results[0].partial.as_ref().map(|f| f.code.as_str()), Some("C"));
}

#[test]
fn missing_mandatory_mapping_fails_before_processing() {
    let original = table(&["code", "qty"], &[&["A", "1"]]);
    let partial = table(&["code", "qty"], &[&["A", "1"]]);
    let mappings = bom_reconcile::Mappings::new(
        Mapping::new("code", "qty"),
        Mapping {
            code: Some("code".into()),
            ..Mapping::default()
        },
    );
    let err = compare(&original, &partial, &mappings, false, &ignore_revision()).unwrap_err();
    assert_eq!(
        err,
        ReconcileError::MissingMapping {
            side: Side::Partial,
            role: Role::Quantity
        }
    );
    assert!(err.to_string().contains("quantity"));
}

#[test]
fn optional_roles_read_as_null_when_unmapped() {
    let original = table(HEADERS, &[&["A", "1", "Vite", "R1", "MECH"]]);
    let partial = table(HEADERS, &[&["A", "1", "Vite", "R1", "MECH"]]);
    let results = compare(
        &original,
        &partial,
        &same_mappings(Mapping::new("code", "qty")),
        false,
        &honour_revision(),
    )
    .expect("compare");
    assert_eq!(statuses(&results), vec![Status::QuantityEqual]);
    let source = results[0].original.as_ref().expect("source fields");
    assert_eq!(source.description, None);
    assert_eq!(source.revision, None);
    assert_eq!(source.category, None);
}

#[test]
fn present_and_absent_revisions_are_distinct_keys() {
    let original = table(HEADERS, &[&["A", "1", "", "", ""]]);
    let partial = table(HEADERS, &[&["A", "1", "", "R1", ""]]);
    let results = compare(
        &original,
        &partial,
        &same_mappings(full_mapping()),
        false,
        &honour_revision(),
    )
    .expect("compare");
    assert_eq!(statuses(&results), vec![Status::RevisionDifferent]);
    assert_eq!(
        results[0].partial.as_ref().and_then(|f| f.revision.as_deref()),
        Some("R1")
    );
}
