//! Oracle contract tests: the documented diagnostic behavior, end to end.

use atombind_testing::{
    assert_arrays_almost_equal, assert_records_equal, AssertionFailure, DEFAULT_ARRAY_TOL,
};
use atombind_values::{Dict, FortArray};

#[test]
fn test_reflexivity_any_tolerance() {
    let a = FortArray::from_rows(&[vec![1.5, -2.0], vec![0.0, 7.25]]).unwrap();
    assert!(assert_arrays_almost_equal(&a, &a, 0.0).is_ok());
    assert!(assert_arrays_almost_equal(&a, &a, 1e-12).is_ok());
    assert!(assert_arrays_almost_equal(&a, &a, 100.0).is_ok());
}

#[test]
fn test_shape_mismatch_fails_reporting_both_shapes() {
    let a = FortArray::zeros(vec![2, 2]);
    let b = FortArray::zeros(vec![4]);
    let err = assert_arrays_almost_equal(&a, &b, 1e30).unwrap_err();
    assert!(err.message.contains("[2, 2]"));
    assert!(err.message.contains("[4]"));
    assert!(err.divergence.is_none());
}

#[test]
fn test_max_difference_and_one_based_location() {
    let a = FortArray::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.000001]]).unwrap();
    let b = FortArray::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();

    let err = assert_arrays_almost_equal(&a, &b, 1e-7).unwrap_err();
    let div = err.divergence.as_ref().expect("structured divergence");
    assert!((div.max_diff - 1e-6).abs() < 1e-9);
    assert_eq!(div.location, vec![2, 2]);

    // The payload carries both operands and the difference array.
    assert!(err.message.contains("a\n"));
    assert!(err.message.contains("b\n"));
    assert!(err.message.contains("Absolute difference"));
    assert!(err.message.contains("Maximum abs difference"));

    // Within tolerance the same pair passes.
    assert!(assert_arrays_almost_equal(&a, &b, 1e-5).is_ok());
}

#[test]
fn test_integer_arrays_ignore_tolerance() {
    let a = FortArray::int(vec![1, 2, 3], vec![3]).unwrap();
    let b = FortArray::int(vec![1, 2, 4], vec![3]).unwrap();
    // Any unequal element fails no matter how large the tolerance.
    assert!(assert_arrays_almost_equal(&a, &b, 1e30).is_err());
    assert!(assert_arrays_almost_equal(&a, &a, 0.0).is_ok());
}

#[test]
fn test_logical_arrays_compare_exactly() {
    let a = FortArray::logical(vec![true, false], vec![2]).unwrap();
    let b = FortArray::logical(vec![true, true], vec![2]).unwrap();
    assert!(assert_arrays_almost_equal(&a, &b, 1e30).is_err());
}

#[test]
fn test_location_respects_array_origin() {
    let a = FortArray::real(vec![0.0, 0.0, 1.0], vec![3]).unwrap().with_offset(0);
    let b = FortArray::zeros(vec![3]).with_offset(0);
    let err = assert_arrays_almost_equal(&a, &b, 1e-7).unwrap_err();
    // Third element, origin 0: location 2.
    assert_eq!(err.divergence.unwrap().location, vec![2]);
}

#[test]
fn test_transpose_on_print_affects_diagnostic_only() {
    let a = FortArray::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]])
        .unwrap()
        .with_transpose_on_print(true);
    let b = FortArray::from_rows(&[vec![1.0, 2.0], vec![3.0, 5.0]])
        .unwrap()
        .with_transpose_on_print(true);
    let err = assert_arrays_almost_equal(&a, &b, 1e-7).unwrap_err();
    // Location is storage-derived, not affected by the display transpose.
    assert_eq!(err.divergence.unwrap().location, vec![2, 2]);
}

#[test]
fn test_records_equal_success_and_key_mismatch() {
    let mut d1 = Dict::new();
    d1.insert("a", 1);
    d1.insert("b", 2);
    let mut d2 = Dict::new();
    d2.insert("a", 1);
    d2.insert("b", 2);
    assert!(assert_records_equal(&d1, &d2).is_ok());

    let mut short = Dict::new();
    short.insert("a", 1);
    let err = assert_records_equal(&short, &d2).unwrap_err();
    assert!(err.message.contains("keys"));
    assert!(err.message.contains("\"b\""));
}

#[test]
fn test_records_value_mismatch_names_key_and_values() {
    let mut d1 = Dict::new();
    d1.insert("n", 8);
    let mut d2 = Dict::new();
    d2.insert("n", 9);
    let err = assert_records_equal(&d1, &d2).unwrap_err();
    assert!(err.message.contains("key=n"));
    assert!(err.message.contains('8'));
    assert!(err.message.contains('9'));
}

#[test]
fn test_records_delegate_array_values_to_array_oracle() {
    let mut d1 = Dict::new();
    d1.insert("pos", FortArray::real(vec![1.0, 2.0], vec![2]).unwrap());
    let mut d2 = Dict::new();
    d2.insert("pos", FortArray::real(vec![1.0, 2.0 + 5e-8], vec![2]).unwrap());
    // Within the default tolerance.
    assert!(assert_records_equal(&d1, &d2).is_ok());

    let mut d3 = Dict::new();
    d3.insert("pos", FortArray::real(vec![1.0, 2.1], vec![2]).unwrap());
    let err: AssertionFailure = assert_records_equal(&d1, &d3).unwrap_err();
    assert!(err.message.contains("pos"));
    assert!(err.divergence.is_some());
    assert!(DEFAULT_ARRAY_TOL < 0.1);
}
