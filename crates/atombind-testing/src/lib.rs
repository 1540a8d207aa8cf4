//! Approximate-equality test oracle for managed values.
//!
//! Three assertions for automated verification: record snapshots, composite
//! objects, and arrays under a tolerance. Every failure carries the full
//! diagnostic payload (both operands, and for arrays the magnitude and
//! 1-based location of the first maximum divergence) so a discrepancy can be
//! reproduced without rerunning with added instrumentation.

use std::fmt::Write as _;

use thiserror::Error;

use atombind_values::{Dict, FortArray, Value};

/// Default tolerance for array comparison.
pub const DEFAULT_ARRAY_TOL: f64 = 1e-7;

/// A failed assertion, with its human-readable diagnostic payload and, for
/// array divergences, the structured location/magnitude of the maximum.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AssertionFailure {
    pub message: String,
    pub divergence: Option<ArrayDivergence>,
}

impl AssertionFailure {
    fn new(message: impl Into<String>) -> Self {
        AssertionFailure { message: message.into(), divergence: None }
    }
}

/// Where and by how much two floating arrays first diverge maximally.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDivergence {
    pub max_diff: f64,
    /// Coordinates of the first maximum, in the arrays' own index origin
    /// (1-based for native arrays), derived from the flat storage-order
    /// index of the maximum.
    pub location: Vec<i64>,
}

/// Assert two record snapshots are equal.
///
/// Key sets must match exactly; array values delegate to
/// [`assert_arrays_almost_equal`] with the default tolerance, everything
/// else compares exactly.
pub fn assert_records_equal(d1: &Dict, d2: &Dict) -> Result<(), AssertionFailure> {
    if d1 == d2 {
        return Ok(());
    }
    let k1 = d1.sorted_keys();
    let k2 = d2.sorted_keys();
    if k1 != k2 {
        return Err(AssertionFailure::new(format!(
            "records differ: d1 keys {:?} != d2 keys {:?}",
            k1, k2
        )));
    }
    for key in k1 {
        let v1 = &d1.entries[key];
        let v2 = &d2.entries[key];
        match (v1, v2) {
            (Value::Array(a1), Value::Array(a2)) => {
                assert_arrays_almost_equal(a1, a2, DEFAULT_ARRAY_TOL).map_err(|e| {
                    AssertionFailure {
                        message: format!("records differ at key '{}':\n{}", key, e.message),
                        divergence: e.divergence,
                    }
                })?;
            }
            _ => {
                if v1 != v2 {
                    return Err(AssertionFailure::new(format!(
                        "records differ: key={} value1={} value2={}",
                        key, v1, v2
                    )));
                }
            }
        }
    }
    Ok(())
}

/// A composite domain object: an instance count, a lattice, and two record
/// blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSnapshot {
    pub count: usize,
    pub lattice: FortArray,
    pub params: Dict,
    pub properties: Dict,
}

/// Assert two composite objects are equivalent under `tol`.
///
/// Checks counts, then the lattice elementwise, then both record blocks.
/// If every enumerated check passes but the objects still compare unequal,
/// the final fallback fails anyway: the enumerated checks are known to be
/// incomplete relative to full equality, and a divergence they miss must
/// not pass silently.
pub fn assert_composite_equal(
    a: &CompositeSnapshot,
    b: &CompositeSnapshot,
    tol: f64,
) -> Result<(), AssertionFailure> {
    if a == b {
        return Ok(());
    }

    if a.count != b.count {
        return Err(AssertionFailure::new(format!(
            "composite objects differ: a.count({}) != b.count({})",
            a.count, b.count
        )));
    }

    let diff = a
        .lattice
        .abs_diff(&b.lattice)
        .map_err(AssertionFailure::new)?;
    if let Some((max, _)) = diff.max_with_argmax() {
        if max > tol {
            return Err(AssertionFailure::new(format!(
                "composite objects differ: a.lattice({}) != b.lattice({})",
                a.lattice, b.lattice
            )));
        }
    }

    assert_records_equal(&a.params, &b.params)?;
    assert_records_equal(&a.properties, &b.properties)?;

    // Catch-all: a divergence the enumerated checks did not cover.
    Err(AssertionFailure::new("composite objects a and b differ"))
}

/// Assert two arrays are elementwise equal within `tol`.
///
/// Shapes must match exactly (no broadcasting). Non-floating element kinds
/// compare exactly regardless of `tol`. For floating kinds the failure
/// reports both arrays, the full absolute-difference array, the maximum
/// difference and the origin-based coordinate of its first occurrence in
/// storage order.
pub fn assert_arrays_almost_equal(
    a: &FortArray,
    b: &FortArray,
    tol: f64,
) -> Result<(), AssertionFailure> {
    if a.shape() != b.shape() {
        return Err(AssertionFailure::new(format!(
            "array shapes differ: {:?} != {:?}",
            a.shape(),
            b.shape()
        )));
    }
    if a.kind() != b.kind() {
        return Err(AssertionFailure::new(format!(
            "array element kinds differ: {} != {}",
            a.kind(),
            b.kind()
        )));
    }

    if !a.kind().is_floating() {
        if a.data() != b.data() {
            return Err(AssertionFailure::new(format!(
                "{} arrays differ exactly:\na\n{}\n\nb\n{}",
                a.kind(),
                a,
                b
            )));
        }
        return Ok(());
    }

    let absdiff = a.abs_diff(b).map_err(AssertionFailure::new)?;
    let (max, flat) = match absdiff.max_with_argmax() {
        Some(m) => m,
        None => return Ok(()), // empty arrays are equal
    };
    if max <= tol {
        return Ok(());
    }

    // First maximum in storage order, shifted back to the arrays' own index
    // origin. This exact derivation is the diagnostic contract.
    let location: Vec<i64> = absdiff
        .unravel(flat)
        .iter()
        .map(|&c| c as i64 + a.offset())
        .collect();

    let mut message = String::new();
    let _ = writeln!(message, "a");
    let _ = writeln!(message, "{a}");
    let _ = writeln!(message);
    let _ = writeln!(message, "b");
    let _ = writeln!(message, "{b}");
    let _ = writeln!(message);
    let _ = writeln!(message, "Absolute difference");
    // absdiff inherits a's transpose-for-display preference.
    let _ = writeln!(message, "{absdiff}");
    let _ = writeln!(message);
    let _ = write!(
        message,
        "Maximum abs difference between array elements is {:e} at location {:?}",
        max, location
    );

    Err(AssertionFailure {
        message,
        divergence: Some(ArrayDivergence { max_diff: max, location }),
    })
}

/// Parse a whitespace-separated numeric table into a real array, transposed
/// so each text line becomes one column. Handy for literal fixture data.
pub fn parse_table(text: &str) -> Result<FortArray, String> {
    let mut lines: Vec<Vec<f64>> = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Result<Vec<f64>, _> = line.split_whitespace().map(str::parse).collect();
        let fields = fields.map_err(|e| format!("line {}: {}", lineno + 1, e))?;
        if let Some(first) = lines.first() {
            if fields.len() != first.len() {
                return Err(format!(
                    "line {}: expected {} fields, got {}",
                    lineno + 1,
                    first.len(),
                    fields.len()
                ));
            }
        }
        lines.push(fields);
    }
    let ncols = lines.len();
    let nrows = lines.first().map(|l| l.len()).unwrap_or(0);
    // Transposed: line l becomes column l, so the flattened line data is
    // already column-major.
    let data: Vec<f64> = lines.into_iter().flatten().collect();
    FortArray::real(data, vec![nrows, ncols])
}
