//! Conversions between managed values and the native wire representation.
//!
//! Scalars cross by value, arrays with their shape, strings with an explicit
//! byte length, logicals as the runtime-reported sentinel pair. Managed-side
//! mismatches are argument-binding errors raised before any native call;
//! native-side surprises are opaque native failures.

use atombind_spec::PrimKind;
use atombind_values::{ArrayData, FortArray, Value};

use crate::host::RuntimeHost;
use crate::runtime::NativeArg;
use crate::BindError;

fn binding_err(ctx: &str, reason: String) -> BindError {
    BindError::ArgumentBinding { routine: ctx.to_string(), reason }
}

fn native_err(ctx: &str, message: String) -> BindError {
    BindError::NativeCall { routine: ctx.to_string(), message }
}

/// Whether a managed value can bind to a scalar of the given kind.
pub(crate) fn scalar_accepts(prim: PrimKind, value: &Value) -> bool {
    matches!(
        (prim, value),
        (PrimKind::Real, Value::Num(_))
            | (PrimKind::Real, Value::Int(_))
            | (PrimKind::Int, Value::Int(_))
            | (PrimKind::Int, Value::Num(_))
            | (PrimKind::Logical, Value::Bool(_))
            | (PrimKind::Str, Value::String(_))
    )
}

pub(crate) fn scalar_to_native(
    host: &RuntimeHost,
    prim: PrimKind,
    value: &Value,
    ctx: &str,
) -> Result<NativeArg, BindError> {
    match (prim, value) {
        (PrimKind::Real, Value::Num(n)) => Ok(NativeArg::Real(*n)),
        (PrimKind::Real, Value::Int(i)) => Ok(NativeArg::Real(*i as f64)),
        (PrimKind::Int, Value::Int(i)) => Ok(NativeArg::Int(*i)),
        (PrimKind::Int, Value::Num(n)) => Ok(NativeArg::Int(*n as i32)),
        (PrimKind::Logical, Value::Bool(b)) => Ok(NativeArg::Int(host.marshal_bool(*b)?)),
        (PrimKind::Str, Value::String(s)) => Ok(NativeArg::str(s)),
        (prim, value) => Err(binding_err(
            ctx,
            format!("expected {prim:?} scalar, got {}", value.kind_name()),
        )),
    }
}

pub(crate) fn array_to_native(
    host: &RuntimeHost,
    prim: PrimKind,
    array: &FortArray,
    ctx: &str,
) -> Result<NativeArg, BindError> {
    let shape = array.shape().to_vec();
    match (prim, array.data()) {
        (PrimKind::Real, ArrayData::Real(v)) => {
            Ok(NativeArg::RealArray { data: v.clone(), shape })
        }
        (PrimKind::Int, ArrayData::Int(v)) => Ok(NativeArg::IntArray { data: v.clone(), shape }),
        (PrimKind::Logical, ArrayData::Logical(v)) => {
            let data: Result<Vec<i32>, BindError> =
                v.iter().map(|&b| host.marshal_bool(b)).collect();
            Ok(NativeArg::IntArray { data: data?, shape })
        }
        (PrimKind::Str, _) => Err(binding_err(ctx, "string arrays are not supported".to_string())),
        (prim, data) => Err(binding_err(
            ctx,
            format!("expected {prim:?} array, got {} array", data.kind()),
        )),
    }
}

pub(crate) fn native_to_scalar(
    host: &RuntimeHost,
    prim: PrimKind,
    arg: NativeArg,
    ctx: &str,
) -> Result<Value, BindError> {
    match (prim, arg) {
        (PrimKind::Real, NativeArg::Real(n)) => Ok(Value::Num(n)),
        (PrimKind::Int, NativeArg::Int(i)) => Ok(Value::Int(i)),
        (PrimKind::Logical, NativeArg::Int(raw)) => Ok(Value::Bool(host.unmarshal_bool(raw)?)),
        (PrimKind::Str, NativeArg::Str { bytes, len }) => {
            let text = String::from_utf8(bytes)
                .map_err(|e| native_err(ctx, format!("invalid string bytes: {e}")))?;
            if text.len() != len {
                return Err(native_err(
                    ctx,
                    format!("string length {} disagrees with declared {}", text.len(), len),
                ));
            }
            Ok(Value::String(text))
        }
        (prim, arg) => Err(native_err(
            ctx,
            format!("expected native {prim:?} scalar, got {arg:?}"),
        )),
    }
}

pub(crate) fn native_to_array(
    host: &RuntimeHost,
    prim: PrimKind,
    arg: NativeArg,
    ctx: &str,
) -> Result<Value, BindError> {
    let array = match (prim, arg) {
        (PrimKind::Real, NativeArg::RealArray { data, shape }) => {
            FortArray::real(data, shape).map_err(|e| native_err(ctx, e))?
        }
        (PrimKind::Int, NativeArg::IntArray { data, shape }) => {
            FortArray::int(data, shape).map_err(|e| native_err(ctx, e))?
        }
        (PrimKind::Logical, NativeArg::IntArray { data, shape }) => {
            let bools: Result<Vec<bool>, BindError> =
                data.iter().map(|&raw| host.unmarshal_bool(raw)).collect();
            FortArray::logical(bools?, shape).map_err(|e| native_err(ctx, e))?
        }
        (prim, arg) => {
            return Err(native_err(
                ctx,
                format!("expected native {prim:?} array, got {arg:?}"),
            ))
        }
    };
    Ok(Value::Array(array))
}
