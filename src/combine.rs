//! Tensor combinator: reconcile source layouts into the target's
//!
//! One combined tensor per schema entry. Stack rebuilds fused parameters
//! from separately-stored weights (row blocks), Concat fuses bias vectors
//! (last axis, row-interleaved for rank >= 2), Transpose flips 2-D kernels
//! between the frameworks' row/column conventions, Identity passes through.
//! Inputs are never mutated; mismatches fail loudly, never truncate or pad.

use crate::error::{Result, TraducirError};
use crate::schema::CombineOp;
use crate::tensor::ShapedTensor;

/// Apply a combine op to an ordered list of source tensors
///
/// # Errors
///
/// - `ArityMismatch` if `op` demands an arity `inputs` does not satisfy
/// - `ShapeMismatch` if Stack/Concat inputs disagree on the non-varying
///   dimensions
/// - `InvalidShape` if Transpose is applied to a tensor that is not 2-D
pub fn combine(inputs: &[ShapedTensor], op: CombineOp) -> Result<ShapedTensor> {
    if !op.accepts_arity(inputs.len()) {
        return Err(TraducirError::ArityMismatch {
            op: op.to_string(),
            expected: op.expected_arity().to_string(),
            actual: inputs.len(),
        });
    }

    match op {
        CombineOp::Stack => stack(inputs),
        CombineOp::Concat => concat(inputs),
        CombineOp::Transpose => transpose(&inputs[0]),
        CombineOp::Identity => Ok(inputs[0].clone()),
    }
}

/// Concatenate along the first axis: all dims but the first must match
fn stack(inputs: &[ShapedTensor]) -> Result<ShapedTensor> {
    let first = &inputs[0];
    let tail = &first.shape()[1..];

    let mut rows = 0usize;
    for (i, t) in inputs.iter().enumerate() {
        if t.ndim() != first.ndim() || &t.shape()[1..] != tail {
            return Err(TraducirError::ShapeMismatch {
                name: format!("stack input {i}"),
                expected: first.shape().to_vec(),
                actual: t.shape().to_vec(),
            });
        }
        rows += t.shape()[0];
    }

    let mut shape = Vec::with_capacity(first.ndim());
    shape.push(rows);
    shape.extend_from_slice(tail);

    let mut data = Vec::with_capacity(shape.iter().product());
    for t in inputs {
        data.extend_from_slice(t.data());
    }

    ShapedTensor::from_vec(shape, data)
}

/// Concatenate along the last axis: all dims but the last must match
///
/// For rank >= 2 the result interleaves per outer row; for 1-D inputs this
/// degenerates to plain input-by-input layout.
fn concat(inputs: &[ShapedTensor]) -> Result<ShapedTensor> {
    let first = &inputs[0];
    let lead = &first.shape()[..first.ndim() - 1];

    let mut last = 0usize;
    for (i, t) in inputs.iter().enumerate() {
        if t.ndim() != first.ndim() || &t.shape()[..t.ndim() - 1] != lead {
            return Err(TraducirError::ShapeMismatch {
                name: format!("concat input {i}"),
                expected: first.shape().to_vec(),
                actual: t.shape().to_vec(),
            });
        }
        last += t.shape()[t.ndim() - 1];
    }

    let mut shape = lead.to_vec();
    shape.push(last);

    let outer: usize = lead.iter().product();
    let mut data = Vec::with_capacity(shape.iter().product());
    for row in 0..outer {
        for t in inputs {
            let width = t.shape()[t.ndim() - 1];
            data.extend_from_slice(&t.data()[row * width..(row + 1) * width]);
        }
    }

    ShapedTensor::from_vec(shape, data)
}

/// Swap the axes of a 2-D tensor: result (i, j) = input (j, i)
fn transpose(input: &ShapedTensor) -> Result<ShapedTensor> {
    if input.ndim() != 2 {
        return Err(TraducirError::InvalidShape {
            reason: format!("transpose requires a 2-D tensor, got shape {:?}", input.shape()),
        });
    }

    let (rows, cols) = (input.shape()[0], input.shape()[1]);
    let src = input.data();
    let mut data = vec![0.0f32; src.len()];
    for r in 0..rows {
        for c in 0..cols {
            data[c * rows + r] = src[r * cols + c];
        }
    }

    ShapedTensor::from_vec(vec![cols, rows], data)
}
