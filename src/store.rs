//! Store boundaries: checkpoint (read) and parameter (write)
//!
//! The translator sees the outside world through two traits. A checkpoint
//! store resolves flat source names to shaped tensors; a parameter store
//! resolves hierarchical target names to shape-fixed mutable parameters and
//! can enumerate its full name set, which replaces the original system's
//! runtime reflection over a live model. In-memory implementations of both
//! live here; `checkpoint.rs` adds the file-backed checkpoint stores.

use std::collections::HashMap;

use crate::error::{Result, TraducirError};
use crate::tensor::ShapedTensor;

/// Read-only source of named checkpoint tensors
pub trait CheckpointStore {
    /// Resolve a concrete tensor name, materializing its value
    fn lookup(&self, name: &str) -> Option<ShapedTensor>;

    /// True if the store holds a tensor under `name`
    fn has_tensor(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// One named, shape-fixed learnable tensor of the target model
///
/// The shape is fixed at construction; translation only ever overwrites the
/// values in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Parameter {
    /// Zero-initialized parameter of the given shape
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` for an empty shape or a zero dimension.
    pub fn zeros(shape: Vec<usize>) -> Result<Self> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(TraducirError::InvalidShape {
                reason: format!("parameter shape must be non-empty and non-zero: {shape:?}"),
            });
        }
        let size = shape.iter().product();
        Ok(Self {
            shape,
            data: vec![0.0; size],
        })
    }

    /// Parameter with initial values
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the value count does not match the shape.
    pub fn with_values(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let mut param = Self::zeros(shape)?;
        if values.len() != param.data.len() {
            return Err(TraducirError::ShapeMismatch {
                name: "<parameter init>".to_string(),
                expected: param.shape,
                actual: vec![values.len()],
            });
        }
        param.data = values;
        Ok(param)
    }

    /// Declared shape
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Current values, row-major
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Replace the values in place; identity and shape are preserved
    ///
    /// Callers must have checked the length against [`Parameter::shape`]
    /// first — the translator driver does so before every write.
    pub fn overwrite(&mut self, values: &[f32]) {
        debug_assert_eq!(values.len(), self.data.len());
        self.data.copy_from_slice(values);
    }
}

/// Write-only (from the translator's view) set of named model parameters
pub trait ParameterStore {
    /// The full, fixed parameter name set, in a stable order
    fn names(&self) -> Vec<String>;

    /// Resolve a concrete parameter name to its mutable handle
    fn lookup_mut(&mut self, name: &str) -> Option<&mut Parameter>;
}

/// In-memory parameter store, insertion-ordered
///
/// The stable `names()` order keeps coverage diagnostics and reports
/// reproducible across runs.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    order: Vec<String>,
    params: HashMap<String, Parameter>,
}

impl ParameterSet {
    /// Empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter
    pub fn insert(&mut self, name: impl Into<String>, param: Parameter) {
        let name = name.into();
        if !self.params.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.params.insert(name, param);
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the set holds no parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Read access for verification and tests
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }
}

impl ParameterStore for ParameterSet {
    fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.get_mut(name)
    }
}

/// In-memory checkpoint store over a flat name -> tensor mapping
#[derive(Debug, Clone, Default)]
pub struct TensorMap {
    tensors: HashMap<String, ShapedTensor>,
}

impl TensorMap {
    /// Empty tensor map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tensor
    pub fn insert(&mut self, name: impl Into<String>, tensor: ShapedTensor) {
        self.tensors.insert(name.into(), tensor);
    }

    /// Remove a tensor, returning it if present
    pub fn remove(&mut self, name: &str) -> Option<ShapedTensor> {
        self.tensors.remove(name)
    }

    /// Number of tensors
    #[must_use]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// True if the map holds no tensors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl CheckpointStore for TensorMap {
    fn lookup(&self, name: &str) -> Option<ShapedTensor> {
        self.tensors.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_zeros() {
        let p = Parameter::zeros(vec![2, 3]).unwrap();
        assert_eq!(p.shape(), &[2, 3]);
        assert_eq!(p.data(), &[0.0; 6]);
    }

    #[test]
    fn test_parameter_rejects_zero_dim() {
        assert!(Parameter::zeros(vec![2, 0]).is_err());
        assert!(Parameter::zeros(vec![]).is_err());
    }

    #[test]
    fn test_parameter_with_values_length_checked() {
        let err = Parameter::with_values(vec![2, 2], vec![1.0]).unwrap_err();
        assert!(matches!(err, TraducirError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_parameter_overwrite_preserves_shape() {
        let mut p = Parameter::zeros(vec![2, 2]).unwrap();
        p.overwrite(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.shape(), &[2, 2]);
        assert_eq!(p.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_parameter_set_insertion_order() {
        let mut set = ParameterSet::new();
        set.insert("b.weight", Parameter::zeros(vec![2]).unwrap());
        set.insert("a.weight", Parameter::zeros(vec![2]).unwrap());
        assert_eq!(set.names(), vec!["b.weight", "a.weight"]);
    }

    #[test]
    fn test_parameter_set_replace_keeps_order() {
        let mut set = ParameterSet::new();
        set.insert("w", Parameter::zeros(vec![2]).unwrap());
        set.insert("v", Parameter::zeros(vec![2]).unwrap());
        set.insert("w", Parameter::zeros(vec![3]).unwrap());
        assert_eq!(set.names(), vec!["w", "v"]);
        assert_eq!(set.get("w").unwrap().shape(), &[3]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parameter_set_lookup_mut() {
        let mut set = ParameterSet::new();
        set.insert("w", Parameter::zeros(vec![2]).unwrap());
        set.lookup_mut("w").unwrap().overwrite(&[5.0, 6.0]);
        assert_eq!(set.get("w").unwrap().data(), &[5.0, 6.0]);
        assert!(set.lookup_mut("missing").is_none());
    }

    #[test]
    fn test_tensor_map_lookup() {
        let mut map = TensorMap::new();
        map.insert(
            "bert/pooler/dense/bias",
            ShapedTensor::from_vec(vec![2], vec![1.0, 2.0]).unwrap(),
        );
        assert!(map.has_tensor("bert/pooler/dense/bias"));
        assert!(!map.has_tensor("bert/pooler/dense/kernel"));
        let t = map.lookup("bert/pooler/dense/bias").unwrap();
        assert_eq!(t.data(), &[1.0, 2.0]);
    }
}
