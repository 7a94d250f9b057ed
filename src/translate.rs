//! Translator driver
//!
//! Orchestrates one translation pass: expand the schema, verify coverage
//! against the parameter store, then per entry resolve sources, combine,
//! shape-check, and assign. Entries are processed in the expander's
//! deterministic order; the first failure aborts the pass with full entry
//! context. A failed pass leaves the target model in a known-unusable state
//! that the caller must not train or infer with — there is no partial
//! success and no skip-and-continue.

use std::collections::HashSet;

use serde::Serialize;

use crate::combine::combine;
use crate::error::{Result, TraducirError};
use crate::expand::{expand, ConcreteEntry};
use crate::schema::{CombineOp, MappingSchema};
use crate::store::{CheckpointStore, ParameterStore};

/// Audit record for one applied entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRecord {
    /// Index in the expanded entry sequence
    pub index: usize,
    /// Concrete target parameter name
    pub target: String,
    /// Reconciliation operation applied
    pub op: CombineOp,
    /// Number of source tensors consumed
    pub sources: usize,
    /// Number of f32 elements written
    pub elements: usize,
}

/// Audit record for a successful translation pass
///
/// Reports are deterministic for a given schema, checkpoint, and layer
/// count, so they diff cleanly across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationReport {
    /// Layer count the schema was expanded against
    pub layer_count: usize,
    /// Per-entry records in application order
    pub entries: Vec<EntryRecord>,
    /// Total parameters written (equals the store's parameter count)
    pub parameters_written: usize,
    /// Total f32 elements written
    pub elements_written: usize,
}

/// Translate a checkpoint into a parameter store per a mapping schema
///
/// Every parameter in `params` is written exactly once on success. Failure
/// aborts the pass at the first faulty entry; parameters of earlier entries
/// may already hold translated values, parameters of later entries are
/// untouched.
///
/// # Errors
///
/// - `InvalidLayerCount` — zero layers against a templated schema
/// - `SchemaError` — a store parameter no expanded entry covers, or two
///   expanded entries claiming one target
/// - `EntryFailed` — wraps `MissingSourceTensor`, `MissingTargetParameter`,
///   `ArityMismatch`, `ShapeMismatch`, or `InvalidShape` with the failing
///   entry's index and target
pub fn translate<C, P>(
    schema: &MappingSchema,
    checkpoint: &C,
    params: &mut P,
    layer_count: usize,
) -> Result<TranslationReport>
where
    C: CheckpointStore + ?Sized,
    P: ParameterStore + ?Sized,
{
    let entries = expand(schema, layer_count)?;
    check_coverage(&entries, params)?;

    let mut records = Vec::with_capacity(entries.len());
    let mut elements_written = 0usize;

    for (index, entry) in entries.iter().enumerate() {
        let elements = apply_entry(index, entry, checkpoint, params)?;
        elements_written += elements;
        records.push(EntryRecord {
            index,
            target: entry.target.clone(),
            op: entry.op,
            sources: entry.sources.len(),
            elements,
        });
    }

    Ok(TranslationReport {
        layer_count,
        parameters_written: records.len(),
        elements_written,
        entries: records,
    })
}

/// Expanded targets must cover the store's name set exactly, once each
fn check_coverage<P>(entries: &[ConcreteEntry], params: &P) -> Result<()>
where
    P: ParameterStore + ?Sized,
{
    let mut targets: HashSet<&str> = HashSet::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if !targets.insert(&entry.target) {
            return Err(TraducirError::SchemaError {
                reason: format!(
                    "expanded entry {index} claims target '{}' already claimed by an \
                     earlier entry",
                    entry.target
                ),
            });
        }
    }

    let names = params.names();
    for name in &names {
        if !targets.contains(name.as_str()) {
            return Err(TraducirError::SchemaError {
                reason: format!("model parameter '{name}' is not covered by the schema"),
            });
        }
    }

    if targets.len() != names.len() {
        let known: HashSet<&str> = names.iter().map(String::as_str).collect();
        let orphan = entries
            .iter()
            .map(|e| e.target.as_str())
            .find(|t| !known.contains(t))
            .unwrap_or("<unknown>");
        return Err(TraducirError::MissingTargetParameter {
            name: orphan.to_string(),
        });
    }

    Ok(())
}

/// Resolve, combine, shape-check, and assign one entry
fn apply_entry<C, P>(
    index: usize,
    entry: &ConcreteEntry,
    checkpoint: &C,
    params: &mut P,
) -> Result<usize>
where
    C: CheckpointStore + ?Sized,
    P: ParameterStore + ?Sized,
{
    let fail = |source: TraducirError| TraducirError::EntryFailed {
        index,
        target: entry.target.clone(),
        source: Box::new(source),
    };

    let mut sources = Vec::with_capacity(entry.sources.len());
    for name in &entry.sources {
        let tensor = checkpoint.lookup(name).ok_or_else(|| {
            fail(TraducirError::MissingSourceTensor {
                name: name.clone(),
            })
        })?;
        sources.push(tensor);
    }

    let combined = combine(&sources, entry.op).map_err(&fail)?;

    let param = params.lookup_mut(&entry.target).ok_or_else(|| {
        fail(TraducirError::MissingTargetParameter {
            name: entry.target.clone(),
        })
    })?;

    if param.shape() != combined.shape() {
        let expected = param.shape().to_vec();
        return Err(fail(TraducirError::ShapeMismatch {
            name: entry.target.clone(),
            expected,
            actual: combined.shape().to_vec(),
        }));
    }

    param.overwrite(combined.data());
    Ok(combined.size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MappingEntry;
    use crate::store::{Parameter, ParameterSet, TensorMap};
    use crate::tensor::ShapedTensor;

    fn t(shape: &[usize], data: &[f32]) -> ShapedTensor {
        ShapedTensor::from_vec(shape.to_vec(), data.to_vec()).unwrap()
    }

    /// Two-layer toy model: per-layer fused weight from two stacked halves,
    /// plus one fixed transposed kernel.
    fn toy_schema() -> MappingSchema {
        MappingSchema::new(vec![
            MappingEntry::fused(
                "layers.{layer}.fused.weight",
                &["src/layer_{layer}/alpha", "src/layer_{layer}/beta"],
                CombineOp::Stack,
            ),
            MappingEntry::single("head.weight", "src/head/kernel", CombineOp::Transpose),
        ])
        .unwrap()
    }

    fn toy_checkpoint() -> TensorMap {
        let mut ckpt = TensorMap::new();
        for layer in 0..2 {
            let base = (layer * 10) as f32;
            ckpt.insert(
                format!("src/layer_{layer}/alpha"),
                t(&[1, 2], &[base + 1.0, base + 2.0]),
            );
            ckpt.insert(
                format!("src/layer_{layer}/beta"),
                t(&[1, 2], &[base + 3.0, base + 4.0]),
            );
        }
        ckpt.insert("src/head/kernel", t(&[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        ckpt
    }

    fn toy_params() -> ParameterSet {
        let mut params = ParameterSet::new();
        params.insert("layers.0.fused.weight", Parameter::zeros(vec![2, 2]).unwrap());
        params.insert("layers.1.fused.weight", Parameter::zeros(vec![2, 2]).unwrap());
        params.insert("head.weight", Parameter::zeros(vec![3, 2]).unwrap());
        params
    }

    #[test]
    fn test_translate_success_values() {
        let schema = toy_schema();
        let ckpt = toy_checkpoint();
        let mut params = toy_params();

        let report = translate(&schema, &ckpt, &mut params, 2).unwrap();
        assert_eq!(report.parameters_written, 3);
        assert_eq!(report.layer_count, 2);
        assert_eq!(report.elements_written, 4 + 4 + 6);

        assert_eq!(
            params.get("layers.0.fused.weight").unwrap().data(),
            &[1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(
            params.get("layers.1.fused.weight").unwrap().data(),
            &[11.0, 12.0, 13.0, 14.0]
        );
        // Transposed head kernel
        assert_eq!(
            params.get("head.weight").unwrap().data(),
            &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]
        );
    }

    #[test]
    fn test_report_order_is_expansion_order() {
        let schema = toy_schema();
        let ckpt = toy_checkpoint();
        let mut params = toy_params();

        let report = translate(&schema, &ckpt, &mut params, 2).unwrap();
        let targets: Vec<&str> = report.entries.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(
            targets,
            vec![
                "layers.0.fused.weight",
                "layers.1.fused.weight",
                "head.weight"
            ]
        );
        assert_eq!(report.entries[2].op, CombineOp::Transpose);
    }

    #[test]
    fn test_missing_source_fails_fast() {
        let schema = toy_schema();
        let mut ckpt = toy_checkpoint();
        ckpt.remove("src/layer_1/beta");
        let mut params = toy_params();

        let err = translate(&schema, &ckpt, &mut params, 2).unwrap_err();
        match &err {
            TraducirError::EntryFailed { index, target, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(target, "layers.1.fused.weight");
            }
            other => panic!("expected EntryFailed, got {other:?}"),
        }
        match err.root_cause() {
            TraducirError::MissingSourceTensor { name } => {
                assert_eq!(name, "src/layer_1/beta");
            }
            other => panic!("expected MissingSourceTensor, got {other:?}"),
        }

        // Entry 0 was applied before the failure; later entries untouched.
        assert_eq!(
            params.get("layers.0.fused.weight").unwrap().data(),
            &[1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(params.get("head.weight").unwrap().data(), &[0.0; 6]);
    }

    #[test]
    fn test_shape_mismatch_reports_both_shapes() {
        let schema = toy_schema();
        let ckpt = toy_checkpoint();
        let mut params = toy_params();
        params.insert("head.weight", Parameter::zeros(vec![2, 3]).unwrap());

        let err = translate(&schema, &ckpt, &mut params, 2).unwrap_err();
        match err.root_cause() {
            TraducirError::ShapeMismatch {
                name,
                expected,
                actual,
            } => {
                assert_eq!(name, "head.weight");
                assert_eq!(expected, &[2, 3]);
                assert_eq!(actual, &[3, 2]);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unmapped_parameter_aborts_before_writes() {
        let schema = toy_schema();
        let ckpt = toy_checkpoint();
        let mut params = toy_params();
        params.insert("extra.bias", Parameter::zeros(vec![4]).unwrap());

        let err = translate(&schema, &ckpt, &mut params, 2).unwrap_err();
        assert!(matches!(err, TraducirError::SchemaError { .. }));
        assert!(err.to_string().contains("extra.bias"));

        // Pre-flight failed, so nothing was written at all.
        assert_eq!(params.get("layers.0.fused.weight").unwrap().data(), &[0.0; 4]);
    }

    #[test]
    fn test_orphan_target_aborts_before_writes() {
        let schema = toy_schema();
        let ckpt = toy_checkpoint();
        let mut params = toy_params();

        // Expanding 3 layers names layers.2.* which the store lacks
        let err = translate(&schema, &ckpt, &mut params, 3).unwrap_err();
        match err {
            TraducirError::MissingTargetParameter { name } => {
                assert_eq!(name, "layers.2.fused.weight");
            }
            other => panic!("expected MissingTargetParameter, got {other:?}"),
        }
        assert_eq!(params.get("layers.0.fused.weight").unwrap().data(), &[0.0; 4]);
    }

    #[test]
    fn test_zero_layer_count_rejected() {
        let schema = toy_schema();
        let ckpt = toy_checkpoint();
        let mut params = toy_params();
        let err = translate(&schema, &ckpt, &mut params, 0).unwrap_err();
        assert!(matches!(err, TraducirError::InvalidLayerCount { .. }));
    }

    #[test]
    fn test_translate_is_idempotent() {
        let schema = toy_schema();
        let ckpt = toy_checkpoint();
        let mut params = toy_params();

        translate(&schema, &ckpt, &mut params, 2).unwrap();
        let first: Vec<Vec<f32>> = params
            .names()
            .iter()
            .map(|n| params.get(n).unwrap().data().to_vec())
            .collect();

        translate(&schema, &ckpt, &mut params, 2).unwrap();
        let second: Vec<Vec<f32>> = params
            .names()
            .iter()
            .map(|n| params.get(n).unwrap().data().to_vec())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_report_serializes() {
        let schema = toy_schema();
        let ckpt = toy_checkpoint();
        let mut params = toy_params();
        let report = translate(&schema, &ckpt, &mut params, 2).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"layer_count\":2"));
        assert!(json.contains("head.weight"));
    }
}
