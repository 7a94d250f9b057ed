//! Name expansion: schema templates to concrete entries
//!
//! Substitutes the layer placeholder in every templated entry with each
//! layer index, producing the concrete work list the translator driver
//! consumes. Emission order is deterministic so two runs over the same
//! schema produce identical reports: templated entries first (schema order,
//! layers ascending within each entry), then the fixed entries in schema
//! order.

use crate::error::{Result, TraducirError};
use crate::schema::{CombineOp, MappingSchema};

/// A mapping entry with every placeholder substituted
///
/// Produced only by [`expand`]; the concrete names here are the only
/// strings the stores ever see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteEntry {
    /// Concrete target parameter name
    pub target: String,
    /// Concrete source tensor names, in schema order
    pub sources: Vec<String>,
    /// Reconciliation operation
    pub op: CombineOp,
}

/// Expand a schema against a concrete layer count
///
/// Emits `layer_count × templated + fixed` entries. A schema with templated
/// entries describes a model with at least one repeated layer, so
/// `layer_count == 0` is rejected for such schemas rather than silently
/// producing a partial mapping.
///
/// # Errors
///
/// Returns `InvalidLayerCount` if `layer_count` is zero while the schema
/// contains templated entries.
pub fn expand(schema: &MappingSchema, layer_count: usize) -> Result<Vec<ConcreteEntry>> {
    if layer_count == 0 && schema.templated_count() > 0 {
        return Err(TraducirError::InvalidLayerCount {
            layer_count,
            reason: format!(
                "schema has {} templated entries but zero layers to expand against",
                schema.templated_count()
            ),
        });
    }

    let mut out = Vec::with_capacity(layer_count * schema.templated_count() + schema.fixed_count());

    for entry in schema.entries().iter().filter(|e| e.is_templated()) {
        for layer in 0..layer_count {
            out.push(ConcreteEntry {
                target: entry.target.instantiate(layer),
                sources: entry.sources.iter().map(|s| s.instantiate(layer)).collect(),
                op: entry.op,
            });
        }
    }

    for entry in schema.entries().iter().filter(|e| !e.is_templated()) {
        out.push(ConcreteEntry {
            // Validated non-templated at schema construction; instantiate
            // is a no-op here but keeps one code path.
            target: entry.target.instantiate(0),
            sources: entry.sources.iter().map(|s| s.instantiate(0)).collect(),
            op: entry.op,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MappingEntry;

    fn two_entry_schema() -> MappingSchema {
        MappingSchema::new(vec![
            MappingEntry::single(
                "encoder.layers.{layer}.norm1.weight",
                "bert/encoder/layer_{layer}/attention/output/LayerNorm/gamma",
                CombineOp::Identity,
            ),
            MappingEntry::single(
                "pooler.dense.bias",
                "bert/pooler/dense/bias",
                CombineOp::Identity,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_expansion_count_and_order() {
        let entries = expand(&two_entry_schema(), 3).unwrap();
        assert_eq!(entries.len(), 3 + 1);

        // Templated entries first, layers ascending, fixed entries last
        assert_eq!(entries[0].target, "encoder.layers.0.norm1.weight");
        assert_eq!(entries[1].target, "encoder.layers.1.norm1.weight");
        assert_eq!(entries[2].target, "encoder.layers.2.norm1.weight");
        assert_eq!(entries[3].target, "pooler.dense.bias");
    }

    #[test]
    fn test_sources_expand_with_target() {
        let entries = expand(&two_entry_schema(), 2).unwrap();
        assert_eq!(
            entries[1].sources,
            vec!["bert/encoder/layer_1/attention/output/LayerNorm/gamma".to_string()]
        );
    }

    #[test]
    fn test_zero_layers_with_templates_rejected() {
        let err = expand(&two_entry_schema(), 0).unwrap_err();
        assert!(matches!(err, TraducirError::InvalidLayerCount { .. }));
    }

    #[test]
    fn test_zero_layers_without_templates_ok() {
        let schema = MappingSchema::new(vec![MappingEntry::single(
            "pooler.dense.bias",
            "bert/pooler/dense/bias",
            CombineOp::Identity,
        )])
        .unwrap();
        let entries = expand(&schema, 0).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_no_duplicate_targets_after_expansion() {
        let entries = expand(&two_entry_schema(), 12).unwrap();
        let mut targets: Vec<&str> = entries.iter().map(|e| e.target.as_str()).collect();
        targets.sort_unstable();
        targets.dedup();
        assert_eq!(targets.len(), entries.len());
    }

    #[test]
    fn test_determinism() {
        let a = expand(&two_entry_schema(), 4).unwrap();
        let b = expand(&two_entry_schema(), 4).unwrap();
        assert_eq!(a, b);
    }
}
