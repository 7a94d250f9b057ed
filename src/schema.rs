//! Mapping schema between checkpoint and model parameter namespaces
//!
//! The schema is a declarative table: each entry names one target parameter
//! (template), the ordered source tensors that feed it, and the combine op
//! that reconciles layouts. It is a fixed, reviewed artifact — built from a
//! literal table or loaded from a versioned JSON file — and is validated
//! once at construction. Nothing downstream re-checks these rules.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraducirError};

/// Placeholder substituted with the decimal layer index during expansion
pub const LAYER_PLACEHOLDER: &str = "{layer}";

/// Closed set of tensor reconciliation operations
///
/// The set is intentionally closed: the schema is a reviewed artifact, not
/// user input, so no dynamic or user-supplied ops exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    /// Concatenate along the first axis (row blocks); rebuilds fused
    /// parameters from separately-stored source weights
    Stack,
    /// Concatenate along the last axis; used for fused bias vectors
    Concat,
    /// Swap the two axes of a 2-D tensor; reconciles dense-kernel layout
    /// conventions between frameworks
    Transpose,
    /// Pass the single source through unchanged
    Identity,
}

impl CombineOp {
    /// True if the op accepts `n` inputs
    #[must_use]
    pub fn accepts_arity(self, n: usize) -> bool {
        match self {
            CombineOp::Stack | CombineOp::Concat => n >= 1,
            CombineOp::Transpose | CombineOp::Identity => n == 1,
        }
    }

    /// Human-readable arity requirement, for diagnostics
    #[must_use]
    pub fn expected_arity(self) -> &'static str {
        match self {
            CombineOp::Stack | CombineOp::Concat => "1 or more inputs",
            CombineOp::Transpose | CombineOp::Identity => "exactly 1 input",
        }
    }
}

impl fmt::Display for CombineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CombineOp::Stack => "stack",
            CombineOp::Concat => "concat",
            CombineOp::Transpose => "transpose",
            CombineOp::Identity => "identity",
        };
        write!(f, "{name}")
    }
}

/// A tensor or parameter name that may contain [`LAYER_PLACEHOLDER`]
///
/// Templates are a distinct type from concrete names on purpose: a template
/// is never usable as a lookup key. Only [`NameTemplate::instantiate`] (or
/// [`NameTemplate::as_concrete`] for fixed names) produces a `String` that
/// stores accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameTemplate(String);

impl NameTemplate {
    /// Wrap a name, templated or not
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// True if the name contains the layer placeholder
    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.0.contains(LAYER_PLACEHOLDER)
    }

    /// Substitute the placeholder with a decimal layer index
    #[must_use]
    pub fn instantiate(&self, layer: usize) -> String {
        self.0.replace(LAYER_PLACEHOLDER, &layer.to_string())
    }

    /// Concrete name of a non-templated template
    ///
    /// Returns `None` if the name still contains the placeholder, which
    /// keeps an unexpanded template from leaking into a store lookup.
    #[must_use]
    pub fn as_concrete(&self) -> Option<&str> {
        if self.is_templated() {
            None
        } else {
            Some(&self.0)
        }
    }

    /// Template text, for diagnostics only
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One correspondence: ordered source tensors -> combine op -> target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Target parameter name (template)
    pub target: NameTemplate,
    /// Ordered source tensor names (templates)
    pub sources: Vec<NameTemplate>,
    /// Reconciliation operation
    pub op: CombineOp,
}

impl MappingEntry {
    /// Entry with a single source
    pub fn single(target: &str, source: &str, op: CombineOp) -> Self {
        Self {
            target: NameTemplate::new(target),
            sources: vec![NameTemplate::new(source)],
            op,
        }
    }

    /// Entry combining several sources into one fused target
    pub fn fused(target: &str, sources: &[&str], op: CombineOp) -> Self {
        Self {
            target: NameTemplate::new(target),
            sources: sources.iter().map(|s| NameTemplate::new(*s)).collect(),
            op,
        }
    }

    /// True if this entry expands once per layer
    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.target.is_templated()
    }
}

/// Validated, ordered sequence of mapping entries
///
/// Construction is the single validation gate (arity, template consistency,
/// duplicate targets). Coverage against a concrete parameter store is
/// checked by the translator driver's pre-flight, which is the first place
/// the store is visible.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingSchema {
    entries: Vec<MappingEntry>,
}

impl MappingSchema {
    /// Validate and seal a schema
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if any entry declares an op inconsistent with
    /// its source arity, mixes templated and non-templated names, or
    /// repeats a target already claimed by an earlier entry.
    pub fn new(entries: Vec<MappingEntry>) -> Result<Self> {
        for (index, entry) in entries.iter().enumerate() {
            Self::validate_entry(index, entry)?;
        }

        // Duplicate target templates would violate the write-exactly-once
        // invariant before expansion even runs.
        for (index, entry) in entries.iter().enumerate() {
            if let Some(dup) = entries[..index]
                .iter()
                .position(|e| e.target == entry.target)
            {
                return Err(TraducirError::SchemaError {
                    reason: format!(
                        "entry {index} repeats target '{}' already mapped by entry {dup}",
                        entry.target
                    ),
                });
            }
        }

        Ok(Self { entries })
    }

    fn validate_entry(index: usize, entry: &MappingEntry) -> Result<()> {
        if entry.sources.is_empty() {
            return Err(TraducirError::SchemaError {
                reason: format!("entry {index} ('{}') has no sources", entry.target),
            });
        }

        if !entry.op.accepts_arity(entry.sources.len()) {
            return Err(TraducirError::SchemaError {
                reason: format!(
                    "entry {index} ('{}'): op {} requires {}, got {}",
                    entry.target,
                    entry.op,
                    entry.op.expected_arity(),
                    entry.sources.len()
                ),
            });
        }

        let target_templated = entry.target.is_templated();
        for source in &entry.sources {
            if source.is_templated() != target_templated {
                return Err(TraducirError::SchemaError {
                    reason: format!(
                        "entry {index} ('{}') mixes templated and non-templated names \
                         (source '{source}')",
                        entry.target
                    ),
                });
            }
        }

        Ok(())
    }

    /// Entries in schema order
    #[must_use]
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the schema has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries expanded once per layer
    #[must_use]
    pub fn templated_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_templated()).count()
    }

    /// Number of entries emitted once regardless of layer count
    #[must_use]
    pub fn fixed_count(&self) -> usize {
        self.len() - self.templated_count()
    }

    /// Load and validate a schema from its JSON representation
    ///
    /// The file format is a JSON array of `{target, sources, op}` objects,
    /// `op` in snake case. Parsing and validation are separate failures:
    /// malformed JSON is a `FormatError`, a well-formed file with invalid
    /// entries is a `SchemaError`.
    ///
    /// # Errors
    ///
    /// `FormatError` on malformed JSON, `SchemaError` per [`Self::new`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<MappingEntry> =
            serde_json::from_str(json).map_err(|e| TraducirError::FormatError {
                reason: format!("schema JSON parse failed: {e}"),
            })?;
        Self::new(entries)
    }

    /// Load and validate a schema from a JSON file on disk
    ///
    /// # Errors
    ///
    /// `Io` on read failure, otherwise as [`Self::from_json_str`].
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize the schema to pretty-printed JSON
    ///
    /// # Errors
    ///
    /// `FormatError` if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.entries).map_err(|e| TraducirError::FormatError {
            reason: format!("schema JSON serialization failed: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_detection() {
        assert!(NameTemplate::new("encoder.layers.{layer}.norm1.weight").is_templated());
        assert!(!NameTemplate::new("pooler.dense.weight").is_templated());
    }

    #[test]
    fn test_instantiate_replaces_all_occurrences() {
        let t = NameTemplate::new("bert/encoder/layer_{layer}/attention/self/query/kernel");
        assert_eq!(
            t.instantiate(11),
            "bert/encoder/layer_11/attention/self/query/kernel"
        );
    }

    #[test]
    fn test_as_concrete_refuses_templates() {
        let t = NameTemplate::new("encoder.layers.{layer}.norm1.weight");
        assert!(t.as_concrete().is_none());
        let c = NameTemplate::new("pooler.dense.bias");
        assert_eq!(c.as_concrete(), Some("pooler.dense.bias"));
    }

    #[test]
    fn test_valid_schema() {
        let schema = MappingSchema::new(vec![
            MappingEntry::fused(
                "encoder.layers.{layer}.self_attn.in_proj_weight",
                &[
                    "bert/encoder/layer_{layer}/attention/self/query/kernel",
                    "bert/encoder/layer_{layer}/attention/self/key/kernel",
                    "bert/encoder/layer_{layer}/attention/self/value/kernel",
                ],
                CombineOp::Stack,
            ),
            MappingEntry::single(
                "pooler.dense.weight",
                "bert/pooler/dense/kernel",
                CombineOp::Transpose,
            ),
        ])
        .unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.templated_count(), 1);
        assert_eq!(schema.fixed_count(), 1);
    }

    #[test]
    fn test_transpose_arity_rejected() {
        let result = MappingSchema::new(vec![MappingEntry::fused(
            "pooler.dense.weight",
            &["a/kernel", "b/kernel"],
            CombineOp::Transpose,
        )]);
        let err = result.unwrap_err();
        assert!(matches!(err, TraducirError::SchemaError { .. }));
        assert!(err.to_string().contains("exactly 1 input"));
    }

    #[test]
    fn test_empty_sources_rejected() {
        let result = MappingSchema::new(vec![MappingEntry {
            target: NameTemplate::new("x"),
            sources: vec![],
            op: CombineOp::Stack,
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mixed_templating_rejected() {
        let result = MappingSchema::new(vec![MappingEntry::single(
            "encoder.layers.{layer}.norm1.weight",
            "bert/embeddings/LayerNorm/gamma",
            CombineOp::Identity,
        )]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("mixes templated"));
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let result = MappingSchema::new(vec![
            MappingEntry::single("pooler.dense.bias", "bert/pooler/dense/bias", CombineOp::Identity),
            MappingEntry::single("pooler.dense.bias", "bert/other/bias", CombineOp::Identity),
        ]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("repeats target"));
    }

    #[test]
    fn test_json_round_trip() {
        let schema = MappingSchema::new(vec![
            MappingEntry::fused(
                "encoder.layers.{layer}.self_attn.in_proj_bias",
                &[
                    "bert/encoder/layer_{layer}/attention/self/query/bias",
                    "bert/encoder/layer_{layer}/attention/self/key/bias",
                    "bert/encoder/layer_{layer}/attention/self/value/bias",
                ],
                CombineOp::Concat,
            ),
            MappingEntry::single(
                "embeddings.word_embeddings.weight",
                "bert/embeddings/word_embeddings",
                CombineOp::Identity,
            ),
        ])
        .unwrap();

        let json = schema.to_json_string().unwrap();
        let reloaded = MappingSchema::from_json_str(&json).unwrap();
        assert_eq!(reloaded, schema);
    }

    #[test]
    fn test_json_malformed_is_format_error() {
        let err = MappingSchema::from_json_str("not json").unwrap_err();
        assert!(matches!(err, TraducirError::FormatError { .. }));
    }

    #[test]
    fn test_json_invalid_entries_is_schema_error() {
        // Well-formed JSON, but transpose with two sources
        let json = r#"[
            {"target": "w", "sources": ["a", "b"], "op": "transpose"}
        ]"#;
        let err = MappingSchema::from_json_str(json).unwrap_err();
        assert!(matches!(err, TraducirError::SchemaError { .. }));
    }

    #[test]
    fn test_op_serde_snake_case() {
        let json = serde_json::to_string(&CombineOp::Stack).unwrap();
        assert_eq!(json, "\"stack\"");
        let op: CombineOp = serde_json::from_str("\"transpose\"").unwrap();
        assert_eq!(op, CombineOp::Transpose);
    }
}
