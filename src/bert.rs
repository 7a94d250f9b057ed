//! BERT encoder correspondence table
//!
//! The literal, reviewed mapping between a stock BERT checkpoint export
//! (slash-delimited, per-projection attention weights, un-transposed dense
//! kernels) and a target encoder built from fused-attention primitives
//! (dot-delimited, packed `in_proj` weights, transposed linear kernels).
//!
//! Standard target names produced per layer:
//! - `encoder.layers.{i}.self_attn.in_proj_weight` / `in_proj_bias`
//! - `encoder.layers.{i}.self_attn.out_proj.weight` / `out_proj.bias`
//! - `encoder.layers.{i}.norm1.weight` / `norm1.bias`
//! - `encoder.layers.{i}.linear1.weight` / `linear1.bias`
//! - `encoder.layers.{i}.linear2.weight` / `linear2.bias`
//! - `encoder.layers.{i}.norm2.weight` / `norm2.bias`
//!
//! plus the fixed embedding tables, embedding LayerNorm, and pooler.
//!
//! Attention projection kernels are exported row-major by output feature,
//! so the packed `in_proj_weight` is a plain row-block Stack of the query,
//! key, and value kernels; feed-forward and pooler kernels are exported in
//! the opposite row/column convention and take a Transpose. Task heads
//! (e.g. a classifier) are initialized by the caller, not translated: the
//! parameter store handed to `translate` covers the encoder exactly.

use crate::schema::{CombineOp, MappingEntry, MappingSchema};

/// Templated entries emitted per encoder layer
pub const ENTRIES_PER_LAYER: usize = 12;

/// Fixed entries (embeddings, embedding LayerNorm, pooler)
pub const FIXED_ENTRIES: usize = 7;

/// Build the BERT-base mapping schema for a checkpoint prefix
///
/// `prefix` is the checkpoint's root scope — `"bert"` in stock exports.
/// Together with the layer count passed to `translate`, it is the only
/// external parameter the translation needs.
#[must_use]
pub fn bert_schema(prefix: &str) -> MappingSchema {
    let layer = format!("{prefix}/encoder/layer_{{layer}}");

    let entries = vec![
        // --- per layer: attention ---
        MappingEntry::fused(
            "encoder.layers.{layer}.self_attn.in_proj_weight",
            &[
                &format!("{layer}/attention/self/query/kernel"),
                &format!("{layer}/attention/self/key/kernel"),
                &format!("{layer}/attention/self/value/kernel"),
            ],
            CombineOp::Stack,
        ),
        MappingEntry::fused(
            "encoder.layers.{layer}.self_attn.in_proj_bias",
            &[
                &format!("{layer}/attention/self/query/bias"),
                &format!("{layer}/attention/self/key/bias"),
                &format!("{layer}/attention/self/value/bias"),
            ],
            CombineOp::Concat,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.self_attn.out_proj.weight",
            &format!("{layer}/attention/output/dense/kernel"),
            CombineOp::Transpose,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.self_attn.out_proj.bias",
            &format!("{layer}/attention/output/dense/bias"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.norm1.weight",
            &format!("{layer}/attention/output/LayerNorm/gamma"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.norm1.bias",
            &format!("{layer}/attention/output/LayerNorm/beta"),
            CombineOp::Identity,
        ),
        // --- per layer: feed-forward ---
        MappingEntry::single(
            "encoder.layers.{layer}.linear1.weight",
            &format!("{layer}/intermediate/dense/kernel"),
            CombineOp::Transpose,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.linear1.bias",
            &format!("{layer}/intermediate/dense/bias"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.linear2.weight",
            &format!("{layer}/output/dense/kernel"),
            CombineOp::Transpose,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.linear2.bias",
            &format!("{layer}/output/dense/bias"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.norm2.weight",
            &format!("{layer}/output/LayerNorm/gamma"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "encoder.layers.{layer}.norm2.bias",
            &format!("{layer}/output/LayerNorm/beta"),
            CombineOp::Identity,
        ),
        // --- fixed: embeddings ---
        MappingEntry::single(
            "embeddings.word_embeddings.weight",
            &format!("{prefix}/embeddings/word_embeddings"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "embeddings.position_embeddings.weight",
            &format!("{prefix}/embeddings/position_embeddings"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "embeddings.token_type_embeddings.weight",
            &format!("{prefix}/embeddings/token_type_embeddings"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "embeddings.norm.weight",
            &format!("{prefix}/embeddings/LayerNorm/gamma"),
            CombineOp::Identity,
        ),
        MappingEntry::single(
            "embeddings.norm.bias",
            &format!("{prefix}/embeddings/LayerNorm/beta"),
            CombineOp::Identity,
        ),
        // --- fixed: pooler ---
        MappingEntry::single(
            "pooler.dense.weight",
            &format!("{prefix}/pooler/dense/kernel"),
            CombineOp::Transpose,
        ),
        MappingEntry::single(
            "pooler.dense.bias",
            &format!("{prefix}/pooler/dense/bias"),
            CombineOp::Identity,
        ),
    ];

    MappingSchema::new(entries).expect("literal BERT schema is valid")
}
