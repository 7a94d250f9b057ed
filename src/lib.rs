//! # Traducir
//!
//! Checkpoint weight translation between modeling-framework parameter
//! namespaces.
//!
//! Traducir (Spanish: "to translate") reconciles a flat checkpoint exported
//! by one framework (slash-delimited names, separate attention projections,
//! un-transposed dense kernels) with a target model built from another
//! framework's encoder primitives (dot-delimited names, fused attention
//! projections, transposed linear kernels). The correspondence is a
//! declarative, validated schema; translation is a single fail-fast pass
//! that writes every target parameter exactly once.
//!
//! ## Example
//!
//! ```
//! use traducir::schema::{CombineOp, MappingEntry, MappingSchema};
//! use traducir::store::{Parameter, ParameterSet, TensorMap};
//! use traducir::translate::translate;
//! use traducir::ShapedTensor;
//!
//! // One-entry schema: transpose a dense kernel into the model's layout
//! let schema = MappingSchema::new(vec![MappingEntry::single(
//!     "pooler.dense.weight",
//!     "bert/pooler/dense/kernel",
//!     CombineOp::Transpose,
//! )])?;
//!
//! let mut checkpoint = TensorMap::new();
//! checkpoint.insert(
//!     "bert/pooler/dense/kernel",
//!     ShapedTensor::from_vec(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?,
//! );
//!
//! let mut params = ParameterSet::new();
//! params.insert("pooler.dense.weight", Parameter::zeros(vec![3, 2])?);
//!
//! let report = translate(&schema, &checkpoint, &mut params, 1)?;
//! assert_eq!(report.parameters_written, 1);
//! # Ok::<(), traducir::TraducirError>(())
//! ```
//!
//! ## Architecture
//!
//! Data flow: schema (static) → name expander (needs layer count) →
//! concrete entries → per entry: checkpoint lookups → tensor combinator →
//! shape check against the parameter store → in-place assignment.
//!
//! - [`schema`] — the declarative correspondence table, validated once
//! - [`expand`] — layer-placeholder expansion to concrete entries
//! - [`combine`] — Stack / Concat / Transpose / Identity reconciliation
//! - [`translate`] — the driver: coverage pre-flight, fail-fast pass,
//!   deterministic audit report
//! - [`store`] — checkpoint and parameter store boundaries
//! - [`checkpoint`] — file-backed flat checkpoint container (owned + mmap)
//! - [`bert`] — the literal BERT-base correspondence table
//!
//! Translation is a one-time setup step, not a hot path: single-threaded,
//! synchronous, no retries. Any failure signals schema/checkpoint/model
//! drift and aborts the pass with full entry context.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

/// BERT encoder correspondence table
pub mod bert;
/// Flat checkpoint container (owned and memory-mapped)
pub mod checkpoint;
/// Tensor combinator
pub mod combine;
pub mod error;
/// Name expansion
pub mod expand;
/// Mapping schema
pub mod schema;
/// Store boundaries and in-memory stores
pub mod store;
pub mod tensor;
/// Translator driver
pub mod translate;

// Re-exports for convenience
pub use error::{Result, TraducirError};
pub use tensor::ShapedTensor;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
