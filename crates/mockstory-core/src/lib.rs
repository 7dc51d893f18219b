//! Core contracts and helpers for mockstory.
//!
//! This crate defines the value model, the error type, the fluent constraint
//! builders and the field dependency graph shared by the schema and
//! generation crates.

pub mod construct;
pub mod error;
pub mod generator;
pub mod graph;
pub mod value;

pub use construct::{
    Construct, DateShape, FloatShape, IntShape, RangeConstruct, Rule, Shape, TextShape,
};
pub use error::{MockError, Result};
pub use generator::GeneratorSpec;
pub use graph::{DependencyGraph, GraphSummary};
pub use value::{MockValue, Record, record_to_json};
