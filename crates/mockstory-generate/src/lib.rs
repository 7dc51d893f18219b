//! Resolution engine for mockstory.
//!
//! This crate turns schemas into deterministic instances through a
//! registry of generators, and composes instances into stories whose
//! relation actions keep collections consistent.

mod effects;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod instance;
pub mod mock;
pub mod model;
pub mod params;
pub mod resolver;
pub mod story;

pub use engine::MockEngine;
pub use errors::GenerationError;
pub use generators::{Generator, GeneratorContext, GeneratorRegistry};
pub use instance::Instance;
pub use mock::{FieldOverride, Mock, MockRequest};
pub use model::{ResolutionReport, ResolveOptions};
pub use params::{ParamKind, ParamMap, ParamSpec, validate_params};
pub use story::{Story, StoryBuilder, StoryEntry};
