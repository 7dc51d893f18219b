//! Schema declarations for mockstory.
//!
//! A [`Schema`] names a record shape: its fields (leaf generators,
//! conditional rule trees and derived values), keyword presets, id/name
//! accessors and the relation actions fired by a story.

pub mod action;
pub mod condition;
pub mod field;
pub mod overrides;
pub mod schema;

pub use action::{Accessor, ActionBuilder, Effect, RelationAction, Trigger};
pub use condition::{Condition, Pattern};
pub use field::{Branch, FieldKind, FieldNode, FieldSource, when};
pub use overrides::OverrideSet;
pub use schema::{PlanStep, ResolutionPlan, Schema, SchemaBuilder};
