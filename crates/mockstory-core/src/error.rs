use thiserror::Error;

/// Core error type shared across mockstory crates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MockError {
    /// A fluent builder call broke a previously fixed bound.
    #[error("rule violation: {key} = {value} conflicts with {bound} bound {limit}")]
    RuleViolation {
        key: String,
        value: String,
        bound: String,
        limit: String,
    },
    /// A bound that cannot be ordered or stored, such as NaN.
    #[error("invalid {key} bound {value}")]
    InvalidBound { key: String, value: String },
    /// Field dependencies form a cycle.
    #[error("dependency cycle: {}", fields.join(" -> "))]
    Cycle { fields: Vec<String> },
    /// No conditional branch matched and no default branch exists.
    #[error("no branch matched for field '{field}'")]
    NoBranchMatched { field: String },
    /// An identity comparison was requested without any id accessor.
    #[error("missing id accessor for '{related}' in action on '{schema}'")]
    MissingIdAccessor { schema: String, related: String },
    /// Resolver and graph disagree about evaluation order. Always an engine bug.
    #[error("field '{field}' read unresolved dependency '{dependency}'")]
    UnresolvedDependency { field: String, dependency: String },
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A field name is not declared on the schema.
    #[error("unknown field '{field}' on schema '{schema}'")]
    UnknownField { schema: String, field: String },
    /// A keyword preset is not declared on the schema.
    #[error("unknown keyword '{keyword}' on schema '{schema}'")]
    UnknownKeyword { schema: String, keyword: String },
}

/// Convenience alias for results returned by mockstory crates.
pub type Result<T> = std::result::Result<T, MockError>;
