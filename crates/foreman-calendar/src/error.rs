use thiserror::Error;

/// Errors raised while parsing or constructing a recurrence rule.
///
/// These surface at schedule load time; the scheduler wraps them into its
/// fatal setup-error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// The spec is neither a known preset nor a parseable compact form.
    #[error("Malformed recurrence spec \"{spec}\"")]
    Malformed { spec: String },

    /// A single token of the compact form could not be understood.
    #[error("Bad recurrence token \"{token}\"")]
    BadToken { token: String },

    /// The same unit appeared twice in one spec.
    #[error("Duplicate unit \"{unit}\" in recurrence spec")]
    DuplicateUnit { unit: &'static str },

    /// A per-unit map used a key that is not one of the seven units.
    #[error("Unknown unit \"{unit}\" in recurrence map")]
    UnknownUnit { unit: String },

    /// Repeat intervals start at 1; zero would never advance.
    #[error("Repeat interval for unit \"{unit}\" must be at least 1")]
    ZeroInterval { unit: &'static str },
}

pub type Result<T> = std::result::Result<T, CalendarError>;
