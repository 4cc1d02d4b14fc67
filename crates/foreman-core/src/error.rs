use serde_json::Value;
use thiserror::Error;

/// A failure while building the schedule from its definition.
///
/// Every variant is raised during load, is fatal to startup, and carries a
/// human-readable hint via [`SetupError::hint`]. The process must never start
/// with a partially-resolved schedule.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The definition file could not be read or deserialised.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A key is missing from both the process environment and the `[env]` section.
    #[error("Your env is missing \"{key}\" which is required")]
    Env { key: String },

    /// An environment variable held a value that looks structured but doesn't parse.
    #[error("Couldn't parse value of key \"{key}\" in environment variables ({value})")]
    EnvParse { key: String, value: String },

    /// A chain of `$name` indirections never reached a concrete value.
    #[error("Env key \"{key}\" is part of a $-reference cycle")]
    EnvLoop { key: String },

    /// The `run` field of a task did not parse as a recurrence rule.
    #[error("Invalid recurrence rule for task \"{task}\": {reason}")]
    Calendar { task: String, reason: String },

    /// A job named a slave path with no registered slave behind it.
    #[error("No slave registered at \"{path}\"")]
    SlaveNotFound { path: String },

    /// A slave path resolved to a namespace with no callback.
    #[error("\"{path}\" is a group, not an invocable slave")]
    NotInvocable { path: String },

    /// Two slaves were registered under the same name at the same level.
    #[error("Group \"{parent}\" already has a slave \"{name}\"")]
    DuplicateSlave { parent: String, name: String },

    /// A slave declares a required parameter the job config doesn't provide.
    #[error("Job \"{job}\" is missing required argument \"{param}\"")]
    MissingArgument { job: String, param: String },

    /// An argument value could not be coerced to its declared parameter type.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The `ext` list names an extension nothing provides.
    #[error("Couldn't find extension \"{name}\"")]
    UnknownExtension { name: String },

    /// The `[notifications]` section names a carrier nothing provides.
    #[error("Couldn't find carrier \"{name}\"")]
    UnknownCarrier { name: String },

    /// A carrier rejected its options at construction time.
    #[error("Carrier \"{name}\" rejected its options: {reason}")]
    Carrier { name: String, reason: String },
}

impl SetupError {
    /// Short actionable hint printed alongside the error at startup.
    pub fn hint(&self) -> &'static str {
        match self {
            SetupError::Config(_) => "Fix the definition file and try again",
            SetupError::Env { .. } => {
                "Define it in the [env] section or export it as an environment variable"
            }
            SetupError::EnvParse { .. } => "Make sure the value is well-formatted",
            SetupError::EnvLoop { .. } => "Break the $-reference cycle in the [env] section",
            SetupError::Calendar { .. } => {
                "Use a preset name (e.g. \"daily\") or the compact form \"[<spec><unit> ...]\""
            }
            SetupError::SlaveNotFound { .. } => {
                "Check the dotted path and make sure the extension providing it is listed in ext"
            }
            SetupError::NotInvocable { .. } => {
                "The path stops at a namespace; append the name of one of its slaves"
            }
            SetupError::DuplicateSlave { .. } => {
                "Rename one of the two or move it into its own group"
            }
            SetupError::MissingArgument { .. } => "Add the argument to the job table",
            SetupError::Conversion(_) => {
                "Check the argument's value against the slave's declared parameter type"
            }
            SetupError::UnknownExtension { .. } => "Check the spelling in the ext list",
            SetupError::UnknownCarrier { .. } => {
                "Check the spelling and make sure the carrier's name is registered"
            }
            SetupError::Carrier { .. } => "Check the carrier's options in [notifications]",
        }
    }
}

/// A value that could not be coerced to a declared parameter type.
///
/// Carries the parameter key, the raw value, and the converter that gave up,
/// so the startup log pinpoints the offending line of the definition.
#[derive(Debug, Error)]
#[error("Couldn't convert argument \"{key}\" with converter <{converter}>: {reason} (value: {value})")]
pub struct ConversionError {
    pub key: String,
    pub value: Value,
    pub converter: String,
    pub reason: String,
}

pub type Result<T> = std::result::Result<T, SetupError>;
