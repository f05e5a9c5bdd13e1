use std::{io, path::PathBuf};

/// Rules file syntax errors.
#[derive(thiserror::Error, Debug)]
pub enum RulesError {
    /// File could not be opened or read
    #[error("cannot read rules file '{path}': {source}")]
    Read {
        /// Path of the rules file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A line does not follow the `[SECTION]` / `KEY = VALUE ...` grammar
    #[error("line {line}: {reason}")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// What is wrong with the line
        reason: String,
    },

    /// File parsed but declares no section at all
    #[error("rules file contains no sections")]
    Empty,
}

/// Semantic errors in a single rules section.
///
/// Raised while binding sections to testers. Always fatal at load time.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Required key is absent
    #[error("no {key} specified in section {section}")]
    MissingKey {
        /// Section name
        section: String,
        /// Missing key
        key: String,
    },

    /// Key is neither required nor optional for the section's type
    #[error("unknown key {key} in section {section}")]
    UnknownKey {
        /// Section name
        section: String,
        /// Offending key
        key: String,
    },

    /// A key that takes a list was given no values
    #[error("key {key} in section {section} has no values")]
    EmptyList {
        /// Section name
        section: String,
        /// Key with the empty list
        key: String,
    },

    /// A single-valued key was given more than one value
    #[error("more than one argument to section {section} key {key}")]
    MultipleValues {
        /// Section name
        section: String,
        /// Key with too many values
        key: String,
    },

    /// A value fails the key's own validity check
    #[error("invalid value '{value}' for {key} in section {section}: {reason}")]
    InvalidValue {
        /// Section name
        section: String,
        /// Key holding the value
        key: String,
        /// Rejected value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// TYPE names no compiled-in tester
    #[error("invalid type {tester_type} in section {section}")]
    UnknownType {
        /// Section name
        section: String,
        /// Declared type
        tester_type: String,
    },
}
