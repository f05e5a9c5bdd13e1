//! Rules file describing which testers to run and what to dispatch.
//!
//! The format is line oriented:
//!
//! ```text
//! ; comment
//! [GLOBAL]
//! FILTERDEV = AUTO sda
//!
//! [MUSIC]
//! TYPE = FILE
//! FILES = mp3 ogg flac
//! KEYS = @music
//! LINKPATH = "/video/my music"
//! ```
//!
//! Section names and keys are case-insensitive and stored upper case.
//! Values keep their case. Sections stay in file order.

mod error;
mod parser;

#[cfg(test)]
mod tests;

use std::{fs, path::Path};

pub use error::{ConfigError, RulesError};
use parser::Parser;
use tracing::{debug, instrument};

/// Name of the reserved section holding detector-wide options.
pub const GLOBAL_SECTION: &str = "GLOBAL";

/// Parsed rules file.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    sections: Vec<Section>,
}

impl Rules {
    /// Reads and parses a rules file.
    ///
    /// # Errors
    /// Returns `RulesError::Read` if the file cannot be read and any
    /// syntax error from [`Rules::parse`].
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let content = fs::read_to_string(path).map_err(|source| RulesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::parse(&content)?;
        debug!(sections = rules.sections.len(), "Rules file parsed");
        Ok(rules)
    }

    /// Parses rules from a string.
    ///
    /// # Errors
    /// Returns `RulesError::Syntax` for malformed lines and
    /// `RulesError::Empty` if no section is declared.
    pub fn parse(content: &str) -> Result<Self, RulesError> {
        let mut parser = Parser::new();
        for (index, line) in content.lines().enumerate() {
            parser.parse_line(index + 1, line)?;
        }

        let sections = parser.finish();
        if sections.is_empty() {
            return Err(RulesError::Empty);
        }
        Ok(Self { sections })
    }

    /// Sections in the order they first appear in the file.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Looks up a section by case-insensitive name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        let name = name.to_uppercase();
        self.sections.iter().find(|s| s.name == name)
    }
}

/// One `[NAME]` block of the rules file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    line: usize,
    entries: Vec<(String, Vec<String>)>,
}

impl Section {
    fn new(name: String, line: usize) -> Self {
        Self {
            name,
            line,
            entries: Vec::new(),
        }
    }

    fn add_values(&mut self, key: &str, values: Vec<String>) {
        let key = key.to_uppercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.extend(values),
            None => self.entries.push((key, values)),
        }
    }

    /// Upper-cased section name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line the section header first appeared on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Whether this is the reserved `GLOBAL` section.
    pub fn is_global(&self) -> bool {
        self.name == GLOBAL_SECTION
    }

    /// Keys present in the section.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// All values of a key, `None` if the key is absent.
    pub fn values(&self, key: &str) -> Option<&[String]> {
        let key = key.to_uppercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Values of a required list key.
    ///
    /// # Errors
    /// `ConfigError::MissingKey` if absent, `ConfigError::EmptyList` if no
    /// value was given.
    pub fn required_list(&self, key: &str) -> Result<&[String], ConfigError> {
        let values = self.values(key).ok_or_else(|| ConfigError::MissingKey {
            section: self.name.clone(),
            key: key.to_uppercase(),
        })?;
        if values.is_empty() {
            return Err(ConfigError::EmptyList {
                section: self.name.clone(),
                key: key.to_uppercase(),
            });
        }
        Ok(values)
    }

    /// Value of a key that takes zero or one argument.
    ///
    /// # Errors
    /// `ConfigError::MultipleValues` if more than one value is given.
    pub fn single_value(&self, key: &str) -> Result<Option<&str>, ConfigError> {
        match self.values(key) {
            None | Some([]) => Ok(None),
            Some([value]) => Ok(Some(value.as_str())),
            Some(_) => Err(ConfigError::MultipleValues {
                section: self.name.clone(),
                key: key.to_uppercase(),
            }),
        }
    }

    /// Checks the section against the keys a tester accepts.
    ///
    /// # Errors
    /// `ConfigError::MissingKey` for the first absent required key,
    /// `ConfigError::UnknownKey` for the first key in neither set.
    pub fn check_keys(&self, required: &[&str], optional: &[&str]) -> Result<(), ConfigError> {
        if let Some(missing) = required.iter().find(|k| self.values(k).is_none()) {
            return Err(ConfigError::MissingKey {
                section: self.name.clone(),
                key: missing.to_string(),
            });
        }

        if let Some(unknown) = self
            .keys()
            .find(|k| !required.contains(k) && !optional.contains(k))
        {
            return Err(ConfigError::UnknownKey {
                section: self.name.clone(),
                key: unknown.to_string(),
            });
        }

        Ok(())
    }
}
