use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};

const PLUGIN_PREFIX: char = '@';
const SCRIPT_PREFIX: char = '#';

/// One entry of a tester's key list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    /// `@name`: open the named plugin
    Plugin(String),
    /// `#name`: run a script (reserved, dispatch skips it)
    Script(String),
    /// Any other token: a named key code to press
    Key(String),
}

/// Ordered list of actions, dispatched front to back.
pub type KeyList = Vec<ActionKey>;

/// Rejected key list entry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid action key '{0}'")]
pub struct InvalidActionKey(pub String);

impl ActionKey {
    /// Name without the type prefix.
    pub fn name(&self) -> &str {
        match self {
            ActionKey::Plugin(name) | ActionKey::Script(name) | ActionKey::Key(name) => name,
        }
    }
}

impl FromStr for ActionKey {
    type Err = InvalidActionKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidActionKey(s.to_string());

        let key = if let Some(name) = s.strip_prefix(PLUGIN_PREFIX) {
            ActionKey::Plugin(name.to_string())
        } else if let Some(name) = s.strip_prefix(SCRIPT_PREFIX) {
            ActionKey::Script(name.to_string())
        } else {
            ActionKey::Key(s.to_string())
        };

        let name = key.name();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(key)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::Plugin(name) => write!(f, "{PLUGIN_PREFIX}{name}"),
            ActionKey::Script(name) => write!(f, "{SCRIPT_PREFIX}{name}"),
            ActionKey::Key(name) => write!(f, "{name}"),
        }
    }
}

impl Serialize for ActionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
