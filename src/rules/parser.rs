use super::{RulesError, Section};

const COMMENT: char = ';';

#[derive(Debug)]
struct Token {
    text: String,
    quoted: bool,
}

impl Token {
    fn is_comment(&self) -> bool {
        !self.quoted && self.text.starts_with(COMMENT)
    }

    fn is_separator(&self) -> bool {
        !self.quoted && self.text == "="
    }

    fn section_name(&self) -> Option<&str> {
        if self.quoted {
            return None;
        }
        self.text
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
    }
}

/// Splits a line at whitespace. Double quotes group a token and may
/// produce an empty one.
fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' if in_quotes => {
                tokens.push(Token {
                    text: std::mem::take(&mut current),
                    quoted: true,
                });
                in_quotes = false;
            }
            '"' => {
                if !current.is_empty() {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted: false,
                    });
                }
                in_quotes = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted: false,
                    });
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            quoted: in_quotes,
        });
    }

    tokens
}

pub(super) struct Parser {
    sections: Vec<Section>,
    current: Option<usize>,
}

impl Parser {
    pub(super) fn new() -> Self {
        Self {
            sections: Vec::new(),
            current: None,
        }
    }

    pub(super) fn finish(self) -> Vec<Section> {
        self.sections
    }

    pub(super) fn parse_line(&mut self, line_no: usize, line: &str) -> Result<(), RulesError> {
        let syntax = |reason: &str| RulesError::Syntax {
            line: line_no,
            reason: reason.to_string(),
        };

        let mut tokens = tokenize(line).into_iter().peekable();
        let mut key: Option<String> = None;
        let mut values: Vec<String> = Vec::new();
        let mut separator_seen = false;

        while let Some(token) = tokens.next() {
            if token.is_comment() {
                break;
            }

            if key.is_none()
                && !separator_seen
                && let Some(name) = token.section_name()
            {
                if name.is_empty() {
                    return Err(syntax("empty section name"));
                }
                match tokens.next() {
                    None => {}
                    Some(next) if next.is_comment() => {}
                    Some(_) => return Err(syntax("syntax error on section")),
                }
                self.open_section(name, line_no);
                return Ok(());
            }

            if token.is_separator() {
                if separator_seen {
                    return Err(syntax("duplicate ="));
                }
                if key.is_none() {
                    return Err(syntax("missing key before ="));
                }
                separator_seen = true;
                continue;
            }

            if separator_seen {
                values.push(token.text);
            } else if key.is_none() {
                key = Some(token.text);
            } else {
                return Err(syntax("missing ="));
            }
        }

        let Some(key) = key else {
            return Ok(());
        };

        if !separator_seen {
            return Err(syntax("missing ="));
        }

        let index = self
            .current
            .ok_or_else(|| syntax("key outside of a section"))?;
        self.sections[index].add_values(&key, values);

        Ok(())
    }

    fn open_section(&mut self, name: &str, line_no: usize) {
        let name = name.to_uppercase();
        let index = match self.sections.iter().position(|s| s.name() == name) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(name, line_no));
                self.sections.len() - 1
            }
        };
        self.current = Some(index);
    }
}
