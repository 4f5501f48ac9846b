//! Line-oriented section format. This layer only knows about names and stored
//! text; whether a value is ciphertext is decided one level up.

use std::fmt::{self, Display};

/// A parse failure with the 1-based line it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for ParseError {}

/// One section exactly as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl RawSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }
}

/// Whole store file as an ordered list of sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    sections: Vec<RawSection>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut sections: Vec<RawSection> = Vec::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let Some(inner) = header.strip_suffix(']') else {
                    return Err(error(line_no, "unterminated section header"));
                };
                let name = inner.trim();
                if name.is_empty() {
                    return Err(error(line_no, "empty section name"));
                }
                if sections.iter().any(|section| section.name == name) {
                    return Err(error(line_no, format!("duplicate section `{name}`")));
                }
                sections.push(RawSection::new(name));
                continue;
            }

            let Some(section) = sections.last_mut() else {
                return Err(error(line_no, "field defined before any section header"));
            };
            let Some((key, value)) = line.split_once('=') else {
                return Err(error(line_no, "expected `name = value`"));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(error(line_no, "empty field name"));
            }
            if section.contains(key) {
                return Err(error(
                    line_no,
                    format!("duplicate field `{key}` in section `{}`", section.name),
                ));
            }
            section
                .entries
                .push((key.to_string(), value.trim().to_string()));
        }

        Ok(Self { sections })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (key, value) in &section.entries {
                out.push_str(key);
                if value.is_empty() {
                    out.push_str(" =\n");
                } else {
                    out.push_str(" = ");
                    out.push_str(value);
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn sections(&self) -> &[RawSection] {
        &self.sections
    }

    pub fn get(&self, name: &str) -> Option<&RawSection> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Replaces the section with the same name in place, or appends it.
    pub fn upsert(&mut self, section: RawSection) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }
}

fn error(line: usize, reason: impl Into<String>) -> ParseError {
    ParseError {
        line,
        reason: reason.into(),
    }
}
