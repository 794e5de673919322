//! Ordered section/option document.
//!
//! Sections and options are emitted in insertion order. Setting an option that
//! already exists replaces its value without moving it.

use std::fmt;
use std::io::{self, Write};

/// Indentation in front of every option line.
const INDENT: &str = "    ";

/// One named section and its options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    options: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options in emission order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, option: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == option)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, option: &str, value: String) {
        match self.options.iter_mut().find(|(k, _)| k == option) {
            Some((_, existing)) => *existing = value,
            None => self.options.push((option.to_string(), value)),
        }
    }
}

/// Load-balancer configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty section unless one with this name exists.
    pub fn add_section(&mut self, name: &str) -> &mut Self {
        self.section_mut(name);
        self
    }

    /// Set an option, creating the section if needed.
    pub fn set(&mut self, section: &str, option: &str, value: impl Into<String>) -> &mut Self {
        self.section_mut(section).set(option, value.into());
        self
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn section_mut(&mut self, name: &str) -> &mut Section {
        let idx = match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    /// Serialize the document.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "{}", section.name)?;
            for (option, value) in &section.options {
                writeln!(f, "{INDENT}{option} {value}")?;
            }
        }
        Ok(())
    }
}
