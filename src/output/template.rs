// src/output/template.rs

//! Output templates.
//!
//! A template is compiled once per task instance. `{{ field }}` actions are
//! expanded against the task's own fields at compile time, leaving a literal
//! format with a single kind of placeholder for the emitted text:
//!
//! ```text
//! "[{{ .Name }}] %s{{ endl }}"   --compile-->   "[web] " + TEXT + "\n"
//! ```
//!
//! Supported actions (case-insensitive, optional leading `.`): `name`,
//! `desc`, `dir`, `cmd`, `args`, `env`, `delay`, `interval`, and the `endl`
//! helper. In literal text `%s` / `%v` mark the placeholder and `%%` is a
//! literal percent sign.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::task::Task;

static ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("action regex is valid"));

#[cfg(windows)]
const LINE_END: &str = "\r\n";
#[cfg(not(windows))]
const LINE_END: &str = "\n";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed action starting at byte {offset}")]
    Unclosed { offset: usize },

    #[error("unknown field '{name}' in action")]
    UnknownField { name: String },

    #[error("empty action at byte {offset}")]
    EmptyAction { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Text,
}

/// A compiled template: literal pieces around text placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    segments: Vec<Segment>,
}

impl LineFormat {
    /// Compile `template` against `task`'s fields.
    pub fn compile(template: &str, task: &Task) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for caps in ACTION.captures_iter(template) {
            let whole = caps.get(0).expect("group 0 always matches");
            push_literal_text(&mut segments, &template[cursor..whole.start()]);

            let action = caps[1].trim();
            let field = action.strip_prefix('.').unwrap_or(action).trim();
            if field.is_empty() {
                return Err(TemplateError::EmptyAction {
                    offset: whole.start(),
                });
            }
            push_literal(&mut segments, expand_field(field, task)?);
            cursor = whole.end();
        }

        let rest = &template[cursor..];
        if let Some(offset) = rest.find("{{") {
            return Err(TemplateError::Unclosed {
                offset: cursor + offset,
            });
        }
        push_literal_text(&mut segments, rest);

        Ok(Self { segments })
    }

    /// Substitute `text` into every placeholder.
    pub fn render(&self, text: &str) -> String {
        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => rendered.push_str(literal),
                Segment::Text => rendered.push_str(text),
            }
        }
        rendered
    }

    pub fn has_placeholder(&self) -> bool {
        self.segments.contains(&Segment::Text)
    }
}

fn expand_field(field: &str, task: &Task) -> Result<String, TemplateError> {
    let value = match field.to_ascii_lowercase().as_str() {
        "name" => task.name.clone(),
        "desc" => task.desc.clone(),
        "dir" => task.dir.display().to_string(),
        "cmd" => task.cmd.clone(),
        "args" => task.args.join(" "),
        "env" => task.env.join(" "),
        "delay" => task.delay.to_string(),
        "interval" => task.interval.to_string(),
        "endl" => LINE_END.to_string(),
        _ => {
            return Err(TemplateError::UnknownField {
                name: field.to_string(),
            });
        }
    };
    Ok(value)
}

/// Split template text on `%` verbs.
fn push_literal_text(segments: &mut Vec<Segment>, text: &str) {
    let mut literal = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') | Some('v') => {
                chars.next();
                push_literal(segments, std::mem::take(&mut literal));
                segments.push(Segment::Text);
            }
            Some('%') => {
                chars.next();
                literal.push('%');
            }
            _ => literal.push('%'),
        }
    }
    push_literal(segments, literal);
}

fn push_literal(segments: &mut Vec<Segment>, literal: String) {
    if literal.is_empty() {
        return;
    }
    if let Some(Segment::Literal(last)) = segments.last_mut() {
        last.push_str(&literal);
    } else {
        segments.push(Segment::Literal(literal));
    }
}
