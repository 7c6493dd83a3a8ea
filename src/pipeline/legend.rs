//! Legend text for each series.
//!
//! User-supplied legends are small templates over the series' labels, e.g.
//! `{{.instance}} ({{ .job }})`. Only field references are understood.
//! A template that does not parse is logged and shown verbatim, so a bad
//! legend never costs the caller their chart.

use thiserror::Error;
use tracing::warn;

use crate::models::{LabelSet, Series};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed action starting at byte {0}")]
    Unclosed(usize),
    #[error("empty action at byte {0}")]
    EmptyAction(usize),
    #[error("unsupported action {0:?}, expected a field such as {{{{.job}}}}")]
    NotAField(String),
    #[error("invalid label name {0:?}")]
    InvalidIdentifier(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

/// A parsed legend template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendTemplate {
    segments: Vec<Segment>,
}

impl LegendTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut trim_next = false;

        while let Some(open) = rest.find("{{") {
            let offset = source.len() - rest.len() + open;
            let mut text = &rest[..open];
            if trim_next {
                text = text.trim_start();
            }

            let mut after = &rest[open + 2..];
            // Trim markers only count when followed or preceded by whitespace.
            if let Some(stripped) = after
                .strip_prefix('-')
                .filter(|r| r.starts_with(char::is_whitespace))
            {
                text = text.trim_end();
                after = stripped;
            }
            push_text(&mut segments, text);

            let close = after.find("}}").ok_or(TemplateError::Unclosed(offset))?;
            let mut action = &after[..close];
            trim_next = false;
            if let Some(stripped) = action
                .strip_suffix('-')
                .filter(|a| a.ends_with(char::is_whitespace))
            {
                action = stripped;
                trim_next = true;
            }

            segments.push(Segment::Field(parse_field(action.trim(), offset)?));
            rest = &after[close + 2..];
        }

        let tail = if trim_next { rest.trim_start() } else { rest };
        push_text(&mut segments, tail);
        Ok(Self { segments })
    }

    /// Missing labels render as empty text.
    pub fn render(&self, labels: &LabelSet) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(name) => out.push_str(labels.get(name).unwrap_or("")),
            }
        }
        out
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn parse_field(action: &str, offset: usize) -> Result<String, TemplateError> {
    if action.is_empty() {
        return Err(TemplateError::EmptyAction(offset));
    }
    let name = action
        .strip_prefix('.')
        .ok_or_else(|| TemplateError::NotAField(action.to_string()))?;

    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(TemplateError::InvalidIdentifier(name.to_string()));
    }
    Ok(name.to_string())
}

/// Legend text for one series: the canonical name when no template is given,
/// otherwise the rendered template.
pub fn resolve_legend(series: &Series, template: Option<&str>) -> String {
    match template {
        None => series.display_name(),
        Some(source) => match LegendTemplate::parse(source) {
            Ok(parsed) => parsed.render(&series.labels),
            Err(e) => {
                warn!(template = source, error = %e, "Failed to parse legend template");
                source.to_string()
            }
        },
    }
}

/// Legend text for every series, parsing the template once.
pub fn resolve_legends(series: &[Series], template: Option<&str>) -> Vec<String> {
    let parsed = match template {
        None => return series.iter().map(Series::display_name).collect(),
        Some(source) => LegendTemplate::parse(source).map_err(|e| {
            warn!(template = source, error = %e, "Failed to parse legend template");
            source
        }),
    };

    series
        .iter()
        .map(|s| match &parsed {
            Ok(template) => template.render(&s.labels),
            Err(raw) => raw.to_string(),
        })
        .collect()
}
