//! Destination templates.
//!
//! A template such as
//! `sub-{subject}/{session}/func/sub-{subject}_{session}_task-rest_dir-PA_run-{item}_bold`
//! renders to a BIDS-relative path without extension. Templates are validated
//! once when parsed, so every later rendering yields a well-formed name.

use std::fmt;
use std::str::FromStr;

use bids_model::{Direction, SessionLabel, SubjectLabel};

use crate::error::TemplateError;

/// Directories a destination may place files in.
pub const MODALITY_DIRS: [&str; 6] = ["anat", "func", "dwi", "fmap", "perf", "beh"];

const ITEM_PLACEHOLDER: &str = "{item}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Subject,
    Session,
    Item,
    Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl DestinationTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let template = Self {
            source: source.to_string(),
            segments: tokenize(source)?,
        };
        template.validate()?;
        Ok(template)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn uses_direction(&self) -> bool {
        self.segments.contains(&Segment::Direction)
    }

    pub fn uses_item(&self) -> bool {
        self.segments.contains(&Segment::Item)
    }

    /// Renders everything except the run position, which stays `{item}`.
    pub fn destination(
        &self,
        subject: &SubjectLabel,
        session: Option<&SessionLabel>,
        direction: Option<Direction>,
    ) -> Result<String, TemplateError> {
        self.render_parts(
            subject.as_str(),
            session.map(SessionLabel::as_str),
            direction,
            None,
        )
    }

    pub fn render(
        &self,
        subject: &SubjectLabel,
        session: Option<&SessionLabel>,
        direction: Option<Direction>,
        item: u32,
    ) -> Result<String, TemplateError> {
        self.render_parts(
            subject.as_str(),
            session.map(SessionLabel::as_str),
            direction,
            Some(item),
        )
    }

    fn render_parts(
        &self,
        subject: &str,
        session: Option<&str>,
        direction: Option<Direction>,
        item: Option<u32>,
    ) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut skip_separator = false;
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    let text = if skip_separator {
                        text.strip_prefix(['/', '_']).unwrap_or(text)
                    } else {
                        text.as_str()
                    };
                    out.push_str(text);
                    skip_separator = false;
                }
                Segment::Subject => out.push_str(subject),
                Segment::Session => match session {
                    Some(session) => {
                        out.push_str("ses-");
                        out.push_str(session);
                    }
                    None => {
                        // Collapse one adjacent separator, preferring the preceding one.
                        if out.ends_with(['/', '_']) {
                            out.pop();
                        } else {
                            skip_separator = true;
                        }
                    }
                },
                Segment::Item => match item {
                    Some(item) => out.push_str(&format_item(item)),
                    None => out.push_str(ITEM_PLACEHOLDER),
                },
                Segment::Direction => {
                    let direction = direction.ok_or(TemplateError::MissingDirection)?;
                    out.push_str(direction.as_str());
                }
            }
        }
        Ok(out)
    }

    fn validate(&self) -> Result<(), TemplateError> {
        if !self.source.starts_with("sub-{subject}/") {
            return Err(naming("must begin with sub-{subject}/"));
        }
        let filename = self
            .source
            .rsplit_once('/')
            .map_or(self.source.as_str(), |(_, name)| name);
        if !filename.starts_with("sub-{subject}") {
            return Err(naming("filename must begin with sub-{subject}"));
        }
        for (index, segment) in self.segments.iter().enumerate() {
            if *segment != Segment::Item {
                continue;
            }
            let before_ok = matches!(
                index.checked_sub(1).and_then(|i| self.segments.get(i)),
                Some(Segment::Literal(text)) if text.ends_with("_run-")
            );
            let after_ok = matches!(
                self.segments.get(index + 1),
                Some(Segment::Literal(text)) if text.starts_with('_')
            );
            if !before_ok || !after_ok {
                return Err(naming("{item} may only appear as the value of a run-{item} entity"));
            }
        }
        for session in [Some("SES"), None] {
            let rendered = self.render_parts("SUBJ", session, Some(Direction::Ap), Some(1))?;
            validate_rendered(&rendered)?;
        }
        Ok(())
    }
}

impl FromStr for DestinationTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DestinationTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Zero-padded run index (`1` -> `01`).
pub fn format_item(item: u32) -> String {
    format!("{item:02}")
}

/// Replaces the `{item}` placeholder of a rendered destination.
pub fn fill_item(destination: &str, item: u32) -> String {
    destination.replace(ITEM_PLACEHOLDER, &format_item(item))
}

fn naming(message: &str) -> TemplateError {
    TemplateError::Naming(message.to_string())
}

fn tokenize(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.char_indices();
    while let Some((offset, ch)) = chars.next() {
        match ch {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(TemplateError::UnbalancedBraces(offset)),
                        other => name.push(other),
                    }
                }
                if !closed {
                    return Err(TemplateError::UnbalancedBraces(offset));
                }
                let placeholder = match name.as_str() {
                    "subject" => Segment::Subject,
                    "session" => Segment::Session,
                    "item" => Segment::Item,
                    "direction" => Segment::Direction,
                    _ => return Err(TemplateError::UnknownPlaceholder(name)),
                };
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(placeholder);
            }
            '}' => return Err(TemplateError::UnbalancedBraces(offset)),
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn is_label(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric())
}

fn validate_rendered(path: &str) -> Result<(), TemplateError> {
    let components: Vec<&str> = path.split('/').collect();
    let rest = match components.as_slice() {
        [_, session, rest @ ..] if session.starts_with("ses-") => rest,
        [_, rest @ ..] => rest,
        [] => return Err(naming("empty path")),
    };
    let [modality, filename] = rest else {
        return Err(naming(
            "path must be sub-<id>[/ses-<id>]/<modality>/<filename>",
        ));
    };
    if !MODALITY_DIRS.contains(modality) {
        return Err(TemplateError::Naming(format!(
            "modality directory {modality} is not one of {}",
            MODALITY_DIRS.join(", ")
        )));
    }
    let mut entities: Vec<&str> = filename.split('_').collect();
    let suffix = entities.pop().unwrap_or_default();
    if entities.is_empty() || !is_label(suffix) {
        return Err(TemplateError::Naming(format!(
            "filename {filename} must end in an alphanumeric suffix"
        )));
    }
    for entity in entities {
        let valid = entity
            .split_once('-')
            .is_some_and(|(key, value)| is_label(key) && is_label(value));
        if !valid {
            return Err(TemplateError::Naming(format!(
                "entity {entity} is not key-value with an alphanumeric value"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_rejects_stray_braces() {
        assert_eq!(
            tokenize("sub-{subject").unwrap_err(),
            TemplateError::UnbalancedBraces(4)
        );
        assert_eq!(
            tokenize("sub-}").unwrap_err(),
            TemplateError::UnbalancedBraces(4)
        );
        assert_eq!(
            tokenize("{acq}").unwrap_err(),
            TemplateError::UnknownPlaceholder("acq".to_string())
        );
    }

    #[test]
    fn item_is_zero_padded() {
        assert_eq!(format_item(3), "03");
        assert_eq!(format_item(12), "12");
        assert_eq!(
            fill_item("sub-01/anat/sub-01_run-{item}_T1w", 1),
            "sub-01/anat/sub-01_run-01_T1w"
        );
    }
}
