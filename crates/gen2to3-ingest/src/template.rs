//! Gen2 path templates.
//!
//! A Gen2 template is a root-relative path with Python `%`-style fields:
//! `%(key)s` for strings and `%(key)Nd` for integers zero-padded to width `N`.
//! `%%` is a literal percent sign.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use gen2to3_model::{DataIdValue, DatasetTypeName, LegacyDataId};
use regex::{Captures, Regex};

use crate::error::{Result, WalkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Str,
    /// Integer with an optional minimum digit count.
    Int(Option<usize>),
}

#[derive(Debug, Clone)]
struct Field {
    key: String,
    kind: FieldKind,
    /// Index of the earlier field with the same key, if this one repeats it.
    first: Option<usize>,
}

#[derive(Debug, Clone)]
enum Piece {
    Literal(String),
    Field(usize),
}

/// A compiled Gen2 template for one dataset type.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    dataset_type: DatasetTypeName,
    template: String,
    regex: Regex,
    pieces: Vec<Piece>,
    /// One entry per capture group, in group order.
    fields: Vec<Field>,
}

impl PathTemplate {
    pub fn compile(dataset_type: DatasetTypeName, template: &str) -> Result<Self> {
        let invalid = |message: String| WalkError::Template {
            dataset_type: dataset_type.clone(),
            template: template.to_string(),
            message,
        };
        if template.trim().is_empty() {
            return Err(invalid("empty template".to_string()));
        }

        let mut pieces = Vec::new();
        let mut fields: Vec<Field> = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(pos) = rest.find('%') {
            literal.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];
            if let Some(after) = rest.strip_prefix('%') {
                literal.push('%');
                rest = after;
                continue;
            }
            let Some(after_paren) = rest.strip_prefix('(') else {
                return Err(invalid("'%' must be followed by '(' or '%'".to_string()));
            };
            let Some(close) = after_paren.find(')') else {
                return Err(invalid("unterminated field".to_string()));
            };
            let key = after_paren[..close].trim();
            if key.is_empty() {
                return Err(invalid("empty field name".to_string()));
            }
            rest = &after_paren[close + 1..];

            let width_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            let kind = match rest[width_len..].chars().next() {
                Some('s') => FieldKind::Str,
                Some('d') => FieldKind::Int(rest[..width_len].parse().ok().filter(|w| *w > 0)),
                Some(other) => {
                    return Err(invalid(format!(
                        "unsupported conversion '{other}' for field '{key}'"
                    )));
                }
                None => return Err(invalid(format!("missing conversion for field '{key}'"))),
            };
            rest = &rest[width_len + 1..];

            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            let first = fields.iter().position(|field| field.key == key);
            pieces.push(Piece::Field(fields.len()));
            fields.push(Field {
                key: key.to_string(),
                kind,
                first,
            });
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        let regex = Regex::new(&build_pattern(&pieces, &fields, None))
            .map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            dataset_type,
            template: template.to_string(),
            regex,
            pieces,
            fields,
        })
    }

    pub fn dataset_type(&self) -> &DatasetTypeName {
        &self.dataset_type
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Keys the template extracts, in first-appearance order.
    pub fn keys(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.first.is_none())
            .map(|field| field.key.as_str())
            .collect()
    }

    /// Extract a legacy data ID from a `/`-separated root-relative path.
    ///
    /// `Ok(None)` means the path does not follow this template. A key that
    /// appears more than once must carry the same value each time.
    pub fn parse_path(&self, relative: &str) -> Result<Option<LegacyDataId>> {
        let Some(captures) = self.regex.captures(relative) else {
            return Ok(None);
        };
        let texts = capture_texts(&captures);
        if self.repeats_agree(&texts) {
            return self.data_id(relative, &texts).map(Some);
        }

        // String fields match as little as possible, so a repeated value
        // containing a separator (`2013-11-03` in `FLAT-%(calibDate)s-...`)
        // can be cut short. Pin each repeat to its first capture and retry.
        let pattern = build_pattern(&self.pieces, &self.fields, Some(texts.as_slice()));
        let pinned = Regex::new(&pattern).map_err(|e| WalkError::Template {
            dataset_type: self.dataset_type.clone(),
            template: self.template.clone(),
            message: e.to_string(),
        })?;
        match pinned.captures(relative) {
            Some(captures) => self.data_id(relative, &capture_texts(&captures)).map(Some),
            None => self.data_id(relative, &texts).map(Some),
        }
    }

    fn repeats_agree(&self, texts: &[Option<&str>]) -> bool {
        self.fields
            .iter()
            .zip(texts)
            .all(|(field, text)| field.first.is_none_or(|first| texts[first] == *text))
    }

    fn data_id(&self, relative: &str, texts: &[Option<&str>]) -> Result<LegacyDataId> {
        let mut values = BTreeMap::new();
        for (field, text) in self.fields.iter().zip(texts) {
            let Some(raw) = text else {
                continue;
            };
            let value = match field.kind {
                FieldKind::Str => DataIdValue::Str((*raw).to_string()),
                FieldKind::Int(_) => {
                    let parsed = raw.parse::<i64>().map_err(|_| WalkError::BadInteger {
                        path: relative.to_string(),
                        key: field.key.clone(),
                        value: (*raw).to_string(),
                    })?;
                    DataIdValue::Int(parsed)
                }
            };
            match values.entry(field.key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(slot) if *slot.get() == value => {}
                Entry::Occupied(slot) => {
                    return Err(WalkError::InconsistentKey {
                        path: relative.to_string(),
                        dataset_type: self.dataset_type.clone(),
                        key: field.key.clone(),
                        first: slot.get().clone(),
                        second: value,
                    });
                }
            }
        }
        Ok(values.into_iter().collect())
    }
}

fn capture_texts<'h>(captures: &Captures<'h>) -> Vec<Option<&'h str>> {
    captures
        .iter()
        .skip(1)
        .map(|capture| capture.as_ref().map(regex::Match::as_str))
        .collect()
}

/// Anchored pattern with one capture group per field. With `pinned`, a
/// repeated field must equal the text captured for its first occurrence.
fn build_pattern(pieces: &[Piece], fields: &[Field], pinned: Option<&[Option<&str>]>) -> String {
    let mut pattern = String::from("^");
    for piece in pieces {
        match piece {
            Piece::Literal(text) => pattern.push_str(&regex::escape(text)),
            Piece::Field(index) => {
                let field = &fields[*index];
                let earlier = field
                    .first
                    .zip(pinned)
                    .and_then(|(first, texts)| texts[first]);
                match (earlier, field.kind) {
                    (Some(text), _) => {
                        pattern.push('(');
                        pattern.push_str(&regex::escape(text));
                        pattern.push(')');
                    }
                    (None, FieldKind::Str) => pattern.push_str("([^/]+?)"),
                    (None, FieldKind::Int(Some(width))) => {
                        pattern.push_str(&format!("(-?\\d{{{width},}})"));
                    }
                    (None, FieldKind::Int(None)) => pattern.push_str("(-?\\d+)"),
                }
            }
        }
    }
    pattern.push('$');
    pattern
}

/// Compile the templates of every dataset type that declares one.
pub fn compile_templates<'a, I>(definitions: I) -> Result<Vec<PathTemplate>>
where
    I: IntoIterator<Item = (&'a DatasetTypeName, &'a str)>,
{
    definitions
        .into_iter()
        .map(|(dataset_type, template)| PathTemplate::compile(dataset_type.clone(), template))
        .collect()
}
