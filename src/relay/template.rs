//! `{field}` placeholder templates used in provider URLs, query values,
//! and headers.
//!
//! A template is plain text with placeholders such as `{ipv4}` or
//! `{hostname}`. `${VAR}` secret references are kept as text so they can
//! be expanded once at startup; a secret value is never scanned for
//! placeholders afterwards.

use std::collections::BTreeMap;

use crate::config::model::Field;
use crate::config::secrets::Secrets;

/// Values available for one provider call, keyed by field.
pub type FieldValues = BTreeMap<Field, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(String),

    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut rest = template;
        let mut offset = 0;

        while let Some(open) = rest.find('{') {
            let is_secret = rest[..open].ends_with('$');
            let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                if is_secret {
                    break;
                }
                return Err(TemplateError::Unclosed(offset + open));
            };

            if is_secret {
                text.push_str(&rest[..=close]);
            } else {
                text.push_str(&rest[..open]);
                let name = &rest[open + 1..close];
                let field = Field::from_name(name)
                    .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Field(field));
            }

            offset += close + 1;
            rest = &rest[close + 1..];
        }

        text.push_str(rest);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(Self { segments })
    }

    /// Fields referenced by the template, in order of first appearance.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        for segment in &self.segments {
            if let Segment::Field(f) = segment {
                if !fields.contains(f) {
                    fields.push(*f);
                }
            }
        }
        fields
    }

    /// Expand `${VAR}` references in the literal parts.
    #[must_use]
    pub fn with_secrets<F>(self, secrets: &mut Secrets<F>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let segments = self
            .segments
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(t) => Segment::Text(secrets.expand(&t)),
                field => field,
            })
            .collect();
        Self { segments }
    }

    /// Substitute every placeholder. Fails on the first field that has no value.
    pub fn render(&self, values: &FieldValues) -> Result<String, Field> {
        self.render_with(values, str::to_string)
    }

    /// Like [`render`](Self::render), but every substituted value is
    /// percent-encoded so it cannot add path segments, a query or a fragment.
    pub fn render_url(&self, values: &FieldValues) -> Result<String, Field> {
        self.render_with(values, encode_component)
    }

    fn render_with(
        &self,
        values: &FieldValues,
        encode: impl Fn(&str) -> String,
    ) -> Result<String, Field> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Field(f) => {
                    let value = values.get(f).map(String::as_str).ok_or(*f)?;
                    out.push_str(&encode(value));
                }
            }
        }
        Ok(out)
    }

    /// Render with a syntactically valid sample for every field, so a
    /// template URL can be checked before any request arrives.
    #[must_use]
    pub fn render_sample(&self) -> String {
        let samples: FieldValues = Field::ALL
            .into_iter()
            .map(|f| {
                let v = match f {
                    Field::Hostname => "host.example.com",
                    Field::Ipv4 => "192.0.2.1",
                    Field::Ipv6 => "2001:db8::1",
                    Field::Ipv6prefix => "2001:db8::/56",
                    Field::Username => "user",
                    Field::Password => "pass",
                };
                (f, v.to_string())
            })
            .collect();
        // Every field has a sample, so rendering cannot miss one.
        self.render_url(&samples).unwrap_or_default()
    }
}

/// `form_urlencoded` writes spaces as `+`, which means a literal plus in a
/// path; a literal `+` in the input is already `%2B`.
fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
