//! `{name}` placeholders resolved before driver-level binding.
//!
//! Follows format-string conventions: `{{` and `}}` are literal braces, every other
//! brace pair must enclose a plain identifier.

use crate::error::PersistorError;

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Field(&'a str),
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, PersistorError> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        match bytes[idx] {
            b'{' if bytes.get(idx + 1) == Some(&b'{') => {
                segments.push(Segment::Literal(&template[start..=idx]));
                idx += 2;
                start = idx;
            }
            b'}' if bytes.get(idx + 1) == Some(&b'}') => {
                segments.push(Segment::Literal(&template[start..=idx]));
                idx += 2;
                start = idx;
            }
            b'{' => {
                let close = bytes[idx + 1..]
                    .iter()
                    .position(|b| *b == b'}')
                    .map(|offset| idx + 1 + offset)
                    .ok_or_else(|| {
                        PersistorError::template(format!("unclosed '{{' at offset {idx}"))
                    })?;
                let name = &template[idx + 1..close];
                if !is_identifier(name) {
                    return Err(PersistorError::template(format!(
                        "invalid placeholder {{{name}}} at offset {idx}"
                    )));
                }
                segments.push(Segment::Literal(&template[start..idx]));
                segments.push(Segment::Field(name));
                idx = close + 1;
                start = idx;
            }
            b'}' => {
                return Err(PersistorError::template(format!(
                    "single '}}' encountered at offset {idx}"
                )));
            }
            _ => idx += 1,
        }
    }
    segments.push(Segment::Literal(&template[start..]));
    Ok(segments)
}

/// Replace each `{name}` with `field(name)`.
///
/// # Errors
/// Returns `PersistorError::TemplateError` if the template is malformed or a placeholder
/// has no value.
pub fn format<'v, F>(template: &str, field: F) -> Result<String, PersistorError>
where
    F: Fn(&str) -> Option<&'v str>,
{
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Field(name) => {
                let value = field(name).ok_or_else(|| {
                    PersistorError::template(format!("no value for placeholder {{{name}}}"))
                })?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Drop every `{name}` placeholder, keeping only the literal text.
///
/// # Errors
/// Returns `PersistorError::TemplateError` if the template is malformed.
pub fn strip(template: &str) -> Result<String, PersistorError> {
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        if let Segment::Literal(text) = segment {
            out.push_str(text);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubled_braces_are_literal() {
        let out = format("select '{{\"a\": 1}}' {keys}", |name| {
            (name == "keys").then_some("union all select 1")
        })
        .unwrap();
        assert_eq!(out, "select '{\"a\": 1}' union all select 1");
    }

    #[test]
    fn unresolved_placeholder_fails_loudly() {
        let err = format("select id from {cohort}", |_| None).unwrap_err();
        assert!(err.to_string().contains("{cohort}"));
    }

    #[test]
    fn malformed_templates_are_rejected() {
        for bad in ["select {", "select }", "select {}", "select {a:b}", "select {a.b}"] {
            assert!(strip(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn strip_removes_placeholders() {
        assert_eq!(
            strip("with c as (select 1 as id {cohort}) select {{x}} from c").unwrap(),
            "with c as (select 1 as id ) select {x} from c"
        );
    }
}
