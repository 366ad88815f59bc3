//! Safe SQL identifier handling.
//!
//! [`Ident`] is a validated SQL identifier (schema/table/column/sequence).
//! Postgres cannot parameterize identifiers, so anywhere an identifier is
//! inlined into SQL text it goes through this type first.
//!
//! Dotted paths (`public.users`) and quoted segments (`"CamelCase"."User"`,
//! with `""` escaping a quote) are supported. Unquoted segments must match
//! `[A-Za-z_][A-Za-z0-9_$]*`.

use crate::error::{MetaError, MetaResult};

/// A validated SQL identifier, stored in its rendered form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    rendered: String,
}

impl Ident {
    /// Parse an identifier, supporting dotted and quoted forms.
    pub fn parse(input: &str) -> MetaResult<Self> {
        if input.is_empty() {
            return Err(MetaError::invalid_usage("Identifier cannot be empty"));
        }
        if input.contains('\0') {
            return Err(MetaError::invalid_usage(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut rendered = String::with_capacity(input.len());
        let mut rest = input;
        loop {
            rest = consume_segment(rest, &mut rendered)?;
            match rest.strip_prefix('.') {
                Some("") => {
                    return Err(MetaError::invalid_usage("Trailing '.' in identifier"));
                }
                Some(tail) => {
                    rendered.push('.');
                    rest = tail;
                }
                None if rest.is_empty() => break,
                None => {
                    return Err(MetaError::invalid_usage(format!(
                        "Unexpected character in identifier: '{}'",
                        rest.chars().next().unwrap_or_default()
                    )));
                }
            }
        }

        Ok(Self { rendered })
    }

    /// Wrap an arbitrary name as a single quoted identifier.
    pub fn quoted(name: &str) -> MetaResult<Self> {
        if name.is_empty() {
            return Err(MetaError::invalid_usage("Empty quoted identifier"));
        }
        if name.contains('\0') {
            return Err(MetaError::invalid_usage(
                "Identifier cannot contain NUL character",
            ));
        }
        let mut rendered = String::with_capacity(name.len() + 2);
        rendered.push('"');
        for c in name.chars() {
            if c == '"' {
                rendered.push_str("\"\"");
            } else {
                rendered.push(c);
            }
        }
        rendered.push('"');
        Ok(Self { rendered })
    }

    /// The identifier as SQL text.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Render the identifier as owned SQL text.
    pub fn to_sql(&self) -> String {
        self.rendered.clone()
    }
}

/// Consume one segment (quoted or unquoted) from the front of `input`,
/// appending its rendered form to `out`. Returns the unconsumed tail.
fn consume_segment<'a>(input: &'a str, out: &mut String) -> MetaResult<&'a str> {
    if let Some(body) = input.strip_prefix('"') {
        return consume_quoted(body, out);
    }

    let end = input
        .find(|c: char| !(c == '_' || c == '$' || c.is_ascii_alphanumeric()))
        .unwrap_or(input.len());
    let segment = &input[..end];
    match segment.chars().next() {
        None => Err(MetaError::invalid_usage(format!(
            "Empty identifier segment in '{input}'"
        ))),
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            out.push_str(segment);
            Ok(&input[end..])
        }
        Some(first) => Err(MetaError::invalid_usage(format!(
            "Invalid identifier start character: '{first}'"
        ))),
    }
}

/// Consume the body of a quoted segment (opening quote already stripped).
fn consume_quoted<'a>(body: &'a str, out: &mut String) -> MetaResult<&'a str> {
    out.push('"');
    let mut content = 0usize;
    let mut iter = body.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if c != '"' {
            out.push(c);
            content += 1;
            continue;
        }
        // A doubled quote is an escaped quote inside the segment.
        if matches!(iter.peek(), Some((_, '"'))) {
            iter.next();
            out.push_str("\"\"");
            content += 1;
            continue;
        }
        if content == 0 {
            return Err(MetaError::invalid_usage("Empty quoted identifier"));
        }
        out.push('"');
        return Ok(&body[i + 1..]);
    }
    Err(MetaError::invalid_usage("Unclosed quoted identifier"))
}

/// Convert an input into an [`Ident`].
pub trait IntoIdent {
    fn into_ident(self) -> MetaResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> MetaResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &Ident {
    fn into_ident(self) -> MetaResult<Ident> {
        Ok(self.clone())
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> MetaResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> MetaResult<Ident> {
        Ident::parse(&self)
    }
}
