//! core::template
//!
//! `%`-delimited string templates.
//!
//! Used for host clone-URL templates (`%rs`, `%username`) and for the
//! dependency listing format (`%rs`, `%RS`, `%p`, `%h`, `%H`). A
//! placeholder is `%name` (the longest run of ASCII letters and `_`) or
//! `%{name}`; `%%` is a literal percent sign.
//!
//! # Example
//!
//! ```
//! use got::core::template::Template;
//!
//! let t = Template::parse("ssh://git@scm/%rs.git").unwrap();
//! assert_eq!(t.render(&[("rs", "proj/repo")]).unwrap(), "ssh://git@scm/proj/repo.git");
//! assert_eq!(
//!     t.capture("ssh://git@scm/proj/repo.git", &[], "rs").as_deref(),
//!     Some("proj/repo")
//! );
//! ```

use thiserror::Error;

/// Placeholder for the repository name in clone-URL templates.
pub const NAME_PLACEHOLDER: &str = "rs";

/// Placeholder for the host username in clone-URL templates.
pub const USERNAME_PLACEHOLDER: &str = "username";

/// Errors from template parsing and rendering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `%` is not followed by a placeholder, `{name}`, or `%`.
    #[error("invalid format string specifier at position {position} in '{template}'")]
    InvalidSpecifier { template: String, position: usize },

    /// A placeholder has no value.
    #[error("invalid format string specifier '%{name}' in '{template}'")]
    UnknownPlaceholder { template: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidSpecifier`] for a dangling `%`, an
    /// unterminated `%{`, or a `%` followed by something other than a
    /// letter, `_`, `{` or `%`.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            let invalid = || TemplateError::InvalidSpecifier {
                template: source.to_string(),
                position: pos,
            };

            let name = match chars.peek().copied() {
                Some((_, '%')) => {
                    chars.next();
                    literal.push('%');
                    continue;
                }
                Some((_, '{')) => {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, ch)) => name.push(ch),
                            None => return Err(invalid()),
                        }
                    }
                    if name.is_empty() {
                        return Err(invalid());
                    }
                    name
                }
                Some((_, ch)) if ch.is_ascii_alphabetic() || ch == '_' => {
                    let mut name = String::new();
                    while let Some((_, ch)) = chars.peek().copied() {
                        if ch.is_ascii_alphabetic() || ch == '_' {
                            name.push(ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    name
                }
                _ => return Err(invalid()),
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(name));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The original template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of all placeholders, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Check that every placeholder is in `allowed`.
    pub fn check_placeholders(&self, allowed: &[&str]) -> Result<(), TemplateError> {
        match self.placeholders().find(|name| !allowed.contains(name)) {
            Some(name) => Err(self.unknown(name)),
            None => Ok(()),
        }
    }

    /// Substitute every placeholder from `vars`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnknownPlaceholder`] if a placeholder has no
    /// entry in `vars`.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
        self.render_with(|name| lookup(vars, name).map(str::to_string))
    }

    /// Substitute placeholders using a lookup function.
    pub fn render_with<F>(&self, mut value: F) -> Result<String, TemplateError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let v = value(name).ok_or_else(|| self.unknown(name))?;
                    out.push_str(&v);
                }
            }
        }
        Ok(out)
    }

    /// Reverse the template: extract the value of `capture` from `text`.
    ///
    /// All other placeholders are rendered from `vars`. Returns `None` if
    /// `capture` does not appear exactly once, another placeholder is
    /// missing from `vars`, or `text` does not match.
    pub fn capture(&self, text: &str, vars: &[(&str, &str)], capture: &str) -> Option<String> {
        let index = {
            let mut hits = self.segments.iter().enumerate().filter(
                |(_, s)| matches!(s, Segment::Placeholder(name) if name == capture),
            );
            let (index, _) = hits.next()?;
            if hits.next().is_some() {
                return None;
            }
            index
        };

        let render_part = |segments: &[Segment]| -> Option<String> {
            let mut out = String::new();
            for segment in segments {
                match segment {
                    Segment::Literal(t) => out.push_str(t),
                    Segment::Placeholder(name) => out.push_str(lookup(vars, name)?),
                }
            }
            Some(out)
        };

        let prefix = render_part(&self.segments[..index])?;
        let suffix = render_part(&self.segments[index + 1..])?;
        if text.len() <= prefix.len() + suffix.len() {
            return None;
        }
        let middle = text.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
        Some(middle.to_string())
    }

    fn unknown(&self, name: &str) -> TemplateError {
        TemplateError::UnknownPlaceholder {
            template: self.source.clone(),
            name: name.to_string(),
        }
    }
}

fn lookup<'a>(vars: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
    vars.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}
