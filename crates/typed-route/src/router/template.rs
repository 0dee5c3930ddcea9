//! Route template reconstruction.
//!
//! Host routers keep mounted paths as compiled regular expressions, e.g.
//! `/users/:id` becomes `/^\/users\/(?:([^\/]+?))\/?(?=\/|$)/i`. To document
//! a route the resolver needs the template back, so this module reads the
//! pattern source and rebuilds `/users/:id/` from it, taking parameter names
//! by position from the host's key list.
//!
//! Only the constructs such routers generate are understood. Anything else is
//! an error rather than a guess.

use crate::error::RouteResolutionError;

/// End-of-path lookaheads emitted for non-terminal (mount) patterns.
const END_LOOKAHEADS: [&str; 3] = [r"(?=\/|$)", "(?=/|$)", "(?=$)"];

/// Rebuild the path template of a compiled route pattern.
///
/// Capture groups (plain, constrained, or wildcard, each optionally followed
/// by `?`) become `:name`, escaped slashes become `/` and other escaped
/// characters are unescaped.
///
/// # Errors
///
/// Returns [`RouteResolutionError`] for unbalanced groups, more capture groups
/// than parameter names, or leftover regex syntax.
///
/// # Example
///
/// ```rust,ignore
/// let template = reconstruct_template(
///     r"/^\/users\/(?:([^\/]+?))\/posts\/?(?=\/|$)/i",
///     &["id".to_string()],
/// )?;
/// assert_eq!(template, "/users/:id/posts/");
/// ```
pub fn reconstruct_template(
    source: &str,
    params: &[String],
) -> Result<String, RouteResolutionError> {
    let body = strip_delimiters(source);
    let body = body.strip_prefix('^').unwrap_or(body);
    let mut body = body.to_string();
    for lookahead in END_LOOKAHEADS {
        body = body.replace(lookahead, "");
    }
    if body.ends_with('$') && !body.ends_with(r"\$") {
        body.pop();
    }

    let mut parser = Parser {
        source,
        chars: body.chars().collect(),
        pos: 0,
        params,
        next_param: 0,
    };
    let mut template = String::new();
    parser.sequence(&mut template, false)?;

    if !template.starts_with('/') {
        template.insert(0, '/');
    }
    Ok(template)
}

/// Strip the `/.../flags` delimiters of a regex literal, if present.
fn strip_delimiters(source: &str) -> &str {
    if let Some(rest) = source.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let flags = &rest[end + 1..];
            if flags.chars().all(|c| c.is_ascii_alphabetic()) {
                return &rest[..end];
            }
        }
    }
    source
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    params: &'a [String],
    next_param: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> RouteResolutionError {
        RouteResolutionError::new(self.source, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Parse until the end of input, or until the `)` closing the current
    /// group when `in_group` is set.
    fn sequence(&mut self, out: &mut String, in_group: bool) -> Result<(), RouteResolutionError> {
        loop {
            let Some(c) = self.bump() else {
                if in_group {
                    return Err(self.error("unbalanced group: missing `)`"));
                }
                return Ok(());
            };
            match c {
                '\\' => match self.bump() {
                    Some('/') => {
                        out.push('/');
                        self.eat('?');
                    }
                    Some(escaped) if escaped.is_ascii_alphanumeric() => {
                        let reason = format!("unsupported character class `\\{}`", escaped);
                        return Err(self.error(reason));
                    }
                    Some(escaped) => out.push(escaped),
                    None => return Err(self.error("dangling escape at end of pattern")),
                },
                '(' => self.group(out)?,
                ')' => {
                    if in_group {
                        return Ok(());
                    }
                    return Err(self.error("unbalanced group: unexpected `)`"));
                }
                '?' | '*' | '+' | '.' | '[' | ']' | '{' | '}' | '|' | '^' | '$' => {
                    return Err(self.error(format!("unsupported regex syntax `{}`", c)));
                }
                literal => out.push(literal),
            }
        }
    }

    /// Parse a group whose `(` was just consumed.
    fn group(&mut self, out: &mut String) -> Result<(), RouteResolutionError> {
        if self.eat('?') {
            if !self.eat(':') {
                return Err(self.error("unsupported group: only `(?:...)` is understood"));
            }
            self.sequence(out, true)?;
        } else {
            self.skip_capture()?;
            let name = self.params.get(self.next_param).ok_or_else(|| {
                self.error(format!(
                    "more capture groups than parameter names ({} given)",
                    self.params.len()
                ))
            })?;
            out.push(':');
            out.push_str(name);
            self.next_param += 1;
        }
        self.eat('?');
        Ok(())
    }

    /// Skip the body of a capture group up to its closing `)`.
    fn skip_capture(&mut self) -> Result<(), RouteResolutionError> {
        let mut depth = 1usize;
        let mut in_class = false;
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '(' if !in_class => depth += 1,
                ')' if !in_class => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced group: missing `)`"))
    }
}
