use crate::request::RESERVED_KEY;
use crate::TrellisError;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Clone, Debug)]
/// The pattern actually used to match against the path.  This contains both
/// the anchored regular expression for the pattern, as well as the names of
/// its named capture groups.
pub(crate) struct Pattern {
    regex: regex::Regex,
    names: Arc<[Arc<str>]>,
}

impl Pattern {
    pub(crate) fn new(source: &str) -> Result<Self, TrellisError> {
        let expanded = expand(source)?;
        let regex = regex::Regex::new(&format!("^(?:{})$", expanded)).map_err(|e| {
            TrellisError::RouterConfiguration(format!("invalid route pattern {:?}: {}", source, e))
        })?;
        let names = regex
            .capture_names()
            .flatten()
            .map(Arc::from)
            .collect::<Arc<[Arc<str>]>>();

        if names.iter().any(|n| &**n == RESERVED_KEY) {
            return Err(TrellisError::RouterConfiguration(format!(
                "route pattern {:?} uses the reserved parameter name {:?}",
                source, RESERVED_KEY
            )));
        }

        Ok(Pattern { regex, names })
    }

    /// Get a reference to the pattern's regex.
    pub(crate) fn regex(&self) -> &regex::Regex {
        &self.regex
    }

    /// Matches the whole path against the pattern, returning the named
    /// groups that took part in the match.
    pub(crate) fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let captures = self.regex.captures(path)?;
        let values = self
            .names
            .iter()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_owned()))
            })
            .collect();
        Some(values)
    }
}

lazy_static::lazy_static! {
    static ref PLACEHOLDER: regex::Regex = regex::Regex::new("\\{(?P<name>[a-zA-Z_][a-zA-Z0-9_]*)?(?::(?P<pattern>[a-zA-Z]+))?\\}").unwrap();
}

// Placeholders are expanded into groups; everything else is left as regex.
fn expand(path: &str) -> Result<String, TrellisError> {
    let mut start = 0;
    let mut buffer = String::with_capacity(path.len() + 2);

    for capture in PLACEHOLDER.captures_iter(path) {
        let whole = capture.get(0).map_or(0..0, |m| m.range());
        if is_literal_brace(&path[..whole.start]) {
            continue;
        }
        buffer.push_str(&path[start..whole.start]);
        start = whole.end;
        let name = capture.name("name").map(|m| m.as_str());
        let pattern = capture.name("pattern").map(|m| m.as_str());
        push_pattern(&mut buffer, name, pattern).map_err(|kind| {
            TrellisError::RouterConfiguration(format!(
                "unknown placeholder type {:?} in route pattern {:?}",
                kind, path
            ))
        })?;
    }

    buffer.push_str(&path[start..]);
    Ok(buffer)
}

// A `{` right after an unescaped `\`, or inside a character class, is
// part of the regex and not a placeholder.
fn is_literal_brace(prefix: &str) -> bool {
    let mut escaped = false;
    let mut class_depth = 0usize;
    for c in prefix.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => class_depth += 1,
            ']' if class_depth > 0 => class_depth -= 1,
            _ => {}
        }
    }
    escaped || class_depth > 0
}

static UUID_PATTERN: &str =
    "[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-4[a-fA-F0-9]{3}-[89aAbB][a-fA-F0-9]{3}-[a-fA-F0-9]{12}";

fn push_pattern<'p>(
    buffer: &mut String,
    name: Option<&str>,
    pattern: Option<&'p str>,
) -> Result<(), &'p str> {
    struct NamePattern<'n>(Option<&'n str>);
    impl std::fmt::Display for NamePattern<'_> {
        fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            if let Some(n) = self.0 {
                write!(fmt, "?P<{}>", n)
            } else {
                Ok(())
            }
        }
    }
    let name = NamePattern(name);
    // Writing into a `String` never fails.
    let _ = match pattern {
        Some("oext") => write!(buffer, "(?:\\.({}[^/]+))?", name),
        Some("int") => write!(buffer, "({}[+-]?\\d+)", name),
        Some("uint") => write!(buffer, "({}\\d+)", name),
        Some("path") => write!(buffer, "({}.+)", name),
        Some("uuid") => write!(buffer, "({}{})", name, UUID_PATTERN),
        Some("str" | "s" | "string") | None => write!(buffer, "({}[^/]+)", name),
        Some(v) => return Err(v),
    };
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn captures(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
        Pattern::new(pattern)
            .unwrap()
            .captures(path)
            .map(|v| v.into_iter().collect())
    }

    #[test]
    fn test_expand() {
        assert_eq!(expand("/users/{id}").unwrap(), "/users/(?P<id>[^/]+)");
        assert_eq!(expand("/users/{id:uint}").unwrap(), "/users/(?P<id>\\d+)");
        assert_eq!(expand("/files/{:path}").unwrap(), "/files/(.+)");
        assert_eq!(expand("/a/[0-9]{2}").unwrap(), "/a/[0-9]{2}");
        assert!(expand("/a/{id:float}").is_err());
    }

    #[test]
    fn test_expand_skips_regex_braces() {
        assert_eq!(expand(r"/a/\{id}").unwrap(), r"/a/\{id}");
        assert_eq!(expand("/b/[{x}]").unwrap(), "/b/[{x}]");
        assert_eq!(expand(r"/c/[\]]{id}").unwrap(), r"/c/[\]](?P<id>[^/]+)");
        assert_eq!(expand(r"/d/\\{id}").unwrap(), r"/d/\\(?P<id>[^/]+)");
    }

    #[test]
    fn test_escaped_brace_is_literal() {
        assert_eq!(captures(r"/a/\{id}", "/a/{id}"), Some(vec![]));
        assert_eq!(captures(r"/a/\{id}", "/a/5"), None);
    }

    #[test]
    fn test_brace_in_class_is_literal() {
        assert_eq!(captures("/b/[{x}]", "/b/x"), Some(vec![]));
        assert_eq!(captures("/b/[{x}]", "/b/{"), Some(vec![]));
        assert_eq!(captures("/b/[{x}]", "/b/y"), None);
    }

    #[test]
    fn test_named_capture() {
        assert_eq!(
            captures("/users/(?<id>[0-9]+)", "/users/42"),
            Some(vec![("id".to_owned(), "42".to_owned())])
        );
    }

    #[test]
    fn test_unnamed_groups_dropped() {
        assert_eq!(
            captures("/(users|people)/(?P<id>\\d+)/([a-z]+)", "/people/3/edit"),
            Some(vec![("id".to_owned(), "3".to_owned())])
        );
    }

    #[test]
    fn test_anchored() {
        assert_eq!(captures("/users", "/users/1"), None);
        assert_eq!(captures("/users", "/api/users"), None);
        assert_eq!(captures("/a|/b", "/b/c"), None);
        assert_eq!(captures("/a|/b", "/b"), Some(vec![]));
    }

    #[test]
    fn test_optional_group_skipped() {
        assert_eq!(
            captures("/users/{id:uint}{ext:oext}", "/users/5"),
            Some(vec![("id".to_owned(), "5".to_owned())])
        );
        assert_eq!(
            captures("/users/{id:uint}{ext:oext}", "/users/5.json"),
            Some(vec![
                ("ext".to_owned(), "json".to_owned()),
                ("id".to_owned(), "5".to_owned())
            ])
        );
    }

    #[test]
    fn test_reserved_name() {
        assert!(matches!(
            Pattern::new("/x/{request}"),
            Err(TrellisError::RouterConfiguration(_))
        ));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            Pattern::new("/x/(unclosed"),
            Err(TrellisError::RouterConfiguration(_))
        ));
    }
}
