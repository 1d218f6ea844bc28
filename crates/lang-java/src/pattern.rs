use regex::{Regex, RegexBuilder};

/// A name pattern with `*` (any run) and `?` (any one char) wildcards.
///
/// A pattern containing `.` is qualified and matches against qualified names;
/// otherwise it matches simple names.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
    qualified: bool,
}

impl NamePattern {
    /// `None` for blank patterns or characters that cannot occur in a Java name.
    pub fn parse(pattern: &str, case_sensitive: bool) -> Option<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern.starts_with('.') || pattern.ends_with('.') {
            return None;
        }

        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        for c in pattern.chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                c if c.is_alphanumeric() || c == '_' || c == '$' || c == '.' => {
                    source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                }
                _ => return None,
            }
        }
        source.push('$');

        let regex = RegexBuilder::new(&source)
            .case_insensitive(!case_sensitive)
            .build()
            .ok()?;
        Some(Self {
            regex,
            qualified: pattern.contains('.'),
        })
    }

    pub fn is_qualified(&self) -> bool {
        self.qualified
    }

    pub fn matches(&self, simple: &str, qualified: &str) -> bool {
        if self.qualified {
            self.regex.is_match(qualified)
        } else {
            self.regex.is_match(simple)
        }
    }
}
