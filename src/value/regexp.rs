//! Pattern-matcher values.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::ValueError;

/// Flags in canonical order.
const KNOWN_FLAGS: &str = "gimsuy";

/// A compiled regular expression carrying its source, flags and the mutable
/// match position used by global and sticky matching.
///
/// `last_index` is a byte offset into the searched text.
#[derive(Clone)]
pub struct RegExp {
    source: String,
    flags: String,
    last_index: usize,
    regex: Regex,
}

impl RegExp {
    /// Compiles `source` with the given flag string (any of `gimsuy`, each at
    /// most once).
    pub fn new(source: &str, flags: &str) -> Result<Self, ValueError> {
        let mut seen = String::new();
        for flag in flags.chars() {
            if !KNOWN_FLAGS.contains(flag) || seen.contains(flag) {
                return Err(ValueError::Flags(flags.to_string()));
            }
            seen.push(flag);
        }
        let flags: String = KNOWN_FLAGS.chars().filter(|f| seen.contains(*f)).collect();

        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()?;

        Ok(Self {
            source: source.to_string(),
            flags,
            last_index: 0,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Flags in canonical order.
    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn sticky(&self) -> bool {
        self.flags.contains('y')
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    pub fn set_last_index(&mut self, index: usize) {
        self.last_index = index;
    }

    // == Exec ==
    /// Runs the pattern against `text` and returns the capture groups of the
    /// first match, `None` for unmatched groups.
    ///
    /// Global and sticky patterns start at `last_index` and advance it past
    /// the match, resetting it to zero when nothing matches. Sticky patterns
    /// only match at exactly `last_index`.
    pub fn exec(&mut self, text: &str) -> Option<Vec<Option<String>>> {
        let stateful = self.global() || self.sticky();
        let start = if stateful { self.last_index } else { 0 };

        if start > text.len() || !text.is_char_boundary(start) {
            self.last_index = 0;
            return None;
        }

        let found = self.regex.captures_at(text, start).filter(|caps| {
            !self.sticky() || caps.get(0).map(|m| m.start()) == Some(start)
        });

        match found {
            Some(caps) => {
                if stateful {
                    self.last_index = caps.get(0).map(|m| m.end()).unwrap_or(start);
                }
                Some(
                    caps.iter()
                        .map(|group| group.map(|m| m.as_str().to_string()))
                        .collect(),
                )
            }
            None => {
                if stateful {
                    self.last_index = 0;
                }
                None
            }
        }
    }

    /// Whether the pattern matches, with the same position rules as [`RegExp::exec`].
    pub fn test(&mut self, text: &str) -> bool {
        self.exec(text).is_some()
    }
}

impl fmt::Debug for RegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}
