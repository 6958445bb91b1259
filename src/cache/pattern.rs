//! Key Patterns
//!
//! Glob-style key matching shared by all backends: `*` matches any run of
//! characters, `?` exactly one, and the whole key must match. Every other
//! character is literal.

use crate::error::{Error, Result};
use glob::Pattern;

/// A compiled key glob
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    pattern: Pattern,
}

impl KeyPattern {
    /// Compile a key glob
    pub fn new(glob: &str) -> Result<Self> {
        let mut translated = String::with_capacity(glob.len() + 8);
        let mut previous_star = false;

        for c in glob.chars() {
            match c {
                '*' => {
                    // `**` has path semantics in glob; one star already spans everything
                    if !previous_star {
                        translated.push('*');
                    }
                    previous_star = true;
                    continue;
                }
                '?' => translated.push('?'),
                _ => translated.push_str(&Pattern::escape(&c.to_string())),
            }
            previous_star = false;
        }

        let pattern = Pattern::new(&translated).map_err(|e| Error::InvalidPattern {
            pattern: glob.to_string(),
            reason: e.msg.to_string(),
        })?;

        Ok(Self {
            source: glob.to_string(),
            pattern,
        })
    }

    /// Check whether a key matches
    #[inline]
    pub fn matches(&self, key: &str) -> bool {
        self.pattern.matches(key)
    }

    /// The glob this pattern was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
