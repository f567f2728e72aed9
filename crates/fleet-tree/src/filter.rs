use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{TreeError, TreeResult};

/// Path exclusion rules for an image.
///
/// Patterns are glob expressions over absolute paths. A path is excluded
/// when it or any of its ancestors matches a pattern, so excluding a
/// directory excludes its whole subtree. An empty filter excludes
/// nothing.
#[derive(Clone, Debug)]
pub struct Filter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl Filter {
    /// Compile a filter from glob patterns.
    pub fn new<I, S>(patterns: I) -> TreeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).map_err(|e| TreeError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| TreeError::InvalidPattern {
            pattern: String::new(),
            reason: e.to_string(),
        })?;
        Ok(Self { patterns, set })
    }

    /// A filter that excludes nothing.
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new()).expect("empty filter always compiles")
    }

    /// Returns `true` when `path` is excluded by this filter.
    pub fn matches(&self, path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        if self.set.is_match(path) {
            return true;
        }
        // An excluded directory excludes everything beneath it.
        let mut remaining = path;
        while let Some(idx) = remaining.rfind('/') {
            if idx == 0 {
                break;
            }
            remaining = &remaining[..idx];
            if self.set.is_match(remaining) {
                return true;
            }
        }
        false
    }

    /// The source patterns this filter was compiled from.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::empty()
    }
}
