//! Event kind filter
//!
//! Only records whose kind is in the set become access log lines.

use accesslog_format::{EventRecord, RESPONSE_KIND};

/// Set of event kinds that produce a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindFilter {
    kinds: Vec<String>,
}

impl KindFilter {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut kinds: Vec<String> = kinds.into_iter().map(Into::into).collect();
        kinds.sort_unstable();
        kinds.dedup();
        Self { kinds }
    }

    /// Filter that accepts only response events
    pub fn responses() -> Self {
        Self::new([RESPONSE_KIND])
    }

    /// Check if a record should be logged
    #[inline]
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.kinds.iter().any(|kind| *kind == record.kind)
    }

    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }
}

impl Default for KindFilter {
    fn default() -> Self {
        Self::responses()
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
