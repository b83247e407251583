use serde::Serialize;

pub const DEFAULT_BIN_COUNT: usize = 5;
pub const DEFAULT_TOP_K: usize = 3;

/// How a requested name is resolved against dataset names or chart
/// categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum NameMatch {
    /// Case-insensitive equality only.
    #[default]
    Exact,
    /// Case-insensitive equality, then the first name containing the query.
    ExactOrContains,
}

impl NameMatch {
    pub fn from_partial_flag(partial: bool) -> Self {
        if partial {
            NameMatch::ExactOrContains
        } else {
            NameMatch::Exact
        }
    }

    /// Index of the first matching candidate.
    pub fn resolve<S: AsRef<str>>(&self, candidates: &[S], query: &str) -> Option<usize> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let exact = candidates
            .iter()
            .position(|candidate| candidate.as_ref().to_lowercase() == needle);

        match (exact, self) {
            (Some(index), _) => Some(index),
            (None, NameMatch::Exact) => None,
            (None, NameMatch::ExactOrContains) => candidates
                .iter()
                .position(|candidate| candidate.as_ref().to_lowercase().contains(&needle)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisConfig {
    pub bin_count: usize,
    pub top_k: usize,
    pub name_match: NameMatch,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            top_k: DEFAULT_TOP_K,
            name_match: NameMatch::Exact,
        }
    }
}

impl AnalysisConfig {
    pub fn new(bin_count: usize, top_k: usize, partial_names: bool) -> Self {
        Self {
            bin_count: bin_count.max(1),
            top_k,
            name_match: NameMatch::from_partial_flag(partial_names),
        }
    }
}
