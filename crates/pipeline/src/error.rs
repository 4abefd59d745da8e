//! Pipeline stage errors.

#[derive(Debug, Clone, PartialEq, serde::Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineError {
    /// The object carries a scrape error or no data at all.
    #[error("Object is not processable: {0}")]
    InvalidObject(String),

    /// A data section has the wrong JSON shape.
    #[error("Section '{section}' must be {expected}")]
    MalformedSection {
        section: &'static str,
        expected: &'static str,
    },
}

impl PipelineError {
    pub fn malformed(section: &'static str, expected: &'static str) -> Self {
        Self::MalformedSection { section, expected }
    }
}
