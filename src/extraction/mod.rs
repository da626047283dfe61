/// Reference extraction module.
///
/// Turns the text of a workflow or action definition into the ordered list of
/// raw `uses:` references it contains.
mod uses_extractor;

pub use uses_extractor::UsesExtractor;

/// Trait for reference extractors.
///
/// Implementations are pure: no I/O, and text without matches yields an empty
/// vector rather than an error.
pub trait ReferenceExtractor: Send + Sync {
    /// Returns every reference in `text`, in document order, duplicates kept.
    fn extract_references(&self, text: &str) -> Vec<String>;
}

/// Extracts references with the default `uses:` extractor.
pub fn extract_references(text: &str) -> Vec<String> {
    UsesExtractor.extract_references(text)
}
