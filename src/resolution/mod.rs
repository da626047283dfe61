/// Reference resolution module.
///
/// Walks the `uses:` references of a document, fetching each distinct
/// reference once and recording the result in the artifact store.
mod resolver;
mod visited;

pub use resolver::Resolver;
pub use visited::{TraversalContext, VisitedSet};
