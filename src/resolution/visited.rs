use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// References already claimed during a traversal.
///
/// `claim` is an atomic check-and-mark: when several threads race on the
/// same reference exactly one of them wins.
#[derive(Debug, Default)]
pub struct VisitedSet {
    claimed: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `reference` visited. Returns `false` if it already was.
    pub fn claim(&self, reference: &str) -> bool {
        match self.claimed.lock() {
            Ok(mut claimed) => claimed.insert(reference.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(reference.to_string()),
        }
    }

    pub fn contains(&self, reference: &str) -> bool {
        match self.claimed.lock() {
            Ok(claimed) => claimed.contains(reference),
            Err(poisoned) => poisoned.into_inner().contains(reference),
        }
    }

    pub fn len(&self) -> usize {
        match self.claimed.lock() {
            Ok(claimed) => claimed.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State for one traversal, threaded explicitly through every resolution call.
///
/// Independent traversals use independent contexts. A context may be shared
/// by several threads resolving documents of the same run.
#[derive(Debug, Default)]
pub struct TraversalContext {
    visited: VisitedSet,
    cancelled: AtomicBool,
}

impl TraversalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Requests cooperative cancellation. In-flight fetches finish; no new
    /// reference is started afterwards.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_first_come() {
        let visited = VisitedSet::new();
        assert!(visited.claim("org/act@v1"));
        assert!(!visited.claim("org/act@v1"));
        assert!(visited.claim("org/act@v2"));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        let visited = VisitedSet::new();
        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| visited.claim("org/act@v1") as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(winners, 1);
    }
}
