use std::sync::atomic::{AtomicU64, Ordering};

/// Global unique id generator for GPU allocations.
static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);
/// Native allocations destroyed so far, process-wide.
static RELEASED: AtomicU64 = AtomicU64::new(0);

/// Records one destroyed native allocation.
pub(crate) fn record_release() {
    RELEASED.fetch_add(1, Ordering::Relaxed);
}

/// Number of native allocations destroyed since process start.
///
/// Monotonic; other threads may advance it concurrently.
#[must_use]
pub fn released_count() -> u64 {
    RELEASED.load(Ordering::Relaxed)
}

/// Identity of one native GPU allocation.
///
/// Every allocation (texture storage, renderbuffer storage) receives a fresh
/// id, so two wrappers reporting the same id share the same native handle and
/// a re-allocation is observable as an id change. `ResourceId::NONE` marks an
/// empty wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Id of a wrapper that owns nothing.
    pub const NONE: Self = Self(0);

    /// Allocates a new id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_non_zero() {
        let a = ResourceId::next();
        let b = ResourceId::next();
        assert_ne!(a, b);
        assert!(!a.is_none());
        assert!(ResourceId::NONE.is_none());
        assert_eq!(ResourceId::default(), ResourceId::NONE);
    }

    #[test]
    fn release_count_only_grows() {
        let before = released_count();
        record_release();
        assert!(released_count() > before);
    }
}
