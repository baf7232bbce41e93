//! Observable state of one reconciled view.

/// Where a view is in the cache-then-refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing attempted yet.
    #[default]
    Empty,
    /// Reading the local snapshot.
    CacheLoading,
    /// A snapshot was found and is visible.
    CacheHit,
    /// No usable snapshot.
    CacheMiss,
    /// Remote fetch in flight.
    RemoteLoading,
    /// Showing the result of the latest remote fetch.
    Fresh,
    /// Latest remote fetch failed; the previous items are still shown.
    RefreshFailed,
}

/// What a view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState<T> {
    /// Visible collection, in gateway order.
    pub items: Vec<T>,
    /// Current phase.
    pub phase: Phase,
    /// Error banner text.
    pub error: Option<String>,
    /// Initial load in progress.
    pub loading: bool,
    /// Pull-to-refresh in progress.
    pub refreshing: bool,
    /// Items came from a snapshot or a successful fetch at least once.
    pub has_data: bool,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            phase: Phase::Empty,
            error: None,
            loading: false,
            refreshing: false,
            has_data: false,
        }
    }
}

impl<T> ViewState<T> {
    /// Whether the full-screen loading indicator replaces the list.
    ///
    /// Suppressed as soon as anything (cached or fresh) is visible.
    #[must_use]
    pub const fn shows_loading_indicator(&self) -> bool {
        self.loading && !self.has_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let state = ViewState::<u32>::default();
        assert_eq!(state.phase, Phase::Empty);
        assert!(state.items.is_empty());
        assert!(!state.shows_loading_indicator());
    }

    #[test]
    fn test_indicator_hidden_once_data_visible() {
        let mut state = ViewState::<u32> {
            loading: true,
            ..ViewState::default()
        };
        assert!(state.shows_loading_indicator());

        state.has_data = true;
        assert!(!state.shows_loading_indicator());
    }
}
