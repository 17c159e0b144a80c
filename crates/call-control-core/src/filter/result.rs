//! Filtering verdicts and how they combine

use serde::{Deserialize, Serialize};

/// The verdict of one filter, or the merged verdict of a pipeline
///
/// The four flags are independent. Merging is commutative and associative
/// and [`CallFilteringResult::pass_through`] is its identity, so any
/// arrival order of filter reports produces the same merged result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallFilteringResult {
    /// The call may ring
    pub should_allow_call: bool,
    /// The call should be rejected
    pub should_reject: bool,
    /// The call should be written to the call log
    pub should_add_to_call_log: bool,
    /// The user should be notified about the call
    pub should_show_notification: bool,
}

impl CallFilteringResult {
    pub const fn new(
        should_allow_call: bool,
        should_reject: bool,
        should_add_to_call_log: bool,
        should_show_notification: bool,
    ) -> Self {
        Self {
            should_allow_call,
            should_reject,
            should_add_to_call_log,
            should_show_notification,
        }
    }

    /// Let the call through, log it and notify
    pub const fn pass_through() -> Self {
        Self::new(true, false, true, true)
    }

    /// Delivered when filtering does not finish before the deadline
    pub const fn fail_open() -> Self {
        Self::pass_through()
    }

    /// Merge two verdicts.
    ///
    /// Allowing, logging and notifying need every filter's consent; a single
    /// filter asking for rejection is enough to reject.
    pub const fn combine(self, other: Self) -> Self {
        Self {
            should_allow_call: self.should_allow_call && other.should_allow_call,
            should_reject: self.should_reject || other.should_reject,
            should_add_to_call_log: self.should_add_to_call_log && other.should_add_to_call_log,
            should_show_notification: self.should_show_notification && other.should_show_notification,
        }
    }

    /// Merge any number of verdicts; an empty set yields the pass-through verdict
    pub fn merge_all<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        results.into_iter().fold(Self::pass_through(), Self::combine)
    }
}

impl Default for CallFilteringResult {
    fn default() -> Self {
        Self::pass_through()
    }
}

impl std::fmt::Display for CallFilteringResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "allow={} reject={} log={} notify={}",
            self.should_allow_call, self.should_reject, self.should_add_to_call_log, self.should_show_notification
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_result() -> impl Strategy<Value = CallFilteringResult> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(a, r, l, n)| CallFilteringResult::new(a, r, l, n))
    }

    #[test]
    fn test_three_filter_example() {
        let merged = CallFilteringResult::merge_all([
            CallFilteringResult::new(true, false, true, true),
            CallFilteringResult::new(false, true, false, true),
            CallFilteringResult::new(false, true, true, false),
        ]);
        assert_eq!(merged, CallFilteringResult::new(false, true, false, false));
    }

    #[test]
    fn test_empty_merge_is_pass_through() {
        assert_eq!(CallFilteringResult::merge_all(std::iter::empty()), CallFilteringResult::pass_through());
        assert_eq!(CallFilteringResult::fail_open(), CallFilteringResult::new(true, false, true, true));
    }

    proptest! {
        #[test]
        fn merge_is_and_or_and_and(results in proptest::collection::vec(any_result(), 0..12)) {
            let merged = CallFilteringResult::merge_all(results.iter().copied());
            prop_assert_eq!(merged.should_allow_call, results.iter().all(|r| r.should_allow_call));
            prop_assert_eq!(merged.should_reject, results.iter().any(|r| r.should_reject));
            prop_assert_eq!(merged.should_add_to_call_log, results.iter().all(|r| r.should_add_to_call_log));
            prop_assert_eq!(merged.should_show_notification, results.iter().all(|r| r.should_show_notification));
        }

        #[test]
        fn merge_ignores_order(mut results in proptest::collection::vec(any_result(), 1..8)) {
            let forward = CallFilteringResult::merge_all(results.iter().copied());
            results.reverse();
            prop_assert_eq!(forward, CallFilteringResult::merge_all(results));
        }
    }
}
