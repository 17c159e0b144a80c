//! Blocked-number filter

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::call::IncomingCall;
use crate::filter::{CallFilter, CallFilteringResult};

/// Backing store of blocked numbers
#[async_trait]
pub trait BlockedNumberProvider: Send + Sync {
    /// Whether calls from `number` are blocked
    async fn is_blocked(&self, number: &str) -> anyhow::Result<bool>;
}

/// Rejects calls from blocked numbers without logging or notifying
pub struct BlockCheckFilter {
    provider: Arc<dyn BlockedNumberProvider>,
}

impl BlockCheckFilter {
    pub fn new(provider: Arc<dyn BlockedNumberProvider>) -> Self {
        Self { provider }
    }

    /// Verdict for a blocked caller
    pub const BLOCKED: CallFilteringResult = CallFilteringResult::new(false, true, false, false);
}

#[async_trait]
impl CallFilter for BlockCheckFilter {
    fn name(&self) -> &str {
        "block-check"
    }

    async fn lookup(&self, call: Arc<IncomingCall>) -> CallFilteringResult {
        let number = match call.caller_number.as_deref() {
            Some(number) if !number.is_empty() => number,
            _ => return CallFilteringResult::pass_through(),
        };

        match self.provider.is_blocked(number).await {
            Ok(true) => {
                debug!("{} is from a blocked number", call.id);
                Self::BLOCKED
            }
            Ok(false) => CallFilteringResult::pass_through(),
            Err(e) => {
                warn!("Blocked number lookup failed for {}: {}", call.id, e);
                CallFilteringResult::pass_through()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct StaticBlockList(HashSet<String>);

    #[async_trait]
    impl BlockedNumberProvider for StaticBlockList {
        async fn is_blocked(&self, number: &str) -> anyhow::Result<bool> {
            Ok(self.0.contains(number))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl BlockedNumberProvider for BrokenStore {
        async fn is_blocked(&self, _number: &str) -> anyhow::Result<bool> {
            anyhow::bail!("store unavailable")
        }
    }

    fn filter_blocking(numbers: &[&str]) -> BlockCheckFilter {
        let list = numbers.iter().map(|n| n.to_string()).collect();
        BlockCheckFilter::new(Arc::new(StaticBlockList(list)))
    }

    #[tokio::test]
    async fn test_blocked_caller_is_rejected_silently() {
        let filter = filter_blocking(&["+15550001111"]);
        let result = filter.lookup(Arc::new(IncomingCall::new("+15550001111"))).await;
        assert_eq!(result, CallFilteringResult::new(false, true, false, false));
    }

    #[tokio::test]
    async fn test_other_callers_pass() {
        let filter = filter_blocking(&["+15550001111"]);
        let result = filter.lookup(Arc::new(IncomingCall::new("+15550002222"))).await;
        assert_eq!(result, CallFilteringResult::pass_through());

        let result = filter.lookup(Arc::new(IncomingCall::anonymous())).await;
        assert_eq!(result, CallFilteringResult::pass_through());
    }

    #[tokio::test]
    async fn test_store_failure_passes() {
        let filter = BlockCheckFilter::new(Arc::new(BrokenStore));
        let result = filter.lookup(Arc::new(IncomingCall::new("+15550001111"))).await;
        assert_eq!(result, CallFilteringResult::pass_through());
    }
}
