//! Send-to-voicemail contact filter

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::call::IncomingCall;
use crate::filter::{CallFilter, CallFilteringResult};

/// Contact lookup used to find callers the user routes straight to voicemail
#[async_trait]
pub trait CallerInfoLookup: Send + Sync {
    /// Whether the contact matching `number` is marked "send to voicemail".
    /// Unknown numbers return `false`.
    async fn should_send_to_voicemail(&self, number: &str) -> anyhow::Result<bool>;
}

/// Rejects calls from contacts marked "send to voicemail"
///
/// Unlike a blocked number, such calls still appear in the call log and in
/// the missed-call notification.
pub struct DirectToVoicemailFilter {
    caller_info: Arc<dyn CallerInfoLookup>,
}

impl DirectToVoicemailFilter {
    pub fn new(caller_info: Arc<dyn CallerInfoLookup>) -> Self {
        Self { caller_info }
    }

    /// Verdict for a caller marked "send to voicemail"
    pub const SEND_TO_VOICEMAIL: CallFilteringResult = CallFilteringResult::new(false, true, true, true);
}

#[async_trait]
impl CallFilter for DirectToVoicemailFilter {
    fn name(&self) -> &str {
        "direct-to-voicemail"
    }

    async fn lookup(&self, call: Arc<IncomingCall>) -> CallFilteringResult {
        if call.is_anonymous() {
            return CallFilteringResult::pass_through();
        }
        let number = call.caller_number.as_deref().unwrap_or_default();

        match self.caller_info.should_send_to_voicemail(number).await {
            Ok(true) => {
                debug!("{} goes straight to voicemail", call.id);
                Self::SEND_TO_VOICEMAIL
            }
            Ok(false) => CallFilteringResult::pass_through(),
            Err(e) => {
                warn!("Caller info lookup failed for {}: {}", call.id, e);
                CallFilteringResult::pass_through()
            }
        }
    }
}
