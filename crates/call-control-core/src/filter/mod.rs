//! Incoming Call Filter Pipeline
//!
//! Every ringing call passes through a fixed, ordered set of [`CallFilter`]s
//! before the user sees it. [`IncomingCallFilter`] runs all of them in
//! parallel, merges their verdicts and hands exactly one
//! [`CallFilteringResult`] to the caller-supplied
//! [`CallFilterResultCallback`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐   lookup(call)   ┌──────────────────────┐
//! │ IncomingCallFilter  │─────────────────▶│ BlockCheckFilter     │──┐
//! │                     │─────────────────▶│ DirectToVoicemail    │──┤ one task
//! │  pending / merged   │─────────────────▶│ (custom filters)     │──┤ per filter
//! │  completed flag     │                  └──────────────────────┘  │
//! │  deadline timer  ◀──┼──────────── verdicts ──────────────────────┘
//! └─────────┬───────────┘
//!           │ exactly once: merged verdict, or fail-open on deadline
//!           ▼
//! ┌─────────────────────┐
//! │ result callback     │
//! └─────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rvoip_call_control_core::filter::{
//!     CallFilter, CallFilteringResult, IncomingCallFilter,
//! };
//! use rvoip_call_control_core::call::IncomingCall;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct AllowEverything;
//!
//! #[async_trait]
//! impl CallFilter for AllowEverything {
//!     fn name(&self) -> &str {
//!         "allow-everything"
//!     }
//!
//!     async fn lookup(&self, _call: Arc<IncomingCall>) -> CallFilteringResult {
//!         CallFilteringResult::pass_through()
//!     }
//! }
//!
//! # async fn example() {
//! let filters: Vec<Arc<dyn CallFilter>> = vec![Arc::new(AllowEverything)];
//! let pipeline = IncomingCallFilter::new(
//!     IncomingCall::new("+15551230000"),
//!     filters,
//!     Arc::new(|call: &IncomingCall, result: CallFilteringResult| {
//!         println!("{} filtered: {}", call.id, result);
//!     }),
//!     &Duration::from_secs(5),
//! );
//! pipeline.perform_filtering();
//! # }
//! ```

pub mod block_check;
pub mod incoming;
pub mod result;
pub mod voicemail;

use std::sync::Arc;

use async_trait::async_trait;

use crate::call::IncomingCall;

pub use block_check::{BlockCheckFilter, BlockedNumberProvider};
pub use incoming::IncomingCallFilter;
pub use result::CallFilteringResult;
pub use voicemail::{CallerInfoLookup, DirectToVoicemailFilter};

/// A pluggable admission check
///
/// The pipeline runs each lookup in its own task, so implementations are
/// free to do network or disk I/O. A lookup that never returns, or that
/// panics, simply never reports; the pipeline's deadline covers it.
#[async_trait]
pub trait CallFilter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Produce this filter's verdict for `call`
    async fn lookup(&self, call: Arc<IncomingCall>) -> CallFilteringResult;
}

/// Receives the single verdict of a pipeline
pub trait CallFilterResultCallback: Send + Sync {
    /// Called exactly once per pipeline
    fn on_call_filtering_complete(&self, call: &IncomingCall, result: CallFilteringResult);
}

impl<F> CallFilterResultCallback for F
where
    F: Fn(&IncomingCall, CallFilteringResult) + Send + Sync,
{
    fn on_call_filtering_complete(&self, call: &IncomingCall, result: CallFilteringResult) {
        self(call, result)
    }
}
