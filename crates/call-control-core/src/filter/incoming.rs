//! The filter aggregator: fan-out, merge, deadline

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::call::IncomingCall;
use crate::config::FilterTimeoutSource;
use crate::filter::{CallFilter, CallFilterResultCallback, CallFilteringResult};

/// Runs a fixed set of filters for one call and delivers one verdict
///
/// The filter list and the deadline are fixed at construction. After the
/// verdict has been delivered the pipeline is inert: filters still running
/// may report, and their reports are discarded.
pub struct IncomingCallFilter {
    filters: Vec<Arc<dyn CallFilter>>,
    timeout: Duration,
    shared: Arc<Shared>,
}

/// State reachable from filter tasks and the deadline task
struct Shared {
    call: Arc<IncomingCall>,
    callback: Arc<dyn CallFilterResultCallback>,
    bookkeeping: Mutex<Bookkeeping>,
}

#[derive(Default)]
struct Bookkeeping {
    started: bool,
    /// Filters that have not reported yet
    pending: usize,
    /// Merge of every report received so far
    merged: CallFilteringResult,
    /// Set once the callback has been (or is about to be) invoked
    completed: bool,
    deadline: Option<AbortHandle>,
}

impl IncomingCallFilter {
    /// Create a pipeline for `call`.
    ///
    /// The deadline is read from `timeout_source` here, once; later changes
    /// to the source do not affect this pipeline.
    pub fn new(
        call: IncomingCall,
        filters: Vec<Arc<dyn CallFilter>>,
        callback: Arc<dyn CallFilterResultCallback>,
        timeout_source: &dyn FilterTimeoutSource,
    ) -> Self {
        let timeout = timeout_source.filter_timeout();
        Self {
            filters,
            timeout,
            shared: Arc::new(Shared {
                call: Arc::new(call),
                callback,
                bookkeeping: Mutex::new(Bookkeeping::default()),
            }),
        }
    }

    /// The call being filtered
    pub fn call(&self) -> &IncomingCall {
        &self.shared.call
    }

    /// The deadline armed by [`perform_filtering`](Self::perform_filtering)
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of registered filters
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Whether the verdict has been delivered
    pub fn is_complete(&self) -> bool {
        self.shared.bookkeeping.lock().completed
    }

    /// Start every filter lookup and arm the deadline.
    ///
    /// Must be called from within a Tokio runtime. Only the first call has
    /// any effect.
    pub fn perform_filtering(&self) {
        let call_id = self.shared.call.id;

        {
            let mut state = self.shared.bookkeeping.lock();
            if state.started {
                warn!("perform_filtering called twice for {}, ignoring", call_id);
                return;
            }
            state.started = true;
            state.pending = self.filters.len();
        }

        if self.filters.is_empty() {
            debug!("No filters registered for {}", call_id);
            self.shared.finish_with_merge();
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Cannot run call filters for {} outside a runtime: {}", call_id, e);
                self.shared.on_timeout();
                return;
            }
        };

        debug!(
            "Filtering {} with {} filters, deadline {:?}",
            call_id,
            self.filters.len(),
            self.timeout
        );

        // Arm the deadline before any filter can report so the last report
        // always finds a timer to cancel.
        let shared = self.shared.clone();
        let timeout = self.timeout;
        let deadline = runtime.spawn(
            async move {
                tokio::time::sleep(timeout).await;
                shared.on_timeout();
            }
            .instrument(info_span!("call_filter_deadline", call_id = %call_id)),
        );
        {
            let mut state = self.shared.bookkeeping.lock();
            if state.completed {
                deadline.abort();
            } else {
                state.deadline = Some(deadline.abort_handle());
            }
        }

        for filter in &self.filters {
            let shared = self.shared.clone();
            let filter = filter.clone();
            let call = self.shared.call.clone();
            let span = info_span!("call_filter", call_id = %call_id, filter = filter.name());

            runtime.spawn(
                async move {
                    match AssertUnwindSafe(filter.lookup(call)).catch_unwind().await {
                        Ok(result) => shared.on_filter_complete(filter.name(), result),
                        Err(_) => warn!(
                            "Filter {} panicked during lookup; its verdict will never arrive",
                            filter.name()
                        ),
                    }
                }
                .instrument(span),
            );
        }
    }
}

impl Shared {
    fn on_filter_complete(&self, filter_name: &str, result: CallFilteringResult) {
        let merged = {
            let mut state = self.bookkeeping.lock();
            if state.completed {
                debug!(
                    "Ignoring late filter report from {} for {}: {}",
                    filter_name, self.call.id, result
                );
                return;
            }

            debug!("Filter {} reported for {}: {}", filter_name, self.call.id, result);
            state.merged = state.merged.combine(result);
            state.pending = state.pending.saturating_sub(1);
            if state.pending > 0 {
                return;
            }

            state.completed = true;
            if let Some(deadline) = state.deadline.take() {
                deadline.abort();
            }
            state.merged
        };

        info!("Filtering complete for {}: {}", self.call.id, merged);
        self.callback.on_call_filtering_complete(&self.call, merged);
    }

    fn on_timeout(&self) {
        let pending = {
            let mut state = self.bookkeeping.lock();
            if state.completed {
                return;
            }
            state.completed = true;
            state.deadline = None;
            state.pending
        };

        let result = CallFilteringResult::fail_open();
        warn!(
            "Call filtering timed out for {} with {} filter(s) outstanding, delivering {}",
            self.call.id, pending, result
        );
        self.callback.on_call_filtering_complete(&self.call, result);
    }

    fn finish_with_merge(&self) {
        let merged = {
            let mut state = self.bookkeeping.lock();
            if state.completed {
                return;
            }
            state.completed = true;
            state.merged
        };
        info!("Filtering complete for {}: {}", self.call.id, merged);
        self.callback.on_call_filtering_complete(&self.call, merged);
    }
}
