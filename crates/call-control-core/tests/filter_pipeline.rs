//! End-to-end tests for the incoming call filter pipeline

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rvoip_call_control_core::prelude::*;
use tracing_test::traced_test;

/// Returns a fixed verdict after a delay
struct DelayedFilter {
    name: &'static str,
    delay: Duration,
    result: CallFilteringResult,
}

impl DelayedFilter {
    fn new(name: &'static str, delay_ms: u64, result: CallFilteringResult) -> Arc<dyn CallFilter> {
        Arc::new(Self {
            name,
            delay: Duration::from_millis(delay_ms),
            result,
        })
    }
}

#[async_trait]
impl CallFilter for DelayedFilter {
    fn name(&self) -> &str {
        self.name
    }

    async fn lookup(&self, _call: Arc<IncomingCall>) -> CallFilteringResult {
        tokio::time::sleep(self.delay).await;
        self.result
    }
}

struct PanickingFilter;

#[async_trait]
impl CallFilter for PanickingFilter {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn lookup(&self, _call: Arc<IncomingCall>) -> CallFilteringResult {
        panic!("contact database corrupted");
    }
}

struct BlockList(Vec<&'static str>);

#[async_trait]
impl BlockedNumberProvider for BlockList {
    async fn is_blocked(&self, number: &str) -> anyhow::Result<bool> {
        Ok(self.0.contains(&number))
    }
}

struct SendToVoicemail(Vec<&'static str>);

#[async_trait]
impl CallerInfoLookup for SendToVoicemail {
    async fn should_send_to_voicemail(&self, number: &str) -> anyhow::Result<bool> {
        Ok(self.0.contains(&number))
    }
}

#[derive(Default)]
struct ResultCollector {
    deliveries: AtomicUsize,
    results: Mutex<Vec<CallFilteringResult>>,
}

impl ResultCollector {
    fn count(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }

    fn last(&self) -> Option<CallFilteringResult> {
        self.results.lock().last().copied()
    }
}

impl CallFilterResultCallback for ResultCollector {
    fn on_call_filtering_complete(&self, _call: &IncomingCall, result: CallFilteringResult) {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        self.results.lock().push(result);
    }
}

#[tokio::test(start_paused = true)]
async fn test_verdicts_are_merged() {
    let collector = Arc::new(ResultCollector::default());
    let filters = vec![
        DelayedFilter::new("a", 10, CallFilteringResult::new(true, false, true, true)),
        DelayedFilter::new("b", 20, CallFilteringResult::new(false, true, false, false)),
        DelayedFilter::new("c", 30, CallFilteringResult::new(true, false, true, false)),
    ];
    let pipeline = IncomingCallFilter::new(
        IncomingCall::new("+15550001111"),
        filters,
        collector.clone(),
        &Duration::from_secs(5),
    );

    pipeline.perform_filtering();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(collector.count(), 1);
    assert_eq!(collector.last(), Some(CallFilteringResult::new(false, true, false, false)));
    assert!(pipeline.is_complete());

    // The deadline was cancelled; nothing more arrives.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(collector.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_builtin_filters_together() {
    let collector = Arc::new(ResultCollector::default());
    let filters: Vec<Arc<dyn CallFilter>> = vec![
        Arc::new(BlockCheckFilter::new(Arc::new(BlockList(vec!["+15550002222"])))),
        Arc::new(DirectToVoicemailFilter::new(Arc::new(SendToVoicemail(vec!["+15550003333"])))),
    ];

    let pipeline = IncomingCallFilter::new(
        IncomingCall::new("+15550002222"),
        filters.clone(),
        collector.clone(),
        &Duration::from_secs(5),
    );
    pipeline.perform_filtering();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(collector.last(), Some(BlockCheckFilter::BLOCKED));

    let pipeline = IncomingCallFilter::new(
        IncomingCall::new("+15550003333"),
        filters.clone(),
        collector.clone(),
        &Duration::from_secs(5),
    );
    pipeline.perform_filtering();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(collector.last(), Some(DirectToVoicemailFilter::SEND_TO_VOICEMAIL));

    let pipeline = IncomingCallFilter::new(
        IncomingCall::new("+15550004444"),
        filters,
        collector.clone(),
        &Duration::from_secs(5),
    );
    pipeline.perform_filtering();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(collector.last(), Some(CallFilteringResult::pass_through()));
    assert_eq!(collector.count(), 3);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn test_deadline_delivers_fail_open() {
    let collector = Arc::new(ResultCollector::default());
    let filters = vec![
        DelayedFilter::new("fast-reject", 10, CallFilteringResult::new(false, true, false, false)),
        DelayedFilter::new("hung", 60_000, CallFilteringResult::pass_through()),
    ];
    let pipeline = IncomingCallFilter::new(
        IncomingCall::new("+15550005555"),
        filters,
        collector.clone(),
        &Duration::from_millis(500),
    );

    pipeline.perform_filtering();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(collector.count(), 0);
    assert!(!pipeline.is_complete());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(collector.count(), 1);
    assert_eq!(collector.last(), Some(CallFilteringResult::fail_open()));
    assert!(logs_contain("Call filtering timed out"));

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(collector.count(), 1);
    assert!(logs_contain("Ignoring late filter report"));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_filter_is_covered_by_deadline() {
    let collector = Arc::new(ResultCollector::default());
    let filters: Vec<Arc<dyn CallFilter>> = vec![
        DelayedFilter::new("healthy", 5, CallFilteringResult::new(false, true, false, false)),
        Arc::new(PanickingFilter),
    ];
    let pipeline = IncomingCallFilter::new(
        IncomingCall::new("+15550006666"),
        filters,
        collector.clone(),
        &Duration::from_millis(250),
    );

    pipeline.perform_filtering();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(collector.count(), 1);
    assert_eq!(collector.last(), Some(CallFilteringResult::fail_open()));
}

#[tokio::test(start_paused = true)]
async fn test_many_pipelines_each_deliver_once() {
    let quiet = CallFilteringResult::new(true, false, false, true);
    let collector = Arc::new(ResultCollector::default());
    let mut pipelines = Vec::new();

    for i in 0..20u64 {
        let filters = vec![
            DelayedFilter::new("stepped", i * 10, quiet),
            DelayedFilter::new("quick", 5, CallFilteringResult::pass_through()),
        ];
        let pipeline = IncomingCallFilter::new(
            IncomingCall::new(format!("+1555000{:04}", i)),
            filters,
            collector.clone(),
            &Duration::from_millis(95),
        );
        pipeline.perform_filtering();
        pipelines.push(pipeline);
    }

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(collector.count(), 20);
    assert!(pipelines.iter().all(|p| p.is_complete()));
    let results = collector.results.lock().clone();
    let merged = results.iter().filter(|r| **r == quiet).count();
    let fail_open = results.iter().filter(|r| **r == CallFilteringResult::fail_open()).count();
    // Pipelines whose stepped filter needs 100ms or more time out.
    assert_eq!(merged, 10);
    assert_eq!(fail_open, 10);
}

#[test]
fn test_timeout_setting_is_read_at_construction() {
    let setting = FilterTimeoutSetting::new(Duration::from_millis(100));
    let callback = Arc::new(ResultCollector::default());

    let first = IncomingCallFilter::new(IncomingCall::anonymous(), Vec::new(), callback.clone(), &setting);
    setting.set(Duration::from_secs(2));
    let second = IncomingCallFilter::new(IncomingCall::anonymous(), Vec::new(), callback, &setting);

    assert_eq!(first.timeout(), Duration::from_millis(100));
    assert_eq!(second.timeout(), Duration::from_secs(2));
}

#[test]
fn test_no_runtime_fails_open() {
    let collector = Arc::new(ResultCollector::default());
    let pipeline = IncomingCallFilter::new(
        IncomingCall::new("+15550007777"),
        vec![DelayedFilter::new("never-run", 0, CallFilteringResult::new(false, true, false, false))],
        collector.clone(),
        &Duration::from_secs(1),
    );

    pipeline.perform_filtering();

    assert_eq!(collector.count(), 1);
    assert_eq!(collector.last(), Some(CallFilteringResult::fail_open()));
}
