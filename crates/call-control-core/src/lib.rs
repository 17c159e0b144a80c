//! # Call control core
//!
//! Two pieces of the call-control layer of a VoIP endpoint:
//!
//! - [`filter`]: the **incoming call filter pipeline**. A ringing call is run
//!   through a set of independent filters in parallel; their verdicts are
//!   merged into one admission decision, delivered exactly once, with a
//!   fail-open fallback when the filters do not answer in time.
//! - [`audio`]: the **audio route state machine**. It picks the active
//!   audio route as headsets come and go, remembers an explicit speaker
//!   choice across transient devices, and drives speakerphone and
//!   Bluetooth audio only while the call holds audio focus.
//!
//! Ambient pieces live alongside them:
//!
//! - [`config`]: YAML and environment configuration
//! - [`logging`]: `tracing` subscriber setup
//! - [`error`]: the crate error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rvoip_call_control_core::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example(provider: Arc<dyn BlockedNumberProvider>) -> CallControlResult<()> {
//! let config = CallControlConfig::new().apply_env_overrides()?;
//!
//! let filters: Vec<Arc<dyn CallFilter>> = vec![Arc::new(BlockCheckFilter::new(provider))];
//! let pipeline = IncomingCallFilter::new(
//!     IncomingCall::new("+15551230000"),
//!     filters,
//!     Arc::new(|call: &IncomingCall, result: CallFilteringResult| {
//!         println!("{}: {}", call.id, result);
//!     }),
//!     &config,
//! );
//! pipeline.perform_filtering();
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod call;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;

pub use error::{CallControlError, CallControlResult};

/// Common imports for call control applications
pub mod prelude {
    pub use crate::audio::{
        AudioHardware, AudioRoute, AudioRouteStateMachine, BluetoothRouteManager, CallAudioState,
        CallAudioStateListener, Focus, RouteEvent, RouteMask, WiredHeadsetManager,
    };
    pub use crate::call::{CallId, IncomingCall};
    pub use crate::config::{
        AudioRouteConfig, CallControlConfig, FilterConfig, FilterTimeoutSetting, FilterTimeoutSource,
    };
    pub use crate::error::{CallControlError, CallControlResult};
    pub use crate::filter::{
        BlockCheckFilter, BlockedNumberProvider, CallFilter, CallFilterResultCallback, CallFilteringResult,
        CallerInfoLookup, DirectToVoicemailFilter, IncomingCallFilter,
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
