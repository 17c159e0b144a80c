//! Audio Route State Machine
//!
//! Decides which physical path carries call audio (earpiece, wired
//! headset, Bluetooth headset or speaker) as devices come and go, as the
//! user switches routes, and as the orchestrator grants or withdraws audio
//! focus.
//!
//! # Architecture
//!
//! ```text
//!  device managers ──┐
//!  user requests ────┼─▶ send_message(RouteEvent) ─▶ ┌──────────────────────┐
//!  orchestrator ─────┘        (any thread)           │ event loop (1 task)  │
//!                                                    │   RouteModel         │
//!                                                    └──┬─────────┬─────────┘
//!                                 HardwareCommand (focus)│         │ state change
//!                                                       ▼         ▼
//!                                              AudioHardware   orchestrator,
//!                                                              call listener
//! ```
//!
//! Events are processed strictly one at a time in the order they were
//! queued. [`model::RouteModel`] holds the transition rules and is usable
//! on its own; [`AudioRouteStateMachine`] wraps it in an event loop.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rvoip_call_control_core::audio::{
//!     AudioHardware, AudioRouteStateMachine, CallAudioState, CallAudioStateListener,
//!     Focus, RouteEvent,
//! };
//! use std::sync::Arc;
//!
//! struct Speakerphone;
//!
//! impl AudioHardware for Speakerphone {
//!     fn set_speakerphone_on(&self, on: bool) {
//!         println!("speakerphone {}", on);
//!     }
//!     fn connect_bluetooth_audio(&self) {}
//!     fn disconnect_bluetooth_audio(&self) {}
//! }
//!
//! struct Orchestrator;
//!
//! impl CallAudioStateListener for Orchestrator {
//!     fn on_call_audio_state_changed(&self, old: &CallAudioState, new: &CallAudioState) {
//!         println!("{} -> {}", old, new);
//!     }
//! }
//!
//! # async fn example() -> rvoip_call_control_core::CallControlResult<()> {
//! let machine = AudioRouteStateMachine::builder(Arc::new(Speakerphone), Arc::new(Orchestrator))
//!     .name("call-audio")
//!     .spawn()?;
//!
//! machine.send_message(RouteEvent::SwitchFocus(Focus::HasFocus))?;
//! machine.send_message(RouteEvent::SwitchSpeaker)?;
//! machine.flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod hardware;
pub mod model;
pub mod route;
pub mod state_machine;

pub use hardware::{AudioHardware, BluetoothRouteManager, CallAudioStateListener, WiredHeadsetManager};
pub use model::{HardwareState, RouteModel, Transition};
pub use route::{AudioRoute, CallAudioState, Focus, HardwareCommand, RouteEvent, RouteMask};
pub use state_machine::{AudioRouteStateMachine, AudioRouteStateMachineBuilder, RouteSnapshot};
