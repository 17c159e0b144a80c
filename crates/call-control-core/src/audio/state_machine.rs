//! The audio route state machine event loop

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, info_span, trace, Instrument};

use crate::audio::hardware::{
    AudioHardware, BluetoothRouteManager, CallAudioStateListener, WiredHeadsetManager,
};
use crate::audio::model::RouteModel;
use crate::audio::route::{AudioRoute, CallAudioState, RouteEvent, RouteMask};
use crate::config::AudioRouteConfig;
use crate::error::{CallControlError, CallControlResult};

/// Point-in-time view of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSnapshot {
    pub state: CallAudioState,
    pub has_focus: bool,
    pub remembered_route: AudioRoute,
}

impl RouteSnapshot {
    fn of(model: &RouteModel) -> Self {
        Self {
            state: model.audio_state(),
            has_focus: model.has_focus(),
            remembered_route: model.remembered_route(),
        }
    }
}

enum Message {
    Event(RouteEvent),
    SetCallListener(Option<Arc<dyn CallAudioStateListener>>),
    Flush(oneshot::Sender<()>),
}

/// Handle to a running audio route state machine
///
/// Cloning the handle is cheap; every clone feeds the same event loop.
/// Messages from all producers are processed one at a time in arrival
/// order. The loop stops once every handle has been dropped.
#[derive(Clone)]
pub struct AudioRouteStateMachine {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Message>,
    state_rx: watch::Receiver<RouteSnapshot>,
}

impl AudioRouteStateMachine {
    /// Start building a state machine that drives `hardware` and reports
    /// every change to `orchestrator`
    pub fn builder(
        hardware: Arc<dyn AudioHardware>,
        orchestrator: Arc<dyn CallAudioStateListener>,
    ) -> AudioRouteStateMachineBuilder {
        AudioRouteStateMachineBuilder {
            hardware,
            orchestrator,
            name: "audio-route".to_string(),
            has_earpiece: true,
            initial: InitialState::Default,
            call_listener: None,
        }
    }

    /// Enqueue an event. Returns immediately; the event is processed on the
    /// event loop.
    pub fn send_message(&self, event: RouteEvent) -> CallControlResult<()> {
        trace!("{} queued {}", self.name, event.name());
        self.send(Message::Event(event))
    }

    /// Replace the active call's listener, or clear it with `None`.
    ///
    /// Ordered with events: changes caused by events sent before this call
    /// reach the previous listener.
    pub fn set_active_call_listener(
        &self,
        listener: Option<Arc<dyn CallAudioStateListener>>,
    ) -> CallControlResult<()> {
        self.send(Message::SetCallListener(listener))
    }

    /// Wait until every message sent before this call has been processed
    pub async fn flush(&self) -> CallControlResult<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(Message::Flush(done_tx))?;
        done_rx.await.map_err(|_| CallControlError::stopped(self.name.as_ref()))
    }

    /// The last published audio state
    pub fn current_state(&self) -> CallAudioState {
        self.state_rx.borrow().state
    }

    /// The last published snapshot
    pub fn snapshot(&self) -> RouteSnapshot {
        *self.state_rx.borrow()
    }

    /// Watch snapshots as they are published
    pub fn subscribe(&self) -> watch::Receiver<RouteSnapshot> {
        self.state_rx.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the event loop is still accepting messages
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, message: Message) -> CallControlResult<()> {
        self.tx
            .send(message)
            .map_err(|_| CallControlError::stopped(self.name.as_ref()))
    }
}

impl std::fmt::Debug for AudioRouteStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioRouteStateMachine")
            .field("name", &self.name)
            .field("snapshot", &*self.state_rx.borrow())
            .finish()
    }
}

enum InitialState {
    Default,
    Explicit(CallAudioState),
    Detect {
        wired: Arc<dyn WiredHeadsetManager>,
        bluetooth: Arc<dyn BluetoothRouteManager>,
    },
}

/// Builder for [`AudioRouteStateMachine`]
pub struct AudioRouteStateMachineBuilder {
    hardware: Arc<dyn AudioHardware>,
    orchestrator: Arc<dyn CallAudioStateListener>,
    name: String,
    has_earpiece: bool,
    initial: InitialState,
    call_listener: Option<Arc<dyn CallAudioStateListener>>,
}

impl AudioRouteStateMachineBuilder {
    /// Name used in logs and errors
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(mut self, config: &AudioRouteConfig) -> Self {
        self.has_earpiece = config.has_earpiece;
        self
    }

    pub fn has_earpiece(mut self, has_earpiece: bool) -> Self {
        self.has_earpiece = has_earpiece;
        self
    }

    /// Start from an explicit state
    pub fn initial_state(mut self, state: CallAudioState) -> Self {
        self.initial = InitialState::Explicit(state);
        self
    }

    /// Start from whatever the device managers report when the machine is
    /// spawned
    pub fn detect_from(
        mut self,
        wired: Arc<dyn WiredHeadsetManager>,
        bluetooth: Arc<dyn BluetoothRouteManager>,
    ) -> Self {
        self.initial = InitialState::Detect { wired, bluetooth };
        self
    }

    /// Listener for the call that is active at start-up
    pub fn call_listener(mut self, listener: Arc<dyn CallAudioStateListener>) -> Self {
        self.call_listener = Some(listener);
        self
    }

    /// Spawn the event loop on the current Tokio runtime
    pub fn spawn(self) -> CallControlResult<AudioRouteStateMachine> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| CallControlError::NoRuntime {
            message: format!("cannot start audio route state machine '{}': {}", self.name, e),
        })?;

        let model = match self.initial {
            InitialState::Default => RouteModel::new(
                CallAudioState::new(AudioRoute::Earpiece, RouteMask::EARPIECE),
                self.has_earpiece,
            ),
            InitialState::Explicit(state) => RouteModel::new(state, self.has_earpiece),
            InitialState::Detect { wired, bluetooth } => {
                RouteModel::from_hardware(wired.as_ref(), bluetooth.as_ref(), self.has_earpiece)
            }
        };

        info!(
            "Starting audio route state machine '{}' at {} (earpiece: {})",
            self.name,
            model.audio_state(),
            self.has_earpiece
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(RouteSnapshot::of(&model));
        let name: Arc<str> = Arc::from(self.name);

        let event_loop = EventLoop {
            name: name.clone(),
            model,
            hardware: self.hardware,
            orchestrator: self.orchestrator,
            call_listener: self.call_listener,
            state_tx,
        };
        runtime.spawn(
            event_loop
                .run(rx)
                .instrument(info_span!("audio_route", name = %name)),
        );

        Ok(AudioRouteStateMachine { name, tx, state_rx })
    }
}

struct EventLoop {
    name: Arc<str>,
    model: RouteModel,
    hardware: Arc<dyn AudioHardware>,
    orchestrator: Arc<dyn CallAudioStateListener>,
    call_listener: Option<Arc<dyn CallAudioStateListener>>,
    state_tx: watch::Sender<RouteSnapshot>,
}

impl EventLoop {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = rx.recv().await {
            match message {
                Message::Event(event) => self.handle_event(event),
                Message::SetCallListener(listener) => {
                    debug!(
                        "{} call listener {}",
                        self.name,
                        if listener.is_some() { "replaced" } else { "cleared" }
                    );
                    self.call_listener = listener;
                }
                Message::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        info!("Audio route state machine '{}' stopped", self.name);
    }

    fn handle_event(&mut self, event: RouteEvent) {
        let transition = self.model.process(event);

        for command in &transition.commands {
            debug!("{} issuing {:?}", self.name, command);
            self.hardware.execute(*command);
        }

        if transition.is_state_change() {
            info!(
                "{} {}: {} -> {}",
                self.name,
                event.name(),
                transition.old_state,
                transition.new_state
            );
            self.orchestrator
                .on_call_audio_state_changed(&transition.old_state, &transition.new_state);
            if let Some(listener) = &self.call_listener {
                listener.on_call_audio_state_changed(&transition.old_state, &transition.new_state);
            }
        } else {
            debug!("{} {} left route unchanged", self.name, event.name());
        }

        let snapshot = RouteSnapshot::of(&self.model);
        self.state_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::route::{Focus, HardwareCommand};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        commands: Mutex<Vec<HardwareCommand>>,
        changes: Mutex<Vec<(CallAudioState, CallAudioState)>>,
    }

    impl AudioHardware for Recorder {
        fn set_speakerphone_on(&self, on: bool) {
            self.commands.lock().push(if on {
                HardwareCommand::EnableSpeakerphone
            } else {
                HardwareCommand::DisableSpeakerphone
            });
        }

        fn connect_bluetooth_audio(&self) {
            self.commands.lock().push(HardwareCommand::ConnectBluetoothAudio);
        }

        fn disconnect_bluetooth_audio(&self) {
            self.commands.lock().push(HardwareCommand::DisconnectBluetoothAudio);
        }
    }

    impl CallAudioStateListener for Recorder {
        fn on_call_audio_state_changed(&self, old_state: &CallAudioState, new_state: &CallAudioState) {
            self.changes.lock().push((*old_state, *new_state));
        }
    }

    #[tokio::test]
    async fn test_events_are_applied_in_order() {
        let recorder = Arc::new(Recorder::default());
        let machine = AudioRouteStateMachine::builder(recorder.clone(), recorder.clone())
            .spawn()
            .unwrap();

        machine.send_message(RouteEvent::SwitchFocus(Focus::HasFocus)).unwrap();
        machine.send_message(RouteEvent::SwitchSpeaker).unwrap();
        machine.send_message(RouteEvent::SwitchEarpiece).unwrap();
        machine.flush().await.unwrap();

        assert_eq!(
            *recorder.commands.lock(),
            vec![HardwareCommand::EnableSpeakerphone, HardwareCommand::DisableSpeakerphone]
        );
        assert_eq!(recorder.changes.lock().len(), 2);
        assert_eq!(machine.current_state().route, AudioRoute::Earpiece);
        assert!(machine.snapshot().has_focus);
    }

    #[test]
    fn test_spawn_requires_runtime() {
        let recorder = Arc::new(Recorder::default());
        let result = AudioRouteStateMachine::builder(recorder.clone(), recorder).spawn();
        assert!(matches!(result, Err(CallControlError::NoRuntime { .. })));
    }
}
