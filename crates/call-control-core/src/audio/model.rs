//! The audio route transition core
//!
//! [`RouteModel`] holds the state machine's state and applies one
//! [`RouteEvent`] at a time, returning the hardware commands to issue and
//! whether listeners must be told. It performs no I/O and is driven by the
//! event loop in [`crate::audio::state_machine`].
//!
//! # Transition rules
//!
//! | Event | Availability | Route |
//! |-------|--------------|-------|
//! | `CONNECT_*` | device added | switch to the device; a speaker route is remembered |
//! | `DISCONNECT_*` | device removed | if it was active: remembered speaker, else wired headset, else earpiece, else speaker |
//! | `SWITCH_*` | unchanged | requested route if reachable, and it becomes the remembered route |
//! | `SWITCH_FOCUS` | unchanged | unchanged; gaining focus reconciles hardware |
//!
//! Bluetooth is never picked by fallback. Hardware commands are only
//! produced while focus is held; they are the difference between what the
//! hardware was last told and what the current route needs.

use tracing::debug;

use crate::audio::hardware::{BluetoothRouteManager, WiredHeadsetManager};
use crate::audio::route::{AudioRoute, CallAudioState, Focus, HardwareCommand, RouteEvent, RouteMask};

/// What the audio hardware has last been told
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareState {
    pub speakerphone_on: bool,
    pub bluetooth_audio_on: bool,
}

impl HardwareState {
    fn target_for(route: AudioRoute) -> Self {
        Self {
            speakerphone_on: route == AudioRoute::Speaker,
            bluetooth_audio_on: route == AudioRoute::Bluetooth,
        }
    }
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub old_state: CallAudioState,
    pub new_state: CallAudioState,
    /// Commands to issue, in order
    pub commands: Vec<HardwareCommand>,
}

impl Transition {
    /// Whether listeners must be notified
    pub fn is_state_change(&self) -> bool {
        self.old_state.route_differs(&self.new_state)
    }
}

/// State of the audio route state machine
#[derive(Debug, Clone)]
pub struct RouteModel {
    route: AudioRoute,
    available: RouteMask,
    has_focus: bool,
    remembered_route: AudioRoute,
    is_muted: bool,
    has_earpiece: bool,
    hardware: HardwareState,
}

impl RouteModel {
    /// Start from an explicit route and mask.
    ///
    /// An earpiece bit is dropped on devices without one, and a route the
    /// mask cannot reach is replaced by the baseline route.
    pub fn new(initial: CallAudioState, has_earpiece: bool) -> Self {
        let mut available = initial.supported_routes;
        if !has_earpiece {
            available.remove(RouteMask::EARPIECE);
        }

        let mut model = Self {
            route: initial.route,
            available,
            has_focus: false,
            remembered_route: AudioRoute::Earpiece,
            is_muted: initial.is_muted,
            has_earpiece,
            hardware: HardwareState::default(),
        };

        if !model.available.allows(model.route) {
            debug!(
                "Initial route {} is not in {:?}, using baseline",
                model.route, model.available
            );
            model.route = model.baseline_route();
        }
        model.remembered_route = match model.route {
            AudioRoute::Speaker => AudioRoute::Speaker,
            _ if has_earpiece => AudioRoute::Earpiece,
            _ => AudioRoute::Speaker,
        };
        model
    }

    /// Start from whatever the device managers report right now
    pub fn from_hardware(
        wired: &dyn WiredHeadsetManager,
        bluetooth: &dyn BluetoothRouteManager,
        has_earpiece: bool,
    ) -> Self {
        let mut available = RouteMask::empty();
        if has_earpiece {
            available |= RouteMask::EARPIECE;
        }
        if wired.is_plugged_in() {
            available |= RouteMask::WIRED_HEADSET;
        }
        let bluetooth_audio_on = bluetooth.is_bluetooth_audio_connected();
        if bluetooth.is_bluetooth_available() || bluetooth_audio_on {
            available |= RouteMask::BLUETOOTH;
        }

        let route = if bluetooth_audio_on {
            AudioRoute::Bluetooth
        } else if available.contains(RouteMask::WIRED_HEADSET) {
            AudioRoute::WiredHeadset
        } else if available.contains(RouteMask::EARPIECE) {
            AudioRoute::Earpiece
        } else {
            AudioRoute::Speaker
        };

        let mut model = Self::new(CallAudioState::new(route, available), has_earpiece);
        model.hardware.bluetooth_audio_on = bluetooth_audio_on;
        model
    }

    /// The externally visible state
    pub fn audio_state(&self) -> CallAudioState {
        CallAudioState {
            route: self.route,
            supported_routes: self.available,
            is_muted: self.is_muted,
        }
    }

    pub fn route(&self) -> AudioRoute {
        self.route
    }

    pub fn available_routes(&self) -> RouteMask {
        self.available
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn remembered_route(&self) -> AudioRoute {
        self.remembered_route
    }

    pub fn hardware_state(&self) -> HardwareState {
        self.hardware
    }

    /// Apply one event
    pub fn process(&mut self, event: RouteEvent) -> Transition {
        let old_state = self.audio_state();

        match event {
            RouteEvent::ConnectWiredHeadset => self.on_connected(AudioRoute::WiredHeadset),
            RouteEvent::DisconnectWiredHeadset => self.on_disconnected(AudioRoute::WiredHeadset),
            RouteEvent::ConnectBluetooth => self.on_connected(AudioRoute::Bluetooth),
            RouteEvent::DisconnectBluetooth => {
                // The audio link goes away with the device.
                self.hardware.bluetooth_audio_on = false;
                self.on_disconnected(AudioRoute::Bluetooth);
            }
            RouteEvent::SwitchEarpiece => self.switch_to(AudioRoute::Earpiece),
            RouteEvent::SwitchSpeaker => self.switch_to(AudioRoute::Speaker),
            RouteEvent::SwitchBluetooth => self.switch_to(AudioRoute::Bluetooth),
            RouteEvent::SwitchWiredHeadset => self.switch_to(AudioRoute::WiredHeadset),
            RouteEvent::SwitchBaselineRoute => self.switch_to(self.baseline_route()),
            RouteEvent::SwitchFocus(focus) => self.has_focus = focus == Focus::HasFocus,
        }

        let commands = if self.has_focus {
            self.reconcile_hardware()
        } else {
            Vec::new()
        };

        Transition {
            old_state,
            new_state: self.audio_state(),
            commands,
        }
    }

    fn on_connected(&mut self, route: AudioRoute) {
        let bit = route.mask();
        if self.available.contains(bit) {
            debug!("{} already connected", route);
            return;
        }
        self.available.insert(bit);

        if self.route == AudioRoute::Speaker {
            self.remembered_route = AudioRoute::Speaker;
        }
        self.route = route;
    }

    fn on_disconnected(&mut self, route: AudioRoute) {
        let bit = route.mask();
        if !self.available.contains(bit) {
            debug!("{} was not connected", route);
            return;
        }
        self.available.remove(bit);

        if self.route == route {
            self.route = self.fallback_route();
        }
    }

    fn switch_to(&mut self, target: AudioRoute) {
        if !self.available.allows(target) {
            debug!("Ignoring switch to unavailable route {}", target);
            return;
        }
        self.route = target;
        self.remembered_route = target;
    }

    /// Route chosen when the active device disappears
    fn fallback_route(&self) -> AudioRoute {
        if self.remembered_route == AudioRoute::Speaker {
            AudioRoute::Speaker
        } else {
            self.baseline_route()
        }
    }

    fn baseline_route(&self) -> AudioRoute {
        if self.available.contains(RouteMask::WIRED_HEADSET) {
            AudioRoute::WiredHeadset
        } else if self.has_earpiece && self.available.contains(RouteMask::EARPIECE) {
            AudioRoute::Earpiece
        } else {
            AudioRoute::Speaker
        }
    }

    /// Commands that bring the hardware in line with the current route.
    /// Audio is taken off a path before it is put on another.
    fn reconcile_hardware(&mut self) -> Vec<HardwareCommand> {
        let target = HardwareState::target_for(self.route);
        let mut commands = Vec::new();

        if self.hardware.bluetooth_audio_on && !target.bluetooth_audio_on {
            commands.push(HardwareCommand::DisconnectBluetoothAudio);
        }
        if self.hardware.speakerphone_on && !target.speakerphone_on {
            commands.push(HardwareCommand::DisableSpeakerphone);
        }
        if !self.hardware.bluetooth_audio_on && target.bluetooth_audio_on {
            commands.push(HardwareCommand::ConnectBluetoothAudio);
        }
        if !self.hardware.speakerphone_on && target.speakerphone_on {
            commands.push(HardwareCommand::EnableSpeakerphone);
        }

        self.hardware = target;
        commands
    }
}
