//! Audio route value types, route events and hardware commands

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A physical audio path for a call
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum AudioRoute {
    /// Handset earpiece
    Earpiece,
    /// Wired headset or headphones
    WiredHeadset,
    /// Bluetooth headset
    Bluetooth,
    /// Loudspeaker; always available
    Speaker,
}

impl AudioRoute {
    /// The mask bit for this route. The speaker has none.
    pub fn mask(self) -> RouteMask {
        match self {
            AudioRoute::Earpiece => RouteMask::EARPIECE,
            AudioRoute::WiredHeadset => RouteMask::WIRED_HEADSET,
            AudioRoute::Bluetooth => RouteMask::BLUETOOTH,
            AudioRoute::Speaker => RouteMask::empty(),
        }
    }

    /// Routes that exist only while a device is attached
    pub fn is_transient(self) -> bool {
        matches!(self, AudioRoute::WiredHeadset | AudioRoute::Bluetooth)
    }
}

impl std::fmt::Display for AudioRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AudioRoute::Earpiece => "EARPIECE",
            AudioRoute::WiredHeadset => "WIRED_HEADSET",
            AudioRoute::Bluetooth => "BLUETOOTH",
            AudioRoute::Speaker => "SPEAKER",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Routes currently reachable through attached hardware.
    ///
    /// The speaker is implicitly always reachable and never appears here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RouteMask: u8 {
        const EARPIECE = 0b0001;
        const BLUETOOTH = 0b0010;
        const WIRED_HEADSET = 0b0100;
    }
}

impl RouteMask {
    /// Whether `route` can be used with this mask
    pub fn allows(self, route: AudioRoute) -> bool {
        route == AudioRoute::Speaker || self.contains(route.mask())
    }
}

/// Audio state reported to the orchestrator and call listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallAudioState {
    /// Active route
    pub route: AudioRoute,
    /// Reachable routes, excluding the speaker
    pub supported_routes: RouteMask,
    /// Microphone mute; carried through unchanged by route transitions
    pub is_muted: bool,
}

impl CallAudioState {
    pub fn new(route: AudioRoute, supported_routes: RouteMask) -> Self {
        Self {
            route,
            supported_routes,
            is_muted: false,
        }
    }

    pub fn with_muted(mut self, is_muted: bool) -> Self {
        self.is_muted = is_muted;
        self
    }

    /// Whether `other` differs in a way listeners are told about
    pub fn route_differs(&self, other: &CallAudioState) -> bool {
        self.route != other.route || self.supported_routes != other.supported_routes
    }
}

impl std::fmt::Display for CallAudioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[route={} supported={:?} muted={}]",
            self.route, self.supported_routes, self.is_muted
        )
    }
}

/// Audio focus as granted by the orchestrator
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Focus {
    HasFocus,
    NoFocus,
}

/// Inputs to the audio route state machine
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum RouteEvent {
    // Hardware availability
    ConnectWiredHeadset,
    DisconnectWiredHeadset,
    ConnectBluetooth,
    DisconnectBluetooth,

    // Explicit user requests
    SwitchEarpiece,
    SwitchSpeaker,
    SwitchBluetooth,
    SwitchWiredHeadset,
    /// Wired headset if attached, else earpiece, else speaker
    SwitchBaselineRoute,

    // Orchestrator
    SwitchFocus(Focus),
}

impl RouteEvent {
    /// Event name as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            RouteEvent::ConnectWiredHeadset => "CONNECT_WIRED_HEADSET",
            RouteEvent::DisconnectWiredHeadset => "DISCONNECT_WIRED_HEADSET",
            RouteEvent::ConnectBluetooth => "CONNECT_BLUETOOTH",
            RouteEvent::DisconnectBluetooth => "DISCONNECT_BLUETOOTH",
            RouteEvent::SwitchEarpiece => "SWITCH_EARPIECE",
            RouteEvent::SwitchSpeaker => "SWITCH_SPEAKER",
            RouteEvent::SwitchBluetooth => "SWITCH_BLUETOOTH",
            RouteEvent::SwitchWiredHeadset => "SWITCH_WIRED_HEADSET",
            RouteEvent::SwitchBaselineRoute => "SWITCH_BASELINE_ROUTE",
            RouteEvent::SwitchFocus(Focus::HasFocus) => "SWITCH_FOCUS(HAS_FOCUS)",
            RouteEvent::SwitchFocus(Focus::NoFocus) => "SWITCH_FOCUS(NO_FOCUS)",
        }
    }
}

/// A command to the audio hardware
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum HardwareCommand {
    EnableSpeakerphone,
    DisableSpeakerphone,
    ConnectBluetoothAudio,
    DisconnectBluetoothAudio,
}
