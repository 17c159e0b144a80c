//! Collaborators of the audio route state machine
//!
//! The state machine never touches audio hardware or device managers
//! directly. It is handed implementations of these traits when it is
//! built, queries the device managers once while initialising, and from
//! then on only issues [`HardwareCommand`]s and state-change callbacks.
//!
//! All calls are made from the state machine's event loop and must not
//! block it; implementations that need I/O should hand the work off.

use crate::audio::route::{CallAudioState, HardwareCommand};

/// The audio hardware control surface
///
/// Commands are fire-and-forget. A failed command is not retried by the
/// state machine; hardware is reconciled again on the next route change or
/// focus acquisition.
pub trait AudioHardware: Send + Sync {
    /// Turn the speakerphone output on or off
    fn set_speakerphone_on(&self, on: bool);

    /// Route call audio over the connected Bluetooth headset
    fn connect_bluetooth_audio(&self);

    /// Stop routing call audio over Bluetooth
    fn disconnect_bluetooth_audio(&self);

    /// Dispatch a single command
    fn execute(&self, command: HardwareCommand) {
        match command {
            HardwareCommand::EnableSpeakerphone => self.set_speakerphone_on(true),
            HardwareCommand::DisableSpeakerphone => self.set_speakerphone_on(false),
            HardwareCommand::ConnectBluetoothAudio => self.connect_bluetooth_audio(),
            HardwareCommand::DisconnectBluetoothAudio => self.disconnect_bluetooth_audio(),
        }
    }
}

/// Reports whether a wired headset is plugged in
pub trait WiredHeadsetManager: Send + Sync {
    fn is_plugged_in(&self) -> bool;
}

/// Reports Bluetooth headset availability
pub trait BluetoothRouteManager: Send + Sync {
    /// A headset is connected and could carry call audio
    fn is_bluetooth_available(&self) -> bool;

    /// Call audio is already flowing over the headset
    fn is_bluetooth_audio_connected(&self) -> bool;
}

/// Receives route changes
///
/// Implemented by the call orchestrator and by each call's audio-state
/// listener. Invoked once per externally visible change, never for no-op
/// transitions.
pub trait CallAudioStateListener: Send + Sync {
    fn on_call_audio_state_changed(&self, old_state: &CallAudioState, new_state: &CallAudioState);
}
