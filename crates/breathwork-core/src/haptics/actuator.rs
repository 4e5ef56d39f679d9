//! Single point of contact with the vibration actuator.
//!
//! The physical motor can run one waveform at a time. [`VibrationDevice`]
//! makes replace-if-playing an explicit contract so [`HapticActuator`] never
//! issues a cancel right before a new waveform (on some hardware that cancel
//! races and kills the new request).

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::waveform::{Waveform, WaveformSegment};

/// Length of the phase-transition cue.
pub const TRANSIENT_MS: u32 = 60;

const TRANSIENT_BASE: f32 = 200.0;
const FLOURISH_BASE: f32 = 220.0;

/// Platform vibration motor.
pub trait VibrationDevice: Send + Sync {
    /// Whether a motor is present. When false every call is skipped.
    fn has_vibrator(&self) -> bool;

    /// Start `waveform` immediately.
    ///
    /// Must atomically replace whatever is currently playing. Implementations
    /// on platforms without that guarantee perform cancel-then-play inside a
    /// single critical section.
    fn vibrate(&self, waveform: &Waveform);

    /// Stop any playback. Safe to call when idle.
    fn cancel(&self);
}

/// Adapter the session engine drives. Cheap to clone.
#[derive(Clone)]
pub struct HapticActuator {
    device: Arc<dyn VibrationDevice>,
}

impl HapticActuator {
    pub fn new(device: Arc<dyn VibrationDevice>) -> Self {
        Self { device }
    }

    /// An actuator with no motor behind it; every call is a no-op.
    pub fn absent() -> Self {
        Self::new(Arc::new(NoVibrator))
    }

    pub fn is_available(&self) -> bool {
        self.device.has_vibrator()
    }

    /// Play `waveform`, replacing anything in flight.
    pub fn play_waveform(&self, waveform: &Waveform) {
        if !self.device.has_vibrator() || waveform.is_empty() {
            return;
        }
        debug!(
            segments = waveform.len(),
            total_ms = waveform.total_duration_ms(),
            "playing waveform"
        );
        self.device.vibrate(waveform);
    }

    /// Short single pulse marking a phase change.
    pub fn play_transient(&self, intensity: f32) {
        self.play_waveform(&transient(intensity));
    }

    /// Three-pulse confirmation played when a session completes.
    pub fn play_completion_flourish(&self, intensity: f32) {
        self.play_waveform(&completion_flourish(intensity));
    }

    pub fn cancel(&self) {
        if self.device.has_vibrator() {
            self.device.cancel();
        }
    }
}

impl std::fmt::Debug for HapticActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HapticActuator")
            .field("available", &self.device.has_vibrator())
            .finish()
    }
}

/// The phase-transition cue waveform.
pub fn transient(intensity: f32) -> Waveform {
    Waveform::one_shot(TRANSIENT_MS, scaled(TRANSIENT_BASE, intensity))
}

/// The completion flourish waveform.
pub fn completion_flourish(intensity: f32) -> Waveform {
    let amp = scaled(FLOURISH_BASE, intensity);
    Waveform::from_segments(vec![
        WaveformSegment::silence(0),
        WaveformSegment::new(100, amp),
        WaveformSegment::silence(100),
        WaveformSegment::new(100, amp),
        WaveformSegment::silence(100),
        WaveformSegment::new(200, amp),
    ])
}

fn scaled(base: f32, intensity: f32) -> u8 {
    ((base * intensity) as i32).clamp(1, 255) as u8
}

/// A host without a vibration motor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVibrator;

impl VibrationDevice for NoVibrator {
    fn has_vibrator(&self) -> bool {
        false
    }

    fn vibrate(&self, _waveform: &Waveform) {}

    fn cancel(&self) {}
}

/// A call received by a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Vibrate(Waveform),
    Cancel,
}

/// Device that keeps every command it receives.
///
/// Used for dry runs on hosts without a motor and for asserting on the
/// exact command stream in tests.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCall>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Waveforms submitted so far, in order.
    pub fn waveforms(&self) -> Vec<Waveform> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::Vibrate(w) => Some(w),
                DeviceCall::Cancel => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: DeviceCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl VibrationDevice for RecordingDevice {
    fn has_vibrator(&self) -> bool {
        true
    }

    fn vibrate(&self, waveform: &Waveform) {
        self.record(DeviceCall::Vibrate(waveform.clone()));
    }

    fn cancel(&self) {
        self.record(DeviceCall::Cancel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (Arc<RecordingDevice>, HapticActuator) {
        let device = Arc::new(RecordingDevice::new());
        let actuator = HapticActuator::new(device.clone());
        (device, actuator)
    }

    #[test]
    fn transient_scales_and_clamps() {
        assert_eq!(transient(1.0).segments(), &[WaveformSegment::new(60, 200)]);
        assert_eq!(transient(0.0).amplitudes(), vec![1]);
        assert_eq!(transient(5.0).amplitudes(), vec![255]);
    }

    #[test]
    fn flourish_has_fixed_shape() {
        let wave = completion_flourish(0.5);
        assert_eq!(wave.timings(), vec![0, 100, 100, 100, 100, 200]);
        assert_eq!(wave.amplitudes(), vec![0, 110, 0, 110, 0, 110]);
    }

    #[test]
    fn play_waveform_replaces_without_cancel() {
        let (device, actuator) = recording();
        actuator.play_transient(1.0);
        actuator.play_completion_flourish(1.0);
        let calls = device.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| matches!(c, DeviceCall::Vibrate(_))));
    }

    #[test]
    fn empty_waveform_is_not_submitted() {
        let (device, actuator) = recording();
        actuator.play_waveform(&Waveform::new());
        assert!(device.calls().is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let (device, actuator) = recording();
        actuator.cancel();
        actuator.cancel();
        assert_eq!(device.calls(), vec![DeviceCall::Cancel, DeviceCall::Cancel]);
    }

    #[test]
    fn absent_device_degrades_to_noop() {
        let actuator = HapticActuator::absent();
        assert!(!actuator.is_available());
        actuator.play_transient(1.0);
        actuator.play_completion_flourish(1.0);
        actuator.cancel();
    }
}
