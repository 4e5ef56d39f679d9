mod actuator;
mod waveform;

pub use actuator::{
    completion_flourish, transient, DeviceCall, HapticActuator, NoVibrator, RecordingDevice,
    VibrationDevice, TRANSIENT_MS,
};
pub use waveform::{
    base_amplitude, buzz_count, buzz_duration_ms, synthesize, Waveform, WaveformSegment,
    BUZZ_GAP_MS, MIN_BUZZ_MS,
};
