//! Waveform synthesis.
//!
//! Maps a breathing phase, a vibration pattern, an intensity and a pulse
//! duration to an ordered list of `(duration, amplitude)` segments. Pure and
//! deterministic: the same inputs always produce the same waveform.
//!
//! Amplitudes follow one rule set across every pattern:
//!
//! - the pattern base is `trunc(BASE * intensity)` clamped to `1..=255`
//! - "on" segments are clamped to `1..=255`
//! - silence gaps are exactly `0`
//! - fade-outs may floor at `0`, and their final segments are forced to `0`

use serde::{Deserialize, Serialize};

use crate::breathing::{BreathingPhase, VibrationPattern};

/// Shortest buzz the counted patterns will emit, in milliseconds.
pub const MIN_BUZZ_MS: u32 = 20;
/// Silence between counted buzzes, in milliseconds.
pub const BUZZ_GAP_MS: u32 = 150;

const GENTLE_BASE: f32 = 80.0;
const STANDARD_BASE: f32 = 150.0;
const STRONG_BASE: f32 = 255.0;
const PULSE_BASE: f32 = 200.0;
const SIMPLE_BASE: f32 = 180.0;

/// One stretch of constant actuator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveformSegment {
    pub duration_ms: u32,
    /// 0 is silence.
    pub amplitude: u8,
}

impl WaveformSegment {
    pub fn new(duration_ms: u32, amplitude: u8) -> Self {
        Self {
            duration_ms,
            amplitude,
        }
    }

    pub fn silence(duration_ms: u32) -> Self {
        Self::new(duration_ms, 0)
    }

    pub fn is_silent(&self) -> bool {
        self.amplitude == 0
    }
}

/// An ordered sequence of segments describing actuator output over time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waveform {
    segments: Vec<WaveformSegment>,
}

impl Waveform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<WaveformSegment>) -> Self {
        Self { segments }
    }

    /// A single segment at constant amplitude.
    pub fn one_shot(duration_ms: u32, amplitude: u8) -> Self {
        Self::from_segments(vec![WaveformSegment::new(duration_ms, amplitude)])
    }

    pub fn push(&mut self, duration_ms: u32, amplitude: u8) {
        self.segments.push(WaveformSegment::new(duration_ms, amplitude));
    }

    pub fn segments(&self) -> &[WaveformSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.segments.iter().map(|s| u64::from(s.duration_ms)).sum()
    }

    pub fn peak_amplitude(&self) -> u8 {
        self.segments.iter().map(|s| s.amplitude).max().unwrap_or(0)
    }

    /// Segment durations, for platform APIs that take parallel arrays.
    pub fn timings(&self) -> Vec<u32> {
        self.segments.iter().map(|s| s.duration_ms).collect()
    }

    /// Segment amplitudes, parallel to [`Waveform::timings`].
    pub fn amplitudes(&self) -> Vec<u8> {
        self.segments.iter().map(|s| s.amplitude).collect()
    }

    fn silence_last(&mut self, n: usize) {
        let len = self.segments.len();
        for seg in self.segments.iter_mut().skip(len.saturating_sub(n)) {
            seg.amplitude = 0;
        }
    }
}

/// Build the waveform for one phase.
///
/// `Idle` and `Complete` have no waveform and yield an empty one.
pub fn synthesize(
    phase: BreathingPhase,
    pattern: VibrationPattern,
    intensity: f32,
    pulse_duration_ms: f32,
) -> Waveform {
    if !phase.is_active() {
        return Waveform::new();
    }
    match pattern {
        VibrationPattern::Gentle => gentle(phase, base_amplitude(GENTLE_BASE, intensity)),
        VibrationPattern::Standard => standard(phase, base_amplitude(STANDARD_BASE, intensity)),
        VibrationPattern::Strong => strong(phase, base_amplitude(STRONG_BASE, intensity)),
        VibrationPattern::Pulse => pulse(phase, base_amplitude(PULSE_BASE, intensity)),
        VibrationPattern::Simple1 | VibrationPattern::Simple2 => {
            let amplitude = on_amplitude(base_amplitude(SIMPLE_BASE, intensity));
            buzzes(buzz_count(pattern, phase), amplitude, pulse_duration_ms)
        }
    }
}

/// `trunc(base * intensity)` clamped to `1..=255`.
pub fn base_amplitude(base: f32, intensity: f32) -> u32 {
    ((base * intensity) as i32).clamp(1, 255) as u32
}

/// Number of buzzes a counted pattern plays for `phase`.
pub fn buzz_count(pattern: VibrationPattern, phase: BreathingPhase) -> usize {
    match (pattern, phase) {
        (VibrationPattern::Simple1, BreathingPhase::Inhale) => 1,
        (VibrationPattern::Simple1, BreathingPhase::Hold) => 2,
        (VibrationPattern::Simple1, BreathingPhase::Exhale) => 3,
        (VibrationPattern::Simple2, BreathingPhase::Inhale) => 1,
        (VibrationPattern::Simple2, BreathingPhase::Hold) => 1,
        (VibrationPattern::Simple2, BreathingPhase::Exhale) => 2,
        _ => 0,
    }
}

/// Effective buzz length after the duration floor.
pub fn buzz_duration_ms(pulse_duration_ms: f32) -> u32 {
    // NaN and negatives collapse to 0 and then hit the floor.
    (pulse_duration_ms.max(0.0) as u32).max(MIN_BUZZ_MS)
}

fn on_amplitude(value: u32) -> u8 {
    value.clamp(1, 255) as u8
}

fn fade_amplitude(value: u32) -> u8 {
    value.min(255) as u8
}

fn fraction(base: u32, factor: f32) -> u8 {
    on_amplitude(((base as f32) * factor) as u32)
}

fn rising(base: u32, step: u32, steps: u32) -> u8 {
    on_amplitude(base * (step + 1) / steps)
}

fn falling(base: u32, step: u32, steps: u32) -> u8 {
    fade_amplitude(base * (steps - step) / steps)
}

fn gentle(phase: BreathingPhase, base: u32) -> Waveform {
    let mut wave = Waveform::new();
    match phase {
        BreathingPhase::Inhale => {
            for i in 0..16 {
                wave.push(80, rising(base, i, 16));
                wave.push(170, 0);
            }
        }
        BreathingPhase::Hold => {
            let amplitude = fraction(base, 0.3);
            for _ in 0..14 {
                wave.push(50, amplitude);
                wave.push(450, 0);
            }
        }
        BreathingPhase::Exhale => {
            for i in 0..16 {
                wave.push(80, falling(base, i, 16));
                wave.push(420, 0);
            }
            wave.silence_last(2);
        }
        _ => {}
    }
    wave
}

fn standard(phase: BreathingPhase, base: u32) -> Waveform {
    match phase {
        BreathingPhase::Inhale => ramp(20, 200, |i| rising(base, i, 20)),
        BreathingPhase::Hold => Waveform::one_shot(7000, fraction(base, 0.4)),
        BreathingPhase::Exhale => {
            let mut wave = ramp(20, 400, |i| falling(base, i, 20));
            wave.silence_last(1);
            wave
        }
        _ => Waveform::new(),
    }
}

fn strong(phase: BreathingPhase, base: u32) -> Waveform {
    match phase {
        BreathingPhase::Inhale => ramp(16, 250, |i| rising(base, i, 16)),
        BreathingPhase::Hold => Waveform::one_shot(7000, on_amplitude(base)),
        BreathingPhase::Exhale => {
            let mut wave = ramp(16, 500, |i| falling(base, i, 16));
            wave.silence_last(1);
            wave
        }
        _ => Waveform::new(),
    }
}

fn pulse(phase: BreathingPhase, base: u32) -> Waveform {
    let mut wave = Waveform::new();
    match phase {
        BreathingPhase::Inhale => {
            for i in 0..8i64 {
                let on = (400 - 30 * i).max(100) as u32;
                let off = (100 - 5 * i).max(50) as u32;
                wave.push(on, rising(base, i as u32, 8));
                wave.push(off, 0);
            }
        }
        BreathingPhase::Hold => {
            let amplitude = fraction(base, 0.5);
            for _ in 0..7 {
                wave.push(500, amplitude);
                wave.push(500, 0);
            }
        }
        BreathingPhase::Exhale => {
            for i in 0..8u32 {
                let span = 200 + 50 * i;
                wave.push(span, falling(base, i, 8));
                wave.push(span, 0);
            }
            // The last pulse fades out completely.
            let len = wave.len();
            wave.segments[len - 2].amplitude = 0;
        }
        _ => {}
    }
    wave
}

/// Contiguous segments of equal length, amplitude chosen per step.
fn ramp(steps: u32, step_ms: u32, amplitude: impl Fn(u32) -> u8) -> Waveform {
    Waveform::from_segments(
        (0..steps)
            .map(|i| WaveformSegment::new(step_ms, amplitude(i)))
            .collect(),
    )
}

fn buzzes(count: usize, amplitude: u8, pulse_duration_ms: f32) -> Waveform {
    let duration = buzz_duration_ms(pulse_duration_ms);
    match count {
        0 => Waveform::new(),
        1 => Waveform::one_shot(duration, amplitude),
        n => {
            let mut wave = Waveform::new();
            for _ in 0..n {
                wave.push(duration, amplitude);
                wave.push(BUZZ_GAP_MS, 0);
            }
            wave
        }
    }
}
