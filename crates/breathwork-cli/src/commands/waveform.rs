use breathwork_core::{synthesize, BreathingPhase, Config, SessionConfig, VibrationPattern};
use clap::Args;
use serde_json::json;

#[derive(Args)]
pub struct WaveformArgs {
    /// Breathing phase (inhale, hold, exhale)
    #[arg(long)]
    phase: BreathingPhase,
    /// Vibration pattern (defaults to the configured one)
    #[arg(long)]
    pattern: Option<VibrationPattern>,
    /// Intensity in (0, 1]
    #[arg(long)]
    intensity: Option<f32>,
    /// Buzz length for the counted patterns, in milliseconds
    #[arg(long)]
    pulse_ms: Option<f32>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: WaveformArgs) -> Result<(), Box<dyn std::error::Error>> {
    let stored = Config::load_or_default().session_config().unwrap_or_default();
    let params = SessionConfig::new(
        1,
        args.pattern.unwrap_or(stored.pattern()),
        args.intensity.unwrap_or(stored.intensity()),
        args.pulse_ms.unwrap_or(stored.pulse_duration_ms()),
    )?;

    let waveform = synthesize(
        args.phase,
        params.pattern(),
        params.intensity(),
        params.pulse_duration_ms(),
    );

    if args.json {
        let out = json!({
            "phase": args.phase,
            "pattern": params.pattern(),
            "timings": waveform.timings(),
            "amplitudes": waveform.amplitudes(),
            "total_ms": waveform.total_duration_ms(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} / {}", args.phase, params.pattern());
    if waveform.is_empty() {
        println!("(no vibration)");
        return Ok(());
    }
    for (i, seg) in waveform.segments().iter().enumerate() {
        println!("{:>3}  {:>5} ms  amp {:>3}", i, seg.duration_ms, seg.amplitude);
    }
    println!(
        "total {} ms over a {} ms phase",
        waveform.total_duration_ms(),
        args.phase.duration_ms()
    );
    Ok(())
}
