use std::sync::Arc;
use std::time::Duration;

use breathwork_core::{
    BreathingPhase, BreathingSession, Config, Event, HapticActuator, SessionConfig, SessionHost,
    SessionStatus, SessionTiming, StopHandle, VibrationDevice, VibrationPattern, WakeLease,
    Waveform,
};
use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace};

const BAR_WIDTH: usize = 20;

#[derive(Args)]
pub struct RunArgs {
    /// Number of 4-7-8 cycles
    #[arg(long)]
    reps: Option<u32>,
    /// Vibration pattern (gentle, standard, strong, pulse, simple-1, simple-2)
    #[arg(long)]
    pattern: Option<VibrationPattern>,
    /// Intensity in (0, 1]
    #[arg(long)]
    intensity: Option<f32>,
    /// Buzz length for the counted patterns, in milliseconds
    #[arg(long)]
    pulse_ms: Option<f32>,
    /// Run without a vibration device
    #[arg(long)]
    silent: bool,
}

/// Stand-in motor for desktop runs: logs each waveform at debug level.
struct TracingVibrator;

impl VibrationDevice for TracingVibrator {
    fn has_vibrator(&self) -> bool {
        true
    }

    fn vibrate(&self, waveform: &Waveform) {
        debug!(
            segments = waveform.len(),
            total_ms = waveform.total_duration_ms(),
            peak = waveform.peak_amplitude(),
            "vibrate"
        );
        trace!(timings = ?waveform.timings(), amplitudes = ?waveform.amplitudes());
    }

    fn cancel(&self) {
        trace!("vibrate cancel");
    }
}

/// Terminal host: keep-awake is a bounded lease, status text goes to the log.
#[derive(Default)]
struct ConsoleHost {
    lease: WakeLease,
}

impl SessionHost for ConsoleHost {
    fn show_status(&self, text: &str) {
        debug!(status = text, "status");
    }

    fn acquire_keep_awake(&self, max_hold: Duration, expiry: StopHandle) {
        self.lease.hold(max_hold, expiry);
    }

    fn release_keep_awake(&self) {
        self.lease.release();
    }
}

fn session_config(args: &RunArgs, stored: &Config) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let base = stored.session_config()?;
    let config = SessionConfig::new(
        args.reps.unwrap_or(base.repetitions()),
        args.pattern.unwrap_or(base.pattern()),
        args.intensity.unwrap_or(base.intensity()),
        args.pulse_ms.unwrap_or(base.pulse_duration_ms()),
    )?;
    Ok(config)
}

fn progress_bar(progress: f32) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn status_line(s: &SessionStatus) -> String {
    format!(
        "Rep {}/{}  {:<7} {:>2}s  {}",
        s.current_rep,
        s.total_reps,
        s.phase.display_name(),
        s.phase_seconds_remaining,
        progress_bar(s.phase_progress)
    )
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let stored = Config::load_or_default();
    let config = session_config(&args, &stored)?;
    let timing = SessionTiming {
        keep_awake_max: stored.keep_awake(),
        ..SessionTiming::default()
    };
    let actuator = if args.silent {
        HapticActuator::absent()
    } else {
        HapticActuator::new(Arc::new(TracingVibrator))
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let session =
            BreathingSession::with_timing(actuator, Arc::new(ConsoleHost::default()), timing);
        drive(&session, config).await
    })
}

async fn drive(
    session: &BreathingSession,
    config: SessionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut status = session.status();
    let mut events = session.subscribe();

    println!(
        "{} x 4-7-8 ({}), pattern {}. Ctrl-C to stop.",
        config.repetitions(),
        format_duration(config.total_duration()),
        config.pattern()
    );
    session
        .start(config)
        .ok_or("a breathing session is already running")?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut shown: Option<(u32, BreathingPhase, u32)> = None;

    loop {
        tokio::select! {
            changed = status.changed() => {
                let Some(s) = changed else { break };
                let key = (s.current_rep, s.phase, s.phase_seconds_remaining);
                if s.phase.is_active() && shown != Some(key) {
                    println!("{}", status_line(&s));
                    shown = Some(key);
                }
            }
            event = events.recv() => match event {
                Ok(Event::SessionCompleted { total_reps, .. }) => {
                    println!("Complete: {total_reps} reps");
                    break;
                }
                Ok(Event::SessionStopped { rep, phase, .. }) => {
                    println!("Stopped during rep {rep} ({phase})");
                    break;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => {
                session.stop().await;
                println!("Stopped");
                return Ok(());
            }
        }
    }

    status.wait_for(|s| !s.is_running).await;
    Ok(())
}
