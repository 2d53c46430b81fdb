//! Duplex session command.

use clap::Args;
use lazo_io::{
    DuplexEngine, GraphSettings, GraphState, LatencyMode, ToneConfig, WavSink, monitor_channel,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct RunArgs {
    /// Session duration in seconds (0 = run until Ctrl+C)
    #[arg(short, long, default_value_t = 4.0)]
    duration: f32,

    /// Tone frequency in Hz
    #[arg(short, long, default_value_t = lazo_core::DEFAULT_FREQUENCY_HZ)]
    frequency: f32,

    /// Tone gain (linear)
    #[arg(short, long, default_value_t = lazo_core::DEFAULT_GAIN)]
    gain: f32,

    /// Request the smallest quantum the devices support
    #[arg(long)]
    low_latency: bool,

    /// Capture device name (uses default if not specified)
    #[arg(long)]
    input: Option<String>,

    /// Render device name (uses default if not specified)
    #[arg(long)]
    output: Option<String>,

    /// Record the rendered output to a WAV file
    #[arg(long)]
    record: Option<PathBuf>,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let settings = GraphSettings {
        latency: if args.low_latency {
            LatencyMode::Lowest
        } else {
            LatencyMode::Standard
        },
        render_device: args.output.clone(),
        capture_device: args.input.clone(),
    };
    let tone = ToneConfig {
        frequency_hz: args.frequency,
        gain: args.gain,
    };

    let mut engine = DuplexEngine::new(settings, tone);

    let mut monitor = None;
    if args.record.is_some() {
        let (tap, rx) = monitor_channel();
        engine.set_monitor_tap(tap);
        monitor = Some(rx);
    }

    engine.start();
    if engine.state() != GraphState::Running {
        anyhow::bail!("no audio session could be started (is a render device present?)");
    }

    let format = engine
        .format()
        .ok_or_else(|| anyhow::anyhow!("running session has no negotiated format"))?;

    println!(
        "Duplex session: {} Hz, {} channel(s)",
        format.sample_rate, format.channels
    );
    println!("  Tone:    {} Hz at gain {}", args.frequency, args.gain);
    println!(
        "  Render:  {}",
        if engine.render_active() {
            "active"
        } else {
            "unavailable (silent session)"
        }
    );
    println!(
        "  Capture: {}",
        if engine.capture_active() {
            "active"
        } else {
            "unavailable (tone only)"
        }
    );

    let mut sink = match &args.record {
        Some(path) => {
            println!("  Recording to {}", path.display());
            Some(WavSink::create(path, format)?)
        }
        None => None,
    };

    if args.duration > 0.0 {
        println!("\nRunning for {} s...", args.duration);
    } else {
        println!("\nPress Ctrl+C to stop...");
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let deadline =
        (args.duration > 0.0).then(|| Instant::now() + Duration::from_secs_f32(args.duration));

    while running.load(Ordering::SeqCst) {
        if let Some(deadline) = deadline
            && Instant::now() >= deadline
        {
            break;
        }
        if let Some(monitor) = &monitor {
            while let Ok(frame) = monitor.try_recv() {
                if let Some(sink) = &mut sink {
                    sink.write_frame(&frame)?;
                }
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    engine.stop();

    // Pick up anything tapped between the last drain and the stop.
    if let Some(monitor) = &monitor {
        while let Ok(frame) = monitor.try_recv() {
            if let Some(sink) = &mut sink {
                sink.write_frame(&frame)?;
            }
        }
    }
    if let Some(sink) = sink {
        println!("Recorded {} sample-frames", sink.frames_written());
        sink.finalize()?;
    }

    let stats = engine.stats();
    println!("\nSession summary:");
    println!("  Quanta rendered:         {}", stats.quanta);
    println!("  Capture frames mixed:    {}", stats.mixed_frames);
    println!("  Capture buffers dropped: {}", stats.dropped_frames);
    println!("  Discontinuities:         {}", stats.discontinuities);
    println!("Done!");

    Ok(())
}
