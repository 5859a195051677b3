//! Vocalis studio entry point — line-oriented console host.
//!
//! The graphical studio surface is a separate concern; this binary wires the
//! same command layer to stdin/stdout so the whole pipeline (generate →
//! play → visualize → export) can be driven from a terminal.

mod commands;
mod profiles;
mod prompt;
mod settings;
mod state;

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use vocalis_core::{
    playback::session::{NullSink, OutputSink},
    render_tick, CanvasSize, CpalSink, ExportFormat, GeminiConfig, GeminiSynthesizer,
    SpectrumAnalyzer, StubSynthesizer, SynthesizerHandle,
};

use commands::{
    create_profile, delete_profile, export, generate, list_devices, rename_profile,
    search_profiles, select_profile, stop, toggle_playback, update_tuning,
};
use settings::{default_settings_path, load_settings, save_settings};
use state::{spawn_event_forwarder, Studio};

const HELP: &str = "\
commands:
  gen <text>        generate speech for the active profile
  play              start playback (pause/stop with `stop`)
  stop              stop playback
  export [format]   write the clip to disk (wav, mp3, ogg; default wav)
  viz               print one spectrum frame
  profiles [query]  list (or search) voice profiles
  new               create a profile and select it
  use <id>          select a profile (stops playback)
  tune <param> <v>  set a slider on the active profile
                    (speed, pitch, temperature, emotion, clarity,
                     breathing, stability)
  rename <id> <name>
  delete <id>
  devices           list audio output devices
  log               show the generation log
  help              this text
  quit";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let settings_path = default_settings_path();
    let settings = load_settings(&settings_path);
    if !settings_path.exists() {
        if let Err(e) = save_settings(&settings_path, &settings) {
            tracing::warn!("could not write default settings: {e}");
        }
    }

    let synthesizer = match settings.resolved_api_key() {
        Some(api_key) => {
            info!("using remote generation service");
            let mut config = GeminiConfig::new(api_key);
            config.model = settings.model.clone();
            SynthesizerHandle::new(GeminiSynthesizer::new(config)?)
        }
        None => {
            info!("no API key configured — using offline stub synthesizer");
            SynthesizerHandle::new(StubSynthesizer::new())
        }
    };

    // VOCALIS_NULL_SINK=1 keeps the studio usable on machines with no audio
    // output (CI, containers): sessions run at real-time pace, silently.
    let sink: Arc<dyn OutputSink> = if std::env::var_os("VOCALIS_NULL_SINK").is_some() {
        Arc::new(NullSink::new())
    } else {
        Arc::new(CpalSink::new(settings.preferred_output_device.clone()))
    };

    let bars = settings.spectrum_bars;
    let canvas = CanvasSize {
        width: settings.canvas_width,
        height: settings.canvas_height,
    };
    let studio = Arc::new(Studio::new(synthesizer, sink, settings, settings_path));
    let _forwarder = spawn_event_forwarder(Arc::clone(&studio))?;
    let mut analyzer = SpectrumAnalyzer::new(studio.controller.tap_handle(), bars);

    println!("vocalis studio — type `help` for commands");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "gen" => match generate(&studio, rest) {
                Ok(outcome) => println!(
                    "generated {:.2} s ({} frames, {} wav bytes)",
                    outcome.duration_secs, outcome.frames, outcome.wav_bytes
                ),
                Err(e) => println!("error: {e}"),
            },
            "play" => {
                if let Err(e) = toggle_playback(&studio) {
                    println!("error: {e}");
                }
            }
            "stop" => stop(&studio),
            "export" => {
                let format = if rest.is_empty() { "wav" } else { rest };
                match ExportFormat::from_str(format).and_then(|f| export(&studio, f)) {
                    Ok(artifact) => {
                        std::fs::write(&artifact.filename, &artifact.bytes)?;
                        println!("wrote {} ({} bytes)", artifact.filename, artifact.bytes.len());
                    }
                    Err(e) => println!("error: {e}"),
                }
            }
            "viz" => {
                let playing = studio.controller.is_playing();
                let frame = analyzer.poll();
                let height = canvas.height;
                let commands = render_tick(&frame, playing, canvas);
                let meter: String = commands
                    .iter()
                    .filter_map(|cmd| match cmd {
                        vocalis_core::spectrum::DrawCommand::RoundedRect { height: h, .. } => {
                            Some(bar_glyph(*h / height))
                        }
                        _ => None,
                    })
                    .collect();
                println!("{meter}");
            }
            "profiles" => {
                let active_id = studio
                    .library
                    .lock()
                    .active()
                    .map(|p| p.id.clone())
                    .unwrap_or_default();
                for profile in search_profiles(&studio, rest) {
                    let marker = if profile.id == active_id { "*" } else { " " };
                    println!("{marker} {}  {} — {}", profile.id, profile.name, profile.vibe);
                }
            }
            "new" => {
                let profile = create_profile(&studio);
                println!("created {} ({})", profile.name, profile.id);
            }
            "use" => match select_profile(&studio, rest) {
                Ok(()) => {}
                Err(e) => println!("error: {e}"),
            },
            "tune" => {
                let (param, value) = match rest.split_once(char::is_whitespace) {
                    Some((p, v)) => (p, v.trim().parse::<f32>()),
                    None => {
                        println!("usage: tune <param> <value>");
                        continue;
                    }
                };
                let Ok(value) = value else {
                    println!("not a number: {rest}");
                    continue;
                };
                let tunable = [
                    "speed",
                    "pitch",
                    "temperature",
                    "emotion",
                    "clarity",
                    "breathing",
                    "stability",
                ];
                if !tunable.contains(&param) {
                    println!("unknown parameter: {param}");
                    continue;
                }
                let Some(active_id) = studio.library.lock().active().map(|p| p.id.clone()) else {
                    println!("no active profile");
                    continue;
                };
                let applied = update_tuning(&studio, &active_id, |tuning| match param {
                    "speed" => tuning.speed = value,
                    "pitch" => tuning.pitch = value,
                    "temperature" => tuning.temperature = value,
                    "emotion" => tuning.emotional_depth = value,
                    "clarity" => tuning.clarity = value,
                    "breathing" => tuning.breathing_level = value,
                    "stability" => tuning.stability = value,
                    _ => {}
                });
                if applied {
                    println!("{param} = {value}");
                }
            }
            "rename" => {
                let (id, name) = match rest.split_once(char::is_whitespace) {
                    Some((id, name)) => (id, name.trim()),
                    None => {
                        println!("usage: rename <id> <name>");
                        continue;
                    }
                };
                if !rename_profile(&studio, id, name) {
                    println!("no such profile: {id}");
                }
            }
            "delete" => {
                if !delete_profile(&studio, rest) {
                    println!("no such profile: {rest}");
                }
            }
            "devices" => {
                for device in list_devices() {
                    let marker = if device.is_default { "*" } else { " " };
                    println!("{marker} {}", device.name);
                }
            }
            "log" => {
                for line in studio.log_lines() {
                    println!("{line}");
                }
            }
            "help" => println!("{HELP}"),
            "quit" | "exit" => break,
            other => println!("unknown command: {other} (try `help`)"),
        }
    }

    stop(&studio);
    Ok(())
}

/// Map a normalized bar height onto a terminal block glyph.
fn bar_glyph(fraction: f32) -> char {
    const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let idx = ((fraction.clamp(0.0, 1.0) * 7.0).round()) as usize;
    GLYPHS[idx.min(7)]
}
