mod cli;

#[cfg(feature = "gui")]
mod app;

use std::fs;
use std::io::{self, BufRead, Read};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use cli::{Args, Command, USAGE};
use drumbox::midi::Tee;
use drumbox::{
    logging, midi_note_name, patterns, tune, AudioMonitor, ByteSink, Channel, Config,
    ConfigurationError, MidiOut, MidiPort, Pattern, Sequencer,
};

fn main() -> ExitCode {
    if let Err(e) = logging::init() {
        eprintln!("failed to install logger: {}", e);
    }

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> drumbox::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bpm) = args.bpm {
        config.bpm = bpm;
    }
    if args.port.is_some() {
        config.port = args.port.clone();
    }
    config.validate()?;

    match args.command {
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        Command::Ports => {
            let ports = MidiPort::available_ports();
            if ports.is_empty() {
                println!("no MIDI output ports");
            }
            for (index, name) in ports.iter().enumerate() {
                println!("{}: {}", index, name);
            }
            Ok(())
        }
        Command::Play => {
            let pattern = load_pattern(args.pattern.as_deref())?;
            play(pattern, &config, args.monitor)
        }
        Command::Tune(name) => play_tune(&name, &config),
        #[cfg(feature = "gui")]
        Command::Gui => {
            let pattern = load_pattern(args.pattern.as_deref())?;
            app::run(pattern, config)
                .map_err(|e| ConfigurationError::Usage(format!("GUI failed: {}", e)).into())
        }
        #[cfg(not(feature = "gui"))]
        Command::Gui => Err(ConfigurationError::Usage(
            "this binary was built without the 'gui' feature".to_string(),
        )
        .into()),
    }
}

/// Built-in name, `-` for stdin, or a file path. Compiled before any port is opened.
fn load_pattern(source: Option<&str>) -> drumbox::Result<Pattern> {
    let text = match source {
        None => patterns::FUNKY_DRUMMER.to_string(),
        Some("-") => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| ConfigurationError::Read {
                    path: "<stdin>".into(),
                    source,
                })?;
            text
        }
        Some(name) => match patterns::builtin(name) {
            Some(text) => text.to_string(),
            None => fs::read_to_string(Path::new(name)).map_err(|source| {
                ConfigurationError::Read {
                    path: name.into(),
                    source,
                }
            })?,
        },
    };

    let pattern = Pattern::compile(&text)?;
    for lane in pattern.lanes() {
        log::info!(
            "{:>3} {:<4} {} {}",
            lane.note(),
            midi_note_name(lane.note()),
            lane.hits().iter().map(|s| s.as_char()).collect::<String>(),
            lane.label().unwrap_or("")
        );
    }
    Ok(pattern)
}

fn open_sink(
    config: &Config,
    monitor: Option<&AudioMonitor>,
) -> drumbox::Result<Box<dyn ByteSink + Send>> {
    let sink: Box<dyn ByteSink + Send> = match monitor {
        // monitor only, unless a port was asked for explicitly
        Some(monitor) if config.port.is_none() => Box::new(monitor.sink()),
        Some(monitor) => Box::new(Tee {
            primary: MidiPort::connect_matching(config.port.as_deref())?,
            secondary: monitor.sink(),
        }),
        None => Box::new(MidiPort::connect_matching(config.port.as_deref())?),
    };
    Ok(sink)
}

fn play(pattern: Pattern, config: &Config, monitor: bool) -> drumbox::Result<()> {
    let clock = config.clock()?;
    let velocities = config.velocity_table()?;
    let monitor = monitor.then(AudioMonitor::default);
    if let Some(monitor) = &monitor {
        if !monitor.is_audible() {
            log::warn!("no audio output device, monitor is silent");
        }
    }

    let mut out = MidiOut::with_channel(open_sink(config, monitor.as_ref())?, config.channel()?);
    let mut sequencer = Sequencer::with_velocities(pattern, velocities);

    // Enter on stdin plays the role of the stop button
    let stop = Arc::new(AtomicBool::new(false));
    let stop_button = Arc::clone(&stop);
    thread::spawn(move || watch_stop_button(io::stdin().lock(), &stop_button));
    println!("playing, press Enter to stop");

    let mut stop = stop;
    let steps = sequencer.pattern().steps();
    clock.run_with(&mut sequencer, &mut out, None, &mut stop, |step| {
        if step == 0 {
            log::debug!("bar ({} steps)", steps);
        }
    })?;
    Ok(())
}

/// Sets `stop` once a line arrives. At end of input (stdin closed, or already
/// consumed by a `-` pattern) there is no button and playback keeps going.
fn watch_stop_button<R: BufRead>(mut input: R, stop: &AtomicBool) {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(n) if n > 0 => stop.store(true, Ordering::Relaxed),
        Ok(_) => log::debug!("stdin closed, no stop button"),
        Err(e) => log::debug!("cannot read stdin, no stop button: {}", e),
    }
}

fn play_tune(name: &str, config: &Config) -> drumbox::Result<()> {
    let tune = tune::builtin(name).ok_or_else(|| {
        let names: Vec<&str> = tune::BUILTIN.iter().map(|(n, _)| *n).collect();
        ConfigurationError::Usage(format!(
            "unknown tune `{}`, try one of: {}",
            name,
            names.join(", ")
        ))
    })?;

    // melodies go to channel 1, the drum channel is for patterns
    let port = MidiPort::connect_matching(config.port.as_deref())?;
    let mut out = MidiOut::with_channel(port, Channel::default());
    log::info!("playing {} ({} ticks)", name, tune.ticks());
    tune::play(&mut out, &tune, config.bpm.round() as u32, config.steps_per_beat)?;
    Ok(())
}
