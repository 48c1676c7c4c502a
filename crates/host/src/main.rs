//! # gantry-core host
//!
//! A small CLI that drives the motion core from a G-code stream.
//!
//! ## Responsibilities
//!
//! *   Reading G-code from a file or standard input, line by line.
//! *   Owning the X/Y/Z/extruder steppers and the locator/elevator that
//!     coordinate them, driven by an in-process tick loop rather than a
//!     timer ISR.
//! *   Reporting diagnostics raised by the motion core through an
//!     [`io_support::ErrorSink`].
//!
//! There is no MCU on the other end of a wire here: [`sim::RecordingPort`]
//! stands in for the GPIO pins a real board would own. Driving a real
//! board is the firmware crate's job.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

mod batch;
mod config;

use config::MachineConfig;
use io_support::char_stream::std_impl::{SliceStream, StdinStream};
use io_support::diag_sink::{drain, TracingErrorSink};
use motion::{Elevator, GpioPort, Locator, Stepper};
use sim::{RecordingPort, TickDriver};

/// Control-loop CLI driving the motion core from a G-code file or stdin.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run G-code through the motion core, ticking the locator/elevator
    /// until every line has been dispatched and the machine is at rest.
    Run(RunArgs),
    /// Pre-simulate a G-code file and print the bounding box it traces,
    /// without touching any stepper.
    Batch(batch::BatchArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the machine configuration file.
    #[arg(short, long, default_value = "machine.cfg")]
    config_path: PathBuf,

    /// Path to a G-code file. Reads standard input when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Upper bound on ticks spent waiting for a single move to arrive,
    /// as a safety valve against a target the search can never reach.
    #[arg(long, default_value_t = 200_000)]
    max_ticks_per_move: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Batch(args) => batch::run_batch_processing(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    info!(path = ?args.config_path, "loading machine configuration");
    let machine = MachineConfig::load(&args.config_path)
        .with_context(|| format!("loading {:?}", args.config_path))?;

    let mut x = Stepper::new(RecordingPort::default(), 'x', true);
    let mut y = Stepper::new(RecordingPort::default(), 'y', true);
    let mut z = Stepper::new(RecordingPort::default(), 'z', true);
    let mut e = Stepper::new(RecordingPort::default(), 'e', true);
    x.reset();
    y.reset();
    z.reset();
    e.reset();
    apply_bounds(&mut x, machine.x.min, machine.x.max);
    apply_bounds(&mut y, machine.y.min, machine.y.max);
    apply_bounds(&mut z, machine.z.min, machine.z.max);

    let mut locator = Locator::new(&mut x, &mut y);
    locator.set_best_freq(machine.locator.f_best);
    locator.set_max_delta_freq(machine.locator.df_max);
    locator.set_precision(machine.locator.epsilon);

    let mut elevator = Elevator::new(&mut z);
    elevator.set_best_freq(machine.elevator.f_best);
    elevator.set_max_delta_freq(machine.elevator.df_max);

    let mut reader = gcode::GCodeReader::new();
    reader.set_scale(machine.scale);

    let mut sink = TracingErrorSink;
    let mut driver = TickDriver::new();

    match args.input {
        Some(path) => {
            let bytes = std::fs::read(&path).with_context(|| format!("reading {:?}", path))?;
            let mut stream = SliceStream::new(std::io::Cursor::new(bytes.as_slice()));
            drive_lines(&mut reader, &mut stream, &mut locator, &mut elevator, &mut e, &mut driver, args.max_ticks_per_move);
        }
        None => {
            let mut stream = StdinStream::new(std::io::stdin());
            drive_lines(&mut reader, &mut stream, &mut locator, &mut elevator, &mut e, &mut driver, args.max_ticks_per_move);
        }
    }

    drain(&mut sink);

    let position = locator.value();
    info!(x = position.x, y = position.y, z = z.value(), "final position");
    println!("x={} y={} z={}", position.x, position.y, z.value());
    Ok(())
}

fn apply_bounds<P: GpioPort>(stepper: &mut Stepper<P>, min: Option<i64>, max: Option<i64>) {
    if let Some(min) = min {
        stepper.set_min_value(min, true);
    }
    if let Some(max) = max {
        stepper.set_max_value(max, true);
    }
}

fn drive_lines<S, P>(
    reader: &mut gcode::GCodeReader,
    stream: &mut S,
    locator: &mut Locator<'_, P>,
    elevator: &mut Elevator<'_, P>,
    extruder: &mut Stepper<P>,
    driver: &mut TickDriver,
    max_ticks_per_move: u64,
) where
    S: io_support::CharacterStream,
    P: GpioPort,
{
    loop {
        match reader.next_line(stream, locator, elevator, extruder) {
            gcode::Outcome::NoInput => break,
            // A line that issued no X/Y/Z move (a modal-only line, or one
            // that set only the extruder) still needs the extruder ticked
            // once so an E/A-only move is not a silent no-op.
            gcode::Outcome::Idle => {
                driver.drive(
                    |_| {
                        extruder.exec();
                        extruder.release();
                        true
                    },
                    1,
                );
            }
            gcode::Outcome::Busy => {
                driver.drive(
                    |_| {
                        locator.tick();
                        elevator.tick();
                        extruder.exec();
                        extruder.release();
                        !locator.has_target() && !elevator.has_target()
                    },
                    max_ticks_per_move,
                );
            }
        }
    }
}
