//! Batch G-code processing: pre-simulates a whole file and reports the
//! bounding box it traces, without driving a single stepper.

use anyhow::{Context, Result};
use clap::Parser;
use io_support::char_stream::std_impl::SliceStream;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the `batch` subcommand.
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Path to the G-code file to pre-simulate.
    #[arg(required = true)]
    gcode_file: PathBuf,

    /// Extra unit-scale multiplier, same knob as `[machine] scale` in the
    /// machine configuration.
    #[arg(long, default_value_t = 1.0)]
    scale: f32,
}

pub fn run_batch_processing(args: BatchArgs) -> Result<()> {
    info!(path = ?args.gcode_file, "pre-simulating G-code file");
    let bytes = std::fs::read(&args.gcode_file)
        .with_context(|| format!("failed to open G-code file: {:?}", args.gcode_file))?;
    let mut stream = SliceStream::new(Cursor::new(bytes.as_slice()));

    let mut reader = gcode::GCodeReader::new();
    reader.set_scale(args.scale);
    while reader.simulate_line(&mut stream) != gcode::Outcome::NoInput {}

    let d = reader.description();
    println!("start: ({}, {})", d.start.x, d.start.y);
    println!("end:   ({}, {})", d.end.x, d.end.y);
    println!("min:   ({}, {})", d.min.x, d.min.y);
    println!("max:   ({}, {})", d.max.x, d.max.y);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn batch_prints_without_error_on_a_simple_file() {
        let path = std::env::temp_dir().join(format!(
            "gantry-core-host-batch-test-{}.gcode",
            std::process::id()
        ));
        {
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(b"G1 X10 Y10\nG1 X20 Y0\n").unwrap();
        }
        let result = run_batch_processing(BatchArgs {
            gcode_file: path.clone(),
            scale: 1.0,
        });
        let _ = std::fs::remove_file(&path);
        assert!(result.is_ok());
    }
}
