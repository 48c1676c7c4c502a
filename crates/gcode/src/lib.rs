//! Character-level line parsing and G-code field dispatch for the motion
//! core. Depends only on [`motion`] for the actuators it drives and
//! [`io_support`] for the input stream it reads from — no networking, no
//! file I/O of its own.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod line_parser;
pub mod reader;

pub use line_parser::{FieldReader, LineParser, Subline};
pub use reader::{Description, GCodeReader, Outcome};
