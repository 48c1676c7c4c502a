//! Bridges the motion core's sticky diagnostic cell to an external sink.

use motion::ErrorCode;

/// Consumes [`ErrorCode`]s reported by the motion core. Implementations
/// decide where a diagnosed error goes (stderr, a log file, a status LED);
/// the core itself never blocks on or retries a report.
pub trait ErrorSink {
    fn report(&mut self, code: ErrorCode);
}

#[cfg(feature = "std")]
pub struct TracingErrorSink;

#[cfg(feature = "std")]
impl ErrorSink for TracingErrorSink {
    fn report(&mut self, code: ErrorCode) {
        tracing::warn!(code = code as i8, "{}", code);
    }
}

/// Drains every pending diagnostic (there is at most one at a time, since
/// the cell is sticky) into `sink`. Call this once per control-loop
/// iteration.
pub fn drain(sink: &mut dyn ErrorSink) {
    while let Some(code) = motion::diag::take() {
        sink.report(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collect(Vec<ErrorCode>);
    impl ErrorSink for Collect {
        fn report(&mut self, code: ErrorCode) {
            self.0.push(code);
        }
    }

    #[test]
    fn drain_empties_the_cell() {
        motion::diag::clear();
        motion::diag::raise(ErrorCode::Parse);
        let mut c = Collect(Vec::new());
        drain(&mut c);
        assert_eq!(c.0, vec![ErrorCode::Parse]);
        let mut c2 = Collect(Vec::new());
        drain(&mut c2);
        assert!(c2.0.is_empty());
    }
}
