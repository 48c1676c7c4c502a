//! Sticky, allocation-free diagnostic channel.
//!
//! The motion core runs in places that cannot afford a `Result`-returning
//! call chain all the way up to whatever reports errors to the operator
//! (an interrupt context, a tight tick loop). Instead, any module that hits
//! an invalid condition raises an [`ErrorCode`] into a single global cell.
//! The cell only ever holds the first unreported error: once something is
//! sitting there, further `raise` calls are dropped until the current one
//! is `take`n out. This mirrors the "first fault wins" latch used for the
//! emergency-stop flag in the firmware safety monitor.
use core::sync::atomic::{AtomicI8, Ordering};

/// Numeric error codes, stable across the whole crate family (host, gcode,
/// firmware). Values are part of the wire/storage contract and must not be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum ErrorCode {
    None = 0,
    Parse = 1,
    State = 2,
    Input = 3,
    FileUnavailable = 4,
    CmdUnsupported = 5,
    InvalidMsMode = 6,
    InvalidMsSteps = 7,
    InvalidStepper = 8,
    InvalidAccessor = 9,
    InvalidRounding = 10,
    InvalidSettings = 11,
    InvalidGCode = 12,
    FileProcState = 13,
    BoundaryType = 14,
    MissingRange = 15,
    InvalidDeltaF = 16,
    MaxListeners = 17,
}

impl ErrorCode {
    fn from_raw(raw: i8) -> Option<Self> {
        Some(match raw {
            0 => ErrorCode::None,
            1 => ErrorCode::Parse,
            2 => ErrorCode::State,
            3 => ErrorCode::Input,
            4 => ErrorCode::FileUnavailable,
            5 => ErrorCode::CmdUnsupported,
            6 => ErrorCode::InvalidMsMode,
            7 => ErrorCode::InvalidMsSteps,
            8 => ErrorCode::InvalidStepper,
            9 => ErrorCode::InvalidAccessor,
            10 => ErrorCode::InvalidRounding,
            11 => ErrorCode::InvalidSettings,
            12 => ErrorCode::InvalidGCode,
            13 => ErrorCode::FileProcState,
            14 => ErrorCode::BoundaryType,
            15 => ErrorCode::MissingRange,
            16 => ErrorCode::InvalidDeltaF,
            17 => ErrorCode::MaxListeners,
            _ => return None,
        })
    }
}

#[cfg(feature = "std")]
impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, *self as i8)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ErrorCode {}

// -1 means "an error was reported and already consumed"; 0 means "no
// error pending"; any positive value is a pending `ErrorCode`.
static LAST_ERROR: AtomicI8 = AtomicI8::new(0);

/// Report an error code. The first call after the cell was last drained
/// wins; later calls are ignored until [`take`] clears it. Raising
/// `ErrorCode::None` is a no-op.
pub fn raise(code: ErrorCode) {
    let raw = code as i8;
    if raw == 0 {
        return;
    }
    let _ = LAST_ERROR.compare_exchange(0, raw, Ordering::SeqCst, Ordering::SeqCst);
}

/// Drain the pending error, if any, leaving the cell marked as already
/// reported.
pub fn take() -> Option<ErrorCode> {
    let raw = LAST_ERROR.swap(-1, Ordering::SeqCst);
    if raw <= 0 {
        None
    } else {
        ErrorCode::from_raw(raw)
    }
}

/// Reset the cell to "no error pending". Intended for test isolation.
pub fn clear() {
    LAST_ERROR.store(0, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_sticks_until_taken() {
        let _guard = crate::diag::test_lock().lock().unwrap();
        clear();
        raise(ErrorCode::Parse);
        raise(ErrorCode::Input);
        assert_eq!(take(), Some(ErrorCode::Parse));
        assert_eq!(take(), None);
    }

    #[test]
    fn none_is_a_no_op() {
        let _guard = crate::diag::test_lock().lock().unwrap();
        clear();
        raise(ErrorCode::None);
        assert_eq!(take(), None);
    }
}

/// Serializes tests across this crate that exercise the global diagnostic
/// cell, since it is shared process-wide state.
#[cfg(all(test, feature = "std"))]
pub(crate) fn test_lock() -> &'static std::sync::Mutex<()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    &LOCK
}
