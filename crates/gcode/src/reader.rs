//! G-code field dispatcher.
//!
//! [`GCodeReader`] turns a line of fields (`<letter><value>` pairs) into
//! either a geometric target handed to [`Locator`]/[`Elevator`]/the
//! extruder [`Stepper`], or — in [`GCodeReader::simulate_line`] — an
//! update to a shadow bounding-box [`Description`], without touching any
//! hardware at all. Both modes share the same field-accumulation; only
//! what happens to a linear move differs.
use crate::line_parser::{is_digit, FieldReader, LineParser};
use io_support::CharacterStream;
use motion::diag::{self, ErrorCode};
use motion::elevator::Elevator;
use motion::hal::GpioPort;
use motion::locator::Locator;
use motion::stepper::Stepper;
use motion::vec2::Vec2;

/// Mechanical reduction: sub-steps per millimetre.
const STEPS_PER_MM_NUM: i64 = 5000;
const STEPS_PER_MM_DEN: i64 = 56;
const MM_PER_INCH: f32 = 25.4;

/// Outcome of processing a single input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The line was fully processed and no geometric move is pending.
    Idle,
    /// A move was issued; the caller must keep ticking the relevant axis
    /// (Locator and/or Elevator) until it reports arrival before calling
    /// into the reader again.
    Busy,
    /// The stream had no complete line available.
    NoInput,
}

#[derive(Debug, Clone, Copy, Default)]
struct Fields {
    g: Option<i64>,
    m: Option<i64>,
    x: Option<f32>,
    y: Option<f32>,
    z: Option<f32>,
    a: Option<f32>,
    e: Option<f32>,
    f: Option<f32>,
    p: Option<f32>,
    s: Option<f32>,
}

impl Fields {
    fn has_axis(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some() || self.a.is_some() || self.e.is_some() || self.f.is_some()
    }
}

/// Bounding box and endpoints accumulated over a pre-simulated path, in
/// sub-steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Description {
    pub min: Vec2,
    pub max: Vec2,
    pub start: Vec2,
    pub end: Vec2,
}

impl Default for Description {
    fn default() -> Self {
        // The path starts at the origin before any move is simulated, so
        // the bounding box is seeded there rather than at the first move's
        // endpoint.
        Description {
            min: Vec2::new(0, 0),
            max: Vec2::new(0, 0),
            start: Vec2::new(0, 0),
            end: Vec2::new(0, 0),
        }
    }
}

impl Description {
    fn accumulate(&mut self, p: Vec2) {
        self.min = Vec2::new(self.min.x.min(p.x), self.min.y.min(p.y));
        self.max = Vec2::new(self.max.x.max(p.x), self.max.y.max(p.y));
        self.end = p;
    }
}

/// Modal G-code interpreter. Holds no actuator references itself —
/// [`GCodeReader::next_line`] takes the Locator/Elevator/extruder it
/// should drive for that one line, so the same reader can run in
/// [`GCodeReader::simulate_line`] mode with nothing wired up at all.
pub struct GCodeReader {
    last_g: Option<i64>,
    absolute: bool,
    metric: bool,
    scale: f32,
    x_target: i64,
    y_target: i64,
    description: Description,
}

impl Default for GCodeReader {
    fn default() -> Self {
        GCodeReader {
            last_g: None,
            absolute: true,
            metric: true,
            scale: 1.0,
            x_target: 0,
            y_target: 0,
            description: Description::default(),
        }
    }
}

impl GCodeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(&self) -> Description {
        self.description
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn to_sub_steps(&self, value: f32) -> i64 {
        let mm = if self.metric { value } else { value * MM_PER_INCH };
        let scaled = mm * self.scale * STEPS_PER_MM_NUM as f32 / STEPS_PER_MM_DEN as f32;
        round_half_away_from_zero(scaled)
    }

    fn resolve_axis(&self, current_target: i64, field_value: f32) -> i64 {
        let sub_steps = self.to_sub_steps(field_value);
        if self.absolute {
            sub_steps
        } else {
            current_target + sub_steps
        }
    }

    /// Read one line's worth of fields. `;` starts a line comment that
    /// runs the rest of the line is discarded.
    fn read_fields<R: FieldReader>(&mut self, r: &mut R) -> Fields {
        let mut fields = Fields::default();
        loop {
            let letter = match r.full_peek() {
                Some(b';') => {
                    r.skip();
                    break;
                }
                Some(b) if b.is_ascii_alphabetic() || b == b'*' => r.read_full_char().unwrap(),
                Some(_) => {
                    r.read_full_char();
                    continue;
                }
                None => break,
            };
            let has_value = matches!(r.full_peek(), Some(b) if is_digit(b) || b == b'-' || b == b'.');
            let value = if has_value { r.read_float() } else { 0.0 };
            match letter.to_ascii_uppercase() {
                b'G' => fields.g = Some(value as i64),
                b'M' => fields.m = Some(value as i64),
                b'X' => fields.x = Some(value),
                b'Y' => fields.y = Some(value),
                b'Z' => fields.z = Some(value),
                b'A' => fields.a = Some(value),
                b'E' => fields.e = Some(value),
                b'F' => fields.f = Some(value),
                b'P' => fields.p = Some(value),
                b'S' => fields.s = Some(value),
                b'T' | b'I' | b'J' | b'D' | b'H' | b'R' | b'Q' | b'N' | b'*' => {}
                _ => diag::raise(ErrorCode::InvalidGCode),
            }
            if !r.available() {
                break;
            }
        }
        fields
    }

    /// The modal G number this line should dispatch under: an explicit
    /// `G` field, or (only when an axis letter was seen and no `G`/`M`
    /// prefixed it) the last one seen.
    fn modal_g(&mut self, fields: &Fields) -> Option<i64> {
        if let Some(g) = fields.g {
            self.last_g = Some(g);
            return Some(g);
        }
        if fields.m.is_none() && fields.has_axis() {
            return self.last_g;
        }
        None
    }

    /// Process one line without touching any hardware, accumulating the
    /// path's bounding box into [`GCodeReader::description`].
    pub fn simulate_line<S: CharacterStream>(&mut self, stream: &mut S) -> Outcome {
        if !stream.available() {
            return Outcome::NoInput;
        }
        let mut lp = LineParser::new(stream);
        let fields = self.read_fields(&mut lp);
        match self.modal_g(&fields) {
            Some(0) | Some(1) if fields.x.is_some() || fields.y.is_some() => {
                if let Some(x) = fields.x {
                    self.x_target = self.resolve_axis(self.x_target, x);
                }
                if let Some(y) = fields.y {
                    self.y_target = self.resolve_axis(self.y_target, y);
                }
                self.description.accumulate(Vec2::new(self.x_target, self.y_target));
            }
            Some(20) => self.metric = false,
            Some(21) => self.metric = true,
            Some(90) => self.absolute = true,
            Some(91) => self.absolute = false,
            _ => {}
        }
        Outcome::Idle
    }

    /// Process one line, dispatching moves into the given axes.
    pub fn next_line<S, P>(
        &mut self,
        stream: &mut S,
        locator: &mut Locator<'_, P>,
        elevator: &mut Elevator<'_, P>,
        extruder: &mut Stepper<P>,
    ) -> Outcome
    where
        S: CharacterStream,
        P: GpioPort,
    {
        if !stream.available() {
            return Outcome::NoInput;
        }
        let mut lp = LineParser::new(stream);
        let fields = self.read_fields(&mut lp);
        self.exec_command(&fields, locator, elevator, extruder)
    }

    fn exec_command<P: GpioPort>(
        &mut self,
        fields: &Fields,
        locator: &mut Locator<'_, P>,
        elevator: &mut Elevator<'_, P>,
        extruder: &mut Stepper<P>,
    ) -> Outcome {
        if fields.m.is_some() {
            // accepted, not implemented: M-codes never issue a move.
            return Outcome::Idle;
        }

        match self.modal_g(fields) {
            Some(0) | Some(1) => self.exec_move(fields, locator, elevator, extruder),
            Some(2) | Some(3) => Outcome::Idle,
            Some(4) => {
                self.exec_dwell(fields);
                Outcome::Idle
            }
            Some(20) => {
                self.metric = false;
                Outcome::Idle
            }
            Some(21) => {
                self.metric = true;
                Outcome::Idle
            }
            Some(28) => {
                self.exec_home();
                Outcome::Idle
            }
            Some(90) => {
                self.absolute = true;
                Outcome::Idle
            }
            Some(91) => {
                self.absolute = false;
                Outcome::Idle
            }
            Some(92) => {
                self.exec_origin_reset(fields, locator, elevator);
                Outcome::Idle
            }
            Some(_) => {
                diag::raise(ErrorCode::InvalidGCode);
                Outcome::Idle
            }
            None => Outcome::Idle,
        }
    }

    #[cfg(feature = "std")]
    fn exec_dwell(&mut self, fields: &Fields) {
        let duration = if let Some(p) = fields.p {
            if p < 15.0 {
                std::time::Duration::from_micros((p * 1000.0).max(0.0) as u64)
            } else {
                std::time::Duration::from_millis(p.max(0.0) as u64)
            }
        } else if let Some(s) = fields.s {
            std::time::Duration::from_secs_f32(s.max(0.0))
        } else {
            std::time::Duration::from_millis(0)
        };
        std::thread::sleep(duration);
    }

    #[cfg(not(feature = "std"))]
    fn exec_dwell(&mut self, _fields: &Fields) {
        diag::raise(ErrorCode::CmdUnsupported);
    }

    #[cfg(feature = "std")]
    fn exec_home(&mut self) {
        tracing::warn!("G28 homing not implemented");
    }

    #[cfg(not(feature = "std"))]
    fn exec_home(&mut self) {
        diag::raise(ErrorCode::CmdUnsupported);
    }

    fn exec_move<P: GpioPort>(
        &mut self,
        fields: &Fields,
        locator: &mut Locator<'_, P>,
        elevator: &mut Elevator<'_, P>,
        extruder: &mut Stepper<P>,
    ) -> Outcome {
        let mut busy = false;

        if let Some(e) = fields.e {
            let relative = self.to_sub_steps(e);
            extruder.move_to_freq(if relative >= 0 { 10 } else { -10 });
        } else if let Some(a) = fields.a {
            let absolute = self.to_sub_steps(a);
            let relative = absolute - extruder.value();
            extruder.move_to_freq(if relative >= 0 { 10 } else { -10 });
        }

        let mut target = locator.target();
        let mut has_xy = false;
        if let Some(x) = fields.x {
            let new_x = self.resolve_axis(target.x, x);
            if new_x != target.x {
                target.x = new_x;
                has_xy = true;
            }
        }
        if let Some(y) = fields.y {
            let new_y = self.resolve_axis(target.y, y);
            if new_y != target.y {
                target.y = new_y;
                has_xy = true;
            }
        }
        if has_xy {
            locator.set_target(target, true);
            busy = true;
        }

        if let Some(z) = fields.z {
            let current_target = elevator.target();
            let new_target = self.resolve_axis(current_target, z);
            if new_target != current_target {
                elevator.set_target(new_target);
                busy = true;
            }
        }

        if busy {
            Outcome::Busy
        } else {
            Outcome::Idle
        }
    }

    fn exec_origin_reset<P: GpioPort>(
        &mut self,
        fields: &Fields,
        locator: &mut Locator<'_, P>,
        elevator: &mut Elevator<'_, P>,
    ) {
        let none_named = fields.x.is_none() && fields.y.is_none() && fields.z.is_none();
        if let Some(x) = fields.x {
            let value = self.to_sub_steps(x);
            locator.reset_x(value);
            self.x_target = value;
        } else if none_named {
            locator.reset_x(0);
            self.x_target = 0;
        }
        if let Some(y) = fields.y {
            let value = self.to_sub_steps(y);
            locator.reset_y(value);
            self.y_target = value;
        } else if none_named {
            locator.reset_y(0);
            self.y_target = 0;
        }
        if let Some(z) = fields.z {
            elevator.reset_z(self.to_sub_steps(z));
        } else if none_named {
            elevator.reset_z(0);
        }
    }
}

fn round_half_away_from_zero(v: f32) -> i64 {
    if v >= 0.0 {
        (v + 0.5) as i64
    } else {
        (v - 0.5) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Debug, Default, Clone, Copy)]
    struct NullPort;

    impl GpioPort for NullPort {
        type Error = Infallible;
        fn set_step(&mut self, _high: bool) -> Result<(), Self::Error> {
            Ok(())
        }
        fn set_dir(&mut self, _high: bool) -> Result<(), Self::Error> {
            Ok(())
        }
        fn set_microstep(&mut self, _ms1: bool, _ms2: bool, _ms3: bool) -> Result<(), Self::Error> {
            Ok(())
        }
        fn set_enable(&mut self, _enabled: bool) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn axis(ident: char) -> Stepper<NullPort> {
        let mut s = Stepper::new(NullPort::default(), ident, true);
        s.reset();
        s
    }

    struct Fixed<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> CharacterStream for Fixed<'a> {
        fn available(&mut self) -> bool {
            self.pos < self.data.len()
        }
        fn read(&mut self) -> Option<u8> {
            let b = self.peek();
            if b.is_some() {
                self.pos += 1;
            }
            b
        }
        fn peek(&mut self) -> Option<u8> {
            self.data.get(self.pos).copied()
        }
    }

    #[test]
    fn simulate_tracks_bounding_box_over_two_moves() {
        let mut reader = GCodeReader::new();
        let mut stream = Fixed {
            data: b"G1 X10 Y0\nG1 X10 Y20\n",
            pos: 0,
        };
        while reader.simulate_line(&mut stream) != Outcome::NoInput {}
        let d = reader.description();
        assert_eq!(d.start, Vec2::new(0, 0));
        assert!(d.max.y > d.min.y);
    }

    #[test]
    fn simulate_seeds_the_bounding_box_at_the_origin() {
        let mut reader = GCodeReader::new();
        let mut stream = Fixed {
            data: b"G90\nG1 X10 Y0\nG1 X10 Y20\nG91\nG1 X-5\n",
            pos: 0,
        };
        while reader.simulate_line(&mut stream) != Outcome::NoInput {}
        let d = reader.description();
        assert_eq!(d.start, Vec2::new(0, 0));
        assert_eq!(d.min, Vec2::new(0, 0));
    }

    #[test]
    fn simulate_ignores_a_trailing_comment() {
        let mut reader = GCodeReader::new();
        let mut stream = Fixed {
            data: b"G1 X10 ; go right\n",
            pos: 0,
        };
        reader.simulate_line(&mut stream);
        assert_eq!(reader.description().end.x, reader.to_sub_steps(10.0));
    }

    #[test]
    fn g1_with_xy_issues_a_locator_target() {
        let mut x = axis('x');
        let mut y = axis('y');
        let mut z = axis('z');
        let mut e = axis('e');
        let mut locator = Locator::new(&mut x, &mut y);
        let mut elevator = Elevator::new(&mut z);
        let mut reader = GCodeReader::new();
        let mut stream = Fixed {
            data: b"G1 X10 Y10\n",
            pos: 0,
        };
        let outcome = reader.next_line(&mut stream, &mut locator, &mut elevator, &mut e);
        assert_eq!(outcome, Outcome::Busy);
        assert!(locator.has_target());
    }

    #[test]
    fn axis_letters_alone_redispatch_the_modal_g() {
        let mut x = axis('x');
        let mut y = axis('y');
        let mut z = axis('z');
        let mut e = axis('e');
        let mut locator = Locator::new(&mut x, &mut y);
        let mut elevator = Elevator::new(&mut z);
        let mut reader = GCodeReader::new();
        let mut stream = Fixed {
            data: b"G1 X10 Y10\nX20 Y20\n",
            pos: 0,
        };
        reader.next_line(&mut stream, &mut locator, &mut elevator, &mut e);
        let outcome = reader.next_line(&mut stream, &mut locator, &mut elevator, &mut e);
        assert_eq!(outcome, Outcome::Busy);
        assert_eq!(locator.target(), Vec2::new(reader.to_sub_steps(20.0), reader.to_sub_steps(20.0)));
    }

    #[test]
    fn m_codes_are_accepted_but_never_busy() {
        let mut x = axis('x');
        let mut y = axis('y');
        let mut z = axis('z');
        let mut e = axis('e');
        let mut locator = Locator::new(&mut x, &mut y);
        let mut elevator = Elevator::new(&mut z);
        let mut reader = GCodeReader::new();
        let mut stream = Fixed {
            data: b"M117 hello\n",
            pos: 0,
        };
        let outcome = reader.next_line(&mut stream, &mut locator, &mut elevator, &mut e);
        assert_eq!(outcome, Outcome::Idle);
    }

    #[test]
    fn g92_resets_the_named_axis_only() {
        let mut x = axis('x');
        let mut y = axis('y');
        let mut z = axis('z');
        let mut e = axis('e');
        x.reset_position(500);
        let mut locator = Locator::new(&mut x, &mut y);
        let mut elevator = Elevator::new(&mut z);
        let mut reader = GCodeReader::new();
        let mut stream = Fixed { data: b"G92 X0\n", pos: 0 };
        reader.next_line(&mut stream, &mut locator, &mut elevator, &mut e);
        assert_eq!(locator.value().x, 0);
    }

    #[test]
    fn g92_sets_the_named_axis_to_the_commanded_value() {
        let mut x = axis('x');
        let mut y = axis('y');
        let mut z = axis('z');
        let mut e = axis('e');
        let mut locator = Locator::new(&mut x, &mut y);
        let mut elevator = Elevator::new(&mut z);
        let mut reader = GCodeReader::new();
        let mut stream = Fixed { data: b"G92 X50\n", pos: 0 };
        reader.next_line(&mut stream, &mut locator, &mut elevator, &mut e);
        assert_eq!(locator.value().x, reader.to_sub_steps(50.0));
        assert_eq!(locator.value().y, 0);
    }
}
