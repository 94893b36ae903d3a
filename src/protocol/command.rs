//! Command parsing
//!
//! A command line is a verb followed by whitespace-separated arguments.
//! Numeric arguments are lenient: a token is read up to its first non-digit
//! and anything unreadable counts as zero, clamped into the target type.

/// Known verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Present,
    Clear,
    Print,
    ChangeCell,
    GetCell,
    Width,
    Height,
    SetCursor,
    SetInputMode,
    SetOutputMode,
    SetClearAttributes,
    DebugSendEvent,
    Shutdown,
}

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl Verb {
    pub fn parse(word: &str) -> Option<Self> {
        let verb = match word {
            "present" => Verb::Present,
            "clear" => Verb::Clear,
            "print" => Verb::Print,
            "change_cell" => Verb::ChangeCell,
            "get_cell" => Verb::GetCell,
            "width" => Verb::Width,
            "height" => Verb::Height,
            "set_cursor" => Verb::SetCursor,
            "set_input_mode" => Verb::SetInputMode,
            "set_output_mode" => Verb::SetOutputMode,
            "set_clear_attributes" => Verb::SetClearAttributes,
            "DEBUG_SEND_EVENT" => Verb::DebugSendEvent,
            "shutdown" => Verb::Shutdown,
            _ => return None,
        };
        Some(verb)
    }

    /// Name used in `invalid_args_<name>` errors
    pub fn name(self) -> &'static str {
        match self {
            Verb::Present => "present",
            Verb::Clear => "clear",
            Verb::Print => "print",
            Verb::ChangeCell => "change_cell",
            Verb::GetCell => "get_cell",
            Verb::Width => "width",
            Verb::Height => "height",
            Verb::SetCursor => "set_cursor",
            Verb::SetInputMode => "set_input_mode",
            Verb::SetOutputMode => "set_output_mode",
            Verb::SetClearAttributes => "set_clear_attributes",
            Verb::DebugSendEvent => "debug_send_event",
            Verb::Shutdown => "shutdown",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Verb::Present | Verb::Clear | Verb::Width | Verb::Height | Verb::Shutdown => {
                Arity::Exactly(0)
            }
            Verb::Print => Arity::AtLeast(5),
            Verb::ChangeCell => Arity::Exactly(5),
            Verb::GetCell | Verb::SetCursor | Verb::SetClearAttributes => Arity::Exactly(2),
            Verb::SetInputMode | Verb::SetOutputMode => Arity::Exactly(1),
            Verb::DebugSendEvent => Arity::Exactly(8),
        }
    }
}

/// One parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub verb: &'a str,
    pub args: Vec<&'a str>,
}

impl<'a> Command<'a> {
    /// Split a line into verb and arguments; `None` for a blank line.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_ascii_whitespace();
        let verb = tokens.next()?;
        Some(Self {
            verb,
            args: tokens.collect(),
        })
    }

    /// Arguments from `start` on, joined with single spaces
    pub fn text_from(&self, start: usize) -> String {
        self.args.get(start..).map(|rest| rest.join(" ")).unwrap_or_default()
    }

    pub fn int(&self, index: usize) -> i32 {
        self.number(index).clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    pub fn u32(&self, index: usize) -> u32 {
        self.number(index).clamp(0, u32::MAX as i64) as u32
    }

    pub fn u16(&self, index: usize) -> u16 {
        self.number(index).clamp(0, u16::MAX as i64) as u16
    }

    pub fn u8(&self, index: usize) -> u8 {
        self.number(index).clamp(0, u8::MAX as i64) as u8
    }

    fn number(&self, index: usize) -> i64 {
        self.args.get(index).map_or(0, |token| parse_lenient(token))
    }
}

/// Read an optional sign and leading decimal digits, saturating on overflow.
pub fn parse_lenient(token: &str) -> i64 {
    let bytes = token.as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let mut value: i64 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        let digit = (b - b'0') as i64;
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    value
}
