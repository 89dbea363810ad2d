//! Interactive prompts.
//!
//! Everything the exporter asks the user goes through [`Console`], so the flow
//! can be driven from a terminal or from any line-oriented reader.

use chrono::{Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use dialoguer::Password;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

use crate::error::ExportError;

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const START_OF_DAY: &str = "00:00:00";
pub const END_OF_DAY: &str = "23:59:59";

pub trait Console {
    /// Shows `prompt` and returns the answer without its line terminator.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Like [`Console::read_line`] but without echoing the answer where possible.
    fn read_password(&mut self, prompt: &str) -> io::Result<String>;

    fn print(&mut self, text: &str) -> io::Result<()>;
}

/// Console over any reader/writer pair. Passwords are read as plain lines.
pub struct LineConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Console for LineConsole<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed while waiting for an answer"));
        }
        Ok(line.trim_end_matches(&['\n', '\r'][..]).to_string())
    }

    fn read_password(&mut self, prompt: &str) -> io::Result<String> {
        self.read_line(&format!("{}: ", prompt))
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }
}

/// The process terminal. Passwords are read with echo disabled.
pub struct Terminal {
    lines: LineConsole<StdinLock<'static>, Stdout>,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            lines: LineConsole::new(io::stdin().lock(), io::stdout()),
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for Terminal {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.lines.read_line(prompt)
    }

    fn read_password(&mut self, prompt: &str) -> io::Result<String> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(io::Error::other)
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        self.lines.print(text)
    }
}

/// Parses a `DD/MM/YYYY` date.
pub fn parse_date(input: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(input, DATE_FORMAT)
}

pub fn parse_time_of_day(input: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(input, TIME_FORMAT)
}

/// Unix milliseconds of `date_time` read as a local time in `tz`, truncated to whole seconds.
///
/// Ambiguous local times resolve to the earlier instant. A time skipped by a
/// forward DST jump is read with the offset in force just before the jump.
pub fn local_timestamp_ms<Tz: TimeZone>(tz: &Tz, date_time: NaiveDateTime) -> Option<i64> {
    let resolved = match tz.from_local_datetime(&date_time) {
        LocalResult::Single(resolved) => resolved,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let before_gap = date_time.checked_sub_signed(Duration::hours(1))?;
            tz.from_local_datetime(&before_gap).earliest()? + Duration::hours(1)
        }
    };
    Some(resolved.timestamp() * 1000)
}

/// Asks for a date until it parses, then combines it with `time_of_day` in `tz`.
pub fn prompt_timestamp<C, Tz>(console: &mut C, tz: &Tz, title: &str, time_of_day: &str) -> Result<i64, ExportError>
where
    C: Console + ?Sized,
    Tz: TimeZone,
{
    console.print(&format!("\n{}", title))?;

    let date = loop {
        let answer = console.read_line("\nEnter the date (format DD/MM/YYYY): ")?;
        match parse_date(&answer) {
            Ok(date) => break date,
            Err(_) => console.print("Invalid date. Please enter in the format DD/MM/YYYY.")?,
        }
    };

    let time = parse_time_of_day(time_of_day)
        .map_err(|e| ExportError::Timestamp(format!("'{}' is not a valid time of day: {}", time_of_day, e)))?;
    let date_time = date.and_time(time);

    console.print(&format!("{} = {}", title, date_time.format("%Y-%m-%d %H:%M:%S")))?;

    local_timestamp_ms(tz, date_time)
        .ok_or_else(|| ExportError::Timestamp(format!("{} does not exist in the local timezone", date_time)))
}
