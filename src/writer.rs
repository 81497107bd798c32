//! JSON text output.
//!
//! Records are rendered either compact or pretty into a caller-owned,
//! reusable byte buffer. The pretty form indents objects by four spaces but
//! keeps arrays on a single line, so generated records never contain raw
//! newlines inside values and the newline stays usable as the sole record
//! delimiter.

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, Serializer};
use serde_json::Value;
use std::io;

use crate::error::Result;
use crate::generator::GeneratorOptions;

/// Writes JSON values as text, compact or pretty, with an optional
/// terminator byte after each record.
#[derive(Debug, Clone)]
pub struct JsonWriter {
    pretty: bool,
    whitespace: bool,
    whitespace_char: u8,
}

impl JsonWriter {
    pub fn new(pretty: bool, whitespace: bool, whitespace_char: u8) -> Self {
        Self {
            pretty,
            whitespace,
            whitespace_char,
        }
    }

    pub fn from_options(options: &GeneratorOptions) -> Self {
        Self::new(options.pretty, options.whitespace, options.whitespace_char)
    }

    /// Append `value` as JSON text to `out`, followed by the terminator when
    /// whitespace is enabled.
    pub fn write(&self, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        if self.pretty {
            let mut ser = Serializer::with_formatter(&mut *out, SingleLineArrayFormatter::new());
            value.serialize(&mut ser)?;
        } else {
            let mut ser = Serializer::with_formatter(&mut *out, CompactFormatter);
            value.serialize(&mut ser)?;
        }
        if self.whitespace {
            out.push(self.whitespace_char);
        }
        Ok(())
    }
}

/// Pretty formatter with four-space indentation that renders arrays on a
/// single line.
struct SingleLineArrayFormatter {
    current_indent: usize,
    has_value: bool,
}

impl SingleLineArrayFormatter {
    fn new() -> Self {
        Self {
            current_indent: 0,
            has_value: false,
        }
    }
}

fn indent<W: ?Sized + io::Write>(writer: &mut W, n: usize) -> io::Result<()> {
    for _ in 0..n {
        writer.write_all(b"    ")?;
    }
    Ok(())
}

impl Formatter for SingleLineArrayFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.has_value = false;
        writer.write_all(b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if !first {
            writer.write_all(b", ")?;
        }
        Ok(())
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.current_indent += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.current_indent -= 1;
        if self.has_value {
            writer.write_all(b"\n")?;
            indent(writer, self.current_indent)?;
        }
        writer.write_all(b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            writer.write_all(b"\n")?;
        } else {
            writer.write_all(b",\n")?;
        }
        indent(writer, self.current_indent)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }
}
