use std::io::{self, Write};

use serde_json::Value;

/// Pretty-print the computation envelope to stdout.
pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_json(&mut stdout.lock(), value) {
        log::error!("failed to write JSON output: {e}");
    }
}

/// Pretty JSON followed by a trailing newline.
fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
