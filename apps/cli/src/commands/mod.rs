pub mod check;
pub mod demo;

use std::io::Write;

use serde_json::Value;

/// Writes `value` to stdout as pretty JSON.
pub(crate) fn print_json(value: &Value) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
