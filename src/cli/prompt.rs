//! Interactive confirmation

use std::io::{self, BufRead, Write};

/// Ask whether to go ahead with the printed plan
///
/// Prompts once, then reads answers until a single `y` or `n` (any case).
/// Longer answers print a hint to `err`; empty ones are ignored. End of
/// input counts as `n`.
pub fn confirm(
    input: &mut impl BufRead,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<bool> {
    writeln!(out, "\nContinue Y/N ?")?;
    out.flush()?;

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        let answer = line.trim_end_matches(['\r', '\n']).to_lowercase();
        if answer.chars().count() > 1 {
            writeln!(err, "Please enter Y or N")?;
            continue;
        }
        match answer.as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => continue,
        }
    }
}
