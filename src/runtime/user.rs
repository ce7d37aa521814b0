//! User interaction operations (confirmation prompts).

use anyhow::Result;

use super::RealRuntime;

use std::io::{self, BufRead, Write};

/// Ask `prompt` on `output` and read one answer line from `input`.
///
/// Only `y`/`yes` (any case, surrounding whitespace ignored) confirm.
/// End of input counts as a refusal.
pub(crate) fn confirm_with_io<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(output)?;
        return Ok(false);
    }

    let response = line.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}

impl RealRuntime {
    pub(crate) fn confirm_impl(&self, prompt: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut stdin_lock = stdin.lock();
        confirm_with_io(prompt, &mut stdin_lock, &mut stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::confirm_with_io;
    use anyhow::Result;
    use std::io::Cursor;

    #[test]
    fn confirms_yes_and_short_y() -> Result<()> {
        for case in ["y\n", "Y\n", "yes\n", " YES \n", "  y  \n"] {
            let mut input = Cursor::new(case.as_bytes());
            let mut output = Vec::new();
            let ok = confirm_with_io("Is that OK?", &mut input, &mut output)?;
            assert!(ok, "expected '{}' to be accepted as yes", case);
            assert!(String::from_utf8(output)?.contains("Is that OK? [y/N]"));
        }
        Ok(())
    }

    #[test]
    fn rejects_no_and_empty() -> Result<()> {
        for case in ["n\n", "N\n", "no\n", "\n", "  \n", "yep\n"] {
            let mut input = Cursor::new(case.as_bytes());
            let mut output = Vec::new();
            let ok = confirm_with_io("Is that OK?", &mut input, &mut output)?;
            assert!(!ok, "expected '{}' to be rejected as no", case);
        }
        Ok(())
    }

    #[test]
    fn end_of_input_is_a_refusal() -> Result<()> {
        let mut input = Cursor::new(b"");
        let mut output = Vec::new();
        assert!(!confirm_with_io("Remove?", &mut input, &mut output)?);
        assert_eq!(String::from_utf8(output)?, "Remove? [y/N] \n");
        Ok(())
    }
}
