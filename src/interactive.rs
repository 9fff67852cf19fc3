//! Menu-driven interactive session
//!
//! Prompts for a mode, a file and a passphrase in a loop, running one
//! file operation per round. Input and output are generic so the session
//! can be driven from tests as well as from a terminal.

use crate::error::{EncError, Result};
use crate::file_ops;
use crate::passphrase::PassphraseReader;
use std::error::Error as StdError;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Encrypt,
    Decrypt,
}

/// Run the interactive loop until the user quits or `input` reaches EOF.
///
/// Failures of individual operations are reported to `output` and the loop
/// continues. Only I/O errors on `input`/`output` themselves end the
/// session with an error.
pub fn run_interactive<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    say(&mut output, "--- AES-256 (CBC) file encryption ---")?;

    loop {
        let Some(choice) = prompt(
            &mut input,
            &mut output,
            "Choose mode: (1) encrypt, (2) decrypt, (q) quit: ",
        )?
        else {
            break;
        };

        let mode = match choice.to_lowercase().as_str() {
            "q" => {
                say(&mut output, "Goodbye.")?;
                break;
            }
            "1" => Mode::Encrypt,
            "2" => Mode::Decrypt,
            _ => {
                say(&mut output, "Invalid choice.")?;
                continue;
            }
        };

        let Some(file) = prompt(&mut input, &mut output, "File name (e.g. 'data.csv'): ")? else {
            break;
        };
        let path = Path::new(&file);
        if !path.is_file() {
            say(&mut output, &format!("Error: file '{}' not found.", file))?;
            continue;
        }

        let message = match run_one(mode, path, passphrase_reader) {
            Ok(out_path) => format!(
                "Success! '{}' {} to '{}'.",
                path.display(),
                match mode {
                    Mode::Encrypt => "encrypted",
                    Mode::Decrypt => "decrypted",
                },
                out_path.display()
            ),
            Err(e) => format!("Error: {}", error_chain(&e)),
        };
        say(&mut output, &message)?;
        say(&mut output, &"-".repeat(40))?;
    }

    Ok(())
}

fn run_one(
    mode: Mode,
    path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<PathBuf> {
    let out_path = match mode {
        Mode::Encrypt => file_ops::default_encrypt_output(path),
        Mode::Decrypt => file_ops::default_decrypt_output(path)?,
    };

    match mode {
        Mode::Encrypt => file_ops::encrypt_file(path, &out_path, passphrase_reader)?,
        Mode::Decrypt => file_ops::decrypt_file(path, &out_path, passphrase_reader)?,
    }
    Ok(out_path)
}

/// Joins an error and its sources as `outer: inner: innermost`.
fn error_chain(err: &EncError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Write `message` as a prompt and read one trimmed line. `None` on EOF.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    message: &str,
) -> Result<Option<String>> {
    output
        .write_all(message.as_bytes())
        .and_then(|()| output.flush())
        .map_err(|e| EncError::io("failed to write prompt", e))?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| EncError::io("failed to read input", e))?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn say<W: Write>(output: &mut W, message: &str) -> Result<()> {
    writeln!(output, "{}", message).map_err(|e| EncError::io("failed to write output", e))
}
