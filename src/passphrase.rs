//! Passphrase reading functionality

use crate::error::{EncError, ErrorCategory, ErrorKind, Result};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::{Zeroize, Zeroizing};

/// Trait for reading passphrases from various sources
pub trait PassphraseReader {
    /// Read a passphrase as UTF-8 text.
    ///
    /// Returns the passphrase wrapped in `Zeroizing` so it is wiped from
    /// memory when dropped.
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>>;
}

/// Read a passphrase and reject it if empty.
pub fn read_nonempty(reader: &mut dyn PassphraseReader) -> Result<Zeroizing<String>> {
    let passphrase = reader.read_passphrase()?;
    if passphrase.is_empty() {
        return Err(EncError::user(
            ErrorKind::EmptyPassphrase,
            "passphrase must not be empty",
        ));
    }
    Ok(passphrase)
}

/// Returns a fixed passphrase (for testing)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<String>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        Ok(self.passphrase.clone())
    }
}

/// Reads passphrase from any io::Read source
///
/// Consumes the source to EOF. A single trailing `\n` or `\r\n` is dropped,
/// so `echo secret | aes256enc --passphrase-stdin ...` does what one expects.
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader
            .read_to_end(&mut data)
            .map_err(|e| EncError::io("error reading passphrase", e))?;

        if data.last() == Some(&b'\n') {
            data.pop();
            if data.last() == Some(&b'\r') {
                data.pop();
            }
        }

        match String::from_utf8(std::mem::take(&mut *data)) {
            Ok(passphrase) => Ok(Zeroizing::new(passphrase)),
            Err(e) => {
                e.into_bytes().zeroize();
                Err(EncError::user(
                    ErrorKind::PassphraseUnavailable,
                    "passphrase is not valid UTF-8",
                ))
            }
        }
    }
}

/// Reads passphrase from terminal with no echo
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(EncError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read passphrase from terminal - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(b"Passphrase (aes256enc): ")
            .and_then(|()| stderr.flush())
            .map_err(|e| EncError::io("failed to write prompt", e))?;

        // Read password *without echo*
        let passphrase = rpassword::read_password().map_err(|e| {
            EncError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                "failure reading passphrase",
                e,
            )
        })?;

        Ok(Zeroizing::new(passphrase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_reader() {
        let mut reader = ConstantPassphraseReader::new("test123");
        assert_eq!(reader.read_passphrase().unwrap().as_str(), "test123");
        assert_eq!(reader.read_passphrase().unwrap().as_str(), "test123");
    }

    /// Tests the terminal reader. This is ignored by default and must be run
    /// explicitly and with human input:
    ///
    /// cargo test test_terminal_reader_interactive -- --ignored --nocapture
    #[test]
    #[ignore]
    fn test_terminal_reader_interactive() {
        let mut reader = TerminalPassphraseReader::new();
        println!("\nPlease enter a test passphrase:");
        let passphrase = reader.read_passphrase().unwrap();
        println!("You entered: {}", passphrase.as_str());
        assert!(!passphrase.is_empty(), "Expected non-empty passphrase");
    }

    #[test]
    fn test_reader_passphrase_reader() {
        let data = b"mypassword";
        let mut reader = ReaderPassphraseReader::new(Box::new(&data[..]));
        assert_eq!(reader.read_passphrase().unwrap().as_str(), "mypassword");
    }

    #[test]
    fn test_reader_strips_one_line_ending() {
        let mut reader = ReaderPassphraseReader::new(Box::new(&b"secret\n"[..]));
        assert_eq!(reader.read_passphrase().unwrap().as_str(), "secret");

        let mut reader = ReaderPassphraseReader::new(Box::new(&b"secret\r\n"[..]));
        assert_eq!(reader.read_passphrase().unwrap().as_str(), "secret");

        let mut reader = ReaderPassphraseReader::new(Box::new(&b"secret\n\n"[..]));
        assert_eq!(reader.read_passphrase().unwrap().as_str(), "secret\n");
    }

    #[test]
    fn test_reader_passphrase_reader_empty() {
        let data = b"";
        let mut reader = ReaderPassphraseReader::new(Box::new(&data[..]));
        assert_eq!(reader.read_passphrase().unwrap().as_str(), "");
    }

    #[test]
    fn test_reader_passphrase_reader_non_utf8() {
        let data: &[u8] = &[0xff, 0xfe, 0x00, 0x01];
        let mut reader = ReaderPassphraseReader::new(Box::new(data));
        let err = reader.read_passphrase().unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::PassphraseUnavailable));
    }

    struct FailingRead;

    impl Read for FailingRead {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device went away"))
        }
    }

    #[test]
    fn test_reader_error_not_repeated_in_message() {
        let mut reader = ReaderPassphraseReader::new(Box::new(FailingRead));
        let err = reader.read_passphrase().unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert_eq!(err.to_string(), "error reading passphrase");
        assert_eq!(
            err.source_error().map(|e| e.to_string()),
            Some("device went away".to_string())
        );
    }

    #[test]
    fn test_read_nonempty() {
        let mut reader = ConstantPassphraseReader::new("");
        let err = read_nonempty(&mut reader).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::EmptyPassphrase));
        assert_eq!(err.category, ErrorCategory::User);

        let mut reader = ConstantPassphraseReader::new("x");
        assert_eq!(read_nonempty(&mut reader).unwrap().as_str(), "x");
    }
}
