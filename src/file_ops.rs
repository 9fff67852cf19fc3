//! File encryption/decryption operations
//!
//! This module provides high-level file operations for encrypting, decrypting,
//! and updating files using the aes256enc container format.

use crate::container::{self, ContainerHeader, MAX_PLAINTEXT_LEN};
use crate::error::{EncError, ErrorCategory, ErrorKind, Result};
use crate::passphrase::{self, PassphraseReader};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Conventional suffix for encrypted files
pub const ENC_SUFFIX: &str = ".enc";

/// Default output path for encryption: `<input>.enc`
pub fn default_encrypt_output(input_path: &Path) -> PathBuf {
    let mut name = OsString::from(input_path.as_os_str());
    name.push(ENC_SUFFIX);
    PathBuf::from(name)
}

/// Default output path for decryption: `<input>` with `.enc` stripped
///
/// Fails when the input does not carry the suffix, since the only other
/// choice would be to overwrite the input.
pub fn default_decrypt_output(input_path: &Path) -> Result<PathBuf> {
    let stripped = input_path
        .to_str()
        .and_then(|s| s.strip_suffix(ENC_SUFFIX))
        .filter(|s| !s.is_empty() && !s.ends_with(std::path::is_separator));

    match stripped {
        Some(s) => Ok(PathBuf::from(s)),
        None => Err(EncError::with_kind(
            ErrorCategory::User,
            ErrorKind::Io,
            format!(
                "cannot derive output name for {}: no {} suffix; specify an output path",
                input_path.display(),
                ENC_SUFFIX
            ),
        )),
    }
}

/// Encrypt a file with a passphrase
///
/// Reads plaintext from `input_path`, encrypts it using a passphrase from
/// `passphrase_reader`, and writes the container to `output_path`.
///
/// Files larger than [`MAX_PLAINTEXT_LEN`] are rejected before they are read
/// or a passphrase is requested.
///
/// The output file is replaced atomically and ends up with mode 0o600
/// (read/write for owner only) on Unix systems, even if it already existed.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    check_input_size(input_path)?;

    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let passphrase = passphrase::read_nonempty(passphrase_reader)?;
    let ciphertext = container::encrypt(&passphrase, &plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, &ciphertext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    log::info!(
        "encrypted {} to {}",
        input_path.display(),
        output_path.display()
    );
    Ok(())
}

/// Decrypt a file with a passphrase
///
/// Reads a container from `input_path`, decrypts it using a passphrase from
/// `passphrase_reader`, and writes the plaintext to `output_path`. Nothing is
/// written unless decryption succeeds.
///
/// The output file is replaced atomically and ends up with mode 0o600
/// (read/write for owner only) on Unix systems, even if it already existed.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let data = fs::read(input_path).map_err(|e| read_error(input_path, e))?;

    // Reject foreign files before prompting for a passphrase.
    ContainerHeader::parse(&data).map_err(|e| e.with_context("failed to decrypt"))?;

    let passphrase = passphrase::read_nonempty(passphrase_reader)?;
    let plaintext = container::decrypt(&passphrase, &data)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    log::info!(
        "decrypted {} to {}",
        input_path.display(),
        output_path.display()
    );
    Ok(())
}

/// Update an encrypted file with new plaintext using the same passphrase
///
/// This function:
/// 1. Rejects a `plain_path` larger than [`MAX_PLAINTEXT_LEN`]
/// 2. Decrypts the existing file at `crypt_path` to validate the passphrase
/// 3. Reads new plaintext from `plain_path`
/// 4. Encrypts the new plaintext with the validated passphrase and a fresh salt and IV
/// 5. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// The atomic write ensures that either the old file or the new file exists,
/// never a partial/corrupted file.
///
/// The passphrase validation prevents accidental passphrase changes.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    check_input_size(plain_path)?;
    let existing = fs::read(crypt_path).map_err(|e| read_error(crypt_path, e))?;
    ContainerHeader::parse(&existing).map_err(|e| e.with_context("failed to decrypt"))?;
    let passphrase = passphrase::read_nonempty(passphrase_reader)?;

    // Validate passphrase by decrypting existing file (discard plaintext)
    container::decrypt(&passphrase, &existing).map_err(|e| e.with_context("failed to decrypt"))?;

    let new_plaintext = fs::read(plain_path).map_err(|e| read_error(plain_path, e))?;
    let new_ciphertext = container::encrypt(&passphrase, &new_plaintext)
        .map_err(|e| e.with_context("failed to encrypt"))?;

    write_file_secure(crypt_path, &new_ciphertext)
        .map_err(|e| e.with_context(format!("failed to write to {}", crypt_path.display())))?;

    log::info!(
        "updated {} with contents of {}",
        crypt_path.display(),
        plain_path.display()
    );
    Ok(())
}

/// Reject files larger than [`MAX_PLAINTEXT_LEN`] without reading them.
fn check_input_size(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| read_error(path, e))?;
    if metadata.len() > MAX_PLAINTEXT_LEN as u64 {
        return Err(EncError::user(
            ErrorKind::InputTooLarge,
            format!(
                "{} is {} bytes, exceeding the {} byte limit",
                path.display(),
                metadata.len(),
                MAX_PLAINTEXT_LEN
            ),
        ));
    }
    Ok(())
}

/// Atomically replace `path` with `contents`, mode 0o600 on Unix.
///
/// Writes a tempfile next to `path`, fsyncs it and renames it into place,
/// so `path` is never left partially written and an existing file's
/// looser permissions are not inherited.
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::Builder::new()
        .prefix(".aes256enc-tmp")
        .tempfile_in(dir)
        .map_err(|e| EncError::io(format!("failed to create tempfile in {}", dir.display()), e))?;

    temp_file
        .write_all(contents)
        .map_err(|e| EncError::io("failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| EncError::io("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| EncError::io("failed to sync file prior to rename", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| EncError::io("failed to set tempfile permissions", e))?;
    }
    temp_file.persist(path).map_err(|e| {
        EncError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: std::io::Error) -> EncError {
    EncError::io(format!("failed to read from {}", path.display()), err)
}
