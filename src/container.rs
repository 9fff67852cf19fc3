//! Encrypted container format and AES-256-CBC codec
//!
//! This module implements password-based encryption using:
//! - PBKDF2-HMAC-SHA256 for key derivation from the password (see [`crate::kdf`])
//! - AES-256 in CBC mode with PKCS#7 padding
//!
//! The binary format is:
//! - magic header: 9 bytes, ASCII `AES256ENC`
//! - salt: 16 bytes
//! - iv: 16 bytes
//! - ciphertext: variable length, a positive multiple of 16 bytes
//!
//! There is no integrity tag. Padding validation is the only check that
//! catches a wrong password or corrupted ciphertext, and it does not catch
//! all of them.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{EncError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{self, SALT_LEN};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Marker identifying aes256enc containers
pub const MAGIC_HEADER: &[u8; 9] = b"AES256ENC";

/// Length of initialization vector in bytes
pub const IV_LEN: usize = 16;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Offset of the first ciphertext byte
pub const HEADER_LEN: usize = MAGIC_HEADER.len() + SALT_LEN + IV_LEN;

/// Largest plaintext this tool will encrypt (1 MiB)
pub const MAX_PLAINTEXT_LEN: usize = 1024 * 1024;

/// The fixed-layout prefix of a container, parsed without any cryptographic work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader<'a> {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub ciphertext: &'a [u8],
}

impl<'a> ContainerHeader<'a> {
    /// Split a container into salt, IV and ciphertext.
    ///
    /// Checks, in order: magic header, minimum length, ciphertext block
    /// alignment.
    pub fn parse(container: &'a [u8]) -> Result<Self> {
        let Some(rest) = container.strip_prefix(MAGIC_HEADER.as_slice()) else {
            return Err(EncError::user(
                ErrorKind::NotAContainer,
                "input unrecognized as aes256enc data",
            ));
        };

        if rest.len() < SALT_LEN + IV_LEN {
            return Err(EncError::user(
                ErrorKind::TruncatedContainer,
                format!(
                    "input likely truncated: {} bytes, need at least {} for header, salt and iv",
                    container.len(),
                    HEADER_LEN
                ),
            ));
        }
        let (salt, rest) = rest.split_at(SALT_LEN);
        let (iv, ciphertext) = rest.split_at(IV_LEN);

        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(EncError::user(
                ErrorKind::MalformedCiphertext,
                format!(
                    "ciphertext length {} is not a positive multiple of {}",
                    ciphertext.len(),
                    BLOCK_SIZE
                ),
            ));
        }

        Ok(Self {
            salt: salt.try_into().map_err(|_| invariant("salt slice length"))?,
            iv: iv.try_into().map_err(|_| invariant("iv slice length"))?,
            ciphertext,
        })
    }
}

/// Cheap probe: does `data` start with the container magic header?
pub fn is_container(data: &[u8]) -> bool {
    data.starts_with(MAGIC_HEADER)
}

/// Encrypt plaintext with a password using random salt and IV
///
/// Returns the container: magic(9) + salt(16) + iv(16) + ciphertext(variable)
pub fn encrypt(password: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    check_plaintext_len(plaintext)?;

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    encrypt_deterministic(password, plaintext, &salt, &iv)
}

/// Encrypt plaintext with a password using provided salt and IV
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates random salt/IV.
pub fn encrypt_deterministic(
    password: &str,
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>> {
    check_plaintext_len(plaintext)?;

    let key = kdf::derive_key(password, salt);
    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv)
        .map_err(|_| invariant("key or iv length"))?;

    log::debug!("encrypting {} bytes", plaintext.len());
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut output = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    output.extend_from_slice(MAGIC_HEADER);
    output.extend_from_slice(salt);
    output.extend_from_slice(iv);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Decrypt a container with a password
pub fn decrypt(password: &str, container: &[u8]) -> Result<Vec<u8>> {
    let header = ContainerHeader::parse(container)?;

    let key = kdf::derive_key(password, &header.salt);
    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), &header.iv)
        .map_err(|_| invariant("key or iv length"))?;

    log::debug!("decrypting {} bytes", header.ciphertext.len());
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(header.ciphertext)
        .map_err(|_| {
            EncError::user(
                ErrorKind::AuthenticationFailed,
                "decryption failed: wrong password or corrupted file",
            )
        })
}

fn check_plaintext_len(plaintext: &[u8]) -> Result<()> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(EncError::user(
            ErrorKind::InputTooLarge,
            format!(
                "input is {} bytes, exceeding the {} byte limit",
                plaintext.len(),
                MAX_PLAINTEXT_LEN
            ),
        ));
    }
    Ok(())
}

fn invariant(what: &str) -> EncError {
    EncError::with_kind(
        ErrorCategory::Internal,
        ErrorKind::InternalInvariant,
        format!("unexpected {}", what),
    )
}
