//! aes256enc - password-based single-file encryption with AES-256-CBC
//!
//! The core is [`container`]: a pure function pair turning bytes and a
//! password into a self-describing container and back. [`kdf`] supplies
//! the key; everything else is file and terminal glue around it.

#![forbid(unsafe_code)]

pub mod container;
pub mod error;
pub mod file_ops;
pub mod interactive;
pub mod kdf;
pub mod passphrase;

pub use error::{EncError, ErrorCategory, ErrorKind, Result};
