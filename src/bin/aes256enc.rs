//! aes256enc CLI - password-based file encryption
//!
//! Command-line interface for encrypting and decrypting single files with
//! AES-256-CBC, keyed by PBKDF2-HMAC-SHA256 from a password.

use anyhow::bail;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use aes256enc::container;
use aes256enc::file_ops;
use aes256enc::interactive;
use aes256enc::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};

#[derive(Parser)]
#[command(name = "aes256enc")]
#[command(version)]
#[command(about = "Password-based file encryption (AES-256-CBC).", long_about = None)]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the encrypted file to [default: <input>.enc]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file whose contents is to be decrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the decrypted file to [default: <input> without .enc]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Update an encrypted file with new content, while validating
    /// that the passphrase is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing encrypted file to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Prompt for operations in a loop
    #[command(alias = "i")]
    Interactive,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Encrypt { input, output } => {
            let output = output.unwrap_or_else(|| file_ops::default_encrypt_output(&input));
            warn_if_container(&input);
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::encrypt_file(&input, &output, &mut *reader)?;
        }
        Commands::Decrypt { input, output } => {
            let output = match output {
                Some(output) => {
                    warn_if_unsuffixed(&input);
                    output
                }
                None => file_ops::default_decrypt_output(&input)?,
            };
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::decrypt_file(&input, &output, &mut *reader)?;
        }
        Commands::Update { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin);
            file_ops::update_file(&input, &output, &mut *reader)?;
        }
        Commands::Interactive => {
            if cli.passphrase_stdin {
                bail!("interactive mode reads commands from stdin; --passphrase-stdin is not supported");
            }
            let mut reader = TerminalPassphraseReader::new();
            interactive::run_interactive(io::stdin().lock(), io::stdout(), &mut reader)?;
        }
    }
    Ok(())
}

/// Warn when asked to encrypt something that already is a container.
///
/// Read failures are ignored here; `encrypt_file` reports them.
fn warn_if_container(input: &Path) {
    let mut head = Vec::with_capacity(container::MAGIC_HEADER.len());
    let read = File::open(input).and_then(|f| {
        f.take(container::MAGIC_HEADER.len() as u64)
            .read_to_end(&mut head)
    });
    if read.is_ok() && container::is_container(&head) {
        log::warn!(
            "{} already looks like an encrypted file; encrypting it again",
            input.display()
        );
    }
}

fn warn_if_unsuffixed(input: &Path) {
    let has_suffix = input
        .to_str()
        .is_some_and(|s| s.ends_with(file_ops::ENC_SUFFIX));
    if !has_suffix {
        log::warn!(
            "{} does not end in {}; it may not be an encrypted file",
            input.display(),
            file_ops::ENC_SUFFIX
        );
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader)
    }
}
