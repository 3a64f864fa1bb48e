//! Fleetssh - group-based SSH administration for router fleets.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fleetssh::cli::output;
use fleetssh::cli::{execute, Cli};
use fleetssh::core::outcome::Status;
use fleetssh::error::{Error, KeyError, RemoteError, TransferError};

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("FLEETSSH_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("fleetssh=debug")
        } else {
            EnvFilter::new("fleetssh=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).without_time())
        .init();

    match execute(cli) {
        Ok(status) => std::process::exit(status.code()),
        Err(e) => {
            let suggestion = match &e {
                Error::Key(KeyError::KeygenNotFound) => Some("install openssh-client"),
                Error::Remote(RemoteError::ClientNotFound(_)) => Some("install openssh-client"),
                Error::Remote(RemoteError::ConnectionFailed { .. }) => {
                    Some("check the address and that the device accepts the group key")
                }
                Error::Key(KeyError::IncompletePair(_)) => {
                    Some("restore the missing key file from a backup")
                }
                Error::Key(KeyError::Missing(_)) => {
                    Some("enroll a device first: fleetssh client add <group> <ip>")
                }
                Error::Transfer(TransferError::InvalidProfile(_)) => {
                    Some("profiles: standard, alt1, alt2, alt3")
                }
                _ => None,
            };

            output::error(&e.to_string());
            if let Some(hint) = suggestion {
                output::hint(hint);
            }
            std::process::exit(Status::Failure.code());
        }
    }
}
