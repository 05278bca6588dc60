// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod bind;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flexi_logger::{FileSpec, Logger};
use snafu::{ResultExt, Snafu};

use crate::bind::BindArgs;

#[derive(Debug, Snafu)]
#[snafu(module, context(suffix(false)))]
enum Error {
    #[snafu(display("Failed to start the logger"))]
    StartLogger { source: flexi_logger::FlexiLoggerError },
    #[snafu(display("Failed to list network services"), context(false))]
    Services { source: config::Error },
    #[snafu(display("Failed to bind the device"), context(false))]
    Bind { source: bind::Error },
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long)]
    /// Loglevel specification, see
    /// https://docs.rs/flexi_logger/0.29.0/flexi_logger/struct.LogSpecification.html.
    /// If not set, environment variable $RUST_LOG is used.
    pub log_spec: Option<String>,

    #[arg(long)]
    pub log_to_file: bool,

    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bind a PCI device through its VFIO group and print its info.
    Bind(BindArgs),
    /// List the network services configured in the environment.
    Services,
}

fn main_services() -> Result<(), Error> {
    let services = config::load_network_services(config::env_vars())?;
    print!("{}", config::Services(&services));
    Ok(())
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    let logger = if let Some(ref spec) = cli.log_spec {
        Logger::try_with_str(spec)
    } else {
        Logger::try_with_env_or_str("warn")
    }
    .context(error::StartLogger)?;
    let logger = if cli.log_to_file {
        logger.log_to_file(
            FileSpec::default()
                .suppress_timestamp()
                .o_directory(cli.log_dir),
        )
    } else {
        logger
    };
    let _handle = logger.start().context(error::StartLogger)?;
    log::debug!(
        "{} {} started...",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );

    match cli.cmd {
        Command::Bind(args) => bind::main_bind(args)?,
        Command::Services => main_services()?,
    }
    Ok(())
}
