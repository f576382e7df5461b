use anyhow::Result;
use ccn_relay_common::Suite;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};

mod commands;
mod utils;

/// CCN/NDN relay client
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a name and show its components
    Name {
        /// Name in URI format
        uri: String,

        /// Wire suite: ccnb, ccnx2015 or ndn2013
        #[clap(short, long, default_value = "ndn2013")]
        suite: Suite,

        /// Append a chunk number
        #[clap(short, long)]
        chunk: Option<u32>,

        /// Print JSON instead of text
        #[clap(long)]
        json: bool,
    },

    /// Send an Interest and print the Content that answers it
    Fetch {
        /// Name to request in URI format
        uri: String,

        /// Relay to send to, defaults to the suite's port on localhost
        #[clap(short, long)]
        relay: Option<SocketAddr>,

        #[clap(short, long, default_value = "ndn2013")]
        suite: Suite,

        /// Timeout in milliseconds
        #[clap(short, long, default_value = "4000")]
        timeout: u64,

        /// Write the payload to a file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Answer Interests under a prefix with a fixed payload
    Serve {
        /// Name prefix in URI format
        prefix: String,

        /// Payload to return (string)
        content: String,

        /// Address to listen on
        #[clap(short, long, default_value = "127.0.0.1:9000")]
        listen: SocketAddr,

        #[clap(short, long, default_value = "ndn2013")]
        suite: Suite,

        /// Freshness period in milliseconds
        #[clap(short, long)]
        freshness: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "debug" } else { "info" },
    ))
    .init();

    match cli.command {
        Commands::Name { uri, suite, chunk, json } => {
            commands::name::show_name(&uri, suite, chunk, json)?;
        }
        Commands::Fetch { uri, relay, suite, timeout, output } => {
            commands::fetch::fetch(&uri, relay, suite, timeout, output).await?;
        }
        Commands::Serve { prefix, content, listen, suite, freshness } => {
            commands::serve::serve(&prefix, content, listen, suite, freshness).await?;
        }
    }

    Ok(())
}
