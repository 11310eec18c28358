use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "compass")]
#[command(author, version, about = "QAIYRYM volunteer assistant bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot and the HTTP status server
    Run {
        /// Port of the HTTP status server (overrides WEB_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that every message exists in every language
    CheckTexts,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
