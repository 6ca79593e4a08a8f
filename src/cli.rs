use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use std::str::FromStr;

use crate::dns::RecordType;
use crate::log;

type LogLevelDefault = InfoLevel;

/// DNS answers straight from NetBox.
///
#[derive(Parser, Debug)]
#[command(author, version=crate::version(), about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    verbose: Verbosity<LogLevelDefault>,
}

impl Cli {
    pub fn log_level(&self) -> Option<log::Level> {
        self.verbose
            .log_level()
            .map(|s| s.to_string())
            .and_then(|s| log::Level::from_str(&s).ok())
    }

    /// The console level picked with `-v`/`-q`, or `None` when neither was given.
    ///
    /// `Some(None)` means logging was silenced.
    pub fn explicit_log_level(&self) -> Option<Option<log::Level>> {
        self.verbose.is_present().then(|| self.log_level())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the DNS server.
    Run {
        /// Config file
        #[arg(short = 'c', long)]
        conf: Option<PathBuf>,
    },

    /// Answer one question through the configured pipeline and print the records.
    Resolve {
        /// Config file
        #[arg(short = 'c', long)]
        conf: Option<PathBuf>,

        /// The name to look up
        name: String,

        /// The record type
        #[arg(default_value = "A", value_parser = parse_record_type)]
        query_type: RecordType,
    },

    /// Query NetBox for its version and installed DNS plugin.
    Probe {
        /// Config file
        #[arg(short = 'c', long)]
        conf: Option<PathBuf>,
    },

    /// Test configuration and exit
    Test {
        /// Config file
        #[arg(short = 'c', long)]
        conf: Option<PathBuf>,
    },
}

fn parse_record_type(s: &str) -> Result<RecordType, String> {
    RecordType::from_str(&s.to_uppercase()).map_err(|err| err.to_string())
}
