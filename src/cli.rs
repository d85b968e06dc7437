use std::fmt;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "apisim",
    version,
    about = "Drive in-memory simulations of vendor APIs"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "default",
        help = "Profile name to use"
    )]
    pub profile: String,
    #[arg(long, global = true, help = "Emit JSON output")]
    pub json: bool,
    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Verbose logging")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a freshly seeded state file.
    Init(InitArgs),
    /// Print what a state file holds.
    Show(VendorArgs),
    /// Put a state file back to its seeded contents.
    Reset(VendorArgs),
    /// Run a vendor query against the saved state.
    Search(SearchArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Vendor {
    Gmail,
    Chat,
    Reddit,
    Slack,
    Workday,
}

impl Vendor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Chat => "chat",
            Self::Reddit => "reddit",
            Self::Slack => "slack",
            Self::Workday => "workday",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Args)]
pub struct VendorArgs {
    #[arg(value_enum, help = "Simulated vendor")]
    pub vendor: Vendor,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    #[arg(value_enum, help = "Simulated vendor")]
    pub vendor: Vendor,
    #[arg(long, help = "Overwrite an existing state file")]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(value_enum, help = "Simulated vendor")]
    pub vendor: Vendor,
    #[arg(help = "Query in the vendor's own syntax")]
    pub query: String,
    #[arg(long, default_value_t = 20, help = "Maximum results to return")]
    pub limit: usize,
}
