pub mod app;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod gmail;
pub mod output;
pub mod query;
pub mod reddit;
pub mod slack;
pub mod store;
pub mod workday;

use cli::Cli;
use error::AppResult;

pub fn run(cli: Cli) -> AppResult<()> {
    app::run(cli)
}
