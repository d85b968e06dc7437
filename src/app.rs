use tracing::debug;

use crate::cli::{Cli, Command};
use crate::commands;
use crate::context::AppContext;
use crate::error::AppResult;

pub fn run(cli: Cli) -> AppResult<()> {
    let Cli {
        profile,
        json,
        verbose,
        command,
    } = cli;

    let ctx = AppContext::bootstrap(profile, json, verbose)?;
    debug!(profile = %ctx.profile, "context ready");

    dispatch(&ctx, command)
}

pub fn dispatch(ctx: &AppContext, command: Command) -> AppResult<()> {
    match command {
        Command::Init(args) => commands::init::run(ctx, args),
        Command::Show(args) => commands::show::run(ctx, args),
        Command::Reset(args) => commands::reset::run(ctx, args),
        Command::Search(args) => commands::search::run(ctx, args),
    }
}
