//! Operator CLI for account lookups.
//!
//! Each verb is a subcommand; `repl` reads chat-style lines (`!check Someone`)
//! from stdin instead.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dlog_client::DlogClient;
use lookup_common::Config;
use lookup_engine::{dispatch, Access, CommandTag, LookupContext, LookupSettings, Request};

mod terminal;
use terminal::TerminalSurface;

#[derive(Parser)]
#[command(name = "lookup")]
#[command(about = "Discussions activity lookups")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List wikis where the user has Discussions activity
    Wikis { user: Vec<String> },

    /// Same as `wikis`
    Lookup { user: Vec<String> },

    /// List other accounts sharing the user's IPs
    Check {
        user: Vec<String>,

        /// Only look at activity on this wiki (e.g. community.fandom.com)
        #[arg(long)]
        wiki: Option<String>,
    },

    /// Check that the CLI is alive
    Ping,

    /// Show the chat command list
    Help,

    /// Read chat-style commands from stdin
    Repl {
        /// Behave like a single-wiki channel
        #[arg(long)]
        wiki: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lookup=info".parse()?)
                .add_directive("dlog_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let client = DlogClient::new(
        &config.dlog_endpoint,
        &config.dlog_access_token,
        config.dlog_timeout,
    )?;
    let ctx = LookupContext::new(Arc::new(client), LookupSettings::from(&config));

    let (tag, user, access) = match cli.command {
        Commands::Wikis { user } => (CommandTag::Wikis, user.join(" "), Access::Full),
        Commands::Lookup { user } => (CommandTag::Lookup, user.join(" "), Access::Full),
        Commands::Check { user, wiki } => (CommandTag::Check, user.join(" "), access(wiki)),
        Commands::Ping => (CommandTag::Ping, String::new(), Access::Full),
        Commands::Help => (CommandTag::Help, String::new(), Access::Full),
        Commands::Repl { wiki } => return repl(&ctx, access(wiki)).await,
    };

    dispatch(&ctx, &Request::new(tag, &user, access), &TerminalSurface).await;
    Ok(())
}

fn access(wiki: Option<String>) -> Access {
    wiki.map_or(Access::Full, Access::SingleWiki)
}

async fn repl(ctx: &LookupContext, access: Access) -> Result<()> {
    let prefix = ctx.settings.command_prefix.as_str();
    info!(prefix, access = ?access, "Reading commands from stdin");
    println!(
        "{}",
        style(format!("Type {prefix}gdmhelp for commands, Ctrl-D to quit.")).dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        // Anything that is not a command is chatter.
        let Some(request) = Request::parse(&line, prefix, access.clone()) else {
            continue;
        };
        dispatch(ctx, &request, &TerminalSurface).await;
    }
    Ok(())
}
