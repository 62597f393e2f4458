use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, info};

use dlog_client::DlogError;
use lookup_common::{clean_user, LookupError};

use crate::aggregate::{candidate_blocks, wiki_blocks};
use crate::report::{check_report, wikis_report, CheckReport, LookupContext, WikisReport};
use crate::surface::{Surface, SurfaceProgress};

/// The closed set of verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    Wikis,
    Lookup,
    Check,
    Ping,
    Help,
}

impl CommandTag {
    pub const ALL: [CommandTag; 5] = [
        CommandTag::Wikis,
        CommandTag::Lookup,
        CommandTag::Check,
        CommandTag::Ping,
        CommandTag::Help,
    ];

    /// Word typed after the prefix.
    pub fn verb(&self) -> &'static str {
        match self {
            CommandTag::Wikis => "wikis",
            CommandTag::Lookup => "lookup",
            CommandTag::Check => "check",
            CommandTag::Ping => "ping",
            CommandTag::Help => "gdmhelp",
        }
    }

    pub fn allowed_in(&self, access: &Access) -> bool {
        match access {
            Access::Full => true,
            Access::SingleWiki(_) => matches!(
                self,
                CommandTag::Check | CommandTag::Ping | CommandTag::Help
            ),
        }
    }
}

/// What the calling context may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Full,
    /// Only `check`, `ping` and `help`, with checks limited to this wiki.
    SingleWiki(String),
}

impl Access {
    pub fn wiki(&self) -> Option<&str> {
        match self {
            Access::Full => None,
            Access::SingleWiki(wiki) => Some(wiki),
        }
    }
}

/// A parsed command with its free-text argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub tag: CommandTag,
    pub argument: String,
    pub access: Access,
}

impl Request {
    pub fn new(tag: CommandTag, argument: &str, access: Access) -> Self {
        Self {
            tag,
            argument: argument.to_string(),
            access,
        }
    }

    /// Parse a chat line such as `!check Some user`. `None` if it is not a command.
    pub fn parse(line: &str, prefix: &str, access: Access) -> Option<Self> {
        let rest = line.trim_start().strip_prefix(prefix)?;
        CommandTag::ALL.into_iter().find_map(|tag| {
            let argument = rest.strip_prefix(tag.verb())?;
            if !argument.is_empty() && !argument.starts_with(char::is_whitespace) {
                return None;
            }
            Some(Request::new(tag, argument.trim(), access.clone()))
        })
    }
}

pub type Handler =
    for<'a> fn(&'a LookupContext, &'a Request, &'a dyn Surface) -> BoxFuture<'a, Result<(), LookupError>>;

/// The dispatch table.
pub fn handler(tag: CommandTag) -> Handler {
    match tag {
        CommandTag::Wikis | CommandTag::Lookup => wikis_handler,
        CommandTag::Check => check_handler,
        CommandTag::Ping => ping_handler,
        CommandTag::Help => help_handler,
    }
}

fn wikis_handler<'a>(
    ctx: &'a LookupContext,
    req: &'a Request,
    surface: &'a dyn Surface,
) -> BoxFuture<'a, Result<(), LookupError>> {
    wikis(ctx, req, surface).boxed()
}

fn check_handler<'a>(
    ctx: &'a LookupContext,
    req: &'a Request,
    surface: &'a dyn Surface,
) -> BoxFuture<'a, Result<(), LookupError>> {
    check(ctx, req, surface).boxed()
}

fn ping_handler<'a>(
    _ctx: &'a LookupContext,
    _req: &'a Request,
    surface: &'a dyn Surface,
) -> BoxFuture<'a, Result<(), LookupError>> {
    ping(surface).boxed()
}

fn help_handler<'a>(
    ctx: &'a LookupContext,
    _req: &'a Request,
    surface: &'a dyn Surface,
) -> BoxFuture<'a, Result<(), LookupError>> {
    help(ctx, surface).boxed()
}

/// Run `request` against `surface`. Failures become notices; nothing escapes.
pub async fn dispatch(ctx: &LookupContext, request: &Request, surface: &dyn Surface) {
    if !request.tag.allowed_in(&request.access) {
        info!(verb = request.tag.verb(), access = ?request.access, "Command not allowed here, ignoring");
        return;
    }

    info!(verb = request.tag.verb(), argument = request.argument.as_str(), "Dispatching command");
    if let Err(e) = handler(request.tag)(ctx, request, surface).await {
        surface.notice(&describe(&e)).await;
    }
}

/// Operator-facing text for a failure.
pub fn describe(err: &LookupError) -> String {
    match err {
        LookupError::Upstream(DlogError::InvalidSubject(reason)) if reason.starts_with("Valid") => {
            "Invalid username provided. Please check again!".to_string()
        }
        LookupError::Upstream(e) => e.reason().to_string(),
        LookupError::IpNotSupported(_) => "Cannot lookup the wikis for an IP.".to_string(),
        LookupError::EmptySubject => "Please provide a username.".to_string(),
        LookupError::Config(_) => {
            error!(error = %err, "Unexpected failure while handling command");
            format!("An error occurred.\n{err}")
        }
    }
}

async fn wikis(ctx: &LookupContext, req: &Request, surface: &dyn Surface) -> Result<(), LookupError> {
    let user = clean_user(&req.argument);
    let progress = SurfaceProgress::new(surface);

    match wikis_report(ctx, &user, Some(&progress)).await? {
        WikisReport::NoWikis { subject } => {
            surface.notice(&format!("No wikis found for {subject}.")).await;
        }
        WikisReport::Found {
            subject,
            collection,
            wikis,
        } => {
            for block in wiki_blocks(&subject, &collection, &wikis) {
                surface.block(&block).await;
            }
        }
    }
    Ok(())
}

async fn check(ctx: &LookupContext, req: &Request, surface: &dyn Surface) -> Result<(), LookupError> {
    let user = clean_user(&req.argument);
    let progress = SurfaceProgress::new(surface);

    match check_report(ctx, &user, req.access.wiki(), Some(&progress)).await? {
        CheckReport::NoResults { subject } => {
            surface.notice(&format!("No results found for {subject}.")).await;
        }
        CheckReport::NoCandidates { subject, .. } => {
            surface
                .notice(&format!("No other accounts found for {subject}."))
                .await;
        }
        CheckReport::Found {
            subject,
            collection,
            candidates,
            ..
        } => {
            for block in candidate_blocks(&subject, &collection, &candidates) {
                surface.block(&block).await;
            }
        }
    }
    Ok(())
}

async fn ping(surface: &dyn Surface) -> Result<(), LookupError> {
    surface.notice("Pong.").await;
    Ok(())
}

async fn help(ctx: &LookupContext, surface: &dyn Surface) -> Result<(), LookupError> {
    surface.notice(&help_text(&ctx.settings.command_prefix)).await;
    Ok(())
}

pub fn help_text(prefix: &str) -> String {
    [
        format!("`{prefix}wikis <user>`: Lists wikis where the user has Discussions posts, replies, upvotes, deletes, locks."),
        format!("`{prefix}lookup <user>`: Same as `{prefix}wikis`."),
        format!("`{prefix}check <user>`: Lists alternate accounts (shares the same IPs) based on Discussions activity."),
        format!("`{prefix}ping`: Check if this bot is alive."),
        format!("`{prefix}gdmhelp`: Shows this list of commands."),
    ]
    .join("\n")
}
