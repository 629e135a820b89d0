//! Command-line front end for recflow record services.
//!
//! Every subcommand drives the same engine types a UI would: searches go
//! through a [`SearchView`] fed by a URL-style query string, edits go through
//! an [`EditSession`], and outcomes are reported as [`Notice`]s.
//!
//! ```text
//! recflow search article "q=rust&status=draft&sort=-title"
//! recflow save category c-1 --set name=News --set order=3
//! recflow approve article a-1 -p read,approve
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use recflow_client::{AppContext, ClientConfig};
use recflow_engine::{
    Actor, EditSession, EntityKind, HistoryPager, MemoryLocation, Notice, Permission, SearchView,
};
use recflow_types::{Record, RecordId};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "recflow")]
#[command(about = "Search, edit and moderate records on a recflow service")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Service base URL, overriding the config file
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Name of the acting user
    #[arg(long, global = true, default_value = "cli")]
    pub actor: String,

    /// Permissions of the acting user (read, write, delete, approve)
    #[arg(
        short,
        long,
        global = true,
        value_delimiter = ',',
        value_parser = parse_permission,
        default_value = "read,write"
    )]
    pub permissions: Vec<Permission>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// One record of one entity kind.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Entity kind (article, category, content, job, contact, user, role, audit_log)
    pub kind: EntityKind,
    /// Record id
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[command(flatten)]
    pub target: Target,

    /// Field assignment `key=value`; the value is read as JSON when it parses
    #[arg(short, long = "set", value_parser = parse_assignment)]
    pub set: Vec<(String, Value)>,

    /// Field to remove
    #[arg(long)]
    pub unset: Vec<String>,

    /// Create a new record instead of editing an existing one
    #[arg(long)]
    pub new: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search records with a URL-style query (`q=..&status=..&page=2&sort=-title`)
    Search {
        kind: EntityKind,
        #[arg(default_value = "")]
        query: String,
        /// Columns to return
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },
    /// Show one record and the operations available on it
    Show(Target),
    /// List the history of a record, newest first
    History {
        #[command(flatten)]
        target: Target,
        /// Entries per page
        #[arg(long)]
        limit: Option<u32>,
        /// Keep loading until the history is exhausted
        #[arg(long)]
        all: bool,
    },
    /// Save changes to a record
    Save(EditArgs),
    /// Save changes and submit the record for approval
    Submit(EditArgs),
    /// Approve a submitted record
    Approve(Target),
    /// Reject a submitted record
    Reject(Target),
    /// Delete a record
    Delete(Target),
}

impl Cli {
    /// The actor described by `--actor` and `--permissions`.
    pub fn actor(&self) -> Actor {
        self.permissions
            .iter()
            .fold(Actor::new(&self.actor), |actor, p| actor.grant(*p))
    }

    /// Loads the config file (or defaults) and applies overrides.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Parses a permission name.
pub fn parse_permission(s: &str) -> Result<Permission, String> {
    let wanted = s.trim().to_ascii_lowercase();
    Permission::ALL
        .into_iter()
        .find(|p| p.as_str() == wanted)
        .ok_or_else(|| format!("unknown permission: {s}"))
}

/// Parses `key=value`; values that are not valid JSON are taken as strings.
pub fn parse_assignment(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in {s:?}"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Runs one command, writing results to `out`.
///
/// Error notices (not found, conflicts, validation failures) are returned as
/// errors so the process exits non-zero.
pub async fn run<W: Write>(cli: &Cli, ctx: &AppContext, out: &mut W) -> Result<()> {
    let actor = cli.actor();
    debug!("Running {:?} as {}", cli.command, actor.name);
    match &cli.command {
        Command::Search {
            kind,
            query,
            fields,
        } => search(ctx, *kind, query, fields, out).await,
        Command::Show(target) => show(ctx, target, &actor, out).await,
        Command::History { target, limit, all } => {
            history(ctx, target, *limit, *all, out).await
        }
        Command::Save(args) => {
            let mut session = edit_session(ctx, args).await?;
            let service = ctx.service(args.target.kind)?;
            let notice = session.save(service.as_ref(), &actor).await?;
            report(&notice, out)
        }
        Command::Submit(args) => {
            let mut session = edit_session(ctx, args).await?;
            let service = ctx.service(args.target.kind)?;
            let notice = session.submit(service.as_ref(), &actor).await?;
            report(&notice, out)
        }
        Command::Approve(target) => {
            let mut session = open(ctx, target).await?;
            let service = ctx.service(target.kind)?;
            let notice = session.approve(service.as_ref(), &actor).await?;
            report(&notice, out)
        }
        Command::Reject(target) => {
            let mut session = open(ctx, target).await?;
            let service = ctx.service(target.kind)?;
            let notice = session.reject(service.as_ref(), &actor).await?;
            report(&notice, out)
        }
        Command::Delete(target) => {
            let mut session = open(ctx, target).await?;
            let service = ctx.service(target.kind)?;
            let notice = session.delete(service.as_ref(), &actor).await?;
            report(&notice, out)
        }
    }
}

async fn search<W: Write>(
    ctx: &AppContext,
    kind: EntityKind,
    query: &str,
    fields: &[String],
    out: &mut W,
) -> Result<()> {
    let client = ctx.query_client(kind)?;
    let mut view = SearchView::new(kind, ctx.engine_config(), MemoryLocation::new(query))
        .with_fields(fields.iter().cloned());
    view.init();
    view.run(&client, true).await?;

    for record in view.list() {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    if let Some(summary) = view.summary() {
        writeln!(out, "{summary}")?;
    }
    Ok(())
}

async fn show<W: Write>(
    ctx: &AppContext,
    target: &Target,
    actor: &Actor,
    out: &mut W,
) -> Result<()> {
    let session = open(ctx, target).await?;
    writeln!(out, "{}", serde_json::to_string_pretty(session.original())?)?;
    let ops: Vec<String> = session
        .available_operations(actor)
        .iter()
        .map(ToString::to_string)
        .collect();
    if ops.is_empty() {
        writeln!(out, "Operations: none")?;
    } else {
        writeln!(out, "Operations: {}", ops.join(", "))?;
    }
    Ok(())
}

async fn history<W: Write>(
    ctx: &AppContext,
    target: &Target,
    limit: Option<u32>,
    all: bool,
    out: &mut W,
) -> Result<()> {
    let client = ctx.query_client(target.kind)?;
    let limit = limit.unwrap_or(ctx.engine_config().history_limit).max(1);
    let mut pager = HistoryPager::new(&target.id, limit);
    pager.load_first(&client).await?;
    while all && pager.has_more() {
        pager.load_more(&client).await?;
    }

    for entry in pager.entries() {
        writeln!(
            out,
            "{} {} {} ({})",
            entry.time.to_rfc3339(),
            entry.author,
            entry.action,
            entry.id
        )?;
    }
    if let Some(token) = pager.next_page_token() {
        writeln!(out, "More entries after {token}")?;
    }
    Ok(())
}

/// Loads an existing record, reporting a missing one as an error.
async fn open(ctx: &AppContext, target: &Target) -> Result<EditSession> {
    ctx.open_session(target.kind, &target.id)
        .await?
        .ok_or_else(|| notice_error(&Notice::NotFound))
}

/// Builds the session for save/submit and applies the requested edits.
async fn edit_session(ctx: &AppContext, args: &EditArgs) -> Result<EditSession> {
    let mut session = if args.new {
        let id = RecordId::parse(&args.target.id)?;
        EditSession::new(
            args.target.kind,
            Record::new(id),
            ctx.engine_config().clone(),
        )
    } else {
        open(ctx, &args.target).await?
    };
    for (key, value) in &args.set {
        session
            .set(key, value.clone())
            .with_context(|| format!("cannot set {key}"))?;
    }
    for key in &args.unset {
        session
            .unset(key)
            .with_context(|| format!("cannot remove {key}"))?;
    }
    Ok(session)
}

/// Prints a success notice or turns an error notice into an error.
fn report<W: Write>(notice: &Notice, out: &mut W) -> Result<()> {
    if notice.is_error() {
        return Err(notice_error(notice));
    }
    writeln!(out, "{notice}")?;
    Ok(())
}

fn notice_error(notice: &Notice) -> anyhow::Error {
    let mut message = format!("{notice} [{}]", notice.resource_key());
    for error in notice.field_errors() {
        let detail = error.message.as_deref().unwrap_or(&error.code);
        message.push_str(&format!("\n  {}: {}", error.field, detail));
    }
    anyhow!(message)
}
