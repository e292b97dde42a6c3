//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, subcommands, and their arguments.

use crate::api::client::BalancerClient;
use crate::auth::{AuthContext, FileSessionProvider, User};
use crate::built_info;
use crate::cli::health_view::render_health_view;
use crate::config::{init_default_config, Config};
use crate::error::{Result, VaultKrateError};
use crate::files::{
    Dashboard, DashboardState, DeleteAtChange, ExpiryStatus, FileInfo, FileManager, FileUpdate,
    UserInfo,
};
use crate::health::HealthMonitor;
use crate::utils::datetime::parse_datetime_or_duration;
use crate::utils::format::{
    format_bytes, format_date, format_percentage, format_table, render_structured, usage_bar,
    DisplayUtils, OutputFormat,
};
use crate::utils::interactive::{
    copy_to_clipboard, open_external, validate_user_id, InteractivePrompt, ProgressIndicator,
};
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Version shown by `--version`
fn get_version() -> &'static str {
    built_info::PKG_VERSION
}

#[derive(Parser)]
#[command(name = "vk")]
#[command(about = "Upload, manage and share files through a Vault-Krate balancer")]
#[command(version = get_version(), author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Balancer URL for this invocation
    #[arg(long, global = true, value_name = "URL", env = "VK_BALANCER_URL")]
    pub balancer_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a file and print its share link
    Upload {
        /// Local file to upload
        file_path: PathBuf,
        /// Description stored with the file
        #[arg(short, long, default_value = "")]
        description: String,
        /// Upload as a temporary file even when signed in
        #[arg(long)]
        anonymous: bool,
        /// Copy the share link to the clipboard
        #[arg(long)]
        copy: bool,
        /// Open the share link in a browser
        #[arg(long)]
        open: bool,
    },
    /// List your files (alias: ls)
    #[command(alias = "ls")]
    List {
        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,
    },
    /// Show storage usage
    Usage,
    /// Show details of a file
    Info {
        /// File ID
        file_id: String,
    },
    /// Download a file
    Download {
        /// File ID
        file_id: String,
        /// Output path (defaults to the file name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
        /// Open the file after downloading
        #[arg(long)]
        open: bool,
    },
    /// Edit a file's name, description or deletion time
    Update {
        /// File ID
        file_id: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Delete at this time (ISO 8601 or relative, e.g. 6h, 2d, 1w)
        #[arg(long, conflicts_with = "clear_delete_at")]
        delete_at: Option<String>,
        /// Clear any scheduled deletion
        #[arg(long)]
        clear_delete_at: bool,
    },
    /// Delete a file (alias: rm)
    #[command(alias = "rm")]
    Delete {
        /// File ID
        file_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Print a file's share link
    Share {
        /// File ID
        file_id: String,
        /// Copy the link to the clipboard
        #[arg(long)]
        copy: bool,
        /// Open the link in a browser
        #[arg(long)]
        open: bool,
    },
    /// Show balancer and storage server health
    Health {
        /// Keep polling; press Enter to refresh, q or Ctrl-C to quit
        #[arg(short, long)]
        watch: bool,
        /// Polling interval in seconds (defaults to health_refresh_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Sign in
    Login {
        /// User ID (prompted when omitted)
        user_id: Option<String>,
        /// Email shown instead of the user ID
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Interactive first-time setup
    Init,
    /// Show version and build information
    Version,
    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Setting name
        key: String,
        /// Setting value
        value: String,
    },
    /// Show configuration file path
    Path,
}

impl Cli {
    /// Output format after applying `--json` and the `output_json` setting
    pub fn effective_format(&self, config: &Config) -> OutputFormat {
        if self.json || (self.format == OutputFormat::Table && config.output_json) {
            OutputFormat::Json
        } else {
            self.format
        }
    }

    pub async fn execute(self, mut config: Config) -> Result<()> {
        if let Some(url) = &self.balancer_url {
            config.set_value("balancer_url", url)?;
            config.validate()?;
        }

        let format = self.effective_format(&config);
        let no_color = self.no_color || config.no_color;
        let ctx = CliContext::new(config, format, no_color);

        match self.command {
            Commands::Upload {
                file_path,
                description,
                anonymous,
                copy,
                open,
            } => execute_upload(&ctx, &file_path, &description, anonymous, copy, open).await,
            Commands::List { watch } => execute_list(&ctx, watch).await,
            Commands::Usage => execute_usage(&ctx).await,
            Commands::Info { file_id } => execute_info(&ctx, &file_id).await,
            Commands::Download {
                file_id,
                output,
                force,
                open,
            } => execute_download(&ctx, &file_id, output, force, open).await,
            Commands::Update {
                file_id,
                name,
                description,
                delete_at,
                clear_delete_at,
            } => {
                let change = match (delete_at, clear_delete_at) {
                    (_, true) => DeleteAtChange::Clear,
                    (Some(raw), false) => {
                        DeleteAtChange::Set(parse_datetime_or_duration(&raw, Utc::now())?)
                    }
                    (None, false) => DeleteAtChange::Keep,
                };
                let update = FileUpdate {
                    file_name: name,
                    description,
                    delete_at: change,
                };
                execute_update(&ctx, &file_id, update).await
            }
            Commands::Delete { file_id, force } => execute_delete(&ctx, &file_id, force).await,
            Commands::Share {
                file_id,
                copy,
                open,
            } => execute_share(&ctx, &file_id, copy, open),
            Commands::Health { watch, interval } => execute_health(&ctx, watch, interval).await,
            Commands::Login { user_id, email } => execute_login(&ctx, user_id, email).await,
            Commands::Logout => execute_logout(&ctx).await,
            Commands::Whoami => execute_whoami(&ctx).await,
            Commands::Config { command } => execute_config_command(&ctx, command).await,
            Commands::Init => execute_init_command(&ctx).await,
            Commands::Version => execute_version_command(&ctx),
            Commands::Completions { shell } => {
                clap_complete::generate(shell, &mut Cli::command(), "vk", &mut std::io::stdout());
                Ok(())
            }
        }
    }
}

/// Settings shared by every command handler
pub(crate) struct CliContext {
    pub config: Config,
    pub format: OutputFormat,
    pub display: DisplayUtils,
}

impl CliContext {
    fn new(config: Config, format: OutputFormat, no_color: bool) -> Self {
        Self {
            config,
            format,
            display: DisplayUtils::new(no_color),
        }
    }

    pub fn structured(&self) -> bool {
        self.format != OutputFormat::Table
    }

    pub fn no_color(&self) -> bool {
        self.display.no_color()
    }

    /// Print `value` as JSON/YAML; returns false for table output
    pub fn print_structured<T: Serialize>(&self, value: &T) -> Result<bool> {
        match render_structured(value, self.format)? {
            Some(rendered) => {
                println!("{rendered}");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn client(&self) -> Result<BalancerClient> {
        BalancerClient::from_config(&self.config)
    }

    fn manager(&self) -> Result<FileManager> {
        Ok(FileManager::new(self.client()?))
    }

    async fn auth(&self, client: &BalancerClient) -> Result<AuthContext> {
        let provider = FileSessionProvider::from_default_location()?;
        let auth = AuthContext::new(Arc::new(provider), Arc::new(client.clone()));
        auth.initialize().await?;
        Ok(auth)
    }

    async fn dashboard(&self) -> Result<Dashboard> {
        let client = self.client()?;
        let user = self.auth(&client).await?.require_user()?;
        Ok(Dashboard::new(FileManager::new(client), user))
    }

    fn spinner(&self, message: &str) -> ProgressIndicator {
        if self.structured() {
            ProgressIndicator::hidden()
        } else {
            ProgressIndicator::new(message)
        }
    }
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Uploaded")]
    uploaded: String,
    #[tabled(rename = "Downloads")]
    downloads: u64,
    #[tabled(rename = "Expires")]
    expires: String,
}

fn file_rows(files: &[FileInfo], now: DateTime<Utc>) -> Vec<FileRow> {
    files
        .iter()
        .map(|file| FileRow {
            id: file.file_id.clone(),
            name: file.file_name.clone(),
            size: format_bytes(file.size),
            uploaded: format_date(&file.uploaded_at),
            downloads: file.download_count,
            expires: describe_expiry(ExpiryStatus::of(file.delete_at, now)),
        })
        .collect()
}

fn describe_expiry(status: ExpiryStatus) -> String {
    match status {
        ExpiryStatus::Permanent => "Never".to_string(),
        ExpiryStatus::Expired => "Expired".to_string(),
        ExpiryStatus::ExpiresWithinHour => "In less than an hour".to_string(),
        ExpiryStatus::ExpiresInHours(1) => "In 1 hour".to_string(),
        ExpiryStatus::ExpiresInHours(hours) => format!("In {hours} hours"),
        ExpiryStatus::Scheduled(at) => format_date(&at),
    }
}

fn usage_lines(usage: &UserInfo) -> Vec<(&'static str, String)> {
    vec![
        ("Files", usage.file_count.to_string()),
        (
            "Used",
            format!(
                "{} of {} ({})",
                format_bytes(usage.space_used),
                format_bytes(usage.space_limit),
                format_percentage(usage.space_used, usage.space_limit)
            ),
        ),
        ("Usage", usage_bar(usage.usage_percentage(), 30)),
    ]
}

fn print_dashboard(ctx: &CliContext, state: &DashboardState) -> Result<()> {
    #[derive(Serialize)]
    struct DashboardOutput<'a> {
        files: &'a [FileInfo],
        usage: Option<&'a UserInfo>,
    }

    let structured = ctx.print_structured(&DashboardOutput {
        files: &state.files,
        usage: state.usage.as_ref(),
    })?;

    for error in &state.errors {
        ctx.display.print_error(&error.to_string());
    }
    if structured {
        return Ok(());
    }

    if state.files.is_empty() {
        println!("No files found");
    } else {
        let table = Table::new(file_rows(&state.files, Utc::now()));
        println!("{}", format_table(table, ctx.no_color()));
        println!("\nTotal files: {}", state.files.len());
    }

    if let Some(usage) = &state.usage {
        println!();
        ctx.display.print_header("Storage");
        println!("{}", ctx.display.format_key_value_pairs(&usage_lines(usage)));
    }

    Ok(())
}

async fn execute_upload(
    ctx: &CliContext,
    file_path: &Path,
    description: &str,
    anonymous: bool,
    copy: bool,
    open: bool,
) -> Result<()> {
    if !file_path.is_file() {
        return Err(VaultKrateError::invalid_argument(format!(
            "File not found: {}",
            file_path.display()
        )));
    }

    let client = ctx.client()?;
    let user = if anonymous {
        None
    } else {
        ctx.auth(&client).await?.current_user()
    };

    if user.is_none() && !ctx.structured() {
        ctx.display
            .print_warning("Uploading as a temporary file; it will be deleted in 24 hours");
    }

    let spinner = ctx.spinner(&format!("Uploading {}", file_path.display()));
    let manager = FileManager::new(client);
    let result = manager
        .upload_file(file_path, description, user.as_ref(), Utc::now())
        .await;

    let outcome = match result {
        Ok(outcome) => {
            spinner.finish_clear();
            outcome
        }
        Err(e) => {
            spinner.finish_error("Upload failed");
            return Err(e);
        }
    };

    if !ctx.print_structured(&outcome)? {
        ctx.display.print_success("File uploaded");
        let mut pairs = vec![
            ("Link", outcome.share_link.clone()),
            ("ID", outcome.file_id.clone()),
            ("Size", format_bytes(outcome.total_size)),
            ("Chunks", outcome.chunk_count.to_string()),
        ];
        if let Some(at) = outcome.delete_at {
            pairs.push(("Expires", format_date(&at)));
        }
        println!("{}", ctx.display.format_key_value_pairs(&pairs));
    }

    share_actions(ctx, &outcome.share_link, copy, open);
    Ok(())
}

/// Clipboard and browser follow-ups; failures are reported but not fatal
fn share_actions(ctx: &CliContext, link: &str, copy: bool, open: bool) {
    if copy {
        match copy_to_clipboard(link) {
            Ok(()) => ctx.display.print_success("Link copied to clipboard"),
            Err(e) => ctx.display.print_warning(&format!("Failed to copy link: {e}")),
        }
    }
    if open {
        if let Err(e) = open_external(link) {
            ctx.display.print_warning(&e.to_string());
        }
    }
}

async fn execute_list(ctx: &CliContext, watch: bool) -> Result<()> {
    let dashboard = ctx.dashboard().await?;

    if !watch {
        let state = dashboard.refresh().await;
        print_dashboard(ctx, &state)?;
        return match state.errors.into_iter().next() {
            Some(e) if state.files.is_empty() && state.usage.is_none() => Err(e),
            _ => Ok(()),
        };
    }

    let mut ticker = tokio::time::interval(ctx.config.dashboard_refresh_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let state = dashboard.refresh().await;
                if !ctx.structured() {
                    ctx.display.clear_screen()?;
                    ctx.display.print_header(&format!("Files of {}", dashboard.user().display_name()));
                }
                print_dashboard(ctx, &state)?;
            }
        }
    }
    Ok(())
}

async fn execute_usage(ctx: &CliContext) -> Result<()> {
    let dashboard = ctx.dashboard().await?;
    let manager = ctx.manager()?;
    let usage = manager.user_info(&dashboard.user().id).await?;

    if !ctx.print_structured(&usage)? {
        ctx.display.print_header("Storage");
        println!("{}", ctx.display.format_key_value_pairs(&usage_lines(&usage)));
    }
    Ok(())
}

fn print_file_info(ctx: &CliContext, file: &FileInfo, share_link: &str) -> Result<()> {
    if ctx.print_structured(file)? {
        return Ok(());
    }

    let now = Utc::now();
    let status = ExpiryStatus::of(file.delete_at, now);

    ctx.display.print_header(&file.file_name);
    let pairs = vec![
        ("ID", file.file_id.clone()),
        (
            "Description",
            if file.description.is_empty() {
                "-".to_string()
            } else {
                file.description.clone()
            },
        ),
        ("Size", format_bytes(file.size)),
        ("Type", file.mime_type.clone()),
        ("Uploaded", format_date(&file.uploaded_at)),
        (
            "Last access",
            file.last_access
                .as_ref()
                .map(format_date)
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Downloads", file.download_count.to_string()),
        (
            "Owner",
            file.user_id.clone().unwrap_or_else(|| "anonymous".to_string()),
        ),
        ("Expires", describe_expiry(status)),
        ("Link", share_link.to_string()),
    ];
    println!("{}", ctx.display.format_key_value_pairs(&pairs));

    match status {
        ExpiryStatus::Expired => ctx.display.print_error("This file has expired"),
        ExpiryStatus::ExpiresWithinHour => ctx
            .display
            .print_warning("This file will be deleted in less than an hour"),
        ExpiryStatus::ExpiresInHours(hours) => ctx
            .display
            .print_warning(&format!("This file will be deleted in {hours} hour(s)")),
        _ => {}
    }
    Ok(())
}

/// Fallback view for a file-detail page that could not be loaded
fn file_unavailable_lines(error: &VaultKrateError) -> Vec<String> {
    let hint = if error.category().is_some_and(|c| c.is_gone()) {
        "The file may have been deleted, expired, or the link is wrong."
    } else {
        "Could not load the file information. Try again later."
    };
    vec![
        "File unavailable".to_string(),
        error.to_string(),
        hint.to_string(),
    ]
}

/// Fetch a file's record, rendering the fallback view on any failure
async fn fetch_file_info(ctx: &CliContext, manager: &FileManager, file_id: &str) -> Result<FileInfo> {
    match manager.file_info(file_id).await {
        Ok(file) => Ok(file),
        Err(e) => {
            if !ctx.structured() {
                let lines = file_unavailable_lines(&e);
                ctx.display.print_header(&lines[0]);
                for line in &lines[1..] {
                    println!("{line}");
                }
            }
            Err(e)
        }
    }
}

async fn execute_info(ctx: &CliContext, file_id: &str) -> Result<()> {
    let manager = ctx.manager()?;
    let file = fetch_file_info(ctx, &manager, file_id).await?;
    print_file_info(ctx, &file, &manager.share_link(file_id))
}

async fn execute_download(
    ctx: &CliContext,
    file_id: &str,
    output: Option<PathBuf>,
    force: bool,
    open: bool,
) -> Result<()> {
    let manager = ctx.manager()?;
    let file = fetch_file_info(ctx, &manager, file_id).await?;

    let output_path = output.unwrap_or_else(|| PathBuf::from(&file.file_name));
    if output_path.exists() && !force {
        return Err(VaultKrateError::invalid_argument(format!(
            "File '{}' already exists. Use --force to overwrite.",
            output_path.display()
        )));
    }

    let spinner = ctx.spinner(&format!("Downloading {}", file.file_name));
    let content = match manager.download_file(file_id).await {
        Ok(content) => {
            spinner.finish_clear();
            content
        }
        Err(e) => {
            spinner.finish_error("Download failed");
            return Err(e);
        }
    };
    tokio::fs::write(&output_path, &content).await?;

    // The download counter changed server-side
    let refreshed = match manager.file_info(file_id).await {
        Ok(refreshed) => refreshed,
        Err(e) => {
            warn!("Could not refresh file info after download: {}", e);
            file
        }
    };

    if !ctx.structured() {
        ctx.display.print_success(&format!(
            "Downloaded {} to {}",
            format_bytes(content.len() as u64),
            output_path.display()
        ));
        println!("  Downloads: {}", refreshed.download_count);
    } else {
        ctx.print_structured(&refreshed)?;
    }

    if open {
        open_external(&output_path.to_string_lossy())?;
    }
    Ok(())
}

async fn execute_update(ctx: &CliContext, file_id: &str, update: FileUpdate) -> Result<()> {
    if update.is_empty() {
        return Err(VaultKrateError::invalid_argument(
            "Nothing to update. Pass --name, --description, --delete-at or --clear-delete-at",
        ));
    }

    let dashboard = ctx.dashboard().await?;
    let (adjustment, state) = dashboard.update(file_id, &update).await?;

    if let Some(adjustment) = adjustment {
        if adjustment.warning {
            ctx.display.print_warning(&format!(
                "Files can only be scheduled for deletion at least 3 hours ahead; using {}",
                format_date(&adjustment.value)
            ));
        }
    }

    if ctx.structured() {
        if let Some(file) = state.files.iter().find(|f| f.file_id == file_id) {
            ctx.print_structured(file)?;
        }
    } else {
        ctx.display.print_success(&format!("Updated file {file_id}"));
    }
    Ok(())
}

async fn execute_delete(ctx: &CliContext, file_id: &str, force: bool) -> Result<()> {
    if !force {
        let prompt = InteractivePrompt::new();
        if !prompt.confirm(&format!("Delete file '{file_id}'?"), false)? {
            println!("Delete operation cancelled.");
            return Ok(());
        }
    }

    let dashboard = ctx.dashboard().await?;
    let state = dashboard.delete(file_id).await?;

    ctx.display.print_success(&format!("Deleted file {file_id}"));
    if !ctx.structured() && state.is_complete() {
        println!("  Remaining files: {}", state.files.len());
    }
    Ok(())
}

fn execute_share(ctx: &CliContext, file_id: &str, copy: bool, open: bool) -> Result<()> {
    let link = crate::config::Endpoints::from_config(&ctx.config).share_link(file_id);

    if !ctx.print_structured(&serde_json::json!({ "file_id": file_id, "link": link }))? {
        println!("{link}");
    }
    share_actions(ctx, &link, copy, open);
    Ok(())
}

async fn execute_health(ctx: &CliContext, watch: bool, interval: Option<u64>) -> Result<()> {
    let mut monitor = HealthMonitor::from_config(ctx.client()?, &ctx.config);
    if let Some(seconds) = interval {
        if seconds == 0 {
            return Err(VaultKrateError::invalid_argument("--interval must be positive"));
        }
        monitor = HealthMonitor::new(
            ctx.client()?,
            std::time::Duration::from_secs(seconds),
            ctx.config.health_timeout(),
        );
    }

    if !watch {
        let snapshot = match monitor.fetch_once().await {
            Ok(snapshot) => snapshot,
            Err(classification) => {
                if !ctx.structured() {
                    ctx.display.print_header("Health status unavailable");
                }
                return Err(VaultKrateError::api(
                    classification.category,
                    classification.message,
                ));
            }
        };
        if !ctx.print_structured(&snapshot)? {
            crate::cli::health_view::render_snapshot(ctx, &snapshot);
        }
        return Ok(());
    }

    let refresh_every = monitor.interval();
    let handle = monitor.spawn();
    let mut rx = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = rx.borrow_and_update().clone();
                render_health_view(ctx, &view, refresh_every)?;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(input)) if input.trim().eq_ignore_ascii_case("q") => break,
                Ok(Some(_)) => {
                    handle.refresh();
                }
                _ => stdin_open = false,
            },
        }
    }

    handle.shutdown().await;
    debug!("Health watch ended");
    Ok(())
}

async fn execute_login(
    ctx: &CliContext,
    user_id: Option<String>,
    email: Option<String>,
) -> Result<()> {
    let user_id = match user_id {
        Some(id) => {
            validate_user_id(&id).map_err(VaultKrateError::invalid_argument)?;
            id.trim().to_string()
        }
        None => InteractivePrompt::new()
            .input_text_validated("User ID", validate_user_id)?
            .trim()
            .to_string(),
    };

    let client = ctx.client()?;
    let auth = ctx.auth(&client).await?;
    let user = auth.sign_in(User::new(user_id, email)).await?;

    if !ctx.print_structured(&user)? {
        ctx.display
            .print_success(&format!("Signed in as {}", user.display_name()));
    }
    Ok(())
}

async fn execute_logout(ctx: &CliContext) -> Result<()> {
    let client = ctx.client()?;
    let auth = ctx.auth(&client).await?;

    if auth.current_user().is_none() {
        ctx.display.print_info("Not signed in");
        return Ok(());
    }

    auth.sign_out().await?;
    ctx.display.print_success("Signed out");
    Ok(())
}

async fn execute_whoami(ctx: &CliContext) -> Result<()> {
    let client = ctx.client()?;
    let auth = ctx.auth(&client).await?;

    match auth.current_user() {
        Some(user) => {
            if !ctx.print_structured(&user)? {
                let mut pairs = vec![("User ID", user.id.clone())];
                if let Some(email) = &user.email {
                    pairs.push(("Email", email.clone()));
                }
                println!("{}", ctx.display.format_key_value_pairs(&pairs));
            }
            Ok(())
        }
        None => Err(VaultKrateError::NotSignedIn),
    }
}

async fn execute_config_command(ctx: &CliContext, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => execute_config_show(ctx),
        ConfigCommands::Set { key, value } => execute_config_set(&key, &value, ctx).await,
        ConfigCommands::Path => {
            println!("{}", Config::get_config_path()?.display());
            Ok(())
        }
    }
}

fn execute_config_show(ctx: &CliContext) -> Result<()> {
    if ctx.print_structured(&ctx.config)? {
        return Ok(());
    }

    #[derive(Tabled)]
    struct ConfigItem {
        #[tabled(rename = "Setting")]
        key: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let items: Vec<ConfigItem> = ctx
        .config
        .entries()
        .into_iter()
        .map(|(key, value)| ConfigItem { key, value })
        .collect();

    println!("{}", format_table(Table::new(items), ctx.no_color()));
    Ok(())
}

async fn execute_config_set(key: &str, value: &str, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config.clone();
    config.set_value(key, value)?;
    config.validate()?;
    config.save().await?;

    ctx.display
        .print_success(&format!("Configuration updated: {key} = {value}"));
    Ok(())
}

async fn execute_init_command(ctx: &CliContext) -> Result<()> {
    let path = init_default_config().await?;
    let prompt = InteractivePrompt::new();
    let mut config = ctx.config.clone();

    ctx.display.print_header("Vault-Krate setup");
    for key in ["balancer_url", "site_url", "locale"] {
        let current = config
            .entries()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .unwrap_or_default();
        let value = prompt.input_text(key, Some(current.as_str()))?;
        config.set_value(key, &value)?;
    }
    config.validate()?;
    config.save().await?;

    ctx.display
        .print_success(&format!("Configuration saved to {}", path.display()));
    Ok(())
}

fn execute_version_command(ctx: &CliContext) -> Result<()> {
    let pairs = vec![
        ("Version", built_info::PKG_VERSION.to_string()),
        (
            "Git hash",
            built_info::GIT_COMMIT_HASH_SHORT
                .unwrap_or("unknown")
                .to_string(),
        ),
        (
            "Git ref",
            built_info::GIT_HEAD_REF.unwrap_or("unknown").to_string(),
        ),
        ("Built", built_info::BUILT_TIME_UTC.to_string()),
        ("Target", built_info::TARGET.to_string()),
    ];

    ctx.display.print_header("vk - Vault-Krate CLI");
    println!("{}", ctx.display.format_key_value_pairs(&pairs));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{classify, ApiFailure, ClassifyContext};
    use crate::config::Locale;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "vk",
            "upload",
            "report.pdf",
            "--description",
            "Q3",
            "--copy",
        ])
        .unwrap();
        match cli.command {
            Commands::Upload {
                file_path,
                description,
                anonymous,
                copy,
                open,
            } => {
                assert_eq!(file_path, PathBuf::from("report.pdf"));
                assert_eq!(description, "Q3");
                assert!(copy);
                assert!(!anonymous && !open);
            }
            _ => panic!("expected upload"),
        }
    }

    #[test]
    fn test_update_flags_conflict() {
        assert!(Cli::try_parse_from([
            "vk",
            "update",
            "abc",
            "--delete-at",
            "2d",
            "--clear-delete-at"
        ])
        .is_err());
    }

    #[test]
    fn test_aliases() {
        assert!(matches!(
            Cli::try_parse_from(["vk", "ls"]).unwrap().command,
            Commands::List { watch: false }
        ));
        assert!(matches!(
            Cli::try_parse_from(["vk", "rm", "abc", "-f"]).unwrap().command,
            Commands::Delete { force: true, .. }
        ));
    }

    #[test]
    fn test_effective_format() {
        let config = Config::default();
        let cli = Cli::try_parse_from(["vk", "--json", "usage"]).unwrap();
        assert_eq!(cli.effective_format(&config), OutputFormat::Json);

        let cli = Cli::try_parse_from(["vk", "usage"]).unwrap();
        assert_eq!(cli.effective_format(&config), OutputFormat::Table);

        let config = Config {
            output_json: true,
            ..Config::default()
        };
        assert_eq!(cli.effective_format(&config), OutputFormat::Json);

        let cli = Cli::try_parse_from(["vk", "--format", "yaml", "usage"]).unwrap();
        assert_eq!(cli.effective_format(&config), OutputFormat::Yaml);
    }

    #[test]
    fn test_describe_expiry() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(describe_expiry(ExpiryStatus::Permanent), "Never");
        assert_eq!(describe_expiry(ExpiryStatus::ExpiresInHours(1)), "In 1 hour");
        assert_eq!(describe_expiry(ExpiryStatus::ExpiresInHours(5)), "In 5 hours");
        assert_eq!(describe_expiry(ExpiryStatus::Scheduled(at)), format_date(&at));
    }

    #[test]
    fn test_file_rows() {
        let now = Utc::now();
        let file: FileInfo = serde_json::from_value(serde_json::json!({
            "file_id": "f-1",
            "size": 1536,
            "uploaded_at": "2024-06-01T10:00:00Z",
            "file_name": "notes",
            "download_count": 3,
            "delete_at": (now + Duration::minutes(90)).to_rfc3339()
        }))
        .unwrap();

        let rows = file_rows(&[file], now);
        assert_eq!(rows[0].size, "1.5 KB");
        assert_eq!(rows[0].downloads, 3);
        assert_eq!(rows[0].expires, "In 1 hour");
    }

    fn file_detail_error(failure: ApiFailure) -> VaultKrateError {
        let classification = classify(&failure, ClassifyContext::File, Locale::En);
        VaultKrateError::api(classification.category, classification.message)
    }

    #[test]
    fn test_file_unavailable_for_missing_file() {
        let lines = file_unavailable_lines(&file_detail_error(ApiFailure::http(404, Vec::new())));
        assert_eq!(lines[0], "File unavailable");
        assert_eq!(lines[1], "File not found or it has expired.");
        assert!(lines[2].contains("deleted, expired"));
    }

    #[test]
    fn test_file_unavailable_for_expired_file() {
        let lines = file_unavailable_lines(&file_detail_error(ApiFailure::http(410, Vec::new())));
        assert_eq!(lines[0], "File unavailable");
        assert_eq!(lines[1], "This file has expired.");
        assert!(lines[2].contains("deleted, expired"));
    }

    #[test]
    fn test_file_unavailable_for_network_failure() {
        let lines = file_unavailable_lines(&file_detail_error(ApiFailure::network("refused")));
        assert_eq!(lines[0], "File unavailable");
        assert!(lines[1].starts_with("Connection error"));
        assert!(lines[2].contains("Could not load"));

        let lines = file_unavailable_lines(&file_detail_error(ApiFailure::http(503, Vec::new())));
        assert!(lines[1].starts_with("Service temporarily unavailable"));
    }

    #[test]
    fn test_usage_lines() {
        let usage = UserInfo {
            user_id: "u".to_string(),
            file_count: 4,
            space_used: 512,
            space_limit: 1024,
        };
        let lines = usage_lines(&usage);
        assert_eq!(lines[1].1, "512 B of 1 KB (50.0%)");
    }
}
