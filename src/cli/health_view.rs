//! Rendering of balancer health snapshots

use crate::cli::commands::CliContext;
use crate::error::Result;
use crate::health::{HealthStatusResponse, HealthView, OverallStatus, ServerStatus};
use crate::utils::format::{format_bytes, format_date, format_table, DisplayUtils};
use std::time::Duration;
use tabled::{Table, Tabled};

#[derive(Tabled)]
pub(crate) struct ServerRow {
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Response")]
    response: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Used")]
    used: String,
}

pub(crate) fn server_rows(servers: &[ServerStatus], display: &DisplayUtils) -> Vec<ServerRow> {
    servers
        .iter()
        .map(|server| {
            let (cpu, memory) = match &server.health_info {
                Some(info) => (
                    format!("{:.1}%", info.cpu_usage),
                    format!("{:.1}%", info.memory_usage),
                ),
                None => ("-".to_string(), "-".to_string()),
            };
            let status = if server.is_healthy() {
                "healthy"
            } else {
                "unhealthy"
            };
            ServerRow {
                server: server.instance.instance_identifier.clone(),
                provider: server.instance.provider.clone(),
                status: display.badge(status, server.is_healthy()),
                response: format!("{} ms", server.response_time),
                cpu,
                memory,
                used: format_bytes(server.instance.used_space),
            }
        })
        .collect()
}

/// Summary line, table and per-server failure details
pub(crate) fn render_snapshot(ctx: &CliContext, snapshot: &HealthStatusResponse) {
    let summary = &snapshot.summary;
    let ok = summary.overall_status == OverallStatus::AllHealthy;

    println!(
        "{} {}/{} servers healthy (as of {})",
        ctx.display.badge(summary.overall_status.label(), ok),
        summary.healthy_servers,
        summary.total_servers,
        format_date(&snapshot.timestamp)
    );

    if snapshot.servers.is_empty() {
        ctx.display.print_warning("No storage servers registered");
        return;
    }

    let table = Table::new(server_rows(&snapshot.servers, &ctx.display));
    println!("{}", format_table(table, ctx.no_color()));

    for server in snapshot.unhealthy() {
        let mut pairs = vec![(
            "Error",
            server
                .error
                .clone()
                .unwrap_or_else(|| "No error reported".to_string()),
        )];
        if let Some(details) = &server.error_details {
            pairs.push(("URL", details.server_url.clone()));
            if let Some(failed_at) = &details.failed_at {
                pairs.push(("Failed at", format_date(failed_at)));
            }
        }
        println!();
        ctx.display
            .print_error(&format!("{} is down", server.instance.instance_identifier));
        println!("{}", ctx.display.format_key_value_pairs(&pairs));
    }
}

/// Full-screen redraw used by `vk health --watch`
pub(crate) fn render_health_view(
    ctx: &CliContext,
    view: &HealthView,
    refresh_every: Duration,
) -> Result<()> {
    if ctx.print_structured(&view.snapshot)? {
        return Ok(());
    }

    ctx.display.clear_screen()?;
    ctx.display.print_header("Vault-Krate health");

    if let Some(error) = &view.error {
        ctx.display.print_error(&error.message);
        if let Some(server) = &error.failed_server {
            println!("  Failed server: {}", server.display_name());
        }
    }

    match &view.snapshot {
        Some(snapshot) => render_snapshot(ctx, snapshot),
        None if view.is_loading() => println!("Loading..."),
        None => println!("No data yet"),
    }

    println!();
    let updated = view
        .last_update
        .as_ref()
        .map(format_date)
        .unwrap_or_else(|| "never".to_string());
    println!(
        "Last update: {}  |  refreshing every {}s  |  Enter: refresh, q: quit",
        updated,
        refresh_every.as_secs()
    );
    if view.is_loading() {
        println!("Refreshing...");
    }
    Ok(())
}
