use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, ContentArrangement, Table};
use lazyflags_app::CacheListing;
use lazyflags_core::cache::ResultCache;
use lazyflags_core::doctor::DoctorReport;
use log::{info, warn};

use crate::cli::{CacheCommand, Cli, Command};

pub fn run_with_deps(cli: Cli) -> Result<()> {
    let fixture = cli.fixture.as_deref();
    match cli.command {
        None => run_browser(fixture),
        Some(Command::Doctor) => run_doctor_command(fixture),
        Some(Command::Cache {
            action: CacheCommand::Show,
        }) => run_cache_show_command(),
        Some(Command::Cache {
            action: CacheCommand::Clear,
        }) => run_cache_clear_command(),
    }
}

fn run_browser(fixture: Option<&Path>) -> Result<()> {
    let settings = lazyflags_app::load_settings()?;
    let app = lazyflags_app::connect(&settings, fixture)?;
    let cache = ResultCache::open_default();
    info!(
        "starting browser (cache: {})",
        cache
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "memory only".to_string())
    );

    lazyflags_tui::run(app, cache)
}

fn run_doctor_command(fixture: Option<&Path>) -> Result<()> {
    let report = lazyflags_app::doctor(fixture);
    if report.has_failures() {
        warn!("doctor found problems: {}", report.summary());
    }
    print_doctor_report(&report);
    Ok(())
}

fn run_cache_show_command() -> Result<()> {
    let listing = lazyflags_app::list_cache()?;
    print_cache_listing(&listing);
    Ok(())
}

fn run_cache_clear_command() -> Result<()> {
    let path = lazyflags_app::clear_cache()?;
    println!("Cleared cache at {}", path.display());
    Ok(())
}

fn print_doctor_report(report: &DoctorReport) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Check", "Status", "Details"]);

    for check in &report.checks {
        table.add_row(vec![
            Cell::new(check.name.as_str()),
            Cell::new(check.state.to_string()),
            Cell::new(check.details.as_str()),
        ]);
    }

    println!("{table}");
    println!("{}", report.summary());
}

fn print_cache_listing(listing: &CacheListing) {
    println!("Cache file: {}", listing.path.display());
    if listing.rows.is_empty() {
        println!("No cache entries.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Environments", "Failed", "Expires", "Status"]);

    for row in &listing.rows {
        let status = if row.expired { "expired" } else { "valid" };
        table.add_row(vec![
            Cell::new(row.key.as_str()),
            Cell::new(row.environments),
            Cell::new(row.failed_environments),
            Cell::new(row.expires.as_str()),
            Cell::new(status),
        ]);
    }

    println!("{table}");
}
