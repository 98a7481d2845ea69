//! Subcommand implementations.

use anyhow::{bail, Context};
use serde::Serialize;
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use relink_core::migration::rules::ContentSource;
use relink_core::migration::{ContentLocator, Resolution};
use relink_core::{
    FieldRegistry, InMemoryStore, LegacyPlugin, LinkFieldMigration, LogLine, MigrationConfig,
    MigrationContext, MigrationLog, MigrationOptions, MigrationReport, PluginRegistry,
    RecordingLog, RichContent, SiteDirectory, TableAccess,
};
use relink_db::{PgStore, PoolConfig};

use crate::args::{Cli, Commands, InspectArgs, MigrateArgs, SourceArgs};
use crate::console::ConsoleLog;

/// Run a parsed command line against stdout.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let ansi = stdout.is_terminal();
    run_with(cli, &mut stdout.lock(), ansi)
}

/// Run a parsed command line, writing log lines and reports to `out`.
pub fn run_with<W: Write>(cli: Cli, out: &mut W, ansi: bool) -> anyhow::Result<()> {
    match cli.command {
        Commands::Migrate(args) => migrate_command(&args, out, ansi),
        Commands::Inspect(args) => inspect_command(&args, out),
    }
}

// =============================================================================
// STORE SELECTION
// =============================================================================

enum Store {
    Memory(InMemoryStore),
    Postgres(PgStore),
}

/// Config file or environment, with command-line values on top.
fn load_config(source: &SourceArgs) -> anyhow::Result<MigrationConfig> {
    let mut config = MigrationConfig::load(source.config.as_deref())?;

    if let Some(url) = &source.database_url {
        config.database_url = Some(url.clone());
    }
    if let Some(prefix) = &source.table_prefix {
        config.table_prefix = prefix.clone();
    }

    Ok(config)
}

fn open_store(source: &SourceArgs, config: &MigrationConfig) -> anyhow::Result<Store> {
    if let Some(path) = &source.snapshot {
        let store = InMemoryStore::load(path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        return Ok(Store::Memory(store));
    }

    let Some(url) = config.database_url.as_deref() else {
        bail!("No database configured: pass --database-url or --snapshot, or set DATABASE_URL");
    };

    let store = PgStore::connect(url, &config.table_prefix, PoolConfig::default())
        .context("Failed to connect to database")?;
    Ok(Store::Postgres(store))
}

// =============================================================================
// MIGRATE
// =============================================================================

/// Run one migration with the options and type overrides from `config`.
pub fn migrate<S>(
    store: &S,
    plugin: &'static LegacyPlugin,
    config: &MigrationConfig,
    log: &dyn MigrationLog,
) -> relink_core::Result<MigrationReport>
where
    S: FieldRegistry + TableAccess + SiteDirectory + PluginRegistry + RichContent,
{
    let options = MigrationOptions {
        resave_fields: config.resave_fields,
        rich_content_plugin: config.rich_content_plugin.clone(),
    };

    let mut migration =
        LinkFieldMigration::new(MigrationContext::new(store, log), plugin).with_options(options);
    if let Some(hook) = config.type_override() {
        migration = migration.with_type_override(hook);
    }

    migration.run()
}

fn migrate_command<W: Write>(args: &MigrateArgs, out: &mut W, ansi: bool) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(&args.source)?;
    if let Some(resave) = args.resave_override() {
        config.resave_fields = Some(resave);
    }
    if let Some(plugin) = &args.rich_content_plugin {
        config.rich_content_plugin = plugin.clone();
    }
    config.validate()?;

    let store = open_store(&args.source, &config)?;

    let report = if args.json {
        let log = RecordingLog::new();
        let report = run_on(&store, args.plugin, &config, &log)?;
        let output = JsonOutput {
            report: &report,
            log: log.lines(),
        };
        serde_json::to_writer_pretty(&mut *out, &output)?;
        writeln!(out)?;
        report
    } else {
        let log = ConsoleLog::new(&mut *out, ansi);
        let report = run_on(&store, args.plugin, &config, &log)?;
        drop(log);
        writeln!(out, "{}", report)?;
        report
    };

    match store {
        Store::Memory(store) => match &args.output {
            Some(path) => save_snapshot(&store, path)?,
            None => warn!(
                subsystem = "cli",
                op = "migrate",
                "Dry run: no --output given, migrated snapshot discarded"
            ),
        },
        Store::Postgres(store) => store.close(),
    }

    info!(
        subsystem = "cli",
        op = "migrate",
        plugin = args.plugin.name,
        has_failures = report.has_failures(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Migration command finished"
    );

    Ok(())
}

/// `--json` output: the report plus every migration log line.
#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    report: &'a MigrationReport,
    log: Vec<LogLine>,
}

fn run_on(
    store: &Store,
    plugin: &'static LegacyPlugin,
    config: &MigrationConfig,
    log: &dyn MigrationLog,
) -> relink_core::Result<MigrationReport> {
    match store {
        Store::Memory(store) => migrate(store, plugin, config, log),
        Store::Postgres(store) => migrate(store, plugin, config, log),
    }
}

fn save_snapshot(store: &InMemoryStore, path: &Path) -> anyhow::Result<()> {
    store
        .save(path)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    info!(
        subsystem = "cli",
        op = "migrate",
        path = %path.display(),
        "Migrated snapshot written"
    );
    Ok(())
}

// =============================================================================
// INSPECT
// =============================================================================

/// Where a legacy field's content lives, or why it cannot be located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldLocation {
    pub id: i64,
    pub uid: String,
    pub handle: String,
    pub context: String,
    /// `table.column` the converted values are written to.
    pub location: Option<String>,
    pub problem: Option<String>,
}

/// Resolve the content location of every field the plugin's migration
/// would touch. Nothing is written.
pub fn inspect<S>(store: &S, plugin: &'static LegacyPlugin) -> relink_core::Result<Vec<FieldLocation>>
where
    S: FieldRegistry + TableAccess,
{
    let locator = ContentLocator::new(store, store);
    let mut located = Vec::new();

    for record in store.fields_of_type(plugin.field_type)? {
        let (location, problem) = match store.field_by_id(record.id)? {
            None => (None, Some("Field is not registered.".to_string())),
            Some(field) => match locator.resolve(&field)? {
                Resolution::Found(found) => (Some(format!("{}.{}", found.table, found.column)), None),
                Resolution::Unlocatable(reason) => (None, Some(reason)),
            },
        };

        located.push(FieldLocation {
            id: record.id,
            uid: record.uid,
            handle: record.handle,
            context: record.context,
            location,
            problem,
        });
    }

    Ok(located)
}

fn inspect_command<W: Write>(args: &InspectArgs, out: &mut W) -> anyhow::Result<()> {
    let config = load_config(&args.source)?;
    let store = open_store(&args.source, &config)?;

    let located = match &store {
        Store::Memory(store) => inspect(store, args.plugin)?,
        Store::Postgres(store) => inspect(store, args.plugin)?,
    };

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &located)?;
        writeln!(out)?;
    } else {
        if let ContentSource::SideTable { table } = args.plugin.content {
            writeln!(out, "Values are read from the {} table.", table)?;
        }
        writeln!(out, "{:>6}  {:<24} {:<40} LOCATION", "ID", "HANDLE", "CONTEXT")?;
        for field in &located {
            let location = match (&field.location, &field.problem) {
                (Some(location), _) => location.clone(),
                (None, Some(problem)) => format!("! {}", problem),
                (None, None) => "-".to_string(),
            };
            writeln!(
                out,
                "{:>6}  {:<24} {:<40} {}",
                field.id, field.handle, field.context, location
            )?;
        }
        writeln!(out, "{} {} field(s)", located.len(), args.plugin.name)?;
    }

    if let Store::Postgres(store) = store {
        store.close();
    }

    Ok(())
}
