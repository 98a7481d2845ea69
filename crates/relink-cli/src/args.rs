//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use relink_core::LegacyPlugin;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relink")]
#[command(author, version, about = "Migrate legacy link fields to the unified link field")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate every field of a legacy link plugin
    Migrate(MigrateArgs),

    /// List the fields a migration would touch and where their content lives
    Inspect(InspectArgs),
}

/// Where fields and content are read from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// PostgreSQL connection string (overrides the config file and DATABASE_URL)
    #[arg(long, conflicts_with = "snapshot")]
    pub database_url: Option<String>,

    /// Work on a JSON store snapshot instead of a database
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Prefix of every CMS table name
    #[arg(long)]
    pub table_prefix: Option<String>,

    /// TOML config file (default: $RELINK_CONFIG, then environment variables)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Legacy plugin to migrate: linkit or typed-link
    #[arg(short, long, value_parser = parse_plugin)]
    pub plugin: &'static LegacyPlugin,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Write the migrated snapshot here (snapshot mode only; without it the run is a dry run)
    #[arg(short, long, requires = "snapshot")]
    pub output: Option<PathBuf>,

    /// Re-save migrated fields at the end of the run
    #[arg(long, conflicts_with = "no_resave")]
    pub resave: bool,

    /// Skip the final re-save
    #[arg(long)]
    pub no_resave: bool,

    /// Handle of the rich-content plugin whose documents are patched
    #[arg(long)]
    pub rich_content_plugin: Option<String>,

    /// Print the report as JSON instead of migration log lines
    #[arg(long)]
    pub json: bool,
}

impl MigrateArgs {
    /// Re-save override given on the command line, if any.
    pub fn resave_override(&self) -> Option<bool> {
        match (self.resave, self.no_resave) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Legacy plugin whose fields are listed: linkit or typed-link
    #[arg(short, long, value_parser = parse_plugin)]
    pub plugin: &'static LegacyPlugin,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

fn parse_plugin(value: &str) -> Result<&'static LegacyPlugin, String> {
    value
        .parse::<&'static LegacyPlugin>()
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_migrate() {
        let cli = Cli::try_parse_from([
            "relink",
            "migrate",
            "--plugin",
            "typed-link",
            "--snapshot",
            "store.json",
            "--output",
            "out.json",
            "--no-resave",
        ])
        .unwrap();

        match cli.command {
            Commands::Migrate(args) => {
                assert_eq!(args.plugin.name, "typed-link");
                assert_eq!(args.source.snapshot, Some(PathBuf::from("store.json")));
                assert_eq!(args.resave_override(), Some(false));
                assert!(!args.json);
            }
            other => panic!("expected migrate, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_plugin_rejected() {
        let err = Cli::try_parse_from(["relink", "migrate", "--plugin", "redactor"]).unwrap_err();
        assert!(err.to_string().contains("Unknown legacy plugin"));
    }

    #[test]
    fn test_database_and_snapshot_conflict() {
        assert!(Cli::try_parse_from([
            "relink",
            "inspect",
            "-p",
            "linkit",
            "--database-url",
            "postgres://localhost/craft",
            "--snapshot",
            "store.json",
        ])
        .is_err());
    }

    #[test]
    fn test_output_requires_snapshot() {
        assert!(
            Cli::try_parse_from(["relink", "migrate", "-p", "linkit", "--output", "out.json"])
                .is_err()
        );
    }

    #[test]
    fn test_resave_flags() {
        let parse = |extra: &[&str]| {
            let mut argv = vec!["relink", "migrate", "-p", "linkit"];
            argv.extend_from_slice(extra);
            match Cli::try_parse_from(argv).unwrap().command {
                Commands::Migrate(args) => args.resave_override(),
                _ => unreachable!(),
            }
        };

        assert_eq!(parse(&[]), None);
        assert_eq!(parse(&["--resave"]), Some(true));
        assert_eq!(parse(&["--no-resave"]), Some(false));
        assert!(Cli::try_parse_from(["relink", "migrate", "-p", "linkit", "--resave", "--no-resave"]).is_err());
    }
}
