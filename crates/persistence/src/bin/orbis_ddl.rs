//! orbis-ddl
//!
//! Compiles migration documents, authored in one SQL dialect, into DDL for
//! another. DDL goes to stdout; logs go to stderr.
//!
//! ```text
//! orbis-ddl --dialect postgres migrations/0001_invoices.json
//! orbis-ddl --dialect sqlite --apply ./dev.db migrations/*.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use orbis_persistence::config::PersistenceConfig;
use orbis_persistence::schema::{
    Dialect, MatchKind, Migration, SchemaOperation, SchemaTranslator,
    TranslatingCompiler, compiler_for,
};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "orbis-ddl", version, about = "Compile Orbis migrations to dialect-specific DDL")]
struct Args {
    /// Migration JSON files, compiled in the order given.
    #[arg(required = true)]
    migrations: Vec<PathBuf>,

    /// Dialect to emit. Defaults to `ORBIS_TARGET_DIALECT`, then postgres.
    #[arg(short, long)]
    dialect: Option<Dialect>,

    /// Dialect the migrations are written in. Defaults to
    /// `ORBIS_SOURCE_DIALECT`, then sqlserver.
    #[arg(long)]
    source: Option<Dialect>,

    /// Print how each column type was mapped instead of DDL.
    #[arg(long)]
    explain: bool,

    /// Apply the migrations to this SQLite database instead of printing DDL.
    #[cfg(feature = "sqlite")]
    #[arg(long, value_name = "PATH", conflicts_with = "explain")]
    apply: Option<PathBuf>,

    /// Log level.
    #[arg(long, env = "ORBIS_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("orbis_persistence={},orbis_ddl={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load(path: &Path) -> anyhow::Result<Migration> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Migration::from_json(&json).with_context(|| format!("invalid migration {}", path.display()))
}

fn explain(migration: &Migration, translator: &SchemaTranslator) {
    println!("-- {}", migration.id);
    for op in &migration.operations {
        let (table, columns) = match op {
            SchemaOperation::CreateTable(create) => (&create.name, create.columns.iter().collect::<Vec<_>>()),
            SchemaOperation::AddColumn(add) => (&add.table, vec![&add.column]),
            SchemaOperation::AlterColumn(alter) => (&alter.table, vec![&alter.column]),
            _ => continue,
        };
        for column in columns {
            let (mapped, kind) = translator.table().resolve(&column.column_type);
            let note = match kind {
                MatchKind::Exact => "exact",
                MatchKind::Parameterized => "parameterized",
                MatchKind::Unmatched => "passthrough",
                MatchKind::Unparsed => "passthrough (unparsed)",
            };
            println!(
                "{}.{}: {} -> {} [{}]",
                table,
                column.name,
                column.column_type,
                mapped.as_deref().unwrap_or(&column.column_type),
                note
            );
        }
    }
}

#[cfg(feature = "sqlite")]
async fn apply(
    path: &Path,
    migrations: &[Migration],
    source: Dialect,
    config: &PersistenceConfig,
) -> anyhow::Result<()> {
    use orbis_persistence::MigrationEngine;
    use orbis_persistence::backends::sqlite::SqliteEngine;

    let engine = SqliteEngine::with_config(path, config.sqlite.clone())?;
    for migration in migrations {
        engine.apply_migration(migration, source).await?;
    }
    info!(database = %path.display(), count = migrations.len(), "Migrations applied");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = PersistenceConfig::from_env();
    if let Err(errors) = config.validate() {
        anyhow::bail!("invalid configuration: {}", errors.join("; "));
    }
    let source = args.source.unwrap_or(config.source_dialect);
    let target = args.dialect.unwrap_or(config.target_dialect);

    let migrations = args
        .migrations
        .iter()
        .map(|path| load(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    info!(count = migrations.len(), source = %source, target = %target, "Loaded migrations");

    #[cfg(feature = "sqlite")]
    if let Some(path) = &args.apply {
        if target != Dialect::Sqlite {
            anyhow::bail!("--apply requires --dialect sqlite");
        }
        return apply(path, &migrations, source, &config).await;
    }

    if args.explain {
        let translator = SchemaTranslator::for_dialects(source, target)?;
        for migration in &migrations {
            explain(migration, &translator);
        }
        return Ok(());
    }

    let compiler = TranslatingCompiler::new(source, compiler_for(target))?;
    for migration in &migrations {
        println!("-- {}", migration.id);
        for statement in migration.compile(&compiler)? {
            println!("{};", statement);
        }
        println!();
    }
    Ok(())
}
