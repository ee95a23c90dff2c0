//! edfi-dms-ddl CLI - DDL and seed DML generation for the DMS relational backend.

use clap::{Parser, Subcommand};
use edfi_dms_ddl::identity::{referential_id, IdentityElement};
use edfi_dms_ddl::{
    CoreDdlEmitter, DdlConfig, DdlError, DerivedRelationalModelSet, EffectiveSchemaInfo,
    SeedDmlEmitter, SqlDialectKind,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "edfi-dms-ddl")]
#[command(about = "Deterministic DDL and seed DML for the Ed-Fi DMS relational backend")]
#[command(version)]
struct Cli {
    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit a deployment script (core DDL, relational DDL, seed DML)
    Emit {
        /// Path to YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Target dialect: pgsql or mssql (overrides config)
        #[arg(short, long)]
        dialect: Option<String>,

        /// Relational model file, JSON or YAML (overrides config)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Effective schema file for seed DML without a model (overrides config)
        #[arg(long)]
        effective_schema: Option<PathBuf>,

        /// Output file (overrides config; stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the core dms.* DDL
        #[arg(long)]
        no_core: bool,

        /// Skip the relational DDL
        #[arg(long)]
        no_relational: bool,

        /// Skip the seed DML
        #[arg(long)]
        no_seed: bool,
    },

    /// Emit only the core dms.* DDL
    Core {
        /// Target dialect: pgsql or mssql
        #[arg(short, long)]
        dialect: String,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Emit only the seed DML for an effective schema
    Seed {
        /// Target dialect: pgsql or mssql
        #[arg(short, long)]
        dialect: String,

        /// Effective schema file, JSON or YAML
        #[arg(short, long)]
        effective_schema: PathBuf,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a relational model file without emitting
    Check {
        /// Relational model file, JSON or YAML
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Print the referential id for a resource identity
    ReferentialId {
        /// Project name (e.g. Ed-Fi)
        #[arg(long)]
        project: String,

        /// Resource name (e.g. School)
        #[arg(long)]
        resource: String,

        /// Identity element as PATH=VALUE, in identity order (repeatable)
        #[arg(long = "identity", required = true)]
        identity: Vec<String>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), DdlError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(DdlError::Config)?;

    match cli.command {
        Commands::Emit {
            config,
            dialect,
            model,
            effective_schema,
            output,
            no_core,
            no_relational,
            no_seed,
        } => {
            let mut ddl_config = match &config {
                Some(path) => {
                    let loaded = DdlConfig::load(path)?;
                    info!("Loaded configuration from {:?}", path);
                    loaded
                }
                None => {
                    let dialect = dialect.as_deref().ok_or_else(|| {
                        DdlError::Config("--dialect is required when no --config is given".into())
                    })?;
                    let mut fresh = DdlConfig::new(parse_dialect(dialect)?);
                    // Without a config file, sections follow the inputs given.
                    fresh.sections.relational = model.is_some();
                    fresh.sections.seed = model.is_some() || effective_schema.is_some();
                    fresh
                }
            };

            // Apply overrides
            if let Some(dialect) = &dialect {
                ddl_config.dialect = parse_dialect(dialect)?;
            }
            if let Some(path) = model {
                ddl_config.model = Some(path);
            }
            if let Some(path) = effective_schema {
                ddl_config.effective_schema = Some(path);
            }
            if let Some(path) = output {
                ddl_config.output = Some(path);
            }
            if no_core {
                ddl_config.sections.core = false;
            }
            if no_relational {
                ddl_config.sections.relational = false;
            }
            if no_seed {
                ddl_config.sections.seed = false;
            }

            let sql = ddl_config.emit()?;
            write_output(&sql, ddl_config.output.as_deref())
        }

        Commands::Core { dialect, output } => {
            let sql = CoreDdlEmitter::new(parse_dialect(&dialect)?).emit()?;
            write_output(&sql, output.as_deref())
        }

        Commands::Seed {
            dialect,
            effective_schema,
            output,
        } => {
            let schema = EffectiveSchemaInfo::load(&effective_schema)?;
            let sql = SeedDmlEmitter::new(parse_dialect(&dialect)?).emit(&schema)?;
            write_output(&sql, output.as_deref())
        }

        Commands::Check { model } => {
            let set = DerivedRelationalModelSet::load(&model)?;
            println!(
                "Model OK: dialect={}, resources={}, tables={}, views={}, indexes={}, triggers={}",
                set.dialect,
                set.concrete_resources_in_name_order.len(),
                set.all_tables().count(),
                set.abstract_union_views_in_name_order.len(),
                set.indexes_in_create_order.len(),
                set.triggers_in_create_order.len()
            );
            Ok(())
        }

        Commands::ReferentialId {
            project,
            resource,
            identity,
        } => {
            let elements = identity
                .iter()
                .map(|pair| parse_identity_element(pair))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", referential_id(&project, &resource, &elements));
            Ok(())
        }
    }
}

fn parse_dialect(value: &str) -> Result<SqlDialectKind, DdlError> {
    value.parse()
}

fn parse_identity_element(pair: &str) -> Result<IdentityElement, DdlError> {
    match pair.split_once('=') {
        Some((path, value)) if !path.is_empty() => Ok(IdentityElement::new(path, value)),
        _ => Err(DdlError::Config(format!(
            "identity element must be PATH=VALUE, got '{}'",
            pair
        ))),
    }
}

fn write_output(sql: &str, output: Option<&Path>) -> Result<(), DdlError> {
    match output {
        Some(path) => {
            std::fs::write(path, sql)?;
            info!(path = %path.display(), bytes = sql.len(), "Wrote script");
        }
        None => print!("{}", sql),
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    // Logs go to stderr so stdout carries only SQL.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
