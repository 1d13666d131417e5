use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use exprsql::config::{self, SqlDialect, TranslatorConfig};
use exprsql::model::ModelConfig;
use exprsql::type_mapping::RelationalTypeMappingSource;
use exprsql::{QueryExpr, StaticModel, TranslationEnv, TranslationError, TranslatorBuilder};
use serde::Serialize;

/// exprsql - translate object-query expressions into SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate one expression and print the rendered SQL
    Translate(TranslateArgs),
    /// Load and validate an entity model
    CheckModel {
        /// YAML entity model
        #[arg(long)]
        model: PathBuf,

        /// Dialect whose store types the model is resolved against
        #[arg(long, default_value = "generic")]
        dialect: SqlDialect,
    },
}

#[derive(Args)]
struct TranslateArgs {
    /// YAML entity model
    #[arg(long)]
    model: PathBuf,

    /// Expression as JSON; use --expr-file to read it from disk
    #[arg(long, conflicts_with = "expr_file", required_unless_present = "expr_file")]
    expr: Option<String>,

    /// File holding the expression JSON
    #[arg(long)]
    expr_file: Option<PathBuf>,

    /// Translate as a search condition (WHERE) instead of a value
    #[arg(long)]
    predicate: bool,

    /// Translate as part of a subquery, where client evaluation is impossible
    #[arg(long)]
    subquery: bool,

    /// YAML translator configuration, used instead of EXPRSQL_* environment
    /// variables; the flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit naive comparisons without null compensation
    #[arg(long)]
    relational_nulls: bool,

    /// Target dialect (generic, sqlite)
    #[arg(long)]
    dialect: Option<SqlDialect>,

    /// Prefix rendered in front of parameter names
    #[arg(long)]
    parameter_prefix: Option<String>,

    /// Maximum nesting depth of a translated expression
    #[arg(long)]
    max_expression_depth: Option<u32>,

    /// Render columns without their table alias
    #[arg(long)]
    unqualified_columns: bool,
}

impl From<&TranslateArgs> for config::CliConfig {
    fn from(cli: &TranslateArgs) -> Self {
        config::CliConfig {
            use_relational_nulls: cli.relational_nulls,
            parameter_prefix: cli.parameter_prefix.clone(),
            max_expression_depth: cli.max_expression_depth,
            unqualified_columns: cli.unqualified_columns,
            dialect: cli.dialect,
        }
    }
}

#[derive(Serialize)]
struct Output {
    sql: String,
    parameters: Vec<String>,
    joins: Vec<exprsql::model::JoinRequest>,
}

fn main() {
    // Defaults to WARN, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Translate(args) => translate(args),
        Command::CheckModel { model, dialect } => check_model(model, *dialect),
    };
    match result {
        Ok(()) => {}
        Err(e) => {
            // Untranslatable expressions are an expected outcome: the caller evaluates on the client
            let code = match e.downcast_ref::<TranslationError>() {
                Some(err) if !err.is_fatal() => 2,
                _ => 1,
            };
            eprintln!("Error: {:#}", e);
            std::process::exit(code);
        }
    }
}

fn check_model(path: &Path, dialect: SqlDialect) -> Result<()> {
    let registry = RelationalTypeMappingSource::for_dialect(dialect);
    let config = ModelConfig::from_yaml_file(path)
        .with_context(|| format!("loading model {}", path.display()))?;
    StaticModel::from_config(&config, &registry).context("invalid model")?;

    for entity in &config.entities {
        println!(
            "{} -> {} ({} properties, {} navigations)",
            entity.name,
            entity.table,
            entity.properties.len(),
            entity.navigations.len()
        );
    }
    Ok(())
}

fn translate(cli: &TranslateArgs) -> Result<()> {
    let base = match &cli.config {
        Some(path) => TranslatorConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TranslatorConfig::from_env().context("invalid environment configuration")?,
    };
    let config = base.merge(cli.into()).context("invalid configuration")?;
    log::info!("Translating for {} dialect", config.dialect);

    let expr_json = match (&cli.expr, &cli.expr_file) {
        (Some(expr), _) => expr.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading expression {}", path.display()))?,
        (None, None) => anyhow::bail!("either --expr or --expr-file is required"),
    };
    let expr: QueryExpr =
        serde_json::from_str(&expr_json).context("expression is not valid JSON")?;

    let visitor = TranslatorBuilder::new(config).build();
    let model = StaticModel::from_yaml_file(&cli.model, visitor.factory().type_mappings())
        .with_context(|| format!("loading model {}", cli.model.display()))?;

    let mut env = if cli.subquery {
        TranslationEnv::for_subquery(&model)
    } else {
        TranslationEnv::new(&model)
    };
    let sql = if cli.predicate {
        visitor.translate_predicate(&expr, &mut env)?
    } else {
        visitor.translate(&expr, &mut env)?
    };

    let rendered = visitor.renderer().render(&sql);
    let output = Output {
        sql: rendered.sql,
        parameters: rendered.parameters,
        joins: env.joins().to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
