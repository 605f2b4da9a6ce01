use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use regulome_explorer::analysis::ExplorerSession;
use regulome_explorer::config::{CliOverrides, ExplorerConfig};
use regulome_explorer::feature_catalog::{FeatureType, Study};
use regulome_explorer::presentation::{format_pair_summary, format_table};
use regulome_explorer::query_planner::{
    parse_symbol_list, plan_pair_query, plan_scan_query, PairRequest, ScanRequest,
};
use regulome_explorer::render_plan::ToSql;
use regulome_explorer::warehouse::BigQueryClient;

/// Regulome Explorer - pan-cancer feature association queries on BigQuery
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file (defaults to REGULOME_* / BIGQUERY_* variables)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    /// BigQuery billing project
    #[arg(long, global = true, env = "BIGQUERY_PROJECT")]
    project: Option<String>,

    /// Rows shown for scan results
    #[arg(long, global = true)]
    display_rows: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered feature types
    Features,

    /// List the usable columns of a clinical feature type
    Columns {
        #[arg(long)]
        feature: FeatureType,
    },

    /// Score a gene list against every symbol of a second feature
    Scan {
        #[arg(long)]
        study: Option<Study>,
        #[arg(long)]
        feature1: FeatureType,
        #[arg(long)]
        feature2: FeatureType,
        /// Comma or space separated gene symbols
        #[arg(long)]
        genes: String,
        #[arg(long)]
        min_samples: Option<u32>,
        /// Estimate bytes processed without running the query
        #[arg(long)]
        dry_run: bool,
        /// Print the generated SQL and exit
        #[arg(long)]
        sql_only: bool,
    },

    /// Fetch one symbol pair and test it
    Pair {
        #[arg(long)]
        study: Option<Study>,
        #[arg(long)]
        feature1: FeatureType,
        #[arg(long)]
        feature2: FeatureType,
        /// Gene symbol, or column name for a clinical feature
        #[arg(long)]
        label1: String,
        #[arg(long)]
        label2: String,
        #[arg(long)]
        min_samples: Option<u32>,
        /// Print the generated SQL and exit
        #[arg(long)]
        sql_only: bool,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let (study, min_samples) = match &self.command {
            Command::Scan {
                study, min_samples, ..
            }
            | Command::Pair {
                study, min_samples, ..
            } => (*study, *min_samples),
            _ => (None, None),
        };
        CliOverrides {
            min_samples,
            study,
            display_rows: self.display_rows,
            project_id: self.project.clone(),
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ExplorerConfig> {
    let config = match &cli.config {
        Some(path) => ExplorerConfig::from_yaml_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => ExplorerConfig::from_env().context("reading configuration from environment")?,
    };
    Ok(config.with_overrides(cli.overrides())?)
}

fn connect(config: ExplorerConfig) -> anyhow::Result<ExplorerSession<BigQueryClient>> {
    let warehouse = config
        .warehouse
        .clone()
        .context("no BigQuery project configured (set BIGQUERY_PROJECT or --project)")?;
    let client = BigQueryClient::new(warehouse)?;
    Ok(ExplorerSession::new(client, config))
}

fn print_features() {
    for feature in FeatureType::ALL {
        let descriptor = feature.descriptor();
        println!("{}", feature);
        println!("  table:     {}", descriptor.source_table);
        println!("  symbol:    {}", descriptor.symbol_template());
        println!("  value:     {}", descriptor.value_template());
        println!("  rank:      {}", descriptor.rank_template());
        println!("  kind:      {}", descriptor.data_kind);
        println!("  statistic: {:?}", descriptor.statistic);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let study = config.default_study;

    match cli.command {
        Command::Features => print_features(),

        Command::Columns { feature } => {
            if !feature.is_clinical() {
                bail!("{} is not a clinical feature type", feature);
            }
            let session = connect(config)?;
            for column in session.clinical_columns(feature).await? {
                println!("{:<50} {}", column.name, column.fragment().to_sql());
            }
        }

        Command::Scan {
            feature1,
            feature2,
            genes,
            dry_run,
            sql_only,
            ..
        } => {
            if sql_only && !feature2.is_clinical() {
                let query = plan_scan_query(
                    &ScanRequest {
                        study,
                        feature1,
                        feature2,
                        symbols: parse_symbol_list(&genes),
                        min_samples: config.min_samples,
                    },
                    &[],
                )?;
                println!("{}", query.to_sql());
                return Ok(());
            }

            let display_rows = config.display_rows;
            let session = connect(config)?;
            if sql_only {
                let query = session.plan_scan(study, feature1, feature2, &genes).await?;
                println!("{}", query.to_sql());
                return Ok(());
            }

            match session
                .scan(study, feature1, feature2, &genes, dry_run)
                .await?
            {
                Some(table) if dry_run => {
                    println!("Dry run complete; columns: {}", table.columns.join(", "))
                }
                Some(table) => print!("{}", format_table(&table, display_rows)),
                None => bail!("the scan query failed; see the log for details"),
            }
        }

        Command::Pair {
            feature1,
            feature2,
            label1,
            label2,
            sql_only,
            ..
        } => {
            let display_rows = config.display_rows;
            if sql_only {
                let query = plan_pair_query(&PairRequest {
                    study,
                    feature1,
                    feature2,
                    label1,
                    label2,
                })?;
                println!("{}", query.to_sql());
                return Ok(());
            }

            let session = connect(config)?;
            match session
                .pair(study, feature1, feature2, &label1, &label2)
                .await?
            {
                Some(analysis) => {
                    print!("{}", format_table(&analysis.table, display_rows));
                    println!();
                    print!("{}", format_pair_summary(&analysis.summary));
                }
                None => bail!("the pair query failed; see the log for details"),
            }
        }
    }

    Ok(())
}
