use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gwas_search_docs::app::{App, BuildOptions};
use gwas_search_docs::config::{ConfigLoader, ResolvedConfig};
use gwas_search_docs::domain::DocumentType;
use gwas_search_docs::ensembl::{Cytoband, EnsemblGene, EnsemblHttpClient, GeneAnnotationSource};
use gwas_search_docs::error::DocsError;
use gwas_search_docs::ols::OlsHttpClient;
use gwas_search_docs::output::{JsonOutput, LogSink};
use gwas_search_docs::source::{DEFAULT_MAX_BATCH, Snapshot, SnapshotTables};

#[derive(Parser)]
#[command(name = "gwas-docs")]
#[command(about = "Build gene, trait and variant search documents from a GWAS association snapshot")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build search documents")]
    Build(BuildArgs),
    #[command(about = "Resolve the descendant closure of an ontology term")]
    Closure(ClosureArgs),
}

#[derive(Args)]
struct BuildArgs {
    #[arg(long)]
    snapshot: PathBuf,

    #[arg(long, default_value = "data")]
    out: Utf8PathBuf,

    #[arg(long, value_enum, default_value_t = DocumentType::All)]
    document_type: DocumentType,

    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct ClosureArgs {
    /// Term IRI, e.g. http://www.ebi.ac.uk/efo/EFO_0004339
    iri: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(docs) = report.downcast_ref::<DocsError>() {
            return ExitCode::from(map_exit_code(docs));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DocsError) -> u8 {
    match error {
        DocsError::ConfigRead(_)
        | DocsError::ConfigParse(_)
        | DocsError::SnapshotRead(_)
        | DocsError::SnapshotParse(_)
        | DocsError::InvalidTermId(_) => 2,
        error if error.is_upstream() => 3,
        DocsError::EmptyOutput => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Build(args) => run_build(args, &config),
        Commands::Closure(args) => run_closure(args, &config),
    }
}

fn run_build(args: BuildArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let snapshot = Snapshot::load(&args.snapshot)?;
    let ols = ols_client(config)?;
    let ensembl = EnsemblHttpClient::new(
        &config.ensembl_base_url,
        config.lookup_chunk,
        config.timeout,
        config.retry,
    )?;
    let app = App::new(snapshot, ols, ensembl, config.closure);
    let options = BuildOptions {
        document_type: args.document_type,
        limit: args.limit,
    };
    let result = app.build(options, &LogSink)?;
    JsonOutput::write_documents(&args.out, &result)?;
    JsonOutput::print_report(&result.report).into_diagnostic()?;
    Ok(())
}

fn run_closure(args: ClosureArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let data = Snapshot::new(SnapshotTables::default(), DEFAULT_MAX_BATCH);
    let app = App::new(data, ols_client(config)?, NopEnsembl, config.closure);
    let result = app.closure(&args.iri, &LogSink)?;
    JsonOutput::print_closure(&result).into_diagnostic()?;
    Ok(())
}

fn ols_client(config: &ResolvedConfig) -> Result<OlsHttpClient, DocsError> {
    OlsHttpClient::new(
        &config.ols_base_url,
        &config.ontology,
        config.timeout,
        config.retry,
    )
}

struct NopEnsembl;

impl GeneAnnotationSource for NopEnsembl {
    fn lookup_genes(&self, _ids: &[String]) -> Result<HashMap<String, EnsemblGene>, DocsError> {
        Ok(HashMap::new())
    }

    fn cytobands(&self) -> Result<Vec<Cytoband>, DocsError> {
        Ok(Vec::new())
    }

    fn release(&self) -> Result<u32, DocsError> {
        Err(DocsError::EnsemblHttp("not configured".to_string()))
    }
}
