//! Command-line interface for the prgraph binary.
//!
//! The CLI resolves targets from flags and an optional YAML file, runs the
//! fetch/classify/aggregate pipeline against the GitHub GraphQL API and
//! prints the run report as JSON on stdout. Logs and the progress bar go to
//! stderr so the report can be piped into a renderer.

use std::{
    io,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use prgraph::{
    ConfigDocument, ConfigOverrides, ContributionFetcher, Error, GraphqlSearchClient, Pipeline,
    PipelineOptions, RateLimitGate, RunConfig, RunReport, TargetOutcome, TokioClock, load_config,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Command line interface for generating contribution histograms.
#[derive(Debug, Parser,)]
#[command(
    name = "prgraph",
    version,
    about = "Monthly authored/reviewed pull-request histograms"
)]
struct Cli
{
    /// Path to a YAML configuration file.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    /// Targets as `user@owner/repo` or `user,owner/repo`, separated by
    /// commas or whitespace.
    #[arg(long = "targets", value_name = "TARGETS")]
    targets: Option<String,>,

    /// GitHub token used for every request.
    #[arg(long = "token", env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String,>,

    /// Do not count reviews on pull requests the user authored.
    #[arg(long = "exclude-authored-from-reviewed", action = ArgAction::SetTrue)]
    exclude_authored_from_reviewed: bool,

    /// Number of targets processed concurrently.
    #[arg(long = "concurrency", value_name = "N")]
    concurrency: Option<usize,>,

    /// Deadline for the whole run in seconds.
    #[arg(long = "timeout", value_name = "SECONDS")]
    timeout: Option<u64,>,

    /// Directory receiving one JSON dataset per target.
    #[arg(long = "output", value_name = "DIR")]
    output: Option<PathBuf,>,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    init_tracing();

    match run().await {
        Ok(report,) if report.is_success() => {}
        Ok(_,) => process::exit(1,),
        Err(error,) => {
            eprintln!("{}", error.to_display_string());
            process::exit(1,);
        }
    }
}

fn init_tracing()
{
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "prgraph=info".into(),),)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr,),)
        .init();
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, client construction and output errors. Target
/// failures are part of the returned report instead.
async fn run() -> Result<RunReport, Error,>
{
    let cli = Cli::parse();
    let config = resolve_config(&cli,)?;

    let client = GraphqlSearchClient::new(&config.credential,)?;
    let fetcher = ContributionFetcher::new(
        client,
        TokioClock,
        config.retry.clone(),
        Arc::new(RateLimitGate::new(),),
    );
    let pipeline = Pipeline::new(fetcher, PipelineOptions::from(&config,),);

    let progress = progress_bar(config.targets.len(),);
    let report = pipeline
        .run_observed(&config.targets, |outcome| {
            let label = match outcome {
                TargetOutcome::Completed(dataset,) => dataset.target.to_string(),
                TargetOutcome::Failed(failure,) => format!("{} (failed)", failure.target),
            };
            progress.set_message(label,);
            progress.inc(1,);
        },)
        .await;
    progress.finish_and_clear();

    if let Some(directory,) = cli.output.as_deref() {
        write_datasets(directory, &report, cli.pretty,)?;
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_report(&mut handle, &report, cli.pretty,)?;

    Ok(report,)
}

fn resolve_config(cli: &Cli,) -> Result<RunConfig, Error,>
{
    let document = match cli.config.as_deref() {
        Some(path,) => load_config(path,)?,
        None => ConfigDocument::default(),
    };
    let overrides = ConfigOverrides {
        targets:                        cli.targets.clone(),
        token:                          cli.token.clone(),
        exclude_authored_from_reviewed: cli.exclude_authored_from_reviewed,
        concurrency:                    cli.concurrency,
        timeout_secs:                   cli.timeout,
    };
    RunConfig::resolve(document, overrides,)
}

fn progress_bar(len: usize,) -> ProgressBar
{
    let pb = ProgressBar::new(len as u64,);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.yellow} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}",)
            .expect("valid template",),
    );
    pb
}

fn write_datasets(directory: &Path, report: &RunReport, pretty: bool,) -> Result<(), Error,>
{
    for dataset in &report.datasets {
        let path = dataset.write_json(directory, pretty,)?;
        info!(path = %path.display(), "dataset written");
    }
    Ok((),)
}

fn write_report<W: io::Write,>(writer: &mut W, report: &RunReport, pretty: bool,) -> Result<(), Error,>
{
    if pretty {
        serde_json::to_writer_pretty(writer, report,)?;
    } else {
        serde_json::to_writer(writer, report,)?;
    }

    Ok((),)
}

#[cfg(test)]
mod tests
{
    use std::{fs, io::Cursor, path::Path, time::Duration};

    use clap::Parser;
    use prgraph::{HistogramDataset, RunReport, Target, TargetFailure};
    use tempfile::tempdir;

    use super::{Cli, resolve_config, write_datasets, write_report};

    fn report() -> RunReport
    {
        RunReport {
            datasets: vec![HistogramDataset::new(Target::new("octocat", "github", "docs",), Vec::new(),)],
            failures: vec![TargetFailure {
                target: Target::new("ghost", "nowhere", "void",),
                reason: "fetch failed (status 404): not found".to_owned(),
            }],
        }
    }

    #[test]
    fn cli_parses_all_flags()
    {
        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "--targets",
            "octocat@github/docs",
            "--token",
            "ghp_secret",
            "--exclude-authored-from-reviewed",
            "--concurrency",
            "2",
            "--timeout",
            "90",
            "--output",
            "graphs",
            "--pretty",
        ],)
        .expect("failed to parse CLI",);

        assert_eq!(cli.targets.as_deref(), Some("octocat@github/docs"));
        assert_eq!(cli.token.as_deref(), Some("ghp_secret"));
        assert!(cli.exclude_authored_from_reviewed);
        assert_eq!(cli.concurrency, Some(2));
        assert_eq!(cli.timeout, Some(90));
        assert_eq!(cli.output.as_deref(), Some(Path::new("graphs")));
        assert!(cli.pretty);
    }

    #[test]
    fn cli_rejects_non_numeric_concurrency()
    {
        let result = Cli::try_parse_from([env!("CARGO_PKG_NAME"), "--concurrency", "many",],);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_config_file()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let config_path = temp.path().join("prgraph.yaml",);
        let yaml = r#"
targets:
  - file@org/repo
concurrency: 3
timeout_secs: 45
exclude_authored_from_reviewed: true
"#;
        fs::write(&config_path, yaml,).expect("failed to write config",);

        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "--config",
            config_path.to_str().expect("utf8",),
            "--targets",
            "cli@org/repo",
            "--token",
            "ghp_secret",
        ],)
        .expect("failed to parse CLI",);

        let config = resolve_config(&cli,).expect("valid config",);
        assert_eq!(config.targets, vec![Target::new("cli", "org", "repo")]);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.timeout, Some(Duration::from_secs(45)));
        assert!(config.exclude_authored_from_reviewed);
    }

    #[test]
    fn malformed_targets_fail_before_any_fetch()
    {
        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "--targets",
            "octocat@github",
            "--token",
            "ghp_secret",
        ],)
        .expect("failed to parse CLI",);

        let error = resolve_config(&cli,).expect_err("expected config error",);
        assert!(matches!(error, prgraph::Error::Config { .. }));
    }

    #[test]
    fn report_is_written_compact_or_pretty()
    {
        let mut compact = Cursor::new(Vec::new(),);
        write_report(&mut compact, &report(), false,).expect("failed to serialize report",);
        let compact = String::from_utf8(compact.into_inner(),).expect("invalid UTF-8",);
        assert!(compact.starts_with("{\"datasets\":[{\"target\":"));
        assert!(!compact.contains('\n'));

        let mut pretty = Cursor::new(Vec::new(),);
        write_report(&mut pretty, &report(), true,).expect("failed to serialize report",);
        let pretty = String::from_utf8(pretty.into_inner(),).expect("invalid UTF-8",);
        assert!(pretty.contains("\n  \"failures\": ["));
    }

    #[test]
    fn datasets_are_written_per_target()
    {
        let temp = tempdir().expect("failed to create tempdir",);

        write_datasets(temp.path(), &report(), false,).expect("failed to write datasets",);

        assert!(temp.path().join("octocat-github-docs-contribution-graph.json").exists());
        assert!(!temp.path().join("ghost-nowhere-void-contribution-graph.json").exists());
    }
}
