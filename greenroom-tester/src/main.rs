mod content_dir;
mod explore;
mod report;
mod runner;
mod script;
mod validate;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::{self, File};
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;

use content_dir::DirContentSource;
use explore::{explore, ExploreConfig, ExploreOutcome};
use runner::{RunReport, ScriptRunner};
use script::{PlaythroughScript, SoftlockConfig};
use validate::validate_content;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestMode {
    /// Run scripted playthroughs against the content
    Script,
    /// Seeded random-walk softlock hunting
    Explore,
    /// Structural validation: loading, links, reachability, cycles
    Validate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "greenroom-tester", version)]
#[command(about = "Headless QA for Greenroom content - scripted runs, exploration, validation")]
struct Args {
    /// What to run against the content
    #[arg(long, value_enum, default_value_t = TestMode::Script)]
    mode: TestMode,

    /// Content directory (manifest.json plus scenes/)
    #[arg(long)]
    content: PathBuf,

    /// Script files to run (comma-separated) - script mode only
    #[arg(long, default_value = "")]
    scripts: String,

    /// Seeds for exploration (comma-separated) - explore mode only
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Step bound per exploration walk
    #[arg(long, default_value_t = 200)]
    max_steps: usize,

    /// Revisit threshold before a walk counts as softlocked
    #[arg(long, default_value_t = 10)]
    max_revisits: u32,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("{}", "🎭 Greenroom Content Tester".bright_cyan().bold());
    println!("{}", "===========================".cyan());

    let passed = match args.mode {
        TestMode::Script => run_scripts(&args)?,
        TestMode::Explore => run_exploration(&args)?,
        TestMode::Validate => run_validation(&args)?,
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

fn run_scripts(args: &Args) -> Result<bool> {
    let script_paths = split_csv(&args.scripts);
    anyhow::ensure!(
        !script_paths.is_empty(),
        "script mode needs at least one --scripts path"
    );

    let mut reports: Vec<RunReport> = Vec::new();
    for path in &script_paths {
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        let script = PlaythroughScript::from_json(&text)
            .with_context(|| format!("failed to parse script {path}"))?;
        let source = DirContentSource::new(&args.content);
        let report = ScriptRunner::new(source, args.verbose).run(&script);
        reports.push(report);
    }

    let mut out = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Console => report::console_run_report(&mut out, &reports)?,
        ReportFormat::Json => report::json_run_report(&mut out, &reports)?,
        ReportFormat::Markdown => report::markdown_run_report(&mut out, &reports)?,
    }
    out.flush_inner()?;
    Ok(reports.iter().all(RunReport::passed))
}

fn run_exploration(args: &Args) -> Result<bool> {
    let seeds = parse_seeds(&args.seeds)?;
    let config = ExploreConfig {
        max_steps: args.max_steps,
        softlock: SoftlockConfig {
            max_revisits: args.max_revisits,
            ..SoftlockConfig::default()
        },
    };

    let mut outcomes: Vec<ExploreOutcome> = Vec::new();
    for seed in seeds {
        let source = DirContentSource::new(&args.content);
        let outcome = explore(source, seed, &config)
            .with_context(|| format!("exploration with seed {seed} hit a content error"))?;
        outcomes.push(outcome);
    }

    let mut out = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Console => report::console_explore_report(&mut out, &outcomes)?,
        ReportFormat::Json => report::json_explore_report(&mut out, &outcomes)?,
        ReportFormat::Markdown => report::markdown_explore_report(&mut out, &outcomes)?,
    }
    out.flush_inner()?;
    Ok(outcomes.iter().all(ExploreOutcome::is_clean))
}

fn run_validation(args: &Args) -> Result<bool> {
    let source = DirContentSource::new(&args.content);
    let validation = validate_content(&source).context("content validation failed to start")?;

    let mut out = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Console => report::console_validation_report(&mut out, &validation)?,
        ReportFormat::Json => report::json_validation_report(&mut out, &validation)?,
        ReportFormat::Markdown => report::markdown_validation_report(&mut out, &validation)?,
    }
    out.flush_inner()?;
    Ok(validation.is_clean())
}

fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_seeds(input: &str) -> Result<Vec<u64>> {
    split_csv(input)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed '{token}'"))
        })
        .collect()
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Stdout(w) => w.write(buf),
            Self::File(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
