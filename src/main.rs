//! detangle 命令行入口

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use detangle::batch::{discover_documents, resolve_single, BatchRunner};
use detangle::config::ConfigManager;
use detangle::env::{self, EnvVar};
use detangle::error::{DetangleError, DetangleResult};
use detangle::pipeline::Pipeline;
use detangle::storage::{FsStore, OutputWriter};

/// Pull inline styles and scripts out of static HTML into standalone files
#[derive(Parser, Debug)]
#[command(name = "detangle", version, about)]
struct Cli {
    /// Process only this document (it must lie under the scan root)
    path: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scan root, overrides `rootDir`
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Log every decision but write nothing
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Copy HTML documents to <name>.bak before rewriting them
    #[arg(short, long)]
    backups: bool,

    /// Also write every output under this directory
    #[arg(short, long, value_name = "DIR")]
    mirror: Option<PathBuf>,

    /// Run the CSS compiler, JS minifier and image optimizer afterwards
    #[arg(long)]
    build: bool,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// List the recognized environment variables and exit
    #[arg(long)]
    list_env: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(error) = run(cli).await {
        eprintln!("detangle: {}", error);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> DetangleResult<()> {
    if cli.print_config {
        print!("{}", ConfigManager::example_config()?);
        return Ok(());
    }

    if cli.list_env {
        for (name, description) in env::describe_all() {
            println!("{:<32} {}", name, description);
        }
        return Ok(());
    }

    let mut manager = ConfigManager::load(cli.config.as_deref())?;
    let config = manager.config_mut();

    // 命令行参数优先级最高
    if let Some(root) = &cli.root {
        config.root_dir = absolute(root)?;
    }
    if let Some(mirror) = &cli.mirror {
        config.mirror_output_dir = Some(absolute(mirror)?);
    }
    config.dry_run |= cli.dry_run;
    config.create_backups |= cli.backups;
    config.validate()?;

    let config = manager.into_config();
    let layout = config.resolve()?;

    let documents = match &cli.path {
        Some(path) => vec![resolve_single(path, &layout.root)?],
        None => discover_documents(
            &layout,
            &config.html_source_patterns,
            &config.ignore_patterns,
        )?,
    };

    let writer = OutputWriter::new(FsStore, layout.write_options(&config));
    let runner = BatchRunner::new(layout.clone(), writer, config.max_concurrent_documents);
    let report = runner.run(&documents).await?;

    println!(
        "{} documents, {} changed, {} CSS files created, {} appended, {} scripts extracted, {} writes{}",
        report.documents,
        report.changed,
        report.css_created,
        report.css_appended,
        report.scripts_extracted,
        report.stats.total_writes(),
        if report.dry_run { " (dry run)" } else { "" }
    );

    if cli.build {
        if config.dry_run {
            tracing::info!("dry-run 模式下跳过构建");
        } else {
            let summary = Pipeline::new(layout, &config).run(&report).await?;
            println!(
                "built {} CSS, {} JS, {} images",
                summary.css_compiled + summary.css_copied,
                summary.js_minified + summary.js_copied,
                summary.images_optimized + summary.images_copied
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = match env::core::LogFilter::get() {
        Ok(Some(directives)) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("detangle: ignoring invalid {}: {}", env::core::LogFilter::NAME, e);
            EnvFilter::new(level)
        }),
        _ => EnvFilter::new(level),
    };
    let ansi = !env::core::NoColor::get().ok().flatten().unwrap_or(false);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn absolute(path: &Path) -> DetangleResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| DetangleError::io(path, source))?;
    Ok(cwd.join(path))
}
