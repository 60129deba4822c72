use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info};

use exportscope::config::{package_json, ConfigOverrides};
use exportscope::export::{export, ExportData, ExportFormat};
use exportscope::logging::init_logger;
use exportscope::session::AnalysisSession;
use exportscope::ui::{run_app, App};

#[derive(Parser)]
#[command(name = "exportscope")]
#[command(author = "Zachary Woods <143150513+zach-fau@users.noreply.github.com>")]
#[command(version)]
#[command(about = "Find unused exports and circular imports in TypeScript/JavaScript projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project for unused exports and circular imports
    Analyze(AnalyzeArgs),
    /// Show version information
    Version,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Project root (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Report format: text, json, csv or markdown
    #[arg(short, long, default_value = "text")]
    format: ExportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Browse the findings in a terminal UI
    #[arg(long, conflicts_with_all = ["output", "format"])]
    tui: bool,

    /// Analyze .js/.jsx files as well
    #[arg(long)]
    allow_js: bool,

    /// Skip circular import detection
    #[arg(long)]
    no_circular: bool,

    /// Report unused exports of the package.json main file
    #[arg(long)]
    main_not_used: bool,

    /// Files whose exports are never reported (glob, repeatable)
    #[arg(long, value_name = "GLOB")]
    ignore: Vec<String>,

    /// Source globs to analyze, replacing configured ones (repeatable)
    #[arg(long, value_name = "GLOB")]
    include: Vec<String>,

    /// Globs to leave out, replacing configured ones (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    no_color: bool,

    /// Exit with status 1 when anything is found
    #[arg(long)]
    fail_on_findings: bool,
}

impl AnalyzeArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            allow_js: self.allow_js,
            no_circular: self.no_circular,
            main_not_used: self.main_not_used,
            ignore: self.ignore.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Analyze(args)) => analyze(args),
        Some(Commands::Version) => {
            println!("exportscope v{}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("exportscope - unused export and circular import finder");
            println!("Run 'exportscope analyze' to analyze the current project");
            println!("Run 'exportscope --help' for more information");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    // Log lines would garble the alternate screen.
    init_logger(args.verbose, args.quiet || args.tui, args.no_color);

    if !args.path.is_dir() {
        bail!("project directory not found: {}", args.path.display());
    }

    let session = Arc::new(AnalysisSession::new(&args.path, args.overrides()));
    let project_name = project_name(session.root());
    info!(root = %session.root().display(), "analyzing {}", project_name);
    session.refresh();

    if args.tui {
        let mut app = App::with_session(Arc::clone(&session), project_name);
        run_tui(&mut app)?;
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = session.outcome();
    let data = ExportData::new(project_name, session.root(), &outcome);
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            export(args.format, &data, &mut writer)
                .and_then(|()| writer.flush())
                .with_context(|| format!("failed to write {}", path.display()))?;
            debug!(path = %path.display(), format = %args.format, "report written");
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            export(args.format, &data, &mut writer).context("failed to write report")?;
        }
    }

    if args.fail_on_findings && data.has_findings() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

/// `name` from package.json, else the directory name.
fn project_name(root: &Path) -> String {
    package_json::parse_file(&root.join("package.json"))
        .ok()
        .and_then(|package| package.name)
        .or_else(|| {
            root.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "project".to_string())
}

fn run_tui(app: &mut App) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("failed to create terminal")?;

    let result = run_app(&mut terminal, app);

    // Restore the terminal even when the app failed.
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    result.context("terminal UI failed")
}
