use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use autofill_core::config::APP_DIR;
use autofill_core::discovery::inspect_cards;
use autofill_core::payload::parse_prompt;
use autofill_core::segment::{segment_text, Segmentation};
use autofill_core::{
    AutofillConfig, Controller, El, FileStore, Notice, Page, RunReport, Severity,
};

/// autofill: fills the title and situation fields of situation image cards
/// from one pasted prompt.
///
/// Long text is split across fields at natural boundaries; a JSON array
/// fills one card per item.
#[derive(Parser, Debug)]
#[command(name = "autofill", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Settings file (defaults to ~/.config/situation-autofill/settings.toml).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Config file (defaults to ~/.config/situation-autofill/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the control panel next to a page preview (the default).
    Panel {
        /// Page snapshot (JSON) to fill.
        #[arg(long)]
        page: Option<PathBuf>,
        /// Pre-fill the prompt editor.
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Fill a page snapshot without the panel.
    Run {
        #[arg(long)]
        page: PathBuf,
        /// Prompt to save and use; "-" reads stdin. Defaults to the saved prompt.
        #[arg(short, long)]
        prompt: Option<String>,
        /// Where to write the filled page.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print the notice and report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show how text would be split over fields of the given capacities.
    Split {
        /// Text to split; "-" reads stdin.
        text: String,
        /// Field capacities in characters, in fill order.
        #[arg(short, long, value_delimiter = ',', required = true)]
        capacity: Vec<usize>,
    },
    /// Show how a prompt is classified.
    Parse {
        /// Prompt to classify; "-" reads stdin.
        text: String,
    },
    /// List the cards and fields found on a page snapshot.
    Fields {
        #[arg(long)]
        page: PathBuf,
    },
    /// Turn autofill on or off.
    Toggle,
    /// Save a prompt for later runs.
    Save {
        /// Prompt to save; "-" reads stdin.
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    tracing::info!("Starting autofill v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Command::Panel {
        page: None,
        prompt: None,
    }) {
        Command::Panel { page, prompt } => {
            let store = open_store(cli.settings.as_deref())?;
            let doc = match &page {
                Some(path) => Page::load(path)?,
                None => Page::build(El::new("body")),
            };
            let mut app = autofill_panel::App::new(Controller::new(store, config), doc, page);
            if let Some(prompt) = prompt {
                app.set_initial_prompt(&read_text(&prompt)?);
            }
            app.run().await?;
        }
        Command::Run {
            page,
            prompt,
            out,
            json,
        } => {
            let store = open_store(cli.settings.as_deref())?;
            let mut doc = Page::load(&page)?;
            let mut controller = Controller::new(store, config);
            let notice = match prompt {
                Some(prompt) => {
                    let prompt = read_text(&prompt)?;
                    controller.run_with_prompt(&mut doc, &prompt).await
                }
                None => controller.run(&mut doc).await,
            };

            if json {
                let value = serde_json::json!({
                    "notice": notice,
                    "report": controller.last_report(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print!("{}", format_run(&notice, controller.last_report()));
            }

            if let Some(out) = out {
                doc.save(&out)
                    .with_context(|| format!("Failed to write {}", out.display()))?;
            }
            if notice.severity == Severity::Error {
                bail!("{}", notice.message);
            }
        }
        Command::Split { text, capacity } => {
            let text = read_text(&text)?;
            let segmentation = segment_text(text.trim(), &capacity);
            print!("{}", format_segmentation(&segmentation, &capacity));
        }
        Command::Parse { text } => {
            let payload = parse_prompt(&read_text(&text)?);
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Fields { page } => {
            let doc = Page::load(&page)?;
            let cards = inspect_cards(&doc, &config);
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        Command::Toggle => {
            let store = open_store(cli.settings.as_deref())?;
            let mut controller = Controller::new(store, config);
            let notice = controller.toggle();
            println!("{notice}");
            if notice.severity == Severity::Error {
                bail!("{}", notice.message);
            }
        }
        Command::Save { prompt } => {
            let store = open_store(cli.settings.as_deref())?;
            let mut controller = Controller::new(store, config);
            let notice = controller.save_prompt(&read_text(&prompt)?);
            println!("{notice}");
            if notice.severity == Severity::Error {
                bail!("{}", notice.message);
            }
        }
    }

    tracing::info!("autofill exited cleanly");
    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Log to a file so the panel's alternate screen stays clean. If the log
    // file can't be opened, discard logs.
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("autofill.log"));

    match log_file {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
                )
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .with_writer(std::io::sink)
                .init();
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AutofillConfig> {
    match path {
        Some(path) => AutofillConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(AutofillConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            AutofillConfig::default()
        })),
    }
}

fn open_store(path: Option<&Path>) -> Result<FileStore> {
    let store = match path {
        Some(path) => FileStore::open(path)?,
        None => FileStore::open_default()?,
    };
    tracing::debug!(path = %store.path().display(), "Using settings store");
    Ok(store)
}

/// The argument itself, or all of stdin for "-".
fn read_text(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stdin")?;
    Ok(text)
}

fn format_run(notice: &Notice, report: Option<&RunReport>) -> String {
    let mut out = format!("{notice}\n");
    for write in report.map(|r| r.writes.as_slice()).unwrap_or_default() {
        let _ = writeln!(
            out,
            "  card {:<5} {:<9} {}",
            write.card.to_string(),
            write.kind.label(),
            write.text
        );
    }
    out
}

fn format_segmentation(segmentation: &Segmentation, capacities: &[usize]) -> String {
    let mut out = String::new();
    for assignment in &segmentation.assignments {
        let chunk = &assignment.chunk;
        let _ = writeln!(
            out,
            "[{}] {:>3}/{:<3} {:<20} {}",
            assignment.target,
            chunk.text.chars().count(),
            capacities[assignment.target],
            format!("{:?}", chunk.kind),
            chunk.text
        );
    }
    if !segmentation.leftover.is_empty() {
        let _ = writeln!(
            out,
            "leftover ({} chars): {}",
            segmentation.leftover.chars().count(),
            segmentation.leftover
        );
    }
    out
}
