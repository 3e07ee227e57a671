//! Command-line host for the highlight engine: loads a Markdown file,
//! selects text in it and runs highlight, capture or export commands.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use quick_highlighter_config::Config;
use quick_highlighter_engine::{
    Affinity, Cmd, ExportTarget, HighlightVariant, Page, Range, build_page_request,
    first_heading, parse_markdown,
};
use std::path::{Path, PathBuf};

/// quick-highlighter - highlight and capture passages of Markdown documents
#[derive(Parser)]
#[command(name = "quick-highlighter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Highlight the selection and print the resulting HTML
    Highlight {
        #[command(flatten)]
        target: Target,

        /// Highlight style to apply
        #[arg(long, default_value_t = HighlightVariant::Plain)]
        variant: HighlightVariant,

        /// Remove the highlight again before printing
        #[arg(long)]
        remove: bool,

        /// Print a standalone page with title and styles
        #[arg(long)]
        page: bool,
    },
    /// Print the anchor JSON for the selection without changing the page
    Capture {
        #[command(flatten)]
        target: Target,
    },
    /// Capture the selection, print the export request, then mark it as exported
    Export {
        #[command(flatten)]
        target: Target,

        /// Config file holding the export credentials
        #[arg(short = 'c', long = "config", value_name = "PATH")]
        config_path: Option<PathBuf>,
    },
}

/// The document and the text to select in it.
#[derive(Args)]
struct Target {
    /// Markdown file to load
    file: PathBuf,

    /// Text to select
    #[arg(long, required_unless_present = "start", conflicts_with_all = ["start", "end"])]
    quote: Option<String>,

    /// Which match of --quote to select, counting from 0
    #[arg(long, default_value_t = 0)]
    occurrence: usize,

    /// Char offset into the flattened text where the selection starts
    #[arg(long, requires = "end")]
    start: Option<usize>,

    /// Char offset into the flattened text where the selection ends
    #[arg(long, requires = "start")]
    end: Option<usize>,

    /// Page title (defaults to the first heading, then the file name)
    #[arg(long)]
    title: Option<String>,

    /// Page URL (defaults to a file:// URL for the file)
    #[arg(long)]
    url: Option<String>,
}

impl Target {
    fn load(&self) -> Result<Page> {
        let source = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let url = self.url.clone().unwrap_or_else(|| file_url(&self.file));
        let mut document = parse_markdown(&source, "", &url)?;

        let title = match &self.title {
            Some(title) => title.clone(),
            None => first_heading(&document).unwrap_or_else(|| file_name(&self.file)),
        };
        document.set_title(title);
        log::info!("Loaded {} as \"{}\"", self.file.display(), document.title());

        let mut page = Page::new(document);
        let range = self.range(&page)?;
        page.select(range);
        Ok(page)
    }

    fn range(&self, page: &Page) -> Result<Range> {
        let document = &page.document;
        if let Some(quote) = &self.quote {
            return document.find_text(quote, self.occurrence).ok_or_else(|| {
                anyhow!(
                    "\"{quote}\" (occurrence {}) not found in {}",
                    self.occurrence,
                    self.file.display()
                )
            });
        }

        let (Some(start), Some(end)) = (self.start, self.end) else {
            bail!("Either --quote or --start and --end are required");
        };
        if end < start {
            bail!("--end ({end}) is before --start ({start})");
        }
        let start_point = document
            .point_at_text_offset(start, Affinity::Downstream)
            .ok_or_else(|| anyhow!("--start {start} is past the end of the text"))?;
        let end_point = document
            .point_at_text_offset(end, Affinity::Upstream)
            .ok_or_else(|| anyhow!("--end {end} is past the end of the text"))?;
        Ok(document.range(start_point, end_point)?)
    }
}

fn file_url(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn file_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn highlight(target: &Target, variant: HighlightVariant, remove: bool, page_out: bool) -> Result<()> {
    let mut page = target.load()?;

    let patch = page.apply(Cmd::Highlight { variant });
    if patch.created.is_empty() {
        log::warn!("Nothing was highlighted");
    }
    if remove {
        for mark in patch.created {
            page.apply(Cmd::Remove { mark });
        }
    }

    if page_out {
        print!("{}", page.document.to_html_page());
    } else {
        println!("{}", page.document.to_html());
    }
    Ok(())
}

fn capture(target: &Target) -> Result<()> {
    let mut page = target.load()?;

    let patch = page.apply(Cmd::Capture {
        variant: HighlightVariant::Plain,
    });
    let anchor = patch
        .anchor
        .ok_or_else(|| anyhow!("The selection has no text to capture"))?;

    println!("{}", serde_json::to_string_pretty(&anchor)?);
    Ok(())
}

fn export(target: &Target, config_path: Option<&Path>) -> Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_path);
    log::info!("Config path: {}", config_path.display());

    let credentials = Config::load_from_path(&config_path)?
        .and_then(|config| config.export)
        .ok_or_else(|| {
            anyhow!(
                "No export credentials configured; add an [export] section to {}",
                config_path.display()
            )
        })?;
    let export_target = ExportTarget::new(credentials.token, &credentials.database_id);

    let mut page = target.load()?;
    let patch = page.apply(Cmd::CaptureAndHighlight {
        variant: HighlightVariant::External,
    });
    let anchor = patch
        .anchor
        .ok_or_else(|| anyhow!("The selection has no text to export"))?;
    let request = build_page_request(&anchor, &export_target)?;

    println!("{}", serde_json::to_string_pretty(&request.redacted())?);
    println!("{}", page.document.to_html());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Highlight {
            target,
            variant,
            remove,
            page,
        } => highlight(target, *variant, *remove, *page),
        Command::Capture { target } => capture(target),
        Command::Export {
            target,
            config_path,
        } => export(target, config_path.as_deref()),
    }
}
