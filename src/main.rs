mod config;
mod parser;
mod postprocess;
mod store;
mod translate;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use config::Settings;
use parser::fragments::Markup;
use translate::client::GeminiClient;

#[derive(Parser)]
#[command(name = "hadith_corpus", about = "Extract and translate hadith records from scraped pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from page JSON files into hadiths.json
    Parse {
        /// Root of the volume_*/section_*/page_*.json tree
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output file (default: hadiths.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Translate extracted records, resuming from the output file
    Translate {
        /// Extracted records (default: hadiths.json)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Translated output (default: hadiths_translated.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip translation; move source text into the translated fields
        #[arg(long)]
        pass_through: bool,
        /// Max records to translate in this run
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse + translate in one go
    Run {
        /// Max records to translate
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Re-apply honorific expansion to a translated file
    Postprocess {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show record and translation counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(input = ?settings.input_dir, output = ?settings.output, "Settings loaded");

    let result = match cli.command {
        Commands::Parse { input, output } => {
            let input = input.unwrap_or_else(|| settings.input_dir.clone());
            let output = output.unwrap_or_else(|| settings.output.clone());
            parse(&settings, &input, &output)
        }
        Commands::Translate {
            input,
            output,
            pass_through,
            limit,
        } => {
            let input = input.unwrap_or_else(|| settings.output.clone());
            let output = output.unwrap_or_else(|| settings.translated_output.clone());
            translate(&settings, &input, &output, pass_through, limit).await
        }
        Commands::Run { limit } => {
            parse(&settings, &settings.input_dir, &settings.output)?;
            translate(&settings, &settings.output, &settings.translated_output, false, limit).await
        }
        Commands::Postprocess { file } => {
            let file = file.unwrap_or_else(|| settings.translated_output.clone());
            let hits = postprocess::apply_file(&file, &settings.replacements)?;
            println!("Expanded {} abbreviations in {}", hits, file.display());
            Ok(())
        }
        Commands::Stats => stats(&settings),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn parse(settings: &Settings, input: &Path, output: &Path) -> anyhow::Result<()> {
    let markup = Markup::from_settings(&settings.markup)?;
    println!("Parsing pages under {}...", input.display());
    let summary = parser::run(input, output, &markup, &settings.default_title)?;
    summary.print();
    println!("Wrote {}", output.display());
    Ok(())
}

async fn translate(
    settings: &Settings,
    input: &Path,
    output: &Path,
    pass_through: bool,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let records = store::read_hadiths(input)?;
    if records.is_empty() {
        println!("No records in {}. Run 'parse' first.", input.display());
        return Ok(());
    }

    if pass_through {
        let n = translate::write_pass_through(&records, output)?;
        println!("Wrote {} untranslated records to {}", n, output.display());
    } else {
        let client = GeminiClient::new(&settings.translation)?;
        let mut driver =
            translate::Driver::new(client, &settings.translation, &settings.default_title)?;
        println!("Translating {} records...", records.len());
        let summary = driver.run(&records, output, limit).await?;
        summary.print();
    }

    postprocess::apply_file(output, &settings.replacements)?;
    Ok(())
}

fn stats(settings: &Settings) -> anyhow::Result<()> {
    let records = store::read_hadiths(&settings.output)?;
    let translated = store::read_partial(&settings.translated_output)?;

    let multi_page = records.iter().filter(|r| r.pages.len() > 1).count();
    let empty = records.iter().filter(|r| r.content.is_empty()).count();
    let fallback = records.iter().filter(|r| r.id.starts_with("fallback_")).count();

    println!("Records:     {}", records.len());
    println!("Multi-page:  {}", multi_page);
    println!("Empty body:  {}", empty);
    println!("Fallback:    {}", fallback);
    println!("Translated:  {}", translated.len());
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
