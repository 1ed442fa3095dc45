use clap::{Parser, Subcommand};
use kdam::{tqdm, BarExt as _};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

use mangaplus_api::config::{ClientConfig, ImageQuality, Preferences};
use mangaplus_api::requests::feed::{CatalogEntry, DiscoverSection};
use mangaplus_api::requests::query_utils::Language;
use mangaplus_api::MangaPlusClient;

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Browse and download from MANGA Plus
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Languages to show, e.g. `en` or `SPANISH`; may be repeated
    #[arg(short, long = "lang", value_name = "LANGUAGE", default_value = "en")]
    languages: Vec<Language>,

    /// Request lower resolution pages
    #[arg(long)]
    low_quality: bool,

    /// Ask the viewer not to split double pages
    #[arg(long)]
    no_split: bool,

    /// File that receives the log
    #[arg(long, value_name = "FILE", default_value = "mangaplus.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Featured,
    Popular,
    Latest,
    /// Search titles by name or author
    Search { query: String },
    /// Show a title and its chapters
    Title { id: String },
    /// List the page references of a chapter
    Pages { chapter_id: String },
    /// Download a chapter as numbered images
    Download {
        chapter_id: String,
        #[arg(short, long, default_value = "downloads")]
        out: PathBuf,
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,
    },
}

fn init_logging(path: &Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    let file = std::fs::File::options()
        .create(true)
        .append(true)
        .open(path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact(),
        )
        .with(filter)
        .init();

    Ok(guard)
}

fn print_entries(entries: &[CatalogEntry]) {
    for entry in entries {
        match &entry.subtitle {
            Some(author) => println!("{:>8}  {} ({author})", entry.id, entry.title),
            None => println!("{:>8}  {}", entry.id, entry.title),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _guard = init_logging(&args.log_file)?;

    let prefs = Arc::new(Preferences::default());
    prefs.set_languages(args.languages.iter().copied());
    prefs.set_split_images(!args.no_split);
    if args.low_quality {
        prefs.set_image_quality(ImageQuality::Low);
    }

    let client = MangaPlusClient::with_config(ClientConfig::default(), prefs)?;

    match args.command {
        Command::Featured => print_entries(&client.discover(DiscoverSection::Featured).await?),
        Command::Popular => print_entries(&client.discover(DiscoverSection::Popular).await?),
        Command::Latest => print_entries(&client.discover(DiscoverSection::LatestUpdates).await?),
        Command::Search { query } => print_entries(&client.search(&query).await?),
        Command::Title { id } => {
            let (detail, chapters) = client.manga_details(&id).await?;

            println!("{} [{}]", detail.title, detail.id);
            if let Some(author) = &detail.author {
                println!("by {author}");
            }
            if let Some(schedule) = &detail.schedule {
                println!("{schedule}");
            }
            if let Some(synopsis) = &detail.synopsis {
                println!("\n{synopsis}\n");
            }

            for chapter in chapters {
                println!(
                    "{:>8}  {:<6} {}",
                    chapter.chapter_id,
                    chapter.name,
                    chapter.sub_title.unwrap_or_default()
                );
            }
        }
        Command::Pages { chapter_id } => {
            for (index, page) in client.chapter_pages(&chapter_id).await?.iter().enumerate() {
                println!("{index:>3}  {page}");
            }
        }
        Command::Download {
            chapter_id,
            out,
            concurrency,
        } => {
            let pages = client.chapter_pages(&chapter_id).await?;
            let dir = out.join(&chapter_id);

            let total = pages.iter().filter(|page| !page.is_placeholder()).count();
            let mut pb = tqdm!(total = total, desc = chapter_id.clone(), unit = " pages");

            client
                .save_pages(pages, &dir, concurrency, |_| {
                    let _ = pb.update(1);
                })
                .await?;

            eprintln!();
            println!("saved to {}", dir.display());
        }
    }

    Ok(())
}
