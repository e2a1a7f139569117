use clap::{Parser, Subcommand};
use serde::Serialize;
use shelf::{app, database, logging, prelude::*};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Administration CLI for the shelf book tracker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Creates every book of a JSON array in one transaction
    Import {
        #[arg(help = "Path to a JSON file holding an array of books")]
        path: PathBuf,
    },

    /// Lists books, highest rated first
    List {
        #[arg(short, long, help = "Substring of the title or author")]
        search: Option<String>,

        #[arg(short, long, help = "Genre tag")]
        genre: Option<String>,

        #[arg(long, help = "Read status, e.g. UNREAD")]
        status: Option<String>,
    },

    /// Lists every distinct genre tag
    Genres,

    /// Deletes a book with its cover, memories and quotes
    Delete {
        #[arg(help = "Book id")]
        id: i64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init()?;

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let db = Database::with_migration(database::connect(&config.database_url).await?).await?;
    let storage = CoverStorage::with_options(
        &config.upload_dir,
        config.cover_prefixes.clone(),
        config.download_timeout,
    )?;

    match cli.command {
        Commands::Import { path } => {
            let json = tokio::fs::read_to_string(&path).await?;
            let entries: Vec<NewBook> = serde_json::from_str(&json)?;

            let books = app::create_books(&storage, &db, entries).await?;
            print_json(&books)?;
        }
        Commands::List {
            search,
            genre,
            status,
        } => {
            let query = BookQuery {
                search,
                genre,
                read_status: status,
            };

            let books = app::search_books(&db, &query).await?;
            print_json(&books)?;
        }
        Commands::Genres => {
            print_json(&app::list_genres(&db).await?)?;
        }
        Commands::Delete { id } => {
            app::delete_book(&storage, &db, BookId::from(id)).await?;
        }
    }

    Ok(())
}
