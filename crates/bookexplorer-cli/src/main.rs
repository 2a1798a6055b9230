//! CLI entry point for the Book Explorer backend.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bookexplorer_core::{
    app_data_dir, config_path, load_config, status, Book, BookCatalog, CatalogOptions,
    GoogleBooksClient, SearchOutcome, SqliteBookStore,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bookexplorer")]
#[command(about = "Book Explorer: search a book catalog and keep your own list")]
struct Cli {
    /// Use this SQLite database instead of the configured one.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Print books as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where Book Explorer stores its config and database (app data directory).
    DataDir,
    /// Show the effective configuration.
    Config,
    /// List every saved book.
    List,
    /// Search: empty query lists saved books, anything else asks the online catalog.
    Search {
        #[arg(value_name = "QUERY", default_value = "")]
        query: String,
        /// Save the Nth result (1-based) to your books.
        #[arg(long, value_name = "N")]
        save: Option<usize>,
        /// Print the Nth result (1-based) as shareable text.
        #[arg(long, value_name = "N")]
        share: Option<usize>,
    },
    /// Add a book by hand.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        thumbnail: String,
    },
    /// Change fields of a saved book.
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        thumbnail: Option<String>,
    },
    /// Delete a saved book.
    Delete { id: i64 },
    /// Print a saved book as shareable text.
    Share { id: i64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let command = cli.command.unwrap_or(Commands::Status);

    match command {
        Commands::Status => {
            println!("Book Explorer backend");
            println!("  core: {}", status());
            return Ok(());
        }
        Commands::DataDir => {
            match app_data_dir() {
                Some(p) => println!("{}", p.display()),
                None => eprintln!("Could not determine app data directory."),
            }
            return Ok(());
        }
        Commands::Config => {
            let config = load_config();
            if let Some(path) = config_path() {
                println!("# {}", path.display());
            }
            println!("catalog_base_url = {:?}", config.catalog_base_url);
            println!("max_results = {}", config.max_results);
            println!("request_timeout_secs = {}", config.request_timeout_secs);
            println!("database = {}", config.resolve_database_path()?.display());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config();
    let db_path = match cli.db {
        Some(path) => path,
        None => config.resolve_database_path()?,
    };
    let store = Arc::new(SqliteBookStore::open(&db_path)?);
    let remote = Arc::new(GoogleBooksClient::from_config(&config)?);
    let catalog = BookCatalog::with_options(store, remote, CatalogOptions::from(&config)).await?;

    match command {
        Commands::List => print_books(&catalog.all_books(), cli.json)?,
        Commands::Search { query, save, share } => {
            match catalog.search(&query).await? {
                SearchOutcome::RemoteFailed(e) => eprintln!("Online search failed: {}", e),
                outcome => tracing::debug!(?outcome, "search done"),
            }
            let results = catalog.search_results();
            print_books(&results, cli.json)?;
            if let Some(n) = share {
                println!("{}", nth_result(&results, n)?.share_text());
            }
            if let Some(n) = save {
                let book = nth_result(&results, n)?;
                let id = catalog.save_book(book).await?;
                println!("Saved \"{}\" as #{}", book.title, id);
            }
        }
        Commands::Add {
            title,
            author,
            description,
            thumbnail,
        } => {
            let book = Book::from_form(title, author, description)?.with_thumbnail(thumbnail);
            let id = catalog.save_book(&book).await?;
            println!("Saved \"{}\" as #{}", book.title, id);
        }
        Commands::Update {
            id,
            title,
            author,
            description,
            thumbnail,
        } => {
            let mut book = catalog.find_book(id).ok_or_else(|| format!("no book #{}", id))?;
            if let Some(t) = title {
                book.title = t;
            }
            if let Some(a) = author {
                book.author = a;
            }
            if let Some(d) = description {
                book.description = d;
            }
            if let Some(t) = thumbnail {
                book.thumbnail = t;
            }
            book.check()?;
            catalog.update_book(&book).await?;
            println!("Updated #{}", id);
        }
        Commands::Delete { id } => {
            // Unknown ids are not an error; the list is simply unchanged.
            let book = catalog
                .find_book(id)
                .unwrap_or_else(|| Book::new("", "", "").with_id(id));
            let rows = catalog.delete_book(&book).await?;
            println!("Deleted {} book(s)", rows);
        }
        Commands::Share { id } => {
            let book = catalog.find_book(id).ok_or_else(|| format!("no book #{}", id))?;
            println!("{}", book.share_text());
        }
        // Answered before the catalog was opened.
        Commands::Status | Commands::DataDir | Commands::Config => {}
    }
    Ok(())
}

/// 1-based pick from a result list.
fn nth_result(results: &[Book], n: usize) -> Result<&Book, String> {
    n.checked_sub(1)
        .and_then(|i| results.get(i))
        .ok_or_else(|| format!("no result #{} ({} found)", n, results.len()))
}

fn print_books(books: &[Book], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(books)?);
        return Ok(());
    }
    if books.is_empty() {
        println!("No books.");
        return Ok(());
    }
    for b in books {
        let id = b.id.map(|id| format!("#{}", id)).unwrap_or_else(|| "-".to_string());
        let desc = b.description.lines().next().unwrap_or("").trim();
        let preview = if desc.chars().count() > 60 {
            format!("{}...", desc.chars().take(60).collect::<String>())
        } else {
            desc.to_string()
        };
        println!("  {:>5}  {}", id, b);
        println!("         {}", preview);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nth_result_is_one_based() {
        let results = vec![
            Book::new("Dune", "Frank Herbert", ""),
            Book::new("Neuromancer", "William Gibson", ""),
        ];
        assert_eq!(nth_result(&results, 2).unwrap().title, "Neuromancer");
        assert_eq!(
            nth_result(&results, 1).unwrap().share_text().lines().nth(1),
            Some("Title: Dune")
        );
        assert!(nth_result(&results, 0).is_err());
        assert!(nth_result(&results, 3).is_err());
    }
}
