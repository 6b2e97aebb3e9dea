//! Bookshelf CLI - personal library client
//!
//! Usage:
//! ```bash
//! bookshelf login ada s3cret
//! bookshelf catalog "le guin" --pages 2 --genre scifi
//! bookshelf library
//! bookshelf toggle-wishlist 42
//! bookshelf friend-wishlist p-2
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookshelf_client::{
    config::AppConfig,
    models::{BookEntry, BookPatch, ImageUpload, NewBook, Rating, Registration, UserBook},
    session::{default_mode, FileSessionStore, SessionStore},
    ListMode, LoadOutcome, Services,
};

/// Bookshelf - browse the catalog and manage your library from the terminal
#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session file (overrides configuration)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login { username: String, password: String },
    /// Forget the stored session
    Logout,
    /// Show the current user
    Whoami,
    /// Your library when logged in, the catalog otherwise
    Home {
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Search the public catalog
    Catalog {
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long)]
        genre: Option<String>,
    },
    /// List your library
    Library {
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long)]
        genre: Option<String>,
    },
    /// List your wishlist
    Wishlist {
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long)]
        genre: Option<String>,
    },
    /// Show a book
    Book {
        id: String,
        /// Show your copy (rating, status, comments)
        #[arg(long)]
        mine: bool,
    },
    /// Add a catalog book to your library
    Assign { id: String },
    /// Rate a book in your library
    Rate {
        id: String,
        rating: u8,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Add to or remove from your wishlist
    ToggleWishlist { id: String },
    /// Remove a book from your library (or the catalog with --catalog)
    Delete {
        id: String,
        #[arg(long)]
        catalog: bool,
    },
    /// Submit a new catalog book
    CreateBook {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long = "genre", required = true)]
        genres: Vec<String>,
        #[arg(long)]
        description: String,
        #[arg(long)]
        image: PathBuf,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
        #[arg(long)]
        image: PathBuf,
    },
    /// Replace your profile image
    Avatar { image: PathBuf },
    /// List your friends
    Friends,
    /// Send a friend request
    AddFriend { id: String },
    /// Show an accepted friend's profile
    Friend { id: String },
    /// Show an accepted friend's wishlist
    FriendWishlist { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(path) = cli.session {
        config.session.path = path;
    }

    init_tracing(&config);

    let session: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&config.session.path));
    let services = Services::new(&config, session.clone())?;

    match cli.command {
        Commands::Login { username, password } => {
            services.api.sign_in(&username, &password).await?;
            println!("Logged in as {}", username);
        }
        Commands::Logout => {
            services.api.sign_out().await?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let user = services.api.current_user().await?;
            println!("{} (@{})", user.display_name(), user.user_name);
            if let Some(image) = user.image {
                println!("  image: {}", image);
            }
        }
        Commands::Home { pages } => {
            let mode = default_mode(session.as_ref()).await?;
            list(&services, mode, None, pages, None).await?;
        }
        Commands::Catalog { query, pages, genre } => {
            list(&services, ListMode::Catalog, query.as_deref(), pages, genre.as_deref()).await?;
        }
        Commands::Library { pages, genre } => {
            list(&services, ListMode::PersonalLibrary, None, pages, genre.as_deref()).await?;
        }
        Commands::Wishlist { pages, genre } => {
            list(&services, ListMode::Wishlist, None, pages, genre.as_deref()).await?;
        }
        Commands::Book { id, mine } => {
            if mine {
                print_user_book(&services.api.fetch_user_book(&id).await?);
            } else {
                print_entry(&BookEntry::Catalog(services.api.fetch_book(&id).await?));
            }
        }
        Commands::Assign { id } => {
            let user_book = services.api.assign_book(&id).await?;
            println!("Added \"{}\" to your library", user_book.book.title);
        }
        Commands::Rate { id, rating, comment } => {
            let mut patch = BookPatch::new(&id);
            patch.rating = Some(Rating::new(rating)?);
            patch.comments = comment;
            services.api.update_book(&patch).await?;
            println!("Rated {} {}/{}", id, rating, Rating::MAX);
        }
        Commands::ToggleWishlist { id } => {
            services.api.toggle_wishlist(&id).await?;
            let book = services.api.fetch_book(&id).await?;
            let state = if book.wished { "on" } else { "off" };
            println!("\"{}\" is now {} your wishlist", book.title, state);
        }
        Commands::Delete { id, catalog } => {
            if catalog {
                services.api.delete_book(&id).await?;
            } else {
                services.api.delete_user_book(&id).await?;
            }
            println!("Deleted {}", id);
        }
        Commands::CreateBook {
            title,
            author,
            genres,
            description,
            image,
        } => {
            let form = NewBook {
                title,
                author,
                genres,
                description,
            };
            let image = ImageUpload::from_path(&image).await?;
            let book = services.api.create_book(&form, image).await?;
            println!("Created {} ({})", book.title, book.id);
        }
        Commands::Register {
            username,
            password,
            name,
            surname,
            image,
        } => {
            let form = Registration {
                username,
                password,
                name,
                surname,
            };
            let image = ImageUpload::from_path(&image).await?;
            let user = services.api.register(&form, image).await?;
            println!("Registered @{}", user.user_name);
        }
        Commands::Avatar { image } => {
            let image = ImageUpload::from_path(&image).await?;
            services.api.upload_profile_image(image).await?;
            println!("Profile image updated");
        }
        Commands::Friends => {
            for friend in services.friends.friends().await? {
                let handle = friend.user_name.as_deref().unwrap_or("?");
                println!("{:<12} @{:<20} {:?}", friend.friend_id, handle, friend.status);
            }
        }
        Commands::AddFriend { id } => {
            services.friends.add(&id).await?;
            println!("Friend request sent");
        }
        Commands::Friend { id } => {
            let user = services.friends.profile(&id).await?;
            println!("{} (@{})", user.display_name(), user.user_name);
        }
        Commands::FriendWishlist { id } => {
            list(&services, ListMode::FriendWishlist(id), None, 1, None).await?;
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bookshelf_client={},bookshelf={}", config.logging.level, config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Load `pages` pages of a list and print what is visible
async fn list(
    services: &Services,
    mode: ListMode,
    query: Option<&str>,
    pages: u32,
    genre: Option<&str>,
) -> Result<()> {
    let books = &services.books;
    books.initialize(mode).await?;
    if let Some(query) = query {
        books.submit_query(query).await?;
    }
    for _ in 1..pages {
        if books.load_more().await? == LoadOutcome::Skipped {
            break;
        }
    }
    books.set_genre_filter(genre).await;

    let snapshot = books.snapshot().await;
    if snapshot.visible.is_empty() {
        println!("No books");
    }
    for entry in &snapshot.visible {
        print_entry(entry);
    }
    if snapshot.has_more {
        println!("... more available (use --pages {})", snapshot.page + 1);
    }
    Ok(())
}

fn print_entry(entry: &BookEntry) {
    let book = entry.book();
    let marker = if book.wished { " *" } else { "" };
    let genres = book.genres.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    println!(
        "{:<10} {} by {} [{}]{}",
        book.id,
        book.title,
        book.authors.join(", "),
        genres,
        marker
    );
}

fn print_user_book(user_book: &UserBook) {
    print_entry(&BookEntry::Personal(user_book.clone()));
    println!("  rating: {}/{}", user_book.rating.value(), Rating::MAX);
    if let Some(status) = user_book.reading_status {
        println!("  reading: {:?}", status);
    }
    if let Some(status) = user_book.ownership_status {
        println!("  copy: {:?}", status);
    }
    if let Some(comments) = &user_book.comments {
        println!("  comments: {}", comments);
    }
}
