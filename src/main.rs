use std::io::Write;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookstore_client::config::Config;
use bookstore_client::email::webmail_url;
use bookstore_client::forms::{format_signup_errors, SignupForm};
use bookstore_client::pagination::PageMarker;
use bookstore_client::services::auth::{RetrievePasswordRequest, SigninRequest};
use bookstore_client::services::categories::ALL_CATEGORIES;
use bookstore_client::services::BooksQuery;
use bookstore_client::Storefront;

#[derive(Debug, Parser)]
#[command(name = "bookstore-client", version, about = "Bookstore storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List books in the catalog
    Books {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// List catalog categories
    Categories,
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        phone: String,
        /// Birth date as YYYY-MM-DD
        #[arg(long)]
        birthday: String,
    },
    /// Sign in and persist the session
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        captcha_token: Option<String>,
    },
    /// Sign out and clear the persisted session
    Signout,
    /// Ask for a password reset e-mail
    RetrievePassword {
        #[arg(long)]
        email: String,
    },
    /// Show the signed-in account
    Whoami,
}

const PASSWORD_ENV: &str = "BOOKSTORE_PASSWORD";

/// The account password, from `BOOKSTORE_PASSWORD` or one line of stdin.
/// Never taken as an argument so it stays out of shell history.
fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }

    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    anyhow::ensure!(
        !password.is_empty(),
        "No password given (set {PASSWORD_ENV} or pipe it on stdin)"
    );
    Ok(password)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "bookstore-client starting");

    let config = Config::load()?;
    info!(api_url = %config.api.base_url, "Loaded configuration");

    let storefront = Storefront::open(config)?;

    match cli.command {
        Command::Books {
            page,
            limit,
            category,
            search,
        } => {
            let mut query = BooksQuery::default()
                .with_limit(limit)
                .with_category(category);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            let query = query.with_page(page);

            let books = storefront.books.get_books(&query).await?;
            if books.is_out_of_range(&query) {
                println!(
                    "Page {page} is past the last page ({})",
                    books.pagination.total_pages
                );
                return Ok(());
            }

            for book in &books.data {
                println!(
                    "{:>5}  {}  {:<40} {:<24} {:>8.2}",
                    book.id,
                    book.rating(),
                    book.title,
                    book.author_name,
                    book.unit_price
                );
            }
            let pages: Vec<String> = books
                .pagination
                .window()
                .into_iter()
                .map(|marker| match marker {
                    PageMarker::Page(n) if n == books.pagination.current_page => format!("[{n}]"),
                    other => other.to_string(),
                })
                .collect();
            println!(
                "\n{} books  pages: {}",
                books.pagination.total_items,
                pages.join(" ")
            );
        }
        Command::Categories => {
            let categories = storefront.categories.get_categories().await?;
            println!("{ALL_CATEGORIES}");
            for category in categories.data {
                println!("{}", category.name);
            }
        }
        Command::Signup {
            email,
            full_name,
            phone,
            birthday,
        } => {
            let password = read_password()?;
            let mut parts = birthday.splitn(3, '-');
            let form = SignupForm {
                birth_year: parts.next().unwrap_or_default().to_string(),
                birth_month: parts.next().unwrap_or_default().to_string(),
                birth_day: parts.next().unwrap_or_default().to_string(),
                confirm_password: password.clone(),
                email,
                full_name,
                password,
                phone,
            };
            let request = form.validate()?;

            match storefront.auth.signup(&request).await {
                Ok(response) => {
                    println!("{}", response.message);
                    println!(
                        "Check your inbox: {}",
                        webmail_url(Some(request.email.as_str()))
                    );
                }
                Err(e) => anyhow::bail!(format_signup_errors(&e).message),
            }
        }
        Command::Signin {
            email,
            captcha_token,
        } => {
            let request = SigninRequest {
                captcha_token,
                email,
                password: read_password()?,
            };
            match storefront.auth.signin(&request).await {
                Ok(response) => println!("Signed in as {}", response.data.account.full_name),
                Err(e) if storefront.auth.captcha_required() => {
                    return Err(e).context("Sign-in needs a captcha token (--captcha-token)");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Signout => {
            let response = storefront.auth.signout().await?;
            println!("{}", response.message);
        }
        Command::RetrievePassword { email } => {
            let response = storefront
                .auth
                .retrieve_password(&RetrievePasswordRequest {
                    email: email.clone(),
                })
                .await?;
            println!("{}", response.message);
            println!("Check your inbox: {}", webmail_url(Some(email.as_str())));
        }
        Command::Whoami => {
            let session = storefront.session.snapshot().await;
            match session.account {
                Some(account) if session.is_authenticated => {
                    println!("{} <{}>", account.full_name, account.email);
                }
                _ => println!("Not signed in"),
            }
        }
    }

    Ok(())
}
