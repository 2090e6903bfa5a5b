//! Realto CLI - Command-line front end for the back-office client
//!
//! Owns the composition root: builds the token stores, session state, auth
//! interceptor and session manager once, wires the forced-logout handler,
//! then dispatches commands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use realto_client::{
    ApiClient, AuthInterceptor, CurrentUserApi, FileTokenStore, ForcedLogout, Navigator,
    RealtorListQuery, RealtorsApi, RealtyApi, RealtyFilterService, RealtyPager, RealtySection,
    SessionManager, SessionState, TokenStore, TokenVault,
};
use realto_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, Credentials,
    RealtoConfig, RealtoResult,
};

#[derive(Parser)]
#[command(name = "realto")]
#[command(about = "Back-office client for realtors and property listings")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the back-office
    Login {
        /// Account email
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Keep the session across restarts
        #[arg(short, long)]
        remember: bool,
    },

    /// Log out and clear the stored token
    Logout,

    /// Show the current session
    Whoami,

    /// Property listings
    Realty {
        #[command(subcommand)]
        command: RealtyCommands,
    },

    /// Realtor management
    Realtors {
        #[command(subcommand)]
        command: RealtorCommands,
    },
}

#[derive(Subcommand)]
enum RealtyCommands {
    /// List realty with the given filters
    List {
        /// Section feed: all, sale, publish or update
        #[arg(long, default_value = "all")]
        section: String,

        /// Text filter
        #[arg(long)]
        query: Option<String>,

        /// City filter
        #[arg(long)]
        city: Option<String>,

        /// Number of pages to accumulate
        #[arg(long, default_value = "1")]
        pages: u32,
    },
}

#[derive(Subcommand)]
enum RealtorCommands {
    /// List realtors
    List {
        /// Text search (routed to the search endpoint from 3 characters)
        #[arg(long)]
        query: Option<String>,

        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Approve a pending moderation request
    Approve { guid: String },

    /// Reject a pending moderation request
    Reject {
        guid: String,

        /// Rejection reason sent to the realtor
        #[arg(long)]
        reason: String,
    },
}

/// Where a terminal client "navigates" after a forced logout: it prints the
/// hint instead of routing.
struct LoginPromptNavigator;

impl Navigator for LoginPromptNavigator {
    fn to_login(&self) {
        eprintln!("Session expired, run 'realto login' to sign in again");
    }
}

struct App {
    manager: Arc<SessionManager>,
    client: ApiClient,
}

fn build_app(config: &RealtoConfig) -> RealtoResult<App> {
    let durable: Arc<dyn TokenStore> =
        Arc::new(FileTokenStore::durable(config.storage.data_dir.clone()));
    let session_store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::session_scoped(
        config.storage.session_dir.clone(),
    ));
    let vault = TokenVault::new(durable, session_store);

    let state = SessionState::new();
    let interceptor = Arc::new(AuthInterceptor::new(state.clone()));
    let client = ApiClient::new(&config.api, interceptor.clone())?;

    let gateway = Arc::new(CurrentUserApi::new(client.clone()));
    let manager = Arc::new(SessionManager::new(state, vault, gateway));

    interceptor
        .install_unauthorized_handler(ForcedLogout::new(&manager, Arc::new(LoginPromptNavigator)));

    Ok(App { manager, client })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RealtoConfig::from_file(path)?,
        None => RealtoConfig::default(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let app = build_app(&config)?;

    match cli.command {
        Commands::Login {
            email,
            password,
            remember,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password()?,
            };

            log_operation_start!("login", user = %email);

            match app
                .manager
                .login(&Credentials::new(email, password), remember)
                .await
            {
                Ok(user) => {
                    log_operation_success!("login");
                    println!("Logged in as {} <{}>", user.full_name(), user.email);
                }
                Err(error) => {
                    log_operation_error!("login", error);
                    return Err(error.into());
                }
            }
        }

        Commands::Logout => {
            app.manager.restore().await?;
            app.manager.logout().await?;
            println!("Logged out");
        }

        Commands::Whoami => {
            app.manager.restore().await?;

            if app.manager.is_authenticated() {
                let user = app.manager.profile();
                println!("{} <{}>", user.full_name(), user.email);

                let roles = app
                    .manager
                    .roles()
                    .iter()
                    .map(|role| role.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                if !roles.is_empty() {
                    println!("roles: {}", roles);
                }
            } else {
                println!("Not logged in");
            }
        }

        Commands::Realty { command } => handle_realty(&app, command).await?,

        Commands::Realtors { command } => handle_realtors(&app, command).await?,
    }

    Ok(())
}

async fn handle_realty(app: &App, command: RealtyCommands) -> anyhow::Result<()> {
    let RealtyCommands::List {
        section,
        query,
        city,
        pages,
    } = command;

    app.manager.restore().await?;
    if !app.manager.is_authenticated() {
        anyhow::bail!("Not logged in, run 'realto login' first");
    }

    let section = parse_section(&section)?;

    let filters = Arc::new(RealtyFilterService::new());
    filters.update(|filter| {
        filter.query = query;
        filter.city = city;
    });

    let source = Arc::new(RealtyApi::new(app.client.clone(), section));
    let pager = Arc::new(RealtyPager::new(source, filters));

    pager.reload().await?;
    for _ in 1..pages {
        if pager.is_last_page() {
            break;
        }
        pager.load_more().await?;
    }

    for realty in pager.items() {
        println!(
            "{}  {:<18} {:<18} {} / {}  by {}",
            realty.guid,
            realty.city.title,
            realty.status_label(),
            realty.action.title,
            realty.entity.title,
            realty.author.full_name(),
        );
    }
    println!(
        "{} of {} listings, page {}/{}",
        pager.items().len(),
        pager.total_count(),
        pager.page(),
        pager.page_count()
    );

    Ok(())
}

async fn handle_realtors(app: &App, command: RealtorCommands) -> anyhow::Result<()> {
    app.manager.restore().await?;
    if !app.manager.is_authenticated() {
        anyhow::bail!("Not logged in, run 'realto login' first");
    }

    let api = RealtorsApi::new(app.client.clone());

    match command {
        RealtorCommands::List { query, page } => {
            let mut list_query = RealtorListQuery::page(page);
            if let Some(query) = query {
                list_query = list_query.with_query(query);
            }

            let payload = api.list(&list_query).await?;
            for realtor in &payload.items {
                println!(
                    "{}  {} {} <{}>",
                    realtor.guid, realtor.firstname, realtor.lastname, realtor.email
                );
            }
            println!(
                "page {}/{}, {} realtors total",
                page.max(1),
                payload.pages,
                payload.total_count
            );
        }

        RealtorCommands::Approve { guid } => {
            let accepted = api.apply_moderation(&guid).await?;
            println!(
                "{}",
                if accepted {
                    "Moderation request approved"
                } else {
                    "Moderation request was not approved"
                }
            );
        }

        RealtorCommands::Reject { guid, reason } => {
            let rejected = api.reject_moderation(&guid, &reason).await?;
            println!(
                "{}",
                if rejected {
                    "Moderation request rejected"
                } else {
                    "Moderation request was not rejected"
                }
            );
        }
    }

    Ok(())
}

fn parse_section(raw: &str) -> anyhow::Result<RealtySection> {
    match raw {
        "all" => Ok(RealtySection::All),
        "sale" => Ok(RealtySection::Sale),
        "publish" => Ok(RealtySection::PublishModeration),
        "update" => Ok(RealtySection::UpdateModeration),
        other => anyhow::bail!(
            "Unknown realty section '{}', expected all|sale|publish|update",
            other
        ),
    }
}

fn prompt_password() -> anyhow::Result<String> {
    use std::io::Write;

    print!("Password: ");
    std::io::stdout().flush()?;

    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;

    Ok(password.trim_end().to_string())
}
