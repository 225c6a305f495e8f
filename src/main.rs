use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use kilat_seller::client::ApiClient;
use kilat_seller::config::{ClientConfig, ConfigError};
use kilat_seller::error::ApiError;
use kilat_seller::format::{category_label, format_date, format_relative_time};
use kilat_seller::guard::{AuthGuard, GuardView};
use kilat_seller::navigator::Navigator;
use kilat_seller::services::ServiceError;
use kilat_seller::services::auth::{AuthService, RegisterForm};
use kilat_seller::services::notification::{DEFAULT_LIMIT, DEFAULT_PAGE, NotificationService, unread_count};
use kilat_seller::services::petshop::{PetShopInput, PetShopService};
use kilat_seller::session::AuthStore;
use kilat_seller::storage::{FileStorage, StorageError};
use kilat_seller::token_store::TokenStore;
use kilat_seller::types::{PetShop, UpdateProfileRequest, User};
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("session file error: {0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Service(#[from] ServiceError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not logged in; run `kilat-seller login`")]
    NotLoggedIn,
    #[error("no shop found; run `kilat-seller shop create` first")]
    NoShop,
}

#[derive(Parser, Debug)]
#[command(name = "kilat-seller", about = "Kilat seller dashboard CLI")]
struct Cli {
    /// Overrides `KILAT_API_URL`.
    #[arg(long)]
    api_url: Option<String>,

    /// Overrides `KILAT_STATE_FILE`.
    #[arg(long)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KILAT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register(RegisterArgs),
    Logout,
    Whoami,
    Profile(ProfileCommand),
    Shop(ShopCommand),
    Notifications(NotificationsCommand),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long, env = "KILAT_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    confirm_password: String,
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Update {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ShopCommand {
    #[command(subcommand)]
    command: ShopSubcommand,
}

#[derive(Subcommand, Debug)]
enum ShopSubcommand {
    Show {
        #[arg(long, default_value_t = false)]
        plain: bool,
    },
    Create {
        #[arg(long, help = "Shop fields as a JSON object")]
        data: String,
    },
    Update {
        #[arg(long, help = "Fields to change, as a JSON object")]
        data: String,
    },
    Delete,
}

#[derive(Args, Debug)]
struct NotificationsCommand {
    #[command(subcommand)]
    command: NotificationsSubcommand,
}

#[derive(Subcommand, Debug)]
enum NotificationsSubcommand {
    List {
        #[arg(long, default_value_t = DEFAULT_PAGE)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
        #[arg(long, default_value_t = false)]
        plain: bool,
    },
    Read {
        id: String,
    },
}

// =============================================================================
// WIRING
// =============================================================================

/// Terminal stand-in for page navigation: there is no login screen to show,
/// so a forced redirect re-derives the session and tells the user.
struct CliNavigator {
    store: AuthStore,
}

impl Navigator for CliNavigator {
    fn navigate(&self, path: &str) {
        self.store.hydrate();
        warn!(%path, "session ended; log in again to continue");
    }
}

struct App {
    store: AuthStore,
    client: ApiClient,
    guard: AuthGuard,
}

impl App {
    fn build(cli: &Cli) -> Result<Self, CliError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = &cli.api_url {
            config.api_url.clone_from(url);
        }
        if let Some(path) = &cli.state_file {
            config.state_file.clone_from(path);
        }
        let config = config.validated()?;

        let backend = Arc::new(FileStorage::open(&config.state_file)?);
        let tokens = TokenStore::new(backend);
        let store = AuthStore::new(tokens.clone());
        let navigator: Arc<dyn Navigator> = Arc::new(CliNavigator { store: store.clone() });
        let client = ApiClient::new(&config, tokens, navigator.clone())?;
        let guard = AuthGuard::new(store.clone(), navigator);
        Ok(Self { store, client, guard })
    }

    async fn require_session(&self) -> Result<User, CliError> {
        self.guard.mount();
        match self.guard.resolve().await {
            GuardView::Protected(user) => Ok(user),
            GuardView::Placeholder | GuardView::Redirect => Err(CliError::NotLoggedIn),
        }
    }

    fn auth(&self) -> AuthService {
        AuthService::new(self.client.clone(), self.store.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = App::build(&cli)?;

    match cli.command {
        Command::Login { email, password } => {
            let user = app.auth().login(&email, &password).await?;
            print_json(&user)
        }
        Command::Register(args) => run_register(&app, args).await,
        Command::Logout => {
            app.store.hydrate();
            app.auth().logout().await;
            eprintln!("logged out");
            Ok(())
        }
        Command::Whoami => {
            let user = app.require_session().await?;
            print_json(&user)
        }
        Command::Profile(profile) => run_profile(&app, profile).await,
        Command::Shop(shop) => run_shop(&app, shop).await,
        Command::Notifications(notifications) => run_notifications(&app, notifications).await,
    }
}

async fn run_register(app: &App, args: RegisterArgs) -> Result<(), CliError> {
    let form = RegisterForm {
        full_name: args.full_name,
        email: args.email,
        phone: args.phone,
        password: args.password,
        confirm_password: args.confirm_password,
    };
    let user = app.auth().register(&form).await?;
    print_json(&user)
}

async fn run_profile(app: &App, profile: ProfileCommand) -> Result<(), CliError> {
    app.require_session().await?;
    match profile.command {
        ProfileSubcommand::Update { full_name, phone, avatar_url } => {
            let update = UpdateProfileRequest { full_name, phone, avatar_url };
            let user = app.auth().update_profile(&update).await?;
            print_json(&user)
        }
    }
}

async fn run_shop(app: &App, shop: ShopCommand) -> Result<(), CliError> {
    app.require_session().await?;
    let shops = PetShopService::new(app.client.clone());
    match shop.command {
        ShopSubcommand::Show { plain } => {
            let current = shops.my_shop().await?.ok_or(CliError::NoShop)?;
            if plain {
                print_shop(&current);
                Ok(())
            } else {
                print_json(&current)
            }
        }
        ShopSubcommand::Create { data } => {
            let input: PetShopInput = serde_json::from_str(&data)?;
            let created = shops.create_shop(&input).await?;
            print_json(&created)
        }
        ShopSubcommand::Update { data } => {
            let current = shops.my_shop().await?.ok_or(CliError::NoShop)?;
            let input = merge_input(&current, &data)?;
            let updated = shops.update_shop(&current.id, &input).await?;
            print_json(&updated)
        }
        ShopSubcommand::Delete => {
            let current = shops.my_shop().await?.ok_or(CliError::NoShop)?;
            shops.delete_shop(&current.id).await?;
            eprintln!("deleted shop {}", current.id);
            Ok(())
        }
    }
}

async fn run_notifications(app: &App, notifications: NotificationsCommand) -> Result<(), CliError> {
    app.require_session().await?;
    let inbox = NotificationService::new(app.client.clone());
    match notifications.command {
        NotificationsSubcommand::List { page, limit, plain } => {
            let response = inbox.list(page, limit).await?;
            if !plain {
                return print_json(&response);
            }
            let now = OffsetDateTime::now_utc();
            for n in &response.data {
                let marker = if n.is_read { " " } else { "*" };
                println!("{marker} {}  {}  ({})", n.id, n.title, format_relative_time(&n.created_at, now));
            }
            eprintln!(
                "page {}/{}, {} unread on this page",
                response.pagination.page,
                response.pagination.total_pages,
                unread_count(&response.data)
            );
            Ok(())
        }
        NotificationsSubcommand::Read { id } => {
            inbox.mark_read(&id).await?;
            eprintln!("marked {id} as read");
            Ok(())
        }
    }
}

/// Apply a partial JSON object over the shop's current editable fields.
fn merge_input(current: &PetShop, data: &str) -> Result<PetShopInput, CliError> {
    let mut base = serde_json::to_value(PetShopInput::from(current))?;
    let patch: Value = serde_json::from_str(data)?;
    if let (Value::Object(base), Value::Object(patch)) = (&mut base, patch) {
        base.extend(patch);
    }
    Ok(serde_json::from_value(base)?)
}

fn print_shop(shop: &PetShop) {
    println!("{} ({})", shop.name, category_label(shop.category));
    println!("{}", shop.address);
    println!("{} | {}", shop.phone, shop.email);
    println!("Hours: {}", shop.opening_hours);
    println!("Services: {}", shop.services.join(", "));
    println!("Rating: {:.1}", shop.rating);
    println!("Since: {}", format_date(&shop.created_at));
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
