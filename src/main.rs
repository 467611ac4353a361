use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nutri_client::nutrition::{items_of, totals_by};
use nutri_client::{
    ApiClient, AuthEndpoints, Authenticator, Config, FileTokenStore, NutrientTotals,
    RequestOptions, Surface, TokenStore, TracingEvents,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

/// Command-line client for the nutrition platform API.
#[derive(Parser, Debug)]
#[command(name = "nutri", author, version, about)]
struct Cli {
    /// Which client surface to act as (patient, nutritionist, admin)
    #[arg(long, global = true, default_value = "patient")]
    surface: Surface,

    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GET a path and print the JSON response
    Get { path: String },
    /// POST a JSON body
    Post {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// PUT a JSON body
    Put {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// PATCH a JSON body
    Patch {
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// DELETE a path
    Delete { path: String },
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Store the token carried by an OAuth callback URL
    OauthCallback { url: String },
    /// Log out and forget the stored token
    Logout,
    /// Show the local session state
    Status,
    /// Sum nutrients over the items returned by a path
    Totals {
        path: String,
        /// Group by this item field (e.g. refeicao, categoria)
        #[arg(long)]
        by: Option<String>,
    },
    /// Print the config file JSON schema
    ConfigSchema,
}

fn init_tracing() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nutri_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if matches!(cli.command, Command::ConfigSchema) {
        return print_schema();
    }

    let config = Config::load(cli.config.as_deref())?;
    let data_dir = config.data_dir()?;
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&data_dir));
    let client = ApiClient::for_surface(&config, cli.surface, store, Arc::new(TracingEvents))
        .with_context(|| format!("failed to start {} client", cli.surface))?;

    match cli.command {
        Command::Get { path } => print_body(client.request(&path, RequestOptions::get()).await?),
        Command::Post { path, data } => {
            let options = with_body(RequestOptions::post(), data.as_deref())?;
            print_body(client.request(&path, options).await?)
        }
        Command::Put { path, data } => {
            let options = with_body(RequestOptions::put(), data.as_deref())?;
            print_body(client.request(&path, options).await?)
        }
        Command::Patch { path, data } => {
            let options = with_body(RequestOptions::patch(), data.as_deref())?;
            print_body(client.request(&path, options).await?)
        }
        Command::Delete { path } => {
            client.delete(&path).await?;
            eprintln!("Deleted {path}");
            Ok(())
        }
        Command::Login { email, password } => {
            let auth = Authenticator::new(client, AuthEndpoints::from_config(&config.api));
            auth.login(&email, &password).await?;
            eprintln!("Logged in as {} on {}", email.trim(), cli.surface);
            Ok(())
        }
        Command::OauthCallback { url } => {
            let auth = Authenticator::new(client, AuthEndpoints::from_config(&config.api));
            auth.complete_oauth(&url)?;
            eprintln!("Logged in on {}", cli.surface);
            Ok(())
        }
        Command::Logout => {
            let auth = Authenticator::new(client, AuthEndpoints::from_config(&config.api));
            if auth.logout().await? {
                eprintln!("Logged out of {}", cli.surface);
            } else {
                eprintln!("No active session on {}", cli.surface);
            }
            Ok(())
        }
        Command::Status => {
            let session = client.session();
            println!("Surface:       {}", cli.surface);
            println!("API:           {}", client.base_url());
            println!("Strategy:      {:?}", client.strategy());
            println!("Token file:    {}", data_dir.join(session.key()).display());
            println!(
                "Session:       {}",
                if session.is_authenticated() {
                    "active"
                } else {
                    "none"
                }
            );
            Ok(())
        }
        Command::Totals { path, by } => {
            let body = client
                .request(&path, RequestOptions::get())
                .await?
                .unwrap_or(Value::Null);
            let items = items_of(&body);
            let report = match by {
                Some(field) => Value::Array(
                    totals_by(items, &field)
                        .into_iter()
                        .map(|(group, totals)| {
                            json!({ "group": group, "totals": totals.rounded() })
                        })
                        .collect(),
                ),
                None => serde_json::to_value(NutrientTotals::from_items(items).rounded())?,
            };
            print_body(Some(report))
        }
        Command::ConfigSchema => print_schema(),
    }
}

fn with_body(options: RequestOptions, data: Option<&str>) -> Result<RequestOptions> {
    match data {
        Some(raw) => {
            let body: Value = serde_json::from_str(raw).context("--data is not valid JSON")?;
            Ok(options.json(body))
        }
        None => Ok(options),
    }
}

fn print_schema() -> Result<()> {
    println!("{}", Config::json_schema()?);
    Ok(())
}

fn print_body(body: Option<Value>) -> Result<()> {
    match body {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => eprintln!("(no content)"),
    }
    Ok(())
}
