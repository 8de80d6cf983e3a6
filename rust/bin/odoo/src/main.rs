//! `odoo` — command-line client for Odoo over JSON-RPC.
//!
//! Manages contexts (server + database pairs), logs in once and keeps
//! the session on disk, then runs model operations against it.

mod commands;
mod config;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "odoo", about = "Odoo JSON-RPC client")]
struct Cli {
    /// Path to client config file (default: ~/.odoo/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage contexts.
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    #[command(name = "use")]
    Use {
        #[command(subcommand)]
        what: UseWhat,
    },

    /// Log into the current context's server.
    Login {
        #[arg(long)]
        user: Option<String>,
        /// Password (not recommended; prefer the interactive prompt).
        #[arg(long)]
        password: Option<String>,
        /// Database (default: the context's).
        #[arg(long)]
        database: Option<String>,
    },

    /// End the session and forget it locally.
    Logout,

    /// Show the current context and session.
    Status,

    /// search_read on a model.
    Search {
        model: String,
        /// Domain as JSON, e.g. '[["is_company","=",true]]'.
        #[arg(long)]
        domain: Option<String>,
        /// Comma-separated field names.
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        order: Option<String>,
    },

    /// search_count on a model.
    Count {
        model: String,
        #[arg(long)]
        domain: Option<String>,
    },

    /// Create a record.
    Create {
        model: String,
        /// Field values as a JSON object.
        #[arg(long = "json")]
        json_body: Option<String>,
        /// Read the JSON object from a file.
        #[arg(short = 'f', long = "file")]
        file: Option<String>,
    },

    /// Update one record.
    Write {
        model: String,
        id: i64,
        #[arg(long = "json")]
        json_body: String,
    },

    /// Delete one record.
    Unlink {
        model: String,
        id: i64,
        /// Skip confirmation.
        #[arg(long = "yes", short = 'y')]
        yes: bool,
    },

    /// Call any model method.
    Call {
        model: String,
        method: String,
        /// Positional args as a JSON array.
        #[arg(long)]
        args: Option<String>,
        /// Keyword args as a JSON object.
        #[arg(long)]
        kwargs: Option<String>,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create a new context.
    Create {
        name: String,
        #[arg(long)]
        server: String,
        #[arg(long)]
        database: Option<String>,
    },
    /// List all contexts.
    List,
    /// Set properties on a context.
    Set {
        name: String,
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        database: Option<String>,
    },
    /// Delete a context and its stored session.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum UseWhat {
    /// Switch to a context.
    Context { name: String },
}

fn prompt_line(label: &str) -> anyhow::Result<String> {
    eprint!("{}", label);
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Create { name, server, database } => {
                commands::context::create(&name, &server, database.as_deref(), &config_path)?;
            }
            ContextAction::List => {
                commands::context::list(&config_path)?;
            }
            ContextAction::Set { name, server, database } => {
                commands::context::set(&name, server.as_deref(), database.as_deref(), &config_path)?;
            }
            ContextAction::Delete { name } => {
                commands::context::delete(&name, &config_path)?;
            }
        },

        Commands::Use { what } => match what {
            UseWhat::Context { name } => {
                commands::context::use_context(&name, &config_path)?;
            }
        },

        Commands::Login { user, password, database } => {
            let username = match user {
                Some(u) => u,
                None => prompt_line("Username: ")?,
            };
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            commands::login::login(&username, &password, database.as_deref(), &config_path).await?;
        }

        Commands::Logout => {
            commands::login::logout(&config_path).await?;
        }

        Commands::Status => {
            commands::login::status(&config_path).await?;
        }

        Commands::Search {
            model,
            domain,
            fields,
            offset,
            limit,
            order,
        } => {
            let query = commands::record::search_query(
                domain.as_deref(),
                fields.as_deref(),
                offset,
                limit,
                order.as_deref(),
            )?;
            commands::record::search(&model, query, &config_path).await?;
        }

        Commands::Count { model, domain } => {
            commands::record::count(&model, domain.as_deref(), &config_path).await?;
        }

        Commands::Create { model, json_body, file } => {
            let body = if let Some(path) = file {
                std::fs::read_to_string(&path)?
            } else if let Some(json) = json_body {
                json
            } else {
                anyhow::bail!("Provide --json or -f <file>.");
            };
            commands::record::create(&model, &body, &config_path).await?;
        }

        Commands::Write { model, id, json_body } => {
            commands::record::write(&model, id, &json_body, &config_path).await?;
        }

        Commands::Unlink { model, id, yes } => {
            if !yes {
                let answer = prompt_line(&format!("Delete {} {}? [y/N]: ", model, id))?;
                if !answer.eq_ignore_ascii_case("y") {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            commands::record::unlink(&model, id, &config_path).await?;
        }

        Commands::Call {
            model,
            method,
            args,
            kwargs,
        } => {
            commands::record::call(&model, &method, args.as_deref(), kwargs.as_deref(), &config_path).await?;
        }

        Commands::Version => {
            println!("odoo cli v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
