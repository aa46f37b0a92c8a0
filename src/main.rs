use std::path::PathBuf;
use std::process::ExitCode;

use autha_directory::{
    Configuration, DirectoryError, DirectoryService, LdapConnector,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file with an `ldap` entry.
    #[arg(long, short, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// List users matching the user filter.
    Users {
        /// Replace the configured user filter.
        #[arg(long, short)]
        filter: Option<String>,
    },
    /// List groups matching the group filter, with their members.
    Groups {
        /// Replace the configured group filter.
        #[arg(long, short)]
        filter: Option<String>,
    },
    /// Check a password by binding as the user.
    Auth {
        username: String,
        #[arg(long, short, env = "DIRECTORY_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "directory command failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Configuration::default().path(args.config).read();
    let Some(ldap) = config.ldap else {
        return Err("missing `ldap` entry on configuration file".into());
    };

    match args.cmd {
        Commands::Users { filter } => {
            let ldap = match filter {
                Some(filter) => ldap.with_user_filter(filter),
                None => ldap,
            };
            let service = DirectoryService::new(LdapConnector, ldap)?;
            let users = service.list_users().await?;
            if users.is_empty() {
                return Err(DirectoryError::NotFound {
                    filter: service.config().user_filter.clone(),
                }
                .into());
            }

            for user in &users {
                println!("{user}");
            }
        },
        Commands::Groups { filter } => {
            let ldap = match filter {
                Some(filter) => ldap.with_group_filter(filter),
                None => ldap,
            };
            let service = DirectoryService::new(LdapConnector, ldap)?;
            let groups = service.list_groups().await?;
            if groups.is_empty() {
                return Err(DirectoryError::NotFound {
                    filter: service.config().group_filter.clone(),
                }
                .into());
            }

            for group in &groups {
                println!("{} ({} members)", group.dn, group.members.len());
                for member in &group.members {
                    println!("  {member}");
                }
            }
        },
        Commands::Auth { username, password } => {
            let service = DirectoryService::new(LdapConnector, ldap)?;
            let user = service.authenticate(&username, &password).await?;
            println!("authenticated {} as {}", user.full_name(), user.dn);
        },
    }

    Ok(())
}
