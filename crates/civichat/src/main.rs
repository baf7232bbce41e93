//! `civichat` - CiviCRM group messaging from the command line.
//!
//! Every view is fetched fresh from the CRM. When the CRM is unreachable
//! the last saved copy is printed with a warning instead.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod render;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, anyhow, bail};
use civichat_api::{CiviClient, ClientConfig, ContactId, Credentials, GroupId, GroupSummary};
use civichat_core::{
    ActiveSession, CiviConnector, CredentialVault, GroupChatReconciler, GroupListReconciler,
    KeyringVault, MemoryVault, RefreshOutcome, Session, SnapshotRepository, VaultResult, ViewState,
};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use settings::AppSettings;

#[derive(Parser)]
#[command(author, version, about = "CiviCRM group messaging")]
struct Cli {
    /// Snapshot database (overrides the settings file).
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Use the CIVICRM_* credentials for this run only; the keyring is not touched.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(flatten)]
    login: LoginArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LoginArgs {
    /// CiviCRM site URL.
    #[arg(long, env = "CIVICRM_SITE_URL", global = true)]
    site_url: Option<String>,

    /// API key of the contact.
    #[arg(long, env = "CIVICRM_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Site key of the CiviCRM installation.
    #[arg(long, env = "CIVICRM_SITE_KEY", hide_env_values = true, global = true)]
    site_key: Option<String>,

    /// Contact ID to act as.
    #[arg(long, env = "CIVICRM_CONTACT_ID", global = true)]
    contact_id: Option<String>,

    /// Find the contact by email when no contact ID is given.
    #[arg(long, env = "CIVICRM_EMAIL", global = true)]
    email: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the credentials.
    Login,
    /// Forget the stored credentials and all offline data.
    Logout,
    /// Show the logged-in contact.
    Whoami,
    /// List your groups.
    Groups,
    /// Show a group's conversation.
    Chat {
        /// Group ID.
        group: String,
    },
    /// Send a message to a group.
    Send {
        /// Group ID.
        group: String,
        /// Message text.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (settings, settings_error) = match settings::load_settings().await {
        Ok(settings) => (settings, None),
        Err(e) => (AppSettings::default(), Some(e)),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| settings.log_filter().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(e) = settings_error {
        warn!("Failed to load settings, using defaults: {e:#}");
    }

    let mut app = App::new(&cli, &settings).await?;
    let result = app.run(&cli.command, &cli.login).await;
    app.store.close().await;
    result
}

struct App {
    session: Session,
    vault: Arc<dyn CredentialVault>,
    store: SnapshotRepository,
    config: ClientConfig,
    ephemeral: bool,
}

impl App {
    async fn new(cli: &Cli, settings: &AppSettings) -> anyhow::Result<Self> {
        let config = ClientConfig::default().with_timeout(settings.request_timeout());
        let ephemeral = cli.ephemeral || !settings.use_keyring;

        let vault: Arc<dyn CredentialVault> = if ephemeral {
            Arc::new(MemoryVault::unavailable())
        } else {
            Arc::new(KeyringVault::new())
        };
        let session = Session::new(
            Arc::new(CiviConnector::new(config.clone())),
            Arc::clone(&vault),
        );

        let database = cli
            .database
            .clone()
            .unwrap_or_else(|| settings.database_path());
        let store = SnapshotRepository::open(&database)
            .await
            .with_context(|| format!("failed to open snapshot store at {}", database.display()))?;

        Ok(Self {
            session,
            vault,
            store,
            config,
            ephemeral,
        })
    }

    async fn run(&mut self, command: &Command, login: &LoginArgs) -> anyhow::Result<()> {
        match command {
            Command::Login => self.login(login).await,
            Command::Logout => {
                self.session.logout();
                self.store.clear_offline_cache().await;
                println!("Logged out.");
                Ok(())
            }
            Command::Whoami => {
                let active = self.active_session(login).await?;
                let contact = active.contact();
                println!("{} (contact {})", contact.display_name, contact.id);
                if let Some(email) = &contact.email {
                    println!("{email}");
                }
                println!("{}", active.credentials().site_url);
                Ok(())
            }
            Command::Groups => {
                let active = self.active_session(login).await?;
                let view = GroupListReconciler::new(active, self.store.clone());
                view.open().await;

                let state = view.state();
                report(&state)?;
                print!("{}", render::groups(&state.items));
                Ok(())
            }
            Command::Chat { group } => {
                let active = self.active_session(login).await?;
                let chat = self.open_chat(active, GroupId::new(group.as_str())).await;

                let state = chat.state();
                report(&state)?;
                print_conversation(&chat, &state);
                Ok(())
            }
            Command::Send { group, text } => {
                let active = self.active_session(login).await?;
                let chat = self.open_chat(active, GroupId::new(group.as_str())).await;

                chat.set_draft(text.join(" "));
                let outcome = chat.send().await?;
                info!("Message sent to group {}", chat.group().id);

                let state = chat.state();
                if outcome == RefreshOutcome::Failed {
                    report(&state)?;
                }
                print_conversation(&chat, &state);
                Ok(())
            }
        }
    }

    async fn login(&mut self, login: &LoginArgs) -> anyhow::Result<()> {
        let credentials = login.credentials(&self.config).await?;
        let active = self.session.login(credentials).await?;

        let contact = active.contact();
        println!("Logged in as {} (contact {})", contact.display_name, contact.id);
        if self.ephemeral {
            println!("Credentials were not stored.");
        }
        Ok(())
    }

    /// Restores the stored session, or logs in directly when ephemeral.
    async fn active_session(&mut self, login: &LoginArgs) -> anyhow::Result<Arc<ActiveSession>> {
        if self.ephemeral {
            let credentials = login.credentials(&self.config).await?;
            return Ok(self.session.login(credentials).await?);
        }
        match self.session.restore().await {
            Some(active) => Ok(active),
            None => Err(restore_failure(self.vault.load())),
        }
    }

    async fn open_chat(&self, active: Arc<ActiveSession>, id: GroupId) -> GroupChatReconciler {
        let group = self.group_summary(&active, id).await;
        let chat = GroupChatReconciler::new(active, group, self.store.clone());
        chat.open().await;
        chat
    }

    /// Title lookup: saved group list first, then the CRM, then a placeholder.
    async fn group_summary(&self, active: &ActiveSession, id: GroupId) -> GroupSummary {
        let known = self
            .store
            .cached_groups(active.contact_id())
            .await
            .and_then(|groups| groups.into_iter().find(|g| g.id == id));
        if let Some(group) = known {
            return group;
        }

        let fetched = match active
            .gateway()
            .list_group_membership(active.contact_id())
            .await
        {
            Ok(groups) => groups.into_iter().find(|g| g.id == id),
            Err(e) => {
                warn!("Unable to look up group {id}: {e}");
                None
            }
        };
        fetched.unwrap_or_else(|| GroupSummary {
            title: GroupSummary::fallback_title(&id),
            id,
            description: None,
        })
    }
}

impl LoginArgs {
    async fn credentials(&self, config: &ClientConfig) -> anyhow::Result<Credentials> {
        let (Some(site_url), Some(api_key), Some(site_key)) =
            (&self.site_url, &self.api_key, &self.site_key)
        else {
            bail!(
                "--site-url, --api-key and --site-key are required \
                 (or CIVICRM_SITE_URL, CIVICRM_API_KEY and CIVICRM_SITE_KEY)"
            );
        };

        let contact_id = match (&self.contact_id, &self.email) {
            (Some(id), _) => ContactId::new(id.as_str()),
            (None, Some(email)) => {
                let lookup = Credentials::new(
                    site_url.as_str(),
                    api_key.as_str(),
                    site_key.as_str(),
                    "",
                );
                let client = CiviClient::with_config(lookup, config)?;
                client
                    .find_contact_by_email(email)
                    .await?
                    .map(|contact| contact.id)
                    .with_context(|| format!("No contact found with email {email}"))?
            }
            (None, None) => bail!("--contact-id or --email is required"),
        };

        Ok(Credentials::new(
            site_url.as_str(),
            api_key.as_str(),
            site_key.as_str(),
            contact_id,
        ))
    }
}

/// Tells a missing login apart from stored credentials that did not check out.
fn restore_failure(stored: VaultResult<Option<Credentials>>) -> anyhow::Error {
    match stored {
        Ok(Some(credentials)) => anyhow!(
            "Stored credentials for contact {} could not be verified against {}. \
             The CRM may be unreachable; run `civichat login` if the keys changed.",
            credentials.contact_id,
            credentials.site_url
        ),
        Ok(None) => anyhow!("Not logged in. Run `civichat login` first."),
        Err(e) => anyhow!("Unable to read stored credentials: {e}"),
    }
}

/// Fails when nothing could be shown; warns when only saved data is shown.
fn report<T>(state: &ViewState<T>) -> anyhow::Result<()> {
    if let Some(banner) = render::stale_banner(state) {
        eprintln!("{banner}");
    } else if let Some(error) = &state.error {
        bail!("{error}");
    }
    Ok(())
}

fn print_conversation(chat: &GroupChatReconciler, state: &ViewState<civichat_api::GroupMessage>) {
    println!("# {}", chat.group().title);
    print!(
        "{}",
        render::messages(&state.items, |m| chat.is_own_message(m))
    );
}

#[cfg(test)]
mod tests {
    use civichat_core::VaultError;

    use super::*;

    #[test]
    fn test_restore_failure_without_stored_credentials() {
        let err = restore_failure(Ok(None));
        assert_eq!(err.to_string(), "Not logged in. Run `civichat login` first.");
    }

    #[test]
    fn test_restore_failure_with_stored_credentials() {
        let stored = Credentials::new("https://crm.example.org", "k", "s", "42");
        let message = restore_failure(Ok(Some(stored))).to_string();
        assert!(message.contains("contact 42"));
        assert!(message.contains("https://crm.example.org"));
        assert!(!message.contains("Not logged in"));
    }

    #[test]
    fn test_restore_failure_with_unreadable_vault() {
        let message = restore_failure(Err(VaultError::Unavailable)).to_string();
        assert!(message.starts_with("Unable to read stored credentials"));
    }
}
