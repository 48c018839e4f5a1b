// ============================================================================
// streamgate - Operator CLI for the gated video catalogue
// ============================================================================
// Usage:
//   streamgate encode <ID>                       Token for a content identifier
//   streamgate decode <TOKEN>                    Identifier behind a token
//   streamgate link <ID> [--route v|dorama]      Full shareable link
//   streamgate content add|list|remove           Manage the catalogue
//   streamgate account add|list                  Manage accounts
//   streamgate --as <ACCOUNT> subscribe          Register a payment claim
//   streamgate --as <ADMIN> approve <RECORD>     Activate a pending claim
//   streamgate --as <ADMIN> sweep                Expire lapsed subscriptions
//   streamgate --as <ACCOUNT> view <TOKEN>       Run the access gate
//   streamgate stats | export                    Inspect the database
// ============================================================================

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use streamgate_core::access::SubscriptionSummary;
use streamgate_core::codec::{self, ContentRoute};
use streamgate_core::subscription::require_admin;
use streamgate_core::{
    AccessDecision, Account, AccountStore, Clock, ContentItem, ContentResolver, ContentStore, GateConfig,
    GateDb, SessionIdentity, SubscriptionChecker, SubscriptionLifecycle, SubscriptionRecord,
    SubscriptionStatus, SubscriptionStore, SystemClock, TransitionOutcome, ViewGate,
};

/// Streamgate catalogue and subscription tool
#[derive(Parser)]
#[command(name = "streamgate", version, about = "Manage gated content and subscriptions")]
struct Cli {
    /// Path to the database file (default: ~/.streamgate/gate.redb)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Account to act as
    #[arg(long = "as", global = true, value_name = "ACCOUNT_ID")]
    acting: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a content identifier into a public token
    Encode { id: String },

    /// Decode a public token back into its identifier
    Decode { token: String },

    /// Print the shareable link for a content identifier
    Link {
        id: String,

        /// Route to mount the token under: v or dorama
        #[arg(long, default_value = "v")]
        route: String,
    },

    /// Catalogue management
    #[command(subcommand)]
    Content(ContentCommands),

    /// Account management
    #[command(subcommand)]
    Account(AccountCommands),

    /// Register a payment claim for the acting account
    Subscribe {
        /// Claimed amount in cents (default: STREAMGATE_PLAN_AMOUNT_CENTS)
        #[arg(long)]
        amount_cents: Option<u64>,
    },

    /// Create an active subscription directly (admin)
    Grant {
        account_id: String,

        #[arg(long)]
        amount_cents: Option<u64>,
    },

    /// Approve a pending payment claim (admin)
    Approve { record_id: String },

    /// Reject a pending payment claim (admin)
    Reject { record_id: String },

    /// Reactivate an expired or cancelled subscription (admin)
    Reactivate { record_id: String },

    /// Mark every lapsed active subscription as expired (admin)
    Sweep,

    /// List payment claims awaiting approval (admin)
    Pending,

    /// Show an account's subscription status
    Status {
        /// Account to inspect (default: the acting account; others need admin)
        account_id: Option<String>,

        /// Also list every record of the account
        #[arg(long)]
        history: bool,
    },

    /// Run the access gate for a token as the acting account
    View { token: String },

    /// Show database statistics
    Stats,

    /// Export full database contents as JSON
    Export {
        /// Output format (currently only json is supported)
        #[arg(long, default_value = "json")]
        format: String,
    },
}

#[derive(Subcommand)]
enum ContentCommands {
    /// Add a catalogue item and print its shareable link
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        poster_url: String,

        /// Player embed markup shown to subscribers
        #[arg(long)]
        embed: String,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List catalogue items, newest first
    List {
        #[arg(long)]
        tag: Option<String>,
    },

    /// Remove a catalogue item
    Remove { id: String },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create or replace an account
    Add {
        id: String,
        email: String,

        #[arg(long)]
        admin: bool,
    },

    /// List accounts
    List,
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("streamgate_core=info".parse()?)
                .add_directive("streamgate=info".parse()?),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }
    init_logging()?;

    let cli = Cli::parse();
    let mut config = GateConfig::from_env()?;
    if let Some(path) = cli.db_path {
        config.db_path = path;
    }

    // Pure codec commands never touch the database
    match &cli.command {
        Commands::Encode { id } => {
            println!("{}", codec::encode(id));
            return Ok(());
        }
        Commands::Decode { token } => {
            match codec::decode(token) {
                Some(id) => println!("{}", id),
                None => bail!("'{}' is not a valid content token", token),
            }
            return Ok(());
        }
        Commands::Link { id, route } => {
            let route = parse_route(route)?;
            println!("{}", codec::shareable_link(&config.public_url, route, id));
            return Ok(());
        }
        _ => {}
    }

    let db = Arc::new(GateDb::open(&config.db_path)?);
    let actor = load_actor(&db, cli.acting.as_deref()).await?;
    let app = App { db, config, actor };

    match cli.command {
        Commands::Encode { .. } | Commands::Decode { .. } | Commands::Link { .. } => Ok(()),
        Commands::Content(cmd) => app.content(cmd).await,
        Commands::Account(cmd) => app.account(cmd).await,
        Commands::Subscribe { amount_cents } => app.subscribe(amount_cents).await,
        Commands::Grant {
            account_id,
            amount_cents,
        } => app.grant(&account_id, amount_cents).await,
        Commands::Approve { record_id } => app.transition("approve", &record_id).await,
        Commands::Reject { record_id } => app.transition("reject", &record_id).await,
        Commands::Reactivate { record_id } => app.transition("reactivate", &record_id).await,
        Commands::Sweep => app.sweep().await,
        Commands::Pending => app.pending().await,
        Commands::Status {
            account_id,
            history,
        } => app.status(account_id, history).await,
        Commands::View { token } => app.view(&token).await,
        Commands::Stats => app.stats(),
        Commands::Export { format } => app.export(&format).await,
    }
}

fn parse_route(s: &str) -> Result<ContentRoute> {
    ContentRoute::from_str(s)
        .ok_or_else(|| anyhow!("Unknown route '{}'. Valid values: v, dorama", s))
}

async fn load_actor(db: &GateDb, acting: Option<&str>) -> Result<Option<Account>> {
    let Some(id) = acting else {
        return Ok(None);
    };
    match db.get_account(id).await? {
        Some(account) => {
            debug!("Acting as {} ({})", account.id, account.email);
            Ok(Some(account))
        }
        None => bail!("Unknown account '{}'. Create it with `streamgate account add`", id),
    }
}

struct App {
    db: Arc<GateDb>,
    config: GateConfig,
    actor: Option<Account>,
}

impl App {
    fn actor(&self) -> Result<&Account> {
        self.actor
            .as_ref()
            .ok_or_else(|| anyhow!("This command needs an acting account: --as <ACCOUNT_ID>"))
    }

    fn lifecycle(&self) -> SubscriptionLifecycle {
        SubscriptionLifecycle::with_period(
            self.db.clone(),
            Arc::new(SystemClock),
            self.config.subscription_period(),
        )
    }

    fn checker(&self) -> SubscriptionChecker {
        SubscriptionChecker::new(self.db.clone(), Arc::new(SystemClock))
    }

    async fn content(&self, cmd: ContentCommands) -> Result<()> {
        match cmd {
            ContentCommands::Add {
                title,
                description,
                poster_url,
                embed,
                tags,
            } => {
                require_admin(self.actor()?, "add content")?;
                let item = ContentItem::new(title, description, poster_url, embed, SystemClock.now())
                    .with_tags(tags);
                self.db.put_content(&item).await?;

                println!("Added {}", item.id);
                println!(
                    "{}",
                    codec::shareable_link(&self.config.public_url, ContentRoute::Video, &item.id)
                );
            }
            ContentCommands::List { tag } => {
                let items = self.db.list_content(tag.as_deref()).await?;
                if items.is_empty() {
                    println!("No content found.");
                    return Ok(());
                }

                println!("{:<36}  {:<20}  {:<22}  {}", "ID", "TOKEN", "ADDED", "TITLE");
                println!("{}", "-".repeat(110));
                for item in &items {
                    let title: String = item.title.chars().take(30).collect();
                    println!(
                        "{:<36}  {:<20}  {:<22}  {}",
                        item.id,
                        codec::encode(&item.id),
                        format_timestamp(Some(item.created_at)),
                        title
                    );
                }
                println!("\nTotal: {} items", items.len());
            }
            ContentCommands::Remove { id } => {
                require_admin(self.actor()?, "remove content")?;
                if self.db.delete_content(&id).await? {
                    println!("Removed {}", id);
                } else {
                    bail!("No content with id '{}'", id);
                }
            }
        }
        Ok(())
    }

    async fn account(&self, cmd: AccountCommands) -> Result<()> {
        match cmd {
            AccountCommands::Add { id, email, admin } => {
                // Bootstrapping: the very first account may be created without --as
                if !self.db.list_accounts().await?.is_empty() {
                    require_admin(self.actor()?, "add account")?;
                }
                let account = if admin {
                    Account::admin(id, email)
                } else {
                    Account::new(id, email)
                };
                self.db.put_account(&account).await?;
                println!(
                    "Saved account {}{}",
                    account.id,
                    if account.is_admin { " (admin)" } else { "" }
                );
            }
            AccountCommands::List => {
                let accounts = self.db.list_accounts().await?;
                if accounts.is_empty() {
                    println!("No accounts found.");
                    return Ok(());
                }
                println!("{:<24}  {:<32}  {}", "ID", "EMAIL", "ROLE");
                println!("{}", "-".repeat(70));
                for account in &accounts {
                    println!(
                        "{:<24}  {:<32}  {}",
                        account.id,
                        account.email,
                        if account.is_admin { "admin" } else { "viewer" }
                    );
                }
            }
        }
        Ok(())
    }

    async fn subscribe(&self, amount_cents: Option<u64>) -> Result<()> {
        let amount = amount_cents.unwrap_or(self.config.plan_amount_cents);
        let record = self
            .lifecycle()
            .create_pending(self.actor.as_ref(), amount)
            .await?;

        println!("Payment claim registered: {}", record.id);
        println!("Amount:  {}", record.amount_display());
        println!("Status:  {}", record.status.info().description);
        Ok(())
    }

    async fn grant(&self, account_id: &str, amount_cents: Option<u64>) -> Result<()> {
        if self.db.get_account(account_id).await?.is_none() {
            bail!("Unknown account '{}'", account_id);
        }
        let amount = amount_cents.unwrap_or(self.config.plan_amount_cents);
        let record = self
            .lifecycle()
            .grant(self.actor()?, account_id, amount)
            .await?;

        println!("Granted {} to {}", record.id, account_id);
        println!("Expires: {}", format_timestamp(record.expires_at));
        Ok(())
    }

    async fn transition(&self, operation: &str, record_id: &str) -> Result<()> {
        let lifecycle = self.lifecycle();
        let actor = self.actor()?;
        let outcome = match operation {
            "approve" => lifecycle.approve(actor, record_id).await?,
            "reject" => lifecycle.reject(actor, record_id).await?,
            "reactivate" => lifecycle.reactivate(actor, record_id).await?,
            other => bail!("Unknown operation '{}'", other),
        };

        let record = outcome.record();
        match &outcome {
            TransitionOutcome::Applied(_) => println!("{}: {} is now {}", operation, record.id, record.status),
            TransitionOutcome::AlreadyResolved(_) => {
                println!("{}: {} was already {}, nothing changed", operation, record.id, record.status)
            }
        }
        if record.status == SubscriptionStatus::Active {
            println!("Expires: {}", format_timestamp(record.expires_at));
        }
        Ok(())
    }

    async fn sweep(&self) -> Result<()> {
        let expired = self.lifecycle().expire_lapsed(self.actor()?).await?;
        println!("Expired {} lapsed subscriptions", expired);
        Ok(())
    }

    async fn pending(&self) -> Result<()> {
        let records = self.lifecycle().pending_queue(self.actor()?).await?;
        if records.is_empty() {
            println!("No pending payment claims.");
            return Ok(());
        }
        print_records(&records);
        println!("\nTotal: {} pending", records.len());
        Ok(())
    }

    async fn status(&self, account_id: Option<String>, history: bool) -> Result<()> {
        let actor = self.actor()?;
        let account_id = account_id.unwrap_or_else(|| actor.id.clone());
        if account_id != actor.id {
            require_admin(actor, "inspect another account")?;
        }

        match self.checker().summary(&account_id).await? {
            Some(summary) => print_summary(&account_id, &summary),
            None => println!("{} has no subscription yet.", account_id),
        }

        if history {
            let records = self.lifecycle().history(&account_id).await?;
            if !records.is_empty() {
                println!();
                print_records(&records);
            }
        }
        Ok(())
    }

    async fn view(&self, token: &str) -> Result<()> {
        let identity = match &self.actor {
            Some(account) => SessionIdentity::signed_in(account.clone()),
            None => SessionIdentity::anonymous(),
        };
        let gate = ViewGate::new(
            ContentResolver::new(self.db.clone()),
            self.checker(),
            Arc::new(identity),
        );

        let outcome = gate.view(token).await?;
        println!("Decision: {}", outcome.decision.display_name());

        match outcome.decision {
            AccessDecision::Allow => {
                if let Some(content) = outcome.content {
                    println!("Title:    {}", content.title);
                    println!("Player:   {}", content.embed_payload);
                }
            }
            AccessDecision::RequireSubscription => {
                if let Some(preview) = outcome.preview {
                    println!("Title:    {}", preview.title);
                    println!("Poster:   {}", preview.poster_url);
                }
                println!(
                    "Subscribe with `streamgate --as <ACCOUNT_ID> subscribe` (R$ {}.{:02})",
                    self.config.plan_amount_cents / 100,
                    self.config.plan_amount_cents % 100
                );
            }
            AccessDecision::RequireLogin => println!("Sign in with --as <ACCOUNT_ID>"),
            AccessDecision::NotFound => {}
        }
        Ok(())
    }

    fn stats(&self) -> Result<()> {
        let stats = self.db.stats()?;

        println!("=== Streamgate Database Stats ===");
        println!("Database: {}", self.db.path().display());
        println!();
        println!("Content:       {}", stats.total_content);
        println!(
            "Accounts:      {} ({} admin)",
            stats.total_accounts, stats.admin_accounts
        );
        println!("Subscriptions: {} total", stats.total_subscriptions);
        let mut counts: Vec<_> = stats.subscription_counts.iter().collect();
        counts.sort();
        for (status, count) in counts {
            println!("  {:18} {}", status, count);
        }
        Ok(())
    }

    async fn export(&self, format: &str) -> Result<()> {
        if format != "json" {
            bail!("Unsupported format '{}'. Only 'json' is supported.", format);
        }

        let export = serde_json::json!({
            "exported_at": Utc::now().to_rfc3339(),
            "stats": self.db.stats()?,
            "content": self.db.list_content(None).await?,
            "accounts": self.db.list_accounts().await?,
            "subscriptions": self.db.list_subscriptions(None).await?,
        });

        println!("{}", serde_json::to_string_pretty(&export)?);
        Ok(())
    }
}

fn print_summary(account_id: &str, summary: &SubscriptionSummary) {
    println!("Account:  {}", account_id);
    println!("Status:   {} ({})", summary.info.label, summary.info.description);
    println!("Record:   {}", summary.record.id);
    println!("Amount:   {}", summary.record.amount_display());
    println!("Expires:  {}", format_timestamp(summary.record.expires_at));
    if let Some(days) = summary.days_remaining {
        println!("Days left: {}", days);
    }
    println!("Can watch: {}", if summary.usable { "yes" } else { "no" });
}

fn print_records(records: &[SubscriptionRecord]) {
    println!(
        "{:<36}  {:<20}  {:<18}  {:<12}  {}",
        "RECORD ID", "ACCOUNT", "STATUS", "AMOUNT", "CREATED AT"
    );
    println!("{}", "-".repeat(115));
    for record in records {
        println!(
            "{:<36}  {:<20}  {:<18}  {:<12}  {}",
            record.id,
            record.account_id,
            record.status.as_str(),
            record.amount_display(),
            format_timestamp(Some(record.created_at))
        );
    }
}
