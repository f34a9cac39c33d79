use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use client::api::DEFAULT_BASE_URL;
use client::model::{Company, Contact, Deal, ListQuery, Task};
use client::store::Sliced;
use client::{CrmClient, CrmSession, Resource, views};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "crm", version, about = "Command line client for the CRM API")]
struct Cli {
    /// Base URL of the API, including the `/api` prefix.
    #[arg(long, env = "CRM_API_URL", default_value = DEFAULT_BASE_URL)]
    url: String,
    /// Bearer token from `crm login`.
    #[arg(long, env = "CRM_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print a token for CRM_TOKEN.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and print a token for CRM_TOKEN.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// List users.
    Users,
    #[command(subcommand)]
    Contacts(RecordCommand),
    #[command(subcommand)]
    Companies(RecordCommand),
    /// Deals, including the stage board.
    #[command(subcommand)]
    Deals(DealCommand),
    #[command(subcommand)]
    Tasks(TaskCommand),
    /// The audit log.
    #[command(subcommand)]
    Activities(ActivityCommand),
    /// Overview counts, stage totals and upcoming work.
    Dashboard,
    /// Analytics for a trailing period.
    Reports {
        /// One of 7days, 30days, 90days, 1year.
        #[arg(long, default_value = "30days")]
        period: String,
    },
}

#[derive(Subcommand, Debug)]
enum RecordCommand {
    List(ListArgs),
    Show { id: Uuid },
    Delete {
        id: Uuid,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DealCommand {
    #[command(flatten)]
    Record(RecordCommand),
    /// Deals grouped by stage.
    Pipeline,
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    #[command(flatten)]
    Record(RecordCommand),
    /// Open tasks assigned to you.
    Mine {
        #[arg(long)]
        status: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ActivityCommand {
    List(ListArgs),
    /// The latest activity grouped by day.
    Timeline,
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    #[arg(long)]
    page: Option<u64>,
    #[arg(long)]
    limit: Option<u64>,
    #[arg(long)]
    search: Option<String>,
    /// Extra filters such as `stage=proposal` or `minValue=1000`.
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
}

impl ListArgs {
    fn query(self) -> ListQuery {
        let mut query = ListQuery {
            page: self.page,
            limit: self.limit,
            search: self.search,
            ..ListQuery::default()
        };
        for (key, value) in self.filters {
            query = query.filter(key, value);
        }
        query
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.trim().to_string())),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut client = CrmClient::new(cli.url);
    if let Some(token) = cli.token {
        client.set_token(token);
    }
    let mut session = CrmSession::new(client);
    run(&mut session, cli.command).await
}

async fn run(session: &mut CrmSession, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = session.login(&email, &password).await?;
            eprintln!("Signed in as {} ({})", user.name, user.role);
            print_token(session)
        }
        Command::Register { name, email, password } => {
            let user = session.register(&name, &email, &password).await?;
            eprintln!("Registered {} ({})", user.name, user.role);
            print_token(session)
        }
        Command::Users => {
            let users = session.client().users().await?;
            print!("{}", views::users_table(&users));
            Ok(())
        }
        Command::Contacts(cmd) => {
            records::<Contact>(session, cmd, views::contacts_table, views::contact_detail, "contact").await
        }
        Command::Companies(cmd) => {
            records::<Company>(session, cmd, views::companies_table, views::company_detail, "company").await
        }
        Command::Deals(DealCommand::Record(cmd)) => {
            let listing = matches!(cmd, RecordCommand::List(_));
            records::<Deal>(session, cmd, views::deals_table, views::deal_detail, "deal").await?;
            if listing && !session.store().deals.stage_stats.is_empty() {
                let totals: Vec<String> = session
                    .store()
                    .deals
                    .stage_stats
                    .iter()
                    .map(|total| format!("{}: {}", views::stage_label(total.stage), total.count))
                    .collect();
                println!("{}", totals.join(", "));
            }
            Ok(())
        }
        Command::Deals(DealCommand::Pipeline) => {
            session.pipeline().await?;
            print!("{}", views::pipeline_board(&session.store().deals.pipeline));
            Ok(())
        }
        Command::Tasks(TaskCommand::Record(cmd)) => {
            records::<Task>(session, cmd, views::tasks_table, views::task_detail, "task").await
        }
        Command::Tasks(TaskCommand::Mine { status }) => {
            session.my_tasks(status.as_deref()).await?;
            print!("{}", views::tasks_table(&session.store().tasks.items));
            Ok(())
        }
        Command::Activities(ActivityCommand::List(args)) => {
            let page = session.client().list_activities(&args.query()).await?;
            print!("{}", views::activities_list(&page.items));
            println!("{}", views::page_footer(&page.page));
            Ok(())
        }
        Command::Activities(ActivityCommand::Timeline) => {
            let days = session.client().timeline().await?;
            print!("{}", views::timeline(&days));
            Ok(())
        }
        Command::Dashboard => {
            session.dashboard().await?;
            match &session.store().dashboard.stats {
                Some(stats) => print!("{}", views::dashboard(stats)),
                None => bail!("dashboard returned no data"),
            }
            Ok(())
        }
        Command::Reports { period } => {
            session.analytics(Some(&period)).await?;
            match &session.store().dashboard.analytics {
                Some(report) => print!("{}", views::analytics(report)),
                None => bail!("analytics returned no data"),
            }
            Ok(())
        }
    }
}

fn print_token(session: &CrmSession) -> Result<()> {
    let token = session
        .client()
        .token()
        .context("server did not return a token")?;
    println!("export CRM_TOKEN={token}");
    Ok(())
}

async fn records<R: Resource + Sliced>(
    session: &mut CrmSession,
    command: RecordCommand,
    table: fn(&[R]) -> String,
    detail: fn(&R) -> String,
    noun: &str,
) -> Result<()> {
    match command {
        RecordCommand::List(args) => {
            session.fetch::<R>(args.query()).await?;
            let slice = R::slice(session.store());
            print!("{}", table(&slice.items));
            println!("{}", views::page_footer(&slice.page));
        }
        RecordCommand::Show { id } => {
            let record = session.open::<R>(id).await?;
            print!("{}", detail(record));
        }
        RecordCommand::Delete { id, yes } => {
            let deleted = session
                .delete::<R>(id, || yes || confirm(&format!("Delete {noun} {id}?")))
                .await?;
            if deleted {
                println!("Deleted {noun} {id}");
            } else {
                println!("Cancelled");
            }
        }
    }
    Ok(())
}
