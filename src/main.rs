use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shoreline::api::QueryHistoryParams;
use shoreline::cli::{
    AdminCommands, AuthCommands, BillingCommands, ClientCommands, MemberCommands, QueryArgs,
    WorkspaceCommands, run_auth_login, run_auth_logout, run_auth_status, run_billing_checkout,
    run_billing_portal, run_client_set, run_history, run_info, run_init, run_member_add,
    run_member_remove, run_plan, run_query, run_usage, run_workspace_list, run_workspace_select,
};

#[derive(Parser)]
#[command(name = "shoreline")]
#[command(about = "A terminal console for analytics workspaces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands for the local database
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Sign in and out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// List and choose workspaces
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },

    /// Run a SQL statement against the active workspace
    Query {
        /// SQL to run (defaults to a recent query history sample)
        sql: Option<String>,

        /// Read the statement from a file
        #[arg(long, short)]
        file: Option<String>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Workspace ID (defaults to the active workspace)
        #[arg(long)]
        workspace: Option<String>,

        /// Query a specific table snapshot
        #[arg(long)]
        snapshot_id: Option<String>,

        /// Query tables as of an ISO-8601 instant
        #[arg(long)]
        as_of: Option<String>,

        /// Maximum rows to return
        #[arg(long)]
        limit: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show daily usage for the active workspace
    Usage {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Workspace ID (defaults to the active workspace)
        #[arg(long)]
        workspace: Option<String>,

        /// Days of history to request
        #[arg(long)]
        days: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent queries for the active workspace
    History {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Workspace ID (defaults to the active workspace)
        #[arg(long)]
        workspace: Option<String>,

        /// Earliest submission time, ISO-8601 (defaults to 7 days ago)
        #[arg(long)]
        start: Option<String>,

        /// Latest submission time, ISO-8601 (defaults to end of today)
        #[arg(long)]
        end: Option<String>,

        /// Only queries touching this table
        #[arg(long)]
        table: Option<String>,

        /// Maximum entries to return
        #[arg(long)]
        limit: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the plan, subscription and entitlements of a workspace
    Plan {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Workspace ID (defaults to the active workspace)
        #[arg(long)]
        workspace: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change plans or manage billing
    Billing {
        #[command(subcommand)]
        command: BillingCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("shoreline=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => run_init(data_dir)?,
            AdminCommands::Member { command } => match command {
                MemberCommands::Add {
                    data_dir,
                    user_id,
                    client_id,
                    role,
                    joined_at,
                    non_interactive,
                } => run_member_add(data_dir, user_id, client_id, role, joined_at, non_interactive)?,
                MemberCommands::Remove {
                    data_dir,
                    user_id,
                    client_id,
                    non_interactive,
                    yes,
                } => run_member_remove(data_dir, user_id, client_id, non_interactive, yes)?,
            },
            AdminCommands::Client { command } => match command {
                ClientCommands::Set {
                    data_dir,
                    client_id,
                    name,
                    plan,
                    plan_name,
                    status,
                    customer_id,
                    period_end,
                    entitlements,
                } => run_client_set(
                    data_dir,
                    client_id,
                    name,
                    plan,
                    plan_name,
                    status,
                    customer_id,
                    period_end,
                    entitlements,
                )?,
            },
            AdminCommands::Info { data_dir, json } => run_info(data_dir, json)?,
        },
        Commands::Auth { command } => match command {
            AuthCommands::Login {
                server,
                user_id,
                email,
                token,
                non_interactive,
            } => run_auth_login(server, user_id, email, token, non_interactive)?,
            AuthCommands::Logout => run_auth_logout().await?,
            AuthCommands::Status => run_auth_status()?,
        },
        Commands::Workspace { command } => match command {
            WorkspaceCommands::List { data_dir, json } => run_workspace_list(data_dir, json).await?,
            WorkspaceCommands::Select {
                client_id,
                data_dir,
            } => run_workspace_select(data_dir, client_id).await?,
        },
        Commands::Query {
            sql,
            file,
            data_dir,
            workspace,
            snapshot_id,
            as_of,
            limit,
            json,
        } => {
            run_query(QueryArgs {
                data_dir,
                workspace,
                sql,
                file,
                snapshot_id,
                as_of,
                limit,
                json,
            })
            .await?;
        }
        Commands::Usage {
            data_dir,
            workspace,
            days,
            json,
        } => run_usage(data_dir, workspace, days, json).await?,
        Commands::History {
            data_dir,
            workspace,
            start,
            end,
            table,
            limit,
            json,
        } => {
            let params = QueryHistoryParams {
                start,
                end,
                table,
                limit,
            };
            run_history(data_dir, workspace, params, json).await?;
        }
        Commands::Plan {
            data_dir,
            workspace,
            json,
        } => run_plan(data_dir, workspace, json).await?,
        Commands::Billing { command } => match command {
            BillingCommands::Checkout {
                data_dir,
                workspace,
                plan,
                success_url,
                cancel_url,
                non_interactive,
            } => {
                run_billing_checkout(
                    data_dir,
                    workspace,
                    plan,
                    success_url,
                    cancel_url,
                    non_interactive,
                )
                .await?;
            }
            BillingCommands::Portal {
                data_dir,
                workspace,
                return_url,
            } => run_billing_portal(data_dir, workspace, return_url).await?,
        },
    }

    Ok(())
}
