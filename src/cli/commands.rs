use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create the local membership and workspace database
    Init {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Manage workspace memberships
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },

    /// Manage workspace profiles
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Show database contents
    Info {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// Add a user to a workspace, or update their role
    Add {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// User to add
        #[arg(long)]
        user_id: Option<String>,

        /// Workspace to add the user to
        #[arg(long)]
        client_id: Option<String>,

        /// Role within the workspace (defaults to member)
        #[arg(long)]
        role: Option<String>,

        /// Join time as RFC 3339 (defaults to now)
        #[arg(long)]
        joined_at: Option<String>,

        /// Skip interactive prompts (requires --user-id and --client-id)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Remove a user from a workspace
    Remove {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// User to remove
        #[arg(long)]
        user_id: String,

        /// Workspace to remove the user from
        #[arg(long)]
        client_id: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Create or update a workspace profile
    Set {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Workspace ID
        #[arg(long)]
        client_id: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Plan ID
        #[arg(long)]
        plan: Option<String>,

        /// Plan display name
        #[arg(long)]
        plan_name: Option<String>,

        /// Subscription status (active, trialing, past_due, ...)
        #[arg(long)]
        status: Option<String>,

        /// Billing customer ID
        #[arg(long)]
        customer_id: Option<String>,

        /// End of the current billing period, RFC 3339
        #[arg(long)]
        period_end: Option<String>,

        /// Entitlement as KEY=VALUE; use VALUE "unlimited" for no limit
        #[arg(long = "entitlement", value_name = "KEY=VALUE")]
        entitlements: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store credentials for the API
    Login {
        /// API base URL (e.g., "https://api.example.com")
        #[arg(long)]
        server: Option<String>,

        /// User ID issued by the identity provider
        #[arg(long)]
        user_id: Option<String>,

        /// Email address, shown in status output
        #[arg(long)]
        email: Option<String>,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,

        /// Skip interactive prompts (requires --server, --user-id and --token)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Sign out and remove stored credentials
    Logout,

    /// Show who is signed in
    Status,
}

#[derive(Subcommand)]
pub enum WorkspaceCommands {
    /// List the workspaces you belong to
    List {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Choose the active workspace
    Select {
        /// Workspace ID (prompts when omitted)
        client_id: Option<String>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BillingCommands {
    /// Start a checkout session for a plan change
    Checkout {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Workspace ID (defaults to the active workspace)
        #[arg(long)]
        workspace: Option<String>,

        /// Plan to switch to (prompts when omitted)
        #[arg(long)]
        plan: Option<String>,

        /// Where checkout returns after payment
        #[arg(long)]
        success_url: Option<String>,

        /// Where checkout returns when abandoned
        #[arg(long)]
        cancel_url: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Open a billing portal session
    Portal {
        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Workspace ID (defaults to the active workspace)
        #[arg(long)]
        workspace: Option<String>,

        /// Where the portal returns to
        #[arg(long)]
        return_url: Option<String>,
    },
}
