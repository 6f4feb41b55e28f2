use std::path::Path;
use std::sync::Arc;

/// Reset SIGPIPE to default behavior so piping (e.g. `icd-provider versions ... | head`)
/// exits cleanly instead of panicking on broken pipe.
#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use icd_provider::client::{
    ApiTransport, Authenticator, CloudDatabasesClient, GlobalTaggingClient, RetryPolicy, TagType,
};
use icd_provider::config::loader;
use icd_provider::config::types::{DatabaseResourceConfig, Settings};
use icd_provider::output::formatter;
use icd_provider::planner::{self, Diagnostic, LiveDeployment, ResourcePlan};
use icd_provider::state::StateStore;

/// icd-provider - IBM Cloud Databases resource engine
#[derive(Parser)]
#[command(name = "icd-provider", version, about, long_about = None)]
struct Cli {
    /// Path to a .tf file or a directory of .tf files
    #[arg(short, long, default_value = ".")]
    config: String,

    /// Provider settings file (defaults to ./icd.yaml when present)
    #[arg(short, long)]
    settings: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check credentials and allowlist entries without contacting the API
    Validate,

    /// Show the changes needed to reach the configured state
    Plan {
        /// Plan only specific resource address(es)
        #[arg(short, long)]
        target: Vec<String>,
    },

    /// Validate and apply changes to the deployments
    Apply {
        /// Apply only specific resource address(es)
        #[arg(short, long)]
        target: Vec<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },

    /// Show the in-place upgrades available for a deployment
    Versions {
        /// Deployment CRN
        instance: String,

        /// Region of the deployment (defaults to the CRN's region)
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Manage Global Tagging tags on a resource
    Tags {
        #[command(subcommand)]
        command: TagCommands,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// List tags attached to a resource
    List {
        /// Resource CRN
        resource_id: String,

        /// Tag type: user, access, service
        #[arg(long, default_value = "user")]
        tag_type: String,
    },
    /// Attach tags to a resource
    Attach {
        resource_id: String,
        #[arg(required = true)]
        tags: Vec<String>,
        #[arg(long, default_value = "user")]
        tag_type: String,
    },
    /// Detach tags from a resource
    Detach {
        resource_id: String,
        #[arg(required = true)]
        tags: Vec<String>,
        #[arg(long, default_value = "user")]
        tag_type: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(unix)]
    reset_sigpipe();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Validate => cmd_validate(&cli),
        Commands::Plan { ref target } => cmd_plan(&cli, target).await,
        Commands::Apply {
            ref target,
            auto_approve,
        } => cmd_apply(&cli, target, auto_approve).await,
        Commands::Versions {
            ref instance,
            ref location,
        } => cmd_versions(&cli, instance, location.as_deref()).await,
        Commands::Tags { ref command } => cmd_tags(&cli, command).await,
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn load_settings(cli: &Cli) -> Result<Settings> {
    loader::load_settings(cli.settings.as_deref().map(Path::new))
}

fn load_resources(cli: &Cli, targets: &[String]) -> Result<Vec<DatabaseResourceConfig>> {
    let resources = icd_provider::hcl::parse_directory(Path::new(&cli.config))?;
    Ok(resources
        .into_iter()
        .filter(|r| targets.is_empty() || targets.iter().any(|t| r.address().contains(t)))
        .collect())
}

fn build_clients(settings: &Settings) -> Result<(CloudDatabasesClient, GlobalTaggingClient)> {
    let credentials = loader::resolve_credentials(settings, |key| std::env::var(key).ok())?;
    let http = reqwest::Client::builder()
        .user_agent(concat!("icd-provider/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let auth = Arc::new(Authenticator::new(
        http.clone(),
        &settings.endpoints.iam,
        credentials,
    ));
    let transport = ApiTransport::new(http, auth, RetryPolicy::from(&settings.retry));

    Ok((
        CloudDatabasesClient::new(transport.clone(), &settings.databases_endpoint()),
        GlobalTaggingClient::new(transport, &settings.endpoints.tagging),
    ))
}

/// Plan every selected resource. Resources without a bound deployment only
/// get offline checks.
async fn build_plans(
    cli: &Cli,
    settings: &Settings,
    targets: &[String],
) -> Result<(Vec<ResourcePlan>, CloudDatabasesClient, GlobalTaggingClient)> {
    let resources = load_resources(cli, targets)?;
    if resources.is_empty() {
        bail!("No ibm_database resources found in {}", cli.config);
    }

    let state = StateStore::new(&settings.state_file).load()?;
    let (databases, tagging) = build_clients(settings)?;
    let reader = LiveDeployment {
        databases: &databases,
        tagging: &tagging,
    };

    let mut plans = Vec::new();
    for resource in &resources {
        let address = resource.address();
        let plan = match settings.instance_id(&address) {
            Some(instance_id) => {
                let recorded = state.resources.get(&address);
                planner::plan_resource(&reader, resource, instance_id, &settings.region, recorded)
                    .await
                    .with_context(|| format!("Failed to plan {}", address))?
            }
            None => {
                tracing::warn!(resource = %address, "No deployment bound in settings `instances`");
                let mut plan = ResourcePlan::new(&address, None);
                plan.diagnostics = planner::validate_offline(resource);
                plan
            }
        };
        plans.push(plan);
    }

    Ok((plans, databases, tagging))
}

fn report_diagnostics(plans: &[ResourcePlan]) -> Result<()> {
    let diagnostics: Vec<Diagnostic> = plans
        .iter()
        .flat_map(|p| p.diagnostics.iter().cloned())
        .collect();
    if diagnostics.is_empty() {
        return Ok(());
    }
    formatter::print_diagnostics(&diagnostics);
    bail!("{} change(s) rejected", diagnostics.len())
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn cmd_validate(cli: &Cli) -> Result<()> {
    let resources = load_resources(cli, &[])?;
    let diagnostics: Vec<Diagnostic> =
        resources.iter().flat_map(planner::validate_offline).collect();

    if diagnostics.is_empty() {
        formatter::print_success(&format!(
            "{} resource(s) valid.",
            resources.len()
        ));
        return Ok(());
    }

    formatter::print_diagnostics(&diagnostics);
    bail!("Validation failed")
}

async fn cmd_plan(cli: &Cli, targets: &[String]) -> Result<()> {
    let settings = load_settings(cli)?;
    let (plans, _, _) = build_plans(cli, &settings, targets).await?;

    for plan in &plans {
        formatter::print_resource_plan(plan);
    }
    report_diagnostics(&plans)
}

async fn cmd_apply(cli: &Cli, targets: &[String], auto_approve: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let (plans, databases, tagging) = build_plans(cli, &settings, targets).await?;

    for plan in &plans {
        formatter::print_resource_plan(plan);
    }
    report_diagnostics(&plans)?;

    let pending: Vec<&ResourcePlan> = plans
        .iter()
        .filter(|p| p.has_changes() && p.instance_id.is_some())
        .collect();
    if pending.is_empty() {
        println!("\n{}", "No changes. Deployments are up-to-date.".green());
        return Ok(());
    }

    if !auto_approve {
        println!(
            "\nDo you want to perform these actions? Only '{}' will be accepted.",
            "yes".bold()
        );
        print!("  Enter a value: ");
        use std::io::Write;
        std::io::stdout().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "yes" {
            println!("\n{}", "Apply cancelled.".yellow());
            return Ok(());
        }
    }

    let store = StateStore::new(&settings.state_file);
    let mut applied = 0;
    for plan in pending {
        let summary = planner::apply_plan(&databases, &tagging, plan, &settings.timeouts).await?;
        applied += summary.applied;
        if let Some(next) = &plan.next_state {
            store.record(&plan.address, next.clone()).with_context(|| {
                format!("Applied {} but failed to record its state", plan.address)
            })?;
        }
    }

    formatter::print_success(&format!("Apply complete! {} change(s) applied.", applied));
    Ok(())
}

async fn cmd_versions(cli: &Cli, instance: &str, location: Option<&str>) -> Result<()> {
    let settings = load_settings(cli)?;
    let (databases, _) = build_clients(&settings)?;

    let location = match location {
        Some(l) => l.to_string(),
        None => {
            let deployment = databases.get_deployment(instance).await?;
            deployment
                .location()
                .unwrap_or(settings.region.as_str())
                .to_string()
        }
    };

    let version = databases.get_deployment_version(instance, &location).await?;
    formatter::print_versions(version.as_ref());
    Ok(())
}

async fn cmd_tags(cli: &Cli, command: &TagCommands) -> Result<()> {
    let settings = load_settings(cli)?;
    let (_, tagging) = build_clients(&settings)?;

    match command {
        TagCommands::List {
            resource_id,
            tag_type,
        } => {
            let tags = tagging
                .list_attached(resource_id, tag_type.parse::<TagType>()?)
                .await?;
            formatter::print_tags(resource_id, &tags);
        }
        TagCommands::Attach {
            resource_id,
            tags,
            tag_type,
        } => {
            tagging
                .attach(resource_id, tags, tag_type.parse::<TagType>()?)
                .await?;
            formatter::print_success(&format!("Attached {} tag(s).", tags.len()));
        }
        TagCommands::Detach {
            resource_id,
            tags,
            tag_type,
        } => {
            tagging
                .detach(resource_id, tags, tag_type.parse::<TagType>()?)
                .await?;
            formatter::print_success(&format!("Detached {} tag(s).", tags.len()));
        }
    }
    Ok(())
}
