use colored::Colorize;

use crate::capability::Version;
use crate::planner::{Diagnostic, PlannedChange, ResourcePlan};

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

/// Print rejected changes in a Terraform-like diagnostic format.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for (i, diag) in diagnostics.iter().enumerate() {
        if i > 0 {
            eprintln!();
        }
        eprintln!(
            "{} {}",
            "Error:".red().bold(),
            format!("invalid {}", diag.kind).bold()
        );
        eprintln!();
        eprintln!("  {} {}", "with".dimmed(), diag.address.yellow());
        eprintln!();
        for line in diag.message.lines() {
            eprintln!("  {}", line);
        }
    }
    if !diagnostics.is_empty() {
        eprintln!();
        eprintln!(
            "{} Configuration contains {} error(s). Fix the errors above to continue.",
            "Error:".red().bold(),
            diagnostics.len().to_string().red().bold()
        );
    }
}

/// Print the planned changes for a resource.
pub fn print_resource_plan(plan: &ResourcePlan) {
    println!();

    if !plan.has_changes() {
        println!(
            "{} {}",
            plan.address.bold(),
            "is up-to-date.".green()
        );
        return;
    }

    println!(
        "  {} {} {}",
        "#".dimmed(),
        plan.address.bold(),
        "will be updated in-place".dimmed()
    );

    for change in &plan.changes {
        print_change(change);
    }
}

fn print_change(change: &PlannedChange) {
    match change {
        PlannedChange::UpgradeVersion {
            from,
            to,
            skip_backup,
        } => {
            let line = format!("  ~ version = \"{}\" -> \"{}\"", from, to);
            println!("{}", line.yellow());
            if *skip_backup {
                println!("    {}", "(backup will be skipped)".dimmed());
            }
        }
        PlannedChange::ScaleGroup {
            group_id,
            scaling,
            changes,
        } => {
            println!("{}", format!("  ~ group \"{}\" {{", group_id).yellow());
            for c in changes {
                let line = format!("      ~ {} = {} -> {}", c.kind, c.from, c.to);
                println!("{}", line.yellow());
            }
            if let Some(flavor) = &scaling.host_flavor {
                println!("{}", format!("      ~ host_flavor = \"{}\"", flavor).yellow());
            }
            println!("{}", "    }".yellow());
        }
        PlannedChange::SetAutoScaling { group_id, autoscaling } => {
            println!("{}", format!("  ~ auto_scaling \"{}\" {{", group_id).yellow());
            for (name, rule) in [
                ("disk", &autoscaling.disk),
                ("memory", &autoscaling.memory),
                ("cpu", &autoscaling.cpu),
            ] {
                if rule.is_some() {
                    println!("{}", format!("      ~ {}", name).yellow());
                }
            }
            println!("{}", "    }".yellow());
        }
        PlannedChange::UpdateAdminPassword { username, .. } => {
            let line = format!("  ~ adminpassword ({}) = (sensitive value)", username);
            println!("{}", line.yellow());
        }
        PlannedChange::UpsertUser(user) => {
            let line = format!(
                "  ~ users \"{}\" ({}) password = (sensitive value)",
                user.username, user.user_type
            );
            println!("{}", line.yellow());
        }
        PlannedChange::DeleteUser { user_type, username } => {
            let line = format!("  - users \"{}\" ({})", username, user_type);
            println!("{}", line.red());
        }
        PlannedChange::RemoveAllowlistEntry(entry) => {
            println!("{}", format!("  - allowlist {}", entry).red());
        }
        PlannedChange::AddAllowlistEntry(entry) => {
            println!("{}", format!("  + allowlist {}", entry).green());
        }
        PlannedChange::AttachTags(tags) => {
            for tag in tags {
                println!("{}", format!("  + tag \"{}\"", tag).green());
            }
        }
        PlannedChange::DetachTags(tags) => {
            for tag in tags {
                println!("{}", format!("  - tag \"{}\"", tag).red());
            }
        }
    }
}

/// Print the in-place upgrade targets of a version.
pub fn print_versions(version: Option<&Version>) {
    let Some(version) = version else {
        println!("{}", "The backend reported no version information.".yellow());
        return;
    };

    println!("Current version: {}", version.version.bold());
    let upgrades = version.allowed_upgrades();
    if upgrades.is_empty() {
        println!("{}", "No in-place upgrades available.".yellow());
        return;
    }

    println!("In-place upgrades:");
    for upgrade in upgrades {
        let skip = if upgrade.skip_backup.is_supported() {
            "skip-backup supported".green()
        } else {
            "backup required".dimmed()
        };
        println!("  {} {} ({})", "→".cyan(), upgrade.to_version.bold(), skip);
    }
}

pub fn print_tags(resource_id: &str, tags: &[String]) {
    if tags.is_empty() {
        println!("No tags attached to {}", resource_id.bold());
        return;
    }
    for tag in tags {
        println!("{}", tag);
    }
}
