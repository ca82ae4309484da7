use std::fmt;

use chrono::Utc;
use inquire::{InquireError, Select, Text};

use crate::console::PlanOption;
use crate::render::format_relative_time;
use crate::types::{Membership, MembershipSet};

/// Membership with its active marker for display
pub struct MembershipDisplay {
    pub membership: Membership,
    pub active: bool,
}

impl fmt::Display for MembershipDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.active { "*" } else { " " };
        let joined = match &self.membership.joined_at {
            Some(at) => format!("joined {}", format_relative_time(at, Utc::now())),
            None => "join date unknown".to_string(),
        };
        write!(
            f,
            "{marker} {}  [{}]  {joined}",
            self.membership.client_id, self.membership.role
        )
    }
}

struct PlanChoice(PlanOption);

impl fmt::Display for PlanChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.name, self.0.id)
    }
}

#[must_use]
pub fn membership_displays(set: &MembershipSet) -> Vec<MembershipDisplay> {
    set.memberships
        .iter()
        .map(|membership| MembershipDisplay {
            active: set.active_id.as_deref() == Some(membership.client_id.as_str()),
            membership: membership.clone(),
        })
        .collect()
}

/// Print workspaces, marking the active one
pub fn print_memberships(set: &MembershipSet) {
    if set.memberships.is_empty() {
        println!("You are not a member of any workspace.");
        return;
    }
    println!();
    for display in membership_displays(set) {
        println!("  {display}");
    }
    println!();
}

/// Pick a workspace from the list
pub fn pick_workspace(set: &MembershipSet) -> anyhow::Result<Option<String>> {
    let displays = membership_displays(set);

    if displays.is_empty() {
        println!("You are not a member of any workspace.");
        return Ok(None);
    }

    let start = displays.iter().position(|d| d.active).unwrap_or(0);
    let selection = Select::new("Select workspace:", displays)
        .with_starting_cursor(start)
        .with_page_size(15)
        .with_help_message("Type to filter, Enter to select")
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(display) => Ok(Some(display.membership.client_id)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Pick a plan to switch to
pub fn pick_plan(options: &[PlanOption], current: Option<&str>) -> anyhow::Result<Option<String>> {
    if options.is_empty() {
        println!("No plans available.");
        return Ok(None);
    }

    let start = current
        .and_then(|id| options.iter().position(|o| o.id == id))
        .unwrap_or(0);
    let choices: Vec<PlanChoice> = options.iter().cloned().map(PlanChoice).collect();
    let selection = Select::new("Select plan:", choices)
        .with_starting_cursor(start)
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(choice) => Ok(Some(choice.0.id)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Use the flag value if given, otherwise prompt for a non-empty value
pub fn value_or_prompt(
    value: Option<String>,
    flag: &str,
    prompt: &str,
    non_interactive: bool,
) -> anyhow::Result<String> {
    if let Some(v) = value {
        if v.trim().is_empty() {
            anyhow::bail!("--{flag} cannot be empty");
        }
        return Ok(v.trim().to_string());
    }
    if non_interactive {
        anyhow::bail!("--{flag} is required in non-interactive mode");
    }
    let entered = Text::new(prompt)
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Ok(inquire::validator::Validation::Invalid(
                    "A value is required".into(),
                ))
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;
    Ok(entered.trim().to_string())
}

/// Request confirmation for a destructive operation
pub fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}
