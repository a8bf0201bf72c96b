//! Subcommand implementations
//!
//! Read commands print a human-readable tree view by default or JSON with
//! `--json`; mutations report counts and outcomes on stdout and log details
//! through tracing.

use crate::cli::{Command, ProgressCommand, ProjectCommand, TaskCommand, TemplateCommand};
use anyhow::Result;
use chrono::Local;
use lapju_common::db::models::{NewProgress, NodeFields};
use lapju_common::db::{progress, projects, tasks, templates};
use lapju_common::normalize::NormalizeOutcome;
use lapju_common::fixed;
use lapju_common::tree::{self, TreeNode};
use sqlx::SqlitePool;
use tracing::warn;

pub async fn run(db: &SqlitePool, command: Command) -> Result<()> {
    match command {
        Command::Template(cmd) => run_template(db, cmd).await,
        Command::Project(cmd) => run_project(db, cmd).await,
        Command::Task(cmd) => run_task(db, cmd).await,
        Command::Progress(cmd) => run_progress(db, cmd).await,
    }
}

async fn run_template(db: &SqlitePool, cmd: TemplateCommand) -> Result<()> {
    match cmd {
        TemplateCommand::Add {
            name,
            parent,
            volume,
            unit,
            price,
            weight,
        } => {
            let template = templates::insert_template(
                db,
                parent.as_deref(),
                NodeFields {
                    name,
                    volume_h: fixed::from_f64(volume),
                    unit,
                    price_h: fixed::from_f64(price),
                    weight_h: fixed::from_f64(weight),
                },
            )
            .await?;
            println!("Added template {} ({})", template.name, template.guid);
        }
        TemplateCommand::List { json } => {
            let catalog = templates::list_templates(db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else if catalog.is_empty() {
                println!("Template catalog is empty");
            } else {
                report_bounds_violations(&catalog);
                print_tree(&catalog, |t| {
                    if t.is_container() {
                        format!("{} [group] ({})", t.name, t.guid)
                    } else {
                        format!("{} [w {}] ({})", t.name, fixed::format(t.weight_h), t.guid)
                    }
                })?;
            }
        }
        TemplateCommand::Remove { guid } => {
            let deleted = templates::delete_template_subtree(db, &guid).await?;
            println!("Removed {} template node(s)", deleted);
        }
        TemplateCommand::Normalize => {
            let outcome = templates::normalize_template_weights(db).await?;
            print_outcome(&outcome);
        }
    }
    Ok(())
}

async fn run_project(db: &SqlitePool, cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Create {
            name,
            location,
            start_date,
            no_clone,
        } => {
            let project =
                projects::create_project(db, &name, location.as_deref(), start_date).await?;
            println!("Created project {} ({})", project.name, project.guid);

            // Project creation fires the clone hook unless suppressed
            if !no_clone {
                let cloned = tasks::clone_templates_for_project(db, &project.guid).await?;
                println!("Cloned {} template(s) into the project", cloned);
            }
        }
        ProjectCommand::List { json } => {
            let all = projects::list_projects(db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else if all.is_empty() {
                println!("No projects");
            } else {
                for p in all {
                    let start = p
                        .start_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("{}  start {}  {}", p.guid, start, p.name);
                }
            }
        }
        ProjectCommand::Reset { project } => {
            projects::get_project(db, &project).await?;
            let deleted = tasks::delete_project_tasks(db, &project).await?;
            println!("Deleted {} task(s) from project {}", deleted, project);
        }
    }
    Ok(())
}

async fn run_task(db: &SqlitePool, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Clone { project, force } => {
            let existing = tasks::count_tasks(db, &project).await?;
            if existing > 0 {
                if !force {
                    anyhow::bail!(
                        "project {} already has {} task(s); re-run with --force to reset first",
                        project,
                        existing
                    );
                }
                tasks::delete_project_tasks(db, &project).await?;
            }
            let cloned = tasks::clone_templates_for_project(db, &project).await?;
            println!("Cloned {} template(s) into project {}", cloned, project);
        }
        TaskCommand::List { project, json } => {
            let all = tasks::list_tasks(db, &project).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else if all.is_empty() {
                println!("Project {} has no tasks", project);
            } else {
                report_bounds_violations(&all);
                report_weight_sum(&all);
                let numbers = tree::leaf_numbers(&all);
                print_tree(&all, |t| {
                    let prefix = numbers
                        .get(&t.guid)
                        .map(|n| format!("{}. ", n))
                        .unwrap_or_default();
                    format!(
                        "{}{} [w {}, total {}] ({})",
                        prefix,
                        t.name,
                        fixed::format(t.weight_h),
                        fixed::format(t.total_price_h),
                        t.guid
                    )
                })?;
            }
        }
        TaskCommand::Normalize { project } => {
            let outcome = tasks::normalize_task_weights(db, &project).await?;
            print_outcome(&outcome);
        }
    }
    Ok(())
}

async fn run_progress(db: &SqlitePool, cmd: ProgressCommand) -> Result<()> {
    match cmd {
        ProgressCommand::Record {
            project,
            task,
            user,
            percentage,
            date,
            notes,
        } => {
            let entry = progress::record_progress(
                db,
                NewProgress {
                    task_guid: task,
                    project_guid: project,
                    user_guid: user,
                    percentage_h: fixed::from_f64(percentage),
                    progress_date: date.unwrap_or_else(|| Local::now().date_naive()),
                    notes,
                },
            )
            .await?;
            println!(
                "Recorded {}% for task {} on {}",
                fixed::format(entry.percentage_h),
                entry.task_guid,
                entry.progress_date
            );
        }
        ProgressCommand::Latest {
            project,
            as_of,
            json,
        } => {
            let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
            let latest = progress::get_latest_progress(db, &project, as_of).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&latest)?);
                return Ok(());
            }
            let all = tasks::list_tasks(db, &project).await?;
            for task in &all {
                if !tree::is_leaf(task, &all) {
                    continue;
                }
                match latest.get(&task.guid) {
                    Some(l) => println!(
                        "{}  {}%  (as of {})  {}",
                        task.guid,
                        fixed::format(l.percentage_h),
                        l.progress_date,
                        task.name
                    ),
                    None => println!("{}  no data  {}", task.guid, task.name),
                }
            }
        }
        ProgressCommand::Rollup {
            project,
            as_of,
            json,
        } => {
            let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
            let report = progress::get_rollup(db, &project, as_of).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            let all = tasks::list_tasks(db, &project).await?;
            print_tree(&all, |t| {
                if let Some(parent) = report.parents.get(&t.guid) {
                    format!(
                        "{}  {}% over {} leaf task(s)",
                        t.name,
                        fixed::format(parent.percentage_h),
                        parent.leaf_count
                    )
                } else {
                    match report.leaves.get(&t.guid) {
                        Some(Some(pct)) => format!("{}  {}%", t.name, fixed::format(*pct)),
                        _ => format!("{}  no data", t.name),
                    }
                }
            })?;
            println!(
                "Project total: {}% over {} leaf task(s) as of {}",
                fixed::format(report.project_percentage_h),
                report.project_leaf_count,
                as_of
            );
        }
    }
    Ok(())
}

fn print_outcome(outcome: &NormalizeOutcome) {
    if outcome.success {
        println!(
            "Normalized {} weight(s), final sum {:.2}",
            outcome.updated_count, outcome.final_sum
        );
    } else {
        println!(
            "Normalization incomplete: updated {} weight(s) but sum is {:.2}",
            outcome.updated_count, outcome.final_sum
        );
    }
}

/// Corrupted bounds are reported, never fatal
fn report_bounds_violations<N: TreeNode>(nodes: &[N]) {
    for violation in tree::verify_bounds(nodes) {
        warn!("Bounds violation at {}: {}", violation.guid, violation.detail);
    }
}

/// The leaf weight sum is expected at 100.00; drift is a warning until the
/// operator runs a normalization
fn report_weight_sum(tasks: &[lapju_common::db::models::Task]) {
    let sum: i64 = tasks
        .iter()
        .filter(|t| tree::is_leaf(*t, tasks))
        .map(|t| t.weight_h)
        .sum();
    if (sum - fixed::FULL_SCALE).abs() > fixed::WEIGHT_SUM_TOLERANCE {
        warn!(
            "Leaf weights sum to {}, expected 100.00; run `lapju-ctl task normalize`",
            fixed::format(sum)
        );
    }
}

/// Print nodes in left-bound order, indented by depth
fn print_tree<N, F>(nodes: &[N], label: F) -> Result<()>
where
    N: TreeNode,
    F: Fn(&N) -> String,
{
    for node in nodes {
        let depth = tree::depth_of(node, nodes)?;
        println!("{}{}", "  ".repeat(depth as usize), label(node));
    }
    Ok(())
}
