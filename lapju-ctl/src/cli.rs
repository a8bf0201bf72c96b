//! Command-line interface definition

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lapju-ctl", version, about = "LAPJU maintenance and reporting CLI")]
pub struct Cli {
    /// Root folder holding lapju.db (overrides LAPJU_ROOT and config file)
    #[arg(long, global = true)]
    pub root: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the global template catalog
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage a project's task tree
    #[command(subcommand)]
    Task(TaskCommand),

    /// Record and report daily progress
    #[command(subcommand)]
    Progress(ProgressCommand),
}

#[derive(Subcommand)]
pub enum TemplateCommand {
    /// Add a template node to the catalog
    Add {
        name: String,

        /// Parent template guid; omitted = new root node
        #[arg(long)]
        parent: Option<String>,

        #[arg(long, default_value_t = 0.0)]
        volume: f64,

        #[arg(long)]
        unit: Option<String>,

        #[arg(long, default_value_t = 0.0)]
        price: f64,

        #[arg(long, default_value_t = 0.0)]
        weight: f64,
    },

    /// List the catalog in tree order
    List {
        #[arg(long)]
        json: bool,
    },

    /// Delete a template and its whole subtree
    Remove { guid: String },

    /// Rebalance leaf weights so they sum to 100
    Normalize,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create a project; clones the template catalog into it
    Create {
        name: String,

        #[arg(long)]
        location: Option<String>,

        /// Project start date (YYYY-MM-DD), anchor for progress backfill
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Skip the automatic template clone
        #[arg(long)]
        no_clone: bool,
    },

    /// List projects
    List {
        #[arg(long)]
        json: bool,
    },

    /// Delete all tasks of a project (progress history goes with them)
    Reset { project: String },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Clone the template catalog into a project
    Clone {
        project: String,

        /// Delete existing tasks first instead of refusing
        #[arg(long)]
        force: bool,
    },

    /// List a project's task tree
    List {
        project: String,

        #[arg(long)]
        json: bool,
    },

    /// Rebalance the project's leaf weights so they sum to 100
    Normalize { project: String },
}

#[derive(Subcommand)]
pub enum ProgressCommand {
    /// Record one day's percentage for a leaf task
    Record {
        #[arg(long)]
        project: String,

        #[arg(long)]
        task: String,

        #[arg(long)]
        user: String,

        #[arg(long)]
        percentage: f64,

        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Latest known percentage per task as of a date
    Latest {
        project: String,

        /// Defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,

        #[arg(long)]
        json: bool,
    },

    /// Tree rollup as of a date
    Rollup {
        project: String,

        /// Defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,

        #[arg(long)]
        json: bool,
    },
}
