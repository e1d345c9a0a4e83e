use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use focuslog_core::models::TaskPriority;

#[derive(Parser)]
#[command(name = "focuslog")]
#[command(about = "Track projects, tasks, and focus sessions from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Run or inspect background sync
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project
    #[command(alias = "new")]
    Add {
        /// Project name
        name: Vec<String>,
    },
    /// List projects
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a new task
    #[command(alias = "new")]
    Add {
        /// Task title
        title: Vec<String>,
        /// Local project id to file the task under
        #[arg(long, value_name = "ID")]
        project: Option<i64>,
        /// Time estimate in minutes
        #[arg(long, value_name = "MINUTES")]
        estimate: Option<i64>,
        /// Task priority
        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        /// Due date, RFC3339
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
    },
    /// List tasks, in sort order
    List {
        /// Only tasks in this project
        #[arg(long, value_name = "ID")]
        project: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a task done
    Done {
        /// Local task id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Run a sync cycle now
    Now,
    /// Show sync state and pending counts
    Status,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
    Urgent,
}

impl From<PriorityArg> for TaskPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
            PriorityArg::Urgent => Self::Urgent,
        }
    }
}
