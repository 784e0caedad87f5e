//! Task management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;
use studyflow_core::{Task, TaskDraft, TaskId, TaskPatch};

use super::{print_json, with_workspace};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task name
        name: String,
        /// Deck the task studies
        #[arg(long)]
        deck: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// First page of the range
        #[arg(long, requires = "end_page")]
        start_page: Option<u32>,
        /// Last page of the range
        #[arg(long, requires = "start_page")]
        end_page: Option<u32>,
        /// Current page (defaults to the start page)
        #[arg(long)]
        current_page: Option<u32>,
        /// Progress percentage (0-100), for tasks without pages
        #[arg(long)]
        progress: Option<u8>,
    },
    /// List tasks
    List {
        /// Only tasks in this deck
        #[arg(long)]
        deck: Option<String>,
        /// Hide completed tasks
        #[arg(long)]
        open: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: TaskId,
    },
    /// Update a task
    Update {
        /// Task ID
        id: TaskId,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
        /// New current page
        #[arg(long)]
        current_page: Option<u32>,
        /// New progress percentage
        #[arg(long)]
        progress: Option<u8>,
    },
    /// Mark a task as completed
    Complete {
        /// Task ID
        id: TaskId,
    },
    /// Mark a task as not completed
    Reopen {
        /// Task ID
        id: TaskId,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: TaskId,
    },
}

/// Task as printed, with its effective progress resolved.
#[derive(Serialize)]
struct TaskView {
    #[serde(flatten)]
    task: Task,
    progress_pct: u8,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        let progress_pct = task.progress_pct();
        Self { task, progress_pct }
    }
}

pub fn run(user: Option<String>, action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TaskAction::Create {
            name,
            deck,
            due,
            start_page,
            end_page,
            current_page,
            progress,
        } => {
            let draft = TaskDraft {
                name,
                deck,
                due,
                pages: start_page.zip(end_page),
                current_page,
                progress,
            };
            let task = with_workspace(user, |ws, _| ws.create_task(draft))?;
            print_json(&TaskView::from(task))?;
        }
        TaskAction::List { deck, open } => {
            let tasks = with_workspace(user, |ws, _| ws.tasks())?;
            let views: Vec<TaskView> = tasks
                .into_iter()
                .filter(|t| deck.as_deref().map_or(true, |d| t.deck == d))
                .filter(|t| !open || !t.completed)
                .map(TaskView::from)
                .collect();
            print_json(&views)?;
        }
        TaskAction::Get { id } => {
            let task = with_workspace(user, |ws, _| ws.task(id))?;
            print_json(&TaskView::from(task))?;
        }
        TaskAction::Update {
            id,
            name,
            due,
            clear_due,
            current_page,
            progress,
        } => {
            let patch = TaskPatch {
                name,
                due: if clear_due { Some(None) } else { due.map(Some) },
                current_page,
                progress,
            };
            let task = with_workspace(user, |ws, _| ws.update_task(id, patch))?;
            print_json(&TaskView::from(task))?;
        }
        TaskAction::Complete { id } => {
            let task = with_workspace(user, |ws, _| ws.set_completed(id, true))?;
            print_json(&TaskView::from(task))?;
        }
        TaskAction::Reopen { id } => {
            let task = with_workspace(user, |ws, _| ws.set_completed(id, false))?;
            print_json(&TaskView::from(task))?;
        }
        TaskAction::Delete { id } => {
            let task = with_workspace(user, |ws, _| ws.delete_task(id))?;
            println!("Task deleted: {}", task.id);
        }
    }
    Ok(())
}
