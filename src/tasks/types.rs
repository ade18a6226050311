use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Export,
    Import,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Export => "export",
            TaskKind::Import => "import",
        }
    }
}

impl Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "export" => Ok(TaskKind::Export),
            "import" => Ok(TaskKind::Import),
            _ => Err(format!("invalid task kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Completed and Failed admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(format!("invalid task status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFormat {
    Json,
    Csv,
    Xlsx,
}

impl TaskFormat {
    /// Accepted spellings for user input, case-insensitive. `excel` and
    /// `xls` normalize to xlsx.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "json" => Some(TaskFormat::Json),
            "csv" => Some(TaskFormat::Csv),
            "xlsx" | "xls" | "excel" => Some(TaskFormat::Xlsx),
            _ => None,
        }
    }

    /// Sniff the format from an uploaded file name's extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = file_name.rsplit_once('.')?.1;
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(TaskFormat::Json),
            "csv" => Some(TaskFormat::Csv),
            "xlsx" | "xls" => Some(TaskFormat::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFormat::Json => "json",
            TaskFormat::Csv => "csv",
            TaskFormat::Xlsx => "xlsx",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime(&self) -> &'static str {
        match self {
            TaskFormat::Json => "application/json",
            TaskFormat::Csv => "text/csv; charset=utf-8",
            TaskFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl Display for TaskFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(TaskFormat::Json),
            "csv" => Ok(TaskFormat::Csv),
            "xlsx" => Ok(TaskFormat::Xlsx),
            _ => Err(format!("invalid task format: {}", s)),
        }
    }
}

/// One background job (export or import) with pollable state. Export and
/// import tasks share the shape; the fields a kind never sets stay at
/// their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub progress: u8,
    pub format: TaskFormat,
    pub total_records: u64,
    pub processed_records: u64,
    pub success_records: u64,
    pub failed_records: u64,
    pub errors: Vec<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub error: Option<String>,
    pub search_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial update merged into a stored task. `None` leaves the stored
/// field untouched. `failed_records` and `errors` only move through
/// `add_error`, never through a patch.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub total_records: Option<u64>,
    pub processed_records: Option<u64>,
    pub success_records: Option<u64>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub error: Option<String>,
}

impl TaskPatch {
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(total) = self.total_records {
            task.total_records = total;
        }
        if let Some(processed) = self.processed_records {
            task.processed_records = processed;
        }
        if let Some(succeeded) = self.success_records {
            task.success_records = succeeded;
        }
        if let Some(file_name) = &self.file_name {
            task.file_name = Some(file_name.clone());
        }
        if let Some(file_path) = &self.file_path {
            task.file_path = Some(file_path.clone());
        }
        if let Some(error) = &self.error {
            task.error = Some(error.clone());
        }
    }
}
