//! Database models
//!
//! All fractional columns (`*_h` suffix) hold i64 hundredths, see
//! [`crate::fixed`]. Identifiers are TEXT guids.

use crate::tree::TreeNode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub guid: String,
    pub name: String,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
}

/// One node of the global template catalog tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateTask {
    pub guid: String,
    pub parent_guid: Option<String>,
    pub left_bound: i64,
    pub right_bound: i64,
    pub name: String,
    pub volume_h: i64,
    pub unit: Option<String>,
    pub price_h: i64,
    pub weight_h: i64,
}

impl TemplateTask {
    /// A template with zero volume and zero price is a pure grouping node
    pub fn is_container(&self) -> bool {
        self.volume_h == 0 && self.price_h == 0
    }
}

/// One node of a project's task tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub guid: String,
    pub project_guid: String,
    pub template_guid: Option<String>,
    pub parent_guid: Option<String>,
    pub left_bound: i64,
    pub right_bound: i64,
    pub name: String,
    pub volume_h: i64,
    pub unit: Option<String>,
    pub price_h: i64,
    pub weight_h: i64,
    /// Derived: `price × volume`, recomputed before every write
    pub total_price_h: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub guid: String,
    pub task_guid: String,
    pub project_guid: String,
    pub user_guid: String,
    pub percentage_h: i64,
    pub progress_date: NaiveDate,
    pub notes: Option<String>,
}

/// User-supplied attributes for a new or updated tree node
#[derive(Debug, Clone, Default)]
pub struct NodeFields {
    pub name: String,
    pub volume_h: i64,
    pub unit: Option<String>,
    pub price_h: i64,
    pub weight_h: i64,
}

impl NodeFields {
    /// Field-level validation shared by template and task writes
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "name must not be empty"));
        }
        if self.volume_h < 0 {
            return Err(Error::validation("volume", "volume must not be negative"));
        }
        if self.price_h < 0 {
            return Err(Error::validation("price", "price must not be negative"));
        }
        if self.weight_h < 0 {
            return Err(Error::validation("weight", "weight must not be negative"));
        }
        Ok(())
    }
}

/// Input for [`crate::db::progress::record_progress`]
#[derive(Debug, Clone)]
pub struct NewProgress {
    pub task_guid: String,
    pub project_guid: String,
    pub user_guid: String,
    pub percentage_h: i64,
    pub progress_date: NaiveDate,
    pub notes: Option<String>,
}

/// Latest known entry for one leaf task as of a date
#[derive(Debug, Clone, Serialize)]
pub struct LatestProgress {
    pub percentage_h: i64,
    pub progress_date: NaiveDate,
    pub notes: Option<String>,
}

impl TreeNode for TemplateTask {
    fn guid(&self) -> &str {
        &self.guid
    }
    fn parent_guid(&self) -> Option<&str> {
        self.parent_guid.as_deref()
    }
    fn left_bound(&self) -> i64 {
        self.left_bound
    }
    fn right_bound(&self) -> i64 {
        self.right_bound
    }
}

impl TreeNode for Task {
    fn guid(&self) -> &str {
        &self.guid
    }
    fn parent_guid(&self) -> Option<&str> {
        self.parent_guid.as_deref()
    }
    fn left_bound(&self) -> i64 {
        self.left_bound
    }
    fn right_bound(&self) -> i64 {
        self.right_bound
    }
}
