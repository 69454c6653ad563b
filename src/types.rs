//! Core domain types for the PathForge client.

use serde::{Deserialize, Serialize};

/// Completion state of a single roadmap task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not yet completed
    #[default]
    Pending,
    /// Marked done by the user
    Completed,
}

impl TaskStatus {
    /// The wire representation used by the record store.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Completed => "Completed",
        }
    }

    /// The opposite status, used by the toggle flow.
    pub fn toggled(&self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

/// One unit of work within a week of a roadmap.
///
/// Rows are created entirely by the external automation after a webhook
/// submission; the client only reads them and patches `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque record identifier assigned by the external store
    pub id: String,
    /// Position within the week
    pub task_id: u32,
    /// Week this task belongs to
    pub week: u32,
    /// Theme of the week
    pub theme: String,
    /// What to do
    pub description: String,
    /// Optional comma-separated resource URLs
    pub link: Option<String>,
    /// Completion state, the only client-mutable field
    pub status: TaskStatus,
}

/// Aggregate view of a user's plan.
///
/// Derived entirely from the task rows for a `user_id`; never stored as its
/// own record. Recomputed on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roadmap {
    /// Skill the plan covers
    pub skill: String,
    /// Correlation key back to the generation request
    pub user_id: String,
    /// Tasks ordered by `(week, task_id)` ascending
    pub tasks: Vec<Task>,
    /// Highest week number present
    pub total_weeks: u32,
    /// Number of tasks
    pub total_tasks: u32,
    /// Number of tasks with status Completed
    pub completed_tasks: u32,
}

impl Roadmap {
    /// Look up a task by its record id.
    pub fn task(&self, record_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == record_id)
    }

    /// Current status of a task, if it exists.
    pub fn task_status(&self, record_id: &str) -> Option<TaskStatus> {
        self.task(record_id).map(|t| t.status)
    }

    /// Set a task's status and recompute `completed_tasks`.
    ///
    /// Returns the previous status so a failed write-through can revert.
    pub fn set_task_status(&mut self, record_id: &str, status: TaskStatus) -> Option<TaskStatus> {
        let previous = self
            .tasks
            .iter_mut()
            .find(|t| t.id == record_id)
            .map(|t| std::mem::replace(&mut t.status, status));

        if previous.is_some() {
            self.recompute_completed();
        }
        previous
    }

    /// Recompute `completed_tasks` from the task list.
    pub fn recompute_completed(&mut self) {
        self.completed_tasks = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count() as u32;
    }
}

/// Placeholder username for a profile that was auto-created but never named.
pub const PLACEHOLDER_USERNAME: &str = "New User";

/// Identity record for a user, kept in the external Users table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque record identifier in the Users table
    pub record_id: String,
    /// The client-generated user id
    pub user_id: String,
    /// Display name chosen by the user
    pub username: String,
}

impl UserProfile {
    /// Whether this profile still carries the auto-created placeholder name.
    ///
    /// The UI treats a placeholder profile as equivalent to "no profile yet".
    pub fn is_placeholder(&self) -> bool {
        let name = self.username.trim();
        name.is_empty() || name == PLACEHOLDER_USERNAME
    }
}

/// Why the user wants to learn the skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LearningGoal {
    #[default]
    #[serde(rename = "Get a Job")]
    GetAJob,
    #[serde(rename = "Build a Project")]
    BuildAProject,
    #[serde(rename = "Personal Growth")]
    PersonalGrowth,
    #[serde(rename = "Start a Business")]
    StartABusiness,
    #[serde(rename = "Academic Study")]
    AcademicStudy,
    #[serde(rename = "Skill Upgrade")]
    SkillUpgrade,
}

impl LearningGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningGoal::GetAJob => "Get a Job",
            LearningGoal::BuildAProject => "Build a Project",
            LearningGoal::PersonalGrowth => "Personal Growth",
            LearningGoal::StartABusiness => "Start a Business",
            LearningGoal::AcademicStudy => "Academic Study",
            LearningGoal::SkillUpgrade => "Skill Upgrade",
        }
    }
}

/// The user's starting point with the skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            task_id: 1,
            week: 1,
            theme: "Basics".to_string(),
            description: "Learn the basics".to_string(),
            link: None,
            status,
        }
    }

    fn roadmap(tasks: Vec<Task>) -> Roadmap {
        let mut roadmap = Roadmap {
            skill: "Rust".to_string(),
            user_id: "user_abc".to_string(),
            total_weeks: 1,
            total_tasks: tasks.len() as u32,
            completed_tasks: 0,
            tasks,
        };
        roadmap.recompute_completed();
        roadmap
    }

    #[test]
    fn toggle_increments_completed_by_one() {
        let mut roadmap = roadmap(vec![
            task("rec1", TaskStatus::Pending),
            task("rec2", TaskStatus::Completed),
        ]);
        assert_eq!(roadmap.completed_tasks, 1);

        let previous = roadmap.set_task_status("rec1", TaskStatus::Completed);
        assert_eq!(previous, Some(TaskStatus::Pending));
        assert_eq!(roadmap.completed_tasks, 2);

        let previous = roadmap.set_task_status("rec1", TaskStatus::Pending);
        assert_eq!(previous, Some(TaskStatus::Completed));
        assert_eq!(roadmap.completed_tasks, 1);
    }

    #[test]
    fn completed_count_always_matches_task_list() {
        let mut roadmap = roadmap(vec![
            task("rec1", TaskStatus::Pending),
            task("rec2", TaskStatus::Pending),
            task("rec3", TaskStatus::Completed),
        ]);

        for id in ["rec1", "rec2", "rec3"] {
            let next = roadmap.task_status(id).unwrap().toggled();
            roadmap.set_task_status(id, next);
            let expected = roadmap
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count() as u32;
            assert_eq!(roadmap.completed_tasks, expected);
        }
    }

    #[test]
    fn unknown_record_leaves_roadmap_untouched() {
        let mut roadmap = roadmap(vec![task("rec1", TaskStatus::Pending)]);
        assert_eq!(roadmap.set_task_status("missing", TaskStatus::Completed), None);
        assert_eq!(roadmap.completed_tasks, 0);
    }

    #[test]
    fn placeholder_profile_detection() {
        let profile = UserProfile {
            record_id: "recUser1".to_string(),
            user_id: "user_abc".to_string(),
            username: PLACEHOLDER_USERNAME.to_string(),
        };
        assert!(profile.is_placeholder());

        let named = UserProfile {
            username: "Ada".to_string(),
            ..profile
        };
        assert!(!named.is_placeholder());
    }

    #[test]
    fn goal_and_level_serialize_to_display_strings() {
        assert_eq!(
            serde_json::to_string(&LearningGoal::GetAJob).unwrap(),
            "\"Get a Job\""
        );
        assert_eq!(
            serde_json::to_string(&SkillLevel::Beginner).unwrap(),
            "\"Beginner\""
        );
    }
}
