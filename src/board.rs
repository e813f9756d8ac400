use crate::task::{Comment, Priority, Status, Tag, Task};
use chrono::{Duration, NaiveDate, Utc};
use log::{info, warn};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BoardError {
    #[error("please enter a task title")]
    EmptyTitle,
    #[error("comment text cannot be empty")]
    EmptyComment,
    #[error("no task with id {0}")]
    UnknownTask(String),
}

/// Active board filters. Search narrows first, then the priority predicate;
/// both apply within each status bucket.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filters {
    pub query: String,
    pub high_priority: bool,
}

/// Derived view of one status bucket. Never stored; rebuilt whenever the
/// store revision or the filters change.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView {
    pub status: Status,
    pub title: &'static str,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone)]
struct Memo {
    revision: u64,
    filters: Filters,
    columns: Vec<ColumnView>,
}

/// Authoritative in-memory task list for the session.
#[derive(Debug, Default)]
pub struct Board {
    tasks: Vec<Task>,
    revision: u64,
    memo: Option<Memo>,
}

/// Pure derivation: bucket by status in fixed order, then filter each bucket
/// by case-insensitive title search and the optional high-priority predicate.
pub fn derive_columns(tasks: &[Task], filters: &Filters) -> Vec<ColumnView> {
    let query = filters.query.trim().to_lowercase();
    Status::ALL
        .iter()
        .map(|&status| {
            let tasks = tasks
                .iter()
                .filter(|t| t.status == status)
                .filter(|t| query.is_empty() || t.title.to_lowercase().contains(&query))
                .filter(|t| !filters.high_priority || t.priority == Priority::High)
                .cloned()
                .collect();
            ColumnView {
                status,
                title: status.title(),
                tasks,
            }
        })
        .collect()
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Showcase task set the session starts with.
    pub fn seed() -> Self {
        let now = Utc::now();
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        let task = |id: &str,
                    title: &str,
                    tag: &str,
                    assignee: &str,
                    priority: Priority,
                    status: Status,
                    due: &str| Task {
            id: id.to_string(),
            title: title.to_string(),
            tag: Tag::new(tag),
            assignee: assignee.to_string(),
            priority,
            status,
            description: Some("Scoped during the sprint kickoff; see the project brief for full context.".to_string()),
            due_date: date(due),
            comments: Vec::new(),
        };

        let mut first = task(
            "1",
            "Design user onboarding flow",
            "Design",
            "Sarah Chen",
            Priority::High,
            Status::Todo,
            "2024-01-15",
        );
        first.comments = vec![
            Comment {
                id: "c1".to_string(),
                author: "John Doe".to_string(),
                text: "Great progress on this! Let me know if you need any clarification."
                    .to_string(),
                created_at: now - Duration::hours(2),
            },
            Comment {
                id: "c2".to_string(),
                author: "Sarah Chen".to_string(),
                text: "Thanks! I'll update the design based on your feedback.".to_string(),
                created_at: now - Duration::hours(1),
            },
        ];

        let tasks = vec![
            first,
            task(
                "2",
                "Research competitor features",
                "Research",
                "Mike Ross",
                Priority::Medium,
                Status::Todo,
                "2024-01-20",
            ),
            task(
                "3",
                "Create wireframes for dashboard",
                "Design",
                "Sarah Chen",
                Priority::Medium,
                Status::Todo,
                "2024-01-18",
            ),
            task(
                "4",
                "Implement authentication system",
                "Backend",
                "Alex Kim",
                Priority::High,
                Status::InProgress,
                "2024-01-22",
            ),
            task(
                "5",
                "Design component library",
                "Design",
                "Sarah Chen",
                Priority::Medium,
                Status::InProgress,
                "2024-01-25",
            ),
            task(
                "6",
                "Set up project repository",
                "DevOps",
                "Alex Kim",
                Priority::Medium,
                Status::Done,
                "2024-01-10",
            ),
            task(
                "7",
                "Define project requirements",
                "Planning",
                "Mike Ross",
                Priority::High,
                Status::Done,
                "2024-01-05",
            ),
        ];

        Board {
            tasks,
            revision: 0,
            memo: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Creates a task with a fresh timestamp-derived id. An empty or
    /// whitespace-only title leaves the store unchanged.
    pub fn create_task(
        &mut self,
        title: &str,
        status: Status,
        priority: Priority,
        tag: &str,
    ) -> Result<String, BoardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        let id = self.fresh_id();
        self.tasks.push(Task {
            id: id.clone(),
            title: title.to_string(),
            tag: Tag::new(tag),
            assignee: "John Doe".to_string(),
            priority,
            status,
            description: None,
            due_date: None,
            comments: Vec::new(),
        });
        self.revision += 1;
        info!("task created id={id} status={status:?}");
        Ok(id)
    }

    /// Moves a task to another column. Any status may transition to any
    /// other; nothing else on the task changes.
    pub fn set_task_status(&mut self, id: &str, status: Status) -> Result<(), BoardError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BoardError::UnknownTask(id.to_string()))?;
        if task.status != status {
            task.status = status;
            self.revision += 1;
        }
        Ok(())
    }

    /// Appends a comment with the current timestamp and returns it for
    /// detail-view sync. Whitespace-only text leaves the thread unchanged.
    pub fn add_comment(
        &mut self,
        task_id: &str,
        author: &str,
        text: &str,
    ) -> Result<Comment, BoardError> {
        if text.trim().is_empty() {
            return Err(BoardError::EmptyComment);
        }
        let id = self.fresh_id();
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))?;
        let comment = Comment {
            id,
            author: author.to_string(),
            text: text.trim().to_string(),
            created_at: Utc::now(),
        };
        task.comments.push(comment.clone());
        self.revision += 1;
        Ok(comment)
    }

    /// Derived column views, memoized by store revision plus filter equality.
    pub fn columns(&mut self, filters: &Filters) -> &[ColumnView] {
        let stale = match &self.memo {
            Some(m) => m.revision != self.revision || &m.filters != filters,
            None => true,
        };
        if stale {
            let columns = derive_columns(&self.tasks, filters);
            self.memo = Some(Memo {
                revision: self.revision,
                filters: filters.clone(),
                columns,
            });
        }
        match &self.memo {
            Some(m) => &m.columns,
            None => &[],
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(&self.tasks)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Loads a snapshot, falling back to the seed set when the file is
    /// missing or unreadable.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Board::seed();
        }
        match fs::read_to_string(path).map_err(anyhow::Error::from).and_then(|data| {
            serde_json::from_str::<Vec<Task>>(&data).map_err(anyhow::Error::from)
        }) {
            Ok(tasks) => {
                info!("loaded {} tasks from {}", tasks.len(), path.display());
                Board {
                    tasks,
                    revision: 0,
                    memo: None,
                }
            }
            Err(err) => {
                warn!("failed to load {}: {err}; starting from seed", path.display());
                Board::seed()
            }
        }
    }

    // Ids mirror the millisecond clock; bump on collision so two mutations
    // within the same millisecond stay distinct.
    fn fresh_id(&self) -> String {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let candidate = stamp.to_string();
            let taken = self.tasks.iter().any(|t| {
                t.id == candidate || t.comments.iter().any(|c| c.id == candidate)
            });
            if !taken {
                return candidate;
            }
            stamp += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_is_rejected_and_store_unchanged() {
        let mut board = Board::seed();
        let before = board.tasks().len();
        assert_eq!(
            board.create_task("   ", Status::Todo, Priority::Medium, "Dev"),
            Err(BoardError::EmptyTitle)
        );
        assert_eq!(board.tasks().len(), before);
    }

    #[test]
    fn create_task_appends_with_requested_status() {
        let mut board = Board::seed();
        let before = board.tasks().len();
        let id = board
            .create_task("Write spec", Status::InProgress, Priority::High, "Planning")
            .expect("valid title");
        assert_eq!(board.tasks().len(), before + 1);
        let task = board.find(&id).expect("new task present");
        assert_eq!(task.title, "Write spec");
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.priority, Priority::High);
        assert!(task.comments.is_empty());
    }

    #[test]
    fn created_ids_are_unique_even_within_one_millisecond() {
        let mut board = Board::new();
        let a = board
            .create_task("a", Status::Todo, Priority::Low, "")
            .expect("create a");
        let b = board
            .create_task("b", Status::Todo, Priority::Low, "")
            .expect("create b");
        assert_ne!(a, b);
    }

    #[test]
    fn status_move_changes_column_membership_only() {
        let mut board = Board::seed();
        let snapshot = board.find("1").expect("seed task").clone();
        board
            .set_task_status("1", Status::Done)
            .expect("known task");

        let filters = Filters::default();
        let columns = board.columns(&filters);
        let todo = &columns[0];
        let done = &columns[2];
        assert!(todo.tasks.iter().all(|t| t.id != "1"));
        let moved = done
            .tasks
            .iter()
            .find(|t| t.id == "1")
            .expect("task now in done");
        assert_eq!(moved.title, snapshot.title);
        assert_eq!(moved.priority, snapshot.priority);
        assert_eq!(moved.comments, snapshot.comments);
    }

    #[test]
    fn unknown_task_id_is_reported() {
        let mut board = Board::seed();
        assert_eq!(
            board.set_task_status("nope", Status::Done),
            Err(BoardError::UnknownTask("nope".to_string()))
        );
    }

    #[test]
    fn blank_comment_is_rejected() {
        let mut board = Board::seed();
        let before = board.find("1").expect("seed task").comments.len();
        assert_eq!(
            board.add_comment("1", "John Doe", "  \t"),
            Err(BoardError::EmptyComment)
        );
        assert_eq!(board.find("1").expect("seed task").comments.len(), before);
    }

    #[test]
    fn comment_appends_with_monotonic_timestamp() {
        let mut board = Board::seed();
        let previous_latest = board
            .find("1")
            .expect("seed task")
            .comments
            .iter()
            .map(|c| c.created_at)
            .max()
            .expect("seeded comments");
        let added = board
            .add_comment("1", "John Doe", "nice work")
            .expect("valid comment");
        assert_eq!(added.text, "nice work");
        assert!(added.created_at >= previous_latest);
        let task = board.find("1").expect("seed task");
        assert_eq!(task.comments.last().map(|c| c.id.clone()), Some(added.id));
    }

    #[test]
    fn high_priority_filter_returns_only_high_and_no_inventions() {
        let board = Board::seed();
        let filters = Filters {
            query: String::new(),
            high_priority: true,
        };
        let columns = derive_columns(board.tasks(), &filters);
        let mut seen = 0;
        for column in &columns {
            for task in &column.tasks {
                assert_eq!(task.priority, Priority::High);
                assert!(board.tasks().iter().any(|t| t == task));
                seen += 1;
            }
        }
        let high_total = board
            .tasks()
            .iter()
            .filter(|t| t.priority == Priority::High)
            .count();
        assert_eq!(seen, high_total);
    }

    #[test]
    fn search_is_case_insensitive_substring_on_title() {
        let board = Board::seed();
        let filters = Filters {
            query: "WIREFRAME".to_string(),
            high_priority: false,
        };
        let columns = derive_columns(board.tasks(), &filters);
        let total: usize = columns.iter().map(|c| c.tasks.len()).sum();
        assert_eq!(total, 1);
        assert_eq!(columns[0].tasks[0].id, "3");
    }

    #[test]
    fn search_narrows_before_priority_predicate() {
        let board = Board::seed();
        let filters = Filters {
            query: "design".to_string(),
            high_priority: true,
        };
        let columns = derive_columns(board.tasks(), &filters);
        let all: Vec<&Task> = columns.iter().flat_map(|c| c.tasks.iter()).collect();
        assert!(all
            .iter()
            .all(|t| t.priority == Priority::High && t.title.to_lowercase().contains("design")));
    }

    #[test]
    fn columns_are_memoized_until_revision_or_filters_change() {
        let mut board = Board::seed();
        let filters = Filters::default();
        let first = board.columns(&filters).to_vec();
        assert_eq!(board.columns(&filters), &first[..]);

        board
            .create_task("New thing", Status::Todo, Priority::Low, "")
            .expect("create");
        let after = board.columns(&filters);
        assert_eq!(after[0].tasks.len(), first[0].tasks.len() + 1);
    }

    #[test]
    fn snapshot_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.json");
        let mut board = Board::seed();
        board
            .create_task("Persist me", Status::Done, Priority::Low, "Dev")
            .expect("create");
        board.save_to_file(&path).expect("save");

        let loaded = Board::load_from_file(&path);
        assert_eq!(loaded.tasks(), board.tasks());
    }

    #[test]
    fn missing_or_corrupt_snapshot_falls_back_to_seed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = Board::load_from_file(dir.path().join("absent.json"));
        assert_eq!(missing.tasks().len(), Board::seed().tasks().len());

        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, "{ not json").expect("write");
        let corrupt = Board::load_from_file(&path);
        assert_eq!(corrupt.tasks().len(), Board::seed().tasks().len());
    }
}
