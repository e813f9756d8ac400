use chrono::{DateTime, NaiveDate, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Board column a task currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    InProgress,
    Done,
}

impl Status {
    /// Fixed column order for the board view.
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn title(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }

    /// Next status in column order, clamped at the last column.
    pub fn next(self) -> Status {
        match self {
            Status::Todo => Status::InProgress,
            Status::InProgress | Status::Done => Status::Done,
        }
    }

    /// Previous status in column order, clamped at the first column.
    pub fn prev(self) -> Status {
        match self {
            Status::Todo | Status::InProgress => Status::Todo,
            Status::Done => Status::InProgress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Marker shown on the task card; low priority carries no marker.
    pub fn marker(self) -> &'static str {
        match self {
            Priority::High => "!",
            Priority::Medium => "^",
            Priority::Low => "",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Priority::High => Color::Red,
            Priority::Medium => Color::Rgb(249, 115, 22),
            Priority::Low => Color::DarkGray,
        }
    }
}

/// Display color attached to a tag label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagColor {
    Purple,
    Yellow,
    Blue,
    Green,
    Pink,
    Indigo,
    Cyan,
    Gray,
}

impl TagColor {
    /// Well-known labels map to fixed colors, everything else is gray.
    pub fn for_label(label: &str) -> TagColor {
        match label {
            "Design" => TagColor::Purple,
            "Research" => TagColor::Yellow,
            "Backend" => TagColor::Blue,
            "DevOps" => TagColor::Green,
            "Planning" => TagColor::Pink,
            "Dev" => TagColor::Indigo,
            "Frontend" => TagColor::Cyan,
            _ => TagColor::Gray,
        }
    }

    pub fn color(self) -> Color {
        match self {
            TagColor::Purple => Color::Rgb(168, 85, 247),
            TagColor::Yellow => Color::Rgb(234, 179, 8),
            TagColor::Blue => Color::Rgb(59, 130, 246),
            TagColor::Green => Color::Rgb(34, 197, 94),
            TagColor::Pink => Color::Rgb(236, 72, 153),
            TagColor::Indigo => Color::Rgb(99, 102, 241),
            TagColor::Cyan => Color::Rgb(6, 182, 212),
            TagColor::Gray => Color::Rgb(107, 114, 128),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    pub color: TagColor,
}

impl Tag {
    pub fn new(label: &str) -> Tag {
        let label = if label.trim().is_empty() {
            "General"
        } else {
            label.trim()
        };
        Tag {
            label: label.to_string(),
            color: TagColor::for_label(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub tag: Tag,
    pub assignee: String,
    pub priority: Priority,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Task {
    /// Comments in timestamp order for the detail view. Insertion order is
    /// preserved in storage; only the display is sorted.
    pub fn comments_by_time(&self) -> Vec<&Comment> {
        let mut sorted: Vec<&Comment> = self.comments.iter().collect();
        sorted.sort_by_key(|c| c.created_at);
        sorted
    }
}

/// "just now" / "5 minutes ago" style timestamp for comment threads.
pub fn relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(ts);
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{} minute{} ago", minutes, if minutes == 1 { "" } else { "s" })
    } else if hours < 24 {
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if days < 7 {
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%b %e, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_order_is_fixed() {
        assert_eq!(Status::ALL, [Status::Todo, Status::InProgress, Status::Done]);
        assert_eq!(Status::Todo.next(), Status::InProgress);
        assert_eq!(Status::Done.next(), Status::Done);
        assert_eq!(Status::Todo.prev(), Status::Todo);
        assert_eq!(Status::Done.prev(), Status::InProgress);
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).expect("serialize"),
            "\"in-progress\""
        );
        let back: Status = serde_json::from_str("\"in-progress\"").expect("deserialize");
        assert_eq!(back, Status::InProgress);
    }

    #[test]
    fn unknown_tag_label_falls_back_to_gray() {
        assert_eq!(Tag::new("Design").color, TagColor::Purple);
        assert_eq!(Tag::new("Mystery").color, TagColor::Gray);
    }

    #[test]
    fn blank_tag_label_becomes_general() {
        let tag = Tag::new("   ");
        assert_eq!(tag.label, "General");
        assert_eq!(tag.color, TagColor::Gray);
    }

    #[test]
    fn comments_display_sorted_by_timestamp() {
        let now = Utc::now();
        let task = Task {
            id: "1".into(),
            title: "t".into(),
            tag: Tag::new("Dev"),
            assignee: "a".into(),
            priority: Priority::Low,
            status: Status::Todo,
            description: None,
            due_date: None,
            comments: vec![
                Comment {
                    id: "c2".into(),
                    author: "b".into(),
                    text: "second".into(),
                    created_at: now,
                },
                Comment {
                    id: "c1".into(),
                    author: "a".into(),
                    text: "first".into(),
                    created_at: now - Duration::hours(1),
                },
            ],
        };
        let sorted = task.comments_by_time();
        assert_eq!(sorted[0].text, "first");
        assert_eq!(sorted[1].text, "second");
        // insertion order in storage is untouched
        assert_eq!(task.comments[0].text, "second");
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(relative_time(now, now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(relative_time(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(relative_time(now - Duration::days(3), now), "3 days ago");
        let old = now - Duration::days(30);
        assert_eq!(relative_time(old, now), old.format("%b %e, %Y").to_string());
    }
}
