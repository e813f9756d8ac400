//! Magazine reader: a read-only article browser over a local post
//! collection. Search, category, popularity, pagination, table-of-contents
//! extraction and the reading-time heuristic are all pure derivations over
//! an immutable post snapshot.

use chrono::{DateTime, Utc};
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Words-per-minute divisor for the reading-time estimate.
const WORDS_PER_MINUTE: usize = 200;
/// Fallback shown when a post has no content at all.
const DEFAULT_READ_MINUTES: usize = 5;

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"(?is)<h2[^>]*>(.*?)</h2>").expect("valid literal regex"))
}

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid literal regex"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u32,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub excerpt: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One table-of-contents entry derived from an `<h2>` heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub anchor: String,
    pub title: String,
}

/// Load the post collection from disk, falling back to the embedded seed
/// when the file is missing or unreadable.
pub fn load_posts<P: AsRef<Path>>(path: P) -> Vec<Post> {
    let path = path.as_ref();
    if path.exists() {
        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|data| serde_json::from_str::<Vec<Post>>(&data).map_err(anyhow::Error::from))
        {
            Ok(posts) => {
                info!("loaded {} posts from {}", posts.len(), path.display());
                return posts;
            }
            Err(err) => {
                warn!("failed to load {}: {err}; using embedded posts", path.display());
            }
        }
    }
    seed_posts()
}

/// Embedded showcase collection.
pub fn seed_posts() -> Vec<Post> {
    match serde_json::from_str(include_str!("../assets/posts.json")) {
        Ok(posts) => posts,
        Err(err) => {
            warn!("embedded post collection is invalid: {err}");
            Vec::new()
        }
    }
}

/// All posts, newest first.
pub fn latest(posts: &[Post]) -> Vec<&Post> {
    let mut out: Vec<&Post> = posts.iter().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

/// Popular posts only, newest first.
pub fn popular(posts: &[Post]) -> Vec<&Post> {
    latest(posts).into_iter().filter(|p| p.is_popular).collect()
}

/// Case-insensitive category match, newest first.
pub fn by_category<'a>(posts: &'a [Post], category: &str) -> Vec<&'a Post> {
    latest(posts)
        .into_iter()
        .filter(|p| p.category.eq_ignore_ascii_case(category))
        .collect()
}

/// Case-insensitive substring search over title or excerpt, newest first.
/// A blank query matches nothing.
pub fn search<'a>(posts: &'a [Post], query: &str) -> Vec<&'a Post> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    latest(posts)
        .into_iter()
        .filter(|p| {
            p.title.to_lowercase().contains(&query) || p.excerpt.to_lowercase().contains(&query)
        })
        .collect()
}

pub fn find_by_slug<'a>(posts: &'a [Post], slug: &str) -> Option<&'a Post> {
    posts.iter().find(|p| p.slug == slug)
}

/// Distinct categories in first-seen order over the newest-first list.
pub fn categories(posts: &[Post]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for post in latest(posts) {
        if !out.iter().any(|c| c.eq_ignore_ascii_case(&post.category)) {
            out.push(post.category.clone());
        }
    }
    out
}

/// Zero-based page slice.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    if per_page == 0 {
        return &[];
    }
    let start = page.saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}

/// Anchor id for a heading: lowercased, non-word characters dropped,
/// whitespace runs collapsed to single dashes.
pub fn slugify(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    let mut out = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

pub fn strip_tags(html: &str) -> String {
    tag_re().replace_all(html, "").into_owned()
}

/// Every `<h2>` heading in document order, inner tags stripped.
pub fn derive_toc(html: &str) -> Vec<TocEntry> {
    heading_re()
        .captures_iter(html)
        .map(|cap| {
            let title = strip_tags(&cap[1]).trim().to_string();
            TocEntry {
                anchor: slugify(&title),
                title,
            }
        })
        .collect()
}

/// Estimated minutes to read: word count over a fixed words-per-minute rate,
/// at least one minute. Empty content gets the default.
pub fn reading_time(content: &str) -> usize {
    if content.trim().is_empty() {
        return DEFAULT_READ_MINUTES;
    }
    let text = strip_tags(content);
    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Display string for a post's reading time, honoring an explicit override.
pub fn display_read_time(post: &Post) -> String {
    match &post.read_time {
        Some(rt) => rt.clone(),
        None => format!("{} min read", reading_time(&post.content)),
    }
}
