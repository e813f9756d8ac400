use crate::backdrop::Backdrop;
use crate::board::{Board, Filters};
use crate::reader::{self, Post, TocEntry};
use crate::task::{Priority, Status};
use crate::ui;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{backend::Backend, Terminal};
use std::io;
use std::time::{Duration, Instant};

/// Frame budget; also the input poll timeout, so a quiet terminal still
/// animates at roughly 30 fps.
pub const TICK: Duration = Duration::from_millis(33);

const NOTICE_TTL: Duration = Duration::from_secs(3);
const POSTS_PER_PAGE: usize = 4;
const SESSION_USER: &str = "John Doe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Board,
    Reader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Status,
    Priority,
    Tag,
}

impl FormField {
    fn next(self) -> FormField {
        match self {
            FormField::Title => FormField::Status,
            FormField::Status => FormField::Priority,
            FormField::Priority => FormField::Tag,
            FormField::Tag => FormField::Title,
        }
    }
}

/// In-flight "new task" modal state.
#[derive(Debug, Clone)]
pub struct NewTaskForm {
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    pub tag: String,
    pub field: FormField,
}

impl NewTaskForm {
    pub fn with_status(status: Status) -> Self {
        NewTaskForm {
            title: String::new(),
            status,
            priority: Priority::Medium,
            tag: String::new(),
            field: FormField::Title,
        }
    }
}

/// Active overlay on top of the current view.
#[derive(Debug, Clone)]
pub enum Mode {
    Normal,
    /// Editing the live search query of the current view.
    Search,
    NewTask(NewTaskForm),
    TaskDetail {
        task_id: String,
        comment_input: String,
    },
    PostDetail {
        slug: String,
        scroll: u16,
        toc: Vec<TocEntry>,
    },
    Help,
}

/// Transient user-visible message with a deadline.
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

pub struct App {
    pub board: Board,
    pub posts: Vec<Post>,
    pub backdrop: Backdrop,
    pub filters: Filters,
    pub view: View,
    pub mode: Mode,
    pub selected_status: usize,
    pub selected_task: usize,
    pub reader_query: String,
    pub reader_category: Option<String>,
    pub reader_selected: usize,
    pub reader_page: usize,
    pub notice: Option<Notice>,
    pub viewport: (u16, u16),
    pub should_quit: bool,
}

impl App {
    pub fn new(board: Board, posts: Vec<Post>, backdrop: Backdrop, viewport: (u16, u16)) -> Self {
        App {
            board,
            posts,
            backdrop,
            filters: Filters::default(),
            view: View::Board,
            mode: Mode::Normal,
            selected_status: 0,
            selected_task: 0,
            reader_query: String::new(),
            reader_category: None,
            reader_selected: 0,
            reader_page: 0,
            notice: None,
            viewport,
            should_quit: false,
        }
    }

    /// One animation frame: advance the backdrop, expire stale notices.
    pub fn on_tick(&mut self) {
        self.backdrop.tick();
        if let Some(notice) = &self.notice {
            if Instant::now() >= notice.expires_at {
                self.notice = None;
            }
        }
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            message: message.into(),
            expires_at: Instant::now() + NOTICE_TTL,
        });
    }

    pub fn handle_event(&mut self, ev: Event) {
        match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(cols, rows) => self.viewport = (cols, rows),
            _ => {}
        }
    }

    /// Normalize the pointer to `[-0.5, 0.5]` on both axes; the backdrop
    /// reads this cell on the next frame.
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(
            mouse.kind,
            MouseEventKind::Moved | MouseEventKind::Drag(_)
        ) {
            return;
        }
        let (cols, rows) = self.viewport;
        if cols == 0 || rows == 0 {
            return;
        }
        let nx = mouse.column as f64 / cols as f64 - 0.5;
        let ny = mouse.row as f64 / rows as f64 - 0.5;
        self.backdrop.set_pointer(nx, ny);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Search => self.handle_search_key(key),
            Mode::NewTask(form) => self.handle_new_task_key(key, form),
            Mode::TaskDetail {
                task_id,
                comment_input,
            } => self.handle_detail_key(key, task_id, comment_input),
            Mode::PostDetail { slug, scroll, toc } => {
                self.handle_post_key(key, slug, scroll, toc)
            }
            // any key leaves help
            Mode::Help => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.mode = Mode::Help,
            KeyCode::Tab => {
                self.view = match self.view {
                    View::Board => View::Reader,
                    View::Reader => View::Board,
                };
            }
            KeyCode::Char('/') => self.mode = Mode::Search,
            _ => match self.view {
                View::Board => self.handle_board_key(key),
                View::Reader => self.handle_reader_key(key),
            },
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => {
                if self.selected_status > 0 {
                    self.selected_status -= 1;
                    self.clamp_task_selection();
                }
            }
            KeyCode::Right => {
                if self.selected_status < Status::ALL.len() - 1 {
                    self.selected_status += 1;
                    self.clamp_task_selection();
                }
            }
            KeyCode::Up => {
                self.selected_task = self.selected_task.saturating_sub(1);
            }
            KeyCode::Down => {
                let len = self.column_len(self.selected_status);
                if len > 0 && self.selected_task < len - 1 {
                    self.selected_task += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.selected_task_id() {
                    self.mode = Mode::TaskDetail {
                        task_id: id,
                        comment_input: String::new(),
                    };
                }
            }
            KeyCode::Char('n') => {
                let status = Status::ALL[self.selected_status];
                self.mode = Mode::NewTask(NewTaskForm::with_status(status));
            }
            KeyCode::Char('f') => {
                self.filters.high_priority = !self.filters.high_priority;
                self.clamp_task_selection();
            }
            KeyCode::Char(']') => self.move_selected_task(true),
            KeyCode::Char('[') => self.move_selected_task(false),
            _ => {}
        }
    }

    fn handle_reader_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => {
                self.reader_selected = self.reader_selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let len = self.reader_page_len();
                if len > 0 && self.reader_selected < len - 1 {
                    self.reader_selected += 1;
                }
            }
            KeyCode::Left => {
                self.reader_page = self.reader_page.saturating_sub(1);
                self.reader_selected = 0;
            }
            KeyCode::Right => {
                let total = self.visible_posts().len();
                let pages = total.div_ceil(POSTS_PER_PAGE).max(1);
                if self.reader_page < pages - 1 {
                    self.reader_page += 1;
                    self.reader_selected = 0;
                }
            }
            KeyCode::Char('c') => {
                self.cycle_category();
            }
            KeyCode::Enter => {
                let slug = self
                    .reader_page_posts()
                    .get(self.reader_selected)
                    .map(|p| p.slug.clone());
                if let Some(slug) = slug {
                    let toc = reader::find_by_slug(&self.posts, &slug)
                        .map(|p| reader::derive_toc(&p.content))
                        .unwrap_or_default();
                    self.mode = Mode::PostDetail {
                        slug,
                        scroll: 0,
                        toc,
                    };
                }
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let query = match self.view {
            View::Board => &mut self.filters.query,
            View::Reader => &mut self.reader_query,
        };
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                query.pop();
                self.mode = Mode::Search;
            }
            KeyCode::Char(c) => {
                query.push(c);
                self.mode = Mode::Search;
            }
            _ => self.mode = Mode::Search,
        }
        if matches!(self.view, View::Reader) {
            self.reader_page = 0;
            self.reader_selected = 0;
        } else {
            self.clamp_task_selection();
        }
    }

    fn handle_new_task_key(&mut self, key: KeyEvent, mut form: NewTaskForm) {
        match key.code {
            KeyCode::Esc => return, // drop the form, back to normal
            KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
            KeyCode::Enter => {
                match self
                    .board
                    .create_task(&form.title, form.status, form.priority, &form.tag)
                {
                    Ok(_) => {
                        self.notify("Task created successfully!");
                        self.clamp_task_selection();
                        return;
                    }
                    Err(err) => {
                        self.notify(err.to_string());
                    }
                }
            }
            KeyCode::Left | KeyCode::Right => {
                let forward = key.code == KeyCode::Right;
                match form.field {
                    FormField::Status => {
                        form.status = if forward {
                            form.status.next()
                        } else {
                            form.status.prev()
                        };
                    }
                    FormField::Priority => {
                        form.priority = cycle_priority(form.priority, forward);
                    }
                    _ => {}
                }
            }
            KeyCode::Backspace => match form.field {
                FormField::Title => {
                    form.title.pop();
                }
                FormField::Tag => {
                    form.tag.pop();
                }
                _ => {}
            },
            KeyCode::Char(c) => match form.field {
                FormField::Title => form.title.push(c),
                FormField::Tag => form.tag.push(c),
                _ => {}
            },
            _ => {}
        }
        self.mode = Mode::NewTask(form);
    }

    fn handle_detail_key(&mut self, key: KeyEvent, task_id: String, mut comment_input: String) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Enter => {
                match self.board.add_comment(&task_id, SESSION_USER, &comment_input) {
                    Ok(_) => comment_input.clear(),
                    Err(err) => self.notify(err.to_string()),
                }
            }
            KeyCode::Backspace => {
                comment_input.pop();
            }
            KeyCode::Char(c) => comment_input.push(c),
            _ => {}
        }
        self.mode = Mode::TaskDetail {
            task_id,
            comment_input,
        };
    }

    fn handle_post_key(&mut self, key: KeyEvent, slug: String, scroll: u16, toc: Vec<TocEntry>) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Up => {
                self.mode = Mode::PostDetail {
                    slug,
                    scroll: scroll.saturating_sub(1),
                    toc,
                };
            }
            KeyCode::Down => {
                self.mode = Mode::PostDetail {
                    slug,
                    scroll: scroll.saturating_add(1),
                    toc,
                };
            }
            _ => {
                self.mode = Mode::PostDetail { slug, scroll, toc };
            }
        }
    }

    fn move_selected_task(&mut self, forward: bool) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let Some(task) = self.board.find(&id) else {
            return;
        };
        let next = if forward {
            task.status.next()
        } else {
            task.status.prev()
        };
        if let Err(err) = self.board.set_task_status(&id, next) {
            self.notify(err.to_string());
        }
        self.clamp_task_selection();
    }

    fn cycle_category(&mut self) {
        let cats = reader::categories(&self.posts);
        self.reader_category = match &self.reader_category {
            None => cats.first().cloned(),
            Some(current) => {
                let pos = cats.iter().position(|c| c == current);
                match pos {
                    Some(i) if i + 1 < cats.len() => Some(cats[i + 1].clone()),
                    _ => None,
                }
            }
        };
        self.reader_page = 0;
        self.reader_selected = 0;
    }

    pub fn column_len(&mut self, status_idx: usize) -> usize {
        let filters = self.filters.clone();
        self.board
            .columns(&filters)
            .get(status_idx)
            .map(|c| c.tasks.len())
            .unwrap_or(0)
    }

    pub fn selected_task_id(&mut self) -> Option<String> {
        let filters = self.filters.clone();
        self.board
            .columns(&filters)
            .get(self.selected_status)
            .and_then(|c| c.tasks.get(self.selected_task))
            .map(|t| t.id.clone())
    }

    fn clamp_task_selection(&mut self) {
        let len = self.column_len(self.selected_status);
        if len == 0 {
            self.selected_task = 0;
        } else if self.selected_task >= len {
            self.selected_task = len - 1;
        }
    }

    /// Posts visible under the current query/category, newest first.
    /// A live query takes precedence over the category filter.
    pub fn visible_posts(&self) -> Vec<&Post> {
        if !self.reader_query.trim().is_empty() {
            reader::search(&self.posts, &self.reader_query)
        } else if let Some(cat) = &self.reader_category {
            reader::by_category(&self.posts, cat)
        } else {
            reader::latest(&self.posts)
        }
    }

    pub fn reader_page_posts(&self) -> Vec<&Post> {
        let visible = self.visible_posts();
        reader::paginate(&visible, self.reader_page, POSTS_PER_PAGE).to_vec()
    }

    pub fn reader_page_len(&self) -> usize {
        self.reader_page_posts().len()
    }

    pub fn reader_page_count(&self) -> usize {
        self.visible_posts().len().div_ceil(POSTS_PER_PAGE).max(1)
    }
}

fn cycle_priority(priority: Priority, forward: bool) -> Priority {
    let pos = Priority::ALL
        .iter()
        .position(|&p| p == priority)
        .unwrap_or(1);
    let len = Priority::ALL.len();
    let next = if forward {
        (pos + 1) % len
    } else {
        (pos + len - 1) % len
    };
    Priority::ALL[next]
}

/// Main loop: draw, poll input with the remaining frame budget, tick.
/// Strictly sequential; every frame reads the latest pointer sample.
pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        let timeout = TICK.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            let ev = event::read()?;
            app.handle_event(ev);
        }
        if last_tick.elapsed() >= TICK {
            app.on_tick();
            last_tick = Instant::now();
        }
        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crossterm::event::{KeyModifiers, MouseButton};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn app() -> App {
        let mut rng = StdRng::seed_from_u64(1);
        App::new(
            Board::seed(),
            reader::seed_posts(),
            Backdrop::new(&mut rng),
            (120, 40),
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn tab_toggles_views() {
        let mut app = app();
        assert_eq!(app.view, View::Board);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.view, View::Reader);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.view, View::Board);
    }

    #[test]
    fn q_requests_quit() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn new_task_flow_creates_in_selected_column() {
        let mut app = app();
        press(&mut app, KeyCode::Right); // in-progress column
        press(&mut app, KeyCode::Char('n'));
        assert!(matches!(app.mode, Mode::NewTask(_)));
        type_str(&mut app, "Ship the beta");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        let task = app
            .board
            .tasks()
            .iter()
            .find(|t| t.title == "Ship the beta")
            .expect("task created");
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(
            app.notice.as_ref().map(|n| n.message.as_str()),
            Some("Task created successfully!")
        );
    }

    #[test]
    fn empty_title_keeps_modal_open_and_store_unchanged() {
        let mut app = app();
        let before = app.board.tasks().len();
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::NewTask(_)));
        assert_eq!(app.board.tasks().len(), before);
        assert!(app.notice.is_some());
    }

    #[test]
    fn bracket_keys_move_selected_task_between_columns() {
        let mut app = app();
        let id = app.selected_task_id().expect("seed task selected");
        press(&mut app, KeyCode::Char(']'));
        assert_eq!(
            app.board.find(&id).expect("task").status,
            Status::InProgress
        );
        // follow the task into its new column; it sits first in store order
        press(&mut app, KeyCode::Right);
        assert_eq!(app.selected_task_id().as_deref(), Some(id.as_str()));
        press(&mut app, KeyCode::Char(']'));
        assert_eq!(app.board.find(&id).expect("task").status, Status::Done);
        // moving back out of done works the same way
        press(&mut app, KeyCode::Right);
        assert_eq!(app.selected_task_id().as_deref(), Some(id.as_str()));
        press(&mut app, KeyCode::Char('['));
        assert_eq!(
            app.board.find(&id).expect("task").status,
            Status::InProgress
        );
    }

    #[test]
    fn search_mode_edits_board_query_live() {
        let mut app = app();
        press(&mut app, KeyCode::Char('/'));
        type_str(&mut app, "Wireframes");
        assert_eq!(app.filters.query, "Wireframes");
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
        // query survives leaving search mode
        assert_eq!(app.filters.query, "Wireframes");
        assert_eq!(app.column_len(0), 1);
    }

    #[test]
    fn high_priority_filter_toggle_narrows_columns() {
        let mut app = app();
        let before = app.column_len(0);
        press(&mut app, KeyCode::Char('f'));
        assert!(app.filters.high_priority);
        assert!(app.column_len(0) < before);
    }

    #[test]
    fn comment_flow_appends_through_detail_mode() {
        let mut app = app();
        press(&mut app, KeyCode::Enter); // open detail of first todo task
        let task_id = match &app.mode {
            Mode::TaskDetail { task_id, .. } => task_id.clone(),
            other => panic!("expected detail mode, got {other:?}"),
        };
        let before = app.board.find(&task_id).expect("task").comments.len();
        type_str(&mut app, "nice work");
        press(&mut app, KeyCode::Enter);
        let task = app.board.find(&task_id).expect("task");
        assert_eq!(task.comments.len(), before + 1);
        assert_eq!(task.comments.last().map(|c| c.text.as_str()), Some("nice work"));

        // blank comment is rejected with a notice, thread unchanged
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.board.find(&task_id).expect("task").comments.len(),
            before + 1
        );
        assert!(app.notice.is_some());
    }

    #[test]
    fn reader_category_cycles_through_all_and_back_to_none() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.view, View::Reader);
        let cats = reader::categories(&app.posts);
        assert!(app.reader_category.is_none());
        for cat in &cats {
            press(&mut app, KeyCode::Char('c'));
            assert_eq!(app.reader_category.as_ref(), Some(cat));
        }
        press(&mut app, KeyCode::Char('c'));
        assert!(app.reader_category.is_none());
    }

    #[test]
    fn reader_search_takes_precedence_over_category() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('/'));
        type_str(&mut app, "the");
        let visible = app.visible_posts();
        assert!(visible
            .iter()
            .all(|p| p.title.to_lowercase().contains("the")
                || p.excerpt.to_lowercase().contains("the")));
    }

    #[test]
    fn opening_a_post_derives_its_toc() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);
        match &app.mode {
            Mode::PostDetail { slug, toc, .. } => {
                let post = reader::find_by_slug(&app.posts, slug).expect("post");
                assert_eq!(*toc, reader::derive_toc(&post.content));
                assert!(!toc.is_empty());
            }
            other => panic!("expected post detail, got {other:?}"),
        }
        press(&mut app, KeyCode::Down);
        match &app.mode {
            Mode::PostDetail { scroll, .. } => assert_eq!(*scroll, 1),
            other => panic!("expected post detail, got {other:?}"),
        }
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn mouse_move_updates_the_pointer_cell() {
        let mut app = app();
        app.handle_event(Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column: 90,
            row: 10,
            modifiers: KeyModifiers::NONE,
        }));
        let p = app.backdrop.pointer();
        assert!((p.nx - (90.0 / 120.0 - 0.5)).abs() < 1e-9);
        assert!((p.ny - (10.0 / 40.0 - 0.5)).abs() < 1e-9);

        // clicks don't move the pointer
        app.handle_event(Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        }));
        let p2 = app.backdrop.pointer();
        assert!((p2.nx - p.nx).abs() < 1e-9);
    }

    #[test]
    fn notice_expires_on_tick() {
        let mut app = app();
        app.notify("hello");
        app.notice = app.notice.take().map(|mut n| {
            n.expires_at = Instant::now() - Duration::from_millis(1);
            n
        });
        app.on_tick();
        assert!(app.notice.is_none());
    }

    #[test]
    fn help_opens_and_any_key_closes() {
        let mut app = app();
        press(&mut app, KeyCode::Char('?'));
        assert!(matches!(app.mode, Mode::Help));
        press(&mut app, KeyCode::Char('x'));
        assert!(matches!(app.mode, Mode::Normal));
    }
}
