use crate::app::{App, FormField, Mode, NewTaskForm, View};
use crate::backdrop::{self, Backdrop};
use crate::reader::{self, Post, TocEntry};
use crate::task::{relative_time, Task};
use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap,
    },
    Frame,
};

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    draw_backdrop(f, &app.backdrop, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, app, chunks[0]);
    match app.view {
        View::Board => draw_board(f, app, chunks[1]),
        View::Reader => draw_reader(f, app, chunks[1]),
    }
    draw_footer(f, app, chunks[2]);

    // overlays render from a mode snapshot so they can borrow app freely
    match app.mode.clone() {
        Mode::NewTask(form) => draw_new_task_modal(f, &form, area),
        Mode::TaskDetail {
            task_id,
            comment_input,
        } => draw_task_detail(f, app, &task_id, &comment_input, area),
        Mode::PostDetail { slug, scroll, toc } => {
            draw_post_detail(f, app, &slug, scroll, &toc, area)
        }
        Mode::Help => draw_help(f, area),
        Mode::Normal | Mode::Search => {}
    }

    if let Some(notice) = &app.notice {
        draw_notice(f, &notice.message, area);
    }
}

fn rgb(color: (u8, u8, u8), opacity: f64) -> Color {
    let (r, g, b) = color;
    let o = opacity.clamp(0.0, 1.0);
    Color::Rgb(
        (r as f64 * o) as u8,
        (g as f64 * o) as u8,
        (b as f64 * o) as u8,
    )
}

/// Paint the animated layer onto the whole frame. Widgets drawn afterwards
/// only overwrite the cells they use, so the backdrop shows through.
fn draw_backdrop(f: &mut Frame, backdrop: &Backdrop, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let t = backdrop.time();
    let canvas = Canvas::default()
        .x_bounds([0.0, backdrop::WIDTH])
        .y_bounds([0.0, backdrop::HEIGHT])
        .paint(|ctx| {
            // canvas y grows upward; the generator's grows downward
            let flip = |y: f64| backdrop::HEIGHT - y;

            for star in backdrop.stars() {
                let opacity = backdrop::flicker(t, star.phase);
                let mut coords = vec![(star.x, flip(star.y))];
                if star.radius >= 2.5 {
                    coords.push((star.x + 4.0, flip(star.y)));
                    coords.push((star.x, flip(star.y + 4.0)));
                }
                ctx.draw(&Points {
                    coords: &coords,
                    color: rgb(star.color, opacity),
                });
            }

            for idx in 0..backdrop::LINES {
                let (bend_x, bend_y) = backdrop.line_bend(idx);
                let path = backdrop::wave_path(t, idx, bend_x, bend_y);
                let opacity = if backdrop.is_hovered(idx) {
                    1.0
                } else {
                    backdrop::line_opacity(idx)
                };
                let color = rgb(backdrop::LINE_COLORS[idx % backdrop::LINE_COLORS.len()], opacity);
                for pair in path.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: pair[0].0,
                        y1: flip(pair[0].1),
                        x2: pair[1].0,
                        y2: flip(pair[1].1),
                        color,
                    });
                }
            }

            for (idx, dot) in backdrop.dots().iter().enumerate() {
                let (x, y) = dot.position(t, idx);
                ctx.draw(&Points {
                    coords: &[(x, flip(y))],
                    color: rgb(backdrop::DOT_COLOR, 0.95),
                });
            }
        });
    f.render_widget(canvas, area);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let active = Style::default()
        .fg(Color::Rgb(0, 201, 81))
        .add_modifier(Modifier::BOLD);
    let inactive = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled("flowboard", active),
        Span::raw("  "),
        Span::styled(
            "Board",
            if app.view == View::Board { active } else { inactive },
        ),
        Span::raw(" / "),
        Span::styled(
            "Reader",
            if app.view == View::Reader { active } else { inactive },
        ),
    ];
    if app.view == View::Board {
        if !app.filters.query.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("search: {}", app.filters.query),
                Style::default().fg(Color::Cyan),
            ));
        }
        if app.filters.high_priority {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                "high priority only",
                Style::default().fg(Color::Red),
            ));
        }
    } else {
        if !app.reader_query.is_empty() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("search: {}", app.reader_query),
                Style::default().fg(Color::Cyan),
            ));
        }
        if let Some(cat) = &app.reader_category {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("category: {cat}"),
                Style::default().fg(Color::Yellow),
            ));
        }
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = match (&app.mode, app.view) {
        (Mode::Search, _) => "type to filter · backspace delete · enter/esc done".to_string(),
        (Mode::NewTask(_), _) => {
            "tab next field · ←→ change value · enter create · esc cancel".to_string()
        }
        (Mode::TaskDetail { .. }, _) => "type a comment · enter post · esc close".to_string(),
        (Mode::PostDetail { .. }, _) => "↑↓ scroll · esc back".to_string(),
        (Mode::Help, _) => "any key to close".to_string(),
        (Mode::Normal, View::Board) => {
            "q quit · tab reader · ←→↑↓ move · enter details · n new · / search · f priority · [ ] move task · ? help"
                .to_string()
        }
        (Mode::Normal, View::Reader) => {
            format!(
                "q quit · tab board · ↑↓ select · ←→ page {}/{} · enter read · c category · / search · ? help",
                app.reader_page + 1,
                app.reader_page_count()
            )
        }
    };
    f.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray))),
        area,
    );
}

fn draw_board(f: &mut Frame, app: &mut App, area: Rect) {
    let filters = app.filters.clone();
    let columns = app.board.columns(&filters).to_vec();

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    for (i, column) in columns.iter().enumerate() {
        let items: Vec<ListItem> = column
            .tasks
            .iter()
            .map(|t| ListItem::new(task_card(t)))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" {} ({}) ", column.title, column.tasks.len()))
                    .borders(Borders::ALL)
                    .border_style(if app.selected_status == i {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    }),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::Rgb(24, 34, 28)))
            .highlight_symbol("▸ ");

        if app.selected_status == i {
            let mut state = ListState::default();
            if !column.tasks.is_empty() {
                state.select(Some(app.selected_task.min(column.tasks.len() - 1)));
            }
            f.render_stateful_widget(list, chunks[i], &mut state);
        } else {
            f.render_widget(list, chunks[i]);
        }
    }
}

fn task_card(task: &Task) -> Vec<Line<'static>> {
    let mut top = vec![Span::styled(
        format!(" {} ", task.tag.label),
        Style::default()
            .fg(Color::Black)
            .bg(task.tag.color.color()),
    )];
    if !task.priority.marker().is_empty() {
        top.push(Span::raw(" "));
        top.push(Span::styled(
            task.priority.marker().to_string(),
            Style::default()
                .fg(task.priority.color())
                .add_modifier(Modifier::BOLD),
        ));
    }

    let mut meta = vec![Span::styled(
        task.assignee.clone(),
        Style::default().fg(Color::Gray),
    )];
    if let Some(due) = task.due_date {
        meta.push(Span::styled(
            format!("  due {}", due.format("%b %e")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if !task.comments.is_empty() {
        meta.push(Span::styled(
            format!("  {} comment{}", task.comments.len(), if task.comments.len() == 1 { "" } else { "s" }),
            Style::default().fg(Color::DarkGray),
        ));
    }
    vec![
        Line::from(top),
        Line::from(Span::styled(
            task.title.clone(),
            Style::default().fg(Color::White),
        )),
        Line::from(meta),
        Line::from(""),
    ]
}

fn draw_reader(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let page = app.reader_page_posts();
    let items: Vec<ListItem> = page.iter().map(|p| post_entry(p)).collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(" Articles ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::Rgb(24, 34, 28)))
        .highlight_symbol("▸ ");
    let mut state = ListState::default();
    if !page.is_empty() {
        state.select(Some(app.reader_selected.min(page.len() - 1)));
    }
    f.render_stateful_widget(list, chunks[0], &mut state);

    if page.is_empty() {
        let empty = Paragraph::new("No articles match.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" Preview "));
        f.render_widget(empty, chunks[1]);
        return;
    }
    draw_reader_side(f, app, &page, chunks[1]);
}

fn post_entry(post: &Post) -> ListItem<'static> {
    let mut title = vec![Span::styled(
        post.title.clone(),
        Style::default().fg(Color::White),
    )];
    if post.is_popular {
        title.push(Span::styled(
            "  ★",
            Style::default().fg(Color::Rgb(234, 179, 8)),
        ));
    }
    ListItem::new(vec![
        Line::from(title),
        Line::from(Span::styled(
            format!(
                "{} · {} · {} · {}",
                post.category,
                post.author,
                post.created_at.format("%b %e, %Y"),
                reader::display_read_time(post)
            ),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ])
}

fn draw_reader_side(f: &mut Frame, app: &App, page: &[&Post], area: Rect) {
    let selected = page[app.reader_selected.min(page.len() - 1)];
    let toc = reader::derive_toc(&selected.content);
    let popular = reader::popular(&app.posts);

    let mut lines = vec![
        Line::from(Span::styled(
            selected.title.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "{} · {}",
                selected.author,
                reader::display_read_time(selected)
            ),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(Span::styled(
            selected.excerpt.clone(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
    ];
    if !toc.is_empty() {
        lines.push(Line::from(Span::styled(
            "In this article",
            Style::default().fg(Color::Cyan),
        )));
        for entry in &toc {
            lines.push(Line::from(Span::styled(
                format!("  • {}", entry.title),
                Style::default().fg(Color::Gray),
            )));
        }
        lines.push(Line::from(""));
    }
    if !popular.is_empty() {
        lines.push(Line::from(Span::styled(
            "Popular",
            Style::default().fg(Color::Rgb(234, 179, 8)),
        )));
        for post in popular.iter().take(3) {
            lines.push(Line::from(Span::styled(
                format!("  ★ {}", post.title),
                Style::default().fg(Color::Gray),
            )));
        }
    }

    let preview = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Preview ")
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(preview, area);
}

fn draw_post_detail(
    f: &mut Frame,
    app: &App,
    slug: &str,
    scroll: u16,
    toc: &[TocEntry],
    area: Rect,
) {
    let popup = centered_rect(area, 84, 90);
    f.render_widget(Clear, popup);

    let Some(post) = reader::find_by_slug(&app.posts, slug) else {
        // dedicated not-found view, not an error
        let missing = Paragraph::new("This article could not be found.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Not found "));
        f.render_widget(missing, popup);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Min(3), Constraint::Length(1)])
        .split(popup);

    let mut lines = vec![
        Line::from(Span::styled(
            post.title.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(
                "{} · {} · {} · {}",
                post.category,
                post.author,
                post.created_at.format("%b %e, %Y"),
                reader::display_read_time(post)
            ),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    if !toc.is_empty() {
        lines.push(Line::from(Span::styled(
            "Contents",
            Style::default().fg(Color::Cyan),
        )));
        for entry in toc {
            lines.push(Line::from(Span::styled(
                format!("  • {}", entry.title),
                Style::default().fg(Color::Gray),
            )));
        }
        lines.push(Line::from(""));
    }
    for paragraph in post_paragraphs(&post.content) {
        lines.push(Line::from(Span::styled(
            paragraph,
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(""));
    }

    let total = lines.len() as u16;
    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .scroll((scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", post.title))
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(body, chunks[0]);

    // reading progress along the scroll range
    let max_scroll = total.saturating_sub(chunks[0].height.saturating_sub(2)).max(1);
    let ratio = (scroll.min(max_scroll) as f64 / max_scroll as f64).clamp(0.0, 1.0);
    let progress = Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(Color::Rgb(0, 201, 81)).bg(Color::Rgb(30, 30, 30)));
    f.render_widget(progress, chunks[1]);
}

/// Split HTML content into plain-text paragraphs and headings, in document
/// order, for terminal display.
fn post_paragraphs(html: &str) -> Vec<String> {
    html.split("</p>")
        .flat_map(|chunk| chunk.split("</h2>"))
        .map(reader::strip_tags)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn draw_task_detail(f: &mut Frame, app: &App, task_id: &str, comment_input: &str, area: Rect) {
    let popup = centered_rect(area, 70, 80);
    f.render_widget(Clear, popup);

    let Some(task) = app.board.find(task_id) else {
        let missing = Paragraph::new("This task no longer exists.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Not found "));
        f.render_widget(missing, popup);
        return;
    };

    let now = Utc::now();
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {} ", task.tag.label),
                Style::default().fg(Color::Black).bg(task.tag.color.color()),
            ),
            Span::raw("  "),
            Span::styled(
                format!("{} priority", task.priority.label()),
                Style::default().fg(task.priority.color()),
            ),
            Span::raw("  "),
            Span::styled(
                task.status.title(),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("Assigned to {}", task.assignee),
            Style::default().fg(Color::Gray),
        )),
    ];
    if let Some(due) = task.due_date {
        lines.push(Line::from(Span::styled(
            format!("Due {}", due.format("%b %e, %Y")),
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Line::from(""));
    if let Some(desc) = &task.description {
        lines.push(Line::from(Span::styled(
            desc.clone(),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(""));
    }

    let comments = task.comments_by_time();
    lines.push(Line::from(Span::styled(
        format!("Comments ({})", comments.len()),
        Style::default().fg(Color::Cyan),
    )));
    if comments.is_empty() {
        lines.push(Line::from(Span::styled(
            "No comments yet. Be the first to comment!",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }
    for comment in comments {
        lines.push(Line::from(vec![
            Span::styled(
                comment.author.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", relative_time(comment.created_at, now)),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            format!("  {}", comment.text),
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan)),
        Span::styled(comment_input.to_string(), Style::default().fg(Color::White)),
        Span::styled("█", Style::default().fg(Color::Cyan)),
    ]));

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", task.title))
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(detail, popup);
}

fn draw_new_task_modal(f: &mut Frame, form: &NewTaskForm, area: Rect) {
    let popup = centered_rect(area, 50, 40);
    f.render_widget(Clear, popup);

    let field_line = |label: &str, value: String, focused: bool| {
        let marker = if focused { "▸ " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        Line::from(vec![
            Span::styled(marker.to_string(), Style::default().fg(Color::Cyan)),
            Span::styled(format!("{label:<10}"), Style::default().fg(Color::DarkGray)),
            Span::styled(value, style),
        ])
    };

    let lines = vec![
        field_line(
            "Title",
            format!("{}█", form.title),
            form.field == FormField::Title,
        ),
        field_line(
            "Status",
            form.status.title().to_string(),
            form.field == FormField::Status,
        ),
        field_line(
            "Priority",
            form.priority.label().to_string(),
            form.field == FormField::Priority,
        ),
        field_line(
            "Tag",
            if form.tag.is_empty() {
                "General".to_string()
            } else {
                format!("{}█", form.tag)
            },
            form.field == FormField::Tag,
        ),
    ];

    let modal = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Create New Task ")
            .border_style(Style::default().fg(Color::Rgb(0, 201, 81))),
    );
    f.render_widget(modal, popup);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let popup = centered_rect(area, 60, 70);
    f.render_widget(Clear, popup);
    let lines: Vec<Line> = [
        ("tab", "switch between board and reader"),
        ("← → ↑ ↓", "navigate columns, tasks, articles, pages"),
        ("enter", "open task details / read an article"),
        ("n", "new task in the selected column"),
        ("[ ]", "move the selected task between columns"),
        ("/", "search (board titles, article titles and excerpts)"),
        ("f", "toggle the high-priority filter"),
        ("c", "cycle the article category filter"),
        ("esc", "close the current overlay"),
        ("q", "quit (the board is saved on exit)"),
    ]
    .iter()
    .map(|(key, desc)| {
        Line::from(vec![
            Span::styled(format!("{key:>8}  "), Style::default().fg(Color::Cyan)),
            Span::styled(desc.to_string(), Style::default().fg(Color::Gray)),
        ])
    })
    .collect();
    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Keys ")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(help, popup);
}

fn draw_notice(f: &mut Frame, message: &str, area: Rect) {
    let width = (message.chars().count() as u16 + 4).min(area.width);
    let rect = Rect {
        x: area.right().saturating_sub(width + 1),
        y: area.y + 1,
        width,
        height: 3,
    }
    .intersection(area);
    f.render_widget(Clear, rect);
    let toast = Paragraph::new(message.to_string())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(0, 201, 81))),
        );
    f.render_widget(toast, rect);
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_stays_inside_parent() {
        let parent = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(parent, 60, 50);
        assert!(inner.x >= parent.x && inner.right() <= parent.right());
        assert!(inner.y >= parent.y && inner.bottom() <= parent.bottom());
        assert_eq!(inner.width, 60);
        assert_eq!(inner.height, 20);
    }

    #[test]
    fn html_paragraphs_flatten_in_document_order() {
        let html = "<p>Intro text.</p><h2>First</h2><p>Body <em>one</em>.</p><h2>Second</h2><p>Body two.</p>";
        let parts = post_paragraphs(html);
        assert_eq!(
            parts,
            vec![
                "Intro text.".to_string(),
                "First".to_string(),
                "Body one.".to_string(),
                "Second".to_string(),
                "Body two.".to_string(),
            ]
        );
    }

    #[test]
    fn rgb_scales_and_clamps() {
        assert_eq!(rgb((100, 200, 50), 0.5), Color::Rgb(50, 100, 25));
        assert_eq!(rgb((100, 200, 50), 2.0), Color::Rgb(100, 200, 50));
        assert_eq!(rgb((100, 200, 50), -1.0), Color::Rgb(0, 0, 0));
    }
}
