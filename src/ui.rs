use chrono::{DateTime, Utc};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, BrowseView, ContainerRef, InputMode, InspectView, LogsView, ViewState};
use crate::engine::format_bytes;
use crate::input::{Action, KeyMap};
use crate::logs::StreamKind;
use crate::model::{NavigationMode, Snapshot};
use crate::projector::{self, ListItem};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const SELECTED: Color = Color::Rgb(24, 36, 58);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const STACK_BELOW_WIDTH: u16 = 100;

pub fn render(frame: &mut Frame, app: &App, keymap: &KeyMap) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app, keymap);
    render_footer(frame, root[2], app);

    if app.help_visible() {
        render_help_modal(frame, app, keymap);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut left = Vec::new();
    push_powerline_segment(&mut left, " 󰡨 dockside ", Color::White, PL_A, PL_B);
    push_powerline_segment(
        &mut left,
        format!(" {} {} ", app.nav().slot(), app.nav().title()),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut left,
        format!(" {} ", app.view_mode().label()),
        Color::White,
        PL_C,
        BG,
    );
    let left_line = Line::from(left);

    if !app.prefs().show_header_context {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let right_line = build_header_counts(app.snapshot());
    let right_width = spans_width(&right_line.spans) as u16;
    let left_width = spans_width(&left_line.spans) as u16;
    if right_width == 0 || right_width >= area.width.saturating_sub(left_width) {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line).style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn build_header_counts(snapshot: &Snapshot) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("● {} running ", snapshot.running_count()),
            Style::default().fg(ACCENT),
        ),
        Span::styled(
            format!("○ {} stopped ", snapshot.stopped_count()),
            Style::default().fg(MUTED),
        ),
        Span::styled(
            format!(
                " {} vol  {} img  {} net ",
                snapshot.volumes().len(),
                snapshot.images().len(),
                snapshot.networks().len()
            ),
            Style::default().fg(Color::White),
        ),
    ])
}

fn render_body(frame: &mut Frame, area: Rect, app: &App, keymap: &KeyMap) {
    let (width, _) = app.viewport();
    let stacked = width != 0 && width < STACK_BELOW_WIDTH;
    let chunks = if stacked {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area)
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area)
    };

    let list_focused = matches!(app.view(), ViewState::Details);
    render_list(frame, chunks[0], app, keymap, list_focused);
    match app.view() {
        ViewState::Details => render_details(frame, chunks[1], app),
        ViewState::Logs(view) => render_logs(frame, chunks[1], app, view),
        ViewState::Ports { target, selected } => {
            render_ports(frame, chunks[1], app, target, *selected)
        }
        ViewState::Env { target } => render_env(frame, chunks[1], app, target),
        ViewState::Stats { target } => render_stats(frame, chunks[1], app, target),
        ViewState::Inspect(view) => render_inspect(frame, chunks[1], view),
        ViewState::VolumeBrowse(view) => render_browse(frame, chunks[1], view),
    }
}

fn panel_block(title: impl Into<Line<'static>>, focused: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(ACCENT)
        } else {
            Style::default().fg(MUTED)
        })
        .style(Style::default().bg(PANEL))
}

fn render_list(frame: &mut Frame, area: Rect, app: &App, keymap: &KeyMap, focused: bool) {
    let snapshot = app.snapshot();
    let headers: &[&str] = match app.nav() {
        NavigationMode::Containers => &["NAME", "STATE", "IMAGE"],
        NavigationMode::Volumes => &["NAME", "DRIVER"],
        NavigationMode::Images => &["TAG", "ID", "SIZE"],
        NavigationMode::Networks => &["NAME", "DRIVER", "SCOPE"],
    };
    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = app
        .items()
        .iter()
        .map(|item| Row::new(list_columns(snapshot, *item)))
        .collect::<Vec<_>>();

    let mut block = panel_block(
        format!("{} ({})", app.nav().title(), app.items().len()),
        focused,
    );
    let help_keys = keymap.keys_for(Action::ToggleHelp);
    if app.prefs().show_list_help_hint
        && let Some(key) = help_keys.first()
    {
        block = block.title_bottom(Line::from(Span::styled(
            format!(" {key} help "),
            Style::default().fg(MUTED),
        )));
    }

    let table = Table::new(rows, column_constraints(headers.len()))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(Style::default().bg(SELECTED).add_modifier(Modifier::BOLD))
        .highlight_symbol("󰜴 ");

    let mut state = TableState::default();
    state.select(app.cursor());
    frame.render_stateful_widget(table, area, &mut state);
}

fn list_columns(snapshot: &Snapshot, item: ListItem) -> Vec<Cell<'static>> {
    let label = projector::describe(snapshot, item);
    match item {
        ListItem::Project { expanded, .. } => {
            let marker = if expanded { "▾" } else { "▸" };
            vec![
                Cell::from(format!("{marker} {label}"))
                    .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
            ]
        }
        ListItem::Container { index, nested } => {
            let Some(container) = snapshot.container(index) else {
                return Vec::new();
            };
            let indent = if nested { "  " } else { "" };
            let state_color = if container.is_running() { ACCENT } else { MUTED };
            vec![
                Cell::from(format!("{indent}{label}")).style(Style::default().fg(Color::White)),
                Cell::from(container.state.clone()).style(Style::default().fg(state_color)),
                Cell::from(container.image.clone()).style(Style::default().fg(MUTED)),
            ]
        }
        ListItem::Volume(index) => snapshot
            .volumes()
            .get(index)
            .map(|volume| vec![Cell::from(label), Cell::from(volume.driver.clone())])
            .unwrap_or_default(),
        ListItem::Image(index) => snapshot
            .images()
            .get(index)
            .map(|image| {
                vec![
                    Cell::from(label),
                    Cell::from(image.id.clone()).style(Style::default().fg(MUTED)),
                    Cell::from(format_bytes(image.size.max(0) as u64)),
                ]
            })
            .unwrap_or_default(),
        ListItem::Network(index) => snapshot
            .networks()
            .get(index)
            .map(|network| {
                vec![
                    Cell::from(label),
                    Cell::from(network.driver.clone()),
                    Cell::from(network.scope.clone()).style(Style::default().fg(MUTED)),
                ]
            })
            .unwrap_or_default(),
    }
}

fn render_details(frame: &mut Frame, area: Rect, app: &App) {
    let lines = match app.selected_item() {
        Some(item) => detail_lines(app, item),
        None => vec![Line::from(Span::styled(
            format!("No {} found", app.nav().title().to_lowercase()),
            Style::default().fg(MUTED),
        ))],
    };
    let paragraph = Paragraph::new(lines)
        .block(panel_block("Details", false))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn field(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<10}"), Style::default().fg(MUTED)),
        Span::styled(value.into(), Style::default().fg(Color::White)),
    ])
}

fn detail_lines(app: &App, item: ListItem) -> Vec<Line<'static>> {
    let snapshot = app.snapshot();
    let prefs = app.prefs();
    let mut lines = Vec::new();
    match item {
        ListItem::Project { group, .. } => {
            let Some(group) = snapshot.groups().get(group) else {
                return lines;
            };
            lines.push(field("Project", group.name.clone()));
            lines.push(field(
                "Running",
                format!(
                    "{}/{}",
                    group.running(snapshot.containers()),
                    group.members.len()
                ),
            ));
            lines.push(Line::from(""));
            for index in group.members.iter().take(prefs.max_project_preview_items) {
                if let Some(container) = snapshot.container(*index) {
                    lines.push(Line::from(format!("  {} ({})", container.name, container.state)));
                }
            }
            let hidden = group
                .members
                .len()
                .saturating_sub(prefs.max_project_preview_items);
            if hidden > 0 {
                lines.push(Line::from(Span::styled(
                    format!("  … {hidden} more"),
                    Style::default().fg(MUTED),
                )));
            }
        }
        ListItem::Container { index, .. } => {
            let Some(container) = snapshot.container(index) else {
                return lines;
            };
            lines.push(field("Name", container.name.clone()));
            lines.push(field("ID", container.id.clone()));
            lines.push(field("Image", container.image.clone()));
            lines.push(field("State", container.state.clone()));
            lines.push(field("Status", container.status.clone()));
            lines.push(field(
                "Project",
                container.project.clone().unwrap_or_else(|| "-".to_string()),
            ));
            lines.push(field("Created", format_created(container.created)));
            let mut ports = container
                .ports
                .iter()
                .take(prefs.max_container_port_preview)
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            if container.ports.len() > prefs.max_container_port_preview {
                ports.push("…".to_string());
            }
            lines.push(field(
                "Ports",
                if ports.is_empty() {
                    "-".to_string()
                } else {
                    ports.join(", ")
                },
            ));
        }
        ListItem::Volume(index) => {
            let Some(volume) = snapshot.volumes().get(index) else {
                return lines;
            };
            lines.push(field("Name", volume.name.clone()));
            lines.push(field("Driver", volume.driver.clone()));
            lines.push(field("Mount", volume.mountpoint.clone()));
            lines.push(field("Scope", volume.scope.clone()));
            lines.push(field("Created", volume.created.clone()));
            for (key, value) in &volume.labels {
                lines.push(field("Label", format!("{key}={value}")));
            }
        }
        ListItem::Image(index) => {
            let Some(image) = snapshot.images().get(index) else {
                return lines;
            };
            lines.push(field("ID", image.id.clone()));
            lines.push(field("Size", format_bytes(image.size.max(0) as u64)));
            lines.push(field("Created", format_created(image.created)));
            for tag in image.repo_tags.iter().take(prefs.max_image_tag_preview) {
                lines.push(field("Tag", tag.clone()));
            }
        }
        ListItem::Network(index) => {
            let Some(network) = snapshot.networks().get(index) else {
                return lines;
            };
            lines.push(field("Name", network.name.clone()));
            lines.push(field("ID", network.id.clone()));
            lines.push(field("Driver", network.driver.clone()));
            lines.push(field("Scope", network.scope.clone()));
            lines.push(field("Internal", network.internal.to_string()));
            lines.push(field("Created", network.created.clone()));
        }
    }
    lines
}

fn render_logs(frame: &mut Frame, area: Rect, app: &App, view: &LogsView) {
    let total = view.buffer.as_ref().map_or(0, |buffer| buffer.len());
    let follow_label = if view.following { "following" } else { "paused" };
    let search_label = if view.search.is_active() {
        format!(
            " • /{} ({})",
            view.search.query(),
            view.search.matches().len()
        )
    } else {
        String::new()
    };
    let title = format!(
        " {} • {total} lines • {follow_label}{search_label} ",
        view.target.name
    );
    let mut block = panel_block(title, true);
    if total > 0 {
        block = block.title_bottom(
            Line::from(Span::styled(
                format!(" Line {}/{total} ", view.scroll + 1),
                Style::default().fg(MUTED),
            ))
            .alignment(Alignment::Right),
        );
    }

    let Some(buffer) = view.buffer.as_ref() else {
        let (text, color) = match &view.error {
            Some(error) => (format!("Failed to load logs: {error}"), ERROR),
            None => ("Loading logs...".to_string(), MUTED),
        };
        frame.render_widget(
            Paragraph::new(text)
                .block(block)
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: false }),
            area,
        );
        return;
    };
    if buffer.is_empty() {
        frame.render_widget(
            Paragraph::new("No log output yet")
                .block(block)
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    let height = area.height.saturating_sub(2) as usize;
    let (start, end) = log_window(view.scroll, total, height);
    let gutter = total.max(1).to_string().len();
    let current_match = view.search.current_line();
    let lines = buffer.lines()[start..end]
        .iter()
        .enumerate()
        .map(|(offset, line)| {
            let position = start + offset;
            let mut spans = Vec::new();
            if app.prefs().show_line_numbers {
                spans.push(Span::styled(
                    format!("{:>gutter$} ", position + 1),
                    Style::default().fg(MUTED),
                ));
            }
            let mut style = match line.stream {
                StreamKind::Stderr => Style::default().fg(ERROR),
                _ => Style::default().fg(Color::White),
            };
            if current_match == Some(position) {
                style = style.bg(WARN).fg(Color::Black);
            } else if view.search.is_match(position) {
                style = style.bg(SELECTED).fg(WARN);
            } else if position == view.scroll {
                style = style.bg(SELECTED);
            }
            spans.push(Span::styled(line.raw.clone(), style));
            Line::from(spans)
        })
        .collect::<Vec<_>>();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Visible `[start, end)` range keeping `focus` on screen, pinned to the tail
/// when the focus is near the end.
fn log_window(focus: usize, total: usize, height: usize) -> (usize, usize) {
    if total <= height || height == 0 {
        return (0, total.min(if height == 0 { total } else { height }));
    }
    let start = focus
        .saturating_sub(height / 2)
        .min(total.saturating_sub(height));
    (start, start + height)
}

fn render_ports(frame: &mut Frame, area: Rect, app: &App, target: &ContainerRef, selected: usize) {
    let ports = app.ports_of(&target.id);
    let block = panel_block(format!(" Ports • {} ", target.name), true);
    if ports.is_empty() {
        frame.render_widget(
            Paragraph::new("No ports available")
                .block(block)
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    let header_row = Row::new(["PUBLIC", "PRIVATE", "PROTO", "IP"].map(|header| {
        Cell::from(header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().fg(ACCENT));
    let rows = ports.iter().map(|port| {
        let public = port
            .public_port
            .map(|public| public.to_string())
            .unwrap_or_else(|| "-".to_string());
        Row::new(vec![
            Cell::from(public),
            Cell::from(port.private_port.to_string()),
            Cell::from(port.protocol.clone()),
            Cell::from(if port.ip.is_empty() {
                "-".to_string()
            } else {
                port.ip.clone()
            }),
        ])
    });
    let table = Table::new(rows, column_constraints(4))
        .header(header_row)
        .block(block)
        .row_highlight_style(Style::default().bg(SELECTED).add_modifier(Modifier::BOLD))
        .highlight_symbol("󰜴 ");
    let mut state = TableState::default();
    state.select(Some(selected.min(ports.len() - 1)));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_env(frame: &mut Frame, area: Rect, app: &App, target: &ContainerRef) {
    let env = app
        .snapshot()
        .find_container(&target.id)
        .map(|container| container.env.as_slice())
        .unwrap_or_default();
    let lines = if env.is_empty() {
        vec![Line::from(Span::styled(
            "No environment variables",
            Style::default().fg(MUTED),
        ))]
    } else {
        env.iter()
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => Line::from(vec![
                    Span::styled(key.to_string(), Style::default().fg(ACCENT)),
                    Span::styled("=", Style::default().fg(MUTED)),
                    Span::styled(value.to_string(), Style::default().fg(Color::White)),
                ]),
                None => Line::from(entry.clone()),
            })
            .collect()
    };
    frame.render_widget(
        Paragraph::new(lines)
            .block(panel_block(format!(" Env • {} ", target.name), true))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn render_stats(frame: &mut Frame, area: Rect, app: &App, target: &ContainerRef) {
    let block = panel_block(format!(" Stats • {} ", target.name), true);
    let Some(stats) = app.stats_for(&target.id) else {
        frame.render_widget(
            Paragraph::new("Loading stats...")
                .block(block)
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    };
    let lines = vec![
        field("CPU", format!("{:.2}%", stats.cpu_percent)),
        field(
            "Memory",
            format!(
                "{} / {} ({:.2}%)",
                format_bytes(stats.memory_usage),
                format_bytes(stats.memory_limit),
                stats.memory_percent
            ),
        ),
        field(
            "Net I/O",
            format!(
                "{} / {}",
                format_bytes(stats.net_rx),
                format_bytes(stats.net_tx)
            ),
        ),
        field(
            "Block I/O",
            format!(
                "{} / {}",
                format_bytes(stats.block_read),
                format_bytes(stats.block_write)
            ),
        ),
        field("PIDs", stats.pids.to_string()),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_inspect(frame: &mut Frame, area: Rect, view: &InspectView) {
    let block = panel_block(format!(" Inspect • {} ", view.target.name), true);
    let Some(lines) = view.lines.as_ref() else {
        frame.render_widget(
            Paragraph::new("Loading inspect data...")
                .block(block)
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    };
    let height = area.height.saturating_sub(2) as usize;
    let (start, end) = log_window(view.scroll, lines.len(), height);
    let text = lines[start..end]
        .iter()
        .map(|line| highlight_json_line(line))
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(text).block(block), area);
}

/// Colors the key of a pretty-printed JSON line.
fn highlight_json_line(line: &str) -> Line<'static> {
    let indent = line.len() - line.trim_start().len();
    let content = line.trim_start();
    if content.starts_with('"')
        && let Some((key, value)) = content.split_once("\": ")
    {
        return Line::from(vec![
            Span::raw(" ".repeat(indent)),
            Span::styled(format!("{key}\""), Style::default().fg(ACCENT)),
            Span::styled(": ", Style::default().fg(MUTED)),
            Span::styled(value.to_string(), Style::default().fg(Color::White)),
        ]);
    }
    Line::from(Span::styled(line.to_string(), Style::default().fg(Color::White)))
}

fn render_browse(frame: &mut Frame, area: Rect, view: &BrowseView) {
    let relative = view
        .path
        .strip_prefix(&view.root)
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    let title = format!(" {}:/{} ", view.volume, relative);
    let block = panel_block(title, true);
    let Some(entries) = view.entries.as_ref() else {
        frame.render_widget(
            Paragraph::new("Loading...")
                .block(block)
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    };
    if entries.is_empty() {
        frame.render_widget(
            Paragraph::new("Empty directory")
                .block(block)
                .style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }
    let rows = entries.iter().map(|entry| {
        let color = if entry.ends_with('/') { ACCENT } else { Color::White };
        Row::new(vec![Cell::from(entry.clone()).style(Style::default().fg(color))])
    });
    let table = Table::new(rows, [Constraint::Percentage(100)])
        .block(block)
        .row_highlight_style(Style::default().bg(SELECTED).add_modifier(Modifier::BOLD))
        .highlight_symbol("󰜴 ");
    let mut state = TableState::default();
    state.select(Some(view.selected.min(entries.len() - 1)));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    if matches!(app.mode(), InputMode::Normal) {
        let status_text = app.status();
        let mut spans = Vec::new();
        push_powerline_segment(&mut spans, " 󰘳 nrm ", Color::White, PL_A, PL_B);
        let status_width_hint = area.width.saturating_sub(24).min(120) as usize;
        push_powerline_segment(
            &mut spans,
            format!(
                " {} {} ",
                footer_status_icon(status_text),
                compact_text(status_text, status_width_hint.max(24))
            ),
            Color::White,
            PL_B,
            BG,
        );
        let right = Line::from(Span::styled(
            format!(" {} ", app.view_mode().label()),
            Style::default().fg(MUTED),
        ));
        let right_width = spans_width(&right.spans) as u16;
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(right_width)])
            .split(area);
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            chunks[0],
        );
        frame.render_widget(
            Paragraph::new(right)
                .style(Style::default().bg(BG))
                .alignment(Alignment::Right),
            chunks[1],
        );
        return;
    }

    let (label, prompt, prompt_bg) = match app.mode() {
        InputMode::Command => (" 󰘳 cmd ", format!(":{}", app.input()), ACCENT),
        InputMode::Search => (" 󰍉 srch ", format!("?{}", app.input()), WARN),
        InputMode::Normal => return,
    };

    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, label, Color::Black, prompt_bg, PL_B);
    push_powerline_segment(&mut spans, format!(" {prompt} "), Color::White, PL_B, BG);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = ["failed", "error", "unknown", "no matches", "stopped:"]
        .iter()
        .any(|needle| status.contains(needle));
    if has_failure { "󰅚" } else { "󰄬" }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

const HELP_SECTIONS: [(&str, &[(Action, &str)]); 4] = [
    (
        "Navigation",
        &[
            (Action::Up, "move up"),
            (Action::Down, "move down"),
            (Action::Top, "jump to top"),
            (Action::Bottom, "jump to bottom"),
            (
                Action::ToggleExpand,
                "expand/collapse project, enter directory",
            ),
            (Action::SwitchNav(NavigationMode::Containers), "containers"),
            (Action::SwitchNav(NavigationMode::Volumes), "volumes"),
            (Action::SwitchNav(NavigationMode::Images), "images"),
            (Action::SwitchNav(NavigationMode::Networks), "networks"),
        ],
    ),
    (
        "Containers",
        &[
            (Action::Restart, "restart"),
            (Action::Delete, "delete selected resource"),
            (Action::Logs, "logs"),
            (Action::Exec, "interactive shell"),
            (Action::Ports, "ports"),
            (Action::OpenPort, "open port in browser"),
            (Action::Env, "environment"),
            (Action::Stats, "stats"),
            (Action::Inspect, "inspect"),
            (Action::Browse, "browse volume"),
        ],
    ),
    (
        "Logs",
        &[
            (Action::StartSearch, "search"),
            (Action::NextMatch, "next match"),
            (Action::PrevMatch, "previous match"),
            (Action::ToggleFollow, "toggle follow"),
        ],
    ),
    (
        "General",
        &[
            (Action::Back, "back"),
            (Action::StartCommand, "command line"),
            (Action::Refresh, "refresh"),
            (Action::ToggleHelp, "toggle help"),
            (Action::Quit, "quit"),
        ],
    ),
];

fn render_help_modal(frame: &mut Frame, app: &App, keymap: &KeyMap) {
    let area = centered_rect(78, 72, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "dockside help  mode:{}  nav:{}  view:{}",
            help_mode_label(app.mode()),
            app.nav().title(),
            app.view_mode().label()
        )),
        Line::from(""),
    ];
    for (section, entries) in HELP_SECTIONS {
        lines.push(Line::from(Span::styled(
            section,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
        for (action, description) in entries {
            let keys = keymap.keys_for(*action);
            if keys.is_empty() {
                continue;
            }
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<18}", keys.join(" / ")),
                    Style::default().fg(WARN),
                ),
                Span::raw(description.to_string()),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from(
        "Commands: :q quit  :s start  :S stop  :r refresh  :follow  :noh  :help",
    ));

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

fn help_mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => "normal",
        InputMode::Command => "command",
        InputMode::Search => "search",
    }
}

fn format_created(timestamp: i64) -> String {
    let Some(created) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
        return "-".to_string();
    };
    let elapsed = (Utc::now() - created).num_seconds().max(0);
    format!(
        "{} ({} ago)",
        created.format("%Y-%m-%d %H:%M:%S"),
        format_elapsed_seconds(elapsed)
    )
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }
    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }
    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }
    format!("{seconds}s")
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns == 0 {
        return vec![Constraint::Percentage(100)];
    }

    let width = (100 / columns as u16).max(1);
    (0..columns)
        .map(|_| Constraint::Percentage(width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Event, Listing, LogRequest, Outcome, SessionSettings};
    use crate::config::{KeyBindings, UiPrefs};
    use crate::logs::framed;
    use crate::model;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen_text(app: &App, keymap: &KeyMap) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 60)).expect("test terminal");
        terminal
            .draw(|frame| render(frame, app, keymap))
            .expect("draw frame");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn log_window_follows_focus() {
        assert_eq!(log_window(0, 5, 10), (0, 5));
        assert_eq!(log_window(99, 100, 10), (90, 100));
        assert_eq!(log_window(50, 100, 10), (45, 55));
        assert_eq!(log_window(2, 100, 10), (0, 10));
        assert_eq!(log_window(3, 4, 0), (0, 4));
    }

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("dockside", 20), "dockside");
        assert_eq!(compact_text("dockside", 5), "dock…");
        assert_eq!(compact_text("dockside", 1), "…");
    }

    #[test]
    fn elapsed_uses_largest_unit() {
        assert_eq!(format_elapsed_seconds(42), "42s");
        assert_eq!(format_elapsed_seconds(120), "2m");
        assert_eq!(format_elapsed_seconds(7_200), "2h");
        assert_eq!(format_elapsed_seconds(172_800), "2d");
    }

    #[test]
    fn json_keys_are_split_from_values() {
        let line = highlight_json_line("  \"Image\": \"nginx\",");
        let text = line
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect::<String>();
        assert_eq!(text, "  \"Image\": \"nginx\",");
        assert_eq!(line.spans.len(), 4);
    }

    #[test]
    fn renders_project_rows_and_counts() {
        let keymap = KeyMap::from_bindings(&KeyBindings::default());
        let mut app = App::new(SessionSettings::default(), UiPrefs::default());
        app.apply(Event::Completed(Outcome::Refreshed {
            mode: NavigationMode::Containers,
            result: Ok(Listing::Containers(vec![
                model::container("a1", "web-1", "running", Some("web")),
                model::container("b2", "solo", "exited", None),
            ])),
        }));

        let text = screen_text(&app, &keymap);
        assert!(text.contains("Containers (2)"));
        assert!(text.contains("web (1/1)"));
        assert!(text.contains("1 running"));
        assert!(text.contains("1 stopped"));
    }

    fn app_with_logs(lines: &[&str]) -> App {
        let mut app = App::new(SessionSettings::default(), UiPrefs::default());
        app.apply(Event::Completed(Outcome::Refreshed {
            mode: NavigationMode::Containers,
            result: Ok(Listing::Containers(vec![model::container("a1", "api", "running", None)])),
        }));
        app.apply(Event::Action(Action::Logs));
        app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Tail(100),
            result: Ok(framed(lines)),
        }));
        app
    }

    #[test]
    fn logs_title_shows_committed_query() {
        let keymap = KeyMap::from_bindings(&KeyBindings::default());
        let mut app = app_with_logs(&["boot", "error: disk", "Error again"]);
        app.apply(Event::Action(Action::StartSearch));
        for c in "error".chars() {
            app.apply(Event::Action(Action::InputChar(c)));
        }
        app.apply(Event::Action(Action::SubmitInput));

        let text = screen_text(&app, &keymap);
        assert!(text.contains("3 lines"));
        assert!(text.contains("/error (2)"));
    }

    #[test]
    fn empty_log_batch_is_not_shown_as_loading() {
        let keymap = KeyMap::from_bindings(&KeyBindings::default());
        let app = app_with_logs(&[]);

        let text = screen_text(&app, &keymap);
        assert!(text.contains("No log output yet"));
        assert!(!text.contains("Loading logs..."));
    }

    #[test]
    fn help_overlay_lists_bound_keys() {
        let keymap = KeyMap::from_bindings(&KeyBindings::default());
        let mut app = App::new(SessionSettings::default(), UiPrefs::default());
        app.apply(Event::Action(Action::ToggleHelp));

        let text = screen_text(&app, &keymap);
        assert!(text.contains("dockside help"));
        assert!(text.contains("toggle follow"));
    }
}
