use crate::app::{App, Mode};
use crate::conversation::Message;
use crate::strings::{
    APP_NAME, APP_TAGLINE, ATTACHMENT_LOADED, DISCLAIMER_ACCEPT, DISCLAIMER_TEXT, DISCLAIMER_TITLE,
    FOOTER_NOTICE, SOURCES_HEADING, SUGGESTIONS, WELCOME_BODY, WELCOME_TITLE,
};
use crate::theme::Theme;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use throbber_widgets_tui::Throbber;

pub fn ui(f: &mut Frame, app: &mut App) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(1),    // History
            Constraint::Length(
                (3 + app.input.lines().len().saturating_sub(1) as u16).min(10),
            ), // Input grows to max 10 lines
            Constraint::Length(1), // Footer
        ])
        .split(size);

    render_header(f, app, chunks[0]);
    render_history(f, app, chunks[1]);
    render_input(f, app, chunks[2]);

    let footer = Paragraph::new(FOOTER_NOTICE)
        .alignment(Alignment::Center)
        .style(app.theme.muted());
    f.render_widget(footer, chunks[3]);

    if app.mode == Mode::AttachPath {
        let area = centered_rect(60, 20, size);
        f.render_widget(Clear, area);
        app.attach_input.set_block(
            Block::default()
                .title(" Rasm yuklash (Enter: yuklash, Esc: bekor qilish) ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(app.theme.modal_border)),
        );
        f.render_widget(&app.attach_input, area);
    }

    if app.show_help {
        render_help(f, &app.theme, size);
    }

    if app.show_disclaimer {
        render_disclaimer(f, &app.theme, size);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let status = if app.is_loading() { " (javob yozilmoqda...)" } else { "" };
    let title = format!(
        " {} - {} - {}{} (F1 for Help) ",
        APP_NAME,
        APP_TAGLINE,
        app.gemini.model(),
        status
    );

    let header_block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().fg(app.theme.header_fg))
        .border_style(Style::default().fg(app.theme.header_border))
        .border_type(BorderType::Rounded);
    f.render_widget(header_block, area);
}

fn render_welcome(f: &mut Frame, theme: &Theme, area: Rect) {
    let mut lines = vec![
        Line::styled(WELCOME_TITLE, Style::default().fg(theme.primary_fg).add_modifier(Modifier::BOLD)),
        Line::default(),
    ];
    lines.extend(WELCOME_BODY.lines().map(|l| Line::styled(l, theme.muted())));
    lines.push(Line::default());
    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("F{}  ", i + 2), Style::default().fg(theme.header_fg).add_modifier(Modifier::BOLD)),
            Span::styled(suggestion.label, Style::default().fg(theme.primary_fg)),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::styled("Ctrl+a: rasm yuklash  Ctrl+n: yangi chat", theme.muted()));

    let p = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(p, centered_rect(80, 60, area));
}

/// Bubble body: attachment marker, markdown text, then citations.
fn message_text<'m>(msg: &'m Message, theme: &Theme) -> Text<'m> {
    let mut text = Text::default();

    if let Some(attachment) = &msg.attachment {
        text.lines.push(Line::styled(
            format!("[{}: {}]", ATTACHMENT_LOADED, attachment.mime_type),
            Style::default().fg(theme.attachment_fg),
        ));
    }

    if msg.is_error {
        text.lines.push(Line::styled(
            msg.text.as_str(),
            Style::default().fg(theme.error_bubble_border),
        ));
    } else if !msg.text.is_empty() {
        let md = tui_markdown::from_str(&msg.text);
        text.lines.extend(md.lines);
    }

    if !msg.grounding_sources.is_empty() {
        text.lines.push(Line::default());
        text.lines.push(Line::styled(
            SOURCES_HEADING,
            theme.muted().add_modifier(Modifier::BOLD),
        ));
        for (i, source) in msg.grounding_sources.iter().enumerate() {
            text.lines.push(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), theme.muted()),
                Span::styled(source.title.as_str(), theme.source_text()),
                Span::styled(format!(" {}", source.uri), theme.muted()),
            ]));
        }
    }

    text
}

fn render_history(f: &mut Frame, app: &mut App, history_area: Rect) {
    let width = history_area.width;
    let bubble_max_width = (width as f32 * 0.80) as u16;
    let loading = app.is_loading();

    if app.controller.messages().is_empty() {
        render_welcome(f, &app.theme, history_area);
        return;
    }

    // (Height, Option<Text>, IsThinking)
    let mut calculated_msgs: Vec<(u16, Option<Text>, bool)> = Vec::new();
    let mut total_height: u16 = 0;

    let messages = app.controller.messages();
    let msg_count = messages.len();
    for (i, msg) in messages.iter().enumerate() {
        let is_thinking = loading && i == msg_count - 1 && !msg.is_user() && msg.text.is_empty();

        if is_thinking {
            let height = 3;
            calculated_msgs.push((height, None, true));
            total_height = total_height.saturating_add(height);
        } else {
            let text = message_text(msg, &app.theme);
            let content_width = bubble_max_width.saturating_sub(2);
            let height = estimate_wrapped_height(&text, content_width)
                .max(1)
                .saturating_add(2);
            calculated_msgs.push((height, Some(text), false));
            total_height = total_height.saturating_add(height);
        }
    }

    // 1 line between bubbles
    let gaps = u16::try_from(calculated_msgs.len().saturating_sub(1)).unwrap_or(u16::MAX);
    total_height = total_height.saturating_add(gaps);

    let viewport_height = history_area.height;
    if app.auto_scroll {
        app.vertical_scroll = total_height.saturating_sub(viewport_height);
    } else {
        let max_scroll = total_height.saturating_sub(viewport_height);
        if app.vertical_scroll > max_scroll {
            app.vertical_scroll = max_scroll;
        }
    }

    let mut current_y = -(app.vertical_scroll as i32);

    for (i, (bubble_height, text_opt, is_thinking)) in calculated_msgs.into_iter().enumerate() {
        let msg = &messages[i];
        let is_user = msg.is_user();

        if current_y + (bubble_height as i32) > 0 && current_y < (viewport_height as i32) {
            let x = if is_user {
                width.saturating_sub(bubble_max_width)
            } else {
                0
            };

            let area_top = history_area.y as i32;
            let area_bottom = history_area.bottom() as i32;
            let item_top = area_top + current_y;
            let item_bottom = item_top + bubble_height as i32;
            let visible_top = item_top.max(area_top);
            let visible_bottom = item_bottom.min(area_bottom);

            if visible_bottom > visible_top {
                let rect = Rect::new(
                    history_area.x + x,
                    visible_top as u16,
                    bubble_max_width,
                    (visible_bottom - visible_top) as u16,
                );

                let (border_color, title, text_style) = if is_user {
                    (app.theme.user_bubble_border, " Siz ", app.theme.user_text())
                } else if msg.is_error {
                    (app.theme.error_bubble_border, " LegalAI ", app.theme.ai_text())
                } else {
                    (app.theme.ai_bubble_border, " LegalAI ", app.theme.ai_text())
                };

                let block = Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(border_color))
                    .title(title);

                if is_thinking {
                    let throbber = Throbber::default().label("Javob tayyorlanmoqda...").throbber_style(
                        Style::default()
                            .fg(app.theme.ai_bubble_fg)
                            .add_modifier(Modifier::BOLD),
                    );
                    let inner_area = block.inner(rect);
                    f.render_widget(block, rect);
                    f.render_stateful_widget(throbber, inner_area, &mut app.spinner_state);
                } else if let Some(text) = text_opt {
                    let scroll_offset = (area_top - item_top).max(0) as u16;
                    let p = Paragraph::new(text)
                        .style(text_style)
                        .block(block)
                        .wrap(Wrap { trim: false })
                        .scroll((scroll_offset, 0));
                    f.render_widget(p, rect);
                }
            }
        }
        current_y += bubble_height as i32 + 1;
    }
}

fn render_input(f: &mut Frame, app: &mut App, area: Rect) {
    let attachment_note = app
        .controller
        .pending_attachment()
        .map(|a| format!(" [{} ({}), Ctrl+x: olib tashlash]", ATTACHMENT_LOADED, a.mime_type))
        .unwrap_or_default();

    let (border_color, title) = if let Some(err) = app.error.as_ref().or(app.config_error.as_ref()) {
        (app.theme.input_border_error, format!(" Error: {} ", err))
    } else {
        match app.mode {
            Mode::Insert => (
                app.theme.input_border_active,
                format!(" Savol (Enter: yuborish, Esc: Normal){} ", attachment_note),
            ),
            Mode::Normal | Mode::AttachPath => (
                app.theme.input_border_normal,
                format!(" Savol (i: yozish){} ", attachment_note),
            ),
        }
    };

    match app.mode {
        Mode::Insert => app.input.set_style(Style::default()),
        _ => app
            .input
            .set_style(Style::default().add_modifier(Modifier::DIM)),
    }

    app.input.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color)),
    );
    f.render_widget(&app.input, area);
}

fn render_help(f: &mut Frame, theme: &Theme, size: Rect) {
    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.modal_border));
    let area = centered_rect(60, 60, size);
    f.render_widget(Clear, area);
    let help_text = "Controls:\n\nGeneral:\n Ctrl+n: New chat\n Ctrl+a: Attach image\n Ctrl+x: Remove attachment\n F2-F4: Suggested questions (empty chat)\n F1: Help\n Ctrl+c: Quit\n\nInsert Mode:\n Enter: Send Message\n Shift+Enter: New Line\n Esc: Switch to Normal Mode\n\nNormal Mode:\n j/k: Scroll\n G: Jump to latest\n i: Switch to Insert Mode\n q: Quit";
    f.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_disclaimer(f: &mut Frame, theme: &Theme, size: Rect) {
    let area = centered_rect(60, 50, size);
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {} ", DISCLAIMER_TITLE))
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .border_style(Style::default().fg(theme.warning_fg));

    let mut lines: Vec<Line> = DISCLAIMER_TEXT.lines().map(Line::from).collect();
    lines.push(Line::default());
    lines.push(Line::styled(
        format!("Enter: {}    q: chiqish", DISCLAIMER_ACCEPT),
        Style::default().fg(theme.warning_fg).add_modifier(Modifier::BOLD),
    ));

    let p = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub fn estimate_wrapped_height(text: &Text, width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let mut height: u16 = 0;
    for line in &text.lines {
        let rows = if line.width() == 0 {
            1
        } else {
            (line.width() as f32 / width as f32).ceil() as u16
        };
        height = height.saturating_add(rows);
    }
    height
}
