use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Modern,
    Terminal,
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary_fg: Color,
    pub secondary_fg: Color,

    // Header
    pub header_fg: Color,
    pub header_border: Color,

    // Chat
    pub user_bubble_fg: Color,
    pub user_bubble_border: Color,
    pub ai_bubble_fg: Color,
    pub ai_bubble_border: Color,
    pub error_bubble_border: Color,
    pub source_fg: Color,
    pub attachment_fg: Color,

    // Input
    pub input_border_normal: Color,
    pub input_border_active: Color,
    pub input_border_error: Color,

    // Modals
    pub modal_border: Color,
    pub warning_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}

impl From<ThemeName> for Theme {
    fn from(name: ThemeName) -> Self {
        match name {
            ThemeName::Modern => Self::modern(),
            ThemeName::Terminal => Self::terminal(),
        }
    }
}

impl Theme {
    pub fn modern() -> Self {
        Self {
            primary_fg: Color::White,
            secondary_fg: Color::DarkGray,

            header_fg: Color::Blue,
            header_border: Color::DarkGray,

            // User: blue, model: slate
            user_bubble_fg: Color::Cyan,
            user_bubble_border: Color::Blue,
            ai_bubble_fg: Color::White,
            ai_bubble_border: Color::DarkGray,
            error_bubble_border: Color::Red,
            source_fg: Color::LightBlue,
            attachment_fg: Color::LightCyan,

            input_border_normal: Color::DarkGray,
            input_border_active: Color::Blue,
            input_border_error: Color::Red,

            modal_border: Color::Yellow,
            warning_fg: Color::Yellow,
        }
    }

    pub fn terminal() -> Self {
        Self {
            primary_fg: Color::Green,
            secondary_fg: Color::DarkGray,

            header_fg: Color::Green,
            header_border: Color::Green,

            user_bubble_fg: Color::Cyan,
            user_bubble_border: Color::Cyan,
            ai_bubble_fg: Color::Green,
            ai_bubble_border: Color::Green,
            error_bubble_border: Color::Red,
            source_fg: Color::Magenta,
            attachment_fg: Color::Cyan,

            input_border_normal: Color::Green,
            input_border_active: Color::Cyan,
            input_border_error: Color::Red,

            modal_border: Color::Green,
            warning_fg: Color::Yellow,
        }
    }

    pub fn user_text(&self) -> Style {
        Style::default().fg(self.user_bubble_fg)
    }

    pub fn ai_text(&self) -> Style {
        Style::default().fg(self.ai_bubble_fg)
    }

    pub fn source_text(&self) -> Style {
        Style::default()
            .fg(self.source_fg)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.secondary_fg)
    }
}
