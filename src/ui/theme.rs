use crate::config::ThemeConfig;
use ratatui::style::{Color, Modifier, Style};

/// Resolved terminal colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub accent: Color,
    pub header: Color,
    pub user: Color,
    pub bot: Color,
    pub error: Color,
    pub muted: Color,
}

impl Theme {
    /// Resolve a theme config, keeping the default for any color that does not parse
    pub fn from_config(config: &ThemeConfig) -> Self {
        let defaults = ThemeConfig::default();
        let pick = |name: &str, value: &str, fallback: &str| {
            parse_hex_color(value).unwrap_or_else(|| {
                log::warn!("Ignoring invalid {} {:?}", name, value);
                parse_hex_color(fallback).unwrap_or(Color::Reset)
            })
        };

        Theme {
            accent: pick("accent_color", &config.accent_color, &defaults.accent_color),
            header: pick("header_color", &config.header_color, &defaults.header_color),
            user: pick("user_color", &config.user_color, &defaults.user_color),
            bot: pick("bot_color", &config.bot_color, &defaults.bot_color),
            error: pick("error_color", &config.error_color, &defaults.error_color),
            muted: pick("muted_color", &config.muted_color, &defaults.muted_color),
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(Color::White)
            .bg(self.header)
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_config(&ThemeConfig::default())
    }
}

/// Parse `#rrggbb` or `#rgb`
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some(Color::Rgb(digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}
