//! Theme and styling for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// Theme colors and styles for the TUI.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color
    pub brand: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    /// Muted/secondary text
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            brand: Color::Rgb(115, 190, 255),
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            muted: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn brand_style(&self) -> Style {
        Style::default().fg(self.brand)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn header_style(&self) -> Style {
        Style::default().fg(self.brand).add_modifier(Modifier::BOLD)
    }

    pub fn focused_border(&self) -> Style {
        Style::default().fg(self.brand)
    }

    pub fn unfocused_border(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Color of a protocol tag in the packet table
    pub fn protocol_style(&self, protocol: &str) -> Style {
        let color = match protocol {
            "TCP" => Color::Cyan,
            "UDP" => Color::Blue,
            "DNS" | "MDNS" | "LLMNR" => Color::Magenta,
            "HTTP" => Color::Green,
            "TLS" | "QUIC" => Color::Yellow,
            "ARP" | "ICMP" | "ICMPV6" => self.muted,
            _ => return Style::default(),
        };
        Style::default().fg(color)
    }
}
