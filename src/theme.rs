use ratatui::style::Color;
use std::sync::LazyLock;

// Color palette structure
#[derive(Clone)]
pub struct Base16Palette {
    pub base_00: Color, // Background
    pub base_01: Color, // Lighter background
    pub base_02: Color, // Selection background
    pub base_03: Color, // Comments, invisibles
    pub base_04: Color, // Dark foreground
    pub base_05: Color, // Default foreground
    pub base_06: Color, // Light foreground
    pub base_07: Color, // Light background
    pub base_08: Color, // Red
    pub base_09: Color, // Orange
    pub base_0a: Color, // Yellow
    pub base_0b: Color, // Green
    pub base_0c: Color, // Cyan
    pub base_0d: Color, // Blue
    pub base_0e: Color, // Purple
    pub base_0f: Color, // Brown
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ThemeId {
    #[default]
    OceanicNext,
    CatppuccinMocha,
}

impl ThemeId {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeId::OceanicNext => "Oceanic Next",
            ThemeId::CatppuccinMocha => "Catppuccin Mocha",
        }
    }

    pub fn all() -> &'static [ThemeId] {
        &[ThemeId::OceanicNext, ThemeId::CatppuccinMocha]
    }

    /// Resolve a persisted theme name; unknown names fall back to the
    /// default so a hand-edited store can't break startup.
    pub fn from_name(name: &str) -> Self {
        ThemeId::all()
            .iter()
            .copied()
            .find(|id| id.name() == name)
            .unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        match self {
            ThemeId::OceanicNext => ThemeId::CatppuccinMocha,
            ThemeId::CatppuccinMocha => ThemeId::OceanicNext,
        }
    }

    pub fn palette(&self) -> &'static Base16Palette {
        match self {
            ThemeId::OceanicNext => &OCEANIC_NEXT_PALETTE,
            ThemeId::CatppuccinMocha => &CATPPUCCIN_MOCHA_PALETTE,
        }
    }
}

fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

// Oceanic Next theme
static OCEANIC_NEXT_PALETTE: LazyLock<Base16Palette> = LazyLock::new(|| Base16Palette {
    base_00: rgb(0x1B2B34),
    base_01: rgb(0x343D46),
    base_02: rgb(0x4F5B66),
    base_03: rgb(0x65737E),
    base_04: rgb(0xA7ADBA),
    base_05: rgb(0xC0C5CE),
    base_06: rgb(0xCDD3DE),
    base_07: rgb(0xF0F4F8),
    base_08: rgb(0xEC5F67),
    base_09: rgb(0xF99157),
    base_0a: rgb(0xFAC863),
    base_0b: rgb(0x99C794),
    base_0c: rgb(0x5FB3B3),
    base_0d: rgb(0x6699CC),
    base_0e: rgb(0xC594C5),
    base_0f: rgb(0xAB7967),
});

// Catppuccin Mocha theme
static CATPPUCCIN_MOCHA_PALETTE: LazyLock<Base16Palette> = LazyLock::new(|| Base16Palette {
    base_00: rgb(0x1E1E2E), // base - Background
    base_01: rgb(0x313244), // surface0 - Lighter background
    base_02: rgb(0x45475A), // surface1 - Selection background
    base_03: rgb(0x6C7086), // overlay0 - Comments, invisibles
    base_04: rgb(0x7F849C), // overlay1 - Dark foreground
    base_05: rgb(0xA6ADC8), // subtext0 - Default foreground
    base_06: rgb(0xCDD6F4), // text - Light foreground
    base_07: rgb(0xF5E0DC), // rosewater - Light background
    base_08: rgb(0xF38BA8), // red - Red
    base_09: rgb(0xFAB387), // peach - Orange
    base_0a: rgb(0xF9E2AF), // yellow - Yellow
    base_0b: rgb(0xA6E3A1), // green - Green
    base_0c: rgb(0x94E2D5), // teal - Cyan
    base_0d: rgb(0x89B4FA), // blue - Blue
    base_0e: rgb(0xCBA6F7), // mauve - Purple
    base_0f: rgb(0xEBA0AC), // maroon - Brown
});

// Color utilities for focus states
impl Base16Palette {
    // Get colors for focused/unfocused panels
    pub fn get_panel_colors(&self, is_focused: bool) -> (Color, Color, Color) {
        if is_focused {
            (self.base_07, self.base_04, self.base_00)
        } else {
            (self.base_03, self.base_03, self.base_00)
        }
    }

    // Get selection colors for focused/unfocused states
    pub fn get_selection_colors(&self, is_focused: bool) -> (Color, Color) {
        if is_focused {
            (self.base_02, self.base_06)
        } else {
            (self.base_02, self.base_03)
        }
    }
}
