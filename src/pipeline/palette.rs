//! Render-count colors

/// Color used when render counting is off
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#00BCD4";

/// Ten steps from cold (rendered once) to warm (rendered ten times or more)
pub const HEAT_COLORS: [&str; 10] = [
    "#4FC3F7", "#4DD0E1", "#4DB6AC", "#81C784", "#AED581", "#DCE775", "#FFF176", "#FFD54F", "#FFB74D",
    "#E57373",
];

/// Maps render counts onto a fixed color ramp
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(HEAT_COLORS.iter().map(|c| c.to_string()).collect())
    }
}

impl Palette {
    /// Custom ramp; an empty ramp falls back to the default color
    pub fn new(colors: Vec<String>) -> Self {
        Self { colors }
    }

    /// Color for a render count; the index is clamped to the ramp
    pub fn color_for(&self, count: u64) -> &str {
        if self.colors.is_empty() {
            return DEFAULT_HIGHLIGHT_COLOR;
        }
        let last = self.colors.len() - 1;
        let index = (count.saturating_sub(1) as usize).min(last);
        &self.colors[index]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
