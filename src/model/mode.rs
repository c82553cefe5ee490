/// Application interaction modes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Normal mode — list navigation and toggling.
    #[default]
    Normal,
    /// Fuzzy provider filter overlay.
    Filter,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Filter => "FILTER",
        }
    }
}
