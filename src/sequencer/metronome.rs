// Metronome - Accent clicks derived from the step position within a row
// Sound rendering is left to the tone generator capability

/// Metronome click type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickType {
    /// Click on the first step of the row (downbeat)
    Accent,
    /// Click on other accented steps
    Regular,
}

impl ClickType {
    /// Click velocity, louder on the downbeat
    pub fn velocity(&self) -> f32 {
        match self {
            ClickType::Accent => 0.6,
            ClickType::Regular => 0.2,
        }
    }
}

/// Decide whether a step position within its row gets a click
///
/// `metro_idx` is the step index modulo the row length; clicks land every
/// `interval` steps, with the downbeat accented.
pub fn click_for(metro_idx: usize, interval: usize) -> Option<ClickType> {
    if interval == 0 || metro_idx % interval != 0 {
        None
    } else if metro_idx == 0 {
        Some(ClickType::Accent)
    } else {
        Some(ClickType::Regular)
    }
}
