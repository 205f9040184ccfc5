mod engine;

pub use engine::{TimerEngine, TimerState};

/// Render whole seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
