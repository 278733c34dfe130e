//! Event / non-event labeling of windows

use crate::windows::Window;
use chrono::NaiveDateTime;
use ecog_core::EventSet;
use std::fmt;

/// Class of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowLabel {
    NonEvent,
    Event,
}

impl WindowLabel {
    pub fn from_overlap(overlaps: bool) -> Self {
        if overlaps {
            WindowLabel::Event
        } else {
            WindowLabel::NonEvent
        }
    }

    /// Key of the class in the output dataset
    pub fn tag(self) -> &'static str {
        match self {
            WindowLabel::NonEvent => "0",
            WindowLabel::Event => "1",
        }
    }

    pub fn is_event(self) -> bool {
        self == WindowLabel::Event
    }
}

impl fmt::Display for WindowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// True iff some event lies within `[window_start, window_end]`
pub fn is_event(window_start: NaiveDateTime, window_end: NaiveDateTime, events: &EventSet) -> bool {
    events.any_within(window_start, window_end)
}

/// Label a window against the event set
pub fn label_window(window: &Window, events: &EventSet) -> WindowLabel {
    WindowLabel::from_overlap(is_event(window.start_time, window.end_time, events))
}
