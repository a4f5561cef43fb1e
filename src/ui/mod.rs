//! UI module - console presentation of session events and history

mod console;
mod history_view;
mod notifications;

pub use console::{Command, Console};
pub use history_view::{
    count_label, relative_age, render_history, verdict_badge, verdict_summary, verdict_title,
};
pub use notifications::{
    spawn_notifier, ConsoleSink, Notification, NotificationSink, OutputFormat, Tone,
};
