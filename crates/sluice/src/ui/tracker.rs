use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use sluice_fetch::Progress;

const PB_STYLE: &str =
    "{spinner:.blue} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const SPINNER_STYLE: &str = "{spinner:.blue} [{elapsed_precise}] {bytes} ({bytes_per_sec})";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

static SPINNER_TEMPLATE: Lazy<Option<ProgressStyle>> =
    Lazy::new(|| ProgressStyle::with_template(SPINNER_STYLE).ok().map(|s| s.tick_chars(TICK)));

/// Terminal progress bar fed by download progress callbacks.
///
/// Starts as a spinner and switches to a bar once a total length is known;
/// chunked downloads stay a spinner.
#[derive(Clone)]
pub struct ProgressTracker {
    pub pb: ProgressBar,
}

#[derive(Debug, Clone)]
pub struct ProgressTrackerConfig {
    pub len: Option<u64>,
}

impl ProgressTracker {
    pub fn new(ctx: ProgressTrackerConfig) -> Self {
        let tracker = ProgressTracker {
            pb: ProgressBar::no_length(),
        };
        if let Some(len) = ctx.len {
            tracker.set_total(len);
        } else if let Some(style) = SPINNER_TEMPLATE.as_ref() {
            tracker.pb.set_style(style.clone());
        }
        tracker
    }

    fn set_total(&self, len: u64) {
        self.pb.set_length(len);
        if let Some(style) = PB_TEMPLATE.as_ref() {
            self.pb.set_style(style.clone());
        }
    }

    pub fn update(&self, progress: &Progress) {
        if let Some(total) = progress.total_bytes {
            if self.pb.length() != Some(total) {
                self.set_total(total);
            }
        }
        self.pb.set_position(progress.completed_bytes);
    }

    pub fn finish(&self, msg: Option<String>) {
        match msg {
            Some(msg) => self.pb.finish_with_message(msg),
            None => self.pb.finish(),
        }
    }

    pub fn abandon(&self) {
        self.pb.abandon();
    }
}
