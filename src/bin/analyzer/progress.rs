//! Progress bar for the per-issue comment fetch

use contest_analyzer::model::Issue;
use contest_analyzer::ProgressObserver;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

/// Lazily creates a bar sized to the first reported total
#[derive(Default)]
pub struct CommentProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl CommentProgress {
    fn new_bar(total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("  {spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

impl ProgressObserver for CommentProgress {
    fn on_comments_fetched(&self, issue: &Issue, done: usize, total: usize) {
        let mut bar = self.bar.lock();
        let pb = bar.get_or_insert_with(|| Self::new_bar(total));
        pb.set_message(format!("comments for issue {}", issue.number));
        pb.set_position(done as u64);
    }

    fn on_comments_finished(&self, _total: usize) {
        if let Some(pb) = self.bar.lock().take() {
            pb.finish_and_clear();
        }
    }
}
