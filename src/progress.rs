//! Progress bars for batch conversions.

use indicatif::{ProgressBar, ProgressStyle};

/// A counting bar on stderr; hidden automatically when stderr is not a terminal.
pub(crate) fn progress_bar(len: usize, label: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(label);
    pb
}
