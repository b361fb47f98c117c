use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "  {prefix:>5} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches";

/// Per-batch bar for one pass over a split. The length comes from the
/// iterator's size hint; without an exact hint the bar is a spinner.
///
/// The bar draws to stderr and stays hidden when that is not a terminal.
pub(super) fn batch_bar(size_hint: (usize, Option<usize>), prefix: &str) -> ProgressBar {
    let pb = match size_hint {
        (lower, Some(upper)) if lower == upper => ProgressBar::new(upper as u64),
        _ => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_prefix(prefix.to_string());
    pb
}
