//! Terminal progress bar fed by download progress callbacks.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use toolstash_core::DownloadProgress;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})";

/// A progress bar on stderr, or nothing when disabled.
pub struct DownloadBar {
    bar: Option<ProgressBar>,
}

impl DownloadBar {
    pub fn new(enabled: bool) -> Self {
        let bar = enabled.then(|| ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr()));
        Self { bar }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: Some(ProgressBar::hidden()),
        }
    }

    /// A callback suitable for `Fetcher::fetch`.
    pub fn observer(&self) -> impl Fn(DownloadProgress) + Send + Sync + 'static {
        let bar = self.bar.clone();
        move |progress| {
            if let Some(bar) = &bar {
                update(bar, progress);
            }
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

fn update(bar: &ProgressBar, progress: DownloadProgress) {
    match progress.total_bytes {
        Some(total) if bar.length() != Some(total) => {
            bar.set_length(total);
            bar.set_style(style(BAR_TEMPLATE));
        }
        None if bar.length().is_some() || progress.bytes_downloaded == 0 => {
            bar.unset_length();
            bar.set_style(style(SPINNER_TEMPLATE));
        }
        _ => {}
    }
    bar.set_position(progress.bytes_downloaded);
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        assert!(ProgressStyle::with_template(BAR_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(SPINNER_TEMPLATE).is_ok());
    }

    #[test]
    fn test_observer_tracks_position_and_length() {
        let bar = DownloadBar::hidden();
        let observe = bar.observer();

        observe(DownloadProgress::new(0, Some(1000)));
        observe(DownloadProgress::new(400, Some(1000)));

        let inner = bar.bar.as_ref().unwrap();
        assert_eq!(inner.length(), Some(1000));
        assert_eq!(inner.position(), 400);
        bar.finish();
    }

    #[test]
    fn test_unknown_length() {
        let bar = DownloadBar::hidden();
        let observe = bar.observer();

        observe(DownloadProgress::new(0, None));
        observe(DownloadProgress::new(2048, None));

        let inner = bar.bar.as_ref().unwrap();
        assert_eq!(inner.length(), None);
        assert_eq!(inner.position(), 2048);
    }

    #[test]
    fn test_disabled_bar_ignores_updates() {
        let bar = DownloadBar::new(false);
        bar.observer()(DownloadProgress::new(10, Some(10)));
        bar.finish();
        assert!(bar.bar.is_none());
    }
}
