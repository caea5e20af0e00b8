//! Terminal progress bars for downloads, one bar per file.
//!
//! Consumes the [`DownloadEvent`] stream emitted by the core download pool. The
//! renderer never feeds back into the pool; dropping it only stops the bars.

use std::collections::HashMap;

use copr_fetch_core::download::DownloadEvent;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct ProgressRenderer {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl ProgressRenderer {
    pub fn new(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
        }
    }

    pub fn stderr() -> Self {
        Self::new(ProgressDrawTarget::stderr())
    }

    fn bar_style(known_length: bool) -> ProgressStyle {
        let template = if known_length {
            "{prefix:40!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {percent:>3}%"
        } else {
            "{prefix:40!} {spinner:.green} {bytes} ({bytes_per_sec})"
        };
        ProgressStyle::with_template(template)
            .map(|style| style.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    pub fn handle(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started {
                file_name,
                total_bytes,
            } => {
                let bar = match total_bytes {
                    Some(total) => ProgressBar::new(total),
                    None => ProgressBar::new_spinner(),
                };
                bar.set_style(Self::bar_style(total_bytes.is_some()));
                bar.set_prefix(file_name.clone());
                let bar = self.multi.add(bar);
                // A repeated file name replaces the earlier bar.
                if let Some(old) = self.bars.insert(file_name, bar) {
                    old.abandon();
                }
            }
            DownloadEvent::Progress {
                file_name,
                downloaded,
            } => {
                if let Some(bar) = self.bars.get(&file_name) {
                    bar.set_position(downloaded);
                }
            }
            DownloadEvent::Finished { file_name, bytes } => {
                if let Some(bar) = self.bars.remove(&file_name) {
                    bar.set_position(bytes);
                    bar.finish();
                }
            }
            DownloadEvent::Failed {
                location,
                file_name,
                error,
            } => {
                let _ = self.multi.println(format!("failed {location}: {error}"));
                if let Some(bar) = file_name.and_then(|name| self.bars.remove(&name)) {
                    bar.abandon();
                }
            }
        }
    }

    /// Render events until every sender is dropped.
    pub async fn drain(mut self, mut events: UnboundedReceiver<DownloadEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        for (_, bar) in self.bars.drain() {
            bar.abandon();
        }
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.bars.len()
    }
}
