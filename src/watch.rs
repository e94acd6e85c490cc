//! Rebuild a site when its sources change.
//!
//! The watcher does an initial cached build, then waits for file-system
//! events under the source directory. Events are collected until
//! `processing.watch_debounce_ms` passes without a new one, then a single
//! cached rebuild runs. Metadata-only changes and events under the output
//! directory are ignored, so the build's own writes never retrigger it.

use crate::config::TypographyConfig;
use crate::events::{EventKind, TypographyEvent, emit};
use crate::site::{self, BuildError, BuildEvent, BuildOptions, BuildResult};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Collects raw events until the channel has been quiet for the debounce
/// window.
struct Debouncer {
    window: Duration,
    ignore: PathBuf,
}

impl Debouncer {
    /// Whether an event should trigger a rebuild.
    fn is_relevant(&self, event: &notify::Event) -> bool {
        let kind_matters = match event.kind {
            notify::EventKind::Create(_) | notify::EventKind::Remove(_) => true,
            notify::EventKind::Modify(modify) => {
                !matches!(modify, notify::event::ModifyKind::Metadata(_))
            }
            _ => false,
        };
        kind_matters && event.paths.iter().any(|p| !p.starts_with(&self.ignore))
    }

    /// Block until a relevant event arrives, then until things settle.
    ///
    /// Returns the changed paths, or `None` once the watcher is gone.
    fn next_batch(&self, rx: &Receiver<notify::Result<notify::Event>>) -> Option<Vec<PathBuf>> {
        let mut changed = Vec::new();
        loop {
            let received = if changed.is_empty() {
                rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
            } else {
                rx.recv_timeout(self.window)
            };
            match received {
                Ok(Ok(event)) if self.is_relevant(&event) => {
                    log::debug!("change: {:?} {:?}", event.kind, event.paths);
                    for path in event.paths {
                        if !changed.contains(&path) {
                            changed.push(path);
                        }
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => log::warn!("watch error: {e}"),
                Err(RecvTimeoutError::Timeout) => return Some(changed),
                Err(RecvTimeoutError::Disconnected) => {
                    return (!changed.is_empty()).then_some(changed);
                }
            }
        }
    }
}

/// Build `source` into `output_dir`, then rebuild on every settled batch
/// of changes. Runs until the watcher stops.
///
/// `on_build` sees every build result, the first one included, with the
/// progress events that build sent.
pub fn watch(
    source: &Path,
    output_dir: &Path,
    config: &TypographyConfig,
    options: &BuildOptions,
    events: Option<Sender<TypographyEvent>>,
    mut on_build: impl FnMut(Result<BuildResult, BuildError>, Receiver<BuildEvent>),
) -> Result<(), WatchError> {
    let run_build = |progress: Sender<BuildEvent>| {
        let options = BuildOptions {
            use_cache: true,
            ..options.clone()
        };
        site::build(source, output_dir, &options, Some(progress))
    };

    let (progress_tx, progress_rx) = mpsc::channel();
    on_build(run_build(progress_tx), progress_rx);

    let (tx, rx) = mpsc::channel();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        tx.send(res).ok();
    })?;
    watcher.watch(&std::fs::canonicalize(source)?, RecursiveMode::Recursive)?;

    let debouncer = Debouncer {
        window: Duration::from_millis(config.processing.watch_debounce_ms),
        ignore: std::fs::canonicalize(output_dir)?,
    };
    emit(
        events.as_ref(),
        EventKind::ObserverStarted,
        json!({
            "source": source.display().to_string(),
            "debounceMs": config.processing.watch_debounce_ms,
        }),
    );
    log::info!("watching {}", source.display());

    while let Some(changed) = debouncer.next_batch(&rx) {
        log::info!("{} paths changed, rebuilding", changed.len());
        let (progress_tx, progress_rx) = mpsc::channel();
        on_build(run_build(progress_tx), progress_rx);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, ModifyKind};

    fn event(kind: notify::EventKind, path: &str) -> notify::Event {
        notify::Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    fn debouncer() -> Debouncer {
        Debouncer {
            window: Duration::from_millis(20),
            ignore: PathBuf::from("/site/_out"),
        }
    }

    fn modify() -> notify::EventKind {
        notify::EventKind::Modify(ModifyKind::Data(DataChange::Any))
    }

    #[test]
    fn relevant_events() {
        let d = debouncer();
        assert!(d.is_relevant(&event(modify(), "/site/index.html")));
        assert!(d.is_relevant(&event(
            notify::EventKind::Create(CreateKind::File),
            "/site/new.md"
        )));
        assert!(!d.is_relevant(&event(
            notify::EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)),
            "/site/index.html"
        )));
        assert!(!d.is_relevant(&event(modify(), "/site/_out/index.html")));
    }

    #[test]
    fn batches_until_quiet() {
        let d = debouncer();
        let (tx, rx) = mpsc::channel();
        tx.send(Ok(event(modify(), "/site/a.html"))).unwrap();
        tx.send(Ok(event(modify(), "/site/a.html"))).unwrap();
        tx.send(Ok(event(modify(), "/site/_out/a.html"))).unwrap();
        tx.send(Ok(event(modify(), "/site/b.html"))).unwrap();

        let batch = d.next_batch(&rx).unwrap();
        assert_eq!(
            batch,
            vec![PathBuf::from("/site/a.html"), PathBuf::from("/site/b.html")]
        );

        drop(tx);
        assert_eq!(d.next_batch(&rx), None);
    }

    #[test]
    fn pending_batch_is_flushed_on_disconnect() {
        let d = debouncer();
        let (tx, rx) = mpsc::channel();
        tx.send(Ok(event(modify(), "/site/a.html"))).unwrap();
        drop(tx);
        assert_eq!(d.next_batch(&rx), Some(vec![PathBuf::from("/site/a.html")]));
    }
}
