use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Result as NotifyResult, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// 감시 중인 파일의 변경 이벤트
#[derive(Debug, PartialEq, Clone)]
pub enum FileEvent {
    Modified(PathBuf),
    Created(PathBuf),
    Deleted(PathBuf),
}

/// 파일 하나를 감시하는 notify 래퍼
///
/// 값이 drop되면 감시도 멈춥니다.
pub struct FileWatcher {
    path: PathBuf,
    event_tx: mpsc::Sender<FileEvent>,
    event_rx: mpsc::Receiver<FileEvent>,
    watcher: Option<RecommendedWatcher>,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            path: path.into(),
            event_tx,
            event_rx,
            watcher: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn sender(&self) -> mpsc::Sender<FileEvent> {
        self.event_tx.clone()
    }

    pub fn start(&mut self) -> NotifyResult<()> {
        let event_tx = self.event_tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: NotifyResult<Event>| match res {
            Ok(event) => {
                use notify::EventKind::*;

                for path in event.paths {
                    let mapped = match event.kind {
                        Modify(_) => FileEvent::Modified(path),
                        Create(_) => FileEvent::Created(path),
                        Remove(_) => FileEvent::Deleted(path),
                        _ => continue,
                    };
                    debug!(event = ?mapped, "파일 이벤트");
                    let _ = event_tx.blocking_send(mapped);
                }
            }
            Err(e) => error!("감시 오류: {}", e),
        })?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// 다음 이벤트를 기다립니다.
    pub async fn next_event(&mut self) -> Option<FileEvent> {
        self.event_rx.recv().await
    }
}
