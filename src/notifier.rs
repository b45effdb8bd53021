use parking_lot::Mutex;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

#[cfg(feature = "service")]
use notify_debouncer_full::{
    new_debouncer,
    notify::{
        event::{ModifyKind, RenameMode},
        Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    },
    DebounceEventResult, Debouncer, FileIdMap,
};
#[cfg(feature = "service")]
use std::time::Duration;

use crate::{error::TagbaseError, event::FileEvent};

pub type PathHandler = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// One handler per kind of file change.
#[derive(Clone)]
pub struct ChangeHandlers {
    pub on_created: PathHandler,
    pub on_changed: PathHandler,
    pub on_deleted: PathHandler,
}

impl ChangeHandlers {
    pub fn dispatch(&self, event: FileEvent) {
        match event {
            FileEvent::Created(path) => (self.on_created)(path),
            FileEvent::Changed(path) => (self.on_changed)(path),
            FileEvent::Deleted(path) => (self.on_deleted)(path),
        }
    }
}

/// A source of created/changed/deleted notifications for files under a root.
pub trait ChangeNotifier: Send {
    fn watch(&mut self, root: &Path, handlers: ChangeHandlers) -> Result<(), TagbaseError>;
    fn unwatch(&mut self) -> Result<(), TagbaseError>;
}

/// A notifier driven by its owner: events are pushed in through [`ExternalNotifier::emit`].
///
/// Clones share the same subscription, so a host can keep one clone and hand the other to the
/// service.
#[derive(Clone, Default)]
pub struct ExternalNotifier {
    handlers: Arc<Mutex<Option<ChangeHandlers>>>,
}

impl ExternalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to the subscribed handlers. Returns false if nothing is subscribed.
    pub fn emit(&self, event: FileEvent) -> bool {
        // Clone out so a handler may call back into this notifier.
        let handlers = self.handlers.lock().clone();
        match handlers {
            Some(handlers) => {
                handlers.dispatch(event);
                true
            }
            None => {
                tracing::debug!("[Watcher] No subscriber for {:?}", event);
                false
            }
        }
    }

    pub fn is_watching(&self) -> bool {
        self.handlers.lock().is_some()
    }
}

impl ChangeNotifier for ExternalNotifier {
    fn watch(&mut self, _root: &Path, handlers: ChangeHandlers) -> Result<(), TagbaseError> {
        *self.handlers.lock() = Some(handlers);
        Ok(())
    }

    fn unwatch(&mut self) -> Result<(), TagbaseError> {
        *self.handlers.lock() = None;
        Ok(())
    }
}

#[cfg(feature = "service")]
type RootWatcher = Debouncer<RecommendedWatcher, FileIdMap>;

/// File system notifications through `notify-debouncer-full`.
#[cfg(feature = "service")]
pub struct DebouncedNotifier {
    debounce: Duration,
    active: Option<(PathBuf, RootWatcher)>,
}

#[cfg(feature = "service")]
impl DebouncedNotifier {
    pub fn new(debounce: Duration) -> Self {
        DebouncedNotifier {
            debounce,
            active: None,
        }
    }
}

#[cfg(feature = "service")]
impl ChangeNotifier for DebouncedNotifier {
    fn watch(&mut self, root: &Path, handlers: ChangeHandlers) -> Result<(), TagbaseError> {
        if let Some((watched, _)) = self.active.as_ref() {
            return Err(TagbaseError::Watch(format!(
                "already watching {watched:?}; unwatch before watching {root:?}"
            )));
        }
        let mut debouncer = new_debouncer(
            self.debounce,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    tracing::debug!("[Watcher] {} debounced events", events.len());
                    for debounced in events.iter() {
                        for event in convert_event(&debounced.event) {
                            tracing::debug!("[Watcher] {:?}", event);
                            handlers.dispatch(event);
                        }
                    }
                }
                Err(errors) => {
                    tracing::error!("[Watcher] Notify debouncer returned errors: {:?}", errors);
                }
            },
        )?;
        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
        tracing::info!("[Watcher] Watching {:?}", root);
        self.active = Some((root.to_path_buf(), debouncer));
        Ok(())
    }

    fn unwatch(&mut self) -> Result<(), TagbaseError> {
        if let Some((root, mut debouncer)) = self.active.take() {
            let unwatch_res = debouncer.watcher().unwatch(&root);
            tracing::debug!("[Watcher] Unwatch({:?}) = {:?}", root, unwatch_res);
            unwatch_res?;
        }
        Ok(())
    }
}

/// Map a raw notify event to the created/changed/deleted vocabulary. A rename is a deletion of
/// the old path and a creation of the new one.
#[cfg(feature = "service")]
pub fn convert_event(event: &Event) -> Vec<FileEvent> {
    let paths = event.paths.iter().cloned();
    match event.kind {
        EventKind::Create(_) => paths.map(FileEvent::Created).collect(),
        EventKind::Remove(_) => paths.map(FileEvent::Deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(FileEvent::Deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.map(FileEvent::Created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to, ..] => vec![
                FileEvent::Deleted(from.clone()),
                FileEvent::Created(to.clone()),
            ],
            _ => paths.map(FileEvent::Changed).collect(),
        },
        EventKind::Modify(_) => paths.map(FileEvent::Changed).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
