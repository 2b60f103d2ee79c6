//! Filesystem event handler for the notify watcher (hot-reload).

use arc_swap::ArcSwap;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tracing::{debug, warn};

use crate::store::DomainWeightStore;

use super::core::{reload_into, ConfigPaths};

/// Handle a single filesystem event from the notify watcher.
///
/// Events for files other than the two configuration documents are ignored.
/// A removed file keeps the current store active.
pub(super) fn handle_fs_event(
    event: &Event,
    paths: &ConfigPaths,
    current: &ArcSwap<DomainWeightStore>,
) {
    let Some(path) = event.paths.iter().find(|p| paths.contains(p)) else {
        return;
    };

    match &event.kind {
        EventKind::Create(CreateKind::File)
        | EventKind::Create(CreateKind::Any)
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Name(_))
        | EventKind::Modify(ModifyKind::Any) => {
            debug!(path = %path.display(), "configuration file changed");
            // Failure is already logged and the old store kept.
            let _ = reload_into(paths, current);
        }
        EventKind::Remove(RemoveKind::File) | EventKind::Remove(RemoveKind::Any) => {
            warn!(path = %path.display(), "configuration file removed, keeping current store");
        }
        _ => {}
    }
}
