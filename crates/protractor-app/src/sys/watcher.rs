use crate::events::AppEvent;
use async_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// Whether `event` created or changed the settings file. Editors that save by
/// renaming a temp file over it report a modify on the final name.
fn touches_settings(event: &Event, settings_path: &Path) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event.paths.iter().any(|p| p == settings_path)
}

/// Sends `SettingsReload` whenever the settings file is touched on disk.
pub async fn run_async_watcher(tx: Sender<AppEvent>, settings_path: PathBuf) {
    let settings_dir = match settings_path.parent() {
        Some(p) => p.to_path_buf(),
        None => return,
    };

    if let Err(e) = fs_err::create_dir_all(&settings_dir) {
        log::error!("Failed to create settings directory for watching: {}", e);
        return;
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to create watcher: {}", e);
            return;
        }
    };

    if let Err(e) = watcher.watch(&settings_dir, RecursiveMode::NonRecursive) {
        log::error!("Failed to watch settings directory: {}", e);
        return;
    }

    while let Ok(res) = bridge_rx.recv().await {
        match res {
            Ok(event) => {
                if !touches_settings(&event, &settings_path) {
                    continue;
                }
                log::debug!("Settings file changed: {:?}", event.kind);
                if tx.send(AppEvent::SettingsReload).await.is_err() {
                    break;
                }
            }
            Err(e) => log::error!("Watch error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RenameMode};

    #[test]
    fn test_only_settings_file_changes_count() {
        let settings = PathBuf::from("/home/u/.config/floating-protractor/settings.json");
        let other = settings.with_file_name("settings.json.swp");

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(settings.clone());
        assert!(touches_settings(&created, &settings));

        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(settings.clone());
        assert!(touches_settings(&renamed, &settings));

        let read = Event::new(EventKind::Access(AccessKind::Read)).add_path(settings.clone());
        assert!(!touches_settings(&read, &settings));

        let swap = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(other);
        assert!(!touches_settings(&swap, &settings));

        // a relative path never matches what notify reports
        let relative = PathBuf::from("settings.json");
        let changed = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(settings);
        assert!(!touches_settings(&changed, &relative));
    }
}
