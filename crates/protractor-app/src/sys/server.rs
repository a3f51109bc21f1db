use crate::events::AppEvent;
use async_channel::Sender;
use protractor::config::{ConfigRecord, Mode};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

const SOCKET_PATH: &str = "/tmp/floating-protractor.sock";

/// Parses one control line, e.g. `activate` or `mode multi 5`.
pub fn parse_command(line: &str) -> Option<AppEvent> {
    let mut words = line.split_whitespace();
    let event = match words.next()? {
        "activate" => AppEvent::Activate,
        "deactivate" => AppEvent::Deactivate,
        "clear" => AppEvent::Clear,
        "settings" => AppEvent::OpenSettings,
        "reload" => AppEvent::SettingsReload,
        "mode" => {
            let mode: Mode = words.next()?.parse().ok()?;
            let mut record = ConfigRecord::new().with("mode", mode.to_string());
            if mode == Mode::Multi
                && let Some(count) = words.next()
            {
                record = record.with("multi_sector_count", count.parse::<u32>().ok()?);
            }
            AppEvent::Apply(record)
        }
        _ => return None,
    };
    words.next().is_none().then_some(event)
}

pub async fn run_server(tx: Sender<AppEvent>) {
    // Cleanup old socket if it exists
    if fs_err::metadata(SOCKET_PATH).is_ok() {
        let _ = fs_err::remove_file(SOCKET_PATH);
    }

    let listener = match UnixListener::bind(SOCKET_PATH) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind unix socket: {}", e);
            return;
        }
    };
    log::info!("Listening for commands on {}", SOCKET_PATH);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let tx = tx.clone();
                tokio::spawn(handle_client(stream, tx));
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_client(stream: UnixStream, tx: Sender<AppEvent>) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let reply = match parse_command(&line) {
            Some(event) => {
                if tx.send(event).await.is_err() {
                    return;
                }
                "ok\n".to_string()
            }
            None => {
                log::warn!("Unknown command: {:?}", line.trim());
                format!("error: unknown command {:?}\n", line.trim())
            }
        };
        if writer.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn applied(line: &str) -> ConfigRecord {
        match parse_command(line) {
            Some(AppEvent::Apply(record)) => record,
            other => panic!("expected Apply for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_simple_commands() {
        assert!(matches!(parse_command("activate"), Some(AppEvent::Activate)));
        assert!(matches!(parse_command("  clear \n"), Some(AppEvent::Clear)));
        assert!(matches!(parse_command("settings"), Some(AppEvent::OpenSettings)));
        assert!(parse_command("").is_none());
        assert!(parse_command("activate now").is_none());
        assert!(parse_command("explode").is_none());
    }

    #[test]
    fn test_mode_commands() {
        let record = applied("mode site_audit");
        assert_eq!(record.get("mode"), Some(&json!("SITE_AUDIT")));
        assert!(!record.contains_key("multi_sector_count"));

        let record = applied("mode MULTI 5");
        assert_eq!(record.get("mode"), Some(&json!("MULTI")));
        assert_eq!(record.get("multi_sector_count"), Some(&json!(5)));

        assert!(parse_command("mode sideways").is_none());
        assert!(parse_command("mode multi many").is_none());
        assert!(parse_command("mode normal 4").is_none());
    }
}
