//! Cross-platform notification and sound support
//! Currently only macOS shows real notifications; other platforms log them

use super::{AudioSink, Notification, NotificationSink};
use crate::domain::Category;
use std::collections::HashSet;
#[cfg(not(target_os = "macos"))]
use std::io::Write;
use std::sync::Mutex;
#[cfg(target_os = "macos")]
use std::process::Command;
use tracing::info;
#[cfg(target_os = "macos")]
use tracing::warn;

/// Desktop notifier backed by `osascript` on macOS
///
/// macOS offers no way to retract a notification posted from a script, so
/// dismissal only forgets the id; it still reports whether it was shown.
/// Sticky notifications are never dismissed by the app and are not tracked.
#[derive(Debug, Default)]
pub struct DesktopNotifier {
    shown: Mutex<HashSet<String>>,
}

impl NotificationSink for DesktopNotifier {
    fn show(&self, id: &str, notification: &Notification) -> anyhow::Result<()> {
        #[cfg(target_os = "macos")]
        {
            let script = format!(
                r#"display notification "{}" with title "{}""#,
                escape_applescript(&notification.message),
                escape_applescript(&notification.title)
            );

            // Reaped in the background; `show` does not wait for osascript.
            let child = tokio::process::Command::new("osascript")
                .arg("-e")
                .arg(&script)
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::piped())
                .spawn()?;
            let id = id.to_string();
            tokio::spawn(async move {
                match child.wait_with_output().await {
                    Ok(output) if !output.status.success() => warn!(
                        id = %id,
                        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                        "osascript failed"
                    ),
                    Ok(_) => {}
                    Err(err) => warn!(id = %id, error = %err, "osascript did not finish"),
                }
            });
        }

        info!(
            id,
            title = %notification.title,
            message = %notification.message,
            urgency = ?notification.urgency,
            "notification shown"
        );
        if !notification.requires_dismissal {
            self.shown
                .lock()
                .map_err(|_| anyhow::anyhow!("notifier state poisoned"))?
                .insert(id.to_string());
        }
        Ok(())
    }

    fn dismiss(&self, id: &str) -> anyhow::Result<bool> {
        let was_shown = self
            .shown
            .lock()
            .map_err(|_| anyhow::anyhow!("notifier state poisoned"))?
            .remove(id);
        if was_shown {
            info!(id, "notification cleared");
        }
        Ok(was_shown)
    }
}

#[cfg(target_os = "macos")]
fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Plays system sounds with `afplay` on macOS, rings the terminal bell elsewhere
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSound;

impl SystemSound {
    /// macOS system sound for a category
    pub fn sound_file(category: Category) -> &'static str {
        match category {
            Category::TaskReminder => "/System/Library/Sounds/Glass.aiff",
            Category::PhaseWorkStarted => "/System/Library/Sounds/Hero.aiff",
            Category::PhaseBreakStarted => "/System/Library/Sounds/Ping.aiff",
        }
    }
}

impl AudioSink for SystemSound {
    fn play(&self, category: Category) -> anyhow::Result<()> {
        #[cfg(target_os = "macos")]
        {
            let status = Command::new("afplay")
                .arg(Self::sound_file(category))
                .status()?;
            if !status.success() {
                anyhow::bail!("afplay exited with {}", status);
            }
        }

        #[cfg(not(target_os = "macos"))]
        {
            let _ = Self::sound_file(category);
            let mut stderr = std::io::stderr();
            stderr.write_all(b"\x07")?;
            stderr.flush()?;
        }

        Ok(())
    }
}
