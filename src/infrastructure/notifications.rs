//! Desktop alerts with conditional compilation.

use std::io::Write;

use crate::domain::ports::AlertPort;
use crate::infrastructure::config::NotificationsConfig;

const BELL: &[u8] = b"\x07";

/// Toasts through the desktop notification daemon and rings the terminal
/// bell for incoming messages.
#[derive(Debug, Clone, Default)]
pub struct DesktopAlertService {
    desktop: bool,
    sound: bool,
}

impl DesktopAlertService {
    #[must_use]
    pub const fn new(desktop: bool, sound: bool) -> Self {
        Self { desktop, sound }
    }

    #[must_use]
    pub const fn from_config(config: &NotificationsConfig) -> Self {
        Self::new(config.desktop, config.sound)
    }

    #[must_use]
    pub const fn desktop_enabled(&self) -> bool {
        self.desktop && cfg!(feature = "notify")
    }

    #[must_use]
    pub const fn sound_enabled(&self) -> bool {
        self.sound
    }

    fn ring(out: &mut impl Write) {
        if let Err(e) = out.write_all(BELL).and_then(|()| out.flush()) {
            tracing::debug!(error = %e, "Failed to ring terminal bell");
        }
    }
}

impl AlertPort for DesktopAlertService {
    fn play_message_sound(&self) {
        if self.sound {
            Self::ring(&mut std::io::stderr());
        }
    }

    fn show(&self, title: &str, body: &str) {
        if !self.desktop {
            return;
        }
        show_desktop(title, body);
    }
}

#[cfg(feature = "notify")]
fn show_desktop(title: &str, body: &str) {
    use notify_rust::Notification;

    let title = title.to_string();
    let body = body.to_string();

    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("No runtime available for desktop notification");
        return;
    };
    handle.spawn_blocking(move || {
        if let Err(e) = Notification::new()
            .summary(&title)
            .body(&body)
            .appname("marketchat")
            .show()
        {
            tracing::warn!(error = %e, "Failed to show notification");
        }
    });
}

#[cfg(not(feature = "notify"))]
fn show_desktop(title: &str, _body: &str) {
    tracing::debug!(title, "Desktop notifications not compiled in");
}
