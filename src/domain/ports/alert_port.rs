/// Port for user-facing alerts raised by incoming activity.
pub trait AlertPort: Send + Sync {
    /// Short audible cue for a message from someone else.
    fn play_message_sound(&self);

    /// Desktop toast.
    fn show(&self, title: &str, body: &str);
}

/// Alert sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlerts;

impl AlertPort for SilentAlerts {
    fn play_message_sound(&self) {}

    fn show(&self, _title: &str, _body: &str) {}
}
