use leptos::logging::error;
use leptos::window;

/// Blocking yes/no gate and blocking notification.
pub trait Dialog {
    fn confirm(&self, prompt: &str) -> bool;
    fn alert(&self, message: &str);
}

/// The browser's own `confirm()` and `alert()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowDialog;

impl Dialog for WindowDialog {
    fn confirm(&self, prompt: &str) -> bool {
        window().confirm_with_message(prompt).unwrap_or_else(|err| {
            error!("confirm failed {err:?}");
            false
        })
    }

    fn alert(&self, message: &str) {
        if let Err(err) = window().alert_with_message(message) {
            error!("alert failed {err:?}");
        }
    }
}
