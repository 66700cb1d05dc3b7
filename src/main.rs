mod api;
mod app;
mod appointments;
mod browser;
mod chat;
mod config;
mod conversation;
mod dialog;
mod error;
mod loading;
mod message;
mod nav;
mod state;
mod store;

use app::*;
use leptos::*;

fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(|| {
        view! { <App /> }
    })
}
