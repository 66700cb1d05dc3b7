use crate::api::HttpBackend;
use crate::appointments::Appointments;
use crate::config::Config;
use crate::conversation::Conversation;
use crate::nav::{Nav, Page};
use leptos::*;

#[component]
pub fn App() -> impl IntoView {
    let search = window().location().search().unwrap_or_default();
    let config = Config::load(&search);
    let backend = HttpBackend::new(&config);

    let (current, set_current) = create_signal(Page::Chat);

    view! {
        <div class="flex flex-col min-h-dvh">
            <Nav current set_current />
            {move || {
                let backend = backend.clone();
                match current.get() {
                    Page::Chat => view! { <Conversation backend /> }.into_view(),
                    Page::Admin => view! { <Appointments backend /> }.into_view(),
                }
            }}
        </div>
    }
}
