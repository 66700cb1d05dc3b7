use crate::api::HttpBackend;
use crate::chat::{ConversationManager, ConversationState};
use crate::config::{new_session_id, MAX_MESSAGE_LEN};
use crate::dialog::WindowDialog;
use crate::loading::Loading;
use crate::message::Message;
use crate::state::Message as Msg;
use chrono::Utc;
use leptos::leptos_dom::ev::SubmitEvent;
use leptos::logging::log;
use leptos::*;
use std::rc::Rc;

type Manager = ConversationManager<HttpBackend, RwSignal<ConversationState>>;

/// The log alone, so typing into the draft does not re-render it.
fn message_log(state: RwSignal<ConversationState>) -> Memo<Vec<Msg>> {
    create_memo(move |_| state.with(|state| state.messages.clone()))
}

#[component]
pub fn Conversation(backend: HttpBackend) -> impl IntoView {
    let state = create_rw_signal(ConversationState::new(Utc::now()));
    let session_id = new_session_id(Utc::now());
    log!("Chat session {session_id}");
    let manager: Rc<Manager> = Rc::new(ConversationManager::new(backend, state, session_id));

    let pending = create_memo(move |_| state.with(|state| state.pending));
    let messages = message_log(state);
    let draft = move || state.with(|state| state.draft.clone());

    let update_message = {
        let manager = manager.clone();
        move |ev| manager.set_draft(event_target_value(&ev))
    };
    let send_message = {
        let manager = manager.clone();
        move |ev: SubmitEvent| {
            ev.prevent_default();
            let manager = manager.clone();
            spawn_local(async move {
                manager.send_message().await;
            });
        }
    };
    let clear = move |_| {
        let manager = manager.clone();
        spawn_local(async move {
            manager.clear_conversation(&WindowDialog).await;
        });
    };

    view! {
        <div class="h-dvh max-h-dvh grow flex flex-col scrollbar w-full">
            <header class="flex items-center justify-between px-4 py-2 border-b dark:border-gray-700">
                <h2 class="text-base font-semibold text-gray-700 dark:text-gray-200">
                    Appointment assistant
                </h2>
                <button
                    type="button"
                    class="text-sm text-gray-500 rounded-lg px-3 py-1.5 hover:bg-gray-100 dark:text-gray-400 dark:hover:bg-gray-700"
                    on:click=clear
                >
                    Clear conversation
                </button>
            </header>
            <main class="grow flex flex-col-reverse overflow-auto max-h-screen">
                {move || {
                    pending.get().then(|| view! { <Loading label="Assistant is typing..." /> })
                }}
                <div>
                    {move || {
                        messages
                            .get()
                            .into_iter()
                            .map(|message| {
                                view! { <Message message=message /> }
                            })
                            .collect::<Vec<_>>()
                    }}
                </div>
            </main>
            <form class="w-full" on:submit=send_message>
                <label for="chat" class="sr-only">
                    Your message
                </label>
                <div class="flex items-center px-3 py-2 bg-gray-50 dark:bg-gray-700">
                    <input
                        id="chat"
                        class="block mx-4 p-2.5 w-full text-sm text-gray-900 bg-white rounded-lg border border-gray-300 focus:ring-blue-500 focus:border-blue-500 dark:bg-gray-800 dark:border-gray-600 dark:placeholder-gray-400 dark:text-white dark:focus:ring-blue-500 dark:focus:border-blue-500"
                        placeholder="Type your message..."
                        maxlength=MAX_MESSAGE_LEN.to_string()
                        on:input=update_message
                        prop:value=draft
                    />
                    <button
                        type="submit"
                        class="inline-flex justify-center p-2 text-blue-600 rounded-full cursor-pointer hover:bg-blue-100 disabled:opacity-50 disabled:cursor-not-allowed dark:text-blue-500 dark:hover:bg-gray-600"
                        prop:disabled=move || pending.get()
                    >
                        <svg
                            class="w-5 h-5 rotate-90 rtl:-rotate-90"
                            aria-hidden="true"
                            xmlns="http://www.w3.org/2000/svg"
                            fill="currentColor"
                            viewBox="0 0 18 20"
                        >
                            <path d="m17.914 18.594-8-18a1 1 0 0 0-1.828 0l-8 18a1 1 0 0 0 1.157 1.376L8 18.281V9a1 1 0 0 1 2 0v9.281l6.758 1.689a1 1 0 0 0 1.156-1.376Z" />
                        </svg>
                        <span class="sr-only">Send message</span>
                    </button>
                </div>
            </form>
        </div>
    }
}
