use leptos::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Chat,
    Admin,
}

impl Page {
    pub fn label(self) -> &'static str {
        match self {
            Page::Chat => "Chat",
            Page::Admin => "Appointments",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Page::Chat => Page::Admin,
            Page::Admin => Page::Chat,
        }
    }
}

#[component]
pub fn Nav(current: ReadSignal<Page>, set_current: WriteSignal<Page>) -> impl IntoView {
    view! {
        <nav class="flex flex-row items-center gap-2 px-4 py-2 border-b-2 dark:border-gray-800 dark:text-white">
            <h5 class="text-base font-semibold text-gray-500 uppercase dark:text-gray-400 grow">
                MediBook Clinic
            </h5>
            <button
                type="button"
                class="text-white bg-gray-800 hover:bg-gray-900 focus:outline-none focus:ring-4 focus:ring-gray-300 font-medium rounded-lg text-sm px-5 py-2.5 dark:bg-gray-800 dark:hover:bg-gray-700 dark:focus:ring-gray-700 dark:border-gray-700"
                on:click=move |_| set_current.update(|view| *view = view.toggled())
            >
                {move || current.get().toggled().label()}
            </button>
        </nav>
    }
}
