use crate::api::HttpBackend;
use crate::browser::{AppointmentBrowser, BrowserState, Filter};
use crate::dialog::WindowDialog;
use crate::loading::Loading;
use crate::state::Appointment;
use chrono::Local;
use leptos::leptos_dom::ev::SubmitEvent;
use leptos::*;
use std::rc::Rc;

type Browser = AppointmentBrowser<HttpBackend, RwSignal<BrowserState>>;

fn cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

#[component]
fn Row(appointment: Appointment, browser: Rc<Browser>) -> impl IntoView {
    let id = appointment.id.clone();
    let delete = move |_| {
        let browser = browser.clone();
        let id = id.clone();
        spawn_local(async move {
            browser.delete(&id, &WindowDialog).await;
        });
    };
    view! {
        <tr class="bg-white border-b dark:bg-gray-800 dark:border-gray-700">
            <td class="px-4 py-2 font-mono text-xs">{appointment.id.clone()}</td>
            <td class="px-4 py-2">{cell(&appointment.patient_name)}</td>
            <td class="px-4 py-2">{cell(&appointment.patient_phone)}</td>
            <td class="px-4 py-2">{cell(&appointment.date)}</td>
            <td class="px-4 py-2">{cell(&appointment.time)}</td>
            <td class="px-4 py-2">{cell(&appointment.duration)}</td>
            <td class="px-4 py-2">{cell(&appointment.reason)}</td>
            <td class="px-4 py-2">{cell(&appointment.doctor)}</td>
            <td class="px-4 py-2">{cell(&appointment.status)}</td>
            <td class="px-4 py-2">
                <button
                    type="button"
                    class="text-red-600 hover:underline dark:text-red-400"
                    on:click=delete
                >
                    Delete
                </button>
            </td>
        </tr>
    }
}

#[component]
pub fn Appointments(backend: HttpBackend) -> impl IntoView {
    let state = create_rw_signal(BrowserState::default());
    let browser: Rc<Browser> = Rc::new(AppointmentBrowser::new(backend, state));

    {
        let browser = browser.clone();
        spawn_local(async move {
            browser.reload(&WindowDialog).await;
        });
    }

    let run = {
        let browser = browser.clone();
        move |action: Action| {
            let browser = browser.clone();
            spawn_local(async move {
                match action {
                    Action::Reload => browser.reload(&WindowDialog).await,
                    Action::Search => browser.search(&WindowDialog).await,
                    Action::Cleanup => {
                        browser.cleanup(&WindowDialog).await;
                    }
                    Action::Health => browser.check_health(&WindowDialog).await,
                }
            });
        }
    };

    let search = {
        let run = run.clone();
        move |ev: SubmitEvent| {
            ev.prevent_default();
            run(Action::Search);
        }
    };
    let update_search = {
        let browser = browser.clone();
        move |ev| browser.set_search(event_target_value(&ev))
    };
    let filters = {
        let browser = browser.clone();
        move || {
            let current = state.with(|state| state.filter);
            Filter::ALL
                .into_iter()
                .map(|filter| {
                    let browser = browser.clone();
                    let tone = if filter == current {
                        "bg-blue-600 text-white"
                    } else {
                        "bg-gray-100 text-gray-700 dark:bg-gray-700 dark:text-gray-200"
                    };
                    view! {
                        <button
                            type="button"
                            class=format!("px-3 py-1.5 text-sm rounded-lg {tone}")
                            on:click=move |_| browser.set_filter(filter)
                        >
                            {filter.label()}
                        </button>
                    }
                })
                .collect::<Vec<_>>()
        }
    };
    let rows = move || {
        let now = Local::now().naive_local();
        state
            .with(|state| state.visible(now))
            .into_iter()
            .map(|appointment| {
                view! { <Row appointment browser=browser.clone() /> }
            })
            .collect::<Vec<_>>()
    };
    let counts = move || {
        state.with(|state| {
            format!(
                "{} shown of {}",
                state.visible(Local::now().naive_local()).len(),
                state.appointments.len()
            )
        })
    };
    let reload = run.clone();
    let cleanup = run.clone();
    let health = run.clone();
    let recheck = run;

    view! {
        <div class="h-dvh max-h-dvh grow flex flex-col w-full overflow-auto p-4 gap-4 dark:text-white">
            <div class="flex flex-wrap items-center gap-2">
                <h2 class="text-base font-semibold text-gray-700 dark:text-gray-200 grow">
                    Appointments
                </h2>
                <button
                    type="button"
                    class="text-sm px-3 py-1.5 rounded-lg bg-gray-800 text-white hover:bg-gray-900"
                    on:click=move |_| reload(Action::Reload)
                >
                    Reload
                </button>
                <button
                    type="button"
                    class="text-sm px-3 py-1.5 rounded-lg bg-gray-800 text-white hover:bg-gray-900"
                    on:click=move |_| cleanup(Action::Cleanup)
                >
                    Remove past appointments
                </button>
                <button
                    type="button"
                    class="text-sm px-3 py-1.5 rounded-lg bg-gray-800 text-white hover:bg-gray-900"
                    on:click=move |_| health(Action::Health)
                >
                    Check backend
                </button>
            </div>
            <form class="flex gap-2" on:submit=search>
                <input
                    class="block p-2 w-64 text-sm text-gray-900 bg-white rounded-lg border border-gray-300 dark:bg-gray-800 dark:border-gray-600 dark:text-white"
                    placeholder="Search by phone number"
                    on:input=update_search
                    prop:value=move || state.with(|state| state.search.clone())
                />
                <button
                    type="submit"
                    class="text-sm px-3 py-1.5 rounded-lg bg-blue-600 text-white hover:bg-blue-700"
                >
                    Search
                </button>
            </form>
            <div class="flex gap-2">{filters}</div>
            {move || {
                state
                    .with(|state| state.error.clone())
                    .map(|error| {
                        let recheck = recheck.clone();
                        view! {
                            <div class="flex items-center justify-between p-3 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400">
                                <span>{error}</span>
                                <button
                                    type="button"
                                    class="underline"
                                    on:click=move |_| recheck(Action::Health)
                                >
                                    Check connection
                                </button>
                            </div>
                        }
                    })
            }}
            {move || {
                state
                    .with(|state| state.loading)
                    .then(|| view! { <Loading label="Loading appointments..." /> })
            }}
            <span class="text-xs text-gray-500 dark:text-gray-400">{counts}</span>
            <table class="w-full text-sm text-left text-gray-500 dark:text-gray-400">
                <thead class="text-xs text-gray-700 uppercase bg-gray-50 dark:bg-gray-700 dark:text-gray-400">
                    <tr>
                        <th class="px-4 py-2">Id</th>
                        <th class="px-4 py-2">Patient</th>
                        <th class="px-4 py-2">Phone</th>
                        <th class="px-4 py-2">Date</th>
                        <th class="px-4 py-2">Time</th>
                        <th class="px-4 py-2">Duration</th>
                        <th class="px-4 py-2">Reason</th>
                        <th class="px-4 py-2">Doctor</th>
                        <th class="px-4 py-2">Status</th>
                        <th class="px-4 py-2"></th>
                    </tr>
                </thead>
                <tbody>{rows}</tbody>
            </table>
        </div>
    }
}

#[derive(Clone, Copy)]
enum Action {
    Reload,
    Search,
    Cleanup,
    Health,
}
