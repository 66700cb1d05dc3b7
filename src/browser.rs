//! Admin view over the backend's appointment records.
//!
//! Every mutation is followed by a full reload, so the list never holds
//! anything the backend did not just return.

use crate::api::AppointmentBackend;
use crate::dialog::Dialog;
use crate::error::ApiError;
use crate::state::{parse_local, Appointment};
use crate::store::Store;
use chrono::NaiveDateTime;
use leptos::logging::{error, log};

pub const CONFIRM_DELETE: &str = "Delete this appointment?";
pub const CONFIRM_CLEANUP: &str = "Remove all past appointments?";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Today,
    Upcoming,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Today, Filter::Upcoming];

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Today => "Today",
            Filter::Upcoming => "Upcoming",
        }
    }

    /// Matches on the record's creation time against local `now`.
    pub fn matches(self, appointment: &Appointment, now: NaiveDateTime) -> bool {
        let created = || appointment.created_at.as_deref().and_then(parse_local);
        match self {
            Filter::All => true,
            Filter::Today => created().is_some_and(|created| created.date() == now.date()),
            Filter::Upcoming => created().is_some_and(|created| created >= now),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowserState {
    pub appointments: Vec<Appointment>,
    /// Also the gate for mutations: nothing new starts while it is set.
    pub loading: bool,
    pub error: Option<String>,
    pub filter: Filter,
    pub search: String,
}

impl BrowserState {
    pub fn visible(&self, now: NaiveDateTime) -> Vec<Appointment> {
        self.appointments
            .iter()
            .filter(|appointment| self.filter.matches(appointment, now))
            .cloned()
            .collect()
    }
}

struct LoadingGuard<'a, S: Store<BrowserState>> {
    store: &'a S,
}

impl<S: Store<BrowserState>> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        self.store.write(|state| state.loading = false);
    }
}

pub struct AppointmentBrowser<B, S> {
    backend: B,
    store: S,
}

impl<B, S> AppointmentBrowser<B, S>
where
    B: AppointmentBackend,
    S: Store<BrowserState>,
{
    pub fn new(backend: B, store: S) -> Self {
        Self { backend, store }
    }

    pub fn set_filter(&self, filter: Filter) {
        self.store.write(|state| state.filter = filter);
    }

    pub fn set_search(&self, search: String) {
        self.store.write(|state| state.search = search);
    }

    fn start(&self) -> Option<LoadingGuard<'_, S>> {
        let started = self.store.write(|state| {
            if state.loading {
                false
            } else {
                state.loading = true;
                state.error = None;
                true
            }
        })?;
        started.then(|| LoadingGuard { store: &self.store })
    }

    fn fail(&self, err: &ApiError, dialog: &impl Dialog) {
        error!("Appointment request failed: {err}");
        let message = err.user_message();
        dialog.alert(&message);
        self.store.write(|state| state.error = Some(message));
    }

    async fn fetch(&self, phone: Option<&str>, dialog: &impl Dialog) {
        let result = match phone {
            Some(phone) => self.backend.appointments_by_phone(phone).await,
            None => self.backend.appointments().await,
        };
        match result {
            Ok(appointments) => {
                log!("Loaded {} appointments", appointments.len());
                self.store.write(|state| state.appointments = appointments);
            }
            Err(err) => self.fail(&err, dialog),
        }
    }

    /// Full list. Ignored while another request is running.
    pub async fn reload(&self, dialog: &impl Dialog) {
        let Some(_loading) = self.start() else {
            return;
        };
        self.fetch(None, dialog).await;
    }

    /// Records for one phone number; a blank term reloads everything.
    pub async fn search(&self, dialog: &impl Dialog) {
        let term = self
            .store
            .read(|state| state.search.trim().to_string())
            .unwrap_or_default();
        let Some(_loading) = self.start() else {
            return;
        };
        if term.is_empty() {
            self.fetch(None, dialog).await;
        } else {
            self.fetch(Some(&term), dialog).await;
        }
    }

    pub async fn delete(&self, id: &str, dialog: &impl Dialog) -> bool {
        self.mutate(CONFIRM_DELETE, dialog, || self.backend.delete_appointment(id))
            .await
    }

    /// Drops every past appointment on the backend.
    pub async fn cleanup(&self, dialog: &impl Dialog) -> bool {
        self.mutate(CONFIRM_CLEANUP, dialog, || self.backend.cleanup())
            .await
    }

    async fn mutate<F, Fut>(&self, prompt: &str, dialog: &impl Dialog, request: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(), ApiError>>,
    {
        if self.store.read(|state| state.loading).unwrap_or(true) {
            return false;
        }
        if !dialog.confirm(prompt) {
            return false;
        }
        let Some(_loading) = self.start() else {
            return false;
        };
        if let Err(err) = request().await {
            self.fail(&err, dialog);
        }
        self.fetch(None, dialog).await;
        true
    }

    pub async fn check_health(&self, dialog: &impl Dialog) {
        match self.backend.health().await {
            Ok(health) => {
                log!("Health {health:?}");
                dialog.alert(&health.summary());
            }
            Err(err) => {
                error!("Health check failed: {err}");
                dialog.alert(&format!("Backend unreachable: {}", err.user_message()));
            }
        }
    }
}
