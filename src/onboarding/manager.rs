//! OnboardingController: drives the wizard, validating each step, saving
//! its data and deciding when the user may move on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::model::{Gender, OnboardingForm};
use super::state::{OnboardingStep, StepCursor};
use super::validation::{priced_lessons, validate_step};
use crate::api::{ApiRequest, Transport, decode};
use crate::availability::AvailabilityEditor;
use crate::error::ApiError;
use crate::i18n::{Locale, Message};
use crate::locations::LocationSelection;
use crate::model::{OnboardingData, Role, User};
use crate::session::SessionStore;
use crate::tutor::TutorService;

/// Why `next()` did not move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    Validation(Message),
    /// A required server call failed; the server's message.
    Server(String),
    /// Another `next()` is still running.
    Busy,
}

impl BlockReason {
    pub fn message(&self, locale: Locale) -> String {
        match self {
            Self::Validation(message) => message.render(locale),
            Self::Server(message) => message.clone(),
            Self::Busy => Message::PleaseWait.render(locale),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Blocked(BlockReason),
    Advance(OnboardingStep),
    /// Onboarding finished. Carries the updated user when a session is attached.
    Complete(Option<User>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    Step(OnboardingStep),
    /// Back from the first step leaves onboarding.
    Exit,
    /// A `next()` is still saving; the step cannot change under it.
    Busy,
}

struct Inner {
    cursor: StepCursor,
    form: OnboardingForm,
    saved: Map<String, Value>,
    reference: Option<OnboardingData>,
    pending_saves: Vec<JoinHandle<()>>,
}

impl Inner {
    /// Hook run whenever the cursor lands on a step.
    fn enter(&mut self, step: OnboardingStep) {
        if step == OnboardingStep::Availability && self.form.availability.on_mount() {
            debug!("Seeded default weekly availability");
        }
    }
}

/// Resets the busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct OnboardingController {
    transport: Arc<dyn Transport>,
    session: Option<Arc<SessionStore>>,
    locale: Locale,
    busy: AtomicBool,
    inner: Mutex<Inner>,
}

impl OnboardingController {
    /// Begin onboarding for a role. The step count is fixed from here on.
    pub fn start(role: Role, transport: Arc<dyn Transport>, locale: Locale) -> Self {
        info!(%role, "Onboarding started");
        Self {
            transport,
            session: None,
            locale,
            busy: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                cursor: StepCursor::new(role),
                form: OnboardingForm::default(),
                saved: Map::new(),
                reference: None,
                pending_saves: Vec::new(),
            }),
        }
    }

    /// Begin onboarding for the signed-in user. `None` without a user or role.
    pub async fn for_session(
        session: Arc<SessionStore>,
        transport: Arc<dyn Transport>,
        locale: Locale,
    ) -> Option<Self> {
        let user = session.user().await?;
        let role = user.role?;
        let controller = Self::start(role, transport, locale).with_session(session);
        if let Some(name) = user.full_name {
            controller.lock().form.full_name = name;
        }
        Some(controller)
    }

    /// Attach the session whose user is marked complete at the end.
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn role(&self) -> Role {
        self.lock().cursor.role()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn current_step(&self) -> OnboardingStep {
        self.lock().cursor.current()
    }

    /// `(step number, total steps)`, one-based.
    pub fn progress(&self) -> (usize, usize) {
        let inner = self.lock();
        (inner.cursor.index() + 1, inner.cursor.total())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Snapshot of the form.
    pub fn form(&self) -> OnboardingForm {
        self.lock().form.clone()
    }

    /// Everything merged so far; the payload of the final submit.
    pub fn saved_data(&self) -> Map<String, Value> {
        self.lock().saved.clone()
    }

    /// Fetch school types, grades and lesson types once per session.
    pub async fn load_reference_data(&self) -> Result<OnboardingData, ApiError> {
        if let Some(data) = self.lock().reference.clone() {
            return Ok(data);
        }
        let data: OnboardingData = decode(
            self.transport
                .send(ApiRequest::get("/onboarding/data"))
                .await?,
        )?;
        self.lock().reference = Some(data.clone());
        Ok(data)
    }

    pub fn reference_data(&self) -> Option<OnboardingData> {
        self.lock().reference.clone()
    }

    // ── Form mutators ───────────────────────────────────────────────

    pub fn set_personal_info(&self, full_name: &str, birth_year: &str, gender: Option<Gender>) {
        let mut inner = self.lock();
        inner.form.full_name = full_name.to_string();
        inner.form.birth_year = birth_year.to_string();
        inner.form.gender = gender;
    }

    pub fn set_location(&self, selection: LocationSelection) {
        self.lock().form.location = Some(selection);
    }

    pub fn toggle_school_type(&self, school_type_id: &str) -> bool {
        self.lock().form.toggle_school_type(school_type_id)
    }

    pub fn toggle_grade(&self, school_type_id: &str, grade_id: &str) -> bool {
        self.lock().form.toggle_grade(school_type_id, grade_id)
    }

    pub fn select_school_type(&self, school_type_id: &str) {
        self.lock().form.select_school_type(school_type_id);
    }

    pub fn select_grade(&self, grade_id: &str) {
        self.lock().form.grade_id = Some(grade_id.to_string());
    }

    pub fn set_school_name(&self, school_name: &str) {
        self.lock().form.school_name = school_name.to_string();
    }

    pub fn set_bio(&self, bio: &str) {
        self.lock().form.bio = bio.to_string();
    }

    pub fn toggle_lesson(&self, lesson_type_id: &str) -> bool {
        self.lock().form.toggle_lesson(lesson_type_id)
    }

    /// Price in whole currency units, as typed.
    pub fn set_price(&self, lesson_type_id: &str, price: &str) {
        self.lock()
            .form
            .prices
            .insert(lesson_type_id.to_string(), price.to_string());
    }

    /// Run `f` against the availability editor.
    pub fn edit_availability<R>(&self, f: impl FnOnce(&mut AvailabilityEditor) -> R) -> R {
        f(&mut self.lock().form.availability)
    }

    pub fn mark_photo_uploaded(&self) {
        self.lock().form.photo_uploaded = true;
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Validate and save the current step, then move on.
    pub async fn next(&self) -> StepOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return StepOutcome::Blocked(BlockReason::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let (step, index, data, form) = {
            let inner = self.lock();
            let step = inner.cursor.current();
            match validate_step(step, inner.cursor.role(), &inner.form) {
                Ok(data) => (step, inner.cursor.index(), data, inner.form.clone()),
                Err(message) => {
                    debug!(%step, ?message, "Onboarding step invalid");
                    return StepOutcome::Blocked(BlockReason::Validation(message));
                }
            }
        };

        if step.is_terminal() {
            return self.complete().await;
        }

        if step.requires_save() {
            if let Err(e) = self.save_required(step, index, &data, &form).await {
                warn!(%step, error = %e, "Onboarding step save failed");
                return StepOutcome::Blocked(BlockReason::Server(e.user_message()));
            }
        } else {
            self.save_in_background(index, data.clone());
        }

        self.advance_from(step, data)
    }

    /// Record a saved step and move the cursor past it.
    fn advance_from(&self, step: OnboardingStep, data: Value) -> StepOutcome {
        let mut inner = self.lock();
        merge(&mut inner.saved, data);
        match inner.cursor.advance() {
            Ok(next) => {
                info!(from = %step, to = %next, "Onboarding advanced");
                inner.enter(next);
                StepOutcome::Advance(next)
            }
            Err(e) => {
                warn!(%step, error = %e, "Onboarding step did not advance");
                StepOutcome::Blocked(BlockReason::Server(e))
            }
        }
    }

    pub fn back(&self) -> BackOutcome {
        if self.is_busy() {
            return BackOutcome::Busy;
        }
        let mut inner = self.lock();
        match inner.cursor.retreat() {
            Some(step) => {
                inner.enter(step);
                BackOutcome::Step(step)
            }
            None => BackOutcome::Exit,
        }
    }

    /// Wait for outstanding background saves.
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut self.lock().pending_saves);
        join_all(pending).await;
    }

    async fn save_required(
        &self,
        step: OnboardingStep,
        index: usize,
        data: &Value,
        form: &OnboardingForm,
    ) -> Result<(), ApiError> {
        let tutor = TutorService::new(Arc::clone(&self.transport));
        match step {
            OnboardingStep::LessonsPricing => {
                let lessons = priced_lessons(form).unwrap_or_default();
                for lesson in &lessons {
                    tutor
                        .add_lesson_cents(&lesson.lesson_type_id, lesson.price_per_hour_cents)
                        .await?;
                }
            }
            OnboardingStep::Availability => {
                tutor.save_availability(&form.availability.slots()).await?;
            }
            _ => {}
        }
        self.transport
            .send(step_request(index, data.clone()))
            .await?;
        Ok(())
    }

    fn save_in_background(&self, index: usize, data: Value) {
        let transport = Arc::clone(&self.transport);
        let handle = tokio::spawn(async move {
            if let Err(e) = transport.send(step_request(index, data)).await {
                debug!(step = index, error = %e, "Onboarding autosave failed");
            }
        });
        let mut inner = self.lock();
        inner.pending_saves.retain(|h| !h.is_finished());
        inner.pending_saves.push(handle);
    }

    async fn complete(&self) -> StepOutcome {
        let mut payload = self.lock().saved.clone();
        payload.insert("onboarding_completed".to_string(), Value::Bool(true));

        if let Err(e) = self
            .transport
            .send(ApiRequest::post("/onboarding/complete", Value::Object(payload)))
            .await
        {
            warn!(error = %e, "Onboarding completion failed");
            return StepOutcome::Blocked(BlockReason::Server(e.user_message()));
        }

        info!("Onboarding completed");
        let user = match &self.session {
            Some(session) => {
                session.modify_user(|u| u.onboarding_completed = true).await;
                session.user().await
            }
            None => None,
        };
        StepOutcome::Complete(user)
    }
}

fn step_request(index: usize, data: Value) -> ApiRequest {
    ApiRequest::post("/onboarding/step", json!({ "step": index, "data": data }))
}

fn merge(saved: &mut Map<String, Value>, data: Value) {
    if let Value::Object(fields) = data {
        saved.extend(fields);
    }
}
