//! The request orchestrator: serializes user intent into one outbound
//! completion request, fences overlapping requests with a monotonic token,
//! retries transient transport failures, and owns the view state the overlay
//! renders.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::ai::document::{DocumentClient, ResumeFile};
use crate::ai::{ChatMessage, ChatTransport};
use crate::config::AppConfig;
use crate::error::AssistantError;
use crate::limits::{Feature, UsageCounters};
use crate::prompt::{self, PromptInput};
use crate::queue::ScreenshotQueue;
use crate::response;

const MAX_TRANSPORT_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(1200);

pub const LIMIT_MESSAGE: &str =
    "Free limit completed. Buy a plan for unlimited usage, or wait 24 hours.";
const NO_SCREENSHOTS_MESSAGE: &str = "No screenshots found.";
const NETWORK_ERROR_MESSAGE: &str = "Network error: unable to reach the completion endpoint \
     after several attempts. Check your internet connection, API key, and endpoint.";
const MISSING_CONFIG_MESSAGE: &str =
    "Chat completion API configuration is missing. Check environment variables.";

/// What happened to a dispatched request. Stale results are discarded without
/// any view mutation; they are an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The result (answer or failure message) was published to the view.
    Applied,
    /// The request's token lost the race; nothing was published.
    Stale,
}

/// Render-ready state snapshot. The host shell polls or subscribes to this;
/// the orchestrator is its only writer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub transcript: String,
    pub answer: String,
    pub thinking: bool,
    pub listening: bool,
    pub uploading: bool,
    pub show_retry: bool,
    pub resume_active: bool,
}

#[derive(Debug, Clone)]
struct LastRequest {
    prompt: String,
    attachments: Vec<String>,
    language: String,
}

pub struct Orchestrator {
    transport: Arc<dyn ChatTransport>,
    documents: DocumentClient,
    config: AppConfig,
    /// The concurrency fence: at most one token is current; any in-flight
    /// request whose token no longer matches on completion discards itself.
    current_token: AtomicU64,
    /// Re-entrancy latch for the solve flow, independent of the token fence.
    solving: AtomicBool,
    view: Mutex<ViewState>,
    queue: Mutex<ScreenshotQueue>,
    resume_context: Mutex<Option<String>>,
    last_request: Mutex<Option<LastRequest>>,
    language: Mutex<String>,
    usage: Mutex<UsageCounters>,
}

/// Releases the solve latch on every exit path.
struct SolveGuard<'a>(&'a AtomicBool);

impl Drop for SolveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Orchestrator {
    pub fn new(config: AppConfig, transport: Arc<dyn ChatTransport>) -> Self {
        let documents = DocumentClient::new(&config);
        let language = config.default_language.clone();
        Self {
            transport,
            documents,
            config,
            current_token: AtomicU64::new(0),
            solving: AtomicBool::new(false),
            view: Mutex::new(ViewState::default()),
            queue: Mutex::new(ScreenshotQueue::new()),
            resume_context: Mutex::new(None),
            last_request: Mutex::new(None),
            language: Mutex::new(language),
            usage: Mutex::new(UsageCounters::new()),
        }
    }

    // ─── Token fencing ───────────────────────────────────────────────────────

    pub fn current_token(&self) -> u64 {
        self.current_token.load(Ordering::SeqCst)
    }

    /// Bump the current token, invalidating every in-flight request.
    pub fn next_token(&self) -> u64 {
        self.current_token.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, token: u64) -> bool {
        self.current_token() == token
    }

    // ─── View accessors ──────────────────────────────────────────────────────

    pub fn view(&self) -> ViewState {
        self.view.lock().clone()
    }

    pub fn show_message(&self, message: &str) {
        self.view.lock().answer = message.to_string();
    }

    pub fn set_language(&self, language: &str) {
        *self.language.lock() = language.to_string();
    }

    pub fn selected_language(&self) -> String {
        self.language.lock().clone()
    }

    pub fn resume_context(&self) -> Option<String> {
        self.resume_context.lock().clone()
    }

    pub fn is_solving(&self) -> bool {
        self.solving.load(Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Tag the capture with the currently selected language and queue it.
    /// Returns `false` for a content-identical duplicate.
    pub fn enqueue_screenshot(&self, image: String) -> bool {
        let language = self.selected_language();
        self.queue.lock().enqueue(image, language)
    }

    // ─── Dispatch ────────────────────────────────────────────────────────────

    /// Issue one composed request. `language` defaults to the selected
    /// language, `token` to the current token. Every failure is converted
    /// into answer text; this never unwinds.
    pub async fn dispatch(
        &self,
        prompt: &str,
        attachments: &[String],
        language: Option<&str>,
        token: Option<u64>,
    ) -> DispatchOutcome {
        if !self.config.has_chat_config() {
            let mut view = self.view.lock();
            view.answer = MISSING_CONFIG_MESSAGE.to_string();
            view.thinking = false;
            return DispatchOutcome::Applied;
        }

        let target_language = language
            .map(str::to_string)
            .unwrap_or_else(|| self.selected_language());

        {
            let mut view = self.view.lock();
            view.show_retry = false;
            view.thinking = true;
        }
        *self.last_request.lock() = Some(LastRequest {
            prompt: prompt.to_string(),
            attachments: attachments.to_vec(),
            language: target_language.clone(),
        });

        let this_token = token.unwrap_or_else(|| self.current_token());

        let resume = self.resume_context.lock().clone();
        let built = prompt::build(&PromptInput {
            prompt,
            attachments,
            language: &target_language,
            resume_context: resume.as_deref(),
        });
        let messages = vec![
            ChatMessage::system(built.system),
            if attachments.is_empty() {
                ChatMessage::user(built.user)
            } else {
                ChatMessage::user_with_images(&built.user, attachments)
            },
        ];

        let mut attempt = 0;
        loop {
            match self.transport.complete(&messages).await {
                Ok(text) => {
                    if !self.is_current(this_token) {
                        log::debug!("discarding stale completion for token {}", this_token);
                        return DispatchOutcome::Stale;
                    }
                    let mut view = self.view.lock();
                    view.answer = response::strip_markup(&text);
                    view.show_retry = false;
                    view.thinking = false;
                    return DispatchOutcome::Applied;
                }
                Err(err) => {
                    if !self.is_current(this_token) {
                        log::debug!(
                            "discarding stale failure for token {}: {}",
                            this_token,
                            err
                        );
                        return DispatchOutcome::Stale;
                    }
                    if err.is_retryable() && attempt < MAX_TRANSPORT_RETRIES {
                        attempt += 1;
                        log::warn!("transport failure (attempt {}): {}; retrying", attempt, err);
                        tokio::time::sleep(RETRY_BACKOFF).await;
                        continue;
                    }
                    let mut view = self.view.lock();
                    match err {
                        AssistantError::VendorTerminal {
                            status, message, ..
                        } => {
                            view.answer = format!("API error ({}): {}", status, message);
                        }
                        AssistantError::VendorTransient { .. } => {
                            view.answer = NETWORK_ERROR_MESSAGE.to_string();
                            view.show_retry = true;
                        }
                        other => {
                            view.answer = format!("Error: {}", other);
                        }
                    }
                    view.thinking = false;
                    return DispatchOutcome::Applied;
                }
            }
        }
    }

    /// Re-issue the memoized last request under a fresh token, invalidating
    /// whatever may still be in flight.
    pub async fn retry_last(&self) -> DispatchOutcome {
        {
            let mut view = self.view.lock();
            view.answer.clear();
            view.show_retry = false;
        }
        let last = self.last_request.lock().clone();
        let Some(last) = last else {
            return DispatchOutcome::Applied;
        };
        let token = self.next_token();
        self.dispatch(
            &last.prompt,
            &last.attachments,
            Some(last.language.as_str()),
            Some(token),
        )
        .await
    }

    // ─── Screenshot solve ────────────────────────────────────────────────────

    /// Flush the screenshot queue as one combined request, tagged with the
    /// first item's language. Re-entrant calls are dropped while a flush is
    /// outstanding.
    pub async fn solve_screenshots(&self) -> DispatchOutcome {
        if self.config.enforce_usage_limits
            && !self.usage.lock().try_consume(Feature::Screenshots)
        {
            self.show_message(LIMIT_MESSAGE);
            return DispatchOutcome::Applied;
        }
        if self
            .solving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("solve already in progress, ignoring");
            return DispatchOutcome::Stale;
        }
        let _guard = SolveGuard(&self.solving);

        let images = {
            let queue = self.queue.lock();
            if queue.is_empty() {
                drop(queue);
                self.show_message(NO_SCREENSHOTS_MESSAGE);
                return DispatchOutcome::Applied;
            }
            queue.snapshot()
        };
        let language = images[0].language.clone();
        let images: Vec<String> = images.into_iter().map(|item| item.image).collect();

        {
            let mut view = self.view.lock();
            view.thinking = true;
            view.answer.clear();
        }
        let token = self.next_token();
        let outcome = self
            .dispatch("", &images, Some(language.as_str()), Some(token))
            .await;

        // Cleared once the dispatch has returned; dispatch never unwinds, so
        // a failed solve still lands its message first. A manual retry replays
        // the memoized request, not the queue.
        self.queue.lock().clear();

        outcome
    }

    // ─── Session control ─────────────────────────────────────────────────────

    /// Reset the interaction: clear the view and the queue, invalidate every
    /// in-flight request.
    pub fn start_over(&self) {
        {
            let mut view = self.view.lock();
            view.transcript.clear();
            view.answer.clear();
            view.thinking = false;
            view.listening = false;
            view.show_retry = false;
        }
        self.queue.lock().clear();
        self.next_token();
    }

    // ─── Voice ───────────────────────────────────────────────────────────────

    /// Begin a recognition session. Returns `false` when the free-tier
    /// allowance blocks it.
    pub fn begin_listening(&self) -> bool {
        if self.config.enforce_usage_limits && !self.usage.lock().try_consume(Feature::Mic) {
            self.show_message(LIMIT_MESSAGE);
            return false;
        }
        self.next_token();
        let mut view = self.view.lock();
        view.listening = true;
        view.transcript.clear();
        view.answer.clear();
        true
    }

    pub fn end_listening(&self) {
        self.view.lock().listening = false;
    }

    /// Publish the recognized text and dispatch it as a question.
    pub async fn handle_transcript(&self, text: &str) -> DispatchOutcome {
        self.view.lock().transcript = text.to_string();
        if text.is_empty() {
            return DispatchOutcome::Applied;
        }
        self.dispatch(text, &[], None, None).await
    }

    // ─── Resume context ──────────────────────────────────────────────────────

    pub async fn upload_resume(&self, file: &ResumeFile) -> DispatchOutcome {
        if self.config.enforce_usage_limits && !self.usage.lock().try_consume(Feature::Upload) {
            self.show_message(LIMIT_MESSAGE);
            return DispatchOutcome::Applied;
        }
        self.view.lock().uploading = true;
        let outcome = self.upload_resume_inner(file).await;
        self.view.lock().uploading = false;
        outcome
    }

    async fn upload_resume_inner(&self, file: &ResumeFile) -> DispatchOutcome {
        let extracted = match self.documents.extract(file).await {
            Ok(text) => text,
            Err(err @ AssistantError::UnsupportedFileType(_)) => {
                self.show_message(&err.to_string());
                return DispatchOutcome::Applied;
            }
            Err(err) => {
                log::error!("resume extraction failed: {}", err);
                self.show_message("Failed to parse or analyze resume. Please try again.");
                return DispatchOutcome::Applied;
            }
        };

        // Let the model digest the resume before it starts grounding answers.
        let analysis = prompt::resume_analysis_prompt(&extracted);
        self.dispatch(&analysis, &[], None, None).await;

        *self.resume_context.lock() = Some(extracted);
        let mut view = self.view.lock();
        view.resume_active = true;
        view.answer = "Resume uploaded and analyzed successfully! Ask interview questions \
             and the answers will draw on your actual background and experience."
            .to_string();
        DispatchOutcome::Applied
    }

    pub fn clear_resume(&self) {
        *self.resume_context.lock() = None;
        let mut view = self.view.lock();
        view.resume_active = false;
        view.answer =
            "Resume context cleared. Ask general questions or upload a new resume.".to_string();
    }

    /// Logging out drops the grounding context along with the session.
    pub fn logout(&self) {
        *self.resume_context.lock() = None;
        let mut view = self.view.lock();
        view.resume_active = false;
        view.listening = false;
    }
}
