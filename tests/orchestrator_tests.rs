// The orchestrator's state-machine properties: token fencing, retry policy,
// and the solve flow, exercised against a scripted in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use deskpilot::ai::{ChatMessage, ChatTransport};
use deskpilot::error::AssistantError;
use deskpilot::orchestrator::{DispatchOutcome, Orchestrator};
use deskpilot::AppConfig;

enum Reply {
    Ok(&'static str),
    OkAfter(&'static str, Duration),
    Transient,
    Terminal(u16, &'static str),
}

struct ScriptedTransport {
    replies: Mutex<Vec<Reply>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn request(&self, index: usize) -> Vec<ChatMessage> {
        self.requests.lock()[index].clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        self.requests.lock().push(messages.to_vec());
        let reply = self.replies.lock().remove(0);
        match reply {
            Reply::Ok(text) => Ok(text.to_string()),
            Reply::OkAfter(text, delay) => {
                tokio::time::sleep(delay).await;
                Ok(text.to_string())
            }
            Reply::Transient => Err(AssistantError::VendorTransient {
                service: "completion",
                reason: "connection reset".to_string(),
            }),
            Reply::Terminal(status, message) => Err(AssistantError::VendorTerminal {
                service: "completion",
                status,
                message: message.to_string(),
            }),
        }
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.chat_api_key = "test-key".to_string();
    config.chat_api_url = "https://example.invalid/".to_string();
    config.chat_deployment_id = "test-deployment".to_string();
    config
}

fn orchestrator_with(replies: Vec<Reply>) -> (Arc<Orchestrator>, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new(replies));
    let orchestrator = Arc::new(Orchestrator::new(test_config(), transport.clone()));
    (orchestrator, transport)
}

fn message_text(message: &ChatMessage) -> String {
    serde_json::to_string(&message.content).expect("serializable content")
}

#[tokio::test(start_paused = true)]
async fn last_dispatched_wins_regardless_of_completion_order() {
    let (orchestrator, _transport) = orchestrator_with(vec![
        Reply::OkAfter("first answer", Duration::from_secs(5)),
        Reply::Ok("second answer"),
    ]);

    let first_token = orchestrator.next_token();
    let slow = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move {
            orchestrator
                .dispatch("first question", &[], None, Some(first_token))
                .await
        }
    });
    // Let the first dispatch reach its transport call before superseding it.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let second_token = orchestrator.next_token();
    let outcome = orchestrator
        .dispatch("second question", &[], None, Some(second_token))
        .await;
    assert_eq!(outcome, DispatchOutcome::Applied);
    assert_eq!(orchestrator.view().answer, "second answer");

    let stale = slow.await.expect("task completed");
    assert_eq!(stale, DispatchOutcome::Stale);

    // The older result must not have touched anything.
    let view = orchestrator.view();
    assert_eq!(view.answer, "second answer");
    assert!(!view.thinking);
}

#[tokio::test(start_paused = true)]
async fn start_over_invalidates_the_pending_request() {
    let (orchestrator, _transport) =
        orchestrator_with(vec![Reply::OkAfter("late answer", Duration::from_secs(5))]);

    let pending = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.dispatch("question", &[], None, None).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    orchestrator.start_over();

    assert_eq!(pending.await.expect("task completed"), DispatchOutcome::Stale);
    let view = orchestrator.view();
    assert_eq!(view.answer, "");
    assert!(!view.thinking);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_then_succeed() {
    let (orchestrator, transport) = orchestrator_with(vec![
        Reply::Transient,
        Reply::Transient,
        Reply::Ok("recovered"),
    ]);

    let outcome = orchestrator.dispatch("question", &[], None, None).await;

    assert_eq!(outcome, DispatchOutcome::Applied);
    assert_eq!(transport.request_count(), 3);
    let view = orchestrator.view();
    assert_eq!(view.answer, "recovered");
    assert!(!view.show_retry);
    assert!(!view.thinking);
}

#[tokio::test(start_paused = true)]
async fn three_transport_failures_surface_retry_affordance() {
    let (orchestrator, transport) = orchestrator_with(vec![
        Reply::Transient,
        Reply::Transient,
        Reply::Transient,
        Reply::Ok("late answer"),
    ]);

    orchestrator.dispatch("question", &[], None, None).await;

    assert_eq!(transport.request_count(), 3);
    let view = orchestrator.view();
    assert!(view.answer.contains("Network error"));
    assert!(view.show_retry);

    // Manual retry re-issues the exact same composed request.
    let outcome = orchestrator.retry_last().await;
    assert_eq!(outcome, DispatchOutcome::Applied);
    assert_eq!(transport.request_count(), 4);
    assert_eq!(transport.request(3), transport.request(0));
    let view = orchestrator.view();
    assert_eq!(view.answer, "late answer");
    assert!(!view.show_retry);
}

#[tokio::test]
async fn api_error_response_is_surfaced_without_retry() {
    let (orchestrator, transport) =
        orchestrator_with(vec![Reply::Terminal(429, "rate limited")]);

    orchestrator.dispatch("question", &[], None, None).await;

    assert_eq!(transport.request_count(), 1);
    let view = orchestrator.view();
    assert_eq!(view.answer, "API error (429): rate limited");
    assert!(!view.show_retry);
}

#[tokio::test]
async fn stale_request_never_retries() {
    let (orchestrator, transport) =
        orchestrator_with(vec![Reply::Transient, Reply::Ok("unused")]);

    let token = orchestrator.next_token();
    orchestrator.next_token(); // supersede before dispatching

    let outcome = orchestrator
        .dispatch("question", &[], None, Some(token))
        .await;

    assert_eq!(outcome, DispatchOutcome::Stale);
    assert_eq!(transport.request_count(), 1);
    assert_eq!(orchestrator.view().answer, "");
}

#[tokio::test]
async fn missing_configuration_is_reported_without_a_network_attempt() {
    let transport = Arc::new(ScriptedTransport::new(vec![Reply::Ok("never sent")]));
    let orchestrator = Orchestrator::new(AppConfig::default(), transport.clone());

    let outcome = orchestrator.dispatch("question", &[], None, None).await;

    assert_eq!(outcome, DispatchOutcome::Applied);
    assert_eq!(transport.request_count(), 0);
    assert!(orchestrator.view().answer.contains("configuration is missing"));
}

#[tokio::test]
async fn markdown_markers_are_stripped_from_the_answer() {
    let (orchestrator, _transport) =
        orchestrator_with(vec![Reply::Ok("**Answer:** Option `C`")]);

    orchestrator.dispatch("question", &[], None, None).await;

    assert_eq!(orchestrator.view().answer, "Answer: Option C");
}

#[tokio::test]
async fn solve_uses_first_screenshot_language_and_clears_the_queue() {
    let (orchestrator, transport) = orchestrator_with(vec![Reply::Ok("Answer: B")]);

    orchestrator.set_language("Java");
    assert!(orchestrator.enqueue_screenshot("data:image/png;base64,AAAA".to_string()));
    orchestrator.set_language("Python");
    assert!(orchestrator.enqueue_screenshot("data:image/png;base64,BBBB".to_string()));
    assert_eq!(orchestrator.queue_len(), 2);

    let outcome = orchestrator.solve_screenshots().await;

    assert_eq!(outcome, DispatchOutcome::Applied);
    assert_eq!(orchestrator.queue_len(), 0);
    assert_eq!(orchestrator.view().answer, "Answer: B");

    let request = transport.request(0);
    // First-item language tags the combined request.
    assert!(message_text(&request[0]).contains("Java"));
    assert!(!message_text(&request[0]).contains("Python"));
    // Both images travel in one user message, and the variant prompt names
    // the image count.
    let user = message_text(&request[1]);
    assert!(user.contains("There are 2 images"));
    assert!(user.contains("data:image/png;base64,AAAA"));
    assert!(user.contains("data:image/png;base64,BBBB"));
}

#[tokio::test]
async fn solve_with_empty_queue_reports_without_dispatching() {
    let (orchestrator, transport) = orchestrator_with(vec![Reply::Ok("never sent")]);

    let outcome = orchestrator.solve_screenshots().await;

    assert_eq!(outcome, DispatchOutcome::Applied);
    assert_eq!(transport.request_count(), 0);
    assert_eq!(orchestrator.view().answer, "No screenshots found.");
}

#[tokio::test]
async fn duplicate_screenshot_is_dropped_silently() {
    let (orchestrator, _transport) = orchestrator_with(vec![]);

    assert!(orchestrator.enqueue_screenshot("data:image/png;base64,AAAA".to_string()));
    assert!(!orchestrator.enqueue_screenshot("data:image/png;base64,AAAA".to_string()));
    assert_eq!(orchestrator.queue_len(), 1);
}

#[tokio::test]
async fn resume_context_grounds_the_following_question() {
    let (orchestrator, transport) = orchestrator_with(vec![
        Reply::Ok("structured summary"),
        Reply::Ok("grounded answer"),
    ]);

    let file = deskpilot::ai::document::ResumeFile {
        name: "jane.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes: vec![0u8; 16],
    };
    orchestrator.upload_resume(&file).await;

    let view = orchestrator.view();
    assert!(view.resume_active);
    assert!(view.answer.contains("Resume uploaded"));
    assert!(orchestrator
        .resume_context()
        .expect("resume context set")
        .contains("placeholder resume content"));

    orchestrator.handle_transcript("tell me about your projects").await;
    assert_eq!(orchestrator.view().answer, "grounded answer");

    // The grounded question embeds the resume into the system message and
    // wraps the user question.
    let request = transport.request(1);
    assert!(message_text(&request[0]).contains("placeholder resume content"));
    assert!(message_text(&request[1]).contains("based on my resume"));

    orchestrator.clear_resume();
    assert!(orchestrator.resume_context().is_none());
    assert!(!orchestrator.view().resume_active);
}

#[tokio::test]
async fn unsupported_resume_type_fails_without_any_request() {
    let (orchestrator, transport) = orchestrator_with(vec![Reply::Ok("never sent")]);

    let file = deskpilot::ai::document::ResumeFile {
        name: "resume.txt".to_string(),
        content_type: "text/plain".to_string(),
        bytes: b"plain text".to_vec(),
    };
    orchestrator.upload_resume(&file).await;

    assert_eq!(transport.request_count(), 0);
    assert!(orchestrator.view().answer.contains("Unsupported file type"));
    assert!(orchestrator.resume_context().is_none());
}

#[tokio::test]
async fn usage_limits_gate_solving_when_enforced() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Reply::Ok("one"),
        Reply::Ok("two"),
        Reply::Ok("three"),
    ]));
    let mut config = test_config();
    config.enforce_usage_limits = true;
    let orchestrator = Orchestrator::new(config, transport.clone());

    for i in 0..3 {
        orchestrator.enqueue_screenshot(format!("data:image/png;base64,IMG{}", i));
        orchestrator.solve_screenshots().await;
    }
    assert_eq!(transport.request_count(), 3);

    orchestrator.enqueue_screenshot("data:image/png;base64,IMG9".to_string());
    orchestrator.solve_screenshots().await;

    assert_eq!(transport.request_count(), 3);
    assert!(orchestrator.view().answer.contains("Free limit completed"));
}
