//! End-to-end runs of the five-stage pipeline against a scripted provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use caseforge_core::classify::ErrorCategory;
use caseforge_core::retry::RetryConfig;
use caseforge_core::state::StageName;
use caseforge_core::ticket::{Priority, Ticket, TicketKind};
use caseforge_llm::cache::ResponseCache;
use caseforge_llm::invoker::Invoker;
use caseforge_llm::limiter::RateLimiter;
use caseforge_llm::provider::{GenerationRequest, Provider, ProviderError, ProviderResult};
use caseforge_pipeline::{Pipeline, RunOutcome};

/// Replays scripted replies in order and counts calls.
struct ScriptedProvider {
    replies: Mutex<Vec<ProviderResult<String>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(replies: Vec<ProviderResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _request: &GenerationRequest) -> ProviderResult<String> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        replies.remove(0)
    }
}

fn open_limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(10_000, Duration::ZERO))
}

fn ticket() -> Ticket {
    Ticket {
        id: "BUG-1234".into(),
        title: "Login fails with special characters".into(),
        description: "Users cannot login when the password contains @ or #.".into(),
        kind: TicketKind::Bug,
        acceptance_criteria: vec!["Login succeeds with any printable ASCII password".into()],
        ..Ticket::default()
    }
}

/// The five replies for a full happy run: one per stage, except the
/// generator which answers once per roadmap category.
fn happy_script() -> Vec<ProviderResult<String>> {
    vec![
        Ok(r#"{
            "requirements": ["Passwords accept @ and #"],
            "criteria_gaps": ["No maximum password length stated"],
            "clarifications": []
        }"#
        .into()),
        Ok(r#"{
            "impacted_modules": ["auth-service"],
            "dependencies": ["users database"],
            "risk_areas": ["session handling"]
        }"#
        .into()),
        Ok(r#"```json
        {
            "roadmap": {
                "happy_path": ["login with @ in password"],
                "negative": ["login with wrong password"]
            },
            "clarifications": ["is SSO in scope?"]
        }
        ```"#
            .into()),
        Ok(r#"{
            "test_cases": [{
                "title": "Login with @ in password",
                "priority": "high",
                "steps": ["Open login page", "Enter password with @", "Submit"],
                "expected_result": "User is logged in",
                "requirement_refs": ["Passwords accept @ and #"]
            }]
        }"#
        .into()),
        Ok(r#"{
            "test_cases": [{
                "title": "Login with wrong password",
                "priority": "medium",
                "steps": ["Open login page", "Enter wrong password", "Submit"],
                "expected_result": "Login is rejected with an error",
                "requirement_refs": []
            }]
        }"#
        .into()),
        Ok(r#"{
            "coverage_gaps": ["no account-lockout scenario"],
            "clarifications": []
        }"#
        .into()),
    ]
}

fn pipeline_over(provider: Arc<ScriptedProvider>, cache: Option<Arc<ResponseCache>>) -> Pipeline {
    let invoker = Invoker::new(provider, open_limiter(), cache, RetryConfig::default());
    Pipeline::new(Arc::new(invoker), "test-model")
}

#[tokio::test]
async fn full_run_produces_a_complete_suite() {
    let provider = Arc::new(ScriptedProvider::new(happy_script()));
    let pipeline = pipeline_over(Arc::clone(&provider), None);

    let mut seen = Vec::new();
    let report = pipeline
        .run(ticket(), &CancellationToken::new(), |stage, _| {
            seen.push(stage);
        })
        .await;

    assert!(matches!(report.outcome, RunOutcome::Completed));
    assert_eq!(seen, StageName::ALL);
    assert_eq!(provider.calls(), 6);

    let state = &report.state;
    assert_eq!(state.requirements, ["Passwords accept @ and #"]);
    assert_eq!(state.impacted_modules, ["auth-service"]);
    assert_eq!(state.risk_areas, ["session handling"]);

    let categories: Vec<&str> = state.roadmap.keys().map(String::as_str).collect();
    assert_eq!(categories, ["happy_path", "negative"]);

    let ids: Vec<&str> = state.test_cases.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["BUG-1234_TC001", "BUG-1234_TC002"]);
    assert_eq!(state.test_cases[0].priority, Priority::High);
    assert_eq!(state.test_cases[0].category, "happy_path");
    assert_eq!(state.test_cases[1].category, "negative");

    assert_eq!(state.coverage_gaps, ["no account-lockout scenario"]);
    assert_eq!(state.clarifications, ["is SSO in scope?"]);
    assert!(state.current_stage.is_none());
    assert!(state.elapsed.is_some());
    // Every stage logged at least one entry.
    for stage in StageName::ALL {
        assert!(
            report.state.stage_log.iter().any(|e| e.stage == stage),
            "no log entry for {stage}",
        );
    }
}

#[tokio::test]
async fn unparseable_stage_reply_degrades_without_stopping_the_run() {
    let mut script = happy_script();
    script[0] = Ok("I'm sorry, I can only answer in prose.".into());
    let provider = Arc::new(ScriptedProvider::new(script));
    let pipeline = pipeline_over(provider, None);

    let report = pipeline
        .run(ticket(), &CancellationToken::new(), |_, _| {})
        .await;

    assert!(matches!(report.outcome, RunOutcome::Completed));
    // The reader contributed nothing, later stages still ran.
    assert!(report.state.requirements.is_empty());
    assert_eq!(report.state.test_cases.len(), 2);
    assert!(
        report
            .state
            .stage_log
            .iter()
            .any(|e| e.stage == StageName::TicketReader && e.action == "unparseable_reply"),
    );
}

#[tokio::test]
async fn fatal_provider_error_stops_the_run_and_keeps_prior_state() {
    let mut script = happy_script();
    script[1] = Err(ProviderError::Api {
        status: 401,
        message: "401 API key not valid".into(),
        category: ErrorCategory::InvalidCredentials,
    });
    let provider = Arc::new(ScriptedProvider::new(script));
    let pipeline = pipeline_over(Arc::clone(&provider), None);

    let report = pipeline
        .run(ticket(), &CancellationToken::new(), |_, _| {})
        .await;

    match report.outcome {
        RunOutcome::Failed { stage, ref source } => {
            assert_eq!(stage, StageName::ContextBuilder);
            assert_eq!(source.category(), ErrorCategory::InvalidCredentials);
        }
        ref other => panic!("expected Failed, got {other:?}"),
    }
    // Stage 1's contribution survives; stages 3-5 never ran.
    assert_eq!(report.state.requirements, ["Passwords accept @ and #"]);
    assert!(report.state.roadmap.is_empty());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn cancelling_mid_run_stops_at_that_stage() {
    let provider = Arc::new(ScriptedProvider::new(happy_script()));
    let pipeline = pipeline_over(Arc::clone(&provider), None);
    let cancel = CancellationToken::new();

    // Cancel once the second stage has merged; the boundary check stops
    // the run before the third.
    let cancel_in_callback = cancel.clone();
    let report = pipeline
        .run(ticket(), &cancel, move |stage, _| {
            if stage == StageName::ContextBuilder {
                cancel_in_callback.cancel();
            }
        })
        .await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Cancelled {
            stage: StageName::TestStrategy,
        }
    ));
    // The first two stages' contributions survive.
    assert_eq!(report.state.requirements, ["Passwords accept @ and #"]);
    assert_eq!(report.state.impacted_modules, ["auth-service"]);
    assert!(report.state.roadmap.is_empty());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn second_run_with_a_warm_cache_makes_no_provider_calls() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(ResponseCache::open(dir.path(), Duration::from_secs(3600)).unwrap());
    let provider = Arc::new(ScriptedProvider::new(happy_script()));
    let pipeline = pipeline_over(Arc::clone(&provider), Some(Arc::clone(&cache)));

    let first = pipeline
        .run(ticket(), &CancellationToken::new(), |_, _| {})
        .await;
    assert!(matches!(first.outcome, RunOutcome::Completed));
    assert_eq!(provider.calls(), 6);

    let second = pipeline
        .run(ticket(), &CancellationToken::new(), |_, _| {})
        .await;
    assert!(matches!(second.outcome, RunOutcome::Completed));
    assert_eq!(provider.calls(), 6, "all six calls should be cache hits");
    assert_eq!(second.state.test_cases.len(), first.state.test_cases.len());
}
