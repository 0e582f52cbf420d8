use chrono::{DateTime, Utc};
use serde_json::json;
use smart_schedule::application::clock::Clock;
use smart_schedule::application::commands::AppState;
use smart_schedule::domain::models::TaskState;
use smart_schedule::domain::timeline::TimelineColor;
use smart_schedule::infrastructure::schedule_client::ReqwestScheduleServiceClient;
use smart_schedule::{complete_task, confirm_task, daily_plan, refresh_schedule, update_unfinished_tasks};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ManualClock {
    seconds: Arc<AtomicI64>,
}

impl ManualClock {
    fn at(value: &str) -> Self {
        let clock = Self {
            seconds: Arc::new(AtomicI64::new(0)),
        };
        clock.set(value);
        clock
    }

    fn set(&self, value: &str) {
        let instant = DateTime::parse_from_rfc3339(value).expect("valid datetime");
        self.seconds.store(instant.timestamp(), Ordering::SeqCst);
    }

    fn clock(&self) -> Clock {
        let seconds = Arc::clone(&self.seconds);
        Clock::new(Some(chrono_tz::UTC)).with_now_provider(Arc::new(move || {
            DateTime::<Utc>::from_timestamp(seconds.load(Ordering::SeqCst), 0).expect("valid timestamp")
        }))
    }
}

fn essay_schedule() -> serde_json::Value {
    json!({
        "schedule": [
            { "activity": "Essay", "start": "09:00", "end": "10:00", "duration": 1 }
        ],
        "unfinishedTasks": [],
        "waitingForConfirmation": [
            { "activity": "Reading", "start": "06:00", "end": "07:00", "duration": 1 }
        ],
        "emailSent": false,
        "calendarUpdated": true,
        "lastUpdate": "2026-02-16T08:00:00Z"
    })
}

async fn mount_schedule(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn state_for(server: &MockServer, clock: &ManualClock) -> AppState {
    let base_url = Url::parse(&server.uri()).expect("mock server url");
    AppState::new(Arc::new(ReqwestScheduleServiceClient::new(base_url)), clock.clock())
}

#[tokio::test]
async fn essay_moves_from_ongoing_to_completed_against_live_service() {
    let server = MockServer::start().await;
    mount_schedule(&server, essay_schedule()).await;
    Mock::given(method("POST"))
        .and(path("/api/complete-task"))
        .and(body_json(json!({
            "task": { "activity": "Essay", "start": "09:00", "end": "10:00", "duration": 1.0 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let manual = ManualClock::at("2026-02-16T09:30:00Z");
    let state = state_for(&server, &manual);
    assert_eq!(refresh_schedule(&state).await.expect("first fetch"), 1);

    let plan = daily_plan(&state).expect("plan at 09:30");
    assert_eq!(plan.schedule[0].state, Some(TaskState::Ongoing));
    assert!(!plan.schedule[0].can_complete);
    let essay_bar = plan
        .timeline
        .iter()
        .find(|bar| bar.name == "Essay")
        .expect("essay bar");
    assert_eq!(essay_bar.color, TimelineColor::Ongoing);
    assert!(complete_task(&state, plan.schedule[0].task.id.to_string()).await.is_err());

    manual.set("2026-02-16T10:01:00Z");
    let plan = daily_plan(&state).expect("plan at 10:01");
    let essay = &plan.schedule[0];
    assert_eq!(essay.state, Some(TaskState::Ended));
    assert!(essay.can_complete);

    let response = complete_task(&state, essay.task.id.to_string())
        .await
        .expect("complete essay");
    assert_eq!(response.generation, Some(2));

    let schedule_fetches = server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|request| request.url.path() == "/api/schedule")
        .count();
    assert_eq!(schedule_fetches, 2);
}

#[tokio::test]
async fn rejected_completion_keeps_current_snapshot() {
    let server = MockServer::start().await;
    mount_schedule(&server, essay_schedule()).await;
    Mock::given(method("POST"))
        .and(path("/api/complete-task"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let manual = ManualClock::at("2026-02-16T10:30:00Z");
    let state = state_for(&server, &manual);
    refresh_schedule(&state).await.expect("first fetch");
    let before = state.store().current().expect("read").expect("snapshot");

    let error = complete_task(&state, before.schedule[0].id.to_string())
        .await
        .expect_err("service rejects completion");
    assert!(error.contains("success=false"));

    let after = state.store().current().expect("read").expect("snapshot");
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(state.store().generation(), 1);
}

#[tokio::test]
async fn confirmation_sends_task_and_decision() {
    let server = MockServer::start().await;
    mount_schedule(&server, essay_schedule()).await;
    Mock::given(method("POST"))
        .and(path("/api/confirm-task"))
        .and(body_partial_json(json!({
            "task": { "activity": "Reading", "start": "06:00", "end": "07:00" },
            "isCompleted": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let manual = ManualClock::at("2026-02-16T11:00:00Z");
    let state = state_for(&server, &manual);
    refresh_schedule(&state).await.expect("first fetch");
    let plan = daily_plan(&state).expect("plan");
    assert!(plan.calendar_updated);

    let reading_id = plan.waiting_for_confirmation[0].id.to_string();
    confirm_task(&state, reading_id, true).await.expect("confirm reading");
}

#[tokio::test]
async fn unfinished_batch_posts_drafts() {
    let server = MockServer::start().await;
    mount_schedule(&server, essay_schedule()).await;
    Mock::given(method("POST"))
        .and(path("/api/update-unfinished"))
        .and(body_json(json!({
            "unfinishedTasks": [{ "activity": "Groceries", "duration": 1.0 }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let manual = ManualClock::at("2026-02-16T11:00:00Z");
    let state = state_for(&server, &manual);
    refresh_schedule(&state).await.expect("first fetch");
    smart_schedule::add_task(&state, " Groceries ".to_string()).expect("draft task");

    update_unfinished_tasks(&state).await.expect("submit batch");
}

#[tokio::test]
async fn server_error_keeps_stale_snapshot() {
    let server = MockServer::start().await;
    let manual = ManualClock::at("2026-02-16T09:30:00Z");
    let state = state_for(&server, &manual);

    Mock::given(method("GET"))
        .and(path("/api/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_json(essay_schedule()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    refresh_schedule(&state).await.expect("first fetch");

    Mock::given(method("GET"))
        .and(path("/api/schedule"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let error = refresh_schedule(&state).await.expect_err("service down");
    assert!(error.contains("503"));

    let plan = daily_plan(&state).expect("stale plan");
    assert_eq!(plan.schedule.len(), 1);
    assert_eq!(plan.schedule[0].task.name, "Essay");
}
