//! Sign-in through tutor onboarding over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::watch;
use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use dersimiz_client::api::HttpGateway;
use dersimiz_client::config::ClientConfig;
use dersimiz_client::i18n::Locale;
use dersimiz_client::locations::{LocationPicker, PickOutcome};
use dersimiz_client::model::Role;
use dersimiz_client::onboarding::{
    BlockReason, Gender, OnboardingController, OnboardingStep, StepOutcome,
};
use dersimiz_client::session::{PostLoginRoute, SessionStore};
use dersimiz_client::storage::MemoryCredentialStore;

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": data}))
}

fn user(role: Option<&str>) -> Value {
    json!({
        "id": "u1",
        "phone_number": "+905551112233",
        "role": role,
        "full_name": null,
        "is_approved": false,
        "is_rejected": false,
        "onboarding_completed": false
    })
}

async fn mount(server: &MockServer, verb: &str, route: &str, data: Value) {
    Mock::given(method(verb))
        .and(path(format!("/api/v1{route}")))
        .respond_with(ok(data))
        .mount(server)
        .await;
}

async fn mount_locations(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/locations"))
        .and(query_param_is_missing("parent_id"))
        .respond_with(ok(json!({"locations": [
            {"id": "tr", "type": "country", "name": {"en": "Turkey", "tr": "Türkiye"}}
        ]})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/locations"))
        .and(query_param("parent_id", "tr"))
        .respond_with(ok(json!({"locations": [
            {"id": "ist", "parent_id": "tr", "type": "city", "name": {"en": "Istanbul"}}
        ]})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/locations"))
        .and(query_param("parent_id", "ist"))
        .respond_with(ok(json!({"locations": []})))
        .mount(server)
        .await;
}

fn bodies(requests: &[Request], verb: &str, route: &str) -> Vec<Value> {
    let full = format!("/api/v1{route}");
    requests
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == full)
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
        .collect()
}

#[tokio::test]
async fn tutor_signs_in_and_completes_onboarding() {
    let server = MockServer::start().await;
    let credentials = Arc::new(MemoryCredentialStore::new());
    let (_locale_tx, locale_rx) = watch::channel(Locale::En);
    let gateway = Arc::new(
        HttpGateway::with_base_url(
            format!("{}/api/v1", server.uri()),
            Duration::from_secs(5),
            credentials.clone(),
            locale_rx,
        )
        .unwrap(),
    );
    let session = Arc::new(SessionStore::new(
        gateway.clone(),
        credentials.clone(),
        &ClientConfig::default(),
    ));

    mount(&server, "POST", "/auth/request-otp", json!({"session_token": "s1"})).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/verify-otp"))
        .and(body_partial_json(json!({
            "phone_number": "+905551112233",
            "otp_code": "123456",
            "session_token": "s1"
        })))
        .respond_with(ok(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "user": user(None),
            "is_new_user": true
        })))
        .mount(&server)
        .await;
    mount(&server, "PUT", "/profile", json!({"user": user(Some("tutor"))})).await;
    mount(&server, "GET", "/onboarding/data", json!({
        "school_types": [{"id": "hs", "name": {"en": "High school"}}],
        "grades": [{"id": "g9", "school_type_id": "hs", "name": {"en": "9"}}],
        "lesson_types": [{"id": "math", "slug": "math", "name": {"en": "Maths"}}]
    }))
    .await;
    mount_locations(&server).await;
    mount(&server, "POST", "/onboarding/step", json!({})).await;
    mount(&server, "POST", "/tutor/lessons", json!({})).await;
    mount(&server, "PUT", "/tutor/availability", json!({})).await;
    mount(&server, "POST", "/onboarding/complete", json!({})).await;

    // Sign in and pick a role.
    let challenge = session.request_otp("555 111 22 33").await.unwrap();
    let login = session.login(challenge.verify("123456").unwrap()).await.unwrap();
    assert_eq!(login.route(), PostLoginRoute::RoleSelection);
    session.select_role(Role::Tutor).await.unwrap();

    let onboarding = OnboardingController::for_session(session.clone(), gateway.clone(), Locale::En)
        .await
        .expect("signed-in tutor");
    assert_eq!(onboarding.progress(), (1, 8));
    let reference = onboarding.load_reference_data().await.unwrap();
    assert_eq!(reference.grades_for("hs").count(), 1);

    // Personal info.
    onboarding.set_personal_info("Ayşe Yılmaz", "1992", Some(Gender::Female));
    assert_eq!(onboarding.next().await, StepOutcome::Advance(OnboardingStep::Location));

    // Location, drilled down through the picker.
    let mut picker = LocationPicker::new(gateway.clone(), Locale::En);
    picker.open().await.unwrap();
    let country = picker.options()[0].clone();
    assert_eq!(picker.select_item(&country).await.unwrap(), PickOutcome::Descended);
    let city = picker.options()[0].clone();
    let PickOutcome::Resolved(selection) = picker.select_item(&city).await.unwrap() else {
        panic!("Istanbul has no children");
    };
    assert_eq!(selection.breadcrumb, vec!["Turkey", "Istanbul"]);
    onboarding.set_location(selection);
    assert_eq!(onboarding.next().await, StepOutcome::Advance(OnboardingStep::Education));

    // Education, bio, pricing.
    onboarding.toggle_school_type("hs");
    onboarding.toggle_grade("hs", "g9");
    assert_eq!(onboarding.next().await, StepOutcome::Advance(OnboardingStep::Bio));
    onboarding.set_bio("Maths tutor with ten years of experience.");
    assert_eq!(
        onboarding.next().await,
        StepOutcome::Advance(OnboardingStep::LessonsPricing)
    );
    onboarding.toggle_lesson("math");
    onboarding.set_price("math", "abc");
    assert!(matches!(
        onboarding.next().await,
        StepOutcome::Blocked(BlockReason::Validation(_))
    ));
    onboarding.set_price("math", "250");
    assert_eq!(
        onboarding.next().await,
        StepOutcome::Advance(OnboardingStep::Availability)
    );

    // Availability arrives seeded with the daytime window.
    assert_eq!(onboarding.edit_availability(|a| a.count_for_week()), 70);
    onboarding.edit_availability(|a| a.clear_day(0)).unwrap();
    assert_eq!(onboarding.edit_availability(|a| a.count_for_week()), 60);
    assert_eq!(onboarding.next().await, StepOutcome::Advance(OnboardingStep::Photo));

    assert_eq!(onboarding.next().await, StepOutcome::Advance(OnboardingStep::Review));
    let StepOutcome::Complete(Some(done)) = onboarding.next().await else {
        panic!("onboarding should complete");
    };
    assert!(done.onboarding_completed);
    onboarding.flush().await;

    let requests = server.received_requests().await.unwrap();

    let lessons = bodies(&requests, "POST", "/tutor/lessons");
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0]["price_per_hour_cents"], 25_000);

    let availability = bodies(&requests, "PUT", "/tutor/availability");
    assert_eq!(availability[0]["slots"].as_array().unwrap().len(), 60);

    let steps = bodies(&requests, "POST", "/onboarding/step");
    assert_eq!(steps.len(), 7);
    let mut indices: Vec<u64> = steps.iter().filter_map(|s| s["step"].as_u64()).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6]);

    let complete = bodies(&requests, "POST", "/onboarding/complete");
    assert_eq!(complete.len(), 1);
    assert_eq!(complete[0]["onboarding_completed"], true);
    assert_eq!(complete[0]["location_id"], "ist");
    assert_eq!(complete[0]["full_name"], "Ayşe Yılmaz");
    assert_eq!(complete[0]["grades_by_school_type"], json!({"hs": ["g9"]}));

    assert!(session.user().await.unwrap().onboarding_completed);
}
