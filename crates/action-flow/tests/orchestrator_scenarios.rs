use std::sync::Arc;
use std::time::Duration;

use action_flow::{EngineConfig, FillError, Orchestrator, RunState};
use action_primitives::ScriptedSynthesizer;
use dom_adapter::{DomPort, EventKind, MemoryPage};
use serde_json::json;
use sheetform_core_types::{FailureKind, FieldDescriptor};
use tokio::time::Instant;

const SIGNUP: &str = r#"<html><body>
  <form id="signup">
    <label for="email">Email address</label>
    <input id="email" name="email" type="email" placeholder="you@example.com">
    <input id="nickname" name="nickname" value="old">
    <input id="terms" type="checkbox">
    <input id="newsletter" type="checkbox" checked>
    <input id="cv" type="file">
    <input id="promo" style="display: none" disabled>
    <textarea id="bio"></textarea>
    <button id="submit" type="submit">Create account</button>
  </form>
</body></html>"#;

fn seeded_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.timing.seed = Some(42);
    config
}

fn orchestrator(config: &EngineConfig) -> (MemoryPage, Orchestrator) {
    let page = MemoryPage::from_html(SIGNUP);
    let orchestrator = Orchestrator::new(Arc::new(page.clone()), config);
    (page, orchestrator)
}

fn field(name: &str, locator: &str, kind: &str, value: &str) -> FieldDescriptor {
    FieldDescriptor::new(name, locator, kind, value)
}

fn assert_counts_add_up(result: &sheetform_core_types::RunResult) {
    assert_eq!(
        result.success_count + result.error_count + result.skipped_count,
        result.total_count
    );
    assert_eq!(result.error_count, result.errors.len());
}

#[tokio::test(start_paused = true)]
async fn fills_email_and_accepts_terms() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Email", "email", "id", "ada@example.com"),
        field("Terms", "terms", "id", "CHECK"),
    ];

    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.total_count, 2);
    assert_eq!(result.success_count, 2);
    assert!(result.success());
    let email = page.find("#email").unwrap();
    let terms = page.find("#terms").unwrap();
    assert_eq!(page.value(email).as_deref(), Some("ada@example.com"));
    assert!(page.is_checked(terms));
    assert!(page.event_kinds(email).contains(&EventKind::Input));
    assert!(page.event_kinds(email).contains(&EventKind::Change));
    assert_eq!(orchestrator.state(), RunState::Idle);
}

#[tokio::test(start_paused = true)]
async fn email_and_name_located_checkbox() {
    let page = MemoryPage::from_html(
        r#"<html><body><input id="email"><input name="terms" type="checkbox"></body></html>"#,
    );
    let orchestrator = Orchestrator::new(Arc::new(page.clone()), &seeded_config());

    let result = orchestrator
        .run_value(&json!([
            {"fieldName": "Email", "locator": "email", "locatorKind": "id", "value": "a@b.com"},
            {"fieldName": "Agree", "locator": "terms", "locatorKind": "name", "value": "CHECK"}
        ]))
        .await
        .unwrap();

    assert_eq!(result.total_count, 2);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.error_count, 0);
    let email = page.find("#email").unwrap();
    let terms = page.find("input[name=terms]").unwrap();
    assert_eq!(page.value(email).as_deref(), Some("a@b.com"));
    assert!(page.is_checked(terms));
}

#[tokio::test(start_paused = true)]
async fn css_locators_accept_full_selector_syntax() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Email", "label + input", "css", "a@b.com"),
        field("Nickname", r#"input[name="NICKNAME" i]"#, "css", "ada"),
        field("Terms", "form input:nth-of-type(3)", "css", "CHECK"),
        field("Bio", "#signup > :nth-last-child(2)", "css", "Hello"),
        field("Submit", "button:not([disabled])", "css", "CLICK"),
    ];

    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.success_count, 5, "{:?}", result.errors);
    let value = |css: &str| page.value(page.find(css).unwrap());
    assert_eq!(value("#email").as_deref(), Some("a@b.com"));
    assert_eq!(value("#nickname").as_deref(), Some("ada"));
    assert_eq!(value("#bio").as_deref(), Some("Hello"));
    assert!(page.is_checked(page.find("#terms").unwrap()));
    let submit = page.find("#submit").unwrap();
    assert!(page.event_kinds(submit).contains(&EventKind::Click));
}

#[tokio::test(start_paused = true)]
async fn repeated_rows_on_one_element_leave_no_highlight_behind() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Nickname", "nickname", "id", "CLEAR").with_trigger("FAST"),
        field("Nickname", "nickname", "id", "Lyon").with_trigger("FAST"),
    ];

    let result = orchestrator.run(&fields).await.unwrap();
    assert_eq!(result.success_count, 2);

    tokio::time::sleep(Duration::from_secs(30)).await;
    let nickname = page.find("#nickname").unwrap();
    assert_eq!(page.value(nickname).as_deref(), Some("Lyon"));
    assert_eq!(page.style(nickname, "border"), "");
    assert_eq!(page.attribute(nickname, "style"), None);
}

#[tokio::test(start_paused = true)]
async fn missing_element_fails_after_three_attempts() {
    let (_page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![field("Phone", "phone", "id", "555-0100")];

    let started = Instant::now();
    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].kind, FailureKind::ElementNotFound);
    assert_eq!(result.errors[0].field_name, "Phone");
    assert_eq!(result.errors[0].locator, "phone");
    assert!(result.errors[0].message.contains("3 attempt"));
    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_counts_add_up(&result);
}

#[tokio::test(start_paused = true)]
async fn skip_trigger_excludes_field() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Nickname", "nickname", "id", "ada").with_trigger("OFF"),
        field("Bio", "bio", "id", "Hello"),
    ];

    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.total_count, 2);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.error_count, 0);
    let nickname = page.find("#nickname").unwrap();
    assert_eq!(page.value(nickname).as_deref(), Some("old"));
    assert!(page.event_kinds(nickname).is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_rows_are_skipped_not_failed() {
    let (_page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Size", "1.5 MB", "css", "x"),
        field("No locator", "  ", "id", "x"),
        field("No kind", "email", "", "x"),
    ];

    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.skipped_count, 3);
    assert_eq!(result.error_count, 0);
    assert_counts_add_up(&result);
}

#[tokio::test(start_paused = true)]
async fn check_on_text_input_fails_and_run_continues() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Nickname", "nickname", "id", "CHECK"),
        field("Bio", "bio", "id", "Mathematician"),
    ];

    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].kind, FailureKind::UnsupportedAction);
    assert_eq!(result.success_count, 1);
    let bio = page.find("#bio").unwrap();
    assert_eq!(page.value(bio).as_deref(), Some("Mathematician"));
}

#[tokio::test(start_paused = true)]
async fn file_input_is_unsupported() {
    let (_page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![field("CV", "cv", "id", "C:\\cv.pdf")];

    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.failures_of(FailureKind::UnsupportedElementType).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn check_and_uncheck_toggle_at_most_once() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Newsletter", "newsletter", "id", "check"),
        field("Terms", "terms", "id", "UNCHECK"),
        field("Terms", "terms", "id", "CHECK"),
        field("Terms again", "terms", "id", "CHECK"),
    ];

    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.success_count, 4);
    let newsletter = page.find("#newsletter").unwrap();
    let terms = page.find("#terms").unwrap();
    assert!(page.is_checked(newsletter));
    assert!(!page.event_kinds(newsletter).contains(&EventKind::Click));
    let clicks = page
        .event_kinds(terms)
        .into_iter()
        .filter(|kind| *kind == EventKind::Click)
        .count();
    assert_eq!(clicks, 1);
    assert!(page.is_checked(terms));
}

#[tokio::test(start_paused = true)]
async fn toggle_that_does_not_take_warns_by_default() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let terms = page.find("#terms").unwrap();
    page.freeze_checked(terms);

    let result = orchestrator
        .run(&[field("Terms", "terms", "id", "CHECK")])
        .await
        .unwrap();

    assert_eq!(result.success_count, 1);
    assert!(!page.is_checked(terms));
}

#[tokio::test(start_paused = true)]
async fn toggle_that_does_not_take_fails_in_strict_mode() {
    let mut config = seeded_config();
    config.strict_toggle_verification = true;
    let (page, orchestrator) = orchestrator(&config);
    let terms = page.find("#terms").unwrap();
    page.freeze_checked(terms);

    let result = orchestrator
        .run(&[field("Terms", "terms", "id", "CHECK")])
        .await
        .unwrap();

    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].kind, FailureKind::StateNotChanged);
}

#[tokio::test(start_paused = true)]
async fn focus_and_clear_keywords() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Nickname focus", "nickname", "id", "FOCUS"),
        field("Nickname clear", "nickname", "id", "Clear"),
    ];

    let nickname = page.find("#nickname").unwrap();
    let result = orchestrator.run(&fields[..1]).await.unwrap();
    assert_eq!(result.success_count, 1);
    assert_eq!(page.value(nickname).as_deref(), Some("old"));
    assert_eq!(page.focused(), Some(nickname));

    let result = orchestrator.run(&fields[1..]).await.unwrap();
    assert_eq!(result.success_count, 1);
    assert_eq!(page.value(nickname).as_deref(), Some(""));
    let kinds = page.event_kinds(nickname);
    assert!(kinds.contains(&EventKind::Input));
    assert!(kinds.contains(&EventKind::Change));
}

#[tokio::test(start_paused = true)]
async fn ninja_trigger_commits_exact_value() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![field("Nickname", "nickname", "id", "shadow").with_trigger("NINJA")];

    let started = Instant::now();
    let result = orchestrator.run(&fields).await.unwrap();

    assert!(result.success());
    let nickname = page.find("#nickname").unwrap();
    assert_eq!(page.value(nickname).as_deref(), Some("shadow"));
    // NINJA pacing band starts at 800 ms
    assert!(started.elapsed() >= Duration::from_millis(800));
}

#[tokio::test(start_paused = true)]
async fn explicit_delay_follows_a_success() {
    let (_page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![field("Bio", "bio", "id", "x").with_trigger("DELAY:2500")];

    let started = Instant::now();
    orchestrator.run(&fields).await.unwrap();

    // settle pause plus the explicit delay
    assert!(started.elapsed() >= Duration::from_millis(2700));
}

#[tokio::test(start_paused = true)]
async fn auto_and_label_locators_resolve() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Email", "Email address", "label", "a@b.c"),
        field("Submit", "Create account", "auto", "CLICK"),
    ];

    let result = orchestrator.run(&fields).await.unwrap();

    assert_eq!(result.success_count, 2);
    let email = page.find("#email").unwrap();
    let submit = page.find("#submit").unwrap();
    assert_eq!(page.value(email).as_deref(), Some("a@b.c"));
    assert!(page.event_kinds(submit).contains(&EventKind::Click));
}

#[tokio::test(start_paused = true)]
async fn hidden_disabled_element_is_prepared_before_fill() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let promo = page.find("#promo").unwrap();

    let result = orchestrator
        .run(&[field("Promo", "promo", "id", "SPRING").with_trigger("FAST")])
        .await
        .unwrap();

    assert!(result.success());
    assert_eq!(page.value(promo).as_deref(), Some("SPRING"));
    assert_eq!(page.attribute(promo, "disabled"), None);
    assert_eq!(page.style(promo, "display"), "");
    assert_eq!(page.style(promo, "border"), "3px solid #4CAF50");

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(page.style(promo, "border"), "");
}

#[tokio::test(start_paused = true)]
async fn concurrent_run_is_rejected_without_disturbing_the_active_one() {
    let (page, orchestrator) = orchestrator(&seeded_config());
    let fields = vec![
        field("Email", "email", "id", "ada@example.com"),
        field("Bio", "bio", "id", "Hello"),
    ];

    let (first, second) = tokio::join!(orchestrator.run(&fields), async {
        tokio::task::yield_now().await;
        assert_eq!(orchestrator.state(), RunState::Running);
        orchestrator.run(&fields).await
    });

    assert_eq!(second.unwrap_err(), FillError::AlreadyInProgress);
    let first = first.unwrap();
    assert_eq!(first.success_count, 2);
    let email = page.find("#email").unwrap();
    assert_eq!(page.value(email).as_deref(), Some("ada@example.com"));
    assert_eq!(orchestrator.state(), RunState::Idle);

    // the flag is released, so a later run is accepted
    assert!(orchestrator.run(&fields[..1]).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn wire_input_is_accepted_and_validated() {
    let (page, orchestrator) = orchestrator(&seeded_config());

    let err = orchestrator
        .run_value(&json!({"fieldName": "Email"}))
        .await
        .unwrap_err();
    assert!(matches!(err, FillError::MalformedFieldList(_)));
    assert_eq!(orchestrator.state(), RunState::Idle);

    let result = orchestrator
        .run_value(&json!([
            {"fieldName": "Email", "selector": "email", "selectorType": "id", "value": "x@y.z"},
            42,
            {"fieldName": "Terms", "locator": "#terms", "locatorKind": "css", "value": "CHECK", "trigger": "FAST"}
        ]))
        .await
        .unwrap();

    assert_eq!(result.total_count, 3);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.skipped_count, 1);
    let email = page.find("#email").unwrap();
    assert_eq!(page.value(email).as_deref(), Some("x@y.z"));
}

#[tokio::test(start_paused = true)]
async fn scripted_synthesizer_can_be_substituted() {
    let page = MemoryPage::from_html(SIGNUP);
    let dom: Arc<dyn DomPort> = Arc::new(page.clone());
    let synth = Arc::new(ScriptedSynthesizer::new(Arc::clone(&dom)));
    let orchestrator = Orchestrator::with_synthesizer(dom, synth, &seeded_config());

    let result = orchestrator
        .run(&[field("Bio", "bio", "id", "Hi").with_trigger("HUMAN")])
        .await
        .unwrap();

    assert!(result.success());
    let bio = page.find("#bio").unwrap();
    assert_eq!(
        page.event_kinds(bio),
        vec![EventKind::Input, EventKind::Change]
    );
}

#[tokio::test(start_paused = true)]
async fn result_serializes_with_wire_names() {
    let (_page, orchestrator) = orchestrator(&seeded_config());
    let result = orchestrator
        .run(&[field("Phone", "phone", "id", "1")])
        .await
        .unwrap();

    let wire = serde_json::to_value(&result).unwrap();
    assert_eq!(wire["totalCount"], 1);
    assert_eq!(wire["errorCount"], 1);
    assert_eq!(wire["errors"][0]["fieldName"], "Phone");
    assert_eq!(wire["errors"][0]["kind"], "ElementNotFound");
}
