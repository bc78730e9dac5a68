//! Property-based tests using proptest.
//!
//! Covers outcome classification, placeholder substitution, pacing-hint
//! parsing and tolerance of arbitrary JSON in task and message bodies.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use http::StatusCode;
use proptest::prelude::*;
use serde_json::Value;

use tacklebox::shared::headers::parse_retry_after;
use tacklebox::types::registry::substitute;
use tacklebox::{MessageEntry, MessageId, Outcome, Severity, Task, TaskState};

// ─── Arbitrary Strategies ───────────────────────────────────────────────────

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop::sample::select(vec![Severity::Ok, Severity::Warning, Severity::Critical])
}

fn arb_status() -> impl Strategy<Value = StatusCode> {
    (200u16..600).prop_filter_map("valid status", |code| StatusCode::from_u16(code).ok())
}

fn arb_task_state() -> impl Strategy<Value = TaskState> {
    prop::sample::select(vec![
        TaskState::New,
        TaskState::Starting,
        TaskState::Running,
        TaskState::Suspended,
        TaskState::Interrupted,
        TaskState::Pending,
        TaskState::Stopping,
        TaskState::Completed,
        TaskState::Killed,
        TaskState::Exception,
        TaskState::Service,
        TaskState::Cancelling,
        TaskState::Cancelled,
    ])
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 %.]{0,20}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::hash_map(
                prop_oneof![
                    Just("TaskState".to_string()),
                    Just("PercentComplete".to_string()),
                    Just("MessageId".to_string()),
                    Just("MessageArgs".to_string()),
                    "[A-Za-z]{1,10}",
                ],
                inner,
                0..6
            )
            .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// ─── Outcome Classification ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn failure_status_is_never_masked(
        code in 400u16..600,
        severities in prop::collection::vec(arb_severity(), 0..8),
    ) {
        let status = StatusCode::from_u16(code).unwrap();
        prop_assert_eq!(Outcome::classify(status, severities), Outcome::Failure);
    }

    #[test]
    fn outcome_follows_worst_severity(
        status in arb_status(),
        severities in prop::collection::vec(arb_severity(), 0..8),
    ) {
        let outcome = Outcome::classify(status, severities.iter().copied());
        let failed_status = status.is_client_error() || status.is_server_error();
        let expected = if failed_status || severities.contains(&Severity::Critical) {
            Outcome::Failure
        } else if severities.contains(&Severity::Warning) {
            Outcome::Warning
        } else {
            Outcome::Success
        };
        prop_assert_eq!(outcome, expected);
    }

    #[test]
    fn severity_order_does_not_matter(
        status in arb_status(),
        mut severities in prop::collection::vec(arb_severity(), 0..8),
    ) {
        let forward = Outcome::classify(status, severities.iter().copied());
        severities.reverse();
        prop_assert_eq!(Outcome::classify(status, severities), forward);
    }
}

// ─── Substitution ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn templates_without_placeholders_are_unchanged(
        template in "[a-zA-Z .,']{0,60}",
        args in prop::collection::vec("[a-z0-9]{0,8}", 0..4),
    ) {
        prop_assert_eq!(substitute(&template, &args), template);
    }

    #[test]
    fn every_supplied_argument_is_substituted(
        args in prop::collection::vec("[a-z]{1,8}", 1..12),
    ) {
        let template = (1..=args.len())
            .map(|i| format!("<%{}>", i))
            .collect::<Vec<_>>()
            .join(" ");
        let expected = args
            .iter()
            .map(|a| format!("<{}>", a))
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(substitute(&template, &args), expected);
    }

    #[test]
    fn missing_arguments_leave_placeholders(
        args in prop::collection::vec("[a-z]{1,8}", 0..3),
    ) {
        let rendered = substitute("value %5 rejected", &args);
        prop_assert_eq!(rendered, "value %5 rejected");
    }
}

// ─── Pacing Hints ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn positive_delta_seconds_are_honoured(secs in 1u64..86_400) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prop_assert_eq!(
            parse_retry_after(&secs.to_string(), now),
            Some(Duration::from_secs(secs))
        );
    }

    #[test]
    fn non_positive_hints_fall_back(secs in -86_400i64..=0) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prop_assert_eq!(parse_retry_after(&secs.to_string(), now), None);
    }

    #[test]
    fn arbitrary_hint_text_never_panics(raw in "\\PC{0,40}") {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        if let Some(delay) = parse_retry_after(&raw, now) {
            prop_assert!(!delay.is_zero());
        }
    }
}

// ─── Fuzz Deserialization ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn task_state_round_trips(state in arb_task_state()) {
        let json = serde_json::to_value(state).unwrap();
        let parsed: TaskState = serde_json::from_value(json).unwrap();
        prop_assert_eq!(parsed, state);
        prop_assert_eq!(state.is_abnormal(), state.is_terminal() && state != TaskState::Completed);
    }

    #[test]
    fn arbitrary_json_never_panics_task_or_message(value in arb_json()) {
        if let Ok(task) = serde_json::from_value::<Task>(value.clone()) {
            prop_assert!(task.percent_complete().is_none_or(|p| p <= 100));
        }
        let _ = serde_json::from_value::<MessageEntry>(value);
    }

    #[test]
    fn message_id_parse_never_panics(raw in "[A-Za-z0-9.]{0,40}") {
        if let Some(id) = MessageId::parse(&raw) {
            prop_assert!(!id.key.is_empty());
            prop_assert!(!id.registry.is_empty());
        }
    }
}
