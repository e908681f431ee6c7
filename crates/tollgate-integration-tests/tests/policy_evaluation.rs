//! End-to-end evaluation through the public API: classification tiers,
//! confirmation counting and the audit trail.

use std::sync::Arc;

use serde_json::json;
use tollgate_approval::prelude::*;
use tollgate_approval::MatchedField;
use tollgate_test::{RecordingAuditSink, Reply, ScriptedPort, StaticPort, delete_file, read_file};

fn delete_only() -> RuleConfiguration {
    RuleConfiguration::builder()
        .sensitive_keywords(["delete"])
        .build()
        .unwrap()
}

fn evaluator_with(rules: RuleConfiguration, port: Arc<dyn ConfirmationPort>) -> PolicyEvaluator {
    PolicyEvaluator::builder(rules)
        .confirmation_port(port)
        .build()
}

// ---------------------------------------------------------------------------
// Tool level
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_safe_action_never_reaches_the_port() {
    let port = StaticPort::rejecting();
    let evaluator = evaluator_with(delete_only(), Arc::new(port.clone()));

    let list_users = ActionDescriptor::new("list_users")
        .unwrap()
        .with_description("List users");

    assert!(evaluator.evaluate(&list_users).await);
    assert_eq!(port.call_count(), 0);
}

#[tokio::test]
async fn test_approved_delete_is_permitted() {
    let port = StaticPort::approving();
    let evaluator = evaluator_with(delete_only(), Arc::new(port.clone()));

    let action = ActionDescriptor::new("delete_file")
        .unwrap()
        .with_description("Delete a file")
        .with_argument("path", json!("a.txt"));

    assert!(evaluator.evaluate(&action).await);
    assert_eq!(port.call_count(), 1);
}

#[tokio::test]
async fn test_keyword_in_description_only_escalates() {
    let port = StaticPort::rejecting();
    let evaluator = evaluator_with(delete_only(), Arc::new(port.clone()));

    let action = ActionDescriptor::new("cleanup")
        .unwrap()
        .with_description("DELETE stale cache entries");

    let evaluation = evaluator.evaluate_detailed(&action).await;
    assert_eq!(
        evaluation.sensitivity,
        Sensitivity::ToolLevel {
            keyword: "delete".to_string(),
            field: MatchedField::Description,
        }
    );
    assert!(!evaluation.is_permitted());
    assert_eq!(port.call_count(), 1);
}

#[tokio::test]
async fn test_substring_match_is_not_word_aware() {
    let rules = RuleConfiguration::builder()
        .sensitive_keywords(["run"])
        .build()
        .unwrap();
    let evaluator = evaluator_with(rules, Arc::new(StaticPort::rejecting()));

    let truncate = ActionDescriptor::new("truncate_log").unwrap();
    assert!(evaluator.classify(&truncate).requires_confirmation());
}

#[tokio::test]
async fn test_verdict_is_the_port_answer_for_each_sensitive_call() {
    let port = ScriptedPort::new()
        .then(Reply::Approve)
        .then(Reply::Reject)
        .then(Reply::Approve);
    let evaluator = evaluator_with(
        RuleConfiguration::default(),
        Arc::new(port.clone()),
    );

    assert!(evaluator.evaluate(&delete_file("/tmp/1")).await);
    assert!(!evaluator.evaluate(&delete_file("/tmp/2")).await);
    assert!(evaluator.evaluate(&delete_file("/tmp/3")).await);
    assert_eq!(port.call_count(), 3);
}

#[tokio::test]
async fn test_repeated_evaluation_is_stable() {
    let evaluator = evaluator_with(RuleConfiguration::default(), Arc::new(StaticPort::rejecting()));
    let action = delete_file("/tmp/x");

    let first = evaluator.evaluate_detailed(&action).await;
    let second = evaluator.evaluate_detailed(&action).await;
    assert_eq!(first, second);
    assert!(!first.is_permitted());
}

// ---------------------------------------------------------------------------
// Call level
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_path_rule_escalates_only_matching_values() {
    let port = StaticPort::rejecting();
    let rules = RuleConfiguration::builder()
        .sensitive_keywords(["delete"])
        .argument_rule("read_file", "path", ["/etc"])
        .build()
        .unwrap();
    let evaluator = evaluator_with(rules, Arc::new(port.clone()));

    assert!(evaluator.evaluate(&read_file("/tmp/note.txt")).await);
    assert_eq!(port.call_count(), 0);

    let evaluation = evaluator.evaluate_detailed(&read_file("/etc/passwd")).await;
    assert_eq!(
        evaluation.sensitivity,
        Sensitivity::Argument {
            argument: "path".to_string(),
            keyword: "/etc".to_string(),
        }
    );
    assert!(!evaluation.is_permitted());
    assert_eq!(port.call_count(), 1);
}

#[tokio::test]
async fn test_wildcard_rule_escalates_any_value() {
    let rules = RuleConfiguration::builder()
        .sensitive_keywords(["delete"])
        .argument_rule("kubectl", "namespace", ["*"])
        .build()
        .unwrap();
    let evaluator = evaluator_with(rules, Arc::new(StaticPort::rejecting()));

    for value in [json!("default"), json!(""), json!(null), json!({"nested": [1, 2]})] {
        let action = ActionDescriptor::new("kubectl")
            .unwrap()
            .with_argument("namespace", value);
        assert!(
            evaluator.classify(&action).requires_confirmation(),
            "wildcard must match {action}"
        );
    }

    let without = ActionDescriptor::new("kubectl")
        .unwrap()
        .with_argument("context", json!("prod"));
    assert_eq!(evaluator.classify(&without), Sensitivity::Safe);
}

#[tokio::test]
async fn test_undeclared_actions_are_not_argument_checked() {
    let rules = RuleConfiguration::builder()
        .sensitive_keywords(["delete"])
        .argument_rule("read_file", "path", ["/etc"])
        .build()
        .unwrap();
    let evaluator = evaluator_with(rules, Arc::new(StaticPort::rejecting()));

    let write = ActionDescriptor::new("write_file")
        .unwrap()
        .with_argument("path", json!("/etc/hosts"));
    assert!(evaluator.evaluate(&write).await);
}

#[tokio::test]
async fn test_tool_level_match_short_circuits_argument_rules() {
    let rules = RuleConfiguration::builder()
        .sensitive_keywords(["delete"])
        .argument_rule("delete_file", "path", ["/etc"])
        .build()
        .unwrap();
    let evaluator = evaluator_with(rules, Arc::new(StaticPort::rejecting()));

    let sensitivity = evaluator.classify(&delete_file("/etc/hosts"));
    assert!(matches!(
        sensitivity,
        Sensitivity::ToolLevel {
            field: MatchedField::Name,
            ..
        }
    ));
}

#[tokio::test]
async fn test_non_string_arguments_are_stringified() {
    let rules = RuleConfiguration::builder()
        .argument_rule("scale", "replicas", ["0"])
        .argument_rule("deploy", "targets", ["prod"])
        .build()
        .unwrap();
    let evaluator = evaluator_with(rules, Arc::new(StaticPort::rejecting()));

    let scale = ActionDescriptor::new("scale")
        .unwrap()
        .with_argument("replicas", json!(0));
    assert!(evaluator.classify(&scale).requires_confirmation());

    let deploy = ActionDescriptor::new("deploy")
        .unwrap()
        .with_argument("targets", json!(["staging", "PROD-eu"]));
    assert!(evaluator.classify(&deploy).requires_confirmation());
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_every_evaluation_is_audited() {
    let sink = RecordingAuditSink::new();
    let evaluator = PolicyEvaluator::builder(RuleConfiguration::default())
        .confirmation_port(Arc::new(StaticPort::rejecting()))
        .audit_sink(Arc::new(sink.clone()))
        .build();

    evaluator.evaluate(&read_file("/tmp/a")).await;
    evaluator
        .evaluate(&delete_file("/tmp/a").with_client("ci-bot"))
        .await;

    let records = sink.records();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].action, "read_file");
    assert_eq!(records[0].escalation, Sensitivity::Safe);
    assert_eq!(records[0].outcome, ConfirmationOutcome::NotRequired);
    assert!(records[0].permitted);

    assert_eq!(records[1].action, "delete_file");
    assert_eq!(records[1].client.as_deref(), Some("ci-bot"));
    assert_eq!(records[1].tier, "tool");
    assert_eq!(records[1].outcome, ConfirmationOutcome::Rejected);
    assert!(!records[1].permitted);
    assert_ne!(records[0].evaluation_id, records[1].evaluation_id);
}
