//! The reference terminal port driven through the evaluator.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tollgate_approval::prelude::*;

#[derive(Clone, Default)]
struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn evaluator_reading(input: &str) -> (PolicyEvaluator, Transcript) {
    let transcript = Transcript::default();
    let port = CliConfirmationPort::with_io(
        Cursor::new(input.as_bytes().to_vec()),
        transcript.clone(),
    );
    let rules = RuleConfiguration::builder()
        .sensitive_keywords(["delete"])
        .confirmation_port(Arc::new(port))
        .build()
        .unwrap();
    (PolicyEvaluator::new(rules), transcript)
}

fn delete_file() -> ActionDescriptor {
    ActionDescriptor::new("delete_file")
        .unwrap()
        .with_description("Delete a file")
        .with_argument("path", json!("a.txt"))
}

#[tokio::test]
async fn test_yes_after_garbage_and_blank_lines() {
    let (evaluator, transcript) = evaluator_reading("\nmaybe\nyes\n");
    assert!(evaluator.evaluate(&delete_file()).await);

    let text = transcript.text();
    assert!(text.contains("delete_file"));
    assert!(text.contains("Delete a file"));
    assert!(text.contains("\"path\": \"a.txt\""));
    assert!(text.contains("Invalid input"));
}

#[tokio::test]
async fn test_explicit_no_denies() {
    let (evaluator, _) = evaluator_reading("n\n");
    assert!(!evaluator.evaluate(&delete_file()).await);
}

#[tokio::test]
async fn test_end_of_input_denies() {
    let (evaluator, transcript) = evaluator_reading("");
    let evaluation = evaluator.evaluate_detailed(&delete_file()).await;
    assert_eq!(evaluation.outcome, ConfirmationOutcome::Rejected);
    assert!(transcript.text().contains("Cancelled"));
}

#[tokio::test]
async fn test_rules_port_is_used_when_builder_has_none() {
    let (evaluator, _) = evaluator_reading("y\n");
    assert_eq!(evaluator.confirmation_port().name(), "cli");
}
