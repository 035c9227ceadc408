use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use react_agent::SessionBuilder;
use react_agent::core::conversation::Turn;
use react_agent::core::{AgentErrorKind, RegistryError};
use react_agent::tools::CalculatorTool;
use react_agent_test_model::TestModelProvider;
use tokio::time::sleep;

#[tokio::test]
async fn test_builtin_tools() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response("Action: calculator\nAction Input: 2+2");
    provider.add_text_response("Final Answer: 4");
    let steps = Arc::new(AtomicUsize::new(0));

    let session = SessionBuilder::with_model_provider(provider.clone())
        .on_step({
            let steps = Arc::clone(&steps);
            move |entry| {
                assert_eq!(entry.observation(), "4");
                steps.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build()
        .unwrap();
    let outcome = session.send_message("What is 2+2?").await;
    assert_eq!(outcome.answer(), Some("4"));
    assert_eq!(steps.load(Ordering::SeqCst), 1);

    let transcript = session.transcript().await;
    assert_eq!(
        transcript.turns(),
        [Turn::user("What is 2+2?"), Turn::agent("4")]
    );

    let requests = provider.requests();
    assert!(requests[0].prompt.contains("get_word_length: Returns"));
    assert!(requests[0].prompt.contains("calculator: Evaluates"));
    assert!(requests[1].prompt.contains("Observation: 4\n"));
}

#[tokio::test]
async fn test_turns_are_sequential() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(5));
    provider.add_text_response("Final Answer: first");
    provider.add_text_response("Final Answer: second");

    let session = SessionBuilder::with_model_provider(provider)
        .build()
        .unwrap();
    let (a, b) = tokio::join!(
        session.send_message("one"),
        session.send_message("two")
    );
    assert_eq!(a.answer(), Some("first"));
    assert_eq!(b.answer(), Some("second"));

    let transcript = session.transcript().await;
    assert_eq!(
        transcript.turns(),
        [
            Turn::user("one"),
            Turn::agent("first"),
            Turn::user("two"),
            Turn::agent("second"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_forked_sessions_run_in_parallel() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(5));
    provider.add_text_response("Final Answer: hello");
    provider.add_text_response("Final Answer: hello");

    let session = Arc::new(
        SessionBuilder::with_model_provider(provider)
            .build()
            .unwrap(),
    );
    let forked = Arc::new(session.fork());

    let handles = [Arc::clone(&session), Arc::clone(&forked)].map(|session| {
        tokio::spawn(async move { session.send_message("hi").await })
    });
    for handle in handles {
        assert_eq!(handle.await.unwrap().answer(), Some("hello"));
    }

    assert_eq!(session.transcript().await.len(), 2);
    assert_eq!(forked.transcript().await.len(), 2);
}

#[tokio::test]
async fn test_fork_starts_empty() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response("Final Answer: hi");

    let session = SessionBuilder::with_model_provider(provider)
        .build()
        .unwrap();
    session.send_message("hello").await;

    let forked = session.fork();
    assert!(forked.transcript().await.is_empty());
    assert_eq!(forked.agent().tools().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_in_flight_turn() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(10));
    provider.add_text_response("Action: calculator\nAction Input: 1+1");
    provider.add_text_response("Final Answer: fine");

    let session = SessionBuilder::with_model_provider(provider.clone())
        .build()
        .unwrap();
    let (outcome, _) = tokio::join!(session.send_message("slow"), async {
        sleep(Duration::from_millis(5)).await;
        session.cancel();
    });
    assert_eq!(
        outcome.error().map(|err| err.kind()),
        Some(AgentErrorKind::Cancelled)
    );
    assert_eq!(provider.consumed(), 1);
    assert!(session.transcript().await.is_empty());

    // The next turn gets a fresh token.
    let outcome = session.send_message("again").await;
    assert_eq!(outcome.answer(), Some("fine"));
}

#[tokio::test]
async fn test_empty_message() {
    let session =
        SessionBuilder::with_model_provider(TestModelProvider::default())
            .build()
            .unwrap();
    let outcome = session.send_message("   ").await;
    assert_eq!(
        outcome.error().map(|err| err.kind()),
        Some(AgentErrorKind::EmptyInput)
    );
}

#[test]
fn test_duplicate_tool() {
    let err = SessionBuilder::with_model_provider(TestModelProvider::default())
        .with_tool(CalculatorTool::new())
        .build()
        .err()
        .unwrap();
    assert_eq!(err, RegistryError::DuplicateTool("calculator".to_owned()));
}
