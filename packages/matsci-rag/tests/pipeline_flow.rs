//! Integration tests for the query pipeline.
//!
//! These tests drive whole runs through mock collaborators:
//! 1. Identifier-scoped retrieval
//! 2. Similarity retrieval with a clamped record count
//! 3. Short-circuit to clarification
//! 4. Failure, cancellation and consumer disconnects

use matsci_rag::{
    testing::{MockGateway, MockRetriever, MockRetrieverCall},
    ChannelSink, ChatMessage, ConversationState, NoopReporter, NullSink, Pipeline,
    PipelineConfig, ProgressReporter, RagError, RunContext, Stage, TraceReporter, TraceState,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

// Substrings that identify each stage's prompt
const SUMMARIZE: &str = "only rephrase";
const ATTRIBUTES: &str = "is_context_available";
const SEARCH_QUERY: &str = "explicitly include";
const RESULTS_LIMIT: &str = "required_data_points";
const ANSWER: &str = "Use the following pieces of context";
const CLARIFY: &str = "returned no information";

fn knowledge_base() -> MockRetriever {
    MockRetriever::new()
        .with_context("Material ID: mp-1234; The material is not theoretical; Electronic properties: band gap = 1.200 eV")
        .with_context("Material ID: mp-5678; The material is theoretical; Electronic properties: band gap = 3.400 eV")
        .with_context("Material ID: mp-9; The material is not theoretical; Stability: Stable")
}

fn relevant(attributes: &[&str]) -> serde_json::Value {
    json!({
        "related_attributes": attributes,
        "is_context_available": true
    })
}

fn gateway_for(summary: &str) -> MockGateway {
    MockGateway::new()
        .with_text(SUMMARIZE, summary)
        .with_json(ATTRIBUTES, relevant(&["Material ID", "Electronic properties"]))
        .with_text(SEARCH_QUERY, "band gap electronic properties")
        .with_stream(ANSWER, ["The band gap ", "is 1.2 eV", "."])
        .with_stream(CLARIFY, ["Please give ", "a material ID."])
}

#[tokio::test]
async fn test_identifier_question_runs_every_stage() {
    let pipeline = Pipeline::new(
        gateway_for("What is the band gap of mp-1234?"),
        knowledge_base(),
    );

    let answer = pipeline
        .ask("What is the band gap of MP-1234?", vec![])
        .await
        .unwrap();

    assert_eq!(answer.output, "The band gap is 1.2 eV.");
    assert_eq!(
        answer.visited,
        vec![
            Stage::Summarize,
            Stage::RelatedAttributes,
            Stage::SearchQuery,
            Stage::ResultsLimit,
            Stage::RetrieveContext,
            Stage::FinalResponse,
        ]
    );

    // Identifiers skip the record-count judgment entirely
    assert!(!pipeline.gateway().was_prompted_with(RESULTS_LIMIT));
    assert_eq!(
        pipeline.retriever().calls(),
        vec![MockRetrieverCall::SearchByIds {
            ids: vec!["mp-1234".to_string()],
            limit: 10,
        }]
    );

    assert_eq!(answer.trace.state, TraceState::Complete);
    let link = "[https://next-gen.materialsproject.org/materials/mp-1234](https://next-gen.materialsproject.org/materials/mp-1234)";
    assert!(answer.trace.messages.iter().any(|m| m.contains(link)));
    assert!(answer
        .trace
        .messages
        .iter()
        .any(|m| m.starts_with("**Step: Summarizing previous conversation**")));
}

#[tokio::test]
async fn test_follow_up_resolves_identifier_from_history() {
    let pipeline = Pipeline::new(
        gateway_for("What is the band gap of mp-5678?"),
        knowledge_base(),
    );
    let history = vec![
        ChatMessage::human("Tell me about mp-5678"),
        ChatMessage::ai("It is a theoretical compound."),
    ];

    pipeline.ask("And its band gap?", history).await.unwrap();

    let summarize_prompt = pipeline.gateway().calls()[0].prompt().to_string();
    assert!(summarize_prompt.contains("human: Tell me about mp-5678"));
    assert_eq!(
        pipeline.retriever().calls(),
        vec![MockRetrieverCall::SearchByIds {
            ids: vec!["mp-5678".to_string()],
            limit: 10,
        }]
    );
}

#[tokio::test]
async fn test_record_count_is_clamped_to_maximum() {
    let gateway = gateway_for("Which materials have the widest band gap?")
        .with_json(RESULTS_LIMIT, json!({"required_data_points": 57}));
    let pipeline = Pipeline::new(gateway, knowledge_base());

    pipeline
        .ask("Which materials have the widest band gap?", vec![])
        .await
        .unwrap();

    assert_eq!(
        pipeline.retriever().calls(),
        vec![MockRetrieverCall::Search {
            query: "band gap electronic properties".to_string(),
            k: 10,
        }]
    );
}

#[tokio::test]
async fn test_zero_record_count_is_raised_to_one() {
    let gateway = gateway_for("Which material is the most stable?")
        .with_json(RESULTS_LIMIT, json!({"required_data_points": 0}));
    let pipeline = Pipeline::new(gateway, knowledge_base());

    let run = pipeline
        .run(
            ConversationState::new("Which material is the most stable?", vec![]),
            &RunContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.state.required_data_points(), Some(1));
    assert_eq!(run.state.material_ids(), None);
    assert_eq!(run.state.contexts().map(|c| c.len()), Some(1));
}

#[tokio::test]
async fn test_no_relevant_attributes_short_circuits_to_clarification() {
    let gateway = MockGateway::new()
        .with_text(SUMMARIZE, "What is the weather today?")
        .with_json(ATTRIBUTES, json!({"related_attributes": [], "is_context_available": false}))
        .with_stream(CLARIFY, ["Please give ", "a material ID."]);
    let pipeline = Pipeline::new(gateway, knowledge_base());

    let run = pipeline
        .run(
            ConversationState::new("What is the weather today?", vec![]),
            &RunContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        run.visited,
        vec![Stage::Summarize, Stage::RelatedAttributes, Stage::FinalResponse]
    );
    assert_eq!(run.output(), "Please give a material ID.");
    assert_eq!(run.state.contexts(), None);
    assert_eq!(run.state.search_query(), None);
    assert!(pipeline.retriever().calls().is_empty());
    assert!(!pipeline.gateway().was_prompted_with(ANSWER));
}

#[tokio::test]
async fn test_malformed_classifier_json_asks_for_clarification() {
    let gateway = MockGateway::new()
        .with_text(SUMMARIZE, "Tell me something")
        .with_malformed_json(ATTRIBUTES)
        .with_stream(CLARIFY, ["Which material?"]);
    let pipeline = Pipeline::new(gateway, knowledge_base());

    let answer = pipeline.ask("Tell me something", vec![]).await.unwrap();

    assert_eq!(answer.output, "Which material?");
    assert_eq!(answer.trace.state, TraceState::Complete);
    assert!(pipeline.gateway().was_prompted_with(CLARIFY));
    assert!(pipeline.retriever().calls().is_empty());
}

#[tokio::test]
async fn test_empty_retrieval_uses_clarification_prompt() {
    let pipeline = Pipeline::new(
        gateway_for("What is the band gap of mp-4242?"),
        MockRetriever::new(),
    );

    let run = pipeline
        .run(
            ConversationState::new("What is the band gap of mp-4242?", vec![]),
            &RunContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.state.contexts(), Some(&[][..]));
    assert_eq!(run.output(), "Please give a material ID.");
    assert!(!pipeline.gateway().was_prompted_with(ANSWER));
}

#[tokio::test]
async fn test_gateway_failure_marks_trace_as_errored() {
    let pipeline = Pipeline::new(MockGateway::unavailable(), knowledge_base());
    let reporter = TraceReporter::new();
    let ctx = RunContext::new(&reporter, &NullSink);

    let err = pipeline
        .run(ConversationState::new("band gap of mp-1234", vec![]), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::Gateway(_)));
    assert!(err.is_upstream());

    let trace = reporter.extract_trace();
    assert_eq!(trace.state, TraceState::Error);
    assert!(trace
        .messages
        .last()
        .map(|m| m.contains("failed"))
        .unwrap_or(false));
}

#[tokio::test]
async fn test_retriever_failure_is_propagated() {
    let pipeline = Pipeline::new(
        gateway_for("What is the band gap of mp-1234?"),
        MockRetriever::unavailable(),
    );

    let err = pipeline
        .ask("What is the band gap of mp-1234?", vec![])
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::VectorStore(_)));
    assert!(!pipeline.gateway().was_prompted_with(ANSWER));
}

#[tokio::test]
async fn test_streamed_partials_accumulate_to_output() {
    let pipeline = Pipeline::new(
        gateway_for("What is the band gap of mp-1234?"),
        knowledge_base(),
    );
    let (sink, mut rx) = ChannelSink::new(8);
    let ctx = RunContext::new(&NoopReporter, &sink);

    let run = pipeline
        .run(
            ConversationState::new("What is the band gap of mp-1234?", vec![]),
            &ctx,
        )
        .await
        .unwrap();

    let mut partials = Vec::new();
    while let Ok(partial) = rx.try_recv() {
        partials.push(partial);
    }

    assert_eq!(
        partials,
        vec!["The band gap ", "The band gap is 1.2 eV", "The band gap is 1.2 eV."]
    );
    assert_eq!(partials.last().map(String::as_str), Some(run.output()));
}

#[tokio::test]
async fn test_disconnected_consumer_cancels_run() {
    let pipeline = Pipeline::new(
        gateway_for("What is the band gap of mp-1234?"),
        knowledge_base(),
    );
    let (sink, rx) = ChannelSink::new(1);
    drop(rx);
    let ctx = RunContext::new(&NoopReporter, &sink);

    let err = pipeline
        .run(
            ConversationState::new("What is the band gap of mp-1234?", vec![]),
            &ctx,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::Cancelled));
}

#[tokio::test]
async fn test_cancelled_token_stops_before_any_call() {
    let pipeline = Pipeline::new(gateway_for("anything"), knowledge_base());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ctx = RunContext::default().with_cancel(cancel);

    let err = pipeline
        .run(ConversationState::new("anything", vec![]), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::Cancelled));
    assert!(pipeline.gateway().calls().is_empty());
}

#[tokio::test]
async fn test_reporter_choice_does_not_change_answer() {
    let question = "Which materials have the widest band gap?";
    let gateway = || {
        gateway_for(question).with_json(RESULTS_LIMIT, json!({"required_data_points": 2}))
    };

    let quiet = Pipeline::new(gateway(), knowledge_base());
    let quiet_run = quiet
        .run(ConversationState::new(question, vec![]), &RunContext::default())
        .await
        .unwrap();

    let traced = Pipeline::new(gateway(), knowledge_base());
    let reporter = TraceReporter::new();
    let traced_run = traced
        .run(
            ConversationState::new(question, vec![]),
            &RunContext::new(&reporter, &NullSink),
        )
        .await
        .unwrap();

    assert_eq!(quiet_run.output(), traced_run.output());
    assert_eq!(quiet_run.visited, traced_run.visited);
    assert_eq!(quiet.retriever().calls(), traced.retriever().calls());
    assert!(!reporter.snapshot().messages.is_empty());
}

#[tokio::test]
async fn test_summary_passthrough_skips_model_call() {
    let config = PipelineConfig::default().with_passthrough_summary(true);
    let pipeline = Pipeline::with_config(
        gateway_for("this summary must not be used"),
        knowledge_base(),
        config,
    );

    let run = pipeline
        .run(
            ConversationState::new("What is the band gap of mp-9?", vec![]),
            &RunContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.state.summary(), Some("What is the band gap of mp-9?"));
    assert!(!pipeline.gateway().was_prompted_with(SUMMARIZE));
    assert_eq!(run.state.material_ids(), Some(&["mp-9".to_string()][..]));
}

#[tokio::test]
async fn test_stage_temperatures_follow_config() {
    let gateway = gateway_for("Which materials have the widest band gap?")
        .with_json(RESULTS_LIMIT, json!({"required_data_points": 3}));
    let pipeline = Pipeline::new(gateway, knowledge_base());

    pipeline
        .ask("Which materials have the widest band gap?", vec![])
        .await
        .unwrap();

    let config = pipeline.config();
    let temperatures: Vec<f32> = pipeline
        .gateway()
        .calls()
        .iter()
        .map(|c| c.temperature())
        .collect();
    assert_eq!(
        temperatures,
        vec![
            config.summarize_temperature,
            config.attributes_temperature,
            config.search_query_temperature,
            config.results_limit_temperature,
            config.final_response_temperature,
        ]
    );
}

#[tokio::test]
async fn test_malformed_limit_json_retrieves_one_record() {
    let gateway = gateway_for("Which materials have the widest band gap?")
        .with_malformed_json(RESULTS_LIMIT);
    let pipeline = Pipeline::new(gateway, knowledge_base());

    let run = pipeline
        .run(
            ConversationState::new("Which materials have the widest band gap?", vec![]),
            &RunContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(run.state.required_data_points(), Some(1));
    assert_eq!(
        pipeline.retriever().calls(),
        vec![MockRetrieverCall::Search {
            query: "band gap electronic properties".to_string(),
            k: 1,
        }]
    );
    assert_eq!(run.output(), "The band gap is 1.2 eV.");
}

#[tokio::test]
async fn test_context_without_identifier_reports_missing_source() {
    let context = "Silicon crystallizes in the diamond structure; Electronic properties: band gap = 0.611 eV";
    let gateway = gateway_for("Which material crystallizes as diamond?")
        .with_json(RESULTS_LIMIT, json!({"required_data_points": 1}));
    let pipeline = Pipeline::new(gateway, MockRetriever::new().with_context(context));
    let reporter = TraceReporter::new();

    let run = pipeline
        .run(
            ConversationState::new("Which material crystallizes as diamond?", vec![]),
            &RunContext::new(&reporter, &NullSink),
        )
        .await
        .unwrap();

    assert_eq!(run.state.contexts(), Some(&[context.to_string()][..]));
    assert!(pipeline.gateway().was_prompted_with(ANSWER));

    let trace = reporter.extract_trace();
    assert_eq!(trace.state, TraceState::Complete);
    assert!(trace
        .messages
        .iter()
        .any(|m| m == &format!("[1] [source information missing]: {}", context)));
}
