use super::*;
use crate::core::card::{CardRecord, FileCardStore, PersistenceError};
use crate::core::chat_stream::RelayEvent;
use crate::core::i18n::Language;
use crate::core::message::Message;
use crate::ui::surface::HtmlDocument;
use crate::utils::test_utils::{sample_card, ScriptedTransport};
use tempfile::TempDir;

fn options() -> SessionOptions {
    SessionOptions {
        markdown: true,
        refresh_interval: Duration::from_millis(5),
    }
}

fn session_with(transport: ScriptedTransport) -> ChatSession<HtmlDocument> {
    ChatSession::new(
        HtmlDocument::new(),
        Arc::new(transport),
        Arc::new(Translator::default()),
        Some(sample_card()),
        options(),
    )
}

fn idle_session() -> ChatSession<HtmlDocument> {
    session_with(ScriptedTransport::streaming(&[]))
}

fn chat_renderer() -> MessageRenderer {
    MessageRenderer::new(MarkupTheme::chat(), true)
}

fn placeholder_markup(session: &ChatSession<HtmlDocument>) -> String {
    let range = session.placeholder_range().expect("reply in flight");
    session
        .surface()
        .slice(range)
        .expect("placeholder range in bounds")
        .to_string()
}

#[test]
fn chunks_replace_the_placeholder_tick_by_tick() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    let thinking = placeholder_block("AI is thinking...");
    assert_eq!(placeholder_markup(&session), thinking);
    assert!(!session.surface().send_enabled());
    assert_eq!(session.surface().send_label(), "Thinking...");

    let mut shown = Vec::new();
    for fragment in ["The ", "answer ", "is 42."] {
        relay.send_for_test(RelayEvent::Chunk(fragment.to_string()));
        assert_eq!(session.on_tick(), TickOutcome::Pending);
        shown.push(placeholder_markup(&session));
    }
    let renderer = chat_renderer();
    assert_eq!(
        shown,
        vec![
            renderer.assistant_block("The "),
            renderer.assistant_block("The answer "),
            renderer.assistant_block("The answer is 42."),
        ]
    );

    relay.send_for_test(RelayEvent::Done(Some("The answer is 42.".into())));
    assert_eq!(session.on_tick(), TickOutcome::Finished);

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2], Message::assistant("The answer is 42."));
    assert!(session.surface().send_enabled());
    assert_eq!(session.surface().send_label(), "Send");
    assert!(!session.is_streaming());
    assert!(session
        .surface()
        .markup()
        .ends_with(&renderer.assistant_block("The answer is 42.")));
}

#[test]
fn several_queued_chunks_are_applied_in_one_tick() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    relay.send_for_test(RelayEvent::Chunk("a".into()));
    relay.send_for_test(RelayEvent::Chunk("b".into()));
    relay.send_for_test(RelayEvent::Chunk("c".into()));

    assert_eq!(session.on_tick(), TickOutcome::Pending);
    assert_eq!(placeholder_markup(&session), chat_renderer().assistant_block("abc"));
}

#[test]
fn done_payload_only_sets_history_after_chunks() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    relay.send_for_test(RelayEvent::Chunk("partial view".into()));
    relay.send_for_test(RelayEvent::Done(Some("authoritative text".into())));

    assert_eq!(session.on_tick(), TickOutcome::Finished);
    let markup = session.surface().markup();
    assert!(markup.contains("partial view"));
    assert!(!markup.contains("authoritative text"));
    assert_eq!(
        session.conversation().last(),
        Some(&Message::assistant("authoritative text"))
    );
}

#[test]
fn done_without_chunks_renders_payload_once() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    relay.send_for_test(RelayEvent::Done(Some("Full reply".into())));

    assert_eq!(session.on_tick(), TickOutcome::Finished);
    let markup = session.surface().markup();
    assert!(markup.ends_with(&chat_renderer().assistant_block("Full reply")));
    assert!(!markup.contains("AI is thinking..."));
    assert_eq!(session.conversation().len(), 3);
}

#[test]
fn empty_stream_and_empty_done_append_nothing() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    relay.send_for_test(RelayEvent::Done(None));

    assert_eq!(session.on_tick(), TickOutcome::Finished);
    assert_eq!(session.conversation().len(), 2);
    assert!(session
        .surface()
        .markup()
        .ends_with(&placeholder_block("AI is thinking...")));
    assert!(session.surface().send_enabled());
}

#[test]
fn duplicate_done_and_second_finalize_are_ignored() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    relay.send_for_test(RelayEvent::Chunk("once".into()));
    relay.send_for_test(RelayEvent::Done(None));
    relay.send_for_test(RelayEvent::Done(Some("twice".into())));

    assert_eq!(session.on_tick(), TickOutcome::Finished);
    let markup = session.surface().markup().to_string();
    let scrolls = session.surface().scroll_count();

    assert_eq!(session.on_tick(), TickOutcome::Idle);
    assert!(!session.finalize_stream());
    assert_eq!(session.conversation().len(), 3);
    assert_eq!(session.conversation().last(), Some(&Message::assistant("once")));
    assert_eq!(session.surface().markup(), markup);
    assert_eq!(session.surface().scroll_count(), scrolls);
}

#[test]
fn error_after_chunks_replaces_content_and_records_nothing() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    relay.send_for_test(RelayEvent::Chunk("half an ans".into()));
    relay.send_for_test(RelayEvent::Error("Request timed out after 60s".into()));
    relay.send_for_test(RelayEvent::Chunk("late".into()));
    assert_eq!(session.on_tick(), TickOutcome::Pending);

    let shown = placeholder_markup(&session);
    assert!(shown.contains("Error: Request timed out after 60s"));
    assert!(!shown.contains("half an ans"));
    assert!(!shown.contains("late"));

    relay.send_for_test(RelayEvent::Done(Some("half an ans".into())));
    assert_eq!(session.on_tick(), TickOutcome::Finished);
    assert_eq!(session.conversation().len(), 2);
    assert!(session.surface().send_enabled());
}

#[test]
fn worker_vanishing_finalizes_with_error() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    relay.send_for_test(RelayEvent::Chunk("x".into()));
    drop(relay);

    assert_eq!(session.on_tick(), TickOutcome::Finished);
    assert!(session.surface().markup().contains("Error: "));
    assert_eq!(session.conversation().len(), 2);
    assert!(session.surface().send_enabled());
}

#[test]
fn second_send_while_streaming_is_rejected_without_side_effects() {
    let mut session = idle_session();
    let _relay = session.send_with_manual_relay("explain this").expect("send");
    let markup = session.surface().markup().to_string();

    assert_eq!(
        session.send_with_manual_relay("another").err(),
        Some(SendError::StreamActive)
    );
    assert_eq!(session.surface().markup(), markup);
    assert_eq!(session.conversation().len(), 2);
    assert!(session.surface().notices().is_empty());
}

#[test]
fn blank_message_shows_warning_and_sends_nothing() {
    let mut session = idle_session();
    assert_eq!(session.send_message("   \n"), Err(SendError::EmptyMessage));

    let notices = session.surface().notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Warning");
    assert_eq!(notices[0].message, "Please enter a message");
    assert_eq!(session.conversation().len(), 1);
    assert!(!session.is_streaming());
}

#[test]
fn misconfigured_transport_is_reported_as_notice() {
    let mut session = session_with(ScriptedTransport::misconfigured("Invalid or missing API key"));
    let err = session.send_message("hello").unwrap_err();

    assert!(matches!(err, SendError::Configuration(_)));
    assert_eq!(session.surface().notices()[0].title, "Error");
    assert!(session.surface().notices()[0]
        .message
        .contains("Invalid or missing API key"));
    assert_eq!(session.conversation().len(), 1);
    assert!(session.surface().markup().is_empty());
    assert!(session.surface().send_enabled());
}

#[tokio::test]
async fn streamed_reply_runs_to_completion() {
    let transport = Arc::new(ScriptedTransport::streaming(&["The ", "answer ", "is 42."]));
    let mut session = ChatSession::new(
        HtmlDocument::new(),
        transport.clone(),
        Arc::new(Translator::default()),
        Some(sample_card()),
        options(),
    );

    session.ask("explain this").await.expect("send");

    assert!(!session.is_streaming());
    assert_eq!(
        session.conversation().last(),
        Some(&Message::assistant("The answer is 42."))
    );
    assert!(session
        .surface()
        .markup()
        .ends_with(&chat_renderer().assistant_block("The answer is 42.")));

    let request = transport.last_request().expect("request recorded");
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, "system");
    assert_eq!(request[1].content, "explain this");
}

#[tokio::test]
async fn immediate_failure_shows_error_and_reenables_send() {
    let transport = ScriptedTransport::failing(TransportError::Connectivity("timeout".into()));
    let mut session = session_with(transport);

    session.ask("explain this").await.expect("send");

    let markup = session.surface().markup();
    assert!(markup.contains("Error: Connection error: timeout"));
    assert!(!markup.contains("AI is thinking..."));
    assert_eq!(session.conversation().len(), 2);
    assert!(session.surface().send_enabled());
    assert_eq!(session.surface().send_label(), "Send");
}

#[tokio::test]
async fn single_shot_transport_replies_in_one_update() {
    let mut session = session_with(ScriptedTransport::single_shot("## Paris\n\nThe capital."));

    session.ask("explain this").await.expect("send");

    let markup = session.surface().markup();
    assert!(markup.contains("<h3 style="));
    assert_eq!(
        session.conversation().last(),
        Some(&Message::assistant("## Paris\n\nThe capital."))
    );
}

#[tokio::test]
async fn conversation_grows_across_turns() {
    let transport = Arc::new(ScriptedTransport::streaming(&["ok"]));
    let mut session = ChatSession::new(
        HtmlDocument::new(),
        transport.clone(),
        Arc::new(Translator::default()),
        Some(sample_card()),
        options(),
    );

    session.ask("first").await.expect("first send");
    session.ask("second").await.expect("second send");

    assert_eq!(transport.calls(), 2);
    let request = transport.last_request().expect("request recorded");
    let roles: Vec<_> = request.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(session.summary().assistant_messages, 2);
}

fn finished_exchange() -> ChatSession<HtmlDocument> {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("What is it?").expect("send");
    relay.send_for_test(RelayEvent::Chunk("It is **Paris**.".into()));
    relay.send_for_test(RelayEvent::Done(None));
    assert_eq!(session.on_tick(), TickOutcome::Finished);
    session
}

#[test]
fn save_writes_pending_dialogue_once() {
    let dir = TempDir::new().expect("temp dir");
    let record = CardRecord {
        id: 1,
        front: "Capital of France?".into(),
        back: "Paris".into(),
    };
    let store = FileCardStore::create(dir.path().join("card.json"), &record).expect("store");
    let mut session = finished_exchange();

    assert_eq!(session.save_to_card(&store), 2);
    let back = store.load().expect("load").back;
    assert!(back.starts_with("Paris<hr"));
    assert!(back.contains("Question:"));
    assert!(back.contains("Answer:"));
    assert_eq!(
        session.surface().notices().last().map(|n| n.message.as_str()),
        Some("Conversation saved to card successfully")
    );

    assert_eq!(session.save_to_card(&store), 0);
    assert_eq!(
        session.surface().notices().last().map(|n| n.message.as_str()),
        Some("No new conversation to save")
    );
    assert_eq!(store.load().expect("load").back, back);
}

struct RejectingWriteback;

impl CardWriteback for RejectingWriteback {
    fn append_to_card(&self, _markup: &str) -> Result<(), PersistenceError> {
        Err(PersistenceError::NoCard)
    }
}

#[test]
fn failed_save_keeps_messages_pending() {
    let mut session = finished_exchange();

    assert_eq!(session.save_to_card(&RejectingWriteback), 0);
    let notice = session.surface().notices().last().expect("notice").clone();
    assert_eq!(notice.title, "Error");
    assert_eq!(notice.message, "Failed to Save to Card: No card is open");
    assert_eq!(session.conversation().pending_since_last_save().len(), 2);
}

#[test]
fn clear_chat_resets_surface_and_conversation() {
    let mut session = finished_exchange();
    session.clear_chat();

    assert!(session.surface().markup().is_empty());
    assert_eq!(session.conversation().len(), 1);
    assert_eq!(session.conversation().saved_count(), 0);
    assert_eq!(session.summary().card_id, Some(sample_card().id));
}

#[test]
fn clear_chat_drops_inflight_reply() {
    let mut session = idle_session();
    let relay = session.send_with_manual_relay("explain this").expect("send");
    session.clear_chat();
    relay.send_for_test(RelayEvent::Chunk("stale".into()));

    assert_eq!(session.on_tick(), TickOutcome::Idle);
    assert!(session.surface().markup().is_empty());
    assert!(session.surface().send_enabled());
}

#[test]
fn card_context_is_shown_as_a_system_line() {
    let mut session = idle_session();
    session.show_card_context();
    assert_eq!(
        session.surface().markup(),
        system_block("Card: What is the capital of France?")
    );
    assert_eq!(session.conversation().len(), 1);

    let mut without_card = ChatSession::new(
        HtmlDocument::new(),
        Arc::new(ScriptedTransport::streaming(&[])),
        Arc::new(Translator::default()),
        None,
        options(),
    );
    without_card.show_card_context();
    assert!(without_card.surface().markup().is_empty());
}

#[test]
fn labels_follow_the_injected_translator() {
    let mut session = ChatSession::new(
        HtmlDocument::new(),
        Arc::new(ScriptedTransport::streaming(&[])),
        Arc::new(Translator::new(Language::Japanese)),
        Some(sample_card()),
        options(),
    );

    let relay = session.send_with_manual_relay("説明して").expect("send");
    assert_eq!(session.surface().send_label(), "考え中...");
    assert!(session.surface().markup().contains("AIが考えています..."));

    relay.send_for_test(RelayEvent::Done(None));
    session.on_tick();
    assert_eq!(session.surface().send_label(), "送信");

    session.send_message(" ").unwrap_err();
    let notice = session.surface().notices().last().expect("notice");
    assert_eq!(notice.title, "警告");
    assert_eq!(notice.message, "メッセージを入力してください");
}
