//! Session lifecycle and message exchange tests.

use concierge::providers::{ProviderError, Role};
use concierge::session::SessionError;
use concierge::tenants::{ResolutionSource, ResolveError};

use crate::common::{concierge_with, prompt_builder, registry, FakeProvider, Scripted};

#[test]
fn open_session_binds_requested_tenant() {
    let provider = FakeProvider::new();
    let concierge = concierge_with(provider.clone());

    let session = concierge.open_session(Some("a")).expect("session should open");
    let ctx = session.context();
    assert_eq!(ctx.tenant.id, "a");
    assert_eq!(ctx.source, ResolutionSource::Requested);
    assert!(ctx.system_instruction.contains("Dar A"));
    assert!(session.turns().is_empty());
    assert_eq!(session.welcome().heading, "Welcome to Dar A");
    assert_eq!(provider.call_count(), 0);
}

#[test]
fn open_session_without_identifier_uses_default() {
    let concierge = concierge_with(FakeProvider::new());
    let session = concierge.open_session(None).expect("session should open");
    assert_eq!(session.context().tenant.id, "riad_ziz");
    assert_eq!(session.context().source, ResolutionSource::Default);
}

#[tokio::test]
async fn unknown_tenant_opens_nothing_and_calls_nothing() {
    let provider = FakeProvider::new();
    let concierge = concierge_with(provider.clone());

    let err = concierge
        .open_session(Some("missing"))
        .expect_err("unknown tenant should fail");
    assert_eq!(
        err,
        ResolveError::UnknownTenant {
            id: "missing".to_owned()
        }
    );
    assert_eq!(err.to_string(), "unknown property 'missing'");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn message_is_sent_verbatim_with_session_instruction() {
    let provider = FakeProvider::scripted(vec![Scripted::Reply("Salam! 🍵 Breakfast is at 8.".to_owned())]);
    let concierge = concierge_with(provider.clone());
    let mut session = concierge.open_session(Some("a")).expect("session should open");

    let text = "  Wach l'ftour included?  ";
    let reply = concierge
        .send_message(&mut session, text)
        .await
        .expect("reply expected");
    assert_eq!(reply.text, "Salam! 🍵 Breakfast is at 8.");

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    let registry = registry();
    let tenant = registry.get("a").expect("tenant a");
    assert_eq!(calls[0].system.as_deref(), Some(prompt_builder().build(tenant).as_str()));
    assert_eq!(calls[0].messages.len(), 1);
    assert_eq!(calls[0].messages[0].role, Role::User);
    assert_eq!(calls[0].messages[0].text, text);
}

#[tokio::test]
async fn history_grows_and_instruction_never_changes() {
    let provider = FakeProvider::new();
    let concierge = concierge_with(provider.clone());
    let mut session = concierge.open_session(Some("riad_ziz")).expect("session should open");

    concierge.send_message(&mut session, "hello").await.expect("first reply");
    concierge.send_message(&mut session, "wifi?").await.expect("second reply");

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].system, calls[1].system);
    assert_eq!(calls[1].messages.len(), 3);
    assert_eq!(calls[1].messages[1].text, "echo: hello");

    let turns = session.turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[3].role, Role::Assistant);
    assert_eq!(turns[3].text, "echo: wifi?");
}

#[tokio::test]
async fn provider_failure_keeps_session_usable() {
    let provider = FakeProvider::scripted(vec![
        Scripted::HttpError(503, "overloaded".to_owned()),
        Scripted::Reply("Back again ✨".to_owned()),
    ]);
    let concierge = concierge_with(provider.clone());
    let mut session = concierge.open_session(None).expect("session should open");

    let err = concierge
        .send_message(&mut session, "book a camel trek")
        .await
        .expect_err("first call should fail");
    assert!(matches!(
        err,
        SessionError::Provider(ProviderError::HttpStatus { status: 503, .. })
    ));
    assert!(session.turns().is_empty());

    let reply = concierge
        .send_message(&mut session, "book a camel trek")
        .await
        .expect("retry should succeed");
    assert_eq!(reply.text, "Back again ✨");
    assert_eq!(session.turns().len(), 2);
    assert_eq!(provider.calls()[1].messages.len(), 1);
}

#[tokio::test]
async fn blank_message_is_rejected_without_remote_call() {
    let provider = FakeProvider::new();
    let concierge = concierge_with(provider.clone());
    let mut session = concierge.open_session(None).expect("session should open");

    let err = concierge
        .send_message(&mut session, " \n ")
        .await
        .expect_err("blank should fail");
    assert!(matches!(err, SessionError::EmptyMessage));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn sessions_do_not_share_history() {
    let provider = FakeProvider::new();
    let concierge = concierge_with(provider.clone());
    let mut first = concierge.open_session(Some("a")).expect("first session");
    let mut second = concierge.open_session(Some("riad_ziz")).expect("second session");
    assert_ne!(first.id(), second.id());

    concierge.send_message(&mut first, "one").await.expect("reply");
    concierge.send_message(&mut second, "two").await.expect("reply");

    let calls = provider.calls();
    assert_eq!(calls[1].messages.len(), 1);
    assert_ne!(calls[0].system, calls[1].system);
    assert_eq!(first.turns().len(), 2);
    assert_eq!(second.turns().len(), 2);
}

#[tokio::test]
async fn failed_message_still_counts_as_activity() {
    let concierge = concierge_with(FakeProvider::scripted(vec![Scripted::Timeout]));
    let mut session = concierge.open_session(Some("a")).expect("session");
    let opened = session.last_active();
    std::thread::sleep(std::time::Duration::from_millis(5));

    let result = concierge.send_message(&mut session, "hello?").await;
    assert!(result.is_err());
    assert!(session.turns().is_empty());
    assert!(session.last_active() > opened);
}
