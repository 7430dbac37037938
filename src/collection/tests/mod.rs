// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::error::{ConversionError, DecodeError, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const GLOOMHAVEN: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<items totalitems="1" termsofuse="https://boardgamegeek.com/xmlapi/termsofuse">
    <item objecttype="thing" objectid="174430" subtype="boardgame" collid="1">
        <name sortindex="1">Gloomhaven</name>
        <yearpublished>2017</yearpublished>
        <stats minplayers="1" maxplayers="4" minplaytime="60" maxplaytime="120" playingtime="120">
            <rating value="N/A">
                <average value="8.6" />
                <bayesaverage value="8.3" />
            </rating>
        </stats>
    </item>
</items>"#;

const TWO_GAMES_ONE_BROKEN: &str = r#"<items totalitems="2">
    <item objectid="1"><name>Fine</name><yearpublished>2000</yearpublished>
        <stats minplayers="2" maxplayers="4" playingtime="30"><rating><bayesaverage value="6.0"/></rating></stats>
    </item>
    <item objectid="2"><name>Broken</name><yearpublished>2001</yearpublished>
        <stats minplayers="2" maxplayers="4" playingtime="an hour"><rating><bayesaverage value="6.0"/></rating></stats>
    </item>
</items>"#;

const INVALID_USER: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<errors>
    <error>
        <message>Invalid username specified</message>
    </error>
</errors>"#;

/// Replays queued responses in order and counts calls
#[derive(Default)]
struct ScriptedSource {
    responses: Mutex<VecDeque<std::result::Result<Vec<u8>, FetchError>>>,
    calls: AtomicU32,
}

impl ScriptedSource {
    fn new(responses: Vec<std::result::Result<Vec<u8>, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicU32::new(0),
        }
    }

    /// `pending` 202 answers followed by `body`
    fn pending_then(pending: usize, body: &str) -> Self {
        let mut responses: Vec<_> = (0..pending).map(|_| Err(pending_error())).collect();
        responses.push(Ok(body.as_bytes().to_vec()));
        Self::new(responses)
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionSource for ScriptedSource {
    async fn fetch(
        &self,
        _username: &str,
        _cancel: &CancellationToken,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(pending_error()))
    }
}

fn pending_error() -> FetchError {
    FetchError::Pending {
        url: "https://boardgamegeek.com/xmlapi2/collection?username=alice".to_string(),
    }
}

/// Records requested waits and returns immediately
#[derive(Default)]
struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Never finishes a wait
struct StalledSleeper;

#[async_trait]
impl Sleeper for StalledSleeper {
    async fn sleep(&self, _duration: Duration) {
        std::future::pending::<()>().await;
    }
}

fn poll_config(max_attempts: u32) -> PollConfig {
    PollConfig {
        max_attempts,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(1),
        backoff_multiplier: 1.0,
        jitter: false,
        max_total_wait: None,
    }
}

fn client(source: ScriptedSource) -> CollectionClient<ScriptedSource, RecordingSleeper> {
    CollectionClient::with_source(poll_config(50), source, RecordingSleeper::default()).unwrap()
}

#[tokio::test]
async fn fetch_gloomhaven_collection() {
    let client = client(ScriptedSource::pending_then(0, GLOOMHAVEN));

    let collection = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collection.user.name, "alice");
    assert_eq!(collection.total_items, Some(1));
    assert_eq!(collection.games.len(), 1);

    let game = &collection.games[0];
    assert_eq!(game.id, "174430");
    assert_eq!(game.name, "Gloomhaven");
    assert_eq!(game.min_players, 1);
    assert_eq!(game.max_players, 4);
    assert_eq!(game.playing_time, 120);
    assert_eq!(game.score, 8.3);
    assert_eq!(game.year_published, "2017");
}

#[tokio::test]
async fn retries_match_consecutive_pending_responses() {
    let client = client(ScriptedSource::pending_then(4, GLOOMHAVEN));

    let collection = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collection.len(), 1);
    assert_eq!(client.source().calls(), 5, "4 pending answers + 1 success");
    assert_eq!(client.sleeper.waits.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn many_pending_responses_without_real_delay() {
    let client = client(ScriptedSource::pending_then(45, GLOOMHAVEN));

    let started = std::time::Instant::now();
    let collection = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collection.len(), 1);
    assert_eq!(client.source().calls(), 46);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn poll_budget_exhaustion_is_still_processing() {
    let client = CollectionClient::with_source(
        poll_config(3),
        ScriptedSource::pending_then(10, GLOOMHAVEN),
        RecordingSleeper::default(),
    )
    .unwrap();

    let err = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::StillProcessing { attempts, url } => {
            assert_eq!(attempts, 4, "initial attempt + 3 retries");
            assert!(url.contains("username=alice"));
        }
        other => panic!("expected StillProcessing, got {other:?}"),
    }
    assert_eq!(client.source().calls(), 4);
}

#[tokio::test]
async fn cancel_during_wait_aborts_promptly() {
    let client = CollectionClient::with_source(
        poll_config(50),
        ScriptedSource::pending_then(1, GLOOMHAVEN),
        StalledSleeper,
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        client.fetch_collection("alice", &cancel),
    )
    .await
    .expect("cancellation should end the wait")
    .unwrap_err();

    assert!(matches!(err, Error::Cancelled), "got {err:?}");
    assert_eq!(client.source().calls(), 1, "the retry must not run");
}

#[tokio::test]
async fn transport_error_is_not_retried() {
    let failure = TransportError {
        url: Some("https://boardgamegeek.com/xmlapi2/collection?username=alice".to_string()),
        status: 503,
        message: "503 Service Unavailable".to_string(),
    };
    let client = client(ScriptedSource::new(vec![Err(failure.clone().into())]));

    let err = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Transport(e) => assert_eq!(e, failure, "propagated unchanged"),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(client.source().calls(), 1);
}

#[tokio::test]
async fn malformed_number_fails_whole_collection() {
    let client = client(ScriptedSource::pending_then(0, TWO_GAMES_ONE_BROKEN));

    let err = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Conversion(ConversionError::Integer {
            item_id,
            field,
            value,
            ..
        }) => {
            assert_eq!(item_id, "2");
            assert_eq!(field, "playingtime");
            assert_eq!(value, "an hour");
        }
        other => panic!("expected conversion error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_document_message_is_returned_verbatim() {
    let client = client(ScriptedSource::pending_then(0, INVALID_USER));

    let err = client
        .fetch_collection("nobody-here", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RemoteRejected { .. }), "got {err:?}");
    assert_eq!(err.to_string(), "Invalid username specified");
}

#[tokio::test]
async fn unrecognized_payload_describes_decode_failure() {
    let client = client(ScriptedSource::pending_then(0, "<html><body>Bad Gateway</body></html>"));

    let err = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        Error::Decode(DecodeError::UnexpectedRoot { expected, found }) => {
            assert_eq!(*expected, "errors", "the error-schema failure is surfaced");
            assert_eq!(found, "html");
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    assert!(err.to_string().contains("html"), "got: {err}");
}

#[tokio::test]
async fn truncated_payload_is_decode_error() {
    let client = client(ScriptedSource::pending_then(
        0,
        r#"<items totalitems="1"><item objectid="1"><name>Cut</na"#,
    ));

    let err = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode(_)), "got {err:?}");
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn empty_collection_is_not_an_error() {
    let client = client(ScriptedSource::pending_then(
        0,
        r#"<items totalitems="0" termsofuse="https://boardgamegeek.com/xmlapi/termsofuse"></items>"#,
    ));

    let collection = client
        .fetch_collection("newcomer", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collection.user.name, "newcomer");
    assert!(collection.games.is_empty());
}

#[tokio::test]
async fn empty_year_element_renders_as_zero() {
    let client = client(ScriptedSource::pending_then(
        1,
        r#"<items totalitems="1">
            <item objectid="7"><name>Undated</name><yearpublished/>
                <stats minplayers="2" maxplayers="4" playingtime="30">
                    <rating><bayesaverage value="6.5"/></rating>
                </stats>
            </item>
        </items>"#,
    ));

    let collection = client
        .fetch_collection("alice", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(collection.games.len(), 1);
    assert_eq!(collection.games[0].year_published, "0");
    assert_eq!(collection.games[0].max_players, 4);
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let client = client(ScriptedSource::new(vec![
        Ok(GLOOMHAVEN.as_bytes().to_vec()),
        Ok(GLOOMHAVEN.as_bytes().to_vec()),
    ]));
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        client.fetch_collection("alice", &cancel),
        client.fetch_collection("bob", &cancel),
    );

    assert_eq!(first.unwrap().user.name, "alice");
    assert_eq!(second.unwrap().user.name, "bob");
    assert_eq!(client.source().calls(), 2, "no coalescing of in-flight calls");
}

#[test]
fn with_source_rejects_invalid_poll_config() {
    let poll = PollConfig {
        backoff_multiplier: f64::NAN,
        ..Default::default()
    };
    let result =
        CollectionClient::with_source(poll, ScriptedSource::default(), RecordingSleeper::default());
    assert!(matches!(result, Err(Error::Config { .. })));
}

#[test]
fn new_rejects_invalid_config() {
    let config = Config {
        endpoint: "::not-a-url::".to_string(),
        ..Default::default()
    };
    assert!(matches!(CollectionClient::new(config), Err(Error::Config { .. })));
}

#[test]
fn decode_collection_passes_item_set_through() {
    let set = decode_collection(GLOOMHAVEN.as_bytes()).unwrap();
    assert_eq!(set.items.len(), 1);
    assert_eq!(set.items[0].stats.playing_time, "120");
}
