//! Connection lifecycle and remote-operation tests against a scripted fake
//! daemon: handshake, fetch subscription and restoration, request
//! cancellation, and the message size bounds.

mod support;

use serde_json::json;

use jet_peer::{JetError, Matcher, PeerAsync};
use support::{connect_peer, fetch_channel, next_value, response_channel, FakeDaemon};

#[tokio::test]
async fn test_connect_announces_peer_with_config() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = tokio::join!(PeerAsync::connect(daemon.peer_config()), daemon.accept());
    let peer = peer.unwrap();

    let config = conn.expect_config().await;
    assert_eq!(config["jsonrpc"], "2.0");
    assert_eq!(config["params"], json!({"name": "test peer", "debug": false}));
    // config is fire and forget
    assert!(config.get("id").is_none());

    drop(peer);
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    // Nobody listens on port 1.
    let config = jet_peer::PeerConfig::tcp("127.0.0.1", 1);
    match PeerAsync::connect(config).await {
        Err(JetError::Connection(_)) => {}
        Ok(_) => panic!("connect succeeded against a closed port"),
        Err(other) => panic!("expected a connection error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_restoration_after_resume() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (callback, mut notifications) = fetch_channel();
    let (fetch_id, request) = tokio::join!(
        peer.add_fetch(Matcher::prefix("a/"), callback),
        async {
            let request = conn.expect_request("fetch").await;
            conn.respond_result(&request, json!({})).await;
            request
        }
    );
    let fetch_id = fetch_id.unwrap();
    assert_eq!(fetch_id, 1);
    assert!(request.get("id").is_some());
    assert_eq!(request["params"], json!({"id": 1, "path": {"startsWith": "a/"}}));

    // a matching entry is announced
    conn.send_message(&json!({"method": 1, "params": {"path": "a/x", "event": "add", "value": 1}}))
        .await;
    let delivered = next_value(&mut notifications).await;
    assert_eq!(delivered["status"], 0);
    assert_eq!(
        delivered["notification"],
        json!({"path": "a/x", "event": "add", "value": 1})
    );

    // the daemon goes away: the callback sees the terminal status once
    drop(conn);
    let lost = next_value(&mut notifications).await;
    assert_eq!(lost["status"], -1);
    assert!(lost["notification"].is_null());

    // resume restores the fetch under its original id, without a request id
    let (resumed, mut conn) = tokio::join!(peer.resume(), daemon.accept());
    assert!(resumed);
    conn.expect_config().await;
    let restore = conn.expect_request("fetch").await;
    assert!(restore.get("id").is_none());
    assert_eq!(restore["params"], json!({"id": 1, "path": {"startsWith": "a/"}}));

    conn.send_message(&json!({"method": 1, "params": {"path": "a/x", "event": "add", "value": 1}}))
        .await;
    let redelivered = next_value(&mut notifications).await;
    assert_eq!(redelivered["status"], 0);
}

#[tokio::test]
async fn test_pending_call_is_canceled_on_close() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (handler, mut responses) = response_channel();
    peer.call_method_async("slow/echo", Some(json!([1])), None, Some(handler))
        .await;
    let request = conn.expect_request("call").await;
    assert_eq!(request["params"]["path"], "slow/echo");

    // destroy the peer before the daemon answers
    peer.close().await;

    let response = next_value(&mut responses).await;
    assert_eq!(response["id"], request["id"]);
    assert_eq!(response["error"]["code"], -1);
    assert_eq!(
        response["error"]["message"],
        "jet request has been canceled without response!"
    );
}

#[tokio::test]
async fn test_oversize_outbound_fails_locally_and_sends_nothing() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (handler, mut responses) = response_channel();
    let huge = json!("x".repeat(262_144));
    peer.set_state_value_async("big", huge, None, Some(handler)).await;

    let response = next_value(&mut responses).await;
    assert_eq!(response["error"]["code"], -1);
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("exceeds maximum message size (262144)"));

    // nothing of the oversize request hit the wire: the next frame the
    // daemon sees is the notification below
    peer.notify_state("small", json!(1)).await.unwrap();
    let change = conn.read_message().await;
    assert_eq!(
        change,
        json!({"method": "change", "params": {"path": "small", "value": 1}})
    );
}

#[tokio::test]
async fn test_oversize_inbound_closes_the_connection() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (callback, mut notifications) = fetch_channel();
    // without a response callback the fetch goes out as a notification
    let fetch_id = peer.add_fetch_async(Matcher::all(), callback, None).await;
    let fetch = conn.expect_request("fetch").await;
    assert!(fetch.get("id").is_none());
    assert_eq!(fetch["params"], json!({"id": fetch_id}));

    // announce a payload beyond the limit
    conn.send_raw((262_145u32).to_be_bytes(), b"").await;

    // the peer treats that as fatal and tears the connection down
    let lost = next_value(&mut notifications).await;
    assert_eq!(lost["status"], -1);
}

#[tokio::test]
async fn test_parse_failure_drops_the_frame_but_keeps_the_connection() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let garbage = b"{oops";
    conn.send_raw((garbage.len() as u32).to_be_bytes(), garbage).await;

    // the connection survives: a regular round trip still works
    let (info, _) = tokio::join!(peer.info(), async {
        let request = conn.expect_request("info").await;
        assert_eq!(request["params"], json!({}));
        conn.respond_result(&request, json!({"name": "jetd"})).await;
    });
    assert_eq!(info.unwrap(), json!({"name": "jetd"}));
}

#[tokio::test]
async fn test_set_state_value_reports_adaptation_warning() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (warning, _) = tokio::join!(peer.set_state_value("mod10", json!(15), None), async {
        let request = conn.expect_request("set").await;
        assert_eq!(request["params"], json!({"path": "mod10", "value": 15}));
        conn.respond_result(&request, json!({"warning": {"code": 1, "message": "adapted"}}))
            .await;
    });
    let warning = warning.unwrap().expect("expected a warning");
    assert_eq!(warning.code, 1);
    assert_eq!(warning.message.as_deref(), Some("adapted"));
}

#[tokio::test]
async fn test_rejected_set_raises_the_daemons_error() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (outcome, _) = tokio::join!(peer.set_state_value("locked", json!(1), None), async {
        let request = conn.expect_request("set").await;
        conn.respond_error(&request, 123, "not allowed").await;
    });
    match outcome {
        Err(JetError::Rpc(error)) => {
            assert_eq!(error.code, 123);
            assert_eq!(error.message, "not allowed");
        }
        other => panic!("expected an rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_call_method_forwards_args_and_timeout() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (result, _) = tokio::join!(
        peer.call_method("math/sum", Some(json!([1, 2])), Some(2.5)),
        async {
            let request = conn.expect_request("call").await;
            assert_eq!(
                request["params"],
                json!({"timeout": 2.5, "path": "math/sum", "args": [1, 2]})
            );
            conn.respond_result(&request, json!(3)).await;
        }
    );
    assert_eq!(result.unwrap(), json!(3));
}

#[tokio::test]
async fn test_call_method_without_args_omits_them() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (result, _) = tokio::join!(peer.call_method("trigger", None, None), async {
        let request = conn.expect_request("call").await;
        assert_eq!(request["params"], json!({"path": "trigger"}));
        conn.respond_result(&request, json!({})).await;
    });
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_get_forwards_matcher_and_returns_snapshot() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let matcher = Matcher {
        contains: Some("adc".into()),
        ..Matcher::default()
    };
    let snapshot = json!([
        {"path": "dev/adc/1", "value": 1},
        {"path": "dev/adc/2", "value": 2},
    ]);
    let expected = snapshot.clone();
    let (result, _) = tokio::join!(peer.get(&matcher), async {
        let request = conn.expect_request("get").await;
        assert_eq!(request["params"], json!({"path": {"contains": "adc"}}));
        conn.respond_result(&request, snapshot).await;
    });
    assert_eq!(result.unwrap(), expected);
}

#[tokio::test]
async fn test_authenticate_round_trip() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (result, _) = tokio::join!(peer.authenticate("operator", "secret"), async {
        let request = conn.expect_request("authenticate").await;
        assert_eq!(
            request["params"],
            json!({"user": "operator", "password": "secret"})
        );
        conn.respond_result(&request, json!({})).await;
    });
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_request_ids_are_distinct_and_responses_may_reorder() {
    let daemon = FakeDaemon::bind().await;
    let (peer, mut conn) = connect_peer(&daemon).await;

    let (first_handler, mut first_rx) = response_channel();
    let (second_handler, mut second_rx) = response_channel();
    peer.call_method_async("a", None, None, Some(first_handler)).await;
    peer.call_method_async("b", None, None, Some(second_handler)).await;

    let first = conn.expect_request("call").await;
    let second = conn.expect_request("call").await;
    assert_ne!(first["id"], second["id"]);

    // answer out of order; the registry routes by id
    conn.respond_result(&second, json!("b")).await;
    conn.respond_result(&first, json!("a")).await;

    assert_eq!(next_value(&mut second_rx).await["result"], json!("b"));
    assert_eq!(next_value(&mut first_rx).await["result"], json!("a"));
}
