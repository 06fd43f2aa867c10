//! End-to-end checks driving the real router over loopback HTTP with the
//! `berth-client` crate, the way an embedding process would.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::PrometheusBuilder;

use berth_client::{ClientError, RelayClient, StatusCode};
use berth_core::sdp::{self, Envelope, SdpKind, SessionDescription};
use berth_core::service::SdpRequest;
use berth_core::SignalingService;

use crate::build_router;
use crate::handlers::AppState;

/// Boots the full router on an ephemeral loopback port and returns a client
/// for it plus the service the embedding side would hold.
async fn spawn_relay(handoff_timeout: Duration) -> (RelayClient, SignalingService) {
    let service = SignalingService::new(handoff_timeout);
    let state = Arc::new(AppState {
        service: service.clone(),
        // A detached recorder: tests must not fight over the global one.
        metrics: PrometheusBuilder::new().build_recorder().handle(),
        started_at: Instant::now(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind an ephemeral port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    let client = RelayClient::new(format!("http://{addr}")).unwrap();
    (client, service)
}

fn offer_request(id: &str, sdp_text: &str) -> SdpRequest {
    let encoded = sdp::encode(&SessionDescription::new(SdpKind::Offer, sdp_text)).unwrap();
    SdpRequest::new(id, encoded)
}

fn rejection(error: ClientError) -> (StatusCode, String) {
    match error {
        ClientError::Rejected { status, reason } => (status, reason),
        other => panic!("expected a relay rejection, got {other:?}"),
    }
}

#[test_deadline::tokio_deadline]
async fn handshake_round_trips_through_a_registrant() {
    let (client, service) = spawn_relay(Duration::from_secs(5)).await;
    let handle = service.register("room1").unwrap();

    let registrant = tokio::spawn(async move {
        let remote = handle.recv_remote().await.unwrap();
        assert_eq!(remote.description.sdp, "v=0 offer");
        handle
            .send_local(
                SessionDescription::new(SdpKind::Answer, "v=0 answer"),
                HashMap::from([("side".to_string(), "registrant".to_string())]),
            )
            .unwrap();
    });

    let reply = client
        .handshake(&offer_request("room1", "v=0 offer"))
        .await
        .unwrap();
    registrant.await.unwrap();

    let description = sdp::decode(&reply.sdp).unwrap();
    assert_eq!(description.kind, SdpKind::Answer);
    assert_eq!(description.sdp, "v=0 answer");
    assert_eq!(reply.data.get("side").map(String::as_str), Some("registrant"));
}

#[test_deadline::tokio_deadline]
async fn handshake_for_an_unknown_id_reports_the_wire_reason() {
    let (client, _service) = spawn_relay(Duration::from_secs(5)).await;
    let error = client
        .handshake(&offer_request("missing-room", "v=0"))
        .await
        .unwrap_err();
    let (status, reason) = rejection(error);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason, "listener_does_not_exist");
}

#[test_deadline::tokio_deadline]
async fn handshake_without_a_reply_times_out_with_408() {
    let (client, service) = spawn_relay(Duration::from_millis(100)).await;
    let _handle = service.register("room1").unwrap();

    let error = client
        .handshake(&offer_request("room1", "v=0"))
        .await
        .unwrap_err();
    let (status, reason) = rejection(error);
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(reason, "handoff_timeout");
}

#[test_deadline::tokio_deadline]
async fn request_shape_is_validated_before_any_claim() {
    let (client, service) = spawn_relay(Duration::from_secs(5)).await;
    let _handle = service.register("room1").unwrap();

    let (_, reason) = rejection(
        client
            .handshake(&offer_request("", "v=0"))
            .await
            .unwrap_err(),
    );
    assert_eq!(reason, "empty_id");

    let (_, reason) = rejection(
        client
            .handshake(&SdpRequest::new("room1", ""))
            .await
            .unwrap_err(),
    );
    assert_eq!(reason, "empty_sdp");

    let (_, reason) = rejection(
        client
            .handshake(&SdpRequest::new("room1", "!!not-base64!!"))
            .await
            .unwrap_err(),
    );
    assert_eq!(reason, "invalid_base64");

    // Validation failures must not have consumed the listener.
    assert_eq!(service.stats().handoffs, 1);
}

#[test_deadline::tokio_deadline]
async fn inform_delivers_and_consumes_the_listener() {
    let (client, service) = spawn_relay(Duration::from_secs(5)).await;
    let handle = service.register("room1").unwrap();

    client
        .inform(&offer_request("room1", "v=0 offer"))
        .await
        .unwrap();
    let remote = handle.recv_remote().await.unwrap();
    assert_eq!(remote.description.sdp, "v=0 offer");

    let (_, reason) = rejection(
        client
            .inform(&offer_request("room1", "v=0"))
            .await
            .unwrap_err(),
    );
    assert_eq!(reason, "listener_does_not_exist");
}

#[test_deadline::tokio_deadline]
async fn store_is_write_once_and_read_many() {
    let (client, _service) = spawn_relay(Duration::from_secs(5)).await;
    let first = offer_request("peer42", "v=0 first");

    client.store(&first).await.unwrap();

    let (status, reason) = rejection(
        client
            .store(&offer_request("peer42", "v=0 second"))
            .await
            .unwrap_err(),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reason, "sdp_exists");

    for _ in 0..2 {
        let fetched = client.fetch("peer42").await.unwrap();
        assert_eq!(fetched.sdp, first.sdp);
    }

    let (_, reason) = rejection(client.fetch("unknown").await.unwrap_err());
    assert_eq!(reason, "sdp_does_not_exist");
}

#[test_deadline::tokio_deadline]
async fn exchange_runs_the_resolver_exactly_once() {
    let (client, service) = spawn_relay(Duration::from_secs(5)).await;
    service
        .register_resolver(
            "cb1",
            Arc::new(|remote: Envelope| {
                Envelope::new(
                    SessionDescription::new(
                        SdpKind::Answer,
                        format!("answer-to: {}", remote.description.sdp),
                    ),
                    remote.data,
                )
            }),
        )
        .unwrap();

    let reply = client
        .exchange(&offer_request("cb1", "v=0 offer"))
        .await
        .unwrap();
    let description = sdp::decode(&reply.sdp).unwrap();
    assert_eq!(description.sdp, "answer-to: v=0 offer");

    let (_, reason) = rejection(
        client
            .exchange(&offer_request("cb1", "v=0"))
            .await
            .unwrap_err(),
    );
    assert_eq!(reason, "resolver_does_not_exist");
}

#[test_deadline::tokio_deadline]
async fn stats_reflect_live_registry_entries() {
    let (client, service) = spawn_relay(Duration::from_secs(5)).await;
    let _handle = service.register("room1").unwrap();
    client
        .store(&offer_request("peer42", "v=0"))
        .await
        .unwrap();

    let snapshot = service.stats();
    assert_eq!(snapshot.handoffs, 1);
    assert_eq!(snapshot.stored, 1);
    assert_eq!(snapshot.callbacks, 0);
}
