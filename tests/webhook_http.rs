use httpmock::prelude::*;
use serde_json::{json, Value};
use webhook_client::config::SharedEndpoint;
use webhook_client::lifecycle::{LifecycleState, RequestManager};
use webhook_client::log::Role;
use webhook_client::transport::{FilePart, Payload, RequestOutcome, Transport, WebhookTransport};

fn text_payload(body: &str) -> Payload {
    Payload::Text {
        body: body.to_string(),
    }
}

#[test]
fn text_message_posts_json_body() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/webhook")
            .header("content-type", "application/json")
            .json_body(json!({"message": "bonjour"}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"reply": "salut"}));
    });

    let transport = WebhookTransport::new().unwrap();
    let outcome = transport.send(&server.url("/webhook"), &text_payload("bonjour"));

    mock.assert();
    assert_eq!(outcome, RequestOutcome::Success(json!({"reply": "salut"})));
}

#[test]
fn file_batch_posts_positional_multipart_parts() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/webhook")
            .body_contains("name=\"file0\"")
            .body_contains("filename=\"a.txt\"")
            .body_contains("contenu texte")
            .body_contains("name=\"file1\"")
            .body_contains("filename=\"b.json\"");
        then.status(200).json_body(json!({"received": 2}));
    });

    let payload = Payload::FileBatch {
        files: vec![
            FilePart {
                name: "a.txt".to_string(),
                bytes: b"contenu texte".to_vec(),
                mime_type: "text/plain".to_string(),
            },
            FilePart {
                name: "b.json".to_string(),
                bytes: b"{\"k\":1}".to_vec(),
                mime_type: "application/json".to_string(),
            },
        ],
    };

    let transport = WebhookTransport::new().unwrap();
    let outcome = transport.send(&server.url("/webhook"), &payload);

    mock.assert();
    assert_eq!(outcome, RequestOutcome::Success(json!({"received": 2})));
}

#[test]
fn non_2xx_status_becomes_failure() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/webhook");
        then.status(500).body("panne interne");
    });

    let transport = WebhookTransport::new().unwrap();
    let outcome = transport.send(&server.url("/webhook"), &text_payload("bonjour"));

    mock.assert();
    match outcome {
        RequestOutcome::Failure(reason) => {
            assert!(reason.contains("500"), "raison inattendue: {reason}");
        }
        RequestOutcome::Success(_) => panic!("un statut 500 doit produire un echec"),
    }
}

#[test]
fn non_json_body_falls_back_to_raw_text() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST).path("/webhook");
        then.status(200).body("juste du texte");
    });

    let transport = WebhookTransport::new().unwrap();
    let outcome = transport.send(&server.url("/webhook"), &text_payload("bonjour"));

    mock.assert();
    assert_eq!(
        outcome,
        RequestOutcome::Success(Value::String("juste du texte".to_string()))
    );
}

#[test]
fn connection_refused_becomes_failure() {
    let transport = WebhookTransport::new().unwrap();

    // Port 1: rien n'ecoute, la connexion est refusee immediatement.
    let outcome = transport.send("http://127.0.0.1:1/webhook", &text_payload("bonjour"));

    assert!(matches!(outcome, RequestOutcome::Failure(_)));
}

#[test]
fn lifecycle_end_to_end_against_mock_server() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/webhook")
            .json_body(json!({"message": "hello"}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"reply": "hi"}));
    });

    let endpoint = SharedEndpoint::new(server.url("/webhook"));
    let transport = WebhookTransport::new().unwrap();
    let mut manager = RequestManager::new(transport, endpoint);

    assert!(manager.submit(text_payload("hello")));
    assert!(!manager.input_enabled());

    for _ in 0..500 {
        manager.poll();
        if manager.state() == LifecycleState::Idle {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    mock.assert();
    assert_eq!(manager.state(), LifecycleState::Idle);
    assert!(manager.input_enabled());

    let entries = manager.log().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[0].text, "hello");
    assert_eq!(entries[1].role, Role::Agent);
    assert_eq!(entries[1].text, "{\n  \"reply\": \"hi\"\n}");
}
