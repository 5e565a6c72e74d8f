use serde_json::{json, Value};
use std::io::Cursor;
use timeguard::host::{serve, HostAction, HostEvent, RuntimeMessage};
use timeguard::{Gatekeeper, KeyValueStore, MemoryStore, TabId};
use url::Url;

fn gatekeeper(blocked: &[&str]) -> Gatekeeper<MemoryStore> {
    let store = MemoryStore::new();
    store.set("blockedSites", &json!(blocked)).unwrap();
    Gatekeeper::new(store, Url::parse("chrome-extension://timeguard/").unwrap())
}

fn run(gate: &mut Gatekeeper<MemoryStore>, events: &[Value]) -> Vec<Value> {
    let input: String = events.iter().map(|e| format!("{e}\n")).collect();
    let mut output = Vec::new();
    serve(gate, Cursor::new(input), &mut output).unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn parses_browser_events() {
    let event: HostEvent = serde_json::from_value(json!({
        "event": "beforeNavigate", "tabId": 3, "frameId": 0, "url": "https://reddit.com/"
    }))
    .unwrap();
    assert!(matches!(event, HostEvent::BeforeNavigate(ref nav) if nav.tab_id == TabId(3)));

    let event: HostEvent = serde_json::from_value(json!({"event": "tabRemoved", "tabId": 3})).unwrap();
    assert_eq!(event, HostEvent::TabRemoved { tab_id: TabId(3) });

    let event: HostEvent = serde_json::from_value(json!({
        "event": "message",
        "message": {"type": "COUNTDOWN_COMPLETE", "tabId": 3, "domain": "reddit.com"}
    }))
    .unwrap();
    assert_eq!(
        event,
        HostEvent::Message {
            message: RuntimeMessage::CountdownComplete {
                tab_id: TabId(3),
                domain: "reddit.com".to_string()
            }
        }
    );
}

#[test]
fn countdown_round_trip_over_the_wire() {
    let mut gate = gatekeeper(&["reddit.com"]);
    let replies = run(
        &mut gate,
        &[
            json!({"event": "tabCreated", "tabId": 5}),
            json!({"event": "beforeNavigate", "tabId": 5, "frameId": 0, "url": "https://www.reddit.com/r/x"}),
            json!({"event": "message", "message": {"type": "COUNTDOWN_COMPLETE", "tabId": 5, "domain": "reddit.com"}}),
            json!({"event": "beforeNavigate", "tabId": 5, "frameId": 0, "url": "https://www.reddit.com/r/x"}),
            json!({"event": "committed", "tabId": 5, "frameId": 0, "url": "https://www.reddit.com/r/x"}),
            json!({"event": "completed", "tabId": 5, "frameId": 0, "url": "https://www.reddit.com/r/x"}),
            json!({"event": "beforeNavigate", "tabId": 5, "frameId": 0, "url": "https://reddit.com/r/y"}),
        ],
    );

    assert_eq!(
        replies,
        vec![
            json!({
                "action": "redirect",
                "tabId": 5,
                "url": "chrome-extension://timeguard/countdown.html?target=https%3A%2F%2Fwww.reddit.com%2Fr%2Fx"
            }),
            json!({"action": "response", "success": true}),
        ]
    );
}

#[test]
fn skips_malformed_lines_and_subframes() {
    let mut gate = gatekeeper(&["reddit.com"]);
    let input = concat!(
        "not json\n",
        "\n",
        "{\"event\":\"teleport\",\"tabId\":1}\n",
        "{\"event\":\"beforeNavigate\",\"tabId\":1,\"frameId\":2,\"url\":\"https://reddit.com/\"}\n",
    );
    let mut output = Vec::new();
    let handled = serve(&mut gate, Cursor::new(input), &mut output).unwrap();

    assert_eq!(handled, 1);
    assert!(output.is_empty());
}

#[test]
fn undecodable_bytes_do_not_stop_the_loop() {
    let mut gate = gatekeeper(&["reddit.com"]);
    let mut input = b"\xff\xfe\n".to_vec();
    input.extend_from_slice(
        b"{\"event\":\"beforeNavigate\",\"tabId\":1,\"frameId\":0,\"url\":\"https://reddit.com/\"}\n",
    );
    let mut output = Vec::new();
    let handled = serve(&mut gate, Cursor::new(input), &mut output).unwrap();

    assert_eq!(handled, 1);
    let reply: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(reply["action"], json!("redirect"));
    assert_eq!(reply["tabId"], json!(1));
}

#[test]
fn access_log_messages_report_visit_stats() {
    let mut gate = gatekeeper(&["reddit.com"]);
    let replies = run(
        &mut gate,
        &[
            json!({"event": "message", "message": {"type": "VISIT_STATS", "domain": "reddit.com"}}),
            json!({"event": "message", "message": {"type": "LOG_ACCESS", "domain": "www.reddit.com"}}),
            json!({"event": "message", "message": {"type": "VISIT_STATS", "domain": "reddit.com"}}),
        ],
    );

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["visits"], json!(0));
    assert_eq!(replies[0]["message"], json!("First visit today. Make it count!"));
    assert_eq!(replies[1]["domain"], json!("reddit.com"));
    assert_eq!(replies[1]["visits"], json!(1));
    assert_eq!(replies[2]["visits"], json!(1));
    assert_eq!(replies[2]["tier"], json!("excellent"));
    assert_eq!(replies[2]["summary"], json!("1 visit in the last 24 hours"));
}

#[test]
fn redirect_action_serializes_camel_case() {
    let action = HostAction::Redirect {
        tab_id: TabId(9),
        url: "chrome-extension://timeguard/countdown.html?target=x".to_string(),
    };
    assert_eq!(
        serde_json::to_value(action).unwrap(),
        json!({"action": "redirect", "tabId": 9, "url": "chrome-extension://timeguard/countdown.html?target=x"})
    );
}
