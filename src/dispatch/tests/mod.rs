use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use async_trait::async_trait;

use super::*;
use crate::detector::{DeviceProperties, MediaHandle};

#[derive(Default, Clone)]
struct RecordingSink {
    log: Arc<Mutex<Vec<String>>>,
    reject: Option<ActionKey>,
}

impl RecordingSink {
    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionSink for RecordingSink {
    async fn announce(&self, detection: &Detection) -> Result<(), DispatchError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("announce {}", detection.description));
        Ok(())
    }

    async fn perform(&self, key: &ActionKey) -> Result<(), DispatchError> {
        if self.reject.as_ref() == Some(key) {
            return Err(DispatchError::Rejected {
                key: key.clone(),
                reason: "unknown plugin".to_string(),
            });
        }
        self.log.lock().unwrap().push(format!("perform {key}"));
        Ok(())
    }
}

fn detection(keys: &[&str]) -> Detection {
    let props = DeviceProperties {
        native_path: "/dev/sr0".to_string(),
        device_file: "/dev/sr0".to_string(),
        optical: true,
        available: true,
        ..DeviceProperties::default()
    };
    Detection {
        description: "Audio CD".to_string(),
        keys: keys.iter().map(|k| k.parse::<ActionKey>().unwrap()).collect(),
        handle: MediaHandle::from_properties("/org/freedesktop/UDisks2/block_devices/sr0", props),
    }
}

#[tokio::test]
async fn actions_run_in_order_after_announce() {
    let sink = RecordingSink::default();
    let dispatcher = Dispatcher::new(Box::new(sink.clone()), Duration::ZERO);

    let performed = dispatcher
        .dispatch(&detection(&["@cdplayer", "Ok", "Play"]))
        .await
        .unwrap();

    assert_eq!(performed, 3);
    assert_eq!(
        sink.log(),
        vec![
            "announce Audio CD",
            "perform @cdplayer",
            "perform Ok",
            "perform Play"
        ]
    );
}

#[tokio::test]
async fn script_actions_are_skipped() {
    let sink = RecordingSink::default();
    let dispatcher = Dispatcher::new(Box::new(sink.clone()), Duration::ZERO);

    let performed = dispatcher
        .dispatch(&detection(&["#eject", "Menu"]))
        .await
        .unwrap();

    assert_eq!(performed, 1);
    assert_eq!(sink.log(), vec!["announce Audio CD", "perform Menu"]);
}

#[tokio::test]
async fn first_failure_stops_dispatch() {
    let sink = RecordingSink {
        reject: Some(ActionKey::Plugin("missing".to_string())),
        ..RecordingSink::default()
    };
    let dispatcher = Dispatcher::new(Box::new(sink.clone()), Duration::ZERO);

    let result = dispatcher
        .dispatch(&detection(&["Menu", "@missing", "Ok"]))
        .await;

    assert!(matches!(result, Err(DispatchError::Rejected { .. })));
    assert_eq!(sink.log(), vec!["announce Audio CD", "perform Menu"]);
}

#[tokio::test]
async fn actions_are_paced() {
    let sink = RecordingSink::default();
    let dispatcher = Dispatcher::new(Box::new(sink), Duration::from_millis(30));

    let started = Instant::now();
    dispatcher
        .dispatch(&detection(&["Up", "Down", "Ok"]))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn json_sink_writes_one_line_per_event() {
    let sink = JsonSink::new(Vec::new());

    sink.announce(&detection(&["Ok"])).await.unwrap();
    sink.perform(&ActionKey::Key("Ok".to_string())).await.unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "detected");
    assert_eq!(lines[0]["description"], "Audio CD");
    assert_eq!(lines[0]["keys"][0], "Ok");
    assert_eq!(lines[1]["event"], "action");
    assert_eq!(lines[1]["key"], "Ok");
}
