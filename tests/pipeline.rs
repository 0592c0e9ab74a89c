// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::sync::Mutex;

use flogger::Channel;
use flogger::Context;
use flogger::Logger;
use flogger::Map;
use flogger::Value;
use flogger::channel::CustomErrorHandler;
use flogger::context::ElapsedTime;
use flogger::context::RevertingContext;
use flogger::filter::StartsWithFilter;
use flogger::json;
use flogger::json::EncodeOptions;
use flogger::packer::JsonPacker;
use flogger::packer::LinePacker;
use flogger::writer::FileWriter;
use flogger::writer::Handle;
use flogger::writer::HandleKind;
use flogger::writer::StreamWriter;
use jiff::tz::TimeZone;
use rand::Rng;

#[test]
fn test_channel_to_line_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("logs").join("app.log");

    let context = Arc::new(RevertingContext::new(Map::from([("env", "prod")])));
    let writer = StreamWriter::open(path.to_str().unwrap())
        .unwrap()
        .packer(LinePacker::new("{channel}.{tag}-8|{context:env}|{payload:message}").unwrap());
    let channel = Channel::builder("app", writer)
        .timezone(TimeZone::fixed(jiff::tz::offset(8)))
        .context(context.clone())
        .filter(StartsWithFilter::new("db.").deny())
        .build();

    channel.info("user {user} logged in", Map::from([("user", "zoid")]));
    channel.post("db.query", Map::from([("message", "select 1")]));
    context.put("env", Value::from("test"));
    channel.warning("rate {rate}%", Map::from([("rate", 99.5)]));
    context.remove(&["env"]);
    channel.error("{n} failures", Map::from([("n", 3)]));
    drop(channel);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "app.info    |prod|user zoid logged in\n\
         app.warning |test|rate 99.5%\n\
         app.error   |prod|3 failures\n"
    );
}

#[test]
fn test_channel_to_json_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("app.json");

    let writer = FileWriter::new(&path).unwrap();
    let channel = Channel::builder("app", writer)
        .timezone(TimeZone::UTC)
        .build();
    channel
        .context()
        .put("elapsed", Value::describe(ElapsedTime::new(2)));

    channel.post("audit", Map::from([("path", "/"), ("status", "200")]));

    let content = std::fs::read_to_string(&path).unwrap();
    let decoded: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
    assert_eq!(decoded["channel"], "app");
    assert_eq!(decoded["tag"], "audit");
    assert_eq!(decoded["payload"]["status"], "200");
    assert!(decoded["context"]["elapsed"].as_str().unwrap().contains('.'));
    assert!(decoded["timestamp"].as_str().unwrap().ends_with("+00:00"));
}

#[test]
fn test_failed_write_reaches_handler_not_caller() {
    let handle = Arc::new(Handle::new("mock://closed", HandleKind::Custom, Vec::new()));
    handle.close();

    let reported = Arc::new(Mutex::new(vec![]));
    let channel = Channel::builder("app", StreamWriter::borrowed(handle))
        .error_handler(CustomErrorHandler::new({
            let reported = reported.clone();
            move |record, error| {
                let report = json::to_string(&Value::from(Map::from([
                    ("tag", Value::from(record.tag())),
                    ("error", Value::fault(error)),
                ])));
                reported.lock().unwrap().push(report);
            }
        }))
        .build();

    channel.critical("lost", Map::new());

    let reported = reported.lock().unwrap();
    assert_eq!(reported.len(), 1);
    let decoded: serde_json::Value = serde_json::from_str(&reported[0]).unwrap();
    assert_eq!(decoded["tag"], "critical");
    assert_eq!(
        decoded["error"]["message"],
        "DeliveryError: Stream \"mock://closed\" is closed"
    );
}

fn random_value(rng: &mut impl Rng, depth: usize) -> Value {
    let choice = if depth == 0 {
        rng.random_range(0..6)
    } else {
        rng.random_range(0..8)
    };
    match choice {
        0 => Value::Null,
        1 => Value::Bool(rng.random()),
        2 => Value::Int(rng.random()),
        3 => match rng.random_range(0..4) {
            0 => Value::Float(f64::NAN),
            1 => Value::Float(f64::INFINITY),
            _ => Value::Float(rng.random::<f64>() * 1e6),
        },
        4 => {
            let len = rng.random_range(0..16);
            Value::bytes((0..len).map(|_| rng.random::<u8>()).collect::<Vec<_>>())
        }
        5 => Value::from("zoë / \"quoted\" \u{1F600}"),
        6 => Value::Seq(
            (0..rng.random_range(0..4))
                .map(|_| random_value(rng, depth - 1))
                .collect(),
        ),
        _ => Value::Map(
            (0..rng.random_range(0..4))
                .map(|i| (format!("k{i}"), random_value(rng, depth - 1)))
                .collect(),
        ),
    }
}

#[test]
fn test_random_payloads_always_encode() {
    let mut rng = rand::rng();
    let options = [
        EncodeOptions::default(),
        EncodeOptions::default().with_max_depth(3),
        EncodeOptions::default()
            .with_pretty_print(true)
            .with_escape_slashes(true)
            .with_escape_unicode(true)
            .with_numeric_check(true),
    ];

    for _ in 0..200 {
        let value = random_value(&mut rng, 6);
        for options in &options {
            let encoded = json::encode(&value, options);
            assert!(
                serde_json::from_str::<serde_json::Value>(&encoded).is_ok(),
                "{encoded}"
            );
        }
    }
}

#[test]
fn test_json_packer_round_trip_through_stream() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("app.log");
    let uri = format!("file://{}", path.display());

    let writer = StreamWriter::open(&uri)
        .unwrap()
        .packer(JsonPacker::default());
    let channel = Channel::builder("app", writer)
        .timezone(TimeZone::UTC)
        .build();
    channel.post("app.error", Map::from([("zig", "zag")]));
    channel.context().put("zoid", Value::from("berg"));
    channel.post("app.info", Map::from([("nested", Value::from(vec![1, 2]))]));
    drop(channel);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["tag"], "app.error");
    assert_eq!(lines[0]["context"], serde_json::json!({}));
    assert_eq!(lines[1]["context"]["zoid"], "berg");
    assert_eq!(lines[1]["payload"]["nested"], serde_json::json!([1, 2]));
}
