use std::{
    io::{BufRead as _, BufReader, Read as _, Write as _},
    net::TcpListener,
    thread::JoinHandle,
    time::Duration,
};

use sortreplay::{
    Action, ClientConfig, HttpTraceSource, ManualClock, NullObserver, ReplayEngine,
    SortDirection, TraceBundle, TraceError, TraceRequest, TraceSource, decode_response,
};

/// Route client logs through the test harness; set `RUST_LOG` to see them.
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
struct Captured {
    request_line: String,
    body: String,
}

/// Serve exactly one HTTP request with a canned response.
fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().unwrap();
            }
        }
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        stream.flush().unwrap();

        Captured {
            request_line: request_line.trim_end().to_string(),
            body: String::from_utf8(buf).unwrap(),
        }
    });
    (format!("http://{addr}"), handle)
}

fn source(base_url: String) -> HttpTraceSource {
    init_test_logging();
    HttpTraceSource::new(ClientConfig {
        base_url,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[test]
fn posts_parameters_verbatim_and_accepts_valid_trace() {
    let (url, server) = serve_once(
        200,
        r#"{"input_array":[5,3,1],"actions":[{"type":"swap","positions":[0,2]}]}"#,
    );
    let request = TraceRequest {
        array_size: Some(3),
        sort_direction: Some(SortDirection::Asc),
    };
    let bundle = source(url).load_trace("quick", &request).unwrap();
    let captured = server.join().unwrap();

    assert_eq!(captured.request_line, "POST /api/algorithm/quick HTTP/1.1");
    let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(
        sent,
        serde_json::json!({"array_size": 3, "sort_direction": "asc"})
    );

    assert_eq!(bundle.algorithm.as_deref(), Some("quick"));
    assert_eq!(bundle.original, vec![5.0, 3.0, 1.0]);
    assert_eq!(bundle.trace.actions(), &[Action::Swap(0, 2)]);
}

#[test]
fn non_success_status_is_backend_unavailable() {
    let (url, server) = serve_once(500, r#"{"detail":"boom"}"#);
    let err = source(url)
        .load_trace("bubble", &TraceRequest::default())
        .unwrap_err();
    server.join().unwrap();
    match err {
        TraceError::BackendUnavailable(msg) => {
            assert!(msg.contains("500"), "{msg}");
            assert!(msg.contains("boom"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn connection_refused_is_backend_unavailable() {
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let err = source(format!("http://127.0.0.1:{port}"))
        .load_trace("bubble", &TraceRequest::default())
        .unwrap_err();
    assert!(matches!(err, TraceError::BackendUnavailable(_)), "{err:?}");
}

#[test]
fn empty_algorithm_name_is_rejected_before_any_request() {
    let err = source("http://127.0.0.1:1".to_string())
        .load_trace("", &TraceRequest::default())
        .unwrap_err();
    assert!(matches!(err, TraceError::InvalidRequest(_)));
}

#[test]
fn missing_actions_is_malformed() {
    let err = decode_response(200, r#"{"input_array":[1,2,3]}"#).unwrap_err();
    match err {
        TraceError::MalformedResponse(msg) => assert!(msg.contains("actions"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn shape_errors_are_malformed() {
    let cases = [
        r#"{"actions":[]}"#,
        r#"{"input_array":[],"actions":[]}"#,
        r#"{"input_array":"1,2","actions":[]}"#,
        r#"{"input_array":[1,"x"],"actions":[]}"#,
        r#"{"input_array":[1,2],"actions":{}}"#,
        r#"{"input_array":[1,2],"actions":[{"type":"swap","positions":[0]}]}"#,
        r#"{"input_array":[1,2],"actions":[{"type":"set","positions":[0]}]}"#,
        r#"{"input_array":[1,2],"actions":[{"type":"rotate","positions":[0,1]}]}"#,
        r#"[1,2,3]"#,
        r#"not json"#,
    ];
    for body in cases {
        let err = decode_response(200, body).unwrap_err();
        assert!(
            matches!(err, TraceError::MalformedResponse(_)),
            "{body}: {err:?}"
        );
    }
}

#[test]
fn bad_action_is_reported_by_index() {
    let body = r#"{"input_array":[1,2],"actions":[
        {"type":"compare","positions":[0,1]},
        {"type":"set","positions":[0],"values":[]}
    ]}"#;
    match decode_response(200, body).unwrap_err() {
        TraceError::MalformedResponse(msg) => assert!(msg.contains("actions[1]"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn undecodable_action_is_reported_by_index() {
    let cases = [
        r#"{"type":"rotate","positions":[0,1]}"#,
        r#"{"type":"swap","positions":[0,-1]}"#,
        r#"{"type":"swap","positions":[0,1.5]}"#,
        r#"{"type":"compare"}"#,
        r#""swap""#,
    ];
    for bad in cases {
        let body = format!(
            r#"{{"input_array":[1,2],"actions":[{{"type":"compare","positions":[0,1]}},{bad}]}}"#
        );
        match decode_response(200, &body).unwrap_err() {
            TraceError::MalformedResponse(msg) => {
                assert!(msg.contains("actions[1]"), "{bad}: {msg}");
            }
            other => panic!("{bad}: unexpected error: {other:?}"),
        }
    }
}

#[test]
fn null_values_are_accepted_on_wire_actions() {
    let bundle = decode_response(
        200,
        r#"{"input_array":[2,1],"actions":[{"type":"swap","positions":[0,1],"values":null}]}"#,
    )
    .unwrap();
    assert_eq!(bundle.trace.actions(), &[Action::Swap(0, 1)]);
}

#[test]
fn error_field_short_circuits_even_on_success_status() {
    let body = r#"{"error":"Failed to process algorithm request","details":"unknown algorithm","input_array":[1],"actions":[]}"#;
    match decode_response(200, body).unwrap_err() {
        TraceError::BackendUnavailable(msg) => {
            assert!(msg.contains("Failed to process"), "{msg}");
            assert!(msg.contains("unknown algorithm"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_json_error_page_is_backend_unavailable() {
    let err = decode_response(502, "<html>Bad Gateway</html>").unwrap_err();
    assert!(matches!(err, TraceError::BackendUnavailable(_)));
}

#[test]
fn rejected_load_leaves_engine_untouched() {
    let mut engine = ReplayEngine::with_parts(NullObserver, ManualClock::new());
    let good = decode_response(
        200,
        r#"{"input_array":[2,1],"actions":[{"type":"swap","positions":[0,1]}]}"#,
    )
    .unwrap();
    engine.load_bundle(good).unwrap();
    engine.step().unwrap();

    let bad = decode_response(200, r#"{"input_array":[9,9,9]}"#);
    assert!(bad.is_err());
    if let Ok(bundle) = bad {
        engine.load_bundle(bundle).unwrap();
    }

    assert_eq!(engine.original_array(), &[2.0, 1.0]);
    assert_eq!(engine.working_array(), &[1.0, 2.0]);
    assert_eq!(engine.current_position(), 1);
}

#[test]
fn bundle_round_trips_through_disk() {
    let dir = std::path::PathBuf::from("target").join("transport_tests");
    let path = dir.join("bundle.json");
    let bundle = TraceBundle {
        algorithm: Some("merge".to_string()),
        original: vec![4.0, 1.0],
        trace: [
            Action::Set {
                index: 0,
                value: 1.0,
            },
            Action::Set {
                index: 1,
                value: 4.0,
            },
        ]
        .into_iter()
        .collect(),
    };
    bundle.write_json(&path).unwrap();
    let back = TraceBundle::read_json(&path).unwrap();
    assert_eq!(back, bundle);
}
