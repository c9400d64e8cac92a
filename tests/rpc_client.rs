//! Engine calls against a throwaway HTTP server that answers like the XML-RPC engine.

mod common;

use std::{
    net::{Ipv4Addr, TcpListener},
    time::{Duration, Instant},
};

use common::{FAULT, FINISHED, engine_once};

use daedalus_shell::{
    error::RpcError,
    helper::{
        rpc_client::{CancellationToken, RpcClient},
        xmlrpc::Value,
    },
    session::{CalcRequest, FormFields, Session},
};

fn client(endpoint: &str, timeout: Duration) -> RpcClient {
    RpcClient::new(endpoint, timeout, Duration::from_secs(2)).unwrap()
}

fn test_request() -> CalcRequest {
    Session::default().calc_request(FormFields {
        project_name: "Test".into(),
        helical_form: "Aform".into(),
        helical_turns: "3".into(),
    })
}

#[test]
fn calc_posts_five_ordered_string_params() {
    let (endpoint, requests) = engine_once("200 OK", FINISHED, Duration::ZERO);

    let result = client(&endpoint, Duration::from_secs(5)).calc(&test_request());
    assert_eq!(result.unwrap(), Value::from("Finished!"));

    let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(request.starts_with("POST / HTTP/1.1"));
    assert!(request.to_ascii_lowercase().contains("content-type: text/xml"));
    assert!(request.contains("<methodName>calc</methodName>"));

    let values: Vec<&str> = request
        .split("<string>")
        .skip(1)
        .filter_map(|s| s.split("</string>").next())
        .collect();
    assert_eq!(values, ["Test", "Aform", "3", "tet.ply", "M13.txt"]);
}

#[test]
fn remote_fault_is_reported_as_fault() {
    let (endpoint, _requests) = engine_once("200 OK", FAULT, Duration::ZERO);

    match client(&endpoint, Duration::from_secs(5)).calc(&test_request()) {
        Err(RpcError::Fault { code, message }) => {
            assert_eq!(code, 1);
            assert!(message.starts_with("<type 'exceptions.ValueError'>"));
        }
        other => panic!("expected fault, got {:?}", other),
    }
}

#[test]
fn http_error_status_is_reported() {
    let (endpoint, _requests) = engine_once("500 Internal Server Error", "", Duration::ZERO);

    let result = client(&endpoint, Duration::from_secs(5)).calc(&test_request());
    assert!(matches!(result, Err(RpcError::Http(500))), "{:?}", result);
}

#[test]
fn non_xmlrpc_body_is_malformed() {
    let (endpoint, _requests) = engine_once("200 OK", "<html>hello</html>", Duration::ZERO);

    let result = client(&endpoint, Duration::from_secs(5)).calc(&test_request());
    assert!(matches!(result, Err(RpcError::Malformed(_))), "{:?}", result);
}

#[test]
fn closed_port_is_unreachable() {
    let port = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let endpoint = format!("http://127.0.0.1:{}/", port);

    let result = client(&endpoint, Duration::from_secs(5)).calc(&test_request());
    assert!(matches!(result, Err(RpcError::Unreachable(_))), "{:?}", result);
}

#[test]
fn slow_engine_times_out() {
    let (endpoint, _requests) = engine_once("200 OK", FINISHED, Duration::from_secs(3));

    let started = Instant::now();
    let result = client(&endpoint, Duration::from_millis(300)).calc(&test_request());
    assert!(matches!(result, Err(RpcError::Timeout)), "{:?}", result);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn spawned_call_delivers_result() {
    let (endpoint, _requests) = engine_once("200 OK", FINISHED, Duration::from_millis(100));

    let pending =
        client(&endpoint, Duration::from_secs(5)).spawn_calc(test_request(), CancellationToken::new());
    assert_eq!(pending.wait().unwrap(), Value::from("Finished!"));
}

#[test]
fn cancelled_call_resolves_immediately() {
    let (endpoint, requests) = engine_once("200 OK", FINISHED, Duration::from_secs(3));

    let token = CancellationToken::new();
    let pending = client(&endpoint, Duration::from_secs(10)).spawn_calc(test_request(), token.clone());
    requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(pending.poll().is_none());

    let started = Instant::now();
    token.cancel();
    assert!(matches!(pending.poll(), Some(Err(RpcError::Cancelled))));
    assert!(matches!(pending.wait(), Err(RpcError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn multicall_reports_each_job() {
    let body = "<?xml version='1.0'?>\n<methodResponse><params><param><value><array><data>\
                <value><array><data><value><string>Finished!</string></value></data></array></value>\
                <value><struct>\
                <member><name>faultCode</name><value><int>1</int></value></member>\
                <member><name>faultString</name><value><string>no such file</string></value></member>\
                </struct></value>\
                </data></array></value></param></params></methodResponse>";
    let (endpoint, requests) = engine_once("200 OK", body, Duration::ZERO);

    let mut second = test_request();
    second.project_name = "TestOct".into();
    second.geometry_path = "oct.ply".into();

    let results = client(&endpoint, Duration::from_secs(5))
        .multicall_calc(&[test_request(), second])
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap(), &Value::from("Finished!"));
    assert!(matches!(
        &results[1],
        Err(RpcError::Fault { code: 1, message }) if message == "no such file"
    ));

    let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(request.contains("<methodName>system.multicall</methodName>"));
    assert_eq!(request.matches("<string>calc</string>").count(), 2);
}
