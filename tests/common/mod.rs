//! Throwaway HTTP server that answers like the XML-RPC engine.

#![allow(dead_code)]

use std::{
    io::{Read, Write},
    net::{Ipv4Addr, TcpListener, TcpStream},
    sync::mpsc::{self, Receiver},
    thread,
    time::Duration,
};

pub const FINISHED: &str = "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n\
                        <value><string>Finished!</string></value>\n</param>\n</params>\n\
                        </methodResponse>\n";

pub const FAULT: &str = "<?xml version='1.0'?>\n<methodResponse>\n<fault>\n<value><struct>\n\
                     <member>\n<name>faultCode</name>\n<value><int>1</int></value>\n</member>\n\
                     <member>\n<name>faultString</name>\n\
                     <value><string>&lt;type 'exceptions.ValueError'&gt;:invalid literal for int() \
                     with base 10: 'three'</string></value>\n</member>\n</struct></value>\n\
                     </fault>\n</methodResponse>\n";

/// Accepts one connection, hands the raw request to the test and replies after `delay`.
pub fn engine_once(status: &'static str, body: &str, delay: Duration) -> (String, Receiver<String>) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let endpoint = format!("http://{}/", listener.local_addr().unwrap());
    let body = body.to_string();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let request = read_request(&mut stream);
        let _ = tx.send(request);
        thread::sleep(delay);
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes());
    });

    (endpoint, rx)
}

pub fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&raw);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}
