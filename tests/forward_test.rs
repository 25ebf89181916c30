mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::header::{HeaderValue, CONTENT_LENGTH, ETAG};
use hyper::{Method, Request, StatusCode, Uri};
use intercept_proxy::middleware::{
    Agent, Body, BodyCollector, Context, ETag, Flow, Forward, ForwardConfig, Outcome,
};

fn get(uri: &str) -> Context {
    let req = Request::builder()
        .uri(uri)
        .header("host", "example.com")
        .body(Empty::<Bytes>::new())
        .unwrap();
    Context::from_request(req)
}

async fn run(flow: &Flow, mut ctx: Context) -> (StatusCode, hyper::HeaderMap, String) {
    assert_eq!(flow.run(&mut ctx).await.unwrap(), Outcome::Handled);
    let status = ctx.res.status;
    let headers = ctx.res.headers.clone();
    let body = ctx.into_response().into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8_lossy(&body).to_string())
}

#[tokio::test]
async fn test_forward_to_host_target_keeps_path() {
    let upstream = common::spawn_upstream().await;
    let flow = Flow::new().with(Forward::new(
        ForwardConfig::new(Agent::new()).target(upstream.to_string()),
    ));

    let (status, headers, body) = run(&flow, get("/hello?x=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-upstream").unwrap(), "echo");
    assert_eq!(body, format!("GET /hello?x=1 host={} added=- body=", upstream));
}

#[tokio::test]
async fn test_original_host_header_is_kept_when_not_forced() {
    let upstream = common::spawn_upstream().await;
    let flow = Flow::new().with(Forward::new(
        ForwardConfig::new(Agent::new())
            .target(upstream.to_string())
            .force_header_host(false),
    ));

    let (_, _, body) = run(&flow, get("/hello")).await;
    assert_eq!(body, "GET /hello host=example.com added=- body=");
}

#[tokio::test]
async fn test_full_url_target_replaces_path() {
    let upstream = common::spawn_upstream().await;
    let flow = Flow::new().with(Forward::new(
        ForwardConfig::new(Agent::new()).target(format!("http://{}/fixed", upstream)),
    ));

    let (_, _, body) = run(&flow, get("/ignored")).await;
    assert!(body.starts_with("GET /fixed "), "{}", body);
}

#[tokio::test]
async fn test_request_and_response_hooks() {
    let upstream = common::spawn_upstream().await;
    let config = ForwardConfig::new(Agent::new())
        .target(upstream.to_string())
        .handle_url(|uri| {
            let rewritten = format!("{}?hooked=1", uri.to_string().trim_end_matches('/'));
            rewritten.parse::<Uri>().unwrap()
        })
        .handle_req_headers(|mut headers, _req| {
            headers.insert("x-added", HeaderValue::from_static("yes"));
            headers
        })
        .handle_res_headers(|mut headers, _req, status| {
            headers.insert("x-status", HeaderValue::from(status.as_u16()));
            headers
        });
    let flow = Flow::new().with(Forward::new(config));

    let (_, headers, body) = run(&flow, get("/page")).await;
    assert_eq!(body, format!("GET /page?hooked=1 host={} added=yes body=", upstream));
    assert_eq!(headers.get("x-status").unwrap(), "200");
}

#[tokio::test]
async fn test_response_body_hook_gets_etag() {
    let upstream = common::spawn_upstream().await;
    let config = ForwardConfig::new(Agent::new())
        .target(upstream.to_string())
        .handle_res_body(|body, _req, parts| {
            assert_eq!(parts.status, StatusCode::OK);
            Body::from(body.to_ascii_uppercase())
        });
    let flow = Flow::new()
        .with(ETag::new())
        .with(Forward::new(config));

    let (_, headers, body) = run(&flow, get("/shout")).await;
    assert!(body.starts_with("GET /SHOUT HOST="), "{}", body);
    assert!(headers.get(ETAG).is_some());
    assert!(headers.get(CONTENT_LENGTH).is_none());
}

#[tokio::test]
async fn test_collected_request_body_is_resent() {
    let upstream = common::spawn_upstream().await;
    let flow = Flow::new()
        .with(BodyCollector::new())
        .with(Forward::new(ForwardConfig::new(Agent::new()).target(upstream.to_string())));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/submit")
        .header("host", "example.com")
        .body(Full::new(Bytes::from_static(b"payload")))
        .unwrap();
    let ctx = Context::from_request(req);

    let (_, _, body) = run(&flow, ctx).await;
    assert_eq!(body, format!("POST /submit host={} added=- body=payload", upstream));
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let failed = Arc::new(AtomicBool::new(false));
    let seen = failed.clone();
    let config = ForwardConfig::new(Agent::new())
        .target(closed.to_string())
        .on_error(move |_err, _req| seen.store(true, Ordering::SeqCst));
    let flow = Flow::new().with(Forward::new(config));

    let (status, _, body) = run(&flow, get("/")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "Proxy Error: Bad Gateway");
    assert!(failed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_throttled_response_body() {
    let upstream = common::spawn_upstream().await;
    let agent = Agent::new();
    let flow = Flow::new().with(Forward::new(
        ForwardConfig::new(agent.clone())
            .target(upstream.to_string())
            .bps(1000),
    ));

    let start = Instant::now();
    let (_, _, body) = run(&flow, get("/large")).await;
    assert_eq!(body.len(), common::LARGE_BODY_SIZE);
    // 100바이트 조각 3개, 조각마다 0.1초
    assert!(start.elapsed() >= Duration::from_millis(250));
    assert_eq!(agent.tracker().active(), 0);
}

#[tokio::test]
async fn test_global_bps_is_shared_between_bodies() {
    let upstream = common::spawn_upstream().await;
    let agent = Agent::new();
    let flow = Flow::new().with(Forward::new(
        ForwardConfig::new(agent.clone())
            .target(upstream.to_string())
            .bps(1000)
            .global_bps(true),
    ));

    let start = Instant::now();
    let ((_, _, first), (_, _, second)) = tokio::join!(
        run(&flow, get("/large")),
        run(&flow, get("/large")),
    );
    assert_eq!(first.len(), common::LARGE_BODY_SIZE);
    assert_eq!(second.len(), common::LARGE_BODY_SIZE);
    // 연결 2개가 1000bps를 나눠 쓰므로 각자 500bps: 50바이트 조각 6개, 약 0.6초
    // (혼자였다면 약 0.3초)
    assert!(start.elapsed() >= Duration::from_millis(450), "{:?}", start.elapsed());
    assert_eq!(agent.tracker().active(), 0);
}
