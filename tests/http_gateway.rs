//! `HttpGateway` against a stub backend on a local socket.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use accident_dash::charts::TextCharts;
use accident_dash::config::Config;
use accident_dash::dashboard::{Dashboard, HotspotOutcome, RecordingNotifier};
use accident_dash::gateway::{Gateway, HotspotQuery, HttpGateway, PredictQuery, PredictionOutcome};
use accident_dash::logging::{self, LogSettings};
use accident_dash::map::{CanvasMap, LatLng};

struct Route {
    path: &'static str,
    status: &'static str,
    body: &'static str,
}

struct StubBackend {
    base: String,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubBackend {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

/// Serves `routes` by path (query ignored), one request per connection.
fn serve(routes: Vec<Route>) -> StubBackend {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub backend");
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(_) => continue,
            };
            let mut reader = BufReader::new(&stream);
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) => break,
                    Ok(_) if header == "\r\n" => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }

            let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
            let path = target.split('?').next().unwrap_or("/").to_string();
            log.lock().unwrap().push(target);

            let (status, body) = routes
                .iter()
                .find(|r| r.path == path)
                .map(|r| (r.status, r.body))
                .unwrap_or(("404 NOT FOUND", "Not Found"));
            let response = format!(
                "HTTP/1.1 {}\r\n\
                 Content-Type: application/json\r\n\
                 Connection: close\r\n\
                 Content-Length: {}\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = (&stream).write_all(response.as_bytes());
        }
    });

    StubBackend {
        base: format!("http://{}", addr),
        seen,
    }
}

fn gateway(base: &str) -> HttpGateway {
    logging::init(LogSettings::stderr_only());
    HttpGateway::new(&Config {
        gateway_base: base.to_string(),
        request_timeout_ms: Some(5_000),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn years_are_fetched_and_decoded() {
    let backend = serve(vec![Route { path: "/years", status: "200 OK", body: "[2017, 2018, \"2019\"]" }]);
    let years = gateway(&backend.base).years().await.unwrap();
    let text: Vec<&str> = years.iter().map(|y| y.as_str()).collect();
    assert_eq!(text, vec!["2017", "2018", "2019"]);
    assert_eq!(backend.seen(), vec!["/years".to_string()]);
}

#[tokio::test]
async fn hotspot_filters_go_into_the_query_string() {
    let backend = serve(vec![Route {
        path: "/hotspots",
        status: "200 OK",
        body: r#"[{"lat": 53.72, "lng": -1.86}, {"lat": 0, "lng": -1.8}]"#,
    }]);
    let query = HotspotQuery {
        year: String::new(),
        weather_code: "2".to_string(),
        road_class_code: String::new(),
    };
    let points = gateway(&backend.base).hotspots(&query).await.unwrap();
    assert_eq!(points.len(), 2);
    assert!(points[0].has_coordinates());
    assert!(!points[1].has_coordinates());
    assert_eq!(
        backend.seen(),
        vec!["/hotspots?year=&weather_code=2&road_class_code=".to_string()]
    );
}

#[tokio::test]
async fn error_status_with_json_body_is_still_decoded() {
    let backend = serve(vec![Route {
        path: "/predict",
        status: "500 INTERNAL SERVER ERROR",
        body: r#"{"error": "model not loaded"}"#,
    }]);
    let query = PredictQuery {
        at: LatLng { lat: 53.72, lng: -1.86 },
        weather_code: String::new(),
        road_class_code: "3".to_string(),
        hour: 18,
    };
    let out = gateway(&backend.base).predict(&query).await.unwrap();
    assert_eq!(out, PredictionOutcome::Error("model not loaded".to_string()));
    assert_eq!(
        backend.seen(),
        vec!["/predict?lat=53.72&lng=-1.86&weather_code=&road_class_code=3&hour=18".to_string()]
    );
}

#[tokio::test]
async fn details_are_decoded_in_browser_key_order() {
    let backend = serve(vec![Route {
        path: "/details",
        status: "200 OK",
        body: r#"{"total_accidents": 5, "road_surface": {"Wet": 2, "Dry": 3}, "casualty_by_severity": {"Serious": 1, "Slight": 4}}"#,
    }]);
    let detail = gateway(&backend.base)
        .details(LatLng { lat: 53.72, lng: -1.86 })
        .await
        .unwrap();
    assert_eq!(detail.total_accidents, "5");
    assert_eq!(detail.road_surface[0].0, "Wet");
    assert_eq!(detail.casualty_by_severity[1], ("Slight".to_string(), 4.0));
}

#[tokio::test]
async fn non_json_body_is_an_error() {
    let backend = serve(vec![Route { path: "/years", status: "200 OK", body: "<html>oops</html>" }]);
    let err = gateway(&backend.base).years().await.unwrap_err();
    assert!(format!("{:#}", err).contains("GET /years"));
}

#[tokio::test]
async fn unreachable_backend_is_an_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let gw = gateway(&format!("http://127.0.0.1:{}", port));
    assert!(gw.years().await.is_err());
}

#[tokio::test]
async fn base_path_prefix_is_kept() {
    let backend = serve(vec![Route { path: "/api/years", status: "200 OK", body: "[]" }]);
    let years = gateway(&format!("{}/api", backend.base)).years().await.unwrap();
    assert!(years.is_empty());
    assert_eq!(backend.seen(), vec!["/api/years".to_string()]);
}

#[tokio::test]
async fn dashboard_loads_hotspots_over_http() {
    let backend = serve(vec![Route {
        path: "/hotspots",
        status: "200 OK",
        body: r#"[{"lat": 53.72, "lng": -1.86}, {"lat": 53.74, "lng": -1.90}]"#,
    }]);
    let mut dash: Dashboard<CanvasMap, TextCharts, RecordingNotifier> = Dashboard::new(
        &Config::default(),
        Arc::new(gateway(&backend.base)),
        TextCharts::default(),
        RecordingNotifier::default(),
    );
    dash.init_map();
    assert_eq!(dash.load_hotspots().await, HotspotOutcome::Rendered(2));
    assert!(dash.notifier().alerts.is_empty());
}
