//! Structured JSON-lines logging for the dashboard.
//!
//! Every record carries a run id and a monotonic sequence number so a
//! session's gateway traffic and panel updates can be replayed in order.
//! Records land in `<LOG_DIR>/<RUN_ID>/events.jsonl` (info and above) or
//! `trace.jsonl` (trace/debug). Warnings and errors are also echoed to
//! stderr; stdout belongs to the console front end.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn parse(s: &str) -> Self {
        match s {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "warn" => Level::Warn,
            "error" => Level::Error,
            "fatal" => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Gateway, // Backend requests and responses
    Filters, // Filter controls, year population
    Map,     // Bootstrap, markers, viewport
    Chart,   // Chart slot lifecycle
    Panel,   // Text regions, notices
    System,  // Startup, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Gateway => "gateway",
            Domain::Filters => "filters",
            Domain::Map => "map",
            Domain::Chart => "chart",
            Domain::Panel => "panel",
            Domain::System => "system",
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

pub const DEFAULT_LOG_DIR: &str = "out/runs";

/// Level threshold, domain filter and run directory, fixed for the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    /// `None` enables every domain.
    pub domains: Option<Vec<String>>,
    /// Parent of the run directory. `None` disables the file sinks.
    pub dir: Option<PathBuf>,
    /// Generated from the clock and pid when unset.
    pub run_id: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::Info,
            domains: None,
            dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            run_id: None,
        }
    }
}

impl LogSettings {
    /// Reads `LOG_LEVEL`, `LOG_DOMAINS`, `LOG_DIR` and `RUN_ID`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            level: get("LOG_LEVEL").map(|v| Level::parse(&v)).unwrap_or(defaults.level),
            domains: get("LOG_DOMAINS").and_then(|v| parse_domains(&v)),
            dir: get("LOG_DIR").map(PathBuf::from).or(defaults.dir),
            run_id: get("RUN_ID"),
        }
    }

    /// Warnings still reach stderr; nothing is written to disk.
    pub fn stderr_only() -> Self {
        Self {
            dir: None,
            ..Self::default()
        }
    }

    pub fn allows(&self, domain: Domain) -> bool {
        match &self.domains {
            None => true,
            Some(list) => list.iter().any(|d| d == domain.as_str()),
        }
    }
}

fn parse_domains(v: &str) -> Option<Vec<String>> {
    if v.trim() == "all" {
        return None;
    }
    Some(
        v.split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect(),
    )
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    settings: LogSettings,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

impl RunContext {
    fn open(settings: LogSettings) -> Self {
        let run_id = settings
            .run_id
            .clone()
            .unwrap_or_else(|| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let (events, trace) = match &settings.dir {
            Some(base) => open_run_dir(&base.join(&run_id), &run_id),
            None => (None, None),
        };
        Self {
            run_id,
            settings,
            events,
            trace,
        }
    }

    fn accepts(&self, level: Level, domain: Domain) -> bool {
        level >= self.settings.level && self.settings.allows(domain)
    }
}

type Sink = Option<Mutex<BufWriter<File>>>;

fn open_run_dir(run_dir: &Path, run_id: &str) -> (Sink, Sink) {
    if let Err(err) = create_dir_all(run_dir) {
        eprintln!("[log] failed to create run dir: {}", err);
    }
    let _ = std::fs::write(
        run_dir.join("manifest.json"),
        json!({
            "run_id": run_id,
            "ts": ts_now(),
            "pid": process::id(),
            "log_dir": run_dir.to_string_lossy(),
        })
        .to_string(),
    );
    (
        open_sink(&run_dir.join("events.jsonl")),
        open_sink(&run_dir.join("trace.jsonl")),
    )
}

fn open_sink(path: &Path) -> Sink {
    match File::create(path) {
        Ok(file) => Some(Mutex::new(BufWriter::new(file))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", path.display(), err);
            None
        }
    }
}

/// Installs the process-wide settings. Returns false if logging was
/// already initialised, in which case the earlier settings stay.
pub fn init(settings: LogSettings) -> bool {
    let mut installed = false;
    RUN_CONTEXT.get_or_init(|| {
        installed = true;
        RunContext::open(settings)
    });
    installed
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let mut settings = LogSettings::from_env();
        if cfg!(test) {
            settings.dir = None;
        }
        RunContext::open(settings)
    })
}

fn write_line(sink: &Sink, line: &str) {
    if let Some(writer) = sink {
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    if !ctx.accepts(level, domain) {
        return;
    }
    emit_record(ctx, level, domain, event, fields);
}

fn build_record(
    run_id: &str,
    level: Level,
    domain: Domain,
    event: &str,
    mut fields: Map<String, Value>,
) -> Value {
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));
    Value::Object(entry)
}

fn emit_record(ctx: &RunContext, level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let line = build_record(&ctx.run_id, level, domain, event, fields).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    if level >= Level::Warn {
        eprintln!("{}", line);
    }
}

// =============================================================================
// Domain-Specific Helpers
// =============================================================================

pub fn log_request(path: &str, query: &str) {
    log(
        Level::Debug,
        Domain::Gateway,
        "request",
        obj(&[("path", v_str(path)), ("query", v_str(query))]),
    );
}

pub fn log_failure(domain: Domain, what: &str, err: &anyhow::Error) {
    log(
        Level::Error,
        domain,
        "failure",
        obj(&[("what", v_str(what)), ("msg", v_str(&format!("{:#}", err)))]),
    );
}

pub fn log_stale(slot: &str, ticket: u64, latest: u64) {
    log(
        Level::Info,
        Domain::Panel,
        "stale_response_dropped",
        obj(&[
            ("slot", v_str(slot)),
            ("ticket", json!(ticket)),
            ("latest", json!(latest)),
        ]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Request timing
// =============================================================================

/// Emits the elapsed time of a gateway request on drop.
pub struct RequestTimer {
    path: &'static str,
    started: Instant,
    ok: bool,
}

impl RequestTimer {
    pub fn start(path: &'static str) -> Self {
        Self {
            path,
            started: Instant::now(),
            ok: false,
        }
    }

    pub fn succeed(mut self) {
        self.ok = true;
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        log(
            Level::Debug,
            Domain::Gateway,
            "response",
            obj(&[
                ("path", v_str(self.path)),
                ("ok", Value::Bool(self.ok)),
                ("elapsed_ms", v_num(elapsed_ms)),
            ]),
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
