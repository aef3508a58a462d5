//! Console front end for the accident hotspot dashboard.
//!
//! Reads one command per line from stdin. Gateway requests run in the
//! background, so input keeps being read while a query is pending; the
//! dashboard is redrawn after each command and after each answer that
//! lands. Configuration comes from the environment (see `Config::from_env`).

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use accident_dash::charts::TextCharts;
use accident_dash::config::Config;
use accident_dash::dashboard::{CompletionSender, Dashboard, Notifier};
use accident_dash::gateway::HttpGateway;
use accident_dash::logging::{self, log, obj, v_str, Domain, Level};
use accident_dash::map::{CanvasMap, LatLng};
use accident_dash::render::render;

const HELP: &str = "\
commands:
  year <value|all>      select a year
  weather <code|all>    select a weather code
  road <code|all>       select a road class code
  load                  (re)load hotspots for the current filters
  select <n>            click marker n
  click <lat> <lng>     show details for a coordinate
  show                  redraw
  help                  this text
  quit";

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&mut self, message: &str) {
        println!("!! {}", message);
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Year(String),
    Weather(String),
    Road(String),
    Load,
    Select(usize),
    Click(LatLng),
    Show,
    Help,
    Quit,
}

fn filter_value(arg: Option<&str>) -> Option<String> {
    match arg? {
        "all" | "All" => Some(String::new()),
        v => Some(v.to_string()),
    }
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    let usage = || format!("bad arguments for `{}`; try `help`", cmd);
    match cmd {
        "year" => filter_value(parts.next()).map(Command::Year).ok_or_else(usage),
        "weather" => filter_value(parts.next()).map(Command::Weather).ok_or_else(usage),
        "road" => filter_value(parts.next()).map(Command::Road).ok_or_else(usage),
        "load" => Ok(Command::Load),
        "select" => parts
            .next()
            .and_then(|n| n.parse().ok())
            .map(Command::Select)
            .ok_or_else(usage),
        "click" => {
            let lat = parts.next().and_then(|v| v.parse().ok());
            let lng = parts.next().and_then(|v| v.parse().ok());
            match (lat, lng) {
                (Some(lat), Some(lng)) => Ok(Command::Click(LatLng { lat, lng })),
                _ => Err(usage()),
            }
        }
        "show" | "" => Ok(Command::Show),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command `{}`; try `help`", other)),
    }
}

type ConsoleDashboard = Dashboard<CanvasMap, TextCharts, ConsoleNotifier>;

/// Runs one command. Returns false on `quit`.
fn execute(dash: &mut ConsoleDashboard, cmd: Command, tx: &CompletionSender) -> bool {
    match cmd {
        Command::Year(v) => {
            if !dash.filters.year.select_value(&v) {
                println!("no year option `{}`", v);
            }
        }
        Command::Weather(v) => {
            if !dash.filters.weather.select_value(&v) {
                println!("no weather option `{}`", v);
            }
        }
        Command::Road(v) => {
            if !dash.filters.road_class.select_value(&v) {
                println!("no road class option `{}`", v);
            }
        }
        Command::Load => {
            dash.spawn_hotspot_load(tx);
            println!("loading hotspots...");
        }
        Command::Select(i) => match dash.markers().get(i).map(|m| m.at) {
            Some(at) => {
                dash.spawn_details(at, tx);
            }
            None => println!("no marker [{}]", i),
        },
        Command::Click(at) => {
            dash.spawn_details(at, tx);
        }
        Command::Show => {}
        Command::Help => {
            println!("{}", HELP);
            return true;
        }
        Command::Quit => return false,
    }
    println!("{}", render(dash));
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    logging::init(cfg.log.clone());
    let gateway = HttpGateway::new(&cfg)?;
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("gateway_base", v_str(&cfg.gateway_base))]),
    );

    let mut dash: ConsoleDashboard =
        Dashboard::new(&cfg, Arc::new(gateway), TextCharts::default(), ConsoleNotifier);
    dash.init_map();
    dash.populate_years().await;
    println!("{}", render(&dash));
    println!("{}", HELP);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    // After stdin closes, answers still pending are awaited and shown.
    while input_open || dash.in_flight() > 0 {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let line = match line? {
                    Some(line) => line,
                    None => {
                        input_open = false;
                        continue;
                    }
                };
                match parse_command(line.trim()) {
                    Ok(cmd) => {
                        if !execute(&mut dash, cmd, &tx) {
                            break;
                        }
                    }
                    Err(msg) => println!("{}", msg),
                }
            }
            Some(done) = rx.recv() => {
                if dash.complete(done) {
                    println!("{}", render(&dash));
                }
            }
            else => break,
        }
    }

    log(Level::Info, Domain::System, "shutdown", obj(&[]));
    Ok(())
}
