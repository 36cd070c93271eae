//! Mock Fronius inverter for bench-testing the GridBar firmware
//!
//! Usage: cargo run -p gridbar-mock-inverter -- --mode ramp
//! Then build the firmware with GRIDBAR_INVERTER_HOST=<this machine>:8080

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use gridbar_meter_lib::fronius::{MeterRealtimeResponse, METER_REALTIME_PATH};

/// Upper bound on request header lines read before giving up
const MAX_HEADER_LINES: usize = 64;

/// A client that sends nothing for this long is dropped
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Always report `--watts`
    Static,
    /// Sweep from full export to full import and back over `--period` seconds
    Ramp,
    /// Flip between `--watts` and its negation every `--period` seconds
    Alternate,
    /// Answer with a body that is not JSON
    Malformed,
}

#[derive(Debug, Parser)]
#[command(about = "Serves GetMeterRealtimeData.cgi like a Fronius inverter")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    #[arg(long, value_enum, default_value_t = Mode::Static)]
    mode: Mode,

    /// Grid power in watts (negative = export); the ramp amplitude in ramp mode
    #[arg(long, default_value_t = -2500.0, allow_negative_numbers = true)]
    watts: f64,

    /// Ramp or alternate period in seconds
    #[arg(long, default_value_t = 60.0)]
    period: f64,
}

/// Grid power reported `elapsed` seconds after start.
fn power_at(args: &Args, elapsed: f64) -> f64 {
    let period = args.period.max(1.0);
    match args.mode {
        Mode::Static | Mode::Malformed => args.watts,
        Mode::Ramp => {
            // Triangle wave: -|watts| -> +|watts| -> -|watts|
            let amplitude = args.watts.abs();
            let phase = (elapsed % period) / period;
            let tri = if phase < 0.5 { phase * 2.0 } else { 2.0 - phase * 2.0 };
            amplitude * (tri * 2.0 - 1.0)
        }
        Mode::Alternate => {
            if (elapsed / period) as u64 % 2 == 0 {
                args.watts
            } else {
                -args.watts
            }
        }
    }
}

struct Response {
    status: &'static str,
    content_type: &'static str,
    body: String,
}

/// Route a request line like `GET /path HTTP/1.1`.
fn respond(request_line: &str, args: &Args, elapsed: f64) -> Response {
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();

    if method != "GET" {
        return Response {
            status: "405 Method Not Allowed",
            content_type: "text/plain",
            body: "method not allowed\n".to_string(),
        };
    }
    if target != METER_REALTIME_PATH {
        return Response {
            status: "404 Not Found",
            content_type: "text/plain",
            body: "not found\n".to_string(),
        };
    }
    if args.mode == Mode::Malformed {
        return Response {
            status: "200 OK",
            content_type: "text/html",
            body: "<html><body>Service temporarily unavailable</body></html>".to_string(),
        };
    }

    let watts = power_at(args, elapsed);
    let body = serde_json::to_string_pretty(&MeterRealtimeResponse::with_grid_power(watts))
        .unwrap_or_else(|e| format!("serialization failed: {e}"));
    Response {
        status: "200 OK",
        content_type: "application/json",
        body,
    }
}

fn handle_client(stream: TcpStream, args: &Args, start_time: Instant) -> std::io::Result<()> {
    stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    // Drain headers; the mock does not look at them
    let mut line = String::new();
    for _ in 0..MAX_HEADER_LINES {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
    }

    let request_line = request_line.trim();
    let response = respond(request_line, args, start_time.elapsed().as_secs_f64());
    println!("RX: {request_line} -> {}", response.status);

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.content_type,
        response.body.len(),
        response.body
    )?;
    stream.flush()
}

/// Accept connections forever, one thread per client.
fn serve(listener: &TcpListener, args: &Arc<Args>) {
    let start_time = Instant::now();
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let args = Arc::clone(args);
                std::thread::spawn(move || {
                    if let Err(e) = handle_client(stream, &args, start_time) {
                        eprintln!("Client error: {e}");
                    }
                });
            }
            Err(e) => eprintln!("Connection error: {e}"),
        }
    }
}

fn main() {
    let args = Arc::new(Args::parse());
    println!("Mock inverter starting on {} ({:?} mode)...", args.bind, args.mode);
    let listener = TcpListener::bind(&args.bind).expect("Failed to bind");
    println!("Mock inverter ready - serving {METER_REALTIME_PATH}");
    serve(&listener, &args);
}
