//! Inverter meter over the ESP-IDF HTTP client.

use std::fmt::Display;

use embedded_svc::http::Method;
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};
use gridbar_meter_lib::fronius::MAX_RESPONSE_LEN;
use gridbar_meter_lib::{
    parse_grid_power, read_body, ConnectionSlot, GridPower, MeterError, PowerMeter,
};
use log::debug;

use crate::config::HTTP_TIMEOUT;

/// Read chunk size, also the HTTP client's receive buffer
const CHUNK_LEN: usize = 1024;

fn transport(e: impl Display) -> MeterError {
    MeterError::Transport(format!("{e}"))
}

fn open_connection() -> Result<EspHttpConnection, MeterError> {
    EspHttpConnection::new(&HttpConfig {
        timeout: Some(HTTP_TIMEOUT),
        buffer_size: Some(CHUNK_LEN),
        ..Default::default()
    })
    .map_err(transport)
}

/// Reads `PowerReal_P_Sum` from a Fronius inverter.
///
/// The HTTP client and body buffer live as long as the meter. The client is
/// only replaced after a transport error.
pub struct FroniusMeter {
    url: String,
    conn: ConnectionSlot<EspHttpConnection>,
    body: Vec<u8>,
}

impl FroniusMeter {
    pub fn new(url: String) -> Result<Self, MeterError> {
        Ok(Self {
            url,
            conn: ConnectionSlot::with(open_connection()?),
            body: Vec::with_capacity(MAX_RESPONSE_LEN),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&mut self) -> Result<(), MeterError> {
        let Self { url, conn, body } = self;
        conn.run(open_connection, |conn| request(conn, url, &mut *body))?;
        debug!("Inverter response: {} bytes", body.len());
        Ok(())
    }
}

/// One GET on an open connection. Any body left over from the previous
/// exchange is flushed by `initiate_request`.
fn request(conn: &mut EspHttpConnection, url: &str, body: &mut Vec<u8>) -> Result<(), MeterError> {
    conn.initiate_request(Method::Get, url, &[("Accept", "application/json")])
        .map_err(transport)?;
    conn.initiate_response().map_err(transport)?;

    let status = conn.status();
    if status != 200 {
        return Err(MeterError::Status(status));
    }

    let mut chunk = [0u8; CHUNK_LEN];
    read_body(body, &mut chunk, |buf| conn.read(buf).map_err(transport))
}

impl PowerMeter for FroniusMeter {
    fn read(&mut self) -> Result<GridPower, MeterError> {
        self.fetch()?;
        parse_grid_power(&self.body)
    }
}
