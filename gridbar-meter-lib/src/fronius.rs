//! Fronius Solar API v1: system-scope meter realtime data.
//!
//! `GET /solar_api/v1/GetMeterRealtimeData.cgi?Scope=System` returns one
//! entry per meter under `Body.Data`, keyed by device index. The grid meter is
//! device `"0"` and its `PowerReal_P_Sum` is the signed real power summed over
//! all phases. Only the fields needed here are modeled; everything else in
//! the document is ignored.

use serde::{Deserialize, Serialize};

use crate::{GridPower, MeterError};

/// Path and query of the system-scope meter realtime endpoint
pub const METER_REALTIME_PATH: &str = "/solar_api/v1/GetMeterRealtimeData.cgi?Scope=System";

/// Largest response body the sampler will buffer (bytes)
pub const MAX_RESPONSE_LEN: usize = 8 * 1024;

/// Build the realtime meter URL for an inverter host name or address.
#[must_use]
pub fn meter_url(host: &str) -> String {
    format!("http://{host}{METER_REALTIME_PATH}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeterRealtimeResponse {
    pub body: Body,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Head>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Body {
    pub data: MeterDevices,
}

/// Meters keyed by device index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeterDevices {
    /// The primary (grid) meter
    #[serde(rename = "0", default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<MeterData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeterData {
    /// Signed real power over all phases (W); negative is export
    #[serde(rename = "PowerReal_P_Sum", default, skip_serializing_if = "Option::is_none")]
    pub power_real_p_sum: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Head {
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Solar API request status; code 0 means success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    pub code: i32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub user_message: String,
}

impl MeterRealtimeResponse {
    /// A successful response carrying `watts` for the grid meter.
    #[must_use]
    pub fn with_grid_power(watts: f64) -> Self {
        Self {
            body: Body {
                data: MeterDevices {
                    grid: Some(MeterData {
                        power_real_p_sum: Some(watts),
                    }),
                },
            },
            head: Some(Head::default()),
        }
    }

    /// Extract the grid power, checking the API status first.
    #[allow(clippy::cast_possible_truncation)]
    pub fn grid_power(&self) -> Result<GridPower, MeterError> {
        if let Some(head) = &self.head {
            if head.status.code != 0 {
                return Err(MeterError::ApiStatus {
                    code: head.status.code,
                    reason: head.status.reason.clone(),
                });
            }
        }
        self.body
            .data
            .grid
            .as_ref()
            .and_then(|meter| meter.power_real_p_sum)
            .map(|watts| GridPower::from_watts(watts as f32))
            .ok_or(MeterError::MissingField)
    }
}

/// Parse a realtime meter response body into the grid power it reports.
pub fn parse_grid_power(body: &[u8]) -> Result<GridPower, MeterError> {
    let response: MeterRealtimeResponse = serde_json::from_slice(body)?;
    response.grid_power()
}

/// Fill `body` from `read` one chunk at a time until it reports end of
/// stream, refusing bodies longer than [`MAX_RESPONSE_LEN`].
///
/// `body` is cleared first so the same buffer can serve every request.
pub fn read_body(
    body: &mut Vec<u8>,
    chunk: &mut [u8],
    mut read: impl FnMut(&mut [u8]) -> Result<usize, MeterError>,
) -> Result<(), MeterError> {
    body.clear();
    loop {
        let n = read(chunk)?;
        if n == 0 {
            return Ok(());
        }
        if body.len() + n > MAX_RESPONSE_LEN {
            return Err(MeterError::ResponseTooLarge(MAX_RESPONSE_LEN));
        }
        body.extend_from_slice(&chunk[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Body": {
            "Data": {
                "0": {
                    "Current_AC_Phase_1": 2.871,
                    "Details": {
                        "Manufacturer": "Fronius",
                        "Model": "Smart Meter 63A",
                        "Serial": "19160123"
                    },
                    "Enable": 1,
                    "PowerReal_P_Phase_1": -650.2,
                    "PowerReal_P_Sum": -1953.7,
                    "TimeStamp": 1700000000,
                    "Visible": 1
                }
            }
        },
        "Head": {
            "RequestArguments": { "DeviceClass": "Meter", "Scope": "System" },
            "Status": { "Code": 0, "Reason": "", "UserMessage": "" },
            "Timestamp": "2023-11-14T23:13:20+01:00"
        }
    }"#;

    #[test]
    fn test_meter_url() {
        assert_eq!(
            meter_url("fronius.localdomain"),
            "http://fronius.localdomain/solar_api/v1/GetMeterRealtimeData.cgi?Scope=System"
        );
    }

    #[test]
    fn test_parse_sample_response() {
        let power = parse_grid_power(SAMPLE.as_bytes()).unwrap();
        assert_eq!(power, GridPower::from_watts(-1953.7));
        assert!(power.is_export());
    }

    #[test]
    fn test_parse_import_without_head() {
        let body = br#"{"Body":{"Data":{"0":{"PowerReal_P_Sum":4200}}}}"#;
        assert_eq!(parse_grid_power(body).unwrap(), GridPower::from_watts(4200.0));
    }

    #[test]
    fn test_missing_field() {
        let body = br#"{"Body":{"Data":{"0":{"PowerReal_P_Phase_1":12.0}}}}"#;
        assert!(matches!(parse_grid_power(body), Err(MeterError::MissingField)));

        let body = br#"{"Body":{"Data":{"1":{"PowerReal_P_Sum":12.0}}}}"#;
        assert!(matches!(parse_grid_power(body), Err(MeterError::MissingField)));

        let body = br#"{"Body":{"Data":{"0":{"PowerReal_P_Sum":null}}}}"#;
        assert!(matches!(parse_grid_power(body), Err(MeterError::MissingField)));
    }

    #[test]
    fn test_malformed_json() {
        for body in [&b"<html>502 Bad Gateway</html>"[..], b"", b"{\"Body\":", b"{}"] {
            assert!(
                matches!(parse_grid_power(body), Err(MeterError::Parse(_))),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
        let body = br#"{"Body":{"Data":{"0":{"PowerReal_P_Sum":"lots"}}}}"#;
        assert!(matches!(parse_grid_power(body), Err(MeterError::Parse(_))));
    }

    #[test]
    fn test_api_error_status() {
        let body = br#"{
            "Body": {"Data": {}},
            "Head": {"Status": {"Code": 255, "Reason": "Meter not found", "UserMessage": ""}}
        }"#;
        match parse_grid_power(body) {
            Err(MeterError::ApiStatus { code, reason }) => {
                assert_eq!(code, 255);
                assert_eq!(reason, "Meter not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_generated_response_parses() {
        let json = serde_json::to_vec(&MeterRealtimeResponse::with_grid_power(-750.0)).unwrap();
        assert_eq!(parse_grid_power(&json).unwrap(), GridPower::from_watts(-750.0));
        let text = String::from_utf8(json).unwrap();
        assert!(text.contains("\"PowerReal_P_Sum\":-750.0"), "{text}");
        assert!(text.contains("\"Code\":0"), "{text}");
    }

    /// Serves `data` in pieces of at most `step` bytes
    fn reader(data: &[u8], step: usize) -> impl FnMut(&mut [u8]) -> Result<usize, MeterError> + '_ {
        let mut pos = 0;
        move |buf| {
            let n = step.min(buf.len()).min(data.len() - pos);
            buf[..n].copy_from_slice(&data[pos..pos + n]);
            pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_read_body_across_chunks() {
        let mut body = b"left over from last time".to_vec();
        let mut chunk = [0u8; 64];
        read_body(&mut body, &mut chunk, reader(SAMPLE.as_bytes(), 50)).unwrap();
        assert_eq!(body, SAMPLE.as_bytes());
        assert_eq!(parse_grid_power(&body).unwrap(), GridPower::from_watts(-1953.7));
    }

    #[test]
    fn test_read_body_limit() {
        let exact = vec![b'x'; MAX_RESPONSE_LEN];
        let mut body = Vec::new();
        let mut chunk = [0u8; 1024];
        read_body(&mut body, &mut chunk, reader(&exact, 1024)).unwrap();
        assert_eq!(body.len(), MAX_RESPONSE_LEN);

        let over = vec![b'x'; MAX_RESPONSE_LEN + 1];
        assert!(matches!(
            read_body(&mut body, &mut chunk, reader(&over, 1000)),
            Err(MeterError::ResponseTooLarge(MAX_RESPONSE_LEN))
        ));
    }

    #[test]
    fn test_read_body_passes_transport_errors() {
        let mut body = Vec::new();
        let mut chunk = [0u8; 16];
        let mut calls = 0;
        let result = read_body(&mut body, &mut chunk, |buf| {
            calls += 1;
            if calls == 1 {
                buf[..4].copy_from_slice(b"{\"Bo");
                Ok(4)
            } else {
                Err(MeterError::Transport("timed out".into()))
            }
        });
        assert!(matches!(result, Err(MeterError::Transport(_))));
    }
}
