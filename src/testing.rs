//! In-memory protocol used by unit tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use trace_replay_protocol::{Protocol, ProtocolError, RequestTiming};

/// Records every GET and answers after an optional delay.
#[derive(Default)]
pub struct RecordingProtocol {
    gets: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
}

impl RecordingProtocol {
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Protocol for RecordingProtocol {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn get(&self, _base: &str, path: &str) -> Result<RequestTiming, ProtocolError> {
        self.gets.lock().unwrap().push(path.to_string());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(RequestTiming {
            latency: delay,
            transfer: Duration::ZERO,
            bytes: path.len() as u64,
            status: 200,
        })
    }

    async fn put(
        &self,
        _base: &str,
        _path: &str,
        size: u64,
    ) -> Result<RequestTiming, ProtocolError> {
        Ok(RequestTiming {
            latency: Duration::ZERO,
            transfer: Duration::ZERO,
            bytes: size,
            status: 201,
        })
    }
}
