#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use webhook_fanout::{DeliveryFailure, Dispatcher, DispatcherConfig, OutboundRequest, Transport};

/// What the fake receiver does with one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Refuse,
    Delay(Duration, u16),
}

/// In-memory transport: scripted replies per URL, records every request.
pub struct ScriptedTransport {
    default: Reply,
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    sent: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn always(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            default: reply,
            scripts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Replies used for `url` in order before falling back to the default.
    pub fn script(&self, url: &str, replies: Vec<Reply>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into_iter().collect());
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, url: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<u16, DeliveryFailure> {
        self.sent.lock().unwrap().push(request.clone());
        let reply = {
            let mut scripts = self.scripts.lock().unwrap();
            scripts
                .get_mut(&request.url)
                .and_then(|replies| replies.pop_front())
                .unwrap_or_else(|| self.default.clone())
        };

        match reply {
            Reply::Status(status) => Ok(status),
            Reply::Refuse => Err(DeliveryFailure::Connection("connection refused".to_string())),
            Reply::Delay(delay, status) => {
                tokio::time::sleep(delay).await;
                Ok(status)
            }
        }
    }
}

/// Config with millisecond backoff so retry tests stay fast.
pub fn fast_config() -> DispatcherConfig {
    DispatcherConfig {
        retry_delay: Duration::from_millis(5),
        join_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

pub fn dispatcher_with(transport: Arc<ScriptedTransport>) -> Dispatcher {
    Dispatcher::with_transport(fast_config(), transport)
}

pub fn url(name: &str) -> String {
    format!("http://{}.example.com/hook", name)
}
