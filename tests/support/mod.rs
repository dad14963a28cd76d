#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use vnmarket_core::{
    HttpClient, HttpError, HttpRequest, HttpResponse, RegistryConfig, RetryConfig, Sheet,
    SourceRegistry, SourceRegistryBuilder, WorkbookDecoder, WorkbookError,
};

type Scripted = Result<HttpResponse, HttpError>;

/// Replays scripted outcomes per URL fragment. The last outcome of a route
/// repeats once its queue is drained; unmatched URLs answer 404.
#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, url_fragment: &str, outcomes: Vec<Scripted>) -> Self {
        self.routes
            .lock()
            .expect("routes lock")
            .push((url_fragment.to_owned(), outcomes.into()));
        self
    }

    pub fn json(self, url_fragment: &str, body: Value) -> Self {
        self.script(url_fragment, vec![Ok(HttpResponse::ok_json(body.to_string()))])
    }

    pub fn sheets(self, url_fragment: &str, body: Value) -> Self {
        self.script(
            url_fragment,
            vec![Ok(HttpResponse::ok_bytes(body.to_string().into_bytes()))],
        )
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let outcome = {
            let mut routes = self.routes.lock().expect("routes lock");
            routes
                .iter_mut()
                .find(|(fragment, _)| request.url.contains(fragment.as_str()))
                .and_then(|(_, queue)| {
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                })
                .unwrap_or_else(|| Ok(HttpResponse::new(404, b"not found".to_vec())))
        };
        self.requests.lock().expect("requests lock").push(request);
        Box::pin(async move { outcome })
    }
}

/// Test stand-in for the spreadsheet collaborator: the "workbook" bytes are a
/// JSON array of sheets.
#[derive(Debug, Default)]
pub struct JsonWorkbookDecoder;

impl WorkbookDecoder for JsonWorkbookDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Sheet>, WorkbookError> {
        serde_json::from_slice(bytes).map_err(|error| WorkbookError::new(error.to_string()))
    }
}

/// Default endpoints with a fast fixed backoff: 3 attempts, 1 ms apart.
pub fn fast_retry_config() -> RegistryConfig {
    let retry = RetryConfig::fixed(Duration::from_millis(1), 2);
    let mut config = RegistryConfig::default();
    config.ssi.retry = retry.clone();
    config.vnd.retry = retry;
    config
}

pub fn registry(client: Arc<ScriptedHttpClient>) -> Arc<SourceRegistry> {
    Arc::new(
        SourceRegistryBuilder::new()
            .with_config(fast_retry_config())
            .with_http_client(client)
            .with_workbook_decoder(Arc::new(JsonWorkbookDecoder))
            .build(),
    )
}
