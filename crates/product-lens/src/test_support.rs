//! In-memory fetcher double for unit tests.

use crate::fetch::{FetchedPage, Fetcher};
use crate::types::FetchFailure;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

type Reply = Result<String, FetchFailure>;

/// Serves scripted replies per URL and counts every request.
///
/// A URL with several replies pops them in order and repeats the last one.
/// Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn page(self, url: &str, body: &str) -> Self {
        self.script(url, vec![Ok(body.to_string())])
    }

    pub(crate) fn fail(self, url: &str, failure: FetchFailure) -> Self {
        self.script(url, vec![Err(failure)])
    }

    pub(crate) fn script(self, url: &str, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_once(&self, url: &str, _timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        self.calls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Ok(body)) => Ok(FetchedPage {
                url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                body,
            }),
            Some(Err(failure)) => Err(failure),
            None => Err(FetchFailure::Status(404)),
        }
    }
}
