//! Scripted provider and recording renderer for tail loop tests

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::render::Renderer;
use crate::stack::{ProviderError, StackEvent, StackOutput, StackProvider};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

pub fn event(id: &str, logical_id: &str, resource_type: &str, status: &str) -> StackEvent {
    StackEvent::new(id, base_time(), logical_id, resource_type, status, None)
}

/// Events `e{n}` for every `n` in the range, newest first
pub fn page(range: RangeInclusive<usize>) -> Vec<StackEvent> {
    range
        .rev()
        .map(|n| {
            StackEvent::new(
                format!("e{}", n),
                base_time() + ChronoDuration::seconds(n as i64),
                format!("Resource{}", n),
                "AWS::S3::Bucket",
                "CREATE_IN_PROGRESS",
                None,
            )
        })
        .collect()
}

/// Prepend a newer event to a newest-first page
pub fn with_newest(mut page: Vec<StackEvent>, newest: StackEvent) -> Vec<StackEvent> {
    page.insert(0, newest);
    page
}

pub fn ids(events: &[StackEvent]) -> Vec<String> {
    events.iter().map(|e| e.event_id.clone()).collect()
}

#[derive(Debug, Clone)]
pub enum Step {
    Page(Vec<StackEvent>),
    Fail,
}

/// Replays a fixed script of pages; the last step repeats forever
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    fetches: Mutex<Vec<Instant>>,
    latency: Duration,
    outputs: Vec<StackOutput>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fetches: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            outputs: Vec::new(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<StackOutput>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

impl StackProvider for ScriptedProvider {
    async fn list_stack_events(&self, stack_name: &str) -> Result<Vec<StackEvent>, ProviderError> {
        self.fetches.lock().unwrap().push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let step = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match step.unwrap_or(Step::Page(Vec::new())) {
            Step::Page(events) => Ok(events),
            Step::Fail => Err(ProviderError::StackNotFound {
                stack: stack_name.to_string(),
            }),
        }
    }

    async fn describe_stack_outputs(
        &self,
        _stack_name: &str,
    ) -> Result<Vec<StackOutput>, ProviderError> {
        Ok(self.outputs.clone())
    }
}

/// Remembers everything it was asked to render
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub events: Vec<String>,
    pub outputs: Vec<StackOutput>,
}

impl Renderer for RecordingRenderer {
    fn render_event(&mut self, event: &StackEvent) {
        self.events.push(event.event_id.clone());
    }

    fn render_outputs(&mut self, _stack_name: &str, outputs: &[StackOutput]) {
        self.outputs.extend_from_slice(outputs);
    }
}
