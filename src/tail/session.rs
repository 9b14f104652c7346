//! The tail loop: fetch, filter, render, decide, wait

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info};

use super::filter::{EventCursor, DEFAULT_INITIAL_COUNT};
use super::pacer::{PollPacer, PollTiming};
use super::policy::TailMode;
use crate::render::Renderer;
use crate::stack::{ProviderError, StackEvent, StackProvider};

/// Immutable run parameters
#[derive(Debug, Clone)]
pub struct TailConfig {
    pub stack_name: String,
    /// Events shown from the first page
    pub initial_count: usize,
    pub mode: TailMode,
    /// Describe the stack and print its outputs once tailing ends
    pub print_outputs: bool,
    pub timing: PollTiming,
}

impl TailConfig {
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            initial_count: DEFAULT_INITIAL_COUNT,
            mode: TailMode::default(),
            print_outputs: false,
            timing: PollTiming::default(),
        }
    }
}

/// Result of one fetch/render step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDecision {
    Continue,
    Stop,
}

/// Why the loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailOutcome {
    /// Single-shot mode finished its one cycle
    SingleShot,
    /// The stack reported a completed or failed status
    StackSettled { status: String },
    /// The shutdown signal fired
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TailSummary {
    pub cycles: usize,
    pub events_rendered: usize,
    pub outcome: TailOutcome,
    pub last_event: Option<StackEvent>,
}

/// One tailing run against one stack
///
/// Owns the cursor and the pacing state. Fetches never overlap: each cycle's
/// call completes before the next delay starts.
pub struct TailSession<P, R> {
    config: TailConfig,
    provider: P,
    renderer: R,
    cursor: EventCursor,
    pacer: PollPacer,
    shutdown: Option<watch::Receiver<bool>>,
    cycles: usize,
    events_rendered: usize,
}

impl<P: StackProvider, R: Renderer> TailSession<P, R> {
    pub fn new(config: TailConfig, provider: P, renderer: R) -> Self {
        let pacer = PollPacer::new(config.timing);
        Self {
            config,
            provider,
            renderer,
            cursor: EventCursor::new(),
            pacer,
            shutdown: None,
            cycles: 0,
            events_rendered: 0,
        }
    }

    /// Stop at the next await point once `true` is sent on this channel
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn last_event(&self) -> Option<&StackEvent> {
        self.cursor.last()
    }

    /// Fetch one page, render what is new, and consult the termination policy
    ///
    /// A failed fetch renders nothing and leaves the cursor untouched.
    pub async fn run_cycle(&mut self) -> Result<CycleDecision, ProviderError> {
        let stack_name = self.config.stack_name.as_str();

        self.pacer.mark_fetch();
        let page = self.provider.list_stack_events(stack_name).await?;
        debug!("Fetched {} events for {}", page.len(), stack_name);

        let fresh = self.cursor.advance(page, self.config.initial_count);
        for event in &fresh {
            self.renderer.render_event(event);
        }

        self.cycles += 1;
        self.events_rendered += fresh.len();

        if self.config.mode.should_continue(stack_name, self.cursor.last()) {
            Ok(CycleDecision::Continue)
        } else {
            Ok(CycleDecision::Stop)
        }
    }

    /// Run cycles until the termination policy stops, a fetch fails, or shutdown fires
    pub async fn run(&mut self) -> Result<TailSummary> {
        info!(
            "Tailing {} (mode: {}, initial count: {})",
            self.config.stack_name,
            self.config.mode.as_str(),
            self.config.initial_count
        );

        let mut shutdown = self.shutdown.take();
        let outcome = self.poll_until_stopped(&mut shutdown).await;
        self.shutdown = shutdown;
        let outcome = outcome?;

        if self.config.print_outputs && outcome != TailOutcome::Cancelled {
            self.print_outputs().await?;
        }

        info!(
            "Tail finished after {} cycles ({} events): {:?}",
            self.cycles, self.events_rendered, outcome
        );

        Ok(TailSummary {
            cycles: self.cycles,
            events_rendered: self.events_rendered,
            outcome,
            last_event: self.cursor.last().cloned(),
        })
    }

    async fn poll_until_stopped(
        &mut self,
        shutdown: &mut Option<watch::Receiver<bool>>,
    ) -> Result<TailOutcome> {
        loop {
            let decision = match shutdown.as_mut() {
                Some(rx) => tokio::select! {
                    decision = self.run_cycle() => decision,
                    _ = wait_for_shutdown(rx) => return Ok(TailOutcome::Cancelled),
                },
                None => self.run_cycle().await,
            }
            .with_context(|| format!("Failed to fetch events for {}", self.config.stack_name))?;

            if decision == CycleDecision::Stop {
                return Ok(self.stop_outcome());
            }

            let delay = self.pacer.next_delay();
            debug!("Next poll in {}ms", delay.as_millis());

            match shutdown.as_mut() {
                Some(rx) => tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = wait_for_shutdown(rx) => return Ok(TailOutcome::Cancelled),
                },
                None => tokio::time::sleep(delay).await,
            }
        }
    }

    fn stop_outcome(&self) -> TailOutcome {
        match (self.config.mode, self.cursor.last()) {
            (TailMode::UntilStackComplete, Some(event)) => TailOutcome::StackSettled {
                status: event.resource_status.clone(),
            },
            _ => TailOutcome::SingleShot,
        }
    }

    /// Describe the stack once and render its outputs
    pub async fn print_outputs(&mut self) -> Result<()> {
        let stack_name = self.config.stack_name.as_str();
        let outputs = self
            .provider
            .describe_stack_outputs(stack_name)
            .await
            .with_context(|| format!("Failed to describe stack {}", stack_name))?;

        debug!("Stack {} has {} outputs", stack_name, outputs.len());
        self.renderer.render_outputs(stack_name, &outputs);
        Ok(())
    }
}

/// Resolve once the channel carries `true`; a dropped sender never resolves
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
