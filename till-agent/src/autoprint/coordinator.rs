//! Automatic print coordinator
//!
//! Bridges "new order" events from the external commerce poller to print
//! dispatch. Overlapping poll cycles can deliver the same order twice, so
//! every dispatch claims a `(order, template, printer)` key atomically before
//! touching the printer; failed jobs retry a bounded number of times with
//! linear backoff and then surface as terminal outcomes for manual reprint.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{Order, PrinterConfig, TemplateConfig};
use crate::printer::PrinterManager;
use crate::render::{ReceiptRenderer, StoreSnapshot};
use crate::settings::SettingsService;
use crate::templates::TemplateStore;

/// Total attempts per job: one initial try plus two retries
pub const MAX_ATTEMPTS: u32 = 3;

/// Linear backoff step: attempt n waits n * step (1s, then 2s)
pub const BACKOFF_STEP: Duration = Duration::from_secs(1);

/// De-duplication key: one job per order, template and printer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct JobKey {
    order_id: i64,
    template_id: String,
    printer_id: String,
}

/// Terminal result of one auto-print job, broadcast for UI feedback
#[derive(Debug, Clone)]
pub struct PrintOutcome {
    pub order_id: i64,
    pub order_number: String,
    pub template_id: String,
    pub printer_id: String,
    pub success: bool,
    /// Attempts actually made (0 when dispatch never reached a printer)
    pub attempts: u32,
    pub reason: Option<String>,
}

/// Subscribes to new-order events and drives automatic printing
pub struct AutoPrintCoordinator {
    manager: Arc<PrinterManager>,
    settings: Arc<SettingsService>,
    templates: Arc<TemplateStore>,
    in_flight: StdMutex<HashSet<JobKey>>,
    outcomes: broadcast::Sender<PrintOutcome>,
    backoff_step: Duration,
}

impl AutoPrintCoordinator {
    pub fn new(
        manager: Arc<PrinterManager>,
        settings: Arc<SettingsService>,
        templates: Arc<TemplateStore>,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(64);
        Self {
            manager,
            settings,
            templates,
            in_flight: StdMutex::new(HashSet::new()),
            outcomes,
            backoff_step: BACKOFF_STEP,
        }
    }

    /// Shrink the backoff for tests
    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Observe terminal job outcomes (success and failure)
    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<PrintOutcome> {
        self.outcomes.subscribe()
    }

    /// Consume new-order events until the channel closes or shutdown fires.
    ///
    /// Each order is processed on its own task so a printer stuck in retries
    /// never blocks later orders.
    pub async fn run(
        self: Arc<Self>,
        mut orders: mpsc::Receiver<Arc<Order>>,
        shutdown: CancellationToken,
    ) {
        info!("auto-print coordinator started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("auto-print coordinator shutting down");
                    break;
                }
                event = orders.recv() => {
                    let Some(order) = event else {
                        info!("order channel closed, auto-print coordinator stopping");
                        break;
                    };
                    let coordinator = Arc::clone(&self);
                    tokio::spawn(async move {
                        coordinator.handle_order(&order).await;
                    });
                }
            }
        }
    }

    /// Process one new-order event end to end.
    pub async fn handle_order(&self, order: &Order) {
        if !self.settings.automatic_printing_enabled().await {
            debug!(order_id = order.id, "automatic printing disabled, skipping");
            return;
        }

        let plan = self.resolve_plan().await;
        if plan.is_empty() {
            debug!(order_id = order.id, "no templates configured for auto-print");
            return;
        }

        let Some(printer) = self.resolve_printer().await else {
            warn!(order_id = order.id, "no printer configured for auto-print");
            for (template, _) in &plan {
                self.emit(PrintOutcome {
                    order_id: order.id,
                    order_number: order.number.clone(),
                    template_id: template.template_id.clone(),
                    printer_id: String::new(),
                    success: false,
                    attempts: 0,
                    reason: Some("no printer configured".to_string()),
                });
            }
            return;
        };

        let renderer = ReceiptRenderer::new(self.store_snapshot().await);

        for (template, copies) in plan {
            let key = JobKey {
                order_id: order.id,
                template_id: template.template_id.clone(),
                printer_id: printer.id.clone(),
            };
            if !self.claim(&key) {
                debug!(
                    order_id = order.id,
                    template_id = %key.template_id,
                    "job already in flight, skipping duplicate"
                );
                continue;
            }

            let outcome = self
                .dispatch(order, &template, copies, &printer, &renderer)
                .await;
            self.release(&key);
            self.emit(outcome);
        }
    }

    /// One dispatch with bounded retries and linear backoff.
    async fn dispatch(
        &self,
        order: &Order,
        template: &TemplateConfig,
        copies: u32,
        printer: &PrinterConfig,
        renderer: &ReceiptRenderer,
    ) -> PrintOutcome {
        let bytes = renderer.render(order, template, printer);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.manager.print(printer, &bytes, copies).await {
                Ok(true) => {
                    info!(
                        order_id = order.id,
                        template_id = %template.template_id,
                        printer = %printer.display_name(),
                        attempts = attempts,
                        "auto-print succeeded"
                    );
                    return self.outcome(order, template, printer, true, attempts, None);
                }
                Ok(false) if attempts < MAX_ATTEMPTS => {
                    let delay = self.backoff_step * attempts;
                    warn!(
                        order_id = order.id,
                        template_id = %template.template_id,
                        attempt = attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        "print failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(false) => {
                    warn!(
                        order_id = order.id,
                        template_id = %template.template_id,
                        attempts = attempts,
                        "print failed permanently, surfacing for manual reprint"
                    );
                    return self.outcome(
                        order,
                        template,
                        printer,
                        false,
                        attempts,
                        Some("print failed".to_string()),
                    );
                }
                // Operational errors (not eligible, bad config) are not
                // transient; retrying cannot help
                Err(e) => {
                    warn!(
                        order_id = order.id,
                        template_id = %template.template_id,
                        error = %e,
                        "print rejected"
                    );
                    return self.outcome(
                        order,
                        template,
                        printer,
                        false,
                        attempts,
                        Some(e.to_string()),
                    );
                }
            }
        }
    }

    /// Manual reprint: one attempt, failures surface immediately.
    pub async fn print_once(
        &self,
        order: &Order,
        template_id: &str,
        printer: &PrinterConfig,
    ) -> crate::printer::PrinterOpResult<bool> {
        let Some(template) = self.templates.resolve(template_id).await else {
            return Err(crate::printer::PrinterOperationError::NotConfigured(
                template_id.to_string(),
            ));
        };
        let renderer = ReceiptRenderer::new(self.store_snapshot().await);
        let bytes = renderer.render(order, &template, printer);
        self.manager
            .print(printer, &bytes, printer.print_copies.max(1))
            .await
    }

    /// Resolve the `(template, copies)` pairs for this dispatch.
    ///
    /// The default auto-print template always participates unless its mapped
    /// copy count is an explicit 0; other mapped templates join with their
    /// configured counts. Map order is not stable, so extras are sorted for
    /// deterministic dispatch order.
    async fn resolve_plan(&self) -> Vec<(TemplateConfig, u32)> {
        let copies_map = self.settings.template_copies().await;
        let mut plan = Vec::new();
        let mut default_id = None;

        if let Some(id) = self.settings.default_auto_print_template().await {
            if let Some(template) = self.templates.resolve(&id).await {
                let copies = copies_map
                    .get(&id)
                    .copied()
                    .unwrap_or_else(|| template.print_copies.max(1));
                if copies > 0 {
                    plan.push((template, copies));
                }
            } else {
                warn!(template_id = %id, "default auto-print template not found");
            }
            default_id = Some(id);
        }

        let mut extras: Vec<(&String, &u32)> = copies_map
            .iter()
            .filter(|(id, copies)| **copies > 0 && default_id.as_ref() != Some(*id))
            .collect();
        extras.sort_by(|a, b| a.0.cmp(b.0));

        for (id, copies) in extras {
            match self.templates.resolve(id).await {
                Some(template) => plan.push((template, *copies)),
                None => warn!(template_id = %id, "configured auto-print template not found"),
            }
        }
        plan
    }

    /// The default printer, else the first one opted into auto-print.
    async fn resolve_printer(&self) -> Option<PrinterConfig> {
        if let Some(config) = self.settings.default_printer_config().await {
            return Some(config);
        }
        self.settings
            .printer_configs()
            .await
            .into_iter()
            .find(|c| c.is_auto_print)
    }

    async fn store_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            name: self.settings.store_name().await,
            address: self.settings.store_address().await,
            phone: self.settings.store_phone().await,
            currency_symbol: self.settings.currency_symbol().await,
        }
    }

    /// Atomic check-and-insert of a de-dup key.
    fn claim(&self, key: &JobKey) -> bool {
        self.in_flight.lock().unwrap().insert(key.clone())
    }

    fn release(&self, key: &JobKey) {
        self.in_flight.lock().unwrap().remove(key);
    }

    fn emit(&self, outcome: PrintOutcome) {
        // No subscribers is fine; outcomes are advisory
        let _ = self.outcomes.send(outcome);
    }

    fn outcome(
        &self,
        order: &Order,
        template: &TemplateConfig,
        printer: &PrinterConfig,
        success: bool,
        attempts: u32,
        reason: Option<String>,
    ) -> PrintOutcome {
        PrintOutcome {
            order_id: order.id,
            order_number: order.number.clone(),
            template_id: template.template_id.clone(),
            printer_id: printer.id.clone(),
            success,
            attempts,
            reason,
        }
    }
}
