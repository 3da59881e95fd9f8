//! Printer connection manager
//!
//! The only component allowed to hold live transport handles. Every
//! connect/disconnect/print request for one printer id is serialized behind a
//! per-id async mutex; concurrent callers queue instead of racing (two tasks
//! interleaving bytes on one socket corrupt the print job). Operations on
//! different ids run fully independently.
//!
//! State machine per id:
//!
//! ```text
//! Disconnected --connect()--> Connecting --ok+probe--> Connected
//!      ^                          |                        |
//!      |<---- Error <---timeout/probe-fail/write-fail -----|
//! ```
//!
//! `Error` is emitted once and immediately decays to `Disconnected`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, info, warn};

use till_printer::{SCAN_TIMEOUT, Transport, scan_bluetooth, scan_network};

use crate::licensing::EligibilityGate;
use crate::models::{PrinterConfig, PrinterDevice, PrinterStatus, TransportKind};

use super::error::{PrinterOpResult, PrinterOperationError};
use super::factory::TransportFactory;

/// Pause between copies so the printer's local buffer drains
pub const INTER_COPY_DELAY: Duration = Duration::from_millis(400);

/// Raw-print TCP port used by the network scan
const RAW_PRINT_PORT: u16 = 9100;

/// Per-printer connection state
struct PrinterEntry {
    /// Serializes all operations for this id; holds the live transport
    slot: Mutex<Option<Box<dyn Transport>>>,
    current: StdMutex<PrinterStatus>,
    transitions: broadcast::Sender<PrinterStatus>,
}

impl PrinterEntry {
    fn new() -> Self {
        let (transitions, _) = broadcast::channel(16);
        Self {
            slot: Mutex::new(None),
            current: StdMutex::new(PrinterStatus::Disconnected),
            transitions,
        }
    }

    fn status(&self) -> PrinterStatus {
        *self.current.lock().unwrap()
    }

    fn set_status(&self, status: PrinterStatus) {
        *self.current.lock().unwrap() = status;
        // No receivers is fine; status() still reflects the latest value
        let _ = self.transitions.send(status);
    }

    /// Emit the transient Error state, then settle on Disconnected.
    fn fail(&self) {
        self.set_status(PrinterStatus::Error);
        self.set_status(PrinterStatus::Disconnected);
    }
}

/// Push-based status stream for one printer id
///
/// Yields the state at subscription time first, then every transition in
/// order. All subscribers share the manager's underlying channel.
pub struct StatusStream {
    first: Option<PrinterStatus>,
    rx: broadcast::Receiver<PrinterStatus>,
}

impl StatusStream {
    /// Next status; `None` once the manager is gone.
    pub async fn next(&mut self) -> Option<PrinterStatus> {
        if let Some(status) = self.first.take() {
            return Some(status);
        }
        loop {
            match self.rx.recv().await {
                Ok(status) => return Some(status),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped = skipped, "status stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Connection state machine over all configured printers
pub struct PrinterManager {
    factory: Arc<dyn TransportFactory>,
    gate: Arc<dyn EligibilityGate>,
    printers: DashMap<String, Arc<PrinterEntry>>,
    active_scans: Arc<StdMutex<HashSet<TransportKind>>>,
    inter_copy_delay: Duration,
    scan_timeout: Duration,
}

impl PrinterManager {
    pub fn new(factory: Arc<dyn TransportFactory>, gate: Arc<dyn EligibilityGate>) -> Self {
        Self {
            factory,
            gate,
            printers: DashMap::new(),
            active_scans: Arc::new(StdMutex::new(HashSet::new())),
            inter_copy_delay: INTER_COPY_DELAY,
            scan_timeout: SCAN_TIMEOUT,
        }
    }

    pub fn with_inter_copy_delay(mut self, delay: Duration) -> Self {
        self.inter_copy_delay = delay;
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    fn entry(&self, id: &str) -> Arc<PrinterEntry> {
        self.printers
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(PrinterEntry::new()))
            .clone()
    }

    fn check_operable(&self, config: &PrinterConfig) -> PrinterOpResult<()> {
        if !self.gate.has_eligibility() {
            return Err(PrinterOperationError::NotEligible);
        }
        if !config.is_valid() {
            return Err(PrinterOperationError::NotConfigured(config.id.clone()));
        }
        Ok(())
    }

    /// Point-in-time status read
    pub fn status(&self, config: &PrinterConfig) -> PrinterStatus {
        self.printers
            .get(&config.id)
            .map(|entry| entry.status())
            .unwrap_or_default()
    }

    /// Subscribe to status transitions; the current state is yielded first.
    pub fn subscribe_status(&self, config: &PrinterConfig) -> StatusStream {
        let entry = self.entry(&config.id);
        let rx = entry.transitions.subscribe();
        StatusStream {
            first: Some(entry.status()),
            rx,
        }
    }

    /// Connect to a printer. Idempotent: `true` without touching the
    /// transport when already connected.
    pub async fn connect(&self, config: &PrinterConfig) -> PrinterOpResult<bool> {
        self.check_operable(config)?;
        let entry = self.entry(&config.id);
        let mut slot = entry.slot.lock().await;
        Ok(self.connect_locked(config, &entry, &mut slot).await)
    }

    /// Connect with the per-id lock already held.
    async fn connect_locked(
        &self,
        config: &PrinterConfig,
        entry: &PrinterEntry,
        slot: &mut Option<Box<dyn Transport>>,
    ) -> bool {
        if entry.status() == PrinterStatus::Connected
            && slot.as_ref().is_some_and(|t| t.is_connected())
        {
            return true;
        }

        entry.set_status(PrinterStatus::Connecting);

        let mut transport = match slot.take() {
            Some(transport) => transport,
            None => match self.factory.create(config) {
                Ok(transport) => transport,
                Err(e) => {
                    warn!(printer = %config.display_name(), error = %e, "no transport for printer");
                    entry.fail();
                    return false;
                }
            },
        };

        if let Err(e) = transport.connect().await {
            warn!(printer = %config.display_name(), error = %e, "connect failed");
            // A timed-out connect must not leave a half-open handle behind
            transport.disconnect().await;
            entry.fail();
            return false;
        }

        // Two-phase confirmation: thermal printers accept sockets while
        // powered off or out of paper, so an accepted connect proves nothing
        // until the device answers a probe.
        if !transport.probe().await {
            warn!(printer = %config.display_name(), "printer accepted connection but failed probe");
            transport.disconnect().await;
            entry.fail();
            return false;
        }

        *slot = Some(transport);
        entry.set_status(PrinterStatus::Connected);
        info!(printer = %config.display_name(), "printer connected");
        true
    }

    /// Release the transport for a printer and settle on Disconnected.
    pub async fn disconnect(&self, config: &PrinterConfig) {
        let entry = self.entry(&config.id);
        let mut slot = entry.slot.lock().await;
        if let Some(mut transport) = slot.take() {
            transport.disconnect().await;
        }
        entry.set_status(PrinterStatus::Disconnected);
        debug!(printer = %config.display_name(), "printer disconnected");
    }

    /// Force-disconnect and drop all state for an id.
    ///
    /// Must run before the printer's config is deleted from settings.
    pub async fn forget(&self, id: &str) {
        if let Some((_, entry)) = self.printers.remove(id) {
            let mut slot = entry.slot.lock().await;
            if let Some(mut transport) = slot.take() {
                transport.disconnect().await;
            }
            entry.set_status(PrinterStatus::Disconnected);
        }
    }

    /// Write `bytes` to the printer `copies` times.
    ///
    /// Connects first when needed. Copies are written sequentially with a
    /// drain delay in between; a failed copy is not resent here - the retry
    /// policy belongs to the caller. Transport failures downgrade status to
    /// `Error` then `Disconnected` and come back as `Ok(false)`.
    pub async fn print(
        &self,
        config: &PrinterConfig,
        bytes: &[u8],
        copies: u32,
    ) -> PrinterOpResult<bool> {
        self.check_operable(config)?;
        let copies = copies.max(1);
        let entry = self.entry(&config.id);
        let mut slot = entry.slot.lock().await;

        if !self.connect_locked(config, &entry, &mut slot).await {
            return Ok(false);
        }

        for copy in 0..copies {
            if copy > 0 {
                tokio::time::sleep(self.inter_copy_delay).await;
            }
            let Some(transport) = slot.as_mut() else {
                return Ok(false);
            };
            if let Err(e) = transport.write(bytes).await {
                warn!(
                    printer = %config.display_name(),
                    copy = copy + 1,
                    error = %e,
                    "write failed"
                );
                if let Some(mut dead) = slot.take() {
                    dead.disconnect().await;
                }
                entry.fail();
                return Ok(false);
            }
        }

        debug!(
            printer = %config.display_name(),
            bytes = bytes.len(),
            copies = copies,
            "print job written"
        );
        Ok(true)
    }

    /// Scan for devices of one transport kind.
    ///
    /// Restartable and bounded by the scan timeout; devices are emitted as
    /// discovered. At most one scan per transport kind runs at a time.
    pub fn scan(&self, kind: TransportKind) -> PrinterOpResult<mpsc::Receiver<PrinterDevice>> {
        if !self.gate.has_eligibility() {
            return Err(PrinterOperationError::NotEligible);
        }
        {
            let mut scans = self.active_scans.lock().unwrap();
            if !scans.insert(kind) {
                return Err(PrinterOperationError::AlreadyInProgress(format!(
                    "{} scan",
                    kind
                )));
            }
        }

        let raw = match kind {
            TransportKind::Bluetooth => scan_bluetooth(self.scan_timeout),
            TransportKind::Network => scan_network(RAW_PRINT_PORT, self.scan_timeout),
            TransportKind::Usb => {
                self.active_scans.lock().unwrap().remove(&kind);
                return Err(PrinterOperationError::NotConfigured(
                    "usb scan is not supported".to_string(),
                ));
            }
        };

        let (tx, rx) = mpsc::channel(32);
        let scans = Arc::clone(&self.active_scans);
        tokio::spawn(async move {
            let mut raw = raw;
            while let Some(found) = raw.recv().await {
                let device = PrinterDevice {
                    name: found.name,
                    address: found.address,
                    transport: kind,
                    status: PrinterStatus::Disconnected,
                };
                if tx.send(device).await.is_err() {
                    break;
                }
            }
            scans.lock().unwrap().remove(&kind);
        });

        Ok(rx)
    }

    /// Disconnect every printer (shutdown path).
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.printers.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.forget(&id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licensing::{AlwaysEligible, StaticGate};
    use crate::models::TransportKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use till_printer::{TransportError, TransportResult};

    /// Shared scripting and observation state for mock transports
    #[derive(Default)]
    struct MockState {
        /// Remaining connect attempts that should fail with Timeout
        fail_connects: AtomicUsize,
        /// Remaining writes that should fail with Io
        fail_writes: AtomicUsize,
        probe_fails: AtomicBool,
        connect_calls: AtomicUsize,
        write_calls: AtomicUsize,
        open_handles: AtomicUsize,
        write_delay: StdMutex<Duration>,
    }

    struct MockTransport {
        state: Arc<MockState>,
        connected: bool,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn connect(&mut self) -> TransportResult<()> {
            self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
            if self
                .state
                .fail_connects
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(TransportError::Timeout("mock connect".to_string()));
            }
            self.connected = true;
            self.state.open_handles.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn write(&mut self, _data: &[u8]) -> TransportResult<()> {
            let delay = *self.state.write_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.state.write_calls.fetch_add(1, Ordering::SeqCst);
            if self
                .state
                .fail_writes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(TransportError::Io(std::io::Error::other("mock write")));
            }
            Ok(())
        }

        async fn probe(&mut self) -> bool {
            !self.state.probe_fails.load(Ordering::SeqCst)
        }

        async fn disconnect(&mut self) {
            if self.connected {
                self.connected = false;
                self.state.open_handles.fetch_sub(1, Ordering::SeqCst);
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    impl Drop for MockTransport {
        fn drop(&mut self) {
            if self.connected {
                self.state.open_handles.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    struct MockFactory {
        state: Arc<MockState>,
    }

    impl TransportFactory for MockFactory {
        fn create(&self, _config: &PrinterConfig) -> TransportResult<Box<dyn Transport>> {
            Ok(Box::new(MockTransport {
                state: Arc::clone(&self.state),
                connected: false,
            }))
        }
    }

    fn manager_with(state: Arc<MockState>) -> PrinterManager {
        PrinterManager::new(Arc::new(MockFactory { state }), Arc::new(AlwaysEligible))
            .with_inter_copy_delay(Duration::from_millis(1))
    }

    fn config() -> PrinterConfig {
        PrinterConfig::new("front-desk", TransportKind::Network, "192.168.1.50")
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let state = Arc::new(MockState::default());
        let manager = manager_with(state.clone());
        let config = config();

        assert!(manager.connect(&config).await.unwrap());
        assert!(manager.connect(&config).await.unwrap());

        // One physical connect, one open handle
        assert_eq!(state.connect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.open_handles.load(Ordering::SeqCst), 1);
        assert_eq!(manager.status(&config), PrinterStatus::Connected);
    }

    #[tokio::test]
    async fn test_connect_timeout_transitions_and_leaves_nothing_open() {
        let state = Arc::new(MockState::default());
        state.fail_connects.store(1, Ordering::SeqCst);
        let manager = manager_with(state.clone());
        let config = config();

        let mut stream = manager.subscribe_status(&config);
        assert_eq!(stream.next().await, Some(PrinterStatus::Disconnected));

        assert!(!manager.connect(&config).await.unwrap());

        assert_eq!(stream.next().await, Some(PrinterStatus::Connecting));
        assert_eq!(stream.next().await, Some(PrinterStatus::Error));
        assert_eq!(stream.next().await, Some(PrinterStatus::Disconnected));
        assert_eq!(state.open_handles.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_connected() {
        let state = Arc::new(MockState::default());
        state.probe_fails.store(true, Ordering::SeqCst);
        let manager = manager_with(state.clone());
        let config = config();

        assert!(!manager.connect(&config).await.unwrap());
        assert_eq!(manager.status(&config), PrinterStatus::Disconnected);
        assert_eq!(state.open_handles.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_print_connects_first_and_writes_copies() {
        let state = Arc::new(MockState::default());
        let manager = manager_with(state.clone());
        let config = config();

        assert!(manager.print(&config, b"receipt", 3).await.unwrap());
        assert_eq!(state.connect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.write_calls.load(Ordering::SeqCst), 3);
        assert_eq!(manager.status(&config), PrinterStatus::Connected);
    }

    #[tokio::test]
    async fn test_write_failure_downgrades_and_reports_false() {
        let state = Arc::new(MockState::default());
        state.fail_writes.store(1, Ordering::SeqCst);
        let manager = manager_with(state.clone());
        let config = config();

        assert!(!manager.print(&config, b"receipt", 2).await.unwrap());
        assert_eq!(manager.status(&config), PrinterStatus::Disconnected);
        assert_eq!(state.open_handles.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_prints_share_one_handle() {
        let state = Arc::new(MockState::default());
        *state.write_delay.lock().unwrap() = Duration::from_millis(20);
        let manager = Arc::new(manager_with(state.clone()));
        let config = config();

        let a = {
            let manager = manager.clone();
            let config = config.clone();
            tokio::spawn(async move { manager.print(&config, b"a", 1).await.unwrap() })
        };
        let b = {
            let manager = manager.clone();
            let config = config.clone();
            tokio::spawn(async move { manager.print(&config, b"b", 1).await.unwrap() })
        };

        assert!(a.await.unwrap());
        assert!(b.await.unwrap());
        // Serialized on one transport: a single connect, never two handles
        assert_eq!(state.connect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.open_handles.load(Ordering::SeqCst), 1);
        assert_eq!(state.write_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_eligible_short_circuits() {
        let state = Arc::new(MockState::default());
        let manager = PrinterManager::new(
            Arc::new(MockFactory {
                state: state.clone(),
            }),
            Arc::new(StaticGate(false)),
        );
        let config = config();

        assert!(matches!(
            manager.connect(&config).await,
            Err(PrinterOperationError::NotEligible)
        ));
        assert!(matches!(
            manager.print(&config, b"x", 1).await,
            Err(PrinterOperationError::NotEligible)
        ));
        assert_eq!(state.connect_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_not_configured() {
        let state = Arc::new(MockState::default());
        let manager = manager_with(state);
        let mut config = config();
        config.address = String::new();

        assert!(matches!(
            manager.connect(&config).await,
            Err(PrinterOperationError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_forget_releases_handle() {
        let state = Arc::new(MockState::default());
        let manager = manager_with(state.clone());
        let config = config();

        assert!(manager.connect(&config).await.unwrap());
        assert_eq!(state.open_handles.load(Ordering::SeqCst), 1);

        manager.forget(&config.id).await;
        assert_eq!(state.open_handles.load(Ordering::SeqCst), 0);
        assert_eq!(manager.status(&config), PrinterStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_usb_scan_unsupported() {
        let state = Arc::new(MockState::default());
        let manager = manager_with(state);
        assert!(matches!(
            manager.scan(TransportKind::Usb),
            Err(PrinterOperationError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_scan_rejected() {
        let state = Arc::new(MockState::default());
        let manager = manager_with(state).with_scan_timeout(Duration::from_millis(100));

        let _first = manager.scan(TransportKind::Bluetooth).unwrap();
        assert!(matches!(
            manager.scan(TransportKind::Bluetooth),
            Err(PrinterOperationError::AlreadyInProgress(_))
        ));
    }
}
