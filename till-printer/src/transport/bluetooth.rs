//! Bluetooth transport (RFCOMM serial port profile)
//!
//! Thermal printers expose SPP over RFCOMM. On Linux a paired printer is
//! bound to a tty device (`rfcomm bind N <MAC>` creates `/dev/rfcommN`); this
//! transport resolves the device for a MAC address via `/proc/net/rfcomm`,
//! opens it in raw mode so command bytes pass through unmodified, and writes
//! in small chunks so the printer's modest receive buffer is not overrun.
//!
//! All file I/O is blocking and runs on the blocking pool, never on the
//! async runtime threads.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{CONNECT_TIMEOUT, STATUS_QUERY, Transport};
use crate::error::{TransportError, TransportResult};

/// Write chunk size in bytes; larger bursts can overflow the RFCOMM buffer
const CHUNK_SIZE: usize = 4096;

/// Pause between chunks
const CHUNK_DELAY: Duration = Duration::from_millis(2);

/// Bluetooth RFCOMM transport keyed by printer MAC address
pub struct BluetoothTransport {
    address: String,
    device_override: Option<String>,
    connect_timeout: Duration,
    file: Option<std::fs::File>,
}

impl BluetoothTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            device_override: None,
            connect_timeout: CONNECT_TIMEOUT,
            file: None,
        }
    }

    /// Use an explicit tty device path instead of `/proc/net/rfcomm` lookup.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device_override = Some(device.into());
        self
    }

    /// Override the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn resolve_device(&self) -> TransportResult<String> {
        if let Some(dev) = &self.device_override {
            return Ok(dev.clone());
        }
        if !is_valid_mac(&self.address) {
            return Err(TransportError::NotFound(format!(
                "invalid bluetooth address: {}",
                self.address
            )));
        }
        rfcomm_device_for(&self.address)?.ok_or_else(|| {
            TransportError::NotFound(format!("no rfcomm binding for {}", self.address))
        })
    }
}

#[async_trait]
impl Transport for BluetoothTransport {
    async fn connect(&mut self) -> TransportResult<()> {
        if self.file.is_some() {
            return Ok(());
        }

        let device = self.resolve_device()?;
        debug!(address = %self.address, device = %device, "opening rfcomm device");

        let path = device.clone();
        let opened = tokio::time::timeout(
            self.connect_timeout,
            tokio::task::spawn_blocking(move || open_raw(&path)),
        )
        .await
        .map_err(|_| TransportError::Timeout(format!("connect {}", device)))?
        .map_err(|e| TransportError::Io(std::io::Error::other(e)))??;

        self.file = Some(opened);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        let Some(file) = self.file.take() else {
            return Err(TransportError::NotFound(format!(
                "not connected: {}",
                self.address
            )));
        };

        let payload = data.to_vec();
        let result = tokio::task::spawn_blocking(move || write_chunked(file, &payload))
            .await
            .map_err(|e| TransportError::Io(std::io::Error::other(e)))?;

        match result {
            Ok(file) => {
                self.file = Some(file);
                Ok(())
            }
            // The tty is in an unknown state after a failed write; drop it
            Err(e) => Err(TransportError::from_io(e, &self.address)),
        }
    }

    async fn probe(&mut self) -> bool {
        // RFCOMM ttys have no reliable read path without VTIME tuning, so the
        // liveness check is: the status query reaches the device and the
        // kernel can drain the line. A powered-off printer fails the drain.
        match self.write(&STATUS_QUERY).await {
            Ok(()) => true,
            Err(e) => {
                warn!(address = %self.address, error = %e, "bluetooth probe failed");
                false
            }
        }
    }

    async fn disconnect(&mut self) {
        // Dropping the File closes the fd
        self.file = None;
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }
}

/// Chunked write + drain. Returns the file for reuse on success.
fn write_chunked(mut file: std::fs::File, data: &[u8]) -> std::io::Result<std::fs::File> {
    for chunk in data.chunks(CHUNK_SIZE) {
        file.write_all(chunk)?;
        if data.len() > CHUNK_SIZE {
            std::thread::sleep(CHUNK_DELAY);
        }
    }
    file.flush()?;
    drain(&file)?;
    Ok(file)
}

/// Validate a Bluetooth MAC address (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let mut groups = 0;
    for part in mac.split(':') {
        if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
        groups += 1;
    }
    groups == 6
}

/// Find the tty device bound to a MAC address via `/proc/net/rfcomm`.
///
/// Lines look like `rfcomm0: 00:11:62:AA:BB:CC channel 1 ...`.
#[cfg(unix)]
fn rfcomm_device_for(mac: &str) -> TransportResult<Option<String>> {
    let table = match fs::read_to_string("/proc/net/rfcomm") {
        Ok(t) => t,
        // No rfcomm module loaded: treat as "nothing bound"
        Err(_) => return Ok(None),
    };

    let needle = mac.to_uppercase();
    for line in table.lines() {
        if !line.to_uppercase().contains(&needle) {
            continue;
        }
        let Some(name) = line.split(':').next() else {
            continue;
        };
        let path = format!("/dev/{}", name.trim());
        if Path::new(&path).exists() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(not(unix))]
fn rfcomm_device_for(_mac: &str) -> TransportResult<Option<String>> {
    Ok(None)
}

/// Open a tty device and put it into raw binary mode.
///
/// Raw mode disables input/output processing, echo and XON/XOFF flow control
/// (0x11/0x13 appear in ESC/POS size commands and must not be eaten by the
/// line discipline).
#[cfg(unix)]
fn open_raw(path: &str) -> TransportResult<std::fs::File> {
    use std::os::unix::io::AsRawFd;

    let file = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| TransportError::from_io(e, path))?;

    let fd = file.as_raw_fd();
    // SAFETY: fd is a valid open descriptor for the lifetime of `file`
    unsafe {
        let mut tio: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(TransportError::Io(std::io::Error::last_os_error()));
        }
        libc::cfmakeraw(&mut tio);
        tio.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(TransportError::Io(std::io::Error::last_os_error()));
        }
    }
    Ok(file)
}

#[cfg(not(unix))]
fn open_raw(_path: &str) -> TransportResult<std::fs::File> {
    Err(TransportError::NotFound(
        "bluetooth transport requires a unix rfcomm device".to_string(),
    ))
}

/// Block until the kernel has pushed all buffered bytes to the device.
#[cfg(unix)]
fn drain(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: fd is valid while `file` lives
    if unsafe { libc::tcdrain(file.as_raw_fd()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn drain(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_validation() {
        assert!(is_valid_mac("00:11:62:AA:BB:CC"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
        assert!(!is_valid_mac("00:11:62:AA:BB"));
        assert!(!is_valid_mac("00-11-62-AA-BB-CC"));
        assert!(!is_valid_mac("ZZ:11:62:AA:BB:CC"));
        assert!(!is_valid_mac(""));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_address() {
        let mut t = BluetoothTransport::new("garbage");
        let err = t.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::NotFound(_)));
        assert!(!t.is_connected());
    }

    #[tokio::test]
    async fn test_write_without_connect_fails() {
        let mut t = BluetoothTransport::new("00:11:62:AA:BB:CC");
        assert!(t.write(b"data").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unbound_mac_is_not_found() {
        let mut t = BluetoothTransport::new("00:00:00:00:00:01");
        let err = t.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::NotFound(_)));
    }
}
