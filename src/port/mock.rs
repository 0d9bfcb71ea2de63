//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that plays the controller side of the line
//! protocol without hardware: replies are queued up front and every line the
//! host writes is logged for inspection.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes returned by subsequent reads.
    read_queue: VecDeque<u8>,
    /// Raw bytes written by the host, in order.
    written: Vec<u8>,
    /// Fail the next write with an I/O error.
    fail_next_write: bool,
    input_clears: usize,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
///
/// # Example
/// ```
/// use servodoor::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_line(r#"{"ok":true}"#);
///
/// port.write_bytes(b"{\"cmd\":\"ping\"}\n").unwrap();
/// let mut buffer = [0u8; 32];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"{\"ok\":true}\n");
/// assert_eq!(port.sent_lines(), vec![r#"{"cmd":"ping"}"#.to_string()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Enqueue raw bytes to be returned by subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Enqueue one reply line; the trailing newline is added.
    pub fn enqueue_line(&self, line: &str) {
        let mut state = self.state.lock();
        state.read_queue.extend(line.as_bytes());
        state.read_queue.push_back(b'\n');
    }

    /// Make the next write fail as if the cable was pulled.
    pub fn fail_next_write(&self) {
        self.state.lock().fail_next_write = true;
    }

    /// Every complete line written by the host, without terminators.
    pub fn sent_lines(&self) -> Vec<String> {
        let state = self.state.lock();
        String::from_utf8_lossy(&state.written)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Number of bytes still waiting to be read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// How many times the host discarded pending input.
    pub fn input_clears(&self) -> usize {
        self.state.lock().input_clears
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device disconnected",
            )));
        }
        state.written.extend_from_slice(data);
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(PortError::timeout(Duration::from_millis(1)))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_input(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        // Queued replies belong to requests the test has not sent yet, so
        // they survive; only the counter moves.
        state.input_clears += 1;
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_line_and_read() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_line("hello");

        let mut buffer = [0u8; 16];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"hello\n");
    }

    #[test]
    fn test_sent_lines_split_on_newline() {
        let mut port = MockSerialPort::new("MOCK0");
        port.write_bytes(b"first\nsec").unwrap();
        port.write_bytes(b"ond\n").unwrap();

        assert_eq!(port.sent_lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_empty_read_is_idle() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut buffer = [0u8; 4];
        let err = port.read_bytes(&mut buffer).unwrap_err();
        assert!(err.is_idle());
    }

    #[test]
    fn test_fail_next_write_only_once() {
        let mut port = MockSerialPort::new("MOCK0");
        port.fail_next_write();
        assert!(port.write_bytes(b"x\n").is_err());
        assert!(port.write_bytes(b"y\n").is_ok());
        assert_eq!(port.sent_lines(), vec!["y"]);
    }

    #[test]
    fn test_clones_share_state() {
        let port = MockSerialPort::new("MOCK0");
        let mut owned = port.clone();
        owned.write_bytes(b"shared\n").unwrap();
        assert_eq!(port.sent_lines(), vec!["shared"]);
    }
}
