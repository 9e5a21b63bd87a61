//! Trait abstraction for the GPS serial byte source to enable testing

use std::io;

/// Non-blocking byte source for the GPS receiver
pub trait SerialRead: Send {
    /// Copy currently buffered bytes into `buf`
    ///
    /// Returns `Ok(0)` when nothing is buffered; never waits for new data.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<T: SerialRead + ?Sized> SerialRead for Box<T> {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_available(buf)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock serial port for testing
    ///
    /// Clones share the same receive buffer, so a test can keep a handle
    /// and inject bytes after the port has been moved into a tracker.
    #[derive(Clone, Default)]
    pub struct MockSerial {
        pub rx_data: Arc<Mutex<VecDeque<u8>>>,
        pub read_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub reads: Arc<Mutex<usize>>,
    }

    impl MockSerial {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn inject_rx_data(&self, data: &[u8]) {
            self.rx_data.lock().unwrap().extend(data.iter().copied());
        }

        pub fn set_read_error(&self, error: io::ErrorKind) {
            *self.read_error.lock().unwrap() = Some(error);
        }

        pub fn pending(&self) -> usize {
            self.rx_data.lock().unwrap().len()
        }

        pub fn read_count(&self) -> usize {
            *self.reads.lock().unwrap()
        }
    }

    impl SerialRead for MockSerial {
        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            *self.reads.lock().unwrap() += 1;
            if let Some(error) = *self.read_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock read error"));
            }

            let mut rx = self.rx_data.lock().unwrap();
            let count = buf.len().min(rx.len());
            for (slot, byte) in buf.iter_mut().zip(rx.drain(..count)) {
                *slot = byte;
            }
            Ok(count)
        }
    }
}
