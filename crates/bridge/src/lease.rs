/// Receives lease lifecycle events.
pub trait LeaseObserver {
    fn acquired(&self, len: usize);
    fn released(&self, len: usize);
}

impl<T: LeaseObserver + ?Sized> LeaseObserver for &T {
    fn acquired(&self, len: usize) {
        (**self).acquired(len);
    }

    fn released(&self, len: usize) {
        (**self).released(len);
    }
}

/// Default observer: traces lease events through `log`.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogObserver;

impl LeaseObserver for LogObserver {
    fn acquired(&self, len: usize) {
        log::trace!("pixel lease acquired ({len} bytes)");
    }

    fn released(&self, len: usize) {
        log::trace!("pixel lease released ({len} bytes)");
    }
}

/// Scoped borrow of a decoded pixel buffer for the duration of a save.
///
/// The buffer cannot move or be freed while the lease is alive. Dropping the
/// lease reports the release exactly once, including during unwinding.
pub struct PixelLease<'a> {
    pixels: &'a [u8],
    observer: &'a dyn LeaseObserver,
}

impl<'a> PixelLease<'a> {
    pub fn acquire(pixels: &'a [u8], observer: &'a dyn LeaseObserver) -> Self {
        observer.acquired(pixels.len());
        Self { pixels, observer }
    }

    pub fn pixels(&self) -> &[u8] {
        self.pixels
    }
}

impl Drop for PixelLease<'_> {
    fn drop(&mut self) {
        self.observer.released(self.pixels.len());
    }
}
