use anyhow::{Result, bail};

/// Control side of the audio playback clock.
///
/// Positions and the end-of-track signal are delivered to the session as
/// events; this trait covers the calls the session makes back into the
/// clock.
pub trait PlaybackClock {
    /// Seek to 0 ms and begin playback.
    fn start_from_zero(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Track length in milliseconds, if the backend knows it.
    fn duration_ms(&self) -> Option<f64>;
}

impl<C: PlaybackClock + ?Sized> PlaybackClock for Box<C> {
    fn start_from_zero(&mut self) -> Result<()> {
        (**self).start_from_zero()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn duration_ms(&self) -> Option<f64> {
        (**self).duration_ms()
    }
}

/// Scriptable clock for tests and autoplay. Records start/stop calls.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    duration_ms: Option<f64>,
    running: bool,
    start_count: u32,
    stop_count: u32,
    fail_start: bool,
    fail_stop: bool,
}

impl ManualClock {
    pub fn new(duration_ms: Option<f64>) -> Self {
        Self {
            duration_ms,
            ..Self::default()
        }
    }

    /// Make `start_from_zero` fail, as a backend that cannot open the
    /// audio device would.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start_count(&self) -> u32 {
        self.start_count
    }

    pub fn stop_count(&self) -> u32 {
        self.stop_count
    }
}

impl PlaybackClock for ManualClock {
    fn start_from_zero(&mut self) -> Result<()> {
        if self.fail_start {
            bail!("playback device unavailable");
        }
        self.start_count += 1;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop_count += 1;
        self.running = false;
        if self.fail_stop {
            bail!("playback device already released");
        }
        Ok(())
    }

    fn duration_ms(&self) -> Option<f64> {
        self.duration_ms
    }
}
