//! Heartbeat supervision for a single channel.
//!
//! The supervisor is a passive state machine: the channel feeds it elapsed
//! time on every `update` tick and acts on what comes back. It tracks two
//! clocks. *Logical* time drives the probe cadence — every full interval
//! without traffic emits one probe and one miss. *Real* time backs the
//! hard liveness decision, so a game running at a crawl (logical time
//! dilated) still notices a genuinely silent wire, and a paused game
//! doesn't get disconnected the instant it resumes.
//!
//! States: `Idle` (not running) → `Active` (accumulating) → `Suspected`
//! (at least one probe outstanding) → back to `Active` on received
//! traffic, or `Dead` once the miss threshold is exceeded. `Dead` is
//! terminal until the channel reconnects.

/// Default probe interval in seconds.
pub const DEFAULT_INTERVAL: f32 = 30.0;

/// Default number of consecutive misses tolerated before the channel is
/// declared dead.
pub const DEFAULT_MAX_MISSED: u32 = 3;

/// Heartbeat tuning for one channel.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Seconds of silence before a probe is sent. `0.0` disables the
    /// supervisor entirely.
    pub interval: f32,
    /// Consecutive misses tolerated; exceeding this declares the channel
    /// dead. `0` means misses are counted but never fatal.
    pub max_missed: u32,
    /// Whether received traffic resets the elapsed time and miss count.
    pub reset_on_receive: bool,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_missed: DEFAULT_MAX_MISSED,
            reset_on_receive: true,
        }
    }
}

impl HeartbeatConfig {
    /// Config with a specific probe interval and default limits.
    pub fn with_interval(interval: f32) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    /// A negative interval becomes `0.0` (disabled).
    pub fn validated(mut self) -> Self {
        if self.interval < 0.0 {
            self.interval = 0.0;
        }
        self
    }
}

/// Observable supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    /// Not running (channel disconnected or interval disabled).
    Idle,
    /// Running, no outstanding probes.
    Active,
    /// At least one probe sent without a response.
    Suspected,
    /// Miss limit exceeded; the channel should close.
    Dead,
}

/// Outcome of one supervisor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// Nothing to do.
    Quiet,
    /// A full interval elapsed: send a probe, report the miss.
    Probe {
        /// Consecutive miss count including this one.
        missed: u32,
    },
    /// The miss limit was exceeded: report and close the channel.
    Expired {
        /// Consecutive miss count at expiry.
        missed: u32,
    },
}

/// Per-channel heartbeat state machine.
#[derive(Debug)]
pub struct HeartbeatSupervisor {
    config: HeartbeatConfig,
    /// Logical seconds since the last reset; drives probe cadence.
    elapsed: f32,
    /// Wall-clock seconds since the last reset; drives the hard limit.
    real_silence: f32,
    missed: u32,
    running: bool,
}

impl HeartbeatSupervisor {
    /// Creates a supervisor from config. Starts idle.
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config: config.validated(),
            elapsed: 0.0,
            real_silence: 0.0,
            missed: 0,
            running: false,
        }
    }

    /// Arms the supervisor on a fresh connection.
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.real_silence = 0.0;
        self.missed = 0;
        self.running = true;
    }

    /// Disarms the supervisor when the channel disconnects.
    pub fn stop(&mut self) {
        self.running = false;
        self.elapsed = 0.0;
        self.real_silence = 0.0;
        self.missed = 0;
    }

    /// Advances the state machine by one update tick.
    ///
    /// `elapsed` is logical time, `real_elapsed` wall-clock time; they
    /// differ when the driving application slows down or pauses.
    pub fn tick(&mut self, elapsed: f32, real_elapsed: f32) -> HeartbeatTick {
        if !self.running || self.config.interval <= 0.0 {
            return HeartbeatTick::Quiet;
        }

        self.elapsed += elapsed;
        self.real_silence += real_elapsed;

        // The wall clock alone can declare the channel dead: if the wire
        // has been silent for the whole miss budget of real time, no
        // amount of logical-time dilation excuses it.
        if self.config.max_missed > 0 {
            let budget = self.config.interval * (self.config.max_missed + 1) as f32;
            if self.real_silence >= budget {
                self.missed += 1;
                return HeartbeatTick::Expired {
                    missed: self.missed,
                };
            }
        }

        if self.elapsed < self.config.interval {
            return HeartbeatTick::Quiet;
        }

        self.elapsed = 0.0;
        self.missed += 1;

        if self.config.max_missed > 0 && self.missed > self.config.max_missed {
            HeartbeatTick::Expired {
                missed: self.missed,
            }
        } else {
            HeartbeatTick::Probe {
                missed: self.missed,
            }
        }
    }

    /// Notes received traffic, resetting elapsed time and miss count when
    /// the config says so.
    pub fn on_receive(&mut self) {
        if self.config.reset_on_receive {
            self.elapsed = 0.0;
            self.real_silence = 0.0;
            self.missed = 0;
        } else {
            self.real_silence = 0.0;
        }
    }

    /// Consecutive misses since the last reset.
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// Logical seconds accumulated toward the next probe.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// The configured probe interval in seconds.
    pub fn interval(&self) -> f32 {
        self.config.interval
    }

    /// Changes the probe interval. Negative values disable probing.
    pub fn set_interval(&mut self, interval: f32) {
        self.config.interval = interval.max(0.0);
    }

    /// Whether received traffic resets the miss state.
    pub fn reset_on_receive(&self) -> bool {
        self.config.reset_on_receive
    }

    /// Sets whether received traffic resets the miss state.
    pub fn set_reset_on_receive(&mut self, reset: bool) {
        self.config.reset_on_receive = reset;
    }

    /// Current observable state.
    pub fn state(&self) -> HeartbeatState {
        if !self.running {
            return HeartbeatState::Idle;
        }
        if self.config.max_missed > 0 && self.missed > self.config.max_missed {
            return HeartbeatState::Dead;
        }
        if self.missed > 0 {
            return HeartbeatState::Suspected;
        }
        HeartbeatState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor(interval: f32) -> HeartbeatSupervisor {
        let mut s = HeartbeatSupervisor::new(HeartbeatConfig::with_interval(interval));
        s.start();
        s
    }

    #[test]
    fn test_idle_until_started() {
        let mut s = HeartbeatSupervisor::new(HeartbeatConfig::with_interval(1.0));
        assert_eq!(s.state(), HeartbeatState::Idle);
        assert_eq!(s.tick(10.0, 10.0), HeartbeatTick::Quiet);
    }

    #[test]
    fn test_quiet_below_interval() {
        let mut s = supervisor(5.0);
        for _ in 0..4 {
            assert_eq!(s.tick(1.0, 1.0), HeartbeatTick::Quiet);
        }
        assert_eq!(s.state(), HeartbeatState::Active);
    }

    #[test]
    fn test_probe_at_interval() {
        let mut s = supervisor(5.0);
        for _ in 0..4 {
            s.tick(1.0, 1.0);
        }
        assert_eq!(s.tick(1.0, 1.0), HeartbeatTick::Probe { missed: 1 });
        assert_eq!(s.state(), HeartbeatState::Suspected);
        assert_eq!(s.elapsed(), 0.0);
    }

    #[test]
    fn test_consecutive_probes_accumulate_misses() {
        let mut s = supervisor(5.0);
        // 12.5 seconds of silence at 1s ticks: probes at 5s and 10s.
        let mut probes = Vec::new();
        let mut t = 0.0;
        while t < 12.5 {
            if let HeartbeatTick::Probe { missed } = s.tick(1.0, 1.0) {
                probes.push((t + 1.0, missed));
            }
            t += 1.0;
        }
        assert_eq!(probes, vec![(5.0, 1), (10.0, 2)]);
        assert_eq!(s.missed(), 2);
    }

    #[test]
    fn test_receive_resets_state() {
        let mut s = supervisor(5.0);
        for _ in 0..6 {
            s.tick(1.0, 1.0);
        }
        assert_eq!(s.missed(), 1);

        s.on_receive();
        assert_eq!(s.missed(), 0);
        assert_eq!(s.elapsed(), 0.0);
        assert_eq!(s.state(), HeartbeatState::Active);
    }

    #[test]
    fn test_receive_without_reset_keeps_logical_state() {
        let mut s = HeartbeatSupervisor::new(HeartbeatConfig {
            interval: 5.0,
            reset_on_receive: false,
            ..Default::default()
        });
        s.start();
        for _ in 0..6 {
            s.tick(1.0, 1.0);
        }
        assert_eq!(s.missed(), 1);
        s.on_receive();
        assert_eq!(s.missed(), 1);
    }

    #[test]
    fn test_expiry_past_miss_limit() {
        let mut s = HeartbeatSupervisor::new(HeartbeatConfig {
            interval: 1.0,
            max_missed: 2,
            reset_on_receive: true,
        });
        s.start();
        assert_eq!(s.tick(1.0, 0.0), HeartbeatTick::Probe { missed: 1 });
        assert_eq!(s.tick(1.0, 0.0), HeartbeatTick::Probe { missed: 2 });
        assert_eq!(s.tick(1.0, 0.0), HeartbeatTick::Expired { missed: 3 });
        assert_eq!(s.state(), HeartbeatState::Dead);
    }

    #[test]
    fn test_real_clock_expiry_under_logical_stall() {
        // Logical time frozen (paused game), wall clock running: once the
        // wire has been silent past the full miss budget, expire anyway.
        let mut s = HeartbeatSupervisor::new(HeartbeatConfig {
            interval: 5.0,
            max_missed: 2,
            reset_on_receive: true,
        });
        s.start();
        assert_eq!(s.tick(0.0, 10.0), HeartbeatTick::Quiet);
        assert!(matches!(s.tick(0.0, 10.0), HeartbeatTick::Expired { .. }));
    }

    #[test]
    fn test_zero_interval_disables() {
        let mut s = HeartbeatSupervisor::new(HeartbeatConfig::with_interval(0.0));
        s.start();
        assert_eq!(s.tick(100.0, 100.0), HeartbeatTick::Quiet);
        assert_eq!(s.missed(), 0);
    }

    #[test]
    fn test_negative_interval_validated_to_disabled() {
        let cfg = HeartbeatConfig::with_interval(-3.0).validated();
        assert_eq!(cfg.interval, 0.0);
    }

    #[test]
    fn test_stop_clears_state() {
        let mut s = supervisor(1.0);
        s.tick(1.0, 1.0);
        assert_eq!(s.missed(), 1);
        s.stop();
        assert_eq!(s.missed(), 0);
        assert_eq!(s.state(), HeartbeatState::Idle);
    }

    #[test]
    fn test_zero_max_missed_never_expires() {
        let mut s = HeartbeatSupervisor::new(HeartbeatConfig {
            interval: 1.0,
            max_missed: 0,
            reset_on_receive: true,
        });
        s.start();
        for i in 1..=50 {
            assert_eq!(s.tick(1.0, 1.0), HeartbeatTick::Probe { missed: i });
        }
    }
}
