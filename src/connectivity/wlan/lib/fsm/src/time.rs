// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    parking_lot::Mutex,
    std::{
        ops::{Add, Sub},
        sync::Arc,
        time::{Duration, Instant},
    },
};

/// A monotonic instant, measured from the origin of the clock that produced it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(Duration);

impl Time {
    pub const ZERO: Time = Time(Duration::ZERO);

    pub fn from_origin(elapsed: Duration) -> Self {
        Time(elapsed)
    }

    pub fn since_origin(&self) -> Duration {
        self.0
    }

    pub fn saturating_duration_since(&self, earlier: Time) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Time {
        Time(self.0.checked_add(rhs).unwrap_or(Duration::MAX))
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Time) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

pub trait Clock: Send {
    fn now(&self) -> Time;
}

/// Wall-independent clock backed by `std::time::Instant`.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Time {
        Time(self.origin.elapsed())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    now: Arc<Mutex<Time>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }

    pub fn set(&self, time: Time) {
        *self.now.lock() = time;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Time {
        *self.now.lock()
    }
}
