/*
 * Copyright 2020 Damian Peckett <damian@pecke.tt>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use futures::ready;
use futures::task::{Context, Poll};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep_until, Instant, Sleep};

/// A fixed period interval stream used as the time base for the control loop.
///
/// The first tick fires immediately. If the consumer falls behind, the next
/// tick is scheduled a full period after the late one rather than firing a
/// burst of ticks to catch up.
pub(crate) struct PollInterval {
    delay: Pin<Box<Sleep>>,
    period: Duration,
}

impl PollInterval {
    /// Create a new interval stream with the specified period.
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            delay: Box::pin(sleep_until(Instant::now())),
            period,
        }
    }

    fn poll_tick(&mut self, cx: &mut Context<'_>) -> Poll<Instant> {
        ready!(self.delay.as_mut().poll(cx));

        let deadline = self.delay.deadline();
        let now = Instant::now();
        let next = if now >= deadline + self.period {
            // Missed at least one whole period, restart the schedule from here.
            now + self.period
        } else {
            deadline + self.period
        };
        self.delay.as_mut().reset(next);

        Poll::Ready(deadline)
    }
}

impl Stream for PollInterval {
    type Item = Instant;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Instant>> {
        Poll::Ready(Some(ready!(self.poll_tick(cx))))
    }
}
