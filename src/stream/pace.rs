//! Real-time pacing of frame streams

use futures::{Stream, StreamExt, ready};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, Sleep, sleep_until};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::types::Frame;

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;

/// Clamp a playback rate to the supported range; non-finite rates play at 1x.
pub fn clamp_speed(rate: f64) -> f64 {
    if rate.is_finite() { rate.clamp(MIN_SPEED, MAX_SPEED) } else { 1.0 }
}

/// Extension trait to release frames at their presentation time
pub trait PaceExt: Stream<Item = Frame> {
    /// Hold each frame until its timestamp, scaled by the current speed,
    /// has elapsed since the stream started.
    ///
    /// `timescale` is the unit of frame timestamps. A speed change sent on
    /// `speed` takes effect at once, continuing from the current media position.
    fn paced(self, timescale: u32, speed: watch::Receiver<f64>) -> Paced<Self>
    where
        Self: Sized,
    {
        Paced::new(self, timescale, speed)
    }
}

impl<T: Stream<Item = Frame>> PaceExt for T {}

pin_project! {
    /// A stream combinator that delays frames to wall-clock time
    pub struct Paced<S> {
        #[pin]
        stream: S,
        #[pin]
        sleep: Sleep,
        timescale: u32,
        speed: WatchStream<f64>,
        speed_open: bool,
        current_speed: f64,
        // wall-clock instant and media timestamp of the schedule origin
        anchor: Option<(Instant, u64)>,
        pending: Option<Frame>,
        deadline: Option<Instant>,
    }
}

impl<S> Paced<S> {
    pub fn new(stream: S, timescale: u32, mut speed: watch::Receiver<f64>) -> Self {
        let current_speed = clamp_speed(*speed.borrow_and_update());
        Self {
            stream,
            sleep: sleep_until(Instant::now()),
            timescale: timescale.max(1),
            speed: WatchStream::from_changes(speed),
            speed_open: true,
            current_speed,
            anchor: None,
            pending: None,
            deadline: None,
        }
    }

    /// Speed currently applied to the schedule.
    pub fn speed(&self) -> f64 {
        self.current_speed
    }
}

impl<S: Stream<Item = Frame>> Stream for Paced<S> {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // polled on every wakeup so a change also cuts a running sleep short
        while *this.speed_open {
            match this.speed.poll_next_unpin(cx) {
                Poll::Ready(Some(rate)) => {
                    let speed = clamp_speed(rate);
                    if speed == *this.current_speed {
                        continue;
                    }
                    debug!(from = *this.current_speed, to = speed, "Pacing speed changed");
                    if let Some((origin, base)) = *this.anchor {
                        // media position reached so far under the old speed
                        let now = Instant::now();
                        let played = now.saturating_duration_since(origin).as_secs_f64()
                            * *this.current_speed
                            * *this.timescale as f64;
                        let mut position = base + played as u64;
                        if let Some(frame) = this.pending.as_ref() {
                            position = position.min(frame.timestamp.max(base));
                        }
                        *this.anchor = Some((now, position));
                    }
                    *this.current_speed = speed;
                    *this.deadline = None;
                }
                Poll::Ready(None) => *this.speed_open = false,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(frame) => {
                    *this.pending = Some(frame);
                    *this.deadline = None;
                }
                None => return Poll::Ready(None),
            }
        }

        let deadline = match *this.deadline {
            Some(deadline) => deadline,
            None => {
                let Some(frame) = this.pending.as_ref() else {
                    return Poll::Ready(None);
                };
                let now = Instant::now();
                // a new play request or a timestamp jump backwards restarts the schedule
                let (origin, base) = match *this.anchor {
                    Some((origin, base)) if !frame.is_first && frame.timestamp >= base => (origin, base),
                    _ => {
                        *this.anchor = Some((now, frame.timestamp));
                        (now, frame.timestamp)
                    }
                };
                let media = (frame.timestamp - base) as f64 / *this.timescale as f64;
                let deadline = origin + Duration::from_secs_f64(media / *this.current_speed);
                *this.deadline = Some(deadline);
                deadline
            }
        };

        if deadline > Instant::now() {
            this.sleep.as_mut().reset(deadline);
            ready!(this.sleep.as_mut().poll(cx));
        }

        *this.deadline = None;
        Poll::Ready(this.pending.take())
    }
}
