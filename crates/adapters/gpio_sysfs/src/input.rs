//! Sense input polled through a sysfs `value` file.

use tokio::time::{Interval, MissedTickBehavior};

use doorhub_app::ports::{Edge, SenseInput};
use doorhub_domain::device::Pin;
use doorhub_domain::error::DoorhubError;

use crate::line::Line;

/// A digital sense line read at a fixed interval.
///
/// The first read only establishes the baseline level; every later change
/// is reported as an edge. Bounces shorter than the interval are invisible.
#[derive(Debug)]
pub struct SysfsInput {
    line: Line,
    ticker: Interval,
    last: Option<bool>,
}

impl SysfsInput {
    pub(crate) fn new(line: Line, mut ticker: Interval) -> Self {
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            line,
            ticker,
            last: None,
        }
    }

    #[must_use]
    pub fn pin(&self) -> Pin {
        self.line.pin()
    }
}

impl SenseInput for SysfsInput {
    async fn next_edge(&mut self) -> Result<Option<Edge>, DoorhubError> {
        loop {
            self.ticker.tick().await;
            let level = self.line.value().await?;
            let previous = self.last.replace(level);
            match previous {
                Some(previous) if previous != level => {
                    let edge = if level { Edge::Rising } else { Edge::Falling };
                    return Ok(Some(edge));
                }
                _ => {}
            }
        }
    }
}
