use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, TimeZone};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekdayStyle {
    Long,
    Short,
    #[serde(rename = "none")]
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum YearStyle {
    #[serde(rename = "numeric")]
    Numeric,
    #[serde(rename = "2-digit")]
    TwoDigit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthStyle {
    Long,
    Short,
    Numeric,
}

/// en-US style date/time layout options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClockFormat {
    #[serde(default = "default_weekday")]
    pub weekday: WeekdayStyle,
    #[serde(default = "default_year")]
    pub year: YearStyle,
    #[serde(default = "default_month")]
    pub month: MonthStyle,
    #[serde(default)]
    pub hour12: bool,
    #[serde(default = "default_show_seconds")]
    pub show_seconds: bool,
}

fn default_weekday() -> WeekdayStyle {
    WeekdayStyle::Long
}

fn default_year() -> YearStyle {
    YearStyle::Numeric
}

fn default_month() -> MonthStyle {
    MonthStyle::Long
}

fn default_show_seconds() -> bool {
    true
}

impl Default for ClockFormat {
    fn default() -> Self {
        Self {
            weekday: default_weekday(),
            year: default_year(),
            month: default_month(),
            hour12: false,
            show_seconds: default_show_seconds(),
        }
    }
}

impl ClockFormat {
    /// e.g. `Thursday, March 6, 2025 at 05:47:45` with the defaults.
    pub fn format<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let year = match self.year {
            YearStyle::Numeric => at.format("%Y").to_string(),
            YearStyle::TwoDigit => at.format("%y").to_string(),
        };

        let date = match self.month {
            MonthStyle::Long => format!("{} {}, {}", at.format("%B"), at.day(), year),
            MonthStyle::Short => format!("{} {}, {}", at.format("%b"), at.day(), year),
            MonthStyle::Numeric => format!("{}/{}/{}", at.month(), at.day(), year),
        };

        let date = match self.weekday {
            WeekdayStyle::Long => format!("{}, {}", at.format("%A"), date),
            WeekdayStyle::Short => format!("{}, {}", at.format("%a"), date),
            WeekdayStyle::Hidden => date,
        };

        let time_pattern = match (self.hour12, self.show_seconds) {
            (false, true) => "%H:%M:%S",
            (false, false) => "%H:%M",
            (true, true) => "%I:%M:%S %p",
            (true, false) => "%I:%M %p",
        };
        let time = at.format(time_pattern);

        match self.month {
            MonthStyle::Numeric => format!("{}, {}", date, time),
            _ => format!("{} at {}", date, time),
        }
    }
}

/// Short locale-style stamp for an article, e.g. `3/6/2025, 5:05:09 PM`.
pub fn format_published<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockTick {
    pub at: DateTime<Local>,
    pub formatted: String,
}

impl ClockTick {
    pub fn new(at: DateTime<Local>, format: &ClockFormat) -> Self {
        Self {
            formatted: format.format(&at),
            at,
        }
    }
}

type TickCallback = Box<dyn FnMut(ClockTick) + Send>;

#[derive(Debug, Clone, Default)]
pub struct ClockSource {
    format: ClockFormat,
}

impl ClockSource {
    pub fn new(format: ClockFormat) -> Self {
        Self { format }
    }

    /// Infinite tick stream: one tick right away, then one per [`TICK_PERIOD`].
    /// Nothing is scheduled until the stream is first polled, and every call
    /// starts a new sequence.
    pub fn ticks(&self) -> impl Stream<Item = ClockTick> + Send + 'static {
        let format = self.format.clone();

        stream::unfold(None::<Interval>, move |interval| {
            let format = format.clone();
            async move {
                let mut interval = interval.unwrap_or_else(|| {
                    let mut interval = tokio::time::interval(TICK_PERIOD);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    interval
                });
                interval.tick().await;
                Some((ClockTick::new(Local::now(), &format), Some(interval)))
            }
        })
    }

    /// Calls `callback` with every tick until the returned subscription is
    /// cancelled or dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn subscribe<F>(&self, callback: F) -> ClockSubscription
    where
        F: FnMut(ClockTick) + Send + 'static,
    {
        let boxed: TickCallback = Box::new(callback);
        let callback = Arc::new(Mutex::new(Some(boxed)));

        let ticks = self.ticks();
        let task_callback = callback.clone();
        let task = tokio::spawn(async move {
            let mut ticks = Box::pin(ticks);
            while let Some(tick) = ticks.next().await {
                if !deliver(&task_callback, tick) {
                    break;
                }
            }
        });

        debug!("Clock subscription started");
        ClockSubscription {
            callback,
            task: Some(task),
        }
    }
}

/// Runs the callback under its lock. Returns false once it has been removed.
fn deliver(callback: &Mutex<Option<TickCallback>>, tick: ClockTick) -> bool {
    let mut guard = callback.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_mut() {
        Some(callback) => {
            callback(tick);
            true
        }
        None => false,
    }
}

/// Handle owning a running tick subscription. Dropping it cancels the ticks.
pub struct ClockSubscription {
    callback: Arc<Mutex<Option<TickCallback>>>,
    task: Option<JoinHandle<()>>,
}

impl ClockSubscription {
    /// Stops the ticks. Once this returns the callback will not run again.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    fn shutdown(&mut self) {
        // Blocks until a tick that is being delivered right now has finished.
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Clock subscription cancelled");
        }
    }
}

impl Drop for ClockSubscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}
