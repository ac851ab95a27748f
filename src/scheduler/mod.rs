// pantrykeeper/src/scheduler/mod.rs
use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime, Weekday};
use log::info;
use std::fmt;
use std::future::Future;
use tokio::time::{interval, MissedTickBehavior};

/// A fixed weekday and local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub day: Weekday,
    pub time: NaiveTime,
}

impl WeeklySchedule {
    pub fn new(day: Weekday, time: NaiveTime) -> Self {
        WeeklySchedule { day, time }
    }

    /// First scheduled moment strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let days_ahead = (7 + self.day.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7;
        let candidate = (now.date() + Duration::days(i64::from(days_ahead))).and_time(self.time);
        if candidate > now {
            candidate
        } else {
            candidate + Duration::weeks(1)
        }
    }
}

impl fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = match self.day {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        };
        write!(f, "{}s at {}", day, self.time.format("%H:%M"))
    }
}

/// Decides on each tick whether the job is due. Fires at most once per tick and
/// never replays windows that passed while nobody was polling.
#[derive(Debug, Clone)]
pub struct WeeklyTrigger {
    schedule: WeeklySchedule,
    next_run: NaiveDateTime,
}

impl WeeklyTrigger {
    pub fn new(schedule: WeeklySchedule, now: NaiveDateTime) -> Self {
        WeeklyTrigger {
            schedule,
            next_run: schedule.next_after(now),
        }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next_run {
            return false;
        }
        self.next_run = self.schedule.next_after(now);
        true
    }
}

/// Polls every `check_interval` and runs `job` inline when the weekly slot arrives.
/// Returns once `shutdown` resolves; a running job is finished first.
pub async fn run_scheduler<J, F, S>(
    schedule: WeeklySchedule,
    check_interval: std::time::Duration,
    mut job: J,
    shutdown: S,
) where
    J: FnMut() -> F,
    F: Future<Output = ()>,
    S: Future<Output = ()>,
{
    let mut trigger = WeeklyTrigger::new(schedule, Local::now().naive_local());
    info!("Scheduled weekly backup for {}", schedule);
    info!("Next backup scheduled for: {}", trigger.next_run().format("%Y-%m-%d %H:%M:%S"));

    let mut ticker = interval(check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal, stopping scheduler...");
                break;
            }
            _ = ticker.tick() => {
                if trigger.poll(Local::now().naive_local()) {
                    info!("Running scheduled backup...");
                    job().await;
                    info!("Next backup scheduled for: {}", trigger.next_run().format("%Y-%m-%d %H:%M:%S"));
                }
            }
        }
    }

    info!("Scheduler stopped");
}
