//! Timer APIs
//!
//! Cooperative, single-threaded scheduler behind `setTimeout` and
//! `setInterval`. Nothing runs on its own: timers fire only inside [`wait`],
//! which the environment drives explicitly.
//!
//! Handles are the slot count at creation and are never reused; cleared
//! timers leave an empty slot behind.

use std::fmt;
use std::rc::Rc;

use penv_dom::events::CallbackError;

use crate::Clock;

/// Callback run when a timer fires
pub type TimerCallback<C> = Rc<dyn Fn(&mut C) -> Result<(), CallbackError>>;

struct Timer<C> {
    callback: TimerCallback<C>,
    interval: u64,
    at: u64,
    repeat: bool,
    /// Callback currently on the stack; not eligible in nested waits
    running: bool,
}

/// Timer table
pub struct Scheduler<C> {
    timers: Vec<Option<Timer<C>>>,
    in_loop: bool,
    min_timer_ms: u64,
    min_interval_ms: u64,
    wait_interval_ms: u64,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self {
            timers: Vec::new(),
            in_loop: false,
            min_timer_ms: 0,
            min_interval_ms: 10,
            wait_interval_ms: 100,
        }
    }
}

impl<C> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("slots", &self.timers.len())
            .field("pending", &self.pending())
            .field("in_loop", &self.in_loop)
            .finish()
    }
}

fn normalize_delay(ms: i64) -> u64 {
    ms.max(0) as u64
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler with explicit `MIN_TIME`, interval floor and idle-sleep cap
    pub fn with_limits(min_timer_ms: u64, min_interval_ms: u64, wait_interval_ms: u64) -> Self {
        Self {
            min_timer_ms,
            min_interval_ms,
            wait_interval_ms: wait_interval_ms.max(1),
            ..Self::default()
        }
    }

    /// One-shot timer; negative delays count as zero
    pub fn set_timeout(
        &mut self,
        now: u64,
        delay_ms: i64,
        callback: impl Fn(&mut C) -> Result<(), CallbackError> + 'static,
    ) -> usize {
        let mut delay = normalize_delay(delay_ms);
        if self.in_loop {
            delay = delay.max(self.min_timer_ms);
        }
        self.insert(Timer {
            callback: Rc::new(callback),
            interval: delay,
            at: now + delay,
            repeat: false,
            running: false,
        })
    }

    /// Repeating timer with a period of at least `min_interval_ms`
    pub fn set_interval(
        &mut self,
        now: u64,
        period_ms: i64,
        callback: impl Fn(&mut C) -> Result<(), CallbackError> + 'static,
    ) -> usize {
        let period = normalize_delay(period_ms).max(self.min_interval_ms);
        self.insert(Timer {
            callback: Rc::new(callback),
            interval: period,
            at: now + period,
            repeat: true,
            running: false,
        })
    }

    fn insert(&mut self, timer: Timer<C>) -> usize {
        let handle = self.timers.len();
        tracing::debug!(
            "Timer {} scheduled for {} (repeat: {})",
            handle,
            timer.at,
            timer.repeat
        );
        self.timers.push(Some(timer));
        handle
    }

    /// `clearTimeout` / `clearInterval`; unknown handles are ignored
    pub fn clear(&mut self, handle: usize) -> bool {
        match self.timers.get_mut(handle) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Drop every timer
    pub fn clear_all(&mut self) {
        for slot in &mut self.timers {
            *slot = None;
        }
    }

    pub fn is_scheduled(&self, handle: usize) -> bool {
        self.timers.get(handle).is_some_and(Option::is_some)
    }

    /// Live timers
    pub fn pending(&self) -> usize {
        self.timers.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// True while a `wait` is on the stack
    pub fn is_running(&self) -> bool {
        self.in_loop
    }

    /// Earliest fire time among timers not currently running
    pub fn next_fire_at(&self) -> Option<u64> {
        self.next_eligible().map(|(_, at)| at)
    }

    fn next_eligible(&self) -> Option<(usize, u64)> {
        self.timers
            .iter()
            .enumerate()
            .filter_map(|(handle, slot)| slot.as_ref().map(|t| (handle, t)))
            .filter(|(_, t)| !t.running)
            .min_by_key(|(handle, t)| (t.at, *handle))
            .map(|(handle, t)| (handle, t.at))
    }
}

/// An environment that owns a scheduler and a clock
pub trait TimerContext: Sized {
    fn scheduler(&self) -> &Scheduler<Self>;

    fn scheduler_mut(&mut self) -> &mut Scheduler<Self>;

    fn clock(&self) -> &dyn Clock;
}

/// Drive the event loop; returns how many timers fired.
///
/// - `None`: run until no timer is left that could fire
/// - `Some(0)`: fire what is due now, never sleep
/// - `Some(n)` with `n > 0`: keep firing and waiting for up to `n` ms
/// - `Some(n)` with `n < 0`: run until nothing has fired for `|n|` ms
pub fn wait<C: TimerContext>(ctx: &mut C, budget: Option<i64>) -> usize {
    let start = ctx.clock().now_ms();
    let idle_window = budget.filter(|b| *b < 0).map(i64::unsigned_abs);
    let mut deadline = budget.map(|b| start.saturating_add(b.unsigned_abs()));
    let was_running = std::mem::replace(&mut ctx.scheduler_mut().in_loop, true);
    let cap = ctx.scheduler().wait_interval_ms.max(1);
    let mut fired = 0;

    loop {
        let now = ctx.clock().now_ms();
        if budget != Some(0) && deadline.is_some_and(|d| now > d) {
            break;
        }
        let next = ctx.scheduler().next_eligible();

        if let Some((handle, at)) = next {
            if at <= now {
                fire(ctx, handle);
                fired += 1;
                if let Some(window) = idle_window {
                    deadline = Some(ctx.clock().now_ms().saturating_add(window));
                }
                continue;
            }
        }

        let sleep_for = match (budget, deadline, next) {
            (Some(0), _, _) => break,
            (None, _, None) => break,
            (None, _, Some((_, at))) => at - now,
            (Some(b), _, None) if b < 0 => break,
            (Some(_), Some(deadline), next) => {
                if now >= deadline {
                    break;
                }
                let until_deadline = deadline - now;
                next.map_or(until_deadline, |(_, at)| until_deadline.min(at - now))
            }
            (Some(_), None, _) => break,
        };
        ctx.clock().sleep_ms(sleep_for.min(cap));
    }

    ctx.scheduler_mut().in_loop = was_running;
    tracing::debug!("wait({:?}) fired {} timers", budget, fired);
    fired
}

fn fire<C: TimerContext>(ctx: &mut C, handle: usize) {
    let Some(timer) = ctx
        .scheduler_mut()
        .timers
        .get_mut(handle)
        .and_then(Option::as_mut)
    else {
        return;
    };
    timer.running = true;
    let callback = Rc::clone(&timer.callback);

    if let Err(err) = callback(ctx) {
        tracing::error!("Timer {} failed: {:#}", handle, err);
    }

    let now = ctx.clock().now_ms();
    let Some(slot) = ctx.scheduler_mut().timers.get_mut(handle) else {
        return;
    };
    match slot {
        Some(timer) if timer.repeat => {
            // no burst of catch-up firings after a slow callback
            timer.at = now.max(timer.at + timer.interval);
            timer.running = false;
        }
        Some(_) => *slot = None,
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    struct Env {
        scheduler: Scheduler<Env>,
        clock: ManualClock,
        log: Vec<String>,
    }

    impl Env {
        fn new() -> Self {
            Self {
                scheduler: Scheduler::new(),
                clock: ManualClock::new(),
                log: Vec::new(),
            }
        }

        fn timeout(&mut self, ms: i64, label: &'static str) -> usize {
            let now = self.clock.now_ms();
            self.scheduler.set_timeout(now, ms, move |env: &mut Env| {
                env.log.push(format!("{}@{}", label, env.clock.now_ms()));
                Ok(())
            })
        }
    }

    impl TimerContext for Env {
        fn scheduler(&self) -> &Scheduler<Self> {
            &self.scheduler
        }

        fn scheduler_mut(&mut self) -> &mut Scheduler<Self> {
            &mut self.scheduler
        }

        fn clock(&self) -> &dyn Clock {
            &self.clock
        }
    }

    #[test]
    fn test_handles_not_reused() {
        let mut env = Env::new();
        let a = env.timeout(10, "a");
        let b = env.timeout(10, "b");
        assert_eq!((a, b), (0, 1));
        assert!(env.scheduler.clear(a));
        assert!(!env.scheduler.clear(a));
        assert!(!env.scheduler.clear(99));
        assert_eq!(env.timeout(10, "c"), 2);
        assert_eq!(env.scheduler.pending(), 2);
    }

    #[test]
    fn test_fire_order_by_time_then_handle() {
        let mut env = Env::new();
        env.timeout(20, "late");
        env.timeout(5, "first");
        env.timeout(5, "second");
        env.timeout(-3, "now");
        assert_eq!(wait(&mut env, None), 4);
        assert_eq!(env.log, vec!["now@0", "first@5", "second@5", "late@20"]);
        assert!(env.scheduler.is_empty());
    }

    #[test]
    fn test_wait_zero_does_not_block() {
        let mut env = Env::new();
        env.timeout(0, "due");
        env.timeout(50, "later");
        assert_eq!(wait(&mut env, Some(0)), 1);
        assert_eq!(env.clock.now_ms(), 0);
        assert_eq!(env.scheduler.pending(), 1);
    }

    #[test]
    fn test_positive_budget_waits_full_window() {
        let mut env = Env::new();
        env.timeout(30, "in");
        env.timeout(500, "out");
        assert_eq!(wait(&mut env, Some(250)), 1);
        assert_eq!(env.clock.now_ms(), 250);
        assert_eq!(env.log, vec!["in@30"]);
    }

    #[test]
    fn test_sleep_capped_by_wait_interval() {
        let mut env = Env::new();
        env.scheduler = Scheduler::with_limits(0, 10, 40);
        env.timeout(100, "t");
        wait(&mut env, None);
        // 40 + 40 + 20
        assert_eq!(env.clock.slept_ms(), 100);
        assert_eq!(env.log, vec!["t@100"]);
    }

    #[test]
    fn test_negative_budget_extends_on_fire() {
        let mut env = Env::new();
        env.timeout(40, "a");
        env.timeout(80, "b");
        env.timeout(200, "c");
        // idle window of 50ms: a (40) and b (80) chain, c is too far
        assert_eq!(wait(&mut env, Some(-50)), 2);
        assert_eq!(env.clock.now_ms(), 130);
        assert_eq!(env.scheduler.pending(), 1);
    }

    #[test]
    fn test_interval_minimum_and_clear() {
        let mut env = Env::new();
        let now = env.clock.now_ms();
        let handle = env.scheduler.set_interval(now, 1, |env: &mut Env| {
            env.log.push(format!("tick@{}", env.clock.now_ms()));
            Ok(())
        });
        wait(&mut env, Some(35));
        assert_eq!(env.log, vec!["tick@10", "tick@20", "tick@30"]);
        assert!(env.scheduler.clear(handle));
        assert_eq!(wait(&mut env, None), 0);
    }

    #[test]
    fn test_interval_catch_up() {
        let mut env = Env::new();
        let now = env.clock.now_ms();
        env.scheduler.set_interval(now, 10, |env: &mut Env| {
            env.log.push(format!("slow@{}", env.clock.now_ms()));
            // callback takes 35ms
            env.clock.advance(35);
            Ok(())
        });
        wait(&mut env, Some(100));
        // rescheduled from the finish time, never in a burst; the run that
        // ends past the budget is the last one
        assert_eq!(env.log, vec!["slow@10", "slow@45", "slow@80"]);
        assert_eq!(env.scheduler.next_fire_at(), Some(115));
    }

    #[test]
    fn test_callback_error_is_swallowed() {
        let mut env = Env::new();
        let now = env.clock.now_ms();
        env.scheduler
            .set_timeout(now, 0, |_env: &mut Env| Err(anyhow::anyhow!("boom")));
        env.timeout(1, "after");
        assert_eq!(wait(&mut env, None), 2);
        assert_eq!(env.log, vec!["after@1"]);
    }

    #[test]
    fn test_clear_from_inside_callback() {
        let mut env = Env::new();
        let victim = env.timeout(20, "victim");
        let now = env.clock.now_ms();
        env.scheduler.set_timeout(now, 10, move |env: &mut Env| {
            env.scheduler.clear(victim);
            Ok(())
        });
        wait(&mut env, None);
        assert!(env.log.is_empty());
    }

    #[test]
    fn test_nested_wait_skips_running_timer() {
        let mut env = Env::new();
        let now = env.clock.now_ms();
        env.scheduler.set_interval(now, 10, |env: &mut Env| {
            env.log.push("outer".into());
            let before = env.scheduler.is_running();
            // the running interval is not eligible here
            let fired = wait(env, Some(0));
            env.log.push(format!("nested fired {}", fired));
            assert!(before && env.scheduler.is_running());
            Ok(())
        });
        wait(&mut env, Some(10));
        assert_eq!(env.log, vec!["outer", "nested fired 0"]);
        assert!(!env.scheduler.is_running());
    }

    #[test]
    fn test_min_timer_applies_only_inside_loop() {
        let mut env = Env::new();
        env.scheduler = Scheduler::with_limits(4, 10, 100);
        let now = env.clock.now_ms();
        env.scheduler.set_timeout(now, 0, |env: &mut Env| {
            let now = env.clock.now_ms();
            env.scheduler.set_timeout(now, 0, |env: &mut Env| {
                env.log.push(format!("inner@{}", env.clock.now_ms()));
                Ok(())
            });
            Ok(())
        });
        wait(&mut env, None);
        assert_eq!(env.log, vec!["inner@4"]);
    }
}
