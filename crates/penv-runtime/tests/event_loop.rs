//! Event loop tests: timers driven through a window on virtual time

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use penv_runtime::{Clock, Config, ManualClock, Window};

fn window_at(clock: &ManualClock) -> Window {
    Window::builder()
        .clock(clock.clone())
        .without_parser()
        .build()
        .unwrap()
}

// ============================================================================
// SCHEDULING
// ============================================================================

#[test]
fn test_interval_does_not_catch_up() {
    let clock = ManualClock::new();
    let mut window = window_at(&clock);
    let fired = Rc::new(RefCell::new(Vec::new()));

    let log = fired.clone();
    let slow = clock.clone();
    window.set_interval(
        move |window| {
            log.borrow_mut().push(window.now_ms());
            if log.borrow().len() == 1 {
                slow.advance(350);
            }
            Ok(())
        },
        100,
    );

    window.wait(Some(600));
    assert_eq!(*fired.borrow(), vec![100, 450, 550]);
}

#[test]
fn test_wait_zero_runs_only_due_timers() {
    let clock = ManualClock::starting_at(80);
    let mut window = window_at(&clock);
    let order = Rc::new(RefCell::new(Vec::new()));

    let log = order.clone();
    window.set_timeout(move |_| Ok(log.borrow_mut().push("due")), 10);
    clock.advance(20);
    let log = order.clone();
    window.set_timeout(move |_| Ok(log.borrow_mut().push("later")), 50);

    assert_eq!(window.wait(Some(0)), 1);
    assert_eq!(*order.borrow(), vec!["due"]);
    assert_eq!(clock.slept_ms(), 0);
    assert_eq!(window.scheduler().pending(), 1);
}

#[test]
fn test_cleared_timeout_never_fires() {
    let clock = ManualClock::new();
    let mut window = window_at(&clock);
    let called = Rc::new(Cell::new(false));

    let flag = called.clone();
    let handle = window.set_timeout(
        move |_| {
            flag.set(true);
            Ok(())
        },
        50,
    );
    window.clear_timeout(handle);

    assert_eq!(window.wait(Some(200)), 0);
    assert!(!called.get());
    assert_eq!(clock.now_ms(), 200);
}

#[test]
fn test_unbounded_wait_drains_chained_timeouts() {
    let clock = ManualClock::new();
    let mut window = window_at(&clock);
    let count = Rc::new(Cell::new(0));

    fn step(count: Rc<Cell<u32>>) -> impl Fn(&mut Window) -> anyhow::Result<()> + 'static {
        move |window: &mut Window| {
            count.set(count.get() + 1);
            if count.get() < 3 {
                window.set_timeout(step(count.clone()), 30);
            }
            Ok(())
        }
    }
    window.set_timeout(step(count.clone()), 30);

    assert_eq!(window.wait(None), 3);
    assert_eq!(count.get(), 3);
    assert_eq!(clock.now_ms(), 90);
    assert!(window.scheduler().is_empty());
}

#[test]
fn test_failing_callback_does_not_stop_loop() {
    let clock = ManualClock::new();
    let mut window = window_at(&clock);
    let ran = Rc::new(Cell::new(false));

    window.set_timeout(|_| Err(anyhow::anyhow!("script error")), 0);
    let flag = ran.clone();
    window.run_async(move |_| {
        flag.set(true);
        Ok(())
    });

    assert_eq!(window.wait(None), 2);
    assert!(ran.get());
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_config_limits_reach_scheduler() {
    let clock = ManualClock::new();
    let config = Config {
        min_interval_ms: 25,
        wait_interval_ms: 5,
        ..Config::default()
    };
    let mut window = Window::builder()
        .config(config)
        .clock(clock.clone())
        .without_parser()
        .build()
        .unwrap();

    let ticks = Rc::new(Cell::new(0));
    let counter = ticks.clone();
    let handle = window.set_interval(
        move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        },
        1,
    );
    assert_eq!(window.scheduler().next_fire_at(), Some(25));

    window.wait(Some(100));
    assert_eq!(ticks.get(), 4);
    window.clear_interval(handle);
    assert!(!window.scheduler().is_scheduled(handle));
}
