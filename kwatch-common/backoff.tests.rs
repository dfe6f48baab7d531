use super::*;

#[test]
fn throttle_grows_additively_and_caps() {
    let mut throttle = ThrottleBackoff::new(Duration::from_secs(5));

    assert_eq!(Duration::from_secs(5), throttle.next_delay());
    assert_eq!(Duration::from_secs(10), throttle.next_delay());
    assert_eq!(Duration::from_secs(15), throttle.next_delay());

    for _ in 0..20 {
        throttle.next_delay();
    }
    assert_eq!(Duration::from_secs(60), throttle.next_delay());
}

#[test]
fn throttle_reset_restarts_the_streak() {
    let mut throttle = ThrottleBackoff::new(Duration::from_secs(5));
    throttle.next_delay();
    throttle.next_delay();

    throttle.reset();

    assert_eq!(Duration::from_secs(5), throttle.next_delay());
}

#[test]
fn retry_schedule_doubles_from_factor() {
    let mut schedule = RetrySchedule::new(3, 1.5);

    assert_eq!(Some(Duration::from_millis(1_500)), schedule.next_delay());
    assert_eq!(Some(Duration::from_millis(3_000)), schedule.next_delay());
    assert_eq!(None, schedule.next_delay());
}

#[test]
fn retry_schedule_single_attempt_has_no_delays() {
    let mut schedule = RetrySchedule::new(1, 2.0);
    assert_eq!(None, schedule.next_delay());

    let mut schedule = RetrySchedule::new(0, 2.0);
    assert_eq!(None, schedule.next_delay());
}

#[test]
fn retry_schedule_integer_factor() {
    let mut schedule = RetrySchedule::new(4, 1.0);

    assert_eq!(Some(Duration::from_secs(1)), schedule.next_delay());
    assert_eq!(Some(Duration::from_secs(2)), schedule.next_delay());
    assert_eq!(Some(Duration::from_secs(4)), schedule.next_delay());
    assert_eq!(None, schedule.next_delay());
}
