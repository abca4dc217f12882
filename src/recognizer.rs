//! Gesture recognizer and interaction batching
//!
//! The recognizer owns the session tracker and the pending batch. Releases
//! are classified as they happen and queued; the first release after a flush
//! schedules the next one. When the host calls [`Recognizer::tick`] and the
//! flush is due, still-active contacts are classified against the current
//! time and everything is reported as one [`Interaction`], so a two or three
//! finger tap arrives as a single event.
//!
//! Everything runs on the host's thread. There is at most one scheduled
//! flush at a time; releases while it is pending join the same batch.

use crate::classifier::classify;
use crate::clock::{Clock, MonotonicClock};
use crate::config::{BatchWindow, GestureConfig};
use crate::error::{GestureError, ProtocolViolation};
use crate::release::{ReleaseSignal, Released};
use crate::serializer::serialize_interaction;
use crate::tracker::SessionTracker;
use crate::types::{ClassifiedGesture, Contact, Disposition, GestureEvent, Interaction};
use std::mem;
use tracing::{debug, trace, warn};

/// Consumer callback receiving every named event
pub type Callback<E> = Box<dyn FnMut(&GestureEvent<E>) -> Disposition>;

/// Handle on the host's input listener registration
pub trait InputSubscription {
    /// Stop delivering contact events to the recognizer
    fn unsubscribe(&mut self);
}

/// State dropped as a unit on teardown
struct Batch<E> {
    sessions: SessionTracker<E>,
    /// Releases classified since the last flush, in release order
    ended: Vec<ClassifiedGesture<E>>,
    /// Time the outstanding flush was scheduled, if any
    scheduled_at: Option<f64>,
    release: ReleaseSignal,
}

impl<E> Batch<E> {
    fn new() -> Self {
        Self {
            sessions: SessionTracker::new(),
            ended: Vec::new(),
            scheduled_at: None,
            release: ReleaseSignal::new(),
        }
    }
}

/// Turns contact events into batched gesture reports
pub struct Recognizer<E = (), C = MonotonicClock> {
    config: GestureConfig,
    clock: C,
    track_updates: bool,
    callback: Option<Callback<E>>,
    subscription: Option<Box<dyn InputSubscription>>,
    /// `None` once torn down
    batch: Option<Batch<E>>,
}

impl<E: Clone> Recognizer<E, MonotonicClock> {
    /// Create a recognizer stamping contacts with a monotonic clock
    pub fn new<F>(callback: F, config: GestureConfig) -> Result<Self, GestureError>
    where
        F: FnMut(&GestureEvent<E>) -> Disposition + 'static,
    {
        Self::with_clock(callback, config, MonotonicClock::new())
    }
}

impl<E: Clone, C: Clock> Recognizer<E, C> {
    /// Create a recognizer with an explicit time source
    pub fn with_clock<F>(callback: F, config: GestureConfig, clock: C) -> Result<Self, GestureError>
    where
        F: FnMut(&GestureEvent<E>) -> Disposition + 'static,
    {
        config.validate()?;

        Ok(Self {
            track_updates: config.track_updates,
            config,
            clock,
            callback: Some(Box::new(callback)),
            subscription: None,
            batch: Some(Batch::new()),
        })
    }

    /// A contact went down
    pub fn contact_start(&mut self, contact: Contact<E>) -> Result<(), GestureError> {
        let point = contact.at(self.clock.now_ms());
        let batch = self.batch.as_mut().ok_or(GestureError::TornDown)?;

        let id = point.id;
        batch.sessions.on_start(point).map_err(report_violation)?;
        batch.release.arm();

        trace!(contact = %id, active = batch.sessions.len(), "contact start");
        Ok(())
    }

    /// A contact moved. Ignored unless update tracking is on.
    pub fn contact_update(&mut self, contact: Contact<E>) -> Result<(), GestureError> {
        let point = contact.at(self.clock.now_ms());
        let batch = self.batch.as_mut().ok_or(GestureError::TornDown)?;

        if !self.track_updates {
            return Ok(());
        }

        batch.sessions.on_update(point).map_err(report_violation)
    }

    /// A contact lifted. Its gesture joins the pending batch and a flush is
    /// scheduled if none is outstanding.
    pub fn contact_end(&mut self, contact: Contact<E>) -> Result<(), GestureError> {
        let now = self.clock.now_ms();
        let point = contact.at(now);
        let batch = self.batch.as_mut().ok_or(GestureError::TornDown)?;

        let record = batch.sessions.on_end(point.id).map_err(report_violation)?;
        let gesture = classify(&record.start, &point, &self.config);
        trace!(
            contact = %point.id,
            gesture = %gesture.gesture_type,
            duration_ms = gesture.duration_ms,
            "contact end"
        );
        batch.ended.push(gesture);

        if batch.scheduled_at.is_none() {
            batch.scheduled_at = Some(now);
        }
        Ok(())
    }

    /// Host frame hook: fire the scheduled flush if it is due.
    ///
    /// Returns the consumer's disposition for the reported interaction, or
    /// `Continue` when nothing was reported.
    pub fn tick(&mut self) -> Disposition {
        let now = self.clock.now_ms();
        match self.next_flush_at() {
            Some(due) if self.is_due(due, now) => self.flush(now),
            _ => Disposition::Continue,
        }
    }

    /// When the outstanding flush becomes due.
    ///
    /// With a next-frame window this is the time it was scheduled; any later
    /// `tick` fires it.
    pub fn next_flush_at(&self) -> Option<f64> {
        let scheduled_at = self.batch.as_ref()?.scheduled_at?;
        Some(match self.config.batch_window {
            BatchWindow::NextFrame => scheduled_at,
            BatchWindow::DelayMs(delay) => scheduled_at + delay,
        })
    }

    fn is_due(&self, due: f64, now: f64) -> bool {
        match self.config.batch_window {
            BatchWindow::NextFrame => true,
            BatchWindow::DelayMs(_) => now >= due,
        }
    }

    fn flush(&mut self, now: f64) -> Disposition {
        let Some(batch) = self.batch.as_mut() else {
            return Disposition::Continue;
        };

        batch.scheduled_at = None;
        let ended = mem::take(&mut batch.ended);
        let active = batch.sessions.snapshot(now, &self.config);
        let all_released = batch.sessions.is_empty();
        let fired_release = all_released && batch.release.is_armed();
        if fired_release {
            batch.release.fire();
        }

        let mut disposition = Disposition::Continue;
        if !ended.is_empty() || !active.is_empty() {
            let serial = serialize_interaction(&ended, &active);
            debug!(
                serial = %serial,
                ended = ended.len(),
                active = active.len(),
                "interaction"
            );
            disposition = self.emit(GestureEvent::Interaction(Interaction {
                ended,
                active,
                serial,
            }));
        }

        if fired_release {
            debug!("all contacts released");
            self.emit(GestureEvent::Released);
        }

        disposition
    }

    fn emit(&mut self, event: GestureEvent<E>) -> Disposition {
        match self.callback.as_mut() {
            Some(callback) => callback(&event),
            None => Disposition::Continue,
        }
    }

    /// Future resolving once no contacts are down, if any contact has gone
    /// down since the last release
    pub fn released(&self) -> Option<Released> {
        self.batch.as_ref()?.release.subscribe()
    }
}

impl<E, C> Recognizer<E, C> {
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Engage or release update tracking (e.g. while the host cages input)
    pub fn set_update_tracking(&mut self, track: bool) {
        self.track_updates = track;
    }

    pub fn is_tracking_updates(&self) -> bool {
        self.track_updates
    }

    /// Keep the host's listener registration so teardown can drop it
    pub fn attach(&mut self, subscription: impl InputSubscription + 'static) {
        self.subscription = Some(Box::new(subscription));
    }

    /// Number of contacts currently down
    pub fn active_contacts(&self) -> usize {
        self.batch.as_ref().map_or(0, |b| b.sessions.len())
    }

    /// Whether a flush is scheduled
    pub fn flush_pending(&self) -> bool {
        self.batch
            .as_ref()
            .is_some_and(|b| b.scheduled_at.is_some())
    }

    pub fn is_destroyed(&self) -> bool {
        self.batch.is_none()
    }

    /// Unsubscribe from the input source and drop all contact state.
    ///
    /// A scheduled flush is discarded and waiters on [`Released`] fail with
    /// [`GestureError::TornDown`]. Calling this again is a no-op.
    pub fn destroy(&mut self) {
        let Some(batch) = self.batch.take() else {
            return;
        };

        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.callback = None;

        debug!(
            dropped_contacts = batch.sessions.len(),
            dropped_releases = batch.ended.len(),
            "recognizer destroyed"
        );
    }
}

impl<E, C> Drop for Recognizer<E, C> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn report_violation(violation: ProtocolViolation) -> GestureError {
    warn!(contact = %violation.contact_id(), "{violation}");
    violation.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::matcher::{one, two, GestureSpec};
    use crate::types::{ContactId, Direction, GestureType};
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Events = Rc<RefCell<Vec<GestureEvent>>>;

    fn recognizer_with(config: GestureConfig) -> (Recognizer<(), ManualClock>, ManualClock, Events) {
        let clock = ManualClock::new(0.0);
        let events: Events = Rc::default();
        let sink = events.clone();
        let recognizer = Recognizer::with_clock(
            move |event: &GestureEvent| {
                sink.borrow_mut().push(event.clone());
                Disposition::Continue
            },
            config,
            clock.clone(),
        )
        .unwrap();
        (recognizer, clock, events)
    }

    fn recognizer() -> (Recognizer<(), ManualClock>, ManualClock, Events) {
        recognizer_with(GestureConfig::default())
    }

    fn interactions(events: &Events) -> Vec<Interaction> {
        events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                GestureEvent::Interaction(i) => Some(i.clone()),
                GestureEvent::Released => None,
            })
            .collect()
    }

    #[test]
    fn test_monotonic_recognizer_reports_on_tick() {
        let events: Events = Rc::default();
        let sink = events.clone();
        let mut recognizer = Recognizer::new(
            move |event: &GestureEvent| {
                sink.borrow_mut().push(event.clone());
                Disposition::Continue
            },
            GestureConfig::default(),
        )
        .unwrap();

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.contact_end(Contact::new(1, 100.0, 0.0)).unwrap();
        assert!(recognizer.flush_pending());
        assert!(recognizer.next_flush_at().unwrap() >= 0.0);

        recognizer.tick();
        let reports = interactions(&events);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].serial, "1:swipe:right");
        assert!(reports[0].ended[0].duration_ms >= 0.0);
        assert_eq!(events.borrow().last(), Some(&GestureEvent::Released));
    }

    #[test]
    fn test_simultaneous_releases_are_one_report() {
        let (mut recognizer, clock, events) = recognizer();

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.contact_start(Contact::new(2, 50.0, 0.0)).unwrap();
        clock.set(40.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.contact_end(Contact::new(2, 50.0, 0.0)).unwrap();
        assert!(recognizer.flush_pending());

        recognizer.tick();
        let reports = interactions(&events);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].serial, "2:tap");
        assert!(two(&reports[0].ended, &GestureSpec::new().gesture_type(GestureType::Tap)));
        assert!(!recognizer.flush_pending());
    }

    #[test]
    fn test_tap_and_swipe_scenario() {
        let (mut recognizer, clock, events) = recognizer();

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        clock.set(5.0);
        recognizer.contact_start(Contact::new(2, 0.0, 0.0)).unwrap();
        clock.set(50.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        clock.set(60.0);
        recognizer.contact_end(Contact::new(2, 100.0, 0.0)).unwrap();
        recognizer.tick();

        let reports = interactions(&events);
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.serial, "1:tap,1:swipe:right");
        assert_eq!(report.ended[0].gesture_type, GestureType::Tap);
        assert_eq!(report.ended[0].duration_ms, 50.0);
        assert_eq!(report.ended[1].gesture_type, GestureType::Swipe);
        assert_eq!(report.ended[1].direction, Some(Direction::Right));
        assert_eq!(report.ended[1].duration_ms, 55.0);
        assert!(report.active.is_empty());
    }

    #[test]
    fn test_active_contacts_are_classified_at_flush_time() {
        let (mut recognizer, clock, events) = recognizer();

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.contact_start(Contact::new(2, 0.0, 0.0)).unwrap();
        clock.set(30.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        clock.set(400.0);
        recognizer.tick();

        let reports = interactions(&events);
        assert_eq!(reports[0].serial, "1:tap|1:hold");
        assert_eq!(reports[0].active[0].duration_ms, 400.0);
        assert_eq!(recognizer.active_contacts(), 1);

        // The held contact is reported as ended exactly once, later.
        clock.set(500.0);
        recognizer.contact_end(Contact::new(2, 0.0, 80.0)).unwrap();
        recognizer.tick();

        let reports = interactions(&events);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].serial, "1:swipe:down");
        assert!(reports[1].active.is_empty());
    }

    #[test]
    fn test_updates_move_active_contacts() {
        let (mut recognizer, clock, events) = recognizer();

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.contact_start(Contact::new(2, 0.0, 0.0)).unwrap();
        clock.set(20.0);
        recognizer.contact_update(Contact::new(2, -70.0, 0.0)).unwrap();
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.tick();

        let reports = interactions(&events);
        let left = GestureSpec::from_json(&serde_json::json!({ "dir": ["left", "right"] })).unwrap();
        assert!(one(&reports[0].active, &left));
        assert_eq!(reports[0].serial, "1:tap|1:swipe:left");
    }

    #[test]
    fn test_updates_ignored_without_tracking() {
        let (mut recognizer, clock, events) =
            recognizer_with(GestureConfig::default().with_track_updates(false));

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.contact_start(Contact::new(2, 0.0, 0.0)).unwrap();
        clock.set(20.0);
        // Untracked ids are not checked either while updates are off.
        recognizer.contact_update(Contact::new(9, 5.0, 5.0)).unwrap();
        recognizer.contact_update(Contact::new(2, -70.0, 0.0)).unwrap();
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.tick();

        assert_eq!(interactions(&events)[0].serial, "1:tap|1:tap");

        recognizer.set_update_tracking(true);
        assert!(recognizer.is_tracking_updates());
        assert!(recognizer.contact_update(Contact::new(9, 5.0, 5.0)).is_err());
    }

    #[test]
    fn test_tick_without_pending_flush_reports_nothing() {
        let (mut recognizer, _clock, events) = recognizer();
        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();

        assert_eq!(recognizer.tick(), Disposition::Continue);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_delay_window_waits_for_deadline() {
        let (mut recognizer, clock, events) =
            recognizer_with(GestureConfig::default().with_batch_window(BatchWindow::DelayMs(16.0)));

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        clock.set(10.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        assert_eq!(recognizer.next_flush_at(), Some(26.0));

        clock.set(20.0);
        recognizer.tick();
        assert!(interactions(&events).is_empty());

        // Releases before the deadline join the scheduled batch.
        recognizer.contact_start(Contact::new(2, 0.0, 0.0)).unwrap();
        clock.set(22.0);
        recognizer.contact_end(Contact::new(2, 0.0, 0.0)).unwrap();
        assert_eq!(recognizer.next_flush_at(), Some(26.0));

        clock.set(26.0);
        recognizer.tick();
        let reports = interactions(&events);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].serial, "2:tap");
    }

    #[test]
    fn test_protocol_violations_are_recoverable() {
        let (mut recognizer, clock, events) = recognizer();

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        let err = recognizer.contact_start(Contact::new(1, 30.0, 30.0)).unwrap_err();
        assert!(matches!(
            err,
            GestureError::ProtocolViolation(ProtocolViolation::DuplicateStart(ContactId(1)))
        ));

        let err = recognizer.contact_end(Contact::new(4, 0.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            GestureError::ProtocolViolation(ProtocolViolation::UntrackedEnd(ContactId(4)))
        ));
        assert!(!recognizer.flush_pending());

        // The first contact is still tracked from its original start.
        clock.set(50.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.tick();
        assert_eq!(interactions(&events)[0].serial, "1:tap");
    }

    #[test]
    fn test_release_event_after_last_contact() {
        let (mut recognizer, clock, events) = recognizer();

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        clock.set(10.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.tick();

        let names: Vec<&str> = events.borrow().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["interaction", "released"]);
    }

    #[test]
    fn test_suppress_disposition_is_returned() {
        let clock = ManualClock::new(0.0);
        let mut recognizer = Recognizer::with_clock(
            |event: &GestureEvent| match event {
                GestureEvent::Interaction(i) if i.serial == "1:tap" => Disposition::Suppress,
                _ => Disposition::Continue,
            },
            GestureConfig::default(),
            clock.clone(),
        )
        .unwrap();

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        clock.set(30.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        assert_eq!(recognizer.tick(), Disposition::Suppress);
    }

    #[test]
    fn test_raw_events_reach_the_consumer() {
        let clock = ManualClock::new(0.0);
        let seen: Rc<RefCell<Vec<(String, String)>>> = Rc::default();
        let sink = seen.clone();
        let mut recognizer = Recognizer::with_clock(
            move |event: &GestureEvent<String>| {
                if let GestureEvent::Interaction(i) = event {
                    for g in &i.ended {
                        sink.borrow_mut().push((g.start_event.clone(), g.end_event.clone()));
                    }
                }
                Disposition::Continue
            },
            GestureConfig::default(),
            clock.clone(),
        )
        .unwrap();

        recognizer
            .contact_start(Contact::new(1, 0.0, 0.0).with_raw("down".to_string()))
            .unwrap();
        clock.set(30.0);
        recognizer
            .contact_end(Contact::new(1, 0.0, 0.0).with_raw("up".to_string()))
            .unwrap();
        recognizer.tick();

        assert_eq!(*seen.borrow(), vec![("down".to_string(), "up".to_string())]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Recognizer::<(), _>::with_clock(
            |_: &GestureEvent| Disposition::Continue,
            GestureConfig::default().with_swipe_angle_margin(0.0),
            ManualClock::new(0.0),
        );
        assert!(matches!(result, Err(GestureError::InvalidConfig { .. })));
    }

    struct CountingSubscription(Rc<Cell<u32>>);

    impl InputSubscription for CountingSubscription {
        fn unsubscribe(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_destroy_is_idempotent_and_drops_pending_flush() {
        let (mut recognizer, clock, events) = recognizer();
        let unsubscribed = Rc::new(Cell::new(0));
        recognizer.attach(CountingSubscription(unsubscribed.clone()));

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.contact_start(Contact::new(2, 0.0, 0.0)).unwrap();
        clock.set(10.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();

        recognizer.destroy();
        recognizer.destroy();
        assert_eq!(unsubscribed.get(), 1);
        assert!(recognizer.is_destroyed());
        assert_eq!(recognizer.active_contacts(), 0);

        assert_eq!(recognizer.tick(), Disposition::Continue);
        assert!(events.borrow().is_empty());
        assert!(matches!(
            recognizer.contact_start(Contact::new(3, 0.0, 0.0)),
            Err(GestureError::TornDown)
        ));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let unsubscribed = Rc::new(Cell::new(0));
        {
            let (mut recognizer, _clock, _events) = recognizer();
            recognizer.attach(CountingSubscription(unsubscribed.clone()));
        }
        assert_eq!(unsubscribed.get(), 1);
    }

    #[tokio::test]
    async fn test_released_resolves_when_all_contacts_lift() {
        let (mut recognizer, clock, _events) = recognizer();
        assert!(recognizer.released().is_none());

        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.contact_start(Contact::new(2, 0.0, 0.0)).unwrap();
        let released = recognizer.released().unwrap();

        clock.set(20.0);
        recognizer.contact_end(Contact::new(1, 0.0, 0.0)).unwrap();
        recognizer.tick();
        // One contact still down, so the guard stays armed.
        assert!(recognizer.released().is_some());

        recognizer.contact_end(Contact::new(2, 0.0, 0.0)).unwrap();
        recognizer.tick();
        released.wait().await.unwrap();
        assert!(recognizer.released().is_none());

        // The next contact re-arms it.
        recognizer.contact_start(Contact::new(3, 0.0, 0.0)).unwrap();
        assert!(recognizer.released().is_some());
    }

    #[tokio::test]
    async fn test_released_fails_on_teardown() {
        let (mut recognizer, _clock, _events) = recognizer();
        recognizer.contact_start(Contact::new(1, 0.0, 0.0)).unwrap();
        let released = recognizer.released().unwrap();

        recognizer.destroy();
        assert!(matches!(released.wait().await, Err(GestureError::TornDown)));
    }
}
