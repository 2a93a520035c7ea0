#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rxcore::subscribe::Subscriber;

pub type Recorded<T> = Arc<Mutex<Vec<T>>>;

/// What a group of subscribers has seen so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub nexts: usize,
    pub last: Option<i32>,
    pub completes: usize,
    pub errors: usize,
}

pub fn tally(nexts: usize, last: Option<i32>, completes: usize, errors: usize) -> Tally {
    Tally {
        nexts,
        last,
        completes,
        errors,
    }
}

/// Hands out subscribers that all record into the same buffers.
#[derive(Clone, Default)]
pub struct Emissions {
    nexts: Recorded<i32>,
    completes: Arc<Mutex<usize>>,
    errors: Recorded<String>,
}

impl Emissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber(&self) -> Subscriber<i32> {
        let Emissions {
            nexts,
            completes,
            errors,
        } = self.clone();
        Subscriber::new(
            move |n| nexts.lock().unwrap().push(n),
            move |e| errors.lock().unwrap().push(e.to_string()),
            move || *completes.lock().unwrap() += 1,
        )
    }

    pub fn tally(&self) -> Tally {
        let nexts = self.nexts.lock().unwrap();
        Tally {
            nexts: nexts.len(),
            last: nexts.last().copied(),
            completes: *self.completes.lock().unwrap(),
            errors: self.errors.lock().unwrap().len(),
        }
    }

    pub fn values(&self) -> Vec<i32> {
        self.nexts.lock().unwrap().clone()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

/// A subscriber that records every notification as a line of text, in order.
pub fn event_log_subscriber(log: &Recorded<String>) -> Subscriber<i32> {
    let (ln, le, lc) = (Arc::clone(log), Arc::clone(log), Arc::clone(log));
    Subscriber::new(
        move |v| ln.lock().unwrap().push(format!("next {v}")),
        move |e| le.lock().unwrap().push(format!("error {e}")),
        move || lc.lock().unwrap().push("complete".to_string()),
    )
}
