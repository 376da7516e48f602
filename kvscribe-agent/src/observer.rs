//! Progress and warnings of the write pipeline are reported through an [`Observer`]
//! instead of the global logger so callers (and tests) decide where they end up

use std::cell::RefCell;

pub use log::Level;

pub trait Observer {
    fn emit(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }
}

/// Forwards everything to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: "kvscribe::kv", level, "{message}");
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<(Level, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn emit(&self, level: Level, message: &str) {
        self.events.borrow_mut().push((level, message.to_owned()));
    }
}

#[cfg(test)]
mod test {
    use crate::observer::{Level, Observer as _, RecordingObserver};

    #[test]
    fn records_in_order() {
        let observer = RecordingObserver::new();
        observer.info("one");
        observer.warn("two");
        observer.debug("three");

        assert_eq!(
            observer.events(),
            vec![
                (Level::Info, "one".to_owned()),
                (Level::Warn, "two".to_owned()),
                (Level::Debug, "three".to_owned()),
            ]
        );
        assert_eq!(observer.warnings(), vec!["two".to_owned()]);
    }
}
