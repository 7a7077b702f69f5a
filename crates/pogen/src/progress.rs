//! Lookup spinner and a logger that pauses it, so log lines written while it
//! spins are not torn by its redraws.

use std::borrow::Cow;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::ProgressBar;
use log::{Log, Metadata, Record};
use once_cell::sync::Lazy;

static ACTIVE_SPINNER: Lazy<Mutex<Option<ProgressBar>>> = Lazy::new(|| Mutex::new(None));

fn active_spinner() -> Option<ProgressBar> {
    ACTIVE_SPINNER.lock().ok().and_then(|s| s.clone())
}

/// A steady-ticking spinner that log output is routed around while it lives
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut active) = ACTIVE_SPINNER.lock() {
            *active = Some(bar.clone());
        }
        Self { bar }
    }

    pub fn set_message(&self, msg: impl Into<Cow<'static, str>>) {
        self.bar.set_message(msg);
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Ok(mut active) = ACTIVE_SPINNER.lock() {
            active.take();
        }
        self.bar.finish_and_clear();
    }
}

/// `env_logger` output, written with the active [`Spinner`] suspended
pub struct SpinnerLogger {
    inner: env_logger::Logger,
}

impl SpinnerLogger {
    pub fn init(builder: &mut env_logger::Builder) -> Result<(), log::SetLoggerError> {
        let inner = builder.build();
        let max_level = inner.filter();
        log::set_boxed_logger(Box::new(Self { inner }))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for SpinnerLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }
        match active_spinner() {
            Some(bar) => bar.suspend(|| self.inner.log(record)),
            None => self.inner.log(record),
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_is_active_while_alive() {
        let spinner = Spinner::start();
        assert!(active_spinner().is_some());
        spinner.set_message("Fetching U1");
        drop(spinner);
        assert!(active_spinner().is_none());
    }
}
