//! Fault classification and the process-wide reporting hooks.
//!
//! The cache reports faults through a side channel instead of
//! returning errors: the offending call delivers a [`Fault`] to the
//! installed hooks and then returns a safe fallback value, so callers
//! that ignore reporting still behave deterministically.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Severity classes for reported faults.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Fatal => "Fatal",
        }
    }

    /// Log level the default hook uses for this severity.
    pub fn level(&self) -> log::Level {
        match self {
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Fatal => log::Level::Error,
        }
    }
}

/// Faults the cache delivers through the reporting hooks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fault {
    /// A key lookup failed or the stored handle was invalid.
    InvalidReference,
    /// An empty or uninitialized handle was dereferenced.
    InvalidAccess,
    /// Creation was requested for an already present key.
    DoubleReference,
}

impl Fault {
    pub fn severity(&self) -> Severity {
        match self {
            Fault::DoubleReference => Severity::Warning,
            Fault::InvalidReference | Fault::InvalidAccess => Severity::Fatal,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match self {
            Fault::InvalidReference => "an invalid reference was requested",
            Fault::InvalidAccess => "an invalid access of a handle occurred",
            Fault::DoubleReference => "a reference was requested to be created twice",
        };
        f.write_str(message)
    }
}

/// Plain function hook receiving fault notifications.
pub type ReportFn = fn(&'static Location<'static>, Fault);

/// Polymorphic handler object receiving fault notifications.
pub trait Reporter: Send + Sync {
    fn report(&self, location: &'static Location<'static>, fault: Fault);
}

struct Hooks {
    report_fn: ReportFn,
    reporter: Option<Arc<dyn Reporter>>,
}

static HOOKS: Lazy<RwLock<Hooks>> = Lazy::new(|| {
    RwLock::new(Hooks {
        report_fn: default_report,
        reporter: None,
    })
});

/// Default function hook: logs the classified message and terminates
/// the process on fatal faults.
pub fn default_report(location: &'static Location<'static>, fault: Fault) {
    let severity = fault.severity();
    log::log!(severity.level(), "{}: {} at {}", severity.as_str(), fault, location);
    if severity == Severity::Fatal {
        std::process::exit(1);
    }
}

/// Replaces the process-wide function hook. Settable at process start
/// and replaceable at any time.
pub fn set_report_fn(report_fn: ReportFn) {
    HOOKS.write().report_fn = report_fn;
}

/// Installs a process-wide handler object. The function hook and the
/// handler both receive every fault.
pub fn set_reporter(reporter: Arc<dyn Reporter>) {
    HOOKS.write().reporter = Some(reporter);
}

/// Delivers a fault to the installed hooks. The reported location is
/// the client call site of the public operation that faulted.
#[track_caller]
pub(crate) fn report(fault: Fault) {
    let location = Location::caller();
    let (report_fn, reporter) = {
        let hooks = HOOKS.read();
        (hooks.report_fn, hooks.reporter.clone())
    };

    report_fn(location, fault);
    if let Some(reporter) = reporter {
        reporter.report(location, fault);
    }
}

#[cfg(test)]
mod tests {
    use crate::report::{Fault, Severity};

    #[test]
    fn severity_mapping_matches_classification() {
        assert_eq!(Fault::InvalidReference.severity(), Severity::Fatal);
        assert_eq!(Fault::InvalidAccess.severity(), Severity::Fatal);
        assert_eq!(Fault::DoubleReference.severity(), Severity::Warning);
    }

    #[test]
    fn severities_format_and_map_to_levels() {
        assert_eq!(Severity::Fatal.as_str(), "Fatal");
        assert_eq!(Severity::Warning.level(), log::Level::Warn);
        assert_eq!(Severity::Info.level(), log::Level::Info);
    }

    #[test]
    fn faults_have_messages() {
        assert_eq!(
            Fault::DoubleReference.to_string(),
            "a reference was requested to be created twice"
        );
        assert_eq!(
            Fault::InvalidAccess.to_string(),
            "an invalid access of a handle occurred"
        );
    }
}
