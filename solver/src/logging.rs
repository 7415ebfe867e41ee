//! Logging bootstrap for the solver binary.
//!
//! The solver is a short-lived command line process writing its solution to
//! a file, so a single formatted terminal drain is enough: an envlogger
//! filter in front, an asynchronous writer behind, and the `log` facade
//! bridged so the library's `log::debug!` call sites reach slog.

use slog::{o, Drain, Logger};
use slog_async::{Async, OverflowStrategy};
use slog_envlogger::LogBuilder;
use slog_scope::GlobalLoggerGuard;
use slog_term::{FullFormat, TermDecorator};
use std::{panic, thread};

/// Initialize logging with the given `slog-envlogger` filter (e.g. `info`
/// or `warn,open_solver=debug`). The returned guard must be kept alive for
/// the duration of the solve.
pub fn init(filter: impl AsRef<str>) -> GlobalLoggerGuard {
    let decorator = TermDecorator::new().stdout().build();
    let format = FullFormat::new(decorator).use_utc_timestamp().build().fuse();
    // Block instead of dropping records: a solve emits bursts of candidate
    // evaluations at debug level and losing them defeats the purpose.
    let drain = Async::new(LogBuilder::new(format).parse(filter.as_ref()).build())
        .overflow_strategy(OverflowStrategy::Block)
        .build();
    let logger = Logger::root(drain.fuse(), o!());

    let guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init().expect("failed to register logger");

    // Route panic information through the log facilities as well, so a
    // constraint violation aborting the solve ends up in the same stream
    // as the solve that led to it.
    panic::set_hook(Box::new(|info| {
        let thread = thread::current();
        log::error!(
            "thread '{}' {}",
            thread.name().unwrap_or("<unnamed>"),
            info,
        );
    }));

    guard
}
