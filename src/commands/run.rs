//! Run command: enforce every section's quota.

use crate::audit::AuditLog;
use crate::config::RunConfig;
use crate::error::{QuotaError, Result};
use crate::logging::Logger;
use crate::quota::{Executor, RunCoordinator, RunReport};
use crate::signals::StopSignal;
use crate::timestamp;

pub struct Run<'a> {
    config: &'a RunConfig,
    dry_run: bool,
    log: Logger,
    stop: Option<StopSignal>,
}

#[derive(Default)]
pub struct RunBuilder<'a> {
    config: Option<&'a RunConfig>,
    dry_run: bool,
    log: Logger,
    stop: Option<StopSignal>,
}

impl<'a> RunBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: &'a RunConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn logger(mut self, log: Logger) -> Self {
        self.log = log;
        self
    }

    /// Use an existing stop flag instead of registering signal handlers.
    pub fn stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn build(self) -> Result<Run<'a>> {
        let config = self.config.ok_or_else(|| {
            QuotaError::ConfigError("Run requires a configuration".to_string())
        })?;

        Ok(Run {
            config,
            dry_run: self.dry_run,
            log: self.log,
            stop: self.stop,
        })
    }
}

impl<'a> Run<'a> {
    pub fn builder<'b>() -> RunBuilder<'b> {
        RunBuilder::new()
    }

    /// Execute the run command.
    pub fn run(self) -> Result<RunReport> {
        let log = self.log;

        let forced;
        let config = if self.dry_run && !self.config.simulate() {
            forced = self.config.clone().force_simulate();
            &forced
        } else {
            self.config
        };

        let guard = config.safety_guard()?;
        let stop = self
            .stop
            .unwrap_or_else(|| StopSignal::with_os_signals(log));

        let mut audit = match config.log_file() {
            Some(path) => AuditLog::open(path, log).unwrap_or_else(|err| {
                log.error(format!("{err}; audit lines go to the console only"));
                AuditLog::console(log)
            }),
            None => AuditLog::console(log),
        };

        if config.sections().is_empty() {
            log.info("No sections configured");
        }

        let executor = Executor::new(config.simulate(), &timestamp::now());
        let report = RunCoordinator::new(config, &guard, executor, &mut audit)
            .stop_signal(stop)
            .logger(log)
            .run()?;

        if !log.quiet() {
            print_summary(&report, log);
        }

        Ok(report)
    }
}

fn print_summary(report: &RunReport, log: Logger) {
    let verb = if report.simulated {
        "would be handled"
    } else {
        "handled"
    };
    log.info(format!(
        "{} section(s): {} directories {verb}, {} skipped, {} failed",
        report.sections.len(),
        report.processed(),
        report.skipped(),
        report.failed()
    ));

    if report.interrupted {
        log.info("Stopped early on request; remaining sections were not processed");
    }
    if report.simulated {
        log.info("(DRY RUN - nothing was changed)");
    }
}
