// Copyright (C) Brian G. Milnes 2025

//! Run logs for batch fixes
//!
//! Each batch run can record its outcome to a file organized by tool and date:
//! - <base>/logs/<tool-name>/<date>/run-<timestamp>.log
//!
//! Messages are also emitted as `tracing` events so a host subscriber sees them.

pub mod logging {
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use anyhow::Result;
    use chrono::{DateTime, Local};

    pub struct RunLog {
        log_file: Option<fs::File>,
        log_path: Option<PathBuf>,
        start_time: DateTime<Local>,
    }

    impl RunLog {
        /// A log that writes no file
        pub fn new_disabled() -> Self {
            RunLog {
                log_file: None,
                log_path: None,
                start_time: Local::now(),
            }
        }

        /// Create a log under `base_dir`
        ///
        /// If the file cannot be created the run continues without a file.
        pub fn new(base_dir: &Path, tool_name: &str) -> Self {
            let start_time = Local::now();

            let (log_file, log_path) = match Self::create_log_file(base_dir, tool_name, &start_time) {
                Ok((file, path)) => (Some(file), Some(path)),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not create run log file, continuing without it");
                    (None, None)
                }
            };

            RunLog {
                log_file,
                log_path,
                start_time,
            }
        }

        fn create_log_file(base_dir: &Path, tool_name: &str, start_time: &DateTime<Local>) -> Result<(fs::File, PathBuf)> {
            let date_str = start_time.format("%Y-%m-%d").to_string();
            let time_str = start_time.format("%H-%M-%S%.3f").to_string();

            let log_dir = base_dir.join("logs").join(tool_name).join(&date_str);
            fs::create_dir_all(&log_dir)?;

            let log_path = log_dir.join(format!("run-{time_str}.log"));
            let log_file = fs::File::create(&log_path)?;

            Ok((log_file, log_path))
        }

        /// Record a message as an info event and in the log file
        pub fn log(&mut self, message: &str) {
            tracing::info!("{message}");
            self.log_silent(message);
        }

        /// Log file only
        pub fn log_silent(&mut self, message: &str) {
            if let Some(ref mut file) = self.log_file {
                let _ = writeln!(file, "{message}");
            }
        }

        pub fn log_path(&self) -> Option<&Path> {
            self.log_path.as_deref()
        }

        pub fn finalize(&mut self, summary: &str) {
            let end_time = Local::now();
            let duration = end_time.signed_duration_since(self.start_time);

            self.log("=== Run Summary ===");
            self.log(summary);
            self.log_silent(&format!("Started: {}", self.start_time.format("%Y-%m-%d %H:%M:%S")));
            self.log_silent(&format!("Ended: {}", end_time.format("%Y-%m-%d %H:%M:%S")));
            self.log(&format!("Duration: {}ms", duration.num_milliseconds()));
        }
    }

    impl Drop for RunLog {
        fn drop(&mut self) {
            if let Some(ref mut file) = self.log_file {
                let _ = file.flush();
            }
        }
    }
}
