use anyhow::Result;
use chrono::Local;
use colored::*;
use std::{fs::{self, File}, io::Write, path::{Path, PathBuf}};

/// Writes one numbered `journal(N).txt` file per session event and
/// optionally echoes it to the console.
pub struct DevLogger {
    dir: PathBuf,
    echo: bool,
    color: bool,
    max_logs: usize,
    counter: usize,
}

impl DevLogger {
    pub fn new(dir: impl Into<PathBuf>, echo: bool, color: bool, max_logs: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, echo, color, max_logs, counter: 0 })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    /// Entries written so far.
    pub fn count(&self) -> usize { self.counter }

    pub fn log(&mut self, title: &str, details: &str) -> Result<()> {
        if self.max_logs != 0 && self.counter >= self.max_logs { return Ok(()); }
        self.counter += 1;
        let path = self.dir.join(format!("journal({}).txt", self.counter));

        let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut f = File::create(&path)?;
        writeln!(f, "[{}] {}\n\n{}", ts, title, details)?;

        if self.echo {
            if self.color {
                println!("{} {}\n{}", "➤".blue().bold(), title.bold(), details);
            } else {
                println!("➤ {}\n{}", title, details);
            }
        }
        Ok(())
    }
}
