//! Emulator supervision for `--launch`.
//!
//! Creates the two FIFOs, starts VICE and MAME, and opens the FIFOs in the
//! order MAME's Lua script opens them. Opening a FIFO blocks until the
//! other end is opened too, so the order matters: the status FIFO (MAME's
//! input) for writing first, then the event FIFO (MAME's output) for
//! reading.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use thiserror::Error;

use crate::config::LaunchConfig;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("mkfifo {}: {source}", path.display())]
    Fifo { path: PathBuf, source: io::Error },
    #[error("{} exists and is not a FIFO", .0.display())]
    NotFifo(PathBuf),
    #[error("empty command line")]
    EmptyCommand,
    #[error("{program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
}

/// Handles on the two emulator processes. They are not killed on drop.
pub struct Emulators {
    pub target: Child,
    pub host: Child,
}

/// Create a FIFO at `path`; an existing FIFO is reused.
pub fn make_fifo(path: &Path) -> Result<(), LaunchError> {
    if let Ok(meta) = std::fs::metadata(path) {
        return if is_fifo(&meta) {
            Ok(())
        } else {
            Err(LaunchError::NotFifo(path.to_path_buf()))
        };
    }

    let status = Command::new("mkfifo")
        .arg(path)
        .status()
        .map_err(|source| LaunchError::Fifo {
            path: path.to_path_buf(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(LaunchError::Fifo {
            path: path.to_path_buf(),
            source: io::Error::other(format!("mkfifo exited with {status}")),
        })
    }
}

#[cfg(unix)]
fn is_fifo(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    meta.file_type().is_fifo()
}

#[cfg(not(unix))]
fn is_fifo(_meta: &std::fs::Metadata) -> bool {
    false
}

/// Start `argv[0]` with the remaining arguments.
pub fn spawn(argv: &[String], dir: Option<&Path>) -> Result<Child, LaunchError> {
    let (program, args) = argv.split_first().ok_or(LaunchError::EmptyCommand)?;
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    log::info!("starting {}", argv.join(" "));
    command.spawn().map_err(|source| LaunchError::Spawn {
        program: program.clone(),
        source,
    })
}

/// Start VICE, create the FIFOs, then start MAME.
pub fn launch(
    config: &LaunchConfig,
    pipe_in: &Path,
    pipe_out: &Path,
) -> Result<Emulators, LaunchError> {
    let dir = config.working_dir.as_deref();
    let target = spawn(&config.target, dir)?;
    make_fifo(pipe_out)?;
    make_fifo(pipe_in)?;
    let host = spawn(&config.host, dir)?;
    Ok(Emulators { target, host })
}

/// Open the FIFO pair: `pipe_out` for writing, then `pipe_in` for reading.
pub fn open_pipes(pipe_in: &Path, pipe_out: &Path) -> Result<(BufReader<File>, File), LaunchError> {
    let open_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LaunchError::Open { path, source }
    };
    let status = OpenOptions::new()
        .write(true)
        .open(pipe_out)
        .map_err(open_err(pipe_out))?;
    let events = File::open(pipe_in).map_err(open_err(pipe_in))?;
    Ok((BufReader::new(events), status))
}
