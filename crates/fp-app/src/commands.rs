//! Parameter-input messages delivered to the simulation context.

use std::str::FromStr;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

use crate::error::AppError;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Stage a new release angle; nothing changes until `Apply`.
    SetReleaseAngle { degrees: f64 },
    /// Frames per second, effective immediately.
    SetPlaybackRate { hz: f64 },
    SetTrail(bool),
    /// Recompute with the staged release angle and restart playback.
    Apply,
}

impl FromStr for Command {
    type Err = AppError;

    /// Parse the line syntax used by the interactive CLI:
    /// `angle <deg>`, `rate <hz>`, `trail on|off`, `apply`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(AppError::InvalidInput(format!("trailing input in '{line}'")));
        }

        let number = |what: &str| -> Result<f64, AppError> {
            let raw = arg.ok_or_else(|| AppError::InvalidInput(format!("{what} needs a value")))?;
            raw.parse::<f64>()
                .map_err(|_| AppError::InvalidInput(format!("'{raw}' is not a number")))
        };

        match keyword.as_str() {
            "angle" => Ok(Command::SetReleaseAngle {
                degrees: number("angle")?,
            }),
            "rate" => Ok(Command::SetPlaybackRate { hz: number("rate")? }),
            "trail" => match arg {
                Some("on") => Ok(Command::SetTrail(true)),
                Some("off") => Ok(Command::SetTrail(false)),
                _ => Err(AppError::InvalidInput("trail takes 'on' or 'off'".to_string())),
            },
            "apply" => match arg {
                None => Ok(Command::Apply),
                Some(extra) => Err(AppError::InvalidInput(format!(
                    "apply takes no argument, got '{extra}'"
                ))),
            },
            "" => Err(AppError::InvalidInput("empty command".to_string())),
            other => Err(AppError::InvalidInput(format!("unknown command '{other}'"))),
        }
    }
}

/// Channel the input surface writes to and the context drains.
#[derive(Debug)]
pub struct CommandQueue {
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    /// A handle that can be moved to another thread.
    pub fn sender(&self) -> Sender<Command> {
        self.tx.clone()
    }

    pub fn send(&self, command: Command) {
        // The queue owns a receiver, so this cannot fail.
        let _ = self.tx.send(command);
    }

    /// Everything queued so far, in arrival order.
    pub fn drain(&self) -> Vec<Command> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(command) => out.push(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_lines() {
        assert_eq!(
            "angle 12.5".parse::<Command>().unwrap(),
            Command::SetReleaseAngle { degrees: 12.5 }
        );
        assert_eq!(
            "RATE 0".parse::<Command>().unwrap(),
            Command::SetPlaybackRate { hz: 0.0 }
        );
        assert_eq!("trail off".parse::<Command>().unwrap(), Command::SetTrail(false));
        assert_eq!("  apply ".parse::<Command>().unwrap(), Command::Apply);
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["", "angle", "angle ten", "trail maybe", "apply now", "jump 3", "rate 1 2"] {
            assert!(line.parse::<Command>().is_err(), "{line:?} parsed");
        }
    }

    #[test]
    fn queue_preserves_order_across_threads() {
        let queue = CommandQueue::new();
        let tx = queue.sender();
        std::thread::spawn(move || {
            tx.send(Command::SetReleaseAngle { degrees: 20.0 }).unwrap();
            tx.send(Command::Apply).unwrap();
        })
        .join()
        .unwrap();
        queue.send(Command::SetTrail(false));

        assert_eq!(
            queue.drain(),
            vec![
                Command::SetReleaseAngle { degrees: 20.0 },
                Command::Apply,
                Command::SetTrail(false),
            ]
        );
        assert!(queue.drain().is_empty());
    }
}
