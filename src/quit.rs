//! Cooperative quit: a `q` line on an interactive stdin asks the extractor to stop.

use flume::{Receiver, Sender};
use std::io::{BufRead, IsTerminal};

pub struct QuitSignal {
    rx: Option<Receiver<()>>,
}

impl QuitSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        Self { rx: None }
    }

    /// Signal driven by an existing channel.
    pub fn from_channel(rx: Receiver<()>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Listen on stdin when it is a terminal; otherwise never raised.
    pub fn from_stdin() -> Self {
        if !std::io::stdin().is_terminal() {
            return Self::never();
        }
        let (tx, rx): (Sender<()>, Receiver<()>) = flume::bounded(1);
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().eq_ignore_ascii_case("q") {
                    let _ = tx.send(());
                    break;
                }
            }
        });
        tracing::info!("type 'q' and Enter to stop");
        Self::from_channel(rx)
    }

    /// Non-blocking check, polled once per iteration.
    pub fn requested(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| rx.try_recv().is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_is_never_requested() {
        assert!(!QuitSignal::never().requested());
    }

    #[test]
    fn test_channel_signal() {
        let (tx, rx) = flume::bounded(1);
        let quit = QuitSignal::from_channel(rx);
        assert!(!quit.requested());
        tx.send(()).unwrap();
        assert!(quit.requested());
    }
}
