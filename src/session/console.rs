//! Interactive console on stdin
//!
//! Typed lines go through the same channel as datagrams, so the console never
//! touches the controller directly.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{IncomingLine, LineOrigin};

/// Reads stdin until EOF or shutdown
pub fn spawn(lines: mpsc::Sender<IncomingLine>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Console ready, type \"help\" for help");
        forward_lines(BufReader::new(tokio::io::stdin()), lines, shutdown).await;
        info!("Console stopped");
    })
}

async fn forward_lines<R: AsyncBufRead + Unpin>(
    reader: R,
    lines: mpsc::Sender<IncomingLine>,
    shutdown: CancellationToken,
) {
    let mut input = reader.lines();
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = input.next_line() => next,
        };

        match next {
            Ok(Some(text)) => {
                if lines
                    .send(IncomingLine::new(LineOrigin::Console, text))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read console input: {}", e);
                break;
            }
        }
    }
}
