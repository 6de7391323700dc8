//! The single writer every SQL block funnels through.
//!
//! Course blocks are produced concurrently but must land in the output file
//! whole and one after another. One task owns the file; everyone else sends
//! it blocks over a channel.

use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Blocks buffered ahead of the writer.
const QUEUE_DEPTH: usize = 64;

/// One course's worth of SQL.
#[derive(Debug)]
pub struct Block {
    pub course_key: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub blocks: usize,
    pub bytes: usize,
}

pub struct SqlWriter {
    tx: mpsc::Sender<Block>,
    handle: JoinHandle<io::Result<WriteStats>>,
}

impl SqlWriter {
    /// Truncates or creates `path`, writing `preamble` first when given.
    pub async fn create(
        path: &Path,
        preamble: Option<&'static str>,
        cancel: CancellationToken,
    ) -> io::Result<Self> {
        let file = File::create(path).await?;
        info!(path = %path.display(), "Writing SQL output");
        Ok(Self::spawn(BufWriter::new(file), preamble, cancel))
    }

    pub fn spawn<W>(out: W, preamble: Option<&'static str>, cancel: CancellationToken) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let handle = tokio::spawn(run(out, preamble, rx, cancel));
        Self { tx, handle }
    }

    /// Queues a block. Fails once the writer has stopped.
    pub async fn write(&self, block: Block) -> io::Result<()> {
        self.tx
            .send(block)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "SQL writer has stopped"))
    }

    /// Waits for every queued block to be written and the output flushed.
    pub async fn finish(self) -> io::Result<WriteStats> {
        drop(self.tx);
        self.handle.await.map_err(io::Error::other)?
    }
}

async fn run<W>(
    mut out: W,
    preamble: Option<&'static str>,
    mut rx: mpsc::Receiver<Block>,
    cancel: CancellationToken,
) -> io::Result<WriteStats>
where
    W: AsyncWrite + Unpin,
{
    if let Some(preamble) = preamble {
        out.write_all(preamble.as_bytes()).await?;
    }

    let mut stats = WriteStats::default();
    loop {
        let block = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(pending = rx.len(), "SQL writer cancelled");
                break;
            }
            block = rx.recv() => match block {
                Some(block) => block,
                None => break,
            },
        };

        out.write_all(&block.bytes).await?;
        stats.blocks += 1;
        stats.bytes += block.bytes.len();
        trace!(
            course_key = block.course_key.as_str(),
            bytes = block.bytes.len(),
            "Wrote SQL block"
        );
    }

    out.flush().await?;
    debug!(blocks = stats.blocks, bytes = stats.bytes, "SQL writer finished");
    Ok(stats)
}
