//! Async driver tying a [`ByteSource`] to a [`DemuxSession`].

use crate::config::DemuxConfig;
use crate::demux::{DemuxSession, Pump, ReadRequest};
use crate::error::Result;
use crate::metadata::ContainerMetadata;
use crate::sink::FrameSink;
use crate::source::ByteSource;
use std::time::Duration;

/// A demux session reading from `S`.
///
/// Only one read is outstanding at a time; each read seeks to the position
/// the session asked for.
pub struct MkvSource<S> {
    source: S,
    session: DemuxSession,
    buf: Vec<u8>,
}

impl<S: ByteSource> MkvSource<S> {
    /// Open `source` and run header discovery.
    ///
    /// `sink` receives `on_streams_ready` before this returns.
    pub async fn open(source: S, config: DemuxConfig, sink: &mut dyn FrameSink) -> Result<Self> {
        let session = DemuxSession::open(source.capabilities(), config)?;
        let mut this = Self {
            source,
            session,
            buf: Vec::new(),
        };
        while let Pump::Read(request) = this.session.pump(sink)? {
            this.fulfil(request).await?;
        }
        Ok(this)
    }

    pub fn session(&self) -> &DemuxSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DemuxSession {
        &mut self.session
    }

    pub fn metadata(&self) -> Option<&ContainerMetadata> {
        self.session.metadata()
    }

    /// Select tracks (empty = all) and start at `position`.
    pub fn start(&mut self, tracks: &[u64], position: Option<Duration>) -> Result<()> {
        self.session.start(tracks, position)
    }

    /// Deliver frames to `sink` until every selected track has ended or the
    /// sink stops asking for more.
    pub async fn run(&mut self, sink: &mut dyn FrameSink) -> Result<()> {
        loop {
            if !sink.wants_more() {
                tracing::debug!("Sink is satisfied");
                break;
            }

            let hungry: Vec<u64> = self
                .session
                .streams()
                .filter(|s| s.is_active() && !s.is_finished() && s.outstanding_requests() == 0)
                .map(|s| s.track_number())
                .collect();
            for track in hungry {
                self.session.request_sample(track, sink)?;
            }
            if self.session.is_finished() {
                break;
            }

            match self.session.pump(sink)? {
                Pump::Read(request) => self.fulfil(request).await?,
                Pump::Waiting => continue,
                Pump::Idle
                    if self.session.is_finished() || !self.session.has_pending_delivery() =>
                {
                    break
                }
                Pump::Idle => {}
            }
        }
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.session.shutdown()
    }

    async fn fulfil(&mut self, request: ReadRequest) -> Result<()> {
        self.source.seek(request.position).await?;
        self.buf.resize(request.len, 0);
        let n = self.source.read(&mut self.buf).await?;
        self.session.complete_read(request.generation, &self.buf[..n])?;
        Ok(())
    }
}
