//! Recording sink: append-only, length-framed payload files.
//!
//! Each recorded feed gets one file, `<directory>/<identifier>.rec`, opened in
//! append mode and never truncated. Every payload becomes one frame:
//!
//! ```text
//! Plain:        [u32 BE length][payload]
//! Timestamped:  [u32 BE length][u64 BE unix micros][payload]
//! ```
//!
//! The length always counts payload bytes only. Nothing in the payload is
//! used to find frame boundaries.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use feedwatch_types::Identifier;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::RecordingError;
use crate::state::FeedState;

/// File extension of recording files.
pub const RECORDING_EXTENSION: &str = "rec";

const LENGTH_PREFIX: usize = 4;
const TIMESTAMP_FIELD: usize = 8;

/// On-disk frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    /// Length prefix followed by the payload.
    #[default]
    Plain,
    /// Length prefix, receive time in microseconds since the Unix epoch, payload.
    Timestamped,
}

impl FrameFormat {
    fn header_len(&self) -> usize {
        match self {
            FrameFormat::Plain => LENGTH_PREFIX,
            FrameFormat::Timestamped => LENGTH_PREFIX + TIMESTAMP_FIELD,
        }
    }
}

impl std::str::FromStr for FrameFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(FrameFormat::Plain),
            "timestamped" => Ok(FrameFormat::Timestamped),
            other => Err(format!("unknown frame format: {}", other)),
        }
    }
}

/// Where and how recordings are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingConfig {
    pub directory: PathBuf,
    pub format: FrameFormat,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            format: FrameFormat::Plain,
        }
    }
}

impl RecordingConfig {
    /// The recording file for a feed.
    pub fn path_for(&self, id: &Identifier) -> PathBuf {
        recording_path(&self.directory, id)
    }
}

/// `<directory>/<identifier>.rec`, with characters that are unsafe in file
/// names replaced by `_`.
pub fn recording_path(directory: &Path, id: &Identifier) -> PathBuf {
    let name: String = id
        .as_str()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    directory.join(format!("{}.{}", name, RECORDING_EXTENSION))
}

/// Encode one frame into `out`.
pub fn encode_frame(
    format: FrameFormat,
    payload: &[u8],
    received_at: SystemTime,
    out: &mut Vec<u8>,
) -> Result<(), RecordingError> {
    let len = u32::try_from(payload.len()).map_err(|_| RecordingError::FrameTooLarge(payload.len()))?;
    out.reserve(format.header_len() + payload.len());
    out.extend_from_slice(&len.to_be_bytes());
    if format == FrameFormat::Timestamped {
        let micros = received_at
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        out.extend_from_slice(&micros.to_be_bytes());
    }
    out.extend_from_slice(payload);
    Ok(())
}

/// Sinks that can drop everything past a given length.
#[async_trait]
pub trait Truncate {
    async fn truncate(&mut self, len: u64) -> io::Result<()>;
}

#[async_trait]
impl Truncate for tokio::fs::File {
    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await
    }
}

/// Appends frames to an async writer.
///
/// Each frame is flushed as soon as it is written, so a concurrent reader of
/// the file only ever sees whole frames plus, at worst, one partial tail.
///
/// A failed write leaves the writer torn: the sink may hold part of the
/// frame. A torn writer refuses further frames until [`rollback`] has cut
/// the sink back to the end of the last whole frame.
///
/// [`rollback`]: FrameWriter::rollback
pub struct FrameWriter<W> {
    inner: W,
    format: FrameFormat,
    scratch: Vec<u8>,
    frames: u64,
    /// Sink length after the last whole frame.
    committed: u64,
    torn: bool,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Writer over an empty sink.
    pub fn new(inner: W, format: FrameFormat) -> Self {
        Self::at_offset(inner, format, 0)
    }

    /// Writer over a sink that already holds `committed` bytes of whole frames.
    pub fn at_offset(inner: W, format: FrameFormat, committed: u64) -> Self {
        Self {
            inner,
            format,
            scratch: Vec::new(),
            frames: 0,
            committed,
            torn: false,
        }
    }

    pub async fn write_frame(
        &mut self,
        payload: &[u8],
        received_at: SystemTime,
    ) -> Result<(), RecordingError> {
        if self.torn {
            return Err(RecordingError::Torn {
                committed: self.committed,
            });
        }
        self.scratch.clear();
        encode_frame(self.format, payload, received_at, &mut self.scratch)?;

        let written = match self.inner.write_all(&self.scratch).await {
            Ok(()) => self.inner.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            self.torn = true;
            return Err(e.into());
        }

        self.committed += self.scratch.len() as u64;
        self.frames += 1;
        Ok(())
    }

    /// Frames written through this writer.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Whether a failed write may have left part of a frame in the sink.
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub async fn close(mut self) -> Result<(), RecordingError> {
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        Ok(())
    }
}

impl<W: AsyncWrite + Truncate + Unpin + Send> FrameWriter<W> {
    /// Cut the sink back to the last whole frame after a failed write.
    pub async fn rollback(&mut self) -> Result<(), RecordingError> {
        if self.torn {
            self.inner.truncate(self.committed).await?;
            self.torn = false;
        }
        Ok(())
    }
}

impl FrameWriter<tokio::fs::File> {
    /// Open `path` for appending, creating it (and its directory) if needed.
    pub async fn append(path: &Path, format: FrameFormat) -> Result<Self, RecordingError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let committed = file.metadata().await?.len();
        Ok(Self::at_offset(file, format, committed))
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
    /// Receive time, present only in [`FrameFormat::Timestamped`] recordings.
    pub timestamp: Option<SystemTime>,
}

/// Iterates the frames of a recording.
///
/// A clean end of input ends iteration. A frame cut short yields
/// [`RecordingError::Truncated`] once, then iteration ends.
pub struct FrameReader<R> {
    inner: R,
    format: FrameFormat,
    complete: usize,
    done: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, format: FrameFormat) -> Self {
        Self {
            inner,
            format,
            complete: 0,
            done: false,
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, RecordingError> {
        let mut len_buf = [0u8; LENGTH_PREFIX];
        match read_exact_or_eof(&mut self.inner, &mut len_buf)? {
            Fill::Empty => return Ok(None),
            Fill::Partial => return Err(self.truncated()),
            Fill::Full => {}
        }
        let len = u32::from_be_bytes(len_buf) as usize;

        let timestamp = if self.format == FrameFormat::Timestamped {
            let mut ts_buf = [0u8; TIMESTAMP_FIELD];
            if read_exact_or_eof(&mut self.inner, &mut ts_buf)? != Fill::Full {
                return Err(self.truncated());
            }
            let micros = u64::from_be_bytes(ts_buf);
            Some(UNIX_EPOCH + Duration::from_micros(micros))
        } else {
            None
        };

        let mut payload = vec![0u8; len];
        if len > 0 && read_exact_or_eof(&mut self.inner, &mut payload)? != Fill::Full {
            return Err(self.truncated());
        }

        self.complete += 1;
        Ok(Some(Frame {
            payload: Bytes::from(payload),
            timestamp,
        }))
    }

    fn truncated(&self) -> RecordingError {
        RecordingError::Truncated {
            complete: self.complete,
        }
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<Frame, RecordingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Fill {
    Empty,
    Partial,
    Full,
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<Fill> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(match filled {
        0 => Fill::Empty,
        n if n == buf.len() => Fill::Full,
        _ => Fill::Partial,
    })
}

/// Read every frame of a recording file.
///
/// Fails on I/O errors and on a truncated trailing frame.
pub fn read_recording(path: &Path, format: FrameFormat) -> Result<Vec<Frame>, RecordingError> {
    let file = std::fs::File::open(path)?;
    FrameReader::new(io::BufReader::new(file), format).collect()
}

/// Per-listener recorder.
///
/// Follows the feed's recording flag: opens the file on the first frame after
/// recording is switched on and closes it once recording is switched off.
/// Failed opens and writes drop the frame and count it. A partly written
/// frame is cut off before anything else is appended; until that succeeds
/// every frame is dropped.
pub(crate) struct FeedRecorder {
    path: PathBuf,
    format: FrameFormat,
    writer: Option<FrameWriter<tokio::fs::File>>,
}

impl FeedRecorder {
    pub(crate) fn new(config: &RecordingConfig, id: &Identifier) -> Self {
        Self {
            path: config.path_for(id),
            format: config.format,
            writer: None,
        }
    }

    pub(crate) async fn on_message(&mut self, state: &FeedState, payload: &[u8], at: SystemTime) {
        if !state.is_recording() {
            self.close().await;
            return;
        }
        if !self.repair(state).await {
            state.dropped_frames.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if self.writer.is_none() {
            match FrameWriter::append(&self.path, self.format).await {
                Ok(writer) => {
                    info!(feed = %state.identifier(), path = %self.path.display(), "Recording started");
                    self.writer = Some(writer);
                }
                Err(e) => {
                    state.dropped_frames.fetch_add(1, Ordering::Relaxed);
                    warn!(feed = %state.identifier(), path = %self.path.display(), error = %e, "Failed to open recording file, frame dropped");
                    return;
                }
            }
        }

        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.write_frame(payload, at).await {
                state.dropped_frames.fetch_add(1, Ordering::Relaxed);
                warn!(feed = %state.identifier(), error = %e, "Recording write failed, frame dropped");
                self.repair(state).await;
            }
        }
    }

    /// Remove a partial frame left by a failed write. False while the file
    /// still ends in one.
    async fn repair(&mut self, state: &FeedState) -> bool {
        let Some(writer) = self.writer.as_mut() else {
            return true;
        };
        if !writer.is_torn() {
            return true;
        }
        match writer.rollback().await {
            Ok(()) => {
                debug!(feed = %state.identifier(), "Partial frame removed from recording");
                true
            }
            Err(e) => {
                warn!(feed = %state.identifier(), path = %self.path.display(), error = %e, "Failed to remove partial frame, recording paused");
                false
            }
        }
    }

    /// Flush and close the file if one is open.
    ///
    /// A file still ending in a partial frame stays open so the next message
    /// can retry the repair.
    pub(crate) async fn close(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.rollback().await {
                warn!(path = %self.path.display(), error = %e, "Failed to remove partial frame");
                return;
            }
        }
        if let Some(writer) = self.writer.take() {
            let frames = writer.frames();
            if let Err(e) = writer.close().await {
                warn!(path = %self.path.display(), error = %e, "Failed to close recording file");
            }
            debug!(path = %self.path.display(), frames, "Recording closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedwatch_types::{DataType, Endpoint};
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// In-memory sink that runs out of space after `capacity` bytes.
    struct FullDisk {
        data: Vec<u8>,
        capacity: usize,
        truncate_fails: bool,
    }

    impl FullDisk {
        fn new(capacity: usize) -> Self {
            Self {
                data: Vec::new(),
                capacity,
                truncate_fails: false,
            }
        }
    }

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            let room = this.capacity.saturating_sub(this.data.len());
            if room == 0 {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::Other,
                    "no space left on device",
                )));
            }
            let n = room.min(buf.len());
            this.data.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[async_trait]
    impl Truncate for FullDisk {
        async fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.truncate_fails {
                return Err(io::Error::new(io::ErrorKind::Other, "read-only"));
            }
            self.data.truncate(len as usize);
            Ok(())
        }
    }

    fn payloads(bytes: &[u8]) -> Vec<Vec<u8>> {
        decode(bytes, FrameFormat::Plain)
            .into_iter()
            .map(|f| f.unwrap().payload.to_vec())
            .collect()
    }

    fn decode(bytes: &[u8], format: FrameFormat) -> Vec<Result<Frame, RecordingError>> {
        FrameReader::new(Cursor::new(bytes.to_vec()), format).collect()
    }

    #[test]
    fn plain_frame_layout() {
        let mut out = Vec::new();
        encode_frame(FrameFormat::Plain, b"abc", SystemTime::now(), &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn timestamped_frame_layout() {
        let at = UNIX_EPOCH + Duration::from_micros(0x0102);
        let mut out = Vec::new();
        encode_frame(FrameFormat::Timestamped, b"z", at, &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 2, b'z']);

        let frames = decode(&out, FrameFormat::Timestamped);
        let frame = frames[0].as_ref().unwrap();
        assert_eq!(frame.timestamp, Some(at));
        assert_eq!(&frame.payload[..], b"z");
    }

    #[test]
    fn frames_decode_in_order_with_lengths() {
        let mut out = Vec::new();
        for m in [&b"m1"[..], b"", b"message three"] {
            encode_frame(FrameFormat::Plain, m, SystemTime::now(), &mut out).unwrap();
        }
        let frames: Vec<Frame> = decode(&out, FrameFormat::Plain)
            .into_iter()
            .map(|f| f.unwrap())
            .collect();
        let payloads: Vec<&[u8]> = frames.iter().map(|f| &f.payload[..]).collect();
        assert_eq!(payloads, vec![&b"m1"[..], b"", b"message three"]);
        assert!(frames.iter().all(|f| f.timestamp.is_none()));
    }

    #[test]
    fn truncated_tail_is_reported_once() {
        let mut out = Vec::new();
        encode_frame(FrameFormat::Plain, b"whole", SystemTime::now(), &mut out).unwrap();
        encode_frame(FrameFormat::Plain, b"partial", SystemTime::now(), &mut out).unwrap();
        out.truncate(out.len() - 3);

        let results = decode(&out, FrameFormat::Plain);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(RecordingError::Truncated { complete: 1 })
        ));
    }

    #[tokio::test]
    async fn failed_write_is_rolled_back_before_next_frame() {
        // Room for "m1" (6 bytes) and half of "message2" (12 bytes)
        let mut writer = FrameWriter::new(FullDisk::new(12), FrameFormat::Plain);
        writer.write_frame(b"m1", SystemTime::now()).await.unwrap();
        assert!(writer.write_frame(b"message2", SystemTime::now()).await.is_err());
        assert!(writer.is_torn());
        assert_eq!(writer.get_ref().data.len(), 12);

        writer.rollback().await.unwrap();
        assert!(!writer.is_torn());
        writer.inner.capacity = usize::MAX;
        writer.write_frame(b"m3", SystemTime::now()).await.unwrap();

        assert_eq!(payloads(&writer.get_ref().data), vec![b"m1".to_vec(), b"m3".to_vec()]);
        assert_eq!(writer.frames(), 2);
    }

    #[tokio::test]
    async fn torn_writer_refuses_frames_until_repaired() {
        let mut sink = FullDisk::new(8);
        sink.truncate_fails = true;
        let mut writer = FrameWriter::new(sink, FrameFormat::Plain);
        writer.write_frame(b"m1", SystemTime::now()).await.unwrap();
        assert!(writer.write_frame(b"message2", SystemTime::now()).await.is_err());

        assert!(writer.rollback().await.is_err());
        writer.inner.capacity = usize::MAX;
        assert!(matches!(
            writer.write_frame(b"m3", SystemTime::now()).await,
            Err(RecordingError::Torn { committed: 6 })
        ));

        writer.inner.truncate_fails = false;
        writer.rollback().await.unwrap();
        writer.write_frame(b"m4", SystemTime::now()).await.unwrap();
        assert_eq!(payloads(&writer.get_ref().data), vec![b"m1".to_vec(), b"m4".to_vec()]);
    }

    #[tokio::test]
    async fn append_resumes_after_existing_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.rec");
        let mut existing = Vec::new();
        encode_frame(FrameFormat::Plain, b"old", SystemTime::now(), &mut existing).unwrap();
        std::fs::write(&path, &existing).unwrap();

        let mut writer = FrameWriter::append(&path, FrameFormat::Plain).await.unwrap();
        writer.write_frame(b"new", SystemTime::now()).await.unwrap();
        // Pretend the next write failed after its length prefix reached disk
        writer.inner.write_all(&[0, 0, 0, 9]).await.unwrap();
        writer.inner.flush().await.unwrap();
        writer.torn = true;
        writer.rollback().await.unwrap();
        writer.write_frame(b"last", SystemTime::now()).await.unwrap();
        writer.close().await.unwrap();

        let frames = read_recording(&path, FrameFormat::Plain).unwrap();
        let payloads: Vec<&[u8]> = frames.iter().map(|f| &f.payload[..]).collect();
        assert_eq!(payloads, vec![&b"old"[..], b"new", b"last"]);
    }

    #[test]
    fn out_of_range_timestamps_saturate() {
        let mut out = Vec::new();
        let far = UNIX_EPOCH + Duration::from_secs(u64::MAX / 1_000);
        encode_frame(FrameFormat::Timestamped, b"", far, &mut out).unwrap();
        assert_eq!(&out[4..12], &[0xffu8; 8]);

        out.clear();
        let before_epoch = UNIX_EPOCH - Duration::from_secs(1);
        encode_frame(FrameFormat::Timestamped, b"", before_epoch, &mut out).unwrap();
        assert_eq!(&out[4..12], &[0u8; 8]);
    }

    #[test]
    fn empty_input_has_no_frames() {
        assert!(decode(&[], FrameFormat::Plain).is_empty());
    }

    #[test]
    fn recording_path_sanitises_separators() {
        let id = Identifier::from("127.0.0.1-5555-cams/front");
        let path = recording_path(Path::new("/data"), &id);
        assert_eq!(path, PathBuf::from("/data/127.0.0.1-5555-cams_front.rec"));
    }

    #[test]
    fn frame_format_parses() {
        assert_eq!("Plain".parse::<FrameFormat>().unwrap(), FrameFormat::Plain);
        assert_eq!(
            "timestamped".parse::<FrameFormat>().unwrap(),
            FrameFormat::Timestamped
        );
        assert!("json".parse::<FrameFormat>().is_err());
    }

    #[tokio::test]
    async fn writer_appends_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feed.rec");

        let mut writer = FrameWriter::append(&path, FrameFormat::Plain).await.unwrap();
        writer.write_frame(b"one", SystemTime::now()).await.unwrap();
        writer.close().await.unwrap();

        let mut writer = FrameWriter::append(&path, FrameFormat::Plain).await.unwrap();
        writer.write_frame(b"two", SystemTime::now()).await.unwrap();
        assert_eq!(writer.frames(), 1);
        writer.close().await.unwrap();

        let frames = read_recording(&path, FrameFormat::Plain).unwrap();
        let payloads: Vec<&[u8]> = frames.iter().map(|f| &f.payload[..]).collect();
        assert_eq!(payloads, vec![&b"one"[..], b"two"]);
    }

    #[tokio::test]
    async fn recorder_follows_recording_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecordingConfig {
            directory: dir.path().to_path_buf(),
            format: FrameFormat::Plain,
        };
        let state = FeedState::new(Endpoint::with_topic("h", 1, "t"), DataType::String, 10);
        let mut recorder = FeedRecorder::new(&config, state.identifier());
        let path = config.path_for(state.identifier());

        recorder.on_message(&state, b"ignored", SystemTime::now()).await;
        assert!(!path.exists());

        state.set_recording(true);
        recorder.on_message(&state, b"m1", SystemTime::now()).await;
        recorder.on_message(&state, b"m2", SystemTime::now()).await;

        state.set_recording(false);
        recorder.on_message(&state, b"not recorded", SystemTime::now()).await;

        let frames = read_recording(&path, FrameFormat::Plain).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(state.dropped_frames(), 0);
    }

    #[tokio::test]
    async fn unwritable_directory_drops_frames() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the recording directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let config = RecordingConfig {
            directory: blocker,
            format: FrameFormat::Plain,
        };
        let state = FeedState::new(Endpoint::new("h", 2), DataType::String, 10);
        state.set_recording(true);
        let mut recorder = FeedRecorder::new(&config, state.identifier());

        recorder.on_message(&state, b"a", SystemTime::now()).await;
        recorder.on_message(&state, b"b", SystemTime::now()).await;

        assert_eq!(state.dropped_frames(), 2);
    }
}
