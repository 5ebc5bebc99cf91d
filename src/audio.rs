//! Audio resources for spoken segments.
//!
//! The device side is abstracted behind [`AudioOutput`] (creates sinks) and
//! [`AudioSink`] (one playable stream). Sinks report progress through an
//! explicit [`DeviceEvent`] channel instead of callbacks, tagged with the
//! [`HandleId`] of the resource that produced them so late events from a
//! released resource can be recognised and dropped.

use crate::cancellation::CancellationToken;
use crate::error::{ReaderError, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub type HandleId = u64;

/// Decoded-enough audio: the raw WAV bytes plus the duration read from the
/// header.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    bytes: Arc<[u8]>,
    duration_secs: f64,
}

impl SynthesizedAudio {
    /// Validate WAV bytes and read their duration.
    pub fn from_wav(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ReaderError::InvalidFormat("empty audio payload".into()));
        }
        let (spec, frames) = {
            let reader = hound::WavReader::new(Cursor::new(bytes.as_slice()))
                .map_err(|err| ReaderError::InvalidFormat(err.to_string()))?;
            (reader.spec(), reader.duration())
        };
        if spec.sample_rate == 0 {
            return Err(ReaderError::InvalidFormat("sample rate is zero".into()));
        }
        let duration_secs = f64::from(frames) / f64::from(spec.sample_rate);
        if duration_secs <= 0.0 {
            return Err(ReaderError::InvalidFormat("audio has no samples".into()));
        }
        debug!(
            bytes = bytes.len(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            duration_secs,
            "Probed synthesized audio"
        );
        Ok(Self {
            bytes: Arc::from(bytes),
            duration_secs,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceSignal {
    TimeUpdate {
        position_secs: f64,
        duration_secs: f64,
    },
    Ended,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEvent {
    pub handle: HandleId,
    pub signal: DeviceSignal,
}

/// One playable stream attached to the output device.
pub trait AudioSink {
    /// Start or resume playback at `position_secs`.
    fn play_from(&mut self, position_secs: f64) -> Result<()>;
    /// Suspend playback and return the position reached.
    fn pause(&mut self) -> f64;
    /// Rate multiplier. Positions stay in media seconds.
    fn set_speed(&mut self, speed: f32);
    /// Detach from the device. Must be idempotent.
    fn stop(&mut self);
}

pub trait AudioOutput {
    fn open(
        &mut self,
        id: HandleId,
        audio: SynthesizedAudio,
        events: Sender<DeviceEvent>,
    ) -> Result<Box<dyn AudioSink>>;
}

/// Exclusive owner of one sink. Dropping the handle stops the sink, so a
/// resource can never outlive the component holding it.
pub struct AudioHandle {
    id: HandleId,
    segment_index: usize,
    duration_secs: f64,
    sink: Box<dyn AudioSink>,
}

impl AudioHandle {
    pub fn new(
        id: HandleId,
        segment_index: usize,
        duration_secs: f64,
        sink: Box<dyn AudioSink>,
    ) -> Self {
        Self {
            id,
            segment_index,
            duration_secs,
            sink,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn play_from(&mut self, position_secs: f64) -> Result<()> {
        self.sink.play_from(position_secs.clamp(0.0, self.duration_secs))
    }

    pub fn pause(&mut self) -> f64 {
        self.sink.pause().clamp(0.0, self.duration_secs)
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.sink.set_speed(speed);
    }

    /// Stop and free the resource.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.sink.stop();
        debug!(handle = self.id, segment = self.segment_index, "Released audio handle");
    }
}

impl std::fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioHandle")
            .field("id", &self.id)
            .field("segment_index", &self.segment_index)
            .field("duration_secs", &self.duration_secs)
            .finish()
    }
}

/// Output backed by the default system device. Clones share the device
/// stream, so the reader and the assistant can each own one.
#[derive(Clone)]
pub struct RodioOutput {
    _stream: Rc<OutputStream>,
    handle: OutputStreamHandle,
    tick_interval: Duration,
}

impl RodioOutput {
    pub fn try_default(tick_interval: Duration) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|err| ReaderError::PlaybackDevice(format!("opening audio output: {err}")))?;
        info!(tick_ms = tick_interval.as_millis(), "Opened audio output");
        Ok(Self {
            _stream: Rc::new(stream),
            handle,
            tick_interval,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn open(
        &mut self,
        id: HandleId,
        audio: SynthesizedAudio,
        events: Sender<DeviceEvent>,
    ) -> Result<Box<dyn AudioSink>> {
        Ok(Box::new(RodioSink {
            id,
            stream: self.handle.clone(),
            audio,
            events,
            tick_interval: self.tick_interval,
            sink: None,
            speed: 1.0,
            clock: Arc::new(Mutex::new(PlaybackClock::default())),
            ticker: None,
        }))
    }
}

/// Media position derived from wall time. Elapsed time is scaled by the
/// playback speed so ticks stay in media seconds.
#[derive(Debug)]
struct PlaybackClock {
    offset_secs: f64,
    started_at: Option<Instant>,
    speed: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            offset_secs: 0.0,
            started_at: None,
            speed: 1.0,
        }
    }
}

impl PlaybackClock {
    fn start(&mut self, position_secs: f64) {
        self.offset_secs = position_secs;
        self.started_at = Some(Instant::now());
    }

    fn pause(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.offset_secs += started.elapsed().as_secs_f64() * self.speed;
        }
    }

    fn set_speed(&mut self, speed: f64) {
        let running = self.is_running();
        self.pause();
        self.speed = speed;
        if running {
            self.started_at = Some(Instant::now());
        }
    }

    fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    fn position(&self) -> f64 {
        self.offset_secs
            + self
                .started_at
                .map(|started| started.elapsed().as_secs_f64() * self.speed)
                .unwrap_or(0.0)
    }
}

struct RodioSink {
    id: HandleId,
    stream: OutputStreamHandle,
    audio: SynthesizedAudio,
    events: Sender<DeviceEvent>,
    tick_interval: Duration,
    sink: Option<Arc<Sink>>,
    speed: f32,
    clock: Arc<Mutex<PlaybackClock>>,
    ticker: Option<CancellationToken>,
}

impl RodioSink {
    fn clock_position(&self) -> f64 {
        self.clock.lock().map(|clock| clock.position()).unwrap_or(0.0)
    }

    fn halt(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn spawn_ticker(&mut self, sink: Arc<Sink>) {
        let token = CancellationToken::new();
        self.ticker = Some(token.clone());
        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        let handle = self.id;
        let duration_secs = self.audio.duration_secs();
        let interval = self.tick_interval;

        thread::spawn(move || {
            loop {
                thread::sleep(interval);
                if token.is_cancelled() {
                    break;
                }
                let (running, position_secs) = match clock.lock() {
                    Ok(clock) => (clock.is_running(), clock.position()),
                    Err(_) => break,
                };
                if !running {
                    continue;
                }
                let ended = sink.empty();
                let signal = if ended {
                    DeviceSignal::Ended
                } else {
                    DeviceSignal::TimeUpdate {
                        position_secs: position_secs.min(duration_secs),
                        duration_secs,
                    }
                };
                if events.send(DeviceEvent { handle, signal }).is_err() || ended {
                    break;
                }
            }
        });
    }
}

impl AudioSink for RodioSink {
    fn play_from(&mut self, position_secs: f64) -> Result<()> {
        if let Some(sink) = &self.sink {
            if sink.is_paused() && (self.clock_position() - position_secs).abs() < 0.05 {
                sink.play();
                if let Ok(mut clock) = self.clock.lock() {
                    clock.start(position_secs);
                }
                debug!(handle = self.id, position_secs, "Resumed audio sink");
                return Ok(());
            }
        }

        self.halt();
        let sink = Sink::try_new(&self.stream)
            .map_err(|err| ReaderError::PlaybackDevice(format!("creating sink: {err}")))?;
        let decoder = Decoder::new(Cursor::new(self.audio.bytes().to_vec()))
            .map_err(|err| ReaderError::PlaybackDevice(format!("decoding audio: {err}")))?;
        sink.append(decoder.skip_duration(Duration::from_secs_f64(position_secs.max(0.0))));
        sink.set_speed(self.speed);
        sink.play();
        if let Ok(mut clock) = self.clock.lock() {
            clock.start(position_secs);
        } else {
            warn!(handle = self.id, "Playback clock poisoned");
        }
        let sink = Arc::new(sink);
        self.sink = Some(Arc::clone(&sink));
        self.spawn_ticker(sink);
        debug!(
            handle = self.id,
            position_secs,
            speed = self.speed,
            "Started audio sink"
        );
        Ok(())
    }

    fn pause(&mut self) -> f64 {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        match self.clock.lock() {
            Ok(mut clock) => {
                clock.pause();
                clock.position()
            }
            Err(_) => 0.0,
        }
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
        if let Some(sink) = &self.sink {
            sink.set_speed(speed);
        }
        if let Ok(mut clock) = self.clock.lock() {
            clock.set_speed(f64::from(speed));
        }
        debug!(handle = self.id, speed, "Adjusted sink speed");
    }

    fn stop(&mut self) {
        self.halt();
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory output that records sink lifecycles.

    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    pub(crate) struct DeviceLog {
        pub live: usize,
        pub max_live: usize,
        pub opened: Vec<HandleId>,
        pub plays: Vec<(HandleId, f64)>,
        pub pauses: usize,
        pub speeds: Vec<(HandleId, f32)>,
        pub fail_next_open: bool,
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeOutput {
        pub log: Rc<RefCell<DeviceLog>>,
    }

    impl AudioOutput for FakeOutput {
        fn open(
            &mut self,
            id: HandleId,
            _audio: SynthesizedAudio,
            _events: Sender<DeviceEvent>,
        ) -> Result<Box<dyn AudioSink>> {
            let mut log = self.log.borrow_mut();
            if log.fail_next_open {
                log.fail_next_open = false;
                return Err(ReaderError::PlaybackDevice("device busy".into()));
            }
            log.live += 1;
            log.max_live = log.max_live.max(log.live);
            log.opened.push(id);
            Ok(Box::new(FakeSink {
                id,
                position: 0.0,
                stopped: false,
                log: Rc::clone(&self.log),
            }))
        }
    }

    struct FakeSink {
        id: HandleId,
        position: f64,
        stopped: bool,
        log: Rc<RefCell<DeviceLog>>,
    }

    impl AudioSink for FakeSink {
        fn play_from(&mut self, position_secs: f64) -> Result<()> {
            self.position = position_secs;
            self.log.borrow_mut().plays.push((self.id, position_secs));
            Ok(())
        }

        fn pause(&mut self) -> f64 {
            self.log.borrow_mut().pauses += 1;
            self.position
        }

        fn set_speed(&mut self, speed: f32) {
            self.log.borrow_mut().speeds.push((self.id, speed));
        }

        fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.log.borrow_mut().live -= 1;
            }
        }
    }

    /// Mono 16-bit silence of the given length.
    pub(crate) fn wav_bytes(duration_secs: f64) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            let samples = (duration_secs * 8_000.0) as usize;
            for _ in 0..samples {
                writer.write_sample(0i16).expect("sample");
            }
            writer.finalize().expect("finalize");
        }
        cursor.into_inner()
    }

    pub(crate) fn audio(duration_secs: f64) -> SynthesizedAudio {
        SynthesizedAudio::from_wav(wav_bytes(duration_secs)).expect("valid wav")
    }
}
