// src/core/anticheat.rs
//
// Cheat-signal pipeline: raw signals come either from the browser (input and
// visibility events posted over HTTP) or from a camera detection loop driving
// an object-detection model. The aggregator debounces everything into at most
// one actionable violation per cooldown window.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// Cooldown after an actionable violation; simultaneous raw signals from one
/// real-world event (e.g. blur + visibility change on a tab switch) collapse
/// into a single increment.
pub const VIOLATION_COOLDOWN: Duration = Duration::from_secs(5);

/// Cadence of the camera detection cycle.
pub const DETECTION_INTERVAL: Duration = Duration::from_secs(1);

/// Centroid displacement (pixels) above which a detection cycle counts as a
/// movement warning.
pub const MOVEMENT_THRESHOLD: f64 = 100.0;

/// Warnings must exceed this before sustained movement becomes a signal.
pub const MOVEMENT_WARNING_LIMIT: u32 = 2;

/// Object classes that flag an attempt when seen on camera.
pub const FORBIDDEN_CLASSES: &[&str] = &["cell phone", "laptop", "remote"];

/// A discrete raw cheat signal from one detection source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum SignalKind {
    VisibilityChange,
    WindowBlur,
    FocusLoss,
    ContextMenu,
    CopyPaste,
    DevtoolsShortcut,
    FullscreenExit,
    NoPerson,
    MultiplePersons,
    ForbiddenObject(String),
    SuspiciousMovement,
}

impl SignalKind {
    pub fn reason(&self) -> String {
        match self {
            SignalKind::VisibilityChange => "Browser tab switched or window hidden".to_string(),
            SignalKind::WindowBlur => "Exam window lost focus".to_string(),
            SignalKind::FocusLoss => "Keyboard focus left the exam".to_string(),
            SignalKind::ContextMenu => "Right-click or context menu usage".to_string(),
            SignalKind::CopyPaste => "Copy or paste attempt".to_string(),
            SignalKind::DevtoolsShortcut => "Developer tools shortcut pressed".to_string(),
            SignalKind::FullscreenExit => "Exited full screen mode".to_string(),
            SignalKind::NoPerson => "Student left camera view".to_string(),
            SignalKind::MultiplePersons => "Multiple people detected in view".to_string(),
            SignalKind::ForbiddenObject(class) => {
                format!("Electronic device ({class}) detected")
            }
            SignalKind::SuspiciousMovement => {
                "Suspicious head or eye movement detected".to_string()
            }
        }
    }
}

/// An aggregated, debounced signal that actually triggers a lock.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: SignalKind,
    pub reason: String,
}

/// Debounces raw signals into violations: after emitting one, every further
/// signal is suppressed for the cooldown window regardless of source.
///
/// Holds no attempt state beyond its own cooldown marker; reset whenever
/// detection restarts (e.g. after an unlock).
#[derive(Debug)]
pub struct CheatAggregator {
    cooldown: Duration,
    last_violation: Option<Instant>,
}

impl Default for CheatAggregator {
    fn default() -> Self {
        Self {
            cooldown: VIOLATION_COOLDOWN,
            last_violation: None,
        }
    }
}

impl CheatAggregator {
    pub fn observe(&mut self, kind: SignalKind) -> Option<Violation> {
        let now = Instant::now();
        if let Some(last) = self.last_violation {
            if now.duration_since(last) < self.cooldown {
                return None;
            }
        }
        self.last_violation = Some(now);
        Some(Violation {
            reason: kind.reason(),
            kind,
        })
    }

    pub fn reset(&mut self) {
        self.last_violation = None;
    }
}

/// A labeled bounding box from the object-detection collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub class: String,
    /// `[x, y, width, height]` in frame pixels.
    pub bbox: [f64; 4],
    pub score: f64,
}

/// Hysteresis over the tracked person's centroid: single jerky frames decay
/// away, sustained large displacement becomes one signal.
#[derive(Debug, Default)]
pub struct MovementTracker {
    last_position: Option<(f64, f64)>,
    warnings: u32,
}

impl MovementTracker {
    /// Feeds one detection cycle's centroid. Returns true when sustained
    /// movement crosses the warning limit; the counter resets afterwards.
    pub fn observe(&mut self, center: (f64, f64)) -> bool {
        let moved = match self.last_position {
            Some((lx, ly)) => {
                let dist = ((center.0 - lx).powi(2) + (center.1 - ly).powi(2)).sqrt();
                dist > MOVEMENT_THRESHOLD
            }
            None => false,
        };
        self.last_position = Some(center);

        if moved {
            self.warnings += 1;
            if self.warnings > MOVEMENT_WARNING_LIMIT {
                self.warnings = 0;
                return true;
            }
        } else if self.warnings > 0 {
            self.warnings -= 1;
        }
        false
    }

    pub fn reset(&mut self) {
        self.last_position = None;
        self.warnings = 0;
    }
}

/// Classifies one camera frame's detections, in priority order: several
/// people, then a forbidden object, then an empty chair, then sustained
/// movement of the primary person.
pub fn analyze_frame(
    objects: &[DetectedObject],
    movement: &mut MovementTracker,
) -> Option<SignalKind> {
    let persons: Vec<&DetectedObject> = objects.iter().filter(|o| o.class == "person").collect();

    if persons.len() > 1 {
        return Some(SignalKind::MultiplePersons);
    }

    if let Some(obj) = objects
        .iter()
        .find(|o| FORBIDDEN_CLASSES.contains(&o.class.as_str()))
    {
        return Some(SignalKind::ForbiddenObject(obj.class.clone()));
    }

    let Some(person) = persons.first() else {
        return Some(SignalKind::NoPerson);
    };

    let [x, y, w, h] = person.bbox;
    if movement.observe((x + w / 2.0, y + h / 2.0)) {
        return Some(SignalKind::SuspiciousMovement);
    }

    None
}

/// A captured camera frame handed to the detector.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
pub enum DetectorError {
    /// Model failed to load or is not present; proctoring degrades to
    /// non-camera signals instead of blocking the attempt.
    Unavailable,
    Inference(String),
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorError::Unavailable => write!(f, "detection model unavailable"),
            DetectorError::Inference(msg) => write!(f, "detection failed: {msg}"),
        }
    }
}

impl std::error::Error for DetectorError {}

/// Narrow seam for the object-detection model so the concrete implementation
/// is swappable and mockable.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Vec<DetectedObject>, DetectorError>;
}

/// Camera-backed detection source: drives the detector once per cycle and
/// emits raw signals on the provided channel. Used by embedded deployments
/// that own the camera in-process; browser clients post the equivalent
/// detections over HTTP instead.
pub struct CameraSource<D, F> {
    detector: D,
    frames: F,
    cadence: Duration,
}

impl<D, F> CameraSource<D, F>
where
    D: ObjectDetector + 'static,
    F: FnMut() -> Option<Frame> + Send + 'static,
{
    pub fn new(detector: D, frames: F) -> Self {
        Self {
            detector,
            frames,
            cadence: DETECTION_INTERVAL,
        }
    }

    /// Starts the detection loop. Dropping or stopping the returned handle
    /// detaches the source; no signal is emitted after `stop` returns.
    pub fn start(self, signals: mpsc::UnboundedSender<SignalKind>) -> CameraSourceHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(signals, shutdown_rx));
        CameraSourceHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(
        mut self,
        signals: mpsc::UnboundedSender<SignalKind>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut movement = MovementTracker::default();
        let mut ticks = interval_at(Instant::now() + self.cadence, self.cadence);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticks.tick() => {
                    let Some(frame) = (self.frames)() else {
                        continue;
                    };
                    match self.detector.detect(&frame).await {
                        Ok(objects) => {
                            if let Some(kind) = analyze_frame(&objects, &mut movement) {
                                if signals.send(kind).is_err() {
                                    break;
                                }
                            }
                        }
                        Err(err) => {
                            tracing::warn!("Object detection failed, skipping cycle: {}", err);
                        }
                    }
                }
            }
        }
    }
}

pub struct CameraSourceHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CameraSourceHandle {
    /// Detaches the source and waits for the loop to finish, guaranteeing no
    /// further signals are delivered once this returns.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
