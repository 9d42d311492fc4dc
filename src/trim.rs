//! Tight-bounding-box analysis of non-transparent pixels.
//!
//! The scan itself is one function shared by the background and inline
//! executors, so the two paths produce bit-identical rects. Large inputs are
//! downsampled through the scaled blit before scanning and the resulting
//! rect is mapped back, bounding scan cost at a small precision loss.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc,
};

use crate::{
    blit,
    error::{IconforgeError, IconforgeResult},
    geom::{Rect, Size},
    surface::Surface,
};

/// Inputs larger than this on either axis are scanned at reduced resolution.
pub const MAX_TRIM_SRC_SIZE: u32 = 500;

/// Minimal bounding rect of pixels with `alpha >= min_alpha`.
///
/// Returns the full-size rect when nothing qualifies ("could not trim") and
/// short-circuits to the full rect without scanning when `min_alpha == 0`.
pub fn compute_trim_rect(surface: &Surface, min_alpha: u8) -> IconforgeResult<Rect> {
    let (pixels, scan_size, scale) = prepare_scan(surface, min_alpha)?;
    let Some(pixels) = pixels else {
        return Ok(surface.size().to_rect());
    };
    let rect = scan_trim(&pixels, scan_size, min_alpha, None)
        .expect("uncancellable scan always completes");
    Ok(unscale_rect(rect, scale))
}

/// Centroid of pixels with `alpha >= min_alpha`, rounded to whole pixels.
/// Falls back to the geometric center when nothing qualifies.
pub fn center_of_mass(surface: &Surface, min_alpha: u8) -> (f64, f64) {
    let size = surface.size();
    let center = (f64::from(size.w) / 2.0, f64::from(size.h) / 2.0);
    if min_alpha == 0 {
        return center;
    }

    let data = surface.data();
    let mut sum_x = 0u64;
    let mut sum_y = 0u64;
    let mut n = 0u64;
    for y in 0..size.h {
        for x in 0..size.w {
            let alpha = data[((y as usize * size.w as usize + x as usize) << 2) + 3];
            if alpha >= min_alpha {
                sum_x += u64::from(x);
                sum_y += u64::from(y);
                n += 1;
            }
        }
    }

    if n == 0 {
        return center;
    }
    (
        (sum_x as f64 / n as f64).round(),
        (sum_y as f64 / n as f64).round(),
    )
}

/// The scan both executors run. Checks the cancel flag once per row and
/// returns `None` when cancelled mid-scan.
fn scan_trim(pixels: &[u8], size: Size, min_alpha: u8, cancel: Option<&AtomicBool>) -> Option<Rect> {
    let (mut l, mut t) = (size.w, size.h);
    let (mut r, mut b) = (0u32, 0u32);

    for y in 0..size.h {
        if let Some(flag) = cancel
            && flag.load(Ordering::Relaxed)
        {
            return None;
        }
        for x in 0..size.w {
            let alpha = pixels[((y as usize * size.w as usize + x as usize) << 2) + 3];
            if alpha >= min_alpha {
                l = l.min(x);
                t = t.min(y);
                r = r.max(x);
                b = b.max(y);
            }
        }
    }

    if l > r {
        // No qualifying pixels; signal "could not trim" with the full rect.
        return Some(size.to_rect());
    }
    Some(Rect::new(
        f64::from(l),
        f64::from(t),
        f64::from(r - l + 1),
        f64::from(b - t + 1),
    ))
}

/// Build the isolated pixel copy a scan operates on, downsampling oversized
/// inputs. Returns `None` pixels when the scan can be skipped entirely
/// (`min_alpha == 0`).
#[allow(clippy::type_complexity)]
fn prepare_scan(
    surface: &Surface,
    min_alpha: u8,
) -> IconforgeResult<(Option<Vec<u8>>, Size, f64)> {
    if min_alpha == 0 {
        return Ok((None, surface.size(), 1.0));
    }

    let size = surface.size();
    if size.w <= MAX_TRIM_SRC_SIZE && size.h <= MAX_TRIM_SRC_SIZE {
        return Ok((Some(surface.data().to_vec()), size, 1.0));
    }

    let scale = if size.w > MAX_TRIM_SRC_SIZE {
        f64::from(MAX_TRIM_SRC_SIZE) / f64::from(size.w)
    } else {
        f64::from(MAX_TRIM_SRC_SIZE) / f64::from(size.h)
    };
    let scaled = size.scaled_round(scale);
    let mut tmp = Surface::new(scaled)?;
    blit::draw_scaled(&mut tmp, surface, size.to_rect(), scaled.to_rect())?;
    Ok((Some(tmp.data().to_vec()), scaled, scale))
}

fn unscale_rect(rect: Rect, scale: f64) -> Rect {
    Rect::new(rect.x / scale, rect.y / scale, rect.w / scale, rect.h / scale)
}

/// Where a scan runs: a dedicated thread, or inline on the caller. Both run
/// the identical algorithm; inline is the portability fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanStrategy {
    Background,
    Inline,
}

impl ScanStrategy {
    /// Probe once at startup. Background scanning needs nothing exotic on
    /// any tier-1 platform, so this only falls back when thread spawning is
    /// unavailable in practice (e.g. exotic embedded targets).
    pub fn detect() -> Self {
        Self::Background
    }
}

/// Issues trim scans and supersedes stale ones: each new request cancels the
/// in-flight scan, and a superseded ticket resolves to
/// [`IconforgeError::Cancelled`] so its result is discarded, never applied.
#[derive(Debug)]
pub struct TrimScanner {
    strategy: ScanStrategy,
    latest: Arc<AtomicU64>,
    in_flight: Mutex<Option<Arc<AtomicBool>>>,
}

impl TrimScanner {
    pub fn new(strategy: ScanStrategy) -> Self {
        Self {
            strategy,
            latest: Arc::new(AtomicU64::new(0)),
            in_flight: Mutex::new(None),
        }
    }

    /// Start a scan over an isolated copy of `surface`'s pixels. Any scan
    /// already in flight is cancelled.
    pub fn request(&self, surface: &Surface, min_alpha: u8) -> IconforgeResult<TrimTicket> {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut guard = self
                .in_flight
                .lock()
                .map_err(|_| IconforgeError::validation("trim scanner lock poisoned"))?;
            if let Some(prev) = guard.replace(cancel.clone()) {
                prev.store(true, Ordering::Relaxed);
            }
        }

        let (pixels, scan_size, scale) = prepare_scan(surface, min_alpha)?;
        let Some(pixels) = pixels else {
            return Ok(TrimTicket::ready(
                surface.size().to_rect(),
                generation,
                self.latest.clone(),
            ));
        };

        match self.strategy {
            ScanStrategy::Inline => {
                let rect = scan_trim(&pixels, scan_size, min_alpha, Some(&cancel))
                    .map(|r| unscale_rect(r, scale));
                Ok(match rect {
                    Some(rect) => TrimTicket::ready(rect, generation, self.latest.clone()),
                    None => TrimTicket::cancelled(generation, self.latest.clone()),
                })
            }
            ScanStrategy::Background => {
                let (tx, rx) = mpsc::channel();
                std::thread::spawn(move || {
                    let rect = scan_trim(&pixels, scan_size, min_alpha, Some(&cancel))
                        .map(|r| unscale_rect(r, scale));
                    if rect.is_none() {
                        tracing::debug!("trim scan cancelled mid-flight, result discarded");
                    }
                    let _ = tx.send(rect);
                });
                Ok(TrimTicket {
                    generation,
                    latest: self.latest.clone(),
                    inner: TicketInner::Pending(rx),
                })
            }
        }
    }

    /// Cancel whatever scan is currently in flight without issuing a new one.
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.in_flight.lock()
            && let Some(prev) = guard.take()
        {
            prev.store(true, Ordering::Relaxed);
        }
    }
}

impl Default for TrimScanner {
    fn default() -> Self {
        Self::new(ScanStrategy::detect())
    }
}

#[derive(Debug)]
enum TicketInner {
    Ready(Rect),
    Cancelled,
    Pending(mpsc::Receiver<Option<Rect>>),
}

/// Handle to an issued scan. Superseded tickets resolve to `Cancelled`.
#[derive(Debug)]
pub struct TrimTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
    inner: TicketInner,
}

impl TrimTicket {
    fn ready(rect: Rect, generation: u64, latest: Arc<AtomicU64>) -> Self {
        Self {
            generation,
            latest,
            inner: TicketInner::Ready(rect),
        }
    }

    fn cancelled(generation: u64, latest: Arc<AtomicU64>) -> Self {
        Self {
            generation,
            latest,
            inner: TicketInner::Cancelled,
        }
    }

    /// Whether a newer request has already superseded this ticket.
    pub fn is_superseded(&self) -> bool {
        self.latest.load(Ordering::SeqCst) != self.generation
    }

    /// Block until the scan resolves. A result that arrives after the ticket
    /// was superseded is discarded and surfaces as `Cancelled`.
    pub fn wait(self) -> IconforgeResult<Rect> {
        let rect = match self.inner {
            TicketInner::Ready(rect) => rect,
            TicketInner::Cancelled => return Err(IconforgeError::Cancelled),
            TicketInner::Pending(rx) => match rx.recv() {
                Ok(Some(rect)) => rect,
                Ok(None) | Err(_) => return Err(IconforgeError::Cancelled),
            },
        };
        if self.latest.load(Ordering::SeqCst) != self.generation {
            return Err(IconforgeError::Cancelled);
        }
        Ok(rect)
    }
}
