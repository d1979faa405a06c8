//! Shared test utilities
//!
//! A scripted in-memory [`RenderSurface`] standing in for the browser, plus
//! helpers to build page images and inspect assembled PDFs.

#![allow(dead_code)]

use folio_capture::browser::CaptureFormat;
use folio_capture::error::{CaptureError, Error, Result};
use folio_capture::RenderSurface;
use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

/// Something the pipeline did to the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Scroll-into-view of a page element
    Scroll(u32),
    /// Snapshot of a page element
    Snapshot(u32),
    /// Overlay hidden
    HideOverlay,
    /// Horizontal scroll nudge
    Nudge,
    /// Page count read
    ReadText,
}

/// Step of an attempt that a scripted failure hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The page element cannot be found
    Scroll,
    /// The screenshot call errors
    Snapshot,
    /// The screenshot comes back with no bytes
    EmptySnapshot,
    /// Hiding the overlay errors, after the artifact is written
    HideOverlay,
}

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    FailTimes(Fault, u32),
    AlwaysFail,
    Terminal,
}

/// Surface with per-page scripted failures
pub struct ScriptedSurface {
    indicator: Option<String>,
    behaviour: HashMap<u32, Behaviour>,
    failing_nudges: bool,
    calls: Mutex<HashMap<u32, u32>>,
    current: Mutex<Option<u32>>,
    events: Mutex<Vec<Event>>,
}

impl ScriptedSurface {
    /// A surface reporting `pages` pages, all capturable
    pub fn with_pages(pages: u32) -> Self {
        Self {
            indicator: Some(format!("из {pages}")),
            behaviour: HashMap::new(),
            failing_nudges: false,
            calls: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        }
    }

    /// A surface without a page count indicator
    pub fn without_indicator() -> Self {
        Self {
            indicator: None,
            ..Self::with_pages(1)
        }
    }

    /// Fail the first `times` attempts at `page` when scrolling to it
    pub fn failing(self, page: u32, times: u32) -> Self {
        self.failing_at(page, Fault::Scroll, times)
    }

    /// Fail the first `times` attempts at `page` at the given step
    pub fn failing_at(mut self, page: u32, fault: Fault, times: u32) -> Self {
        self.behaviour.insert(page, Behaviour::FailTimes(fault, times));
        self
    }

    /// Make every horizontal scroll nudge error
    pub fn failing_nudges(mut self) -> Self {
        self.failing_nudges = true;
        self
    }

    /// Fail every attempt at `page`
    pub fn always_failing(mut self, page: u32) -> Self {
        self.behaviour.insert(page, Behaviour::AlwaysFail);
        self
    }

    /// Fail `page` with a non-retryable error
    pub fn terminal(mut self, page: u32) -> Self {
        self.behaviour.insert(page, Behaviour::Terminal);
        self
    }

    /// Everything the pipeline did, in order
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Attempts made at `page`
    pub fn attempts(&self, page: u32) -> u32 {
        self.calls.lock().unwrap().get(&page).copied().unwrap_or(0)
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    /// Whether the current attempt at `page` should fail at `step`
    fn faults(&self, page: u32, step: Fault) -> bool {
        match self.behaviour.get(&page) {
            Some(Behaviour::FailTimes(fault, times)) => {
                *fault == step && self.attempts(page) <= *times
            }
            _ => false,
        }
    }
}

/// Page number from a `#page_N` selector
pub fn page_of(selector: &str) -> u32 {
    selector
        .trim_start_matches("#page_")
        .parse()
        .unwrap_or_else(|_| panic!("unexpected selector {selector}"))
}

impl RenderSurface for ScriptedSurface {
    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        let page = page_of(selector);
        self.record(Event::Scroll(page));

        *self.calls.lock().unwrap().entry(page).or_insert(0) += 1;
        *self.current.lock().unwrap() = Some(page);

        if self.faults(page, Fault::Scroll) {
            return Err(CaptureError::ElementNotFound(selector.to_string()).into());
        }
        match self.behaviour.get(&page) {
            Some(Behaviour::AlwaysFail) => {
                Err(CaptureError::ElementNotFound(selector.to_string()).into())
            }
            Some(Behaviour::Terminal) => Err(Error::generic("viewer crashed")),
            _ => Ok(()),
        }
    }

    async fn snapshot_element(&self, selector: &str, format: CaptureFormat) -> Result<Vec<u8>> {
        let page = page_of(selector);
        self.record(Event::Snapshot(page));

        if self.faults(page, Fault::Snapshot) {
            return Err(CaptureError::ScreenshotFailed(format!("{selector}: target closed")).into());
        }
        if self.faults(page, Fault::EmptySnapshot) {
            return Ok(Vec::new());
        }
        Ok(page_image(page, format))
    }

    async fn run_script(&self, script: &str) -> Result<()> {
        if script.contains("window.scrollBy(") {
            self.record(Event::Nudge);
            if self.failing_nudges {
                return Err(CaptureError::ScriptFailed("scrollBy rejected".to_string()).into());
            }
        } else if script.contains("style.display = 'none'") {
            self.record(Event::HideOverlay);
            let page = *self.current.lock().unwrap();
            if page.is_some_and(|p| self.faults(p, Fault::HideOverlay)) {
                return Err(CaptureError::ScriptFailed("overlay is detached".to_string()).into());
            }
        }
        Ok(())
    }

    async fn read_text(&self, _selector: &str) -> Result<Option<String>> {
        self.record(Event::ReadText);
        Ok(self.indicator.clone())
    }
}

/// Image for `page`; its width (10 + page) identifies the page in the PDF
pub fn page_image(page: u32, format: CaptureFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(10 + page, 8, Rgb([page as u8, 40, 80]));
    let format = match format {
        CaptureFormat::Png => ImageFormat::Png,
        CaptureFormat::Jpeg => ImageFormat::Jpeg,
    };
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::from(img)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

/// Write `page_N.png` for each page into `dir`
pub fn write_pages(dir: &Path, pages: &[u32]) {
    std::fs::create_dir_all(dir).unwrap();
    for &page in pages {
        std::fs::write(
            dir.join(format!("page_{page}.png")),
            page_image(page, CaptureFormat::Png),
        )
        .unwrap();
    }
}

/// Image widths of every PDF page, in document order
pub fn pdf_page_widths(path: &Path) -> Vec<i64> {
    let doc = lopdf::Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
            let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
            image.dict.get(b"Width").unwrap().as_i64().unwrap()
        })
        .collect()
}

/// Number of entries in a directory, zero if it does not exist
pub fn entry_count(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}
