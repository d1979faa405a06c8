//! The renderable surface seen by the capture pipeline
//!
//! The pipeline never talks to the browser directly. It only needs a handful
//! of operations on the live viewer, collected in [`RenderSurface`]. The CDP
//! implementation lives in [`crate::browser::CdpSurface`]; tests drive the
//! pipeline with scripted in-memory surfaces.

use crate::browser::CaptureFormat;
use crate::error::Result;

/// Operations the capture pipeline performs on the rendered viewer.
///
/// Implementations are used from a single task, one call at a time. The
/// pipeline relies on that: scroll position and overlay visibility are
/// shared state across pages.
#[allow(async_fn_in_trait)]
pub trait RenderSurface {
    /// Locate the element matching `selector` and scroll it into view.
    async fn scroll_into_view(&self, selector: &str) -> Result<()>;

    /// Take a visual snapshot of the element matching `selector`.
    async fn snapshot_element(&self, selector: &str, format: CaptureFormat) -> Result<Vec<u8>>;

    /// Evaluate a script against the surface, discarding its value.
    async fn run_script(&self, script: &str) -> Result<()>;

    /// Read the text content of the element matching `selector`.
    ///
    /// Returns `Ok(None)` when no element matches or it has no text.
    async fn read_text(&self, selector: &str) -> Result<Option<String>>;
}

/// Script that hides the first element matching `selector`, if present.
pub fn hide_element_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector('{}');
            if (el) {{
                el.style.display = 'none';
            }}
        }})()"#,
        escape_js(selector)
    )
}

/// Script that shifts the window's horizontal scroll offset.
pub fn scroll_by_script(dx: i64) -> String {
    format!("window.scrollBy({dx}, 0);")
}

/// Script that reads the text content of the first match, or `''`.
pub fn text_content_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector('{}');
            return el ? (el.textContent || '') : '';
        }})()"#,
        escape_js(selector)
    )
}

fn escape_js(selector: &str) -> String {
    selector.replace('\\', "\\\\").replace('\'', "\\'")
}
