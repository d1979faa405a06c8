//! Total page count discovery
//!
//! The viewer only renders its page counter once the document is open, so the
//! count is read from the live surface right before the capture loop.

use crate::error::{DiscoveryError, Result};
use crate::surface::RenderSurface;
use tracing::{info, instrument};

/// Read the page count indicator and parse it.
///
/// The indicator text is expected to be a fixed-width label followed by the
/// number, e.g. `"из 48"` with a two character prefix.
#[instrument(skip(surface))]
pub async fn discover_page_count<S: RenderSurface>(
    surface: &S,
    selector: &str,
    prefix_chars: usize,
) -> Result<u32> {
    let text = surface
        .read_text(selector)
        .await?
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| DiscoveryError::IndicatorMissing(selector.to_string()))?;

    let count = parse_page_count(&text, prefix_chars)?;
    info!("Discovered {} pages", count);
    Ok(count)
}

/// Strip `prefix_chars` characters, trim, and parse a positive integer
pub fn parse_page_count(
    text: &str,
    prefix_chars: usize,
) -> std::result::Result<u32, DiscoveryError> {
    let rest: String = text.chars().skip(prefix_chars).collect();
    let digits = rest.trim();

    let count: u32 = digits
        .parse()
        .map_err(|_| DiscoveryError::NotNumeric(text.to_string()))?;

    if count == 0 {
        return Err(DiscoveryError::ZeroPages);
    }
    Ok(count)
}
