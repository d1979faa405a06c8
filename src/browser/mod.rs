//! Browser automation module
//!
//! This module provides browser control through ChromiumOxide: lifecycle
//! management, navigation, element capture, and the CDP-backed
//! [`RenderSurface`](crate::surface::RenderSurface).

pub mod capture;
pub mod controller;
pub mod navigation;
pub mod surface;

pub use capture::{CaptureFormat, ElementCapture};
pub use controller::{BrowserConfig, BrowserController, PageHandle};
pub use navigation::{NavigationOptions, NavigationResult, PageNavigator};
pub use surface::CdpSurface;
