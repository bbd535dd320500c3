//! `avbus-filter`: the worker runtime over the avbus media rings.
//!
//! A [`Filter`] attaches to a video and/or audio ring, tracks its own read
//! cursor at a configured bias and window, and dispatches fresh slots to a
//! [`FilterHooks`] implementation. [`ClockHooks`] is the specialized filter
//! that owns index advancement; [`BlankHooks`] is the stock eraser.
//!
//! # Example
//!
//! ```ignore
//! use avbus_filter::{Filter, FilterConfig, FilterHooks};
//!
//! struct Count(u64);
//! impl FilterHooks for Count {
//!     fn on_video(&mut self, _s: &avbus_filter::VideoStream,
//!                 _i: &avbus_ring::FrameInfo,
//!                 _f: &mut avbus_ring::FrameBuf<'_>)
//!                 -> Result<(), avbus_filter::FilterFault> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! let filter = Filter::spawn(
//!     FilterConfig {
//!         video: Some("SOMESHARE".into()),
//!         vbias: -0.25,
//!         ..Default::default()
//!     },
//!     Count(0),
//! )?;
//! // ... later
//! filter.join();
//! ```

mod blank;
mod clock;
mod error;
mod filter;

pub use blank::BlankHooks;
pub use clock::{ClockConfig, ClockHooks};
pub use error::{FilterError, FilterFault, MediaKind};
pub use filter::{
    AudioStream, Filter, FilterConfig, FilterCtx, FilterHooks, FilterWorker, VideoStream,
};
