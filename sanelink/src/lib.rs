//! A pure Rust client for the SANE (Scanner Access Now Easy) network
//! protocol, version 1.0.3.
//!
//! This crate speaks the wire protocol only: session negotiation, device
//! enumeration, the option-descriptor/value sub-protocol, the
//! record-framed image data channel, and the MD5-challenged
//! authentication flow (kept available but not used by default; see
//! [`auth::md5_challenge`]). Turning the resulting pixel planes into a
//! platform image type, reading `~/.sane/pass`-style credential files,
//! and any CLI surface are left to the caller.
//!
//! ```no_run
//! use sanelink::session::{Session, SessionConfig};
//!
//! # fn main() -> Result<(), sanelink::Error> {
//! // A closure implements `CredentialProvider`; this one never answers
//! // a challenge, which is fine for daemons with no `access_list`.
//! let mut session = Session::connect("localhost", SessionConfig::default(), |_: &str| None)?;
//! for device in session.list_devices()? {
//!     println!("{} ({})", device.name, device.model);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod codec;
pub mod device;
pub mod enums;
pub mod error;
pub mod fixed;
pub mod image;
pub mod session;
pub mod wire;

pub use device::DeviceHandle;
pub use error::{Error, FramingError, Status};
pub use fixed::Fixed;
pub use image::{Frame, Image, ImageBuilder};
pub use session::{Session, SessionConfig, SessionState, DEFAULT_PORT, PROTOCOL_VERSION};
