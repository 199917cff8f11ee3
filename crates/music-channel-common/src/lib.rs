//! Music-Channel-Common: Shared identifiers, wire tokens, and errors.
//!
//! - **Typed IDs**: [`TrackerId`] for completed results, [`ChatId`] and
//!   [`MessageId`] for transport references
//! - **Choice tokens**: the `<trackerID>-<destination>` payload carried by
//!   inline keyboard buttons
//! - **Error Handling**: Common error type and result alias
//!
//! # Examples
//!
//! ```
//! use music_channel_common::{ChoiceToken, Destination, TrackerId};
//!
//! let id = TrackerId::generate();
//! let token = ChoiceToken::new(id.clone(), Destination::Direct);
//! let parsed: ChoiceToken = token.to_string().parse().unwrap();
//! assert_eq!(parsed.tracker_id(), &id);
//! ```

pub mod error;
pub mod ids;
pub mod token;

pub use error::{Error, Result};
pub use ids::*;
pub use token::*;
