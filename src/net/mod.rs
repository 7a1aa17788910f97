//! Raw TCP relay subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (Acceptor: accept loop, connection limits)
//!     → session.rs (Forward Session: dial the fixed upstream)
//!     → relay.rs ×2 (client→upstream, upstream→client)
//!     → both relays returned → session released
//! ```
//!
//! # Design Decisions
//! - Protocol-agnostic: bytes are never inspected
//! - One task per session plus one per direction
//! - A relay stopping closes both sockets; that is the only cancellation signal
//! - Shutdown stops accepting; running sessions are not interrupted

pub mod connection;
pub mod listener;
pub mod relay;
pub mod session;

pub use connection::{SessionGuard, SessionId, SessionTracker};
pub use listener::{Acceptor, AcceptorError};
pub use relay::{relay, RelayEnd, RelayOutcome};
pub use session::{ForwardSession, SessionError, SessionSettings, SessionSummary};
