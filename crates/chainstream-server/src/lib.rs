//! chainstream-server — the fan-out half of ChainStream.
//!
//! [`FanoutBridge`] turns one durable-log subject into one live feed per
//! subscriber: each inbound request gets its own new-only subscription and
//! its own [`Relay`] task. The axum [`router`] exposes it over SSE:
//!
//! | Route | |
//! |-------|-|
//! | `GET /sse/:stream` | tail a logical stream |
//! | `GET /sse` | tail the default stream (`blocks`) |
//! | `GET /streams` | stream directory |
//! | `GET /health` | liveness |

pub mod bridge;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use bridge::{FanoutBridge, Frame, Relay, RelayExit, Subscription};
pub use error::{ApiError, BridgeError, ServerError};
pub use routes::router;
pub use server::serve;
pub use state::AppState;
