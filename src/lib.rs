//! # lineseek
//!
//! A concurrent TCP server that answers one question per connection: does
//! this exact line exist in the reference text file?
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌──────────────┐   ┌──────────┐
//! │ Listener │──▶│ TLS wrap  │──▶│  Handler  │──▶│DocumentSource│──▶│  Search  │
//! │ (server) │   │ (optional)│   │ (handler) │   │   (policy)   │   │ (search) │
//! └──────────┘   └───────────┘   └───────────┘   └──────┬───────┘   └──────────┘
//!                                                       │
//!                                          lookup config (config) + data file (store)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! printf 'linuxpath=/srv/200k.txt\nENABLE_SSL=False\n' > config.txt
//! lineseek serve --policy cached
//! lineseek query "banana"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Lookup config resolvers and TOML server settings |
//! | [`store`] | Active-file selection, snapshots and per-request streams |
//! | [`search`] | Exact-line search (streaming and set modes) |
//! | [`policy`] | Re-read and cached document sources |
//! | [`protocol`] | Request decoding and response wire format |
//! | [`handler`] | One connection, end to end |
//! | [`server`] | Listener and accept loop |
//! | [`tls`] | Certificate and key loading |
//! | [`client`] | Thin query client |
//! | [`error`] | Error taxonomy |
//! | [`logging`] | Tracing subscriber setup |

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod policy;
pub mod protocol;
pub mod search;
pub mod server;
pub mod store;
pub mod tls;
