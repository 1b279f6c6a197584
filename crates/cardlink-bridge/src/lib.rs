//! cardlink-bridge library crate.
//!
//! Bridges a cloud-connected control module and a set of operator consoles.
//! Notifications from the control module are routed to the consoles; lines
//! typed on a console are sent upstream, either as replies to a message the
//! operator was shown or as new requests.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Control module (aux link: notifications, request link: req/cmd)
//!         ↕
//! [cardlink-bridge]
//!   ├── domain/            BridgeConfig (TOML + defaults)
//!   ├── application/       router, composer, setup, Bridge::poll
//!   └── infrastructure/
//!         ├── serial/          non-blocking serial line ports
//!         ├── control_module/  request/response link
//!         ├── stdio/           stdin/stdout console
//!         ├── clock/           control-module-synced time
//!         └── mock/            in-memory transports for tests
//!         ↕
//! Operator consoles (UART, USB, stdio)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `cardlink-core` and its own port
//!   traits only.
//! - `infrastructure` implements the port traits with `serialport` and
//!   threads.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: routing, composition, bring-up and the poll loop.
pub mod application;

/// Infrastructure layer: serial ports, stdio, clock and test transports.
pub mod infrastructure;
