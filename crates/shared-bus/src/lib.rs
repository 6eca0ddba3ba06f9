//! # Shared Bus - Event Bus for Inter-Subsystem Communication
//!
//! Carries the notifications the block production pipeline reacts to and
//! emits:
//!
//! ```text
//! ┌──────────────┐   ChainHead        ┌──────────────────┐
//! │ Chain Store  │ ─────────┐         │                  │
//! └──────────────┘          ▼         │  Block           │
//!                     ┌──────────────┐│  Production (17) │
//! ┌──────────────┐    │  Event Bus   │◀─────────────────┘│
//! │ Tx Pool      │ ──▶│              │  NewMinedBlock    │
//! └──────────────┘    └──────────────┘                   │
//!   NewTransactions          │ subscribe()               │
//!                            └──────────────────────────▶┘
//! ```
//!
//! Subscribers only see events published after they subscribed.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BlockchainEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
