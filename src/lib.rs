//! Translates AWS event notifications into inventory refresh targets.
//!
//! # Overview
//!
//! AWS reports changes to remote resources through several kinds of notifications: AWS Config
//! configuration changes, CloudTrail API calls, EC2 state changes, EBS snapshot notifications and
//! CloudWatch alarms. Each kind has its own payload shape. This crate turns one decoded [`Event`]
//! into the list of [`Target`]s the inventory has to refresh because of it.
//!
//! A [`Target`] is an [`EntityClass`] plus a [`Reference`] holding the provider identifier
//! (`{"ems_ref": "i-0aeefa44d61669849"}`). One event may produce several targets, including
//! targets of different classes that share the same reference. Targets are not deduplicated.
//!
//! [`RuleTable`](rule_table::RuleTable) maps event types to [extraction rules](rules). It is built
//! once and never changes afterwards. [`Dispatcher`] looks up the rules for an event, runs them
//! and concatenates their targets in registration order. [`ParserConfig`] builds a dispatcher
//! with the [default AWS rules](amazon) plus any rules of your own.
//!
//! ```
//! # use aws_event_targets::{EntityClass, Event, ParserConfig, Target};
//! # use serde_json::json;
//! let dispatcher = ParserConfig::new().to_dispatcher().unwrap();
//!
//! let event = Event::new(
//!     "EC2_Instance_State_change_Notification_running",
//!     json!({"detail": {"instance-id": "i-0aeefa44d61669849", "state": "running"}}),
//! );
//!
//! assert_eq!(
//!     dispatcher.parse(&event),
//!     vec![Target::ems_ref(EntityClass::Vm, "i-0aeefa44d61669849").unwrap()]
//! );
//! ```
//!
//! # Error Handling
//!
//! [`Dispatcher::parse`] never fails. Unknown event types, missing or malformed values and faulty
//! rules only result in fewer targets. [`Error`] is returned when building paths, matchers and
//! rule tables; [`ExtractError`] is reported by rules and contained by the dispatcher.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate with the
//! `aws_event_targets` target. Rule faults are logged as warnings.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod amazon;
pub mod navigator;
pub mod rule_table;
pub mod rules;

mod config;
mod dispatcher;
mod error;
mod event;
mod target;

pub use config::ParserConfig;
pub use dispatcher::Dispatcher;
pub use error::{Error, ExtractError, Result};
pub use event::Event;
pub use target::{EntityClass, Reference, Target, EMS_REF};

pub(crate) const LOG_TARGET: &str = "aws_event_targets";
