// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core SIP types for the Skylink gateway agent.
//!
//! This crate provides the message vocabulary the rest of the stack is
//! built on:
//! - **Messages**: [`Request`], [`Response`], [`SipMessage`]
//! - **URIs**: [`SipUri`]
//! - **Headers**: [`Headers`] container plus the [`ViaHeader`] the
//!   transport guard inspects
//! - **Methods**: [`Method`] enum (REGISTER, SUBSCRIBE, NOTIFY, etc.)
//! - **Contact**: [`Contact`] synthesizer for the outbound Contact header
//!
//! Strings are held as [`SmolStr`](smol_str::SmolStr) and message bodies as
//! [`Bytes`](bytes::Bytes), matching the datagram-sized payloads this agent
//! deals in.

pub mod contact;
pub mod headers;
pub mod method;
pub mod msg;
pub mod uri;
pub mod version;
pub mod via;

pub use contact::{random_token, Contact, ContactConfig, ContactMode};
pub use headers::{Header, Headers};
pub use method::Method;
pub use msg::{Request, RequestLine, Response, SipMessage, StatusLine};
pub use uri::SipUri;
pub use version::SipVersion;
pub use via::ViaHeader;
