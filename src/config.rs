// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.3
// Author: Lukas Bower
// Date Modified: 2026-06-14

//! Handler configuration consumed by the mirror core.
//!
//! The core does not parse configuration files; it receives a
//! [`HandlerConfig`] at handler registration. Process-wide defaults can
//! be adjusted through environment variables before the first handler
//! comes up.

use once_cell::sync::Lazy;
use std::sync::RwLock;

use crate::error::{MirrorError, MirrorResult};

/// What the hardware does when its log fills up. Every supported backend
/// overwrites its oldest entry, so that is the only policy modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    OverwriteOldest,
}

/// Per-handler configuration, fixed at registration time.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Ceiling on locally mirrored log entries.
    pub log_capacity: u32,
    pub overflow_policy: OverflowPolicy,
    /// Simulated/test backends treat an empty cache as genuinely empty
    /// rather than not-yet-discovered.
    pub simulated: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        HandlerConfig {
            log_capacity: defaults().log_capacity,
            overflow_policy: OverflowPolicy::OverwriteOldest,
            simulated: false,
        }
    }
}

/// Process-wide defaults applied to newly registered handlers.
#[derive(Debug, Clone)]
pub struct MirrorDefaults {
    pub log_capacity: u32,
}

impl Default for MirrorDefaults {
    fn default() -> Self {
        let log_capacity = std::env::var("HWMIRROR_LOG_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LOG_CAPACITY);
        MirrorDefaults { log_capacity }
    }
}

/// Management-module logs hold on the order of 512 entries before they
/// start overwriting, which makes this a sane mirror ceiling.
const DEFAULT_LOG_CAPACITY: u32 = 512;

static DEFAULTS: Lazy<RwLock<MirrorDefaults>> =
    Lazy::new(|| RwLock::new(MirrorDefaults::default()));

/// Replace the process-wide defaults.
pub fn set_defaults(new: MirrorDefaults) -> MirrorResult<()> {
    let mut guard = DEFAULTS.write().map_err(|_| MirrorError::LockPoisoned)?;
    *guard = new;
    Ok(())
}

/// Current process-wide defaults.
pub fn defaults() -> MirrorDefaults {
    DEFAULTS
        .read()
        .map(|g| g.clone())
        .unwrap_or_else(|_| MirrorDefaults::default())
}
