//! Bluetooth UUIDs for RadonEye devices.
//!
//! Both device generations use the same characteristic layout (command,
//! status, history) under different service bases.

use uuid::{Uuid, uuid};

// --- RD200 V1 ---

/// Vendor service exposed by first-generation RD200 firmware.
pub const V1_SERVICE: Uuid = uuid!("00001523-1212-efde-1523-785feabcd123");

/// Command characteristic (write).
pub const V1_COMMAND: Uuid = uuid!("00001524-1212-efde-1523-785feabcd123");

/// Status characteristic (notify).
pub const V1_STATUS: Uuid = uuid!("00001525-1212-efde-1523-785feabcd123");

/// History characteristic (notify).
pub const V1_HISTORY: Uuid = uuid!("00001526-1212-efde-1523-785feabcd123");

// --- RD200 V2 / V3 ---

/// Service exposed by second and third generation firmware.
pub const V2_SERVICE: Uuid = uuid!("00001523-0000-1000-8000-00805f9b34fb");

/// Command characteristic (write).
pub const V2_COMMAND: Uuid = uuid!("00001524-0000-1000-8000-00805f9b34fb");

/// Status characteristic (notify).
pub const V2_STATUS: Uuid = uuid!("00001525-0000-1000-8000-00805f9b34fb");

/// History characteristic (notify).
pub const V2_HISTORY: Uuid = uuid!("00001526-0000-1000-8000-00805f9b34fb");

// --- Advertising ---

/// Local name prefix advertised by every RadonEye generation.
pub const NAME_PREFIX: &str = "FR:";
