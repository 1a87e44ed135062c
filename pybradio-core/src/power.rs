//! Transmit power table
//!
//! The host sees an abstract power level 0-7; the radio hardware is
//! programmed in dBm. Levels follow the micro:bit runtime table.

/// Transmit power in dBm, indexed by level
pub const POWER_LEVEL_DBM: [i8; 8] = [-30, -20, -16, -12, -8, -4, 0, 4];

/// Highest valid power level
pub const MAX_POWER_LEVEL: u8 = (POWER_LEVEL_DBM.len() - 1) as u8;

/// Level reported for a hardware setting outside the table
pub const UNMAPPED_POWER_LEVEL: u8 = MAX_POWER_LEVEL + 1;

/// Convert a power level to dBm
pub fn level_to_dbm(level: u8) -> Option<i8> {
    POWER_LEVEL_DBM.get(level as usize).copied()
}

/// Convert a dBm setting back to a power level
///
/// Returns [`UNMAPPED_POWER_LEVEL`] if the setting is not in the table.
pub fn dbm_to_level(dbm: i8) -> u8 {
    POWER_LEVEL_DBM
        .iter()
        .position(|&entry| entry == dbm)
        .map(|level| level as u8)
        .unwrap_or(UNMAPPED_POWER_LEVEL)
}
