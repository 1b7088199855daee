//! # OBIS Object Codes
//!
//! Every record of a push notification is addressed by a six-byte OBIS code
//! `A-B:C.D.E*F`. Field A names the medium, C and D name the measured
//! quantity. Only abstract objects (clock, identification) and electricity
//! quantities are understood; the (C, D) lookup below is the full table of
//! quantities the decoder reports.

use crate::constants::{OBIS_A, OBIS_B, OBIS_C, OBIS_CODE_LENGTH, OBIS_D, OBIS_E, OBIS_F};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Six-byte OBIS code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObisCode(pub [u8; OBIS_CODE_LENGTH]);

impl ObisCode {
    pub fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        ObisCode([a, b, c, d, e, f])
    }

    pub fn a(&self) -> u8 {
        self.0[OBIS_A]
    }

    pub fn b(&self) -> u8 {
        self.0[OBIS_B]
    }

    pub fn c(&self) -> u8 {
        self.0[OBIS_C]
    }

    pub fn d(&self) -> u8 {
        self.0[OBIS_D]
    }

    pub fn e(&self) -> u8 {
        self.0[OBIS_E]
    }

    pub fn f(&self) -> u8 {
        self.0[OBIS_F]
    }

    pub fn medium(&self) -> Option<Medium> {
        Medium::from_byte(self.a())
    }

    pub fn as_bytes(&self) -> &[u8; OBIS_CODE_LENGTH] {
        &self.0
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}:{}.{}.{}*{}",
            self.a(),
            self.b(),
            self.c(),
            self.d(),
            self.e(),
            self.f()
        )
    }
}

/// Value group A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Medium {
    Abstract,
    Electricity,
    Heat,
    Gas,
    Water,
}

impl Medium {
    pub fn from_byte(a: u8) -> Option<Self> {
        match a {
            0x00 => Some(Medium::Abstract),
            0x01 => Some(Medium::Electricity),
            0x06 => Some(Medium::Heat),
            0x07 => Some(Medium::Gas),
            0x08 => Some(Medium::Water),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Medium::Abstract => 0x00,
            Medium::Electricity => 0x01,
            Medium::Heat => 0x06,
            Medium::Gas => 0x07,
            Medium::Water => 0x08,
        }
    }
}

/// Quantities reported to the measurement sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    Timestamp,
    SerialNumber,
    DeviceName,
    VoltageL1,
    VoltageL2,
    VoltageL3,
    CurrentL1,
    CurrentL2,
    CurrentL3,
    ActivePowerPlus,
    ActivePowerMinus,
    PowerFactor,
    ActiveEnergyPlus,
    ActiveEnergyMinus,
    ReactiveEnergyPlus,
    ReactiveEnergyMinus,
}

impl CodeType {
    pub const ALL: [CodeType; 16] = [
        CodeType::Timestamp,
        CodeType::SerialNumber,
        CodeType::DeviceName,
        CodeType::VoltageL1,
        CodeType::VoltageL2,
        CodeType::VoltageL3,
        CodeType::CurrentL1,
        CodeType::CurrentL2,
        CodeType::CurrentL3,
        CodeType::ActivePowerPlus,
        CodeType::ActivePowerMinus,
        CodeType::PowerFactor,
        CodeType::ActiveEnergyPlus,
        CodeType::ActiveEnergyMinus,
        CodeType::ReactiveEnergyPlus,
        CodeType::ReactiveEnergyMinus,
    ];

    /// Classifies a record by medium and its (C, D) value groups.
    ///
    /// `None` means the code is well-formed but not a reported quantity.
    pub fn classify(medium: Medium, c: u8, d: u8) -> Option<Self> {
        match medium {
            Medium::Abstract => match (c, d) {
                (0x01, 0x00) => Some(CodeType::Timestamp),
                (0x60, 0x01) => Some(CodeType::SerialNumber),
                (0x2A, 0x00) => Some(CodeType::DeviceName),
                _ => None,
            },
            Medium::Electricity => match (c, d) {
                (0x20, 0x07) => Some(CodeType::VoltageL1),
                (0x34, 0x07) => Some(CodeType::VoltageL2),
                (0x48, 0x07) => Some(CodeType::VoltageL3),
                (0x1F, 0x07) => Some(CodeType::CurrentL1),
                (0x33, 0x07) => Some(CodeType::CurrentL2),
                (0x47, 0x07) => Some(CodeType::CurrentL3),
                (0x01, 0x07) => Some(CodeType::ActivePowerPlus),
                (0x02, 0x07) => Some(CodeType::ActivePowerMinus),
                (0x0D, 0x07) => Some(CodeType::PowerFactor),
                (0x01, 0x08) => Some(CodeType::ActiveEnergyPlus),
                (0x02, 0x08) => Some(CodeType::ActiveEnergyMinus),
                (0x03, 0x08) => Some(CodeType::ReactiveEnergyPlus),
                (0x04, 0x08) => Some(CodeType::ReactiveEnergyMinus),
                _ => None,
            },
            Medium::Heat | Medium::Gas | Medium::Water => None,
        }
    }

    /// Canonical OBIS code a meter uses for this quantity.
    pub fn obis(self) -> ObisCode {
        let (medium, c, d, e) = match self {
            CodeType::Timestamp => (Medium::Abstract, 0x01, 0x00, 0x00),
            CodeType::SerialNumber => (Medium::Abstract, 0x60, 0x01, 0x00),
            CodeType::DeviceName => (Medium::Abstract, 0x2A, 0x00, 0x00),
            CodeType::VoltageL1 => (Medium::Electricity, 0x20, 0x07, 0x00),
            CodeType::VoltageL2 => (Medium::Electricity, 0x34, 0x07, 0x00),
            CodeType::VoltageL3 => (Medium::Electricity, 0x48, 0x07, 0x00),
            CodeType::CurrentL1 => (Medium::Electricity, 0x1F, 0x07, 0x00),
            CodeType::CurrentL2 => (Medium::Electricity, 0x33, 0x07, 0x00),
            CodeType::CurrentL3 => (Medium::Electricity, 0x47, 0x07, 0x00),
            CodeType::ActivePowerPlus => (Medium::Electricity, 0x01, 0x07, 0x00),
            CodeType::ActivePowerMinus => (Medium::Electricity, 0x02, 0x07, 0x00),
            CodeType::PowerFactor => (Medium::Electricity, 0x0D, 0x07, 0x00),
            CodeType::ActiveEnergyPlus => (Medium::Electricity, 0x01, 0x08, 0x00),
            CodeType::ActiveEnergyMinus => (Medium::Electricity, 0x02, 0x08, 0x00),
            CodeType::ReactiveEnergyPlus => (Medium::Electricity, 0x03, 0x08, 0x00),
            CodeType::ReactiveEnergyMinus => (Medium::Electricity, 0x04, 0x08, 0x00),
        };
        ObisCode::new(medium.as_byte(), 0x00, c, d, e, 0xFF)
    }

    /// Field name used in JSON output.
    pub fn name(self) -> &'static str {
        match self {
            CodeType::Timestamp => "timestamp",
            CodeType::SerialNumber => "serial_number",
            CodeType::DeviceName => "device_name",
            CodeType::VoltageL1 => "voltage_l1",
            CodeType::VoltageL2 => "voltage_l2",
            CodeType::VoltageL3 => "voltage_l3",
            CodeType::CurrentL1 => "current_l1",
            CodeType::CurrentL2 => "current_l2",
            CodeType::CurrentL3 => "current_l3",
            CodeType::ActivePowerPlus => "active_power_plus",
            CodeType::ActivePowerMinus => "active_power_minus",
            CodeType::PowerFactor => "power_factor",
            CodeType::ActiveEnergyPlus => "active_energy_plus",
            CodeType::ActiveEnergyMinus => "active_energy_minus",
            CodeType::ReactiveEnergyPlus => "reactive_energy_plus",
            CodeType::ReactiveEnergyMinus => "reactive_energy_minus",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            CodeType::VoltageL1 | CodeType::VoltageL2 | CodeType::VoltageL3 => "V",
            CodeType::CurrentL1 | CodeType::CurrentL2 | CodeType::CurrentL3 => "A",
            CodeType::ActivePowerPlus | CodeType::ActivePowerMinus => "W",
            CodeType::ActiveEnergyPlus | CodeType::ActiveEnergyMinus => "Wh",
            CodeType::ReactiveEnergyPlus | CodeType::ReactiveEnergyMinus => "varh",
            CodeType::Timestamp
            | CodeType::SerialNumber
            | CodeType::DeviceName
            | CodeType::PowerFactor => "",
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obis_display() {
        assert_eq!(
            ObisCode::new(1, 0, 32, 7, 0, 255).to_string(),
            "1-0:32.7.0*255"
        );
    }

    #[test]
    fn test_canonical_codes_classify_back() {
        for code_type in CodeType::ALL {
            let obis = code_type.obis();
            let medium = obis.medium().unwrap();
            assert_eq!(
                CodeType::classify(medium, obis.c(), obis.d()),
                Some(code_type)
            );
        }
    }

    #[test]
    fn test_same_cd_differs_by_medium() {
        // 0.0.1.0 is the clock, 1.0.1.8 is energy; C=1 appears in both media
        assert_eq!(
            CodeType::classify(Medium::Abstract, 0x01, 0x00),
            Some(CodeType::Timestamp)
        );
        assert_eq!(CodeType::classify(Medium::Electricity, 0x01, 0x00), None);
        assert_eq!(CodeType::classify(Medium::Gas, 0x01, 0x08), None);
    }

    #[test]
    fn test_unknown_medium() {
        assert_eq!(Medium::from_byte(0x02), None);
        assert_eq!(Medium::from_byte(0x07), Some(Medium::Gas));
    }
}
