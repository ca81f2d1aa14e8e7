// Polkadot app acceptance tests and supporting software libraries
//
// Copyright (C) 2024 The polkadot-app-harness developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use core::fmt;

/// One command sent to the device app.
#[derive(Clone, Debug)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    /// Short-form wire encoding: header, length byte, payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut vec = vec![self.cla, self.ins, self.p1, self.p2, self.data.len() as u8];
        vec.extend(self.data.iter());
        vec
    }
}

/// Raw answer from the device: payload followed by the status word.
#[derive(Clone, Debug)]
pub struct ApduAnswer {
    pub data: Vec<u8>,
    pub sw: u16,
}

impl ApduAnswer {
    pub fn from_bytes(raw: &[u8]) -> Result<Self, InvalidAnswer> {
        if raw.len() < 2 {
            return Err(InvalidAnswer(raw.len()));
        }
        let (data, sw) = raw.split_at(raw.len() - 2);
        Ok(ApduAnswer {
            data: data.to_vec(),
            sw: u16::from_be_bytes([sw[0], sw[1]]),
        })
    }

    pub fn status(&self) -> StatusWord {
        StatusWord::from(self.sw)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InvalidAnswer(pub usize);

impl fmt::Display for InvalidAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "answer of {} bytes is too short for a status word", self.0)
    }
}
impl std::error::Error for InvalidAnswer {}

/// Status words the app is known to return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusWord {
    Success,
    ExecutionError,
    WrongLength,
    EmptyBuffer,
    OutputBufferTooSmall,
    DataInvalid,
    ConditionsNotSatisfied,
    TransactionRejected,
    InvalidP1P2,
    InsNotSupported,
    ClaNotSupported,
    Unknown(u16),
}

impl From<u16> for StatusWord {
    fn from(sw: u16) -> Self {
        match sw {
            0x9000 => StatusWord::Success,
            0x6400 => StatusWord::ExecutionError,
            0x6700 => StatusWord::WrongLength,
            0x6982 => StatusWord::EmptyBuffer,
            0x6983 => StatusWord::OutputBufferTooSmall,
            0x6984 => StatusWord::DataInvalid,
            0x6985 => StatusWord::ConditionsNotSatisfied,
            0x6986 => StatusWord::TransactionRejected,
            0x6B00 => StatusWord::InvalidP1P2,
            0x6D00 => StatusWord::InsNotSupported,
            0x6E00 => StatusWord::ClaNotSupported,
            other => StatusWord::Unknown(other),
        }
    }
}

impl StatusWord {
    pub fn code(&self) -> u16 {
        match self {
            StatusWord::Success => 0x9000,
            StatusWord::ExecutionError => 0x6400,
            StatusWord::WrongLength => 0x6700,
            StatusWord::EmptyBuffer => 0x6982,
            StatusWord::OutputBufferTooSmall => 0x6983,
            StatusWord::DataInvalid => 0x6984,
            StatusWord::ConditionsNotSatisfied => 0x6985,
            StatusWord::TransactionRejected => 0x6986,
            StatusWord::InvalidP1P2 => 0x6B00,
            StatusWord::InsNotSupported => 0x6D00,
            StatusWord::ClaNotSupported => 0x6E00,
            StatusWord::Unknown(code) => *code,
        }
    }

    /// Message published for this return code.
    pub fn message(&self) -> &'static str {
        match self {
            StatusWord::Success => "No errors",
            StatusWord::ExecutionError => "Execution error",
            StatusWord::WrongLength => "Wrong length",
            StatusWord::EmptyBuffer => "Empty buffer",
            StatusWord::OutputBufferTooSmall => "Output buffer too small",
            StatusWord::DataInvalid => "Data is invalid",
            StatusWord::ConditionsNotSatisfied => "Conditions not satisfied",
            StatusWord::TransactionRejected => "Transaction rejected",
            StatusWord::InvalidP1P2 => "Invalid P1/P2",
            StatusWord::InsNotSupported => "Instruction not supported",
            StatusWord::ClaNotSupported => "CLA not supported",
            StatusWord::Unknown(_) => "Unknown error code",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_short_form() {
        let command = ApduCommand {
            cla: 0x90,
            ins: 0x01,
            p1: 1,
            p2: 0,
            data: vec![0xAA, 0xBB],
        };
        assert_eq!(command.encode(), vec![0x90, 0x01, 0x01, 0x00, 0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn parse_answer() {
        let answer = ApduAnswer::from_bytes(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert_eq!(answer.data, vec![0x01, 0x02]);
        assert_eq!(answer.status(), StatusWord::Success);

        let rejected = ApduAnswer::from_bytes(&[0x69, 0x86]).unwrap();
        assert!(rejected.data.is_empty());
        assert_eq!(rejected.status(), StatusWord::TransactionRejected);
        assert_eq!(rejected.status().message(), "Transaction rejected");

        assert!(ApduAnswer::from_bytes(&[0x90]).is_err());
    }

    #[test]
    fn status_word_roundtrip() {
        for code in [0x9000u16, 0x6986, 0x6984, 0x6D00, 0x1234] {
            assert_eq!(StatusWord::from(code).code(), code);
        }
    }
}
