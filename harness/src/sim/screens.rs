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

use crate::snapshot::Snapshot;
use crate::Error;

use super::SimProfile;

pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;

/// Hex characters shown per review page.
const PAGE_CHARS: usize = 46;

/// Characters of the address shown per page.
const ADDRESS_CHUNK: usize = 24;

/// One logical screen: a title row and a body row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub title: String,
    pub body: String,
}

impl Screen {
    fn new(title: &str, body: &str) -> Self {
        Screen {
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

pub fn main_menu(profile: &SimProfile) -> Screen {
    let (major, minor, patch) = profile.version;
    Screen::new("Polkadot", &format!("ready v{}.{}.{}", major, minor, patch))
}

fn approve() -> Screen {
    Screen::new("APPROVE", "")
}

fn reject() -> Screen {
    Screen::new("REJECT", "")
}

/// Review flow for showing an address: the address paginated, then the
/// approve and reject choices.
pub fn address_flow(address: &str) -> Vec<Screen> {
    let chunks = paginate(address, ADDRESS_CHUNK);
    let total = chunks.len();

    let mut screens = Vec::with_capacity(total + 2);
    for (i, chunk) in chunks.into_iter().enumerate() {
        screens.push(Screen::new(&format!("address {}/{}", i + 1, total), chunk));
    }
    screens.push(approve());
    screens.push(reject());
    screens
}

/// Review flow for signing: an intro page, the payload hex paginated, then
/// the approve and reject choices.
pub fn sign_flow(payload: &[u8]) -> Vec<Screen> {
    let encoded = hex::encode(payload);
    let chunks = paginate(&encoded, PAGE_CHARS);
    let total = chunks.len();

    let mut screens = Vec::with_capacity(total + 3);
    screens.push(Screen::new("review", "transaction"));
    for (i, chunk) in chunks.into_iter().enumerate() {
        screens.push(Screen::new(&format!("payload {}/{}", i + 1, total), chunk));
    }
    screens.push(approve());
    screens.push(reject());
    screens
}

fn paginate(text: &str, chunk: usize) -> Vec<&str> {
    if text.is_empty() {
        return vec![""];
    }
    text.as_bytes()
        .chunks(chunk)
        .map(|bytes| std::str::from_utf8(bytes).expect("hex and SS58 text is ASCII"))
        .collect()
}

/// Rasterize a screen into a gray8 frame. This is not a font renderer:
/// the text bytes are written straight into the framebuffer, which gives
/// every distinct screen a distinct frame, and that is all the harness
/// compares.
pub fn render(screen: &Screen) -> Result<Snapshot, Error> {
    let mut frame = vec![0u8; (SCREEN_WIDTH * SCREEN_HEIGHT) as usize];

    let text = format!("{}\n{}", screen.title, screen.body);
    for (i, byte) in text.bytes().enumerate().take(frame.len()) {
        frame[i] = byte;
    }

    Snapshot::from_frame(SCREEN_WIDTH, SCREEN_HEIGHT, frame)
}
