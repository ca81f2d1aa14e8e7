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

use std::path::Path;
use std::sync::Arc;

use image::ImageOutputFormat;

use crate::Error;

/// A captured device screen. Opaque to the harness: snapshots are only
/// compared for equality and persisted for golden-image diffing.
#[derive(Clone)]
pub struct Snapshot {
    png: Arc<Vec<u8>>,
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.png == other.png
    }
}
impl Eq for Snapshot {}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("len", &self.png.len())
            .finish()
    }
}

impl Snapshot {
    /// Wrap an already-encoded PNG.
    pub fn from_png(png: Vec<u8>) -> Self {
        Snapshot { png: Arc::new(png) }
    }

    /// Encode a gray8 framebuffer pushed by the device.
    pub fn from_frame(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, Error> {
        let buffer = image::GrayImage::from_raw(width, height, pixels)
            .ok_or("Framebuffer size does not match its dimensions")?;

        let mut png = Vec::new();
        image::DynamicImage::ImageLuma8(buffer).write_to(&mut png, ImageOutputFormat::Png)?;

        Ok(Snapshot { png: Arc::new(png) })
    }

    pub fn to_base64(&self) -> String {
        base64::encode(self.png.as_slice())
    }

    pub fn save(&self, to: &Path) -> Result<(), Error> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(to, self.png.as_slice())?;
        Ok(())
    }

    pub fn load(from: &Path) -> Result<Self, Error> {
        Ok(Snapshot::from_png(std::fs::read(from)?))
    }
}

/// Compare a captured snapshot sequence against a golden one. Only file
/// count and byte equality matter; pixel semantics stay external.
pub fn matches_golden(captured: &Path, golden: &Path) -> Result<bool, Error> {
    let (captured, golden) = (list_pngs(captured)?, list_pngs(golden)?);
    if captured.len() != golden.len() {
        return Ok(false);
    }
    for (a, b) in captured.iter().zip(&golden) {
        if Snapshot::load(a)? != Snapshot::load(b)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn list_pngs(dir: &Path) -> Result<Vec<std::path::PathBuf>, Error> {
    let mut entries = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "png"))
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_equality() {
        let a = Snapshot::from_frame(4, 2, vec![0; 8]).unwrap();
        let b = Snapshot::from_frame(4, 2, vec![0; 8]).unwrap();
        let c = Snapshot::from_frame(4, 2, vec![1; 8]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        assert!(Snapshot::from_frame(4, 2, vec![0; 7]).is_err());
    }

    #[test]
    fn golden_comparison() {
        let root = tempdir::TempDir::new("snapshot-golden").unwrap();
        let captured = root.path().join("captured");
        let golden = root.path().join("golden");

        let a = Snapshot::from_frame(4, 2, vec![0; 8]).unwrap();
        let b = Snapshot::from_frame(4, 2, vec![1; 8]).unwrap();

        a.save(&captured.join("00000.png")).unwrap();
        a.save(&golden.join("00000.png")).unwrap();
        assert!(matches_golden(&captured, &golden).unwrap());

        b.save(&captured.join("00001.png")).unwrap();
        assert!(!matches_golden(&captured, &golden).unwrap());

        b.save(&golden.join("00001.png")).unwrap();
        assert!(matches_golden(&captured, &golden).unwrap());
    }
}
