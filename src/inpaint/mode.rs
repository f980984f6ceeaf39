use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::inpaint::selection::SelectionModel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Auto,
    Manual,
    Tiled,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Auto, Mode::Manual, Mode::Tiled];

    pub fn tag(self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Manual => "manual",
            Mode::Tiled => "tiled",
        }
    }

    /// Only manual submissions carry a mask and get composited.
    pub fn requires_mask(self) -> bool {
        matches!(self, Mode::Manual)
    }

    pub fn accepts_drawing(self) -> bool {
        matches!(self, Mode::Manual)
    }

    /// Instruction text sent to the inpainting service.
    pub fn instruction(self) -> &'static str {
        match self {
            Mode::Auto => {
                "Remove every watermark, logo, caption overlay and similar added marking \
                 from the whole image. Reconstruct the content underneath naturally and \
                 keep everything else unchanged."
            }
            Mode::Tiled => {
                "Remove the repeating watermark pattern tiled across the full frame. \
                 Reconstruct the underlying image everywhere the pattern appears and keep \
                 the original content, colours and detail intact."
            }
            Mode::Manual => {
                "Remove the content inside the white region of the supplied mask and \
                 reconstruct it to match its surroundings. Leave every pixel outside the \
                 white region untouched."
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown mode '{s}' (expected auto, manual or tiled)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeController {
    mode: Mode,
}

impl ModeController {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches mode. Any actual change wipes the selection, including a drag
    /// in progress. Returns whether the mode changed.
    pub fn select(&mut self, mode: Mode, selection: &mut SelectionModel) -> bool {
        if self.mode == mode {
            return false;
        }
        tracing::debug!(from = %self.mode, to = %mode, "mode changed");
        self.mode = mode;
        selection.reset();
        true
    }
}
