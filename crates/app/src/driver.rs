//! Physical LED driver boundary.

use std::{collections::BTreeMap, fmt::Debug, iter::repeat};

use ledscene_core::types::StripId;
use smart_leds::{brightness, SmartLedsWrite, RGB8};

/// Pixels of a single strip ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub strip: StripId,
    pub pixels: Vec<RGB8>,
}

/// Hardware driver that pushes rendered frames to the LED strips.
pub trait StripDriver: Send + 'static {
    type Error: Debug;

    /// Sets the global brightness applied to every strip on the next show.
    fn set_brightness(&mut self, brightness: u8);
    /// Switches the strip power on or off.
    fn set_power(&mut self, strip: StripId, enabled: bool);
    /// Shows all the given frames in one batch.
    fn show(&mut self, frames: &[Frame]) -> Result<(), Self::Error>;
}

struct StripOutput<W> {
    writer: W,
    pixel_count: u16,
    powered: bool,
}

/// [`StripDriver`] over a set of [`SmartLedsWrite`] strips.
///
/// Powered off strips are blanked since plain writers have no power switch.
pub struct SmartLedsDriver<W> {
    outputs: BTreeMap<StripId, StripOutput<W>>,
    brightness: u8,
}

impl<W> Default for SmartLedsDriver<W> {
    fn default() -> Self {
        Self {
            outputs: BTreeMap::new(),
            brightness: u8::MAX,
        }
    }
}

impl<W> SmartLedsDriver<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a strip writer.
    #[must_use]
    pub fn with_strip(mut self, strip: StripId, pixel_count: u16, writer: W) -> Self {
        self.outputs.insert(
            strip,
            StripOutput {
                writer,
                pixel_count,
                powered: false,
            },
        );
        self
    }

    /// Returns the writer of the given strip.
    pub fn writer(&self, strip: StripId) -> Option<&W> {
        self.outputs.get(&strip).map(|output| &output.writer)
    }
}

impl<W> StripDriver for SmartLedsDriver<W>
where
    W: SmartLedsWrite<Color = RGB8> + Send + 'static,
    W::Error: Debug,
{
    type Error = W::Error;

    fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    fn set_power(&mut self, strip: StripId, enabled: bool) {
        let Some(output) = self.outputs.get_mut(&strip) else {
            log::warn!("Unknown strip {strip}");
            return;
        };

        if output.powered && !enabled {
            log::debug!("Disabling strip {strip}");
            let blank = repeat(RGB8::default()).take(output.pixel_count as usize);
            if let Err(err) = output.writer.write(blank) {
                log::error!("Unable to blank strip {strip}: {err:?}");
            }
        } else if !output.powered && enabled {
            log::debug!("Enabling strip {strip}");
        }
        output.powered = enabled;
    }

    fn show(&mut self, frames: &[Frame]) -> Result<(), Self::Error> {
        for frame in frames {
            let Some(output) = self.outputs.get_mut(&frame.strip) else {
                continue;
            };
            if !output.powered {
                continue;
            }

            output
                .writer
                .write(brightness(frame.pixels.iter().copied(), self.brightness))?;
        }
        Ok(())
    }
}
