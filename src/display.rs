/// Sink for discrete pixel events.
///
/// Pixel generation belongs to a PPU outside this core; the trait only fixes
/// the boundary a display implementation has to meet.
pub trait PixelSink {
    /// Queue one pixel at (x, y) with its palette color index.
    fn blit(&mut self, x: u8, y: u8, color: u8);

    /// Make everything queued since the last call visible.
    fn present(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        pixels: Vec<(u8, u8, u8)>,
    }

    impl PixelSink for Recorder {
        fn blit(&mut self, x: u8, y: u8, color: u8) {
            self.pixels.push((x, y, color));
        }
    }

    #[test]
    fn sink_receives_pixels_in_order() {
        let mut sink = Recorder::default();
        sink.blit(0, 0, 3);
        sink.blit(159, 143, 0);
        sink.present();
        assert_eq!(sink.pixels, vec![(0, 0, 3), (159, 143, 0)]);
    }
}
