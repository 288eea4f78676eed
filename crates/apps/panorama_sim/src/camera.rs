use std::io::Cursor;
use std::thread::JoinHandle;

use bytes::Bytes;
use capture::{CaptureDelivery, CaptureRequest, DeliverySender, ImageSource, PictureQuality};
use foundation::CellId;
use image::{ImageFormat, Rgba, RgbaImage};
use tracing::debug;

/// Stand-in for camera hardware.
///
/// Every request is served on its own worker thread with a solid-color PNG
/// whose color encodes the cell. Every `fail_every`-th request fails and
/// every `corrupt_every`-th request returns bytes no decoder accepts.
#[derive(Debug, Default)]
pub struct SimulatedCamera {
    fail_every: u32,
    corrupt_every: u32,
    requests: u32,
    workers: Vec<JoinHandle<()>>,
}

enum Shot {
    Photo,
    Fail,
    Corrupt,
}

impl SimulatedCamera {
    pub fn new(fail_every: u32, corrupt_every: u32) -> Self {
        Self {
            fail_every,
            corrupt_every,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Waits for every worker still running.
    pub fn join(&mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }

    fn next_shot(&mut self) -> Shot {
        self.requests += 1;
        let hits = |every: u32| every > 0 && self.requests % every == 0;
        if hits(self.fail_every) {
            Shot::Fail
        } else if hits(self.corrupt_every) {
            Shot::Corrupt
        } else {
            Shot::Photo
        }
    }
}

impl ImageSource for SimulatedCamera {
    fn request_capture(&mut self, request: CaptureRequest, reply: DeliverySender) {
        let shot = self.next_shot();
        let worker = std::thread::spawn(move || {
            let cell = request.cell;
            let delivery = match shot {
                Shot::Fail => CaptureDelivery::failed(cell, "simulated shutter failure"),
                Shot::Corrupt => CaptureDelivery::image(cell, Bytes::from_static(b"not an image")),
                Shot::Photo => match render_photo(cell, request.quality) {
                    Ok(png) => CaptureDelivery::image(cell, png),
                    Err(e) => CaptureDelivery::failed(cell, e.to_string()),
                },
            };
            debug!(%cell, ok = delivery.result.is_ok(), "simulated capture done");
            reply.send(delivery);
        });
        self.workers.push(worker);
    }
}

pub fn photo_size(quality: PictureQuality) -> (u32, u32) {
    match quality {
        PictureQuality::VeryLow => (160, 120),
        PictureQuality::Low => (640, 480),
        PictureQuality::High => (1600, 1200),
    }
}

/// Color derived from the cell id so neighbouring cells differ.
pub fn cell_color(cell: CellId) -> Rgba<u8> {
    let n = cell.get();
    Rgba([
        (n.wrapping_mul(37) % 256) as u8,
        (n.wrapping_mul(91) % 256) as u8,
        (n.wrapping_mul(157) % 256) as u8,
        255,
    ])
}

pub fn render_photo(cell: CellId, quality: PictureQuality) -> image::ImageResult<Vec<u8>> {
    let (w, h) = photo_size(quality);
    let mut out = Vec::new();
    RgbaImage::from_pixel(w, h, cell_color(cell))
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{SimulatedCamera, cell_color, render_photo};
    use capture::{CaptureDelivery, CaptureRequest, ImageSource, PictureQuality};
    use foundation::CellId;
    use gpu::DecodedImage;
    use pretty_assertions::assert_eq;
    use runtime::Handoff;

    fn shoot(camera: &mut SimulatedCamera, cell: u32) -> CaptureDelivery {
        let slot = Handoff::new();
        camera.request_capture(
            CaptureRequest {
                cell: CellId(cell),
                quality: PictureQuality::VeryLow,
            },
            slot.sender(),
        );
        camera.join();
        slot.take().expect("delivery")
    }

    #[test]
    fn photo_decodes_with_cell_color() {
        let png = render_photo(CellId(15), PictureQuality::VeryLow).expect("png");
        let image = DecodedImage::decode(&png).expect("decode");
        assert_eq!((image.width(), image.height()), (160, 120));
        assert_eq!(*image.pixels().get_pixel(0, 0), cell_color(CellId(15)));
    }

    #[test]
    fn failure_schedule() {
        let mut camera = SimulatedCamera::new(3, 2);
        let kinds: Vec<&str> = (0..6)
            .map(|i| match shoot(&mut camera, 15 + i).result {
                Ok(bytes) if bytes.as_ref() == b"not an image" => "corrupt",
                Ok(_) => "photo",
                Err(_) => "fail",
            })
            .collect();
        assert_eq!(kinds, vec!["photo", "corrupt", "fail", "corrupt", "photo", "fail"]);
        assert_eq!(camera.requests(), 6);
    }
}
