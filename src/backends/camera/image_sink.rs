// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot still image sink
//!
//! The device writes encoded stills into a bounded channel of capacity
//! [`MAX_IMAGES`](crate::constants::sink::MAX_IMAGES). While an image sits in
//! the slot, further deliveries are refused and handed back to the producer,
//! which drops them. Closing the reader refuses every later delivery.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use super::types::{CapturedImage, ImageFormat, Resolution};

/// Create a connected writer/reader pair for stills of `size`
pub fn image_sink(size: Resolution, format: ImageFormat) -> (ImageSinkWriter, ImageSinkReader) {
    let (tx, rx) = mpsc::channel(crate::constants::sink::MAX_IMAGES);
    (
        ImageSinkWriter { tx, size, format },
        ImageSinkReader { rx },
    )
}

/// Producer half, handed to the camera service as an output target
#[derive(Clone)]
pub struct ImageSinkWriter {
    tx: mpsc::Sender<CapturedImage>,
    size: Resolution,
    format: ImageFormat,
}

impl ImageSinkWriter {
    pub fn size(&self) -> Resolution {
        self.size
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Deliver an image into the slot
    ///
    /// Returns the image back if the slot is occupied or the sink is closed.
    pub fn try_deliver(&self, image: CapturedImage) -> Result<(), CapturedImage> {
        self.tx.try_send(image).map_err(|e| match e {
            TrySendError::Full(image) => {
                debug!("Image sink full, dropping delivery");
                image
            }
            TrySendError::Closed(image) => {
                debug!("Image sink closed, dropping delivery");
                image
            }
        })
    }

    /// True once the reader side has been closed or dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the reader side has been closed or dropped
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

impl std::fmt::Debug for ImageSinkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSinkWriter")
            .field("size", &self.size)
            .field("format", &self.format)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Consumer half, owned by the session worker
pub struct ImageSinkReader {
    rx: mpsc::Receiver<CapturedImage>,
}

impl ImageSinkReader {
    /// Wait for the next delivered image, taking it out of the slot
    pub async fn recv(&mut self) -> Option<CapturedImage> {
        self.rx.recv().await
    }

    /// Close the sink and discard anything still sitting in the slot
    pub fn close(&mut self) {
        self.rx.close();
        let mut discarded = 0usize;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "Discarded undelivered images on close");
        }
    }
}

impl std::fmt::Debug for ImageSinkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSinkReader")
            .field("pending", &self.rx.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(tag: u8) -> CapturedImage {
        CapturedImage {
            data: vec![0xFF, 0xD8, tag],
            format: ImageFormat::Jpeg,
            width: 4,
            height: 3,
        }
    }

    #[tokio::test]
    async fn test_single_slot_refuses_second_delivery() {
        let (writer, mut reader) = image_sink(Resolution::new(4, 3), ImageFormat::Jpeg);

        assert!(writer.try_deliver(jpeg(1)).is_ok());
        let refused = writer.try_deliver(jpeg(2)).unwrap_err();
        assert_eq!(refused.data[2], 2);

        let image = reader.recv().await.unwrap();
        assert_eq!(image.into_bytes(), vec![0xFF, 0xD8, 1]);

        // Slot is free again once the image was taken out
        assert!(writer.try_deliver(jpeg(3)).is_ok());
    }

    #[tokio::test]
    async fn test_close_refuses_and_discards() {
        let (writer, mut reader) = image_sink(Resolution::new(4, 3), ImageFormat::Jpeg);
        writer.try_deliver(jpeg(1)).unwrap();

        reader.close();

        assert!(writer.is_closed());
        assert!(writer.try_deliver(jpeg(2)).is_err());
        assert!(reader.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_resolves_when_reader_dropped() {
        let (writer, reader) = image_sink(Resolution::new(4, 3), ImageFormat::Jpeg);
        drop(reader);
        tokio::time::timeout(std::time::Duration::from_secs(1), writer.closed())
            .await
            .unwrap();
    }
}
