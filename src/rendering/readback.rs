//! Non-blocking surface readback for capture.
//!
//! A frame is copied into a staging buffer in the same submission that draws
//! it, mapped asynchronously, and collected on a later frame once the GPU has
//! finished. Frames come out in the order they were recorded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::{debug, warn};

use crate::capture::{PixelLayout, RawFrame};

const BYTES_PER_PIXEL: u32 = 4;

/// Copies allowed in flight before new capture requests are skipped
const MAX_IN_FLIGHT: usize = 3;

const MAP_PENDING: u8 = 0;
const MAP_READY: u8 = 1;
const MAP_FAILED: u8 = 2;

/// Capture byte order for a surface format, if it can be encoded directly
pub fn pixel_layout(format: wgpu::TextureFormat) -> Option<PixelLayout> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {
            Some(PixelLayout::Rgba)
        }
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
            Some(PixelLayout::Bgra)
        }
        _ => None,
    }
}

/// Row pitch satisfying `COPY_BYTES_PER_ROW_ALIGNMENT`
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Remove per-row padding from a mapped copy
pub fn strip_padding(data: &[u8], width: u32, height: u32, padded_row: u32) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    let padded_row = padded_row as usize;
    let mut pixels = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * padded_row;
        pixels.extend_from_slice(&data[start..start + row]);
    }
    pixels
}

struct PendingFrame {
    buffer: wgpu::Buffer,
    state: Arc<AtomicU8>,
    mapped: bool,
    width: u32,
    height: u32,
}

pub struct FrameReadback {
    layout: PixelLayout,
    pending: VecDeque<PendingFrame>,
    free: Vec<wgpu::Buffer>,
    buffer_size: u64,
}

impl FrameReadback {
    pub fn new(layout: PixelLayout) -> Self {
        Self {
            layout,
            pending: VecDeque::new(),
            free: Vec::new(),
            buffer_size: 0,
        }
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Drop pooled buffers sized for the old surface
    pub fn resize(&mut self) {
        self.free.clear();
        self.buffer_size = 0;
    }

    /// Record a copy of `texture` into a staging buffer; false if too many are in flight
    pub fn record(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
    ) -> bool {
        if self.pending.len() >= MAX_IN_FLIGHT {
            debug!("readback backlog full; skipping capture");
            return false;
        }

        let (width, height) = (texture.width(), texture.height());
        let padded_row = padded_bytes_per_row(width);
        let size = padded_row as u64 * height as u64;
        if size != self.buffer_size {
            self.free.clear();
            self.buffer_size = size;
        }
        let buffer = self.free.pop().unwrap_or_else(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Frame Capture Buffer"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        });

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.pending.push_back(PendingFrame {
            buffer,
            state: Arc::new(AtomicU8::new(MAP_PENDING)),
            mapped: false,
            width,
            height,
        });
        true
    }

    /// Request mapping for copies recorded since the last submit
    pub fn map_submitted(&mut self) {
        for frame in self.pending.iter_mut().filter(|f| !f.mapped) {
            let state = Arc::clone(&frame.state);
            frame
                .buffer
                .slice(..)
                .map_async(wgpu::MapMode::Read, move |result| {
                    let next = if result.is_ok() { MAP_READY } else { MAP_FAILED };
                    state.store(next, Ordering::Release);
                });
            frame.mapped = true;
        }
    }

    /// Take every finished frame from the front of the queue
    ///
    /// Call after `Device::poll(Maintain::Poll)`.
    pub fn collect(&mut self) -> Vec<RawFrame> {
        let mut frames = Vec::new();
        while let Some(front) = self.pending.front() {
            match front.state.load(Ordering::Acquire) {
                MAP_PENDING => break,
                MAP_FAILED => {
                    warn!("frame readback failed to map; frame dropped");
                    self.pending.pop_front();
                }
                _ => {
                    let Some(frame) = self.pending.pop_front() else {
                        break;
                    };
                    let pixels = {
                        let data = frame.buffer.slice(..).get_mapped_range();
                        strip_padding(
                            &data,
                            frame.width,
                            frame.height,
                            padded_bytes_per_row(frame.width),
                        )
                    };
                    frame.buffer.unmap();
                    if frame.buffer.size() == self.buffer_size {
                        self.free.push(frame.buffer);
                    }
                    frames.push(RawFrame {
                        width: frame.width,
                        height: frame.height,
                        layout: self.layout,
                        pixels,
                    });
                }
            }
        }
        frames
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}
