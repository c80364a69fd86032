//! Rendering a single frame into memory instead of a window.

use std::ffi::c_void;

use crate::renderer::gl;

#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error("offscreen framebuffer is incomplete (status {0:#x})")]
    IncompleteFramebuffer(gl::types::GLenum),
    #[error("invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// An offscreen framebuffer with color and depth renderbuffers, bound for
/// drawing while it's alive.
struct OffscreenTarget {
    framebuffer: gl::types::GLuint,
    renderbuffers: [gl::types::GLuint; 2],
}

impl OffscreenTarget {
    fn new(width: i32, height: i32) -> Result<OffscreenTarget, HeadlessError> {
        let mut target = OffscreenTarget {
            framebuffer: 0,
            renderbuffers: [0; 2],
        };
        gl::call!(gl::GenRenderbuffers(2, target.renderbuffers.as_mut_ptr()));
        let [color, depth] = target.renderbuffers;
        gl::call!(gl::BindRenderbuffer(gl::RENDERBUFFER, color));
        gl::call!(gl::RenderbufferStorage(gl::RENDERBUFFER, gl::RGBA8, width, height));
        gl::call!(gl::BindRenderbuffer(gl::RENDERBUFFER, depth));
        gl::call!(gl::RenderbufferStorage(
            gl::RENDERBUFFER,
            gl::DEPTH_COMPONENT24,
            width,
            height
        ));
        gl::call!(gl::BindRenderbuffer(gl::RENDERBUFFER, 0));

        gl::call!(gl::GenFramebuffers(1, &mut target.framebuffer));
        gl::call!(gl::BindFramebuffer(gl::FRAMEBUFFER, target.framebuffer));
        gl::call!(gl::FramebufferRenderbuffer(
            gl::FRAMEBUFFER,
            gl::COLOR_ATTACHMENT0,
            gl::RENDERBUFFER,
            color
        ));
        gl::call!(gl::FramebufferRenderbuffer(
            gl::FRAMEBUFFER,
            gl::DEPTH_ATTACHMENT,
            gl::RENDERBUFFER,
            depth
        ));
        let status = gl::call!(gl::CheckFramebufferStatus(gl::FRAMEBUFFER));
        if status != gl::FRAMEBUFFER_COMPLETE {
            return Err(HeadlessError::IncompleteFramebuffer(status));
        }
        Ok(target)
    }
}

impl Drop for OffscreenTarget {
    fn drop(&mut self) {
        gl::call!(gl::BindFramebuffer(gl::FRAMEBUFFER, 0));
        gl::call!(gl::DeleteFramebuffers(1, &self.framebuffer));
        gl::call!(gl::DeleteRenderbuffers(2, self.renderbuffers.as_ptr()));
    }
}

/// Calls `draw` with an offscreen framebuffer of the given size bound, and
/// returns what it drew as tightly packed RGB rows, top row first.
pub fn render_to_image(
    width: u32,
    height: u32,
    draw: impl FnOnce(),
) -> Result<Vec<u8>, HeadlessError> {
    let (Ok(gl_width), Ok(gl_height)) = (i32::try_from(width), i32::try_from(height)) else {
        return Err(HeadlessError::InvalidSize { width, height });
    };
    if width == 0 || height == 0 {
        return Err(HeadlessError::InvalidSize { width, height });
    }

    let target = OffscreenTarget::new(gl_width, gl_height)?;
    draw();

    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    gl::call!(gl::PixelStorei(gl::PACK_ALIGNMENT, 1));
    gl::call!(gl::ReadPixels(
        0,
        0,
        gl_width,
        gl_height,
        gl::RGBA,
        gl::UNSIGNED_BYTE,
        rgba.as_mut_ptr() as *mut c_void,
    ));
    drop(target);

    let mut rgb = rgba_to_rgb(&rgba);
    flip_rows(&mut rgb, width as usize * 3);
    Ok(rgb)
}

fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
        .collect()
}

/// Reverses the order of the rows of an image, turning GL's bottom-up rows
/// into the top-down rows image files expect.
pub fn flip_rows(pixels: &mut [u8], row_length: usize) {
    if row_length == 0 {
        return;
    }
    let row_count = pixels.len() / row_length;
    for row in 0..row_count / 2 {
        let (top, bottom) = pixels.split_at_mut((row_count - 1 - row) * row_length);
        top[row * row_length..(row + 1) * row_length].swap_with_slice(&mut bottom[..row_length]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_odd_row_count() {
        let mut pixels = vec![1, 1, 2, 2, 3, 3];
        flip_rows(&mut pixels, 2);
        assert_eq!(vec![3, 3, 2, 2, 1, 1], pixels);
    }

    #[test]
    fn flips_even_row_count() {
        let mut pixels = vec![1, 2, 3, 4, 5, 6, 7, 8];
        flip_rows(&mut pixels, 4);
        assert_eq!(vec![5, 6, 7, 8, 1, 2, 3, 4], pixels);
    }

    #[test]
    fn single_row_is_unchanged() {
        let mut pixels = vec![9, 8, 7];
        flip_rows(&mut pixels, 3);
        assert_eq!(vec![9, 8, 7], pixels);
    }

    #[test]
    fn drops_alpha() {
        assert_eq!(vec![1, 2, 3, 5, 6, 7], rgba_to_rgb(&[1, 2, 3, 4, 5, 6, 7, 8]));
    }
}
