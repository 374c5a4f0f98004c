//! Double-buffered shared memory swapchain
//!
//! One anonymous memfd backs two equally sized ARGB8888 buffers laid out
//! back to back. The compositor side (pool, buffers, attach/commit) goes
//! through [`BufferSink`] so the swapchain can be driven without a live
//! connection.

use std::ffi::CStr;
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, FromRawFd, OwnedFd};

use log::{debug, trace, warn};
use memmap2::{Advice, MmapMut};

use crate::error::SwapchainError;

/// Bytes per ARGB8888 pixel.
pub const BYTES_PER_PIXEL: u32 = 4;

/// Pools at least this large are advised to use transparent huge pages.
const HUGE_PAGE_THRESHOLD: usize = 2 << 20;

/// Compositor-side objects a swapchain needs.
pub trait BufferSink {
    type Pool;
    type Buffer;

    fn create_pool(&mut self, fd: BorrowedFd<'_>, size: i32) -> Self::Pool;

    fn create_buffer(
        &mut self,
        pool: &Self::Pool,
        offset: i32,
        width: i32,
        height: i32,
        stride: i32,
    ) -> Self::Buffer;

    /// Attach `buffer`, damage all of it and commit.
    fn present(&mut self, buffer: &Self::Buffer);

    fn destroy_pool(&mut self, pool: Self::Pool);

    fn destroy_buffer(&mut self, buffer: Self::Buffer);
}

/// The back buffer handed to the renderer for one frame.
pub struct Frame<'a> {
    pub data: &'a mut [u8],
    pub width: u32,
    pub height: u32,
    pub stride: u32,
}

struct Pool<S: BufferSink> {
    pool: S::Pool,
    buffers: [S::Buffer; 2],
    mmap: MmapMut,
    file: File,
}

/// Two buffers carved from one shared memory pool.
pub struct Swapchain<S: BufferSink> {
    sink: S,
    width: u32,
    height: u32,
    stride: u32,
    /// Index of the buffer the next `draw` attaches.
    current: usize,
    pool: Option<Pool<S>>,
}

impl<S: BufferSink> Swapchain<S> {
    /// Allocate and register a pool for two `width` x `height` buffers.
    pub fn new(mut sink: S, width: u32, height: u32) -> Result<Self, SwapchainError> {
        let invalid = || SwapchainError::InvalidSize { width, height };
        let stride = width.checked_mul(BYTES_PER_PIXEL).ok_or_else(invalid)?;
        let buffer_size = (height as usize)
            .checked_mul(stride as usize)
            .ok_or_else(invalid)?;
        let pool_size = buffer_size.checked_mul(2).ok_or_else(invalid)?;
        let pool_size_i32 = i32::try_from(pool_size).map_err(|_| invalid())?;
        if pool_size == 0 {
            return Err(invalid());
        }
        debug!(
            "Allocating {}x{} swapchain, stride {}, pool {} bytes",
            width, height, stride, pool_size
        );

        let file = allocate_shm_file(pool_size as u64).map_err(SwapchainError::Allocate)?;
        // SAFETY: the memfd is private to this process until handed to the
        // compositor, and its size is never changed after this point.
        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(SwapchainError::Map)?;
        if pool_size >= HUGE_PAGE_THRESHOLD {
            if let Err(e) = mmap.advise(Advice::HugePage) {
                debug!("madvise(MADV_HUGEPAGE) failed: {}", e);
            }
        }

        let pool = sink.create_pool(file.as_fd(), pool_size_i32);
        let buffers = [0, 1].map(|i| {
            sink.create_buffer(
                &pool,
                (buffer_size * i) as i32,
                width as i32,
                height as i32,
                stride as i32,
            )
        });

        Ok(Self {
            sink,
            width,
            height,
            stride,
            current: 0,
            pool: Some(Pool {
                pool,
                buffers,
                mmap,
                file,
            }),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Index of the buffer the next `draw` will attach.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Total size of the shared memory mapping.
    pub fn mapped_len(&self) -> Option<usize> {
        self.pool.as_ref().map(|p| p.mmap.len())
    }

    pub fn is_destroyed(&self) -> bool {
        self.pool.is_none()
    }

    /// Pixels of the buffer that the next `draw` presents.
    pub fn frame(&mut self) -> Result<Frame<'_>, SwapchainError> {
        let pool = self.pool.as_mut().ok_or(SwapchainError::Destroyed)?;
        let len = self.height as usize * self.stride as usize;
        let start = len * self.current;
        Ok(Frame {
            data: &mut pool.mmap[start..start + len],
            width: self.width,
            height: self.height,
            stride: self.stride,
        })
    }

    /// Present the current buffer and flip to the other one.
    pub fn draw(&mut self) -> Result<(), SwapchainError> {
        let pool = self.pool.as_ref().ok_or(SwapchainError::Destroyed)?;
        trace!("Presenting buffer {}", self.current);
        self.sink.present(&pool.buffers[self.current]);
        self.current ^= 1;
        Ok(())
    }

    /// Release the pool and buffers, then unmap and close the memfd.
    pub fn destroy(&mut self) {
        let Some(pool) = self.pool.take() else {
            return;
        };
        let Pool {
            pool,
            buffers,
            mmap,
            file,
        } = pool;
        self.sink.destroy_pool(pool);
        for buffer in buffers {
            self.sink.destroy_buffer(buffer);
        }
        drop(mmap);
        drop(file);
        debug!("Swapchain destroyed");
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: BufferSink> Drop for Swapchain<S> {
    fn drop(&mut self) {
        if self.pool.is_some() {
            warn!("Swapchain dropped without being destroyed");
            self.destroy();
        }
    }
}

/// Create a sealable anonymous file of `size` bytes.
fn allocate_shm_file(size: u64) -> io::Result<File> {
    const NAME: &CStr = c"slate-shm";
    // SAFETY: NAME is a valid NUL-terminated string.
    let fd = unsafe {
        libc::memfd_create(
            NAME.as_ptr(),
            libc::MFD_CLOEXEC | libc::MFD_ALLOW_SEALING,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: memfd_create returned a fresh descriptor that nothing else owns.
    let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
    // set_len retries on EINTR internally.
    file.set_len(size)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        CreatePool(i32),
        CreateBuffer { id: u32, offset: i32 },
        Present(u32),
        DestroyPool,
        DestroyBuffer(u32),
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        calls: Rc<RefCell<Vec<Call>>>,
        next_id: u32,
    }

    impl BufferSink for RecordingSink {
        type Pool = ();
        type Buffer = u32;

        fn create_pool(&mut self, _fd: BorrowedFd<'_>, size: i32) {
            self.calls.borrow_mut().push(Call::CreatePool(size));
        }

        fn create_buffer(&mut self, _: &(), offset: i32, _w: i32, _h: i32, _stride: i32) -> u32 {
            let id = self.next_id;
            self.next_id += 1;
            self.calls
                .borrow_mut()
                .push(Call::CreateBuffer { id, offset });
            id
        }

        fn present(&mut self, buffer: &u32) {
            self.calls.borrow_mut().push(Call::Present(*buffer));
        }

        fn destroy_pool(&mut self, _: ()) {
            self.calls.borrow_mut().push(Call::DestroyPool);
        }

        fn destroy_buffer(&mut self, buffer: u32) {
            self.calls.borrow_mut().push(Call::DestroyBuffer(buffer));
        }
    }

    #[test]
    fn test_init_sizes_pool_for_two_buffers() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        let mut swapchain = Swapchain::new(sink, 100, 50).unwrap();

        assert_eq!(swapchain.stride(), 400);
        assert_eq!(swapchain.mapped_len(), Some(50 * 400 * 2));
        assert_eq!(
            calls.borrow().as_slice(),
            &[
                Call::CreatePool(40_000),
                Call::CreateBuffer { id: 0, offset: 0 },
                Call::CreateBuffer {
                    id: 1,
                    offset: 20_000
                },
            ]
        );
        swapchain.destroy();
    }

    #[test]
    fn test_draw_alternates_buffers() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        let mut swapchain = Swapchain::new(sink, 4, 4).unwrap();
        calls.borrow_mut().clear();

        for _ in 0..4 {
            swapchain.draw().unwrap();
        }
        assert_eq!(
            calls.borrow().as_slice(),
            &[
                Call::Present(0),
                Call::Present(1),
                Call::Present(0),
                Call::Present(1)
            ]
        );
        swapchain.destroy();
    }

    #[test]
    fn test_frame_targets_current_buffer() {
        let mut swapchain = Swapchain::new(RecordingSink::default(), 2, 2).unwrap();
        swapchain.frame().unwrap().data.fill(0xAA);
        swapchain.draw().unwrap();
        {
            let frame = swapchain.frame().unwrap();
            assert_eq!(frame.data.len(), 16);
            assert_eq!(frame.stride, 8);
            // Second buffer is untouched.
            assert!(frame.data.iter().all(|&b| b == 0));
        }
        swapchain.draw().unwrap();
        assert!(swapchain.frame().unwrap().data.iter().all(|&b| b == 0xAA));
        swapchain.destroy();
    }

    #[test]
    fn test_destroy_releases_everything_once() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        let mut swapchain = Swapchain::new(sink, 8, 8).unwrap();
        calls.borrow_mut().clear();

        swapchain.destroy();
        swapchain.destroy();
        assert_eq!(
            calls.borrow().as_slice(),
            &[
                Call::DestroyPool,
                Call::DestroyBuffer(0),
                Call::DestroyBuffer(1)
            ]
        );
        assert!(swapchain.is_destroyed());
        assert_eq!(swapchain.mapped_len(), None);
    }

    #[test]
    fn test_draw_after_destroy_fails() {
        let mut swapchain = Swapchain::new(RecordingSink::default(), 8, 8).unwrap();
        swapchain.destroy();
        assert!(matches!(swapchain.draw(), Err(SwapchainError::Destroyed)));
        assert!(matches!(swapchain.frame(), Err(SwapchainError::Destroyed)));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(
            Swapchain::new(RecordingSink::default(), 0, 10),
            Err(SwapchainError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_drop_destroys() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        drop(Swapchain::new(sink, 8, 8).unwrap());
        assert!(calls.borrow().contains(&Call::DestroyPool));
    }
}
