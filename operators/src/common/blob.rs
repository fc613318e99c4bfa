use std::{
    alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout},
    ops::{Deref, DerefMut},
    ptr::NonNull,
    slice::{from_raw_parts, from_raw_parts_mut},
};

/// 主机内存块，分配时清零。
pub struct Blob {
    ptr: NonNull<u8>,
    len: usize,
}

unsafe impl Send for Blob {}
unsafe impl Sync for Blob {}

impl Blob {
    #[inline]
    pub fn new(size: usize) -> Self {
        Self::try_new(size).unwrap_or_else(|| handle_alloc_error(layout(size)))
    }

    #[inline]
    pub fn try_new(size: usize) -> Option<Self> {
        Some(Self {
            ptr: NonNull::new(unsafe { alloc_zeroed(layout(size)) })?,
            len: size,
        })
    }
}

impl Drop for Blob {
    #[inline]
    fn drop(&mut self) {
        let &mut Blob { ptr, len } = self;
        unsafe { dealloc(ptr.as_ptr(), layout(len)) }
    }
}

#[inline(always)]
const fn layout(size: usize) -> Layout {
    // 零长度的分配也占用一个对齐单元
    let size = if size == 0 { 1 } else { size };
    unsafe { Layout::from_size_align_unchecked(size, align_of::<usize>()) }
}

impl Deref for Blob {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        unsafe { from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for Blob {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        unsafe { from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}
